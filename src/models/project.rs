use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Project {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub client_id: i32,
    pub created_at: DateTime<Utc>,
}

/// Body of `POST /api/projects`. `member_ids` becomes the project team.
#[derive(Deserialize, Debug, Clone)]
pub struct NewProject {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub client_id: i32,
    #[serde(default)]
    pub member_ids: Vec<i32>,
}
