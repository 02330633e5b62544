use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Client {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Body of `POST /api/clients`.
#[derive(Deserialize, Debug, Clone)]
pub struct NewClient {
    pub name: String,
    pub email: String,
    pub phone: String,
    #[serde(default)]
    pub address: Option<String>,
}
