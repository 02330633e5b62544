use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{Project, Task};

#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TimeLog {
    pub id: i32,
    pub user_id: i32,
    pub project_id: i32,
    pub task_id: i32,
    pub date: NaiveDate,
    pub hours: f64,
    pub note: Option<String>,
}

/// A time log with its project and task embedded, as returned by
/// `GET /api/users/{id}/time-logs`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TimeLogDetail {
    #[serde(flatten)]
    pub log: TimeLog,
    pub project: Project,
    pub task: Task,
}

/// Body of `POST /api/time-logs`.
#[derive(Deserialize, Debug, Clone)]
pub struct NewTimeLog {
    pub user_id: i32,
    pub project_id: i32,
    pub task_id: i32,
    pub date: NaiveDate,
    pub hours: f64,
    #[serde(default)]
    pub note: Option<String>,
}
