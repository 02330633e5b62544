mod memory;
mod postgres;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{
    Client, NewClient, NewProject, NewTask, NewTimeLog, NewUser, Project, Task, TimeLog,
    TimeLogDetail, User,
};

pub use memory::MemoryStore;
pub use postgres::{Database, init};

/// Data access used by the HTTP handlers.
///
/// Every method is a single round trip against the backing store. Ordering
/// guarantees are part of the contract: list methods return rows sorted the
/// way the endpoints expose them.
#[async_trait]
pub trait Store: Send + Sync {
    /// All clients, ordered by name ascending.
    async fn list_clients(&self) -> Result<Vec<Client>>;
    async fn create_client(&self, client: &NewClient) -> Result<Client>;

    /// All users, ordered by name ascending.
    async fn list_users(&self) -> Result<Vec<User>>;
    async fn create_user(&self, user: &NewUser) -> Result<User>;

    /// All projects, ordered by name ascending.
    async fn list_projects(&self) -> Result<Vec<Project>>;
    /// Inserts the project and its team in one transaction.
    async fn create_project(&self, project: &NewProject) -> Result<Project>;
    /// Projects whose team includes `user_id`, ordered by name ascending.
    async fn projects_for_user(&self, user_id: i32) -> Result<Vec<Project>>;

    /// Tasks of a project, oldest first.
    async fn tasks_for_project(&self, project_id: i32) -> Result<Vec<Task>>;
    async fn create_task(&self, project_id: i32, task: &NewTask) -> Result<Task>;

    /// Time logs of a user with project and task attached, newest date first.
    async fn time_logs_for_user(&self, user_id: i32) -> Result<Vec<TimeLogDetail>>;
    async fn create_time_log(&self, log: &NewTimeLog) -> Result<TimeLog>;
}
