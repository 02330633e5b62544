mod client;
mod project;
mod task;
mod time_log;
mod user;

pub use client::{Client, NewClient};
pub use project::{NewProject, Project};
pub use task::{NewTask, Task, TaskStatus};
pub use time_log::{NewTimeLog, TimeLog, TimeLogDetail};
pub use user::{NewUser, Role, User};
