use std::cmp::Reverse;
use std::collections::BTreeSet;

use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;

use super::Store;
use crate::models::{
    Client, NewClient, NewProject, NewTask, NewTimeLog, NewUser, Project, Task, TimeLog,
    TimeLogDetail, User,
};

#[derive(Default)]
struct Tables {
    next_id: i32,
    clients: Vec<Client>,
    users: Vec<User>,
    projects: Vec<Project>,
    /// (project_id, user_id)
    members: BTreeSet<(i32, i32)>,
    tasks: Vec<Task>,
    time_logs: Vec<TimeLog>,
}

impl Tables {
    fn next_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }

    fn project(&self, id: i32) -> Result<&Project> {
        self.projects
            .iter()
            .find(|p| p.id == id)
            .ok_or_else(|| anyhow!("project {id} does not exist"))
    }

    fn task(&self, id: i32) -> Result<&Task> {
        self.tasks
            .iter()
            .find(|t| t.id == id)
            .ok_or_else(|| anyhow!("task {id} does not exist"))
    }
}

/// Store that keeps every table in process memory.
///
/// Enforces the same foreign keys and uniqueness rules as the SQL schema so
/// handlers see the same failures either way.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn by_name<T>(rows: &mut [T], key: impl Fn(&T) -> (&str, i32)) {
    rows.sort_by(|a, b| key(a).cmp(&key(b)));
}

#[async_trait]
impl Store for MemoryStore {
    async fn list_clients(&self) -> Result<Vec<Client>> {
        let mut clients = self.tables.lock().clients.clone();
        by_name(&mut clients, |c| (c.name.as_str(), c.id));
        Ok(clients)
    }

    async fn create_client(&self, client: &NewClient) -> Result<Client> {
        let mut tables = self.tables.lock();
        let created = Client {
            id: tables.next_id(),
            name: client.name.clone(),
            email: client.email.clone(),
            phone: client.phone.clone(),
            address: client.address.clone(),
            created_at: Utc::now(),
        };
        tables.clients.push(created.clone());
        Ok(created)
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        let mut users = self.tables.lock().users.clone();
        by_name(&mut users, |u| (u.name.as_str(), u.id));
        Ok(users)
    }

    async fn create_user(&self, user: &NewUser) -> Result<User> {
        let mut tables = self.tables.lock();
        if tables.users.iter().any(|u| u.email == user.email) {
            bail!("user email {} already exists", user.email);
        }
        let created = User {
            id: tables.next_id(),
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role.as_str().to_string(),
            created_at: Utc::now(),
        };
        tables.users.push(created.clone());
        Ok(created)
    }

    async fn list_projects(&self) -> Result<Vec<Project>> {
        let mut projects = self.tables.lock().projects.clone();
        by_name(&mut projects, |p| (p.name.as_str(), p.id));
        Ok(projects)
    }

    async fn create_project(&self, project: &NewProject) -> Result<Project> {
        let mut tables = self.tables.lock();
        if !tables.clients.iter().any(|c| c.id == project.client_id) {
            bail!("client {} does not exist", project.client_id);
        }
        if let Some(missing) = project
            .member_ids
            .iter()
            .find(|id| !tables.users.iter().any(|u| u.id == **id))
        {
            bail!("user {missing} does not exist");
        }

        let created = Project {
            id: tables.next_id(),
            name: project.name.clone(),
            description: project.description.clone(),
            client_id: project.client_id,
            created_at: Utc::now(),
        };
        for user_id in &project.member_ids {
            tables.members.insert((created.id, *user_id));
        }
        tables.projects.push(created.clone());
        Ok(created)
    }

    async fn projects_for_user(&self, user_id: i32) -> Result<Vec<Project>> {
        let tables = self.tables.lock();
        let mut projects: Vec<Project> = tables
            .projects
            .iter()
            .filter(|p| tables.members.contains(&(p.id, user_id)))
            .cloned()
            .collect();
        by_name(&mut projects, |p| (p.name.as_str(), p.id));
        Ok(projects)
    }

    async fn tasks_for_project(&self, project_id: i32) -> Result<Vec<Task>> {
        let tables = self.tables.lock();
        let mut tasks: Vec<Task> = tables
            .tasks
            .iter()
            .filter(|t| t.project_id == project_id)
            .cloned()
            .collect();
        tasks.sort_by_key(|t| t.id);
        Ok(tasks)
    }

    async fn create_task(&self, project_id: i32, task: &NewTask) -> Result<Task> {
        let mut tables = self.tables.lock();
        tables.project(project_id)?;

        let created = Task {
            id: tables.next_id(),
            project_id,
            title: task.title.clone(),
            description: task.description.clone(),
            status: task.status.as_str().to_string(),
            created_at: Utc::now(),
        };
        tables.tasks.push(created.clone());
        Ok(created)
    }

    async fn time_logs_for_user(&self, user_id: i32) -> Result<Vec<TimeLogDetail>> {
        let tables = self.tables.lock();
        let mut logs = tables
            .time_logs
            .iter()
            .filter(|l| l.user_id == user_id)
            .map(|log| -> Result<TimeLogDetail> {
                Ok(TimeLogDetail {
                    project: tables.project(log.project_id)?.clone(),
                    task: tables.task(log.task_id)?.clone(),
                    log: log.clone(),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        logs.sort_by_key(|d| Reverse((d.log.date, d.log.id)));
        Ok(logs)
    }

    async fn create_time_log(&self, log: &NewTimeLog) -> Result<TimeLog> {
        let mut tables = self.tables.lock();
        if !tables.users.iter().any(|u| u.id == log.user_id) {
            bail!("user {} does not exist", log.user_id);
        }
        tables.project(log.project_id)?;
        tables.task(log.task_id)?;
        if !log.hours.is_finite() || log.hours <= 0.0 {
            bail!("hours must be positive");
        }

        let created = TimeLog {
            id: tables.next_id(),
            user_id: log.user_id,
            project_id: log.project_id,
            task_id: log.task_id,
            date: log.date,
            hours: log.hours,
            note: log.note.clone(),
        };
        tables.time_logs.push(created.clone());
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::models::{Role, TaskStatus};

    fn new_client(name: &str) -> NewClient {
        NewClient {
            name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
            phone: "555-0100".to_string(),
            address: None,
        }
    }

    fn new_user(name: &str) -> NewUser {
        NewUser {
            name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
            role: Role::Member,
        }
    }

    async fn seeded() -> (MemoryStore, User, Project, Task) {
        let store = MemoryStore::new();
        let client = store.create_client(&new_client("Acme")).await.unwrap();
        let user = store.create_user(&new_user("Ada")).await.unwrap();
        let project = store
            .create_project(&NewProject {
                name: "Website".to_string(),
                description: None,
                client_id: client.id,
                member_ids: vec![user.id],
            })
            .await
            .unwrap();
        let task = store
            .create_task(
                project.id,
                &NewTask {
                    title: "Design".to_string(),
                    description: None,
                    status: TaskStatus::Todo,
                },
            )
            .await
            .unwrap();
        (store, user, project, task)
    }

    #[tokio::test]
    async fn clients_are_listed_by_name() {
        let store = MemoryStore::new();
        for name in ["Zeta", "Alpha", "Mid"] {
            store.create_client(&new_client(name)).await.unwrap();
        }

        let names: Vec<String> = store
            .list_clients()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, ["Alpha", "Mid", "Zeta"]);
    }

    #[tokio::test]
    async fn duplicate_user_email_is_rejected() {
        let store = MemoryStore::new();
        store.create_user(&new_user("Ada")).await.unwrap();
        assert!(store.create_user(&new_user("Ada")).await.is_err());
    }

    #[tokio::test]
    async fn project_requires_existing_client() {
        let store = MemoryStore::new();
        let result = store
            .create_project(&NewProject {
                name: "Orphan".to_string(),
                description: None,
                client_id: 42,
                member_ids: vec![],
            })
            .await;
        assert!(result.is_err());
        assert!(store.list_projects().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn projects_for_user_follow_team_membership() {
        let (store, user, project, _) = seeded().await;
        let outsider = store.create_user(&new_user("Bob")).await.unwrap();

        let mine = store.projects_for_user(user.id).await.unwrap();
        assert_eq!(mine, vec![project]);
        assert!(store.projects_for_user(outsider.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn time_logs_are_newest_first_with_relations() {
        let (store, user, project, task) = seeded().await;
        for day in [3, 10, 1, 10] {
            store
                .create_time_log(&NewTimeLog {
                    user_id: user.id,
                    project_id: project.id,
                    task_id: task.id,
                    date: NaiveDate::from_ymd_opt(2024, 5, day).unwrap(),
                    hours: 1.5,
                    note: None,
                })
                .await
                .unwrap();
        }

        let logs = store.time_logs_for_user(user.id).await.unwrap();
        assert_eq!(logs.len(), 4);
        assert!(logs.windows(2).all(|w| w[0].log.date >= w[1].log.date));
        assert!(logs[0].log.id > logs[1].log.id);
        assert!(logs.iter().all(|d| d.project == project && d.task == task));
    }

    #[tokio::test]
    async fn time_log_rejects_unknown_task() {
        let (store, user, project, task) = seeded().await;
        let result = store
            .create_time_log(&NewTimeLog {
                user_id: user.id,
                project_id: project.id,
                task_id: task.id + 100,
                date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
                hours: 2.0,
                note: None,
            })
            .await;
        assert!(result.is_err());
    }
}
