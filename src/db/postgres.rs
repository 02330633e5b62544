use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::info;

use super::Store;
use crate::config::Config;
use crate::models::{
    Client, NewClient, NewProject, NewTask, NewTimeLog, NewUser, Project, Task, TimeLog,
    TimeLogDetail, User,
};

/// PostgreSQL-backed store
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new Database instance with a connection pool
    pub async fn new(config: &Config) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .connect(config.database_url()?)
            .await?;

        Ok(Self { pool })
    }

    /// Get a reference to the connection pool
    pub fn get_pool(&self) -> &PgPool {
        &self.pool
    }

    /// Apply the embedded schema migrations
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!().run(self.get_pool()).await?;
        Ok(())
    }
}

/// Flat row produced by the time log join, split into [`TimeLogDetail`].
#[derive(sqlx::FromRow)]
struct TimeLogRow {
    id: i32,
    user_id: i32,
    project_id: i32,
    task_id: i32,
    date: NaiveDate,
    hours: f64,
    note: Option<String>,
    project_name: String,
    project_description: Option<String>,
    project_client_id: i32,
    project_created_at: DateTime<Utc>,
    task_project_id: i32,
    task_title: String,
    task_description: Option<String>,
    task_status: String,
    task_created_at: DateTime<Utc>,
}

impl From<TimeLogRow> for TimeLogDetail {
    fn from(row: TimeLogRow) -> Self {
        Self {
            project: Project {
                id: row.project_id,
                name: row.project_name,
                description: row.project_description,
                client_id: row.project_client_id,
                created_at: row.project_created_at,
            },
            task: Task {
                id: row.task_id,
                project_id: row.task_project_id,
                title: row.task_title,
                description: row.task_description,
                status: row.task_status,
                created_at: row.task_created_at,
            },
            log: TimeLog {
                id: row.id,
                user_id: row.user_id,
                project_id: row.project_id,
                task_id: row.task_id,
                date: row.date,
                hours: row.hours,
                note: row.note,
            },
        }
    }
}

#[async_trait]
impl Store for Database {
    // Client operations
    async fn list_clients(&self) -> Result<Vec<Client>> {
        let clients = sqlx::query_as::<_, Client>(
            "SELECT id, name, email, phone, address, created_at FROM clients ORDER BY name ASC, id ASC",
        )
        .fetch_all(self.get_pool())
        .await?;

        Ok(clients)
    }

    async fn create_client(&self, client: &NewClient) -> Result<Client> {
        let client = sqlx::query_as::<_, Client>(
            r#"
            INSERT INTO clients (name, email, phone, address)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, email, phone, address, created_at
            "#,
        )
        .bind(&client.name)
        .bind(&client.email)
        .bind(&client.phone)
        .bind(&client.address)
        .fetch_one(self.get_pool())
        .await?;

        Ok(client)
    }

    // User operations
    async fn list_users(&self) -> Result<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            "SELECT id, name, email, role, created_at FROM users ORDER BY name ASC, id ASC",
        )
        .fetch_all(self.get_pool())
        .await?;

        Ok(users)
    }

    async fn create_user(&self, user: &NewUser) -> Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (name, email, role)
            VALUES ($1, $2, $3)
            RETURNING id, name, email, role, created_at
            "#,
        )
        .bind(&user.name)
        .bind(&user.email)
        .bind(user.role.as_str())
        .fetch_one(self.get_pool())
        .await?;

        Ok(user)
    }

    // Project operations
    async fn list_projects(&self) -> Result<Vec<Project>> {
        let projects = sqlx::query_as::<_, Project>(
            "SELECT id, name, description, client_id, created_at FROM projects ORDER BY name ASC, id ASC",
        )
        .fetch_all(self.get_pool())
        .await?;

        Ok(projects)
    }

    async fn create_project(&self, project: &NewProject) -> Result<Project> {
        let mut tx = self.pool.begin().await?;

        let created = sqlx::query_as::<_, Project>(
            r#"
            INSERT INTO projects (name, description, client_id)
            VALUES ($1, $2, $3)
            RETURNING id, name, description, client_id, created_at
            "#,
        )
        .bind(&project.name)
        .bind(&project.description)
        .bind(project.client_id)
        .fetch_one(&mut *tx)
        .await?;

        for user_id in &project.member_ids {
            sqlx::query(
                r#"
                INSERT INTO project_members (project_id, user_id)
                VALUES ($1, $2)
                ON CONFLICT DO NOTHING
                "#,
            )
            .bind(created.id)
            .bind(*user_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(created)
    }

    async fn projects_for_user(&self, user_id: i32) -> Result<Vec<Project>> {
        let projects = sqlx::query_as::<_, Project>(
            r#"
            SELECT p.id, p.name, p.description, p.client_id, p.created_at
            FROM projects p
            JOIN project_members m ON m.project_id = p.id
            WHERE m.user_id = $1
            ORDER BY p.name ASC, p.id ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(self.get_pool())
        .await?;

        Ok(projects)
    }

    // Task operations
    async fn tasks_for_project(&self, project_id: i32) -> Result<Vec<Task>> {
        let tasks = sqlx::query_as::<_, Task>(
            r#"
            SELECT id, project_id, title, description, status, created_at
            FROM tasks
            WHERE project_id = $1
            ORDER BY id ASC
            "#,
        )
        .bind(project_id)
        .fetch_all(self.get_pool())
        .await?;

        Ok(tasks)
    }

    async fn create_task(&self, project_id: i32, task: &NewTask) -> Result<Task> {
        let task = sqlx::query_as::<_, Task>(
            r#"
            INSERT INTO tasks (project_id, title, description, status)
            VALUES ($1, $2, $3, $4)
            RETURNING id, project_id, title, description, status, created_at
            "#,
        )
        .bind(project_id)
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.status.as_str())
        .fetch_one(self.get_pool())
        .await?;

        Ok(task)
    }

    // Time log operations
    async fn time_logs_for_user(&self, user_id: i32) -> Result<Vec<TimeLogDetail>> {
        let rows = sqlx::query_as::<_, TimeLogRow>(
            r#"
            SELECT
                tl.id,
                tl.user_id,
                tl.project_id,
                tl.task_id,
                tl.date,
                tl.hours,
                tl.note,
                p.name AS project_name,
                p.description AS project_description,
                p.client_id AS project_client_id,
                p.created_at AS project_created_at,
                t.project_id AS task_project_id,
                t.title AS task_title,
                t.description AS task_description,
                t.status AS task_status,
                t.created_at AS task_created_at
            FROM time_logs tl
            JOIN projects p ON p.id = tl.project_id
            JOIN tasks t ON t.id = tl.task_id
            WHERE tl.user_id = $1
            ORDER BY tl.date DESC, tl.id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(self.get_pool())
        .await?;

        Ok(rows.into_iter().map(TimeLogDetail::from).collect())
    }

    async fn create_time_log(&self, log: &NewTimeLog) -> Result<TimeLog> {
        let log = sqlx::query_as::<_, TimeLog>(
            r#"
            INSERT INTO time_logs (user_id, project_id, task_id, date, hours, note)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, user_id, project_id, task_id, date, hours, note
            "#,
        )
        .bind(log.user_id)
        .bind(log.project_id)
        .bind(log.task_id)
        .bind(log.date)
        .bind(log.hours)
        .bind(&log.note)
        .fetch_one(self.get_pool())
        .await?;

        Ok(log)
    }
}

/// Initialize the database connection pool, optionally applying migrations
pub async fn init(config: &Config, run_migrations: bool) -> Result<Database> {
    let db = Database::new(config).await?;

    if run_migrations {
        db.migrate().await?;
        info!("Database migrations applied");
    }

    Ok(db)
}
