use std::str::FromStr;

use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

use crate::models::{NewTask, Task, TaskUpdate};

const TASK_COLUMNS: &str = "id, title, description, completed, created_at, updated_at";

/// Handle to the task table. Cloning is cheap and shares the pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

/// Location of the database when none is configured: the platform state
/// directory, then the config directory, then `~/.local/state`.
pub fn default_database_url() -> anyhow::Result<String> {
    let config_dir = dirs::state_dir()
        .or_else(dirs::config_dir)
        .or_else(|| dirs::home_dir().map(|h| h.join(".local/state")))
        .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;

    let db_path = config_dir.join("taskboard").join("data");
    std::fs::create_dir_all(&db_path)?;

    let db_file = db_path.join("taskboard.db");
    Ok(format!("sqlite:{}?mode=rwc", db_file.display()))
}

impl Database {
    pub async fn connect_default() -> anyhow::Result<Self> {
        let database_url = default_database_url()?;
        Self::connect(&database_url).await
    }

    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new().connect_with(options).await?;

        Self::migrate(pool).await
    }

    /// A private in-memory database. The pool holds exactly one connection
    /// that never expires, since the data lives and dies with it.
    pub async fn in_memory() -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        Self::migrate(pool).await
    }

    async fn migrate(pool: SqlitePool) -> anyhow::Result<Self> {
        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::debug!("task schema is up to date");

        Ok(Database { pool })
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    pub async fn list_tasks(&self) -> anyhow::Result<Vec<Task>> {
        let rows = sqlx::query_as::<_, Task>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    pub async fn get_task(&self, task_id: i64) -> anyhow::Result<Option<Task>> {
        let row = sqlx::query_as::<_, Task>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?"
        ))
        .bind(task_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    pub async fn create_task(&self, task: &NewTask) -> anyhow::Result<Task> {
        let now = Utc::now();
        let row = sqlx::query_as::<_, Task>(&format!(
            "INSERT INTO tasks (title, description, completed, created_at, updated_at)
             VALUES (?, ?, FALSE, ?, ?)
             RETURNING {TASK_COLUMNS}"
        ))
        .bind(&task.title)
        .bind(&task.description)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    /// Overwrites every mutable field. Returns `None` when no row has `task_id`.
    pub async fn update_task(
        &self,
        task_id: i64,
        update: &TaskUpdate,
    ) -> anyhow::Result<Option<Task>> {
        let row = sqlx::query_as::<_, Task>(&format!(
            "UPDATE tasks SET title = ?, description = ?, completed = ?, updated_at = ?
             WHERE id = ?
             RETURNING {TASK_COLUMNS}"
        ))
        .bind(&update.title)
        .bind(&update.description)
        .bind(update.completed)
        .bind(Utc::now())
        .bind(task_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    /// Deleting a missing task is not an error; the return value tells
    /// whether a row was actually removed.
    pub async fn delete_task(&self, task_id: i64) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = ?")
            .bind(task_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
