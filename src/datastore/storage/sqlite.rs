use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use std::str::FromStr;
use tracing::{debug, info};

use super::error::StorageError;
use super::{PoolSettings, TaskStorage};
use crate::model::{NewTask, Task, TaskId};

// AUTOINCREMENT keeps rowids from being reused after the newest row is deleted.
const CREATE_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS tasks (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        content TEXT
    )
"#;

/// `tasks` table in an SQLite file or in memory (`sqlite::memory:`).
pub struct SqliteTaskStorage {
    pool: SqlitePool,
}

impl SqliteTaskStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn connect(url: &str, settings: &PoolSettings) -> Result<Self, StorageError> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let in_memory = url.contains(":memory:") || url.contains("mode=memory");

        let pool_options = if in_memory {
            // every connection to :memory: opens a distinct database
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(settings.max_connections)
        };
        let pool = pool_options
            .acquire_timeout(settings.acquire_timeout)
            .connect_with(options)
            .await?;
        info!(in_memory, "Connected to SQLite task storage.");
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn task_from_row(row: &SqliteRow) -> Result<Task, StorageError> {
    let id: i64 = row.try_get("id")?;
    let content: Option<String> = row.try_get("content")?;
    Ok(Task::new(TaskId::from(id), content.unwrap_or_default()))
}

#[async_trait::async_trait]
impl TaskStorage for SqliteTaskStorage {
    async fn migrate(&self) -> Result<(), StorageError> {
        sqlx::query(CREATE_TABLE).execute(&self.pool).await?;
        Ok(())
    }

    async fn ping(&self) -> Result<(), StorageError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<Task>, StorageError> {
        let rows = sqlx::query("SELECT id, content FROM tasks ORDER BY id DESC")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(task_from_row).collect()
    }

    async fn insert(&self, item: NewTask) -> Result<Task, StorageError> {
        let result = sqlx::query("INSERT INTO tasks (content) VALUES (?)")
            .bind(item.content())
            .execute(&self.pool)
            .await?;
        let id = TaskId::from(result.last_insert_rowid());
        Ok(Task::new(id, item.into_content()))
    }

    async fn delete_by_id(&self, id: TaskId) -> Result<(), StorageError> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = ?")
            .bind(id.get())
            .execute(&self.pool)
            .await?;
        debug!(id = %id, rows = result.rows_affected(), "Deleted task.");
        Ok(())
    }
}
