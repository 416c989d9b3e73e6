use sqlx::mysql::{MySqlPool, MySqlPoolOptions, MySqlRow};
use sqlx::Row;
use std::convert::TryFrom;
use tracing::{debug, info};

use super::error::StorageError;
use super::{PoolSettings, TaskStorage};
use crate::model::{NewTask, Task, TaskId};

const CREATE_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS tasks (
        id BIGINT NOT NULL AUTO_INCREMENT PRIMARY KEY,
        content TEXT
    )
"#;

/// `tasks` table in MySQL, accessed through a connection pool.
pub struct MySqlTaskStorage {
    pool: MySqlPool,
}

impl MySqlTaskStorage {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    pub async fn connect(url: &str, settings: &PoolSettings) -> Result<Self, StorageError> {
        let pool = MySqlPoolOptions::new()
            .max_connections(settings.max_connections)
            .acquire_timeout(settings.acquire_timeout)
            .connect(url)
            .await?;
        info!(
            max_connections = settings.max_connections,
            "Connected to MySQL task storage."
        );
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }
}

fn task_from_row(row: &MySqlRow) -> Result<Task, StorageError> {
    let id: i64 = row.try_get("id")?;
    let content: Option<String> = row.try_get("content")?;
    Ok(Task::new(TaskId::from(id), content.unwrap_or_default()))
}

#[async_trait::async_trait]
impl TaskStorage for MySqlTaskStorage {
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
        let id = i64::try_from(result.last_insert_id()).map_err(|_| {
            StorageError::Corrupt(format!("insert id {} overflows", result.last_insert_id()))
        })?;
        Ok(Task::new(TaskId::from(id), item.into_content()))
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
