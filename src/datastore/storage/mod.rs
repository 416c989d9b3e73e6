mod error;
mod memory;
mod mysql;
mod sqlite;

use std::sync::Arc;
use std::time::Duration;

use crate::config::{StorageConfig, DEFAULT_ACQUIRE_TIMEOUT, DEFAULT_MAX_CONNECTIONS};
use crate::model::{NewTask, Task, TaskId};
pub use error::StorageError;
pub use memory::MemoryTaskStorage;
pub use mysql::MySqlTaskStorage;
pub use sqlite::SqliteTaskStorage;

/// Durable home of the `tasks` table.
///
/// Implementations own id assignment: ids are strictly increasing over the
/// lifetime of the table and are never reused after a delete.
#[async_trait::async_trait]
pub trait TaskStorage: Sync + Send + 'static {
    /// Creates the `tasks` table when it does not exist yet.
    async fn migrate(&self) -> Result<(), StorageError>;
    async fn ping(&self) -> Result<(), StorageError>;
    /// All tasks, most recently created first.
    async fn list_all(&self) -> Result<Vec<Task>, StorageError>;
    async fn insert(&self, item: NewTask) -> Result<Task, StorageError>;
    /// Removes at most one row. Deleting an unknown id is not an error.
    async fn delete_by_id(&self, id: TaskId) -> Result<(), StorageError>;
}

pub type SharedStorage = Arc<dyn TaskStorage>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PoolSettings {
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_connections: DEFAULT_MAX_CONNECTIONS,
            acquire_timeout: DEFAULT_ACQUIRE_TIMEOUT,
        }
    }
}

impl From<&StorageConfig> for PoolSettings {
    fn from(config: &StorageConfig) -> Self {
        let defaults = PoolSettings::default();
        Self {
            max_connections: config.max_connections.unwrap_or(defaults.max_connections),
            acquire_timeout: config.acquire_timeout.unwrap_or(defaults.acquire_timeout),
        }
    }
}
