use std::sync::Arc;
use tracing::{info, instrument};
use url::Url;

use super::error::DataStoreError;
use super::storage::{
    MemoryTaskStorage, MySqlTaskStorage, PoolSettings, SharedStorage, SqliteTaskStorage,
};
use crate::config::StorageConfig;

/// Opens the storage named by `config.url` and makes sure the `tasks` table
/// exists.
///
/// Supported schemes are `mysql://`, `sqlite:` and `memory://`.
#[instrument(skip(config))]
pub async fn connect(config: &StorageConfig) -> Result<SharedStorage, DataStoreError> {
    let url = Url::parse(&config.url)?;
    let settings = PoolSettings::from(config);

    let storage: SharedStorage = match url.scheme() {
        "memory" => Arc::new(MemoryTaskStorage::new()),
        "mysql" => Arc::new(MySqlTaskStorage::connect(&config.url, &settings).await?),
        "sqlite" => Arc::new(SqliteTaskStorage::connect(&config.url, &settings).await?),
        other => return Err(DataStoreError::UnsupportedScheme(other.to_string())),
    };
    storage.migrate().await?;
    info!(backend = url.scheme(), "Task storage is ready.");
    Ok(storage)
}
