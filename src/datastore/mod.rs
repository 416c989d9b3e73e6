mod datastore;
mod error;
mod storage;

pub use datastore::connect;
pub use error::DataStoreError;
pub use storage::MemoryTaskStorage;
pub use storage::MySqlTaskStorage;
pub use storage::PoolSettings;
pub use storage::SharedStorage;
pub use storage::SqliteTaskStorage;
pub use storage::StorageError;
pub use storage::TaskStorage;
