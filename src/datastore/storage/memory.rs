use parking_lot::Mutex;
use std::collections::BTreeMap;

use super::error::StorageError;
use super::TaskStorage;
use crate::model::{NewTask, Task, TaskId};

#[derive(Default)]
struct Table {
    rows: BTreeMap<TaskId, String>,
    last_id: i64,
}

/// Process-local stand-in for the relational store, with the same id
/// semantics as an autoincrement primary key.
pub struct MemoryTaskStorage {
    table: Mutex<Table>,
}

impl MemoryTaskStorage {
    pub fn new() -> Self {
        Self {
            table: Mutex::new(Table::default()),
        }
    }
}

impl Default for MemoryTaskStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl TaskStorage for MemoryTaskStorage {
    async fn migrate(&self) -> Result<(), StorageError> {
        Ok(())
    }

    async fn ping(&self) -> Result<(), StorageError> {
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<Task>, StorageError> {
        let table = self.table.lock();
        Ok(table
            .rows
            .iter()
            .rev()
            .map(|(id, content)| Task::new(*id, content.clone()))
            .collect())
    }

    async fn insert(&self, item: NewTask) -> Result<Task, StorageError> {
        let mut table = self.table.lock();
        let next = table
            .last_id
            .checked_add(1)
            .ok_or_else(|| StorageError::Query("task id space exhausted".to_string()))?;
        table.last_id = next;
        let id = TaskId::from(next);
        let content = item.into_content();
        table.rows.insert(id, content.clone());
        Ok(Task::new(id, content))
    }

    async fn delete_by_id(&self, id: TaskId) -> Result<(), StorageError> {
        self.table.lock().rows.remove(&id);
        Ok(())
    }
}
