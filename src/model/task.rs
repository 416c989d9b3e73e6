use serde_derive::{Deserialize, Serialize};
use std::convert::TryFrom;
use std::fmt;
use std::str::FromStr;

use super::error::ModelError;

/// Store-assigned identifier of a task.
///
/// Ids are handed out by the store only, strictly increasing over the
/// lifetime of the table and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(transparent)]
pub struct TaskId(i64);

impl TaskId {
    pub fn get(&self) -> i64 {
        self.0
    }
}

impl From<i64> for TaskId {
    fn from(id: i64) -> Self {
        TaskId(id)
    }
}

impl From<TaskId> for i64 {
    fn from(id: TaskId) -> Self {
        id.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Parses a task id as it arrives in a request path, e.g. `/tasks/42`.
///
/// # Examples
///
/// ```
/// # use todolist::model::TaskId;
/// # use std::str::FromStr;
/// assert_eq!(TaskId::from_str("42").unwrap().get(), 42);
/// assert!(TaskId::from_str("forty-two").is_err());
/// ```
impl FromStr for TaskId {
    type Err = ModelError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        input
            .parse::<i64>()
            .map(TaskId)
            .map_err(|_| ModelError::InvalidTaskId(input.to_string()))
    }
}

impl<'a> TryFrom<&'a str> for TaskId {
    type Error = ModelError;

    fn try_from(input: &'a str) -> Result<Self, Self::Error> {
        TaskId::from_str(input)
    }
}

/// A persisted todo item.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Task {
    pub id: TaskId,
    pub content: String,
}

impl Task {
    pub fn new(id: TaskId, content: String) -> Task {
        Self { id, content }
    }
}

/// Validated payload for creating a task. The content is kept verbatim, only
/// its presence and non-blankness are checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    content: String,
}

impl NewTask {
    pub fn new(content: String) -> Result<NewTask, ModelError> {
        if content.trim().is_empty() {
            return Err(ModelError::BlankContent);
        }
        Ok(Self { content })
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn into_content(self) -> String {
        self.content
    }
}

impl TryFrom<Option<String>> for NewTask {
    type Error = ModelError;

    fn try_from(content: Option<String>) -> Result<Self, Self::Error> {
        content
            .ok_or(ModelError::MissingContent)
            .and_then(NewTask::new)
    }
}
