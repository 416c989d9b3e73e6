//! Client side of the todo list: an HTTP client for the API and the UI state
//! that mirrors the server's list.

mod api;
mod app;
mod command;
mod error;

pub use self::api::{TaskApi, TaskClient};
pub use self::app::{FetchTicket, Phase, TodoApp};
pub use self::command::{Command, HELP};
pub use self::error::ClientError;
