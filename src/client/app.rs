use std::fmt;
use tracing::{debug, warn};

use super::api::TaskApi;
use super::error::ClientError;
use crate::model::{Task, TaskId};

const PLACEHOLDER: &str = "Add your new todo";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Initial,
    Loading,
    Loaded,
    /// The first load failed; nothing from the server is displayed yet.
    Failed,
}

/// Sequence number of a list fetch. Only a fetch newer than the last applied
/// one, and issued after the last local mutation, may replace the list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct FetchTicket(u64);

/// In-memory mirror of the server's task list plus the input field.
///
/// Mutations update the local list as soon as the server confirms them and
/// then refetch; list responses that were in flight across a mutation are
/// discarded instead of overwriting newer state.
pub struct TodoApp<A> {
    api: A,
    tasks: Vec<Task>,
    input: String,
    phase: Phase,
    last_error: Option<String>,
    issued: u64,
    applied: u64,
}

impl<A: TaskApi> TodoApp<A> {
    pub fn new(api: A) -> Self {
        Self {
            api,
            tasks: Vec::new(),
            input: String::new(),
            phase: Phase::Initial,
            last_error: None,
            issued: 0,
            applied: 0,
        }
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    /// The add affordance is disabled for blank input.
    pub fn can_add(&self) -> bool {
        !self.input.trim().is_empty()
    }

    pub fn begin_fetch(&mut self) -> FetchTicket {
        self.issued += 1;
        FetchTicket(self.issued)
    }

    /// Applies the outcome of the fetch identified by `ticket`. Returns false
    /// when the response is stale and was dropped.
    pub fn apply_fetch(
        &mut self,
        ticket: FetchTicket,
        result: Result<Vec<Task>, ClientError>,
    ) -> bool {
        if ticket.0 <= self.applied {
            debug!(ticket = ticket.0, applied = self.applied, "Discarding stale task list.");
            return false;
        }
        self.applied = ticket.0;
        match result {
            Ok(tasks) => {
                self.tasks = tasks;
                self.phase = Phase::Loaded;
                self.last_error = None;
            }
            Err(err) => {
                warn!(reason = %err, "Unable to load tasks.");
                if self.phase != Phase::Loaded {
                    self.phase = Phase::Failed;
                }
                self.last_error = Some(err.to_string());
            }
        }
        true
    }

    // every fetch issued so far predates the mutation that just landed
    fn invalidate_fetches(&mut self) {
        self.applied = self.issued;
    }

    /// First render: load the list from the server.
    pub async fn mount(&mut self) {
        if self.phase == Phase::Initial {
            self.phase = Phase::Loading;
        }
        self.refresh().await;
    }

    pub async fn refresh(&mut self) -> bool {
        let ticket = self.begin_fetch();
        let result = self.api.list_tasks().await;
        self.apply_fetch(ticket, result)
    }

    /// Creates a task from the current input. Blank input is ignored.
    pub async fn add(&mut self) -> Option<Task> {
        if !self.can_add() {
            return None;
        }
        match self.api.create_task(&self.input).await {
            Ok(task) => {
                self.invalidate_fetches();
                self.tasks.insert(0, task.clone());
                self.phase = Phase::Loaded;
                self.input.clear();
                self.last_error = None;
                self.refresh().await;
                Some(task)
            }
            Err(err) => {
                warn!(reason = %err, "Unable to add task.");
                self.last_error = Some(err.to_string());
                None
            }
        }
    }

    pub async fn remove(&mut self, id: TaskId) -> bool {
        match self.api.delete_task(id).await {
            Ok(()) => {
                self.invalidate_fetches();
                self.tasks.retain(|task| task.id != id);
                self.phase = Phase::Loaded;
                self.last_error = None;
                self.refresh().await;
                true
            }
            Err(err) => {
                warn!(reason = %err, id = %id, "Unable to remove task.");
                self.last_error = Some(err.to_string());
                false
            }
        }
    }

    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl<A: TaskApi> fmt::Display for TodoApp<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Todo App")?;

        let (field, button) = match (self.input.is_empty(), self.can_add()) {
            (true, _) => (PLACEHOLDER, "[ ]"),
            (false, true) => (self.input.as_str(), "[+]"),
            (false, false) => (self.input.as_str(), "[ ]"),
        };
        writeln!(f, "> {} {}", field, button)?;

        match self.phase {
            Phase::Initial | Phase::Loading => writeln!(f, "  loading...")?,
            Phase::Failed => {}
            Phase::Loaded if self.tasks.is_empty() => writeln!(f, "  (no tasks)")?,
            Phase::Loaded => {
                for task in &self.tasks {
                    writeln!(f, "  #{} {} [X]", task.id, task.content)?;
                }
            }
        }

        if let Some(err) = &self.last_error {
            writeln!(f, "! {}", err)?;
        }
        Ok(())
    }
}
