use crate::config::{ConfigValue, RuntimeMode};
use crate::task::scheduler::TaskScheduler;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// Unique identifier for configurable tasks
pub type TaskId = Uuid;

/// Values flowing from one runner into the next.
///
/// Stream runners combine the outputs of their children; a recipe receives
/// the upstream items and may append its own.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskStream {
    items: Vec<ConfigValue>,
}

impl TaskStream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_items(items: Vec<ConfigValue>) -> Self {
        Self { items }
    }

    pub fn push(&mut self, item: impl Into<ConfigValue>) {
        self.items.push(item.into());
    }

    /// Append everything from `other`, keeping its order
    pub fn extend(&mut self, other: TaskStream) {
        self.items.extend(other.items);
    }

    pub fn items(&self) -> &[ConfigValue] {
        &self.items
    }

    pub fn into_items(self) -> Vec<ConfigValue> {
        self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Everything a running task can reach besides its own configuration
#[derive(Clone)]
pub struct RunContext {
    pub scheduler: Arc<dyn TaskScheduler>,
    /// Build mode in effect; tasks restricted to another mode are skipped
    pub mode: RuntimeMode,
    /// Tasks currently running, outermost first
    active: Vec<(TaskId, String)>,
}

impl RunContext {
    pub fn new(scheduler: Arc<dyn TaskScheduler>, mode: RuntimeMode) -> Self {
        Self {
            scheduler,
            mode,
            active: Vec::new(),
        }
    }

    /// Context for running task `id` inside the current one.
    ///
    /// Fails when `id` is already running further up, which only happens when
    /// tasks delegate to each other in a loop.
    pub fn entering(&self, id: TaskId, name: &str) -> TaskResult<RunContext> {
        if self.active.iter().any(|(active, _)| *active == id) {
            let chain: Vec<&str> = self.active.iter().map(|(_, n)| n.as_str()).collect();
            return Err(TaskError::failed(
                name,
                format!("circular task reference: {} -> {}", chain.join(" -> "), name),
            ));
        }
        let mut next = self.clone();
        next.active.push((id, name.to_string()));
        Ok(next)
    }

    /// Names of the running tasks, outermost first
    pub fn running(&self) -> Vec<&str> {
        self.active.iter().map(|(_, name)| name.as_str()).collect()
    }
}

impl fmt::Debug for RunContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunContext")
            .field("tasks", &self.scheduler.task_names().len())
            .field("mode", &self.mode)
            .field("running", &self.running())
            .finish()
    }
}

/// Task execution errors
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("Task '{task}' failed: {message}")]
    Failed { task: String, message: String },

    #[error("Task '{0}' is not registered")]
    UnknownTask(String),
}

impl TaskError {
    pub fn failed(task: impl Into<String>, message: impl Into<String>) -> Self {
        TaskError::Failed {
            task: task.into(),
            message: message.into(),
        }
    }

    /// Prefix a failure with the name of the task it passed through
    pub fn within(self, task: &str) -> Self {
        match self {
            TaskError::Failed {
                task: inner,
                message,
            } if inner != task => TaskError::Failed {
                task: format!("{task} > {inner}"),
                message,
            },
            other => other,
        }
    }
}

pub type TaskResult<T> = Result<T, TaskError>;
