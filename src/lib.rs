//! # Taskchef
//!
//! Build task trees from nested configuration documents.
//!
//! A task document is a mapping keyed by task names. Each entry either names a
//! recipe (a runnable unit of work), wires its children through a stream
//! (`merge`, `parallel`, `queue`, `pipe`), or delegates to other tasks. Values
//! flow down the tree: a child inherits everything its ancestors configure,
//! `src` globs and `dest` paths are joined with the parent's, and `{{...}}`
//! placeholders are resolved against the merged configuration right before a
//! task runs.
//!
//! ## Architecture Overview
//!
//! - **[`config`]**: task-name parsing, schema normalization, config sorting,
//!   glob/path joining and late-bound realization
//! - **[`task`]**: runners, the runner registry, the task factory that turns a
//!   document into registered tasks, and the scheduler that runs them
//! - **[`cli`]**: argument parsing, document loading and configuration discovery
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use taskchef::{ConfigValue, LocalScheduler, RunnerRegistry, RuntimeMode, TaskFactory, create_tasks};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let document: ConfigValue = serde_json::from_str(
//!         r#"{ "dest": "dist", "echo": "writing to {{dest.path}}" }"#,
//!     )?;
//!
//!     let scheduler = Arc::new(LocalScheduler::new());
//!     let factory = TaskFactory::new(Arc::new(RunnerRegistry::builtin()), scheduler.clone());
//!     create_tasks(&factory, &document)?;
//!
//!     scheduler.run("echo", RuntimeMode::All).await?;
//!     Ok(())
//! }
//! ```

/// Configuration values, schemas and the sort/realize pipeline.
pub mod config;

/// Task runners, streams, the task factory and scheduling.
pub mod task;

/// Command line interface.
pub mod cli;

/// File names and default locations.
pub mod env;

pub use config::{
    ConfigValue, ConfigurationError, RuntimeMode, Schema, SortedConfig, TaskConfig, TaskInfo,
    parse_task_name, realize, sort,
};
pub use task::{
    ConfigurableRunner, ConfigurableTask, LocalScheduler, RunnerRegistry, StreamRunner,
    TaskError, TaskFactory, TaskScheduler, TaskStream, create_tasks,
};
