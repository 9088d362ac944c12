//! Built-in stream runners.
//!
//! `merge` and `parallel` start every child at once and wait for all of them,
//! `queue` runs children one after another on the same input and `pipe` feeds
//! each child's output into the next. Merged outputs always keep child order.

use crate::config::ConfigValue;
use crate::task::factory::ConfigurableTask;
use crate::task::runner::StreamRunner;
use crate::task::types::{RunContext, TaskResult, TaskStream};
use futures::future::try_join_all;
use std::sync::Arc;
use tracing::debug;

async fn run_concurrently(
    ctx: &RunContext,
    config: &ConfigValue,
    stream: Option<TaskStream>,
    tasks: &[Arc<ConfigurableTask>],
) -> TaskResult<Option<TaskStream>> {
    let outputs = try_join_all(
        tasks
            .iter()
            .map(|task| task.run(ctx, config, stream.clone())),
    )
    .await?;

    let mut merged = TaskStream::new();
    for output in outputs.into_iter().flatten() {
        merged.extend(output);
    }
    Ok(Some(merged))
}

/// Runs children concurrently and merges their outputs
#[derive(Debug, Clone, Copy, Default)]
pub struct MergeStream;

#[async_trait::async_trait]
impl StreamRunner for MergeStream {
    fn name(&self) -> &str {
        "merge"
    }

    fn description(&self) -> Option<&str> {
        Some("Run sub-tasks concurrently and merge their outputs.")
    }

    async fn run(
        &self,
        ctx: &RunContext,
        config: &ConfigValue,
        stream: Option<TaskStream>,
        tasks: &[Arc<ConfigurableTask>],
    ) -> TaskResult<Option<TaskStream>> {
        debug!("Merging {} sub-tasks", tasks.len());
        run_concurrently(ctx, config, stream, tasks).await
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ParallelStream;

#[async_trait::async_trait]
impl StreamRunner for ParallelStream {
    fn name(&self) -> &str {
        "parallel"
    }

    fn description(&self) -> Option<&str> {
        Some("Run tasks in parallel.")
    }

    async fn run(
        &self,
        ctx: &RunContext,
        config: &ConfigValue,
        stream: Option<TaskStream>,
        tasks: &[Arc<ConfigurableTask>],
    ) -> TaskResult<Option<TaskStream>> {
        debug!("Running {} tasks in parallel", tasks.len());
        run_concurrently(ctx, config, stream, tasks).await
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct QueueStream;

#[async_trait::async_trait]
impl StreamRunner for QueueStream {
    fn name(&self) -> &str {
        "queue"
    }

    fn description(&self) -> Option<&str> {
        Some("Run sub-tasks one by one and concatenate their outputs.")
    }

    async fn run(
        &self,
        ctx: &RunContext,
        config: &ConfigValue,
        stream: Option<TaskStream>,
        tasks: &[Arc<ConfigurableTask>],
    ) -> TaskResult<Option<TaskStream>> {
        let mut queued = TaskStream::new();
        for task in tasks {
            debug!("Queue: running '{}'", task.display_name);
            if let Some(output) = task.run(ctx, config, stream.clone()).await? {
                queued.extend(output);
            }
        }
        Ok(Some(queued))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PipeStream;

#[async_trait::async_trait]
impl StreamRunner for PipeStream {
    fn name(&self) -> &str {
        "pipe"
    }

    fn description(&self) -> Option<&str> {
        Some("Pipe each sub-task's output into the next one.")
    }

    async fn run(
        &self,
        ctx: &RunContext,
        config: &ConfigValue,
        stream: Option<TaskStream>,
        tasks: &[Arc<ConfigurableTask>],
    ) -> TaskResult<Option<TaskStream>> {
        let mut current = stream;
        for task in tasks {
            debug!("Pipe: running '{}'", task.display_name);
            current = task.run(ctx, config, current).await?;
        }
        Ok(current)
    }
}
