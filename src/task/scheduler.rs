use crate::config::{ConfigValue, RuntimeMode};
use crate::task::factory::ConfigurableTask;
use crate::task::runner::ConfigurableRunner;
use crate::task::types::{RunContext, TaskError, TaskResult, TaskStream};
use dashmap::DashMap;
use std::fmt::Write;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Registry of runnable tasks, addressed by their full name
pub trait TaskScheduler: Send + Sync {
    fn register_task(&self, name: &str, depends: Vec<String>, task: Arc<ConfigurableTask>);

    fn task(&self, name: &str) -> Option<Arc<ConfigurableTask>>;

    fn task_names(&self) -> Vec<String>;
}

struct RegisteredTask {
    depends: Vec<String>,
    task: Arc<ConfigurableTask>,
}

/// In-process scheduler running a task's dependencies before the task itself
#[derive(Default)]
pub struct LocalScheduler {
    tasks: DashMap<String, RegisteredTask>,
}

impl LocalScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Dependencies first, each task once, `name` last
    pub fn execution_order(&self, name: &str) -> TaskResult<Vec<String>> {
        let mut order = Vec::new();
        let mut visiting = Vec::new();
        self.visit(name, &mut visiting, &mut order)?;
        Ok(order)
    }

    fn visit(
        &self,
        name: &str,
        visiting: &mut Vec<String>,
        order: &mut Vec<String>,
    ) -> TaskResult<()> {
        if order.iter().any(|done| done == name) {
            return Ok(());
        }
        if visiting.iter().any(|pending| pending == name) {
            return Err(TaskError::failed(
                name,
                format!("circular dependency: {} -> {}", visiting.join(" -> "), name),
            ));
        }

        let depends = self
            .tasks
            .get(name)
            .map(|entry| entry.depends.clone())
            .ok_or_else(|| TaskError::UnknownTask(name.to_string()))?;

        visiting.push(name.to_string());
        for dependency in &depends {
            self.visit(dependency, visiting, order)?;
        }
        visiting.pop();
        order.push(name.to_string());
        Ok(())
    }

    /// Run `name` after its dependencies, returning the task's output
    pub async fn run(self: &Arc<Self>, name: &str, mode: RuntimeMode) -> TaskResult<Option<TaskStream>> {
        let scheduler: Arc<dyn TaskScheduler> = self.clone();
        let ctx = RunContext::new(scheduler, mode);

        let order = self.execution_order(name)?;
        debug!("Execution order for '{}': {:?}", name, order);

        let mut output = None;
        for task_name in order {
            let task = self
                .task(&task_name)
                .ok_or_else(|| TaskError::UnknownTask(task_name.clone()))?;
            info!("Starting '{}'", task_name);
            output = task.invoke(&ctx).await.inspect_err(|e| {
                error!("'{}' errored: {}", task_name, e);
            })?;
            info!("Finished '{}'", task_name);
        }
        Ok(output)
    }
}

impl TaskScheduler for LocalScheduler {
    fn register_task(&self, name: &str, depends: Vec<String>, task: Arc<ConfigurableTask>) {
        let replaced = self
            .tasks
            .insert(name.to_string(), RegisteredTask { depends, task })
            .is_some();
        if replaced {
            warn!("Task '{}' was already registered and has been replaced", name);
        } else {
            debug!("Registered task '{}'", name);
        }
    }

    fn task(&self, name: &str) -> Option<Arc<ConfigurableTask>> {
        self.tasks.get(name).map(|entry| Arc::clone(&entry.task))
    }

    fn task_names(&self) -> Vec<String> {
        self.tasks.iter().map(|entry| entry.key().clone()).collect()
    }
}

/// Registered tasks in alphabetical order, each followed by its description
pub fn help_listing(scheduler: &dyn TaskScheduler) -> String {
    let mut names = scheduler.task_names();
    names.sort();

    let mut listing = String::new();
    for name in names {
        let description = scheduler
            .task(&name)
            .and_then(|task| task.description.clone())
            .unwrap_or_else(|| "(no description)".to_string());
        let _ = writeln!(listing, "{name}\n  {description}\n");
    }
    listing
}

/// Runner behind the `help` task
#[derive(Debug, Clone, Copy, Default)]
pub struct HelpRunner;

#[async_trait::async_trait]
impl ConfigurableRunner for HelpRunner {
    fn name(&self) -> &str {
        "help"
    }

    fn description(&self) -> Option<&str> {
        Some("List registered tasks with their descriptions.")
    }

    async fn run(
        &self,
        ctx: &RunContext,
        _config: &ConfigValue,
        stream: Option<TaskStream>,
    ) -> TaskResult<Option<TaskStream>> {
        let listing = help_listing(ctx.scheduler.as_ref());
        print!("{listing}");

        let mut output = stream.unwrap_or_default();
        output.push(listing);
        Ok(Some(output))
    }
}
