use crate::config::{
    ConfigFn, ConfigMap, ConfigResult, ConfigValue, ConfigurationError, DEFAULT_CONSUMES,
    RuntimeMode, SortedConfig, TaskConfig, TaskInfo, Visibility, parse_task_name, realize,
    sort, sort_with_consumes,
};
use crate::task::metadata::MetadataTable;
use crate::task::registry::{RunnerKind, RunnerRegistry};
use crate::task::runner::{ConfigurableRunner, FnRunner, NoopRunner, StreamRunner};
use crate::task::scheduler::{HelpRunner, TaskScheduler};
use crate::task::types::{RunContext, TaskError, TaskId, TaskResult, TaskStream};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// A task built from one configuration node.
///
/// The resolved configuration is fixed at load time; every run realizes it
/// afresh with whatever the caller injects.
pub struct ConfigurableTask {
    pub id: TaskId,
    pub display_name: String,
    pub description: Option<String>,
    pub visibility: Visibility,
    pub runtime: RuntimeMode,
    pub depends: Vec<String>,
    pub config: Arc<TaskConfig>,
    runner: Arc<dyn ConfigurableRunner>,
}

impl ConfigurableTask {
    pub fn runner_name(&self) -> &str {
        self.runner.name()
    }

    pub fn is_visible(&self) -> bool {
        self.visibility == Visibility::Normal
    }

    /// Run with `injected` values filling in what the task's own config leaves unset.
    ///
    /// A task restricted to another build mode is skipped and passes the
    /// input stream through.
    pub async fn run(
        &self,
        ctx: &RunContext,
        injected: &ConfigValue,
        stream: Option<TaskStream>,
    ) -> TaskResult<Option<TaskStream>> {
        if !self.runtime.allows(ctx.mode) {
            debug!(
                "Skipping '{}': runs in {} mode only, current mode is {}",
                self.display_name, self.runtime, ctx.mode
            );
            return Ok(stream);
        }

        let ctx = ctx.entering(self.id, &self.display_name)?;
        let config = realize(&self.config.to_value(), injected, &self.runner.defaults());
        debug!("Running '{}' with runner '{}'", self.display_name, self.runner.name());
        self.runner
            .run(&ctx, &config, stream)
            .await
            .map_err(|e| e.within(&self.display_name))
    }

    /// Entry point used by the scheduler: the task's own config, no input stream
    pub async fn invoke(&self, ctx: &RunContext) -> TaskResult<Option<TaskStream>> {
        let own = self.config.to_value();
        self.run(ctx, &own, None).await
    }
}

impl fmt::Debug for ConfigurableTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigurableTask")
            .field("id", &self.id)
            .field("display_name", &self.display_name)
            .field("visibility", &self.visibility)
            .field("runtime", &self.runtime)
            .field("depends", &self.depends)
            .field("runner", &self.runner.name())
            .finish()
    }
}

/// Stream runner bound to the child tasks it combines
struct StreamNode {
    stream: Arc<dyn StreamRunner>,
    children: Vec<Arc<ConfigurableTask>>,
}

#[async_trait::async_trait]
impl ConfigurableRunner for StreamNode {
    fn name(&self) -> &str {
        self.stream.name()
    }

    fn description(&self) -> Option<&str> {
        self.stream.description()
    }

    async fn run(
        &self,
        ctx: &RunContext,
        config: &ConfigValue,
        stream: Option<TaskStream>,
    ) -> TaskResult<Option<TaskStream>> {
        self.stream.run(ctx, config, stream, &self.children).await
    }
}

/// Runs a registered task looked up by name when invoked
struct TaskReference {
    target: String,
}

#[async_trait::async_trait]
impl ConfigurableRunner for TaskReference {
    fn name(&self) -> &str {
        &self.target
    }

    async fn run(
        &self,
        ctx: &RunContext,
        config: &ConfigValue,
        stream: Option<TaskStream>,
    ) -> TaskResult<Option<TaskStream>> {
        let task = ctx
            .scheduler
            .task(&self.target)
            .ok_or_else(|| TaskError::UnknownTask(self.target.clone()))?;
        task.run(ctx, config, stream).await
    }
}

/// Runs several registered tasks through the `parallel` stream
struct TaskReferences {
    targets: Vec<String>,
    parallel: Arc<dyn StreamRunner>,
}

#[async_trait::async_trait]
impl ConfigurableRunner for TaskReferences {
    fn name(&self) -> &str {
        self.parallel.name()
    }

    async fn run(
        &self,
        ctx: &RunContext,
        config: &ConfigValue,
        stream: Option<TaskStream>,
    ) -> TaskResult<Option<TaskStream>> {
        let tasks = self
            .targets
            .iter()
            .map(|name| {
                ctx.scheduler
                    .task(name)
                    .ok_or_else(|| TaskError::UnknownTask(name.clone()))
            })
            .collect::<TaskResult<Vec<_>>>()?;
        self.parallel.run(ctx, config, stream, &tasks).await
    }
}

fn inline_runner(name: &str, body: ConfigFn) -> FnRunner {
    FnRunner::new(name, move |config, stream| {
        let mut output = stream.unwrap_or_default();
        let result = body.call(config);
        if !result.is_null() {
            output.push(result);
        }
        Ok(Some(output))
    })
}

/// Builds and registers tasks from configuration nodes
pub struct TaskFactory {
    registry: Arc<RunnerRegistry>,
    scheduler: Arc<dyn TaskScheduler>,
    metadata: MetadataTable,
}

impl TaskFactory {
    pub fn new(registry: Arc<RunnerRegistry>, scheduler: Arc<dyn TaskScheduler>) -> Self {
        Self {
            registry,
            scheduler,
            metadata: MetadataTable::new(),
        }
    }

    pub fn registry(&self) -> &RunnerRegistry {
        &self.registry
    }

    pub fn scheduler(&self) -> &Arc<dyn TaskScheduler> {
        &self.scheduler
    }

    pub fn metadata(&self) -> &MetadataTable {
        &self.metadata
    }

    /// Build the task for one configuration node and, recursively, its children.
    ///
    /// Returns `None` for a disabled node; nothing below it is processed.
    pub fn one(
        &self,
        prefix: &str,
        key: &str,
        raw: &ConfigValue,
        parent: &TaskConfig,
    ) -> ConfigResult<Option<Arc<ConfigurableTask>>> {
        let path = format!("{prefix}{}", key.trim());
        let task_info = parse_task_name(key).map_err(|e| e.at(path.as_str()))?;
        let schema = self.registry.schema_for(&task_info.name);

        let SortedConfig {
            mut task_info,
            task_config,
            sub_task_configs,
        } = sort(task_info, raw, parent, schema.as_ref()).map_err(|mut e| {
            // sort only knows the bare name
            e.task_path = Some(path.clone());
            e
        })?;

        if task_info.is_disabled() {
            debug!("Task '{}' is disabled, skipping it and its sub-tasks", path);
            return Ok(None);
        }

        let kind = self.registry.classify(&task_info.name, &sub_task_configs);
        let (runner, nodes) = match kind {
            RunnerKind::Recipe => {
                if !sub_task_configs.is_empty() {
                    warn!(
                        "Recipe '{}' ignores its sub-task configurations: {:?}",
                        path,
                        sub_task_configs.keys().collect::<Vec<_>>()
                    );
                }
                (self.registry.recipe(&task_info.name), Vec::new())
            }
            RunnerKind::Stream { explicit } => {
                self.stream_runner(prefix, &mut task_info, explicit, &task_config, &sub_task_configs)?
            }
            RunnerKind::Solo => self.solo_runner(&task_info, &path)?,
        };

        let runner = runner.unwrap_or_else(|| {
            warn!("{}", ConfigurationError::missing_runner(&task_info.name).at(path.as_str()));
            Arc::new(NoopRunner) as Arc<dyn ConfigurableRunner>
        });

        let task = Arc::new(self.create(prefix, &task_info, task_config, runner));
        self.metadata
            .set(task.id, &task_info.name, &task.display_name, kind, nodes);

        if task.is_visible() {
            self.scheduler
                .register_task(&task.display_name, task.depends.clone(), Arc::clone(&task));
        }
        Ok(Some(task))
    }

    /// Build every node of a sub-task configuration set, in order
    pub fn multiple(
        &self,
        prefix: &str,
        sub_task_configs: &ConfigMap,
        parent: &TaskConfig,
    ) -> ConfigResult<Vec<Arc<ConfigurableTask>>> {
        let mut tasks = Vec::with_capacity(sub_task_configs.len());
        for (key, raw) in sub_task_configs {
            if let Some(task) = self.one(prefix, key, raw, parent)? {
                tasks.push(task);
            }
        }
        Ok(tasks)
    }

    /// Wrap a runner into a task; the display name is `prefix` plus the task name
    pub fn create(
        &self,
        prefix: &str,
        task_info: &TaskInfo,
        task_config: TaskConfig,
        runner: Arc<dyn ConfigurableRunner>,
    ) -> ConfigurableTask {
        let name = if !task_info.name.is_empty() {
            task_info.name.as_str()
        } else if !runner.name().is_empty() {
            runner.name()
        } else {
            "<anonymous>"
        };

        ConfigurableTask {
            id: Uuid::new_v4(),
            display_name: format!("{prefix}{name}"),
            description: task_info
                .description
                .clone()
                .or_else(|| runner.description().map(str::to_string)),
            visibility: task_info.visibility,
            runtime: task_info.runtime,
            depends: task_info.depends.clone(),
            config: Arc::new(task_config),
            runner,
        }
    }

    /// Register the `help` task listing everything registered so far
    pub fn register_help(&self) -> Arc<ConfigurableTask> {
        let help = Arc::new(self.create(
            "",
            &TaskInfo::new("help"),
            TaskConfig::default(),
            Arc::new(HelpRunner),
        ));
        self.scheduler
            .register_task(&help.display_name, Vec::new(), Arc::clone(&help));
        help
    }

    fn stream_runner(
        &self,
        prefix: &str,
        task_info: &mut TaskInfo,
        explicit: bool,
        task_config: &TaskConfig,
        sub_task_configs: &ConfigMap,
    ) -> ConfigResult<(Option<Arc<dyn ConfigurableRunner>>, Vec<String>)> {
        let stream = if explicit {
            // named streams are plumbing, not entry points
            task_info.visibility = Visibility::Hidden;
            self.registry.stream(&task_info.name)
        } else {
            self.registry.stream("merge")
        };

        let child_prefix = if task_info.visibility == Visibility::Normal {
            format!("{prefix}{}:", task_info.name)
        } else {
            prefix.to_string()
        };

        let children = self.multiple(&child_prefix, sub_task_configs, task_config)?;
        let nodes = children.iter().map(|c| c.display_name.clone()).collect();

        let runner = stream.map(|stream| {
            Arc::new(StreamNode { stream, children }) as Arc<dyn ConfigurableRunner>
        });
        Ok((runner, nodes))
    }

    fn solo_runner(
        &self,
        task_info: &TaskInfo,
        path: &str,
    ) -> ConfigResult<(Option<Arc<dyn ConfigurableRunner>>, Vec<String>)> {
        match &task_info.task {
            Some(ConfigValue::String(target)) => Ok((
                Some(Arc::new(TaskReference {
                    target: target.clone(),
                }) as Arc<dyn ConfigurableRunner>),
                vec![target.clone()],
            )),
            Some(ConfigValue::Array(items)) => {
                let targets = items
                    .iter()
                    .map(|item| {
                        item.as_str().map(str::to_string).ok_or_else(|| {
                            ConfigurationError::validation(format!(
                                "task should list task names, found {}",
                                item.type_name()
                            ))
                            .at(path)
                        })
                    })
                    .collect::<ConfigResult<Vec<_>>>()?;
                let runner = self.registry.stream("parallel").map(|parallel| {
                    Arc::new(TaskReferences {
                        targets: targets.clone(),
                        parallel,
                    }) as Arc<dyn ConfigurableRunner>
                });
                Ok((runner, targets))
            }
            Some(ConfigValue::Function(body)) => Ok((
                Some(Arc::new(inline_runner(&task_info.name, body.clone()))
                    as Arc<dyn ConfigurableRunner>),
                Vec::new(),
            )),
            _ => Ok((self.registry.recipe("copy"), Vec::new())),
        }
    }
}

/// Build the whole task tree of a configuration document.
///
/// The root only consumes `src`, `dest` and `config`; every other key is a
/// top-level task. The `help` task is registered last.
pub fn create_tasks(
    factory: &TaskFactory,
    raw_root: &ConfigValue,
) -> ConfigResult<Vec<Arc<ConfigurableTask>>> {
    let root = sort_with_consumes(
        TaskInfo::default(),
        raw_root,
        &TaskConfig::default(),
        &DEFAULT_CONSUMES,
    )?;
    let tasks = factory.multiple("", &root.sub_task_configs, &root.task_config)?;
    factory.register_help();

    info!(
        "Created {} top-level tasks, {} registered",
        tasks.len(),
        factory.scheduler().task_names().len()
    );
    Ok(tasks)
}
