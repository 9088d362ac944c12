use crate::config::{ConfigValue, Schema, SchemaType};
use crate::task::factory::ConfigurableTask;
use crate::task::types::{RunContext, TaskResult, TaskStream};
use std::fmt;
use std::sync::{Arc, LazyLock};
use tracing::info;

/// A task body that runs with a realized configuration.
///
/// Recipes implement this directly; the factory also wraps streams, task
/// references and inline functions behind it so every task runs the same way.
#[async_trait::async_trait]
pub trait ConfigurableRunner: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> Option<&str> {
        None
    }

    /// Schema used to sort this runner's configuration
    fn schema(&self) -> Option<&Schema> {
        None
    }

    /// Lowest-precedence values merged in when the configuration is realized
    fn defaults(&self) -> ConfigValue {
        ConfigValue::Null
    }

    async fn run(
        &self,
        ctx: &RunContext,
        config: &ConfigValue,
        stream: Option<TaskStream>,
    ) -> TaskResult<Option<TaskStream>>;
}

/// A combinator deciding how a node's child tasks run
#[async_trait::async_trait]
pub trait StreamRunner: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> Option<&str> {
        None
    }

    fn schema(&self) -> Option<&Schema> {
        None
    }

    async fn run(
        &self,
        ctx: &RunContext,
        config: &ConfigValue,
        stream: Option<TaskStream>,
        tasks: &[Arc<ConfigurableTask>],
    ) -> TaskResult<Option<TaskStream>>;
}

type RunFn =
    dyn Fn(&ConfigValue, Option<TaskStream>) -> TaskResult<Option<TaskStream>> + Send + Sync;

/// Runner backed by a synchronous closure
#[derive(Clone)]
pub struct FnRunner {
    name: String,
    description: Option<String>,
    schema: Option<Schema>,
    defaults: ConfigValue,
    body: Arc<RunFn>,
}

impl FnRunner {
    pub fn new<F>(name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&ConfigValue, Option<TaskStream>) -> TaskResult<Option<TaskStream>>
            + Send
            + Sync
            + 'static,
    {
        Self {
            name: name.into(),
            description: None,
            schema: None,
            defaults: ConfigValue::Null,
            body: Arc::new(body),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_schema(mut self, schema: Schema) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn with_defaults(mut self, defaults: ConfigValue) -> Self {
        self.defaults = defaults;
        self
    }
}

impl fmt::Debug for FnRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnRunner").field("name", &self.name).finish()
    }
}

#[async_trait::async_trait]
impl ConfigurableRunner for FnRunner {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    fn schema(&self) -> Option<&Schema> {
        self.schema.as_ref()
    }

    fn defaults(&self) -> ConfigValue {
        self.defaults.clone()
    }

    async fn run(
        &self,
        _ctx: &RunContext,
        config: &ConfigValue,
        stream: Option<TaskStream>,
    ) -> TaskResult<Option<TaskStream>> {
        (self.body)(config, stream)
    }
}

/// Stand-in for a task whose runner could not be inferred
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopRunner;

#[async_trait::async_trait]
impl ConfigurableRunner for NoopRunner {
    fn name(&self) -> &str {
        "noop"
    }

    async fn run(
        &self,
        _ctx: &RunContext,
        _config: &ConfigValue,
        stream: Option<TaskStream>,
    ) -> TaskResult<Option<TaskStream>> {
        Ok(stream)
    }
}

static ECHO_SCHEMA: LazyLock<Schema> = LazyLock::new(|| {
    Schema::new()
        .titled("echo")
        .described("Print a message.")
        .property(
            "message",
            Schema::new()
                .described("Text to print, placeholders are resolved at run time.")
                .of_type(SchemaType::String),
        )
        .primary("message")
});

/// Built-in recipe printing its realized `message`
#[derive(Debug, Clone, Copy, Default)]
pub struct EchoRecipe;

#[async_trait::async_trait]
impl ConfigurableRunner for EchoRecipe {
    fn name(&self) -> &str {
        "echo"
    }

    fn description(&self) -> Option<&str> {
        ECHO_SCHEMA.description.as_deref()
    }

    fn schema(&self) -> Option<&Schema> {
        Some(&*ECHO_SCHEMA)
    }

    async fn run(
        &self,
        _ctx: &RunContext,
        config: &ConfigValue,
        stream: Option<TaskStream>,
    ) -> TaskResult<Option<TaskStream>> {
        let message = config
            .get("message")
            .map(ConfigValue::to_template_string)
            .unwrap_or_default();
        info!("echo: {}", message);
        println!("{message}");

        let mut output = stream.unwrap_or_default();
        output.push(message);
        Ok(Some(output))
    }
}
