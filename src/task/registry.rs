use crate::config::{ConfigMap, Schema};
use crate::task::runner::{ConfigurableRunner, EchoRecipe, StreamRunner};
use crate::task::streams::{MergeStream, ParallelStream, PipeStream, QueueStream};
use indexmap::IndexMap;
use std::sync::Arc;
use tracing::warn;

/// Named runners of one kind, in registration order
pub struct RunnerPool<T: ?Sized> {
    runners: IndexMap<String, Arc<T>>,
}

impl<T: ?Sized> RunnerPool<T> {
    pub fn new() -> Self {
        Self {
            runners: IndexMap::new(),
        }
    }

    pub fn insert(&mut self, name: impl Into<String>, runner: Arc<T>) {
        let name = name.into();
        if self.runners.insert(name.clone(), runner).is_some() {
            warn!("Runner '{}' registered twice, keeping the last one", name);
        }
    }

    pub fn lookup(&self, name: &str) -> Option<Arc<T>> {
        self.runners.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.runners.contains_key(name)
    }
}

impl<T: ?Sized> Default for RunnerPool<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// How a configuration node will be run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerKind {
    /// A registered recipe with the node's name; sub-task configs are ignored
    Recipe,
    /// Children run through a stream runner, either named explicitly or the implicit `merge`
    Stream { explicit: bool },
    /// Delegates through the `task` property, or falls back to `copy`
    Solo,
}

impl RunnerKind {
    pub fn label(&self) -> &'static str {
        match self {
            RunnerKind::Recipe => "recipe",
            RunnerKind::Stream { .. } => "stream",
            RunnerKind::Solo => "solo",
        }
    }
}

/// Recipes and streams available to a task factory
#[derive(Default)]
pub struct RunnerRegistry {
    pub streams: RunnerPool<dyn StreamRunner>,
    pub recipes: RunnerPool<dyn ConfigurableRunner>,
}

impl RunnerRegistry {
    pub fn builder() -> RunnerRegistryBuilder {
        RunnerRegistryBuilder::default()
    }

    /// Registry holding only the built-in streams and recipes
    pub fn builtin() -> Self {
        Self::builder().with_builtins().build()
    }

    pub fn stream(&self, name: &str) -> Option<Arc<dyn StreamRunner>> {
        self.streams.lookup(name)
    }

    pub fn recipe(&self, name: &str) -> Option<Arc<dyn ConfigurableRunner>> {
        self.recipes.lookup(name)
    }

    /// Schema of the stream or recipe named `name`, streams first
    pub fn schema_for(&self, name: &str) -> Option<Schema> {
        if let Some(stream) = self.streams.lookup(name) {
            return stream.schema().cloned();
        }
        self.recipes
            .lookup(name)
            .and_then(|recipe| recipe.schema().cloned())
    }

    pub fn classify(&self, name: &str, sub_task_configs: &ConfigMap) -> RunnerKind {
        if self.recipes.contains(name) {
            RunnerKind::Recipe
        } else if self.streams.contains(name) {
            RunnerKind::Stream { explicit: true }
        } else if !sub_task_configs.is_empty() {
            RunnerKind::Stream { explicit: false }
        } else {
            RunnerKind::Solo
        }
    }
}

#[derive(Default)]
pub struct RunnerRegistryBuilder {
    streams: RunnerPool<dyn StreamRunner>,
    recipes: RunnerPool<dyn ConfigurableRunner>,
}

impl RunnerRegistryBuilder {
    pub fn stream(mut self, runner: Arc<dyn StreamRunner>) -> Self {
        self.streams.insert(runner.name().to_string(), runner);
        self
    }

    pub fn recipe(mut self, runner: Arc<dyn ConfigurableRunner>) -> Self {
        self.recipes.insert(runner.name().to_string(), runner);
        self
    }

    /// Register `merge`, `parallel`, `queue`, `pipe` and `echo`
    pub fn with_builtins(self) -> Self {
        self.stream(Arc::new(MergeStream))
            .stream(Arc::new(ParallelStream))
            .stream(Arc::new(QueueStream))
            .stream(Arc::new(PipeStream))
            .recipe(Arc::new(EchoRecipe))
    }

    pub fn build(self) -> RunnerRegistry {
        RunnerRegistry {
            streams: self.streams,
            recipes: self.recipes,
        }
    }
}
