#[cfg(test)]
mod tests {
    use crate::config::{ConfigMap, ConfigValue, RuntimeMode, Schema, TaskConfig, Visibility};
    use crate::task::*;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    type RunLog = Arc<Mutex<Vec<String>>>;

    /// Recipe pushing its name plus the realized `suffix` and logging the run
    fn tag_recipe(name: &'static str, log: RunLog) -> Arc<dyn ConfigurableRunner> {
        Arc::new(
            FnRunner::new(name, move |config, stream| {
                let suffix = config
                    .get("suffix")
                    .map(ConfigValue::to_template_string)
                    .unwrap_or_default();
                log.lock().unwrap().push(name.to_string());
                let mut output = stream.unwrap_or_default();
                output.push(format!("{name}{suffix}"));
                Ok(Some(output))
            })
            .with_schema(Schema::declaring(["suffix"])),
        )
    }

    fn setup() -> (Arc<LocalScheduler>, TaskFactory, RunLog) {
        let log: RunLog = Arc::new(Mutex::new(Vec::new()));
        let registry = RunnerRegistry::builder()
            .with_builtins()
            .recipe(tag_recipe("one", log.clone()))
            .recipe(tag_recipe("two", log.clone()))
            .recipe(tag_recipe("three", log.clone()))
            .build();
        let scheduler = Arc::new(LocalScheduler::new());
        let factory = TaskFactory::new(Arc::new(registry), scheduler.clone());
        (scheduler, factory, log)
    }

    fn build(factory: &TaskFactory, document: serde_json::Value) -> Vec<Arc<ConfigurableTask>> {
        create_tasks(factory, &ConfigValue::from(document)).unwrap()
    }

    fn names(scheduler: &LocalScheduler) -> Vec<String> {
        let mut names = scheduler.task_names();
        names.sort();
        names
    }

    fn items(stream: Option<TaskStream>) -> Vec<ConfigValue> {
        stream.map(TaskStream::into_items).unwrap_or_default()
    }

    fn strings(values: &[&str]) -> Vec<ConfigValue> {
        values.iter().map(|v| ConfigValue::from(*v)).collect()
    }

    #[test]
    fn test_implicit_merge_extends_prefix() {
        let (scheduler, factory, _) = setup();
        build(&factory, json!({ "build": { "scripts": { "one": {} } } }));

        assert_eq!(
            names(&scheduler),
            vec!["build", "build:scripts", "build:scripts:one", "help"]
        );
    }

    #[test]
    fn test_disabled_node_drops_its_subtree() {
        let (scheduler, factory, _) = setup();
        let tasks = build(&factory, json!({ "#legacy": { "one": {} }, "two": {} }));

        assert_eq!(tasks.len(), 1);
        assert_eq!(names(&scheduler), vec!["help", "two"]);
    }

    #[test]
    fn test_hidden_node_is_built_but_not_registered() {
        let (scheduler, factory, _) = setup();
        let tasks = build(&factory, json!({ ".internal": { "one": {} } }));

        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].visibility, Visibility::Hidden);
        assert_eq!(names(&scheduler), vec!["help", "one"]);
    }

    #[test]
    fn test_explicit_stream_is_hidden_and_keeps_prefix() {
        let (scheduler, factory, _) = setup();
        build(&factory, json!({ "build": { "queue": { "one": {}, "two": {} } } }));

        assert_eq!(names(&scheduler), vec!["build", "build:one", "build:two", "help"]);
    }

    #[test]
    fn test_unresolvable_task_does_nothing() {
        let (scheduler, factory, _) = setup();
        build(&factory, json!({ "lonely": {} }));

        let task = scheduler.task("lonely").unwrap();
        assert_eq!(task.runner_name(), "noop");
    }

    #[test]
    fn test_recipe_ignores_sub_task_configs() {
        let (scheduler, factory, _) = setup();
        build(&factory, json!({ "one": { "extra": { "suffix": "!" } } }));

        assert_eq!(names(&scheduler), vec!["help", "one"]);
    }

    #[test]
    fn test_invalid_task_name_fails_loading() {
        let (_, factory, _) = setup();
        let error = create_tasks(&factory, &ConfigValue::from(json!({ "a/b": {} }))).unwrap_err();
        assert_eq!(error.kind, crate::config::ErrorKind::Syntax);
        assert_eq!(error.task_path.as_deref(), Some("a/b"));
    }

    #[test]
    fn test_validation_error_carries_full_path() {
        let (_, factory, _) = setup();
        let error = create_tasks(
            &factory,
            &ConfigValue::from(json!({ "build": { "minify": { "src": { "base": "lib" } } } })),
        )
        .unwrap_err();
        assert_eq!(error.kind, crate::config::ErrorKind::Validation);
        assert_eq!(error.task_path.as_deref(), Some("build:minify"));
    }

    #[test]
    fn test_metadata_records_children() {
        let (scheduler, factory, _) = setup();
        build(&factory, json!({ "build": { "one": {}, "two": {} } }));

        let build = scheduler.task("build").unwrap();
        let meta = factory.metadata().get(&build.id).unwrap();
        assert_eq!(meta.kind, RunnerKind::Stream { explicit: false });
        assert_eq!(meta.nodes, vec!["build:one", "build:two"]);
        assert!(meta.branch);

        let tree = factory.metadata().render_tree(&["build".to_string()]);
        assert_eq!(
            tree,
            "build (stream)\n  build:one (recipe)\n  build:two (recipe)\n"
        );
    }

    #[test]
    fn test_description_falls_back_to_runner() {
        let (scheduler, factory, _) = setup();
        build(&factory, json!({ "echo": "hi", "build": { "description": "Build all", "one": {} } }));

        assert_eq!(
            scheduler.task("echo").unwrap().description.as_deref(),
            Some("Print a message.")
        );
        assert_eq!(
            scheduler.task("build").unwrap().description.as_deref(),
            Some("Build all")
        );
    }

    #[test]
    fn test_help_listing_is_alphabetical() {
        let (scheduler, factory, _) = setup();
        build(
            &factory,
            json!({ "zeta": { "description": "last one", "task": "alpha" }, "alpha": { "task": "zeta" } }),
        );

        assert_eq!(
            help_listing(scheduler.as_ref()),
            "alpha\n  (no description)\n\n\
             help\n  List registered tasks with their descriptions.\n\n\
             zeta\n  last one\n\n"
        );
    }

    #[tokio::test]
    async fn test_dependencies_run_first() {
        let (scheduler, factory, log) = setup();
        build(
            &factory,
            json!({ "one": { "depends": ["two", "three"] }, "two": { "depends": "three" }, "three": {} }),
        );

        let output = scheduler.run("one", RuntimeMode::All).await.unwrap();

        assert_eq!(*log.lock().unwrap(), vec!["three", "two", "one"]);
        assert_eq!(items(output), strings(&["one"]));
    }

    #[tokio::test]
    async fn test_circular_and_unknown_dependencies() {
        let (scheduler, factory, _) = setup();
        build(&factory, json!({ "one": { "depends": "two" }, "two": { "depends": "one" } }));

        let error = scheduler.run("one", RuntimeMode::All).await.unwrap_err();
        assert!(error.to_string().contains("circular dependency"), "{error}");

        let error = scheduler.run("missing", RuntimeMode::All).await.unwrap_err();
        assert!(matches!(error, TaskError::UnknownTask(name) if name == "missing"));
    }

    #[tokio::test]
    async fn test_delegating_tasks_in_a_loop_fail() {
        let (scheduler, factory, _) = setup();
        build(&factory, json!({ "a": { "task": "b" }, "b": { "task": "a" } }));

        let error = scheduler.run("a", RuntimeMode::All).await.unwrap_err();
        assert_eq!(
            error.to_string(),
            "Task 'a > b > a' failed: circular task reference: a -> b -> a"
        );
    }

    #[tokio::test]
    async fn test_task_lists_in_a_loop_fail() {
        let (scheduler, factory, _) = setup();
        build(&factory, json!({ "a": ["b", "one"], "b": ["a"], "one": {} }));

        let error = scheduler.run("b", RuntimeMode::All).await.unwrap_err();
        assert!(
            error.to_string().contains("circular task reference: b -> a -> b"),
            "{error}"
        );
    }

    #[tokio::test]
    async fn test_shared_delegate_target_is_not_a_loop() {
        let (scheduler, factory, log) = setup();
        build(
            &factory,
            json!({
                "one": {},
                "left": { "task": "one" },
                "right": { "task": "one" },
                "both": ["left", "right"]
            }),
        );

        let output = scheduler.run("both", RuntimeMode::All).await.unwrap();
        assert_eq!(items(output), strings(&["one", "one"]));
        assert_eq!(log.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_run_context_tracks_running_tasks() {
        let scheduler: Arc<dyn TaskScheduler> = Arc::new(LocalScheduler::new());
        let ctx = RunContext::new(scheduler, RuntimeMode::All);
        let outer = uuid::Uuid::new_v4();

        let inner = ctx.entering(outer, "build").unwrap();
        let inner = inner.entering(uuid::Uuid::new_v4(), "build:scripts").unwrap();
        assert_eq!(inner.running(), vec!["build", "build:scripts"]);
        assert!(ctx.running().is_empty());

        let error = inner.entering(outer, "build").unwrap_err();
        assert!(matches!(error, TaskError::Failed { ref task, .. } if task == "build"));
    }

    #[tokio::test]
    async fn test_runtime_mode_skips_task() {
        let (scheduler, factory, log) = setup();
        build(&factory, json!({ "one": {}, "deploy!": { "task": "one" } }));

        let skipped = scheduler
            .run("deploy", RuntimeMode::Development)
            .await
            .unwrap();
        assert!(skipped.is_none());
        assert!(log.lock().unwrap().is_empty());

        let output = scheduler
            .run("deploy", RuntimeMode::Production)
            .await
            .unwrap();
        assert_eq!(items(output), strings(&["one"]));
    }

    #[tokio::test]
    async fn test_task_reference_receives_injected_config() {
        let (scheduler, factory, _) = setup();
        build(
            &factory,
            json!({ "one": {}, "loud": { "task": "one", "suffix": "!" } }),
        );

        let output = scheduler.run("loud", RuntimeMode::All).await.unwrap();
        assert_eq!(items(output), strings(&["one!"]));
    }

    #[tokio::test]
    async fn test_task_list_runs_in_parallel() {
        let (scheduler, factory, log) = setup();
        build(&factory, json!({ "one": {}, "two": {}, "both": ["one", "two"] }));

        let output = scheduler.run("both", RuntimeMode::All).await.unwrap();

        assert_eq!(items(output), strings(&["one", "two"]));
        let mut ran = log.lock().unwrap().clone();
        ran.sort();
        assert_eq!(ran, vec!["one", "two"]);
    }

    #[tokio::test]
    async fn test_inline_function_task() {
        let (scheduler, factory, _) = setup();
        let mut raw = ConfigMap::new();
        raw.insert(
            "task".to_string(),
            ConfigValue::function(|config| {
                let version = config.get("version").and_then(ConfigValue::as_str).unwrap_or("?");
                ConfigValue::from(format!("v{version}"))
            }),
        );
        raw.insert("version".to_string(), "1.0".into());

        factory
            .one("", "stamp", &ConfigValue::Object(raw), &TaskConfig::default())
            .unwrap()
            .unwrap();

        let output = scheduler.run("stamp", RuntimeMode::All).await.unwrap();
        assert_eq!(items(output), strings(&["v1.0"]));
    }

    #[tokio::test]
    async fn test_children_inherit_stream_config() {
        let (scheduler, factory, _) = setup();
        build(
            &factory,
            json!({ "build": { "config": { "suffix": "-dev" }, "one": {}, "two": { "suffix": "-x" } } }),
        );

        let output = scheduler.run("build", RuntimeMode::All).await.unwrap();
        assert_eq!(items(output), strings(&["one-dev", "two-x"]));
    }

    #[tokio::test]
    async fn test_queue_and_pipe_ordering() {
        let (scheduler, factory, _) = setup();
        let tasks = build(
            &factory,
            json!({ "queue": { "one": {}, "two": {} }, ".chain": { "pipe": { "three": {}, "one": {} } } }),
        );
        let ctx = RunContext::new(scheduler.clone(), RuntimeMode::All);
        let input = || Some(TaskStream::from_items(strings(&["x"])));

        let queued = tasks[0].run(&ctx, &ConfigValue::Null, input()).await.unwrap();
        assert_eq!(items(queued), strings(&["x", "one", "x", "two"]));

        let piped = tasks[1].run(&ctx, &ConfigValue::Null, input()).await.unwrap();
        assert_eq!(items(piped), strings(&["x", "three", "one"]));
    }

    #[tokio::test]
    async fn test_echo_recipe_realizes_message() {
        let (scheduler, factory, _) = setup();
        build(
            &factory,
            json!({ "dest": "dist", "echo": "writing to {{dest.path}}" }),
        );

        let output = scheduler.run("echo", RuntimeMode::All).await.unwrap();
        assert_eq!(items(output), strings(&["writing to dist"]));
    }

    #[tokio::test]
    async fn test_failure_names_the_task_chain() {
        let registry = RunnerRegistry::builder()
            .with_builtins()
            .recipe(Arc::new(FnRunner::new("boom", |_, _| {
                Err(TaskError::failed("boom", "exploded"))
            })))
            .build();
        let scheduler = Arc::new(LocalScheduler::new());
        let factory = TaskFactory::new(Arc::new(registry), scheduler.clone());
        create_tasks(&factory, &ConfigValue::from(json!({ "build": { "boom": {} } }))).unwrap();

        let error = scheduler.run("build", RuntimeMode::All).await.unwrap_err();
        assert_eq!(
            error.to_string(),
            "Task 'build > build:boom > boom' failed: exploded"
        );
    }
}
