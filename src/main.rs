use anyhow::{Context, Result, anyhow};
use std::path::PathBuf;
use std::sync::Arc;
use taskchef::cli::{
    Args, ChefConfig, ConfigDiscovery, DocumentConfig, ExecutionMode, RunConfig, TaskDocument,
};
use taskchef::task::{
    ConfigurableTask, LocalScheduler, RunnerRegistry, TaskFactory, create_tasks, help_listing,
};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mode = match args.mode() {
        Ok(mode) => mode,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let verbose = match &mode {
        ExecutionMode::Run(config) => config.document.verbose,
        ExecutionMode::ListTasks(document) | ExecutionMode::Tree(document) => document.verbose,
        ExecutionMode::ShowConfig => false,
    };
    init_logging(verbose);

    match mode {
        ExecutionMode::Run(config) => run_task(config).await,
        ExecutionMode::ListTasks(document) => {
            let loaded = load_tasks(&document)?;
            print!("{}", help_listing(loaded.scheduler.as_ref()));
            Ok(())
        }
        ExecutionMode::Tree(document) => {
            let loaded = load_tasks(&document)?;
            let mut roots: Vec<String> = loaded
                .roots
                .iter()
                .map(|task| task.display_name.clone())
                .collect();
            roots.sort();
            print!("{}", loaded.factory.metadata().render_tree(&roots));
            Ok(())
        }
        ExecutionMode::ShowConfig => {
            ConfigDiscovery::show_discovery_info();
            Ok(())
        }
    }
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose {
        "taskchef=debug"
    } else {
        "taskchef=info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

struct LoadedTasks {
    config: ChefConfig,
    scheduler: Arc<LocalScheduler>,
    factory: TaskFactory,
    roots: Vec<Arc<ConfigurableTask>>,
}

fn load_config(document: &DocumentConfig) -> Result<ChefConfig> {
    match &document.config_override {
        Some(path) => {
            info!("Loading configuration override from: {:?}", path);
            Ok(ChefConfig::from_toml_file(path)?)
        }
        None => {
            debug!("Discovering default configuration...");
            Ok(ConfigDiscovery::discover_config()?)
        }
    }
}

fn load_tasks(document: &DocumentConfig) -> Result<LoadedTasks> {
    let config = load_config(document)?;

    let project_root: PathBuf =
        std::env::current_dir().context("Failed to read the current directory")?;
    let task_file = config
        .resolve_task_file(document.file.as_deref(), &project_root)
        .ok_or_else(|| {
            anyhow!(
                "No task document found in {:?}; pass one with --file",
                project_root
            )
        })?;

    info!("Loading tasks from: {:?}", task_file);
    let raw = TaskDocument::load(&task_file)?;

    let scheduler = Arc::new(LocalScheduler::new());
    let factory = TaskFactory::new(Arc::new(RunnerRegistry::builtin()), scheduler.clone());
    let roots = create_tasks(&factory, &raw)
        .with_context(|| format!("Failed to build tasks from {:?}", task_file))?;

    Ok(LoadedTasks {
        config,
        scheduler,
        factory,
        roots,
    })
}

async fn run_task(run: RunConfig) -> Result<()> {
    let loaded = load_tasks(&run.document)?;
    let name = run
        .task
        .clone()
        .unwrap_or_else(|| loaded.config.default_task.clone());
    let mode = run.mode.unwrap_or(loaded.config.mode);

    info!("Running '{}' in {:?} mode", name, mode);
    let output = loaded.scheduler.run(&name, mode).await?;

    if let Some(stream) = output {
        debug!("'{}' produced {} stream items", name, stream.len());
    }
    Ok(())
}
