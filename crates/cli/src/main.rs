//! confsync - inspect and synchronize hierarchical configuration

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use config::{Settings, SettingsLoader, SettingsValidator};
use std::env;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod app;

use app::Application;

const DEFAULT_CONFIG_PATH: &str = "confsync.yaml";

#[derive(Debug, Parser)]
#[command(name = "confsync", version, about = "Hierarchical configuration resolution and sync")]
struct Cli {
    /// Settings file (defaults to $CONFIG_PATH, then confsync.yaml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print a namespace, global tree included, as JSON
    Show { namespace: String },
    /// Print the nearest `.../default` namespace above NAMESPACE
    Default { namespace: String },
    /// Print a single property
    Get { namespace: String, key: String },
    /// Replace everything under another prefix with the loaded namespaces
    Copy {
        #[arg(long)]
        to_prefix: String,
    },
    /// Write an example settings file
    ExampleConfig { path: PathBuf },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists
    let dotenv_result = dotenv::dotenv();

    let cli = Cli::parse();

    if let Command::ExampleConfig { path } = &cli.command {
        SettingsLoader::create_example(path)?;
        println!("Example configuration written to {}", path.display());
        return Ok(());
    }

    let settings = load_settings(cli.config.clone())?;
    init_logging(&settings)?;

    match dotenv_result {
        Ok(path) => info!("Loaded environment variables from {}", path.display()),
        Err(e) if !e.not_found() => warn!("Could not load .env file: {}", e),
        Err(_) => {}
    }

    info!("Starting confsync v{}", env!("CARGO_PKG_VERSION"));
    let report = SettingsValidator::validate(&settings);
    info!("{}", report.summary());

    let app = Application::new(settings)
        .await
        .context("Failed to create application")?;

    let result = run(&app, cli.command).await;
    app.shutdown().await;
    result
}

async fn run(app: &Application, command: Command) -> Result<()> {
    match command {
        Command::Show { namespace } => {
            let json = app.show(&namespace)?;
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        Command::Default { namespace } => match app.default_for(&namespace).await {
            Some(found) => println!("{}", found),
            None => warn!(namespace = %namespace, "No default namespace found"),
        },
        Command::Get { namespace, key } => {
            println!("{}", app.get(&namespace, &key)?);
        }
        Command::Copy { to_prefix } => {
            let copied = app.copy_to(&to_prefix).await?;
            println!("Copied {} namespaces to {}", copied, to_prefix);
        }
        Command::ExampleConfig { .. } => {}
    }
    Ok(())
}

/// Settings from the given file, $CONFIG_PATH, or confsync.yaml. Without
/// any file, defaults plus environment overrides are used.
fn load_settings(explicit: Option<PathBuf>) -> Result<Settings> {
    let explicit = explicit.or_else(|| env::var("CONFIG_PATH").ok().map(PathBuf::from));

    match explicit {
        Some(path) => SettingsLoader::load(&path)
            .with_context(|| format!("Failed to load configuration from {}", path.display())),
        None if PathBuf::from(DEFAULT_CONFIG_PATH).exists() => {
            SettingsLoader::load(DEFAULT_CONFIG_PATH).context("Failed to load configuration")
        }
        None => SettingsLoader::load_from_env().context("Failed to load configuration from environment"),
    }
}

/// Initialize logging from settings; RUST_LOG takes precedence
fn init_logging(settings: &Settings) -> Result<()> {
    let log_level = &settings.logging.level;
    let log_format = &settings.logging.format;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    let registry = tracing_subscriber::registry()
        .with(env_filter);

    match log_format.as_str() {
        "json" => {
            registry
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .try_init()
                .context("Failed to initialize JSON logging")?;
        }
        _ => {
            registry
                .with(tracing_subscriber::fmt::layer().pretty().with_writer(std::io::stderr))
                .try_init()
                .context("Failed to initialize pretty logging")?;
        }
    }

    if log_level == "trace" || log_level == "debug" {
        warn!("Debug/trace logging enabled - property lookups are logged individually");
    }

    Ok(())
}
