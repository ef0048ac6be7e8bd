use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use tswatch_cli::monitor::{self, OutputFormat};
use tswatch_cli::settings::{Overrides, Settings};
use tswatch_cli::setup::{self, Registry};
use tswatch_coordinator::{Coordinator, Snapshot};
use tswatch_webquery::WebQueryClient;

#[derive(Parser, Debug)]
#[command(name = "tswatch")]
#[command(about = "Monitor a TeamSpeak server through its WebQuery API")]
struct Args {
    /// TOML file with connection settings
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(flatten)]
    overrides: Overrides,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check the settings against the live server
    Validate {
        /// Record the server in this registry file
        #[arg(long)]
        registry: Option<PathBuf>,
    },

    /// Poll the server and print sensor readings
    Run {
        /// Print one reading and exit
        #[arg(long)]
        once: bool,

        /// Output format
        #[arg(long, value_enum, default_value_t)]
        format: OutputFormat,
    },

    /// Fetch one snapshot and write it as JSON
    Export {
        /// Destination file
        path: PathBuf,
    },
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    init_tracing();
    let args = Args::parse();
    let settings = Settings::load(args.config.as_deref(), &args.overrides)?;

    match args.command {
        Command::Validate { registry } => validate(&settings, registry).await,
        Command::Run { once, format } => run(&settings, once, format).await,
        Command::Export { path } => export(&settings, &path).await,
    }
}

async fn validate(settings: &Settings, registry: Option<PathBuf>) -> Result<ExitCode> {
    let mut registry = match registry {
        Some(path) => Some(
            Registry::open(&path)
                .with_context(|| format!("Failed to read registry {}", path.display()))?,
        ),
        None => None,
    };

    match setup::validate_input(settings, registry.as_mut()).await {
        Ok(validated) => {
            println!("{}", validated.describe());
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            error!("Validation failed: {}", err);
            println!("{}", err);
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn connect(settings: &Settings) -> Result<(Coordinator<WebQueryClient>, Arc<Snapshot>)> {
    let client = WebQueryClient::new(settings.descriptor())?;
    monitor::connect(client, settings.interval()).await
}

async fn run(settings: &Settings, once: bool, format: OutputFormat) -> Result<ExitCode> {
    let (coordinator, snapshot) = connect(settings).await?;
    let descriptor = settings.descriptor();
    let mut stdout = io::stdout();

    print!("{}", monitor::format_snapshot(&snapshot, &descriptor, format)?);
    if once {
        return Ok(ExitCode::SUCCESS);
    }

    info!(
        "Polling {} every {}s",
        descriptor.base_url(),
        coordinator.interval().as_secs()
    );
    let shutdown = async {
        let _ = tokio::signal::ctrl_c().await;
    };
    monitor::follow(&coordinator, &descriptor, format, &mut stdout, shutdown).await?;
    Ok(ExitCode::SUCCESS)
}

async fn export(settings: &Settings, path: &Path) -> Result<ExitCode> {
    let (_, snapshot) = connect(settings).await?;
    monitor::export(&snapshot, path)?;
    println!("Exported snapshot to {}", path.display());
    Ok(ExitCode::SUCCESS)
}
