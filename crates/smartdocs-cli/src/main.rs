mod commands;
mod format;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "smartdocs")]
#[command(about = "Upload invoices to object storage and track what is pending")]
#[command(version)]
struct Cli {
    /// Path to the smartdocs config directory (default: ~/.smartdocs)
    #[arg(long, global = true, env = "SMARTDOCS_HOME")]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a default configuration with a local container
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Show current configuration
    Config,

    /// Test connectivity and credentials for the configured container
    Check,

    /// List pending documents, most recent first
    List {
        /// Print records as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show metadata of a single object
    Info {
        /// Object key as shown by `list`
        key: String,
    },

    /// Upload one or more files
    Upload {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Refresh once and show the engine state
    Status,

    /// Poll the container and print changes until interrupted
    Watch {
        /// Override the configured poll interval (seconds)
        #[arg(long)]
        interval: Option<u64>,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("smartdocs=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let base_dir = match cli.config_dir {
        Some(ref dir) => dir.clone(),
        None => smartdocs_core::config::SmartdocsConfig::default_base_dir()?,
    };

    let rt = tokio::runtime::Runtime::new()?;

    match cli.command {
        Commands::Init { force } => commands::init::run(&base_dir, force),
        Commands::Config => commands::config::run(&base_dir),
        Commands::Check => rt.block_on(commands::check::run(&base_dir)),
        Commands::List { json } => rt.block_on(commands::list::run(&base_dir, json)),
        Commands::Info { ref key } => rt.block_on(commands::info::run(&base_dir, key)),
        Commands::Upload { ref files } => rt.block_on(commands::upload::run(&base_dir, files)),
        Commands::Status => rt.block_on(commands::status::run(&base_dir)),
        Commands::Watch { interval } => rt.block_on(commands::watch::run(&base_dir, interval)),
    }
}
