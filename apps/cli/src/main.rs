mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use compatkit_ctmods::Kron4ekVanilla;
use compatkit_settings::Config;

#[derive(Parser)]
#[command(name = "compatkit")]
#[command(about = "Install and manage Wine/Proton compatibility tools", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show known install locations and which one is active
    Locations,

    /// Select the active install location ("default" picks the first known one)
    Use {
        /// Install directory, or "default"
        dir: String,
    },

    /// List tools installed in the active location
    List,

    /// Remove an installed tool
    Remove {
        /// Folder name or "<folder> - <version>" label as shown by `list`
        label: String,

        /// Remove even if Steam games are configured to use the tool
        #[arg(short, long)]
        force: bool,
    },

    /// List published releases of a tool
    Releases {
        /// Provider id
        #[arg(short, long, default_value = Kron4ekVanilla::ID)]
        tool: String,

        /// Maximum number of releases
        #[arg(short, long, default_value_t = 20)]
        limit: u32,
    },

    /// Download and install a release into the active location
    Install {
        /// Release tag, or "latest"
        #[arg(default_value = "latest")]
        version: String,

        /// Provider id
        #[arg(short, long, default_value = Kron4ekVanilla::ID)]
        tool: String,

        /// Directory for the downloaded archive
        #[arg(long)]
        temp_dir: Option<PathBuf>,
    },

    /// Show download details for a release
    Info {
        /// Release tag, or "latest"
        version: String,

        /// Provider id
        #[arg(short, long, default_value = Kron4ekVanilla::ID)]
        tool: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = Config::load().unwrap_or_else(|e| {
        tracing::warn!("failed to load config, using defaults: {e}");
        Config::default()
    });

    match cli.command {
        Commands::Locations => commands::locations(&mut config),
        Commands::Use { dir } => commands::use_location(&mut config, &dir),
        Commands::List => commands::list(&mut config),
        Commands::Remove { label, force } => commands::remove(&mut config, &label, force).await,
        Commands::Releases { tool, limit } => commands::releases(&tool, limit).await,
        Commands::Install {
            version,
            tool,
            temp_dir,
        } => commands::install(&mut config, &tool, &version, temp_dir).await,
        Commands::Info { version, tool } => commands::info(&tool, &version).await,
    }
}
