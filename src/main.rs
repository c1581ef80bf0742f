use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use opsheet::config::Config;
use opsheet::scenario::{self, Scenario};

#[derive(Parser)]
#[command(name = "opsheet")]
#[command(author, about = "Overlay sheet controller: replay toggle and animation scenarios", long_about = None)]
#[command(version = concat!(env!("CARGO_PKG_VERSION"), env!("OPSHEET_VERSION_SUFFIX")))]
#[command(long_version = concat!(
    env!("CARGO_PKG_VERSION"),
    env!("OPSHEET_VERSION_SUFFIX"),
    " (commit ",
    env!("OPSHEET_GIT_HASH"),
    ")"
))]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file to use instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a scenario file and print the resulting sheet events
    Replay {
        /// Scenario TOML file
        scenario: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Show the effective configuration
    Config {
        /// Print the config file location only
        #[arg(long, conflicts_with = "init")]
        path: bool,

        /// Write the default configuration if no config file exists yet
        #[arg(long)]
        init: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        "opsheet=debug"
    } else {
        "opsheet=warn"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Commands::Config { init: true, .. } = cli.command {
        return init_config(cli.config.as_deref());
    }

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    match cli.command {
        Commands::Replay {
            scenario: path,
            format,
        } => {
            let scenario = Scenario::load(&path)?;
            tracing::info!(
                panels = scenario.panels.len(),
                steps = scenario.steps.len(),
                "Replaying {}",
                path.display()
            );
            let report = scenario::replay(&scenario, config).await?;
            match format {
                OutputFormat::Json => {
                    let json = serde_json::to_string_pretty(&report)
                        .context("Failed to serialize replay report")?;
                    println!("{}", json);
                }
                OutputFormat::Text => print!("{}", scenario::render_text(&report)),
            }
        }
        Commands::Config { path, .. } => {
            let location = match cli.config {
                Some(p) => p,
                None => Config::config_path()?,
            };
            if path {
                println!("{}", location.display());
            } else {
                let toml = toml::to_string_pretty(&config).context("Failed to serialize config")?;
                println!("# {}", location.display());
                print!("{}", toml);
            }
        }
    }

    Ok(())
}

fn init_config(path: Option<&Path>) -> Result<()> {
    let location = match path {
        Some(p) => p.to_path_buf(),
        None => Config::config_path()?,
    };
    if location.exists() {
        println!("Config already exists: {}", location.display());
        return Ok(());
    }

    let config = Config::default();
    match path {
        Some(p) => config.save_to(p)?,
        None => config.save()?,
    }
    tracing::info!("Wrote default config to {}", location.display());
    println!("Created {}", location.display());
    Ok(())
}
