mod config;
mod logging;
mod server;
mod signals;

use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::{ArgAction, Parser, Subcommand};
use mimalloc::MiMalloc;

use crate::config::{AppConfig, CliOverrides};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

/// HTTP catalog of survey areas, datasets and datafiles, linked by
/// `contains` and `produces` relationships.
#[derive(Parser)]
#[command(name = "catalog-server", version, about)]
struct Cli {
    /// YAML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Listen on this port instead of the configured one
    #[arg(short, long)]
    port: Option<u16>,

    /// Print the effective configuration as YAML and exit
    #[arg(long)]
    print_config: bool,

    /// Raise log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Keep the catalog in an in-memory SQLite database
    #[arg(long)]
    mock: bool,

    #[command(subcommand)]
    command: Option<Action>,
}

#[derive(Subcommand, Clone, Copy, Default)]
enum Action {
    /// Serve the catalog API (default)
    #[default]
    Run,
    /// Validate the configuration, print it and exit
    Check,
}

impl Cli {
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            port: self.port,
            verbose: self.verbose,
            mock: self.mock,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = effective_config(&cli)?;

    logging::init(&config.logging);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "catalog-server starting");

    if cli.print_config {
        println!("{}", config.to_yaml()?);
        return Ok(());
    }

    config.validate()?;
    match cli.command.unwrap_or_default() {
        Action::Run => server::run(config).await,
        Action::Check => {
            println!("Configuration is valid");
            println!("{}", config.to_yaml()?);
            Ok(())
        }
    }
}

/// Defaults, then the YAML file, then `APP__*` variables, then flags.
fn effective_config(cli: &Cli) -> Result<AppConfig> {
    if let Some(path) = cli.config.as_deref()
        && !path.is_file()
    {
        bail!("config file does not exist: {}", path.display());
    }
    let mut config = AppConfig::load(cli.config.as_deref())?;
    config.apply_cli_overrides(&cli.overrides())?;
    Ok(config)
}
