//! supperclub CLI, the main entry point.
//!
//! Commands:
//! - `serve`: Start the HTTP/SSE gateway
//! - `plan`: Plan a dinner from the terminal (single message or interactive)
//! - `friends`: Print the friend roster
//! - `config`: Show, locate, or generate configuration

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use supperclub_config::AppConfig;

mod commands;

#[derive(Parser)]
#[command(
    name = "supperclub",
    about = "supperclub: plan group dinners with a tool-calling LLM agent",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file to use instead of ~/.supperclub/config.toml
    #[arg(short, long, global = true, env = "SUPPERCLUB_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP gateway server
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,

        /// Override the bind address
        #[arg(long)]
        host: Option<String>,
    },

    /// Plan a dinner with the agent
    Plan {
        /// Send a single message instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,

        /// Your latitude
        #[arg(long, requires = "lng", allow_negative_numbers = true)]
        lat: Option<f64>,

        /// Your longitude
        #[arg(long, requires = "lat", allow_negative_numbers = true)]
        lng: Option<f64>,

        /// Your street address
        #[arg(long)]
        address: Option<String>,
    },

    /// List the friends the planner knows about
    Friends,

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print a config file with every default filled in (the default action)
    Default,
    /// Print the effective configuration
    Show,
    /// Print the config file path
    Path,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Serve { port, host } => {
            let config = load_config(cli.config.as_deref())?;
            commands::serve::run(config, host, port).await?
        }
        Commands::Plan {
            message,
            lat,
            lng,
            address,
        } => {
            let config = load_config(cli.config.as_deref())?;
            let location = commands::plan::location_from_args(lat, lng, address);
            commands::plan::run(config, message, location).await?
        }
        Commands::Friends => {
            let config = load_config(cli.config.as_deref())?;
            commands::friends::run(&config)?
        }
        Commands::Config { action } => match action.unwrap_or(ConfigAction::Default) {
            ConfigAction::Default => commands::config_cmd::print_default(),
            ConfigAction::Show => {
                let config = load_config(cli.config.as_deref())?;
                commands::config_cmd::show(&config)?
            }
            ConfigAction::Path => commands::config_cmd::path(cli.config.as_deref()),
        },
    }

    Ok(())
}

fn load_config(path: Option<&std::path::Path>) -> Result<AppConfig, Box<dyn std::error::Error>> {
    let config = match path {
        Some(p) => AppConfig::load_with_env(p),
        None => AppConfig::load(),
    };
    config.map_err(|e| format!("Failed to load config: {e}").into())
}
