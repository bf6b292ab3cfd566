#![warn(clippy::all, clippy::pedantic)]

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use promptgate::config::Config;
use promptgate::gateway;

#[derive(Parser)]
#[command(name = "promptgate", version, about = "Minimal LLM chat gateway")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP gateway (default)
    Serve {
        /// Bind host (overrides config)
        #[arg(long)]
        host: Option<String>,
        /// Bind port (overrides config)
        #[arg(long)]
        port: Option<u16>,
    },
    /// Print the resolved config file path
    ConfigPath,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let cli = Cli::parse();
    let mut config = Config::load_or_init()?;
    config.apply_env_overrides();

    match cli.command {
        Some(Command::ConfigPath) => {
            println!("{}", config.config_path.display());
            Ok(())
        }
        Some(Command::Serve { host, port }) => {
            let host = host.unwrap_or_else(|| config.gateway.host.clone());
            let port = port.unwrap_or(config.gateway.port);
            gateway::run_gateway(&host, port, config).await
        }
        None => {
            let host = config.gateway.host.clone();
            let port = config.gateway.port;
            gateway::run_gateway(&host, port, config).await
        }
    }
}
