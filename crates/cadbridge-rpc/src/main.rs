//! CadBridge - bridge server for tool-calling agents
//!
//! ## Usage
//!
//! ```bash
//! cadbridge                                  # serve with saved settings
//! cadbridge --port 9900 --allow-code-execution serve
//! cadbridge ping
//! cadbridge config init
//! ```

use std::net::IpAddr;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use cadbridge_engine::{Bridge, PropertyPolicy};
use cadbridge_rpc::{BridgeClient, BridgeConfig, Dispatcher, RpcServer, config_path};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cadbridge")]
#[command(about = "Bridge between tool-calling agents and a parametric CAD document model", long_about = None)]
#[command(version)]
struct Cli {
    /// Settings file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Address to listen on or connect to
    #[arg(long, global = true)]
    host: Option<IpAddr>,

    #[arg(long, global = true)]
    port: Option<u16>,

    /// Root of the parts library
    #[arg(long, global = true)]
    parts_library: Option<PathBuf>,

    /// Allow execute_code to run caller-supplied scripts
    #[arg(long, global = true)]
    allow_code_execution: bool,

    /// Skip properties that cannot be applied instead of failing the call
    #[arg(long, global = true)]
    best_effort: bool,

    /// Wait for the owning context at most this long (0 = forever)
    #[arg(long, global = true)]
    timeout_ms: Option<u64>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the bridge server (default)
    Serve,

    /// Check that a bridge answers
    Ping,

    /// Inspect or create the settings file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective settings
    Show,

    /// Write the default settings file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

impl Cli {
    /// Saved settings with command-line overrides applied
    fn effective_config(&self) -> BridgeConfig {
        let mut config = match &self.config {
            Some(path) => BridgeConfig::load_from(path),
            None => BridgeConfig::load(),
        };
        if let Some(host) = self.host {
            config.host = host;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(root) = &self.parts_library {
            config.parts_library = Some(root.clone());
        }
        if self.allow_code_execution {
            config.allow_code_execution = true;
        }
        if self.best_effort {
            config.property_policy = PropertyPolicy::BestEffort;
        }
        if let Some(ms) = self.timeout_ms {
            config.task_timeout_ms = ms;
        }
        config
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = cli.effective_config();

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(config).await,

        Commands::Ping => {
            let client = BridgeClient::connect(&config.host.to_string(), config.port)
                .await
                .context("Bridge did not answer")?;
            println!("Bridge at {} is alive", client.url());
            Ok(())
        }

        Commands::Config { action } => match action {
            ConfigAction::Show => {
                println!("{}", serde_json::to_string_pretty(&config)?);
                Ok(())
            }
            ConfigAction::Init { force } => {
                let path = match cli.config {
                    Some(path) => path,
                    None => config_path().context("Could not determine config directory")?,
                };
                if path.exists() && !force {
                    bail!("{} already exists (use --force to overwrite)", path.display());
                }
                BridgeConfig::default().save_to(&path)?;
                println!("Wrote {}", path.display());
                Ok(())
            }
        },
    }
}

async fn serve(config: BridgeConfig) -> Result<()> {
    if config.allow_code_execution {
        tracing::warn!("Code execution is enabled: callers can run arbitrary scripts");
    }
    if let Some(root) = &config.parts_library {
        tracing::info!("Parts library: {}", root.display());
    }

    let bridge = Bridge::with_memory_kernel(config.to_options()).context("Failed to start bridge")?;
    let server = RpcServer::bind(Dispatcher::new(bridge), config.addr()).await?;
    println!("CadBridge v{} listening at {}", env!("CARGO_PKG_VERSION"), server.url());

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    tracing::info!("Shutting down");
    server.shutdown().await
}
