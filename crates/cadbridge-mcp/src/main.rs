//! CadBridge MCP Server Binary
//!
//! Runs the MCP server on stdio transport and forwards every tool call to a
//! `cadbridge` server.
//!
//! ## Usage
//!
//! ```bash
//! cadbridge serve &
//! cadbridge-mcp --port 9875
//! ```
//!
//! Or add to an MCP client configuration:
//! ```json
//! {
//!   "mcpServers": {
//!     "cadbridge": {
//!       "command": "cadbridge-mcp",
//!       "args": ["--text-only"]
//!     }
//!   }
//! }
//! ```

use anyhow::Result;
use cadbridge_mcp::CadBridgeMcpService;
use cadbridge_rpc::{BridgeClient, DEFAULT_PORT};
use clap::Parser;
use rmcp::ServiceExt;
use rmcp::transport::io::stdio;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

#[derive(Parser)]
#[command(name = "cadbridge-mcp")]
#[command(author, version, about = "MCP server for a CadBridge CAD session", long_about = None)]
struct Cli {
    /// Host the bridge listens on
    #[arg(long, env = "CADBRIDGE_HOST", default_value = "127.0.0.1")]
    host: String,

    /// Port the bridge listens on
    #[arg(long, env = "CADBRIDGE_PORT", default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Do not attach screenshots to tool results
    #[arg(long)]
    text_only: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Log to stderr only - stdout is reserved for MCP JSON-RPC
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(tracing_subscriber::EnvFilter::new("info"))
        .init();

    let cli = Cli::parse();

    eprintln!("CadBridge MCP server v{}", env!("CARGO_PKG_VERSION"));

    let client = BridgeClient::new(&cli.host, cli.port)?;
    match client.ping().await {
        Ok(true) => eprintln!("Connected to bridge at {}", client.url()),
        Ok(false) => tracing::warn!("Bridge at {} answers but its session does not", client.url()),
        Err(e) => tracing::warn!("Bridge not reachable yet ({}); tools will report the failure", e),
    }

    eprintln!("Ready. Listening on stdio...");

    let service = CadBridgeMcpService::new(client, cli.text_only);
    let server = service.serve(stdio()).await?;

    // Wait for client to disconnect or error
    server.waiting().await?;

    eprintln!("Client disconnected. Shutting down.");
    Ok(())
}
