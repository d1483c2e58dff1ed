//! CadBridge RPC - the network face of the bridge
//!
//! Every bridge operation is a JSON-RPC 2.0 method served at `POST /rpc` on
//! a loopback address. Arguments may be positional or named:
//!
//! ```json
//! {"jsonrpc": "2.0", "id": 1, "method": "get_object", "params": ["Doc1", "Box1"]}
//! ```
//!
//! - [`server`]: axum endpoint hosting a [`Dispatcher`]
//! - [`client`]: reqwest client with typed methods
//! - [`config`]: persisted server settings

pub mod client;
pub mod config;
pub mod dispatcher;
pub mod protocol;
pub mod server;

pub use client::{Applied, BridgeClient, ClientError, CodeOutput};
pub use config::{BridgeConfig, DEFAULT_PORT, config_path};
pub use dispatcher::{DEFAULT_VIEW, Dispatcher, METHODS};
pub use server::{RpcServer, router};
