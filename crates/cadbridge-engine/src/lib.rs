//! CadBridge Engine - the request/response core of the bridge
//!
//! Turns structured create/edit/query requests into kernel calls on a
//! single owning context:
//!
//! - [`applier`]: kind-directed application of wire property maps
//! - [`factory`]: type-dispatched object creation with rollback
//! - [`sequencer`]: FIFO job queue onto the owning context
//! - [`workspace`]: the state that lives on the owning context
//! - [`bridge`]: the Send + Sync handle transports hold
//!
//! ## Example
//!
//! ```rust,ignore
//! use cadbridge_engine::{Bridge, BridgeOptions, ObjectRequest};
//! use serde_json::json;
//!
//! let bridge = Bridge::with_memory_kernel(BridgeOptions::default())?;
//! let doc = bridge.create_document("Doc1").await?;
//! let req = ObjectRequest::new("Part::Box").named("Box1").with_property("Length", json!(10));
//! bridge.create_object(&doc, req).await?;
//! ```

pub mod applier;
pub mod bridge;
pub mod factory;
pub mod parts;
pub mod request;
pub mod sequencer;
pub mod workspace;

mod error;

pub use applier::PropertyPolicy;
pub use bridge::{Bridge, BridgeOptions};
pub use error::{BridgeError, ErrorKind, PropertyError, Result};
pub use factory::Created;
pub use parts::PartsLibrary;
pub use request::{ObjectRequest, edit_properties};
pub use sequencer::{DEFAULT_TIMEOUT, Pump, Sequencer, TaskHandle};
pub use workspace::{Workspace, WorkspaceOptions};

// Re-export the pieces transports need without extra dependencies
pub use cadbridge_kernel::ViewName;
pub use cadbridge_script::ScriptOutput;
