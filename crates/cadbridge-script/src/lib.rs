//! CadBridge Script - Rhai execution against live documents
//!
//! Code sent with an execute request runs here, inside the context that
//! owns the documents, with full access to the document model.
//!
//! ## Example Script
//!
//! ```rhai
//! let doc = active_document();
//! for name in objects(doc) {
//!     let obj = get_object(doc, name);
//!     print(`${name}: ${obj.TypeId}`);
//! }
//! ```

pub mod doc_api;
pub mod engine;

mod error;

pub use doc_api::{SharedKernel, register_document_api};
pub use engine::{DEFAULT_MAX_OPERATIONS, ScriptEngine, ScriptOutput};
pub use error::ScriptError;
