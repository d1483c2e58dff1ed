//! # CadBridge Kernel
//!
//! The CAD application side of the bridge.
//!
//! [`CadKernel`] is the collaborator boundary: documents, objects, typed
//! properties, family constructors, recompute, meshing, part merges and
//! view captures. [`MemoryKernel`] implements it in memory with a Part and
//! FEM type registry so the bridge can run without a CAD application.
//!
//! ```rust,ignore
//! use cadbridge_kernel::{CadKernel, MemoryKernel};
//!
//! let mut kernel = MemoryKernel::new();
//! let doc = kernel.new_document("Bracket")?;
//! let part = kernel.add_object(&doc, "Part::Box", "")?;
//! kernel.recompute(&doc)?;
//! ```

pub mod kernel;
pub mod memory;
pub mod project;
pub mod view;

mod error;

pub use error::{KernelError, Result};
pub use kernel::{CadKernel, require_document, require_object};
pub use memory::MemoryKernel;
pub use project::{PART_EXTENSION, PartFile, PartObject};
pub use view::ViewName;
