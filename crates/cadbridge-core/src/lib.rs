//! # CadBridge Core
//!
//! Property model and value codec shared by every CadBridge crate.
//!
//! The CAD object model is richly typed (vectors, rotations, placements,
//! object references, display state) while the bridge speaks plain JSON.
//! This crate owns both sides of that translation:
//!
//! - [`value`]: native property values and their declared kinds
//! - [`codec`]: total `encode`, kind-directed partial `decode`
//! - [`model`]: document and object records plus their query wire form
//!
//! ```rust,ignore
//! use cadbridge_core::prelude::*;
//!
//! let wire = serde_json::json!({"Position": {"x": 1}, "Rotation": {"Angle": 90}});
//! let value = decode(&wire, PropertyKind::Placement)?;
//! assert_eq!(encode(&value)["Base"]["x"], 1.0);
//! ```

pub mod codec;
pub mod model;
pub mod value;

mod error;

pub use error::{DecodeError, Result};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::codec::{decode, encode, infer};
    pub use crate::model::{BoundBox, DocObject, Document, Property, Shape, ViewRecord};
    pub use crate::value::{
        Color, LinkSub, Placement, PropertyKind, PropertyValue, Rotation, Vector,
    };
    pub use crate::{DecodeError, Result};

    pub use glam::DVec3;
}
