//! Errors reported across the kernel boundary

use std::path::PathBuf;

use cadbridge_core::value::PropertyKind;
use thiserror::Error;

/// Result type alias using the kernel's error type
pub type Result<T> = std::result::Result<T, KernelError>;

/// Failures reported by a CAD kernel
#[derive(Error, Debug)]
pub enum KernelError {
    /// No open document with this name
    #[error("Document '{0}' not found")]
    DocumentNotFound(String),

    /// No object with this name in the document
    #[error("Object '{object}' not found in document '{document}'")]
    ObjectNotFound { document: String, object: String },

    /// `add_object` with a type the kernel does not know
    #[error("Unknown object type '{0}'")]
    UnknownType(String),

    /// `construct` with an unregistered family constructor
    #[error("No constructor '{0}' registered")]
    UnknownConstructor(String),

    /// Assignment to a property the object does not declare
    #[error("Object '{object}' has no property '{property}'")]
    NoSuchProperty { object: String, property: String },

    /// Assignment to an output-only property
    #[error("Property '{property}' of '{object}' is read-only")]
    ReadOnly { object: String, property: String },

    /// Value kind does not match the declared kind
    #[error("Property '{property}' expects a {expected} value, got {found}")]
    TypeMismatch {
        property: String,
        expected: PropertyKind,
        found: PropertyKind,
    },

    /// Numeric value outside the property's accepted range
    #[error("Property '{property}' accepts {range}, got {value}")]
    OutOfRange {
        property: String,
        range: &'static str,
        value: f64,
    },

    /// A link names an object that does not exist (or the object itself)
    #[error("Property '{property}' cannot link to '{target}'")]
    LinkTarget { property: String, target: String },

    /// `add_to_group` on an object that cannot hold others
    #[error("Object '{0}' is not a container")]
    NotAContainer(String),

    /// Dependency cycle found during recompute
    #[error("Cyclic dependency between objects: {}", .0.join(" -> "))]
    CyclicDependency(Vec<String>),

    /// Mesh generation failed
    #[error("Mesh generation failed: {0}")]
    Mesh(String),

    /// Object has no display record
    #[error("Object '{0}' has no view provider")]
    NoView(String),

    /// View capture failed
    #[error("Capture failed: {0}")]
    Capture(String),

    /// A part file could not be merged
    #[error("Cannot merge {}: {message}", path.display())]
    Project { path: PathBuf, message: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Image encoding error
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}
