//! Error types for the value codec

use thiserror::Error;

use crate::value::PropertyKind;

/// A wire value whose shape does not fit the target property kind
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    /// Wire value has the wrong JSON type altogether
    #[error("expected {expected} value, found {found}")]
    Mismatch {
        expected: PropertyKind,
        found: &'static str,
    },

    /// A sub-field that must be numeric is not
    #[error("field '{field}' of {kind} value must be a number")]
    NonNumeric { kind: PropertyKind, field: String },

    /// Placement mapping without any position or rotation key
    #[error("placement value needs a 'Base', 'Position' or 'Rotation' key")]
    MissingPlacementKeys,

    /// Color tuple with the wrong arity
    #[error("color value needs 3 or 4 components, found {0}")]
    ColorArity(usize),

    /// Malformed entry in a reference list
    #[error("reference entry {index} must be a [object, sub-element] pair")]
    BadReference { index: usize },

    /// The target kind cannot be assigned from the wire
    #[error("{0} properties are read-only")]
    ReadOnly(PropertyKind),
}

pub type Result<T> = std::result::Result<T, DecodeError>;
