//! Bridge error taxonomy
//!
//! Every failure a caller can see is a [`BridgeError`]. Each variant has a
//! stable [`ErrorKind`] that travels next to the message on the wire, so a
//! remote client can tell a missing document from a failed capture without
//! parsing text.

use std::fmt;

use cadbridge_core::DecodeError;
use cadbridge_kernel::KernelError;
use cadbridge_script::ScriptError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using the bridge's error type
pub type Result<T> = std::result::Result<T, BridgeError>;

/// Machine-readable error category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    ConnectionError,
    DocumentNotFound,
    ObjectNotFound,
    ReferenceNotFound,
    MissingField,
    UnknownConstructor,
    DecodeError,
    PropertyAssignError,
    RecomputeError,
    CreationError,
    ScriptError,
    CaptureError,
    Timeout,
    Disabled,
    PartNotFound,
    InternalError,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ConnectionError => "ConnectionError",
            Self::DocumentNotFound => "DocumentNotFound",
            Self::ObjectNotFound => "ObjectNotFound",
            Self::ReferenceNotFound => "ReferenceNotFound",
            Self::MissingField => "MissingField",
            Self::UnknownConstructor => "UnknownConstructor",
            Self::DecodeError => "DecodeError",
            Self::PropertyAssignError => "PropertyAssignError",
            Self::RecomputeError => "RecomputeError",
            Self::CreationError => "CreationError",
            Self::ScriptError => "ScriptError",
            Self::CaptureError => "CaptureError",
            Self::Timeout => "Timeout",
            Self::Disabled => "Disabled",
            Self::PartNotFound => "PartNotFound",
            Self::InternalError => "InternalError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single property that could not be applied
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyError {
    pub property: String,
    pub error: BridgeError,
}

impl fmt::Display for PropertyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.property, self.error)
    }
}

/// Errors reported by bridge operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BridgeError {
    /// The bridge or its owning context cannot be reached
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Document '{0}' not found")]
    DocumentNotFound(String),

    #[error("Object '{object}' not found in document '{document}'")]
    ObjectNotFound { document: String, object: String },

    /// A named cross-reference does not resolve
    #[error("Referenced object '{0}' not found")]
    ReferenceNotFound(String),

    /// A required request field is absent
    #[error("Missing required field '{0}'")]
    MissingField(String),

    /// No creation routine for the requested type
    #[error("No constructor registered for '{0}'")]
    UnknownConstructor(String),

    /// Wire value does not fit the target property's kind
    #[error("Cannot decode '{property}': {message}")]
    Decode { property: String, message: String },

    /// The kernel rejected an assignment
    #[error("Cannot set '{property}': {message}")]
    PropertyAssign { property: String, message: String },

    /// Several properties failed in one call
    #[error("{} properties failed: {}", .0.len(), join(.0))]
    Properties(Vec<PropertyError>),

    /// Document recompute failed after an edit
    #[error("Recompute failed: {0}")]
    Recompute(String),

    /// The kernel failed while constructing an object or its mesh
    #[error("Creation failed: {0}")]
    Creation(String),

    /// Executed code raised an error
    #[error("Script error: {message}")]
    Script { message: String, output: String },

    /// A view capture failed
    #[error("Capture failed: {0}")]
    Capture(String),

    /// The owning context did not answer in time
    #[error("Timed out after {0} ms waiting for the owning context")]
    Timeout(u64),

    /// The operation is turned off by configuration
    #[error("{0} is disabled by configuration")]
    Disabled(String),

    #[error("Part '{0}' not found")]
    PartNotFound(String),

    /// A task panicked or dropped its result
    #[error("Internal error: {0}")]
    Internal(String),
}

fn join(errors: &[PropertyError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl BridgeError {
    /// Stable category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Connection(_) => ErrorKind::ConnectionError,
            Self::DocumentNotFound(_) => ErrorKind::DocumentNotFound,
            Self::ObjectNotFound { .. } => ErrorKind::ObjectNotFound,
            Self::ReferenceNotFound(_) => ErrorKind::ReferenceNotFound,
            Self::MissingField(_) => ErrorKind::MissingField,
            Self::UnknownConstructor(_) => ErrorKind::UnknownConstructor,
            Self::Decode { .. } => ErrorKind::DecodeError,
            Self::PropertyAssign { .. } => ErrorKind::PropertyAssignError,
            // A batch reports as its first failure
            Self::Properties(errors) => errors
                .first()
                .map_or(ErrorKind::PropertyAssignError, |e| e.error.kind()),
            Self::Recompute(_) => ErrorKind::RecomputeError,
            Self::Creation(_) => ErrorKind::CreationError,
            Self::Script { .. } => ErrorKind::ScriptError,
            Self::Capture(_) => ErrorKind::CaptureError,
            Self::Timeout(_) => ErrorKind::Timeout,
            Self::Disabled(_) => ErrorKind::Disabled,
            Self::PartNotFound(_) => ErrorKind::PartNotFound,
            Self::Internal(_) => ErrorKind::InternalError,
        }
    }

    /// Collapse per-property failures into one error
    pub fn from_properties(mut errors: Vec<PropertyError>) -> Self {
        if errors.len() == 1 {
            errors.remove(0).error
        } else {
            Self::Properties(errors)
        }
    }

    pub(crate) fn decode(property: &str, e: &DecodeError) -> Self {
        Self::Decode {
            property: property.to_string(),
            message: e.to_string(),
        }
    }

    pub(crate) fn assign(property: &str, e: impl fmt::Display) -> Self {
        Self::PropertyAssign {
            property: property.to_string(),
            message: e.to_string(),
        }
    }

    /// Wrap a kernel failure during object construction, keeping lookups typed
    pub(crate) fn creation(e: KernelError) -> Self {
        match e {
            KernelError::DocumentNotFound(_)
            | KernelError::ObjectNotFound { .. }
            | KernelError::UnknownConstructor(_)
            | KernelError::LinkTarget { .. } => e.into(),
            other => Self::Creation(other.to_string()),
        }
    }
}

impl From<KernelError> for BridgeError {
    fn from(e: KernelError) -> Self {
        match e {
            KernelError::DocumentNotFound(doc) => Self::DocumentNotFound(doc),
            KernelError::ObjectNotFound { document, object } => Self::ObjectNotFound { document, object },
            KernelError::UnknownConstructor(name) => Self::UnknownConstructor(name),
            KernelError::LinkTarget { target, .. } => Self::ReferenceNotFound(target),
            KernelError::NoSuchProperty { ref property, .. }
            | KernelError::ReadOnly { ref property, .. }
            | KernelError::TypeMismatch { ref property, .. }
            | KernelError::OutOfRange { ref property, .. } => Self::assign(property, &e),
            KernelError::NoView(_) | KernelError::NotAContainer(_) => Self::assign("", &e),
            KernelError::CyclicDependency(_) => Self::Recompute(e.to_string()),
            KernelError::Capture(message) => Self::Capture(message),
            KernelError::Image(err) => Self::Capture(err.to_string()),
            KernelError::UnknownType(_)
            | KernelError::Mesh(_)
            | KernelError::Project { .. }
            | KernelError::Io(_) => Self::Creation(e.to_string()),
        }
    }
}

impl From<ScriptError> for BridgeError {
    fn from(e: ScriptError) -> Self {
        Self::Script {
            output: e.output().to_string(),
            message: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_property_error_collapses() {
        let err = BridgeError::from_properties(vec![PropertyError {
            property: "Base".into(),
            error: BridgeError::ReferenceNotFound("Ghost".into()),
        }]);
        assert_eq!(err, BridgeError::ReferenceNotFound("Ghost".into()));
    }

    #[test]
    fn test_batch_reports_first_kind() {
        let err = BridgeError::from_properties(vec![
            PropertyError {
                property: "Length".into(),
                error: BridgeError::Decode {
                    property: "Length".into(),
                    message: "expected float".into(),
                },
            },
            PropertyError {
                property: "Base".into(),
                error: BridgeError::ReferenceNotFound("Ghost".into()),
            },
        ]);
        assert_eq!(err.kind(), ErrorKind::DecodeError);
        assert!(err.to_string().starts_with("2 properties failed"));
    }

    #[test]
    fn test_kernel_link_error_is_reference_not_found() {
        let err: BridgeError = KernelError::LinkTarget {
            property: "Tool".into(),
            target: "Cylinder".into(),
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::ReferenceNotFound);
    }

    #[test]
    fn test_kind_names_round_trip_through_serde() {
        let json = serde_json::to_string(&ErrorKind::CaptureError).unwrap();
        assert_eq!(json, "\"CaptureError\"");
        let back: ErrorKind = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ErrorKind::CaptureError);
    }
}
