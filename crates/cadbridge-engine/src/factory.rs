//! Object factory
//!
//! Picks the creation path for a request, most specific first:
//!
//! - a gmsh mesh inside an analysis: construct, register, link the part,
//!   recompute, generate the mesh, recompute again
//! - any other `Fem::` type: its family constructor, then registration under
//!   the analysis unless the object is itself a container
//! - anything else: a bare object of the requested type
//!
//! Every path ends with a recompute. A failure after the object exists
//! removes it again, so no half-built object stays in the document.

use cadbridge_core::value::PropertyValue;
use cadbridge_kernel::{CadKernel, require_document};
use serde_json::Value;

use crate::applier::{self, PropertyPolicy};
use crate::error::{BridgeError, PropertyError};
use crate::request::ObjectRequest;

/// Family prefix of simulation types
pub const FEM_FAMILY: &str = "Fem::";

/// Types that need a mesh run after creation
pub const MESH_TYPES: &[&str] = &["Fem::FemMeshGmsh"];

/// Link from a mesh to the shape it meshes
pub const MESH_PART: &str = "Part";

/// Constructors whose names do not follow `make<Kind>`
const CONSTRUCTOR_OVERRIDES: &[(&str, &str)] = &[
    ("MaterialCommon", "makeMaterialSolid"),
    ("AnalysisPython", "makeAnalysis"),
    ("FemAnalysis", "makeAnalysis"),
    ("FemMeshGmsh", "makeMeshGmsh"),
];

/// A successfully created object
#[derive(Debug, Clone, PartialEq)]
pub struct Created {
    pub name: String,
    /// Properties skipped under the best-effort policy
    pub skipped: Vec<PropertyError>,
}

/// Constructor name for a `Fem::` type, `None` outside the family
pub fn constructor_name(type_id: &str) -> Option<String> {
    let kind = type_id.strip_prefix(FEM_FAMILY)?;
    let name = CONSTRUCTOR_OVERRIDES
        .iter()
        .find(|(k, _)| *k == kind)
        .map_or_else(|| format!("make{kind}"), |(_, ctor)| (*ctor).to_string());
    Some(name)
}

/// Create an object from a request
pub fn create<K: CadKernel + ?Sized>(
    kernel: &mut K,
    doc: &str,
    request: &ObjectRequest,
    policy: PropertyPolicy,
) -> Result<Created, BridgeError> {
    let document = require_document(kernel, doc)?;
    if let Some(analysis) = &request.analysis {
        if !document.contains(analysis) {
            return Err(BridgeError::ReferenceNotFound(analysis.clone()));
        }
    }

    let is_mesh = MESH_TYPES.contains(&request.type_id.as_str());
    match (&request.analysis, constructor_name(&request.type_id)) {
        (Some(analysis), Some(ctor)) if is_mesh => create_mesh(kernel, doc, request, analysis, &ctor, policy),
        (_, Some(ctor)) => create_family(kernel, doc, request, &ctor, policy),
        (_, None) => create_generic(kernel, doc, request, policy),
    }
}

fn create_mesh<K: CadKernel + ?Sized>(
    kernel: &mut K,
    doc: &str,
    request: &ObjectRequest,
    analysis: &str,
    ctor: &str,
    policy: PropertyPolicy,
) -> Result<Created, BridgeError> {
    let part = match request.properties.get(MESH_PART) {
        None | Some(Value::Null) => return Err(BridgeError::MissingField(MESH_PART.into())),
        Some(Value::String(part)) => part.clone(),
        Some(_) => {
            return Err(BridgeError::Decode {
                property: MESH_PART.into(),
                message: "expected the name of the part to mesh".into(),
            });
        }
    };
    if !require_document(kernel, doc)?.contains(&part) {
        return Err(BridgeError::ReferenceNotFound(part));
    }

    let name = construct(kernel, doc, ctor, &request.name)?;
    guarded(kernel, doc, &name, |kernel| {
        kernel
            .add_to_group(doc, analysis, &name)
            .map_err(BridgeError::creation)?;
        kernel
            .set_property(doc, &name, MESH_PART, PropertyValue::Link(Some(part.clone())))
            .map_err(BridgeError::creation)?;

        let mut rest = request.properties.clone();
        rest.remove(MESH_PART);
        let skipped = apply_with_policy(kernel, doc, &name, &rest, policy)?;

        kernel.recompute(doc).map_err(BridgeError::creation)?;
        kernel.generate_mesh(doc, &name).map_err(BridgeError::creation)?;
        kernel.recompute(doc).map_err(BridgeError::creation)?;
        Ok(skipped)
    })
}

fn create_family<K: CadKernel + ?Sized>(
    kernel: &mut K,
    doc: &str,
    request: &ObjectRequest,
    ctor: &str,
    policy: PropertyPolicy,
) -> Result<Created, BridgeError> {
    if !kernel.has_constructor(ctor) {
        return Err(BridgeError::UnknownConstructor(request.type_id.clone()));
    }

    let name = construct(kernel, doc, ctor, &request.name)?;
    guarded(kernel, doc, &name, |kernel| {
        let skipped = apply_with_policy(kernel, doc, &name, &request.properties, policy)?;
        if let Some(analysis) = &request.analysis {
            if !kernel.is_container(doc, &name) {
                kernel
                    .add_to_group(doc, analysis, &name)
                    .map_err(BridgeError::creation)?;
            }
        }
        kernel.recompute(doc).map_err(BridgeError::creation)?;
        Ok(skipped)
    })
}

fn create_generic<K: CadKernel + ?Sized>(
    kernel: &mut K,
    doc: &str,
    request: &ObjectRequest,
    policy: PropertyPolicy,
) -> Result<Created, BridgeError> {
    let name = kernel
        .add_object(doc, &request.type_id, &request.name)
        .map_err(BridgeError::creation)?;
    guarded(kernel, doc, &name, |kernel| {
        let skipped = apply_with_policy(kernel, doc, &name, &request.properties, policy)?;
        kernel.recompute(doc).map_err(BridgeError::creation)?;
        Ok(skipped)
    })
}

fn construct<K: CadKernel + ?Sized>(kernel: &mut K, doc: &str, ctor: &str, name: &str) -> Result<String, BridgeError> {
    kernel.construct(doc, ctor, name).map_err(BridgeError::creation)
}

/// Run the setup steps of a new object, removing it if any step fails
fn guarded<K, F>(kernel: &mut K, doc: &str, name: &str, setup: F) -> Result<Created, BridgeError>
where
    K: CadKernel + ?Sized,
    F: FnOnce(&mut K) -> Result<Vec<PropertyError>, BridgeError>,
{
    match setup(kernel) {
        Ok(skipped) => {
            tracing::info!("Created '{}' in '{}'", name, doc);
            Ok(Created {
                name: name.to_string(),
                skipped,
            })
        }
        Err(e) => {
            tracing::warn!("Creating '{}' failed, removing it: {}", name, e);
            if let Err(cleanup) = kernel.remove_object(doc, name) {
                tracing::warn!("Could not remove '{}': {}", name, cleanup);
            }
            // Leave dependent shapes consistent with the removal
            if let Err(cleanup) = kernel.recompute(doc) {
                tracing::warn!("Recompute of '{}' after removing '{}' failed: {}", doc, name, cleanup);
            }
            Err(e)
        }
    }
}

/// Apply properties, failing under the strict policy
pub(crate) fn apply_with_policy<K: CadKernel + ?Sized>(
    kernel: &mut K,
    doc: &str,
    obj: &str,
    props: &serde_json::Map<String, Value>,
    policy: PropertyPolicy,
) -> Result<Vec<PropertyError>, BridgeError> {
    match (applier::apply(kernel, doc, obj, props), policy) {
        (Ok(()), _) => Ok(Vec::new()),
        (Err(errors), PropertyPolicy::Strict) => Err(BridgeError::from_properties(errors)),
        (Err(errors), PropertyPolicy::BestEffort) => {
            for e in &errors {
                tracing::warn!("Skipped property on '{}': {}", obj, e);
            }
            Ok(errors)
        }
    }
}
