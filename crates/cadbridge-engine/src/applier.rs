//! Property applier
//!
//! Applies a wire mapping of property name to value onto a live object.
//! Routing is driven by the kind the object declares for each name, never
//! by the shape of the wire value:
//!
//! 1. `References` first, clearing what was recorded before
//! 2. placements and vectors from their mapping forms
//! 3. cross-reference slots (`Base`, `Tool`, `Source`, `Profile`) by name
//! 4. undeclared display slots (`ShapeColor`, `ViewObject` mapping) to the view
//! 5. everything else through the codec, by declared kind
//!
//! Failures are collected per property; the caller's [`PropertyPolicy`]
//! decides whether any of them fails the whole request.

use cadbridge_core::codec::{decode, decode_color, decode_link_sub_list, decode_placement, decode_vector};
use cadbridge_core::value::{PropertyKind, PropertyValue};
use cadbridge_kernel::{CadKernel, require_document};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{BridgeError, PropertyError};

/// Link slots addressed by a bare object name
pub const LINK_SLOTS: [&str; 4] = ["Base", "Tool", "Source", "Profile"];

/// Reference list slot of constraints and materials
pub const REFERENCES: &str = "References";

/// Nested mapping of display properties
pub const VIEW_OBJECT: &str = "ViewObject";

/// Display properties routed to the view record
pub const VIEW_SLOTS: [&str; 3] = ["ShapeColor", "Transparency", "Visibility"];

/// What to do when some properties of a request cannot be applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyPolicy {
    /// Any failure fails the request, which is rolled back
    #[default]
    Strict,
    /// Failures are logged and reported; the rest is applied
    BestEffort,
}

/// Apply every property in `props` to `obj`
///
/// Returns the per-property failures; an empty batch always succeeds.
pub fn apply<K: CadKernel + ?Sized>(
    kernel: &mut K,
    doc: &str,
    obj: &str,
    props: &Map<String, Value>,
) -> Result<(), Vec<PropertyError>> {
    let mut errors = Vec::new();

    // Reference lists must be valid before anything that depends on them
    if let Some(wire) = props.get(REFERENCES) {
        if kernel.property_kind(doc, obj, REFERENCES) == Some(PropertyKind::LinkSubList) {
            if let Err(error) = apply_references(kernel, doc, obj, wire) {
                errors.push(PropertyError {
                    property: REFERENCES.to_string(),
                    error,
                });
            }
        }
    }

    for (name, wire) in props {
        if name == REFERENCES && kernel.property_kind(doc, obj, REFERENCES) == Some(PropertyKind::LinkSubList) {
            continue;
        }
        let result = if name == VIEW_OBJECT && kernel.property_kind(doc, obj, name).is_none() {
            apply_view_object(kernel, doc, obj, wire, &mut errors);
            Ok(())
        } else {
            apply_one(kernel, doc, obj, name, wire)
        };
        if let Err(error) = result {
            errors.push(PropertyError {
                property: name.clone(),
                error,
            });
        }
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

/// Apply a single property
pub fn apply_one<K: CadKernel + ?Sized>(
    kernel: &mut K,
    doc: &str,
    obj: &str,
    name: &str,
    wire: &Value,
) -> Result<(), BridgeError> {
    let Some(kind) = kernel.property_kind(doc, obj, name) else {
        if VIEW_SLOTS.contains(&name) && kernel.has_view(doc, obj) {
            return apply_view(kernel, doc, obj, name, wire);
        }
        return Err(BridgeError::assign(name, format!("'{obj}' has no property '{name}'")));
    };

    let value = match (kind, wire) {
        (PropertyKind::Placement, Value::Object(_)) => {
            PropertyValue::Placement(decode_placement(wire).map_err(|e| BridgeError::decode(name, &e))?)
        }
        (PropertyKind::Vector, Value::Object(_)) => {
            PropertyValue::Vector(decode_vector(wire).map_err(|e| BridgeError::decode(name, &e))?)
        }
        (PropertyKind::Link, Value::String(target)) if LINK_SLOTS.contains(&name) => {
            resolve(kernel, doc, target)?;
            PropertyValue::Link(Some(target.clone()))
        }
        (PropertyKind::LinkSubList, _) if name == REFERENCES => {
            return apply_references(kernel, doc, obj, wire);
        }
        (kind, wire) => {
            let value = decode(wire, kind).map_err(|e| BridgeError::decode(name, &e))?;
            for target in value.referenced_names() {
                resolve(kernel, doc, target)?;
            }
            value
        }
    };

    kernel
        .set_property(doc, obj, name, value)
        .map_err(|e| BridgeError::assign(name, e))
}

/// Clear then set a reference list, resolving every object first
fn apply_references<K: CadKernel + ?Sized>(
    kernel: &mut K,
    doc: &str,
    obj: &str,
    wire: &Value,
) -> Result<(), BridgeError> {
    let refs = decode_link_sub_list(wire).map_err(|e| BridgeError::decode(REFERENCES, &e))?;
    for r in &refs {
        resolve(kernel, doc, &r.object)?;
    }

    kernel
        .set_property(doc, obj, REFERENCES, PropertyValue::LinkSubList(Vec::new()))
        .and_then(|()| kernel.set_property(doc, obj, REFERENCES, PropertyValue::LinkSubList(refs)))
        .map_err(|e| BridgeError::assign(REFERENCES, e))
}

fn apply_view_object<K: CadKernel + ?Sized>(
    kernel: &mut K,
    doc: &str,
    obj: &str,
    wire: &Value,
    errors: &mut Vec<PropertyError>,
) {
    let Some(view) = wire.as_object() else {
        errors.push(PropertyError {
            property: VIEW_OBJECT.to_string(),
            error: BridgeError::Decode {
                property: VIEW_OBJECT.to_string(),
                message: "expected a mapping of view properties".into(),
            },
        });
        return;
    };

    for (slot, value) in view {
        if let Err(error) = apply_view(kernel, doc, obj, slot, value) {
            errors.push(PropertyError {
                property: format!("{VIEW_OBJECT}.{slot}"),
                error,
            });
        }
    }
}

fn apply_view<K: CadKernel + ?Sized>(
    kernel: &mut K,
    doc: &str,
    obj: &str,
    slot: &str,
    wire: &Value,
) -> Result<(), BridgeError> {
    let value = match slot {
        "ShapeColor" => decode_color(wire).map(PropertyValue::Color),
        "Transparency" => decode(wire, PropertyKind::Integer),
        "Visibility" => decode(wire, PropertyKind::Bool),
        other => {
            return Err(BridgeError::assign(other, format!("unknown view property '{other}'")));
        }
    }
    .map_err(|e| BridgeError::decode(slot, &e))?;

    kernel
        .set_view_property(doc, obj, slot, value)
        .map_err(|e| BridgeError::assign(slot, e))
}

fn resolve<K: CadKernel + ?Sized>(kernel: &K, doc: &str, target: &str) -> Result<(), BridgeError> {
    if require_document(kernel, doc)?.contains(target) {
        Ok(())
    } else {
        Err(BridgeError::ReferenceNotFound(target.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use cadbridge_core::prelude::DVec3;
    use cadbridge_core::value::{Color, LinkSub};
    use cadbridge_kernel::MemoryKernel;
    use serde_json::json;

    use crate::error::ErrorKind;

    fn setup() -> (MemoryKernel, String) {
        let mut kernel = MemoryKernel::new();
        let doc = kernel.new_document("Doc").unwrap();
        kernel.add_object(&doc, "Part::Box", "Box").unwrap();
        (kernel, doc)
    }

    fn props(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_placement_with_legacy_key() {
        let (mut kernel, doc) = setup();
        apply(
            &mut kernel,
            &doc,
            "Box",
            &props(json!({"Placement": {"Position": {"x": 1, "y": 2, "z": 3}, "Rotation": {"Angle": 90}}})),
        )
        .unwrap();

        let placement = kernel
            .object(&doc, "Box")
            .unwrap()
            .property("Placement")
            .and_then(PropertyValue::as_placement)
            .unwrap();
        assert_relative_eq!(placement.base.y, 2.0);
        assert_relative_eq!(placement.rotation.angle, 90.0);
        assert_relative_eq!(placement.rotation.axis.z, 1.0);
    }

    #[test]
    fn test_vector_defaults_missing_components() {
        let (mut kernel, doc) = setup();
        kernel.add_object(&doc, "Part::Mirroring", "Mirror").unwrap();
        apply(&mut kernel, &doc, "Mirror", &props(json!({"Normal": {"z": 5}}))).unwrap();
        assert_eq!(
            kernel.object(&doc, "Mirror").unwrap().property("Normal"),
            Some(&PropertyValue::Vector(DVec3::new(0.0, 0.0, 5.0)))
        );
    }

    #[test]
    fn test_link_slot_must_resolve() {
        let (mut kernel, doc) = setup();
        kernel.add_object(&doc, "Part::Cut", "Cut").unwrap();
        let errors = apply(&mut kernel, &doc, "Cut", &props(json!({"Base": "Box", "Tool": "Ghost"}))).unwrap_err();

        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].property, "Tool");
        assert_eq!(errors[0].error, BridgeError::ReferenceNotFound("Ghost".into()));
        // The good property was still applied
        assert_eq!(
            kernel.object(&doc, "Cut").unwrap().property("Base").and_then(PropertyValue::as_link),
            Some("Box")
        );
    }

    #[test]
    fn test_references_replace_previous() {
        let (mut kernel, doc) = setup();
        kernel.add_object(&doc, "Part::Sphere", "Ball").unwrap();
        let fixed = kernel.construct(&doc, "makeConstraintFixed", "").unwrap();

        apply(&mut kernel, &doc, &fixed, &props(json!({"References": [["Box", "Face1"], ["Box", "Face2"]]}))).unwrap();
        apply(&mut kernel, &doc, &fixed, &props(json!({"References": [["Ball", "Face1"]]}))).unwrap();

        assert_eq!(
            kernel.object(&doc, &fixed).unwrap().property("References"),
            Some(&PropertyValue::LinkSubList(vec![LinkSub::new("Ball", "Face1")]))
        );

        let errors = apply(&mut kernel, &doc, &fixed, &props(json!({"References": [["Ghost", "Face1"]]}))).unwrap_err();
        assert_eq!(errors[0].error.kind(), ErrorKind::ReferenceNotFound);
    }

    #[test]
    fn test_view_routing() {
        let (mut kernel, doc) = setup();
        apply(
            &mut kernel,
            &doc,
            "Box",
            &props(json!({"ShapeColor": [1.0, 0.0, 0.0, 1.0], "ViewObject": {"Transparency": 30, "Visibility": false}})),
        )
        .unwrap();

        let view = kernel.object(&doc, "Box").unwrap().view.clone().unwrap();
        assert_eq!(view.shape_color, Color::rgba(1.0, 0.0, 0.0, 1.0));
        assert_eq!(view.transparency, 30);
        assert!(!view.visibility);
    }

    #[test]
    fn test_transparency_is_whole_percent() {
        let (mut kernel, doc) = setup();
        apply(&mut kernel, &doc, "Box", &props(json!({"ViewObject": {"Transparency": 25.0}}))).unwrap();
        assert_eq!(kernel.object(&doc, "Box").unwrap().to_wire()["ViewObject"]["Transparency"], json!(25));

        let errors = apply(&mut kernel, &doc, "Box", &props(json!({"ViewObject": {"Transparency": 12.5}}))).unwrap_err();
        assert_eq!(errors[0].property, "ViewObject.Transparency");
        assert_eq!(errors[0].error.kind(), ErrorKind::DecodeError);
        assert_eq!(kernel.object(&doc, "Box").unwrap().view.clone().unwrap().transparency, 25);
    }

    #[test]
    fn test_failures_are_collected_not_fatal() {
        let (mut kernel, doc) = setup();
        let errors = apply(
            &mut kernel,
            &doc,
            "Box",
            &props(json!({"Height": 3, "Length": "long", "Nonsense": 1, "Width": 7})),
        )
        .unwrap_err();

        let failed: Vec<&str> = errors.iter().map(|e| e.property.as_str()).collect();
        assert_eq!(failed, vec!["Length", "Nonsense"]);
        assert_eq!(errors[0].error.kind(), ErrorKind::DecodeError);
        assert_eq!(errors[1].error.kind(), ErrorKind::PropertyAssignError);

        let obj = kernel.object(&doc, "Box").unwrap();
        assert_eq!(obj.number("Height", 0.0), 3.0);
        assert_eq!(obj.number("Width", 0.0), 7.0);
    }

    #[test]
    fn test_read_only_property_is_rejected() {
        let (mut kernel, doc) = setup();
        let mesh = kernel.construct(&doc, "makeMeshGmsh", "").unwrap();
        let errors = apply(&mut kernel, &doc, &mesh, &props(json!({"NodeCount": 5}))).unwrap_err();
        assert_eq!(errors[0].error.kind(), ErrorKind::PropertyAssignError);
    }
}
