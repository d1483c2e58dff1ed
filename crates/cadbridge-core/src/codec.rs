//! Value codec between native property values and the JSON wire form
//!
//! Encoding is total: every [`PropertyValue`] produces some JSON, falling back
//! to display text for anything without a structural form. Decoding is
//! partial and directed by the declared [`PropertyKind`] of the target slot.
//!
//! Wire shapes:
//!
//! | kind | wire |
//! |---|---|
//! | vector | `{"x": 1, "y": 2, "z": 3}` (missing components are 0) |
//! | rotation | `{"Axis": {"x":0,"y":0,"z":1}, "Angle": 90}` (degrees) |
//! | placement | `{"Base": vector, "Rotation": rotation}` (`"Position"` accepted on input) |
//! | color | `[r, g, b, a]` |
//! | link | `"ObjectName"` or `null` |
//! | reference list | `[["Box", "Face1"], ["Box", ["Face2", "Face3"]]]` |

use std::collections::BTreeMap;

use glam::DVec3;
use serde_json::{Map, Number, Value, json};

use crate::error::{DecodeError, Result};
use crate::value::{Color, LinkSub, Placement, PropertyKind, PropertyValue, Rotation};

/// Key used for the position of a placement on output
pub const PLACEMENT_BASE_KEY: &str = "Base";

/// Legacy alias for the position key, accepted on input only
pub const PLACEMENT_POSITION_KEY: &str = "Position";

/// Encode a native value for the wire. Never fails.
pub fn encode(value: &PropertyValue) -> Value {
    match value {
        PropertyValue::Bool(v) => Value::Bool(*v),
        PropertyValue::Integer(v) => Value::from(*v),
        PropertyValue::Float(v) => encode_f64(*v),
        PropertyValue::String(s) => Value::String(s.clone()),
        PropertyValue::Vector(v) => encode_vector(*v),
        PropertyValue::Rotation(r) => encode_rotation(r),
        PropertyValue::Placement(p) => encode_placement(p),
        PropertyValue::List(items) => Value::Array(items.iter().map(encode).collect()),
        PropertyValue::Color(c) => Value::Array(
            c.to_array()
                .iter()
                .map(|component| encode_f64(f64::from(*component)))
                .collect(),
        ),
        PropertyValue::Map(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                .collect(),
        ),
        PropertyValue::Link(Some(name)) => Value::String(name.clone()),
        PropertyValue::Link(None) => Value::Null,
        PropertyValue::LinkList(names) => {
            Value::Array(names.iter().cloned().map(Value::String).collect())
        }
        PropertyValue::LinkSubList(refs) => Value::Array(
            refs.iter()
                .map(|r| match r.subs.as_slice() {
                    [single] => json!([r.object, single]),
                    subs => json!([r.object, subs]),
                })
                .collect(),
        ),
        PropertyValue::Opaque(text) => Value::String(text.clone()),
    }
}

pub fn encode_vector(v: DVec3) -> Value {
    json!({ "x": encode_f64(v.x), "y": encode_f64(v.y), "z": encode_f64(v.z) })
}

pub fn encode_rotation(r: &Rotation) -> Value {
    json!({ "Axis": encode_vector(r.axis), "Angle": encode_f64(r.angle) })
}

pub fn encode_placement(p: &Placement) -> Value {
    json!({
        PLACEMENT_BASE_KEY: encode_vector(p.base),
        "Rotation": encode_rotation(&p.rotation),
    })
}

// Non-finite floats have no JSON number form.
fn encode_f64(v: f64) -> Value {
    Number::from_f64(v).map_or_else(|| Value::String(v.to_string()), Value::Number)
}

/// Decode a wire value into the declared kind of the target property
pub fn decode(wire: &Value, kind: PropertyKind) -> Result<PropertyValue> {
    let mismatch = || DecodeError::Mismatch {
        expected: kind,
        found: wire_type(wire),
    };

    match kind {
        PropertyKind::Bool => wire.as_bool().map(PropertyValue::Bool).ok_or_else(mismatch),
        PropertyKind::Integer => as_integer(wire).map(PropertyValue::Integer).ok_or_else(mismatch),
        PropertyKind::Float => wire.as_f64().map(PropertyValue::Float).ok_or_else(mismatch),
        PropertyKind::String => wire
            .as_str()
            .map(|s| PropertyValue::String(s.to_string()))
            .ok_or_else(mismatch),
        PropertyKind::Vector => decode_vector(wire).map(PropertyValue::Vector),
        PropertyKind::Rotation => decode_rotation(wire).map(PropertyValue::Rotation),
        PropertyKind::Placement => decode_placement(wire).map(PropertyValue::Placement),
        PropertyKind::Color => decode_color(wire).map(PropertyValue::Color),
        PropertyKind::List => wire
            .as_array()
            .map(|items| PropertyValue::List(items.iter().map(infer).collect()))
            .ok_or_else(mismatch),
        PropertyKind::Map => decode_map(wire).map(PropertyValue::Map),
        PropertyKind::Link => match wire {
            Value::Null => Ok(PropertyValue::Link(None)),
            Value::String(name) => Ok(PropertyValue::Link(Some(name.clone()))),
            _ => Err(mismatch()),
        },
        PropertyKind::LinkList => {
            let items = wire.as_array().ok_or_else(mismatch)?;
            items
                .iter()
                .map(|item| item.as_str().map(str::to_string).ok_or_else(mismatch))
                .collect::<Result<Vec<_>>>()
                .map(PropertyValue::LinkList)
        }
        PropertyKind::LinkSubList => decode_link_sub_list(wire).map(PropertyValue::LinkSubList),
        PropertyKind::Opaque => Err(DecodeError::ReadOnly(kind)),
    }
}

/// Decode `{"x","y","z"}`, each component defaulting to 0
pub fn decode_vector(wire: &Value) -> Result<DVec3> {
    let map = as_object(wire, PropertyKind::Vector)?;
    Ok(DVec3::new(
        number_field(map, "x", 0.0, PropertyKind::Vector)?,
        number_field(map, "y", 0.0, PropertyKind::Vector)?,
        number_field(map, "z", 0.0, PropertyKind::Vector)?,
    ))
}

/// Decode `{"Axis": {..}, "Angle": deg}`; the axis defaults to `(0, 0, 1)`
/// component-wise and the angle to 0
pub fn decode_rotation(wire: &Value) -> Result<Rotation> {
    let map = as_object(wire, PropertyKind::Rotation)?;

    let axis = match map.get("Axis") {
        Some(axis) => {
            let axis = as_object(axis, PropertyKind::Rotation)?;
            DVec3::new(
                number_field(axis, "x", 0.0, PropertyKind::Rotation)?,
                number_field(axis, "y", 0.0, PropertyKind::Rotation)?,
                number_field(axis, "z", 1.0, PropertyKind::Rotation)?,
            )
        }
        None => DVec3::Z,
    };
    let angle = number_field(map, "Angle", 0.0, PropertyKind::Rotation)?;

    Ok(Rotation::new(axis, angle))
}

/// Decode a placement; `"Base"` wins over the legacy `"Position"` key
pub fn decode_placement(wire: &Value) -> Result<Placement> {
    let map = as_object(wire, PropertyKind::Placement)?;

    let position = map
        .get(PLACEMENT_BASE_KEY)
        .or_else(|| map.get(PLACEMENT_POSITION_KEY));
    let rotation = map.get("Rotation");

    if position.is_none() && rotation.is_none() {
        return Err(DecodeError::MissingPlacementKeys);
    }

    Ok(Placement {
        base: position.map(decode_vector).transpose()?.unwrap_or(DVec3::ZERO),
        rotation: rotation.map(decode_rotation).transpose()?.unwrap_or_default(),
    })
}

/// Decode `[r, g, b]` or `[r, g, b, a]`; a missing alpha is opaque
pub fn decode_color(wire: &Value) -> Result<Color> {
    let items = wire.as_array().ok_or(DecodeError::Mismatch {
        expected: PropertyKind::Color,
        found: wire_type(wire),
    })?;

    if !(3..=4).contains(&items.len()) {
        return Err(DecodeError::ColorArity(items.len()));
    }

    let mut rgba = [1.0_f32; 4];
    for (i, item) in items.iter().enumerate() {
        rgba[i] = item.as_f64().ok_or_else(|| DecodeError::NonNumeric {
            kind: PropertyKind::Color,
            field: i.to_string(),
        })? as f32;
    }

    Ok(Color::rgba(rgba[0], rgba[1], rgba[2], rgba[3]))
}

/// Decode `[[name, sub], ...]`; `sub` may be a string or a list of strings
pub fn decode_link_sub_list(wire: &Value) -> Result<Vec<LinkSub>> {
    let items = wire.as_array().ok_or(DecodeError::Mismatch {
        expected: PropertyKind::LinkSubList,
        found: wire_type(wire),
    })?;

    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            let bad = || DecodeError::BadReference { index };
            let pair = item.as_array().filter(|p| p.len() == 2).ok_or_else(bad)?;
            let object = pair[0].as_str().ok_or_else(bad)?.to_string();
            let subs = match &pair[1] {
                Value::String(sub) => vec![sub.clone()],
                Value::Array(subs) => subs
                    .iter()
                    .map(|s| s.as_str().map(str::to_string).ok_or_else(bad))
                    .collect::<Result<Vec<_>>>()?,
                _ => return Err(bad()),
            };
            Ok(LinkSub { object, subs })
        })
        .collect()
}

fn decode_map(wire: &Value) -> Result<BTreeMap<String, String>> {
    let map = as_object(wire, PropertyKind::Map)?;
    Ok(map
        .iter()
        .map(|(k, v)| {
            let text = match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (k.clone(), text)
        })
        .collect())
}

/// Best-effort decode without a declared kind
///
/// Used for list elements and for values headed to slots whose kind is
/// unknown. Mappings that look like placements, rotations or vectors become
/// those; any other mapping becomes a string map.
pub fn infer(wire: &Value) -> PropertyValue {
    match wire {
        Value::Null => PropertyValue::Link(None),
        Value::Bool(v) => PropertyValue::Bool(*v),
        Value::Number(n) => n
            .as_i64()
            .map_or_else(|| PropertyValue::Float(n.as_f64().unwrap_or(f64::NAN)), PropertyValue::Integer),
        Value::String(s) => PropertyValue::String(s.clone()),
        Value::Array(items) => PropertyValue::List(items.iter().map(infer).collect()),
        Value::Object(map) => {
            let has = |key: &str| map.contains_key(key);
            let structured = if has(PLACEMENT_BASE_KEY) || has(PLACEMENT_POSITION_KEY) || has("Rotation") {
                decode_placement(wire).map(PropertyValue::Placement).ok()
            } else if has("Axis") || has("Angle") {
                decode_rotation(wire).map(PropertyValue::Rotation).ok()
            } else if !map.is_empty() && map.keys().all(|k| matches!(k.as_str(), "x" | "y" | "z")) {
                decode_vector(wire).map(PropertyValue::Vector).ok()
            } else {
                None
            };
            structured.unwrap_or_else(|| decode_map(wire).map_or_else(|_| PropertyValue::Opaque(wire.to_string()), PropertyValue::Map))
        }
    }
}

/// JSON type name for diagnostics
pub fn wire_type(wire: &Value) -> &'static str {
    match wire {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "sequence",
        Value::Object(_) => "mapping",
    }
}

fn as_object(wire: &Value, kind: PropertyKind) -> Result<&Map<String, Value>> {
    wire.as_object().ok_or(DecodeError::Mismatch {
        expected: kind,
        found: wire_type(wire),
    })
}

fn number_field(map: &Map<String, Value>, field: &str, default: f64, kind: PropertyKind) -> Result<f64> {
    match map.get(field) {
        None => Ok(default),
        Some(v) => v.as_f64().ok_or_else(|| DecodeError::NonNumeric {
            kind,
            field: field.to_string(),
        }),
    }
}

fn as_integer(wire: &Value) -> Option<i64> {
    wire.as_i64().or_else(|| {
        wire.as_f64()
            .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
            .map(|f| f as i64)
    })
}
