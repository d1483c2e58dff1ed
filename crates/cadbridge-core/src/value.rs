//! Native property values of the CAD object model
//!
//! Every property on a live object holds a [`PropertyValue`] and is declared
//! with a [`PropertyKind`]. The kind is what drives decoding of incoming wire
//! values, never the shape of the wire value itself.

use std::collections::BTreeMap;
use std::fmt;

use glam::{DQuat, DVec3};
use serde::{Deserialize, Serialize};

/// Geometric 3D vector (millimetres for positions)
pub type Vector = DVec3;

/// Rotation about an axis, angle in degrees
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rotation {
    /// Rotation axis (not necessarily normalized)
    pub axis: DVec3,
    /// Rotation angle in degrees
    pub angle: f64,
}

impl Rotation {
    /// No rotation, about +Z
    pub const IDENTITY: Self = Self {
        axis: DVec3::Z,
        angle: 0.0,
    };

    pub fn new(axis: DVec3, angle: f64) -> Self {
        Self { axis, angle }
    }

    /// Quaternion form. A degenerate axis falls back to +Z.
    pub fn to_quat(&self) -> DQuat {
        let axis = self.axis.try_normalize().unwrap_or(DVec3::Z);
        DQuat::from_axis_angle(axis, self.angle.to_radians())
    }

    /// Rotate a vector
    pub fn apply(&self, v: DVec3) -> DVec3 {
        self.to_quat() * v
    }
}

impl Default for Rotation {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Position plus rotation
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Placement {
    pub base: DVec3,
    pub rotation: Rotation,
}

impl Placement {
    pub fn new(base: DVec3, rotation: Rotation) -> Self {
        Self { base, rotation }
    }

    /// Map a point from local to global coordinates
    pub fn transform_point(&self, p: DVec3) -> DVec3 {
        self.base + self.rotation.apply(p)
    }
}

/// RGBA color, components in `0.0..=1.0`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    /// Default shape color of new objects
    pub const DEFAULT_SHAPE: Self = Self::rgb(0.8, 0.8, 0.8);

    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self::rgba(r, g, b, 1.0)
    }

    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }

    /// 8-bit RGBA, clamping out-of-range components
    pub fn to_rgba8(self) -> [u8; 4] {
        self.to_array()
            .map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8)
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::DEFAULT_SHAPE
    }
}

/// A reference to sub-elements (faces, edges) of another object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkSub {
    /// Name of the referenced object
    pub object: String,
    /// Sub-element names such as `Face1`
    pub subs: Vec<String>,
}

impl LinkSub {
    pub fn new(object: impl Into<String>, sub: impl Into<String>) -> Self {
        Self {
            object: object.into(),
            subs: vec![sub.into()],
        }
    }
}

/// Declared type of a property slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PropertyKind {
    Bool,
    Integer,
    Float,
    String,
    Vector,
    Rotation,
    Placement,
    Color,
    List,
    Map,
    Link,
    LinkList,
    LinkSubList,
    Opaque,
}

impl PropertyKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::String => "string",
            Self::Vector => "vector",
            Self::Rotation => "rotation",
            Self::Placement => "placement",
            Self::Color => "color",
            Self::List => "list",
            Self::Map => "map",
            Self::Link => "link",
            Self::LinkList => "link list",
            Self::LinkSubList => "reference list",
            Self::Opaque => "opaque",
        }
    }

    /// Whether values of this kind name other objects
    pub fn is_link(self) -> bool {
        matches!(self, Self::Link | Self::LinkList | Self::LinkSubList)
    }
}

impl fmt::Display for PropertyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Value held by a property on a live object
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Vector(DVec3),
    Rotation(Rotation),
    Placement(Placement),
    Color(Color),
    List(Vec<PropertyValue>),
    Map(BTreeMap<String, String>),
    /// Single object reference by name
    Link(Option<String>),
    LinkList(Vec<String>),
    LinkSubList(Vec<LinkSub>),
    /// Anything the codec cannot represent structurally, kept as display text
    Opaque(String),
}

impl PropertyValue {
    /// The kind this value naturally belongs to
    pub fn kind(&self) -> PropertyKind {
        match self {
            Self::Bool(_) => PropertyKind::Bool,
            Self::Integer(_) => PropertyKind::Integer,
            Self::Float(_) => PropertyKind::Float,
            Self::String(_) => PropertyKind::String,
            Self::Vector(_) => PropertyKind::Vector,
            Self::Rotation(_) => PropertyKind::Rotation,
            Self::Placement(_) => PropertyKind::Placement,
            Self::Color(_) => PropertyKind::Color,
            Self::List(_) => PropertyKind::List,
            Self::Map(_) => PropertyKind::Map,
            Self::Link(_) => PropertyKind::Link,
            Self::LinkList(_) => PropertyKind::LinkList,
            Self::LinkSubList(_) => PropertyKind::LinkSubList,
            Self::Opaque(_) => PropertyKind::Opaque,
        }
    }

    /// Numeric view of integer and float values
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Integer(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_placement(&self) -> Option<Placement> {
        match self {
            Self::Placement(p) => Some(*p),
            _ => None,
        }
    }

    /// Target of a single link, if set
    pub fn as_link(&self) -> Option<&str> {
        match self {
            Self::Link(Some(name)) => Some(name),
            _ => None,
        }
    }

    /// Every object name this value refers to
    pub fn referenced_names(&self) -> Vec<&str> {
        match self {
            Self::Link(Some(name)) => vec![name.as_str()],
            Self::LinkList(names) => names.iter().map(String::as_str).collect(),
            Self::LinkSubList(refs) => refs.iter().map(|r| r.object.as_str()).collect(),
            _ => Vec::new(),
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Integer(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::String(s) | Self::Opaque(s) => f.write_str(s),
            Self::Vector(v) => write!(f, "Vector ({}, {}, {})", v.x, v.y, v.z),
            Self::Rotation(r) => write!(
                f,
                "Rotation (axis ({}, {}, {}), {} deg)",
                r.axis.x, r.axis.y, r.axis.z, r.angle
            ),
            Self::Placement(p) => write!(
                f,
                "Placement [Pos=({}, {}, {}), Axis=({}, {}, {}), Angle={}]",
                p.base.x,
                p.base.y,
                p.base.z,
                p.rotation.axis.x,
                p.rotation.axis.y,
                p.rotation.axis.z,
                p.rotation.angle
            ),
            Self::Color(c) => write!(f, "({}, {}, {}, {})", c.r, c.g, c.b, c.a),
            Self::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Self::Map(map) => write!(f, "{map:?}"),
            Self::Link(Some(name)) => write!(f, "<{name}>"),
            Self::Link(None) => f.write_str("None"),
            Self::LinkList(names) => write!(f, "{names:?}"),
            Self::LinkSubList(refs) => {
                let parts: Vec<String> = refs
                    .iter()
                    .map(|r| format!("({}, {:?})", r.object, r.subs))
                    .collect();
                write!(f, "[{}]", parts.join(", "))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_rotation_apply() {
        let rot = Rotation::new(DVec3::Z, 90.0);
        let v = rot.apply(DVec3::X);
        assert_relative_eq!(v.x, 0.0, epsilon = 1e-9);
        assert_relative_eq!(v.y, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_degenerate_axis_falls_back_to_z() {
        let rot = Rotation::new(DVec3::ZERO, 180.0);
        let v = rot.apply(DVec3::X);
        assert_relative_eq!(v.x, -1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_color_to_rgba8_clamps() {
        assert_eq!(Color::rgba(1.5, 0.0, 0.5, -1.0).to_rgba8(), [255, 0, 128, 0]);
    }

    #[test]
    fn test_referenced_names() {
        let refs = PropertyValue::LinkSubList(vec![
            LinkSub::new("Box", "Face1"),
            LinkSub::new("Cyl", "Face2"),
        ]);
        assert_eq!(refs.referenced_names(), vec!["Box", "Cyl"]);
        assert!(PropertyValue::Float(1.0).referenced_names().is_empty());
    }
}
