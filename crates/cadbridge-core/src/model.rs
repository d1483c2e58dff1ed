//! Document and object records
//!
//! These are the live records owned by the kernel. Wire serialization lives
//! here too so every kernel produces the same JSON shape for queries.

use std::collections::BTreeMap;
use std::path::PathBuf;

use glam::DVec3;
use serde_json::{Map, Value, json};

use crate::codec::encode;
use crate::value::{Color, PropertyKind, PropertyValue};

/// A declared property slot
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub kind: PropertyKind,
    pub value: PropertyValue,
    /// Output-only slots, such as generated mesh statistics
    pub read_only: bool,
}

impl Property {
    /// Writable slot whose kind follows the initial value
    pub fn new(value: PropertyValue) -> Self {
        Self {
            kind: value.kind(),
            value,
            read_only: false,
        }
    }

    pub fn read_only(value: PropertyValue) -> Self {
        Self {
            read_only: true,
            ..Self::new(value)
        }
    }
}

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundBox {
    pub min: DVec3,
    pub max: DVec3,
}

impl BoundBox {
    pub fn new(min: DVec3, max: DVec3) -> Self {
        Self { min, max }
    }

    /// Smallest box holding every point
    pub fn from_points(points: impl IntoIterator<Item = DVec3>) -> Option<Self> {
        points.into_iter().fold(None, |acc, p| {
            Some(match acc {
                None => Self::new(p, p),
                Some(b) => Self::new(b.min.min(p), b.max.max(p)),
            })
        })
    }

    pub fn size(&self) -> DVec3 {
        self.max - self.min
    }

    pub fn center(&self) -> DVec3 {
        (self.min + self.max) * 0.5
    }

    pub fn volume(&self) -> f64 {
        let s = self.size().max(DVec3::ZERO);
        s.x * s.y * s.z
    }

    pub fn union(&self, other: &Self) -> Self {
        Self::new(self.min.min(other.min), self.max.max(other.max))
    }

    /// Overlap box, if the boxes intersect
    pub fn intersection(&self, other: &Self) -> Option<Self> {
        let min = self.min.max(other.min);
        let max = self.max.min(other.max);
        (min.cmplt(max).all()).then_some(Self::new(min, max))
    }

    /// The eight corners
    pub fn corners(&self) -> [DVec3; 8] {
        let (a, b) = (self.min, self.max);
        [
            DVec3::new(a.x, a.y, a.z),
            DVec3::new(b.x, a.y, a.z),
            DVec3::new(a.x, b.y, a.z),
            DVec3::new(b.x, b.y, a.z),
            DVec3::new(a.x, a.y, b.z),
            DVec3::new(b.x, a.y, b.z),
            DVec3::new(a.x, b.y, b.z),
            DVec3::new(b.x, b.y, b.z),
        ]
    }
}

/// Derived geometry of an object, recomputed by the document
#[derive(Debug, Clone, PartialEq)]
pub struct Shape {
    pub volume: f64,
    pub area: f64,
    pub vertex_count: usize,
    pub edge_count: usize,
    pub face_count: usize,
    /// Global-space bounds
    pub bound_box: BoundBox,
}

impl Shape {
    pub fn to_wire(&self) -> Value {
        json!({
            "Volume": self.volume,
            "Area": self.area,
            "VertexCount": self.vertex_count,
            "EdgeCount": self.edge_count,
            "FaceCount": self.face_count,
        })
    }
}

/// Display state of an object
#[derive(Debug, Clone, PartialEq)]
pub struct ViewRecord {
    pub shape_color: Color,
    /// Percent, 0 (opaque) to 100 (invisible)
    pub transparency: u8,
    pub visibility: bool,
}

impl Default for ViewRecord {
    fn default() -> Self {
        Self {
            shape_color: Color::DEFAULT_SHAPE,
            transparency: 0,
            visibility: true,
        }
    }
}

impl ViewRecord {
    pub fn to_wire(&self) -> Value {
        json!({
            "ShapeColor": encode(&PropertyValue::Color(self.shape_color)),
            "Transparency": self.transparency,
            "Visibility": self.visibility,
        })
    }
}

/// A live parametric object inside a document
#[derive(Debug, Clone, PartialEq)]
pub struct DocObject {
    pub name: String,
    pub label: String,
    pub type_id: String,
    pub properties: BTreeMap<String, Property>,
    pub shape: Option<Shape>,
    pub view: Option<ViewRecord>,
}

impl DocObject {
    pub fn new(name: impl Into<String>, type_id: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            label: name.clone(),
            name,
            type_id: type_id.into(),
            properties: BTreeMap::new(),
            shape: None,
            view: None,
        }
    }

    pub fn property(&self, name: &str) -> Option<&PropertyValue> {
        self.properties.get(name).map(|p| &p.value)
    }

    /// Numeric property, or `default` when absent or non-numeric
    pub fn number(&self, name: &str, default: f64) -> f64 {
        self.property(name).and_then(PropertyValue::as_f64).unwrap_or(default)
    }

    /// Names of every object this one links to
    pub fn dependencies(&self) -> Vec<&str> {
        self.properties
            .values()
            .flat_map(|p| p.value.referenced_names())
            .collect()
    }

    /// Wire form returned by object queries
    pub fn to_wire(&self) -> Value {
        let properties: Map<String, Value> = self
            .properties
            .iter()
            .map(|(name, prop)| (name.clone(), encode(&prop.value)))
            .collect();

        json!({
            "Name": self.name,
            "Label": self.label,
            "TypeId": self.type_id,
            "Properties": properties,
            "Placement": self.property("Placement").map_or(Value::Null, encode),
            "Shape": self.shape.as_ref().map_or(Value::Null, Shape::to_wire),
            "ViewObject": self.view.as_ref().map_or_else(|| json!({}), ViewRecord::to_wire),
        })
    }
}

/// A named container of objects
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document {
    pub name: String,
    pub label: String,
    /// Backing file, if the document was saved or loaded
    pub file_name: Option<PathBuf>,
    /// Objects in creation order
    pub objects: Vec<DocObject>,
}

impl Document {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            label: name.clone(),
            name,
            file_name: None,
            objects: Vec::new(),
        }
    }

    pub fn object(&self, name: &str) -> Option<&DocObject> {
        self.objects.iter().find(|o| o.name == name)
    }

    pub fn object_mut(&mut self, name: &str) -> Option<&mut DocObject> {
        self.objects.iter_mut().find(|o| o.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.object(name).is_some()
    }

    pub fn object_names(&self) -> Vec<String> {
        self.objects.iter().map(|o| o.name.clone()).collect()
    }

    pub fn to_wire(&self) -> Value {
        json!({
            "Name": self.name,
            "Label": self.label,
            "FileName": self.file_name.as_ref().map_or_else(String::new, |p| p.display().to_string()),
            "Objects": self.objects.iter().map(DocObject::to_wire).collect::<Vec<_>>(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Placement;

    fn boxed(name: &str) -> DocObject {
        let mut obj = DocObject::new(name, "Part::Box");
        obj.properties
            .insert("Length".into(), Property::new(PropertyValue::Float(10.0)));
        obj.properties.insert(
            "Placement".into(),
            Property::new(PropertyValue::Placement(Placement::default())),
        );
        obj
    }

    #[test]
    fn test_object_wire_shape() {
        let mut obj = boxed("Box");
        obj.view = Some(ViewRecord::default());
        let wire = obj.to_wire();

        assert_eq!(wire["Name"], "Box");
        assert_eq!(wire["TypeId"], "Part::Box");
        assert_eq!(wire["Properties"]["Length"], json!(10.0));
        assert!(wire["Placement"]["Base"].is_object());
        assert!(wire["Shape"].is_null());
        assert_eq!(wire["ViewObject"]["Visibility"], true);
    }

    #[test]
    fn test_object_without_view_has_empty_view_object() {
        let wire = DocObject::new("Group", "App::DocumentObjectGroup").to_wire();
        assert_eq!(wire["ViewObject"], json!({}));
        assert!(wire["Placement"].is_null());
    }

    #[test]
    fn test_bound_box_intersection() {
        let a = BoundBox::new(DVec3::ZERO, DVec3::splat(2.0));
        let b = BoundBox::new(DVec3::ONE, DVec3::splat(3.0));
        let overlap = a.intersection(&b).unwrap();
        assert_eq!(overlap.volume(), 1.0);

        let far = BoundBox::new(DVec3::splat(5.0), DVec3::splat(6.0));
        assert!(a.intersection(&far).is_none());
    }

    #[test]
    fn test_document_lookup() {
        let mut doc = Document::new("Doc");
        doc.objects.push(boxed("Box"));
        assert!(doc.contains("Box"));
        assert!(doc.object("Missing").is_none());
        assert_eq!(doc.to_wire()["Objects"].as_array().unwrap().len(), 1);
    }
}
