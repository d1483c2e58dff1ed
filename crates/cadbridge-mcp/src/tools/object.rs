//! Object tools
//!
//! Property values use the bridge's wire forms: vectors `{"x","y","z"}`,
//! placements `{"Base": vector, "Rotation": {"Axis": vector, "Angle": degrees}}`,
//! colors `[r, g, b, a]` and links as object names.

use cadbridge_engine::ObjectRequest;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{Map, Value};

/// Request for creating an object
#[derive(Debug, Deserialize, JsonSchema)]
pub struct CreateObjectRequest {
    /// Document to create the object in
    pub doc_name: String,

    /// Type id, e.g. "Part::Box", "Part::Cut", "Fem::ConstraintFixed",
    /// "Fem::FemMeshGmsh"
    pub obj_type: String,

    /// Name of the new object. A unique name is derived from the type when empty.
    #[serde(default)]
    pub obj_name: String,

    /// Analysis container to add a simulation object to (Fem types only)
    #[serde(default)]
    pub analysis_name: Option<String>,

    /// Initial properties, e.g. {"Length": 10, "Placement": {"Base": {"x": 5}}}.
    /// Boolean features link their inputs by name: {"Base": "Box", "Tool": "Cylinder"}.
    /// Constraints take "References": [["Box", "Face1"]]. Display properties
    /// go in "ViewObject": {"ShapeColor": [1, 0, 0, 1], "Transparency": 50}.
    #[serde(default)]
    pub obj_properties: Option<Map<String, Value>>,
}

impl CreateObjectRequest {
    pub fn to_request(&self) -> ObjectRequest {
        ObjectRequest {
            name: self.obj_name.clone(),
            type_id: self.obj_type.clone(),
            analysis: self.analysis_name.clone().filter(|a| !a.is_empty()),
            properties: self.obj_properties.clone().unwrap_or_default(),
        }
    }
}

/// Request for editing an object
#[derive(Debug, Deserialize, JsonSchema)]
pub struct EditObjectRequest {
    pub doc_name: String,
    pub obj_name: String,

    /// Properties to change, in the same form as for create_object
    pub obj_properties: Map<String, Value>,
}

/// Request naming an object
#[derive(Debug, Deserialize, JsonSchema)]
pub struct ObjectNameRequest {
    pub doc_name: String,
    pub obj_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_optional_fields_default() {
        let req: CreateObjectRequest =
            serde_json::from_value(json!({"doc_name": "Doc1", "obj_type": "Part::Box"})).unwrap();
        let req = req.to_request();
        assert!(req.name.is_empty());
        assert!(req.analysis.is_none());
        assert!(req.properties.is_empty());
    }

    #[test]
    fn test_empty_analysis_is_ignored() {
        let req: CreateObjectRequest = serde_json::from_value(json!({
            "doc_name": "Doc1",
            "obj_type": "Fem::ConstraintFixed",
            "analysis_name": "",
            "obj_properties": {"Scale": 2}
        }))
        .unwrap();
        let req = req.to_request();
        assert!(req.analysis.is_none());
        assert_eq!(req.properties["Scale"], json!(2));
    }
}
