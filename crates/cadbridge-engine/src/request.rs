//! Wire description of an object to create

use serde_json::{Map, Value};

use crate::error::BridgeError;

/// A create request: `{"Name", "Type", "Analysis", "Properties"}`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectRequest {
    /// Requested name; the kernel picks one when empty or taken
    pub name: String,
    /// Dotted type id such as `Part::Box` or `Fem::ConstraintFixed`
    pub type_id: String,
    /// Analysis container to register the new object under
    pub analysis: Option<String>,
    pub properties: Map<String, Value>,
}

impl ObjectRequest {
    pub fn new(type_id: impl Into<String>) -> Self {
        Self {
            type_id: type_id.into(),
            ..Self::default()
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn in_analysis(mut self, analysis: impl Into<String>) -> Self {
        self.analysis = Some(analysis.into());
        self
    }

    pub fn with_property(mut self, name: impl Into<String>, value: Value) -> Self {
        self.properties.insert(name.into(), value);
        self
    }

    /// Parse the wire mapping; `Type` is required
    pub fn from_wire(wire: &Value) -> Result<Self, BridgeError> {
        let map = wire.as_object().ok_or_else(|| BridgeError::Decode {
            property: "request".into(),
            message: "expected a mapping with Name, Type, Analysis and Properties".into(),
        })?;

        let text = |key: &str| -> Result<Option<String>, BridgeError> {
            match map.get(key) {
                None | Some(Value::Null) => Ok(None),
                Some(Value::String(s)) => Ok(Some(s.clone())),
                Some(_) => Err(BridgeError::Decode {
                    property: key.to_string(),
                    message: "expected a string".into(),
                }),
            }
        };

        let type_id = text("Type")?
            .filter(|t| !t.is_empty())
            .ok_or_else(|| BridgeError::MissingField("Type".into()))?;

        let properties = match map.get("Properties") {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(props)) => props.clone(),
            Some(_) => {
                return Err(BridgeError::Decode {
                    property: "Properties".into(),
                    message: "expected a mapping".into(),
                });
            }
        };

        Ok(Self {
            name: text("Name")?.unwrap_or_default(),
            type_id,
            analysis: text("Analysis")?.filter(|a| !a.is_empty()),
            properties,
        })
    }

    pub fn to_wire(&self) -> Value {
        let mut map = Map::new();
        if !self.name.is_empty() {
            map.insert("Name".into(), Value::String(self.name.clone()));
        }
        map.insert("Type".into(), Value::String(self.type_id.clone()));
        if let Some(analysis) = &self.analysis {
            map.insert("Analysis".into(), Value::String(analysis.clone()));
        }
        map.insert("Properties".into(), Value::Object(self.properties.clone()));
        Value::Object(map)
    }
}

/// Properties of an edit request, accepting both `{"Properties": {...}}`
/// and a bare mapping
pub fn edit_properties(wire: &Value) -> Result<Map<String, Value>, BridgeError> {
    match wire {
        Value::Object(map) => match map.get("Properties") {
            Some(Value::Object(props)) => Ok(props.clone()),
            Some(_) => Err(BridgeError::Decode {
                property: "Properties".into(),
                message: "expected a mapping".into(),
            }),
            None => Ok(map.clone()),
        },
        _ => Err(BridgeError::Decode {
            property: "Properties".into(),
            message: "expected a mapping".into(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_full_request() {
        let req = ObjectRequest::from_wire(&json!({
            "Name": "Fixed",
            "Type": "Fem::ConstraintFixed",
            "Analysis": "Analysis",
            "Properties": {"Scale": 2}
        }))
        .unwrap();
        assert_eq!(req.name, "Fixed");
        assert_eq!(req.analysis.as_deref(), Some("Analysis"));
        assert_eq!(req.properties["Scale"], json!(2));
        assert_eq!(ObjectRequest::from_wire(&req.to_wire()).unwrap(), req);
    }

    #[test]
    fn test_type_is_required() {
        let err = ObjectRequest::from_wire(&json!({"Name": "Box"})).unwrap_err();
        assert_eq!(err, BridgeError::MissingField("Type".into()));
    }

    #[test]
    fn test_edit_accepts_both_forms() {
        let wrapped = edit_properties(&json!({"Properties": {"Length": 5}})).unwrap();
        let bare = edit_properties(&json!({"Length": 5})).unwrap();
        assert_eq!(wrapped, bare);
    }
}
