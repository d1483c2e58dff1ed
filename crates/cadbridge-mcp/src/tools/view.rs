//! View capture tools

use cadbridge_engine::ViewName;
use schemars::JsonSchema;
use serde::Deserialize;

fn default_view() -> String {
    "Isometric".to_string()
}

/// Request for a screenshot of the active view
#[derive(Debug, Deserialize, JsonSchema)]
pub struct GetViewRequest {
    /// Standard view to look from.
    /// Options: "Isometric" (default), "Front", "Top", "Right", "Back", "Left",
    /// "Bottom", "Dimetric", "Trimetric"
    #[serde(default = "default_view")]
    pub view_name: String,
}

impl GetViewRequest {
    /// Canonical name of the requested view, if it is one
    pub fn view(&self) -> Result<ViewName, String> {
        self.view_name.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_view_defaults_to_isometric() {
        let req: GetViewRequest = serde_json::from_value(json!({})).unwrap();
        assert_eq!(req.view(), Ok(ViewName::Isometric));
    }

    #[test]
    fn test_view_is_case_insensitive() {
        let req: GetViewRequest = serde_json::from_value(json!({"view_name": "front"})).unwrap();
        assert_eq!(req.view(), Ok(ViewName::Front));
    }

    #[test]
    fn test_unknown_view_lists_options() {
        let req: GetViewRequest = serde_json::from_value(json!({"view_name": "Sideways"})).unwrap();
        let err = req.view().unwrap_err();
        assert!(err.contains("Sideways"));
        assert!(err.contains("Trimetric"));
    }
}
