//! Part files
//!
//! A part file is a small JSON document holding objects to merge into an
//! open document:
//!
//! ```json
//! {"Objects": [{"Name": "Bracket", "Type": "Part::Box", "Properties": {"Length": 40.0}}]}
//! ```
//!
//! Property values use the same wire form as object queries, so links are
//! plain object names local to the file.

use std::path::Path;

use cadbridge_core::codec::encode;
use cadbridge_core::model::Document;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{KernelError, Result};

/// File extension of part files, without the dot
pub const PART_EXTENSION: &str = "cbpart";

/// Contents of a part file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PartFile {
    #[serde(rename = "Objects")]
    pub objects: Vec<PartObject>,
}

/// One object stored in a part file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartObject {
    #[serde(rename = "Name")]
    pub name: String,

    #[serde(rename = "Type")]
    pub type_id: String,

    #[serde(rename = "Properties", default)]
    pub properties: Map<String, Value>,
}

impl PartFile {
    /// Read and parse a part file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        serde_json::from_str(&text).map_err(|e| KernelError::Project {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let text = serde_json::to_string_pretty(self).map_err(|e| KernelError::Project {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        std::fs::write(path, text)?;
        Ok(())
    }

    /// Capture the writable properties of every object in a document
    pub fn from_document(doc: &Document) -> Self {
        let objects = doc
            .objects
            .iter()
            .map(|obj| PartObject {
                name: obj.name.clone(),
                type_id: obj.type_id.clone(),
                properties: obj
                    .properties
                    .iter()
                    .filter(|(_, prop)| !prop.read_only)
                    .map(|(name, prop)| (name.clone(), encode(&prop.value)))
                    .collect(),
            })
            .collect();
        Self { objects }
    }
}
