use schemars::JsonSchema;
use serde::Deserialize;

/// Request for inserting a library part
#[derive(Debug, Deserialize, JsonSchema)]
pub struct InsertPartRequest {
    /// Path of the part relative to the library root, as listed by
    /// get_parts_list, e.g. "fasteners/bolts/m6.cbpart"
    pub relative_path: String,
}
