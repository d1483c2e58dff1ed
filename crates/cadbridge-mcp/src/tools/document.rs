use schemars::JsonSchema;
use serde::Deserialize;

/// Request for creating a document
#[derive(Debug, Deserialize, JsonSchema)]
pub struct CreateDocumentRequest {
    /// Name of the new document. A numeric suffix is added if it is taken.
    pub name: String,
}

/// Request naming a document
#[derive(Debug, Deserialize, JsonSchema)]
pub struct DocumentRequest {
    /// Name of the document
    pub doc_name: String,
}
