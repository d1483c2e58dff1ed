use schemars::JsonSchema;
use serde::Deserialize;

/// Request for running code inside the CAD session
#[derive(Debug, Deserialize, JsonSchema)]
pub struct ExecuteCodeRequest {
    /// Rhai script to run against the open documents. Output of `print` is
    /// returned.
    ///
    /// Example:
    /// ```rhai
    /// let doc = active_document();
    /// for name in objects(doc) {
    ///     print(name);
    /// }
    /// ```
    pub code: String,
}
