//! Script failures

use thiserror::Error;

/// Failure to compile or run a script
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScriptError {
    /// The script does not parse
    #[error("Script compilation failed: {0}")]
    Compile(String),

    /// The script raised an error while running
    #[error("Script error: {message}")]
    Runtime {
        message: String,
        /// Output printed before the failure
        output: String,
    },
}

impl ScriptError {
    /// Output captured before the failure, if any
    pub fn output(&self) -> &str {
        match self {
            Self::Compile(_) => "",
            Self::Runtime { output, .. } => output,
        }
    }
}
