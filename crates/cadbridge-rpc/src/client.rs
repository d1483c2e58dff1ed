//! Bridge client
//!
//! Typed access to a running bridge. Failed envelopes come back as
//! [`ClientError::Bridge`] carrying the same [`ErrorKind`] the server
//! reported, so callers can match on it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use base64::Engine as _;
use cadbridge_engine::{ErrorKind, ObjectRequest};
use serde_json::{Map, Value, json};
use thiserror::Error;

use crate::protocol::{Request, Response};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClientError {
    /// The bridge cannot be reached
    #[error("Connection error: {0}")]
    Connection(String),

    /// The server rejected the call itself
    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    /// The operation ran and failed
    #[error("{message}")]
    Bridge {
        kind: ErrorKind,
        message: String,
        /// Captured output of a failed script
        output: Option<String>,
    },

    /// The response did not have the expected shape
    #[error("Unexpected response: {0}")]
    Protocol(String),
}

impl ClientError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Connection(_) => ErrorKind::ConnectionError,
            Self::Bridge { kind, .. } => *kind,
            Self::Rpc { .. } | Self::Protocol(_) => ErrorKind::InternalError,
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::Protocol(e.to_string())
        } else {
            Self::Connection(e.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;

/// Output of a successful `execute_code`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeOutput {
    pub message: String,
    pub output: String,
}

/// Edit result: the object name plus properties skipped best-effort
#[derive(Debug, Clone, PartialEq)]
pub struct Applied {
    pub object_name: String,
    pub skipped: Vec<Value>,
}

/// Connection to a bridge endpoint
pub struct BridgeClient {
    http: reqwest::Client,
    url: String,
    next_id: AtomicU64,
}

impl BridgeClient {
    /// Client for `http://{host}:{port}/rpc` without checking liveness
    pub fn new(host: &str, port: u16) -> Result<Self> {
        Self::with_url(format!("http://{host}:{port}/rpc"))
    }

    pub fn with_url(url: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| ClientError::Connection(e.to_string()))?;
        Ok(Self {
            http,
            url: url.into(),
            next_id: AtomicU64::new(1),
        })
    }

    /// Connect and confirm the bridge answers
    pub async fn connect(host: &str, port: u16) -> Result<Self> {
        let client = Self::new(host, port)?;
        match client.ping().await {
            Ok(true) => Ok(client),
            Ok(false) => Err(ClientError::Connection(format!(
                "bridge at {} is up but its owning context does not answer",
                client.url
            ))),
            Err(e) => Err(ClientError::Connection(format!("bridge at {} unreachable: {e}", client.url))),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Raw call returning the success envelope
    pub async fn call(&self, method: &str, params: Value) -> Result<Map<String, Value>> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = Request::new(id, method, params);

        let response: Response = self
            .http
            .post(&self.url)
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if let Some(error) = response.error {
            return Err(ClientError::Rpc {
                code: error.code,
                message: error.message,
            });
        }
        let Some(Value::Object(envelope)) = response.result else {
            return Err(ClientError::Protocol(format!("'{method}' returned no envelope")));
        };

        if envelope.get("success").and_then(Value::as_bool) == Some(true) {
            return Ok(envelope);
        }

        let kind = envelope
            .get("kind")
            .cloned()
            .and_then(|k| serde_json::from_value(k).ok())
            .unwrap_or(ErrorKind::InternalError);
        Err(ClientError::Bridge {
            kind,
            message: text(&envelope, "error").unwrap_or_else(|| "unknown error".into()),
            output: text(&envelope, "output"),
        })
    }

    pub async fn ping(&self) -> Result<bool> {
        match self.call("ping", json!([])).await {
            Ok(_) => Ok(true),
            Err(ClientError::Bridge { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    pub async fn create_document(&self, name: &str) -> Result<String> {
        let env = self.call("create_document", json!([name])).await?;
        field(&env, "document_name")
    }

    pub async fn create_object(&self, doc: &str, request: &ObjectRequest) -> Result<Applied> {
        let env = self.call("create_object", json!([doc, request.to_wire()])).await?;
        applied(&env)
    }

    pub async fn edit_object(&self, doc: &str, obj: &str, properties: Map<String, Value>) -> Result<Applied> {
        let env = self
            .call("edit_object", json!([doc, obj, {"Properties": properties}]))
            .await?;
        applied(&env)
    }

    pub async fn delete_object(&self, doc: &str, obj: &str) -> Result<()> {
        self.call("delete_object", json!([doc, obj])).await.map(|_| ())
    }

    pub async fn execute_code(&self, code: &str) -> Result<CodeOutput> {
        let env = self.call("execute_code", json!([code])).await?;
        Ok(CodeOutput {
            message: field(&env, "message")?,
            output: text(&env, "output").unwrap_or_default(),
        })
    }

    pub async fn get_objects(&self, doc: &str) -> Result<Vec<Value>> {
        let env = self.call("get_objects", json!([doc])).await?;
        field(&env, "objects")
    }

    pub async fn get_object(&self, doc: &str, obj: &str) -> Result<Value> {
        let env = self.call("get_object", json!([doc, obj])).await?;
        field(&env, "object")
    }

    pub async fn list_documents(&self) -> Result<Vec<String>> {
        let env = self.call("list_documents", json!([])).await?;
        field(&env, "documents")
    }

    pub async fn insert_part_from_library(&self, relative_path: &str) -> Result<Vec<String>> {
        let env = self.call("insert_part_from_library", json!([relative_path])).await?;
        field(&env, "objects")
    }

    pub async fn get_parts_list(&self) -> Result<Vec<String>> {
        let env = self.call("get_parts_list", json!([])).await?;
        field(&env, "parts")
    }

    pub async fn refresh_parts_list(&self) -> Result<Vec<String>> {
        let env = self.call("refresh_parts_list", json!([])).await?;
        field(&env, "parts")
    }

    /// PNG capture of the active view, `None` when nothing can be captured
    pub async fn get_active_screenshot(&self, view: &str) -> Result<Option<Vec<u8>>> {
        let env = match self.call("get_active_screenshot", json!([view])).await {
            Ok(env) => env,
            Err(ClientError::Bridge {
                kind: ErrorKind::CaptureError,
                message,
                ..
            }) => {
                tracing::debug!("No screenshot: {}", message);
                return Ok(None);
            }
            Err(e) => return Err(e),
        };
        let b64: String = field(&env, "image")?;
        base64::engine::general_purpose::STANDARD
            .decode(b64)
            .map(Some)
            .map_err(|e| ClientError::Protocol(format!("bad image data: {e}")))
    }
}

fn text(env: &Map<String, Value>, key: &str) -> Option<String> {
    env.get(key).and_then(Value::as_str).map(str::to_string)
}

fn field<T: serde::de::DeserializeOwned>(env: &Map<String, Value>, key: &str) -> Result<T> {
    let value = env
        .get(key)
        .cloned()
        .ok_or_else(|| ClientError::Protocol(format!("missing '{key}'")))?;
    serde_json::from_value(value).map_err(|e| ClientError::Protocol(format!("bad '{key}': {e}")))
}

fn applied(env: &Map<String, Value>) -> Result<Applied> {
    Ok(Applied {
        object_name: field(env, "object_name")?,
        skipped: env
            .get("skipped")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default(),
    })
}
