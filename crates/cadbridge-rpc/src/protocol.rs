//! JSON-RPC 2.0 framing
//!
//! Protocol faults (bad JSON, unknown method, wrong arguments) and internal
//! failures are JSON-RPC errors. A bridge operation that fails still
//! produces a normal result carrying the `{success: false, ...}` envelope.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const JSONRPC_VERSION: &str = "2.0";

pub const PARSE_ERROR: i64 = -32700;
pub const INVALID_REQUEST: i64 = -32600;
pub const METHOD_NOT_FOUND: i64 = -32601;
pub const INVALID_PARAMS: i64 = -32602;
pub const INTERNAL_ERROR: i64 = -32603;

/// A call as it arrives on the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Value,
    pub method: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub params: Value,
}

impl Request {
    pub fn new(id: u64, method: impl Into<String>, params: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: Value::from(id),
            method: method.into(),
            params,
        }
    }

    /// Validate a parsed JSON body as a single request
    pub fn from_value(value: Value) -> Result<Self, Box<Response>> {
        let id = value.get("id").cloned().unwrap_or(Value::Null);
        let request: Self = serde_json::from_value(value).map_err(|e| {
            Box::new(Response::failure(id.clone(), RpcError::new(INVALID_REQUEST, e.to_string())))
        })?;
        if request.jsonrpc != JSONRPC_VERSION {
            return Err(Box::new(Response::failure(
                id,
                RpcError::new(INVALID_REQUEST, format!("unsupported jsonrpc version '{}'", request.jsonrpc)),
            )));
        }
        Ok(request)
    }
}

/// Protocol-level error object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RpcError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(INVALID_PARAMS, message)
    }
}

impl std::fmt::Display for RpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl Response {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: Value, error: RpcError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }
}

/// Call arguments, given either by position or by name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params {
    positional: Vec<Value>,
    named: Map<String, Value>,
}

impl Params {
    pub fn from_value(value: Value) -> Result<Self, RpcError> {
        match value {
            Value::Null => Ok(Self::default()),
            Value::Array(positional) => Ok(Self {
                positional,
                named: Map::new(),
            }),
            Value::Object(named) => Ok(Self {
                positional: Vec::new(),
                named,
            }),
            _ => Err(RpcError::invalid_params("params must be an array or an object")),
        }
    }

    /// Argument at `index`, or under `name` for named calls
    pub fn get(&self, index: usize, name: &str) -> Option<&Value> {
        self.positional
            .get(index)
            .or_else(|| self.named.get(name))
            .filter(|v| !v.is_null())
    }

    pub fn required(&self, index: usize, name: &str) -> Result<&Value, RpcError> {
        self.get(index, name)
            .ok_or_else(|| RpcError::invalid_params(format!("missing argument '{name}'")))
    }

    pub fn required_str(&self, index: usize, name: &str) -> Result<&str, RpcError> {
        self.required(index, name)?
            .as_str()
            .ok_or_else(|| RpcError::invalid_params(format!("argument '{name}' must be a string")))
    }

    pub fn optional_str<'a>(&'a self, index: usize, name: &str, default: &'a str) -> Result<&'a str, RpcError> {
        match self.get(index, name) {
            None => Ok(default),
            Some(v) => v
                .as_str()
                .ok_or_else(|| RpcError::invalid_params(format!("argument '{name}' must be a string"))),
        }
    }
}
