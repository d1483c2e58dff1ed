//! Command dispatcher
//!
//! Maps method names onto bridge operations and bridge results onto the
//! uniform envelope:
//!
//! ```json
//! {"success": true,  "document_name": "Doc1"}
//! {"success": false, "error": "Document 'Doc9' not found", "kind": "DocumentNotFound"}
//! ```

use base64::Engine as _;
use cadbridge_engine::{Bridge, BridgeError, ErrorKind, ObjectRequest, PropertyError, edit_properties};
use serde_json::{Map, Value, json};

use crate::protocol::{INTERNAL_ERROR, METHOD_NOT_FOUND, Params, RpcError};

/// Every method the dispatcher answers
pub const METHODS: &[&str] = &[
    "ping",
    "create_document",
    "create_object",
    "edit_object",
    "delete_object",
    "execute_code",
    "get_objects",
    "get_object",
    "list_documents",
    "insert_part_from_library",
    "get_parts_list",
    "refresh_parts_list",
    "get_active_screenshot",
];

/// View used when a screenshot call names none
pub const DEFAULT_VIEW: &str = "Isometric";

#[derive(Clone)]
pub struct Dispatcher {
    bridge: Bridge,
}

impl Dispatcher {
    pub fn new(bridge: Bridge) -> Self {
        Self { bridge }
    }

    pub fn bridge(&self) -> &Bridge {
        &self.bridge
    }

    /// Run one method call, returning its envelope
    ///
    /// # Errors
    /// Protocol faults (unknown methods, unusable arguments) and internal
    /// failures such as a task that panicked in the owning context.
    pub async fn call(&self, method: &str, params: &Params) -> Result<Value, RpcError> {
        tracing::debug!("Dispatching {}", method);
        let bridge = &self.bridge;

        let envelope = match method {
            "ping" => json!({"success": bridge.ping().await}),

            "create_document" => {
                let name = params.required_str(0, "name")?;
                respond(bridge.create_document(name).await, |doc| {
                    json!({"document_name": doc, "message": format!("Document '{doc}' created")})
                })
            }

            "create_object" => {
                let doc = params.required_str(0, "doc_name")?;
                match ObjectRequest::from_wire(params.required(1, "obj_data")?) {
                    Ok(request) => respond(bridge.create_object(doc, request).await, |created| {
                        with_skipped(
                            json!({
                                "object_name": created.name,
                                "message": format!("Object '{}' created in '{doc}'", created.name),
                            }),
                            &created.skipped,
                        )
                    }),
                    Err(e) => failure(&e),
                }
            }

            "edit_object" => {
                let doc = params.required_str(0, "doc_name")?;
                let obj = params.required_str(1, "obj_name")?;
                match edit_properties(params.required(2, "obj_data")?) {
                    Ok(props) => respond(bridge.edit_object(doc, obj, props).await, |skipped| {
                        with_skipped(
                            json!({"object_name": obj, "message": format!("Object '{obj}' updated")}),
                            &skipped,
                        )
                    }),
                    Err(e) => failure(&e),
                }
            }

            "delete_object" => {
                let doc = params.required_str(0, "doc_name")?;
                let obj = params.required_str(1, "obj_name")?;
                respond(bridge.delete_object(doc, obj).await, |()| {
                    json!({"object_name": obj, "message": format!("Object '{obj}' deleted")})
                })
            }

            "execute_code" => {
                let code = params.required_str(0, "code")?;
                match bridge.execute_code(code).await {
                    Ok(out) => {
                        let message = match &out.value {
                            Some(value) => format!("Code executed successfully, result: {value}"),
                            None => "Code executed successfully".to_string(),
                        };
                        json!({"success": true, "message": message, "output": out.output})
                    }
                    Err(e) => failure(&e),
                }
            }

            "get_objects" => {
                let doc = params.required_str(0, "doc_name")?;
                respond(bridge.get_objects(doc).await, |objects| json!({"objects": objects}))
            }

            "get_object" => {
                let doc = params.required_str(0, "doc_name")?;
                let obj = params.required_str(1, "obj_name")?;
                respond(bridge.get_object(doc, obj).await, |object| json!({"object": object}))
            }

            "list_documents" => respond(bridge.list_documents().await, |docs| json!({"documents": docs})),

            "insert_part_from_library" => {
                let path = params.required_str(0, "relative_path")?;
                respond(bridge.insert_part_from_library(path).await, |added| {
                    json!({"objects": added, "message": format!("Inserted {path}")})
                })
            }

            "get_parts_list" => respond(bridge.get_parts_list(), |parts| json!({"parts": parts})),

            "refresh_parts_list" => respond(bridge.refresh_parts_list(), |parts| json!({"parts": parts})),

            "get_active_screenshot" => {
                let view = params.optional_str(0, "view_name", DEFAULT_VIEW)?;
                respond(bridge.get_active_screenshot(view).await, |png| {
                    json!({"image": base64::engine::general_purpose::STANDARD.encode(png)})
                })
            }

            other => {
                return Err(RpcError::new(METHOD_NOT_FOUND, format!("unknown method '{other}'")));
            }
        };

        internal_fault(envelope)
    }
}

/// Internal failures leave the envelope and become JSON-RPC internal errors
fn internal_fault(envelope: Value) -> Result<Value, RpcError> {
    if envelope.get("kind").and_then(Value::as_str) != Some(ErrorKind::InternalError.as_str()) {
        return Ok(envelope);
    }
    let message = envelope
        .get("error")
        .and_then(Value::as_str)
        .unwrap_or("internal error")
        .to_string();
    Err(RpcError {
        code: INTERNAL_ERROR,
        message,
        data: Some(envelope),
    })
}

/// Build the envelope for a bridge result
fn respond<T>(result: Result<T, BridgeError>, payload: impl FnOnce(T) -> Value) -> Value {
    match result {
        Ok(value) => {
            let mut envelope = payload(value);
            if let Value::Object(map) = &mut envelope {
                map.insert("success".into(), Value::Bool(true));
            }
            envelope
        }
        Err(e) => failure(&e),
    }
}

fn failure(e: &BridgeError) -> Value {
    tracing::debug!("Call failed: {}", e);
    let mut map = Map::new();
    map.insert("success".into(), Value::Bool(false));
    map.insert("error".into(), Value::String(e.to_string()));
    map.insert("kind".into(), Value::String(e.kind().to_string()));
    if let BridgeError::Script { output, .. } = e {
        map.insert("output".into(), Value::String(output.clone()));
    }
    Value::Object(map)
}

fn with_skipped(mut envelope: Value, skipped: &[PropertyError]) -> Value {
    if let (false, Value::Object(map)) = (skipped.is_empty(), &mut envelope) {
        let list = skipped
            .iter()
            .map(|e| {
                json!({
                    "property": e.property,
                    "error": e.error.to_string(),
                    "kind": e.error.kind().to_string(),
                })
            })
            .collect();
        map.insert("skipped".into(), Value::Array(list));
    }
    envelope
}
