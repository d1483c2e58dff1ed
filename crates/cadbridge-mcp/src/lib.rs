//! CadBridge MCP Server - Model Context Protocol front end for a CAD session
//!
//! This crate exposes a running `cadbridge` server to AI agents. Agents can:
//!
//! - Create documents and parametric objects, including FEM setups
//! - Edit and delete objects, and read them back in wire form
//! - Run Rhai scripts inside the session
//! - Insert parts from the shared parts library
//! - Look at the active document from any standard view
//!
//! Every mutating tool answers with a status line followed by an isometric
//! screenshot, unless the server was started in text-only mode.
//!
//! ## Workflow
//!
//! 1. `create_document` - Start a document
//! 2. `create_object` / `edit_object` - Build the model, checking each screenshot
//! 3. `get_objects` / `get_view` - Inspect the result

pub mod reply;
pub mod tools;

use std::sync::Arc;

use base64::Engine as _;
use cadbridge_rpc::{BridgeClient, DEFAULT_VIEW};
use rmcp::{
    ErrorData as McpError,
    ServerHandler,
    handler::server::tool::ToolRouter,
    handler::server::wrapper::Parameters,
    model::{CallToolResult, Content, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router,
};
use serde_json::Value;

use crate::tools::{
    code::ExecuteCodeRequest,
    document::{CreateDocumentRequest, DocumentRequest},
    object::{CreateObjectRequest, EditObjectRequest, ObjectNameRequest},
    parts::InsertPartRequest,
    view::GetViewRequest,
};

// Re-export for binary
pub use rmcp;

/// The CadBridge MCP service
///
/// Each tool call becomes one RPC call against the bridge. The bridge keeps
/// its own ordering, so the service is stateless and freely cloned.
#[derive(Clone)]
pub struct CadBridgeMcpService {
    client: Arc<BridgeClient>,
    text_only: bool,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl CadBridgeMcpService {
    pub fn new(client: BridgeClient, text_only: bool) -> Self {
        Self {
            client: Arc::new(client),
            text_only,
            tool_router: Self::tool_router(),
        }
    }

    /// Append an isometric screenshot of the active view
    async fn with_screenshot(&self, mut contents: Vec<Content>) -> Vec<Content> {
        if self.text_only {
            return contents;
        }
        match self.client.get_active_screenshot(DEFAULT_VIEW).await {
            Ok(Some(png)) => {
                let b64 = base64::engine::general_purpose::STANDARD.encode(&png);
                contents.push(Content::image(b64, "image/png"));
            }
            Ok(None) => contents.push(Content::text(
                "Cannot capture a screenshot of the current view. Open a document with a 3D view to see the model.",
            )),
            Err(e) => {
                tracing::warn!("Screenshot failed: {}", e);
                contents.push(Content::text(format!("Screenshot failed: {e}")));
            }
        }
        contents
    }

    // ========================================================================
    // Document Tools
    // ========================================================================

    #[tool(description = "Create a new document and make it the active one. Returns the name actually used, which gets a numeric suffix if the requested name is taken.")]
    async fn create_document(
        &self,
        params: Parameters<CreateDocumentRequest>,
    ) -> Result<CallToolResult, McpError> {
        let request = params.0;
        let text = match self.client.create_document(&request.name).await {
            Ok(name) => format!("Document '{name}' created successfully."),
            Err(e) => reply::failure("create document", &e),
        };
        Ok(CallToolResult::success(vec![Content::text(text)]))
    }

    #[tool(description = "List the names of all open documents.")]
    async fn list_documents(&self) -> Result<CallToolResult, McpError> {
        let text = match self.client.list_documents().await {
            Ok(documents) => reply::list(&documents, "No documents are open."),
            Err(e) => reply::failure("list documents", &e),
        };
        Ok(CallToolResult::success(vec![Content::text(text)]))
    }

    // ========================================================================
    // Object Tools
    // ========================================================================

    #[tool(description = "Create an object in a document. obj_type is a type id such as Part::Box, Part::Cylinder, Part::Cut, Part::Extrusion, Fem::FemAnalysis, Fem::ConstraintFixed or Fem::FemMeshGmsh. Simulation objects join the analysis named by analysis_name. Properties are applied after creation; vectors are {\"x\",\"y\",\"z\"}, placements are {\"Base\": vector, \"Rotation\": {\"Axis\": vector, \"Angle\": degrees}}, links are object names and display settings go under \"ViewObject\".")]
    async fn create_object(
        &self,
        params: Parameters<CreateObjectRequest>,
    ) -> Result<CallToolResult, McpError> {
        let request = params.0;
        let text = match self.client.create_object(&request.doc_name, &request.to_request()).await {
            Ok(applied) => reply::applied("created", &applied),
            Err(e) => reply::failure("create object", &e),
        };
        let contents = self.with_screenshot(vec![Content::text(text)]).await;
        Ok(CallToolResult::success(contents))
    }

    #[tool(description = "Change properties of an existing object, using the same property forms as create_object. Nothing is changed if any property fails, unless the bridge runs in best-effort mode.")]
    async fn edit_object(
        &self,
        params: Parameters<EditObjectRequest>,
    ) -> Result<CallToolResult, McpError> {
        let request = params.0;
        let text = match self
            .client
            .edit_object(&request.doc_name, &request.obj_name, request.obj_properties)
            .await
        {
            Ok(applied) => reply::applied("edited", &applied),
            Err(e) => reply::failure("edit object", &e),
        };
        let contents = self.with_screenshot(vec![Content::text(text)]).await;
        Ok(CallToolResult::success(contents))
    }

    #[tool(description = "Delete an object from a document.")]
    async fn delete_object(
        &self,
        params: Parameters<ObjectNameRequest>,
    ) -> Result<CallToolResult, McpError> {
        let request = params.0;
        let text = match self.client.delete_object(&request.doc_name, &request.obj_name).await {
            Ok(()) => format!("Object '{}' deleted successfully.", request.obj_name),
            Err(e) => reply::failure("delete object", &e),
        };
        let contents = self.with_screenshot(vec![Content::text(text)]).await;
        Ok(CallToolResult::success(contents))
    }

    #[tool(description = "List every object of a document with its type, label and properties in wire form.")]
    async fn get_objects(
        &self,
        params: Parameters<DocumentRequest>,
    ) -> Result<CallToolResult, McpError> {
        let request = params.0;
        let text = match self.client.get_objects(&request.doc_name).await {
            Ok(objects) => reply::json(&Value::Array(objects)),
            Err(e) => reply::failure("get objects", &e),
        };
        Ok(CallToolResult::success(vec![Content::text(text)]))
    }

    #[tool(description = "Get one object of a document with its type, label and properties in wire form.")]
    async fn get_object(
        &self,
        params: Parameters<ObjectNameRequest>,
    ) -> Result<CallToolResult, McpError> {
        let request = params.0;
        let text = match self.client.get_object(&request.doc_name, &request.obj_name).await {
            Ok(object) => reply::json(&object),
            Err(e) => reply::failure("get object", &e),
        };
        Ok(CallToolResult::success(vec![Content::text(text)]))
    }

    // ========================================================================
    // Code Execution
    // ========================================================================

    #[tool(description = "Run a Rhai script inside the CAD session. Useful for anything the object tools cannot express. Text printed by the script is returned. The bridge may have code execution disabled.")]
    async fn execute_code(
        &self,
        params: Parameters<ExecuteCodeRequest>,
    ) -> Result<CallToolResult, McpError> {
        let request = params.0;
        let text = match self.client.execute_code(&request.code).await {
            Ok(result) => reply::code_output(&result),
            Err(e) => reply::failure("execute code", &e),
        };
        let contents = self.with_screenshot(vec![Content::text(text)]).await;
        Ok(CallToolResult::success(contents))
    }

    // ========================================================================
    // Parts Library
    // ========================================================================

    #[tool(description = "Insert a part from the parts library into the active document. relative_path is one of the entries returned by get_parts_list.")]
    async fn insert_part_from_library(
        &self,
        params: Parameters<InsertPartRequest>,
    ) -> Result<CallToolResult, McpError> {
        let request = params.0;
        let text = match self.client.insert_part_from_library(&request.relative_path).await {
            Ok(objects) => format!(
                "Part '{}' inserted successfully.\n{}",
                request.relative_path,
                reply::list(&objects, "")
            ),
            Err(e) => reply::failure("insert part", &e),
        };
        let contents = self.with_screenshot(vec![Content::text(text)]).await;
        Ok(CallToolResult::success(contents))
    }

    #[tool(description = "List the parts available in the parts library as paths relative to its root.")]
    async fn get_parts_list(&self) -> Result<CallToolResult, McpError> {
        let text = match self.client.get_parts_list().await {
            Ok(parts) => reply::list(&parts, "The parts library is empty."),
            Err(e) => reply::failure("get parts list", &e),
        };
        Ok(CallToolResult::success(vec![Content::text(text)]))
    }

    // ========================================================================
    // Views
    // ========================================================================

    #[tool(description = "Get a PNG screenshot of the active document from a standard view: Isometric (default), Front, Top, Right, Back, Left, Bottom, Dimetric or Trimetric.")]
    async fn get_view(
        &self,
        params: Parameters<GetViewRequest>,
    ) -> Result<CallToolResult, McpError> {
        let request = params.0;
        let view = match request.view() {
            Ok(view) => view,
            Err(e) => return Ok(CallToolResult::success(vec![Content::text(e)])),
        };

        match self.client.get_active_screenshot(&view.to_string()).await {
            Ok(Some(png)) => {
                let b64 = base64::engine::general_purpose::STANDARD.encode(&png);
                Ok(CallToolResult::success(vec![Content::image(b64, "image/png")]))
            }
            Ok(None) => Ok(CallToolResult::success(vec![Content::text(
                "Cannot capture a screenshot of the current view. Open a document with a 3D view first.",
            )])),
            Err(e) => Ok(CallToolResult::success(vec![Content::text(reply::failure(
                "get view", &e,
            ))])),
        }
    }
}

#[tool_handler]
impl ServerHandler for CadBridgeMcpService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "cadbridge-mcp".to_string(),
                title: Some("CadBridge CAD Session".to_string()),
                version: env!("CARGO_PKG_VERSION").to_string(),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "CadBridge MCP server for driving a parametric CAD session. \
                 \n\nWorkflow:\n\
                 1. create_document() - Start a document\n\
                 2. create_object() / edit_object() - Build the model; each call returns a screenshot\n\
                 3. get_objects() / get_view() - Inspect the result\n\n\
                 Use get_parts_list() and insert_part_from_library() to reuse standard parts.\n\
                 Use execute_code() only for what the object tools cannot express."
                    .to_string(),
            ),
        }
    }
}
