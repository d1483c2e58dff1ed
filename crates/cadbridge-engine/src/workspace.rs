//! State of the owning context
//!
//! A [`Workspace`] holds the kernel and the script engine bound to it. It is
//! not `Send`; it is created on the owning context and only ever touched by
//! jobs the sequencer runs there. Every operation checks that the documents
//! and objects it names exist before doing anything else.

use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

use cadbridge_kernel::{CadKernel, KernelError, ViewName, require_document, require_object};
use cadbridge_script::{ScriptEngine, ScriptOutput, SharedKernel};
use serde_json::{Map, Value};

use crate::applier::PropertyPolicy;
use crate::error::{BridgeError, PropertyError, Result};
use crate::factory::{self, Created};
use crate::request::ObjectRequest;

/// Behavior switches of the owning context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkspaceOptions {
    pub policy: PropertyPolicy,
    /// Run caller-supplied scripts; off unless configured
    pub allow_code_execution: bool,
    pub capture_width: u32,
    pub capture_height: u32,
}

impl Default for WorkspaceOptions {
    fn default() -> Self {
        Self {
            policy: PropertyPolicy::Strict,
            allow_code_execution: false,
            capture_width: 800,
            capture_height: 600,
        }
    }
}

/// Kernel plus script engine, living on the owning context
pub struct Workspace {
    kernel: SharedKernel,
    scripts: ScriptEngine,
    options: WorkspaceOptions,
}

impl Workspace {
    pub fn new<K: CadKernel + 'static>(kernel: K, options: WorkspaceOptions) -> Self {
        let kernel: SharedKernel = Rc::new(RefCell::new(kernel));
        let scripts = ScriptEngine::with_kernel(&kernel);
        Self {
            kernel,
            scripts,
            options,
        }
    }

    pub fn options(&self) -> &WorkspaceOptions {
        &self.options
    }

    /// Shared handle to the kernel
    pub fn kernel(&self) -> &SharedKernel {
        &self.kernel
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    pub fn create_document(&mut self, name: &str) -> Result<String> {
        let name = self.kernel.borrow_mut().new_document(name)?;
        tracing::info!("Created document '{}'", name);
        Ok(name)
    }

    pub fn create_object(&mut self, doc: &str, request: &ObjectRequest) -> Result<Created> {
        let mut kernel = self.kernel.borrow_mut();
        factory::create(&mut *kernel, doc, request, self.options.policy)
    }

    /// Apply properties to an existing object and recompute
    ///
    /// Under the strict policy a failed edit puts the object back the way it
    /// was. Returns the properties skipped under the best-effort policy.
    pub fn edit_object(&mut self, doc: &str, obj: &str, props: &Map<String, Value>) -> Result<Vec<PropertyError>> {
        let mut kernel = self.kernel.borrow_mut();
        let snapshot = require_object(&*kernel, doc, obj)?.clone();

        let skipped = match factory::apply_with_policy(&mut *kernel, doc, obj, props, self.options.policy) {
            Ok(skipped) => skipped,
            Err(e) => {
                restore(&mut *kernel, doc, snapshot);
                return Err(e);
            }
        };

        if let Err(e) = kernel.recompute(doc) {
            restore(&mut *kernel, doc, snapshot);
            return Err(BridgeError::Recompute(e.to_string()));
        }

        tracing::info!("Edited '{}' in '{}'", obj, doc);
        Ok(skipped)
    }

    pub fn delete_object(&mut self, doc: &str, obj: &str) -> Result<()> {
        let mut kernel = self.kernel.borrow_mut();
        require_object(&*kernel, doc, obj)?;
        kernel.remove_object(doc, obj)?;
        kernel
            .recompute(doc)
            .map_err(|e| BridgeError::Recompute(e.to_string()))?;
        tracing::info!("Deleted '{}' from '{}'", obj, doc);
        Ok(())
    }

    /// Run a script against the live documents
    ///
    /// # Errors
    /// [`BridgeError::Disabled`] unless code execution is allowed.
    pub fn execute_code(&mut self, code: &str) -> Result<ScriptOutput> {
        if !self.options.allow_code_execution {
            return Err(BridgeError::Disabled("Code execution".into()));
        }
        tracing::debug!("Executing {} bytes of script", code.len());
        Ok(self.scripts.execute(code)?)
    }

    /// Merge a part file into the active document
    pub fn insert_part(&mut self, path: &Path) -> Result<Vec<String>> {
        let mut kernel = self.kernel.borrow_mut();
        let doc = kernel
            .active_document()
            .ok_or_else(|| BridgeError::DocumentNotFound("(active document)".into()))?;
        let added = kernel.merge_project(&doc, path)?;
        tracing::info!("Inserted {} into '{}' ({} objects)", path.display(), doc, added.len());
        Ok(added)
    }

    /// Render the active document from a named viewpoint as PNG
    pub fn screenshot(&mut self, view: ViewName) -> Result<Vec<u8>> {
        let mut kernel = self.kernel.borrow_mut();
        let doc = kernel
            .active_document()
            .ok_or_else(|| BridgeError::Capture("no active document".into()))?;

        kernel
            .render_view(&doc, view, self.options.capture_width, self.options.capture_height)
            .map_err(|e| {
                tracing::warn!("Capture of '{}' from {} failed: {}", doc, view, e);
                match e {
                    KernelError::Capture(message) => BridgeError::Capture(message),
                    other => BridgeError::Capture(other.to_string()),
                }
            })
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Wire form of every object in a document
    pub fn objects(&self, doc: &str) -> Result<Vec<Value>> {
        let kernel = self.kernel.borrow();
        Ok(require_document(&*kernel, doc)?
            .objects
            .iter()
            .map(|o| o.to_wire())
            .collect())
    }

    pub fn object(&self, doc: &str, obj: &str) -> Result<Value> {
        let kernel = self.kernel.borrow();
        Ok(require_object(&*kernel, doc, obj)?.to_wire())
    }

    pub fn list_documents(&self) -> Vec<String> {
        self.kernel.borrow().list_documents()
    }
}

fn restore(kernel: &mut dyn CadKernel, doc: &str, snapshot: cadbridge_core::model::DocObject) {
    let name = snapshot.name.clone();
    if let Err(e) = kernel.restore_object(doc, snapshot).and_then(|()| kernel.recompute(doc)) {
        tracing::warn!("Could not restore '{}' after a failed edit: {}", name, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadbridge_core::value::PropertyValue;
    use cadbridge_kernel::MemoryKernel;
    use serde_json::json;

    use crate::error::ErrorKind;

    fn workspace(options: WorkspaceOptions) -> Workspace {
        Workspace::new(MemoryKernel::new(), options)
    }

    fn props(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_strict_edit_is_all_or_nothing() {
        let mut ws = workspace(WorkspaceOptions::default());
        let doc = ws.create_document("Doc").unwrap();
        ws.create_object(&doc, &ObjectRequest::new("Part::Box").named("Box")).unwrap();

        let err = ws
            .edit_object(&doc, "Box", &props(json!({"Height": 4, "Length": "long"})))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DecodeError);

        let obj = ws.object(&doc, "Box").unwrap();
        assert_eq!(obj["Properties"]["Height"], json!(10.0));
    }

    #[test]
    fn test_best_effort_edit_reports_skipped() {
        let mut ws = workspace(WorkspaceOptions {
            policy: PropertyPolicy::BestEffort,
            ..WorkspaceOptions::default()
        });
        let doc = ws.create_document("Doc").unwrap();
        ws.create_object(&doc, &ObjectRequest::new("Part::Box").named("Box")).unwrap();

        let skipped = ws
            .edit_object(&doc, "Box", &props(json!({"Height": 4, "Length": "long"})))
            .unwrap();
        assert_eq!(skipped.len(), 1);
        assert_eq!(ws.object(&doc, "Box").unwrap()["Properties"]["Height"], json!(4.0));
    }

    #[test]
    fn test_cyclic_edit_is_a_recompute_error() {
        let mut ws = workspace(WorkspaceOptions::default());
        let doc = ws.create_document("Doc").unwrap();
        ws.create_object(&doc, &ObjectRequest::new("Part::Box").named("A")).unwrap();
        ws.create_object(&doc, &ObjectRequest::new("Part::Box").named("B")).unwrap();
        let cut = ObjectRequest::new("Part::Cut")
            .named("Cut")
            .with_property("Base", json!("A"))
            .with_property("Tool", json!("B"));
        ws.create_object(&doc, &cut).unwrap();
        let mirror = ObjectRequest::new("Part::Mirroring")
            .named("Mirror")
            .with_property("Source", json!("Cut"));
        ws.create_object(&doc, &mirror).unwrap();

        let err = ws
            .edit_object(&doc, "Cut", &props(json!({"Tool": "Mirror"})))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RecomputeError);

        let kernel = ws.kernel().borrow();
        assert_eq!(
            kernel.object(&doc, "Cut").unwrap().property("Tool"),
            Some(&PropertyValue::Link(Some("B".into())))
        );
    }

    #[test]
    fn test_delete_checks_existence() {
        let mut ws = workspace(WorkspaceOptions::default());
        let doc = ws.create_document("Doc").unwrap();
        assert_eq!(ws.delete_object(&doc, "Box").unwrap_err().kind(), ErrorKind::ObjectNotFound);
        assert_eq!(ws.delete_object("Nope", "Box").unwrap_err().kind(), ErrorKind::DocumentNotFound);

        ws.create_object(&doc, &ObjectRequest::new("Part::Box").named("Box")).unwrap();
        ws.delete_object(&doc, "Box").unwrap();
        assert!(ws.objects(&doc).unwrap().is_empty());
    }

    #[test]
    fn test_code_execution_is_gated() {
        let mut ws = workspace(WorkspaceOptions::default());
        assert_eq!(ws.execute_code("print(1)").unwrap_err().kind(), ErrorKind::Disabled);

        let mut ws = workspace(WorkspaceOptions {
            allow_code_execution: true,
            ..WorkspaceOptions::default()
        });
        let out = ws.execute_code(r#"new_document("Scripted"); print(documents());"#).unwrap();
        assert!(out.output.contains("Scripted"));
        assert_eq!(ws.list_documents(), vec!["Scripted".to_string()]);

        let err = ws.execute_code("throw \"bad\"").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ScriptError);
    }

    #[test]
    fn test_insert_needs_active_document() {
        let mut ws = workspace(WorkspaceOptions::default());
        let err = ws.insert_part(Path::new("missing.cbpart")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DocumentNotFound);
    }

    #[test]
    fn test_screenshot() {
        let mut ws = workspace(WorkspaceOptions {
            capture_width: 64,
            capture_height: 48,
            ..WorkspaceOptions::default()
        });
        assert_eq!(ws.screenshot(ViewName::Isometric).unwrap_err().kind(), ErrorKind::CaptureError);

        let doc = ws.create_document("Doc").unwrap();
        assert_eq!(ws.screenshot(ViewName::Isometric).unwrap_err().kind(), ErrorKind::CaptureError);

        ws.create_object(&doc, &ObjectRequest::new("Part::Box")).unwrap();
        let png = ws.screenshot(ViewName::Front).unwrap();
        assert_eq!(&png[1..4], b"PNG");
    }
}
