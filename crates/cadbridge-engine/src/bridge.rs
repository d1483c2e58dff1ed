//! The bridge handle
//!
//! [`Bridge`] is what a transport holds: it is Send + Sync, cheap to clone,
//! and turns every remote operation into a job on the owning context. Only
//! the parts listing, which touches nothing but the filesystem, is served
//! without going through the sequencer.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use cadbridge_kernel::{CadKernel, MemoryKernel, ViewName};
use cadbridge_script::ScriptOutput;
use serde_json::{Map, Value};

use crate::applier::PropertyPolicy;
use crate::error::{BridgeError, PropertyError, Result};
use crate::factory::Created;
use crate::parts::PartsLibrary;
use crate::request::ObjectRequest;
use crate::sequencer::{DEFAULT_TIMEOUT, Sequencer};
use crate::workspace::{Workspace, WorkspaceOptions};

/// Settings of a bridge instance
#[derive(Debug, Clone)]
pub struct BridgeOptions {
    pub policy: PropertyPolicy,
    pub allow_code_execution: bool,
    /// How long a caller waits for the owning context; `None` waits forever
    pub task_timeout: Option<Duration>,
    pub parts_library: Option<PathBuf>,
    /// Invalidate the parts listing on filesystem changes
    pub watch_parts: bool,
    pub capture_size: (u32, u32),
}

impl Default for BridgeOptions {
    fn default() -> Self {
        Self {
            policy: PropertyPolicy::Strict,
            allow_code_execution: false,
            task_timeout: Some(DEFAULT_TIMEOUT),
            parts_library: None,
            watch_parts: false,
            capture_size: (800, 600),
        }
    }
}

/// Handle to a running bridge
#[derive(Clone)]
pub struct Bridge {
    sequencer: Sequencer<Workspace>,
    parts: Option<Arc<PartsLibrary>>,
    #[cfg(feature = "parts-watcher")]
    _watcher: Arc<parking_lot::Mutex<Option<crate::parts::PartsWatcher>>>,
}

impl Bridge {
    /// Start a bridge whose owning context builds its kernel with `kernel`
    ///
    /// # Errors
    /// Returns an error if the owning context cannot be started.
    pub fn start<K, F>(options: BridgeOptions, kernel: F) -> Result<Self>
    where
        K: CadKernel + 'static,
        F: FnOnce() -> K + Send + 'static,
    {
        let workspace_options = WorkspaceOptions {
            policy: options.policy,
            allow_code_execution: options.allow_code_execution,
            capture_width: options.capture_size.0,
            capture_height: options.capture_size.1,
        };
        let timeout = options.task_timeout.unwrap_or(Duration::MAX);
        let sequencer = Sequencer::spawn("cadbridge-owner", timeout, move || {
            Workspace::new(kernel(), workspace_options)
        })?;

        let parts = options.parts_library.map(|root| Arc::new(PartsLibrary::new(root)));

        #[cfg(feature = "parts-watcher")]
        let watcher = match (&parts, options.watch_parts) {
            (Some(lib), true) => match lib.watch(Duration::from_millis(250)) {
                Ok(w) => Some(w),
                Err(e) => {
                    tracing::warn!("Parts library will not be watched: {}", e);
                    None
                }
            },
            _ => None,
        };
        #[cfg(not(feature = "parts-watcher"))]
        if options.watch_parts {
            tracing::warn!("Built without the parts-watcher feature; watch_parts ignored");
        }

        tracing::info!(
            "Bridge started (policy: {:?}, code execution: {})",
            options.policy,
            if options.allow_code_execution { "allowed" } else { "disabled" }
        );

        Ok(Self {
            sequencer,
            parts,
            #[cfg(feature = "parts-watcher")]
            _watcher: Arc::new(parking_lot::Mutex::new(watcher)),
        })
    }

    /// Start a bridge over the in-memory reference kernel
    pub fn with_memory_kernel(options: BridgeOptions) -> Result<Self> {
        Self::start(options, MemoryKernel::new)
    }

    pub fn sequencer(&self) -> &Sequencer<Workspace> {
        &self.sequencer
    }

    /// Whether the owning context answers
    pub async fn ping(&self) -> bool {
        self.sequencer.run(|_| Ok(())).await.is_ok()
    }

    pub async fn create_document(&self, name: impl Into<String>) -> Result<String> {
        let name = name.into();
        self.sequencer.run(move |ws| ws.create_document(&name)).await
    }

    pub async fn create_object(&self, doc: impl Into<String>, request: ObjectRequest) -> Result<Created> {
        let doc = doc.into();
        self.sequencer
            .run(move |ws| ws.create_object(&doc, &request))
            .await
    }

    pub async fn edit_object(
        &self,
        doc: impl Into<String>,
        obj: impl Into<String>,
        properties: Map<String, Value>,
    ) -> Result<Vec<PropertyError>> {
        let (doc, obj) = (doc.into(), obj.into());
        self.sequencer
            .run(move |ws| ws.edit_object(&doc, &obj, &properties))
            .await
    }

    pub async fn delete_object(&self, doc: impl Into<String>, obj: impl Into<String>) -> Result<()> {
        let (doc, obj) = (doc.into(), obj.into());
        self.sequencer.run(move |ws| ws.delete_object(&doc, &obj)).await
    }

    pub async fn execute_code(&self, code: impl Into<String>) -> Result<ScriptOutput> {
        let code = code.into();
        self.sequencer.run(move |ws| ws.execute_code(&code)).await
    }

    pub async fn get_objects(&self, doc: impl Into<String>) -> Result<Vec<Value>> {
        let doc = doc.into();
        self.sequencer.run(move |ws| ws.objects(&doc)).await
    }

    pub async fn get_object(&self, doc: impl Into<String>, obj: impl Into<String>) -> Result<Value> {
        let (doc, obj) = (doc.into(), obj.into());
        self.sequencer.run(move |ws| ws.object(&doc, &obj)).await
    }

    pub async fn list_documents(&self) -> Result<Vec<String>> {
        self.sequencer.run(|ws| Ok(ws.list_documents())).await
    }

    /// Merge a library part into the active document
    pub async fn insert_part_from_library(&self, relative: &str) -> Result<Vec<String>> {
        let path = self.library()?.resolve(relative)?;
        self.sequencer.run(move |ws| ws.insert_part(&path)).await
    }

    /// Cached listing of the parts library
    pub fn get_parts_list(&self) -> Result<Vec<String>> {
        self.library()?.list()
    }

    /// Rescan the parts library
    pub fn refresh_parts_list(&self) -> Result<Vec<String>> {
        let lib = self.library()?;
        lib.invalidate();
        lib.list()
    }

    /// PNG capture of the active document from a named viewpoint
    pub async fn get_active_screenshot(&self, view: &str) -> Result<Vec<u8>> {
        let view = ViewName::parse(view).ok_or_else(|| {
            BridgeError::Capture(format!(
                "unknown view '{view}', expected one of: {}",
                ViewName::all_names().join(", ")
            ))
        })?;
        self.sequencer.run(move |ws| ws.screenshot(view)).await
    }

    fn library(&self) -> Result<&PartsLibrary> {
        self.parts
            .as_deref()
            .ok_or_else(|| BridgeError::PartNotFound("no parts library configured".into()))
    }
}
