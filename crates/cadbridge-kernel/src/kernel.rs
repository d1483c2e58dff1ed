//! The CAD kernel collaborator boundary
//!
//! Everything the bridge needs from a CAD application goes through
//! [`CadKernel`]. Implementations are not expected to be thread-safe: the
//! bridge only ever calls a kernel from its single owning context.

use std::path::Path;

use cadbridge_core::model::{DocObject, Document};
use cadbridge_core::value::{PropertyKind, PropertyValue};

use crate::error::{KernelError, Result};
use crate::view::ViewName;

/// Document model operations offered by a CAD application
pub trait CadKernel {
    // ========================================================================
    // Documents
    // ========================================================================

    /// Create a document and make it active. Returns the name actually used.
    fn new_document(&mut self, name: &str) -> Result<String>;

    /// Close a document, discarding its objects
    fn close_document(&mut self, name: &str) -> Result<()>;

    fn document(&self, name: &str) -> Option<&Document>;

    /// Names of all open documents, in creation order
    fn list_documents(&self) -> Vec<String>;

    fn active_document(&self) -> Option<String>;

    fn set_active_document(&mut self, name: &str) -> Result<()>;

    /// Re-evaluate derived geometry of every object in the document
    fn recompute(&mut self, doc: &str) -> Result<()>;

    // ========================================================================
    // Objects
    // ========================================================================

    /// Add a bare object of `type_id`. An empty or taken `name` is
    /// replaced by a unique one, which is returned.
    fn add_object(&mut self, doc: &str, type_id: &str, name: &str) -> Result<String>;

    /// Remove an object, clearing every link that pointed at it
    fn remove_object(&mut self, doc: &str, name: &str) -> Result<()>;

    fn object(&self, doc: &str, name: &str) -> Option<&DocObject> {
        self.document(doc).and_then(|d| d.object(name))
    }

    /// Put back a previously captured copy of an object
    fn restore_object(&mut self, doc: &str, object: DocObject) -> Result<()>;

    // ========================================================================
    // Properties
    // ========================================================================

    /// Declared kind of a data property, `None` when the object lacks it
    fn property_kind(&self, doc: &str, obj: &str, prop: &str) -> Option<PropertyKind>;

    fn set_property(&mut self, doc: &str, obj: &str, prop: &str, value: PropertyValue)
    -> Result<()>;

    /// Whether the object carries a view/display record
    fn has_view(&self, doc: &str, obj: &str) -> bool;

    fn set_view_property(
        &mut self,
        doc: &str,
        obj: &str,
        prop: &str,
        value: PropertyValue,
    ) -> Result<()>;

    // ========================================================================
    // Object families
    // ========================================================================

    /// Whether a family constructor such as `makeConstraintFixed` exists
    fn has_constructor(&self, constructor: &str) -> bool;

    /// Run a family constructor. Returns the created object's name.
    fn construct(&mut self, doc: &str, constructor: &str, name: &str) -> Result<String>;

    /// Whether the object groups other objects (analysis containers, groups)
    fn is_container(&self, doc: &str, obj: &str) -> bool;

    /// Register `obj` under `container`
    fn add_to_group(&mut self, doc: &str, container: &str, obj: &str) -> Result<()>;

    /// Generate the finite-element mesh of a mesh object from its linked part
    fn generate_mesh(&mut self, doc: &str, mesh: &str) -> Result<()>;

    // ========================================================================
    // Files and views
    // ========================================================================

    /// Merge the objects of a part file into a document. Returns the names
    /// of the objects added.
    fn merge_project(&mut self, doc: &str, path: &Path) -> Result<Vec<String>>;

    /// Render the document from a named viewpoint, fitted to all visible
    /// objects. Returns PNG bytes.
    fn render_view(&mut self, doc: &str, view: ViewName, width: u32, height: u32)
    -> Result<Vec<u8>>;
}

/// Look up a document or fail with `DocumentNotFound`
pub fn require_document<'a, K: CadKernel + ?Sized>(kernel: &'a K, doc: &str) -> Result<&'a Document> {
    kernel
        .document(doc)
        .ok_or_else(|| KernelError::DocumentNotFound(doc.to_string()))
}

/// Look up an object or fail with the matching not-found error
pub fn require_object<'a, K: CadKernel + ?Sized>(
    kernel: &'a K,
    doc: &str,
    obj: &str,
) -> Result<&'a DocObject> {
    require_document(kernel, doc)?
        .object(obj)
        .ok_or_else(|| KernelError::ObjectNotFound {
            document: doc.to_string(),
            object: obj.to_string(),
        })
}
