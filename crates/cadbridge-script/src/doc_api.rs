//! Rhai API over the live documents
//!
//! Scripts reach the kernel through these functions. Property values cross
//! the boundary in their wire form: vectors are maps with `x`, `y`, `z`,
//! links are object names, colors are arrays.
//!
//! ```rhai
//! let doc = new_document("Bracket");
//! let plate = add_object(doc, "Part::Box", "Plate");
//! set_property(doc, plate, "Length", 40.0);
//! recompute(doc);
//! print(get_property(doc, plate, "Length"));
//! ```

use std::cell::RefCell;
use std::fmt::Display;
use std::rc::Rc;

use cadbridge_core::codec::{decode, encode};
use cadbridge_core::value::PropertyKind;
use cadbridge_kernel::{CadKernel, require_object};
use rhai::{Array, Dynamic, Engine, EvalAltResult, ImmutableString};

/// Kernel handle shared between the owning context and its script engine
pub type SharedKernel = Rc<RefCell<dyn CadKernel>>;

type ScriptResult<T> = Result<T, Box<EvalAltResult>>;

fn script_error(e: impl Display) -> Box<EvalAltResult> {
    e.to_string().into()
}

fn names(list: Vec<String>) -> Array {
    list.into_iter().map(Dynamic::from).collect()
}

fn to_dynamic(wire: &serde_json::Value) -> ScriptResult<Dynamic> {
    rhai::serde::to_dynamic(wire)
}

fn from_dynamic(value: &Dynamic) -> ScriptResult<serde_json::Value> {
    rhai::serde::from_dynamic(value)
}

/// Register the document functions on an engine
pub fn register_document_api(engine: &mut Engine, kernel: &SharedKernel) {
    // ========================================================================
    // Documents
    // ========================================================================

    let k = kernel.clone();
    engine.register_fn("documents", move || names(k.borrow().list_documents()));

    let k = kernel.clone();
    engine.register_fn("active_document", move || {
        k.borrow()
            .active_document()
            .map_or(Dynamic::UNIT, Dynamic::from)
    });

    let k = kernel.clone();
    engine.register_fn("new_document", move |name: ImmutableString| -> ScriptResult<String> {
        k.borrow_mut().new_document(name.as_str()).map_err(script_error)
    });

    let k = kernel.clone();
    engine.register_fn("recompute", move |doc: ImmutableString| -> ScriptResult<()> {
        k.borrow_mut().recompute(doc.as_str()).map_err(script_error)
    });

    // ========================================================================
    // Objects
    // ========================================================================

    let k = kernel.clone();
    engine.register_fn("objects", move |doc: ImmutableString| -> ScriptResult<Array> {
        let kernel = k.borrow();
        let document = cadbridge_kernel::require_document(&*kernel, doc.as_str()).map_err(script_error)?;
        Ok(names(document.object_names()))
    });

    let k = kernel.clone();
    engine.register_fn(
        "add_object",
        move |doc: ImmutableString, type_id: ImmutableString, name: ImmutableString| -> ScriptResult<String> {
            k.borrow_mut()
                .add_object(doc.as_str(), type_id.as_str(), name.as_str())
                .map_err(script_error)
        },
    );

    let k = kernel.clone();
    engine.register_fn(
        "remove_object",
        move |doc: ImmutableString, name: ImmutableString| -> ScriptResult<()> {
            k.borrow_mut()
                .remove_object(doc.as_str(), name.as_str())
                .map_err(script_error)
        },
    );

    let k = kernel.clone();
    engine.register_fn(
        "get_object",
        move |doc: ImmutableString, name: ImmutableString| -> ScriptResult<Dynamic> {
            let kernel = k.borrow();
            let obj = require_object(&*kernel, doc.as_str(), name.as_str()).map_err(script_error)?;
            to_dynamic(&obj.to_wire())
        },
    );

    // ========================================================================
    // Properties
    // ========================================================================

    let k = kernel.clone();
    engine.register_fn(
        "get_property",
        move |doc: ImmutableString, obj: ImmutableString, prop: ImmutableString| -> ScriptResult<Dynamic> {
            let kernel = k.borrow();
            let object = require_object(&*kernel, doc.as_str(), obj.as_str()).map_err(script_error)?;
            let value = object
                .property(prop.as_str())
                .ok_or_else(|| script_error(format!("Object '{obj}' has no property '{prop}'")))?;
            to_dynamic(&encode(value))
        },
    );

    let k = kernel.clone();
    engine.register_fn(
        "set_property",
        move |doc: ImmutableString, obj: ImmutableString, prop: ImmutableString, value: Dynamic| -> ScriptResult<()> {
            let mut kernel = k.borrow_mut();
            let kind = kernel
                .property_kind(doc.as_str(), obj.as_str(), prop.as_str())
                .ok_or_else(|| script_error(format!("Object '{obj}' has no property '{prop}'")))?;
            let decoded = decode(&from_dynamic(&value)?, kind).map_err(script_error)?;
            kernel
                .set_property(doc.as_str(), obj.as_str(), prop.as_str(), decoded)
                .map_err(script_error)
        },
    );

    let k = kernel.clone();
    engine.register_fn(
        "set_view",
        move |doc: ImmutableString, obj: ImmutableString, prop: ImmutableString, value: Dynamic| -> ScriptResult<()> {
            let kind = match prop.as_str() {
                "ShapeColor" => PropertyKind::Color,
                "Transparency" => PropertyKind::Integer,
                "Visibility" => PropertyKind::Bool,
                other => return Err(script_error(format!("Unknown view property '{other}'"))),
            };
            let decoded = decode(&from_dynamic(&value)?, kind).map_err(script_error)?;
            k.borrow_mut()
                .set_view_property(doc.as_str(), obj.as_str(), prop.as_str(), decoded)
                .map_err(script_error)
        },
    );
}
