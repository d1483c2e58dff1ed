//! Scripts driving a live in-memory kernel

// Tests are allowed to use expect/unwrap for cleaner error messages
#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]

use std::cell::RefCell;
use std::rc::Rc;

use cadbridge_core::value::PropertyValue;
use cadbridge_kernel::{CadKernel, MemoryKernel};
use cadbridge_script::{ScriptEngine, ScriptError, SharedKernel};

fn setup() -> (SharedKernel, ScriptEngine) {
    let kernel: SharedKernel = Rc::new(RefCell::new(MemoryKernel::new()));
    let engine = ScriptEngine::with_kernel(&kernel);
    (kernel, engine)
}

#[test]
fn script_builds_a_part() {
    let (kernel, engine) = setup();

    let out = engine
        .execute(
            r#"
            let doc = new_document("Bracket");
            let plate = add_object(doc, "Part::Box", "Plate");
            set_property(doc, plate, "Length", 40);
            set_property(doc, plate, "Placement", #{ Base: #{ x: 5.0 } });
            recompute(doc);
            let obj = get_object(doc, plate);
            print(obj.Shape.Volume);
            "#,
        )
        .expect("script should run");

    assert_eq!(out.output.trim(), "4000.0");

    let kernel = kernel.borrow();
    let plate = kernel.object("Bracket", "Plate").unwrap();
    assert_eq!(plate.property("Length"), Some(&PropertyValue::Float(40.0)));
    assert_eq!(plate.property("Placement").and_then(PropertyValue::as_placement).unwrap().base.x, 5.0);
}

#[test]
fn script_sees_documents_made_outside() {
    let (kernel, engine) = setup();
    {
        let mut k = kernel.borrow_mut();
        let doc = k.new_document("Existing").unwrap();
        k.add_object(&doc, "Part::Sphere", "").unwrap();
    }

    let out = engine
        .execute(
            r#"
            print(documents());
            print(active_document());
            print(objects("Existing"));
            "#,
        )
        .unwrap();

    assert!(out.output.contains("Existing"));
    assert!(out.output.contains("Sphere"));
}

#[test]
fn links_are_names() {
    let (kernel, engine) = setup();
    engine
        .execute(
            r#"
            let doc = new_document("Doc");
            let a = add_object(doc, "Part::Box", "");
            let b = add_object(doc, "Part::Cylinder", "");
            let cut = add_object(doc, "Part::Cut", "");
            set_property(doc, cut, "Base", a);
            set_property(doc, cut, "Tool", b);
            set_view(doc, cut, "ShapeColor", [1.0, 0.0, 0.0]);
            recompute(doc);
            "#,
        )
        .unwrap();

    let kernel = kernel.borrow();
    let cut = kernel.object("Doc", "Cut").unwrap();
    assert_eq!(cut.property("Base").and_then(PropertyValue::as_link), Some("Box"));
    assert!(cut.shape.is_some());
}

#[test]
fn kernel_errors_surface_as_script_errors() {
    let (_kernel, engine) = setup();
    let err = engine
        .execute(r#"print("start"); add_object("Nowhere", "Part::Box", "")"#)
        .unwrap_err();

    match err {
        ScriptError::Runtime { message, output } => {
            assert!(message.contains("Nowhere"), "{message}");
            assert_eq!(output, "start\n");
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn bad_property_value_is_rejected() {
    let (_kernel, engine) = setup();
    let err = engine
        .execute(
            r#"
            let doc = new_document("Doc");
            let b = add_object(doc, "Part::Box", "");
            set_property(doc, b, "Length", "long");
            "#,
        )
        .unwrap_err();
    assert!(matches!(err, ScriptError::Runtime { .. }));
}
