//! Object type registry of the in-memory kernel
//!
//! Each supported type id declares its default property set, whether it
//! carries a view record, whether it groups other objects and how its
//! geometry is derived on recompute.

use std::collections::BTreeMap;

use cadbridge_core::model::Property;
use cadbridge_core::value::{Placement, PropertyValue};
use glam::DVec3;

/// How an object's shape is derived
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Geometry {
    /// No shape
    None,
    Box,
    Cylinder,
    Sphere,
    Cone,
    Torus,
    Boolean(BooleanOp),
    Mirror,
    Extrusion,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BooleanOp {
    Cut,
    Fuse,
    Common,
}

/// Static description of an object type
pub(crate) struct TypeSpec {
    pub type_id: &'static str,
    /// Default object name stem
    pub base_name: &'static str,
    pub geometry: Geometry,
    pub view: bool,
    pub container: bool,
    pub properties: fn() -> Vec<(&'static str, Property)>,
}

pub(crate) static TYPES: &[TypeSpec] = &[
    TypeSpec {
        type_id: "Part::Box",
        base_name: "Box",
        geometry: Geometry::Box,
        view: true,
        container: false,
        properties: || {
            with_placement(vec![
                ("Length", float(10.0)),
                ("Width", float(10.0)),
                ("Height", float(10.0)),
            ])
        },
    },
    TypeSpec {
        type_id: "Part::Cylinder",
        base_name: "Cylinder",
        geometry: Geometry::Cylinder,
        view: true,
        container: false,
        properties: || {
            with_placement(vec![
                ("Radius", float(2.0)),
                ("Height", float(10.0)),
                ("Angle", float(360.0)),
            ])
        },
    },
    TypeSpec {
        type_id: "Part::Sphere",
        base_name: "Sphere",
        geometry: Geometry::Sphere,
        view: true,
        container: false,
        properties: || with_placement(vec![("Radius", float(5.0))]),
    },
    TypeSpec {
        type_id: "Part::Cone",
        base_name: "Cone",
        geometry: Geometry::Cone,
        view: true,
        container: false,
        properties: || {
            with_placement(vec![
                ("Radius1", float(2.0)),
                ("Radius2", float(4.0)),
                ("Height", float(10.0)),
            ])
        },
    },
    TypeSpec {
        type_id: "Part::Torus",
        base_name: "Torus",
        geometry: Geometry::Torus,
        view: true,
        container: false,
        properties: || with_placement(vec![("Radius1", float(10.0)), ("Radius2", float(2.0))]),
    },
    TypeSpec {
        type_id: "Part::Cut",
        base_name: "Cut",
        geometry: Geometry::Boolean(BooleanOp::Cut),
        view: true,
        container: false,
        properties: boolean_properties,
    },
    TypeSpec {
        type_id: "Part::Fuse",
        base_name: "Fusion",
        geometry: Geometry::Boolean(BooleanOp::Fuse),
        view: true,
        container: false,
        properties: boolean_properties,
    },
    TypeSpec {
        type_id: "Part::Common",
        base_name: "Common",
        geometry: Geometry::Boolean(BooleanOp::Common),
        view: true,
        container: false,
        properties: boolean_properties,
    },
    TypeSpec {
        type_id: "Part::Mirroring",
        base_name: "Mirror",
        geometry: Geometry::Mirror,
        view: true,
        container: false,
        properties: || {
            with_placement(vec![
                ("Source", link()),
                ("Base", Property::new(PropertyValue::Vector(DVec3::ZERO))),
                ("Normal", Property::new(PropertyValue::Vector(DVec3::X))),
            ])
        },
    },
    TypeSpec {
        type_id: "Part::Extrusion",
        base_name: "Extrude",
        geometry: Geometry::Extrusion,
        view: true,
        container: false,
        properties: || {
            with_placement(vec![
                ("Profile", link()),
                ("Dir", Property::new(PropertyValue::Vector(DVec3::Z))),
                ("LengthFwd", float(10.0)),
                ("Solid", Property::new(PropertyValue::Bool(true))),
            ])
        },
    },
    TypeSpec {
        type_id: "Part::Feature",
        base_name: "Feature",
        geometry: Geometry::None,
        view: true,
        container: false,
        properties: || with_placement(Vec::new()),
    },
    TypeSpec {
        type_id: "App::DocumentObjectGroup",
        base_name: "Group",
        geometry: Geometry::None,
        view: false,
        container: true,
        properties: || vec![("Group", Property::new(PropertyValue::LinkList(Vec::new())))],
    },
    TypeSpec {
        type_id: "Fem::FemAnalysis",
        base_name: "Analysis",
        geometry: Geometry::None,
        view: false,
        container: true,
        properties: || vec![("Group", Property::new(PropertyValue::LinkList(Vec::new())))],
    },
    TypeSpec {
        type_id: "Fem::MaterialCommon",
        base_name: "MaterialSolid",
        geometry: Geometry::None,
        view: false,
        container: false,
        properties: || {
            vec![
                ("Material", Property::new(PropertyValue::Map(BTreeMap::new()))),
                ("Category", string("Solid")),
                ("References", references()),
            ]
        },
    },
    TypeSpec {
        type_id: "Fem::ConstraintFixed",
        base_name: "ConstraintFixed",
        geometry: Geometry::None,
        view: true,
        container: false,
        properties: || vec![("References", references()), ("Scale", integer(1))],
    },
    TypeSpec {
        type_id: "Fem::ConstraintForce",
        base_name: "ConstraintForce",
        geometry: Geometry::None,
        view: true,
        container: false,
        properties: || {
            vec![
                ("References", references()),
                ("Force", float(1.0)),
                ("Reversed", Property::new(PropertyValue::Bool(false))),
                ("Scale", integer(1)),
            ]
        },
    },
    TypeSpec {
        type_id: "Fem::ConstraintPressure",
        base_name: "ConstraintPressure",
        geometry: Geometry::None,
        view: true,
        container: false,
        properties: || {
            vec![
                ("References", references()),
                ("Pressure", float(1.0)),
                ("Reversed", Property::new(PropertyValue::Bool(false))),
                ("Scale", integer(1)),
            ]
        },
    },
    TypeSpec {
        type_id: "Fem::ConstraintDisplacement",
        base_name: "ConstraintDisplacement",
        geometry: Geometry::None,
        view: true,
        container: false,
        properties: || {
            vec![
                ("References", references()),
                ("xDisplacement", float(0.0)),
                ("yDisplacement", float(0.0)),
                ("zDisplacement", float(0.0)),
            ]
        },
    },
    TypeSpec {
        type_id: "Fem::FemMeshGmsh",
        base_name: "FEMMeshGmsh",
        geometry: Geometry::None,
        view: true,
        container: false,
        properties: || {
            vec![
                ("Part", link()),
                ("CharacteristicLengthMax", float(0.0)),
                ("CharacteristicLengthMin", float(0.0)),
                ("ElementOrder", string("2nd")),
                ("ElementDimension", string("From Shape")),
                ("NodeCount", Property::read_only(PropertyValue::Integer(0))),
                ("ElementCount", Property::read_only(PropertyValue::Integer(0))),
            ]
        },
    },
    TypeSpec {
        type_id: "Fem::SolverCcxTools",
        base_name: "SolverCcxTools",
        geometry: Geometry::None,
        view: false,
        container: false,
        properties: || {
            vec![
                ("AnalysisType", string("static")),
                ("GeometricalNonlinearity", string("linear")),
                ("EigenmodesCount", integer(10)),
            ]
        },
    },
];

/// Family constructors, `make<Name>` to the type they create
pub(crate) static CONSTRUCTORS: &[(&str, &str)] = &[
    ("makeAnalysis", "Fem::FemAnalysis"),
    ("makeMaterialSolid", "Fem::MaterialCommon"),
    ("makeConstraintFixed", "Fem::ConstraintFixed"),
    ("makeConstraintForce", "Fem::ConstraintForce"),
    ("makeConstraintPressure", "Fem::ConstraintPressure"),
    ("makeConstraintDisplacement", "Fem::ConstraintDisplacement"),
    ("makeMeshGmsh", "Fem::FemMeshGmsh"),
    ("makeSolverCalculiXCcxTools", "Fem::SolverCcxTools"),
    ("makeSolverCcxTools", "Fem::SolverCcxTools"),
];

pub(crate) fn lookup(type_id: &str) -> Option<&'static TypeSpec> {
    TYPES.iter().find(|spec| spec.type_id == type_id)
}

pub(crate) fn constructor(name: &str) -> Option<&'static TypeSpec> {
    CONSTRUCTORS
        .iter()
        .find(|(ctor, _)| *ctor == name)
        .and_then(|(_, type_id)| lookup(type_id))
}

fn float(v: f64) -> Property {
    Property::new(PropertyValue::Float(v))
}

fn integer(v: i64) -> Property {
    Property::new(PropertyValue::Integer(v))
}

fn string(s: &str) -> Property {
    Property::new(PropertyValue::String(s.to_string()))
}

fn link() -> Property {
    Property::new(PropertyValue::Link(None))
}

fn references() -> Property {
    Property::new(PropertyValue::LinkSubList(Vec::new()))
}

fn with_placement(mut props: Vec<(&'static str, Property)>) -> Vec<(&'static str, Property)> {
    props.push(("Placement", Property::new(PropertyValue::Placement(Placement::default()))));
    props
}

fn boolean_properties() -> Vec<(&'static str, Property)> {
    with_placement(vec![
        ("Base", link()),
        ("Tool", link()),
        ("Refine", Property::new(PropertyValue::Bool(false))),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_ids_are_unique() {
        for (i, spec) in TYPES.iter().enumerate() {
            assert!(
                TYPES[i + 1..].iter().all(|other| other.type_id != spec.type_id),
                "duplicate type {}",
                spec.type_id
            );
        }
    }

    #[test]
    fn test_every_constructor_resolves() {
        for (name, _) in CONSTRUCTORS {
            assert!(constructor(name).is_some(), "dangling constructor {name}");
        }
    }

    #[test]
    fn test_shape_types_have_placement() {
        for spec in TYPES.iter().filter(|s| s.geometry != Geometry::None) {
            let props = (spec.properties)();
            assert!(props.iter().any(|(name, _)| *name == "Placement"), "{}", spec.type_id);
        }
    }
}
