//! Finite-element mesh generation for `Fem::FemMeshGmsh` objects
//!
//! Produces node and element counts for a tetrahedral mesh of the linked
//! part. Counts are derived from the part's volume, area and the requested
//! characteristic length.

use cadbridge_core::model::Document;
use cadbridge_core::value::PropertyValue;

use crate::error::{KernelError, Result};

/// Type id of the only mesh family the kernel can generate
pub(crate) const MESH_TYPE: &str = "Fem::FemMeshGmsh";

/// Refuse meshes above this many elements
const MAX_ELEMENTS: f64 = 5_000_000.0;

/// Divisions along the largest extent when no length is given
const AUTO_DIVISIONS: f64 = 10.0;

/// Volume of a regular tetrahedron per unit edge length cubed
const TET_VOLUME_FACTOR: f64 = 0.117_851_130_197_757_92;

/// Node and element statistics of a generated mesh
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct MeshStats {
    pub nodes: i64,
    pub elements: i64,
}

pub(crate) fn generate(doc: &mut Document, mesh: &str) -> Result<MeshStats> {
    let obj = doc.object(mesh).ok_or_else(|| KernelError::ObjectNotFound {
        document: doc.name.clone(),
        object: mesh.to_string(),
    })?;

    if obj.type_id != MESH_TYPE {
        return Err(KernelError::Mesh(format!(
            "'{mesh}' is a {}, not a {MESH_TYPE}",
            obj.type_id
        )));
    }

    let part_name = obj
        .property("Part")
        .and_then(PropertyValue::as_link)
        .map(str::to_string)
        .ok_or_else(|| KernelError::Mesh(format!("'{mesh}' has no Part to mesh")))?;
    let shape = doc
        .object(&part_name)
        .and_then(|part| part.shape.as_ref())
        .filter(|shape| shape.volume > 0.0)
        .ok_or_else(|| KernelError::Mesh(format!("'{part_name}' has no solid shape")))?;

    let length_max = obj.number("CharacteristicLengthMax", 0.0);
    let length_min = obj.number("CharacteristicLengthMin", 0.0);
    let auto = shape.bound_box.size().max_element() / AUTO_DIVISIONS;
    let h = (if length_max > 0.0 { length_max } else { auto }).max(length_min);
    if h <= 0.0 {
        return Err(KernelError::Mesh("characteristic length must be positive".into()));
    }

    let elements = (shape.volume / (TET_VOLUME_FACTOR * h.powi(3))).ceil().max(1.0);
    if elements > MAX_ELEMENTS {
        return Err(KernelError::Mesh(format!(
            "mesh of '{part_name}' would need {elements:.0} elements; increase CharacteristicLengthMax"
        )));
    }

    let linear_nodes = (elements / 5.0 + shape.area / (h * h)).ceil().max(4.0);
    let second_order = matches!(obj.property("ElementOrder"), Some(PropertyValue::String(o)) if o == "2nd");
    let nodes = if second_order { linear_nodes * 7.0 } else { linear_nodes };

    let stats = MeshStats {
        nodes: nodes as i64,
        elements: elements as i64,
    };

    if let Some(obj) = doc.object_mut(mesh) {
        for (name, value) in [("NodeCount", stats.nodes), ("ElementCount", stats.elements)] {
            if let Some(prop) = obj.properties.get_mut(name) {
                prop.value = PropertyValue::Integer(value);
            }
        }
    }

    tracing::info!(
        "Meshed '{}' from '{}': {} nodes, {} elements",
        mesh,
        part_name,
        stats.nodes,
        stats.elements
    );
    Ok(stats)
}
