//! Shape derivation for the in-memory kernel
//!
//! Primitives get exact volume and area. Booleans are estimated from the
//! overlap of the operands' bounding boxes; this kernel stands in for a real
//! geometry engine and only needs plausible, monotonic numbers.

use std::collections::{HashMap, HashSet};
use std::f64::consts::PI;

use cadbridge_core::model::{BoundBox, DocObject, Document, Shape};
use cadbridge_core::value::Placement;
use glam::DVec3;

use super::types::{self, BooleanOp, Geometry};
use crate::error::{KernelError, Result};

/// Order objects so every object comes after the objects it links to
pub(crate) fn dependency_order(doc: &Document) -> Result<Vec<String>> {
    fn visit<'a>(
        doc: &'a Document,
        name: &'a str,
        done: &mut HashSet<&'a str>,
        path: &mut Vec<&'a str>,
        order: &mut Vec<String>,
    ) -> Result<()> {
        if done.contains(name) {
            return Ok(());
        }
        if let Some(start) = path.iter().position(|n| *n == name) {
            let mut cycle: Vec<String> = path[start..].iter().map(|n| n.to_string()).collect();
            cycle.push(name.to_string());
            return Err(KernelError::CyclicDependency(cycle));
        }
        let Some(obj) = doc.object(name) else {
            return Ok(());
        };

        // Group membership is not a geometric dependency
        if !is_group(obj) {
            path.push(name);
            for dep in obj.dependencies() {
                visit(doc, dep, done, path, order)?;
            }
            path.pop();
        }

        done.insert(name);
        order.push(name.to_string());
        Ok(())
    }

    let mut done = HashSet::new();
    let mut order = Vec::with_capacity(doc.objects.len());
    for obj in &doc.objects {
        visit(doc, &obj.name, &mut done, &mut Vec::new(), &mut order)?;
    }
    Ok(order)
}

fn is_group(obj: &DocObject) -> bool {
    types::lookup(&obj.type_id).is_some_and(|spec| spec.container)
}

/// Recompute every shape of the document in dependency order
pub(crate) fn recompute(doc: &mut Document) -> Result<()> {
    let order = dependency_order(doc)?;
    let mut shapes: HashMap<String, Shape> = HashMap::new();

    for name in &order {
        let Some(obj) = doc.object(name) else {
            continue;
        };
        let geometry = types::lookup(&obj.type_id).map_or(Geometry::None, |spec| spec.geometry);
        if let Some(shape) = derive(obj, geometry, &shapes) {
            shapes.insert(name.clone(), shape);
        }
    }

    for obj in &mut doc.objects {
        obj.shape = shapes.remove(&obj.name);
    }
    Ok(())
}

fn derive(obj: &DocObject, geometry: Geometry, shapes: &HashMap<String, Shape>) -> Option<Shape> {
    let placement = obj
        .property("Placement")
        .and_then(|p| p.as_placement())
        .unwrap_or_default();

    match geometry {
        Geometry::None => None,
        Geometry::Box => {
            let (l, w, h) = (obj.number("Length", 0.0), obj.number("Width", 0.0), obj.number("Height", 0.0));
            positive(&[l, w, h])?;
            Some(primitive(
                l * w * h,
                2.0 * (l * w + l * h + w * h),
                (8, 12, 6),
                BoundBox::new(DVec3::ZERO, DVec3::new(l, w, h)),
                &placement,
            ))
        }
        Geometry::Cylinder => {
            let (r, h) = (obj.number("Radius", 0.0), obj.number("Height", 0.0));
            let fraction = (obj.number("Angle", 360.0) / 360.0).clamp(0.0, 1.0);
            positive(&[r, h, fraction])?;
            let mut area = fraction * (2.0 * PI * r * r + 2.0 * PI * r * h);
            let counts = if fraction < 1.0 {
                area += 2.0 * r * h;
                (6, 9, 5)
            } else {
                (2, 3, 3)
            };
            Some(primitive(
                fraction * PI * r * r * h,
                area,
                counts,
                BoundBox::new(DVec3::new(-r, -r, 0.0), DVec3::new(r, r, h)),
                &placement,
            ))
        }
        Geometry::Sphere => {
            let r = obj.number("Radius", 0.0);
            positive(&[r])?;
            Some(primitive(
                4.0 / 3.0 * PI * r.powi(3),
                4.0 * PI * r * r,
                (2, 3, 1),
                BoundBox::new(DVec3::splat(-r), DVec3::splat(r)),
                &placement,
            ))
        }
        Geometry::Cone => {
            let (r1, r2, h) = (obj.number("Radius1", 0.0), obj.number("Radius2", 0.0), obj.number("Height", 0.0));
            positive(&[r1.max(r2), h])?;
            if r1 < 0.0 || r2 < 0.0 {
                return None;
            }
            let slant = ((r1 - r2).powi(2) + h * h).sqrt();
            let r = r1.max(r2);
            Some(primitive(
                PI * h / 3.0 * (r1 * r1 + r1 * r2 + r2 * r2),
                PI * (r1 * r1 + r2 * r2) + PI * (r1 + r2) * slant,
                (2, 3, 3),
                BoundBox::new(DVec3::new(-r, -r, 0.0), DVec3::new(r, r, h)),
                &placement,
            ))
        }
        Geometry::Torus => {
            let (major, minor) = (obj.number("Radius1", 0.0), obj.number("Radius2", 0.0));
            positive(&[major, minor])?;
            let outer = major + minor;
            Some(primitive(
                2.0 * PI * PI * major * minor * minor,
                4.0 * PI * PI * major * minor,
                (1, 3, 1),
                BoundBox::new(DVec3::new(-outer, -outer, -minor), DVec3::new(outer, outer, minor)),
                &placement,
            ))
        }
        Geometry::Boolean(op) => {
            let base = shapes.get(obj.property("Base")?.as_link()?)?;
            let tool = shapes.get(obj.property("Tool")?.as_link()?)?;
            boolean(op, base, tool)
        }
        Geometry::Mirror => {
            let source = shapes.get(obj.property("Source")?.as_link()?)?;
            let origin = vector(obj, "Base");
            let normal = vector(obj, "Normal").try_normalize()?;
            let mirrored = source.bound_box.corners().map(|p| p - 2.0 * (p - origin).dot(normal) * normal);
            Some(Shape {
                bound_box: BoundBox::from_points(mirrored)?,
                ..source.clone()
            })
        }
        Geometry::Extrusion => {
            let profile = shapes.get(obj.property("Profile")?.as_link()?)?;
            let dir = vector(obj, "Dir").try_normalize()?;
            let length = obj.number("LengthFwd", 0.0);
            positive(&[length])?;
            extrude(profile, dir, length)
        }
    }
}

fn boolean(op: BooleanOp, base: &Shape, tool: &Shape) -> Option<Shape> {
    let overlap_box = base.bound_box.intersection(&tool.bound_box);
    let overlap = overlap_box
        .map_or(0.0, |b| b.volume())
        .min(base.volume)
        .min(tool.volume);
    let tool_fraction = if tool.volume > 0.0 { overlap / tool.volume } else { 0.0 };

    let counts = (
        base.vertex_count + tool.vertex_count,
        base.edge_count + tool.edge_count,
        base.face_count + tool.face_count,
    );

    let shape = match op {
        BooleanOp::Cut => Shape {
            volume: (base.volume - overlap).max(0.0),
            area: base.area + tool.area * tool_fraction,
            vertex_count: counts.0,
            edge_count: counts.1,
            face_count: counts.2,
            bound_box: base.bound_box,
        },
        BooleanOp::Fuse => Shape {
            volume: base.volume + tool.volume - overlap,
            area: base.area + tool.area * (1.0 - tool_fraction),
            vertex_count: counts.0,
            edge_count: counts.1,
            face_count: counts.2,
            bound_box: base.bound_box.union(&tool.bound_box),
        },
        BooleanOp::Common => {
            let bound_box = overlap_box?;
            Shape {
                volume: overlap,
                area: base.area.min(tool.area) * tool_fraction,
                vertex_count: counts.0.min(8),
                edge_count: counts.1.min(12),
                face_count: counts.2.min(6),
                bound_box,
            }
        }
    };
    Some(shape)
}

/// Sweep a profile's bounding box along `dir`; the cross-section is the
/// box projected onto the plane normal to the sweep
fn extrude(profile: &Shape, dir: DVec3, length: f64) -> Option<Shape> {
    let size = profile.bound_box.size();
    let section = size.y * size.z * dir.x.abs() + size.x * size.z * dir.y.abs() + size.x * size.y * dir.z.abs();
    let swept = BoundBox::new(profile.bound_box.min + dir * length, profile.bound_box.max + dir * length);
    Some(Shape {
        volume: profile.volume + section * length,
        area: profile.area + 4.0 * section.sqrt() * length,
        vertex_count: profile.vertex_count * 2,
        edge_count: profile.edge_count * 3,
        face_count: profile.face_count + 2,
        bound_box: profile.bound_box.union(&swept),
    })
}

fn primitive(
    volume: f64,
    area: f64,
    (vertex_count, edge_count, face_count): (usize, usize, usize),
    local: BoundBox,
    placement: &Placement,
) -> Shape {
    let corners = local.corners().map(|p| placement.transform_point(p));
    Shape {
        volume,
        area,
        vertex_count,
        edge_count,
        face_count,
        bound_box: BoundBox::from_points(corners).unwrap_or(local),
    }
}

fn positive(dims: &[f64]) -> Option<()> {
    dims.iter().all(|d| *d > 0.0).then_some(())
}

fn vector(obj: &DocObject, name: &str) -> DVec3 {
    match obj.property(name) {
        Some(cadbridge_core::value::PropertyValue::Vector(v)) => *v,
        _ => DVec3::ZERO,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use cadbridge_core::model::Property;
    use cadbridge_core::value::{PropertyValue, Rotation};

    fn object(name: &str, type_id: &str) -> DocObject {
        let spec = types::lookup(type_id).unwrap();
        let mut obj = DocObject::new(name, type_id);
        for (prop, value) in (spec.properties)() {
            obj.properties.insert(prop.to_string(), value);
        }
        obj
    }

    fn set(obj: &mut DocObject, prop: &str, value: PropertyValue) {
        obj.properties.insert(prop.to_string(), Property::new(value));
    }

    #[test]
    fn test_box_volume_and_area() {
        let mut doc = Document::new("Doc");
        let mut b = object("Box", "Part::Box");
        set(&mut b, "Length", PropertyValue::Float(2.0));
        set(&mut b, "Width", PropertyValue::Float(3.0));
        set(&mut b, "Height", PropertyValue::Float(4.0));
        doc.objects.push(b);

        recompute(&mut doc).unwrap();
        let shape = doc.object("Box").unwrap().shape.as_ref().unwrap();
        assert_relative_eq!(shape.volume, 24.0);
        assert_relative_eq!(shape.area, 52.0);
        assert_eq!((shape.vertex_count, shape.edge_count, shape.face_count), (8, 12, 6));
    }

    #[test]
    fn test_placement_moves_bounds() {
        let mut doc = Document::new("Doc");
        let mut b = object("Box", "Part::Box");
        set(
            &mut b,
            "Placement",
            PropertyValue::Placement(Placement::new(DVec3::new(5.0, 0.0, 0.0), Rotation::IDENTITY)),
        );
        doc.objects.push(b);

        recompute(&mut doc).unwrap();
        let bb = doc.object("Box").unwrap().shape.as_ref().unwrap().bound_box;
        assert_relative_eq!(bb.min.x, 5.0);
        assert_relative_eq!(bb.max.x, 15.0);
    }

    #[test]
    fn test_degenerate_box_has_no_shape() {
        let mut doc = Document::new("Doc");
        let mut b = object("Box", "Part::Box");
        set(&mut b, "Length", PropertyValue::Float(0.0));
        doc.objects.push(b);

        recompute(&mut doc).unwrap();
        assert!(doc.object("Box").unwrap().shape.is_none());
    }

    #[test]
    fn test_cut_after_operands_regardless_of_creation_order() {
        let mut doc = Document::new("Doc");
        let mut cut = object("Cut", "Part::Cut");
        set(&mut cut, "Base", PropertyValue::Link(Some("Box".into())));
        set(&mut cut, "Tool", PropertyValue::Link(Some("Small".into())));
        doc.objects.push(cut);
        doc.objects.push(object("Box", "Part::Box"));
        let mut small = object("Small", "Part::Box");
        set(&mut small, "Length", PropertyValue::Float(5.0));
        doc.objects.push(small);

        recompute(&mut doc).unwrap();
        let volume = doc.object("Cut").unwrap().shape.as_ref().unwrap().volume;
        assert_relative_eq!(volume, 1000.0 - 500.0);
    }

    #[test]
    fn test_cycle_is_reported() {
        let mut doc = Document::new("Doc");
        let mut a = object("A", "Part::Cut");
        set(&mut a, "Base", PropertyValue::Link(Some("B".into())));
        let mut b = object("B", "Part::Cut");
        set(&mut b, "Base", PropertyValue::Link(Some("A".into())));
        doc.objects.push(a);
        doc.objects.push(b);

        let err = recompute(&mut doc).unwrap_err();
        assert!(matches!(err, KernelError::CyclicDependency(_)));
    }

    #[test]
    fn test_mirror_keeps_volume() {
        let mut doc = Document::new("Doc");
        doc.objects.push(object("Box", "Part::Box"));
        let mut mirror = object("Mirror", "Part::Mirroring");
        set(&mut mirror, "Source", PropertyValue::Link(Some("Box".into())));
        doc.objects.push(mirror);

        recompute(&mut doc).unwrap();
        let shape = doc.object("Mirror").unwrap().shape.as_ref().unwrap();
        assert_relative_eq!(shape.volume, 1000.0);
        assert_relative_eq!(shape.bound_box.min.x, -10.0);
    }

    #[test]
    fn test_extrusion_sweeps_profile() {
        let mut doc = Document::new("Doc");
        doc.objects.push(object("Box", "Part::Box"));
        let mut extrude = object("Extrude", "Part::Extrusion");
        set(&mut extrude, "Profile", PropertyValue::Link(Some("Box".into())));
        set(&mut extrude, "LengthFwd", PropertyValue::Float(5.0));
        doc.objects.push(extrude);

        recompute(&mut doc).unwrap();
        let shape = doc.object("Extrude").unwrap().shape.as_ref().unwrap();
        assert_relative_eq!(shape.volume, 1500.0);
        assert_relative_eq!(shape.bound_box.max.z, 15.0);
        assert_relative_eq!(shape.bound_box.min.z, 0.0);
    }

    #[test]
    fn test_extrusion_without_profile_has_no_shape() {
        let mut doc = Document::new("Doc");
        doc.objects.push(object("Extrude", "Part::Extrusion"));

        recompute(&mut doc).unwrap();
        assert!(doc.object("Extrude").unwrap().shape.is_none());
    }
}
