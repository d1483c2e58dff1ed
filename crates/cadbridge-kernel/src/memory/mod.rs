//! In-memory reference kernel
//!
//! [`MemoryKernel`] keeps documents as plain records and implements the Part
//! and FEM object families well enough to drive the bridge end to end:
//! parametric primitives and booleans with derived volumes, analysis
//! containers, constraints, gmsh meshes, part-file merges and view captures.

mod fem;
mod render;
mod shapes;
mod types;

use std::collections::HashMap;
use std::path::Path;

use cadbridge_core::codec::decode;
use cadbridge_core::model::{DocObject, Document, Property, ViewRecord};
use cadbridge_core::value::{PropertyKind, PropertyValue};

use crate::error::{KernelError, Result};
use crate::kernel::CadKernel;
use crate::project::PartFile;
use crate::view::ViewName;

/// Name used when a document is requested without one
const UNNAMED_DOCUMENT: &str = "Unnamed";

/// Documents held in memory, no external application required
#[derive(Debug, Default)]
pub struct MemoryKernel {
    documents: Vec<Document>,
    active: Option<String>,
}

impl MemoryKernel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Type ids accepted by `add_object`
    pub fn supported_types() -> Vec<&'static str> {
        types::TYPES.iter().map(|spec| spec.type_id).collect()
    }

    fn doc_mut(&mut self, name: &str) -> Result<&mut Document> {
        self.documents
            .iter_mut()
            .find(|d| d.name == name)
            .ok_or_else(|| KernelError::DocumentNotFound(name.to_string()))
    }

    fn object_mut(&mut self, doc: &str, obj: &str) -> Result<&mut DocObject> {
        self.doc_mut(doc)?
            .object_mut(obj)
            .ok_or_else(|| KernelError::ObjectNotFound {
                document: doc.to_string(),
                object: obj.to_string(),
            })
    }

    fn require(&self, doc: &str, obj: &str) -> Result<&DocObject> {
        crate::kernel::require_object(self, doc, obj)
    }
}

/// Identifier-safe version of a requested name
fn sanitize(name: &str) -> String {
    let mut out: String = name
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    out
}

/// `stem`, or `stem001`, `stem002`... whichever is free first
fn unique_name(stem: &str, taken: impl Fn(&str) -> bool) -> String {
    if !taken(stem) {
        return stem.to_string();
    }
    (1..)
        .map(|i| format!("{stem}{i:03}"))
        .find(|candidate| !taken(candidate))
        .unwrap_or_else(|| stem.to_string())
}

/// Point links at renamed objects
fn rename_links(value: PropertyValue, remap: &HashMap<String, String>) -> PropertyValue {
    let rename = |name: String| remap.get(&name).cloned().unwrap_or(name);
    match value {
        PropertyValue::Link(Some(name)) => PropertyValue::Link(Some(rename(name))),
        PropertyValue::LinkList(names) => PropertyValue::LinkList(names.into_iter().map(rename).collect()),
        PropertyValue::LinkSubList(refs) => PropertyValue::LinkSubList(
            refs.into_iter()
                .map(|mut r| {
                    r.object = rename(r.object);
                    r
                })
                .collect(),
        ),
        other => other,
    }
}

impl CadKernel for MemoryKernel {
    fn new_document(&mut self, name: &str) -> Result<String> {
        let stem = match sanitize(name) {
            s if s.is_empty() => UNNAMED_DOCUMENT.to_string(),
            s => s,
        };
        let name = unique_name(&stem, |n| self.documents.iter().any(|d| d.name == n));
        self.documents.push(Document::new(name.clone()));
        self.active = Some(name.clone());
        tracing::info!("Created document '{}'", name);
        Ok(name)
    }

    fn close_document(&mut self, name: &str) -> Result<()> {
        let index = self
            .documents
            .iter()
            .position(|d| d.name == name)
            .ok_or_else(|| KernelError::DocumentNotFound(name.to_string()))?;
        self.documents.remove(index);
        if self.active.as_deref() == Some(name) {
            self.active = self.documents.last().map(|d| d.name.clone());
        }
        Ok(())
    }

    fn document(&self, name: &str) -> Option<&Document> {
        self.documents.iter().find(|d| d.name == name)
    }

    fn list_documents(&self) -> Vec<String> {
        self.documents.iter().map(|d| d.name.clone()).collect()
    }

    fn active_document(&self) -> Option<String> {
        self.active.clone()
    }

    fn set_active_document(&mut self, name: &str) -> Result<()> {
        crate::kernel::require_document(self, name)?;
        self.active = Some(name.to_string());
        Ok(())
    }

    fn recompute(&mut self, doc: &str) -> Result<()> {
        shapes::recompute(self.doc_mut(doc)?)
    }

    fn add_object(&mut self, doc: &str, type_id: &str, name: &str) -> Result<String> {
        let spec = types::lookup(type_id).ok_or_else(|| KernelError::UnknownType(type_id.to_string()))?;
        let document = self.doc_mut(doc)?;

        let stem = match sanitize(name) {
            s if s.is_empty() => spec.base_name.to_string(),
            s => s,
        };
        let name = unique_name(&stem, |n| document.contains(n));

        let mut obj = DocObject::new(name.clone(), spec.type_id);
        obj.properties
            .insert("Label".into(), Property::new(PropertyValue::String(name.clone())));
        obj.properties.extend(
            (spec.properties)()
                .into_iter()
                .map(|(prop, value)| (prop.to_string(), value)),
        );
        obj.view = spec.view.then(ViewRecord::default);
        document.objects.push(obj);

        tracing::debug!("Added {} '{}' to '{}'", type_id, name, doc);
        Ok(name)
    }

    fn remove_object(&mut self, doc: &str, name: &str) -> Result<()> {
        let document = self.doc_mut(doc)?;
        let index = document
            .objects
            .iter()
            .position(|o| o.name == name)
            .ok_or_else(|| KernelError::ObjectNotFound {
                document: doc.to_string(),
                object: name.to_string(),
            })?;
        document.objects.remove(index);

        for prop in document.objects.iter_mut().flat_map(|o| o.properties.values_mut()) {
            match &mut prop.value {
                PropertyValue::Link(target) if target.as_deref() == Some(name) => *target = None,
                PropertyValue::LinkList(names) => names.retain(|n| n != name),
                PropertyValue::LinkSubList(refs) => refs.retain(|r| r.object != name),
                _ => {}
            }
        }
        Ok(())
    }

    fn restore_object(&mut self, doc: &str, object: DocObject) -> Result<()> {
        let document = self.doc_mut(doc)?;
        match document.object_mut(&object.name) {
            Some(slot) => *slot = object,
            None => document.objects.push(object),
        }
        Ok(())
    }

    fn property_kind(&self, doc: &str, obj: &str, prop: &str) -> Option<PropertyKind> {
        self.object(doc, obj)
            .and_then(|o| o.properties.get(prop))
            .map(|p| p.kind)
    }

    fn set_property(
        &mut self,
        doc: &str,
        obj: &str,
        prop: &str,
        value: PropertyValue,
    ) -> Result<()> {
        let slot = self
            .require(doc, obj)?
            .properties
            .get(prop)
            .ok_or_else(|| KernelError::NoSuchProperty {
                object: obj.to_string(),
                property: prop.to_string(),
            })?;
        if slot.read_only {
            return Err(KernelError::ReadOnly {
                object: obj.to_string(),
                property: prop.to_string(),
            });
        }

        let value = match (slot.kind, value) {
            (PropertyKind::Float, PropertyValue::Integer(v)) => PropertyValue::Float(v as f64),
            (expected, value) if value.kind() == expected => value,
            (expected, value) => {
                return Err(KernelError::TypeMismatch {
                    property: prop.to_string(),
                    expected,
                    found: value.kind(),
                });
            }
        };

        if let Some(document) = self.document(doc) {
            for target in value.referenced_names() {
                if target == obj || !document.contains(target) {
                    return Err(KernelError::LinkTarget {
                        property: prop.to_string(),
                        target: target.to_string(),
                    });
                }
            }
        }

        let object = self.object_mut(doc, obj)?;
        if prop == "Label" {
            if let PropertyValue::String(label) = &value {
                object.label.clone_from(label);
            }
        }
        if let Some(slot) = object.properties.get_mut(prop) {
            slot.value = value;
        }
        Ok(())
    }

    fn has_view(&self, doc: &str, obj: &str) -> bool {
        self.object(doc, obj).is_some_and(|o| o.view.is_some())
    }

    fn set_view_property(
        &mut self,
        doc: &str,
        obj: &str,
        prop: &str,
        value: PropertyValue,
    ) -> Result<()> {
        let object = self.object_mut(doc, obj)?;
        let view = object
            .view
            .as_mut()
            .ok_or_else(|| KernelError::NoView(obj.to_string()))?;

        let mismatch = |expected, found: &PropertyValue| KernelError::TypeMismatch {
            property: prop.to_string(),
            expected,
            found: found.kind(),
        };

        match prop {
            "ShapeColor" => match value {
                PropertyValue::Color(color) => view.shape_color = color,
                other => return Err(mismatch(PropertyKind::Color, &other)),
            },
            "Transparency" => {
                let percent = value
                    .as_f64()
                    .ok_or_else(|| mismatch(PropertyKind::Integer, &value))?;
                if !(0.0..=100.0).contains(&percent) {
                    return Err(KernelError::OutOfRange {
                        property: prop.to_string(),
                        range: "0 to 100",
                        value: percent,
                    });
                }
                view.transparency = percent.round() as u8;
            }
            "Visibility" => match value {
                PropertyValue::Bool(visible) => view.visibility = visible,
                other => return Err(mismatch(PropertyKind::Bool, &other)),
            },
            _ => {
                return Err(KernelError::NoSuchProperty {
                    object: obj.to_string(),
                    property: prop.to_string(),
                });
            }
        }
        Ok(())
    }

    fn has_constructor(&self, constructor: &str) -> bool {
        types::constructor(constructor).is_some()
    }

    fn construct(&mut self, doc: &str, constructor: &str, name: &str) -> Result<String> {
        let spec = types::constructor(constructor)
            .ok_or_else(|| KernelError::UnknownConstructor(constructor.to_string()))?;
        self.add_object(doc, spec.type_id, name)
    }

    fn is_container(&self, doc: &str, obj: &str) -> bool {
        self.object(doc, obj)
            .and_then(|o| types::lookup(&o.type_id))
            .is_some_and(|spec| spec.container)
    }

    fn add_to_group(&mut self, doc: &str, container: &str, obj: &str) -> Result<()> {
        self.require(doc, obj)?;
        self.require(doc, container)?;
        if !self.is_container(doc, container) || container == obj {
            return Err(KernelError::NotAContainer(container.to_string()));
        }

        let group = self.object_mut(doc, container)?;
        if let Some(PropertyValue::LinkList(members)) =
            group.properties.get_mut("Group").map(|p| &mut p.value)
        {
            if !members.iter().any(|m| m == obj) {
                members.push(obj.to_string());
            }
        }
        Ok(())
    }

    fn generate_mesh(&mut self, doc: &str, mesh: &str) -> Result<()> {
        fem::generate(self.doc_mut(doc)?, mesh).map(|_| ())
    }

    fn merge_project(&mut self, doc: &str, path: &Path) -> Result<Vec<String>> {
        crate::kernel::require_document(self, doc)?;
        let part = PartFile::load(path)?;

        let mut created: Vec<String> = Vec::with_capacity(part.objects.len());
        let outcome = (|| {
            let mut remap = HashMap::new();
            for entry in &part.objects {
                let name = self.add_object(doc, &entry.type_id, &entry.name)?;
                remap.insert(entry.name.clone(), name.clone());
                created.push(name);
            }

            for (entry, name) in part.objects.iter().zip(&created) {
                for (prop, wire) in &entry.properties {
                    let kind = self.property_kind(doc, name, prop).ok_or_else(|| {
                        KernelError::NoSuchProperty {
                            object: name.clone(),
                            property: prop.clone(),
                        }
                    })?;
                    if self.require(doc, name)?.properties.get(prop).is_some_and(|p| p.read_only) {
                        continue;
                    }
                    let value = decode(wire, kind).map_err(|e| KernelError::Project {
                        path: path.to_path_buf(),
                        message: format!("{name}.{prop}: {e}"),
                    })?;
                    self.set_property(doc, name, prop, rename_links(value, &remap))?;
                }
            }
            self.recompute(doc)
        })();

        if let Err(e) = outcome {
            for name in created.iter().rev() {
                let _ = self.remove_object(doc, name);
            }
            return Err(e);
        }

        tracing::info!("Merged {} object(s) from {} into '{}'", created.len(), path.display(), doc);
        Ok(created)
    }

    fn render_view(
        &mut self,
        doc: &str,
        view: ViewName,
        width: u32,
        height: u32,
    ) -> Result<Vec<u8>> {
        let document = crate::kernel::require_document(self, doc)?;
        render::render(document, view, width, height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use cadbridge_core::value::{Color, LinkSub, Placement};
    use glam::DVec3;

    use crate::project::{PartObject, PART_EXTENSION};

    fn kernel_with_doc() -> (MemoryKernel, String) {
        let mut kernel = MemoryKernel::new();
        let doc = kernel.new_document("Test").unwrap();
        (kernel, doc)
    }

    #[test]
    fn test_document_names_are_unique_and_active() {
        let mut kernel = MemoryKernel::new();
        assert_eq!(kernel.new_document("Doc").unwrap(), "Doc");
        assert_eq!(kernel.new_document("Doc").unwrap(), "Doc001");
        assert_eq!(kernel.new_document("").unwrap(), "Unnamed");
        assert_eq!(kernel.active_document().as_deref(), Some("Unnamed"));
        assert_eq!(kernel.list_documents(), vec!["Doc", "Doc001", "Unnamed"]);

        kernel.close_document("Unnamed").unwrap();
        assert_eq!(kernel.active_document().as_deref(), Some("Doc001"));
    }

    #[test]
    fn test_object_names_derive_from_type() {
        let (mut kernel, doc) = kernel_with_doc();
        assert_eq!(kernel.add_object(&doc, "Part::Box", "").unwrap(), "Box");
        assert_eq!(kernel.add_object(&doc, "Part::Box", "").unwrap(), "Box001");
        assert_eq!(kernel.add_object(&doc, "Part::Box", "Box").unwrap(), "Box002");
        assert_eq!(kernel.add_object(&doc, "Part::Box", "my part").unwrap(), "my_part");
    }

    #[test]
    fn test_unknown_type() {
        let (mut kernel, doc) = kernel_with_doc();
        let err = kernel.add_object(&doc, "Part::Teapot", "").unwrap_err();
        assert!(matches!(err, KernelError::UnknownType(_)));
    }

    #[test]
    fn test_set_property_checks_kind() {
        let (mut kernel, doc) = kernel_with_doc();
        let name = kernel.add_object(&doc, "Part::Box", "").unwrap();

        kernel
            .set_property(&doc, &name, "Length", PropertyValue::Integer(20))
            .unwrap();
        assert_eq!(
            kernel.object(&doc, &name).unwrap().property("Length"),
            Some(&PropertyValue::Float(20.0))
        );

        let err = kernel
            .set_property(&doc, &name, "Length", PropertyValue::String("long".into()))
            .unwrap_err();
        assert!(matches!(err, KernelError::TypeMismatch { .. }));

        let err = kernel
            .set_property(&doc, &name, "Colour", PropertyValue::Bool(true))
            .unwrap_err();
        assert!(matches!(err, KernelError::NoSuchProperty { .. }));
    }

    #[test]
    fn test_label_follows_property() {
        let (mut kernel, doc) = kernel_with_doc();
        let name = kernel.add_object(&doc, "Part::Box", "").unwrap();
        kernel
            .set_property(&doc, &name, "Label", PropertyValue::String("Base plate".into()))
            .unwrap();
        assert_eq!(kernel.object(&doc, &name).unwrap().label, "Base plate");
    }

    #[test]
    fn test_links_must_resolve() {
        let (mut kernel, doc) = kernel_with_doc();
        let cut = kernel.add_object(&doc, "Part::Cut", "").unwrap();

        let err = kernel
            .set_property(&doc, &cut, "Base", PropertyValue::Link(Some("Ghost".into())))
            .unwrap_err();
        assert!(matches!(err, KernelError::LinkTarget { .. }));

        let err = kernel
            .set_property(&doc, &cut, "Base", PropertyValue::Link(Some(cut.clone())))
            .unwrap_err();
        assert!(matches!(err, KernelError::LinkTarget { .. }));
    }

    #[test]
    fn test_remove_clears_links() {
        let (mut kernel, doc) = kernel_with_doc();
        let a = kernel.add_object(&doc, "Part::Box", "").unwrap();
        let cut = kernel.add_object(&doc, "Part::Cut", "").unwrap();
        let fixed = kernel.construct(&doc, "makeConstraintFixed", "").unwrap();
        kernel
            .set_property(&doc, &cut, "Base", PropertyValue::Link(Some(a.clone())))
            .unwrap();
        kernel
            .set_property(
                &doc,
                &fixed,
                "References",
                PropertyValue::LinkSubList(vec![LinkSub::new(a.clone(), "Face1")]),
            )
            .unwrap();

        kernel.remove_object(&doc, &a).unwrap();
        assert_eq!(kernel.object(&doc, &cut).unwrap().property("Base"), Some(&PropertyValue::Link(None)));
        assert_eq!(
            kernel.object(&doc, &fixed).unwrap().property("References"),
            Some(&PropertyValue::LinkSubList(Vec::new()))
        );
    }

    #[test]
    fn test_view_properties() {
        let (mut kernel, doc) = kernel_with_doc();
        let name = kernel.add_object(&doc, "Part::Box", "").unwrap();
        assert!(kernel.has_view(&doc, &name));

        kernel
            .set_view_property(&doc, &name, "ShapeColor", PropertyValue::Color(Color::rgb(1.0, 0.0, 0.0)))
            .unwrap();
        kernel
            .set_view_property(&doc, &name, "Transparency", PropertyValue::Integer(40))
            .unwrap();
        let view = kernel.object(&doc, &name).unwrap().view.clone().unwrap();
        assert_eq!(view.shape_color, Color::rgb(1.0, 0.0, 0.0));
        assert_eq!(view.transparency, 40);

        let err = kernel
            .set_view_property(&doc, &name, "Transparency", PropertyValue::Integer(140))
            .unwrap_err();
        assert!(matches!(err, KernelError::OutOfRange { .. }));

        let group = kernel.add_object(&doc, "App::DocumentObjectGroup", "").unwrap();
        let err = kernel
            .set_view_property(&doc, &group, "Visibility", PropertyValue::Bool(false))
            .unwrap_err();
        assert!(matches!(err, KernelError::NoView(_)));
    }

    #[test]
    fn test_group_membership() {
        let (mut kernel, doc) = kernel_with_doc();
        let analysis = kernel.construct(&doc, "makeAnalysis", "").unwrap();
        let fixed = kernel.construct(&doc, "makeConstraintFixed", "").unwrap();
        assert!(kernel.is_container(&doc, &analysis));
        assert!(!kernel.is_container(&doc, &fixed));

        kernel.add_to_group(&doc, &analysis, &fixed).unwrap();
        kernel.add_to_group(&doc, &analysis, &fixed).unwrap();
        assert_eq!(
            kernel.object(&doc, &analysis).unwrap().property("Group"),
            Some(&PropertyValue::LinkList(vec![fixed.clone()]))
        );

        let err = kernel.add_to_group(&doc, &fixed, &analysis).unwrap_err();
        assert!(matches!(err, KernelError::NotAContainer(_)));

        kernel.remove_object(&doc, &fixed).unwrap();
        assert_eq!(
            kernel.object(&doc, &analysis).unwrap().property("Group"),
            Some(&PropertyValue::LinkList(Vec::new()))
        );
    }

    #[test]
    fn test_recompute_and_mesh() {
        let (mut kernel, doc) = kernel_with_doc();
        let part = kernel.add_object(&doc, "Part::Box", "").unwrap();
        let mesh = kernel.construct(&doc, "makeMeshGmsh", "").unwrap();
        kernel
            .set_property(&doc, &mesh, "Part", PropertyValue::Link(Some(part.clone())))
            .unwrap();
        kernel.recompute(&doc).unwrap();
        assert_relative_eq!(kernel.object(&doc, &part).unwrap().shape.as_ref().unwrap().volume, 1000.0);

        kernel.generate_mesh(&doc, &mesh).unwrap();
        let meshed = kernel.object(&doc, &mesh).unwrap();
        assert!(meshed.number("ElementCount", 0.0) > 0.0);
        assert!(meshed.number("NodeCount", 0.0) > 0.0);

        let err = kernel
            .set_property(&doc, &mesh, "NodeCount", PropertyValue::Integer(1))
            .unwrap_err();
        assert!(matches!(err, KernelError::ReadOnly { .. }));
    }

    #[test]
    fn test_restore_object_replaces_in_place() {
        let (mut kernel, doc) = kernel_with_doc();
        let name = kernel.add_object(&doc, "Part::Box", "").unwrap();
        let snapshot = kernel.object(&doc, &name).unwrap().clone();
        kernel
            .set_property(&doc, &name, "Height", PropertyValue::Float(99.0))
            .unwrap();
        kernel.restore_object(&doc, snapshot.clone()).unwrap();
        assert_eq!(kernel.object(&doc, &name), Some(&snapshot));
    }

    #[test]
    fn test_merge_project_renames_and_relinks() {
        let (mut kernel, doc) = kernel_with_doc();
        kernel.add_object(&doc, "Part::Box", "Plate").unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(format!("bracket.{PART_EXTENSION}"));
        let part = PartFile {
            objects: vec![
                PartObject {
                    name: "Plate".into(),
                    type_id: "Part::Box".into(),
                    properties: serde_json::from_value(serde_json::json!({"Length": 40.0})).unwrap(),
                },
                PartObject {
                    name: "Hole".into(),
                    type_id: "Part::Cylinder".into(),
                    properties: serde_json::Map::new(),
                },
                PartObject {
                    name: "Bracket".into(),
                    type_id: "Part::Cut".into(),
                    properties: serde_json::from_value(serde_json::json!({"Base": "Plate", "Tool": "Hole"}))
                        .unwrap(),
                },
            ],
        };
        part.save(&path).unwrap();

        let added = kernel.merge_project(&doc, &path).unwrap();
        assert_eq!(added, vec!["Plate001", "Hole", "Bracket"]);
        let bracket = kernel.object(&doc, "Bracket").unwrap();
        assert_eq!(bracket.property("Base").and_then(PropertyValue::as_link), Some("Plate001"));
        assert!(bracket.shape.is_some());
    }

    #[test]
    fn test_failed_merge_leaves_document_untouched() {
        let (mut kernel, doc) = kernel_with_doc();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.cbpart");
        std::fs::write(
            &path,
            r#"{"Objects":[{"Name":"A","Type":"Part::Box"},{"Name":"B","Type":"Part::Teapot"}]}"#,
        )
        .unwrap();

        assert!(kernel.merge_project(&doc, &path).is_err());
        assert!(kernel.document(&doc).unwrap().objects.is_empty());
    }

    #[test]
    fn test_render_view_png() {
        let (mut kernel, doc) = kernel_with_doc();
        let name = kernel.add_object(&doc, "Part::Box", "").unwrap();
        kernel
            .set_property(
                &doc,
                &name,
                "Placement",
                PropertyValue::Placement(Placement::new(DVec3::new(5.0, 0.0, 0.0), Default::default())),
            )
            .unwrap();
        kernel.recompute(&doc).unwrap();

        let png = kernel.render_view(&doc, ViewName::Isometric, 64, 48).unwrap();
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (64, 48));
    }

    #[test]
    fn test_render_empty_document_fails() {
        let (mut kernel, doc) = kernel_with_doc();
        let err = kernel.render_view(&doc, ViewName::Front, 64, 64).unwrap_err();
        assert!(matches!(err, KernelError::Capture(_)));
    }
}
