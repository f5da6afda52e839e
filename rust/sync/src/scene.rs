// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Headless scene graph.
//!
//! Arena-backed collections, objects, meshes and materials with stable
//! slotmap keys. This is the editor-side half of the round-trip: containers
//! mirror the IFC spatial structure, objects carry world matrices and
//! projected attributes, meshes are keyed by name for the bidirectional
//! `{context-id}/{representation-id}` lookup.

use ifc_bridge_geometry::mesh::Mesh;
use ifc_bridge_geometry::parameters::RepresentationParameter;
use nalgebra::Matrix4;
use rustc_hash::FxHashMap;
use slotmap::{new_key_type, SlotMap};

new_key_type! {
    /// Stable key for a collection (spatial container)
    pub struct CollectionKey;
    /// Stable key for an object
    pub struct ObjectKey;
    /// Stable key for a mesh datablock
    pub struct MeshKey;
    /// Stable key for a shading material
    pub struct MaterialKey;
}

/// Named container holding child containers and objects
#[derive(Debug, Default)]
pub struct CollectionData {
    pub name: String,
    pub children: Vec<CollectionKey>,
    pub objects: Vec<ObjectKey>,
}

/// One projected IFC attribute on an object
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectAttribute {
    pub name: String,
    /// Type tag; attribute projection always emits "string"
    pub data_type: String,
    pub value: String,
}

/// Scene object: a placed instance of a mesh
#[derive(Debug)]
pub struct ObjectData {
    pub name: String,
    pub mesh: Option<MeshKey>,
    pub matrix_world: Matrix4<f64>,
    /// Step id of the owning IFC product, 0 when unbound
    pub ifc_definition_id: u32,
    pub attributes: Vec<ObjectAttribute>,
}

/// Mesh datablock with its IFC binding and material slots
#[derive(Debug, Default)]
pub struct MeshData {
    pub name: String,
    pub mesh: Mesh,
    /// Step id of the shape representation this mesh was built from
    pub ifc_definition_id: Option<u32>,
    /// Survives removal even when unreferenced
    pub keep_alive: bool,
    /// Material slots in order; a slot may be empty
    pub slots: Vec<Option<MaterialKey>>,
    /// Harvested editable parameters for the bound representation
    pub parameters: Vec<RepresentationParameter>,
}

/// Shading material with its IFC surface style binding
#[derive(Debug)]
pub struct MaterialData {
    pub name: String,
    /// RGBA, alpha = 1 - transparency
    pub diffuse_color: [f64; 4],
    /// Step id of the bound IfcSurfaceStyle
    pub ifc_style_id: Option<u32>,
}

/// Arena-backed scene graph
#[derive(Debug)]
pub struct Scene {
    collections: SlotMap<CollectionKey, CollectionData>,
    objects: SlotMap<ObjectKey, ObjectData>,
    meshes: SlotMap<MeshKey, MeshData>,
    materials: SlotMap<MaterialKey, MaterialData>,
    mesh_names: FxHashMap<String, MeshKey>,
    root: CollectionKey,
}

impl Scene {
    /// Create a scene with an empty root collection
    pub fn new() -> Self {
        let mut collections = SlotMap::with_key();
        let root = collections.insert(CollectionData {
            name: "Scene".to_string(),
            ..Default::default()
        });
        Self {
            collections,
            objects: SlotMap::with_key(),
            meshes: SlotMap::with_key(),
            materials: SlotMap::with_key(),
            mesh_names: FxHashMap::default(),
            root,
        }
    }

    /// The top-level fallback collection
    pub fn root(&self) -> CollectionKey {
        self.root
    }

    /// Create an unlinked collection
    pub fn create_collection(&mut self, name: &str) -> CollectionKey {
        self.collections.insert(CollectionData {
            name: name.to_string(),
            ..Default::default()
        })
    }

    /// Link a collection under a parent collection
    pub fn link_collection(&mut self, child: CollectionKey, parent: CollectionKey) {
        if let Some(p) = self.collections.get_mut(parent) {
            if !p.children.contains(&child) {
                p.children.push(child);
            }
        }
    }

    /// Create an object, initially at identity and unlinked
    pub fn create_object(&mut self, name: &str, mesh: Option<MeshKey>) -> ObjectKey {
        self.objects.insert(ObjectData {
            name: name.to_string(),
            mesh,
            matrix_world: Matrix4::identity(),
            ifc_definition_id: 0,
            attributes: Vec::new(),
        })
    }

    /// Link an object into a collection
    pub fn link_object(&mut self, object: ObjectKey, collection: CollectionKey) {
        if let Some(c) = self.collections.get_mut(collection) {
            if !c.objects.contains(&object) {
                c.objects.push(object);
            }
        }
    }

    /// Create a named mesh datablock. A name can bind at most one live mesh;
    /// if the name is already taken the existing mesh is returned unchanged.
    pub fn create_mesh(&mut self, name: &str, mesh: Mesh) -> MeshKey {
        if let Some(existing) = self.mesh_names.get(name) {
            return *existing;
        }
        let key = self.meshes.insert(MeshData {
            name: name.to_string(),
            mesh,
            ..Default::default()
        });
        self.mesh_names.insert(name.to_string(), key);
        key
    }

    /// Create a named mesh, replacing the geometry and IFC binding of an
    /// existing mesh with that name (objects referencing it follow along).
    pub fn create_or_replace_mesh(&mut self, name: &str, mesh: Mesh) -> MeshKey {
        if let Some(key) = self.mesh_names.get(name).copied() {
            if let Some(data) = self.meshes.get_mut(key) {
                data.mesh = mesh;
                data.ifc_definition_id = None;
                data.slots.clear();
                data.parameters.clear();
                return key;
            }
        }
        self.create_mesh(name, mesh)
    }

    /// Copy a mesh datablock under a new name
    pub fn duplicate_mesh(&mut self, source: MeshKey, name: &str) -> Option<MeshKey> {
        let copied = {
            let data = self.meshes.get(source)?;
            MeshData {
                name: name.to_string(),
                mesh: data.mesh.clone(),
                ifc_definition_id: data.ifc_definition_id,
                keep_alive: false,
                slots: data.slots.clone(),
                parameters: data.parameters.clone(),
            }
        };
        let key = self.meshes.insert(copied);
        self.mesh_names.insert(name.to_string(), key);
        Some(key)
    }

    /// Look up a mesh by its name
    pub fn mesh_by_name(&self, name: &str) -> Option<MeshKey> {
        self.mesh_names.get(name).copied()
    }

    /// Protect a mesh from removal-time garbage collection
    pub fn mark_keep_alive(&mut self, mesh: MeshKey) {
        if let Some(data) = self.meshes.get_mut(mesh) {
            data.keep_alive = true;
        }
    }

    /// Delete a mesh datablock unless it is marked keep-alive.
    /// Objects still pointing at it lose their mesh.
    pub fn remove_mesh(&mut self, mesh: MeshKey) {
        let Some(data) = self.meshes.get(mesh) else {
            return;
        };
        if data.keep_alive {
            return;
        }
        let name = data.name.clone();
        self.meshes.remove(mesh);
        if self.mesh_names.get(&name) == Some(&mesh) {
            self.mesh_names.remove(&name);
        }
        for (_, object) in self.objects.iter_mut() {
            if object.mesh == Some(mesh) {
                object.mesh = None;
            }
        }
    }

    /// Point every object using `from` at `to` instead
    pub fn retarget_mesh(&mut self, from: MeshKey, to: MeshKey) {
        for (_, object) in self.objects.iter_mut() {
            if object.mesh == Some(from) {
                object.mesh = Some(to);
            }
        }
    }

    /// Create a shading material, default white and opaque
    pub fn create_material(&mut self, name: &str) -> MaterialKey {
        self.materials.insert(MaterialData {
            name: name.to_string(),
            diffuse_color: [1.0, 1.0, 1.0, 1.0],
            ifc_style_id: None,
        })
    }

    /// Append a material to a mesh's slot list
    pub fn append_material(&mut self, mesh: MeshKey, material: MaterialKey) {
        if let Some(data) = self.meshes.get_mut(mesh) {
            data.slots.push(Some(material));
        }
    }

    /// Append an empty material slot
    pub fn append_empty_slot(&mut self, mesh: MeshKey) {
        if let Some(data) = self.meshes.get_mut(mesh) {
            data.slots.push(None);
        }
    }

    // Accessors

    pub fn collection(&self, key: CollectionKey) -> Option<&CollectionData> {
        self.collections.get(key)
    }

    pub fn object(&self, key: ObjectKey) -> Option<&ObjectData> {
        self.objects.get(key)
    }

    pub fn object_mut(&mut self, key: ObjectKey) -> Option<&mut ObjectData> {
        self.objects.get_mut(key)
    }

    pub fn mesh(&self, key: MeshKey) -> Option<&MeshData> {
        self.meshes.get(key)
    }

    pub fn mesh_mut(&mut self, key: MeshKey) -> Option<&mut MeshData> {
        self.meshes.get_mut(key)
    }

    pub fn material(&self, key: MaterialKey) -> Option<&MaterialData> {
        self.materials.get(key)
    }

    pub fn material_mut(&mut self, key: MaterialKey) -> Option<&mut MaterialData> {
        self.materials.get_mut(key)
    }

    /// Number of live mesh datablocks
    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    /// Number of live objects
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mesh_names_bind_at_most_one_live_mesh() {
        let mut scene = Scene::new();
        let a = scene.create_mesh("1/42", Mesh::new());
        let b = scene.create_mesh("1/42", Mesh::new());
        assert_eq!(a, b);
        assert_eq!(scene.mesh_count(), 1);
    }

    #[test]
    fn keep_alive_blocks_removal() {
        let mut scene = Scene::new();
        let mesh = scene.create_mesh("1/42", Mesh::new());
        scene.mark_keep_alive(mesh);
        scene.remove_mesh(mesh);
        assert!(scene.mesh(mesh).is_some());
    }

    #[test]
    fn removal_clears_object_pointers() {
        let mut scene = Scene::new();
        let mesh = scene.create_mesh("1/42", Mesh::new());
        let object = scene.create_object("IfcWall/W1", Some(mesh));
        scene.remove_mesh(mesh);
        assert_eq!(scene.object(object).unwrap().mesh, None);
        assert_eq!(scene.mesh_by_name("1/42"), None);
    }

    #[test]
    fn replace_keeps_key_and_clears_binding() {
        let mut scene = Scene::new();
        let first = scene.create_mesh("1/42", Mesh::new());
        scene.mesh_mut(first).unwrap().ifc_definition_id = Some(42);
        let second = scene.create_or_replace_mesh("1/42", Mesh::new());
        assert_eq!(first, second);
        assert_eq!(scene.mesh(first).unwrap().ifc_definition_id, None);
    }
}
