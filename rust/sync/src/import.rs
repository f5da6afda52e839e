// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Full-model import orchestration.
//!
//! Drives one import session: unit-scale detection, project root creation,
//! spatial hierarchy, then one pass over every element and space. Elements
//! share meshes through a `mesh-{representation-id}` cache so a mapped
//! representation is tessellated once no matter how many products use it.
//! A failed element is logged and skipped; only the top-level steps
//! (project lookup) abort the run.

use crate::error::{Error, Result};
use crate::hierarchy::{self, spatial_name, Hierarchy};
use crate::materials::MaterialCreator;
use crate::scene::{MeshKey, ObjectKey, Scene};
use ifc_bridge_geometry::placement::{apply_unit_scale, resolve_local_placement};
use ifc_bridge_geometry::tessellate::{body_representation, TessellationSettings, Tessellator};
use ifc_bridge_geometry::{Matrix4, Mesh, TessellatedShape};
use ifc_bridge_model::{length_unit_scale, ModelStore};
use rustc_hash::FxHashMap;
use tracing::{debug, info, warn};

/// Canonical scene mesh name for a shape representation,
/// `{context-id}/{representation-id}`
pub fn mesh_key_name(store: &ModelStore, representation: u32) -> String {
    let context = store
        .attribute(representation, 0)
        .ok()
        .and_then(|v| v.as_entity_ref())
        .unwrap_or(0);
    format!("{context}/{representation}")
}

/// Whether the mesh builder constructed a mesh or handed back a shared one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeshOutcome {
    Created(MeshKey),
    Reused(MeshKey),
}

impl MeshOutcome {
    pub fn key(self) -> MeshKey {
        match self {
            MeshOutcome::Created(key) | MeshOutcome::Reused(key) => key,
        }
    }
}

/// Counters for one import session
#[derive(Debug, Default, Clone, Copy)]
pub struct ImportSummary {
    pub objects_created: usize,
    pub meshes_created: usize,
    pub meshes_reused: usize,
    pub elements_skipped: usize,
    /// Objects linked to the scene root for lack of a spatial container
    pub orphans: usize,
}

/// One import session over a parsed model.
///
/// Caches (mesh-by-representation, material-by-name) are owned by the
/// importer and die with it; a fresh session never sees a prior session's
/// state.
pub struct IfcImporter<'a, T: Tessellator> {
    store: &'a ModelStore,
    tessellator: &'a T,
    settings: TessellationSettings,
    unit_scale: f64,
    meshes: FxHashMap<String, MeshKey>,
    material_creator: MaterialCreator<'a>,
    hierarchy: Hierarchy,
    summary: ImportSummary,
}

impl<'a, T: Tessellator> IfcImporter<'a, T> {
    pub fn new(store: &'a ModelStore, tessellator: &'a T) -> Self {
        Self {
            store,
            tessellator,
            settings: TessellationSettings::default(),
            unit_scale: 1.0,
            meshes: FxHashMap::default(),
            material_creator: MaterialCreator::new(store),
            hierarchy: Hierarchy::default(),
            summary: ImportSummary::default(),
        }
    }

    /// The unit scale detected by the last `execute` call
    pub fn unit_scale(&self) -> f64 {
        self.unit_scale
    }

    /// The spatial hierarchy built by the last `execute` call
    pub fn hierarchy(&self) -> &Hierarchy {
        &self.hierarchy
    }

    /// Run the full import into `scene`
    pub fn execute(&mut self, scene: &mut Scene) -> Result<ImportSummary> {
        self.unit_scale = length_unit_scale(self.store);
        self.settings.unit_scale = self.unit_scale;
        debug!(unit_scale = self.unit_scale, "unit scale detected");

        let project_collection = self.create_project(scene)?;
        self.hierarchy = hierarchy::build(self.store, scene, project_collection);

        let mut elements = self.store.by_type("IfcElement");
        elements.extend(self.store.by_type("IfcSpace"));
        for element in elements {
            match self.create_object(scene, element) {
                Ok(Some(_)) => self.summary.objects_created += 1,
                Ok(None) => {}
                Err(error) => {
                    warn!(element, %error, "skipping element");
                    self.summary.elements_skipped += 1;
                }
            }
        }

        info!(
            objects = self.summary.objects_created,
            meshes = self.summary.meshes_created,
            reused = self.summary.meshes_reused,
            skipped = self.summary.elements_skipped,
            "import finished"
        );
        Ok(self.summary)
    }

    fn create_project(&self, scene: &mut Scene) -> Result<crate::scene::CollectionKey> {
        let project = self
            .store
            .by_type("IfcProject")
            .into_iter()
            .next()
            .ok_or(Error::MissingProject)?;
        let collection = scene.create_collection(&spatial_name(self.store, project));
        let root = scene.root();
        scene.link_collection(collection, root);
        Ok(collection)
    }

    /// Build a mesh for a representation, or hand back the cached one.
    ///
    /// The cache wins regardless of the shape passed in; a second call for
    /// the same representation never rebuilds.
    pub fn build_mesh(
        &mut self,
        scene: &mut Scene,
        representation: u32,
        shape: &TessellatedShape,
    ) -> Result<MeshOutcome> {
        let cache_key = format!("mesh-{representation}");
        if let Some(existing) = self.meshes.get(&cache_key) {
            self.summary.meshes_reused += 1;
            return Ok(MeshOutcome::Reused(*existing));
        }
        let mesh = Mesh::from_buffers(&shape.vertices, &shape.faces)?;
        let key = scene.create_mesh(&mesh_key_name(self.store, representation), mesh);
        if let Some(data) = scene.mesh_mut(key) {
            data.ifc_definition_id = Some(representation);
        }
        self.meshes.insert(cache_key, key);
        self.summary.meshes_created += 1;
        Ok(MeshOutcome::Created(key))
    }

    fn create_object(&mut self, scene: &mut Scene, element: u32) -> Result<Option<ObjectKey>> {
        // Openings carve geometry out of other elements, they get no object
        if self.store.is_a(element, "IfcOpeningElement") {
            return Ok(None);
        }
        let Some(representation) = body_representation(self.store, element) else {
            return Ok(None); // No geometry, nothing to show
        };

        let cache_key = format!("mesh-{representation}");
        let (outcome, engine_matrix) = if self.meshes.contains_key(&cache_key) {
            // Shared representation: skip the engine entirely and fall back
            // to the resolver for this product's placement
            let shape = TessellatedShape {
                representation_id: representation,
                vertices: Vec::new(),
                faces: Vec::new(),
                matrix: [0.0; 16],
            };
            (self.build_mesh(scene, representation, &shape)?, None)
        } else {
            let shape = self
                .tessellator
                .create_shape(&self.settings, self.store, element)?;
            let matrix = shape.matrix4();
            (self.build_mesh(scene, representation, &shape)?, Some(matrix))
        };

        if let MeshOutcome::Created(mesh) = outcome {
            self.apply_materials(scene, element, mesh);
        }

        let resolved_matrix = self.resolved_placement(element)?;
        let matrix = match engine_matrix {
            Some(engine) => {
                // The engine matrix is authoritative; the resolver matrix is a
                // parity diagnostic and may legitimately diverge
                if let Some(resolved) = resolved_matrix {
                    let deviation = (engine - resolved).abs().max();
                    if deviation > 1e-6 {
                        debug!(element, deviation, "placement parity mismatch");
                    }
                }
                engine
            }
            None => resolved_matrix.unwrap_or_else(Matrix4::identity),
        };

        let object = scene.create_object(&spatial_name(self.store, element), Some(outcome.key()));
        if let Some(data) = scene.object_mut(object) {
            data.ifc_definition_id = element;
            data.matrix_world = matrix;
            data.attributes = self.project_attributes(element)?;
        }
        self.link_into_structure(scene, element, object);
        Ok(Some(object))
    }

    fn apply_materials(&mut self, scene: &mut Scene, element: u32, mesh: MeshKey) {
        for rel in self.store.get_inverse(element) {
            if !self.store.is_a(rel, "IfcRelAssociatesMaterial") {
                continue;
            }
            let on_related_side = self
                .store
                .attribute(rel, 4)
                .map(|v| v.references(element))
                .unwrap_or(false);
            if !on_related_side {
                continue;
            }
            if let Some(material) = self
                .store
                .attribute(rel, 5)
                .ok()
                .and_then(|v| v.as_entity_ref())
            {
                self.material_creator.create(scene, material, mesh);
            }
        }
    }

    fn resolved_placement(&self, element: u32) -> Result<Option<Matrix4<f64>>> {
        // IfcProduct: ObjectPlacement(5)
        let Some(placement) = self.store.attribute(element, 5)?.as_entity_ref() else {
            return Ok(None);
        };
        let matrix = resolve_local_placement(self.store, placement)?;
        Ok(Some(apply_unit_scale(matrix, self.unit_scale)))
    }

    /// Copy schema-declared, non-null attributes as string-typed records
    fn project_attributes(&self, element: u32) -> Result<Vec<crate::scene::ObjectAttribute>> {
        let entity = self.store.by_id(element)?;
        let Some(declared) = self.store.schema().attributes(entity.type_name()) else {
            return Ok(Vec::new());
        };
        Ok(declared
            .iter()
            .enumerate()
            .filter_map(|(index, def)| {
                let value = entity.attribute(index)?;
                if value.is_null() {
                    return None;
                }
                Some(crate::scene::ObjectAttribute {
                    name: def.name.clone(),
                    data_type: "string".to_string(),
                    value: value.to_string(),
                })
            })
            .collect())
    }

    fn link_into_structure(&mut self, scene: &mut Scene, element: u32, object: ObjectKey) {
        for rel in self.store.get_inverse(element) {
            if !self.store.is_a(rel, "IfcRelContainedInSpatialStructure") {
                continue;
            }
            let on_related_side = self
                .store
                .attribute(rel, 4)
                .map(|v| v.references(element))
                .unwrap_or(false);
            if !on_related_side {
                continue;
            }
            let structure = self
                .store
                .attribute(rel, 5)
                .ok()
                .and_then(|v| v.as_entity_ref());
            if let Some(collection) = structure.and_then(|s| self.hierarchy.collection(s)) {
                scene.link_object(object, collection);
                return;
            }
        }
        warn!(element, "object is outside the spatial hierarchy");
        self.summary.orphans += 1;
        let root = scene.root();
        scene.link_object(object, root);
    }
}
