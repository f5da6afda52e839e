// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Write-back of edited scene geometry into the model store.
//!
//! The scene holds geometry in scaled editor units; everything written here
//! divides by the unit scale so the model keeps its declared length unit.
//! Operations follow a fixed order: write the representation first, styles
//! second, product assignment last, so a failure never leaves a half-wired
//! product.

use crate::error::{Error, Result};
use crate::import::mesh_key_name;
use crate::materials::{collect_styles, MaterialCreator};
use crate::scene::{ObjectKey, Scene};
use ifc_bridge_geometry::placement::decompose;
use ifc_bridge_geometry::tessellate::{TessellationSettings, Tessellator};
use ifc_bridge_geometry::{extract_parameters, Mesh};
use ifc_bridge_model::{AttributeValue, ModelStore};
use tracing::{debug, warn};

/// One write-back session, holding the store mutably for its lifetime
pub struct WriteBack<'a, T: Tessellator> {
    store: &'a mut ModelStore,
    tessellator: &'a T,
    settings: TessellationSettings,
}

impl<'a, T: Tessellator> WriteBack<'a, T> {
    pub fn new(store: &'a mut ModelStore, tessellator: &'a T, unit_scale: f64) -> Self {
        let settings = TessellationSettings {
            unit_scale,
            ..TessellationSettings::default()
        };
        Self {
            store,
            tessellator,
            settings,
        }
    }

    pub fn store(&self) -> &ModelStore {
        self.store
    }

    fn object_mesh(&self, scene: &Scene, object: ObjectKey) -> Result<crate::scene::MeshKey> {
        let data = scene
            .object(object)
            .ok_or_else(|| Error::StaleKey("object key no longer resolves".into()))?;
        data.mesh
            .ok_or_else(|| Error::NoMesh(data.name.clone()))
    }

    /// Serialize an object's mesh as a new tessellated body representation.
    ///
    /// `total_items` above one is accepted but the writer always emits a
    /// single face set covering the whole mesh.
    pub fn write_representation(
        &mut self,
        scene: &Scene,
        object: ObjectKey,
        context: u32,
        total_items: usize,
    ) -> Result<u32> {
        let mesh_key = self.object_mesh(scene, object)?;
        let mesh_data = scene
            .mesh(mesh_key)
            .ok_or_else(|| Error::StaleKey("mesh key no longer resolves".into()))?;
        if mesh_data.mesh.is_empty() {
            return Err(Error::WriteFailed(format!(
                "mesh {} has no geometry",
                mesh_data.name
            )));
        }
        if total_items > 1 {
            debug!(total_items, "collapsing requested items into one face set");
        }

        let scale = self.settings.unit_scale;
        let coord_list = AttributeValue::List(
            mesh_data
                .mesh
                .vertices
                .iter()
                .map(|v| {
                    AttributeValue::List(vec![
                        AttributeValue::Real(v.x / scale),
                        AttributeValue::Real(v.y / scale),
                        AttributeValue::Real(v.z / scale),
                    ])
                })
                .collect(),
        );
        let coord_index = AttributeValue::List(
            mesh_data
                .mesh
                .triangles
                .iter()
                .map(|t| {
                    AttributeValue::List(
                        t.iter()
                            .map(|i| AttributeValue::Integer(i64::from(*i) + 1))
                            .collect(),
                    )
                })
                .collect(),
        );

        let point_list = self
            .store
            .create("IfcCartesianPointList3D", vec![coord_list])?;
        let face_set = self.store.create(
            "IfcTriangulatedFaceSet",
            vec![
                AttributeValue::EntityRef(point_list),
                AttributeValue::Null,
                AttributeValue::Boolean(true),
                coord_index,
            ],
        )?;
        let representation = self.store.create(
            "IfcShapeRepresentation",
            vec![
                AttributeValue::EntityRef(context),
                AttributeValue::Text("Body".to_string()),
                AttributeValue::Text("Tessellation".to_string()),
                AttributeValue::List(vec![AttributeValue::EntityRef(face_set)]),
            ],
        )?;
        debug!(
            representation,
            vertices = mesh_data.mesh.vertex_count(),
            triangles = mesh_data.mesh.triangle_count(),
            "wrote tessellated body"
        );
        Ok(representation)
    }

    /// Attach the object's material styles to the representation's face set
    pub fn assign_styles(
        &mut self,
        scene: &Scene,
        object: ObjectKey,
        representation: u32,
    ) -> Result<()> {
        let Some(item) = self
            .store
            .attribute(representation, 3)?
            .as_list()
            .and_then(|items| items.first())
            .and_then(|v| v.as_entity_ref())
        else {
            return Ok(());
        };
        for style in collect_styles(scene, object) {
            self.store.create(
                "IfcStyledItem",
                vec![
                    AttributeValue::EntityRef(item),
                    AttributeValue::List(vec![AttributeValue::EntityRef(style)]),
                    AttributeValue::Null,
                ],
            )?;
        }
        Ok(())
    }

    /// Hook a representation into the product's shape definition, replacing
    /// any existing representation in the same context
    pub fn assign_representation(&mut self, product: u32, representation: u32) -> Result<()> {
        // IfcProduct: Representation(6)
        let Some(shape) = self.store.attribute(product, 6)?.as_entity_ref() else {
            let shape = self.store.create(
                "IfcProductDefinitionShape",
                vec![
                    AttributeValue::Null,
                    AttributeValue::Null,
                    AttributeValue::List(vec![AttributeValue::EntityRef(representation)]),
                ],
            )?;
            return Ok(self
                .store
                .set_attribute(product, 6, AttributeValue::EntityRef(shape))?);
        };

        let context = self.store.attribute(representation, 0)?.as_entity_ref();
        let mut entries: Vec<AttributeValue> = self
            .store
            .attribute(shape, 2)?
            .as_list()
            .map(<[AttributeValue]>::to_vec)
            .unwrap_or_default();
        let mut replaced = false;
        for entry in entries.iter_mut() {
            let Some(existing) = entry.as_entity_ref() else {
                continue;
            };
            let existing_context = self.store.attribute(existing, 0)?.as_entity_ref();
            if existing_context == context {
                *entry = AttributeValue::EntityRef(representation);
                replaced = true;
                break;
            }
        }
        if !replaced {
            entries.push(AttributeValue::EntityRef(representation));
        }
        Ok(self
            .store
            .set_attribute(shape, 2, AttributeValue::List(entries))?)
    }

    /// Full write path for one object: representation, styles, product
    /// assignment, then swap the scene mesh to a copy named after the new
    /// representation. The old mesh survives as keep-alive so undo paths
    /// can find it. Returns the new representation's id.
    pub fn add_representation(
        &mut self,
        scene: &mut Scene,
        object: ObjectKey,
        context: u32,
    ) -> Result<u32> {
        let product = scene
            .object(object)
            .ok_or_else(|| Error::StaleKey("object key no longer resolves".into()))?
            .ifc_definition_id;
        let old_mesh = self.object_mesh(scene, object)?;
        let slot_count = scene.mesh(old_mesh).map(|m| m.slots.len()).unwrap_or(0);

        let representation =
            self.write_representation(scene, object, context, slot_count.max(1))?;
        self.assign_styles(scene, object, representation)?;
        self.assign_representation(product, representation)?;

        scene.mark_keep_alive(old_mesh);
        let name = mesh_key_name(self.store, representation);
        let new_mesh = scene
            .duplicate_mesh(old_mesh, &name)
            .ok_or_else(|| Error::StaleKey("mesh vanished during write".into()))?;
        if let Some(data) = scene.mesh_mut(new_mesh) {
            data.ifc_definition_id = Some(representation);
        }
        if let Some(data) = scene.object_mut(object) {
            data.mesh = Some(new_mesh);
        }
        Ok(representation)
    }

    /// Freeze an object's current transform and geometry into the model.
    ///
    /// Writes a new object placement from the world matrix, serializes the
    /// mesh as a new representation, then rewrites every entity that
    /// referenced the old representation to point at the new one before
    /// deleting it. Returns the new representation's id.
    pub fn bake_parametric_geometry(
        &mut self,
        scene: &mut Scene,
        object: ObjectKey,
    ) -> Result<u32> {
        let data = scene
            .object(object)
            .ok_or_else(|| Error::StaleKey("object key no longer resolves".into()))?;
        let product = data.ifc_definition_id;
        let matrix_world = data.matrix_world;
        let mesh_key = self.object_mesh(scene, object)?;
        let old_representation = scene
            .mesh(mesh_key)
            .and_then(|m| m.ifc_definition_id)
            .ok_or_else(|| Error::WriteFailed("mesh has no representation binding".into()))?;
        let context = self
            .store
            .attribute(old_representation, 0)?
            .as_entity_ref()
            .ok_or_else(|| Error::WriteFailed("representation has no context".into()))?;

        self.write_object_placement(product, &matrix_world)?;

        let slot_count = scene.mesh(mesh_key).map(|m| m.slots.len()).unwrap_or(0);
        let representation =
            self.write_representation(scene, object, context, slot_count.max(1))?;
        self.assign_styles(scene, object, representation)?;

        for referrer in self.store.get_inverse(old_representation) {
            self.store
                .replace_references(referrer, old_representation, representation)?;
        }
        self.store.remove(old_representation)?;

        if let Some(mesh) = scene.mesh_mut(mesh_key) {
            mesh.ifc_definition_id = Some(representation);
        }
        Ok(representation)
    }

    /// Write the object's world matrix as a fresh root-level local placement
    fn write_object_placement(
        &mut self,
        product: u32,
        matrix_world: &ifc_bridge_geometry::Matrix4<f64>,
    ) -> Result<()> {
        let (origin, z_axis, x_axis) = decompose(matrix_world);
        let scale = self.settings.unit_scale;
        let location = self.store.create(
            "IfcCartesianPoint",
            vec![AttributeValue::List(vec![
                AttributeValue::Real(origin.x / scale),
                AttributeValue::Real(origin.y / scale),
                AttributeValue::Real(origin.z / scale),
            ])],
        )?;
        let axis = self.store.create(
            "IfcDirection",
            vec![AttributeValue::List(vec![
                AttributeValue::Real(z_axis.x),
                AttributeValue::Real(z_axis.y),
                AttributeValue::Real(z_axis.z),
            ])],
        )?;
        let ref_direction = self.store.create(
            "IfcDirection",
            vec![AttributeValue::List(vec![
                AttributeValue::Real(x_axis.x),
                AttributeValue::Real(x_axis.y),
                AttributeValue::Real(x_axis.z),
            ])],
        )?;
        let axis2placement = self.store.create(
            "IfcAxis2Placement3D",
            vec![
                AttributeValue::EntityRef(location),
                AttributeValue::EntityRef(axis),
                AttributeValue::EntityRef(ref_direction),
            ],
        )?;
        let placement = self.store.create(
            "IfcLocalPlacement",
            vec![
                AttributeValue::Null,
                AttributeValue::EntityRef(axis2placement),
            ],
        )?;
        // IfcProduct: ObjectPlacement(5)
        Ok(self
            .store
            .set_attribute(product, 5, AttributeValue::EntityRef(placement))?)
    }

    /// Point an object at a different representation, pulling its geometry
    /// fresh from the model and rebuilding materials and parameters
    pub fn switch_representation(
        &mut self,
        scene: &mut Scene,
        object: ObjectKey,
        representation: u32,
    ) -> Result<()> {
        let product = scene
            .object(object)
            .ok_or_else(|| Error::StaleKey("object key no longer resolves".into()))?
            .ifc_definition_id;

        let shape = self
            .tessellator
            .create_shape(&self.settings, self.store, representation)?;
        let mesh = Mesh::from_buffers(&shape.vertices, &shape.faces)?;
        let name = mesh_key_name(self.store, representation);
        let mesh_key = scene.create_or_replace_mesh(&name, mesh);
        if let Some(data) = scene.mesh_mut(mesh_key) {
            data.ifc_definition_id = Some(representation);
            data.parameters = extract_parameters(self.store, representation);
        }
        if let Some(data) = scene.object_mut(object) {
            data.mesh = Some(mesh_key);
        }

        // Re-derive materials from the product's associations
        let store = &*self.store;
        let mut creator = MaterialCreator::new(store);
        for rel in store.get_inverse(product) {
            if !store.is_a(rel, "IfcRelAssociatesMaterial") {
                continue;
            }
            let on_related_side = store
                .attribute(rel, 4)
                .map(|v| v.references(product))
                .unwrap_or(false);
            if !on_related_side {
                continue;
            }
            if let Some(material) = store
                .attribute(rel, 5)
                .ok()
                .and_then(|v| v.as_entity_ref())
            {
                creator.create(scene, material, mesh_key);
            }
        }
        Ok(())
    }

    /// Change one harvested DOUBLE parameter in place, then re-pull the
    /// representation so the scene shows the regenerated geometry
    pub fn update_representation(
        &mut self,
        scene: &mut Scene,
        object: ObjectKey,
        parameter_index: usize,
        value: f64,
    ) -> Result<()> {
        let mesh_key = self.object_mesh(scene, object)?;
        let mesh_data = scene
            .mesh(mesh_key)
            .ok_or_else(|| Error::StaleKey("mesh key no longer resolves".into()))?;
        let parameter = mesh_data
            .parameters
            .get(parameter_index)
            .ok_or(Error::UnknownParameter(parameter_index))?;
        let (step_id, index) = (parameter.step_id, parameter.index);
        let representation = mesh_data
            .ifc_definition_id
            .ok_or_else(|| Error::WriteFailed("mesh has no representation binding".into()))?;

        self.store
            .set_attribute(step_id, index, AttributeValue::Real(value))?;
        self.switch_representation(scene, object, representation)
    }

    /// Delete a representation from the model and detach it from the scene.
    ///
    /// Objects showing the representation's mesh are pointed at a shared
    /// empty placeholder so they survive the removal visibly empty.
    pub fn remove_representation(&mut self, scene: &mut Scene, representation: u32) -> Result<()> {
        if let Some(mesh_key) = scene.mesh_by_name(&mesh_key_name(self.store, representation)) {
            let void = scene.create_mesh("Void", Mesh::new());
            scene.retarget_mesh(mesh_key, void);
            scene.remove_mesh(mesh_key);
        }

        for referrer in self.store.get_inverse(representation) {
            if !self.store.is_a(referrer, "IfcProductRepresentation") {
                warn!(
                    referrer,
                    representation, "removing representation still referenced outside shape"
                );
                continue;
            }
            let entries: Vec<AttributeValue> = self
                .store
                .attribute(referrer, 2)?
                .as_list()
                .map(|list| {
                    list.iter()
                        .filter(|v| v.as_entity_ref() != Some(representation))
                        .cloned()
                        .collect()
                })
                .unwrap_or_default();
            self.store
                .set_attribute(referrer, 2, AttributeValue::List(entries))?;
        }
        self.store.remove(representation)?;
        Ok(())
    }
}
