// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Material and surface style mapping.
//!
//! Import direction: an `IfcMaterial` association becomes a shading material
//! (cached by name) appended to the mesh's slot list, with color and alpha
//! pulled from the material's presentation chain
//! `HasRepresentation → Representations → Items → Styles → Styles`.
//! Export direction: [`collect_styles`] gathers the bound surface style ids
//! per occupied slot, in slot order, for style assignment on write-back.

use crate::scene::{MaterialKey, MeshKey, ObjectKey, Scene};
use ifc_bridge_model::ModelStore;
use rustc_hash::FxHashMap;
use tracing::debug;

/// Session-scoped material factory with a by-name cache
pub struct MaterialCreator<'a> {
    store: &'a ModelStore,
    cache: FxHashMap<String, MaterialKey>,
}

impl<'a> MaterialCreator<'a> {
    pub fn new(store: &'a ModelStore) -> Self {
        Self {
            store,
            cache: FxHashMap::default(),
        }
    }

    /// Map a material association onto a mesh.
    ///
    /// Only `IfcMaterial` leaves of `IfcMaterialDefinition` are handled;
    /// layered and composite materials are a silent no-op.
    pub fn create(&mut self, scene: &mut Scene, material_select: u32, mesh: MeshKey) {
        if self.store.is_a(material_select, "IfcMaterialDefinition") {
            self.create_definition(scene, material_select, mesh);
        }
    }

    fn create_definition(&mut self, scene: &mut Scene, material: u32, mesh: MeshKey) {
        if self.store.is_a(material, "IfcMaterial") {
            self.create_single(scene, material, mesh);
        } else {
            debug!(material, "unsupported material composition, skipping");
        }
    }

    fn create_single(&mut self, scene: &mut Scene, material: u32, mesh: MeshKey) {
        let name = self
            .store
            .attribute(material, 0)
            .ok()
            .and_then(|v| v.as_text().map(str::to_string))
            .unwrap_or_default();
        let key = match self.cache.get(&name) {
            Some(cached) => *cached,
            None => {
                let key = self.create_new_single(scene, material, &name);
                self.cache.insert(name, key);
                key
            }
        };
        scene.append_material(mesh, key);
    }

    fn create_new_single(&self, scene: &mut Scene, material: u32, name: &str) -> MaterialKey {
        let key = scene.create_material(name);
        if let Some((color, style_id)) = self.extract_shading(material) {
            if let Some(data) = scene.material_mut(key) {
                data.diffuse_color = color;
                data.ifc_style_id = Some(style_id);
            }
        }
        // No presentation chain leaves the material uncolored, not an error
        key
    }

    /// Walk the presentation chain to the first surface style shading.
    /// Returns the RGBA color and the owning IfcSurfaceStyle id.
    fn extract_shading(&self, material: u32) -> Option<([f64; 4], u32)> {
        let store = self.store;
        for rep_def in store.get_inverse(material) {
            if !store.is_a(rep_def, "IfcMaterialDefinitionRepresentation") {
                continue;
            }
            // IfcMaterialDefinitionRepresentation: ..., Representations(2)
            let representations: Vec<u32> = store
                .attribute(rep_def, 2)
                .ok()?
                .as_list()
                .map(|l| l.iter().filter_map(|v| v.as_entity_ref()).collect())
                .unwrap_or_default();
            for representation in representations {
                let items: Vec<u32> = store
                    .attribute(representation, 3)
                    .ok()
                    .and_then(|v| {
                        v.as_list()
                            .map(|l| l.iter().filter_map(|i| i.as_entity_ref()).collect())
                    })
                    .unwrap_or_default();
                for item in items {
                    if !store.is_a(item, "IfcStyledItem") {
                        continue;
                    }
                    if let Some(found) = self.shading_from_styled_item(item) {
                        return Some(found);
                    }
                }
            }
        }
        None
    }

    fn shading_from_styled_item(&self, styled_item: u32) -> Option<([f64; 4], u32)> {
        let store = self.store;
        // IfcStyledItem: Item, Styles(1)
        let styles: Vec<u32> = store
            .attribute(styled_item, 1)
            .ok()?
            .as_list()
            .map(|l| l.iter().filter_map(|v| v.as_entity_ref()).collect())?;
        for style in styles {
            // Style assignments wrap the actual presentation styles
            if store.is_a(style, "IfcPresentationStyleAssignment") {
                let wrapped: Vec<u32> = store
                    .attribute(style, 0)
                    .ok()
                    .and_then(|v| {
                        v.as_list()
                            .map(|l| l.iter().filter_map(|s| s.as_entity_ref()).collect())
                    })
                    .unwrap_or_default();
                for inner in wrapped {
                    if let Some(found) = self.shading_from_surface_style(inner) {
                        return Some(found);
                    }
                }
            } else if let Some(found) = self.shading_from_surface_style(style) {
                return Some(found);
            }
        }
        None
    }

    fn shading_from_surface_style(&self, style: u32) -> Option<([f64; 4], u32)> {
        let store = self.store;
        if !store.is_a(style, "IfcSurfaceStyle") {
            return None;
        }
        // IfcSurfaceStyle: Name, Side, Styles(2)
        let sub_styles: Vec<u32> = store
            .attribute(style, 2)
            .ok()?
            .as_list()
            .map(|l| l.iter().filter_map(|v| v.as_entity_ref()).collect())?;
        for shading in sub_styles {
            if !store.is_a(shading, "IfcSurfaceStyleShading") {
                continue;
            }
            // IfcSurfaceStyleShading: SurfaceColour, Transparency
            let colour = store.attribute(shading, 0).ok()?.as_entity_ref()?;
            let red = store.attribute(colour, 1).ok()?.as_float().unwrap_or(1.0);
            let green = store.attribute(colour, 2).ok()?.as_float().unwrap_or(1.0);
            let blue = store.attribute(colour, 3).ok()?.as_float().unwrap_or(1.0);
            let alpha = match store.attribute(shading, 1).ok()?.as_float() {
                Some(transparency) => 1.0 - transparency,
                None => 1.0, // Opaque when absent
            };
            return Some(([red, green, blue, alpha], style));
        }
        None
    }
}

/// Surface style ids bound to an object's occupied material slots, in slot
/// order. Slots without a material, and materials never bound to a style,
/// contribute nothing.
pub fn collect_styles(scene: &Scene, object: ObjectKey) -> Vec<u32> {
    let Some(mesh_key) = scene.object(object).and_then(|o| o.mesh) else {
        return Vec::new();
    };
    let Some(mesh) = scene.mesh(mesh_key) else {
        return Vec::new();
    };
    mesh.slots
        .iter()
        .filter_map(|slot| slot.as_ref())
        .filter_map(|material| scene.material(*material).and_then(|m| m.ifc_style_id))
        .collect()
}
