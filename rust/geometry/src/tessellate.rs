// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Tessellation engine seam.
//!
//! [`Tessellator`] is the narrow interface to whatever turns an IFC shape
//! definition into triangle buffers. [`FacetTessellator`] is the built-in
//! implementation for the representation family this core supports:
//! `IfcTriangulatedFaceSet` bodies, directly or behind an `IfcMappedItem`.
//! Every call may fail; callers decide whether a failure skips the element
//! or aborts the operation.

use crate::error::{Error, Result};
use crate::placement::{apply_unit_scale, resolve_local_placement};
use ifc_bridge_model::ModelStore;
use nalgebra::Matrix4;

/// Settings handed to the engine per call
#[derive(Debug, Clone, Copy)]
pub struct TessellationSettings {
    /// Also tessellate curve items (accepted for engine parity, the facet
    /// tessellator has no curve support)
    pub include_curves: bool,
    /// Multiplier converting file lengths to editor units
    pub unit_scale: f64,
}

impl Default for TessellationSettings {
    fn default() -> Self {
        Self {
            include_curves: false,
            unit_scale: 1.0,
        }
    }
}

/// Engine output: flat buffers plus the shape's placement matrix
#[derive(Debug, Clone)]
pub struct TessellatedShape {
    /// Step id of the shape representation the buffers were built from
    pub representation_id: u32,
    /// Flat vertex buffer, 3 floats per vertex, already in editor units
    pub vertices: Vec<f64>,
    /// Flat triangle index buffer, 3 indices per triangle
    pub faces: Vec<u32>,
    /// Row-major 4x4 placement matrix, translation in editor units
    pub matrix: [f64; 16],
}

impl TessellatedShape {
    /// The placement matrix as a nalgebra matrix
    pub fn matrix4(&self) -> Matrix4<f64> {
        let m = &self.matrix;
        Matrix4::new(
            m[0], m[1], m[2], m[3],
            m[4], m[5], m[6], m[7],
            m[8], m[9], m[10], m[11],
            m[12], m[13], m[14], m[15],
        )
    }

    fn from_matrix4(representation_id: u32, matrix: &Matrix4<f64>) -> Self {
        let mut row_major = [0.0; 16];
        for row in 0..4 {
            for col in 0..4 {
                row_major[row * 4 + col] = matrix[(row, col)];
            }
        }
        Self {
            representation_id,
            vertices: Vec::new(),
            faces: Vec::new(),
            matrix: row_major,
        }
    }
}

/// Shape creation seam for products and shape representations
pub trait Tessellator {
    /// Tessellate `entity` (an `IfcProduct` or an `IfcShapeRepresentation`)
    /// into flat buffers and a placement matrix.
    fn create_shape(
        &self,
        settings: &TessellationSettings,
        store: &ModelStore,
        entity: u32,
    ) -> Result<TessellatedShape>;
}

/// Representation-selection rule for a product's body.
///
/// Prefers the representation whose identifier is `Body`; mapped
/// representations dereference through `Items[0].MappingSource` to the
/// shared `MappedRepresentation`. `None` means the product carries no
/// geometry.
pub fn body_representation(store: &ModelStore, product: u32) -> Option<u32> {
    // IfcProduct: ..., ObjectPlacement(5), Representation(6)
    let shape = store.attribute(product, 6).ok()?.as_entity_ref()?;
    let representations = store.attribute(shape, 2).ok()?.as_list()?.to_vec();
    for rep_attr in representations {
        let Some(rep) = rep_attr.as_entity_ref() else {
            continue;
        };
        if !store.is_a(rep, "IfcShapeRepresentation") {
            continue;
        }
        let identifier = store
            .attribute(rep, 1)
            .ok()
            .and_then(|v| v.as_text().map(str::to_string));
        if identifier.as_deref() != Some("Body") {
            continue;
        }
        let rep_type = store
            .attribute(rep, 2)
            .ok()
            .and_then(|v| v.as_text().map(str::to_string));
        if rep_type.as_deref() != Some("MappedRepresentation") {
            return Some(rep);
        }
        // Items[0].MappingSource.MappedRepresentation
        let first_item = store.attribute(rep, 3).ok()?.as_list()?.first()?.as_entity_ref()?;
        let mapping_source = store.attribute(first_item, 0).ok()?.as_entity_ref()?;
        return store.attribute(mapping_source, 1).ok()?.as_entity_ref();
    }
    None
}

/// Built-in tessellator for triangulated face sets
#[derive(Debug, Clone, Copy, Default)]
pub struct FacetTessellator;

impl FacetTessellator {
    pub fn new() -> Self {
        Self
    }

    fn append_items(
        &self,
        settings: &TessellationSettings,
        store: &ModelStore,
        representation: u32,
        vertices: &mut Vec<f64>,
        faces: &mut Vec<u32>,
    ) -> Result<()> {
        let items: Vec<u32> = store
            .attribute(representation, 3)?
            .as_list()
            .map(|items| items.iter().filter_map(|v| v.as_entity_ref()).collect())
            .unwrap_or_default();

        for item in items {
            if store.is_a(item, "IfcTriangulatedFaceSet") {
                self.append_face_set(settings, store, item, vertices, faces)?;
            } else if store.is_a(item, "IfcMappedItem") {
                // IfcMappedItem: MappingSource -> IfcRepresentationMap
                let Some(source) = store.attribute(item, 0)?.as_entity_ref() else {
                    continue;
                };
                let Some(mapped) = store.attribute(source, 1)?.as_entity_ref() else {
                    continue;
                };
                self.append_items(settings, store, mapped, vertices, faces)?;
            }
            // Other item kinds are outside the supported representation family
        }
        Ok(())
    }

    fn append_face_set(
        &self,
        settings: &TessellationSettings,
        store: &ModelStore,
        face_set: u32,
        vertices: &mut Vec<f64>,
        faces: &mut Vec<u32>,
    ) -> Result<()> {
        // IfcTriangulatedFaceSet: Coordinates, Normals, Closed, CoordIndex, PnIndex
        let point_list = store
            .attribute(face_set, 0)?
            .as_entity_ref()
            .ok_or_else(|| Error::Tessellation(format!("#{face_set} has no coordinates")))?;
        let coords = store.attribute(point_list, 0)?;
        let coord_list = coords
            .as_list()
            .ok_or_else(|| Error::Tessellation(format!("#{point_list} has no CoordList")))?;

        let vertex_offset = (vertices.len() / 3) as u32;
        for triple in coord_list {
            let (x, y, z) = triple.as_triple().ok_or_else(|| {
                Error::Tessellation(format!("#{point_list} has a malformed coordinate"))
            })?;
            vertices.extend_from_slice(&[
                x * settings.unit_scale,
                y * settings.unit_scale,
                z * settings.unit_scale,
            ]);
        }

        let index_attr = store.attribute(face_set, 3)?;
        let index_list = index_attr
            .as_list()
            .ok_or_else(|| Error::Tessellation(format!("#{face_set} has no CoordIndex")))?;
        for triangle in index_list {
            let indices = triangle
                .as_list()
                .ok_or_else(|| Error::Tessellation(format!("#{face_set} has a malformed face")))?;
            if indices.len() != 3 {
                return Err(Error::Tessellation(format!(
                    "#{face_set} face with {} corners",
                    indices.len()
                )));
            }
            for index in indices {
                let one_based = index.as_int().ok_or_else(|| {
                    Error::Tessellation(format!("#{face_set} non-integer face index"))
                })?;
                if one_based < 1 {
                    return Err(Error::Tessellation(format!(
                        "#{face_set} face index {one_based} out of range"
                    )));
                }
                // CoordIndex is 1-based per the IFC specification
                faces.push(vertex_offset + (one_based - 1) as u32);
            }
        }
        Ok(())
    }
}

impl Tessellator for FacetTessellator {
    fn create_shape(
        &self,
        settings: &TessellationSettings,
        store: &ModelStore,
        entity: u32,
    ) -> Result<TessellatedShape> {
        let (representation, matrix) = if store.is_a(entity, "IfcShapeRepresentation") {
            (entity, Matrix4::identity())
        } else if store.is_a(entity, "IfcProduct") {
            let representation = body_representation(store, entity).ok_or_else(|| {
                Error::Tessellation(format!("#{entity} has no body representation"))
            })?;
            let matrix = match store.attribute(entity, 5)?.as_entity_ref() {
                Some(placement) => apply_unit_scale(
                    resolve_local_placement(store, placement)?,
                    settings.unit_scale,
                ),
                None => Matrix4::identity(),
            };
            (representation, matrix)
        } else {
            return Err(Error::Tessellation(format!(
                "#{entity} is neither a product nor a shape representation"
            )));
        };

        let mut shape = TessellatedShape::from_matrix4(representation, &matrix);
        self.append_items(
            settings,
            store,
            representation,
            &mut shape.vertices,
            &mut shape.faces,
        )?;
        if shape.vertices.is_empty() || shape.faces.is_empty() {
            return Err(Error::Tessellation(format!(
                "#{representation} produced no triangles"
            )));
        }
        Ok(shape)
    }
}
