// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Mesh data structures.

use crate::error::{Error, Result};
use nalgebra::Point3;

/// Triangle mesh in editor-local coordinates
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    /// Vertex positions
    pub vertices: Vec<Point3<f64>>,
    /// Triangles as vertex index triples
    pub triangles: Vec<[u32; 3]>,
}

impl Mesh {
    /// Create an empty mesh
    pub fn new() -> Self {
        Self::default()
    }

    /// Group flat engine buffers into vertex and triangle records.
    ///
    /// Every 3 consecutive floats form one vertex, every 3 consecutive
    /// indices one triangle; buffers whose length is not a multiple of 3
    /// are rejected.
    pub fn from_buffers(vertices: &[f64], indices: &[u32]) -> Result<Self> {
        if vertices.len() % 3 != 0 {
            return Err(Error::InvalidBuffer(format!(
                "vertex buffer length {} is not a multiple of 3",
                vertices.len()
            )));
        }
        if indices.len() % 3 != 0 {
            return Err(Error::InvalidBuffer(format!(
                "index buffer length {} is not a multiple of 3",
                indices.len()
            )));
        }
        let vertex_count = (vertices.len() / 3) as u32;
        let triangles: Vec<[u32; 3]> = indices
            .chunks_exact(3)
            .map(|t| [t[0], t[1], t[2]])
            .collect();
        for tri in &triangles {
            if tri.iter().any(|i| *i >= vertex_count) {
                return Err(Error::InvalidBuffer(format!(
                    "triangle {tri:?} out of range for {vertex_count} vertices"
                )));
            }
        }
        Ok(Self {
            vertices: vertices
                .chunks_exact(3)
                .map(|v| Point3::new(v[0], v[1], v[2]))
                .collect(),
            triangles,
        })
    }

    /// Flatten vertex positions back into an x,y,z buffer
    pub fn flat_vertices(&self) -> Vec<f64> {
        self.vertices
            .iter()
            .flat_map(|p| [p.x, p.y, p.z])
            .collect()
    }

    /// Flatten triangles back into an index buffer
    pub fn flat_indices(&self) -> Vec<u32> {
        self.triangles.iter().flatten().copied().collect()
    }

    /// Check if mesh has no geometry
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() || self.triangles.is_empty()
    }

    /// Number of vertices
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Number of triangles
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }
}
