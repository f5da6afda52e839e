// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # ifc-bridge geometry
//!
//! Placement resolution and tessellated mesh reconstruction on top of the
//! ifc-bridge model store, using nalgebra for transforms.
//!
//! - [`placement`] resolves `IfcLocalPlacement` chains into world matrices
//!   (local first, then parent; unit scale applied to translation only).
//! - [`mesh`] groups flat engine buffers into vertex/triangle records.
//! - [`tessellate`] is the engine seam: a [`Tessellator`] trait plus the
//!   built-in [`FacetTessellator`] for triangulated face-set bodies.
//! - [`parameters`] harvests editable DOUBLE attributes from a
//!   representation's item graph for constrained re-editing.

pub mod error;
pub mod mesh;
pub mod parameters;
pub mod placement;
pub mod tessellate;

// Re-export nalgebra types for convenience
pub use nalgebra::{Matrix4, Point3, Vector3};

pub use error::{Error, Result};
pub use mesh::Mesh;
pub use parameters::{extract_parameters, RepresentationParameter};
pub use placement::{apply_unit_scale, axis2placement_matrix, resolve_local_placement};
pub use tessellate::{
    body_representation, FacetTessellator, TessellatedShape, TessellationSettings, Tessellator,
};
