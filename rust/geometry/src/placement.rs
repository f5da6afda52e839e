// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Placement resolution.
//!
//! Walks a chain of `IfcLocalPlacement` entities to the root and composes
//! the local `IfcAxis2Placement3D` transforms into one world matrix. The
//! chain is assumed acyclic; a cyclic `PlacementRelTo` is a malformed model
//! and is not detected.

use crate::error::{Error, Result};
use ifc_bridge_model::ModelStore;
use nalgebra::{Matrix4, Point3, Vector3};

/// Read an `IfcCartesianPoint` into a point, missing components default to 0
pub fn cartesian_point(store: &ModelStore, point_id: u32) -> Result<Point3<f64>> {
    let coords = store.attribute(point_id, 0)?;
    let (x, y, z) = coords
        .as_triple()
        .ok_or_else(|| Error::Placement(format!("#{point_id} has no coordinate list")))?;
    Ok(Point3::new(x, y, z))
}

/// Read an `IfcDirection` into a vector
pub fn direction(store: &ModelStore, direction_id: u32) -> Result<Vector3<f64>> {
    let ratios = store.attribute(direction_id, 0)?;
    let (x, y, z) = ratios
        .as_triple()
        .ok_or_else(|| Error::Placement(format!("#{direction_id} has no ratio list")))?;
    Ok(Vector3::new(x, y, z))
}

/// Parse an `IfcAxis2Placement3D` into a local transformation matrix.
///
/// `Axis` defaults to +Z and `RefDirection` to +X when absent. RefDirection
/// is projected onto the plane perpendicular to Axis and Y completes the
/// right-handed frame (Y = Z × X).
pub fn axis2placement_matrix(store: &ModelStore, placement_id: u32) -> Result<Matrix4<f64>> {
    // IfcAxis2Placement3D: Location, Axis, RefDirection
    let location = match store.attribute(placement_id, 0)?.as_entity_ref() {
        Some(point_id) => cartesian_point(store, point_id)?,
        None => Point3::origin(),
    };
    let z_axis = match store.attribute(placement_id, 1)?.as_entity_ref() {
        Some(dir_id) => direction(store, dir_id)?,
        None => Vector3::new(0.0, 0.0, 1.0),
    };
    let x_axis = match store.attribute(placement_id, 2)?.as_entity_ref() {
        Some(dir_id) => direction(store, dir_id)?,
        None => Vector3::new(1.0, 0.0, 0.0),
    };

    let z_final = z_axis.normalize();
    let x_normalized = x_axis.normalize();

    // Project X onto the plane perpendicular to Z
    let x_orthogonal = x_normalized - z_final * x_normalized.dot(&z_final);
    let x_final = if x_orthogonal.norm() > 1e-6 {
        x_orthogonal.normalize()
    } else {
        // X and Z are parallel or nearly parallel - use a stable perpendicular
        if z_final.z.abs() < 0.9 {
            Vector3::new(0.0, 0.0, 1.0).cross(&z_final).normalize()
        } else {
            Vector3::new(1.0, 0.0, 0.0).cross(&z_final).normalize()
        }
    };
    let y_axis = z_final.cross(&x_final).normalize();

    Ok(Matrix4::new(
        x_final.x, y_axis.x, z_final.x, location.x,
        x_final.y, y_axis.y, z_final.y, location.y,
        x_final.z, y_axis.z, z_final.z, location.z,
        0.0, 0.0, 0.0, 1.0,
    ))
}

/// Resolve an `IfcLocalPlacement` chain to a world matrix.
///
/// The local transform is applied first, then the resolved parent:
/// `world = parent * local`. A placement with no `PlacementRelTo` composes
/// against identity.
pub fn resolve_local_placement(store: &ModelStore, placement_id: u32) -> Result<Matrix4<f64>> {
    // IfcLocalPlacement: PlacementRelTo, RelativePlacement
    let parent = match store.attribute(placement_id, 0)?.as_entity_ref() {
        Some(parent_id) => resolve_local_placement(store, parent_id)?,
        None => Matrix4::identity(),
    };
    let relative = store
        .attribute(placement_id, 1)?
        .as_entity_ref()
        .ok_or_else(|| {
            Error::Placement(format!("#{placement_id} has no relative placement"))
        })?;
    Ok(parent * axis2placement_matrix(store, relative)?)
}

/// Apply a unit scale to the translation components of a matrix.
///
/// Rotation is never scaled; only the origin moves between file units and
/// editor units.
pub fn apply_unit_scale(matrix: Matrix4<f64>, unit_scale: f64) -> Matrix4<f64> {
    let mut scaled = matrix;
    scaled[(0, 3)] *= unit_scale;
    scaled[(1, 3)] *= unit_scale;
    scaled[(2, 3)] *= unit_scale;
    scaled
}

/// Decompose a world matrix into origin, Z axis and X axis, the components
/// an `IfcAxis2Placement3D` stores.
pub fn decompose(matrix: &Matrix4<f64>) -> (Point3<f64>, Vector3<f64>, Vector3<f64>) {
    let origin = Point3::new(matrix[(0, 3)], matrix[(1, 3)], matrix[(2, 3)]);
    let x_axis = Vector3::new(matrix[(0, 0)], matrix[(1, 0)], matrix[(2, 0)]);
    let z_axis = Vector3::new(matrix[(0, 2)], matrix[(1, 2)], matrix[(2, 2)]);
    (origin, z_axis, x_axis)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ifc_bridge_model::{AttributeValue, SchemaTable};

    fn store() -> ModelStore {
        ModelStore::new(SchemaTable::ifc4_subset())
    }

    fn point(store: &mut ModelStore, x: f64, y: f64, z: f64) -> u32 {
        store
            .create(
                "IfcCartesianPoint",
                vec![AttributeValue::List(vec![
                    AttributeValue::Real(x),
                    AttributeValue::Real(y),
                    AttributeValue::Real(z),
                ])],
            )
            .unwrap()
    }

    fn dir(store: &mut ModelStore, x: f64, y: f64, z: f64) -> u32 {
        store
            .create(
                "IfcDirection",
                vec![AttributeValue::List(vec![
                    AttributeValue::Real(x),
                    AttributeValue::Real(y),
                    AttributeValue::Real(z),
                ])],
            )
            .unwrap()
    }

    fn axis2placement(
        store: &mut ModelStore,
        location: u32,
        axis: Option<u32>,
        ref_direction: Option<u32>,
    ) -> u32 {
        let opt = |v: Option<u32>| match v {
            Some(id) => AttributeValue::EntityRef(id),
            None => AttributeValue::Null,
        };
        store
            .create(
                "IfcAxis2Placement3D",
                vec![
                    AttributeValue::EntityRef(location),
                    opt(axis),
                    opt(ref_direction),
                ],
            )
            .unwrap()
    }

    fn local_placement(store: &mut ModelStore, parent: Option<u32>, relative: u32) -> u32 {
        let parent_attr = match parent {
            Some(id) => AttributeValue::EntityRef(id),
            None => AttributeValue::Null,
        };
        store
            .create(
                "IfcLocalPlacement",
                vec![parent_attr, AttributeValue::EntityRef(relative)],
            )
            .unwrap()
    }

    #[test]
    fn root_placement_is_its_own_local_transform() {
        let mut store = store();
        let origin = point(&mut store, 1.0, 2.0, 3.0);
        let axis = axis2placement(&mut store, origin, None, None);
        let placement = local_placement(&mut store, None, axis);

        let world = resolve_local_placement(&store, placement).unwrap();
        let expected = Matrix4::new(
            1.0, 0.0, 0.0, 1.0,
            0.0, 1.0, 0.0, 2.0,
            0.0, 0.0, 1.0, 3.0,
            0.0, 0.0, 0.0, 1.0,
        );
        assert_relative_eq!(world, expected, epsilon = 1e-12);
    }

    #[test]
    fn three_level_chain_composes_parent_to_child() {
        let mut store = store();

        // Site: +X becomes +Y (90 degree turn about Z), origin (10, 0, 0)
        let site_origin = point(&mut store, 10.0, 0.0, 0.0);
        let site_x = dir(&mut store, 0.0, 1.0, 0.0);
        let site_axis = axis2placement(&mut store, site_origin, None, Some(site_x));
        let site = local_placement(&mut store, None, site_axis);

        // Storey: translate (0, 0, 5) within the site frame
        let storey_origin = point(&mut store, 0.0, 0.0, 5.0);
        let storey_axis = axis2placement(&mut store, storey_origin, None, None);
        let storey = local_placement(&mut store, Some(site), storey_axis);

        // Element: translate (2, 0, 0) within the storey frame
        let elem_origin = point(&mut store, 2.0, 0.0, 0.0);
        let elem_axis = axis2placement(&mut store, elem_origin, None, None);
        let element = local_placement(&mut store, Some(storey), elem_axis);

        let world = resolve_local_placement(&store, element).unwrap();

        // Independently composed expectation: rotate 90 about Z, then apply
        // the translations in parent-to-child order.
        let rot_z90 = Matrix4::new(
            0.0, -1.0, 0.0, 10.0,
            1.0, 0.0, 0.0, 0.0,
            0.0, 0.0, 1.0, 0.0,
            0.0, 0.0, 0.0, 1.0,
        );
        let t_storey = Matrix4::new_translation(&Vector3::new(0.0, 0.0, 5.0));
        let t_elem = Matrix4::new_translation(&Vector3::new(2.0, 0.0, 0.0));
        let expected = rot_z90 * t_storey * t_elem;
        assert_relative_eq!(world, expected, epsilon = 1e-12);

        // The element's local +X travels along world +Y
        let origin = world.transform_point(&Point3::origin());
        assert_relative_eq!(origin, Point3::new(10.0, 2.0, 5.0), epsilon = 1e-12);
    }

    #[test]
    fn skewed_ref_direction_is_orthonormalized() {
        let mut store = store();
        let origin = point(&mut store, 0.0, 0.0, 0.0);
        // RefDirection leaning out of the XY plane must be projected back
        let skewed = dir(&mut store, 1.0, 0.0, 0.5);
        let axis = axis2placement(&mut store, origin, None, Some(skewed));

        let m = axis2placement_matrix(&store, axis).unwrap();
        let x = Vector3::new(m[(0, 0)], m[(1, 0)], m[(2, 0)]);
        let z = Vector3::new(m[(0, 2)], m[(1, 2)], m[(2, 2)]);
        assert_relative_eq!(x.dot(&z), 0.0, epsilon = 1e-12);
        assert_relative_eq!(x.norm(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn unit_scale_touches_translation_only() {
        let m = Matrix4::new(
            0.0, -1.0, 0.0, 1000.0,
            1.0, 0.0, 0.0, 2000.0,
            0.0, 0.0, 1.0, 3000.0,
            0.0, 0.0, 0.0, 1.0,
        );
        let scaled = apply_unit_scale(m, 0.001);
        assert_eq!(scaled[(0, 3)], 1.0);
        assert_eq!(scaled[(1, 3)], 2.0);
        assert_eq!(scaled[(2, 3)], 3.0);
        assert_eq!(scaled[(1, 0)], 1.0);
        assert_eq!(scaled[(0, 1)], -1.0);
    }

    #[test]
    fn decompose_inverts_axis2placement() {
        let mut store = store();
        let origin = point(&mut store, 4.0, 5.0, 6.0);
        let x = dir(&mut store, 0.0, 1.0, 0.0);
        let axis = axis2placement(&mut store, origin, None, Some(x));
        let m = axis2placement_matrix(&store, axis).unwrap();

        let (o, z_axis, x_axis) = decompose(&m);
        assert_relative_eq!(o, Point3::new(4.0, 5.0, 6.0), epsilon = 1e-12);
        assert_relative_eq!(z_axis, Vector3::new(0.0, 0.0, 1.0), epsilon = 1e-12);
        assert_relative_eq!(x_axis, Vector3::new(0.0, 1.0, 0.0), epsilon = 1e-12);
    }
}
