// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Unit extraction for IFC models.
//!
//! Finds the project length unit and returns the multiplier that converts
//! file coordinates to meters (e.g. 0.001 for millimeter models).

use crate::store::ModelStore;

/// SI prefix multipliers as defined in the IFC specification
#[inline]
pub fn si_prefix_multiplier(prefix: &str) -> f64 {
    match prefix {
        "ATTO" => 1e-18,
        "FEMTO" => 1e-15,
        "PICO" => 1e-12,
        "NANO" => 1e-9,
        "MICRO" => 1e-6,
        "MILLI" => 1e-3, // Most common: millimeters
        "CENTI" => 1e-2,
        "DECI" => 1e-1,
        "DECA" => 1e1,
        "HECTO" => 1e2,
        "KILO" => 1e3,
        "MEGA" => 1e6,
        "GIGA" => 1e9,
        "TERA" => 1e12,
        "PETA" => 1e15,
        "EXA" => 1e18,
        _ => 1.0, // No prefix or unknown = base unit (meters)
    }
}

/// Length unit scale factor for a model.
///
/// Scans the first `IfcUnitAssignment` for an `IfcSIUnit` with unit type
/// `LENGTHUNIT` and returns its prefix multiplier. Missing assignment, list
/// or prefix all default to 1.0 (meters).
pub fn length_unit_scale(store: &ModelStore) -> f64 {
    let Some(assignment) = store.by_type("IfcUnitAssignment").into_iter().next() else {
        return 1.0;
    };
    let Ok(units_attr) = store.attribute(assignment, 0) else {
        return 1.0;
    };
    let Some(units) = units_attr.as_list() else {
        return 1.0;
    };

    for unit_attr in units {
        let Some(unit) = unit_attr.as_entity_ref() else {
            continue;
        };
        if !store.is_a(unit, "IfcSIUnit") {
            continue;
        }
        // IfcSIUnit: Dimensions, UnitType, Prefix, Name
        let unit_type = store
            .attribute(unit, 1)
            .ok()
            .and_then(|v| v.as_enum().map(str::to_string));
        if unit_type.as_deref() != Some("LENGTHUNIT") {
            continue;
        }
        let Ok(prefix_attr) = store.attribute(unit, 2) else {
            return 1.0;
        };
        if prefix_attr.is_null() {
            return 1.0; // No prefix = base meters
        }
        return match prefix_attr.as_enum() {
            Some(prefix) => si_prefix_multiplier(prefix),
            None => 1.0,
        };
    }

    1.0
}
