// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Parametric attribute harvest.
//!
//! Walks the downward closure of a representation and records every non-null
//! DOUBLE-kind slot of every representation item. The records carry enough
//! addressing (owning step id, slot index) for the write-back update path to
//! poke edited values straight back into the model.

use ifc_bridge_model::{AttributeKind, ModelStore};

/// One editable numeric slot harvested from a representation item
#[derive(Debug, Clone, PartialEq)]
pub struct RepresentationParameter {
    /// Display name, `{entity-type}/{attribute-name}`
    pub name: String,
    /// Step id of the owning representation item
    pub step_id: u32,
    /// Attribute slot index within the owning item
    pub index: usize,
    /// Declared kind (always [`AttributeKind::Double`] today)
    pub kind: AttributeKind,
    /// Value at extraction time
    pub value: f64,
}

/// Harvest editable numeric attributes from a representation's item graph
pub fn extract_parameters(store: &ModelStore, representation: u32) -> Vec<RepresentationParameter> {
    let mut parameters = Vec::new();
    for entity in store.traverse(representation) {
        if !store.is_a(entity, "IfcRepresentationItem") {
            continue;
        }
        let Ok(item) = store.by_id(entity) else {
            continue;
        };
        for index in 0..item.arity() {
            let Ok(kind) = store.attribute_kind(entity, index) else {
                continue;
            };
            if kind != AttributeKind::Double {
                continue;
            }
            let Some(value) = item.attribute(index).and_then(|v| v.as_float()) else {
                continue; // Null slots are not editable
            };
            let name = match store.attribute_name(entity, index) {
                Ok(attr_name) => format!("{}/{}", item.type_name(), attr_name),
                Err(_) => continue,
            };
            parameters.push(RepresentationParameter {
                name,
                step_id: entity,
                index,
                kind,
                value,
            });
        }
    }
    parameters
}
