// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Spatial containment tree reconstruction.
//!
//! Sites, buildings and storeys arrive in arbitrary order; an element's
//! parent may not have been placed yet when the element is first visited.
//! A bounded fixed-point iteration handles this: scan all unplaced elements,
//! place any whose parent is the project or already placed, and stop after a
//! full pass places nothing or after `len + 1` passes. The bound keeps
//! malformed decomposition graphs (cycles, islands) from looping forever;
//! whatever remains unplaced is reported, not crashed on.

use crate::scene::{CollectionKey, Scene};
use ifc_bridge_model::ModelStore;
use rustc_hash::FxHashMap;
use tracing::warn;

/// Result of hierarchy construction
#[derive(Debug, Default)]
pub struct Hierarchy {
    /// Collection per placed spatial element, keyed by step id
    pub collections: FxHashMap<u32, CollectionKey>,
    /// Elements whose parent chain never reached the project
    pub unplaced: Vec<u32>,
}

impl Hierarchy {
    /// Collection for a spatial element, if it was placed
    pub fn collection(&self, spatial_element: u32) -> Option<CollectionKey> {
        self.collections.get(&spatial_element).copied()
    }
}

/// Display name for a spatial element, `{type}/{Name}`
pub fn spatial_name(store: &ModelStore, element: u32) -> String {
    let type_name = store.type_of(element).unwrap_or("Unknown");
    let name = store
        .attribute(element, 2)
        .ok()
        .and_then(|v| v.as_text().map(str::to_string))
        .unwrap_or_else(|| "Unnamed".to_string());
    format!("{type_name}/{name}")
}

/// Parent of a spatial element through its decomposition relationship
fn decomposition_parent(store: &ModelStore, element: u32) -> Option<u32> {
    for rel in store.get_inverse(element) {
        if !store.is_a(rel, "IfcRelAggregates") {
            continue;
        }
        // Only relationships where this element is on the decomposed side
        let related = store.attribute(rel, 5).ok()?;
        if !related.references(element) {
            continue;
        }
        return store.attribute(rel, 4).ok()?.as_entity_ref();
    }
    None
}

/// Build the site/building/storey containment tree under the project
/// collection. Tolerates unordered input; leaves unreachable elements
/// unplaced.
pub fn build(
    store: &ModelStore,
    scene: &mut Scene,
    project_collection: CollectionKey,
) -> Hierarchy {
    let mut elements = store.by_type("IfcSite");
    elements.extend(store.by_type("IfcBuilding"));
    elements.extend(store.by_type("IfcBuildingStorey"));

    let mut hierarchy = Hierarchy::default();
    let mut attempts = 0;
    while hierarchy.collections.len() < elements.len() && attempts <= elements.len() {
        for &element in &elements {
            if hierarchy.collections.contains_key(&element) {
                continue;
            }
            let Some(parent) = decomposition_parent(store, element) else {
                continue;
            };
            let parent_collection = if store.is_a(parent, "IfcProject") {
                Some(project_collection)
            } else {
                hierarchy.collection(parent)
            };
            if let Some(parent_collection) = parent_collection {
                let collection = scene.create_collection(&spatial_name(store, element));
                scene.link_collection(collection, parent_collection);
                hierarchy.collections.insert(element, collection);
            }
        }
        attempts += 1;
    }

    hierarchy.unplaced = elements
        .iter()
        .copied()
        .filter(|e| !hierarchy.collections.contains_key(e))
        .collect();
    if !hierarchy.unplaced.is_empty() {
        warn!(
            unplaced = ?hierarchy.unplaced,
            "spatial elements left outside the containment tree"
        );
    }
    hierarchy
}

#[cfg(test)]
mod tests {
    use super::*;
    use ifc_bridge_model::{AttributeValue, SchemaTable};

    fn named(store: &mut ModelStore, type_name: &str, name: &str) -> u32 {
        store
            .create(
                type_name,
                vec![
                    AttributeValue::Text(format!("guid-{name}")),
                    AttributeValue::Null,
                    AttributeValue::Text(name.into()),
                ],
            )
            .unwrap()
    }

    fn aggregate(store: &mut ModelStore, parent: u32, child: u32) {
        store
            .create(
                "IfcRelAggregates",
                vec![
                    AttributeValue::Text("guid-rel".into()),
                    AttributeValue::Null,
                    AttributeValue::Null,
                    AttributeValue::Null,
                    AttributeValue::EntityRef(parent),
                    AttributeValue::List(vec![AttributeValue::EntityRef(child)]),
                ],
            )
            .unwrap();
    }

    #[test]
    fn shuffled_input_places_every_element_once() {
        let mut store = ModelStore::new(SchemaTable::ifc4_subset());
        let project = named(&mut store, "IfcProject", "P");
        // Created child-before-parent on purpose
        let storey = named(&mut store, "IfcBuildingStorey", "L1");
        let building = named(&mut store, "IfcBuilding", "B");
        let site = named(&mut store, "IfcSite", "S");
        aggregate(&mut store, project, site);
        aggregate(&mut store, site, building);
        aggregate(&mut store, building, storey);

        let mut scene = Scene::new();
        let project_collection = scene.create_collection("IfcProject/P");
        let hierarchy = build(&store, &mut scene, project_collection);

        assert!(hierarchy.unplaced.is_empty());
        assert_eq!(hierarchy.collections.len(), 3);

        // Site under project, building under site, storey under building
        let site_c = hierarchy.collection(site).unwrap();
        let building_c = hierarchy.collection(building).unwrap();
        let storey_c = hierarchy.collection(storey).unwrap();
        assert!(scene
            .collection(project_collection)
            .unwrap()
            .children
            .contains(&site_c));
        assert!(scene.collection(site_c).unwrap().children.contains(&building_c));
        assert!(scene
            .collection(building_c)
            .unwrap()
            .children
            .contains(&storey_c));
        assert_eq!(scene.collection(storey_c).unwrap().name, "IfcBuildingStorey/L1");
    }

    #[test]
    fn cyclic_decomposition_terminates_and_reports_unplaced() {
        let mut store = ModelStore::new(SchemaTable::ifc4_subset());
        let _project = named(&mut store, "IfcProject", "P");
        let a = named(&mut store, "IfcBuilding", "A");
        let b = named(&mut store, "IfcBuilding", "B");
        // A decomposes B and B decomposes A, no path to the project
        aggregate(&mut store, a, b);
        aggregate(&mut store, b, a);

        let mut scene = Scene::new();
        let project_collection = scene.create_collection("IfcProject/P");
        let hierarchy = build(&store, &mut scene, project_collection);

        assert!(hierarchy.collections.is_empty());
        let mut unplaced = hierarchy.unplaced.clone();
        unplaced.sort_unstable();
        assert_eq!(unplaced, vec![a, b]);
    }

    #[test]
    fn element_without_decomposition_is_left_unplaced() {
        let mut store = ModelStore::new(SchemaTable::ifc4_subset());
        let orphan = named(&mut store, "IfcSite", "Island");

        let mut scene = Scene::new();
        let project_collection = scene.create_collection("IfcProject/P");
        let hierarchy = build(&store, &mut scene, project_collection);
        assert_eq!(hierarchy.unplaced, vec![orphan]);
    }
}
