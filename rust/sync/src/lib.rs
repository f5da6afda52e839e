// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # ifc-bridge sync
//!
//! Round-trip layer between a parsed IFC model and an editable scene graph.
//!
//! The import direction ([`IfcImporter`]) turns products into scene objects:
//! spatial containment becomes a collection tree, body representations
//! become shared mesh datablocks, surface styles become materials. The
//! write-back direction ([`WriteBack`]) serializes edited meshes and
//! transforms into new model entities and rewires every reference from the
//! old geometry to the new.
//!
//! ```no_run
//! use ifc_bridge_geometry::FacetTessellator;
//! use ifc_bridge_model::{ModelStore, SchemaTable};
//! use ifc_bridge_sync::{IfcImporter, Scene};
//!
//! let store = ModelStore::new(SchemaTable::ifc4_subset());
//! let tessellator = FacetTessellator::new();
//! let mut importer = IfcImporter::new(&store, &tessellator);
//! let mut scene = Scene::new();
//! let summary = importer.execute(&mut scene)?;
//! println!("{} objects", summary.objects_created);
//! # Ok::<(), ifc_bridge_sync::Error>(())
//! ```

pub mod error;
pub mod hierarchy;
pub mod import;
pub mod materials;
pub mod scene;
pub mod writeback;

pub use error::{Error, Result};
pub use hierarchy::Hierarchy;
pub use import::{mesh_key_name, IfcImporter, ImportSummary, MeshOutcome};
pub use materials::{collect_styles, MaterialCreator};
pub use scene::{
    CollectionKey, MaterialKey, MeshKey, ObjectAttribute, ObjectKey, Scene,
};
pub use writeback::WriteBack;
