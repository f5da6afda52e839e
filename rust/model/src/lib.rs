// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # ifc-bridge model store
//!
//! Step-id addressed IFC entity store with schema-driven attribute access.
//!
//! The store is the single source of truth for IFC data within the bridge:
//! entities are flat slot vectors of tagged [`AttributeValue`]s, validated
//! against a [`SchemaTable`] that knows each type's declared attribute names,
//! kinds and supertype chain. Queries mirror the narrow interface the
//! round-trip core needs:
//!
//! - `by_id` / `by_type` / `is_a` for lookup,
//! - `get_inverse` for reverse reference scans (decomposition, containment,
//!   material associations),
//! - `traverse` for the downward closure of a representation,
//! - indexed attribute get/set plus `attribute_name` / `attribute_kind` for
//!   schema-driven generic editing.
//!
//! ```rust
//! use ifc_bridge_model::{AttributeValue, ModelStore, SchemaTable};
//!
//! let mut store = ModelStore::new(SchemaTable::ifc4_subset());
//! let wall = store.create("IfcWall", vec![
//!     AttributeValue::Text("2O2Fr$t4X7Zf8NOew3FLOH".into()),
//! ]).unwrap();
//! assert!(store.is_a(wall, "IfcElement"));
//! assert_eq!(store.attribute_name(wall, 0).unwrap(), "GlobalId");
//! ```

pub mod error;
pub mod schema;
pub mod store;
pub mod units;
pub mod value;

pub use error::{Error, Result};
pub use schema::{AttributeDef, AttributeKind, SchemaTable};
pub use store::{Entity, ModelStore};
pub use units::{length_unit_scale, si_prefix_multiplier};
pub use value::AttributeValue;
