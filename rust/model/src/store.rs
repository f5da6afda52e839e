// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! In-memory IFC model store.
//!
//! Entities are addressed by step id and hold a flat slot vector of
//! [`AttributeValue`]s laid out per the schema table. The store is the sole
//! owner of entity data; every other component refers to entities by id.

use crate::error::{Error, Result};
use crate::schema::{AttributeKind, SchemaTable};
use crate::value::AttributeValue;
use rustc_hash::{FxHashMap, FxHashSet};

/// One parsed entity: type name plus attribute slots
#[derive(Debug, Clone)]
pub struct Entity {
    id: u32,
    type_name: String,
    attributes: Vec<AttributeValue>,
}

impl Entity {
    /// Step id of this entity
    #[inline]
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Exact entity type name (e.g. `IfcWall`)
    #[inline]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Attribute slot by index
    #[inline]
    pub fn attribute(&self, index: usize) -> Option<&AttributeValue> {
        self.attributes.get(index)
    }

    /// All attribute slots
    #[inline]
    pub fn attributes(&self) -> &[AttributeValue] {
        &self.attributes
    }

    /// Number of attribute slots
    #[inline]
    pub fn arity(&self) -> usize {
        self.attributes.len()
    }
}

/// Step-id addressed entity store backed by a schema table
#[derive(Debug)]
pub struct ModelStore {
    schema: SchemaTable,
    entities: FxHashMap<u32, Entity>,
    /// Creation order, so `by_type` and `get_inverse` are deterministic
    order: Vec<u32>,
    next_id: u32,
}

impl ModelStore {
    /// Create an empty store over a schema table
    pub fn new(schema: SchemaTable) -> Self {
        Self {
            schema,
            entities: FxHashMap::default(),
            order: Vec::new(),
            next_id: 1,
        }
    }

    /// The schema table this store validates against
    pub fn schema(&self) -> &SchemaTable {
        &self.schema
    }

    /// Number of live entities
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Create an entity, padding missing trailing attributes with null.
    /// Errors if the type is undeclared or more slots are given than declared.
    pub fn create(&mut self, type_name: &str, attributes: Vec<AttributeValue>) -> Result<u32> {
        let declared = self
            .schema
            .attributes(type_name)
            .ok_or_else(|| Error::UnknownType(type_name.to_string()))?
            .len();
        if attributes.len() > declared {
            return Err(Error::Arity {
                type_name: type_name.to_string(),
                declared,
                given: attributes.len(),
            });
        }
        let mut attributes = attributes;
        attributes.resize(declared, AttributeValue::Null);

        let id = self.next_id;
        self.next_id += 1;
        self.entities.insert(
            id,
            Entity {
                id,
                type_name: type_name.to_string(),
                attributes,
            },
        );
        self.order.push(id);
        Ok(id)
    }

    /// Delete an entity. References held by other entities are not rewritten.
    pub fn remove(&mut self, id: u32) -> Result<Entity> {
        let entity = self.entities.remove(&id).ok_or(Error::UnknownEntity(id))?;
        self.order.retain(|e| *e != id);
        Ok(entity)
    }

    /// Look up an entity by step id
    pub fn by_id(&self, id: u32) -> Result<&Entity> {
        self.entities.get(&id).ok_or(Error::UnknownEntity(id))
    }

    /// All entities that are the given type or a subtype of it, in creation order
    pub fn by_type(&self, type_name: &str) -> Vec<u32> {
        self.order
            .iter()
            .copied()
            .filter(|id| {
                self.entities
                    .get(id)
                    .is_some_and(|e| self.schema.is_subtype_of(&e.type_name, type_name))
            })
            .collect()
    }

    /// Supertype-aware type check for one entity
    pub fn is_a(&self, id: u32, type_name: &str) -> bool {
        self.entities
            .get(&id)
            .is_some_and(|e| self.schema.is_subtype_of(&e.type_name, type_name))
    }

    /// Exact type name of an entity
    pub fn type_of(&self, id: u32) -> Result<&str> {
        Ok(self.by_id(id)?.type_name())
    }

    /// Attribute slot by index
    pub fn attribute(&self, id: u32, index: usize) -> Result<&AttributeValue> {
        let entity = self.by_id(id)?;
        entity.attribute(index).ok_or_else(|| Error::AttributeIndex {
            id,
            type_name: entity.type_name.clone(),
            index,
        })
    }

    /// Attribute slot by declared name
    pub fn attribute_by_name(&self, id: u32, name: &str) -> Result<&AttributeValue> {
        let index = self.attribute_index(id, name)?;
        self.attribute(id, index)
    }

    /// Overwrite one attribute slot
    pub fn set_attribute(&mut self, id: u32, index: usize, value: AttributeValue) -> Result<()> {
        let entity = self.entities.get_mut(&id).ok_or(Error::UnknownEntity(id))?;
        let slot = entity
            .attributes
            .get_mut(index)
            .ok_or_else(|| Error::AttributeIndex {
                id,
                type_name: entity.type_name.clone(),
                index,
            })?;
        *slot = value;
        Ok(())
    }

    /// Overwrite one attribute slot, addressed by declared name
    pub fn set_attribute_by_name(
        &mut self,
        id: u32,
        name: &str,
        value: AttributeValue,
    ) -> Result<()> {
        let index = self.attribute_index(id, name)?;
        self.set_attribute(id, index, value)
    }

    /// Declared name of an attribute slot
    pub fn attribute_name(&self, id: u32, index: usize) -> Result<&str> {
        let entity = self.by_id(id)?;
        self.schema
            .attributes(&entity.type_name)
            .and_then(|attrs| attrs.get(index))
            .map(|def| def.name.as_str())
            .ok_or_else(|| Error::AttributeIndex {
                id,
                type_name: entity.type_name.clone(),
                index,
            })
    }

    /// Declared kind of an attribute slot
    pub fn attribute_kind(&self, id: u32, index: usize) -> Result<AttributeKind> {
        let entity = self.by_id(id)?;
        self.schema
            .attributes(&entity.type_name)
            .and_then(|attrs| attrs.get(index))
            .map(|def| def.kind)
            .ok_or_else(|| Error::AttributeIndex {
                id,
                type_name: entity.type_name.clone(),
                index,
            })
    }

    fn attribute_index(&self, id: u32, name: &str) -> Result<usize> {
        let entity = self.by_id(id)?;
        self.schema
            .attributes(&entity.type_name)
            .and_then(|attrs| attrs.iter().position(|def| def.name == name))
            .ok_or_else(|| Error::AttributeName {
                id,
                type_name: entity.type_name.clone(),
                name: name.to_string(),
            })
    }

    /// Every entity holding a reference to `id` in any attribute slot
    /// (directly or inside a list), in creation order.
    pub fn get_inverse(&self, id: u32) -> Vec<u32> {
        self.order
            .iter()
            .copied()
            .filter(|candidate| {
                self.entities.get(candidate).is_some_and(|e| {
                    e.attributes.iter().any(|attr| attr.references(id))
                })
            })
            .collect()
    }

    /// Transitive closure of entities reachable from `id` through attribute
    /// references, including `id` itself. Depth-first, each entity once.
    pub fn traverse(&self, id: u32) -> Vec<u32> {
        let mut seen = FxHashSet::default();
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if !seen.insert(current) {
                continue;
            }
            let Some(entity) = self.entities.get(&current) else {
                continue;
            };
            out.push(current);
            for attr in &entity.attributes {
                attr.for_each_ref(&mut |r| {
                    if !seen.contains(&r) {
                        stack.push(r);
                    }
                });
            }
        }
        out
    }

    /// Rewrite every reference to `old` inside `entity_id`'s slots to `new`
    pub fn replace_references(&mut self, entity_id: u32, old: u32, new: u32) -> Result<()> {
        let entity = self
            .entities
            .get_mut(&entity_id)
            .ok_or(Error::UnknownEntity(entity_id))?;
        for attr in &mut entity.attributes {
            replace_in_value(attr, old, new);
        }
        Ok(())
    }
}

fn replace_in_value(value: &mut AttributeValue, old: u32, new: u32) {
    match value {
        AttributeValue::EntityRef(r) if *r == old => *r = new,
        AttributeValue::List(items) => {
            for item in items {
                replace_in_value(item, old, new);
            }
        }
        _ => {}
    }
}
