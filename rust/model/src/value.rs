// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Tagged attribute values stored in entity slots.

use std::fmt;

/// IFC entity attribute value
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    /// Reference to another entity by step id
    EntityRef(u32),
    /// String value
    Text(String),
    /// Float value
    Real(f64),
    /// Integer value
    Integer(i64),
    /// Boolean value
    Boolean(bool),
    /// Enum value (without the STEP dots)
    Enum(String),
    /// List of values
    List(Vec<AttributeValue>),
    /// Null/undefined ($)
    Null,
}

impl AttributeValue {
    /// Get as entity reference
    #[inline]
    pub fn as_entity_ref(&self) -> Option<u32> {
        match self {
            AttributeValue::EntityRef(id) => Some(*id),
            _ => None,
        }
    }

    /// Get as string
    #[inline]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            AttributeValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Get as enum value
    #[inline]
    pub fn as_enum(&self) -> Option<&str> {
        match self {
            AttributeValue::Enum(s) => Some(s),
            _ => None,
        }
    }

    /// Get as float (integers widen)
    #[inline]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            AttributeValue::Real(f) => Some(*f),
            AttributeValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Get as integer
    #[inline]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            AttributeValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Get as list
    #[inline]
    pub fn as_list(&self) -> Option<&[AttributeValue]> {
        match self {
            AttributeValue::List(items) => Some(items),
            _ => None,
        }
    }

    /// Check for null
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, AttributeValue::Null)
    }

    /// Extract `(x, y, z)` from a numeric list, missing components default to 0
    pub fn as_triple(&self) -> Option<(f64, f64, f64)> {
        let items = self.as_list()?;
        let x = items.first().and_then(|v| v.as_float()).unwrap_or(0.0);
        let y = items.get(1).and_then(|v| v.as_float()).unwrap_or(0.0);
        let z = items.get(2).and_then(|v| v.as_float()).unwrap_or(0.0);
        Some((x, y, z))
    }

    /// Visit every entity reference in this value, recursing into lists
    pub fn for_each_ref(&self, f: &mut impl FnMut(u32)) {
        match self {
            AttributeValue::EntityRef(id) => f(*id),
            AttributeValue::List(items) => {
                for item in items {
                    item.for_each_ref(f);
                }
            }
            _ => {}
        }
    }

    /// Check whether `id` is referenced anywhere in this value
    pub fn references(&self, id: u32) -> bool {
        match self {
            AttributeValue::EntityRef(r) => *r == id,
            AttributeValue::List(items) => items.iter().any(|v| v.references(id)),
            _ => false,
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::EntityRef(id) => write!(f, "#{id}"),
            AttributeValue::Text(s) => write!(f, "{s}"),
            AttributeValue::Real(v) => write!(f, "{v}"),
            AttributeValue::Integer(v) => write!(f, "{v}"),
            AttributeValue::Boolean(v) => write!(f, "{v}"),
            AttributeValue::Enum(s) => write!(f, "{s}"),
            AttributeValue::List(items) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, ")")
            }
            AttributeValue::Null => write!(f, "$"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn triple_defaults_missing_components() {
        let v = AttributeValue::List(vec![AttributeValue::Real(1.0), AttributeValue::Real(2.0)]);
        assert_eq!(v.as_triple(), Some((1.0, 2.0, 0.0)));
    }

    #[test]
    fn references_recurse_into_lists() {
        let v = AttributeValue::List(vec![
            AttributeValue::Null,
            AttributeValue::List(vec![AttributeValue::EntityRef(7)]),
        ]);
        assert!(v.references(7));
        assert!(!v.references(8));
    }
}
