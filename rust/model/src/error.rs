// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use thiserror::Error;

/// Result type for model store operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while accessing the model store
#[derive(Error, Debug)]
pub enum Error {
    #[error("No entity with step id #{0}")]
    UnknownEntity(u32),

    #[error("Unknown entity type: {0}")]
    UnknownType(String),

    #[error("Entity #{id} ({type_name}) has no attribute at index {index}")]
    AttributeIndex {
        id: u32,
        type_name: String,
        index: usize,
    },

    #[error("Entity #{id} ({type_name}) has no attribute named {name}")]
    AttributeName {
        id: u32,
        type_name: String,
        name: String,
    },

    #[error("{type_name} declares {declared} attributes, {given} given")]
    Arity {
        type_name: String,
        declared: usize,
        given: usize,
    },

    #[error("Invalid schema table: {0}")]
    Schema(String),

    #[error("Schema table parse error: {0}")]
    SchemaJson(#[from] serde_json::Error),
}
