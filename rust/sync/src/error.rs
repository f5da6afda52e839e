// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use thiserror::Error;

/// Result type for round-trip operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during import or write-back
#[derive(Error, Debug)]
pub enum Error {
    #[error("Model has no IfcProject")]
    MissingProject,

    #[error("Failed to write shape representation: {0}")]
    WriteFailed(String),

    #[error("Object has no mesh data: {0}")]
    NoMesh(String),

    #[error("Stale scene reference: {0}")]
    StaleKey(String),

    #[error("No parameter at index {0}")]
    UnknownParameter(usize),

    #[error("Model store error: {0}")]
    Model(#[from] ifc_bridge_model::Error),

    #[error("Geometry error: {0}")]
    Geometry(#[from] ifc_bridge_geometry::Error),
}
