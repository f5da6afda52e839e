// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use thiserror::Error;

/// Result type for geometry operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during geometry processing
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid placement: {0}")]
    Placement(String),

    #[error("Tessellation failed: {0}")]
    Tessellation(String),

    #[error("Invalid mesh buffer: {0}")]
    InvalidBuffer(String),

    #[error("Model store error: {0}")]
    Model(#[from] ifc_bridge_model::Error),
}
