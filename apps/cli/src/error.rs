// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! CLI error types

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid scene: {0}")]
    Scene(#[from] serde_json::Error),

    #[error("scene has no surface facets")]
    EmptySurface,

    #[error("facet {index}: {source}")]
    Facet {
        index: usize,
        #[source]
        source: roofslope_engine::Error,
    },

    #[error("engine error: {0}")]
    Engine(#[from] roofslope_engine::Error),
}

pub type Result<T> = std::result::Result<T, CliError>;
