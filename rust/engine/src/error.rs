// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for drainage routing operations.

use crate::types::VertexId;

/// Result type alias for drainage operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building graphs, detecting drains or
/// assigning slopes.
///
/// Geometry failures (`DegenerateLoop`, `SingularFit`, `ProjectionFailed`)
/// are normally recovered where they happen: the offending loop, edge or
/// vertex is skipped and the caller sees a smaller output set.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A configuration scalar is outside its valid range.
    #[error("invalid configuration: `{field}` must be {expected}, got {value}")]
    InvalidConfig {
        field: &'static str,
        expected: &'static str,
        value: f64,
    },

    /// Minimum edge length is larger than the maximum.
    #[error("edge length bounds are inverted: min {min} > max {max}")]
    InvertedEdgeBounds { min: f64, max: f64 },

    /// A referenced vertex is not part of the graph.
    #[error("vertex not found: {0}")]
    VertexNotFound(VertexId),

    /// A boundary loop has too few usable samples to classify.
    #[error("degenerate boundary loop: {0}")]
    DegenerateLoop(String),

    /// The least-squares circle fit has no unique solution.
    #[error("circle fit is singular for {points} points")]
    SingularFit { points: usize },

    /// A point could not be projected onto the surface.
    #[error("projection onto surface failed")]
    ProjectionFailed,
}
