// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # Roofslope Engine
//!
//! Drainage routing and slope assignment over sampled roof surfaces.
//!
//! ## Overview
//!
//! - **Vertex merging**: raw shape points collapse into canonical vertices
//!   under a distance tolerance
//! - **Connectivity graph**: vertices are joined where the straight segment
//!   between them stays on the roof and clear of voids
//! - **Drain detection**: opening loops are classified into circular,
//!   square, rectangular, polygonal or mixed drains
//! - **Path finding**: Dijkstra, A* and greedy-downhill routing to the
//!   nearest drain behind one [`PathStrategy`] trait
//! - **Slope assignment**: every reachable vertex gets
//!   `elevation = path length × slope factor`, streamed in batches
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use roofslope_engine::{
//!     DrainageConfig, NullSink, PlanarSurface, Point2, Point3, SlopeInput, SlopeProcessor,
//! };
//!
//! let surface = PlanarSurface::horizontal(&outline, &[], 0.0)?;
//! let input = SlopeInput {
//!     points: &points,
//!     openings: &openings,
//!     ..SlopeInput::default()
//! };
//! let processor = SlopeProcessor::new(DrainageConfig::default())?;
//! let outcome = processor.run(&input, &surface, &mut NullSink)?;
//! println!("{} vertices sloped", outcome.metrics.processed);
//! ```
//!
//! ## Determinism
//!
//! All searches break ties on the lowest vertex id, and vertex ids follow
//! first-seen input order. The same input always yields the same graph,
//! drains, paths and elevations.

pub mod config;
pub mod drains;
pub mod error;
pub mod graph;
pub mod merge;
pub mod pathfinding;
pub mod predicates;
pub mod routing;
pub mod slope;
pub mod surface;
pub mod types;

// Re-export nalgebra types for convenience
pub use nalgebra::{Point2, Point3, Vector3};

pub use config::DrainageConfig;
pub use drains::{drain_vertices, fit_circle, CircleFit, DrainDetector};
pub use error::{Error, Result};
pub use graph::{ConnectivityGraph, GraphEdge, GraphStats};
pub use merge::VertexMerger;
pub use pathfinding::{
    AStarStrategy, DijkstraStrategy, GreedyDownhillStrategy, NearestDrain, NearestDrainField,
    PathFailure, PathResult, PathStrategy, Strategy,
};
pub use routing::{route_points, route_vertices, RoutingReport};
pub use slope::{
    ElevationSink, ElevationUpdate, FlushPolicy, FnSink, NullSink, SlopeInput, SlopeMetrics,
    SlopeOutcome, SlopeProcessor,
};
pub use surface::{FacetedSurface, PlanarSurface, Projection, SurfaceQuery, UvBounds};
pub use types::{
    BoundaryLoop, BoundarySegment, DrainItem, DrainShape, Footprint, Vertex, VertexId,
};
