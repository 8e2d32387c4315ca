// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Slope assignment: turns nearest-drain path lengths into elevations.
//!
//! One [`SlopeProcessor::run`] call merges the raw points, builds the
//! graph, finds the drains, zeroes them and gives every other reachable
//! vertex `elevation = path length × slope factor`. Updates are handed to
//! an [`ElevationSink`] in batches so a host can commit them incrementally;
//! the computed values never depend on the batch size.

use std::num::NonZeroUsize;
use std::ops::ControlFlow;
use std::time::Instant;

use nalgebra::Point3;
use serde::{Deserialize, Serialize};

use crate::config::DrainageConfig;
use crate::drains::{drain_vertices, DrainDetector};
use crate::error::Result;
use crate::graph::{ConnectivityGraph, GraphStats};
use crate::merge::{nearest_vertex, VertexMerger};
use crate::pathfinding::NearestDrainField;
use crate::surface::SurfaceQuery;
use crate::types::{BoundaryLoop, DrainItem, VertexId};

/// Geometry for one slope pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct SlopeInput<'a> {
    /// Raw sample points; duplicates are merged.
    pub points: &'a [Point3<f64>],
    /// Opening loops, classified into drains.
    pub openings: &'a [BoundaryLoop],
    /// Loops that remove vertices and block edges.
    pub voids: &'a [BoundaryLoop],
    /// Extra drain locations, snapped to the nearest vertex.
    pub drain_points: &'a [Point3<f64>],
}

/// One elevation write.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ElevationUpdate {
    pub vertex: VertexId,
    pub position: Point3<f64>,
    pub elevation: f64,
    /// Nearest-drain path length; zero for drain vertices.
    pub path_length: f64,
    pub drain: VertexId,
}

/// Receives elevation updates batch by batch.
///
/// Returning [`ControlFlow::Break`] stops the pass after the current batch;
/// the batch just delivered counts as applied.
pub trait ElevationSink {
    fn flush(&mut self, batch: &[ElevationUpdate]) -> ControlFlow<()>;
}

impl ElevationSink for Vec<ElevationUpdate> {
    fn flush(&mut self, batch: &[ElevationUpdate]) -> ControlFlow<()> {
        self.extend_from_slice(batch);
        ControlFlow::Continue(())
    }
}

impl<S: ElevationSink + ?Sized> ElevationSink for &mut S {
    fn flush(&mut self, batch: &[ElevationUpdate]) -> ControlFlow<()> {
        (**self).flush(batch)
    }
}

/// Adapts a closure into an [`ElevationSink`].
pub struct FnSink<F>(pub F);

impl<F> ElevationSink for FnSink<F>
where
    F: FnMut(&[ElevationUpdate]) -> ControlFlow<()>,
{
    fn flush(&mut self, batch: &[ElevationUpdate]) -> ControlFlow<()> {
        (self.0)(batch)
    }
}

/// Sink that discards updates; the outcome's graph still carries them.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl ElevationSink for NullSink {
    fn flush(&mut self, _batch: &[ElevationUpdate]) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }
}

/// How updates are grouped before reaching the sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlushPolicy {
    /// Everything in a single batch.
    Atomic,
    /// Batches of at most `n` updates.
    Every(NonZeroUsize),
}

impl FlushPolicy {
    pub const DEFAULT_BATCH: usize = 50;

    /// `Every(n)`, or `Atomic` when `n` is zero.
    pub fn every(n: usize) -> Self {
        NonZeroUsize::new(n).map_or(FlushPolicy::Atomic, FlushPolicy::Every)
    }

    fn chunk_size(&self, total: usize) -> usize {
        match self {
            FlushPolicy::Atomic => total.max(1),
            FlushPolicy::Every(n) => n.get(),
        }
    }
}

impl Default for FlushPolicy {
    fn default() -> Self {
        FlushPolicy::every(Self::DEFAULT_BATCH)
    }
}

/// Counters and timings of one slope pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SlopeMetrics {
    /// Non-drain vertices that received an elevation.
    pub processed: usize,
    /// Vertices left untouched: beyond the distance threshold or unreachable.
    pub skipped: usize,
    /// Subset of `skipped` with no reachable drain at all.
    pub unreachable: usize,
    pub drain_vertices: usize,
    pub drains_detected: usize,
    pub merged_points: usize,
    pub highest_elevation: f64,
    pub longest_path: f64,
    pub batches: usize,
    pub cancelled: bool,
    pub graph: GraphStats,
    pub graph_time_ms: u64,
    pub path_time_ms: u64,
    pub total_time_ms: u64,
}

/// Everything a pass produced.
#[derive(Debug, Clone)]
pub struct SlopeOutcome {
    /// Graph with applied elevations.
    pub graph: ConnectivityGraph,
    pub drains: Vec<DrainItem>,
    pub drain_vertices: Vec<VertexId>,
    pub metrics: SlopeMetrics,
}

/// Runs slope passes with a fixed configuration.
#[derive(Debug, Clone)]
pub struct SlopeProcessor {
    config: DrainageConfig,
    detector: DrainDetector,
    flush: FlushPolicy,
}

impl SlopeProcessor {
    pub fn new(config: DrainageConfig) -> Result<Self> {
        let detector = DrainDetector::new(&config)?;
        Ok(Self {
            config,
            detector,
            flush: FlushPolicy::default(),
        })
    }

    pub fn with_flush_policy(mut self, flush: FlushPolicy) -> Self {
        self.flush = flush;
        self
    }

    pub fn config(&self) -> &DrainageConfig {
        &self.config
    }

    pub fn flush_policy(&self) -> FlushPolicy {
        self.flush
    }

    /// Runs one full pass.
    pub fn run<S, K>(
        &self,
        input: &SlopeInput<'_>,
        surface: &S,
        sink: &mut K,
    ) -> Result<SlopeOutcome>
    where
        S: SurfaceQuery + ?Sized,
        K: ElevationSink + ?Sized,
    {
        let total_start = Instant::now();
        let mut metrics = SlopeMetrics::default();

        // Graph
        let graph_start = Instant::now();
        let merger = VertexMerger::merge_points(input.points, self.config.node_tolerance)?;
        metrics.merged_points = merger.merged_count();
        tracing::info!(
            raw_points = input.points.len(),
            vertices = merger.len(),
            merged = metrics.merged_points,
            "Merged roof points"
        );
        let mut graph = ConnectivityGraph::build_with_voids(
            merger.vertices(),
            surface,
            &self.config,
            input.voids,
        )?;
        metrics.graph = graph.stats();
        metrics.graph_time_ms = graph_start.elapsed().as_millis() as u64;

        // Drains
        let drains = self.detector.detect(input.openings, surface);
        let mut drain_ids = drain_vertices(&graph, &drains, surface, &self.config);
        drain_ids.extend(
            input
                .drain_points
                .iter()
                .filter_map(|p| nearest_vertex(graph.vertices(), p)),
        );
        drain_ids.sort_unstable();
        drain_ids.dedup();
        metrics.drains_detected = drains.len();
        metrics.drain_vertices = drain_ids.len();
        tracing::info!(
            drains = drains.len(),
            drain_points = input.drain_points.len(),
            drain_vertices = drain_ids.len(),
            "Identified drain vertices"
        );
        if drain_ids.is_empty() {
            tracing::warn!("No drain vertices found, every vertex will be skipped");
        }

        for &id in &drain_ids {
            graph.set_elevation(id, 0.0)?;
        }

        // Paths
        let path_start = Instant::now();
        let field = NearestDrainField::compute(&graph, &drain_ids, self.config.uphill_bias);
        metrics.path_time_ms = path_start.elapsed().as_millis() as u64;

        let factor = self.config.slope_factor();
        let mut updates = Vec::with_capacity(graph.node_count());
        for &id in &drain_ids {
            if let Some(v) = graph.vertex(id) {
                updates.push(ElevationUpdate {
                    vertex: id,
                    position: v.position,
                    elevation: 0.0,
                    path_length: 0.0,
                    drain: id,
                });
            }
        }
        for v in graph.vertices() {
            if drain_ids.binary_search(&v.id).is_ok() {
                continue;
            }
            match field.nearest(v.id) {
                None => {
                    metrics.skipped += 1;
                    metrics.unreachable += 1;
                }
                Some(nearest) if nearest.length > self.config.distance_threshold => {
                    tracing::trace!(
                        vertex = %v.id,
                        length = nearest.length,
                        "Beyond distance threshold, skipped"
                    );
                    metrics.skipped += 1;
                }
                Some(nearest) => updates.push(ElevationUpdate {
                    vertex: v.id,
                    position: v.position,
                    elevation: nearest.length * factor,
                    path_length: nearest.length,
                    drain: nearest.drain,
                }),
            }
        }

        // Apply
        if !updates.is_empty() {
            for batch in updates.chunks(self.flush.chunk_size(updates.len())) {
                for update in batch {
                    graph.set_elevation(update.vertex, update.elevation)?;
                    if drain_ids.binary_search(&update.vertex).is_err() {
                        metrics.processed += 1;
                        metrics.highest_elevation = metrics.highest_elevation.max(update.elevation);
                        metrics.longest_path = metrics.longest_path.max(update.path_length);
                    }
                }
                metrics.batches += 1;
                if sink.flush(batch).is_break() {
                    metrics.cancelled = true;
                    tracing::info!(batches = metrics.batches, "Slope pass cancelled by sink");
                    break;
                }
            }
        }

        metrics.total_time_ms = total_start.elapsed().as_millis() as u64;
        tracing::info!(
            processed = metrics.processed,
            skipped = metrics.skipped,
            unreachable = metrics.unreachable,
            drain_vertices = metrics.drain_vertices,
            highest_elevation = metrics.highest_elevation,
            longest_path = metrics.longest_path,
            batches = metrics.batches,
            total_time_ms = metrics.total_time_ms,
            "Slope pass complete"
        );

        Ok(SlopeOutcome {
            graph,
            drains,
            drain_vertices: drain_ids,
            metrics,
        })
    }
}
