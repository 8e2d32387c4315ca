// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Interchangeable "route to the nearest drain" strategies.
//!
//! Every strategy answers the same question through [`PathStrategy`]: given
//! a start vertex and a set of drain vertices, produce a path from the start
//! to one of the drains, or a [`PathFailure`] saying why there is none. Each
//! call runs to completion synchronously.
//!
//! All searches order their frontier by `(priority, node index, insertion
//! sequence)`. Node indices follow vertex ids, so equal priorities always
//! resolve to the lowest id.

mod astar;
mod dijkstra;
mod greedy;

pub use astar::AStarStrategy;
pub use dijkstra::{DijkstraStrategy, NearestDrain, NearestDrainField};
pub use greedy::GreedyDownhillStrategy;

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::DrainageConfig;
use crate::graph::ConnectivityGraph;
use crate::types::VertexId;

/// Why a strategy could not reach a drain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum PathFailure {
    #[error("start vertex {start} is not part of the graph")]
    StartNotInGraph { start: VertexId },

    #[error("no drain vertices are part of the graph")]
    NoDrains,

    #[error("search exhausted without reaching a drain")]
    Unreachable,

    /// Forced corner mode: greedy descent got stuck before a drain.
    #[error("no valid downhill neighbor from {at} after {steps} steps")]
    NoDownhillNeighbor { at: VertexId, steps: usize },
}

/// Outcome of one path query. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathResult {
    pub start: VertexId,
    /// Vertices from `start` to the chosen drain; empty on failure.
    pub path: Vec<VertexId>,
    /// Sum of true edge lengths along `path`.
    pub length: f64,
    /// Strategy-specific search cost (penalties and biases included).
    pub cost: f64,
    pub found: bool,
    pub failure: Option<PathFailure>,
}

impl PathResult {
    pub fn success(start: VertexId, path: Vec<VertexId>, length: f64, cost: f64) -> Self {
        Self {
            start,
            path,
            length,
            cost,
            found: true,
            failure: None,
        }
    }

    pub fn failure(start: VertexId, reason: PathFailure) -> Self {
        Self {
            start,
            path: Vec::new(),
            length: 0.0,
            cost: 0.0,
            found: false,
            failure: Some(reason),
        }
    }

    /// The drain the path ends at.
    pub fn end(&self) -> Option<VertexId> {
        if self.found {
            self.path.last().copied()
        } else {
            None
        }
    }

    /// Human-readable failure reason, if any.
    pub fn reason(&self) -> Option<String> {
        self.failure.as_ref().map(|f| f.to_string())
    }
}

/// A nearest-drain routing algorithm.
pub trait PathStrategy {
    fn name(&self) -> &'static str;

    fn find_path(
        &self,
        graph: &ConnectivityGraph,
        start: VertexId,
        drains: &[VertexId],
    ) -> PathResult;
}

/// Selector for the built-in strategies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    #[default]
    Dijkstra,
    AStar,
    Greedy,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Dijkstra => "dijkstra",
            Strategy::AStar => "astar",
            Strategy::Greedy => "greedy",
        }
    }

    /// Instantiates the strategy with weights from `config`.
    pub fn build(&self, config: &DrainageConfig) -> Box<dyn PathStrategy> {
        match self {
            Strategy::Dijkstra => Box::new(DijkstraStrategy::new(config.uphill_bias)),
            Strategy::AStar => Box::new(AStarStrategy::new(config.uphill_penalty)),
            Strategy::Greedy => Box::new(GreedyDownhillStrategy::new(
                config.uphill_penalty,
                config.downhill_tolerance,
            )),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dijkstra" => Ok(Strategy::Dijkstra),
            "astar" | "a*" | "a-star" => Ok(Strategy::AStar),
            "greedy" | "downhill" => Ok(Strategy::Greedy),
            other => Err(format!("unknown strategy `{other}`")),
        }
    }
}

/// Drain membership by node index.
pub(crate) struct DrainSet {
    is_drain: Vec<bool>,
    nodes: Vec<usize>,
}

impl DrainSet {
    /// Maps drain ids onto node indices, ignoring ids outside the graph.
    pub(crate) fn new(graph: &ConnectivityGraph, drains: &[VertexId]) -> Self {
        let mut is_drain = vec![false; graph.node_count()];
        let mut nodes: Vec<usize> = drains
            .iter()
            .filter_map(|&id| graph.node_index(id))
            .collect();
        nodes.sort_unstable();
        nodes.dedup();
        for &n in &nodes {
            is_drain[n] = true;
        }
        Self { is_drain, nodes }
    }

    pub(crate) fn contains(&self, node: usize) -> bool {
        self.is_drain[node]
    }

    pub(crate) fn nodes(&self) -> &[usize] {
        &self.nodes
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Shared entry checks. `Err` carries the finished result: a failure, or the
/// trivial path when the start is itself a drain.
pub(crate) fn prepare(
    graph: &ConnectivityGraph,
    start: VertexId,
    drains: &[VertexId],
) -> Result<(usize, DrainSet), PathResult> {
    let Some(start_idx) = graph.node_index(start) else {
        return Err(PathResult::failure(start, PathFailure::StartNotInGraph { start }));
    };
    let drain_set = DrainSet::new(graph, drains);
    if drain_set.is_empty() {
        return Err(PathResult::failure(start, PathFailure::NoDrains));
    }
    if drain_set.contains(start_idx) {
        return Err(PathResult::success(start, vec![start], 0.0, 0.0));
    }
    Ok((start_idx, drain_set))
}

/// Walks `came_from` links back from `end` and returns ids start-first.
pub(crate) fn reconstruct(
    graph: &ConnectivityGraph,
    came_from: &[Option<usize>],
    end: usize,
) -> Vec<VertexId> {
    let mut path = vec![graph.node(end).id];
    let mut current = end;
    while let Some(prev) = came_from[current] {
        path.push(graph.node(prev).id);
        current = prev;
    }
    path.reverse();
    path
}

/// Climb from `from` to `to`; zero when descending or flat.
pub(crate) fn climb(graph: &ConnectivityGraph, from: usize, to: usize) -> f64 {
    (graph.node(to).height() - graph.node(from).height()).max(0.0)
}

/// Frontier entry, ordered as a min-heap on `(priority, tie, node, seq)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Frontier {
    pub priority: f64,
    /// Secondary key for entries with equal priority.
    pub tie: f64,
    pub node: usize,
    pub seq: u64,
}

impl Eq for Frontier {}

impl PartialOrd for Frontier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Frontier {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for min-heap
        other
            .priority
            .total_cmp(&self.priority)
            .then_with(|| other.tie.total_cmp(&self.tie))
            .then_with(|| other.node.cmp(&self.node))
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

#[cfg(test)]
pub(crate) mod test_graphs {
    use nalgebra::Point3;

    use crate::graph::ConnectivityGraph;
    use crate::types::{Vertex, VertexId};

    /// Builds a graph from positions and id pairs; weights are distances.
    pub fn graph(points: &[[f64; 3]], edges: &[(u32, u32)]) -> ConnectivityGraph {
        let mut g = ConnectivityGraph::new();
        for (i, p) in points.iter().enumerate() {
            g.add_vertex(Vertex::new(VertexId(i as u32), Point3::new(p[0], p[1], p[2])));
        }
        for &(a, b) in edges {
            g.connect(VertexId(a), VertexId(b)).unwrap();
        }
        g
    }

    /// Center v0 plus four arms of length 10 (v1..v4).
    pub fn plus() -> ConnectivityGraph {
        graph(
            &[
                [0.0, 0.0, 0.0],
                [10.0, 0.0, 0.0],
                [0.0, 10.0, 0.0],
                [-10.0, 0.0, 0.0],
                [0.0, -10.0, 0.0],
            ],
            &[(0, 1), (0, 2), (0, 3), (0, 4)],
        )
    }

    /// Two separate pieces: v0-v1 and v2-v3.
    pub fn split() -> ConnectivityGraph {
        graph(
            &[
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [5.0, 0.0, 0.0],
                [6.0, 0.0, 0.0],
            ],
            &[(0, 1), (2, 3)],
        )
    }

    /// A 4x4 flat grid with unit spacing and axis edges; ids row-major.
    pub fn flat_grid() -> ConnectivityGraph {
        let mut points = Vec::new();
        let mut edges = Vec::new();
        for y in 0..4u32 {
            for x in 0..4u32 {
                points.push([x as f64, y as f64, 0.0]);
                let id = y * 4 + x;
                if x > 0 {
                    edges.push((id - 1, id));
                }
                if y > 0 {
                    edges.push((id - 4, id));
                }
            }
        }
        graph(&points, &edges)
    }
}
