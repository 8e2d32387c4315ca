// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Single-start A* toward the nearest drain.
//!
//! The step cost adds `uphill_penalty × climb` on top of the edge length,
//! while the heuristic is the straight-line distance to the closest drain.
//! Because the heuristic ignores the climb penalty it is not admissible
//! against the penalised cost, so the search trades optimality for
//! expanding fewer vertices on large roofs.

use std::collections::BinaryHeap;

use nalgebra::Point3;

use super::{climb, prepare, reconstruct, Frontier, PathFailure, PathResult, PathStrategy};
use crate::graph::ConnectivityGraph;
use crate::types::VertexId;

#[derive(Debug, Clone, Copy)]
pub struct AStarStrategy {
    pub uphill_penalty: f64,
}

impl AStarStrategy {
    pub fn new(uphill_penalty: f64) -> Self {
        Self { uphill_penalty }
    }
}

impl Default for AStarStrategy {
    fn default() -> Self {
        Self::new(10.0)
    }
}

fn heuristic(position: &Point3<f64>, targets: &[Point3<f64>]) -> f64 {
    targets
        .iter()
        .map(|t| (t - position).norm())
        .fold(f64::INFINITY, f64::min)
}

impl PathStrategy for AStarStrategy {
    fn name(&self) -> &'static str {
        "astar"
    }

    fn find_path(
        &self,
        graph: &ConnectivityGraph,
        start: VertexId,
        drains: &[VertexId],
    ) -> PathResult {
        let (start_idx, drain_set) = match prepare(graph, start, drains) {
            Ok(ready) => ready,
            Err(done) => return done,
        };

        let targets: Vec<Point3<f64>> = drain_set
            .nodes()
            .iter()
            .map(|&n| graph.node(n).position)
            .collect();

        let n = graph.node_count();
        let mut g_score = vec![f64::INFINITY; n];
        let mut length = vec![f64::INFINITY; n];
        let mut came_from: Vec<Option<usize>> = vec![None; n];
        let mut closed = vec![false; n];
        let mut heap = BinaryHeap::new();
        let mut seq = 0u64;

        g_score[start_idx] = 0.0;
        length[start_idx] = 0.0;
        heap.push(Frontier {
            priority: heuristic(&graph.node(start_idx).position, &targets),
            tie: 0.0,
            node: start_idx,
            seq,
        });

        while let Some(Frontier { node, .. }) = heap.pop() {
            if closed[node] {
                continue;
            }
            if drain_set.contains(node) {
                let path = reconstruct(graph, &came_from, node);
                return PathResult::success(start, path, length[node], g_score[node]);
            }
            closed[node] = true;

            for (neighbor, weight) in graph.adjacent(node) {
                if closed[neighbor] {
                    continue;
                }
                let tentative =
                    g_score[node] + weight + self.uphill_penalty * climb(graph, node, neighbor);
                if tentative < g_score[neighbor] {
                    g_score[neighbor] = tentative;
                    length[neighbor] = length[node] + weight;
                    came_from[neighbor] = Some(node);
                    seq += 1;
                    heap.push(Frontier {
                        priority: tentative
                            + heuristic(&graph.node(neighbor).position, &targets),
                        tie: 0.0,
                        node: neighbor,
                        seq,
                    });
                }
            }
        }

        PathResult::failure(start, PathFailure::Unreachable)
    }
}
