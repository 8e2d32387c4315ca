// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Greedy downhill walk ("forced corner mode").
//!
//! Follows the water: at each vertex, step to the unvisited neighbor with
//! the lowest `max(0, dz) × uphill_penalty + distance`. Only the first step
//! may climb, which lets a corner vertex sitting in a small dip get out of
//! it. After that any rise beyond `downhill_tolerance` is refused, and the
//! walk fails where it gets stuck instead of backtracking.

use super::{prepare, PathFailure, PathResult, PathStrategy};
use crate::graph::ConnectivityGraph;
use crate::types::VertexId;

#[derive(Debug, Clone, Copy)]
pub struct GreedyDownhillStrategy {
    pub uphill_penalty: f64,
    pub downhill_tolerance: f64,
}

impl GreedyDownhillStrategy {
    pub fn new(uphill_penalty: f64, downhill_tolerance: f64) -> Self {
        Self {
            uphill_penalty,
            downhill_tolerance,
        }
    }
}

impl Default for GreedyDownhillStrategy {
    fn default() -> Self {
        Self::new(10.0, 1e-6)
    }
}

impl PathStrategy for GreedyDownhillStrategy {
    fn name(&self) -> &'static str {
        "greedy"
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

        let mut visited = vec![false; graph.node_count()];
        let mut path = vec![start];
        let mut length = 0.0;
        let mut cost = 0.0;
        let mut current = start_idx;
        visited[current] = true;

        loop {
            let steps = path.len() - 1;
            let z = graph.node(current).height();

            // (score, node, weight); adjacency order is arbitrary so ties
            // are broken on node index explicitly.
            let mut best: Option<(f64, usize, f64)> = None;
            for (neighbor, weight) in graph.adjacent(current) {
                if visited[neighbor] {
                    continue;
                }
                let dz = graph.node(neighbor).height() - z;
                if steps > 0 && dz > self.downhill_tolerance {
                    continue;
                }
                let score = dz.max(0.0) * self.uphill_penalty + weight;
                let better = match best {
                    None => true,
                    Some((s, n, _)) => score < s || (score == s && neighbor < n),
                };
                if better {
                    best = Some((score, neighbor, weight));
                }
            }

            let Some((score, next, weight)) = best else {
                return PathResult::failure(
                    start,
                    PathFailure::NoDownhillNeighbor {
                        at: graph.node(current).id,
                        steps,
                    },
                );
            };

            visited[next] = true;
            path.push(graph.node(next).id);
            length += weight;
            cost += score;
            current = next;

            if drain_set.contains(current) {
                return PathResult::success(start, path, length, cost);
            }
        }
    }
}
