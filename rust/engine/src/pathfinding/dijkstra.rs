// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Multi-source Dijkstra seeded from every drain at once.
//!
//! One pass answers "which drain is nearest, how far, and which way" for
//! every vertex in the graph. The frontier is ordered by true path length;
//! among routes of exactly equal length, a small bias against routes where
//! water would have to climb on its way to the drain picks the winner.

use std::collections::BinaryHeap;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use super::{climb, prepare, DrainSet, Frontier, PathFailure, PathResult, PathStrategy};
use crate::graph::ConnectivityGraph;
use crate::types::VertexId;

/// Nearest drain of one vertex.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NearestDrain {
    pub drain: VertexId,
    /// True path length to `drain`.
    pub length: f64,
    /// Route length plus the climb bias; only breaks length ties.
    pub cost: f64,
}

/// Result of a multi-source pass, indexed by node.
#[derive(Debug, Clone)]
pub struct NearestDrainField {
    ids: Vec<VertexId>,
    index: FxHashMap<VertexId, usize>,
    length: Vec<f64>,
    cost: Vec<f64>,
    drain: Vec<Option<usize>>,
    /// Next hop toward the drain.
    next: Vec<Option<usize>>,
}

impl NearestDrainField {
    /// Runs the pass. Drain ids that are not in the graph are ignored.
    ///
    /// Moving from a settled vertex `u` out to neighbor `w` corresponds to
    /// water flowing `w → u`; when `u` sits higher than `w` the route cost
    /// grows by `uphill_bias × climb`. The cost is compared only between
    /// routes of equal length, so lengths are always shortest. Remaining
    /// ties settle lowest id first, so a vertex equidistant from two drains
    /// routes to the one whose frontier reaches it first in that order.
    pub fn compute(graph: &ConnectivityGraph, drains: &[VertexId], uphill_bias: f64) -> Self {
        let drain_set = DrainSet::new(graph, drains);
        Self::compute_with(graph, &drain_set, uphill_bias)
    }

    pub(crate) fn compute_with(
        graph: &ConnectivityGraph,
        drains: &DrainSet,
        uphill_bias: f64,
    ) -> Self {
        let n = graph.node_count();
        let mut length = vec![f64::INFINITY; n];
        let mut cost = vec![f64::INFINITY; n];
        let mut drain = vec![None; n];
        let mut next = vec![None; n];
        let mut settled = vec![false; n];
        let mut heap = BinaryHeap::new();
        let mut seq = 0u64;

        for &d in drains.nodes() {
            length[d] = 0.0;
            cost[d] = 0.0;
            drain[d] = Some(d);
            heap.push(Frontier {
                priority: 0.0,
                tie: 0.0,
                node: d,
                seq,
            });
            seq += 1;
        }

        while let Some(Frontier { node, .. }) = heap.pop() {
            if settled[node] {
                continue;
            }
            settled[node] = true;

            for (neighbor, weight) in graph.adjacent(node) {
                if settled[neighbor] {
                    continue;
                }
                let next_length = length[node] + weight;
                let next_cost = cost[node] + weight + uphill_bias * climb(graph, neighbor, node);
                let better = next_length < length[neighbor]
                    || (next_length == length[neighbor] && next_cost < cost[neighbor]);
                if better {
                    length[neighbor] = next_length;
                    cost[neighbor] = next_cost;
                    drain[neighbor] = drain[node];
                    next[neighbor] = Some(node);
                    heap.push(Frontier {
                        priority: next_length,
                        tie: next_cost,
                        node: neighbor,
                        seq,
                    });
                    seq += 1;
                }
            }
        }

        let ids: Vec<VertexId> = graph.vertices().iter().map(|v| v.id).collect();
        let index = ids.iter().enumerate().map(|(i, &id)| (id, i)).collect();
        Self {
            ids,
            index,
            length,
            cost,
            drain,
            next,
        }
    }

    fn index_of(&self, id: VertexId) -> Option<usize> {
        self.index.get(&id).copied()
    }

    /// Nearest drain of `id`, or `None` when no drain is reachable.
    pub fn nearest(&self, id: VertexId) -> Option<NearestDrain> {
        let idx = self.index_of(id)?;
        let drain = self.drain[idx]?;
        Some(NearestDrain {
            drain: self.ids[drain],
            length: self.length[idx],
            cost: self.cost[idx],
        })
    }

    /// Route from `id` to its nearest drain, start-first.
    pub fn path_from(&self, id: VertexId) -> Option<Vec<VertexId>> {
        let mut idx = self.index_of(id)?;
        self.drain[idx]?;
        let mut path = vec![self.ids[idx]];
        while let Some(hop) = self.next[idx] {
            path.push(self.ids[hop]);
            idx = hop;
        }
        Some(path)
    }

    /// Every vertex paired with its nearest drain, in id order.
    pub fn iter(&self) -> impl Iterator<Item = (VertexId, Option<NearestDrain>)> + '_ {
        self.ids.iter().map(move |&id| (id, self.nearest(id)))
    }

    pub fn reachable_count(&self) -> usize {
        self.drain.iter().filter(|d| d.is_some()).count()
    }
}

/// Dijkstra strategy: exact shortest true length, with equal-length routes
/// decided against the one that climbs toward the drain.
#[derive(Debug, Clone, Copy)]
pub struct DijkstraStrategy {
    pub uphill_bias: f64,
}

impl DijkstraStrategy {
    pub fn new(uphill_bias: f64) -> Self {
        Self { uphill_bias }
    }

    /// Nearest-drain data for every vertex in one pass.
    pub fn nearest_drains(
        &self,
        graph: &ConnectivityGraph,
        drains: &[VertexId],
    ) -> NearestDrainField {
        NearestDrainField::compute(graph, drains, self.uphill_bias)
    }
}

impl Default for DijkstraStrategy {
    fn default() -> Self {
        Self::new(0.1)
    }
}

impl PathStrategy for DijkstraStrategy {
    fn name(&self) -> &'static str {
        "dijkstra"
    }

    fn find_path(
        &self,
        graph: &ConnectivityGraph,
        start: VertexId,
        drains: &[VertexId],
    ) -> PathResult {
        let drain_set = match prepare(graph, start, drains) {
            Ok((_, drain_set)) => drain_set,
            Err(done) => return done,
        };

        let field = NearestDrainField::compute_with(graph, &drain_set, self.uphill_bias);
        match (field.nearest(start), field.path_from(start)) {
            (Some(nearest), Some(path)) => {
                PathResult::success(start, path, nearest.length, nearest.cost)
            }
            _ => PathResult::failure(start, PathFailure::Unreachable),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_graphs::*;
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn plus_shape_tip_routes_to_center() {
        let g = plus();
        let strategy = DijkstraStrategy::default();
        for tip in 1..=4 {
            let result = strategy.find_path(&g, VertexId(tip), &[VertexId(0)]);
            assert!(result.found);
            assert_eq!(result.path, vec![VertexId(tip), VertexId(0)]);
            assert_relative_eq!(result.length, 10.0);
        }
    }

    #[test]
    fn field_covers_every_vertex_in_one_pass() {
        let g = flat_grid();
        let field = DijkstraStrategy::default().nearest_drains(&g, &[VertexId(0), VertexId(15)]);
        assert_eq!(field.reachable_count(), 16);

        // Corner v3 is 3 from v0 and 3 from v15: equal, lowest drain id wins.
        let v3 = field.nearest(VertexId(3)).unwrap();
        assert_eq!(v3.drain, VertexId(0));
        assert_relative_eq!(v3.length, 3.0);

        let v14 = field.nearest(VertexId(14)).unwrap();
        assert_eq!(v14.drain, VertexId(15));
        assert_relative_eq!(v14.length, 1.0);
    }

    #[test]
    fn equidistant_tie_resolves_to_lowest_drain_id() {
        // d0 -- v1 -- d2, both arms length 1.
        let g = graph(
            &[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [2.0, 0.0, 0.0]],
            &[(0, 1), (1, 2)],
        );
        for _ in 0..10 {
            let field = NearestDrainField::compute(&g, &[VertexId(2), VertexId(0)], 0.1);
            assert_eq!(field.nearest(VertexId(1)).unwrap().drain, VertexId(0));
            assert_eq!(
                field.path_from(VertexId(1)).unwrap(),
                vec![VertexId(1), VertexId(0)]
            );
        }
    }

    #[test]
    fn path_is_shortest_by_true_length() {
        // v0 -- v1 -- v2 (drain) vs v0 -- v3 -- v2 with a long detour.
        let g = graph(
            &[
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [2.0, 0.0, 0.0],
                [1.0, 5.0, 0.0],
            ],
            &[(0, 1), (1, 2), (0, 3), (3, 2)],
        );
        let result = DijkstraStrategy::default().find_path(&g, VertexId(0), &[VertexId(2)]);
        assert_eq!(result.path, vec![VertexId(0), VertexId(1), VertexId(2)]);
        assert_relative_eq!(result.length, 2.0);
    }

    #[test]
    fn climb_bias_orders_but_length_stays_true() {
        // Two equal-length routes from v0 to drain v3; the one over v1 makes
        // water climb 1 unit, the one over v2 stays level.
        let g = graph(
            &[
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 1.0],
                [1.0, -1.0, 0.0],
                [2.0, 0.0, 0.0],
            ],
            &[(0, 1), (1, 3), (0, 2), (2, 3)],
        );
        let result = DijkstraStrategy::new(0.1).find_path(&g, VertexId(0), &[VertexId(3)]);
        assert_eq!(result.path, vec![VertexId(0), VertexId(2), VertexId(3)]);
        assert_relative_eq!(result.length, 2.0 * 2f64.sqrt(), epsilon = 1e-12);
        assert_relative_eq!(result.cost, result.length, epsilon = 1e-12);
    }

    #[test]
    fn unreachable_vertices_have_no_drain() {
        let g = split();
        let field = NearestDrainField::compute(&g, &[VertexId(0)], 0.1);
        assert!(field.nearest(VertexId(1)).is_some());
        assert!(field.nearest(VertexId(2)).is_none());
        assert!(field.path_from(VertexId(3)).is_none());

        let result = DijkstraStrategy::default().find_path(&g, VertexId(3), &[VertexId(0)]);
        assert_eq!(result.failure, Some(PathFailure::Unreachable));
    }
}
