// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Corner and high-point routing: one path query per landmark point.

use nalgebra::Point3;
use serde::{Deserialize, Serialize};

use crate::graph::ConnectivityGraph;
use crate::merge::nearest_vertex;
use crate::pathfinding::{PathResult, PathStrategy};
use crate::types::VertexId;

/// Per-point results plus summary counts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoutingReport {
    pub strategy: String,
    pub results: Vec<PathResult>,
    pub succeeded: usize,
    pub failed: usize,
}

impl RoutingReport {
    fn push(&mut self, result: PathResult) {
        if result.found {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
        self.results.push(result);
    }

    pub fn total(&self) -> usize {
        self.results.len()
    }

    /// Failed queries only.
    pub fn failures(&self) -> impl Iterator<Item = &PathResult> {
        self.results.iter().filter(|r| !r.found)
    }
}

/// Routes every start vertex to its nearest drain with `strategy`.
pub fn route_vertices(
    graph: &ConnectivityGraph,
    starts: &[VertexId],
    drains: &[VertexId],
    strategy: &dyn PathStrategy,
) -> RoutingReport {
    let mut report = RoutingReport {
        strategy: strategy.name().to_string(),
        ..RoutingReport::default()
    };
    for &start in starts {
        let result = strategy.find_path(graph, start, drains);
        if let Some(reason) = result.reason() {
            tracing::debug!(start = %start, %reason, "Route failed");
        }
        report.push(result);
    }

    tracing::info!(
        strategy = strategy.name(),
        succeeded = report.succeeded,
        failed = report.failed,
        "Corner routing: {} succeeded, {} failed",
        report.succeeded,
        report.failed
    );
    report
}

/// Snaps each landmark point to its nearest graph vertex and routes it.
///
/// Points snapping to the same vertex are routed once per point so the
/// results line up with the input.
pub fn route_points(
    graph: &ConnectivityGraph,
    points: &[Point3<f64>],
    drains: &[VertexId],
    strategy: &dyn PathStrategy,
) -> RoutingReport {
    let starts: Vec<VertexId> = points
        .iter()
        .filter_map(|p| nearest_vertex(graph.vertices(), p))
        .collect();
    if starts.len() < points.len() {
        tracing::warn!(
            points = points.len(),
            "Graph is empty, landmark points cannot be snapped"
        );
    }
    route_vertices(graph, &starts, drains, strategy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DrainageConfig;
    use crate::pathfinding::{PathFailure, Strategy};
    use crate::types::Vertex;

    /// Ridge at x = 0 sloping down to drains at both ends of a line.
    fn ridge() -> ConnectivityGraph {
        let mut g = ConnectivityGraph::new();
        let zs = [0.0, 0.5, 1.0, 0.5, 0.0];
        for (i, z) in zs.iter().enumerate() {
            g.add_vertex(Vertex::new(
                VertexId(i as u32),
                Point3::new(i as f64 - 2.0, 0.0, *z),
            ));
        }
        for i in 0..4u32 {
            g.connect(VertexId(i), VertexId(i + 1)).unwrap();
        }
        g
    }

    #[test]
    fn points_snap_and_route_to_nearest_drain() {
        let g = ridge();
        let config = DrainageConfig::default();
        let strategy = Strategy::Dijkstra.build(&config);
        let corners = [Point3::new(-1.1, 0.2, 0.5), Point3::new(1.2, 0.0, 0.4)];
        let report = route_points(&g, &corners, &[VertexId(0), VertexId(4)], strategy.as_ref());

        assert_eq!(report.strategy, "dijkstra");
        assert_eq!(report.succeeded, 2);
        assert_eq!(report.failed, 0);
        assert_eq!(report.results[0].path, vec![VertexId(1), VertexId(0)]);
        assert_eq!(report.results[1].path, vec![VertexId(3), VertexId(4)]);
    }

    #[test]
    fn failures_are_counted_not_dropped() {
        let g = ridge();
        let config = DrainageConfig::default();
        let strategy = Strategy::Greedy.build(&config);
        // Drain only at v0: from v3 greedy must climb to v2 after the
        // first step, which is refused.
        let report = route_vertices(
            &g,
            &[VertexId(1), VertexId(4)],
            &[VertexId(0)],
            strategy.as_ref(),
        );
        assert_eq!(report.total(), 2);
        assert_eq!(report.succeeded, 1);
        assert_eq!(report.failed, 1);
        let failure = report.failures().next().unwrap();
        assert_eq!(failure.start, VertexId(4));
        assert_eq!(
            failure.failure,
            Some(PathFailure::NoDownhillNeighbor {
                at: VertexId(3),
                steps: 1
            })
        );
    }

    #[test]
    fn empty_graph_yields_empty_report() {
        let g = ConnectivityGraph::new();
        let strategy = Strategy::AStar.build(&DrainageConfig::default());
        let report = route_points(&g, &[Point3::origin()], &[], strategy.as_ref());
        assert_eq!(report.total(), 0);
    }
}
