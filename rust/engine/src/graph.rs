// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Connectivity graph over canonical roof vertices.
//!
//! Two vertices are joined when the straight segment between them lies on
//! the roof surface and its length falls inside the configured bounds.
//! Construction tests every unordered pair, which is quadratic in the vertex
//! count; roofs carry hundreds to low thousands of crease and shape points,
//! and the length window discards most pairs before the sampled surface test
//! runs.
//!
//! Nodes are stored in ascending [`VertexId`] order, so node index order and
//! id order agree. The path finders rely on this for their tie-breaks.

use std::collections::VecDeque;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::config::DrainageConfig;
use crate::error::{Error, Result};
use crate::predicates::{point_in_loop, sample_count_for, segment_crosses_loop, segment_lies_on_surface};
use crate::surface::SurfaceQuery;
use crate::types::{BoundaryLoop, Vertex, VertexId};

/// An edge in the connectivity graph.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphEdge {
    /// Source node index.
    pub source: usize,
    /// Target node index.
    pub target: usize,
    /// Euclidean length of the segment.
    pub weight: f64,
}

/// Summary numbers for logging and reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphStats {
    pub nodes: usize,
    pub edges: usize,
    pub components: usize,
    pub isolated: usize,
    /// Vertices dropped because they sit inside a void.
    pub removed_in_voids: usize,
    /// Candidate edges rejected by the surface or void tests.
    pub rejected_edges: usize,
}

/// Undirected weighted graph of roof vertices.
#[derive(Debug, Clone, Default)]
pub struct ConnectivityGraph {
    nodes: Vec<Vertex>,
    edges: Vec<GraphEdge>,
    /// Adjacency list: node index → list of (neighbor index, edge index).
    adjacency: Vec<Vec<(usize, usize)>>,
    /// Map from vertex id to node index for fast lookup.
    id_to_node: FxHashMap<VertexId, usize>,
    removed_in_voids: usize,
    rejected_edges: usize,
}

impl ConnectivityGraph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the graph over `vertices`, keeping only on-surface edges whose
    /// length lies in `[config.min_edge, config.max_edge]`.
    pub fn build<S: SurfaceQuery + ?Sized>(
        vertices: &[Vertex],
        surface: &S,
        config: &DrainageConfig,
    ) -> Result<Self> {
        Self::build_with_voids(vertices, surface, config, &[])
    }

    /// Like [`build`](Self::build), but first drops vertices inside any void
    /// loop and then rejects edges that pass through a void, even when both
    /// endpoints are valid.
    ///
    /// Vertices on a void's rim are kept, along with their edges that lead
    /// away from the void.
    pub fn build_with_voids<S: SurfaceQuery + ?Sized>(
        vertices: &[Vertex],
        surface: &S,
        config: &DrainageConfig,
        voids: &[BoundaryLoop],
    ) -> Result<Self> {
        config.validate()?;

        let mut sorted: Vec<&Vertex> = vertices.iter().collect();
        sorted.sort_by_key(|v| v.id);

        let mut graph = Self::new();
        for v in sorted {
            if voids.iter().any(|lp| point_in_loop(&v.position, lp)) {
                tracing::debug!(vertex = %v.id, "Vertex inside void, removed");
                graph.removed_in_voids += 1;
                continue;
            }
            if graph.id_to_node.contains_key(&v.id) {
                continue;
            }
            graph.add_vertex(v.clone());
        }

        let n = graph.nodes.len();
        for i in 0..n {
            for j in (i + 1)..n {
                let a = graph.nodes[i].position;
                let b = graph.nodes[j].position;
                let length = (b - a).norm();
                if length < config.min_edge || length > config.max_edge {
                    continue;
                }

                let samples = sample_count_for(
                    length,
                    config.edge_sample_spacing,
                    config.min_edge_samples,
                    config.max_edge_samples,
                );
                if !segment_lies_on_surface(&a, &b, surface, samples, config.surface_tolerance) {
                    graph.rejected_edges += 1;
                    continue;
                }
                if voids.iter().any(|lp| segment_crosses_loop(&a, &b, lp)) {
                    graph.rejected_edges += 1;
                    continue;
                }

                graph.add_edge(i, j, length);
            }
        }

        let stats = graph.stats();
        tracing::info!(
            nodes = stats.nodes,
            edges = stats.edges,
            components = stats.components,
            isolated = stats.isolated,
            removed_in_voids = stats.removed_in_voids,
            rejected_edges = stats.rejected_edges,
            "Built connectivity graph"
        );

        Ok(graph)
    }

    // =========================================================================
    // Graph mutation
    // =========================================================================

    /// Adds a vertex. Returns its node index.
    ///
    /// Callers adding vertices by hand should add them in ascending id order
    /// to keep the deterministic tie-breaks meaningful.
    pub fn add_vertex(&mut self, vertex: Vertex) -> usize {
        let idx = self.nodes.len();
        self.id_to_node.insert(vertex.id, idx);
        self.nodes.push(vertex);
        self.adjacency.push(Vec::new());
        idx
    }

    /// Adds an undirected edge between two node indices.
    pub fn add_edge(&mut self, source: usize, target: usize, weight: f64) -> usize {
        let idx = self.edges.len();
        self.edges.push(GraphEdge {
            source,
            target,
            weight,
        });
        self.adjacency[source].push((target, idx));
        self.adjacency[target].push((source, idx));
        idx
    }

    /// Adds an edge between two vertex ids, weighted by their distance.
    pub fn connect(&mut self, a: VertexId, b: VertexId) -> Result<usize> {
        let ia = self.node_index(a).ok_or(Error::VertexNotFound(a))?;
        let ib = self.node_index(b).ok_or(Error::VertexNotFound(b))?;
        let weight = self.nodes[ia].distance_to(&self.nodes[ib]);
        Ok(self.add_edge(ia, ib, weight))
    }

    /// Overwrites the elevation of a vertex.
    pub fn set_elevation(&mut self, id: VertexId, elevation: f64) -> Result<()> {
        let idx = self.node_index(id).ok_or(Error::VertexNotFound(id))?;
        self.nodes[idx].elevation = elevation;
        Ok(())
    }

    // =========================================================================
    // Graph accessors
    // =========================================================================

    /// Returns the number of nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Returns the number of edges.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.nodes
    }

    pub fn edges(&self) -> &[GraphEdge] {
        &self.edges
    }

    /// Returns the node index for a vertex id.
    pub fn node_index(&self, id: VertexId) -> Option<usize> {
        self.id_to_node.get(&id).copied()
    }

    pub fn contains(&self, id: VertexId) -> bool {
        self.id_to_node.contains_key(&id)
    }

    pub fn vertex(&self, id: VertexId) -> Option<&Vertex> {
        self.node_index(id).map(|idx| &self.nodes[idx])
    }

    pub(crate) fn node(&self, idx: usize) -> &Vertex {
        &self.nodes[idx]
    }

    /// Neighbors of a node index as (neighbor index, edge weight) pairs.
    pub(crate) fn adjacent(&self, node: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.adjacency[node]
            .iter()
            .map(move |&(neighbor, edge_idx)| (neighbor, self.edges[edge_idx].weight))
    }

    /// Returns the neighbors of a vertex as (neighbor id, edge weight) pairs.
    pub fn neighbors(&self, id: VertexId) -> Vec<(VertexId, f64)> {
        match self.node_index(id) {
            Some(idx) => self
                .adjacent(idx)
                .map(|(n, w)| (self.nodes[n].id, w))
                .collect(),
            None => Vec::new(),
        }
    }

    /// Returns the degree (number of connections) of a vertex.
    pub fn degree(&self, id: VertexId) -> usize {
        self.node_index(id)
            .map(|idx| self.adjacency[idx].len())
            .unwrap_or(0)
    }

    /// Vertices with no edges at all.
    pub fn isolated_vertices(&self) -> Vec<VertexId> {
        (0..self.node_count())
            .filter(|&n| self.adjacency[n].is_empty())
            .map(|n| self.nodes[n].id)
            .collect()
    }

    // =========================================================================
    // Connected components
    // =========================================================================

    /// Returns connected components as lists of vertex ids.
    pub fn connected_components(&self) -> Vec<Vec<VertexId>> {
        let n = self.node_count();
        let mut visited = vec![false; n];
        let mut components = Vec::new();

        for start in 0..n {
            if visited[start] {
                continue;
            }

            let mut component = Vec::new();
            let mut queue = VecDeque::new();
            visited[start] = true;
            queue.push_back(start);

            while let Some(node) = queue.pop_front() {
                component.push(self.nodes[node].id);
                for &(neighbor, _) in &self.adjacency[node] {
                    if !visited[neighbor] {
                        visited[neighbor] = true;
                        queue.push_back(neighbor);
                    }
                }
            }

            components.push(component);
        }

        components
    }

    /// Checks if the graph is connected (at most one component).
    pub fn is_connected(&self) -> bool {
        self.connected_components().len() <= 1
    }

    pub fn stats(&self) -> GraphStats {
        GraphStats {
            nodes: self.node_count(),
            edges: self.edge_count(),
            components: self.connected_components().len(),
            isolated: self.isolated_vertices().len(),
            removed_in_voids: self.removed_in_voids,
            rejected_edges: self.rejected_edges,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::VertexMerger;
    use crate::surface::PlanarSurface;
    use nalgebra::{Point2, Point3};

    fn square_surface(size: f64) -> PlanarSurface {
        PlanarSurface::horizontal(
            &[
                Point2::new(0.0, 0.0),
                Point2::new(size, 0.0),
                Point2::new(size, size),
                Point2::new(0.0, size),
            ],
            &[],
            0.0,
        )
        .unwrap()
        .with_edge_tolerance(1e-6)
    }

    fn grid_vertices(n: usize, spacing: f64) -> Vec<Vertex> {
        let mut merger = VertexMerger::new(1e-4).unwrap();
        for y in 0..n {
            for x in 0..n {
                merger.insert(Point3::new(x as f64 * spacing, y as f64 * spacing, 0.0));
            }
        }
        merger.into_vertices()
    }

    fn linear_graph() -> ConnectivityGraph {
        // v0 --1-- v1 --2-- v2 --3-- v3
        let mut g = ConnectivityGraph::new();
        for (i, x) in [0.0, 1.0, 3.0, 6.0].into_iter().enumerate() {
            g.add_vertex(Vertex::new(VertexId(i as u32), Point3::new(x, 0.0, 0.0)));
        }
        g.connect(VertexId(0), VertexId(1)).unwrap();
        g.connect(VertexId(1), VertexId(2)).unwrap();
        g.connect(VertexId(2), VertexId(3)).unwrap();
        g
    }

    #[test]
    fn graph_basic_properties() {
        let g = linear_graph();
        assert_eq!(g.node_count(), 4);
        assert_eq!(g.edge_count(), 3);
        assert_eq!(g.degree(VertexId(0)), 1);
        assert_eq!(g.degree(VertexId(1)), 2);
        assert_eq!(g.degree(VertexId(9)), 0);
        let n: Vec<_> = g.neighbors(VertexId(2));
        assert_eq!(n, vec![(VertexId(1), 2.0), (VertexId(3), 3.0)]);
    }

    #[test]
    fn connect_unknown_vertex_fails() {
        let mut g = linear_graph();
        assert!(matches!(
            g.connect(VertexId(0), VertexId(42)),
            Err(Error::VertexNotFound(VertexId(42)))
        ));
    }

    #[test]
    fn build_respects_length_window() {
        let vertices = grid_vertices(3, 1.0);
        let surface = square_surface(2.0);
        let config = DrainageConfig {
            min_edge: 0.5,
            max_edge: 1.0,
            ..Default::default()
        };
        let g = ConnectivityGraph::build(&vertices, &surface, &config).unwrap();

        // 3x3 grid with unit spacing: 12 axis-aligned neighbours only.
        assert_eq!(g.node_count(), 9);
        assert_eq!(g.edge_count(), 12);
        for e in g.edges() {
            assert!(e.weight >= 0.5 && e.weight <= 1.0);
        }
        assert!(g.is_connected());
    }

    #[test]
    fn build_adds_diagonals_when_window_allows() {
        let vertices = grid_vertices(2, 1.0);
        let surface = square_surface(1.0);
        let config = DrainageConfig {
            min_edge: 0.1,
            max_edge: 1.5,
            ..Default::default()
        };
        let g = ConnectivityGraph::build(&vertices, &surface, &config).unwrap();
        assert_eq!(g.edge_count(), 6);
    }

    #[test]
    fn off_surface_edges_are_rejected() {
        // L-shaped roof: the diagonal across the notch leaves the surface.
        let surface = PlanarSurface::horizontal(
            &[
                Point2::new(0.0, 0.0),
                Point2::new(2.0, 0.0),
                Point2::new(2.0, 1.0),
                Point2::new(1.0, 1.0),
                Point2::new(1.0, 2.0),
                Point2::new(0.0, 2.0),
            ],
            &[],
            0.0,
        )
        .unwrap();
        let vertices = vec![
            Vertex::new(VertexId(0), Point3::new(2.0, 1.0, 0.0)),
            Vertex::new(VertexId(1), Point3::new(1.0, 2.0, 0.0)),
            Vertex::new(VertexId(2), Point3::new(0.0, 0.0, 0.0)),
        ];
        let config = DrainageConfig {
            max_edge: 5.0,
            ..Default::default()
        };
        let g = ConnectivityGraph::build(&vertices, &surface, &config).unwrap();

        assert_eq!(g.degree(VertexId(0)), 1);
        assert_eq!(g.degree(VertexId(1)), 1);
        assert!(g.neighbors(VertexId(0)).iter().all(|(n, _)| *n == VertexId(2)));
        assert_eq!(g.stats().rejected_edges, 1);
    }

    #[test]
    fn voids_remove_vertices_and_crossing_edges() {
        let vertices = vec![
            Vertex::new(VertexId(0), Point3::new(1.0, 5.0, 0.0)),
            Vertex::new(VertexId(1), Point3::new(9.0, 5.0, 0.0)),
            Vertex::new(VertexId(2), Point3::new(5.0, 5.0, 0.0)),
            Vertex::new(VertexId(3), Point3::new(1.0, 1.0, 0.0)),
        ];
        let void = BoundaryLoop::polygon(&[
            Point3::new(4.0, 4.0, 0.0),
            Point3::new(6.0, 4.0, 0.0),
            Point3::new(6.0, 6.0, 0.0),
            Point3::new(4.0, 6.0, 0.0),
        ]);
        let config = DrainageConfig {
            max_edge: 20.0,
            ..Default::default()
        };
        let g = ConnectivityGraph::build_with_voids(
            &vertices,
            &square_surface(10.0),
            &config,
            &[void],
        )
        .unwrap();

        assert!(!g.contains(VertexId(2)));
        assert_eq!(g.stats().removed_in_voids, 1);
        // v0-v1 crosses the void; v0-v3 and v1-v3 stay.
        assert!(g.neighbors(VertexId(0)).iter().all(|(n, _)| *n != VertexId(1)));
        assert_eq!(g.edge_count(), 2);
    }

    #[test]
    fn rim_vertices_stay_connected_outside_the_void() {
        let vertices = vec![
            Vertex::new(VertexId(0), Point3::new(1.0, 5.0, 0.0)),
            Vertex::new(VertexId(1), Point3::new(4.0, 5.0, 0.0)),
            Vertex::new(VertexId(2), Point3::new(6.0, 5.0, 0.0)),
            Vertex::new(VertexId(3), Point3::new(9.0, 5.0, 0.0)),
        ];
        let void = BoundaryLoop::polygon(&[
            Point3::new(4.0, 4.0, 0.0),
            Point3::new(6.0, 4.0, 0.0),
            Point3::new(6.0, 6.0, 0.0),
            Point3::new(4.0, 6.0, 0.0),
        ]);
        let config = DrainageConfig {
            max_edge: 20.0,
            ..Default::default()
        };
        let g = ConnectivityGraph::build_with_voids(
            &vertices,
            &square_surface(10.0),
            &config,
            &[void],
        )
        .unwrap();

        assert_eq!(g.stats().removed_in_voids, 0);
        assert_eq!(g.stats().isolated, 0);
        // Only v0-v1 and v2-v3 avoid the void; the rest span it.
        assert_eq!(g.edge_count(), 2);
        assert_eq!(g.stats().components, 2);
        assert!(g.neighbors(VertexId(1)).iter().all(|(n, _)| *n == VertexId(0)));
        assert!(g.neighbors(VertexId(2)).iter().all(|(n, _)| *n == VertexId(3)));
    }

    #[test]
    fn invalid_config_fails_fast() {
        let config = DrainageConfig {
            node_tolerance: -1.0,
            ..Default::default()
        };
        let result = ConnectivityGraph::build(&[], &square_surface(1.0), &config);
        assert!(result.is_err());
    }

    #[test]
    fn components_and_isolated_vertices() {
        let mut g = ConnectivityGraph::new();
        for i in 0..4 {
            g.add_vertex(Vertex::new(VertexId(i), Point3::new(i as f64, 0.0, 0.0)));
        }
        g.connect(VertexId(0), VertexId(1)).unwrap();

        let cc = g.connected_components();
        assert_eq!(cc.len(), 3);
        assert_eq!(g.isolated_vertices(), vec![VertexId(2), VertexId(3)]);
        assert!(!g.is_connected());
    }

    #[test]
    fn set_elevation_updates_vertex() {
        let mut g = linear_graph();
        g.set_elevation(VertexId(2), 0.75).unwrap();
        assert_eq!(g.vertex(VertexId(2)).unwrap().elevation, 0.75);
        assert!(g.set_elevation(VertexId(99), 1.0).is_err());
    }
}
