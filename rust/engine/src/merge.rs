// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Tolerance-based deduplication of raw sample points into canonical
//! graph vertices.
//!
//! Raw roof samples arrive once per source curve, so shared corners show up
//! several times. The merger keeps the first-seen position of each cluster
//! (no averaging) and hands out ids in creation order. Candidate lookup goes
//! through a uniform grid hash whose cell size equals the tolerance; the
//! 3x3x3 neighbourhood covers every point within tolerance, so the result
//! matches a pairwise scan exactly.

use nalgebra::Point3;
use rustc_hash::FxHashMap;

use crate::error::{Error, Result};
use crate::types::{Vertex, VertexId};

/// Canonical vertex set under construction.
#[derive(Debug, Clone)]
pub struct VertexMerger {
    tolerance: f64,
    vertices: Vec<Vertex>,
    grid: FxHashMap<(i64, i64, i64), Vec<VertexId>>,
    /// Raw inputs seen, including merged duplicates.
    inserted: usize,
}

impl VertexMerger {
    /// Creates an empty merger. The tolerance must be positive and finite.
    pub fn new(tolerance: f64) -> Result<Self> {
        if !(tolerance.is_finite() && tolerance > 0.0) {
            return Err(Error::InvalidConfig {
                field: "node_tolerance",
                expected: "finite and greater than zero",
                value: tolerance,
            });
        }
        Ok(Self {
            tolerance,
            vertices: Vec::new(),
            grid: FxHashMap::default(),
            inserted: 0,
        })
    }

    /// Merges a whole point list in order.
    pub fn merge_points(points: &[Point3<f64>], tolerance: f64) -> Result<Self> {
        let mut merger = Self::new(tolerance)?;
        merger.extend(points.iter().copied());
        Ok(merger)
    }

    pub fn extend(&mut self, points: impl IntoIterator<Item = Point3<f64>>) {
        for p in points {
            self.insert(p);
        }
    }

    /// Returns the id of the canonical vertex within tolerance of `point`,
    /// creating a new vertex when there is none.
    ///
    /// When several canonical vertices are within tolerance the lowest id
    /// wins, which is the first one created.
    pub fn insert(&mut self, point: Point3<f64>) -> VertexId {
        self.inserted += 1;
        if let Some(existing) = self.find_within_tolerance(&point) {
            return existing;
        }

        let id = VertexId(self.vertices.len() as u32);
        self.vertices.push(Vertex::new(id, point));
        let cell = self.cell_coords(&point);
        self.grid.entry(cell).or_default().push(id);
        id
    }

    /// Lowest-id canonical vertex within tolerance, if any.
    pub fn find_within_tolerance(&self, point: &Point3<f64>) -> Option<VertexId> {
        let (cx, cy, cz) = self.cell_coords(point);
        let tol_sq = self.tolerance * self.tolerance;
        let mut best: Option<VertexId> = None;

        for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    let Some(ids) = self.grid.get(&(cx + dx, cy + dy, cz + dz)) else {
                        continue;
                    };
                    for &id in ids {
                        let v = &self.vertices[id.index()];
                        if (v.position - point).norm_squared() <= tol_sq
                            && best.map_or(true, |b| id < b)
                        {
                            best = Some(id);
                        }
                    }
                }
            }
        }

        best
    }

    /// Nearest canonical vertex to `point`, regardless of tolerance.
    ///
    /// Used to map external landmarks (corners, drain centers) onto the
    /// graph. Equal distances resolve to the lowest id.
    pub fn snap_point(&self, point: &Point3<f64>) -> Option<VertexId> {
        nearest_vertex(&self.vertices, point)
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn vertex(&self, id: VertexId) -> Option<&Vertex> {
        self.vertices.get(id.index())
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Number of raw inputs that collapsed onto an existing vertex.
    pub fn merged_count(&self) -> usize {
        self.inserted - self.vertices.len()
    }

    pub fn into_vertices(self) -> Vec<Vertex> {
        self.vertices
    }

    fn cell_coords(&self, p: &Point3<f64>) -> (i64, i64, i64) {
        (
            (p.x / self.tolerance).floor() as i64,
            (p.y / self.tolerance).floor() as i64,
            (p.z / self.tolerance).floor() as i64,
        )
    }
}

/// Linear nearest-vertex scan with lowest-id tie-break.
pub(crate) fn nearest_vertex<'a>(
    vertices: impl IntoIterator<Item = &'a Vertex>,
    point: &Point3<f64>,
) -> Option<VertexId> {
    let mut best: Option<(VertexId, f64)> = None;
    for v in vertices {
        let d = (v.position - point).norm_squared();
        let better = match best {
            None => true,
            Some((id, bd)) => d < bd || (d == bd && v.id < id),
        };
        if better {
            best = Some((v.id, d));
        }
    }
    best.map(|(id, _)| id)
}
