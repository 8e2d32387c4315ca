// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Drain detection from opening boundary loops.
//!
//! Each loop is classified independently, trying the strongest evidence
//! first:
//!
//! 1. Two or more arcs sharing (nearly) the same center and radius, or a
//!    single arc sweeping the full turn, give a circle directly.
//! 2. Otherwise an algebraic least-squares (Kåsa) circle fit over the loop
//!    samples, accepted when the mean radial residual is small.
//! 3. Otherwise the axis-aligned bounding box of the samples, classified as
//!    square, rectangle, polygon or mixed.
//!
//! Candidates outside the configured size window are dropped. A loop that
//! fails to classify is logged and skipped; detection never aborts the batch.

use std::f64::consts::{FRAC_PI_2, TAU};

use nalgebra::{Matrix3, Point2, Point3, Vector3};
use smallvec::SmallVec;

use crate::config::DrainageConfig;
use crate::error::{Error, Result};
use crate::graph::ConnectivityGraph;
use crate::merge::nearest_vertex;
use crate::predicates::is_point_on_surface;
use crate::surface::SurfaceQuery;
use crate::types::{BoundaryLoop, BoundarySegment, DrainItem, DrainShape, Footprint, VertexId};

/// Normalised fits below this determinant are treated as singular.
const SINGULAR_DETERMINANT: f64 = 1e-10;

/// Sweep shortfall (radians) still accepted as a full circle.
const FULL_SWEEP_TOLERANCE: f64 = 1e-6;

type Samples = SmallVec<[Point3<f64>; 16]>;

/// A circle in the XY plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CircleFit {
    pub center: Point2<f64>,
    pub radius: f64,
    /// Mean absolute distance of the samples from the circle.
    pub mean_residual: f64,
}

/// Classifies opening loops into drains.
#[derive(Debug, Clone)]
pub struct DrainDetector {
    config: DrainageConfig,
}

impl DrainDetector {
    pub fn new(config: &DrainageConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config: config.clone(),
        })
    }

    /// Detects drains in every loop, deduplicated by center and sorted by
    /// ascending footprint area.
    pub fn detect<S: SurfaceQuery + ?Sized>(
        &self,
        loops: &[BoundaryLoop],
        surface: &S,
    ) -> Vec<DrainItem> {
        let mut drains: Vec<DrainItem> = Vec::with_capacity(loops.len());
        let mut rejected = 0usize;

        for (index, boundary) in loops.iter().enumerate() {
            match self.classify(boundary, surface) {
                Ok(Some(drain)) => {
                    let duplicate = drains.iter().any(|d| {
                        (d.center - drain.center).norm() <= self.config.drain_dedup_tolerance
                    });
                    if duplicate {
                        tracing::debug!(loop_index = index, "Duplicate drain center, skipped");
                    } else {
                        drains.push(drain);
                    }
                }
                Ok(None) => rejected += 1,
                Err(e) => {
                    tracing::debug!(loop_index = index, error = %e, "Skipping opening loop");
                    rejected += 1;
                }
            }
        }

        // Stable, so equal areas keep loop order.
        drains.sort_by(|a, b| a.area().total_cmp(&b.area()));

        tracing::debug!(
            loops = loops.len(),
            drains = drains.len(),
            rejected,
            "Drain detection complete"
        );
        drains
    }

    /// Classifies a single loop. `Ok(None)` means the loop was measured but
    /// falls outside the drain size window.
    pub fn classify<S: SurfaceQuery + ?Sized>(
        &self,
        boundary: &BoundaryLoop,
        surface: &S,
    ) -> Result<Option<DrainItem>> {
        if boundary.is_empty() {
            return Err(Error::DegenerateLoop("loop has no segments".to_string()));
        }

        let samples = self.collect_samples(boundary, surface);
        if samples.len() < 3 {
            return Err(Error::DegenerateLoop(format!(
                "{} distinct samples",
                samples.len()
            )));
        }
        let z = samples.iter().map(|p| p.z).sum::<f64>() / samples.len() as f64;

        let drain = if let Some((center, radius)) = self.arc_cluster(boundary) {
            self.circle_drain(Point3::new(center.x, center.y, z), radius)
        } else if let Some(fit) = self.accepted_fit(&samples)? {
            self.circle_drain(Point3::new(fit.center.x, fit.center.y, z), fit.radius)
        } else {
            self.box_drain(boundary, &samples, z)
        };

        let (lo, hi) = (self.config.min_drain_size, self.config.max_drain_size);
        if drain.width < lo || drain.width > hi || drain.height < lo || drain.height > hi {
            tracing::trace!(
                width = drain.width,
                height = drain.height,
                shape = %drain.shape,
                "Opening outside drain size window"
            );
            return Ok(None);
        }
        Ok(Some(drain))
    }

    // =========================================================================
    // Sampling
    // =========================================================================

    /// Segment endpoints plus interior arc points at most a quarter turn
    /// apart, projected onto the surface where possible and deduplicated.
    fn collect_samples<S: SurfaceQuery + ?Sized>(
        &self,
        boundary: &BoundaryLoop,
        surface: &S,
    ) -> Samples {
        let mut samples = Samples::new();
        let tolerance = self.config.node_tolerance;

        let mut push = |p: Point3<f64>| {
            let p = surface.project(&p).map(|proj| proj.point).unwrap_or(p);
            if !samples.iter().any(|q| (q - p).norm() <= tolerance) {
                samples.push(p);
            }
        };

        for segment in &boundary.segments {
            push(segment.start());
            if segment.is_arc() {
                let steps = ((segment.sweep() / FRAC_PI_2 - 1e-9).ceil() as usize).max(2);
                for i in 1..steps {
                    push(segment.point_at(i as f64 / steps as f64));
                }
            }
            push(segment.end());
        }
        samples
    }

    // =========================================================================
    // Circle evidence
    // =========================================================================

    /// Average center and radius of the largest group of matching arcs,
    /// when at least two arcs agree. A lone arc counts when it sweeps the
    /// full circle.
    fn arc_cluster(&self, boundary: &BoundaryLoop) -> Option<(Point2<f64>, f64)> {
        let arcs: SmallVec<[(Point2<f64>, f64, f64); 8]> = boundary
            .segments
            .iter()
            .filter_map(|s| match s {
                BoundarySegment::Arc { center, radius, .. } => {
                    Some((Point2::new(center.x, center.y), *radius, s.sweep()))
                }
                BoundarySegment::Line { .. } => None,
            })
            .collect();
        if let [(center, radius, sweep)] = arcs.as_slice() {
            return (*sweep >= TAU - FULL_SWEEP_TOLERANCE).then_some((*center, *radius));
        }
        if arcs.len() < 2 {
            return None;
        }

        let scale = self.config.drain_unit_scale;
        let tolerance = self.config.arc_cluster_tolerance;
        let mut clusters: Vec<SmallVec<[usize; 8]>> = Vec::new();
        for (i, (center, radius, _)) in arcs.iter().enumerate() {
            let home = clusters.iter_mut().find(|members| {
                let (c0, r0, _) = arcs[members[0]];
                (center - c0).norm() * scale <= tolerance
                    && (radius - r0).abs() * scale <= tolerance
            });
            match home {
                Some(members) => members.push(i),
                None => clusters.push(SmallVec::from_slice(&[i])),
            }
        }

        // First cluster wins among equals.
        let mut best = &clusters[0];
        for c in &clusters[1..] {
            if c.len() > best.len() {
                best = c;
            }
        }
        if best.len() < 2 {
            return None;
        }

        let n = best.len() as f64;
        let (sx, sy, sr) = best.iter().fold((0.0, 0.0, 0.0), |(sx, sy, sr), &i| {
            let (c, r, _) = arcs[i];
            (sx + c.x, sy + c.y, sr + r)
        });
        Some((Point2::new(sx / n, sy / n), sr / n))
    }

    /// Kåsa fit over the samples, kept only when it explains them well.
    fn accepted_fit(&self, samples: &[Point3<f64>]) -> Result<Option<CircleFit>> {
        if samples.len() < self.config.min_fit_points {
            return Ok(None);
        }
        let points: SmallVec<[Point2<f64>; 16]> =
            samples.iter().map(|p| Point2::new(p.x, p.y)).collect();
        let fit = fit_circle(&points)?;
        if fit.mean_residual <= self.config.circle_fit_residual * fit.radius {
            Ok(Some(fit))
        } else {
            tracing::trace!(
                radius = fit.radius,
                residual = fit.mean_residual,
                "Circle fit rejected"
            );
            Ok(None)
        }
    }

    fn circle_drain(&self, center: Point3<f64>, radius: f64) -> DrainItem {
        let diameter = 2.0 * radius * self.config.drain_unit_scale;
        DrainItem {
            center,
            width: diameter,
            height: diameter,
            shape: DrainShape::Circle,
            footprint: Footprint::Circle {
                center: Point2::new(center.x, center.y),
                radius,
            },
        }
    }

    // =========================================================================
    // Bounding box fallback
    // =========================================================================

    fn box_drain(&self, boundary: &BoundaryLoop, samples: &[Point3<f64>], z: f64) -> DrainItem {
        let mut min = Point2::new(f64::INFINITY, f64::INFINITY);
        let mut max = Point2::new(f64::NEG_INFINITY, f64::NEG_INFINITY);
        for p in samples {
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
        }

        let scale = self.config.drain_unit_scale;
        let width = (max.x - min.x) * scale;
        let height = (max.y - min.y) * scale;

        let shape = if (width - height).abs() <= self.config.square_tolerance {
            DrainShape::Square
        } else if boundary.arc_count() > 0 {
            DrainShape::MixedShape
        } else if boundary.segments.len() == 4 {
            DrainShape::Rectangle
        } else {
            DrainShape::Polygon
        };

        DrainItem {
            center: Point3::new((min.x + max.x) / 2.0, (min.y + max.y) / 2.0, z),
            width,
            height,
            shape,
            footprint: Footprint::Box { min, max },
        }
    }
}

/// Algebraic least-squares circle fit (Kåsa).
///
/// Solves `x² + y² + D·x + E·y + F = 0` in the least-squares sense. Points
/// are centered and scaled first so the normal equations stay well
/// conditioned for both tiny and large openings.
pub fn fit_circle(points: &[Point2<f64>]) -> Result<CircleFit> {
    let n = points.len();
    if n < 3 {
        return Err(Error::SingularFit { points: n });
    }

    let inv_n = 1.0 / n as f64;
    let mean = Point2::new(
        points.iter().map(|p| p.x).sum::<f64>() * inv_n,
        points.iter().map(|p| p.y).sum::<f64>() * inv_n,
    );
    let spread = (points
        .iter()
        .map(|p| (p.x - mean.x).powi(2) + (p.y - mean.y).powi(2))
        .sum::<f64>()
        * inv_n)
        .sqrt();
    if !(spread.is_finite() && spread > 0.0) {
        return Err(Error::SingularFit { points: n });
    }

    let mut ata = Matrix3::<f64>::zeros();
    let mut atb = Vector3::<f64>::zeros();
    for p in points {
        let x = (p.x - mean.x) / spread;
        let y = (p.y - mean.y) / spread;
        let row = Vector3::new(x, y, 1.0);
        ata += row * row.transpose();
        atb -= row * (x * x + y * y);
    }

    if ata.determinant().abs() * inv_n.powi(3) < SINGULAR_DETERMINANT {
        return Err(Error::SingularFit { points: n });
    }
    let inv = ata.try_inverse().ok_or(Error::SingularFit { points: n })?;
    let solution = inv * atb;
    let (d, e, f) = (solution.x, solution.y, solution.z);

    let cx = -d / 2.0;
    let cy = -e / 2.0;
    let r_sq = cx * cx + cy * cy - f;
    if !(r_sq.is_finite() && r_sq > 0.0) {
        return Err(Error::SingularFit { points: n });
    }

    let center = Point2::new(cx * spread + mean.x, cy * spread + mean.y);
    let radius = r_sq.sqrt() * spread;
    let mean_residual = points
        .iter()
        .map(|p| ((p - center).norm() - radius).abs())
        .sum::<f64>()
        * inv_n;

    Ok(CircleFit {
        center,
        radius,
        mean_residual,
    })
}

/// Graph vertices that act as drain terminals.
///
/// A vertex qualifies when it lies inside a drain footprint (grown by
/// `drain_capture_tolerance`) and on the surface. A drain whose footprint
/// captures nothing snaps its center to the nearest vertex instead. The
/// result is sorted and free of duplicates.
pub fn drain_vertices<S: SurfaceQuery + ?Sized>(
    graph: &ConnectivityGraph,
    drains: &[DrainItem],
    surface: &S,
    config: &DrainageConfig,
) -> Vec<VertexId> {
    let mut out = Vec::new();
    for drain in drains {
        let before = out.len();
        out.extend(
            graph
                .vertices()
                .iter()
                .filter(|v| drain.contains(&v.position, config.drain_capture_tolerance))
                .filter(|v| is_point_on_surface(&v.position, surface, config.surface_tolerance))
                .map(|v| v.id),
        );
        if out.len() == before {
            if let Some(id) = nearest_vertex(graph.vertices(), &drain.center) {
                tracing::debug!(
                    shape = %drain.shape,
                    vertex = %id,
                    "Drain snapped to nearest vertex"
                );
                out.push(id);
            }
        }
    }
    out.sort_unstable();
    out.dedup();
    out
}
