// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Point and segment membership tests against surfaces and boundary loops.
//!
//! Everything here is a pure predicate: failures (projection outside the
//! face, degenerate loops) answer `false` instead of erroring.

use nalgebra::{Point2, Point3};
use smallvec::SmallVec;

use crate::surface::SurfaceQuery;
use crate::types::{BoundaryLoop, BoundarySegment};

/// Added to the ray-crossing denominator so horizontal polygon edges never
/// divide by zero.
const RAY_EPSILON: f64 = 1e-9;

/// Arc subdivision used when a loop is flattened for containment tests.
const LOOP_FLATTEN_ANGLE: f64 = std::f64::consts::PI / 32.0;

/// Distance within which a point counts as touching a loop's rim rather than
/// lying inside it.
pub const CONTACT_TOLERANCE: f64 = 1e-6;

/// 2D ray-casting point-in-polygon test.
pub fn point_in_polygon_2d(point: &Point2<f64>, polygon: &[Point2<f64>]) -> bool {
    let n = polygon.len();
    if n < 3 {
        return false;
    }

    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let pi = &polygon[i];
        let pj = &polygon[j];

        if ((pi.y > point.y) != (pj.y > point.y))
            && (point.x < (pj.x - pi.x) * (point.y - pi.y) / (pj.y - pi.y + RAY_EPSILON) + pi.x)
        {
            inside = !inside;
        }
        j = i;
    }

    inside
}

/// Whether the XY footprint of `point` lies strictly inside a boundary loop.
///
/// Points on the rim (within [`CONTACT_TOLERANCE`]) are outside.
pub fn point_in_loop(point: &Point3<f64>, boundary: &BoundaryLoop) -> bool {
    let polygon = boundary.to_polygon_2d(LOOP_FLATTEN_ANGLE);
    point_in_polygon_interior(&Point2::new(point.x, point.y), &polygon)
}

fn point_in_polygon_interior(point: &Point2<f64>, polygon: &[Point2<f64>]) -> bool {
    point_in_polygon_2d(point, polygon)
        && distance_to_polygon_boundary(point, polygon) > CONTACT_TOLERANCE
}

/// Shortest distance from a 2D point to the edges of a closed polygon.
pub fn distance_to_polygon_boundary(point: &Point2<f64>, polygon: &[Point2<f64>]) -> f64 {
    let n = polygon.len();
    let mut best = f64::INFINITY;
    for i in 0..n {
        let a = polygon[i];
        let b = polygon[(i + 1) % n];
        best = best.min(distance_to_segment_2d(point, &a, &b));
    }
    best
}

fn distance_to_segment_2d(point: &Point2<f64>, a: &Point2<f64>, b: &Point2<f64>) -> f64 {
    let ab = b - a;
    let len_sq = ab.norm_squared();
    if len_sq < 1e-24 {
        return (point - a).norm();
    }
    let t = ((point - a).dot(&ab) / len_sq).clamp(0.0, 1.0);
    (point - (a + ab * t)).norm()
}

/// Projects `point` onto `surface` and checks it lands inside the parametric
/// bounds of the accepting face (grown by `tolerance`) no farther than
/// `tolerance` away.
///
/// Fails closed: a failed projection means "not on surface".
pub fn is_point_on_surface<S: SurfaceQuery + ?Sized>(
    point: &Point3<f64>,
    surface: &S,
    tolerance: f64,
) -> bool {
    let Some(projection) = surface.project(point) else {
        return false;
    };
    if (projection.point - point).norm() > tolerance {
        return false;
    }
    projection.bounds.contains(&projection.uv, tolerance)
}

/// Number of interior samples for an edge of the given length.
///
/// Longer edges get denser sampling so a segment cannot skip over a narrow
/// gap in the surface.
pub fn sample_count_for(length: f64, spacing: f64, min: usize, max: usize) -> usize {
    let wanted = if spacing > 0.0 {
        (length / spacing).ceil() as usize
    } else {
        max
    };
    wanted.clamp(min.max(1), max.max(1))
}

/// Samples `samples` interior points of `a→b` (endpoints excluded) and
/// requires every one of them to be on the surface.
pub fn segment_lies_on_surface<S: SurfaceQuery + ?Sized>(
    a: &Point3<f64>,
    b: &Point3<f64>,
    surface: &S,
    samples: usize,
    tolerance: f64,
) -> bool {
    let ab = b - a;
    let divisions = (samples + 1) as f64;
    (1..=samples).all(|i| {
        let t = i as f64 / divisions;
        is_point_on_surface(&(a + ab * t), surface, tolerance)
    })
}

/// Whether segment `a→b` (in XY) passes through `boundary`.
///
/// Contact with the rim at the segment's own endpoints does not count, and
/// neither does running along a straight rim edge, so a vertex sitting on a
/// void's rim keeps its outward edges. A chord between two rim vertices is
/// still caught by its midpoint falling inside the loop.
pub fn segment_crosses_loop(a: &Point3<f64>, b: &Point3<f64>, boundary: &BoundaryLoop) -> bool {
    let p = Point2::new(a.x, a.y);
    let q = Point2::new(b.x, b.y);
    let length = (q - p).norm();
    if length < CONTACT_TOLERANCE {
        return false;
    }
    let away_from_ends =
        |t: f64| t * length > CONTACT_TOLERANCE && (1.0 - t) * length > CONTACT_TOLERANCE;

    let touches = boundary.segments.iter().any(|segment| match segment {
        BoundarySegment::Line { start, end } => {
            let s = Point2::new(start.x, start.y);
            let e = Point2::new(end.x, end.y);
            segments_intersect_2d(&p, &q, &s, &e)
                && line_contact_parameter(&p, &q, &s, &e).is_some_and(away_from_ends)
        }
        BoundarySegment::Arc { .. } => arc_contact_parameters(&p, &q, segment)
            .into_iter()
            .any(away_from_ends),
    });
    if touches {
        return true;
    }

    let midpoint = Point2::from((p.coords + q.coords) * 0.5);
    point_in_polygon_interior(&midpoint, &boundary.to_polygon_2d(LOOP_FLATTEN_ANGLE))
}

/// Parameter along `p→q` where it meets the line through `s→e`; `None` when
/// the two are parallel.
fn line_contact_parameter(
    p: &Point2<f64>,
    q: &Point2<f64>,
    s: &Point2<f64>,
    e: &Point2<f64>,
) -> Option<f64> {
    let d = q - p;
    let r = e - s;
    let denom = d.x * r.y - d.y * r.x;
    if denom.abs() <= 1e-12 * d.norm() * r.norm() {
        return None;
    }
    let w = s - p;
    Some((w.x * r.y - w.y * r.x) / denom)
}

/// Closed-segment intersection test in 2D, collinear overlaps included.
pub fn segments_intersect_2d(
    p1: &Point2<f64>,
    p2: &Point2<f64>,
    q1: &Point2<f64>,
    q2: &Point2<f64>,
) -> bool {
    let d1 = orient(q1, q2, p1);
    let d2 = orient(q1, q2, p2);
    let d3 = orient(p1, p2, q1);
    let d4 = orient(p1, p2, q2);

    if ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
        && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
    {
        return true;
    }

    (d1 == 0.0 && on_segment(q1, q2, p1))
        || (d2 == 0.0 && on_segment(q1, q2, p2))
        || (d3 == 0.0 && on_segment(p1, p2, q1))
        || (d4 == 0.0 && on_segment(p1, p2, q2))
}

fn orient(a: &Point2<f64>, b: &Point2<f64>, c: &Point2<f64>) -> f64 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

fn on_segment(a: &Point2<f64>, b: &Point2<f64>, p: &Point2<f64>) -> bool {
    p.x >= a.x.min(b.x) && p.x <= a.x.max(b.x) && p.y >= a.y.min(b.y) && p.y <= a.y.max(b.y)
}

/// Parameters in `[0, 1]` along `p→q` where it meets a circular arc in XY.
fn arc_contact_parameters(
    p: &Point2<f64>,
    q: &Point2<f64>,
    arc: &BoundarySegment,
) -> SmallVec<[f64; 2]> {
    let mut hits = SmallVec::new();
    let BoundarySegment::Arc {
        center,
        radius,
        start_angle,
        ..
    } = arc
    else {
        return hits;
    };

    let c = Point2::new(center.x, center.y);
    let d = q - p;
    let f = p - c;
    let a = d.norm_squared();
    if a < 1e-24 {
        return hits;
    }
    let b = 2.0 * f.dot(&d);
    let cc = f.norm_squared() - radius * radius;
    let disc = b * b - 4.0 * a * cc;
    if disc < 0.0 {
        return hits;
    }

    let sqrt_disc = disc.sqrt();
    let sweep = arc.sweep();
    for t in [(-b - sqrt_disc) / (2.0 * a), (-b + sqrt_disc) / (2.0 * a)] {
        if !(0.0..=1.0).contains(&t) {
            continue;
        }
        let hit = p + d * t;
        let angle = (hit.y - c.y).atan2(hit.x - c.x);
        let offset = (angle - start_angle).rem_euclid(std::f64::consts::TAU);
        if offset <= sweep + 1e-12 {
            hits.push(t);
        }
    }
    hits
}
