// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Core value types shared by every routing stage.

use std::f64::consts::TAU;
use std::fmt;

use nalgebra::{Point2, Point3};
use serde::{Deserialize, Serialize};

/// Stable identifier of a canonical graph vertex.
///
/// Ids are handed out in insertion order by the vertex merger, and their
/// ordering is the deterministic tie-break used by every search.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct VertexId(pub u32);

impl VertexId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for VertexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

impl From<u32> for VertexId {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

/// A canonical routing vertex: merged position plus its elevation offset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    pub id: VertexId,
    pub position: Point3<f64>,
    /// Offset along the surface normal. Zero until the slope pass writes it.
    #[serde(default)]
    pub elevation: f64,
}

impl Vertex {
    pub fn new(id: VertexId, position: Point3<f64>) -> Self {
        Self {
            id,
            position,
            elevation: 0.0,
        }
    }

    pub fn distance_to(&self, other: &Vertex) -> f64 {
        (other.position - self.position).norm()
    }

    /// Height water sees at this vertex: position plus assigned elevation.
    pub fn height(&self) -> f64 {
        self.position.z + self.elevation
    }
}

/// One piece of an opening boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BoundarySegment {
    Line {
        start: Point3<f64>,
        end: Point3<f64>,
    },
    /// Circular arc in the horizontal plane at `center.z`, running
    /// counter-clockwise from `start_angle` to `end_angle` (radians).
    Arc {
        center: Point3<f64>,
        radius: f64,
        start_angle: f64,
        end_angle: f64,
    },
}

impl BoundarySegment {
    pub fn line(start: Point3<f64>, end: Point3<f64>) -> Self {
        BoundarySegment::Line { start, end }
    }

    pub fn arc(center: Point3<f64>, radius: f64, start_angle: f64, end_angle: f64) -> Self {
        BoundarySegment::Arc {
            center,
            radius,
            start_angle,
            end_angle,
        }
    }

    pub fn is_arc(&self) -> bool {
        matches!(self, BoundarySegment::Arc { .. })
    }

    pub fn start(&self) -> Point3<f64> {
        match self {
            BoundarySegment::Line { start, .. } => *start,
            BoundarySegment::Arc { .. } => self.point_at(0.0),
        }
    }

    pub fn end(&self) -> Point3<f64> {
        match self {
            BoundarySegment::Line { end, .. } => *end,
            BoundarySegment::Arc { .. } => self.point_at(1.0),
        }
    }

    /// Point at normalized parameter `t` in `[0, 1]`.
    pub fn point_at(&self, t: f64) -> Point3<f64> {
        match self {
            BoundarySegment::Line { start, end } => start + (end - start) * t,
            BoundarySegment::Arc {
                center,
                radius,
                start_angle,
                ..
            } => {
                let angle = start_angle + self.sweep() * t;
                Point3::new(
                    center.x + radius * angle.cos(),
                    center.y + radius * angle.sin(),
                    center.z,
                )
            }
        }
    }

    /// Counter-clockwise sweep of an arc in `(0, 2π]`; zero for lines.
    pub fn sweep(&self) -> f64 {
        match self {
            BoundarySegment::Line { .. } => 0.0,
            BoundarySegment::Arc {
                start_angle,
                end_angle,
                ..
            } => {
                let sweep = (end_angle - start_angle).rem_euclid(TAU);
                if sweep < 1e-12 {
                    TAU
                } else {
                    sweep
                }
            }
        }
    }

    pub fn length(&self) -> f64 {
        match self {
            BoundarySegment::Line { start, end } => (end - start).norm(),
            BoundarySegment::Arc { radius, .. } => radius * self.sweep(),
        }
    }
}

/// An ordered closed boundary (one opening or void).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundaryLoop {
    pub segments: Vec<BoundarySegment>,
}

impl BoundaryLoop {
    pub fn new(segments: Vec<BoundarySegment>) -> Self {
        Self { segments }
    }

    /// Closed polyline through consecutive points.
    pub fn polygon(points: &[Point3<f64>]) -> Self {
        let n = points.len();
        let segments = (0..n)
            .map(|i| BoundarySegment::line(points[i], points[(i + 1) % n]))
            .collect();
        Self { segments }
    }

    /// Full circle split into `arcs` equal arcs.
    pub fn circle(center: Point3<f64>, radius: f64, arcs: usize) -> Self {
        let arcs = arcs.max(1);
        let step = TAU / arcs as f64;
        let segments = (0..arcs)
            .map(|i| {
                let start = step * i as f64;
                BoundarySegment::arc(center, radius, start, start + step)
            })
            .collect();
        Self { segments }
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn arc_count(&self) -> usize {
        self.segments.iter().filter(|s| s.is_arc()).count()
    }

    /// Flattens the loop to XY polygon vertices. Arcs are subdivided so
    /// that each chord spans at most `max_angle` radians.
    pub fn to_polygon_2d(&self, max_angle: f64) -> Vec<Point2<f64>> {
        let mut out = Vec::with_capacity(self.segments.len() * 2);
        for segment in &self.segments {
            let steps = match segment {
                BoundarySegment::Line { .. } => 1,
                BoundarySegment::Arc { .. } => {
                    ((segment.sweep() / max_angle.max(1e-3)).ceil() as usize).max(2)
                }
            };
            for i in 0..steps {
                let p = segment.point_at(i as f64 / steps as f64);
                out.push(Point2::new(p.x, p.y));
            }
        }
        out
    }
}

/// Shape classification of a detected drain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DrainShape {
    Circle,
    Square,
    Rectangle,
    Polygon,
    MixedShape,
}

impl DrainShape {
    pub fn as_str(&self) -> &'static str {
        match self {
            DrainShape::Circle => "Circle",
            DrainShape::Square => "Square",
            DrainShape::Rectangle => "Rectangle",
            DrainShape::Polygon => "Polygon",
            DrainShape::MixedShape => "MixedShape",
        }
    }
}

impl fmt::Display for DrainShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Region of a drain in graph units, used to capture routing vertices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Footprint {
    Circle { center: Point2<f64>, radius: f64 },
    Box { min: Point2<f64>, max: Point2<f64> },
}

impl Footprint {
    /// XY containment, grown by `tolerance` on every side.
    pub fn contains(&self, point: &Point3<f64>, tolerance: f64) -> bool {
        match self {
            Footprint::Circle { center, radius } => {
                let dx = point.x - center.x;
                let dy = point.y - center.y;
                (dx * dx + dy * dy).sqrt() <= radius + tolerance
            }
            Footprint::Box { min, max } => {
                point.x >= min.x - tolerance
                    && point.x <= max.x + tolerance
                    && point.y >= min.y - tolerance
                    && point.y <= max.y + tolerance
            }
        }
    }

    /// Area in graph units squared.
    pub fn area(&self) -> f64 {
        match self {
            Footprint::Circle { radius, .. } => std::f64::consts::PI * radius * radius,
            Footprint::Box { min, max } => (max.x - min.x) * (max.y - min.y),
        }
    }
}

/// A detected drain opening.
///
/// `width` and `height` are in real-world units (graph units times the
/// configured drain unit scale); `footprint` stays in graph units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrainItem {
    pub center: Point3<f64>,
    pub width: f64,
    pub height: f64,
    pub shape: DrainShape,
    pub footprint: Footprint,
}

impl DrainItem {
    pub fn contains(&self, point: &Point3<f64>, tolerance: f64) -> bool {
        self.footprint.contains(point, tolerance)
    }

    pub fn area(&self) -> f64 {
        self.footprint.area()
    }
}
