// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Surface capability consumed by the routing core.
//!
//! The host implements [`SurfaceQuery`] over its own face representation.
//! [`PlanarSurface`] and [`FacetedSurface`] are self-contained
//! implementations for planar roofs, used by the CLI and the tests.

use nalgebra::{Point2, Point3, Vector3};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::predicates::{distance_to_polygon_boundary, point_in_polygon_2d};

/// Result of projecting a point onto a surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    /// Closest point on the surface.
    pub point: Point3<f64>,
    /// Parametric coordinates of `point`.
    pub uv: Point2<f64>,
    /// Parametric domain of the face that accepted the point; `uv` is
    /// expressed in this face's frame.
    pub bounds: UvBounds,
}

/// Axis-aligned parametric domain of a surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UvBounds {
    pub min: Point2<f64>,
    pub max: Point2<f64>,
}

impl UvBounds {
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Point2<f64>>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = *iter.next()?;
        let (min, max) = iter.fold((first, first), |(min, max), p| {
            (
                Point2::new(min.x.min(p.x), min.y.min(p.y)),
                Point2::new(max.x.max(p.x), max.y.max(p.y)),
            )
        });
        Some(Self { min, max })
    }

    pub fn contains(&self, uv: &Point2<f64>, tolerance: f64) -> bool {
        uv.x >= self.min.x - tolerance
            && uv.x <= self.max.x + tolerance
            && uv.y >= self.min.y - tolerance
            && uv.y <= self.max.y + tolerance
    }

    pub fn union(&self, other: &UvBounds) -> UvBounds {
        UvBounds {
            min: Point2::new(self.min.x.min(other.min.x), self.min.y.min(other.min.y)),
            max: Point2::new(self.max.x.max(other.max.x), self.max.y.max(other.max.y)),
        }
    }
}

/// Read-only surface queries needed by the geometry predicates.
pub trait SurfaceQuery {
    /// Projects `point` onto the (trimmed) surface. `None` when the
    /// projection fails or falls outside the face.
    fn project(&self, point: &Point3<f64>) -> Option<Projection>;

    /// Parametric domain of the surface. For multi-face surfaces this is
    /// only an envelope; membership checks use [`Projection::bounds`].
    fn parametric_bounds(&self) -> UvBounds;
}

/// A planar face with an outer boundary and optional holes.
///
/// Parameter space is an orthonormal frame in the face plane anchored at
/// the first outline vertex, so uv distances equal model distances.
#[derive(Debug, Clone)]
pub struct PlanarSurface {
    origin: Point3<f64>,
    u_axis: Vector3<f64>,
    v_axis: Vector3<f64>,
    normal: Vector3<f64>,
    outline: Vec<Point2<f64>>,
    holes: Vec<Vec<Point2<f64>>>,
    bounds: UvBounds,
    /// Points this close to a trimming boundary count as on the face.
    edge_tolerance: f64,
}

impl PlanarSurface {
    /// Builds a face from 3D boundary polygons. The plane comes from the
    /// outline via Newell's method.
    pub fn new(outline: &[Point3<f64>], holes: &[Vec<Point3<f64>>]) -> Result<Self> {
        if outline.len() < 3 {
            return Err(Error::DegenerateLoop(format!(
                "surface outline has {} vertices",
                outline.len()
            )));
        }

        let normal = newell_normal(outline).ok_or_else(|| {
            Error::DegenerateLoop("surface outline has zero area".to_string())
        })?;
        let origin = outline[0];

        let u_axis = outline
            .iter()
            .skip(1)
            .map(|p| {
                let d = p - origin;
                d - normal * d.dot(&normal)
            })
            .find(|d| d.norm() > 1e-12)
            .map(|d| d.normalize())
            .ok_or_else(|| Error::DegenerateLoop("surface outline is a point".to_string()))?;
        let v_axis = normal.cross(&u_axis);

        let mut surface = Self {
            origin,
            u_axis,
            v_axis,
            normal,
            outline: Vec::new(),
            holes: Vec::new(),
            bounds: UvBounds {
                min: Point2::origin(),
                max: Point2::origin(),
            },
            edge_tolerance: 1e-6,
        };
        surface.outline = outline.iter().map(|p| surface.to_uv(p)).collect();
        surface.holes = holes
            .iter()
            .filter(|h| h.len() >= 3)
            .map(|h| h.iter().map(|p| surface.to_uv(p)).collect())
            .collect();
        surface.bounds = UvBounds::from_points(&surface.outline)
            .ok_or_else(|| Error::DegenerateLoop("surface outline is empty".to_string()))?;
        Ok(surface)
    }

    /// Horizontal face at height `z` from XY polygons.
    pub fn horizontal(outline: &[Point2<f64>], holes: &[Vec<Point2<f64>>], z: f64) -> Result<Self> {
        let lift = |poly: &[Point2<f64>]| -> Vec<Point3<f64>> {
            poly.iter().map(|p| Point3::new(p.x, p.y, z)).collect()
        };
        let holes: Vec<Vec<Point3<f64>>> = holes.iter().map(|h| lift(h)).collect();
        Self::new(&lift(outline), &holes)
    }

    /// Sets how close to a trimming edge a point may be and still count as
    /// inside.
    pub fn with_edge_tolerance(mut self, tolerance: f64) -> Self {
        self.edge_tolerance = tolerance.max(0.0);
        self
    }

    pub fn normal(&self) -> Vector3<f64> {
        self.normal
    }

    /// Signed distance of `point` from the face plane along the normal.
    pub fn plane_distance(&self, point: &Point3<f64>) -> f64 {
        (point - self.origin).dot(&self.normal)
    }

    fn to_uv(&self, point: &Point3<f64>) -> Point2<f64> {
        let d = point - self.origin;
        Point2::new(d.dot(&self.u_axis), d.dot(&self.v_axis))
    }

    fn inside_trim(&self, uv: &Point2<f64>) -> bool {
        let near_outline = distance_to_polygon_boundary(uv, &self.outline) <= self.edge_tolerance;
        if !near_outline && !point_in_polygon_2d(uv, &self.outline) {
            return false;
        }
        self.holes.iter().all(|hole| {
            distance_to_polygon_boundary(uv, hole) <= self.edge_tolerance
                || !point_in_polygon_2d(uv, hole)
        })
    }
}

impl SurfaceQuery for PlanarSurface {
    fn project(&self, point: &Point3<f64>) -> Option<Projection> {
        let distance = self.plane_distance(point);
        if !distance.is_finite() {
            return None;
        }
        let projected = point - self.normal * distance;
        let uv = self.to_uv(&projected);
        if !self.inside_trim(&uv) {
            return None;
        }
        Some(Projection {
            point: projected,
            uv,
            bounds: self.bounds,
        })
    }

    fn parametric_bounds(&self) -> UvBounds {
        self.bounds
    }
}

/// A surface made of several planar facets (a hipped or multi-plane roof).
///
/// Each facet keeps its own frame; projections report uv and bounds in the
/// frame of the facet that accepted the point. [`parametric_bounds`] is the
/// union of all facet bounds, which mixes frames and is only an envelope.
///
/// [`parametric_bounds`]: SurfaceQuery::parametric_bounds
#[derive(Debug, Clone, Default)]
pub struct FacetedSurface {
    facets: Vec<PlanarSurface>,
}

impl FacetedSurface {
    pub fn new(facets: Vec<PlanarSurface>) -> Self {
        Self { facets }
    }

    pub fn facets(&self) -> &[PlanarSurface] {
        &self.facets
    }

    pub fn is_empty(&self) -> bool {
        self.facets.is_empty()
    }
}

impl SurfaceQuery for FacetedSurface {
    fn project(&self, point: &Point3<f64>) -> Option<Projection> {
        self.facets
            .iter()
            .filter_map(|facet| facet.project(point))
            .min_by(|a, b| {
                let da = (a.point - point).norm_squared();
                let db = (b.point - point).norm_squared();
                da.total_cmp(&db)
            })
    }

    fn parametric_bounds(&self) -> UvBounds {
        self.facets
            .iter()
            .map(|f| f.parametric_bounds())
            .reduce(|acc, b| acc.union(&b))
            .unwrap_or(UvBounds {
                min: Point2::origin(),
                max: Point2::origin(),
            })
    }
}

/// Polygon normal by Newell's method; `None` for degenerate polygons.
fn newell_normal(points: &[Point3<f64>]) -> Option<Vector3<f64>> {
    let mut normal = Vector3::<f64>::zeros();
    let n = points.len();
    for i in 0..n {
        let curr = points[i];
        let next = points[(i + 1) % n];
        normal.x += (curr.y - next.y) * (curr.z + next.z);
        normal.y += (curr.z - next.z) * (curr.x + next.x);
        normal.z += (curr.x - next.x) * (curr.y + next.y);
    }

    let len = normal.norm();
    if len < 1e-15 {
        return None;
    }
    Some(normal / len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn square(size: f64) -> Vec<Point2<f64>> {
        vec![
            Point2::new(0.0, 0.0),
            Point2::new(size, 0.0),
            Point2::new(size, size),
            Point2::new(0.0, size),
        ]
    }

    #[test]
    fn horizontal_projection_drops_height() {
        let surface = PlanarSurface::horizontal(&square(10.0), &[], 2.0).unwrap();
        let proj = surface.project(&Point3::new(3.0, 4.0, 7.0)).unwrap();
        assert_relative_eq!(proj.point, Point3::new(3.0, 4.0, 2.0), epsilon = 1e-12);
        assert_relative_eq!(proj.uv, Point2::new(3.0, 4.0), epsilon = 1e-12);
    }

    #[test]
    fn projection_outside_outline_fails() {
        let surface = PlanarSurface::horizontal(&square(10.0), &[], 0.0).unwrap();
        assert!(surface.project(&Point3::new(11.0, 4.0, 0.0)).is_none());
    }

    #[test]
    fn hole_rejects_interior_but_keeps_rim() {
        let hole = vec![
            Point2::new(4.0, 4.0),
            Point2::new(6.0, 4.0),
            Point2::new(6.0, 6.0),
            Point2::new(4.0, 6.0),
        ];
        let surface = PlanarSurface::horizontal(&square(10.0), &[hole], 0.0)
            .unwrap()
            .with_edge_tolerance(1e-3);
        assert!(surface.project(&Point3::new(5.0, 5.0, 0.0)).is_none());
        assert!(surface.project(&Point3::new(4.0, 5.0, 0.0)).is_some());
        assert!(surface.project(&Point3::new(2.0, 5.0, 0.0)).is_some());
    }

    #[test]
    fn sloped_plane_keeps_model_distances() {
        // 45 degree slope rising along +x.
        let outline = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(10.0, 0.0, 10.0),
            Point3::new(10.0, 10.0, 10.0),
            Point3::new(0.0, 10.0, 0.0),
        ];
        let surface = PlanarSurface::new(&outline, &[]).unwrap();
        let a = surface.project(&Point3::new(0.0, 0.0, 0.0)).unwrap();
        let b = surface.project(&Point3::new(10.0, 0.0, 10.0)).unwrap();
        assert_relative_eq!((b.uv - a.uv).norm(), 200f64.sqrt(), epsilon = 1e-9);
        assert_relative_eq!(surface.plane_distance(&Point3::new(5.0, 5.0, 5.0)), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn degenerate_outline_is_an_error() {
        let line = vec![Point2::new(0.0, 0.0), Point2::new(1.0, 0.0), Point2::new(2.0, 0.0)];
        assert!(PlanarSurface::horizontal(&line, &[], 0.0).is_err());
    }

    #[test]
    fn faceted_surface_picks_accepting_facet() {
        let left = PlanarSurface::horizontal(&square(5.0), &[], 0.0).unwrap();
        let right_outline: Vec<Point2<f64>> =
            square(5.0).iter().map(|p| Point2::new(p.x + 5.0, p.y)).collect();
        let right = PlanarSurface::horizontal(&right_outline, &[], 1.0).unwrap();
        let roof = FacetedSurface::new(vec![left, right]);

        let proj = roof.project(&Point3::new(7.0, 2.0, 1.0)).unwrap();
        assert_relative_eq!(proj.point.z, 1.0, epsilon = 1e-12);
        assert!(roof.project(&Point3::new(12.0, 2.0, 0.0)).is_none());

        let bounds = roof.parametric_bounds();
        assert!(bounds.max.x >= 5.0);
    }

    #[test]
    fn faceted_projection_carries_facet_bounds() {
        // Second facet is a wall-like plane standing on x = 10, so its uv
        // frame has nothing in common with the deck's.
        let deck = PlanarSurface::horizontal(&square(10.0), &[], 0.0).unwrap();
        let wall = PlanarSurface::new(
            &[
                Point3::new(10.0, 0.0, 0.0),
                Point3::new(10.0, 4.0, 0.0),
                Point3::new(10.0, 4.0, 3.0),
                Point3::new(10.0, 0.0, 3.0),
            ],
            &[],
        )
        .unwrap();
        let wall_bounds = wall.parametric_bounds();
        let roof = FacetedSurface::new(vec![deck.clone(), wall]);

        let on_wall = roof.project(&Point3::new(10.2, 2.0, 2.0)).unwrap();
        assert_eq!(on_wall.bounds, wall_bounds);
        assert!(on_wall.bounds.contains(&on_wall.uv, 1e-9));

        let on_deck = roof.project(&Point3::new(3.0, 3.0, 0.1)).unwrap();
        assert_eq!(on_deck.bounds, deck.parametric_bounds());
    }
}
