// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Tunable scalars for graph construction, drain detection and slope
//! assignment.
//!
//! Lengths are in graph units (feet-equivalent) unless a field says
//! otherwise. Drain sizes and the detection tolerances that compare them are
//! in real-world units, reached by multiplying graph lengths with
//! [`DrainageConfig::drain_unit_scale`].

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Configuration for one routing invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DrainageConfig {
    /// Points closer than this collapse to one vertex.
    pub node_tolerance: f64,
    /// Shortest edge kept in the connectivity graph.
    pub min_edge: f64,
    /// Longest edge kept in the connectivity graph.
    pub max_edge: f64,
    /// Target spacing between surface samples along a candidate edge.
    pub edge_sample_spacing: f64,
    pub min_edge_samples: usize,
    pub max_edge_samples: usize,
    /// Allowed distance between a point and its projection onto the surface.
    pub surface_tolerance: f64,
    /// Desired grade in percent (2.0 means 2 units rise per 100 run).
    pub slope_percent: f64,
    /// Vertices farther than this (path length) from any drain keep their
    /// elevation untouched.
    pub distance_threshold: f64,
    /// Center/radius tolerance for grouping arcs, real-world units.
    pub arc_cluster_tolerance: f64,
    /// Largest accepted mean circle-fit residual, as a fraction of radius.
    pub circle_fit_residual: f64,
    /// Minimum distinct samples before attempting a least-squares circle.
    pub min_fit_points: usize,
    /// Width/height difference still classified as square, real-world units.
    pub square_tolerance: f64,
    /// Smallest drain width/height, real-world units.
    pub min_drain_size: f64,
    /// Largest drain width/height, real-world units.
    pub max_drain_size: f64,
    /// Graph units to real-world drain units (feet to millimetres).
    pub drain_unit_scale: f64,
    /// Drains whose centers are closer than this are duplicates.
    pub drain_dedup_tolerance: f64,
    /// Growth of a drain footprint when capturing graph vertices.
    pub drain_capture_tolerance: f64,
    /// Dijkstra ordering bias per unit of climb toward a drain.
    pub uphill_bias: f64,
    /// A* and greedy cost per unit of climb.
    pub uphill_penalty: f64,
    /// Climb still treated as flat by the greedy descent.
    pub downhill_tolerance: f64,
}

impl Default for DrainageConfig {
    fn default() -> Self {
        Self {
            node_tolerance: 1e-4,
            min_edge: 1e-3,
            max_edge: 50.0,
            edge_sample_spacing: 1.0,
            min_edge_samples: 3,
            max_edge_samples: 64,
            surface_tolerance: 1e-2,
            slope_percent: 2.0,
            distance_threshold: 1000.0,
            arc_cluster_tolerance: 5.0,
            circle_fit_residual: 0.08,
            min_fit_points: 6,
            square_tolerance: 5.0,
            min_drain_size: 5.0,
            max_drain_size: 2000.0,
            drain_unit_scale: 304.8,
            drain_dedup_tolerance: 0.01,
            drain_capture_tolerance: 1e-2,
            uphill_bias: 0.1,
            uphill_penalty: 10.0,
            downhill_tolerance: 1e-6,
        }
    }
}

impl DrainageConfig {
    /// Elevation gained per unit of path length.
    pub fn slope_factor(&self) -> f64 {
        self.slope_percent / 100.0
    }

    /// Rejects thresholds that would produce nonsensical graphs.
    pub fn validate(&self) -> Result<()> {
        positive("node_tolerance", self.node_tolerance)?;
        non_negative("min_edge", self.min_edge)?;
        positive("max_edge", self.max_edge)?;
        if self.min_edge > self.max_edge {
            return Err(Error::InvertedEdgeBounds {
                min: self.min_edge,
                max: self.max_edge,
            });
        }
        positive("edge_sample_spacing", self.edge_sample_spacing)?;
        if self.max_edge_samples == 0 || self.min_edge_samples > self.max_edge_samples {
            return Err(Error::InvalidConfig {
                field: "max_edge_samples",
                expected: "at least 1 and at least min_edge_samples",
                value: self.max_edge_samples as f64,
            });
        }
        positive("surface_tolerance", self.surface_tolerance)?;
        non_negative("slope_percent", self.slope_percent)?;
        positive("distance_threshold", self.distance_threshold)?;
        positive("arc_cluster_tolerance", self.arc_cluster_tolerance)?;
        positive("circle_fit_residual", self.circle_fit_residual)?;
        if self.min_fit_points < 3 {
            return Err(Error::InvalidConfig {
                field: "min_fit_points",
                expected: "at least 3",
                value: self.min_fit_points as f64,
            });
        }
        non_negative("square_tolerance", self.square_tolerance)?;
        non_negative("min_drain_size", self.min_drain_size)?;
        positive("max_drain_size", self.max_drain_size)?;
        if self.min_drain_size > self.max_drain_size {
            return Err(Error::InvalidConfig {
                field: "min_drain_size",
                expected: "no larger than max_drain_size",
                value: self.min_drain_size,
            });
        }
        positive("drain_unit_scale", self.drain_unit_scale)?;
        positive("drain_dedup_tolerance", self.drain_dedup_tolerance)?;
        non_negative("drain_capture_tolerance", self.drain_capture_tolerance)?;
        non_negative("uphill_bias", self.uphill_bias)?;
        non_negative("uphill_penalty", self.uphill_penalty)?;
        non_negative("downhill_tolerance", self.downhill_tolerance)?;
        Ok(())
    }
}

fn positive(field: &'static str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(Error::InvalidConfig {
            field,
            expected: "finite and greater than zero",
            value,
        })
    }
}

fn non_negative(field: &'static str, value: f64) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(Error::InvalidConfig {
            field,
            expected: "finite and not negative",
            value,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        DrainageConfig::default().validate().unwrap();
    }

    #[test]
    fn slope_factor_is_percent_over_hundred() {
        let config = DrainageConfig {
            slope_percent: 2.0,
            ..Default::default()
        };
        assert!((config.slope_factor() - 0.02).abs() < 1e-12);
    }

    #[test]
    fn zero_tolerance_is_rejected() {
        let config = DrainageConfig {
            node_tolerance: 0.0,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidConfig {
                field: "node_tolerance",
                ..
            }
        ));
    }

    #[test]
    fn inverted_edge_bounds_are_rejected() {
        let config = DrainageConfig {
            min_edge: 10.0,
            max_edge: 1.0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(Error::InvertedEdgeBounds { .. })
        ));
    }

    #[test]
    fn nan_threshold_is_rejected() {
        let config = DrainageConfig {
            distance_threshold: f64::NAN,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config: DrainageConfig =
            serde_json::from_str(r#"{ "slope_percent": 1.5, "max_edge": 12.0 }"#).unwrap();
        assert_eq!(config.slope_percent, 1.5);
        assert_eq!(config.max_edge, 12.0);
        assert_eq!(config.node_tolerance, DrainageConfig::default().node_tolerance);
    }
}
