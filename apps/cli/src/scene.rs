// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Scene files and run reports.
//!
//! A scene is one JSON document: the roof facets, the sampled shape points,
//! opening and void loops, optional explicit drain points, corner points to
//! route and an optional `config` block with [`DrainageConfig`] fields.

use std::ops::ControlFlow;
use std::path::Path;

use roofslope_engine::{
    route_points, BoundaryLoop, DrainItem, DrainageConfig, ElevationUpdate, FacetedSurface,
    FnSink, PlanarSurface, Point3, RoutingReport, SlopeInput, SlopeMetrics, SlopeProcessor,
};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::{CliError, Result};

/// One planar roof facet.
#[derive(Debug, Clone, Deserialize)]
pub struct SceneFacet {
    pub outline: Vec<Point3<f64>>,
    #[serde(default)]
    pub holes: Vec<Vec<Point3<f64>>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Scene {
    pub surface: Vec<SceneFacet>,
    #[serde(default)]
    pub points: Vec<Point3<f64>>,
    #[serde(default)]
    pub openings: Vec<BoundaryLoop>,
    #[serde(default)]
    pub voids: Vec<BoundaryLoop>,
    #[serde(default)]
    pub drain_points: Vec<Point3<f64>>,
    #[serde(default)]
    pub corners: Vec<Point3<f64>>,
    #[serde(default)]
    pub config: DrainageConfig,
}

impl Scene {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|source| CliError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Builds the roof surface from the facet list.
    pub fn build_surface(&self) -> Result<FacetedSurface> {
        if self.surface.is_empty() {
            return Err(CliError::EmptySurface);
        }
        let facets = self
            .surface
            .iter()
            .enumerate()
            .map(|(index, facet)| {
                PlanarSurface::new(&facet.outline, &facet.holes)
                    .map_err(|source| CliError::Facet { index, source })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(FacetedSurface::new(facets))
    }
}

/// Output document of one run.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub config: DrainageConfig,
    pub drains: Vec<DrainItem>,
    pub elevations: Vec<ElevationUpdate>,
    pub metrics: SlopeMetrics,
    pub routing: RoutingReport,
}

/// Slopes the scene, then routes its corners on the sloped graph.
pub fn run_scene(scene: &Scene, config: &Config) -> Result<Report> {
    let mut drainage = scene.config.clone();
    config.apply(&mut drainage);

    let surface = scene.build_surface()?;
    let processor = SlopeProcessor::new(drainage.clone())?.with_flush_policy(config.flush_policy());
    let input = SlopeInput {
        points: &scene.points,
        openings: &scene.openings,
        voids: &scene.voids,
        drain_points: &scene.drain_points,
    };

    let mut elevations: Vec<ElevationUpdate> = Vec::new();
    let mut sink = FnSink(|batch: &[ElevationUpdate]| {
        tracing::debug!(updates = batch.len(), "Elevation batch");
        elevations.extend_from_slice(batch);
        ControlFlow::Continue(())
    });
    let outcome = processor.run(&input, &surface, &mut sink)?;

    let strategy = config.strategy.build(&drainage);
    let routing = route_points(
        &outcome.graph,
        &scene.corners,
        &outcome.drain_vertices,
        strategy.as_ref(),
    );

    Ok(Report {
        config: drainage,
        drains: outcome.drains,
        elevations,
        metrics: outcome.metrics,
        routing,
    })
}
