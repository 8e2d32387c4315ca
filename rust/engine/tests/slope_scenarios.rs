// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::f64::consts::TAU;

use approx::assert_relative_eq;
use roofslope_engine::{
    route_points, BoundaryLoop, DrainShape, DrainageConfig, ElevationUpdate, FlushPolicy,
    NullSink, PlanarSurface, Point2, Point3, SlopeInput, SlopeOutcome, SlopeProcessor, Strategy,
};

const CENTER: (f64, f64) = (10.0, 10.0);
const DRAIN_RADIUS: f64 = 0.25;

fn hole_ring(sides: usize) -> Vec<Point2<f64>> {
    (0..sides)
        .map(|i| {
            let a = TAU * i as f64 / sides as f64;
            Point2::new(
                CENTER.0 + DRAIN_RADIUS * a.cos(),
                CENTER.1 + DRAIN_RADIUS * a.sin(),
            )
        })
        .collect()
}

/// 20 x 20 flat deck with a round drain hole in the middle.
fn drained_deck() -> PlanarSurface {
    PlanarSurface::horizontal(
        &[
            Point2::new(0.0, 0.0),
            Point2::new(20.0, 0.0),
            Point2::new(20.0, 20.0),
            Point2::new(0.0, 20.0),
        ],
        &[hole_ring(16)],
        0.0,
    )
    .expect("deck")
}

/// A 10 x 10 grid on odd coordinates plus the drain rim, with every grid
/// point sampled twice as if it came from two source curves.
fn deck_points() -> Vec<Point3<f64>> {
    let mut points = Vec::new();
    for pass in 0..2 {
        for j in 0..10 {
            for i in 0..10 {
                let jitter = pass as f64 * 1e-5;
                points.push(Point3::new(
                    1.0 + 2.0 * i as f64 + jitter,
                    1.0 + 2.0 * j as f64,
                    0.0,
                ));
            }
        }
    }
    points.extend(hole_ring(16).iter().map(|p| Point3::new(p.x, p.y, 0.0)));
    points
}

fn drain_opening() -> BoundaryLoop {
    BoundaryLoop::circle(Point3::new(CENTER.0, CENTER.1, 0.0), DRAIN_RADIUS, 4)
}

fn elevation_near(outcome: &SlopeOutcome, x: f64, y: f64) -> f64 {
    outcome
        .graph
        .vertices()
        .iter()
        .find(|v| (v.position.x - x).abs() < 1e-3 && (v.position.y - y).abs() < 1e-3)
        .map(|v| v.elevation)
        .expect("vertex present")
}

fn run_deck() -> SlopeOutcome {
    let points = deck_points();
    let openings = [drain_opening()];
    let input = SlopeInput {
        points: &points,
        openings: &openings,
        ..SlopeInput::default()
    };
    SlopeProcessor::new(DrainageConfig::default())
        .expect("valid config")
        .run(&input, &drained_deck(), &mut NullSink)
        .expect("slope pass")
}

#[test]
fn round_drain_slopes_the_whole_deck() {
    let outcome = run_deck();
    let m = &outcome.metrics;

    assert_eq!(outcome.drains.len(), 1);
    assert_eq!(outcome.drains[0].shape, DrainShape::Circle);
    assert_relative_eq!(
        outcome.drains[0].width,
        2.0 * DRAIN_RADIUS * 304.8,
        max_relative = 0.05
    );

    assert_eq!(m.merged_points, 100);
    assert_eq!(m.drain_vertices, 16);
    assert_eq!(m.processed, 100);
    assert_eq!(m.skipped, 0);
    assert!(!m.cancelled);

    for id in &outcome.drain_vertices {
        assert_eq!(outcome.graph.vertex(*id).unwrap().elevation, 0.0);
    }

    // No vertex can be closer to the drain than the straight line to its rim.
    for v in outcome.graph.vertices() {
        if outcome.drain_vertices.contains(&v.id) {
            continue;
        }
        let to_center = (v.position.x - CENTER.0).hypot(v.position.y - CENTER.1);
        let lower = (to_center - DRAIN_RADIUS) * 0.02;
        let upper = (to_center + DRAIN_RADIUS) * 0.02;
        assert!(v.elevation >= lower - 1e-9, "{} too low", v.id);
        assert!(v.elevation <= upper + 1e-9, "{} too high", v.id);
    }

    let corner = elevation_near(&outcome, 1.0, 1.0);
    let inner = elevation_near(&outcome, 9.0, 9.0);
    assert!(corner > inner);
    assert_relative_eq!(m.highest_elevation, corner, epsilon = 1e-12);
    assert_relative_eq!(elevation_near(&outcome, 19.0, 19.0), corner, epsilon = 1e-9);
}

#[test]
fn batching_matches_atomic_on_a_real_deck() {
    let points = deck_points();
    let openings = [drain_opening()];
    let input = SlopeInput {
        points: &points,
        openings: &openings,
        ..SlopeInput::default()
    };
    let surface = drained_deck();

    let collect = |policy: FlushPolicy| {
        let mut updates: Vec<ElevationUpdate> = Vec::new();
        SlopeProcessor::new(DrainageConfig::default())
            .unwrap()
            .with_flush_policy(policy)
            .run(&input, &surface, &mut updates)
            .unwrap();
        updates
    };

    let atomic = collect(FlushPolicy::Atomic);
    assert_eq!(atomic.len(), 116);
    assert_eq!(collect(FlushPolicy::every(50)), atomic);
    assert_eq!(collect(FlushPolicy::every(7)), atomic);
}

#[test]
fn void_cuts_off_the_far_side() {
    let surface = PlanarSurface::horizontal(
        &[
            Point2::new(0.0, 0.0),
            Point2::new(30.0, 0.0),
            Point2::new(30.0, 10.0),
            Point2::new(0.0, 10.0),
        ],
        &[],
        0.0,
    )
    .unwrap();
    // A strip across the full deck depth between x = 14 and x = 16.
    let voids = [BoundaryLoop::polygon(&[
        Point3::new(14.0, -1.0, 0.0),
        Point3::new(16.0, -1.0, 0.0),
        Point3::new(16.0, 11.0, 0.0),
        Point3::new(14.0, 11.0, 0.0),
    ])];
    let points: Vec<Point3<f64>> = [0.0, 5.0, 10.0, 15.0, 20.0, 25.0, 30.0]
        .iter()
        .map(|&x| Point3::new(x, 5.0, 0.0))
        .collect();
    let drain = [Point3::new(0.0, 5.0, 0.0)];
    let input = SlopeInput {
        points: &points,
        voids: &voids,
        drain_points: &drain,
        ..SlopeInput::default()
    };

    let outcome = SlopeProcessor::new(DrainageConfig::default())
        .unwrap()
        .run(&input, &surface, &mut NullSink)
        .unwrap();
    let m = &outcome.metrics;

    assert_eq!(m.graph.removed_in_voids, 1);
    assert_eq!(m.graph.components, 2);
    assert_eq!(m.processed, 2);
    assert_eq!(m.skipped, 3);
    assert_eq!(m.unreachable, 3);
    assert_relative_eq!(elevation_near(&outcome, 10.0, 5.0), 0.2, epsilon = 1e-12);
    assert_eq!(elevation_near(&outcome, 30.0, 5.0), 0.0);
}

#[test]
fn corners_route_down_the_sloped_deck() {
    let outcome = run_deck();
    let corners = [
        Point3::new(0.9, 0.9, 0.0),
        Point3::new(19.1, 0.9, 0.0),
        Point3::new(19.1, 19.1, 0.0),
        Point3::new(0.9, 19.1, 0.0),
    ];
    let config = DrainageConfig::default();

    let dijkstra = route_points(
        &outcome.graph,
        &corners,
        &outcome.drain_vertices,
        Strategy::Dijkstra.build(&config).as_ref(),
    );
    assert_eq!(dijkstra.succeeded, 4);

    for strategy in [Strategy::AStar, Strategy::Greedy] {
        let report = route_points(
            &outcome.graph,
            &corners,
            &outcome.drain_vertices,
            strategy.build(&config).as_ref(),
        );
        assert_eq!(report.succeeded, 4, "{strategy}");
        for (best, other) in dijkstra.results.iter().zip(&report.results) {
            assert_eq!(best.start, other.start);
            assert!(best.length <= other.length + 1e-9);
            let end = other.end().unwrap();
            assert!(outcome.drain_vertices.contains(&end));
        }
    }
}
