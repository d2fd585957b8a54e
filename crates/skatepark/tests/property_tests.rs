#![allow(clippy::doc_markdown)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::suboptimal_flops)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::cast_precision_loss)]

use skatepark::premade::{build_track_set, PremadeShape, TrackSetConfig};
use skatepark::spline::CubicSpline;
use skatepark::{Integrator, PhysicsConfig, Simulation, SkaterState, TrackId, TrackSet, Vector2};
use proptest::prelude::*;

const FRAME: f64 = 1.0 / 60.0;

fn premade(shape: PremadeShape) -> (TrackSet, TrackId) {
    let (tracks, ids) = build_track_set(&TrackSetConfig::fixed(&[shape])).unwrap();
    (tracks, ids[0])
}

fn at_rest_on(tracks: &TrackSet, id: TrackId, u: f64, mass: f64) -> SkaterState {
    let track = tracks.get(id).unwrap();
    SkaterState::free_fall(track.point_at(u), Vector2::zero(), mass, 9.8)
        .attach_to_track(id, track, u, true)
}

// =============================================================================
// Energy properties
// =============================================================================

proptest! {
    #[test]
    fn frictionless_ride_conserves_energy(
        shape in prop::sample::select(PremadeShape::ALL.to_vec()),
        fraction in 0.05f64..0.6,
        speed in -3.0f64..3.0,
        mass in 25.0f64..100.0,
        dts in prop::collection::vec(prop::sample::select(vec![0.003, FRAME, 0.1, 0.25]), 60),
    ) {
        let (tracks, id) = premade(shape);
        let track = tracks.get(id).unwrap();
        let u = track.min_u() + fraction * (track.max_u() - track.min_u());
        let start = SkaterState::free_fall(track.point_at(u), track.tangent_at(u) * speed, mass, 9.8)
            .attach_to_track(id, track, u, true);
        let e0 = start.total_energy();

        let integrator = Integrator::default();
        let mut state = start;
        for dt in dts {
            state = integrator.step(&state, &tracks, dt).state;
            if state.track != Some(id) {
                break;
            }
            prop_assert!(
                (state.total_energy() - e0).abs() <= 1e-6 * e0.max(1.0),
                "{:?} energy drifted: start={}, now={}",
                shape, e0, state.total_energy()
            );
        }
    }

    #[test]
    fn thermal_energy_never_decreases(
        u in 0.1f64..0.7,
        friction in 0.0f64..1.0,
    ) {
        let (tracks, id) = premade(PremadeShape::DoubleWell);
        let integrator = Integrator::default().with_friction(friction);
        let mut state = at_rest_on(&tracks, id, u, 60.0);

        for _ in 0..240 {
            let next = integrator.step(&state, &tracks, FRAME).state;
            prop_assert!(
                next.thermal_energy >= state.thermal_energy,
                "thermal fell from {} to {}",
                state.thermal_energy, next.thermal_energy
            );
            state = next;
        }
    }

    #[test]
    fn energies_stay_non_negative(
        mass in -50.0f64..500.0,
        x in -5.0f64..5.0,
        y in 0.0f64..8.0,
    ) {
        let (tracks, _) = premade(PremadeShape::DoubleWell);
        let mut sim = Simulation::with_tracks(PhysicsConfig::default(), tracks).unwrap();
        sim.set_mass(mass);
        sim.drag_start(Vector2::new(x, y));
        sim.drag_end();

        for _ in 0..90 {
            sim.tick(FRAME);
            let skater = sim.skater();
            prop_assert!((25.0..=100.0).contains(&skater.mass()));
            prop_assert!(skater.kinetic_energy() >= 0.0);
            prop_assert!(skater.thermal_energy() >= 0.0);
            prop_assert!(skater.position().y >= 0.0);
        }
    }

    #[test]
    fn striking_the_ground_keeps_the_total(
        x in -10.0f64..10.0,
        y in 0.0f64..1.0,
        vx in -10.0f64..10.0,
        vy in -10.0f64..10.0,
        thermal in 0.0f64..1000.0,
    ) {
        let state = SkaterState::free_fall(Vector2::new(x, y), Vector2::new(vx, vy), 60.0, 9.8)
            .with_thermal(thermal);
        let struck = state.strike_ground();

        prop_assert_eq!(struck.position, Vector2::new(x, 0.0));
        prop_assert_eq!(struck.velocity, Vector2::zero());
        prop_assert!((struck.thermal_energy - (thermal + state.kinetic_energy())).abs() < 1e-9);
    }
}

// =============================================================================
// State transition properties
// =============================================================================

proptest! {
    #[test]
    fn tangential_attach_then_leave_is_lossless(
        u in 0.02f64..0.64,
        speed in -12.0f64..12.0,
    ) {
        let (tracks, id) = premade(PremadeShape::Parabola);
        let track = tracks.get(id).unwrap();
        let velocity = track.tangent_at(u) * speed;
        let flying = SkaterState::free_fall(track.point_at(u), velocity, 60.0, 9.8);

        let attached = flying.attach_to_track(id, track, u, true);
        prop_assert!(attached.thermal_energy < 1e-9);
        prop_assert!(attached.position.distance(flying.position) < 1e-12);

        let left = attached.leave_track();
        prop_assert!(left.velocity.distance(velocity) < 1e-9);
        prop_assert_eq!(left.track, None);
    }

    #[test]
    fn copy_is_identical(
        x in -10.0f64..10.0,
        y in 0.0f64..10.0,
        thermal in 0.0f64..500.0,
    ) {
        let state = SkaterState::free_fall(Vector2::new(x, y), Vector2::new(1.0, -2.0), 70.0, 9.8)
            .with_thermal(thermal);
        prop_assert_eq!(state.copy(), state);
    }
}

// =============================================================================
// Geometry properties
// =============================================================================

proptest! {
    #[test]
    fn spline_interpolates_its_knots(
        values in prop::collection::vec(-50.0f64..50.0, 3..12),
        step in 0.05f64..2.0,
    ) {
        let spline = CubicSpline::natural(&values, 0.0, step).unwrap();
        for (i, &v) in values.iter().enumerate() {
            let at = spline.value(spline.knot(i));
            prop_assert!((at - v).abs() < 1e-9 * (1.0 + v.abs()), "knot {}: {} != {}", i, at, v);
        }
        let (lo, hi) = spline.domain();
        prop_assert!(spline.second_derivative(lo).abs() < 1e-9);
        prop_assert!(spline.second_derivative(hi).abs() < 1e-9);
    }

    #[test]
    fn closest_point_of_a_track_point_is_itself(u in 0.0f64..0.8) {
        let (tracks, id) = premade(PremadeShape::DoubleWell);
        let track = tracks.get(id).unwrap();
        let u = u.min(track.max_u());
        let hit = track.closest_point(track.point_at(u));
        prop_assert!(hit.distance < 1e-6, "distance {} at u={}", hit.distance, u);
    }
}
