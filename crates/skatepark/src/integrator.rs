//! The step function.
//!
//! [`Integrator::step`] advances a [`SkaterState`] by one frame. The frame is
//! clamped to `max_frame_dt` and cut into equal substeps no longer than
//! `max_substep`. Each substep runs in one of two regimes:
//!
//! - **Free fall**: exact ballistic motion under constant gravity, checked
//!   for crossing a physical track (landing) or the ground.
//! - **On track**: one-dimensional motion along the arc with tangential
//!   gravity and friction proportional to the normal force. The skater
//!   leaves when the track would have to pull it, or runs off an end.
//!
//! After every substep the total energy is compared with its value at the
//! start of the substep and the kinematics are corrected so that
//! `KE = E0 - PE - thermal`:
//!
//! 1. If the target kinetic energy is non-negative, the speed is rescaled
//!    and the direction kept.
//! 2. Otherwise the friction estimate for the substep is reduced, never
//!    below the thermal energy the substep started with.
//! 3. If that still leaves a deficit, an on-track skater is moved back
//!    toward the substep start to the point where it would have stopped
//!    (a turnaround) and its speed is set to zero; a free-falling skater is
//!    lowered to the matching height.
//!
//! Drift above `energy_tolerance` is logged and counted in [`StepStats`].

use tracing::{debug, trace};

use crate::config::PhysicsConfig;
use crate::geometry::Vector2;
use crate::state::SkaterState;
use crate::track::Track;
use crate::track_set::{TrackId, TrackSet};

/// Speeds below this (m/s) count as being at rest.
const REST_SPEED: f64 = 1.0e-6;

/// A falling skater this close to a track cannot tell which side it is on.
const SIDE_EPSILON: f64 = 1.0e-9;

/// Landing requires the crossing to lie this far inside the parameter range.
const END_MARGIN: f64 = 1.0e-6;

/// Bisection passes when searching for a turnaround point.
const TURNAROUND_ITERATIONS: usize = 60;

/// A regime change that happened during a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Free fall ended on a track.
    Landed(TrackId),
    /// The track could no longer hold the skater.
    LeftTrack(TrackId),
    /// The skater ran off an end of the track.
    FlewOffEnd(TrackId),
    /// The track being ridden was removed.
    TrackVanished(TrackId),
    /// Free fall ended on the ground.
    StruckGround,
}

/// What happened inside one call to [`Integrator::step`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepStats {
    /// Substeps taken.
    pub substeps: usize,
    /// Substeps whose drift exceeded the tolerance.
    pub energy_corrections: usize,
    /// Largest absolute drift seen before correction, in joules.
    pub max_drift: f64,
    /// Regime changes, in order.
    pub transitions: Vec<Transition>,
}

/// The state after a step and how it was reached.
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutcome {
    /// The new state, not yet committed to the skater.
    pub state: SkaterState,
    /// Diagnostics.
    pub stats: StepStats,
}

/// Advances skater states through time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Integrator {
    friction: f64,
    max_substep: f64,
    max_frame_dt: f64,
    energy_tolerance: f64,
    landing_tolerance: f64,
    stick_to_track: bool,
}

impl Default for Integrator {
    fn default() -> Self {
        Self::new(&PhysicsConfig::default())
    }
}

impl Integrator {
    /// Creates an integrator from the numeric settings of `config`.
    pub fn new(config: &PhysicsConfig) -> Self {
        Self {
            friction: config.friction.max(0.0),
            max_substep: config.max_substep,
            max_frame_dt: config.max_frame_dt,
            energy_tolerance: config.energy_tolerance,
            landing_tolerance: config.landing_tolerance,
            stick_to_track: config.stick_to_track,
        }
    }

    /// Sets the friction coefficient.
    pub fn with_friction(mut self, friction: f64) -> Self {
        self.friction = friction.max(0.0);
        self
    }

    /// Enables or disables roller coaster mode.
    pub fn with_stick_to_track(mut self, stick: bool) -> Self {
        self.stick_to_track = stick;
        self
    }

    /// The friction coefficient.
    pub fn friction(&self) -> f64 {
        self.friction
    }

    /// Whether the track holds the skater on both sides.
    pub fn stick_to_track(&self) -> bool {
        self.stick_to_track
    }

    /// Number of substeps a frame of `dt` seconds is split into.
    pub fn substep_count(&self, dt: f64) -> usize {
        let dt = self.clamp_dt(dt);
        if dt <= 0.0 {
            return 0;
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let count = (dt / self.max_substep).ceil() as usize;
        count.max(1)
    }

    fn clamp_dt(&self, dt: f64) -> f64 {
        if dt.is_finite() {
            dt.clamp(0.0, self.max_frame_dt)
        } else {
            0.0
        }
    }

    /// Advances `state` by `dt` seconds against the physical tracks of
    /// `tracks`. A state being dragged is returned unchanged.
    pub fn step(&self, state: &SkaterState, tracks: &TrackSet, dt: f64) -> StepOutcome {
        let mut stats = StepStats::default();
        if state.dragging {
            return StepOutcome {
                state: *state,
                stats,
            };
        }

        let count = self.substep_count(dt);
        if count == 0 {
            return StepOutcome {
                state: *state,
                stats,
            };
        }
        let h = self.clamp_dt(dt) / count as f64;

        let mut current = *state;
        let mut ignore = None;
        for _ in 0..count {
            let (next, left) = self.substep(&current, tracks, h, ignore, &mut stats);
            current = next;
            ignore = left;
            stats.substeps += 1;
        }
        StepOutcome {
            state: current,
            stats,
        }
    }

    /// One substep. Returns the new state and the track just left, which
    /// must not be landed on during the next substep.
    fn substep(
        &self,
        state: &SkaterState,
        tracks: &TrackSet,
        dt: f64,
        ignore: Option<TrackId>,
        stats: &mut StepStats,
    ) -> (SkaterState, Option<TrackId>) {
        let Some(id) = state.track else {
            return (self.free_fall(state, tracks, dt, ignore, stats), None);
        };
        match tracks.get(id) {
            Some(track) => self.on_track(state, id, track, tracks, dt, stats),
            None => {
                trace!(track = %id, "track vanished under the skater");
                stats.transitions.push(Transition::TrackVanished(id));
                (self.free_fall(&state.leave_track(), tracks, dt, None, stats), None)
            }
        }
    }

    // ------------------------------------------------------------------
    // Free fall
    // ------------------------------------------------------------------

    fn free_fall(
        &self,
        state: &SkaterState,
        tracks: &TrackSet,
        dt: f64,
        ignore: Option<TrackId>,
        stats: &mut StepStats,
    ) -> SkaterState {
        let p0 = state.position;
        let v0 = state.velocity;

        if p0.y <= 0.0 && v0.y <= 0.0 {
            if p0.y == 0.0 && v0 == Vector2::zero() {
                return *state;
            }
            stats.transitions.push(Transition::StruckGround);
            return state.strike_ground();
        }

        let e0 = state.total_energy();
        let g = Vector2::new(0.0, state.gravity);
        let p1 = p0 + v0 * dt + g * (0.5 * dt * dt);
        let v1 = v0 + g * dt;

        if let Some((id, track, landed)) = self.land(state, p1, v1, tracks, ignore) {
            stats.transitions.push(Transition::Landed(id));
            debug!(track = %id, u = landed.u, on_top = landed.on_top_side, "skater landed");
            let heading = if landed.parametric_speed < 0.0 { -1.0 } else { 1.0 };
            return self.correct_on_track(
                &landed,
                track,
                e0,
                state.thermal_energy,
                None,
                false,
                heading,
                stats,
            );
        }

        if p1.y < 0.0 {
            let t = ground_impact_time(p0.y, v0.y, state.gravity, dt);
            let impact = state.continue_free_fall(Vector2::new(p0.x + v0.x * t, 0.0), v0 + g * t);
            let impact = self.correct_free_fall(&impact, e0, stats);
            stats.transitions.push(Transition::StruckGround);
            debug!(x = impact.position.x, speed = impact.speed(), "skater struck the ground");
            return impact.strike_ground();
        }

        let next = state.continue_free_fall(p1, v1);
        self.correct_free_fall(&next, e0, stats)
    }

    /// The first physical track whose surface the segment `p0 -> p1`
    /// crosses while moving toward it, with the landed state.
    fn land<'a>(
        &self,
        state: &SkaterState,
        p1: Vector2,
        v1: Vector2,
        tracks: &'a TrackSet,
        ignore: Option<TrackId>,
    ) -> Option<(TrackId, &'a Track, SkaterState)> {
        let p0 = state.position;
        let reach = p0.distance(p1) + self.landing_tolerance;

        for (id, track) in tracks.physical() {
            if Some(id) == ignore || !track.bounds().dilated(reach).contains(p1) {
                continue;
            }
            let before = track.closest_point(p0);
            let after = track.closest_point(p1);
            if before.distance > reach || after.distance > reach {
                continue;
            }
            if after.u <= track.min_u() + END_MARGIN || after.u >= track.max_u() - END_MARGIN {
                continue;
            }

            let side_before = (p0 - before.point).dot(track.normal_at(before.u));
            let normal = track.normal_at(after.u);
            let side_after = (p1 - after.point).dot(normal);
            if side_before.abs() < SIDE_EPSILON || side_before.signum() == side_after.signum() {
                continue;
            }
            if v1.dot(normal) * side_before >= 0.0 {
                continue;
            }

            let landed = state
                .continue_free_fall(p1, v1)
                .attach_to_track(id, track, after.u, side_before > 0.0);
            return Some((id, track, landed));
        }
        None
    }

    fn correct_free_fall(&self, state: &SkaterState, e0: f64, stats: &mut StepStats) -> SkaterState {
        self.record_drift(state.total_energy() - e0, stats);

        let target = e0 - state.potential_energy() - state.thermal_energy;
        let speed = state.speed();
        if target >= 0.0 && speed > REST_SPEED {
            let scale = (2.0 * target / state.mass).sqrt() / speed;
            return state.with_velocity(state.velocity * scale);
        }

        let weight = -state.mass * state.gravity;
        if weight <= 0.0 {
            return *state;
        }
        let y = state.reference_height + (e0 - state.thermal_energy - state.kinetic_energy()) / weight;
        state.with_position(Vector2::new(state.position.x, y))
    }

    // ------------------------------------------------------------------
    // On track
    // ------------------------------------------------------------------

    fn on_track(
        &self,
        state: &SkaterState,
        id: TrackId,
        track: &Track,
        tracks: &TrackSet,
        dt: f64,
        stats: &mut StepStats,
    ) -> (SkaterState, Option<TrackId>) {
        let e0 = state.total_energy();
        let mass = state.mass;
        let u0 = state.u;
        let tangent = track.tangent_at(u0);
        let normal = tangent.perpendicular();
        let kappa = track.curvature_at(u0).kappa;
        let g = Vector2::new(0.0, state.gravity);
        let s0 = state.velocity.dot(tangent);

        // Force along the normal the track must supply to keep the skater on
        // the curve.
        let normal_force = mass * (s0 * s0 * kappa - g.dot(normal));
        let side = if state.on_top_side { 1.0 } else { -1.0 };
        if !self.stick_to_track && normal_force * side < 0.0 {
            stats.transitions.push(Transition::LeftTrack(id));
            debug!(track = %id, u = u0, speed = s0.abs(), "skater left the track");
            let flying = state.leave_track();
            return (self.free_fall(&flying, tracks, dt, Some(id), stats), Some(id));
        }

        let a_gravity = g.dot(tangent);
        let friction_acc = self.friction * normal_force.abs() / mass;
        if s0.abs() < REST_SPEED && a_gravity.abs() <= friction_acc {
            let rest = state.update_on_track(
                track,
                u0,
                0.0,
                state.thermal_energy + state.kinetic_energy(),
            );
            return (rest, None);
        }

        let heading = if s0.abs() >= REST_SPEED {
            s0.signum()
        } else {
            a_gravity.signum()
        };
        let accel = a_gravity - heading * friction_acc;
        let mut s1 = s0 + accel * dt;
        let mut ds = 0.5 * (s0 + s1) * dt;
        let stopped = friction_acc > 0.0 && s1 * heading < 0.0;
        if stopped {
            s1 = 0.0;
            ds = if accel == 0.0 {
                0.0
            } else {
                -s0 * s0 / (2.0 * accel)
            };
        }

        let u1 = track.parametric_distance(u0, ds);
        let thermal1 = state.thermal_energy + friction_acc * mass * ds.abs();

        if !track.contains_u(u1) {
            let u_end = u1.clamp(track.min_u(), track.max_u());
            let at_end = state.update_on_track(track, u_end, s1, thermal1);
            let at_end = self.correct_on_track(
                &at_end,
                track,
                e0,
                state.thermal_energy,
                Some(u0),
                false,
                heading,
                stats,
            );
            if at_end.arc_speed(track).abs() < REST_SPEED {
                return (at_end, None);
            }
            stats.transitions.push(Transition::FlewOffEnd(id));
            debug!(track = %id, u = u_end, "skater ran off the end of the track");
            return (at_end.leave_track(), Some(id));
        }

        let candidate = state.update_on_track(track, u1, s1, thermal1);
        let corrected = self.correct_on_track(
            &candidate,
            track,
            e0,
            state.thermal_energy,
            Some(u0),
            stopped,
            heading,
            stats,
        );
        (corrected, None)
    }

    /// Applies the energy correction to an on-track state.
    ///
    /// `thermal0` is the thermal energy at the start of the substep,
    /// `anchor` the parametric position the substep started from (if it
    /// started on this track), `stopped` whether friction brought the
    /// skater to rest, and `heading` the direction to use if the candidate
    /// has no speed of its own.
    #[allow(clippy::too_many_arguments)]
    fn correct_on_track(
        &self,
        candidate: &SkaterState,
        track: &Track,
        e0: f64,
        thermal0: f64,
        anchor: Option<f64>,
        stopped: bool,
        heading: f64,
        stats: &mut StepStats,
    ) -> SkaterState {
        self.record_drift(candidate.total_energy() - e0, stats);

        let pe = candidate.potential_energy();
        let mut thermal = candidate.thermal_energy;
        if e0 - pe - thermal < 0.0 {
            thermal = thermal0.max(e0 - pe);
        }
        let ke = e0 - pe - thermal;
        let u = candidate.u;

        if ke >= 0.0 {
            if stopped {
                return candidate.update_on_track(track, u, 0.0, thermal + ke);
            }
            let s = candidate.arc_speed(track);
            let direction = if s == 0.0 { heading } else { s.signum() };
            let speed = (2.0 * ke / candidate.mass).sqrt();
            return candidate.update_on_track(track, u, direction * speed, thermal);
        }

        match anchor {
            Some(u0) => {
                let budget = e0 - thermal0;
                let turnaround = Self::turnaround(track, candidate, u0, budget);
                trace!(u = turnaround, "turnaround");
                candidate.update_on_track(track, turnaround, 0.0, thermal0)
            }
            None => candidate.update_on_track(track, u, 0.0, thermal),
        }
    }

    /// The parametric position between `u0` and the candidate's `u` where
    /// the potential energy reaches `budget`.
    fn turnaround(track: &Track, state: &SkaterState, u0: f64, budget: f64) -> f64 {
        let pe = |u: f64| -state.mass * state.gravity * (track.point_at(u).y - state.reference_height);
        let (mut lo, mut hi) = (u0, state.u);
        for _ in 0..TURNAROUND_ITERATIONS {
            let mid = 0.5 * (lo + hi);
            if pe(mid) <= budget {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        lo
    }

    fn record_drift(&self, drift: f64, stats: &mut StepStats) {
        let drift = drift.abs();
        stats.max_drift = stats.max_drift.max(drift);
        if drift > self.energy_tolerance {
            stats.energy_corrections += 1;
            debug!(drift, "energy drift corrected");
        }
    }
}

/// Time until a body at height `y0` with vertical speed `vy` reaches the
/// ground, limited to `[0, dt]`.
fn ground_impact_time(y0: f64, vy: f64, gravity: f64, dt: f64) -> f64 {
    let t = if gravity.abs() > f64::EPSILON {
        let disc = (vy * vy - 2.0 * gravity * y0).max(0.0);
        (vy + disc.sqrt()) / -gravity
    } else if vy < 0.0 {
        -y0 / vy
    } else {
        dt
    };
    t.clamp(0.0, dt)
}
