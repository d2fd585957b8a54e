//! Per-step skater snapshots.
//!
//! A [`SkaterState`] is a plain value: every transition (landing on a track,
//! leaving it, hitting the ground, moving along it) returns a new state and
//! leaves the old one untouched. The integrator chains these values through
//! a frame and commits only the last one with [`SkaterState::set_to_skater`].

use std::f64::consts::PI;

use crate::geometry::Vector2;
use crate::skater::Skater;
use crate::track::Track;
use crate::track_set::TrackId;

/// Floor on `|dP/du|` when converting arc speed to parametric speed.
const MIN_PARAMETRIC_SCALE: f64 = 1.0e-6;

/// Everything needed to evaluate the skater's energy and kinematics.
///
/// Gravity is stored signed (negative, pointing down) so that
/// `PE = -m * g * (y - reference_height)` is positive above the reference.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkaterState {
    /// Position in meters.
    pub position: Vector2,
    /// Velocity in meters per second.
    pub velocity: Vector2,
    /// Parametric position on the current track; zero in free fall.
    pub u: f64,
    /// `du/dt`, signed by direction of travel; zero in free fall.
    pub parametric_speed: f64,
    /// The track being ridden, or `None` in free fall.
    pub track: Option<TrackId>,
    /// Whether the skater rides on the side the track's left-hand normal
    /// points to (the upper side of a left-to-right track).
    pub on_top_side: bool,
    /// Body angle in radians.
    pub angle: f64,
    /// Energy dissipated by friction and impacts so far, in joules.
    pub thermal_energy: f64,
    /// Mass in kilograms.
    pub mass: f64,
    /// Signed gravitational acceleration (negative).
    pub gravity: f64,
    /// Height at which potential energy is zero.
    pub reference_height: f64,
    /// Whether the user is holding the skater.
    pub dragging: bool,
}

impl SkaterState {
    /// A free-falling state with no thermal energy.
    pub fn free_fall(position: Vector2, velocity: Vector2, mass: f64, gravity_magnitude: f64) -> Self {
        Self {
            position,
            velocity,
            u: 0.0,
            parametric_speed: 0.0,
            track: None,
            on_top_side: true,
            angle: 0.0,
            thermal_energy: 0.0,
            mass,
            gravity: -gravity_magnitude.abs(),
            reference_height: 0.0,
            dragging: false,
        }
    }

    /// Reads the live skater's fields.
    pub fn from_skater(skater: &Skater) -> Self {
        Self {
            position: skater.position(),
            velocity: skater.velocity(),
            u: skater.u(),
            parametric_speed: skater.parametric_speed(),
            track: skater.track(),
            on_top_side: skater.on_top_side(),
            angle: skater.angle(),
            thermal_energy: skater.thermal_energy(),
            mass: skater.mass(),
            gravity: skater.gravity(),
            reference_height: skater.reference_height(),
            dragging: skater.dragging(),
        }
    }

    /// Copies this state onto the live skater and fires its notifications.
    /// This is the only place a step's result becomes observable.
    pub fn set_to_skater(&self, skater: &mut Skater) {
        skater.commit(self);
    }

    /// An identical state.
    #[must_use]
    pub const fn copy(&self) -> Self {
        *self
    }

    /// Speed in meters per second.
    pub fn speed(&self) -> f64 {
        self.velocity.magnitude()
    }

    /// `½ m |v|²`.
    pub fn kinetic_energy(&self) -> f64 {
        0.5 * self.mass * self.velocity.magnitude_squared()
    }

    /// `-m g (y - y_ref)`.
    pub fn potential_energy(&self) -> f64 {
        -self.mass * self.gravity * (self.position.y - self.reference_height)
    }

    /// Kinetic + potential + thermal.
    pub fn total_energy(&self) -> f64 {
        self.kinetic_energy() + self.potential_energy() + self.thermal_energy
    }

    /// Whether the skater is riding a track.
    pub const fn is_on_track(&self) -> bool {
        self.track.is_some()
    }

    /// Signed speed along the track's tangent at the current `u`.
    pub fn arc_speed(&self, track: &Track) -> f64 {
        self.velocity.dot(track.tangent_at(self.u))
    }

    /// Body angle for a skater at `u` on the given side of `track`.
    pub fn angle_on(track: &Track, u: f64, on_top_side: bool) -> f64 {
        let angle = track.angle_at(u);
        if on_top_side { angle } else { angle + PI }
    }

    /// Lands on `track` at `u`. The velocity is projected onto the tangent
    /// and the kinetic energy of the discarded normal component becomes
    /// thermal energy.
    #[must_use]
    pub fn attach_to_track(&self, id: TrackId, track: &Track, u: f64, on_top_side: bool) -> Self {
        let tangent = track.tangent_at(u);
        let normal_speed = self.velocity.dot(tangent.perpendicular());
        let lost = 0.5 * self.mass * normal_speed * normal_speed;
        let state = Self {
            track: Some(id),
            on_top_side,
            thermal_energy: self.thermal_energy + lost,
            ..*self
        };
        state.update_on_track(track, u, self.velocity.dot(tangent), state.thermal_energy)
    }

    /// Places the skater at `u` on its current track moving with signed arc
    /// speed `arc_speed`, with the given thermal energy.
    #[must_use]
    pub fn update_on_track(&self, track: &Track, u: f64, arc_speed: f64, thermal_energy: f64) -> Self {
        let tangent = track.tangent_at(u);
        let scale = track.parametric_speed_scale(u).max(MIN_PARAMETRIC_SCALE);
        Self {
            position: track.point_at(u),
            velocity: tangent * arc_speed,
            u,
            parametric_speed: arc_speed / scale,
            angle: Self::angle_on(track, u, self.on_top_side),
            thermal_energy: thermal_energy.max(0.0),
            ..*self
        }
    }

    /// Leaves the track, keeping position and velocity.
    #[must_use]
    pub const fn leave_track(&self) -> Self {
        Self {
            track: None,
            u: 0.0,
            parametric_speed: 0.0,
            ..*self
        }
    }

    /// Stops on the ground: `y = 0`, at rest, upright, with the kinetic
    /// energy the skater had converted to thermal energy.
    #[must_use]
    pub fn strike_ground(&self) -> Self {
        Self {
            position: Vector2::new(self.position.x, 0.0),
            velocity: Vector2::zero(),
            u: 0.0,
            parametric_speed: 0.0,
            track: None,
            on_top_side: true,
            angle: 0.0,
            thermal_energy: self.thermal_energy + self.kinetic_energy(),
            ..*self
        }
    }

    /// Continues a ballistic flight at the given position and velocity.
    #[must_use]
    pub const fn continue_free_fall(&self, position: Vector2, velocity: Vector2) -> Self {
        Self {
            position,
            velocity,
            track: None,
            u: 0.0,
            parametric_speed: 0.0,
            ..*self
        }
    }

    /// Same state with a new thermal energy, clamped to be non-negative.
    #[must_use]
    pub fn with_thermal(&self, thermal_energy: f64) -> Self {
        Self {
            thermal_energy: thermal_energy.max(0.0),
            ..*self
        }
    }

    /// Same state with a new velocity.
    #[must_use]
    pub const fn with_velocity(&self, velocity: Vector2) -> Self {
        Self { velocity, ..*self }
    }

    /// Same state with a new position.
    #[must_use]
    pub const fn with_position(&self, position: Vector2) -> Self {
        Self { position, ..*self }
    }
}
