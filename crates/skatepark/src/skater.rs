//! The live skater.
//!
//! [`Skater`] is the authoritative, mutable record observed by the outside
//! world. The integrator never writes to it directly: each frame's final
//! [`SkaterState`] is committed through [`SkaterState::set_to_skater`], which
//! fires [`SkaterEvent::Updated`] and [`SkaterEvent::EnergyChanged`] once.
//! User commands (dragging, reset, return) mutate it directly.

use std::fmt;

use tracing::{debug, trace};

use crate::config::PhysicsConfig;
use crate::geometry::Vector2;
use crate::state::SkaterState;
use crate::track::Track;
use crate::track_set::{TrackId, TrackSet};

/// Horizontal speed below which the facing direction is left unchanged.
const DIRECTION_SPEED_EPSILON: f64 = 1.0e-6;

/// Notifications emitted by the skater. They carry no payload; listeners
/// read whatever they need from the skater afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkaterEvent {
    /// Some field changed.
    Updated,
    /// The energies were recomputed.
    EnergyChanged,
}

/// Handle returned by [`Skater::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Which way the skater faces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    /// Facing -x.
    Left,
    /// Facing +x.
    #[default]
    Right,
}

/// Where the skater was last released, used by [`Skater::return_skater`].
#[derive(Debug, Clone, PartialEq)]
pub struct StartingSnapshot {
    /// Release position.
    pub position: Vector2,
    /// Track released onto, if any.
    pub track: Option<TrackId>,
    /// Parametric position on that track.
    pub u: f64,
    /// Side of that track.
    pub on_top_side: bool,
    /// Body angle at release.
    pub angle: f64,
    /// The track's control-point positions at release time. The skater only
    /// returns onto the track if they are unchanged.
    pub track_points: Option<Vec<Vector2>>,
}

impl StartingSnapshot {
    fn free(position: Vector2) -> Self {
        Self {
            position,
            track: None,
            u: 0.0,
            on_top_side: true,
            angle: 0.0,
            track_points: None,
        }
    }
}

type Listener = Box<dyn FnMut(SkaterEvent)>;

/// The skater as seen by the rest of the application.
pub struct Skater {
    position: Vector2,
    velocity: Vector2,
    u: f64,
    parametric_speed: f64,
    track: Option<TrackId>,
    on_top_side: bool,
    angle: f64,
    direction: Direction,
    dragging: bool,

    mass: f64,
    min_mass: f64,
    max_mass: f64,
    gravity: f64,
    reference_height: f64,

    kinetic_energy: f64,
    potential_energy: f64,
    thermal_energy: f64,
    total_energy: f64,

    defaults: PhysicsConfig,
    starting: StartingSnapshot,

    listeners: Vec<(ListenerId, Listener)>,
    next_listener: u64,
}

impl fmt::Debug for Skater {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Skater")
            .field("position", &self.position)
            .field("velocity", &self.velocity)
            .field("u", &self.u)
            .field("track", &self.track)
            .field("on_top_side", &self.on_top_side)
            .field("dragging", &self.dragging)
            .field("mass", &self.mass)
            .field("thermal_energy", &self.thermal_energy)
            .field("total_energy", &self.total_energy)
            .field("listeners", &self.listeners.len())
            .finish_non_exhaustive()
    }
}

impl Default for Skater {
    fn default() -> Self {
        Self::new(&PhysicsConfig::default())
    }
}

impl Skater {
    /// Creates a skater at rest at the configured start position.
    pub fn new(config: &PhysicsConfig) -> Self {
        let mut skater = Self {
            position: config.start_position,
            velocity: Vector2::zero(),
            u: 0.0,
            parametric_speed: 0.0,
            track: None,
            on_top_side: true,
            angle: 0.0,
            direction: Direction::default(),
            dragging: false,
            mass: config.clamp_mass(config.mass),
            min_mass: config.min_mass,
            max_mass: config.max_mass,
            gravity: -config.gravity.abs(),
            reference_height: config.reference_height,
            kinetic_energy: 0.0,
            potential_energy: 0.0,
            thermal_energy: 0.0,
            total_energy: 0.0,
            defaults: config.clone(),
            starting: StartingSnapshot::free(config.start_position),
            listeners: Vec::new(),
            next_listener: 0,
        };
        skater.recompute_energy();
        skater
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// Position in meters.
    pub const fn position(&self) -> Vector2 {
        self.position
    }

    /// Velocity in meters per second.
    pub const fn velocity(&self) -> Vector2 {
        self.velocity
    }

    /// Speed in meters per second.
    pub fn speed(&self) -> f64 {
        self.velocity.magnitude()
    }

    /// Parametric position on the current track.
    pub const fn u(&self) -> f64 {
        self.u
    }

    /// `du/dt` on the current track.
    pub const fn parametric_speed(&self) -> f64 {
        self.parametric_speed
    }

    /// The track being ridden (or, while dragging, the track the skater
    /// would be released onto).
    pub const fn track(&self) -> Option<TrackId> {
        self.track
    }

    /// Whether the skater is on the side the track normal points to.
    pub const fn on_top_side(&self) -> bool {
        self.on_top_side
    }

    /// Body angle in radians.
    pub const fn angle(&self) -> f64 {
        self.angle
    }

    /// Facing direction.
    pub const fn direction(&self) -> Direction {
        self.direction
    }

    /// Whether the user is holding the skater.
    pub const fn dragging(&self) -> bool {
        self.dragging
    }

    /// Mass in kilograms.
    pub const fn mass(&self) -> f64 {
        self.mass
    }

    /// Signed gravity (negative).
    pub const fn gravity(&self) -> f64 {
        self.gravity
    }

    /// Height of zero potential energy.
    pub const fn reference_height(&self) -> f64 {
        self.reference_height
    }

    /// Kinetic energy in joules.
    pub const fn kinetic_energy(&self) -> f64 {
        self.kinetic_energy
    }

    /// Potential energy in joules.
    pub const fn potential_energy(&self) -> f64 {
        self.potential_energy
    }

    /// Thermal energy in joules.
    pub const fn thermal_energy(&self) -> f64 {
        self.thermal_energy
    }

    /// Total energy in joules.
    pub const fn total_energy(&self) -> f64 {
        self.total_energy
    }

    /// The last release point.
    pub const fn starting(&self) -> &StartingSnapshot {
        &self.starting
    }

    // ------------------------------------------------------------------
    // Listeners
    // ------------------------------------------------------------------

    /// Registers a callback for every event.
    pub fn subscribe(&mut self, listener: impl FnMut(SkaterEvent) + 'static) -> ListenerId {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Removes a callback. Returns `false` if it was not registered.
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(l, _)| *l != id);
        self.listeners.len() != before
    }

    fn emit(&mut self, event: SkaterEvent) {
        for (_, listener) in &mut self.listeners {
            listener(event);
        }
    }

    fn emit_changed(&mut self) {
        self.emit(SkaterEvent::Updated);
        self.emit(SkaterEvent::EnergyChanged);
    }

    // ------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------

    /// Recomputes the energies from the kinematics and notifies listeners.
    pub fn update_energy(&mut self) {
        self.recompute_energy();
        self.emit_changed();
    }

    fn recompute_energy(&mut self) {
        self.kinetic_energy = 0.5 * self.mass * self.velocity.magnitude_squared();
        self.potential_energy = -self.mass * self.gravity * (self.position.y - self.reference_height);
        self.total_energy = self.kinetic_energy + self.potential_energy + self.thermal_energy;
    }

    /// Sets the mass, clamped to the configured range.
    pub fn set_mass(&mut self, mass: f64) {
        self.mass = if mass.is_nan() {
            self.mass
        } else {
            mass.clamp(self.min_mass, self.max_mass)
        };
        self.update_energy();
    }

    /// Sets the gravity magnitude; the sign is ignored.
    pub fn set_gravity(&mut self, magnitude: f64) {
        if magnitude.is_finite() {
            self.gravity = -magnitude.abs();
        }
        self.update_energy();
    }

    /// Moves the zero of potential energy.
    pub fn set_reference_height(&mut self, height: f64) {
        if height.is_finite() {
            self.reference_height = height;
        }
        self.update_energy();
    }

    /// Discards accumulated thermal energy.
    pub fn clear_thermal(&mut self) {
        self.thermal_energy = 0.0;
        self.update_energy();
    }

    /// Restores every field to its configured default, including mass.
    pub fn reset(&mut self) {
        let config = self.defaults.clone();
        self.reset_to(&config, config.clamp_mass(config.mass));
        debug!("skater reset");
    }

    /// Like [`reset`](Self::reset) but keeps the current mass.
    pub fn reset_position(&mut self) {
        let config = self.defaults.clone();
        self.reset_to(&config, self.mass);
    }

    /// Sends the skater back to the configured start when the tracks it could
    /// have been riding are replaced. Same effect as
    /// [`reset_position`](Self::reset_position).
    pub fn return_to_initial_position(&mut self) {
        self.reset_position();
    }

    fn reset_to(&mut self, config: &PhysicsConfig, mass: f64) {
        self.position = config.start_position;
        self.velocity = Vector2::zero();
        self.u = 0.0;
        self.parametric_speed = 0.0;
        self.track = None;
        self.on_top_side = true;
        self.angle = 0.0;
        self.direction = Direction::default();
        self.dragging = false;
        self.mass = mass;
        self.gravity = -config.gravity.abs();
        self.reference_height = config.reference_height;
        self.thermal_energy = 0.0;
        self.starting = StartingSnapshot::free(config.start_position);
        self.update_energy();
    }

    /// Returns to the last release point at rest with no thermal energy.
    ///
    /// The skater is put back on the release track only if that track is
    /// still live and its control points have not moved since; otherwise it
    /// is placed at the release position in free fall.
    pub fn return_skater(&mut self, tracks: &TrackSet) {
        let snapshot = self.starting.clone();
        let track = snapshot.track.and_then(|id| {
            tracks
                .get(id)
                .filter(|t| snapshot.track_points.as_deref() == Some(&t.control_point_positions()[..]))
                .map(|t| (id, t))
        });

        match track {
            Some((id, t)) => {
                self.position = t.point_at(snapshot.u);
                self.track = Some(id);
                self.u = snapshot.u;
                self.on_top_side = snapshot.on_top_side;
                self.angle = SkaterState::angle_on(t, snapshot.u, snapshot.on_top_side);
            }
            None => {
                if snapshot.track.is_some() {
                    debug!("release track changed, returning to free fall");
                }
                self.position = snapshot.position;
                self.track = None;
                self.u = 0.0;
                self.on_top_side = true;
                self.angle = snapshot.angle;
            }
        }
        self.velocity = Vector2::zero();
        self.parametric_speed = 0.0;
        self.dragging = false;
        self.thermal_energy = 0.0;
        self.update_energy();
    }

    /// Grabs the skater. It stops and its thermal energy is discarded.
    pub fn start_drag(&mut self) {
        self.dragging = true;
        self.velocity = Vector2::zero();
        self.parametric_speed = 0.0;
        self.thermal_energy = 0.0;
        self.update_energy();
    }

    /// Moves the held skater. `attach` is the tentative release target:
    /// track, parametric position and side.
    pub fn drag_to(&mut self, position: Vector2, attach: Option<(TrackId, &Track, f64, bool)>) {
        if !self.dragging {
            trace!("drag_to ignored, skater not held");
            return;
        }
        match attach {
            Some((id, track, u, on_top_side)) => {
                self.position = track.point_at(u);
                self.track = Some(id);
                self.u = u;
                self.on_top_side = on_top_side;
                self.angle = SkaterState::angle_on(track, u, on_top_side);
            }
            None => {
                self.position = position;
                self.track = None;
                self.u = 0.0;
                self.on_top_side = true;
                self.angle = 0.0;
            }
        }
        self.update_energy();
    }

    /// Lets go of the skater, onto `target` (track and `u`) if that track is
    /// still live, otherwise into free fall where it is. The release point
    /// becomes the new starting snapshot.
    pub fn released(&mut self, tracks: &TrackSet, target: Option<(TrackId, f64)>) {
        self.dragging = false;
        self.velocity = Vector2::zero();
        self.parametric_speed = 0.0;

        let live = target.and_then(|(id, u)| tracks.get(id).map(|t| (id, t, u)));
        let track_points = match live {
            Some((id, track, u)) => {
                self.position = track.point_at(u);
                self.track = Some(id);
                self.u = u;
                self.angle = SkaterState::angle_on(track, u, self.on_top_side);
                Some(track.control_point_positions())
            }
            None => {
                if target.is_some() {
                    trace!("release target no longer exists");
                }
                self.track = None;
                self.u = 0.0;
                self.on_top_side = true;
                None
            }
        };
        self.starting = StartingSnapshot {
            position: self.position,
            track: self.track,
            u: self.u,
            on_top_side: self.on_top_side,
            angle: self.angle,
            track_points,
        };
        debug!(x = self.position.x, y = self.position.y, track = ?self.track, "skater released");
        self.update_energy();
    }

    /// Puts the skater at `u` on `track`, keeping its speed along the new
    /// tangent. Used after the track it was riding was edited.
    pub(crate) fn reattach(&mut self, id: TrackId, track: &Track, u: f64) {
        let state = SkaterState::from_skater(self);
        let arc_speed = state.velocity.dot(track.tangent_at(u));
        let moved = SkaterState {
            track: Some(id),
            ..state
        }
        .update_on_track(track, u, arc_speed, state.thermal_energy);
        self.commit(&moved);
    }

    /// Drops off the current track, keeping position and velocity.
    pub(crate) fn detach(&mut self) {
        let state = SkaterState::from_skater(self).leave_track();
        self.commit(&state);
    }

    pub(crate) fn commit(&mut self, state: &SkaterState) {
        self.position = state.position;
        self.velocity = state.velocity;
        self.u = state.u;
        self.parametric_speed = state.parametric_speed;
        self.track = state.track;
        self.on_top_side = state.on_top_side;
        self.angle = state.angle;
        self.thermal_energy = state.thermal_energy.max(0.0);
        self.mass = state.mass;
        self.gravity = state.gravity;
        self.reference_height = state.reference_height;
        self.dragging = state.dragging;
        if self.velocity.x > DIRECTION_SPEED_EPSILON {
            self.direction = Direction::Right;
        } else if self.velocity.x < -DIRECTION_SPEED_EPSILON {
            self.direction = Direction::Left;
        }
        self.update_energy();
    }
}
