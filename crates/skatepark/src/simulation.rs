//! The simulation facade.
//!
//! [`Simulation`] owns the tracks, the skater, the configuration and the run
//! controls, and is the one entry point for the frame clock, the skater drag
//! gesture and track editing. Every command takes `&mut self`, so an edit can
//! never interleave with a step.
//!
//! ```rust
//! use skatepark::premade::{build_track_set, PremadeShape, TrackSetConfig};
//! use skatepark::{PhysicsConfig, Simulation, Vector2};
//!
//! let (tracks, _) = build_track_set(&TrackSetConfig::fixed(&[PremadeShape::Parabola])).unwrap();
//! let mut sim = Simulation::with_tracks(PhysicsConfig::default(), tracks).unwrap();
//!
//! sim.drag_start(Vector2::new(-3.0, 3.9));
//! sim.drag_end();
//! assert!(sim.skater().track().is_some());
//!
//! for _ in 0..60 {
//!     sim.tick(1.0 / 60.0);
//! }
//! assert!(sim.skater().speed() > 0.0);
//! ```

use tracing::{debug, trace};

use crate::config::{PhysicsConfig, TimeSpeed};
use crate::error::{Error, Result};
use crate::geometry::Vector2;
use crate::integrator::{Integrator, StepStats};
use crate::skater::Skater;
use crate::state::SkaterState;
use crate::track::{Track, TrackEnd, TrackOrigin};
use crate::track_set::{TrackId, TrackSet};

/// Frame length used by [`Simulation::step_once`].
pub const STEP_ONCE_DT: f64 = 1.0 / 60.0;

/// After a control-point drag the track is smoothed until its tightest
/// radius is at least this many meters.
const SMOOTHING_RADIUS: f64 = 0.2;

/// Upper bound on smoothing passes per edit.
const SMOOTHING_PASSES: usize = 20;

/// Tracks, skater and run controls.
#[derive(Debug)]
pub struct Simulation {
    config: PhysicsConfig,
    initial_config: PhysicsConfig,
    integrator: Integrator,
    tracks: TrackSet,
    initial_tracks: TrackSet,
    skater: Skater,
    paused: bool,
    last_stats: StepStats,
}

impl Simulation {
    /// Creates a simulation with no tracks.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if `config` does not validate.
    pub fn new(config: PhysicsConfig) -> Result<Self> {
        Self::with_tracks(config, TrackSet::new())
    }

    /// Creates a simulation over `tracks`. [`reset`](Self::reset) returns to
    /// these tracks.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if `config` does not validate.
    pub fn with_tracks(config: PhysicsConfig, tracks: TrackSet) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            integrator: Integrator::new(&config),
            skater: Skater::new(&config),
            initial_tracks: tracks.clone(),
            tracks,
            initial_config: config.clone(),
            config,
            paused: false,
            last_stats: StepStats::default(),
        })
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// The live configuration.
    pub const fn config(&self) -> &PhysicsConfig {
        &self.config
    }

    /// The tracks.
    pub const fn tracks(&self) -> &TrackSet {
        &self.tracks
    }

    /// The skater.
    pub const fn skater(&self) -> &Skater {
        &self.skater
    }

    /// The skater, for subscribing to its events.
    pub fn skater_mut(&mut self) -> &mut Skater {
        &mut self.skater
    }

    /// Diagnostics of the most recent step.
    pub const fn last_stats(&self) -> &StepStats {
        &self.last_stats
    }

    /// Whether the clock is ignored.
    pub const fn paused(&self) -> bool {
        self.paused
    }

    // ------------------------------------------------------------------
    // Run controls and environment
    // ------------------------------------------------------------------

    /// Pauses or resumes.
    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    /// Sets normal or slow motion.
    pub fn set_time_speed(&mut self, speed: TimeSpeed) {
        self.config.time_speed = speed;
    }

    /// Sets the friction coefficient; negative values count as zero.
    pub fn set_friction(&mut self, friction: f64) {
        self.config.friction = if friction.is_finite() { friction.max(0.0) } else { 0.0 };
        self.integrator = Integrator::new(&self.config);
    }

    /// Enables or disables roller coaster mode.
    pub fn set_stick_to_track(&mut self, stick: bool) {
        self.config.stick_to_track = stick;
        self.integrator = Integrator::new(&self.config);
    }

    /// Sets the gravity magnitude.
    pub fn set_gravity(&mut self, magnitude: f64) {
        if magnitude.is_finite() {
            self.config.gravity = magnitude.abs();
        }
        self.skater.set_gravity(self.config.gravity);
    }

    /// Sets the skater mass, clamped to the configured range.
    pub fn set_mass(&mut self, mass: f64) {
        self.skater.set_mass(mass);
    }

    /// Moves the zero of potential energy.
    pub fn set_reference_height(&mut self, height: f64) {
        if height.is_finite() {
            self.config.reference_height = height;
        }
        self.skater.set_reference_height(self.config.reference_height);
    }

    // ------------------------------------------------------------------
    // Clock
    // ------------------------------------------------------------------

    /// Advances by a wall-clock frame of `dt` seconds, scaled by the time
    /// speed. Does nothing while paused or while the skater is held.
    pub fn tick(&mut self, dt: f64) -> Option<&StepStats> {
        if self.paused || self.skater.dragging() {
            return None;
        }
        Some(self.advance(dt * self.config.time_speed.factor()))
    }

    /// Advances one frame even while paused.
    pub fn step_once(&mut self) -> Option<&StepStats> {
        if self.skater.dragging() {
            return None;
        }
        Some(self.advance(STEP_ONCE_DT * self.config.time_speed.factor()))
    }

    fn advance(&mut self, dt: f64) -> &StepStats {
        let state = SkaterState::from_skater(&self.skater);
        let outcome = self.integrator.step(&state, &self.tracks, dt);
        outcome.state.set_to_skater(&mut self.skater);
        self.last_stats = outcome.stats;
        &self.last_stats
    }

    // ------------------------------------------------------------------
    // Skater gesture
    // ------------------------------------------------------------------

    /// Picks the skater up at `pointer`.
    pub fn drag_start(&mut self, pointer: Vector2) {
        self.skater.start_drag();
        self.drag_move(pointer);
    }

    /// Moves the held skater. Within the snap distance of a physical track
    /// it sits on the track, on the side the pointer is on.
    pub fn drag_move(&mut self, pointer: Vector2) {
        if !self.skater.dragging() {
            trace!("drag_move without a drag in progress");
            return;
        }
        let position = Vector2::new(pointer.x, pointer.y.max(0.0));
        let snap = self.config.drag_snap_distance;
        let attach = self
            .tracks
            .closest_physical(position)
            .filter(|(_, hit)| hit.distance <= snap)
            .and_then(|(id, hit)| {
                let track = self.tracks.get(id)?;
                let normal = track.normal_at(hit.u);
                let side = (position - hit.point).dot(normal);
                let on_top = if side == 0.0 { normal.y >= 0.0 } else { side > 0.0 };
                Some((id, track, hit.u, on_top))
            });
        self.skater.drag_to(position, attach);
    }

    /// Lets go of the skater onto the track it is hovering over, if that
    /// track still exists.
    pub fn drag_end(&mut self) {
        if !self.skater.dragging() {
            trace!("drag_end without a drag in progress");
            return;
        }
        let target = self.skater.track().map(|id| (id, self.skater.u()));
        self.skater.released(&self.tracks, target);
    }

    // ------------------------------------------------------------------
    // Track editing
    // ------------------------------------------------------------------

    /// Adds a track and returns its handle.
    pub fn add_track(&mut self, track: Track) -> TrackId {
        self.tracks.insert(track)
    }

    /// Moves control point `index` of track `id` toward `pointer`. An
    /// endpoint that comes within the snap distance of another track's
    /// endpoint is pinned onto it; the join happens when the drag ends.
    /// Returns where the user's point ended up.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`TrackSet::move_control_point`].
    pub fn drag_control_point(&mut self, id: TrackId, index: usize, pointer: Vector2) -> Result<Vector2> {
        let placed = self.tracks.move_control_point(id, index, pointer)?;
        let snap = self.tracks.find_snap_target(id, index, self.config.drag_snap_distance);
        if let (Some((target, at)), Some(track)) = (snap, self.tracks.get_mut(id)) {
            track.snap_control_point(index, at, target)?;
        }
        self.follow_edit(&[id], &[id]);
        Ok(placed)
    }

    /// Finishes a control-point drag. A point pinned to a live endpoint
    /// joins the two tracks and the joined handle is returned; otherwise the
    /// track is smoothed and lifted above the ground. A track that vanished
    /// mid-gesture is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotConfigurable`] for a track whose points cannot be
    /// edited, or the errors of the join.
    pub fn end_control_point_drag(&mut self, id: TrackId, index: usize) -> Result<Option<TrackId>> {
        let Some(track) = self.tracks.get(id) else {
            trace!(track = %id, "control point drag ended on a removed track");
            return Ok(None);
        };
        if !track.flags().configurable {
            return Err(Error::NotConfigurable(id));
        }

        let join = track
            .control_points()
            .get(index)
            .and_then(|cp| cp.snap_target)
            .and_then(|target| {
                let end = track.end_of(index)?;
                let other_end = self.tracks.get(target.track)?.end_of(target.index)?;
                Some((end, target.track, other_end))
            });
        if let Some((end, other, other_end)) = join {
            return self.join_tracks(id, end, other, other_end).map(Some);
        }

        if let Some(track) = self.tracks.get_mut(id) {
            let passes = track.smooth_sharpest_point(SMOOTHING_RADIUS, SMOOTHING_PASSES)?;
            if passes > 0 {
                debug!(track = %id, passes, "track smoothed");
            }
        }
        self.tracks.bump_above_ground(id)?;
        self.follow_edit(&[id], &[id]);
        Ok(None)
    }

    /// Splits a track at `u`.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`TrackSet::split`].
    pub fn split_track(&mut self, id: TrackId, u: f64) -> Result<(TrackId, TrackId)> {
        let (a, b) = self.tracks.split(id, u)?;
        self.follow_edit(&[id], &[a, b]);
        Ok((a, b))
    }

    /// Joins two tracks at the given ends.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`TrackSet::join`].
    pub fn join_tracks(&mut self, a: TrackId, a_end: TrackEnd, b: TrackId, b_end: TrackEnd) -> Result<TrackId> {
        let joined = self.tracks.join(a, a_end, b, b_end)?;
        self.tracks.bump_above_ground(joined)?;
        self.follow_edit(&[a, b], &[joined]);
        Ok(joined)
    }

    /// Deletes one control point.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`TrackSet::delete_control_point`].
    pub fn delete_control_point(&mut self, id: TrackId, index: usize) -> Result<()> {
        self.tracks.delete_control_point(id, index)?;
        self.follow_edit(&[id], &[id]);
        Ok(())
    }

    /// Moves a whole track.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`TrackSet::translate`].
    pub fn translate_track(&mut self, id: TrackId, delta: Vector2) -> Result<()> {
        self.tracks.translate(id, delta)?;
        self.follow_edit(&[id], &[id]);
        Ok(())
    }

    /// Finishes dragging a whole track by lifting it above the ground.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownTrack`] for a stale handle.
    pub fn end_track_drag(&mut self, id: TrackId) -> Result<()> {
        if self.tracks.bump_above_ground(id)? > 0.0 {
            self.follow_edit(&[id], &[id]);
        }
        Ok(())
    }

    /// Deletes a track. A skater riding it falls.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownTrack`] for a stale handle.
    pub fn remove_track(&mut self, id: TrackId) -> Result<()> {
        self.tracks.remove(id)?;
        self.follow_edit(&[id], &[]);
        Ok(())
    }

    /// Reverses the split or join that produced `id`.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`TrackSet::undo_edit`].
    pub fn undo_track_edit(&mut self, id: TrackId) -> Result<Vec<TrackId>> {
        let mut affected = vec![id];
        if let Some(TrackOrigin::Split { sibling, .. }) = self.tracks.get(id).and_then(Track::origin) {
            affected.push(sibling);
        }
        let restored = self.tracks.undo_edit(id)?;
        self.follow_edit(&affected, &restored);
        Ok(restored)
    }

    /// Keeps the skater on the edited geometry. If it was riding (or
    /// hovering over) one of `edited`, it moves to the closest point of the
    /// nearest of `candidates`, or falls if there is none.
    fn follow_edit(&mut self, edited: &[TrackId], candidates: &[TrackId]) {
        let Some(current) = self.skater.track() else {
            return;
        };
        if !edited.contains(&current) {
            return;
        }

        let position = self.skater.position();
        let on_top = self.skater.on_top_side();
        let nearest = candidates
            .iter()
            .filter_map(|&id| self.tracks.get(id).map(|t| (id, t, t.closest_point(position))))
            .min_by(|a, b| a.2.distance.total_cmp(&b.2.distance));

        match (nearest, self.skater.dragging()) {
            (Some((id, track, hit)), true) => self.skater.drag_to(hit.point, Some((id, track, hit.u, on_top))),
            (Some((id, track, hit)), false) => self.skater.reattach(id, track, hit.u),
            (None, true) => self.skater.drag_to(position, None),
            (None, false) => {
                debug!(track = %current, "track removed under the skater");
                self.skater.detach();
            }
        }
    }

    // ------------------------------------------------------------------
    // Reset
    // ------------------------------------------------------------------

    /// Restores the initial tracks and configuration, and resets the skater
    /// and run controls.
    pub fn reset(&mut self) {
        self.tracks = self.initial_tracks.clone();
        self.config = self.initial_config.clone();
        self.integrator = Integrator::new(&self.config);
        self.paused = false;
        self.last_stats = StepStats::default();
        self.skater.reset();
    }

    /// Replaces every track, as when switching to another park. The skater
    /// goes back to the start with its mass kept, and [`reset`](Self::reset)
    /// now returns to `tracks`.
    pub fn set_tracks(&mut self, tracks: TrackSet) {
        self.initial_tracks = tracks.clone();
        self.tracks = tracks;
        self.last_stats = StepStats::default();
        self.skater.return_to_initial_position();
        debug!(tracks = self.tracks.len(), "track set replaced");
    }

    /// Sends the skater back to where it was last released.
    pub fn return_skater(&mut self) {
        self.skater.return_skater(&self.tracks);
    }
}
