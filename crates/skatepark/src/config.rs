//! Physics configuration.
//!
//! [`PhysicsConfig`] holds every tunable of the simulation: the environment
//! (gravity, friction), the skater's mass and its allowed range, and the
//! integrator's numeric limits. It deserializes from TOML with all fields
//! optional:
//!
//! ```rust
//! use skatepark::PhysicsConfig;
//!
//! let config = PhysicsConfig::from_toml_str("friction = 0.05\nmass = 75.0").unwrap();
//! assert_eq!(config.friction, 0.05);
//! assert_eq!(config.gravity, 9.8);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::geometry::Vector2;

/// Earth gravity in m/s².
pub const EARTH_GRAVITY: f64 = 9.8;

/// Playback rate of simulated time relative to wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeSpeed {
    /// Real time.
    #[default]
    Normal,
    /// Quarter speed.
    Slow,
}

impl TimeSpeed {
    /// Multiplier applied to each frame's `dt`.
    pub const fn factor(self) -> f64 {
        match self {
            Self::Normal => 1.0,
            Self::Slow => 0.25,
        }
    }
}

/// Tunables for the environment, the skater and the integrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    // ========================================================================
    // Environment
    // ========================================================================
    /// Magnitude of gravitational acceleration in m/s² (points down).
    pub gravity: f64,

    /// Coefficient of kinetic and static friction between skater and track.
    pub friction: f64,

    /// Height at which potential energy is zero.
    pub reference_height: f64,

    // ========================================================================
    // Skater
    // ========================================================================
    /// Skater mass in kilograms.
    pub mass: f64,

    /// Smallest mass the skater may be given.
    pub min_mass: f64,

    /// Largest mass the skater may be given.
    pub max_mass: f64,

    // ========================================================================
    // Integrator
    // ========================================================================
    /// Longest substep in seconds.
    pub max_substep: f64,

    /// Frames longer than this (e.g. after the clock stalled) are shortened.
    pub max_frame_dt: f64,

    /// Energy drift in joules above which a correction is reported.
    pub energy_tolerance: f64,

    /// Slack in meters allowed when deciding whether a falling skater
    /// crossed a track.
    pub landing_tolerance: f64,

    /// A dragged skater within this distance of a track snaps onto it.
    pub drag_snap_distance: f64,

    /// Roller coaster mode: the track holds the skater on both sides.
    pub stick_to_track: bool,

    /// Playback rate.
    pub time_speed: TimeSpeed,

    // Tables last so the struct serializes to valid TOML.
    /// Where the skater appears after a full reset.
    pub start_position: Vector2,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: EARTH_GRAVITY,
            friction: 0.0,
            reference_height: 0.0,
            mass: 60.0,
            min_mass: 25.0,
            max_mass: 100.0,
            max_substep: 0.005,
            max_frame_dt: 0.25,
            energy_tolerance: 1.0e-6,
            landing_tolerance: 0.01,
            drag_snap_distance: 0.5,
            stick_to_track: false,
            time_speed: TimeSpeed::Normal,
            start_position: Vector2::new(3.5, 0.0),
        }
    }
}

impl PhysicsConfig {
    /// Creates the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a TOML document and validates it. Missing keys take their
    /// default values.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigParse`] for malformed TOML or mistyped values
    /// and [`Error::InvalidConfig`] for out-of-range values.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks every value is finite and in range.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        let finite = [
            ("gravity", self.gravity),
            ("friction", self.friction),
            ("reference_height", self.reference_height),
            ("mass", self.mass),
            ("min_mass", self.min_mass),
            ("max_mass", self.max_mass),
            ("start_position.x", self.start_position.x),
            ("start_position.y", self.start_position.y),
            ("max_substep", self.max_substep),
            ("max_frame_dt", self.max_frame_dt),
            ("energy_tolerance", self.energy_tolerance),
            ("landing_tolerance", self.landing_tolerance),
            ("drag_snap_distance", self.drag_snap_distance),
        ];
        if let Some((name, _)) = finite.iter().find(|(_, v)| !v.is_finite()) {
            return Err(Error::InvalidConfig(format!("{name} must be finite")));
        }

        let non_negative = [
            ("gravity", self.gravity),
            ("friction", self.friction),
            ("energy_tolerance", self.energy_tolerance),
            ("landing_tolerance", self.landing_tolerance),
            ("drag_snap_distance", self.drag_snap_distance),
        ];
        if let Some((name, v)) = non_negative.iter().find(|(_, v)| *v < 0.0) {
            return Err(Error::InvalidConfig(format!(
                "{name} must not be negative, got {v}"
            )));
        }

        if self.min_mass <= 0.0 {
            return Err(Error::InvalidConfig(format!(
                "min_mass must be positive, got {}",
                self.min_mass
            )));
        }
        if self.min_mass > self.max_mass {
            return Err(Error::InvalidConfig(format!(
                "min_mass {} exceeds max_mass {}",
                self.min_mass, self.max_mass
            )));
        }
        if !(self.min_mass..=self.max_mass).contains(&self.mass) {
            return Err(Error::InvalidConfig(format!(
                "mass {} outside [{}, {}]",
                self.mass, self.min_mass, self.max_mass
            )));
        }
        if self.start_position.y < 0.0 {
            return Err(Error::InvalidConfig(
                "start_position must not be below the ground".to_string(),
            ));
        }
        if self.max_substep <= 0.0 {
            return Err(Error::InvalidConfig(format!(
                "max_substep must be positive, got {}",
                self.max_substep
            )));
        }
        if self.max_frame_dt < self.max_substep {
            return Err(Error::InvalidConfig(format!(
                "max_frame_dt {} is shorter than max_substep {}",
                self.max_frame_dt, self.max_substep
            )));
        }
        Ok(())
    }

    /// Clamps a requested mass to the allowed range.
    pub fn clamp_mass(&self, mass: f64) -> f64 {
        if mass.is_nan() {
            return self.mass;
        }
        mass.clamp(self.min_mass, self.max_mass)
    }

    /// Sets the gravity magnitude.
    pub fn with_gravity(mut self, gravity: f64) -> Self {
        self.gravity = gravity;
        self
    }

    /// Sets the friction coefficient.
    pub fn with_friction(mut self, friction: f64) -> Self {
        self.friction = friction;
        self
    }

    /// Sets the skater mass.
    pub fn with_mass(mut self, mass: f64) -> Self {
        self.mass = mass;
        self
    }

    /// Sets the reference height.
    pub fn with_reference_height(mut self, height: f64) -> Self {
        self.reference_height = height;
        self
    }

    /// Sets the longest substep.
    pub fn with_max_substep(mut self, max_substep: f64) -> Self {
        self.max_substep = max_substep;
        self
    }

    /// Enables or disables roller coaster mode.
    pub fn with_stick_to_track(mut self, stick: bool) -> Self {
        self.stick_to_track = stick;
        self
    }

    /// Sets the playback rate.
    pub fn with_time_speed(mut self, speed: TimeSpeed) -> Self {
        self.time_speed = speed;
        self
    }
}
