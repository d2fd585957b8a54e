//! Command-line interface for `skatepark-sim`.
//!
//! # Examples
//!
//! ```bash
//! # Five seconds on the parabola, sampled ten times a second
//! skatepark-sim
//!
//! # The loop with friction, as JSON lines
//! skatepark-sim --track loop --friction 0.1 --format json
//!
//! # Drop the skater from a chosen point, with settings from a file
//! skatepark-sim --track double-well --x 1.0 --y 6.0 --config physics.toml
//! ```

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use skatepark::premade::PremadeShape;
use skatepark::{PhysicsConfig, TimeSpeed, Vector2};

/// Drops a skater onto a premade track and reports its energy over time.
#[derive(Parser, Debug, Clone)]
#[command(name = "skatepark-sim", author, version, about)]
pub struct Cli {
    /// Track to ride
    #[arg(long, short = 't', value_enum, default_value_t = TrackChoice::Parabola)]
    pub track: TrackChoice,

    /// Simulated seconds
    #[arg(long, short = 'd', default_value_t = 5.0)]
    pub duration: f64,

    /// Frames per simulated second
    #[arg(long, default_value_t = 60)]
    pub fps: u32,

    /// Emit a sample every this many frames
    #[arg(long, default_value_t = 6)]
    pub sample_every: usize,

    /// Drop point x; defaults to a point near the start of the track
    #[arg(long, requires = "y", allow_negative_numbers = true)]
    pub x: Option<f64>,

    /// Drop point y
    #[arg(long, requires = "x")]
    pub y: Option<f64>,

    /// Physics settings file (TOML)
    #[arg(long, short = 'c', env = "SKATEPARK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Friction coefficient
    #[arg(long)]
    pub friction: Option<f64>,

    /// Gravity magnitude in m/s²
    #[arg(long)]
    pub gravity: Option<f64>,

    /// Skater mass in kg, clamped to the configured range
    #[arg(long)]
    pub mass: Option<f64>,

    /// Keep the skater on the track on both sides
    #[arg(long)]
    pub stick: bool,

    /// Run in slow motion
    #[arg(long)]
    pub slow: bool,

    /// Output format
    #[arg(long, short = 'f', value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Write logs as JSON
    #[arg(long)]
    pub log_json: bool,

    /// Enable verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(long, short = 'v', action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Premade tracks selectable from the command line.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackChoice {
    /// A symmetric valley
    Parabola,
    /// A ramp down to the ground
    Slope,
    /// Two valleys separated by a hump
    DoubleWell,
    /// A valley with a vertical loop
    Loop,
}

impl From<TrackChoice> for PremadeShape {
    fn from(choice: TrackChoice) -> Self {
        match choice {
            TrackChoice::Parabola => Self::Parabola,
            TrackChoice::Slope => Self::Slope,
            TrackChoice::DoubleWell => Self::DoubleWell,
            TrackChoice::Loop => Self::Loop,
        }
    }
}

/// Report formats.
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Aligned columns
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

impl Cli {
    /// The drop point, if one was given.
    pub fn drop_point(&self) -> Option<Vector2> {
        self.x.zip(self.y).map(|(x, y)| Vector2::new(x, y))
    }

    /// Applies the command-line overrides on top of `config`.
    pub fn apply(&self, mut config: PhysicsConfig) -> PhysicsConfig {
        if let Some(friction) = self.friction {
            config.friction = friction;
        }
        if let Some(gravity) = self.gravity {
            config.gravity = gravity;
        }
        if let Some(mass) = self.mass {
            config.mass = config.clamp_mass(mass);
        }
        if self.stick {
            config.stick_to_track = true;
        }
        if self.slow {
            config.time_speed = TimeSpeed::Slow;
        }
        config
    }

    /// Log filter directive for the verbosity count.
    pub const fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}
