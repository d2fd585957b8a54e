#![forbid(unsafe_code)]
// Allow these clippy lints for physics/math code readability
#![allow(clippy::must_use_candidate)]
#![allow(clippy::suboptimal_flops)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::use_self)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::float_cmp)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::struct_field_names)]

//! # Skatepark
//!
//! A skater on user-editable tracks: a point mass moving under gravity and
//! friction along parametric splines, flying off when the track cannot hold
//! it, landing again, and keeping kinetic, potential and thermal energy
//! consistent at every step.
//!
//! Skatepark provides:
//! - **Track**: control points, the natural cubic spline through them, and
//!   geometric queries and edits (split, join, smooth, translate)
//! - **TrackSet**: the arena owning every track behind stable [`TrackId`]s
//! - **SkaterState**: an immutable per-step snapshot with energy accessors
//! - **Integrator**: the substepping step function with energy correction
//! - **Skater**: the live, observable skater
//! - **Simulation**: everything above behind one `&mut` facade
//!
//! ## Example
//!
//! ```rust
//! use skatepark::premade::{build_track_set, PremadeShape, TrackSetConfig};
//! use skatepark::{Integrator, PhysicsConfig, SkaterState, Vector2};
//!
//! let config = PhysicsConfig::default();
//! let (tracks, ids) = build_track_set(&TrackSetConfig::fixed(&[PremadeShape::Parabola])).unwrap();
//! let track = tracks.get(ids[0]).unwrap();
//!
//! // Start at rest part way up the left side.
//! let u = track.knot(1) * 0.25;
//! let start = SkaterState::free_fall(track.point_at(u), Vector2::zero(), config.mass, config.gravity)
//!     .attach_to_track(ids[0], track, u, true);
//!
//! let integrator = Integrator::new(&config);
//! let mut state = start;
//! for _ in 0..120 {
//!     state = integrator.step(&state, &tracks, 1.0 / 60.0).state;
//! }
//!
//! // Frictionless: no energy is lost.
//! assert!((state.total_energy() - start.total_energy()).abs() < 1e-6);
//! ```
//!
//! ## Units and conventions
//!
//! - Meters, seconds, kilograms and joules throughout.
//! - `y` points up and the ground is `y = 0`.
//! - Gravity is configured as a positive magnitude and stored negative.
//! - Curvature is signed: positive when a track turns left as `u` grows.

mod config;
mod error;
mod geometry;
mod integrator;
mod skater;
mod state;
mod track;
mod track_set;

pub mod premade;
pub mod simulation;
pub mod spline;

pub use config::{PhysicsConfig, TimeSpeed, EARTH_GRAVITY};
pub use error::{Error, Result};
pub use geometry::{Bounds, Vector2};
pub use integrator::{Integrator, StepOutcome, StepStats, Transition};
pub use simulation::Simulation;
pub use skater::{Direction, ListenerId, Skater, SkaterEvent, StartingSnapshot};
pub use spline::{CubicSpline, Curvature};
pub use state::SkaterState;
pub use track::{ClosestPoint, ControlPoint, ControlPointRef, Track, TrackEnd, TrackFlags, TrackOrigin};
pub use track_set::{TrackId, TrackSet, JOIN_TOLERANCE};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::config::{PhysicsConfig, TimeSpeed};
    pub use crate::error::{Error, Result};
    pub use crate::geometry::{Bounds, Vector2};
    pub use crate::integrator::{Integrator, StepOutcome, StepStats, Transition};
    pub use crate::premade::{PremadeShape, TrackSetConfig, build_track_set};
    pub use crate::simulation::Simulation;
    pub use crate::skater::{Direction, Skater, SkaterEvent};
    pub use crate::state::SkaterState;
    pub use crate::track::{Track, TrackEnd, TrackFlags};
    pub use crate::track_set::{TrackId, TrackSet};
}
