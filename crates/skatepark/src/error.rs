//! Error type for rejected operations.
//!
//! Every variant is a precondition violation: the operation was refused
//! before any state was touched, so the previous track set and skater stay
//! fully valid. Numerical trouble (near-zero curvature radius, energy drift)
//! is never reported here; the integrator recovers from it locally.

use crate::track_set::TrackId;

/// Errors produced by track edits and configuration loading.
///
/// # Recovery Strategies
///
/// | Error Variant | Recovery Strategy |
/// |--------------|-------------------|
/// | [`TooFewControlPoints`](Error::TooFewControlPoints) | Keep the track as it was |
/// | [`InvalidSplitParameter`](Error::InvalidSplitParameter) | Split somewhere between knots |
/// | [`NotAttachable`](Error::NotAttachable) | Leave the tracks separate |
/// | [`EndpointsApart`](Error::EndpointsApart) | Snap the endpoints together first |
/// | [`UnknownTrack`](Error::UnknownTrack) | Drop the stale handle |
/// | [`InvalidConfig`](Error::InvalidConfig) | Fix the configuration value |
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// A track needs at least three control points.
    ///
    /// Raised when building a track or spline from fewer points, and when
    /// deleting or splitting would leave fewer than three.
    #[error("a track needs at least 3 control points, got {count}")]
    TooFewControlPoints {
        /// The number of points that would have remained.
        count: usize,
    },

    /// The split parameter is outside the track, too close to an end, or
    /// coincides with a control point.
    #[error("cannot split track at u = {u}")]
    InvalidSplitParameter {
        /// The rejected parameter.
        u: f64,
    },

    /// The track does not allow splitting.
    #[error("track {0} cannot be split")]
    NotSplittable(TrackId),

    /// The track cannot be dragged as a whole.
    #[error("track {0} cannot be moved")]
    NotDraggable(TrackId),

    /// The track's control points cannot be repositioned or removed.
    #[error("track {0} cannot be reconfigured")]
    NotConfigurable(TrackId),

    /// One of the tracks in a join does not accept connections.
    #[error("track {0} does not accept joins")]
    NotAttachable(TrackId),

    /// The endpoints being joined do not coincide.
    #[error("track endpoints are {distance} m apart, more than the join tolerance")]
    EndpointsApart {
        /// Distance between the two endpoints.
        distance: f64,
    },

    /// A track cannot be joined to itself.
    #[error("cannot join track {0} to itself")]
    SelfJoin(TrackId),

    /// Control point index past the end of the track.
    #[error("control point {index} out of range for a track with {len} points")]
    ControlPointOutOfRange {
        /// The requested index.
        index: usize,
        /// Number of control points on the track.
        len: usize,
    },

    /// The handle does not refer to a live track.
    #[error("no live track with id {0}")]
    UnknownTrack(TrackId),

    /// The track was not produced by a split or join, so there is nothing to
    /// undo, or its parents are no longer available.
    #[error("track {0} has no edit to undo")]
    NothingToUndo(TrackId),

    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The configuration text could not be parsed.
    #[error("failed to parse configuration: {0}")]
    ConfigParse(String),
}

/// A specialized [`Result`] type for skatepark operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Self::ConfigParse(err.to_string())
    }
}
