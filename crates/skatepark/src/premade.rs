//! Premade track shapes and track-set construction.
//!
//! A scene is described by a [`TrackSetConfig`]: which shapes to build, what
//! the user may do with them, and where their control points may go.
//! [`build_track_set`] turns it into a [`TrackSet`].
//!
//! ```rust
//! use skatepark::premade::{build_track_set, PremadeShape, TrackSetConfig};
//!
//! let (tracks, ids) = build_track_set(&TrackSetConfig::fixed(&[PremadeShape::Parabola])).unwrap();
//! assert_eq!(tracks.len(), 1);
//! assert!(!tracks.get(ids[0]).unwrap().flags().draggable);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::geometry::{Bounds, Vector2};
use crate::track::{ControlPoint, Track, TrackFlags};
use crate::track_set::{TrackId, TrackSet};

/// The region editable tracks live in.
pub const PLAY_AREA: Bounds = Bounds {
    min_x: -10.0,
    min_y: 0.0,
    max_x: 10.0,
    max_y: 10.0,
};

/// How far a control point of a configurable premade track may be dragged
/// from where it started, in each direction.
pub const CONTROL_POINT_LEEWAY: f64 = 1.0;

/// A built-in track shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PremadeShape {
    /// A symmetric valley.
    Parabola,
    /// A ramp running down to the ground.
    Slope,
    /// Two valleys separated by a hump.
    DoubleWell,
    /// A valley with a vertical loop in the middle.
    Loop,
}

impl PremadeShape {
    /// Every shape, in menu order.
    pub const ALL: [Self; 4] = [Self::Parabola, Self::Slope, Self::DoubleWell, Self::Loop];

    /// The shape's control points, left to right.
    pub fn control_points(self) -> Vec<Vector2> {
        let points: &[(f64, f64)] = match self {
            Self::Parabola => &[(-4.0, 6.0), (0.0, 0.0), (4.0, 6.0)],
            Self::Slope => &[(-4.0, 6.0), (-2.0, 1.2), (2.0, 0.0)],
            Self::DoubleWell => &[(-4.0, 5.0), (-2.0, 0.5), (0.0, 2.0), (2.0, 1.0), (4.0, 5.0)],
            Self::Loop => &[
                (-6.0, 4.0),
                (-3.0, 0.8),
                (-0.3, 0.3),
                (2.0, 2.3),
                (0.0, 4.3),
                (-2.0, 2.3),
                (0.3, 0.3),
                (3.0, 0.8),
                (6.0, 4.0),
            ],
        };
        points.iter().map(|&(x, y)| Vector2::new(x, y)).collect()
    }

    /// Lowercase name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Parabola => "parabola",
            Self::Slope => "slope",
            Self::DoubleWell => "double-well",
            Self::Loop => "loop",
        }
    }
}

/// What to build and how editable it is.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackSetConfig {
    /// Shapes to build, one track each.
    pub shapes: Vec<PremadeShape>,
    /// Capabilities given to every track.
    pub flags: TrackFlags,
    /// Region every control point must stay in.
    pub available_bounds: Option<Bounds>,
    /// Limit each control point to a box of [`CONTROL_POINT_LEEWAY`]
    /// around its starting position.
    pub limit_control_points: bool,
    /// Endpoints cannot be dragged; only interior points can.
    pub fixed_endpoints: bool,
}

impl TrackSetConfig {
    /// Premade tracks that cannot be changed.
    pub fn fixed(shapes: &[PremadeShape]) -> Self {
        Self {
            shapes: shapes.to_vec(),
            flags: TrackFlags::FIXED,
            available_bounds: None,
            limit_control_points: false,
            fixed_endpoints: true,
        }
    }

    /// Premade tracks whose interior points can be nudged within a small
    /// box, but which cannot be moved, split or joined.
    pub fn configurable(shapes: &[PremadeShape]) -> Self {
        Self {
            shapes: shapes.to_vec(),
            flags: TrackFlags {
                configurable: true,
                ..TrackFlags::FIXED
            },
            available_bounds: Some(PLAY_AREA),
            limit_control_points: true,
            fixed_endpoints: true,
        }
    }

    /// Fully editable tracks inside the play area.
    pub fn playground(shapes: &[PremadeShape]) -> Self {
        Self {
            shapes: shapes.to_vec(),
            flags: TrackFlags::EDITABLE,
            available_bounds: Some(PLAY_AREA),
            limit_control_points: false,
            fixed_endpoints: false,
        }
    }
}

/// Builds one track for `shape` with the capabilities from `config`.
///
/// # Errors
///
/// Propagates geometry errors; the premade shapes always build.
pub fn build_track(shape: PremadeShape, config: &TrackSetConfig) -> Result<Track> {
    let positions = shape.control_points();
    let last = positions.len() - 1;
    let points = positions
        .into_iter()
        .enumerate()
        .map(|(i, p)| {
            let endpoint = i == 0 || i == last;
            let mut cp = if !config.flags.configurable || (config.fixed_endpoints && endpoint) {
                ControlPoint::fixed(p)
            } else {
                ControlPoint::new(p)
            };
            if config.limit_control_points {
                cp = cp.with_limit_bounds(Bounds::new(p.x, p.y, p.x, p.y).dilated(CONTROL_POINT_LEEWAY));
            }
            cp
        })
        .collect();

    let mut track = Track::new(points, config.flags)?;
    if let Some(bounds) = config.available_bounds {
        track = track.with_available_bounds(bounds);
    }
    track.bump_above_ground()?;
    Ok(track)
}

/// Builds every shape of `config` into a new track set. The handles are
/// returned in the order of `config.shapes`.
///
/// # Errors
///
/// Propagates geometry errors; the premade shapes always build.
pub fn build_track_set(config: &TrackSetConfig) -> Result<(TrackSet, Vec<TrackId>)> {
    let mut tracks = TrackSet::new();
    let mut ids = Vec::with_capacity(config.shapes.len());
    for &shape in &config.shapes {
        ids.push(tracks.insert(build_track(shape, config)?));
    }
    Ok((tracks, ids))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_shape_builds_above_ground() {
        for shape in PremadeShape::ALL {
            let track = build_track(shape, &TrackSetConfig::fixed(&[shape])).unwrap();
            assert!(track.bounds().min_y >= -1e-9, "{} dips below ground", shape.name());
            assert!(track.len() >= 3);
        }
    }

    #[test]
    fn test_fixed_tracks_cannot_be_edited() {
        let (mut tracks, ids) = build_track_set(&TrackSetConfig::fixed(&[PremadeShape::Parabola])).unwrap();
        let id = ids[0];
        assert!(tracks.translate(id, Vector2::new(1.0, 0.0)).is_err());
        assert!(tracks.move_control_point(id, 1, Vector2::new(0.0, 1.0)).is_err());
        assert!(tracks.split(id, 0.2).is_err());
    }

    #[test]
    fn test_configurable_points_are_limited() {
        let config = TrackSetConfig::configurable(&[PremadeShape::Parabola]);
        let (mut tracks, ids) = build_track_set(&config).unwrap();
        let id = ids[0];

        let moved = tracks.move_control_point(id, 1, Vector2::new(0.0, 5.0)).unwrap();
        assert!(moved.y <= CONTROL_POINT_LEEWAY + 1e-9);
        // Endpoints are pinned.
        assert!(tracks.move_control_point(id, 0, Vector2::new(-4.0, 7.0)).is_err());
        assert!(tracks.translate(id, Vector2::new(1.0, 0.0)).is_err());
    }

    #[test]
    fn test_playground_tracks_are_editable() {
        let config = TrackSetConfig::playground(&[PremadeShape::Parabola, PremadeShape::DoubleWell]);
        let (mut tracks, ids) = build_track_set(&config).unwrap();
        assert_eq!(ids.len(), 2);
        assert!(tracks.translate(ids[0], Vector2::new(0.5, 0.5)).is_ok());
        assert!(tracks.split(ids[1], 0.5).is_ok());
    }

    #[test]
    fn test_shape_serde_names() {
        let json = serialized_name(PremadeShape::DoubleWell);
        assert_eq!(json, PremadeShape::DoubleWell.name());
    }

    fn serialized_name(shape: PremadeShape) -> String {
        toml::Value::try_from(shape)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default()
    }
}
