//! Unit tests for skatepark error types.
//!
//! Tests verify:
//! - Which operations refuse with which variant
//! - Display formatting
//! - Clone and PartialEq derives
//! - Result type alias and `?` propagation

use skatepark::premade::{build_track_set, PremadeShape, TrackSetConfig};
use skatepark::{Error, PhysicsConfig, Result, Track, TrackEnd, TrackFlags, TrackSet, Vector2};
use std::error::Error as StdError;

fn line(x0: f64, n: usize, flags: TrackFlags) -> Track {
    let points: Vec<Vector2> = (0..n).map(|i| Vector2::new(x0 + i as f64, 1.0)).collect();
    Track::from_points(&points, flags).unwrap()
}

mod creation_tests {
    use super::*;

    #[test]
    fn test_too_few_control_points() {
        let err = Track::from_points(&[Vector2::zero(), Vector2::new(1.0, 0.0)], TrackFlags::FIXED)
            .unwrap_err();
        assert_eq!(err, Error::TooFewControlPoints { count: 2 });
    }

    #[test]
    fn test_split_on_a_knot_is_rejected() {
        let track = line(0.0, 5, TrackFlags::EDITABLE);
        let err = track.split(track.knot(2)).unwrap_err();
        assert!(matches!(err, Error::InvalidSplitParameter { .. }));
    }

    #[test]
    fn test_fixed_track_refuses_edits() {
        let mut set = TrackSet::new();
        let id = set.insert(line(0.0, 4, TrackFlags::FIXED));

        assert_eq!(set.split(id, 0.3).unwrap_err(), Error::NotSplittable(id));
        assert_eq!(
            set.translate(id, Vector2::new(1.0, 0.0)).unwrap_err(),
            Error::NotDraggable(id)
        );
        assert_eq!(
            set.move_control_point(id, 1, Vector2::zero()).unwrap_err(),
            Error::NotConfigurable(id)
        );
    }

    #[test]
    fn test_join_errors() {
        let mut set = TrackSet::new();
        let a = set.insert(line(0.0, 3, TrackFlags::EDITABLE));
        let b = set.insert(line(5.0, 3, TrackFlags::EDITABLE));

        assert_eq!(
            set.join(a, TrackEnd::End, a, TrackEnd::Start).unwrap_err(),
            Error::SelfJoin(a)
        );
        assert!(matches!(
            set.join(a, TrackEnd::End, b, TrackEnd::Start).unwrap_err(),
            Error::EndpointsApart { .. }
        ));
    }

    #[test]
    fn test_stale_handle() {
        let mut set = TrackSet::new();
        let id = set.insert(line(0.0, 3, TrackFlags::EDITABLE));
        set.remove(id).unwrap();
        assert_eq!(set.remove(id).unwrap_err(), Error::UnknownTrack(id));
        assert_eq!(set.undo_edit(id).unwrap_err(), Error::UnknownTrack(id));
    }

    #[test]
    fn test_nothing_to_undo() {
        let mut set = TrackSet::new();
        let id = set.insert(line(0.0, 3, TrackFlags::EDITABLE));
        assert_eq!(set.undo_edit(id).unwrap_err(), Error::NothingToUndo(id));
    }

    #[test]
    fn test_control_point_out_of_range() {
        let mut set = TrackSet::new();
        let id = set.insert(line(0.0, 3, TrackFlags::EDITABLE));
        assert_eq!(
            set.move_control_point(id, 7, Vector2::zero()).unwrap_err(),
            Error::ControlPointOutOfRange { index: 7, len: 3 }
        );
    }

    #[test]
    fn test_config_errors() {
        assert!(matches!(
            PhysicsConfig::default().with_mass(500.0).validate().unwrap_err(),
            Error::InvalidConfig(_)
        ));
        assert!(matches!(
            PhysicsConfig::from_toml_str("gravity = [").unwrap_err(),
            Error::ConfigParse(_)
        ));
    }
}

mod display_tests {
    use super::*;

    #[test]
    fn test_display_includes_details() {
        let msg = Error::TooFewControlPoints { count: 2 }.to_string();
        assert!(msg.contains("at least 3"));
        assert!(msg.contains('2'));

        let msg = Error::ControlPointOutOfRange { index: 9, len: 4 }.to_string();
        assert!(msg.contains('9'));
        assert!(msg.contains('4'));
    }

    #[test]
    fn test_display_names_the_track() {
        let mut set = TrackSet::new();
        let id = set.insert(line(0.0, 3, TrackFlags::FIXED));
        let msg = set.split(id, 0.5).unwrap_err().to_string();
        assert!(msg.contains(&id.to_string()), "message was: {msg}");
    }

    #[test]
    fn test_debug_format() {
        let debug = format!("{:?}", Error::InvalidConfig("mass".into()));
        assert!(debug.contains("InvalidConfig"));
        assert!(debug.contains("mass"));
    }
}

mod derive_tests {
    use super::*;

    #[test]
    fn test_clone_and_eq() {
        let err = Error::EndpointsApart { distance: 0.25 };
        assert_eq!(err.clone(), err);
        assert_ne!(err, Error::EndpointsApart { distance: 0.5 });
    }

    #[test]
    fn test_implements_std_error() {
        let err: Box<dyn StdError> = Box::new(Error::ConfigParse("bad".into()));
        assert!(err.source().is_none());
        assert!(err.to_string().contains("bad"));
    }
}

mod chaining_tests {
    use super::*;

    fn split_premade(shape: PremadeShape, u: f64) -> Result<usize> {
        let (mut tracks, ids) = build_track_set(&TrackSetConfig::playground(&[shape]))?;
        tracks.split(ids[0], u)?;
        Ok(tracks.len())
    }

    #[test]
    fn test_question_mark_propagates() {
        assert_eq!(split_premade(PremadeShape::DoubleWell, 0.5), Ok(2));
        // The slope only has three points, so either half would be too short.
        assert!(matches!(
            split_premade(PremadeShape::Slope, 0.5),
            Err(Error::TooFewControlPoints { .. })
        ));
    }

    #[test]
    fn test_boxes_into_dyn_error() {
        fn load(text: &str) -> std::result::Result<PhysicsConfig, Box<dyn StdError>> {
            Ok(PhysicsConfig::from_toml_str(text)?)
        }
        assert!(load("friction = 0.3").is_ok());
        assert!(load("friction = -1.0").is_err());
    }
}
