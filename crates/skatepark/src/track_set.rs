//! The track arena.
//!
//! Tracks are addressed by [`TrackId`] handles instead of references. Tracks
//! consumed by a split or join are retired rather than dropped, so the
//! handles stored in [`TrackOrigin`] stay resolvable and the edit can be
//! undone. Every lookup is an existence check; a stale handle yields `None`
//! or [`Error::UnknownTrack`], never a dangling reference.

use std::collections::BTreeMap;
use std::fmt;

use tracing::debug;

use crate::error::{Error, Result};
use crate::geometry::Vector2;
use crate::track::{ClosestPoint, ControlPointRef, Track, TrackEnd, TrackOrigin};

/// Endpoints closer than this may be joined.
pub const JOIN_TOLERANCE: f64 = 1.0e-3;

/// Stable handle of a track in a [`TrackSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TrackId(u32);

impl TrackId {
    /// The raw handle value.
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Owns every track of a simulation.
#[derive(Debug, Clone, Default)]
pub struct TrackSet {
    live: BTreeMap<TrackId, Track>,
    retired: BTreeMap<TrackId, Track>,
    next_id: u32,
}

impl TrackSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a track and returns its handle.
    pub fn insert(&mut self, track: Track) -> TrackId {
        let id = TrackId(self.next_id);
        self.next_id += 1;
        self.live.insert(id, track);
        id
    }

    /// The live track with this handle.
    pub fn get(&self, id: TrackId) -> Option<&Track> {
        self.live.get(&id)
    }

    /// Mutable access to a live track.
    pub fn get_mut(&mut self, id: TrackId) -> Option<&mut Track> {
        self.live.get_mut(&id)
    }

    fn live_mut(&mut self, id: TrackId) -> Result<&mut Track> {
        self.live.get_mut(&id).ok_or(Error::UnknownTrack(id))
    }

    fn live_ref(&self, id: TrackId) -> Result<&Track> {
        self.live.get(&id).ok_or(Error::UnknownTrack(id))
    }

    /// Whether the handle refers to a live track.
    pub fn contains(&self, id: TrackId) -> bool {
        self.live.contains_key(&id)
    }

    /// Number of live tracks.
    pub fn len(&self) -> usize {
        self.live.len()
    }

    /// Whether there are no live tracks.
    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    /// Live tracks in handle order.
    pub fn iter(&self) -> impl Iterator<Item = (TrackId, &Track)> {
        self.live.iter().map(|(id, t)| (*id, t))
    }

    /// Live tracks the skater interacts with.
    pub fn physical(&self) -> impl Iterator<Item = (TrackId, &Track)> {
        self.iter().filter(|(_, t)| t.flags().physical)
    }

    /// Removes a live track, along with any retired tracks it descends from.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownTrack`] for a stale handle.
    pub fn remove(&mut self, id: TrackId) -> Result<Track> {
        let track = self.live.remove(&id).ok_or(Error::UnknownTrack(id))?;
        let mut pending: Vec<TrackOrigin> = track.origin().into_iter().collect();
        while let Some(origin) = pending.pop() {
            let parents: Vec<TrackId> = match origin {
                TrackOrigin::Joined { parents } => parents.to_vec(),
                // The sibling may still be live and will need the parent to undo.
                TrackOrigin::Split { parent, sibling } if !self.live.contains_key(&sibling) => {
                    vec![parent]
                }
                TrackOrigin::Split { .. } => Vec::new(),
            };
            for parent in parents {
                if let Some(retired) = self.retired.remove(&parent) {
                    pending.extend(retired.origin());
                }
            }
        }
        debug!(track = %id, "track removed");
        Ok(track)
    }

    /// Splits a track at `u`. The original is retired and the two halves are
    /// returned in order of increasing `u`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownTrack`], [`Error::NotSplittable`], or the
    /// errors of [`Track::split`]. Nothing changes on error.
    pub fn split(&mut self, id: TrackId, u: f64) -> Result<(TrackId, TrackId)> {
        let track = self.live_ref(id)?;
        if !track.flags().splittable {
            return Err(Error::NotSplittable(id));
        }
        let (mut first, mut second) = track.split(u)?;

        let first_id = TrackId(self.next_id);
        let second_id = TrackId(self.next_id + 1);
        first.set_origin(Some(TrackOrigin::Split {
            parent: id,
            sibling: second_id,
        }));
        second.set_origin(Some(TrackOrigin::Split {
            parent: id,
            sibling: first_id,
        }));

        self.retire(id);
        let a = self.insert(first);
        let b = self.insert(second);
        debug!(track = %id, u, first = %a, second = %b, "track split");
        Ok((a, b))
    }

    /// Joins two tracks at the given ends into a new track. Both originals
    /// are retired.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SelfJoin`], [`Error::UnknownTrack`],
    /// [`Error::NotAttachable`] or [`Error::EndpointsApart`]. Nothing changes
    /// on error.
    pub fn join(
        &mut self,
        a: TrackId,
        a_end: TrackEnd,
        b: TrackId,
        b_end: TrackEnd,
    ) -> Result<TrackId> {
        if a == b {
            return Err(Error::SelfJoin(a));
        }
        let first = self.live_ref(a)?;
        let second = self.live_ref(b)?;
        if !first.flags().attachable {
            return Err(Error::NotAttachable(a));
        }
        if !second.flags().attachable {
            return Err(Error::NotAttachable(b));
        }

        let mut joined = first.join(a_end, second, b_end, JOIN_TOLERANCE)?;
        joined.set_origin(Some(TrackOrigin::Joined { parents: [a, b] }));

        self.retire(a);
        self.retire(b);
        let id = self.insert(joined);
        debug!(first = %a, second = %b, joined = %id, "tracks joined");
        Ok(id)
    }

    /// Reverses the split or join that produced `id`, restoring the retired
    /// track(s). Returns the handles that are live again.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownTrack`] for a stale handle and
    /// [`Error::NothingToUndo`] when the track has no origin or its parents
    /// are gone. Nothing changes on error.
    pub fn undo_edit(&mut self, id: TrackId) -> Result<Vec<TrackId>> {
        let origin = self.live_ref(id)?.origin().ok_or(Error::NothingToUndo(id))?;
        match origin {
            TrackOrigin::Joined { parents } => {
                if !parents.iter().all(|p| self.retired.contains_key(p)) {
                    return Err(Error::NothingToUndo(id));
                }
                self.live.remove(&id);
                for parent in parents {
                    self.restore(parent);
                }
                debug!(track = %id, "join undone");
                Ok(parents.to_vec())
            }
            TrackOrigin::Split { parent, sibling } => {
                if !self.retired.contains_key(&parent) {
                    return Err(Error::NothingToUndo(id));
                }
                self.live.remove(&id);
                self.live.remove(&sibling);
                self.restore(parent);
                debug!(track = %id, parent = %parent, "split undone");
                Ok(vec![parent])
            }
        }
    }

    /// Moves a live track to the retired map. Undo reaches back one edit, so
    /// whatever the track itself was made from is dropped; the retired map
    /// only ever holds direct parents of live tracks.
    fn retire(&mut self, id: TrackId) {
        if let Some(track) = self.live.remove(&id) {
            let mut pending: Vec<TrackOrigin> = track.origin().into_iter().collect();
            while let Some(origin) = pending.pop() {
                let parents = match origin {
                    TrackOrigin::Joined { parents } => parents.to_vec(),
                    TrackOrigin::Split { parent, .. } => vec![parent],
                };
                for parent in parents {
                    if let Some(ancestor) = self.retired.remove(&parent) {
                        pending.extend(ancestor.origin());
                    }
                }
            }
            self.retired.insert(id, track);
        }
    }

    /// Number of retired tracks kept for undo.
    pub fn retired_len(&self) -> usize {
        self.retired.len()
    }

    fn restore(&mut self, id: TrackId) {
        if let Some(track) = self.retired.remove(&id) {
            self.live.insert(id, track);
        }
    }

    /// Moves a whole track.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownTrack`] or [`Error::NotDraggable`].
    pub fn translate(&mut self, id: TrackId, delta: Vector2) -> Result<()> {
        let track = self.live_mut(id)?;
        if !track.flags().draggable {
            return Err(Error::NotDraggable(id));
        }
        track.translate(delta)
    }

    /// Lifts a track above the ground. Returns the distance moved.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownTrack`] for a stale handle.
    pub fn bump_above_ground(&mut self, id: TrackId) -> Result<f64> {
        self.live_mut(id)?.bump_above_ground()
    }

    /// Moves one control point. Returns where it ended up after clamping.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownTrack`], [`Error::NotConfigurable`] (also for
    /// a point that is not draggable) or [`Error::ControlPointOutOfRange`].
    pub fn move_control_point(
        &mut self,
        id: TrackId,
        index: usize,
        position: Vector2,
    ) -> Result<Vector2> {
        let track = self.live_mut(id)?;
        if !track.flags().configurable {
            return Err(Error::NotConfigurable(id));
        }
        let draggable = track
            .control_points()
            .get(index)
            .map(|cp| cp.draggable)
            .ok_or(Error::ControlPointOutOfRange {
                index,
                len: track.len(),
            })?;
        if !draggable {
            return Err(Error::NotConfigurable(id));
        }
        track.set_control_point(index, position)
    }

    /// Deletes one control point.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownTrack`], [`Error::NotConfigurable`] or the
    /// errors of [`Track::delete_control_point`].
    pub fn delete_control_point(&mut self, id: TrackId, index: usize) -> Result<()> {
        let track = self.live_mut(id)?;
        if !track.flags().configurable {
            return Err(Error::NotConfigurable(id));
        }
        track.delete_control_point(index)
    }

    /// Position of a referenced control point, if its track is still live.
    pub fn resolve(&self, target: ControlPointRef) -> Option<Vector2> {
        self.get(target.track)?
            .control_points()
            .get(target.index)
            .map(|cp| cp.position)
    }

    /// The nearest endpoint of another live, attachable track within
    /// `radius` of the endpoint `index` of track `id`.
    pub fn find_snap_target(
        &self,
        id: TrackId,
        index: usize,
        radius: f64,
    ) -> Option<(ControlPointRef, Vector2)> {
        let track = self.get(id)?;
        if !track.flags().attachable {
            return None;
        }
        track.end_of(index)?;
        let from = track.control_points()[index].source_position;

        self.iter()
            .filter(|(other_id, other)| *other_id != id && other.flags().attachable)
            .flat_map(|(other_id, other)| {
                [TrackEnd::Start, TrackEnd::End].into_iter().map(move |end| {
                    let target = ControlPointRef {
                        track: other_id,
                        index: other.end_index(end),
                    };
                    (target, other.end_point(end))
                })
            })
            .map(|(target, p)| (target, p, p.distance(from)))
            .filter(|(_, _, d)| *d <= radius)
            .min_by(|a, b| a.2.total_cmp(&b.2))
            .map(|(target, p, _)| (target, p))
    }

    /// The closest point on any physical track.
    pub fn closest_physical(&self, position: Vector2) -> Option<(TrackId, ClosestPoint)> {
        self.physical()
            .map(|(id, t)| (id, t.closest_point(position)))
            .min_by(|a, b| a.1.distance.total_cmp(&b.1.distance))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::track::TrackFlags;

    fn line(x0: f64, n: usize, flags: TrackFlags) -> Track {
        let points: Vec<Vector2> = (0..n)
            .map(|i| Vector2::new(x0 + i as f64, 1.0))
            .collect();
        Track::from_points(&points, flags).unwrap()
    }

    #[test]
    fn test_handles_are_stable() {
        let mut set = TrackSet::new();
        let a = set.insert(line(0.0, 3, TrackFlags::FIXED));
        let b = set.insert(line(5.0, 3, TrackFlags::FIXED));
        assert_ne!(a, b);
        set.remove(a).unwrap();
        assert!(set.get(a).is_none());
        assert!(set.get(b).is_some());
        assert_eq!(set.remove(a).unwrap_err(), Error::UnknownTrack(a));
    }

    #[test]
    fn test_split_then_undo_restores_original() {
        let mut set = TrackSet::new();
        let id = set.insert(line(0.0, 6, TrackFlags::EDITABLE));
        let original = set.get(id).unwrap().clone();
        let u = 0.5 * (original.knot(2) + original.knot(3));

        let (a, b) = set.split(id, u).unwrap();
        assert!(!set.contains(id));
        assert_eq!(set.len(), 2);
        assert_eq!(
            set.get(a).unwrap().origin(),
            Some(TrackOrigin::Split { parent: id, sibling: b })
        );

        let restored = set.undo_edit(b).unwrap();
        assert_eq!(restored, vec![id]);
        assert_eq!(set.len(), 1);
        assert_eq!(set.get(id), Some(&original));
    }

    #[test]
    fn test_split_requires_flag() {
        let mut set = TrackSet::new();
        let id = set.insert(line(0.0, 6, TrackFlags::FIXED));
        assert_eq!(set.split(id, 0.41).unwrap_err(), Error::NotSplittable(id));
        assert!(set.contains(id));
    }

    #[test]
    fn test_join_then_undo() {
        let mut set = TrackSet::new();
        let a = set.insert(line(0.0, 3, TrackFlags::EDITABLE));
        let b = set.insert(line(2.0, 3, TrackFlags::EDITABLE));

        let joined = set.join(a, TrackEnd::End, b, TrackEnd::Start).unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(set.get(joined).unwrap().len(), 5);

        let restored = set.undo_edit(joined).unwrap();
        assert_eq!(restored, vec![a, b]);
        assert!(set.contains(a) && set.contains(b));
        assert!(!set.contains(joined));
    }

    #[test]
    fn test_join_preconditions() {
        let mut set = TrackSet::new();
        let a = set.insert(line(0.0, 3, TrackFlags::EDITABLE));
        let fixed = set.insert(line(2.0, 3, TrackFlags::FIXED));
        let far = set.insert(line(10.0, 3, TrackFlags::EDITABLE));

        assert_eq!(
            set.join(a, TrackEnd::End, a, TrackEnd::Start).unwrap_err(),
            Error::SelfJoin(a)
        );
        assert_eq!(
            set.join(a, TrackEnd::End, fixed, TrackEnd::Start).unwrap_err(),
            Error::NotAttachable(fixed)
        );
        assert!(matches!(
            set.join(a, TrackEnd::End, far, TrackEnd::Start),
            Err(Error::EndpointsApart { .. })
        ));
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn test_undo_without_origin() {
        let mut set = TrackSet::new();
        let a = set.insert(line(0.0, 3, TrackFlags::EDITABLE));
        assert_eq!(set.undo_edit(a).unwrap_err(), Error::NothingToUndo(a));
    }

    #[test]
    fn test_remove_joined_drops_retired_parents() {
        let mut set = TrackSet::new();
        let a = set.insert(line(0.0, 3, TrackFlags::EDITABLE));
        let b = set.insert(line(2.0, 3, TrackFlags::EDITABLE));
        let joined = set.join(a, TrackEnd::End, b, TrackEnd::Start).unwrap();
        set.remove(joined).unwrap();
        assert!(set.is_empty());
        assert!(set.retired.is_empty());
    }

    #[test]
    fn test_repeated_edits_keep_one_generation() {
        let mut set = TrackSet::new();
        let mut id = set.insert(line(0.0, 40, TrackFlags::EDITABLE));
        for _ in 0..30 {
            let track = set.get(id).unwrap();
            let u = 0.5 * (track.knot(track.len() - 3) + track.knot(track.len() - 2));
            let (first, _) = set.split(id, u).unwrap();
            id = first;
        }
        assert_eq!(set.len(), 31);
        assert_eq!(set.retired_len(), 1);

        let parent = match set.get(id).unwrap().origin() {
            Some(TrackOrigin::Split { parent, .. }) => parent,
            other => panic!("unexpected origin {other:?}"),
        };
        assert_eq!(set.undo_edit(id).unwrap(), vec![parent]);
        assert_eq!(set.undo_edit(parent).unwrap_err(), Error::NothingToUndo(parent));
        assert_eq!(set.retired_len(), 0);
    }

    #[test]
    fn test_join_after_split_drops_split_parent() {
        let mut set = TrackSet::new();
        let id = set.insert(line(0.0, 6, TrackFlags::EDITABLE));
        let track = set.get(id).unwrap();
        let u = 0.5 * (track.knot(2) + track.knot(3));
        let (a, b) = set.split(id, u).unwrap();

        let joined = set.join(a, TrackEnd::End, b, TrackEnd::Start).unwrap();
        assert_eq!(set.retired_len(), 2);
        assert_eq!(set.undo_edit(joined).unwrap(), vec![a, b]);
        assert_eq!(set.undo_edit(a).unwrap_err(), Error::NothingToUndo(a));
    }

    #[test]
    fn test_snap_target_only_for_endpoints() {
        let mut set = TrackSet::new();
        let a = set.insert(line(0.0, 3, TrackFlags::EDITABLE));
        let b = set.insert(line(2.3, 3, TrackFlags::EDITABLE));

        let (target, at) = set.find_snap_target(a, 2, 0.5).unwrap();
        assert_eq!(target, ControlPointRef { track: b, index: 0 });
        assert_eq!(at, Vector2::new(2.3, 1.0));
        assert!(set.find_snap_target(a, 1, 0.5).is_none());
        assert!(set.find_snap_target(a, 2, 0.1).is_none());
    }

    #[test]
    fn test_move_control_point_checks_flags() {
        let mut set = TrackSet::new();
        let fixed = set.insert(line(0.0, 3, TrackFlags::FIXED));
        assert_eq!(
            set.move_control_point(fixed, 1, Vector2::new(1.0, 3.0))
                .unwrap_err(),
            Error::NotConfigurable(fixed)
        );
        let editable = set.insert(line(0.0, 3, TrackFlags::EDITABLE));
        let at = set
            .move_control_point(editable, 1, Vector2::new(1.0, 3.0))
            .unwrap();
        assert_eq!(at, Vector2::new(1.0, 3.0));
    }
}
