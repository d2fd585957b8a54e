//! Tracks: control points, the spline through them, and geometric queries.
//!
//! A [`Track`] owns its control points and the [`SplineCurve`] derived from
//! their effective positions. Every edit validates first, builds the complete
//! new point list and curve, and only then replaces the old ones, so a reader
//! holding `&Track` always sees one consistent geometry.
//!
//! # Example
//!
//! ```rust
//! use skatepark::{Track, TrackFlags, Vector2};
//!
//! let track = Track::from_points(
//!     &[Vector2::new(-4.0, 6.0), Vector2::new(0.0, 0.0), Vector2::new(4.0, 6.0)],
//!     TrackFlags::default(),
//! )
//! .unwrap();
//!
//! let hit = track.closest_point(Vector2::new(0.0, -1.0));
//! assert!(hit.point.y.abs() < 1e-6);
//! ```

use crate::error::{Error, Result};
use crate::geometry::{Bounds, Vector2};
use crate::spline::{Curvature, MIN_POINTS, SplineCurve};
use crate::track_set::TrackId;

/// Samples per spline segment used for closest-point search and bounds.
const SAMPLES_PER_SEGMENT: usize = 20;

/// Golden-section iterations when refining a closest point.
const REFINE_ITERATIONS: usize = 40;

/// Newton iterations when walking a given arc length.
const ARC_WALK_ITERATIONS: usize = 12;

/// Floor on `|dP/du|` when dividing by it.
const MIN_PARAMETRIC_SPEED: f64 = 1.0e-6;

/// How close (in `u`) a split may come to a knot or an end.
pub const SPLIT_EPSILON: f64 = 1.0e-3;

/// Nodes and weights of 5-point Gauss-Legendre quadrature on `[-1, 1]`.
const GAUSS_LEGENDRE_5: [(f64, f64); 5] = [
    (0.0, 0.568_888_888_888_888_9),
    (-0.538_469_310_105_683_1, 0.478_628_670_499_366_5),
    (0.538_469_310_105_683_1, 0.478_628_670_499_366_5),
    (-0.906_179_845_938_664_0, 0.236_926_885_056_189_1),
    (0.906_179_845_938_664_0, 0.236_926_885_056_189_1),
];

/// Reference to a control point on another track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ControlPointRef {
    /// The track holding the point.
    pub track: TrackId,
    /// Index of the point on that track.
    pub index: usize,
}

/// A user- or designer-placed anchor of a track.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlPoint {
    /// Where the user put the point.
    pub source_position: Vector2,
    /// Where the spline passes; differs from the source after smoothing or
    /// snapping to another track's endpoint.
    pub position: Vector2,
    /// Whether the user may move this point.
    pub draggable: bool,
    /// Region the point may be dragged within, if limited.
    pub limit_bounds: Option<Bounds>,
    /// Endpoint of another track this point is snapped to.
    pub snap_target: Option<ControlPointRef>,
}

impl ControlPoint {
    /// A draggable, unconstrained point.
    pub const fn new(position: Vector2) -> Self {
        Self {
            source_position: position,
            position,
            draggable: true,
            limit_bounds: None,
            snap_target: None,
        }
    }

    /// A point that cannot be dragged.
    pub const fn fixed(position: Vector2) -> Self {
        Self {
            draggable: false,
            ..Self::new(position)
        }
    }

    /// Restricts dragging to `bounds`.
    #[must_use]
    pub const fn with_limit_bounds(mut self, bounds: Bounds) -> Self {
        self.limit_bounds = Some(bounds);
        self
    }

    fn translated(&self, delta: Vector2) -> Self {
        Self {
            source_position: self.source_position + delta,
            position: self.position + delta,
            ..self.clone()
        }
    }
}

/// Capabilities of a track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct TrackFlags {
    /// The whole track can be dragged.
    pub draggable: bool,
    /// Control points can be moved or deleted.
    pub configurable: bool,
    /// The track can be split.
    pub splittable: bool,
    /// Endpoints can be joined to other tracks.
    pub attachable: bool,
    /// The skater interacts with the track. Tracks parked in a toolbox are
    /// not physical.
    pub physical: bool,
}

impl TrackFlags {
    /// A premade track that can be neither moved nor edited.
    pub const FIXED: Self = Self {
        draggable: false,
        configurable: false,
        splittable: false,
        attachable: false,
        physical: true,
    };

    /// A fully editable playground track.
    pub const EDITABLE: Self = Self {
        draggable: true,
        configurable: true,
        splittable: true,
        attachable: true,
        physical: true,
    };
}

impl Default for TrackFlags {
    fn default() -> Self {
        Self::FIXED
    }
}

/// One end of a track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackEnd {
    /// The first control point (`u` minimum).
    Start,
    /// The last control point (`u` maximum).
    End,
}

/// How a track came to exist, when it was produced by an edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackOrigin {
    /// Produced by joining two tracks.
    Joined {
        /// The tracks consumed by the join.
        parents: [TrackId; 2],
    },
    /// One half of a split.
    Split {
        /// The track that was split.
        parent: TrackId,
        /// The other half.
        sibling: TrackId,
    },
}

/// Closest point on a track to some position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClosestPoint {
    /// Parametric position of the closest point.
    pub u: f64,
    /// The closest point.
    pub point: Vector2,
    /// Distance from the query position.
    pub distance: f64,
}

/// A track: at least three control points and the spline through them.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    control_points: Vec<ControlPoint>,
    curve: SplineCurve,
    samples: Vec<(f64, Vector2)>,
    bounds: Bounds,
    flags: TrackFlags,
    available_bounds: Option<Bounds>,
    origin: Option<TrackOrigin>,
}

/// Curve, samples and bounds derived from one control-point array.
struct Geometry {
    curve: SplineCurve,
    samples: Vec<(f64, Vector2)>,
    bounds: Bounds,
}

impl Geometry {
    fn build(points: &[ControlPoint]) -> Result<Self> {
        let positions: Vec<Vector2> = points.iter().map(|cp| cp.position).collect();
        let curve = SplineCurve::through(&positions)?;
        let (u_min, u_max) = curve.domain();
        let count = (points.len() - 1) * SAMPLES_PER_SEGMENT;
        let samples: Vec<(f64, Vector2)> = (0..=count)
            .map(|i| {
                let u = u_min + (u_max - u_min) * i as f64 / count as f64;
                (u, curve.point(u))
            })
            .collect();
        let bounds = samples
            .iter()
            .fold(Bounds::nothing(), |b, (_, p)| b.include(*p));
        Ok(Self {
            curve,
            samples,
            bounds,
        })
    }
}

impl Track {
    /// Creates a track from control points.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TooFewControlPoints`] for fewer than three points.
    pub fn new(control_points: Vec<ControlPoint>, flags: TrackFlags) -> Result<Self> {
        let geometry = Geometry::build(&control_points)?;
        Ok(Self {
            control_points,
            curve: geometry.curve,
            samples: geometry.samples,
            bounds: geometry.bounds,
            flags,
            available_bounds: None,
            origin: None,
        })
    }

    /// Creates a track through plain positions, every point draggable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TooFewControlPoints`] for fewer than three points.
    pub fn from_points(points: &[Vector2], flags: TrackFlags) -> Result<Self> {
        Self::new(points.iter().copied().map(ControlPoint::new).collect(), flags)
    }

    /// Limits where the track's control points may be placed.
    #[must_use]
    pub const fn with_available_bounds(mut self, bounds: Bounds) -> Self {
        self.available_bounds = Some(bounds);
        self
    }

    /// Replaces the control points and the derived geometry together.
    fn rebuild(&mut self, control_points: Vec<ControlPoint>) -> Result<()> {
        let geometry = Geometry::build(&control_points)?;
        self.control_points = control_points;
        self.curve = geometry.curve;
        self.samples = geometry.samples;
        self.bounds = geometry.bounds;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// The control points in order.
    pub fn control_points(&self) -> &[ControlPoint] {
        &self.control_points
    }

    /// Effective positions of the control points.
    pub fn control_point_positions(&self) -> Vec<Vector2> {
        self.control_points.iter().map(|cp| cp.position).collect()
    }

    /// Number of control points.
    pub fn len(&self) -> usize {
        self.control_points.len()
    }

    /// Always false; a track has at least three control points.
    pub fn is_empty(&self) -> bool {
        self.control_points.is_empty()
    }

    /// The track's capabilities.
    pub const fn flags(&self) -> TrackFlags {
        self.flags
    }

    /// Marks the track physical or not.
    pub fn set_physical(&mut self, physical: bool) {
        self.flags.physical = physical;
    }

    /// Region the control points must stay in.
    pub const fn available_bounds(&self) -> Option<Bounds> {
        self.available_bounds
    }

    /// The edit this track was produced by, if any.
    pub const fn origin(&self) -> Option<TrackOrigin> {
        self.origin
    }

    pub(crate) fn set_origin(&mut self, origin: Option<TrackOrigin>) {
        self.origin = origin;
    }

    /// Bounds of the sampled track.
    pub const fn bounds(&self) -> Bounds {
        self.bounds
    }

    /// Smallest parametric position.
    pub fn min_u(&self) -> f64 {
        self.curve.domain().0
    }

    /// Largest parametric position.
    pub fn max_u(&self) -> f64 {
        self.curve.domain().1
    }

    /// Whether `u` lies on the track rather than past an end.
    pub fn contains_u(&self, u: f64) -> bool {
        u >= self.min_u() && u <= self.max_u()
    }

    /// Parametric position of control point `i`.
    pub fn knot(&self, i: usize) -> f64 {
        self.curve.knot(i)
    }

    /// Index of the control point at an end.
    pub fn end_index(&self, end: TrackEnd) -> usize {
        match end {
            TrackEnd::Start => 0,
            TrackEnd::End => self.len() - 1,
        }
    }

    /// Effective position of the control point at an end.
    pub fn end_point(&self, end: TrackEnd) -> Vector2 {
        self.control_points[self.end_index(end)].position
    }

    /// Which end control point `index` is, if either.
    pub fn end_of(&self, index: usize) -> Option<TrackEnd> {
        if index == 0 {
            Some(TrackEnd::Start)
        } else if index + 1 == self.len() {
            Some(TrackEnd::End)
        } else {
            None
        }
    }

    // ------------------------------------------------------------------
    // Geometric queries
    // ------------------------------------------------------------------

    /// Position at `u`. Past the ends the end segments are extrapolated;
    /// treat such results as approximate.
    pub fn point_at(&self, u: f64) -> Vector2 {
        self.curve.point(u)
    }

    /// `|dP/du|`, the arc length covered per unit of `u`.
    pub fn parametric_speed_scale(&self, u: f64) -> f64 {
        self.curve.derivative(u).magnitude()
    }

    /// Unit tangent in the direction of increasing `u`.
    pub fn tangent_at(&self, u: f64) -> Vector2 {
        let d = self.curve.derivative(u);
        if d.magnitude() > MIN_PARAMETRIC_SPEED {
            return d.normalized();
        }
        // Stationary point of the parameterization: use the chord around it.
        let du = 1.0e-4;
        let chord = self.curve.point(u + du) - self.curve.point(u - du);
        if chord.magnitude() > 0.0 {
            chord.normalized()
        } else {
            Vector2::new(1.0, 0.0)
        }
    }

    /// Unit left-hand normal of the tangent. For a track drawn left to right
    /// this points up.
    pub fn normal_at(&self, u: f64) -> Vector2 {
        self.tangent_at(u).perpendicular()
    }

    /// Curvature at `u`, finite everywhere.
    pub fn curvature_at(&self, u: f64) -> Curvature {
        self.curve.curvature(u)
    }

    /// Angle of the tangent from the +x axis, in radians.
    pub fn angle_at(&self, u: f64) -> f64 {
        self.tangent_at(u).angle()
    }

    /// The point on the track nearest to `position`.
    ///
    /// Every cached sample that is a local minimum of distance brackets a
    /// golden-section refinement; the best refined point wins. A track that
    /// crosses itself can have several such minima.
    pub fn closest_point(&self, position: Vector2) -> ClosestPoint {
        let d2: Vec<f64> = self
            .samples
            .iter()
            .map(|(_, p)| (*p - position).magnitude_squared())
            .collect();
        let last = d2.len() - 1;

        let mut best: Option<ClosestPoint> = None;
        for i in 0..=last {
            let prev = i.saturating_sub(1);
            let next = (i + 1).min(last);
            if d2[i] > d2[prev] || d2[i] > d2[next] {
                continue;
            }
            let u = self.golden_section(position, self.samples[prev].0, self.samples[next].0);
            let point = self.point_at(u);
            let candidate = ClosestPoint {
                u,
                point,
                distance: point.distance(position),
            };
            if best.as_ref().is_none_or(|b| candidate.distance < b.distance) {
                best = Some(candidate);
            }
        }

        // The global sample minimum is always a local minimum, so `best` is set.
        best.unwrap_or_else(|| {
            let point = self.point_at(self.min_u());
            ClosestPoint {
                u: self.min_u(),
                point,
                distance: point.distance(position),
            }
        })
    }

    fn golden_section(&self, position: Vector2, mut lo: f64, mut hi: f64) -> f64 {
        let inv_phi = (5.0_f64.sqrt() - 1.0) / 2.0;
        let dist = |u: f64| (self.point_at(u) - position).magnitude_squared();
        let mut a = hi - inv_phi * (hi - lo);
        let mut b = lo + inv_phi * (hi - lo);
        let mut fa = dist(a);
        let mut fb = dist(b);
        for _ in 0..REFINE_ITERATIONS {
            if fa < fb {
                hi = b;
                b = a;
                fb = fa;
                a = hi - inv_phi * (hi - lo);
                fa = dist(a);
            } else {
                lo = a;
                a = b;
                fa = fb;
                b = lo + inv_phi * (hi - lo);
                fb = dist(b);
            }
        }
        0.5 * (lo + hi)
    }

    /// Signed arc length from `u0` to `u1`.
    pub fn arc_length(&self, u0: f64, u1: f64) -> f64 {
        if u0 == u1 {
            return 0.0;
        }
        let piece_width = (self.knot(1) - self.knot(0)) / 4.0;
        let pieces = ((u1 - u0).abs() / piece_width).ceil().max(1.0);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let count = pieces as usize;
        let h = (u1 - u0) / pieces;

        let mut total = 0.0;
        for i in 0..count {
            let a = u0 + h * i as f64;
            let mid = a + 0.5 * h;
            for (node, weight) in GAUSS_LEGENDRE_5 {
                total += weight * self.parametric_speed_scale(mid + 0.5 * h * node);
            }
        }
        total * 0.5 * h
    }

    /// Total length of the track.
    pub fn length(&self) -> f64 {
        self.arc_length(self.min_u(), self.max_u())
    }

    /// The parametric position reached by travelling signed arc length `ds`
    /// from `u0`. The result may lie past an end of the track.
    pub fn parametric_distance(&self, u0: f64, ds: f64) -> f64 {
        if ds == 0.0 {
            return u0;
        }
        let scale = |u: f64| self.parametric_speed_scale(u).max(MIN_PARAMETRIC_SPEED);
        let mut u = u0 + ds / scale(u0);
        for _ in 0..ARC_WALK_ITERATIONS {
            let err = self.arc_length(u0, u) - ds;
            if err.abs() <= 1.0e-12 * (1.0 + ds.abs()) {
                break;
            }
            u -= err / scale(u);
        }
        u
    }

    // ------------------------------------------------------------------
    // Edits
    // ------------------------------------------------------------------

    /// Moves every control point by `delta`.
    ///
    /// # Errors
    ///
    /// Propagates geometry errors; none occur for a valid track.
    pub fn translate(&mut self, delta: Vector2) -> Result<()> {
        let points = self
            .control_points
            .iter()
            .map(|cp| cp.translated(delta))
            .collect();
        self.rebuild(points)
    }

    /// Lifts the track by the smallest amount that puts every sampled point
    /// on or above the ground. Returns the distance moved.
    ///
    /// # Errors
    ///
    /// Propagates geometry errors; none occur for a valid track.
    pub fn bump_above_ground(&mut self) -> Result<f64> {
        let lowest = self
            .samples
            .iter()
            .map(|(_, p)| p.y)
            .fold(f64::INFINITY, f64::min);
        if lowest >= 0.0 {
            return Ok(0.0);
        }
        self.translate(Vector2::new(0.0, -lowest))?;
        Ok(-lowest)
    }

    /// Moves control point `index` toward `position`, clamped to the point's
    /// drag limits and the track's available bounds. Any snap is cleared.
    /// Returns where the point ended up.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ControlPointOutOfRange`] for a bad index.
    pub fn set_control_point(&mut self, index: usize, position: Vector2) -> Result<Vector2> {
        self.check_index(index)?;
        let mut target = position;
        if let Some(limit) = self.control_points[index].limit_bounds {
            target = limit.clamp(target);
        }
        if let Some(available) = self.available_bounds {
            target = available.clamp(target);
        }

        let mut points = self.control_points.clone();
        let cp = &mut points[index];
        cp.source_position = target;
        cp.position = target;
        cp.snap_target = None;
        self.rebuild(points)?;
        Ok(target)
    }

    /// Pins control point `index` onto another track's endpoint, keeping the
    /// user's source position so the snap can be released.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ControlPointOutOfRange`] for a bad index.
    pub fn snap_control_point(
        &mut self,
        index: usize,
        position: Vector2,
        target: ControlPointRef,
    ) -> Result<()> {
        self.check_index(index)?;
        let mut points = self.control_points.clone();
        points[index].position = position;
        points[index].snap_target = Some(target);
        self.rebuild(points)
    }

    /// Removes control point `index`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ControlPointOutOfRange`] for a bad index and
    /// [`Error::TooFewControlPoints`] if fewer than three would remain.
    pub fn delete_control_point(&mut self, index: usize) -> Result<()> {
        self.check_index(index)?;
        if self.len() - 1 < MIN_POINTS {
            return Err(Error::TooFewControlPoints {
                count: self.len() - 1,
            });
        }
        let mut points = self.control_points.clone();
        points.remove(index);
        self.rebuild(points)
    }

    /// Splits the track at `u` into two tracks that share the split point.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSplitParameter`] when `u` is within
    /// [`SPLIT_EPSILON`] of an end or a control point, and
    /// [`Error::TooFewControlPoints`] when either half would be too short.
    pub fn split(&self, u: f64) -> Result<(Track, Track)> {
        if !u.is_finite()
            || u <= self.min_u() + SPLIT_EPSILON
            || u >= self.max_u() - SPLIT_EPSILON
            || (0..self.len()).any(|i| (self.knot(i) - u).abs() < SPLIT_EPSILON)
        {
            return Err(Error::InvalidSplitParameter { u });
        }

        let split_point = ControlPoint::new(self.point_at(u));
        let mut left = Vec::new();
        let mut right = vec![split_point.clone()];
        for (i, cp) in self.control_points.iter().enumerate() {
            if self.knot(i) < u {
                left.push(cp.clone());
            } else {
                right.push(cp.clone());
            }
        }
        left.push(split_point);

        for half in [&left, &right] {
            if half.len() < MIN_POINTS {
                return Err(Error::TooFewControlPoints { count: half.len() });
            }
        }

        let mut first = Track::new(left, self.flags)?;
        let mut second = Track::new(right, self.flags)?;
        first.available_bounds = self.available_bounds;
        second.available_bounds = self.available_bounds;
        Ok((first, second))
    }

    /// Joins `other` onto this track at the given ends. The two touching
    /// endpoints are merged into one control point at their midpoint.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EndpointsApart`] when the endpoints are further apart
    /// than `tolerance`.
    pub fn join(
        &self,
        end: TrackEnd,
        other: &Track,
        other_end: TrackEnd,
        tolerance: f64,
    ) -> Result<Track> {
        let distance = self.end_point(end).distance(other.end_point(other_end));
        if distance > tolerance {
            return Err(Error::EndpointsApart { distance });
        }

        let mut first = self.control_points.clone();
        if end == TrackEnd::Start {
            first.reverse();
        }
        let mut second = other.control_points.clone();
        if other_end == TrackEnd::End {
            second.reverse();
        }

        let (Some(a), Some(b)) = (first.pop(), second.first().cloned()) else {
            return Err(Error::TooFewControlPoints { count: 0 });
        };
        let mut merged = ControlPoint::new(a.position.lerp(b.position, 0.5));
        merged.draggable = a.draggable || b.draggable;
        first.push(merged);
        first.extend(second.into_iter().skip(1));

        let mut joined = Track::new(first, self.flags)?;
        joined.available_bounds = self.available_bounds;
        Ok(joined)
    }

    /// Eases the sharpest corner: the interior control point nearest the
    /// sample with the smallest radius of curvature is pulled halfway toward
    /// its neighbours' midpoint, repeatedly, until the smallest radius is at
    /// least `min_radius` or `max_iterations` passes have run. Only effective
    /// positions move. Returns the number of passes made.
    ///
    /// # Errors
    ///
    /// Propagates geometry errors; none occur for a valid track.
    pub fn smooth_sharpest_point(&mut self, min_radius: f64, max_iterations: usize) -> Result<usize> {
        for pass in 0..max_iterations {
            let (u, radius) = self.sharpest_sample();
            if radius >= min_radius {
                return Ok(pass);
            }
            let step = self.knot(1) - self.knot(0);
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let nearest = ((u - self.min_u()) / step).round().max(0.0) as usize;
            let index = nearest.clamp(1, self.len() - 2);

            let mut points = self.control_points.clone();
            let neighbours = points[index - 1].position.lerp(points[index + 1].position, 0.5);
            points[index].position = points[index].position.lerp(neighbours, 0.5);
            self.rebuild(points)?;
        }
        Ok(max_iterations)
    }

    /// Parametric position and radius of the most sharply curved sample.
    pub fn sharpest_sample(&self) -> (f64, f64) {
        self.samples
            .iter()
            .map(|(u, _)| (*u, self.curvature_at(*u).radius))
            .fold((self.min_u(), f64::INFINITY), |best, s| {
                if s.1 < best.1 { s } else { best }
            })
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index >= self.len() {
            return Err(Error::ControlPointOutOfRange {
                index,
                len: self.len(),
            });
        }
        Ok(())
    }
}
