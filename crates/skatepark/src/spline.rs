//! Natural cubic splines and the 2D parametric curves built from them.
//!
//! A track is two independent splines, `x(u)` and `y(u)`, through its control
//! points. Knot `i` of an `n`-point track sits at `u = i / n`, so the domain
//! is `[0, (n - 1) / n]`. Outside the domain the end segments' cubics are
//! extended, which keeps positions continuous for callers that overshoot the
//! ends by a substep.
//!
//! # Example
//!
//! ```rust
//! use skatepark::{CubicSpline, Vector2};
//! use skatepark::spline::SplineCurve;
//!
//! let xs = CubicSpline::natural(&[0.0, 1.0, 2.0], 0.0, 1.0 / 3.0).unwrap();
//! assert!((xs.value(1.0 / 3.0) - 1.0).abs() < 1e-12);
//!
//! let curve = SplineCurve::through(&[
//!     Vector2::new(-4.0, 6.0),
//!     Vector2::new(0.0, 0.0),
//!     Vector2::new(4.0, 6.0),
//! ])
//! .unwrap();
//! // The bottom of a symmetric parabola bends upward.
//! assert!(curve.curvature(1.0 / 3.0).kappa > 0.0);
//! ```

use crate::error::{Error, Result};
use crate::geometry::Vector2;

/// Minimum number of knots a spline (and a track) needs.
pub const MIN_POINTS: usize = 3;

/// Curvature magnitudes are clamped to `1 / MIN_RADIUS`.
pub const MIN_RADIUS: f64 = 0.05;

/// Radius reported for straight or degenerate stretches.
pub const MAX_RADIUS: f64 = 1.0e6;

/// Below this `|dP/du|` the curve is treated as stationary.
const DEGENERATE_SPEED: f64 = 1.0e-9;

/// A natural cubic spline over uniformly spaced knots.
#[derive(Debug, Clone, PartialEq)]
pub struct CubicSpline {
    start: f64,
    step: f64,
    values: Vec<f64>,
    /// Second derivatives at the knots; zero at both ends.
    second: Vec<f64>,
}

impl CubicSpline {
    /// Builds the interpolating natural spline through `values`, with knot
    /// `i` at `start + i * step`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TooFewControlPoints`] for fewer than three values.
    pub fn natural(values: &[f64], start: f64, step: f64) -> Result<Self> {
        let n = values.len();
        if n < MIN_POINTS {
            return Err(Error::TooFewControlPoints { count: n });
        }

        // Tridiagonal system M[i-1] + 4 M[i] + M[i+1] = d[i] for the interior
        // knots, solved with the Thomas algorithm.
        let m = n - 2;
        let inv_h2 = 1.0 / (step * step);
        let mut c_prime = vec![0.0; m];
        let mut d_prime = vec![0.0; m];
        for i in 0..m {
            let d = 6.0 * (values[i + 2] - 2.0 * values[i + 1] + values[i]) * inv_h2;
            if i == 0 {
                c_prime[0] = 0.25;
                d_prime[0] = d * 0.25;
            } else {
                let denom = 4.0 - c_prime[i - 1];
                c_prime[i] = 1.0 / denom;
                d_prime[i] = (d - d_prime[i - 1]) / denom;
            }
        }

        let mut second = vec![0.0; n];
        second[m] = d_prime[m - 1];
        for i in (0..m - 1).rev() {
            second[i + 1] = d_prime[i] - c_prime[i] * second[i + 2];
        }

        Ok(Self {
            start,
            step,
            values: values.to_vec(),
            second,
        })
    }

    /// Number of knots.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Always false; a spline has at least three knots.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Parameter of knot `i`.
    pub fn knot(&self, i: usize) -> f64 {
        self.start + self.step * i as f64
    }

    /// First and last knot parameters.
    pub fn domain(&self) -> (f64, f64) {
        (self.start, self.knot(self.len() - 1))
    }

    /// Segment index for `t` plus the offsets to its two knots.
    fn segment(&self, t: f64) -> (usize, f64, f64) {
        let last = self.len() - 2;
        let raw = ((t - self.start) / self.step).floor();
        let k = if raw.is_nan() || raw < 0.0 {
            0
        } else {
            // Saturating float-to-int cast, then clamped to the last segment.
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let k = raw as usize;
            k.min(last)
        };
        let lo = t - self.knot(k);
        let hi = self.knot(k + 1) - t;
        (k, lo, hi)
    }

    /// Spline value at `t`.
    pub fn value(&self, t: f64) -> f64 {
        let (k, lo, hi) = self.segment(t);
        let h = self.step;
        let (m0, m1) = (self.second[k], self.second[k + 1]);
        let (y0, y1) = (self.values[k], self.values[k + 1]);
        m0 * hi * hi * hi / (6.0 * h)
            + m1 * lo * lo * lo / (6.0 * h)
            + (y0 / h - m0 * h / 6.0) * hi
            + (y1 / h - m1 * h / 6.0) * lo
    }

    /// First derivative at `t`.
    pub fn derivative(&self, t: f64) -> f64 {
        let (k, lo, hi) = self.segment(t);
        let h = self.step;
        let (m0, m1) = (self.second[k], self.second[k + 1]);
        let (y0, y1) = (self.values[k], self.values[k + 1]);
        -m0 * hi * hi / (2.0 * h) + m1 * lo * lo / (2.0 * h) - (y0 / h - m0 * h / 6.0)
            + (y1 / h - m1 * h / 6.0)
    }

    /// Second derivative at `t`.
    pub fn second_derivative(&self, t: f64) -> f64 {
        let (k, lo, hi) = self.segment(t);
        let h = self.step;
        (self.second[k] * hi + self.second[k + 1] * lo) / h
    }
}

/// Signed curvature at a point on a curve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Curvature {
    /// Signed curvature; positive when the curve turns left (counter-clockwise)
    /// as `u` increases. Clamped to `±1 / MIN_RADIUS`.
    pub kappa: f64,
    /// Radius of curvature, saturated to [`MAX_RADIUS`].
    pub radius: f64,
    /// Unit vector from the curve toward the centre of curvature. For a
    /// straight stretch this is the left-hand normal.
    pub direction: Vector2,
}

/// A parametric 2D curve made of one spline per axis.
#[derive(Debug, Clone, PartialEq)]
pub struct SplineCurve {
    x: CubicSpline,
    y: CubicSpline,
}

impl SplineCurve {
    /// Builds the curve through `points` with knot `i` at `u = i / n`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TooFewControlPoints`] for fewer than three points.
    pub fn through(points: &[Vector2]) -> Result<Self> {
        let n = points.len();
        if n < MIN_POINTS {
            return Err(Error::TooFewControlPoints { count: n });
        }
        let step = 1.0 / n as f64;
        let xs: Vec<f64> = points.iter().map(|p| p.x).collect();
        let ys: Vec<f64> = points.iter().map(|p| p.y).collect();
        Ok(Self {
            x: CubicSpline::natural(&xs, 0.0, step)?,
            y: CubicSpline::natural(&ys, 0.0, step)?,
        })
    }

    /// Number of knots.
    pub fn len(&self) -> usize {
        self.x.len()
    }

    /// Always false; a curve has at least three knots.
    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// Parameter of knot `i`.
    pub fn knot(&self, i: usize) -> f64 {
        self.x.knot(i)
    }

    /// `(u_min, u_max)`.
    pub fn domain(&self) -> (f64, f64) {
        self.x.domain()
    }

    /// Position at `u`.
    pub fn point(&self, u: f64) -> Vector2 {
        Vector2::new(self.x.value(u), self.y.value(u))
    }

    /// `dP/du` at `u`. At the ends this is the one-sided derivative of the
    /// end segment.
    pub fn derivative(&self, u: f64) -> Vector2 {
        Vector2::new(self.x.derivative(u), self.y.derivative(u))
    }

    /// `d²P/du²` at `u`.
    pub fn second_derivative(&self, u: f64) -> Vector2 {
        Vector2::new(self.x.second_derivative(u), self.y.second_derivative(u))
    }

    /// Curvature at `u`, finite even for stationary or straight stretches.
    pub fn curvature(&self, u: f64) -> Curvature {
        let d1 = self.derivative(u);
        let d2 = self.second_derivative(u);
        let speed = d1.magnitude();
        let normal = d1.normalized().perpendicular();

        if speed < DEGENERATE_SPEED || !speed.is_finite() {
            return Curvature {
                kappa: 0.0,
                radius: MAX_RADIUS,
                direction: normal,
            };
        }

        let max_kappa = 1.0 / MIN_RADIUS;
        let kappa = (d1.cross(d2) / (speed * speed * speed)).clamp(-max_kappa, max_kappa);
        let radius = if kappa == 0.0 {
            MAX_RADIUS
        } else {
            (1.0 / kappa.abs()).min(MAX_RADIUS)
        };
        let direction = if kappa < 0.0 { -normal } else { normal };

        Curvature {
            kappa,
            radius,
            direction,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f64 = 1e-9;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < TOLERANCE
    }

    #[test]
    fn test_spline_interpolates_knots() {
        let values = [1.0, -2.0, 0.5, 4.0, 3.0];
        let s = CubicSpline::natural(&values, 0.0, 0.2).unwrap();
        for (i, v) in values.iter().enumerate() {
            assert!(approx_eq(s.value(s.knot(i)), *v), "knot {i}");
        }
    }

    #[test]
    fn test_spline_natural_end_conditions() {
        let s = CubicSpline::natural(&[0.0, 3.0, 1.0, 2.0], 0.0, 0.25).unwrap();
        let (lo, hi) = s.domain();
        assert!(approx_eq(s.second_derivative(lo), 0.0));
        assert!(approx_eq(s.second_derivative(hi), 0.0));
    }

    #[test]
    fn test_spline_linear_data_is_linear() {
        let s = CubicSpline::natural(&[0.0, 2.0, 4.0, 6.0], 0.0, 0.25).unwrap();
        for t in [0.0, 0.1, 0.33, 0.6, 0.75] {
            assert!(approx_eq(s.value(t), 8.0 * t));
            assert!(approx_eq(s.derivative(t), 8.0));
        }
    }

    #[test]
    fn test_spline_extrapolates_continuously() {
        let s = CubicSpline::natural(&[0.0, 1.0, 0.0], 0.0, 1.0 / 3.0).unwrap();
        let (lo, hi) = s.domain();
        assert!((s.value(hi + 1e-9) - s.value(hi)).abs() < 1e-6);
        assert!((s.value(lo - 1e-9) - s.value(lo)).abs() < 1e-6);
        assert!(s.value(hi + 0.1).is_finite());
    }

    #[test]
    fn test_spline_rejects_two_points() {
        assert_eq!(
            CubicSpline::natural(&[0.0, 1.0], 0.0, 0.5),
            Err(Error::TooFewControlPoints { count: 2 })
        );
    }

    #[test]
    fn test_curve_straight_line_has_zero_curvature() {
        let curve = SplineCurve::through(&[
            Vector2::new(0.0, 0.0),
            Vector2::new(1.0, 1.0),
            Vector2::new(2.0, 2.0),
        ])
        .unwrap();
        let c = curve.curvature(0.3);
        assert!(approx_eq(c.kappa, 0.0));
        assert!(approx_eq(c.radius, MAX_RADIUS));
    }

    #[test]
    fn test_curve_duplicate_points_stay_finite() {
        let p = Vector2::new(1.0, 1.0);
        let curve = SplineCurve::through(&[p, p, p]).unwrap();
        let c = curve.curvature(1.0 / 3.0);
        assert!(c.kappa.is_finite());
        assert!(c.radius.is_finite());
        assert!(c.direction.is_finite());
        assert!(curve.point(0.5).is_finite());
    }

    #[test]
    fn test_curvature_sign_follows_turn_direction() {
        let valley = SplineCurve::through(&[
            Vector2::new(-1.0, 1.0),
            Vector2::new(0.0, 0.0),
            Vector2::new(1.0, 1.0),
        ])
        .unwrap();
        let c = valley.curvature(1.0 / 3.0);
        assert!(c.kappa > 0.0);
        assert!(c.direction.y > 0.9, "centre lies above a valley");

        let hill = SplineCurve::through(&[
            Vector2::new(-1.0, 0.0),
            Vector2::new(0.0, 1.0),
            Vector2::new(1.0, 0.0),
        ])
        .unwrap();
        let c = hill.curvature(1.0 / 3.0);
        assert!(c.kappa < 0.0);
        assert!(c.direction.y < -0.9, "centre lies below a hill");
    }

    #[test]
    fn test_curvature_is_clamped() {
        let sharp = SplineCurve::through(&[
            Vector2::new(-1.0, 1.0),
            Vector2::new(0.0, 0.0),
            Vector2::new(0.001, 1.0),
        ])
        .unwrap();
        for i in 0..=100 {
            let c = sharp.curvature(f64::from(i) / 150.0);
            assert!(c.kappa.abs() <= 1.0 / MIN_RADIUS + TOLERANCE);
            assert!(c.radius >= MIN_RADIUS - TOLERANCE);
        }
    }
}
