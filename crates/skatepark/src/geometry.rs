//! 2D vectors and axis-aligned bounds.
//!
//! Model coordinates are meters with the origin on the ground line, `y`
//! increasing upward. Gravity therefore pulls toward negative `y`:
//!
//! ```text
//!   y
//!   │
//!   │
//!   └───── x      (ground: y = 0)
//! ```
//!
//! # Example
//!
//! ```rust
//! use skatepark::Vector2;
//!
//! let v = Vector2::new(3.0, 4.0);
//! assert_eq!(v.magnitude(), 5.0);
//! assert_eq!((v * 2.0).x, 6.0);
//! ```

use core::ops::{Add, AddAssign, Mul, Neg, Sub};

use serde::{Deserialize, Serialize};

/// A 2D vector, used both for positions and for velocities.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vector2 {
    /// X component.
    pub x: f64,
    /// Y component.
    pub y: f64,
}

impl Vector2 {
    /// Creates a new vector with the given components.
    #[inline]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Returns the zero vector.
    #[inline]
    pub const fn zero() -> Self {
        Self { x: 0.0, y: 0.0 }
    }

    /// Returns the magnitude (length) of the vector.
    #[inline]
    pub fn magnitude(&self) -> f64 {
        self.x.hypot(self.y)
    }

    /// Returns the squared magnitude, avoiding the square root.
    #[inline]
    pub fn magnitude_squared(&self) -> f64 {
        self.x * self.x + self.y * self.y
    }

    /// Returns a unit vector in the same direction.
    ///
    /// The zero vector is returned unchanged rather than producing NaN.
    #[inline]
    pub fn normalized(&self) -> Self {
        let mag = self.magnitude();
        if mag == 0.0 {
            return *self;
        }
        Self {
            x: self.x / mag,
            y: self.y / mag,
        }
    }

    /// Dot product.
    #[inline]
    pub fn dot(&self, other: Vector2) -> f64 {
        self.x * other.x + self.y * other.y
    }

    /// Z component of the 3D cross product `self × other`.
    #[inline]
    pub fn cross(&self, other: Vector2) -> f64 {
        self.x * other.y - self.y * other.x
    }

    /// The vector rotated a quarter turn counter-clockwise.
    #[inline]
    pub const fn perpendicular(&self) -> Self {
        Self {
            x: -self.y,
            y: self.x,
        }
    }

    /// Distance between two points.
    #[inline]
    pub fn distance(&self, other: Vector2) -> f64 {
        (*self - other).magnitude()
    }

    /// Angle of the vector measured from the +x axis, in radians.
    #[inline]
    pub fn angle(&self) -> f64 {
        self.y.atan2(self.x)
    }

    /// Linear interpolation toward `other`.
    #[inline]
    pub fn lerp(&self, other: Vector2, t: f64) -> Self {
        *self + (other - *self) * t
    }

    /// Whether both components are finite.
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl Add for Vector2 {
    type Output = Vector2;

    #[inline]
    fn add(self, other: Vector2) -> Vector2 {
        Vector2 {
            x: self.x + other.x,
            y: self.y + other.y,
        }
    }
}

impl AddAssign for Vector2 {
    #[inline]
    fn add_assign(&mut self, other: Vector2) {
        self.x += other.x;
        self.y += other.y;
    }
}

impl Sub for Vector2 {
    type Output = Vector2;

    #[inline]
    fn sub(self, other: Vector2) -> Vector2 {
        Vector2 {
            x: self.x - other.x,
            y: self.y - other.y,
        }
    }
}

impl Neg for Vector2 {
    type Output = Vector2;

    #[inline]
    fn neg(self) -> Vector2 {
        Vector2 {
            x: -self.x,
            y: -self.y,
        }
    }
}

impl Mul<f64> for Vector2 {
    type Output = Vector2;

    #[inline]
    fn mul(self, scalar: f64) -> Vector2 {
        Vector2 {
            x: self.x * scalar,
            y: self.y * scalar,
        }
    }
}

impl Mul<Vector2> for f64 {
    type Output = Vector2;

    #[inline]
    fn mul(self, v: Vector2) -> Vector2 {
        v * self
    }
}

/// An axis-aligned rectangle, inclusive on all edges.
///
/// Used for the draggable region of a control point and for the area a
/// track may occupy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    /// Smallest x.
    pub min_x: f64,
    /// Smallest y.
    pub min_y: f64,
    /// Largest x.
    pub max_x: f64,
    /// Largest y.
    pub max_y: f64,
}

impl Bounds {
    /// Creates bounds from two corners given in any order.
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self {
            min_x: x0.min(x1),
            min_y: y0.min(y1),
            max_x: x0.max(x1),
            max_y: y0.max(y1),
        }
    }

    /// The empty bounds, which [`Bounds::include`] grows from.
    pub const fn nothing() -> Self {
        Self {
            min_x: f64::INFINITY,
            min_y: f64::INFINITY,
            max_x: f64::NEG_INFINITY,
            max_y: f64::NEG_INFINITY,
        }
    }

    /// Whether the bounds contain no points.
    pub fn is_empty(&self) -> bool {
        self.min_x > self.max_x || self.min_y > self.max_y
    }

    /// Returns the bounds grown to contain `p`.
    pub fn include(self, p: Vector2) -> Self {
        Self {
            min_x: self.min_x.min(p.x),
            min_y: self.min_y.min(p.y),
            max_x: self.max_x.max(p.x),
            max_y: self.max_y.max(p.y),
        }
    }

    /// Returns the bounds expanded by `margin` on every side.
    pub fn dilated(self, margin: f64) -> Self {
        Self {
            min_x: self.min_x - margin,
            min_y: self.min_y - margin,
            max_x: self.max_x + margin,
            max_y: self.max_y + margin,
        }
    }

    /// Whether `p` lies inside or on the edge.
    pub fn contains(&self, p: Vector2) -> bool {
        p.x >= self.min_x && p.x <= self.max_x && p.y >= self.min_y && p.y <= self.max_y
    }

    /// The point inside the bounds closest to `p`.
    pub fn clamp(&self, p: Vector2) -> Vector2 {
        Vector2::new(
            p.x.clamp(self.min_x, self.max_x),
            p.y.clamp(self.min_y, self.max_y),
        )
    }

    /// Width of the bounds.
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    /// Height of the bounds.
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f64 = 1e-10;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < TOLERANCE
    }

    #[test]
    fn test_vector_arithmetic() {
        let a = Vector2::new(1.0, 2.0);
        let b = Vector2::new(4.0, 6.0);

        assert_eq!(a + b, Vector2::new(5.0, 8.0));
        assert_eq!(b - a, Vector2::new(3.0, 4.0));
        assert_eq!(-a, Vector2::new(-1.0, -2.0));
        assert_eq!(2.0 * a, Vector2::new(2.0, 4.0));
    }

    #[test]
    fn test_vector_magnitude_and_distance() {
        let v = Vector2::new(3.0, 4.0);
        assert!(approx_eq(v.magnitude(), 5.0));
        assert!(approx_eq(v.magnitude_squared(), 25.0));
        assert!(approx_eq(Vector2::zero().distance(v), 5.0));
    }

    #[test]
    fn test_normalized_zero_stays_zero() {
        let n = Vector2::zero().normalized();
        assert_eq!(n, Vector2::zero());
        assert!(n.is_finite());
    }

    #[test]
    fn test_perpendicular_is_left_turn() {
        let t = Vector2::new(1.0, 0.0);
        assert_eq!(t.perpendicular(), Vector2::new(0.0, 1.0));
        assert!(approx_eq(t.cross(t.perpendicular()), 1.0));
        assert!(approx_eq(t.dot(t.perpendicular()), 0.0));
    }

    #[test]
    fn test_bounds_include_and_clamp() {
        let b = Bounds::nothing()
            .include(Vector2::new(-1.0, 2.0))
            .include(Vector2::new(3.0, -4.0));
        assert!(!b.is_empty());
        assert!(approx_eq(b.width(), 4.0));
        assert!(approx_eq(b.height(), 6.0));
        assert!(b.contains(Vector2::new(0.0, 0.0)));
        assert_eq!(b.clamp(Vector2::new(10.0, 10.0)), Vector2::new(3.0, 2.0));
        assert!(Bounds::nothing().is_empty());
    }
}
