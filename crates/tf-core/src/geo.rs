//! Planar coordinate type.
//!
//! The road network lives in a local Cartesian frame measured in metres.
//! `f32` gives millimetre precision over a 10 km scenario, which is far
//! below anything the kinematic model can resolve.

/// A point in the scenario's planar frame, in metres.
#[derive(Copy, Clone, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    #[inline]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance in metres.
    #[inline]
    pub fn distance_m(self, other: Point) -> f32 {
        self.distance_sq(other).sqrt()
    }

    /// Squared distance; cheaper when only comparing.
    #[inline]
    pub fn distance_sq(self, other: Point) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        dx * dx + dy * dy
    }

    /// Linear interpolation: `t = 0` is `self`, `t = 1` is `other`.
    #[inline]
    pub fn lerp(self, other: Point, t: f32) -> Point {
        Point {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
        }
    }

    /// Unit vector from `self` towards `other`.  Zero vector if coincident.
    pub fn direction_to(self, other: Point) -> Point {
        let d = self.distance_m(other);
        if d <= f32::EPSILON {
            return Point::default();
        }
        Point { x: (other.x - self.x) / d, y: (other.y - self.y) / d }
    }

    /// Offset by `dist` along unit vector `dir`.
    #[inline]
    pub fn offset(self, dir: Point, dist: f32) -> Point {
        Point { x: self.x + dir.x * dist, y: self.y + dir.y * dist }
    }

    /// Clockwise perpendicular of a direction vector (points to the right of
    /// travel in a y-up frame).
    #[inline]
    pub fn right_normal(self) -> Point {
        Point { x: self.y, y: -self.x }
    }

    /// Cheap box rejection before an exact distance test.
    #[inline]
    pub fn within_box(self, center: Point, half_extent: f32) -> bool {
        (self.x - center.x).abs() <= half_extent && (self.y - center.y).abs() <= half_extent
    }
}

impl std::fmt::Display for Point {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.2}, {:.2})", self.x, self.y)
    }
}
