//! Geometric primitives shared by every layer of the index.

use crate::error::QuadTreeError;
use glam::Vec2;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_POINT_ID: AtomicU64 = AtomicU64::new(1);

/// Stable identity of a [`Point`].
///
/// Two points created separately never share an id, even when their
/// coordinates and payloads are equal. Clones of a point keep its id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PointId(u64);

impl PointId {
    fn next() -> Self {
        Self(NEXT_POINT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// A position in the plane carrying an opaque payload.
#[derive(Debug, Clone)]
pub struct Point<T> {
    id: PointId,
    /// Current coordinates. The index only reads these.
    pub position: Vec2,
    /// Caller-owned payload, usually a handle to an external entity.
    pub data: T,
}

impl<T> Point<T> {
    /// Create a point with a fresh identity.
    pub fn new(x: f32, y: f32, data: T) -> Self {
        Self::at(Vec2::new(x, y), data)
    }

    /// Create a point at `position` with a fresh identity.
    pub fn at(position: Vec2, data: T) -> Self {
        Self {
            id: PointId::next(),
            position,
            data,
        }
    }

    #[inline]
    pub fn id(&self) -> PointId {
        self.id
    }

    #[inline]
    pub fn x(&self) -> f32 {
        self.position.x
    }

    #[inline]
    pub fn y(&self) -> f32 {
        self.position.y
    }

    /// Whether `other` is the same point (not merely an equal one).
    #[inline]
    pub fn is(&self, other: &Point<T>) -> bool {
        self.id == other.id
    }

    /// Squared euclidean distance, enough for ordering candidates.
    #[inline]
    pub fn squared_distance_to(&self, other: impl Into<Vec2>) -> f32 {
        self.position.distance_squared(other.into())
    }
}

impl<T> From<&Point<T>> for Vec2 {
    fn from(point: &Point<T>) -> Self {
        point.position
    }
}

/// Constructor arguments for [`Bounds`].
///
/// The minimum corner comes either from `corner` or from `x` and `y`;
/// `corner` wins when both are present.
#[derive(Debug, Clone, Copy, Default)]
pub struct BoundsArgs {
    pub corner: Option<Vec2>,
    pub x: Option<f32>,
    pub y: Option<f32>,
    pub width: f32,
    pub height: f32,
}

/// Axis-aligned rectangle with a minimum corner and a non-negative size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    min_x: f32,
    min_y: f32,
    width: f32,
    height: f32,
}

impl Bounds {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Result<Self, QuadTreeError> {
        if !(width >= 0.0 && height >= 0.0 && width.is_finite() && height.is_finite()) {
            return Err(QuadTreeError::InvalidExtent { width, height });
        }
        Ok(Self {
            min_x: x,
            min_y: y,
            width,
            height,
        })
    }

    /// Build bounds from loosely specified arguments.
    pub fn from_args(args: BoundsArgs) -> Result<Self, QuadTreeError> {
        let corner = match (args.corner, args.x, args.y) {
            (Some(corner), _, _) => corner,
            (None, Some(x), Some(y)) => Vec2::new(x, y),
            _ => return Err(QuadTreeError::MissingCorner),
        };
        Self::new(corner.x, corner.y, args.width, args.height)
    }

    /// Create bounds spanning `half_width`/`half_height` on each side of `center`.
    pub fn from_center(center: Vec2, half_width: f32, half_height: f32) -> Result<Self, QuadTreeError> {
        Self::new(
            center.x - half_width,
            center.y - half_height,
            half_width * 2.0,
            half_height * 2.0,
        )
    }

    #[inline]
    pub fn min_x(&self) -> f32 {
        self.min_x
    }

    #[inline]
    pub fn min_y(&self) -> f32 {
        self.min_y
    }

    #[inline]
    pub fn max_x(&self) -> f32 {
        self.min_x + self.width
    }

    #[inline]
    pub fn max_y(&self) -> f32 {
        self.min_y + self.height
    }

    #[inline]
    pub fn width(&self) -> f32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> f32 {
        self.height
    }

    #[inline]
    pub fn corner(&self) -> Vec2 {
        Vec2::new(self.min_x, self.min_y)
    }

    /// Check if `other` lies entirely inside these bounds.
    #[inline]
    pub fn covers(&self, other: &Bounds) -> bool {
        self.min_x <= other.min_x
            && self.min_y <= other.min_y
            && self.max_x() >= other.max_x()
            && self.max_y() >= other.max_y()
    }

    /// Check if a position lies inside the bounds, edges included.
    #[inline]
    pub fn contains(&self, position: impl Into<Vec2>) -> bool {
        let p = position.into();
        p.x >= self.min_x && p.x <= self.max_x() && p.y >= self.min_y && p.y <= self.max_y()
    }

    /// Check if two bounds overlap. Touching edges count.
    #[inline]
    pub fn intersects(&self, other: &Bounds) -> bool {
        !(self.max_x() < other.min_x
            || self.min_x > other.max_x()
            || self.max_y() < other.min_y
            || self.min_y > other.max_y())
    }

    /// Split into the four equal quadrants, ordered north-east, north-west,
    /// south-east, south-west.
    pub(crate) fn quadrants(&self) -> [Bounds; 4] {
        let half_w = self.width / 2.0;
        let half_h = self.height / 2.0;
        let quad = |x: f32, y: f32| Bounds {
            min_x: x,
            min_y: y,
            width: half_w,
            height: half_h,
        };
        [
            quad(self.min_x + half_w, self.min_y),
            quad(self.min_x, self.min_y),
            quad(self.min_x + half_w, self.min_y + half_h),
            quad(self.min_x, self.min_y + half_h),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds_contains_is_inclusive() {
        let b = Bounds::new(0.0, 0.0, 10.0, 10.0).unwrap();

        assert!(b.contains(Vec2::new(0.0, 0.0)));
        assert!(b.contains(Vec2::new(10.0, 10.0)));
        assert!(b.contains(Vec2::new(5.0, 10.0)));
        assert!(!b.contains(Vec2::new(10.01, 5.0)));
        assert!(!b.contains(Vec2::new(5.0, -0.01)));
    }

    #[test]
    fn test_bounds_intersects() {
        let a = Bounds::new(0.0, 0.0, 10.0, 10.0).unwrap();
        let b = Bounds::new(5.0, 5.0, 10.0, 10.0).unwrap();
        let c = Bounds::new(20.0, 20.0, 10.0, 10.0).unwrap();
        let touching = Bounds::new(10.0, 0.0, 5.0, 5.0).unwrap();

        assert!(a.intersects(&b));
        assert!(b.intersects(&a));
        assert!(!a.intersects(&c));
        assert!(!c.intersects(&a));
        assert!(a.intersects(&touching));
        assert!(touching.intersects(&a));
    }

    #[test]
    fn test_bounds_covers() {
        let outer = Bounds::new(0.0, 0.0, 10.0, 10.0).unwrap();
        let inner = Bounds::new(2.0, 2.0, 8.0, 8.0).unwrap();
        let straddling = Bounds::new(5.0, 5.0, 10.0, 2.0).unwrap();

        assert!(outer.covers(&inner));
        assert!(outer.covers(&outer));
        assert!(!inner.covers(&outer));
        assert!(!outer.covers(&straddling));
    }

    #[test]
    fn test_bounds_from_args() {
        let by_corner = Bounds::from_args(BoundsArgs {
            corner: Some(Vec2::new(1.0, 2.0)),
            width: 3.0,
            height: 4.0,
            ..Default::default()
        })
        .unwrap();
        assert_eq!(by_corner.corner(), Vec2::new(1.0, 2.0));
        assert_eq!(by_corner.max_x(), 4.0);
        assert_eq!(by_corner.max_y(), 6.0);

        let by_xy = Bounds::from_args(BoundsArgs {
            x: Some(1.0),
            y: Some(2.0),
            width: 3.0,
            height: 4.0,
            ..Default::default()
        })
        .unwrap();
        assert_eq!(by_xy, by_corner);
    }

    #[test]
    fn test_bounds_construction_errors() {
        let missing = Bounds::from_args(BoundsArgs {
            x: Some(1.0),
            width: 3.0,
            height: 4.0,
            ..Default::default()
        });
        assert_eq!(missing, Err(QuadTreeError::MissingCorner));

        assert!(matches!(
            Bounds::new(0.0, 0.0, -1.0, 1.0),
            Err(QuadTreeError::InvalidExtent { .. })
        ));
        assert!(matches!(
            Bounds::new(0.0, 0.0, 1.0, f32::NAN),
            Err(QuadTreeError::InvalidExtent { .. })
        ));
    }

    #[test]
    fn test_quadrants_cover_parent() {
        let b = Bounds::new(0.0, 0.0, 100.0, 50.0).unwrap();
        let [ne, nw, se, sw] = b.quadrants();

        assert_eq!(ne, Bounds::new(50.0, 0.0, 50.0, 25.0).unwrap());
        assert_eq!(nw, Bounds::new(0.0, 0.0, 50.0, 25.0).unwrap());
        assert_eq!(se, Bounds::new(50.0, 25.0, 50.0, 25.0).unwrap());
        assert_eq!(sw, Bounds::new(0.0, 25.0, 50.0, 25.0).unwrap());
    }

    #[test]
    fn test_point_identity() {
        let a = Point::new(1.0, 1.0, ());
        let b = Point::new(1.0, 1.0, ());
        let alias = a.clone();

        assert!(!a.is(&b));
        assert!(a.is(&alias));
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_squared_distance() {
        let a = Point::new(1.0, 2.0, ());
        let b = Point::new(4.0, 6.0, ());

        assert_eq!(a.squared_distance_to(&b), 25.0);
        assert_eq!(a.squared_distance_to(Vec2::new(1.0, 2.0)), 0.0);
    }
}
