//! Math utilities
//!
//! Re-exports from glam plus the bounding volume and segment tests used by
//! occlusion culling.

pub use glam::Vec3;

use serde::{Deserialize, Serialize};

/// Direction components with a smaller magnitude than this are treated as zero
/// by the slab test, so they never divide.
pub const DIRECTION_EPSILON: f32 = 1e-6;

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    /// Minimum corner
    pub min: Vec3,
    /// Maximum corner
    pub max: Vec3,
}

impl Aabb {
    /// Create an empty AABB
    pub const EMPTY: Self = Self {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };

    /// Create an AABB from min and max corners
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Smallest AABB enclosing every point, `EMPTY` for no points
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Vec3>) -> Self {
        let mut result = Self::EMPTY;
        for point in points {
            result.expand_to_include(*point);
        }
        result
    }

    /// Check if the AABB is empty
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Check if a point is inside the AABB (boundary inclusive)
    pub fn contains_point(&self, point: Vec3) -> bool {
        point.x >= self.min.x && point.x <= self.max.x &&
        point.y >= self.min.y && point.y <= self.max.y &&
        point.z >= self.min.z && point.z <= self.max.z
    }

    /// Expand the AABB to include a point
    pub fn expand_to_include(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    /// Merge with another AABB
    pub fn merge(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Self::EMPTY
    }
}

/// Finite line segment, parameterised as `start + (end - start) * t` for `t` in `[0, 1]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    /// Segment start
    pub start: Vec3,
    /// Segment end
    pub end: Vec3,
}

impl Segment {
    /// Create a new segment
    pub fn new(start: Vec3, end: Vec3) -> Self {
        Self { start, end }
    }

    /// Unnormalised direction from start to end
    pub fn direction(&self) -> Vec3 {
        self.end - self.start
    }

    /// Slab test against an AABB.
    ///
    /// Returns the `(t_enter, t_exit)` parameters of the overlap between the
    /// infinite line and the box, restricted to lines that reach the box in
    /// front of `start`. Axes whose direction component is near zero are not
    /// divided: the line either lies within that slab for every `t` or never.
    pub fn intersect_aabb(&self, aabb: &Aabb) -> Option<(f32, f32)> {
        let origin = self.start;
        let dir = self.direction();

        let mut t_enter = f32::NEG_INFINITY;
        let mut t_exit = f32::INFINITY;

        for axis in 0..3 {
            let o = origin[axis];
            let d = dir[axis];
            let (lo, hi) = (aabb.min[axis], aabb.max[axis]);

            if d.abs() < DIRECTION_EPSILON {
                if o < lo || o > hi {
                    return None;
                }
                continue;
            }

            let inv = 1.0 / d;
            let mut t1 = (lo - o) * inv;
            let mut t2 = (hi - o) * inv;
            if t1 > t2 {
                std::mem::swap(&mut t1, &mut t2);
            }
            t_enter = t_enter.max(t1);
            t_exit = t_exit.min(t2);

            if t_enter > t_exit {
                return None;
            }
        }

        if t_exit < 0.0 {
            None
        } else {
            Some((t_enter, t_exit))
        }
    }

    /// Whether the segment enters the box strictly between its start and its end.
    ///
    /// A box that already contains `start` does not block the segment.
    pub fn is_blocked_by(&self, aabb: &Aabb) -> bool {
        const END_TOLERANCE: f32 = 1e-4;
        match self.intersect_aabb(aabb) {
            Some((t_enter, _)) => t_enter >= 0.0 && t_enter < 1.0 - END_TOLERANCE,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_aabb() {
        assert!(Aabb::EMPTY.is_empty());
        assert!(Aabb::default().is_empty());
        assert!(!Aabb::new(Vec3::ZERO, Vec3::ZERO).is_empty());
    }

    #[test]
    fn test_aabb_from_points() {
        let points = [Vec3::new(1.0, -2.0, 3.0), Vec3::new(-1.0, 4.0, 0.0)];
        let aabb = Aabb::from_points(&points);
        assert_eq!(aabb.min, Vec3::new(-1.0, -2.0, 0.0));
        assert_eq!(aabb.max, Vec3::new(1.0, 4.0, 3.0));

        let empty: [Vec3; 0] = [];
        assert!(Aabb::from_points(&empty).is_empty());
    }

    #[test]
    fn test_aabb_contains_point() {
        let aabb = Aabb::new(Vec3::ZERO, Vec3::ONE);
        assert!(aabb.contains_point(Vec3::splat(0.5)));
        assert!(aabb.contains_point(Vec3::ONE));
        assert!(!aabb.contains_point(Vec3::splat(2.0)));
    }

    #[test]
    fn test_aabb_merge() {
        let a = Aabb::new(Vec3::ZERO, Vec3::ONE);
        let c = Aabb::new(Vec3::splat(2.0), Vec3::splat(3.0));

        assert_eq!(a.merge(&c), Aabb::new(Vec3::ZERO, Vec3::splat(3.0)));
        assert_eq!(Aabb::EMPTY.merge(&a), a);
    }

    #[test]
    fn test_segment_hits_box() {
        let segment = Segment::new(Vec3::new(-5.0, 0.5, 0.5), Vec3::new(5.0, 0.5, 0.5));
        let aabb = Aabb::new(Vec3::ZERO, Vec3::ONE);

        let (t_enter, t_exit) = segment.intersect_aabb(&aabb).unwrap();
        assert!((t_enter - 0.5).abs() < 0.001);
        assert!((t_exit - 0.6).abs() < 0.001);
        assert!(segment.is_blocked_by(&aabb));
    }

    #[test]
    fn test_segment_axis_aligned_guard() {
        // Direction has zero y and z components
        let aabb = Aabb::new(Vec3::ZERO, Vec3::ONE);
        let inside_slab = Segment::new(Vec3::new(-2.0, 0.5, 0.5), Vec3::new(3.0, 0.5, 0.5));
        let outside_slab = Segment::new(Vec3::new(-2.0, 2.0, 0.5), Vec3::new(3.0, 2.0, 0.5));

        assert!(inside_slab.is_blocked_by(&aabb));
        assert!(!outside_slab.is_blocked_by(&aabb));
    }

    #[test]
    fn test_segment_stops_before_box() {
        let segment = Segment::new(Vec3::new(-5.0, 0.5, 0.5), Vec3::new(-1.0, 0.5, 0.5));
        let aabb = Aabb::new(Vec3::ZERO, Vec3::ONE);
        assert!(!segment.is_blocked_by(&aabb));
    }

    #[test]
    fn test_segment_box_behind_start() {
        let segment = Segment::new(Vec3::new(2.0, 0.5, 0.5), Vec3::new(5.0, 0.5, 0.5));
        let aabb = Aabb::new(Vec3::ZERO, Vec3::ONE);
        assert!(segment.intersect_aabb(&aabb).is_none());
        assert!(!segment.is_blocked_by(&aabb));
    }

    #[test]
    fn test_segment_starting_inside_box_is_not_blocked() {
        let segment = Segment::new(Vec3::splat(0.5), Vec3::new(5.0, 0.5, 0.5));
        let aabb = Aabb::new(Vec3::ZERO, Vec3::ONE);
        assert!(!segment.is_blocked_by(&aabb));
    }

    #[test]
    fn test_degenerate_segment() {
        let point = Vec3::new(3.0, 3.0, 3.0);
        let segment = Segment::new(point, point);
        let aabb = Aabb::new(Vec3::ZERO, Vec3::ONE);
        assert!(!segment.is_blocked_by(&aabb));
    }
}
