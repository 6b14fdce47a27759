//! Triangles and segments.

use crate::Aabb;
use nalgebra::{Matrix3, Point3, Vector3};

/// A triangle given by its three vertices.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Triangle {
    /// The three vertices, in winding order.
    pub vertices: [Point3<f32>; 3],
}

impl Triangle {
    /// Create a triangle from three vertices.
    #[must_use]
    pub fn new(v0: Point3<f32>, v1: Point3<f32>, v2: Point3<f32>) -> Self {
        Self {
            vertices: [v0, v1, v2],
        }
    }

    /// Tightest enclosing axis-aligned box.
    #[must_use]
    pub fn aabb(&self) -> Aabb {
        Aabb::from_points(self.vertices[0], self.vertices[1], self.vertices[2])
    }

    /// Non-normalized normal `(v1 - v0) x (v2 - v0)`.
    #[must_use]
    pub fn normal(&self) -> Vector3<f32> {
        let e0 = self.vertices[1] - self.vertices[0];
        let e1 = self.vertices[2] - self.vertices[0];
        e0.cross(&e1)
    }

    /// Apply a rotation and translation to all three vertices.
    #[must_use]
    pub fn transformed(&self, rot: &Matrix3<f32>, trans: &Vector3<f32>) -> Self {
        Self {
            vertices: [
                Point3::from(rot * self.vertices[0].coords + trans),
                Point3::from(rot * self.vertices[1].coords + trans),
                Point3::from(rot * self.vertices[2].coords + trans),
            ],
        }
    }
}

/// A line segment between two points.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Segment {
    /// Segment start.
    pub start: Point3<f32>,
    /// Segment end.
    pub end: Point3<f32>,
}

impl Segment {
    /// Create a segment from its endpoints.
    #[must_use]
    pub fn new(start: Point3<f32>, end: Point3<f32>) -> Self {
        Self { start, end }
    }

    /// Direction vector `end - start` (not normalized).
    #[must_use]
    pub fn direction(&self) -> Vector3<f32> {
        self.end - self.start
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_aabb_encloses_vertices() {
        let tri = Triangle::new(
            Point3::new(-1.0, 0.0, 2.0),
            Point3::new(1.0, 3.0, 0.0),
            Point3::new(0.0, -1.0, 1.0),
        );
        let aabb = tri.aabb();
        assert_relative_eq!(aabb.min().y, -1.0);
        assert_relative_eq!(aabb.max().z, 2.0);
    }

    #[test]
    fn test_normal_orientation() {
        let tri = Triangle::new(
            Point3::origin(),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        );
        assert!(tri.normal().z > 0.0);
    }

    #[test]
    fn test_segment_direction() {
        let seg = Segment::new(Point3::new(1.0, 0.0, 0.0), Point3::new(1.0, 2.0, 0.0));
        assert_relative_eq!(seg.direction().y, 2.0);
    }
}
