//! Planes in normal/offset form.

use nalgebra::{Isometry3, Point3, Vector3};

/// A plane `n . x + d = 0`.
///
/// The positive halfspace (`n . x + d > 0`) is the *inside* for clipping
/// queries: a frustum is described by planes whose normals point inward.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Plane {
    /// Unit plane normal.
    pub normal: Vector3<f32>,
    /// Signed offset along the normal.
    pub d: f32,
}

impl Plane {
    /// Create a plane from a normal and an offset.
    #[must_use]
    pub fn new(normal: Vector3<f32>, d: f32) -> Self {
        Self { normal, d }
    }

    /// Create the plane through `point` with the given normal.
    #[must_use]
    pub fn from_point_normal(point: Point3<f32>, normal: Vector3<f32>) -> Self {
        Self {
            normal,
            d: -normal.dot(&point.coords),
        }
    }

    /// Signed distance from a point, positive on the inside.
    #[must_use]
    pub fn signed_distance(&self, point: &Point3<f32>) -> f32 {
        self.normal.dot(&point.coords) + self.d
    }

    /// Express a world-space plane in the local space of `world`.
    ///
    /// For `x_world = world * x_local`, the returned plane evaluates to the
    /// same signed distance on corresponding points. Rotation and translation
    /// only; scale is not supported anywhere in this pipeline.
    #[must_use]
    pub fn to_local_space(&self, world: &Isometry3<f32>) -> Self {
        let normal = world.rotation.inverse_transform_vector(&self.normal);
        let d = self.d + self.normal.dot(&world.translation.vector);
        Self { normal, d }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::{Translation3, UnitQuaternion};

    #[test]
    fn test_signed_distance() {
        let plane = Plane::new(Vector3::z(), -1.0);
        assert_relative_eq!(plane.signed_distance(&Point3::new(0.0, 0.0, 3.0)), 2.0);
        assert_relative_eq!(plane.signed_distance(&Point3::new(5.0, 5.0, 0.0)), -1.0);
    }

    #[test]
    fn test_from_point_normal() {
        let plane = Plane::from_point_normal(Point3::new(0.0, 2.0, 0.0), Vector3::y());
        assert_relative_eq!(plane.signed_distance(&Point3::new(1.0, 2.0, -4.0)), 0.0);
    }

    #[test]
    fn test_to_local_space_preserves_distance() {
        let world = Isometry3::from_parts(
            Translation3::new(1.0, -2.0, 0.5),
            UnitQuaternion::from_euler_angles(0.3, -0.7, 1.1),
        );
        let plane = Plane::new(Vector3::new(0.0, 0.0, 1.0), 0.25);
        let local = plane.to_local_space(&world);

        let p_local = Point3::new(0.4, -1.2, 2.0);
        let p_world = world * p_local;
        assert_relative_eq!(
            local.signed_distance(&p_local),
            plane.signed_distance(&p_world),
            epsilon = 1e-5
        );
    }
}
