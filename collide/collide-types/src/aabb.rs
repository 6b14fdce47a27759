//! Axis-aligned bounding boxes in center/half-extents form.
//!
//! Collision trees store boxes as a center and positive half-extents rather
//! than min/max corners: the box-box separating-axis test and the 16-bit
//! quantized representation both want the box in this form.

use nalgebra::{Point3, Vector3};

/// An axis-aligned bounding box stored as center and half-extents.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Aabb {
    /// Box center.
    pub center: Point3<f32>,
    /// Positive half-extents along each axis.
    pub extents: Vector3<f32>,
}

impl Aabb {
    /// Create a box from its center and half-extents.
    #[must_use]
    pub fn new(center: Point3<f32>, extents: Vector3<f32>) -> Self {
        Self { center, extents }
    }

    /// Create a box from min/max corners.
    #[must_use]
    pub fn from_min_max(min: Point3<f32>, max: Point3<f32>) -> Self {
        Self {
            center: nalgebra::center(&min, &max),
            extents: (max - min) * 0.5,
        }
    }

    /// Create the tightest box enclosing three points.
    #[must_use]
    pub fn from_points(a: Point3<f32>, b: Point3<f32>, c: Point3<f32>) -> Self {
        let min = Point3::new(
            a.x.min(b.x).min(c.x),
            a.y.min(b.y).min(c.y),
            a.z.min(b.z).min(c.z),
        );
        let max = Point3::new(
            a.x.max(b.x).max(c.x),
            a.y.max(b.y).max(c.y),
            a.z.max(b.z).max(c.z),
        );
        Self::from_min_max(min, max)
    }

    /// Minimum corner.
    #[must_use]
    pub fn min(&self) -> Point3<f32> {
        self.center - self.extents
    }

    /// Maximum corner.
    #[must_use]
    pub fn max(&self) -> Point3<f32> {
        self.center + self.extents
    }

    /// Smallest box enclosing `self` and `other`.
    #[must_use]
    pub fn merged(&self, other: &Self) -> Self {
        let min = self.min().inf(&other.min());
        let max = self.max().sup(&other.max());
        Self::from_min_max(min, max)
    }

    /// True when `other` lies entirely inside this box.
    #[must_use]
    pub fn contains(&self, other: &Self) -> bool {
        let (smin, smax) = (self.min(), self.max());
        let (omin, omax) = (other.min(), other.max());
        smin.x <= omin.x
            && smin.y <= omin.y
            && smin.z <= omin.z
            && smax.x >= omax.x
            && smax.y >= omax.y
            && smax.z >= omax.z
    }

    /// Squared magnitude of the half-extents, used as a descent heuristic.
    #[must_use]
    pub fn size(&self) -> f32 {
        self.extents.norm_squared()
    }
}

/// A bounding box quantized to 16 bits per component.
///
/// Centers are signed (one bit reserved for sign), extents unsigned. The
/// dequantization coefficients live on the owning tree; a quantized box is
/// meaningless without them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct QuantizedAabb {
    /// Quantized center, one word per axis.
    pub center: [i16; 3],
    /// Quantized half-extents, one word per axis.
    pub extents: [u16; 3],
}

impl QuantizedAabb {
    /// Dequantize the center with per-axis coefficients.
    #[must_use]
    pub fn dequantize_center(&self, coeff: &Vector3<f32>) -> Point3<f32> {
        Point3::new(
            f32::from(self.center[0]) * coeff.x,
            f32::from(self.center[1]) * coeff.y,
            f32::from(self.center[2]) * coeff.z,
        )
    }

    /// Dequantize the half-extents with per-axis coefficients.
    #[must_use]
    pub fn dequantize_extents(&self, coeff: &Vector3<f32>) -> Vector3<f32> {
        Vector3::new(
            f32::from(self.extents[0]) * coeff.x,
            f32::from(self.extents[1]) * coeff.y,
            f32::from(self.extents[2]) * coeff.z,
        )
    }
}
