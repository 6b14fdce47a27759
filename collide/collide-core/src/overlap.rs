//! Separating-axis overlap tests used during tree traversal.
//!
//! All tests are conservative in the same direction: a `true` result means
//! "possibly overlapping, keep descending", never the reverse. Box-box and
//! triangle-box each have an optional second-stage axis class that trades a
//! few dot products for tighter pruning; the colliders expose those as
//! settings.

use collide_types::{Plane, Triangle};
use nalgebra::{Matrix3, Point3, Vector3};

/// OBB-OBB separating-axis test.
///
/// Box 0 lives in the frame the transform maps into: `rot_1to0` and
/// `trans_1to0` bring box 1's frame into box 0's. `abs_rot` is the
/// element-wise absolute value of `rot_1to0`, usually with a small epsilon
/// added so near-parallel edge cross products do not produce false
/// separations. `full_test` enables the nine edge-edge axes (class III) on
/// top of the six face axes.
#[must_use]
#[allow(clippy::too_many_arguments, clippy::similar_names)]
pub fn box_box_overlap(
    extents0: &Vector3<f32>,
    center0: &Point3<f32>,
    extents1: &Vector3<f32>,
    center1: &Point3<f32>,
    rot_1to0: &Matrix3<f32>,
    abs_rot: &Matrix3<f32>,
    trans_1to0: &Vector3<f32>,
    full_test: bool,
) -> bool {
    let t = rot_1to0 * center1.coords + trans_1to0 - center0.coords;

    // Class I: box 0's face axes.
    let reach1 = abs_rot * extents1;
    for axis in 0..3 {
        if t[axis].abs() > extents0[axis] + reach1[axis] {
            return false;
        }
    }

    // Class II: box 1's face axes.
    let t_in_1 = rot_1to0.tr_mul(&t);
    let reach0 = abs_rot.tr_mul(extents0);
    for axis in 0..3 {
        if t_in_1[axis].abs() > reach0[axis] + extents1[axis] {
            return false;
        }
    }

    if !full_test {
        return true;
    }

    // Class III: the nine edge-edge cross products.
    for i in 0..3 {
        let i1 = (i + 1) % 3;
        let i2 = (i + 2) % 3;
        for j in 0..3 {
            let j1 = (j + 1) % 3;
            let j2 = (j + 2) % 3;
            let sep = t[i2] * rot_1to0[(i1, j)] - t[i1] * rot_1to0[(i2, j)];
            let reach = extents0[i1] * abs_rot[(i2, j)]
                + extents0[i2] * abs_rot[(i1, j)]
                + extents1[j1] * abs_rot[(i, j2)]
                + extents1[j2] * abs_rot[(i, j1)];
            if sep.abs() > reach {
                return false;
            }
        }
    }

    true
}

/// Triangle-AABB separating-axis test, with the triangle already expressed
/// in the box's frame.
///
/// Face axes and the triangle plane always run; `full_test` adds the nine
/// edge cross-product axes between them.
#[must_use]
pub fn tri_box_overlap(
    tri: &Triangle,
    center: &Point3<f32>,
    extents: &Vector3<f32>,
    full_test: bool,
) -> bool {
    // Move the box to the origin.
    let v0 = tri.vertices[0] - center;
    let v1 = tri.vertices[1] - center;
    let v2 = tri.vertices[2] - center;

    // Class I: the box's face normals.
    for axis in 0..3 {
        let min = v0[axis].min(v1[axis]).min(v2[axis]);
        let max = v0[axis].max(v1[axis]).max(v2[axis]);
        if min > extents[axis] || max < -extents[axis] {
            return false;
        }
    }

    let e0 = v1 - v0;
    let e1 = v2 - v1;

    if full_test {
        let e2 = v0 - v2;
        let separated = |p: f32, q: f32, rad: f32| p.min(q) > rad || p.max(q) < -rad;

        let fe = e0.abs();
        if separated(
            e0.z * v0.y - e0.y * v0.z,
            e0.z * v2.y - e0.y * v2.z,
            fe.z * extents.y + fe.y * extents.z,
        ) || separated(
            -e0.z * v0.x + e0.x * v0.z,
            -e0.z * v2.x + e0.x * v2.z,
            fe.z * extents.x + fe.x * extents.z,
        ) || separated(
            e0.y * v1.x - e0.x * v1.y,
            e0.y * v2.x - e0.x * v2.y,
            fe.y * extents.x + fe.x * extents.y,
        ) {
            return false;
        }

        let fe = e1.abs();
        if separated(
            e1.z * v0.y - e1.y * v0.z,
            e1.z * v2.y - e1.y * v2.z,
            fe.z * extents.y + fe.y * extents.z,
        ) || separated(
            -e1.z * v0.x + e1.x * v0.z,
            -e1.z * v2.x + e1.x * v2.z,
            fe.z * extents.x + fe.x * extents.z,
        ) || separated(
            e1.y * v0.x - e1.x * v0.y,
            e1.y * v1.x - e1.x * v1.y,
            fe.y * extents.x + fe.x * extents.y,
        ) {
            return false;
        }

        let fe = e2.abs();
        if separated(
            e2.z * v0.y - e2.y * v0.z,
            e2.z * v1.y - e2.y * v1.z,
            fe.z * extents.y + fe.y * extents.z,
        ) || separated(
            -e2.z * v0.x + e2.x * v0.z,
            -e2.z * v1.x + e2.x * v1.z,
            fe.z * extents.x + fe.x * extents.z,
        ) || separated(
            e2.y * v1.x - e2.x * v1.y,
            e2.y * v2.x - e2.x * v2.y,
            fe.y * extents.x + fe.x * extents.y,
        ) {
            return false;
        }
    }

    // Class II: the triangle's own plane against the box.
    let normal = e0.cross(&e1);
    let mut vmin = Vector3::zeros();
    let mut vmax = Vector3::zeros();
    for axis in 0..3 {
        if normal[axis] > 0.0 {
            vmin[axis] = -extents[axis] - v0[axis];
            vmax[axis] = extents[axis] - v0[axis];
        } else {
            vmin[axis] = extents[axis] - v0[axis];
            vmax[axis] = -extents[axis] - v0[axis];
        }
    }
    if normal.dot(&vmin) > 0.0 {
        return false;
    }
    normal.dot(&vmax) >= 0.0
}

/// Test an AABB against up to 32 planes addressed by `in_mask`.
///
/// Planes follow the frustum convention: the normal points toward the
/// *inside* halfspace. Returns `None` when the box is fully outside some
/// active plane (the subtree can be pruned), otherwise the mask of active
/// planes the box still straddles. A returned mask of `0` means the box,
/// and everything inside it, is fully inside all active planes.
#[must_use]
pub fn planes_aabb_overlap(
    center: &Point3<f32>,
    extents: &Vector3<f32>,
    planes: &[Plane],
    in_mask: u32,
) -> Option<u32> {
    let mut out_mask = 0u32;
    for (i, plane) in planes.iter().enumerate() {
        let bit = 1u32 << i;
        if in_mask & bit == 0 {
            continue;
        }
        let reach = extents.x * plane.normal.x.abs()
            + extents.y * plane.normal.y.abs()
            + extents.z * plane.normal.z.abs();
        let dist = plane.signed_distance(center);
        if dist < -reach {
            return None;
        }
        if dist <= reach {
            out_mask |= bit;
        }
    }
    Some(out_mask)
}

/// Test a triangle against the planes addressed by `mask`.
///
/// Returns `false` only when all three vertices are strictly outside some
/// active plane. That makes it conservative: a triangle crossing an active
/// plane's corner region may still report `true`.
#[must_use]
pub fn planes_tri_overlap(tri: &Triangle, planes: &[Plane], mask: u32) -> bool {
    for (i, plane) in planes.iter().enumerate() {
        if mask & (1u32 << i) == 0 {
            continue;
        }
        let outside = tri
            .vertices
            .iter()
            .all(|v| plane.signed_distance(v) < 0.0);
        if outside {
            return false;
        }
    }
    true
}
