//! Closed-form squared-distance primitives.
//!
//! Quadratic minimization over the parameter domain of each primitive pair,
//! split into boundary regions. All functions return *squared* distances;
//! callers compare against squared radii and never pay for a square root.
//!
//! Near-parallel configurations fall back to exhaustive boundary tests
//! below a fixed determinant tolerance, and a fully degenerate triangle
//! (zero area) makes the point-triangle minimum unattainable, reported as
//! [`f32::MAX`].

use collide_types::{Segment, Triangle};
use nalgebra::{Point3, Vector3};

/// Determinant threshold below which configurations count as parallel.
const TOLERANCE: f32 = 1e-5;

/// Squared distance from a point to a triangle.
///
/// The result depends only on the triangle's point set: winding does not
/// matter. A degenerate (zero-area) triangle yields [`f32::MAX`].
#[must_use]
pub fn point_triangle_sqr_dist(point: &Point3<f32>, tri: &Triangle) -> f32 {
    let [p0, p1, p2] = tri.vertices;
    let edge0 = p1 - p0;
    let edge1 = p2 - p0;
    let diff = p0 - point;

    let a00 = edge0.norm_squared();
    let a01 = edge0.dot(&edge1);
    let a11 = edge1.norm_squared();
    let b0 = diff.dot(&edge0);
    let b1 = diff.dot(&edge1);
    let c = diff.norm_squared();
    let det = (a00 * a11 - a01 * a01).abs();
    let mut s = a01 * b1 - a11 * b0;
    let mut t = a01 * b0 - a00 * b1;

    // Closest point clamped to the edge from p0 along edge0 / edge1.
    let edge0_clamp = || {
        if b0 >= 0.0 {
            c
        } else if -b0 >= a00 {
            a00 + 2.0 * b0 + c
        } else {
            b0 * (-b0 / a00) + c
        }
    };
    let edge1_clamp = || {
        if b1 >= 0.0 {
            c
        } else if -b1 >= a11 {
            a11 + 2.0 * b1 + c
        } else {
            b1 * (-b1 / a11) + c
        }
    };
    let interior = |s: f32, t: f32| {
        s * (a00 * s + a01 * t + 2.0 * b0) + t * (a01 * s + a11 * t + 2.0 * b1) + c
    };

    let sqr_dist = if s + t <= det {
        if s < 0.0 {
            if t < 0.0 {
                // region 4
                if b0 < 0.0 {
                    if -b0 >= a00 {
                        a00 + 2.0 * b0 + c
                    } else {
                        b0 * (-b0 / a00) + c
                    }
                } else {
                    edge1_clamp()
                }
            } else {
                // region 3
                edge1_clamp()
            }
        } else if t < 0.0 {
            // region 5
            edge0_clamp()
        } else {
            // region 0: minimum at an interior point
            if det == 0.0 {
                return f32::MAX;
            }
            let inv_det = 1.0 / det;
            s *= inv_det;
            t *= inv_det;
            interior(s, t)
        }
    } else if s < 0.0 {
        // region 2
        let tmp0 = a01 + b0;
        let tmp1 = a11 + b1;
        if tmp1 > tmp0 {
            let numer = tmp1 - tmp0;
            let denom = a00 - 2.0 * a01 + a11;
            if numer >= denom {
                a00 + 2.0 * b0 + c
            } else {
                let s = numer / denom;
                interior(s, 1.0 - s)
            }
        } else if tmp1 <= 0.0 {
            a11 + 2.0 * b1 + c
        } else {
            edge1_clamp()
        }
    } else if t < 0.0 {
        // region 6
        let tmp0 = a01 + b1;
        let tmp1 = a00 + b0;
        if tmp1 > tmp0 {
            let numer = tmp1 - tmp0;
            let denom = a00 - 2.0 * a01 + a11;
            if numer >= denom {
                a11 + 2.0 * b1 + c
            } else {
                let t = numer / denom;
                interior(1.0 - t, t)
            }
        } else if tmp1 <= 0.0 {
            a00 + 2.0 * b0 + c
        } else {
            edge0_clamp()
        }
    } else {
        // region 1
        let numer = a11 + b1 - a01 - b0;
        if numer <= 0.0 {
            a11 + 2.0 * b1 + c
        } else {
            let denom = a00 - 2.0 * a01 + a11;
            if numer >= denom {
                a00 + 2.0 * b0 + c
            } else {
                let s = numer / denom;
                interior(s, 1.0 - s)
            }
        }
    };

    sqr_dist.abs()
}

/// Squared distance between two segments.
#[must_use]
#[allow(clippy::similar_names, clippy::too_many_lines)]
pub fn segment_segment_sqr_dist(seg0: &Segment, seg1: &Segment) -> f32 {
    let dir0 = seg0.direction();
    let dir1 = seg1.direction();
    let diff = seg0.start - seg1.start;

    let a00 = dir0.norm_squared();
    let a01 = -dir0.dot(&dir1);
    let a11 = dir1.norm_squared();
    let b0 = diff.dot(&dir0);
    let c = diff.norm_squared();
    let det = (a00 * a11 - a01 * a01).abs();

    // Closest point clamped to seg0 / seg1 against the other's endpoint.
    let seg0_clamp = || {
        if b0 >= 0.0 {
            c
        } else if -b0 >= a00 {
            a00 + 2.0 * b0 + c
        } else {
            b0 * (-b0 / a00) + c
        }
    };
    let seg1_clamp = |b1: f32| {
        if b1 >= 0.0 {
            c
        } else if -b1 >= a11 {
            a11 + 2.0 * b1 + c
        } else {
            b1 * (-b1 / a11) + c
        }
    };
    // seg0 clamped against seg1's far endpoint (t = 1).
    let seg0_far_clamp = |b1: f32| {
        let tmp = a01 + b0;
        if tmp >= 0.0 {
            a11 + 2.0 * b1 + c
        } else if -tmp >= a00 {
            a00 + a11 + c + 2.0 * (b1 + tmp)
        } else {
            tmp * (-tmp / a00) + a11 + 2.0 * b1 + c
        }
    };
    // seg1 clamped against seg0's far endpoint (s = 1).
    let seg1_far_clamp = |b1: f32| {
        let tmp = a01 + b1;
        if tmp >= 0.0 {
            a00 + 2.0 * b0 + c
        } else if -tmp >= a11 {
            a00 + a11 + c + 2.0 * (b0 + tmp)
        } else {
            tmp * (-tmp / a11) + a00 + 2.0 * b0 + c
        }
    };

    let sqr_dist = if det >= TOLERANCE {
        // Segments are not parallel.
        let b1 = -diff.dot(&dir1);
        let s = a01 * b1 - a11 * b0;
        let t = a01 * b0 - a00 * b1;

        if s >= 0.0 {
            if s <= det {
                if t >= 0.0 {
                    if t <= det {
                        // region 0: interior minimum
                        let inv_det = 1.0 / det;
                        let s = s * inv_det;
                        let t = t * inv_det;
                        s * (a00 * s + a01 * t + 2.0 * b0)
                            + t * (a01 * s + a11 * t + 2.0 * b1)
                            + c
                    } else {
                        // region 3
                        seg0_far_clamp(b1)
                    }
                } else {
                    // region 7
                    seg0_clamp()
                }
            } else if t >= 0.0 {
                if t <= det {
                    // region 1
                    seg1_far_clamp(b1)
                } else {
                    // region 2
                    let tmp = a01 + b0;
                    if -tmp <= a00 {
                        if tmp >= 0.0 {
                            a11 + 2.0 * b1 + c
                        } else {
                            tmp * (-tmp / a00) + a11 + 2.0 * b1 + c
                        }
                    } else {
                        seg1_far_clamp(b1)
                    }
                }
            } else {
                // region 8
                if -b0 < a00 {
                    if b0 >= 0.0 {
                        c
                    } else {
                        b0 * (-b0 / a00) + c
                    }
                } else {
                    seg1_far_clamp(b1)
                }
            }
        } else if t >= 0.0 {
            if t <= det {
                // region 5
                seg1_clamp(b1)
            } else {
                // region 4
                let tmp = a01 + b0;
                if tmp < 0.0 {
                    if -tmp >= a00 {
                        a00 + a11 + c + 2.0 * (b1 + tmp)
                    } else {
                        tmp * (-tmp / a00) + a11 + 2.0 * b1 + c
                    }
                } else {
                    seg1_clamp(b1)
                }
            }
        } else {
            // region 6
            if b0 < 0.0 {
                if -b0 >= a00 {
                    a00 + 2.0 * b0 + c
                } else {
                    b0 * (-b0 / a00) + c
                }
            } else {
                seg1_clamp(b1)
            }
        }
    } else if a01 > 0.0 {
        // Parallel, direction vectors form an obtuse angle.
        if b0 >= 0.0 {
            c
        } else if -b0 <= a00 {
            b0 * (-b0 / a00) + c
        } else {
            let b1 = -diff.dot(&dir1);
            let tmp = a00 + b0;
            if -tmp >= a01 {
                a00 + a11 + c + 2.0 * (a01 + b0 + b1)
            } else {
                let t = -tmp / a01;
                a00 + 2.0 * b0 + c + t * (a11 * t + 2.0 * (a01 + b1))
            }
        }
    } else {
        // Parallel, direction vectors form an acute angle.
        if -b0 >= a00 {
            a00 + 2.0 * b0 + c
        } else if b0 <= 0.0 {
            b0 * (-b0 / a00) + c
        } else {
            let b1 = -diff.dot(&dir1);
            if b0 >= -a01 {
                a11 + 2.0 * b1 + c
            } else {
                let t = -b0 / a01;
                c + t * (2.0 * b1 + a11 * t)
            }
        }
    };

    sqr_dist.abs()
}

/// Squared distance between a segment and a ray, as the segment against
/// the ray's unit-parameter span.
#[must_use]
pub fn segment_ray_sqr_dist(seg: &Segment, orig: &Point3<f32>, dir: &Vector3<f32>) -> f32 {
    segment_segment_sqr_dist(seg, &Segment::new(*orig, orig + dir))
}

/// Squared distance from a segment to a triangle.
#[must_use]
#[allow(clippy::similar_names)]
pub fn segment_triangle_sqr_dist(seg: &Segment, tri: &Triangle) -> f32 {
    let [p0, p1, p2] = tri.vertices;
    let edge0 = p1 - p0;
    let edge1 = p2 - p0;
    let seg_dir = seg.direction();
    let diff = p0 - seg.start;

    let a00 = seg_dir.norm_squared();
    let a01 = -seg_dir.dot(&edge0);
    let a02 = -seg_dir.dot(&edge1);
    let a11 = edge0.norm_squared();
    let a12 = edge0.dot(&edge1);
    let a22 = edge1.norm_squared();
    let b0 = -diff.dot(&seg_dir);
    let b1 = diff.dot(&edge0);
    let b2 = diff.dot(&edge1);
    let cof00 = a11 * a22 - a12 * a12;
    let cof01 = a02 * a12 - a01 * a22;
    let cof02 = a01 * a12 - a02 * a11;
    let det = a00 * cof00 + a01 * cof01 + a02 * cof02;

    // Boundary minimizations the region split falls back to.
    let ray_edge0 = || segment_ray_sqr_dist(seg, &p0, &edge0);
    let ray_edge1 = || segment_ray_sqr_dist(seg, &p0, &edge1);
    let ray_edge12 = || segment_ray_sqr_dist(seg, &p1, &(edge1 - edge0));
    let start_face = || point_triangle_sqr_dist(&seg.start, tri);
    let end_face = || point_triangle_sqr_dist(&seg.end, tri);

    let sqr_dist = if det.abs() >= TOLERANCE {
        let cof11 = a00 * a22 - a02 * a02;
        let cof12 = a02 * a01 - a00 * a12;
        let cof22 = a00 * a11 - a01 * a01;
        let inv_det = 1.0 / det;
        let rhs0 = -b0 * inv_det;
        let rhs1 = -b1 * inv_det;
        let rhs2 = -b2 * inv_det;

        let r = cof00 * rhs0 + cof01 * rhs1 + cof02 * rhs2;
        let s = cof01 * rhs0 + cof11 * rhs1 + cof12 * rhs2;
        let t = cof02 * rhs0 + cof12 * rhs1 + cof22 * rhs2;

        if r < 0.0 {
            // Minimum lies before the segment start: clamp to r = 0.
            if s + t <= 1.0 {
                if s < 0.0 {
                    if t < 0.0 {
                        ray_edge1().min(ray_edge0()).min(start_face())
                    } else {
                        ray_edge1().min(start_face())
                    }
                } else if t < 0.0 {
                    ray_edge0().min(start_face())
                } else {
                    start_face()
                }
            } else if s < 0.0 {
                ray_edge1().min(ray_edge12()).min(start_face())
            } else if t < 0.0 {
                ray_edge0().min(ray_edge12()).min(start_face())
            } else {
                ray_edge12().min(start_face())
            }
        } else if r <= 1.0 {
            if s + t <= 1.0 {
                if s < 0.0 {
                    if t < 0.0 {
                        ray_edge1().min(ray_edge0())
                    } else {
                        ray_edge1()
                    }
                } else if t < 0.0 {
                    ray_edge0()
                } else {
                    // Interior minimum.
                    r * (a00 * r + a01 * s + a02 * t + 2.0 * b0)
                        + s * (a01 * r + a11 * s + a12 * t + 2.0 * b1)
                        + t * (a02 * r + a12 * s + a22 * t + 2.0 * b2)
                        + diff.norm_squared()
                }
            } else if s < 0.0 {
                ray_edge1().min(ray_edge12())
            } else if t < 0.0 {
                ray_edge0().min(ray_edge12())
            } else {
                ray_edge12()
            }
        } else {
            // Minimum lies past the segment end: clamp to r = 1.
            if s + t <= 1.0 {
                if s < 0.0 {
                    if t < 0.0 {
                        ray_edge1().min(ray_edge0()).min(end_face())
                    } else {
                        ray_edge1().min(end_face())
                    }
                } else if t < 0.0 {
                    ray_edge0().min(end_face())
                } else {
                    end_face()
                }
            } else if s < 0.0 {
                ray_edge1().min(ray_edge12()).min(end_face())
            } else if t < 0.0 {
                ray_edge0().min(ray_edge12()).min(end_face())
            } else {
                ray_edge12().min(end_face())
            }
        }
    } else {
        // Segment and triangle are parallel: test all three edges and both
        // endpoints.
        ray_edge0()
            .min(ray_edge1())
            .min(ray_edge12())
            .min(start_face())
            .min(end_face())
    };

    sqr_dist.abs()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_tri() -> Triangle {
        Triangle::new(
            Point3::origin(),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        )
    }

    #[test]
    fn test_point_above_interior() {
        let d = point_triangle_sqr_dist(&Point3::new(0.25, 0.25, 2.0), &unit_tri());
        assert_relative_eq!(d, 4.0, epsilon = 1e-5);
    }

    #[test]
    fn test_point_on_triangle() {
        let d = point_triangle_sqr_dist(&Point3::new(0.25, 0.25, 0.0), &unit_tri());
        assert_relative_eq!(d, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_point_nearest_vertex() {
        let d = point_triangle_sqr_dist(&Point3::new(-1.0, -1.0, 0.0), &unit_tri());
        assert_relative_eq!(d, 2.0, epsilon = 1e-5);
    }

    #[test]
    fn test_point_nearest_edge() {
        // Closest feature is the hypotenuse x + y = 1.
        let d = point_triangle_sqr_dist(&Point3::new(1.0, 1.0, 0.0), &unit_tri());
        assert_relative_eq!(d, 0.5, epsilon = 1e-5);
    }

    #[test]
    fn test_point_winding_invariance() {
        let tri = unit_tri();
        let flipped = Triangle::new(tri.vertices[0], tri.vertices[2], tri.vertices[1]);
        for p in [
            Point3::new(0.3, 0.2, 1.5),
            Point3::new(-2.0, 0.5, -0.5),
            Point3::new(2.0, 2.0, 0.1),
        ] {
            assert_relative_eq!(
                point_triangle_sqr_dist(&p, &tri),
                point_triangle_sqr_dist(&p, &flipped),
                epsilon = 1e-5
            );
        }
    }

    #[test]
    fn test_degenerate_triangle_sentinel() {
        // Zero-area triangle with the query point over its interior.
        let tri = Triangle::new(
            Point3::origin(),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
        );
        let d = point_triangle_sqr_dist(&Point3::new(0.9, 0.0, 1.0), &tri);
        assert_eq!(d, f32::MAX);
    }

    #[test]
    fn test_segments_crossing() {
        let seg0 = Segment::new(Point3::new(-1.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0));
        let seg1 = Segment::new(Point3::new(0.0, -1.0, 1.0), Point3::new(0.0, 1.0, 1.0));
        assert_relative_eq!(segment_segment_sqr_dist(&seg0, &seg1), 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_segments_parallel() {
        let seg0 = Segment::new(Point3::origin(), Point3::new(1.0, 0.0, 0.0));
        let seg1 = Segment::new(Point3::new(0.0, 2.0, 0.0), Point3::new(1.0, 2.0, 0.0));
        assert_relative_eq!(segment_segment_sqr_dist(&seg0, &seg1), 4.0, epsilon = 1e-5);

        // Parallel but offset along the shared direction.
        let seg2 = Segment::new(Point3::new(3.0, 2.0, 0.0), Point3::new(4.0, 2.0, 0.0));
        assert_relative_eq!(segment_segment_sqr_dist(&seg0, &seg2), 8.0, epsilon = 1e-4);
    }

    #[test]
    fn test_segments_endpoint_to_endpoint() {
        let seg0 = Segment::new(Point3::origin(), Point3::new(1.0, 0.0, 0.0));
        let seg1 = Segment::new(Point3::new(2.0, 1.0, 0.0), Point3::new(3.0, 2.0, 0.0));
        assert_relative_eq!(segment_segment_sqr_dist(&seg0, &seg1), 2.0, epsilon = 1e-5);
    }

    #[test]
    fn test_segment_piercing_triangle() {
        let seg = Segment::new(Point3::new(0.25, 0.25, -1.0), Point3::new(0.25, 0.25, 1.0));
        assert_relative_eq!(
            segment_triangle_sqr_dist(&seg, &unit_tri()),
            0.0,
            epsilon = 1e-5
        );
    }

    #[test]
    fn test_segment_above_triangle() {
        let seg = Segment::new(Point3::new(0.1, 0.1, 2.0), Point3::new(0.4, 0.3, 3.0));
        assert_relative_eq!(
            segment_triangle_sqr_dist(&seg, &unit_tri()),
            4.0,
            epsilon = 1e-4
        );
    }

    #[test]
    fn test_segment_parallel_to_triangle() {
        let seg = Segment::new(Point3::new(-1.0, 0.5, 1.0), Point3::new(2.0, 0.5, 1.0));
        assert_relative_eq!(
            segment_triangle_sqr_dist(&seg, &unit_tri()),
            1.0,
            epsilon = 1e-4
        );
    }

    #[test]
    fn test_segment_past_far_corner() {
        let seg = Segment::new(Point3::new(3.0, 0.0, 0.0), Point3::new(3.0, 0.0, 2.0));
        // Nearest feature is the vertex at (1, 0, 0).
        assert_relative_eq!(
            segment_triangle_sqr_dist(&seg, &unit_tri()),
            4.0,
            epsilon = 1e-4
        );
    }
}
