//! Geometric primitives and mesh interfaces for BVH collision detection.
//!
//! This crate provides the pure data types shared by the collision pipeline:
//! axis-aligned bounding boxes (float and 16-bit quantized), planes,
//! triangles, segments, and the [`MeshInterface`] trait that collision
//! queries use to pull triangle data from application meshes.
//!
//! # Layer 0 Crate
//!
//! This is a Layer 0 crate with **zero engine dependencies**. It can be used
//! in headless tools, asset pipelines, and other engines.
//!
//! # Quick Start
//!
//! ```
//! use collide_types::{Aabb, TriMesh, MeshInterface};
//! use nalgebra::{Point3, Vector3};
//!
//! let mesh = TriMesh::new(
//!     vec![
//!         Point3::new(0.0, 0.0, 0.0),
//!         Point3::new(1.0, 0.0, 0.0),
//!         Point3::new(0.0, 1.0, 0.0),
//!     ],
//!     vec![[0, 1, 2]],
//! );
//!
//! let tri = mesh.triangle(0);
//! let aabb = tri.aabb();
//! assert!(aabb.extents.x > 0.0);
//! ```

#![doc(html_root_url = "https://docs.rs/collide-types/0.1.0")]
#![deny(clippy::unwrap_used, clippy::expect_used)]
#![warn(missing_docs)]
#![allow(
    clippy::missing_const_for_fn,     // Many methods can't be const due to nalgebra
    clippy::suboptimal_flops,          // mul_add style changes aren't always clearer
)]

mod aabb;
mod mesh;
mod plane;
mod triangle;

pub use aabb::{Aabb, QuantizedAabb};
pub use mesh::{MeshInterface, TriMesh};
pub use plane::Plane;
pub use triangle::{Segment, Triangle};
