//! Optimized BVH trees and colliders for triangle-mesh collision detection.
//!
//! This crate turns a generic, externally built AABB tree into one of four
//! compact linear layouts and runs collision queries against them. It builds
//! on [`collide_types`] for the geometric data structures.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Generic AABB tree                       │
//! │  Built by the application (any splitting strategy), exposed  │
//! │  through the SourceTree / SourceNode traits                  │
//! └─────────────────────────┬───────────────────────────────────┘
//!                           │ Model::build
//!                           ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Optimized layouts                        │
//! │  CollisionTree │ NoLeafTree │ Quantized │ QuantizedNoLeaf   │
//! │  (flat arrays, pre-order numbering, 16-bit boxes)           │
//! └─────────────────────────┬───────────────────────────────────┘
//!                           │
//!                ┌──────────┴──────────┐
//!                ▼                     ▼
//! ┌──────────────────────┐  ┌──────────────────────────────────┐
//! │    PlanesCollider    │  │          TreeCollider            │
//! │  frustum clip masks, │  │  dual recursion, leaf caching,   │
//! │  temporal coherence  │  │  hull pre-filter, coherence      │
//! └──────────────────────┘  └──────────────────────────────────┘
//! ```
//!
//! # Layouts
//!
//! | Layout | Nodes for T triangles | Box storage | Refittable |
//! |--------|----------------------|-------------|------------|
//! | [`CollisionTree`] | 2T-1 | f32 | no |
//! | [`NoLeafTree`] | T-1 | f32 | yes |
//! | [`QuantizedTree`] | 2T-1 | 16-bit | no |
//! | [`QuantizedNoLeafTree`] | T-1 | 16-bit | no |
//!
//! Quantized boxes are conservative: each dequantized box contains the float
//! box it was quantized from, so quantized queries may report extra candidate
//! pairs but never miss one.
//!
//! # Quick Start
//!
//! ```ignore
//! use collide_core::{Model, BuildSettings, TreeCollider, PairCache};
//! use collide_types::TriMesh;
//! use nalgebra::Isometry3;
//!
//! let model0 = Model::build(&source0, BuildSettings::default())?;
//! let model1 = Model::build(&source1, BuildSettings::default())?;
//!
//! let mut collider = TreeCollider::new(my_tri_tri_predicate);
//! let mut cache = PairCache::new();
//! let report = collider.collide(
//!     &mut cache,
//!     &model0, &mesh0, &Isometry3::identity(),
//!     &model1, &mesh1, &Isometry3::translation(0.0, 0.0, 0.5),
//! )?;
//! assert!(report.contact);
//! ```
//!
//! The exact triangle-triangle predicate is supplied by the caller through
//! the [`TriangleOverlap`] trait; the crate prunes with boxes and hands over
//! only the candidate pairs that survive.

#![doc(html_root_url = "https://docs.rs/collide-core/0.1.0")]
#![deny(clippy::unwrap_used, clippy::expect_used)]
#![warn(missing_docs)]
#![allow(
    clippy::missing_const_for_fn,     // Many methods can't be const due to nalgebra
    clippy::suboptimal_flops,          // mul_add style changes aren't always clearer
    clippy::cast_possible_truncation,  // quantization narrows to 16 bits deliberately
    clippy::cast_sign_loss,            // extents are non-negative before narrowing
    clippy::cast_precision_loss,
)]

pub mod distance;
mod error;
mod model;
pub mod overlap;
mod pairwise;
mod planes;
mod source;
mod tree;

pub use error::{BuildError, QueryError, RefitError};
pub use model::{BuildSettings, Model, ModelTree, TreeLayout};
pub use pairwise::{
    ContactMode, ContactPair, HullSeparation, PairCache, PairReport, SupportMap, TreeCollider,
    TreeColliderSettings, TreeColliderStats, TriangleOverlap,
};
pub use planes::{PlanesCache, PlanesCollider, PlanesColliderSettings};
pub use source::{SourceContent, SourceNode, SourceTree};
pub use tree::{
    CollisionNode, CollisionTree, NoLeafNode, NoLeafTree, NodeData, NodeRef, QuantizedNoLeafNode,
    QuantizedNoLeafTree, QuantizedNode, QuantizedTree,
};
pub use collide_types::{Aabb, MeshInterface, Plane, QuantizedAabb, Segment, TriMesh, Triangle};
