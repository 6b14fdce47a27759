//! Error types for tree construction and collision queries.

use crate::model::TreeLayout;
use thiserror::Error;

/// Errors that can occur while building an optimized tree.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BuildError {
    /// The source tree is not complete: a complete binary tree over T
    /// primitives has exactly `2T - 1` nodes, one primitive per leaf.
    #[error("source tree is incomplete: {nodes} nodes for {primitives} primitives (expected {})", 2 * primitives - 1)]
    IncompleteTree {
        /// Node count reported by the source tree.
        nodes: usize,
        /// Primitive count reported by the source tree.
        primitives: usize,
    },

    /// The source tree covers no primitives.
    #[error("source tree covers no primitives")]
    EmptyTree,

    /// No-leaf layouts store only internal nodes and need at least two
    /// primitives; a one-triangle mesh is handled at the model level.
    #[error("no-leaf layouts need at least two primitives")]
    SinglePrimitive,
}

/// Errors that can occur while refitting a tree.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RefitError {
    /// Only the plain no-leaf layout supports refitting. Leaf-capable trees
    /// have twice as many nodes to update, and quantized trees would need
    /// their global quantization coefficients recomputed.
    #[error("layout {0:?} does not support refitting")]
    UnsupportedLayout(TreeLayout),
}

/// Errors that can occur when starting a collision query.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueryError {
    /// Pairwise queries require both models to use the same layout family
    /// (leaf-capable vs no-leaf, quantized vs plain).
    #[error("models use mismatched tree layouts")]
    MismatchedLayouts,

    /// Pairwise queries cannot traverse a model that has no tree (built from
    /// a single triangle).
    #[error("model has a single node and no tree to traverse")]
    SingleNodeModel,

    /// The collider settings are inconsistent.
    #[error("invalid settings: {0}")]
    InvalidSettings(&'static str),

    /// Planes queries address planes through a 32-bit clip mask.
    #[error("too many planes: {count} (the clip mask holds at most 32)")]
    TooManyPlanes {
        /// Number of planes passed to the query.
        count: usize,
    },
}
