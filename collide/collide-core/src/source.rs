//! Input interface for externally built AABB trees.
//!
//! Tree construction strategy (split axis, ordering, balancing) is the
//! application's business; this crate only flattens the result. A source
//! tree must be *complete*: every leaf holds exactly one primitive, so a
//! tree over T primitives has exactly `2T - 1` nodes.

use collide_types::Aabb;

/// What a source node contains: a primitive or two children.
#[derive(Debug, Clone, Copy)]
pub enum SourceContent<'a, N> {
    /// Leaf node holding one primitive index.
    Leaf(u32),
    /// Internal node with its positive and negative children.
    Branch {
        /// Positive child.
        pos: &'a N,
        /// Negative child.
        neg: &'a N,
    },
}

/// A node of an externally built AABB tree.
pub trait SourceNode: Sized {
    /// Bounding box of this node.
    fn aabb(&self) -> Aabb;

    /// Leaf primitive or children.
    fn content(&self) -> SourceContent<'_, Self>;
}

/// An externally built AABB tree, ready to be flattened.
pub trait SourceTree {
    /// Node type of this tree.
    type Node: SourceNode;

    /// Root node.
    fn root(&self) -> &Self::Node;

    /// Total number of nodes, internal and leaf.
    fn node_count(&self) -> usize;

    /// Number of primitives covered by the tree.
    fn primitive_count(&self) -> usize;
}

impl<T: SourceTree + ?Sized> SourceTree for &T {
    type Node = T::Node;

    fn root(&self) -> &Self::Node {
        (**self).root()
    }

    fn node_count(&self) -> usize {
        (**self).node_count()
    }

    fn primitive_count(&self) -> usize {
        (**self).primitive_count()
    }
}
