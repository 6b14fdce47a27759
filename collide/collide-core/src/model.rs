//! Per-mesh collision model: one optimized tree plus build settings.

use crate::error::{BuildError, RefitError};
use crate::source::SourceTree;
use crate::tree::{CollisionTree, NoLeafTree, QuantizedNoLeafTree, QuantizedTree};
use collide_types::MeshInterface;
use tracing::debug;

/// Which optimized layout a model uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TreeLayout {
    /// Leaf-capable, float boxes.
    Collision,
    /// No-leaf, float boxes. The only refittable layout.
    NoLeaf,
    /// Leaf-capable, 16-bit boxes.
    Quantized,
    /// No-leaf, 16-bit boxes.
    QuantizedNoLeaf,
}

impl TreeLayout {
    /// True for the two 16-bit layouts.
    #[must_use]
    pub fn is_quantized(self) -> bool {
        matches!(self, Self::Quantized | Self::QuantizedNoLeaf)
    }

    /// True for the two layouts that store leaves as nodes.
    #[must_use]
    pub fn has_leaf_nodes(self) -> bool {
        matches!(self, Self::Collision | Self::Quantized)
    }
}

/// Settings for [`Model::build`].
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BuildSettings {
    /// Layout to build.
    pub layout: TreeLayout,
    /// Grow quantized extents until dequantized boxes contain their float
    /// originals. Costs one bit of extents precision; without it, queries
    /// against quantized trees can miss borderline contacts.
    pub fix_quantized: bool,
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self {
            layout: TreeLayout::QuantizedNoLeaf,
            fix_quantized: true,
        }
    }
}

/// The tree variant held by a model.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ModelTree {
    /// Leaf-capable, float boxes.
    Collision(CollisionTree),
    /// No-leaf, float boxes.
    NoLeaf(NoLeafTree),
    /// Leaf-capable, 16-bit boxes.
    Quantized(QuantizedTree),
    /// No-leaf, 16-bit boxes.
    QuantizedNoLeaf(QuantizedNoLeafTree),
}

/// A built collision model for one mesh.
///
/// One-triangle meshes get no tree at all: every collider that supports them
/// tests the single triangle directly ([`Model::is_single_node`]).
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Model {
    tree: Option<ModelTree>,
    layout: TreeLayout,
    triangle_count: usize,
}

impl Model {
    /// Build a model from a complete source tree.
    pub fn build(source: &impl SourceTree, settings: BuildSettings) -> Result<Self, BuildError> {
        let triangle_count = source.primitive_count();
        if triangle_count == 0 {
            return Err(BuildError::EmptyTree);
        }

        if triangle_count == 1 {
            debug!(layout = ?settings.layout, "building single-node model");
            return Ok(Self {
                tree: None,
                layout: settings.layout,
                triangle_count,
            });
        }

        let tree = match settings.layout {
            TreeLayout::Collision => ModelTree::Collision(CollisionTree::build(source)?),
            TreeLayout::NoLeaf => ModelTree::NoLeaf(NoLeafTree::build(source)?),
            TreeLayout::Quantized => {
                ModelTree::Quantized(QuantizedTree::build(source, settings.fix_quantized)?)
            }
            TreeLayout::QuantizedNoLeaf => ModelTree::QuantizedNoLeaf(QuantizedNoLeafTree::build(
                source,
                settings.fix_quantized,
            )?),
        };
        debug!(
            layout = ?settings.layout,
            triangles = triangle_count,
            nodes = tree_node_count(&tree),
            "built collision model"
        );

        Ok(Self {
            tree: Some(tree),
            layout: settings.layout,
            triangle_count,
        })
    }

    /// The layout this model was built with.
    #[must_use]
    pub fn layout(&self) -> TreeLayout {
        self.layout
    }

    /// True for the two 16-bit layouts.
    #[must_use]
    pub fn is_quantized(&self) -> bool {
        self.layout.is_quantized()
    }

    /// True for the two layouts that store leaves as nodes.
    #[must_use]
    pub fn has_leaf_nodes(&self) -> bool {
        self.layout.has_leaf_nodes()
    }

    /// True when the model holds a single triangle and no tree.
    #[must_use]
    pub fn is_single_node(&self) -> bool {
        self.tree.is_none()
    }

    /// Number of triangles covered by the model.
    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.triangle_count
    }

    /// The optimized tree, absent for single-node models.
    #[must_use]
    pub fn tree(&self) -> Option<&ModelTree> {
        self.tree.as_ref()
    }

    /// Number of nodes in the tree (0 for single-node models).
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.tree.as_ref().map_or(0, tree_node_count)
    }

    /// Memory used by the node arrays.
    #[must_use]
    pub fn used_bytes(&self) -> usize {
        match &self.tree {
            None => 0,
            Some(ModelTree::Collision(t)) => t.used_bytes(),
            Some(ModelTree::NoLeaf(t)) => t.used_bytes(),
            Some(ModelTree::Quantized(t)) => t.used_bytes(),
            Some(ModelTree::QuantizedNoLeaf(t)) => t.used_bytes(),
        }
    }

    /// Recompute boxes after mesh vertices moved.
    ///
    /// Supported by the plain no-leaf layout only.
    pub fn refit(&mut self, mesh: &impl MeshInterface) -> Result<(), RefitError> {
        match &mut self.tree {
            Some(ModelTree::NoLeaf(tree)) => {
                tree.refit(mesh);
                debug!(triangles = self.triangle_count, "refit collision model");
                Ok(())
            }
            None if self.layout == TreeLayout::NoLeaf => Ok(()),
            _ => Err(RefitError::UnsupportedLayout(self.layout)),
        }
    }
}

fn tree_node_count(tree: &ModelTree) -> usize {
    match tree {
        ModelTree::Collision(t) => t.node_count(),
        ModelTree::NoLeaf(t) => t.node_count(),
        ModelTree::Quantized(t) => t.node_count(),
        ModelTree::QuantizedNoLeaf(t) => t.node_count(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::tree::tests::IndexTree;

    #[test]
    fn test_build_all_layouts() {
        let source = IndexTree::new(8);
        for layout in [
            TreeLayout::Collision,
            TreeLayout::NoLeaf,
            TreeLayout::Quantized,
            TreeLayout::QuantizedNoLeaf,
        ] {
            let model = Model::build(
                &source,
                BuildSettings {
                    layout,
                    fix_quantized: true,
                },
            )
            .unwrap();
            assert_eq!(model.layout(), layout);
            assert!(!model.is_single_node());
            let expected = if layout.has_leaf_nodes() { 15 } else { 7 };
            assert_eq!(model.node_count(), expected);
            assert!(model.used_bytes() > 0);
        }
    }

    #[test]
    fn test_single_triangle_model() {
        let source = IndexTree::new(1);
        let model = Model::build(&source, BuildSettings::default()).unwrap();
        assert!(model.is_single_node());
        assert_eq!(model.triangle_count(), 1);
        assert_eq!(model.node_count(), 0);
    }

    #[test]
    fn test_refit_dispatch() {
        use collide_types::TriMesh;
        use nalgebra::Point3;

        let mesh = TriMesh::new(
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
            ],
            vec![[0, 1, 2], [0, 2, 1]],
        );
        let source = IndexTree::new(2);

        let mut no_leaf = Model::build(
            &source,
            BuildSettings {
                layout: TreeLayout::NoLeaf,
                fix_quantized: true,
            },
        )
        .unwrap();
        assert!(no_leaf.refit(&mesh).is_ok());

        let mut quantized = Model::build(&source, BuildSettings::default()).unwrap();
        assert_eq!(
            quantized.refit(&mesh).unwrap_err(),
            RefitError::UnsupportedLayout(TreeLayout::QuantizedNoLeaf)
        );
    }
}
