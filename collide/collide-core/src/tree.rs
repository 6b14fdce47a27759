//! Optimized linear tree layouts.
//!
//! Four layouts of the same source tree, trading memory for traversal work:
//!
//! - [`CollisionTree`]: leaf-capable, `2T - 1` nodes, float boxes.
//! - [`NoLeafTree`]: internal nodes only, `T - 1` nodes, float boxes. The
//!   only refittable layout.
//! - [`QuantizedTree`] / [`QuantizedNoLeafTree`]: same shapes with boxes
//!   quantized to 16 bits per component.
//!
//! Nodes are numbered in pre-order with sibling pairs adjacent: the root is
//! index 0 and an internal node allocates both child slots before recursing
//! into either. Building the same source twice yields identical arrays.

use crate::error::BuildError;
use crate::source::{SourceContent, SourceNode, SourceTree};
use collide_types::{Aabb, MeshInterface, QuantizedAabb};
use nalgebra::Vector3;

/// Payload of a leaf-capable node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum NodeData {
    /// Leaf holding one primitive index.
    Leaf(u32),
    /// Internal node with explicit child indices.
    Branch {
        /// Index of the positive child.
        pos: u32,
        /// Index of the negative child.
        neg: u32,
    },
}

/// A child slot of a no-leaf node: either a primitive or another node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum NodeRef {
    /// Primitive index.
    Leaf(u32),
    /// Node index.
    Node(u32),
}

/// Node of a leaf-capable tree.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CollisionNode {
    /// Bounding box of the subtree.
    pub aabb: Aabb,
    /// Leaf primitive or child indices.
    pub data: NodeData,
}

/// Node of a no-leaf tree. Both children are stored inline, so leaves need
/// no node of their own.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NoLeafNode {
    /// Bounding box of the subtree.
    pub aabb: Aabb,
    /// Positive child.
    pub pos: NodeRef,
    /// Negative child.
    pub neg: NodeRef,
}

/// Node of a quantized leaf-capable tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct QuantizedNode {
    /// Quantized bounding box.
    pub aabb: QuantizedAabb,
    /// Leaf primitive or child indices.
    pub data: NodeData,
}

/// Node of a quantized no-leaf tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct QuantizedNoLeafNode {
    /// Quantized bounding box.
    pub aabb: QuantizedAabb,
    /// Positive child.
    pub pos: NodeRef,
    /// Negative child.
    pub neg: NodeRef,
}

fn check_complete(tree: &impl SourceTree) -> Result<(usize, usize), BuildError> {
    let primitives = tree.primitive_count();
    if primitives == 0 {
        return Err(BuildError::EmptyTree);
    }
    let nodes = tree.node_count();
    if nodes != 2 * primitives - 1 {
        return Err(BuildError::IncompleteTree { nodes, primitives });
    }
    Ok((primitives, nodes))
}

fn flatten_collision<N: SourceNode>(
    nodes: &mut [CollisionNode],
    box_id: u32,
    current_id: &mut u32,
    node: &N,
) {
    nodes[box_id as usize].aabb = node.aabb();
    match node.content() {
        SourceContent::Leaf(primitive) => {
            nodes[box_id as usize].data = NodeData::Leaf(primitive);
        }
        SourceContent::Branch { pos, neg } => {
            // Reserve both sibling slots before recursing so the numbering
            // stays stable regardless of subtree shapes.
            let pos_id = *current_id;
            let neg_id = *current_id + 1;
            *current_id += 2;
            nodes[box_id as usize].data = NodeData::Branch {
                pos: pos_id,
                neg: neg_id,
            };
            flatten_collision(nodes, pos_id, current_id, pos);
            flatten_collision(nodes, neg_id, current_id, neg);
        }
    }
}

fn flatten_no_leaf<N: SourceNode>(
    nodes: &mut [NoLeafNode],
    box_id: u32,
    current_id: &mut u32,
    node: &N,
) {
    let SourceContent::Branch { pos, neg } = node.content() else {
        // Complete trees with two or more primitives have a branch root,
        // checked before flattening starts.
        return;
    };
    nodes[box_id as usize].aabb = node.aabb();

    match pos.content() {
        SourceContent::Leaf(primitive) => {
            nodes[box_id as usize].pos = NodeRef::Leaf(primitive);
        }
        SourceContent::Branch { .. } => {
            let pos_id = *current_id;
            *current_id += 1;
            nodes[box_id as usize].pos = NodeRef::Node(pos_id);
            flatten_no_leaf(nodes, pos_id, current_id, pos);
        }
    }

    match neg.content() {
        SourceContent::Leaf(primitive) => {
            nodes[box_id as usize].neg = NodeRef::Leaf(primitive);
        }
        SourceContent::Branch { .. } => {
            let neg_id = *current_id;
            *current_id += 1;
            nodes[box_id as usize].neg = NodeRef::Node(neg_id);
            flatten_no_leaf(nodes, neg_id, current_id, neg);
        }
    }
}

fn build_collision_nodes(tree: &impl SourceTree) -> Result<Vec<CollisionNode>, BuildError> {
    let (_, node_count) = check_complete(tree)?;
    let mut nodes = vec![
        CollisionNode {
            aabb: Aabb::new(nalgebra::Point3::origin(), Vector3::zeros()),
            data: NodeData::Leaf(0),
        };
        node_count
    ];
    let mut current_id = 1;
    flatten_collision(&mut nodes, 0, &mut current_id, tree.root());
    debug_assert_eq!(current_id as usize, node_count);
    Ok(nodes)
}

fn build_no_leaf_nodes(tree: &impl SourceTree) -> Result<Vec<NoLeafNode>, BuildError> {
    let (primitives, _) = check_complete(tree)?;
    if primitives < 2 {
        return Err(BuildError::SinglePrimitive);
    }
    let mut nodes = vec![
        NoLeafNode {
            aabb: Aabb::new(nalgebra::Point3::origin(), Vector3::zeros()),
            pos: NodeRef::Leaf(0),
            neg: NodeRef::Leaf(0),
        };
        primitives - 1
    ];
    let mut current_id = 1;
    flatten_no_leaf(&mut nodes, 0, &mut current_id, tree.root());
    debug_assert_eq!(current_id as usize, primitives - 1);
    Ok(nodes)
}

/// Per-axis quantization coefficients, frozen at build time.
#[derive(Debug, Clone, Copy)]
struct Quantizer {
    center_quant: Vector3<f32>,
    extents_quant: Vector3<f32>,
    center_dequant: Vector3<f32>,
    extents_dequant: Vector3<f32>,
    fix: bool,
}

impl Quantizer {
    /// Fit coefficients to the extremal |center| and |extents| over all
    /// boxes. The first node's box would only give the extremal extents;
    /// its center is not the extremal one.
    fn fit<'a>(boxes: impl Iterator<Item = &'a Aabb>, fix: bool) -> Self {
        let mut center_max = Vector3::<f32>::zeros();
        let mut extents_max = Vector3::<f32>::zeros();
        for b in boxes {
            for axis in 0..3 {
                center_max[axis] = center_max[axis].max(b.center[axis].abs());
                extents_max[axis] = extents_max[axis].max(b.extents[axis].abs());
            }
        }

        let center_bits = 15u32; // one bit reserved for the sign
        let extents_bits = if fix { 15 } else { 16 }; // one bit of headroom for fixing

        let coeff = |max: f32, bits: u32| {
            if max == 0.0 {
                0.0
            } else {
                ((1u64 << bits) - 1) as f32 / max
            }
        };
        let inverse = |q: f32| if q == 0.0 { 0.0 } else { 1.0 / q };

        let center_quant = center_max.map(|m| coeff(m, center_bits));
        let extents_quant = extents_max.map(|m| coeff(m, extents_bits));
        Self {
            center_quant,
            extents_quant,
            center_dequant: center_quant.map(inverse),
            extents_dequant: extents_quant.map(inverse),
            fix,
        }
    }

    /// Quantize one box, growing extents until the dequantized box contains
    /// the original when fixing is enabled.
    fn quantize(&self, aabb: &Aabb) -> QuantizedAabb {
        let mut center = [0i16; 3];
        let mut extents = [0u16; 3];
        for axis in 0..3 {
            center[axis] = (aabb.center[axis] * self.center_quant[axis]) as i16;
            extents[axis] = (aabb.extents[axis] * self.extents_quant[axis]) as u16;
        }

        if self.fix {
            for axis in 0..3 {
                let max = aabb.center[axis] + aabb.extents[axis];
                let min = aabb.center[axis] - aabb.extents[axis];
                let qc = f32::from(center[axis]) * self.center_dequant[axis];
                loop {
                    let qe = f32::from(extents[axis]) * self.extents_dequant[axis];
                    if qc + qe >= max && qc - qe <= min {
                        break;
                    }
                    let (bumped, wrapped) = extents[axis].overflowing_add(1);
                    if wrapped {
                        extents[axis] = u16::MAX;
                        break;
                    }
                    extents[axis] = bumped;
                }
            }
        }

        QuantizedAabb { center, extents }
    }
}

/// Leaf-capable tree with float boxes: `2T - 1` nodes.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CollisionTree {
    nodes: Vec<CollisionNode>,
}

impl CollisionTree {
    /// Flatten a complete source tree into this layout.
    pub fn build(tree: &impl SourceTree) -> Result<Self, BuildError> {
        let nodes = build_collision_nodes(tree)?;
        Ok(Self { nodes })
    }

    /// The node array; index 0 is the root.
    #[must_use]
    pub fn nodes(&self) -> &[CollisionNode] {
        &self.nodes
    }

    /// Number of nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Memory used by the node array.
    #[must_use]
    pub fn used_bytes(&self) -> usize {
        self.nodes.len() * std::mem::size_of::<CollisionNode>()
    }
}

/// No-leaf tree with float boxes: `T - 1` nodes, refittable.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NoLeafTree {
    nodes: Vec<NoLeafNode>,
}

impl NoLeafTree {
    /// Flatten a complete source tree into this layout.
    pub fn build(tree: &impl SourceTree) -> Result<Self, BuildError> {
        let nodes = build_no_leaf_nodes(tree)?;
        Ok(Self { nodes })
    }

    /// The node array; index 0 is the root.
    #[must_use]
    pub fn nodes(&self) -> &[NoLeafNode] {
        &self.nodes
    }

    /// Number of nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Memory used by the node array.
    #[must_use]
    pub fn used_bytes(&self) -> usize {
        self.nodes.len() * std::mem::size_of::<NoLeafNode>()
    }

    /// Recompute all boxes after the mesh vertices moved.
    ///
    /// Bottom-up in a single reverse pass: pre-order numbering guarantees
    /// children always have higher indices than their parent.
    pub fn refit(&mut self, mesh: &impl MeshInterface) {
        for index in (0..self.nodes.len()).rev() {
            let node = self.nodes[index];
            let pos_box = match node.pos {
                NodeRef::Leaf(primitive) => mesh.triangle(primitive).aabb(),
                NodeRef::Node(child) => self.nodes[child as usize].aabb,
            };
            let neg_box = match node.neg {
                NodeRef::Leaf(primitive) => mesh.triangle(primitive).aabb(),
                NodeRef::Node(child) => self.nodes[child as usize].aabb,
            };
            self.nodes[index].aabb = pos_box.merged(&neg_box);
        }
    }
}

/// Leaf-capable tree with 16-bit boxes.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct QuantizedTree {
    nodes: Vec<QuantizedNode>,
    center_coeff: Vector3<f32>,
    extents_coeff: Vector3<f32>,
}

impl QuantizedTree {
    /// Flatten and quantize a complete source tree.
    ///
    /// With `fix` enabled, quantized extents are grown until every
    /// dequantized box contains its float original (at the cost of one bit
    /// of extents precision).
    pub fn build(tree: &impl SourceTree, fix: bool) -> Result<Self, BuildError> {
        let float_nodes = build_collision_nodes(tree)?;
        let quantizer = Quantizer::fit(float_nodes.iter().map(|n| &n.aabb), fix);
        // Child indices survive as-is; only the boxes change representation.
        let nodes = float_nodes
            .iter()
            .map(|n| QuantizedNode {
                aabb: quantizer.quantize(&n.aabb),
                data: n.data,
            })
            .collect();
        Ok(Self {
            nodes,
            center_coeff: quantizer.center_dequant,
            extents_coeff: quantizer.extents_dequant,
        })
    }

    /// The node array; index 0 is the root.
    #[must_use]
    pub fn nodes(&self) -> &[QuantizedNode] {
        &self.nodes
    }

    /// Per-axis center dequantization coefficients.
    #[must_use]
    pub fn center_coeff(&self) -> Vector3<f32> {
        self.center_coeff
    }

    /// Per-axis extents dequantization coefficients.
    #[must_use]
    pub fn extents_coeff(&self) -> Vector3<f32> {
        self.extents_coeff
    }

    /// Number of nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Memory used by the node array.
    #[must_use]
    pub fn used_bytes(&self) -> usize {
        self.nodes.len() * std::mem::size_of::<QuantizedNode>()
    }
}

/// No-leaf tree with 16-bit boxes.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct QuantizedNoLeafTree {
    nodes: Vec<QuantizedNoLeafNode>,
    center_coeff: Vector3<f32>,
    extents_coeff: Vector3<f32>,
}

impl QuantizedNoLeafTree {
    /// Flatten and quantize a complete source tree.
    pub fn build(tree: &impl SourceTree, fix: bool) -> Result<Self, BuildError> {
        let float_nodes = build_no_leaf_nodes(tree)?;
        let quantizer = Quantizer::fit(float_nodes.iter().map(|n| &n.aabb), fix);
        let nodes = float_nodes
            .iter()
            .map(|n| QuantizedNoLeafNode {
                aabb: quantizer.quantize(&n.aabb),
                pos: n.pos,
                neg: n.neg,
            })
            .collect();
        Ok(Self {
            nodes,
            center_coeff: quantizer.center_dequant,
            extents_coeff: quantizer.extents_dequant,
        })
    }

    /// The node array; index 0 is the root.
    #[must_use]
    pub fn nodes(&self) -> &[QuantizedNoLeafNode] {
        &self.nodes
    }

    /// Per-axis center dequantization coefficients.
    #[must_use]
    pub fn center_coeff(&self) -> Vector3<f32> {
        self.center_coeff
    }

    /// Per-axis extents dequantization coefficients.
    #[must_use]
    pub fn extents_coeff(&self) -> Vector3<f32> {
        self.extents_coeff
    }

    /// Number of nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Memory used by the node array.
    #[must_use]
    pub fn used_bytes(&self) -> usize {
        self.nodes.len() * std::mem::size_of::<QuantizedNoLeafNode>()
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::float_cmp,
    clippy::cast_precision_loss
)]
pub(crate) mod tests {
    use super::*;
    use collide_types::TriMesh;
    use nalgebra::Point3;

    /// Complete source tree over a mesh, one triangle per leaf, split by
    /// index.
    pub(crate) struct MeshSource {
        root: MeshNode,
        primitives: usize,
    }

    pub(crate) struct MeshNode {
        aabb: Aabb,
        children: Option<(Box<MeshNode>, Box<MeshNode>)>,
        primitive: u32,
    }

    impl MeshSource {
        pub(crate) fn new(mesh: &TriMesh) -> Self {
            fn build(mesh: &TriMesh, first: u32, count: u32) -> MeshNode {
                let mut aabb = mesh.triangle(first).aabb();
                for i in first + 1..first + count {
                    aabb = aabb.merged(&mesh.triangle(i).aabb());
                }
                if count == 1 {
                    MeshNode {
                        aabb,
                        children: None,
                        primitive: first,
                    }
                } else {
                    let half = count / 2;
                    MeshNode {
                        aabb,
                        children: Some((
                            Box::new(build(mesh, first, half)),
                            Box::new(build(mesh, first + half, count - half)),
                        )),
                        primitive: 0,
                    }
                }
            }
            let primitives = mesh.indices().len();
            Self {
                root: build(mesh, 0, primitives as u32),
                primitives,
            }
        }
    }

    impl SourceNode for MeshNode {
        fn aabb(&self) -> Aabb {
            self.aabb
        }

        fn content(&self) -> SourceContent<'_, Self> {
            match &self.children {
                None => SourceContent::Leaf(self.primitive),
                Some((pos, neg)) => SourceContent::Branch { pos, neg },
            }
        }
    }

    impl SourceTree for MeshSource {
        type Node = MeshNode;

        fn root(&self) -> &MeshNode {
            &self.root
        }

        fn node_count(&self) -> usize {
            2 * self.primitives - 1
        }

        fn primitive_count(&self) -> usize {
            self.primitives
        }
    }

    /// Minimal complete source tree over n primitives, split by index.
    pub(crate) struct IndexNode {
        aabb: Aabb,
        child: Option<(Box<IndexNode>, Box<IndexNode>)>,
        primitive: u32,
    }

    impl IndexNode {
        fn build(first: u32, count: u32) -> Self {
            let centers: Vec<_> = (first..first + count)
                .map(|i| Point3::new(i as f32, 0.0, (i % 3) as f32))
                .collect();
            let mut aabb = Aabb::new(centers[0], Vector3::new(0.5, 0.5, 0.5));
            for c in &centers[1..] {
                aabb = aabb.merged(&Aabb::new(*c, Vector3::new(0.5, 0.5, 0.5)));
            }
            if count == 1 {
                Self {
                    aabb,
                    child: None,
                    primitive: first,
                }
            } else {
                let half = count / 2;
                Self {
                    aabb,
                    child: Some((
                        Box::new(Self::build(first, half)),
                        Box::new(Self::build(first + half, count - half)),
                    )),
                    primitive: 0,
                }
            }
        }
    }

    impl SourceNode for IndexNode {
        fn aabb(&self) -> Aabb {
            self.aabb
        }

        fn content(&self) -> SourceContent<'_, Self> {
            match &self.child {
                None => SourceContent::Leaf(self.primitive),
                Some((pos, neg)) => SourceContent::Branch { pos, neg },
            }
        }
    }

    pub(crate) struct IndexTree {
        root: IndexNode,
        primitives: usize,
        nodes: usize,
    }

    impl IndexTree {
        pub(crate) fn new(primitives: usize) -> Self {
            Self {
                root: IndexNode::build(0, primitives as u32),
                primitives,
                nodes: 2 * primitives - 1,
            }
        }

        fn truncated(primitives: usize, reported_nodes: usize) -> Self {
            Self {
                root: IndexNode::build(0, primitives as u32),
                primitives,
                nodes: reported_nodes,
            }
        }
    }

    impl SourceTree for IndexTree {
        type Node = IndexNode;

        fn root(&self) -> &IndexNode {
            &self.root
        }

        fn node_count(&self) -> usize {
            self.nodes
        }

        fn primitive_count(&self) -> usize {
            self.primitives
        }
    }

    #[test]
    fn test_collision_tree_counts() {
        let tree = CollisionTree::build(&IndexTree::new(7)).unwrap();
        assert_eq!(tree.node_count(), 13);
    }

    #[test]
    fn test_no_leaf_tree_counts() {
        let tree = NoLeafTree::build(&IndexTree::new(7)).unwrap();
        assert_eq!(tree.node_count(), 6);
    }

    #[test]
    fn test_incomplete_tree_rejected() {
        let err = CollisionTree::build(&IndexTree::truncated(7, 11)).unwrap_err();
        assert_eq!(
            err,
            BuildError::IncompleteTree {
                nodes: 11,
                primitives: 7
            }
        );
    }

    #[test]
    fn test_single_primitive_no_leaf_rejected() {
        let err = NoLeafTree::build(&IndexTree::new(1)).unwrap_err();
        assert_eq!(err, BuildError::SinglePrimitive);
    }

    #[test]
    fn test_sibling_numbering() {
        let tree = CollisionTree::build(&IndexTree::new(4)).unwrap();
        // Root children occupy slots 1 and 2; siblings stay adjacent.
        match tree.nodes()[0].data {
            NodeData::Branch { pos, neg } => {
                assert_eq!(pos, 1);
                assert_eq!(neg, pos + 1);
            }
            NodeData::Leaf(_) => panic!("root of a 4-primitive tree is internal"),
        }
    }

    #[test]
    fn test_build_deterministic() {
        let source = IndexTree::new(16);
        let a = CollisionTree::build(&source).unwrap();
        let b = CollisionTree::build(&source).unwrap();
        assert_eq!(a.nodes(), b.nodes());

        let qa = QuantizedTree::build(&source, true).unwrap();
        let qb = QuantizedTree::build(&source, true).unwrap();
        assert_eq!(qa.nodes(), qb.nodes());
        assert_eq!(qa.center_coeff(), qb.center_coeff());
    }

    #[test]
    fn test_all_leaves_present() {
        let tree = CollisionTree::build(&IndexTree::new(9)).unwrap();
        let mut seen = vec![false; 9];
        for node in tree.nodes() {
            if let NodeData::Leaf(p) = node.data {
                seen[p as usize] = true;
            }
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn test_quantized_boxes_conservative() {
        use rand::Rng;
        let mut rng = rand::rng();
        for _ in 0..20 {
            let count = rng.random_range(2..40);
            let source = IndexTree::new(count);
            let float_tree = CollisionTree::build(&source).unwrap();
            let quantized = QuantizedTree::build(&source, true).unwrap();

            let cc = quantized.center_coeff();
            let ec = quantized.extents_coeff();
            for (f, q) in float_tree.nodes().iter().zip(quantized.nodes()) {
                let deq = Aabb::new(
                    q.aabb.dequantize_center(&cc),
                    q.aabb.dequantize_extents(&ec),
                );
                assert!(
                    deq.contains(&f.aabb),
                    "dequantized box must contain the float box"
                );
                assert_eq!(f.data, q.data);
            }
        }
    }

    #[test]
    fn test_dequantization_error_bound() {
        let source = IndexTree::new(25);
        let float_tree = CollisionTree::build(&source).unwrap();
        let quantized = QuantizedTree::build(&source, false).unwrap();

        let cc = quantized.center_coeff();
        for (f, q) in float_tree.nodes().iter().zip(quantized.nodes()) {
            let deq = q.aabb.dequantize_center(&cc);
            for axis in 0..3 {
                // One quantization step per axis without fixing.
                assert!((deq[axis] - f.aabb.center[axis]).abs() <= cc[axis] + 1e-6);
            }
        }
    }

    #[test]
    fn test_quantization_coeffs_from_extremal_boxes() {
        // Leaf centers sit at x = 0..4, so the extremal |center.x| over all
        // nodes is 4.0 and the 15-bit dequantization step follows from it.
        let source = IndexTree::new(5);
        let quantized = QuantizedTree::build(&source, true).unwrap();
        let step = 4.0 / f32::from(i16::MAX);
        assert!((quantized.center_coeff().x - step).abs() < 1e-9);
    }

    #[test]
    fn test_flat_axis_quantizes_to_zero() {
        // All boxes share y = 0 centers with nonzero extents, so the center
        // coefficient on y is zero and dequantizes back to exactly 0.
        let source = IndexTree::new(5);
        let quantized = QuantizedTree::build(&source, true).unwrap();
        assert_eq!(quantized.center_coeff().y, 0.0);
        for node in quantized.nodes() {
            assert_eq!(node.aabb.dequantize_center(&quantized.center_coeff()).y, 0.0);
        }
    }

    #[test]
    fn test_refit_after_deform() {
        use collide_types::TriMesh;

        let mut mesh = TriMesh::new(
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
                Point3::new(2.0, 0.0, 0.0),
                Point3::new(3.0, 0.0, 0.0),
                Point3::new(2.0, 1.0, 0.0),
            ],
            vec![[0, 1, 2], [3, 4, 5]],
        );

        // Two-primitive source: root with two leaves.
        struct TwoLeaves {
            root: IndexNode,
        }
        impl SourceTree for TwoLeaves {
            type Node = IndexNode;
            fn root(&self) -> &IndexNode {
                &self.root
            }
            fn node_count(&self) -> usize {
                3
            }
            fn primitive_count(&self) -> usize {
                2
            }
        }
        let source = TwoLeaves {
            root: IndexNode::build(0, 2),
        };

        let mut tree = NoLeafTree::build(&source).unwrap();
        tree.refit(&mesh);
        let before = tree.nodes()[0].aabb;
        assert!(before.max().x >= 3.0);

        // Stretch the second triangle and refit again.
        mesh.vertices_mut()[4].x = 10.0;
        tree.refit(&mesh);
        let after = tree.nodes()[0].aabb;
        assert!(after.max().x >= 10.0);
        assert!(after.contains(&mesh.triangle(0).aabb()));
        assert!(after.contains(&mesh.triangle(1).aabb()));
    }
}
