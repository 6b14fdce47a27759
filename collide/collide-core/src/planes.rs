//! Model-vs-planes queries.
//!
//! [`PlanesCollider`] clips a model's tree against up to 32 planes, the
//! frustum-culling way: each traversal carries a bit mask of planes the
//! current box still straddles. A plane whose test passes for the whole box
//! drops out of the mask, and a subtree whose mask empties is wholly inside
//! and gets dumped into the touched list without further plane tests.
//!
//! Planes use the convention of [`Plane`]: the normal points toward the
//! inside halfspace, and "contact" means at least one triangle is not
//! strictly outside every plane.

use crate::error::QueryError;
use crate::model::{Model, ModelTree};
use crate::overlap::{planes_aabb_overlap, planes_tri_overlap};
use crate::pairwise::ContactMode;
use crate::tree::{CollisionNode, NoLeafNode, NodeData, NodeRef, QuantizedNoLeafNode, QuantizedNode};
use collide_types::{MeshInterface, Plane};
use nalgebra::{Isometry3, Vector3};
use tracing::debug;

/// Settings for [`PlanesCollider`].
#[derive(Debug, Clone, Copy, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PlanesColliderSettings {
    /// First-contact or all-contacts behavior.
    pub mode: ContactMode,
    /// Retest the first touched primitive of the previous query before
    /// traversing. Only valid in first-contact mode.
    pub temporal_coherence: bool,
    /// Record leaf primitives without running the triangle test. For models
    /// whose leaves hold more than the tested triangle (the caller
    /// post-processes the touched list), or when box-level precision is
    /// enough.
    pub skip_primitive_tests: bool,
}

/// Persistent state for planes queries.
///
/// The touched-primitive list lives here rather than in the report so entry
/// 0 doubles as the temporal coherence record across queries.
#[derive(Debug, Clone, Default)]
pub struct PlanesCache {
    /// Primitives touched by the last query.
    pub touched: Vec<u32>,
}

impl PlanesCache {
    /// An empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// Collider for model-vs-planes queries.
#[derive(Debug, Default)]
pub struct PlanesCollider {
    settings: PlanesColliderSettings,
}

impl PlanesCollider {
    /// Create a collider with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a collider with explicit settings.
    #[must_use]
    pub fn with_settings(settings: PlanesColliderSettings) -> Self {
        Self { settings }
    }

    /// The current settings.
    #[must_use]
    pub fn settings(&self) -> PlanesColliderSettings {
        self.settings
    }

    /// Mutable access to the settings.
    pub fn settings_mut(&mut self) -> &mut PlanesColliderSettings {
        &mut self.settings
    }

    /// Clip a model placed at `world` against `planes`, given in world
    /// space.
    ///
    /// Returns whether any triangle touches the inside region; the touched
    /// primitives are collected in `cache.touched`.
    pub fn collide(
        &mut self,
        cache: &mut PlanesCache,
        planes: &[Plane],
        model: &Model,
        mesh: &impl MeshInterface,
        world: &Isometry3<f32>,
    ) -> Result<bool, QueryError> {
        if self.settings.temporal_coherence && self.settings.mode != ContactMode::FirstContact {
            return Err(QueryError::InvalidSettings(
                "temporal coherence requires first-contact mode",
            ));
        }
        if planes.len() > 32 {
            return Err(QueryError::TooManyPlanes {
                count: planes.len(),
            });
        }

        // Transforming the few planes beats transforming every box.
        let local: Vec<Plane> = planes.iter().map(|p| p.to_local_space(world)).collect();
        let clip_mask = if local.len() == 32 {
            u32::MAX
        } else {
            (1u32 << local.len()) - 1
        };

        if model.is_single_node() {
            cache.touched.clear();
            if self.settings.skip_primitive_tests
                || planes_tri_overlap(&mesh.triangle(0), &local, clip_mask)
            {
                cache.touched.push(0);
            }
            return Ok(!cache.touched.is_empty());
        }

        // Temporal coherence: retest the first touched primitive.
        if self.settings.temporal_coherence && !self.settings.skip_primitive_tests {
            if let Some(&prim) = cache.touched.first() {
                if (prim as usize) < model.triangle_count()
                    && planes_tri_overlap(&mesh.triangle(prim), &local, clip_mask)
                {
                    debug!(prim, "planes temporal coherence hit");
                    cache.touched.clear();
                    cache.touched.push(prim);
                    return Ok(true);
                }
            }
        }
        cache.touched.clear();

        let mut ctx = PlanesContext {
            planes: &local,
            mesh,
            mode: self.settings.mode,
            test_prims: !self.settings.skip_primitive_tests,
            center_coeff: Vector3::zeros(),
            extents_coeff: Vector3::zeros(),
            touched: &mut cache.touched,
            contact: false,
        };
        match model.tree() {
            Some(ModelTree::Collision(tree)) => {
                ctx.collide_collision(tree.nodes(), 0, clip_mask);
            }
            Some(ModelTree::NoLeaf(tree)) => {
                ctx.collide_no_leaf(tree.nodes(), 0, clip_mask);
            }
            Some(ModelTree::Quantized(tree)) => {
                ctx.center_coeff = tree.center_coeff();
                ctx.extents_coeff = tree.extents_coeff();
                ctx.collide_quantized(tree.nodes(), 0, clip_mask);
            }
            Some(ModelTree::QuantizedNoLeaf(tree)) => {
                ctx.center_coeff = tree.center_coeff();
                ctx.extents_coeff = tree.extents_coeff();
                ctx.collide_quantized_no_leaf(tree.nodes(), 0, clip_mask);
            }
            // Single-node models were handled above.
            None => {}
        }
        Ok(ctx.contact)
    }
}

struct PlanesContext<'a, M> {
    /// Planes in model space.
    planes: &'a [Plane],
    mesh: &'a M,
    mode: ContactMode,
    test_prims: bool,
    center_coeff: Vector3<f32>,
    extents_coeff: Vector3<f32>,
    touched: &'a mut Vec<u32>,
    contact: bool,
}

impl<M: MeshInterface> PlanesContext<'_, M> {
    fn contact_found(&self) -> bool {
        self.contact && self.mode == ContactMode::FirstContact
    }

    /// A leaf reached while some planes still clip: test (or just record)
    /// the primitive.
    fn prim(&mut self, primitive: u32, clip_mask: u32) {
        if !self.test_prims
            || planes_tri_overlap(&self.mesh.triangle(primitive), self.planes, clip_mask)
        {
            self.touched.push(primitive);
            self.contact = true;
        }
    }

    /// A subtree wholly inside every active plane: every primitive below
    /// touches, no more tests needed.
    fn dump(&mut self, primitive: u32) {
        self.touched.push(primitive);
        self.contact = true;
    }

    fn collide_collision(&mut self, nodes: &[CollisionNode], index: u32, clip_mask: u32) {
        let node = nodes[index as usize];
        let Some(out_mask) =
            planes_aabb_overlap(&node.aabb.center, &node.aabb.extents, self.planes, clip_mask)
        else {
            return;
        };
        if out_mask == 0 {
            self.dump_collision(nodes, index);
            return;
        }
        match node.data {
            NodeData::Leaf(p) => self.prim(p, clip_mask),
            NodeData::Branch { pos, neg } => {
                self.collide_collision(nodes, pos, out_mask);
                if self.contact_found() {
                    return;
                }
                self.collide_collision(nodes, neg, out_mask);
            }
        }
    }

    fn dump_collision(&mut self, nodes: &[CollisionNode], index: u32) {
        match nodes[index as usize].data {
            NodeData::Leaf(p) => self.dump(p),
            NodeData::Branch { pos, neg } => {
                self.dump_collision(nodes, pos);
                self.dump_collision(nodes, neg);
            }
        }
    }

    fn collide_no_leaf(&mut self, nodes: &[NoLeafNode], index: u32, clip_mask: u32) {
        let node = nodes[index as usize];
        let Some(out_mask) =
            planes_aabb_overlap(&node.aabb.center, &node.aabb.extents, self.planes, clip_mask)
        else {
            return;
        };
        if out_mask == 0 {
            self.dump_no_leaf(nodes, index);
            return;
        }
        match node.pos {
            NodeRef::Leaf(p) => self.prim(p, clip_mask),
            NodeRef::Node(n) => self.collide_no_leaf(nodes, n, out_mask),
        }
        if self.contact_found() {
            return;
        }
        match node.neg {
            NodeRef::Leaf(p) => self.prim(p, clip_mask),
            NodeRef::Node(n) => self.collide_no_leaf(nodes, n, out_mask),
        }
    }

    fn dump_no_leaf(&mut self, nodes: &[NoLeafNode], index: u32) {
        let node = nodes[index as usize];
        match node.pos {
            NodeRef::Leaf(p) => self.dump(p),
            NodeRef::Node(n) => self.dump_no_leaf(nodes, n),
        }
        match node.neg {
            NodeRef::Leaf(p) => self.dump(p),
            NodeRef::Node(n) => self.dump_no_leaf(nodes, n),
        }
    }

    fn collide_quantized(&mut self, nodes: &[QuantizedNode], index: u32, clip_mask: u32) {
        let node = nodes[index as usize];
        let center = node.aabb.dequantize_center(&self.center_coeff);
        let extents = node.aabb.dequantize_extents(&self.extents_coeff);
        let Some(out_mask) = planes_aabb_overlap(&center, &extents, self.planes, clip_mask)
        else {
            return;
        };
        if out_mask == 0 {
            self.dump_quantized(nodes, index);
            return;
        }
        match node.data {
            NodeData::Leaf(p) => self.prim(p, clip_mask),
            NodeData::Branch { pos, neg } => {
                self.collide_quantized(nodes, pos, out_mask);
                if self.contact_found() {
                    return;
                }
                self.collide_quantized(nodes, neg, out_mask);
            }
        }
    }

    fn dump_quantized(&mut self, nodes: &[QuantizedNode], index: u32) {
        match nodes[index as usize].data {
            NodeData::Leaf(p) => self.dump(p),
            NodeData::Branch { pos, neg } => {
                self.dump_quantized(nodes, pos);
                self.dump_quantized(nodes, neg);
            }
        }
    }

    fn collide_quantized_no_leaf(
        &mut self,
        nodes: &[QuantizedNoLeafNode],
        index: u32,
        clip_mask: u32,
    ) {
        let node = nodes[index as usize];
        let center = node.aabb.dequantize_center(&self.center_coeff);
        let extents = node.aabb.dequantize_extents(&self.extents_coeff);
        let Some(out_mask) = planes_aabb_overlap(&center, &extents, self.planes, clip_mask)
        else {
            return;
        };
        if out_mask == 0 {
            self.dump_quantized_no_leaf(nodes, index);
            return;
        }
        match node.pos {
            NodeRef::Leaf(p) => self.prim(p, clip_mask),
            NodeRef::Node(n) => self.collide_quantized_no_leaf(nodes, n, out_mask),
        }
        if self.contact_found() {
            return;
        }
        match node.neg {
            NodeRef::Leaf(p) => self.prim(p, clip_mask),
            NodeRef::Node(n) => self.collide_quantized_no_leaf(nodes, n, out_mask),
        }
    }

    fn dump_quantized_no_leaf(&mut self, nodes: &[QuantizedNoLeafNode], index: u32) {
        let node = nodes[index as usize];
        match node.pos {
            NodeRef::Leaf(p) => self.dump(p),
            NodeRef::Node(n) => self.dump_quantized_no_leaf(nodes, n),
        }
        match node.neg {
            NodeRef::Leaf(p) => self.dump(p),
            NodeRef::Node(n) => self.dump_quantized_no_leaf(nodes, n),
        }
    }
}
