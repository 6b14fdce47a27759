//! Tree-vs-tree collision queries.
//!
//! [`TreeCollider`] descends two optimized trees simultaneously, pruning
//! with OBB-OBB tests expressed in the relative transform between the two
//! models. Candidate triangle pairs that survive the descent are handed to
//! a caller-supplied [`TriangleOverlap`] predicate.
//!
//! Both models must use the same layout family: leaf-capable against
//! leaf-capable, quantized against quantized. No-leaf traversals cache the
//! current leaf triangle, already transformed into the opposite model's
//! frame, so it is fetched once per subtree instead of once per node pair.

use crate::error::QueryError;
use crate::model::{Model, ModelTree};
use crate::overlap::{box_box_overlap, tri_box_overlap};
use crate::tree::{CollisionNode, NoLeafNode, NodeData, NodeRef, QuantizedNoLeafNode, QuantizedNode};
use collide_types::{Aabb, MeshInterface, QuantizedAabb, Triangle};
use nalgebra::{Isometry3, Matrix3, Point3, Vector3};
use tracing::debug;

/// Number of no-contact queries after which the hull pre-filter re-arms.
const HULL_TEST_COUNTDOWN: u32 = 50;

/// Epsilon folded into the absolute rotation matrix so near-parallel edge
/// cross products never produce a spurious separating axis.
const ABS_ROT_EPSILON: f32 = 1e-6;

/// Caller-supplied exact triangle-triangle intersection predicate.
///
/// Both triangles are expressed in a common frame when the predicate runs;
/// implementations never need the model transforms. Any `Fn(&Triangle,
/// &Triangle) -> bool` closure works.
pub trait TriangleOverlap {
    /// True when the two triangles intersect.
    fn overlap(&self, t0: &Triangle, t1: &Triangle) -> bool;
}

impl<F: Fn(&Triangle, &Triangle) -> bool> TriangleOverlap for F {
    fn overlap(&self, t0: &Triangle, t1: &Triangle) -> bool {
        self(t0, t1)
    }
}

/// Separation oracle for the optional convex-hull pre-filter.
///
/// Implementations answer whether two precomputed convex hulls, placed at
/// the given world transforms, are disjoint. A GJK-style algorithm over two
/// [`SupportMap`] shapes is the usual implementation; the colliders only
/// consume the boolean.
pub trait HullSeparation {
    /// True when the hulls at these placements do not intersect.
    fn separated(&self, world0: &Isometry3<f32>, world1: &Isometry3<f32>) -> bool;
}

/// A convex shape described by its support function.
///
/// `support_point(dir)` returns a point of the shape farthest along `dir`.
/// The direction need not be normalized and may be zero, in which case any
/// point of the shape is acceptable.
pub trait SupportMap {
    /// A farthest point of the shape along `dir`.
    fn support_point(&self, dir: &Vector3<f32>) -> Point3<f32>;
}

impl SupportMap for Aabb {
    fn support_point(&self, dir: &Vector3<f32>) -> Point3<f32> {
        let mut point = self.center;
        for axis in 0..3 {
            if dir[axis] >= 0.0 {
                point[axis] += self.extents[axis];
            } else {
                point[axis] -= self.extents[axis];
            }
        }
        point
    }
}

/// Whether a query stops at the first intersecting pair or collects all of
/// them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ContactMode {
    /// Stop as soon as one intersecting pair is found.
    FirstContact,
    /// Visit every candidate pair.
    #[default]
    AllContacts,
}

/// Settings for [`TreeCollider`].
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TreeColliderSettings {
    /// First-contact or all-contacts behavior.
    pub mode: ContactMode,
    /// Retest the last intersecting pair before traversing. Only valid in
    /// first-contact mode; mostly useful for resting contacts.
    pub temporal_coherence: bool,
    /// Run the nine edge-edge axes in the OBB-OBB test. Costs a little per
    /// node pair, prunes noticeably better on rotated models.
    pub full_box_box_test: bool,
    /// Run the nine edge-edge axes in the triangle-box test. Usually not
    /// worth it: the tris that survive go straight to the exact predicate.
    pub full_prim_box_test: bool,
}

impl Default for TreeColliderSettings {
    fn default() -> Self {
        Self {
            mode: ContactMode::AllContacts,
            temporal_coherence: false,
            full_box_box_test: true,
            full_prim_box_test: false,
        }
    }
}

/// One intersecting triangle pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ContactPair {
    /// Triangle index in the first model's mesh.
    pub id0: u32,
    /// Triangle index in the second model's mesh.
    pub id1: u32,
}

/// Result of a pairwise query.
#[derive(Debug, Clone, Default)]
pub struct PairReport {
    /// True when at least one triangle pair intersects.
    pub contact: bool,
    /// The intersecting pairs. Holds at most one entry in first-contact
    /// mode.
    pub pairs: Vec<ContactPair>,
}

/// Work counters for the last query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TreeColliderStats {
    /// OBB-OBB tests performed.
    pub bv_bv_tests: u32,
    /// Triangle-box tests performed.
    pub bv_prim_tests: u32,
    /// Exact triangle-triangle tests performed.
    pub prim_prim_tests: u32,
}

/// Persistent state carried between queries on the same model pair.
///
/// `id0`/`id1` remember the last intersecting pair for temporal coherence.
/// The remaining fields drive [`TreeCollider::collide_with_hulls`]: the hull
/// oracle is consulted only while `hull_test` is armed, and re-arms after
/// [`HULL_TEST_COUNTDOWN`] queries without contact.
#[derive(Debug, Clone)]
pub struct PairCache {
    /// Last intersecting triangle in the first mesh.
    pub id0: u32,
    /// Last intersecting triangle in the second mesh.
    pub id1: u32,
    hull_test: bool,
    countdown: u32,
}

impl PairCache {
    /// A fresh cache with the hull pre-filter armed.
    #[must_use]
    pub fn new() -> Self {
        Self {
            id0: 0,
            id1: 0,
            hull_test: true,
            countdown: HULL_TEST_COUNTDOWN,
        }
    }
}

impl Default for PairCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Collider for tree-vs-tree queries.
///
/// Holds the triangle predicate and settings; all per-query state lives on
/// the stack, so one collider can serve many model pairs.
#[derive(Debug)]
pub struct TreeCollider<P> {
    predicate: P,
    settings: TreeColliderSettings,
    stats: TreeColliderStats,
}

impl<P: TriangleOverlap> TreeCollider<P> {
    /// Create a collider with default settings.
    #[must_use]
    pub fn new(predicate: P) -> Self {
        Self::with_settings(predicate, TreeColliderSettings::default())
    }

    /// Create a collider with explicit settings.
    #[must_use]
    pub fn with_settings(predicate: P, settings: TreeColliderSettings) -> Self {
        Self {
            predicate,
            settings,
            stats: TreeColliderStats::default(),
        }
    }

    /// The current settings.
    #[must_use]
    pub fn settings(&self) -> TreeColliderSettings {
        self.settings
    }

    /// Mutable access to the settings.
    pub fn settings_mut(&mut self) -> &mut TreeColliderSettings {
        &mut self.settings
    }

    /// Work counters of the most recent query.
    #[must_use]
    pub fn stats(&self) -> TreeColliderStats {
        self.stats
    }

    /// Collide two models placed at `world0` and `world1`.
    ///
    /// Both models must use the same tree layout and hold at least two
    /// triangles. On contact, the cache remembers the first intersecting
    /// pair for the next query.
    #[allow(clippy::too_many_arguments)]
    pub fn collide(
        &mut self,
        cache: &mut PairCache,
        model0: &Model,
        mesh0: &impl MeshInterface,
        world0: &Isometry3<f32>,
        model1: &Model,
        mesh1: &impl MeshInterface,
        world1: &Isometry3<f32>,
    ) -> Result<PairReport, QueryError> {
        if self.settings.temporal_coherence && self.settings.mode != ContactMode::FirstContact {
            return Err(QueryError::InvalidSettings(
                "temporal coherence requires first-contact mode",
            ));
        }
        if model0.has_leaf_nodes() != model1.has_leaf_nodes()
            || model0.is_quantized() != model1.is_quantized()
        {
            return Err(QueryError::MismatchedLayouts);
        }
        if model0.is_single_node() || model1.is_single_node() {
            return Err(QueryError::SingleNodeModel);
        }

        let world_0to1 = world1.inv_mul(world0);
        let world_1to0 = world0.inv_mul(world1);
        let rot_1to0 = world_1to0.rotation.to_rotation_matrix().into_inner();
        let mut ctx = PairContext {
            predicate: &self.predicate,
            mesh0,
            mesh1,
            rot_1to0,
            trans_1to0: world_1to0.translation.vector,
            rot_0to1: world_0to1.rotation.to_rotation_matrix().into_inner(),
            trans_0to1: world_0to1.translation.vector,
            abs_rot: rot_1to0.map(|x| ABS_ROT_EPSILON + x.abs()),
            settings: self.settings,
            center_coeff0: Vector3::zeros(),
            extents_coeff0: Vector3::zeros(),
            center_coeff1: Vector3::zeros(),
            extents_coeff1: Vector3::zeros(),
            leaf_tri: Triangle::new(Point3::origin(), Point3::origin(), Point3::origin()),
            leaf_index: 0,
            pairs: Vec::new(),
            contact: false,
            stats: TreeColliderStats::default(),
        };

        // Temporal coherence: retest the last intersecting pair first.
        if self.settings.temporal_coherence
            && (cache.id0 as usize) < model0.triangle_count()
            && (cache.id1 as usize) < model1.triangle_count()
        {
            ctx.prim_test(cache.id0, cache.id1);
            if ctx.contact {
                debug!(id0 = cache.id0, id1 = cache.id1, "temporal coherence hit");
                self.stats = ctx.stats;
                return Ok(PairReport {
                    contact: true,
                    pairs: ctx.pairs,
                });
            }
        }

        match (model0.tree(), model1.tree()) {
            (Some(ModelTree::Collision(t0)), Some(ModelTree::Collision(t1))) => {
                ctx.collide_collision(t0.nodes(), 0, t1.nodes(), 0);
            }
            (Some(ModelTree::NoLeaf(t0)), Some(ModelTree::NoLeaf(t1))) => {
                ctx.collide_no_leaf(t0.nodes(), 0, t1.nodes(), 0);
            }
            (Some(ModelTree::Quantized(t0)), Some(ModelTree::Quantized(t1))) => {
                ctx.center_coeff0 = t0.center_coeff();
                ctx.extents_coeff0 = t0.extents_coeff();
                ctx.center_coeff1 = t1.center_coeff();
                ctx.extents_coeff1 = t1.extents_coeff();
                let (ea, ca) = ctx.dequant0(&t0.nodes()[0].aabb);
                let (eb, cb) = ctx.dequant1(&t1.nodes()[0].aabb);
                ctx.collide_quantized(t0.nodes(), 0, ea, ca, t1.nodes(), 0, eb, cb);
            }
            (Some(ModelTree::QuantizedNoLeaf(t0)), Some(ModelTree::QuantizedNoLeaf(t1))) => {
                ctx.center_coeff0 = t0.center_coeff();
                ctx.extents_coeff0 = t0.extents_coeff();
                ctx.center_coeff1 = t1.center_coeff();
                ctx.extents_coeff1 = t1.extents_coeff();
                ctx.collide_quantized_no_leaf(t0.nodes(), 0, t1.nodes(), 0);
            }
            _ => return Err(QueryError::MismatchedLayouts),
        }

        if let Some(first) = ctx.pairs.first() {
            cache.id0 = first.id0;
            cache.id1 = first.id1;
        }
        self.stats = ctx.stats;
        Ok(PairReport {
            contact: ctx.contact,
            pairs: ctx.pairs,
        })
    }

    /// [`collide`](Self::collide) behind a convex-hull pre-filter.
    ///
    /// While the cache has hull testing armed, `oracle` runs first: on
    /// separation the traversal is skipped entirely. A hull contact disarms
    /// the filter, and it re-arms after enough consecutive queries without
    /// triangle contact; interpenetrating hulls whose meshes never touch
    /// would otherwise pay for a full traversal forever.
    #[allow(clippy::too_many_arguments)]
    pub fn collide_with_hulls(
        &mut self,
        cache: &mut PairCache,
        oracle: &impl HullSeparation,
        model0: &Model,
        mesh0: &impl MeshInterface,
        world0: &Isometry3<f32>,
        model1: &Model,
        mesh1: &impl MeshInterface,
        world1: &Isometry3<f32>,
    ) -> Result<PairReport, QueryError> {
        if cache.hull_test {
            if oracle.separated(world0, world1) {
                cache.countdown = HULL_TEST_COUNTDOWN;
                self.stats = TreeColliderStats::default();
                return Ok(PairReport::default());
            }
            cache.hull_test = false;
        }

        let report = self.collide(cache, model0, mesh0, world0, model1, mesh1, world1)?;

        if report.contact {
            cache.countdown = HULL_TEST_COUNTDOWN;
        }
        cache.countdown -= 1;
        if cache.countdown == 0 {
            cache.countdown = HULL_TEST_COUNTDOWN;
            cache.hull_test = true;
        }
        Ok(report)
    }
}

/// Per-query traversal state. Node arrays are passed as parameters so the
/// recursion can hold node copies while mutating the state.
struct PairContext<'a, P, M0, M1> {
    predicate: &'a P,
    mesh0: &'a M0,
    mesh1: &'a M1,
    rot_1to0: Matrix3<f32>,
    trans_1to0: Vector3<f32>,
    rot_0to1: Matrix3<f32>,
    trans_0to1: Vector3<f32>,
    abs_rot: Matrix3<f32>,
    settings: TreeColliderSettings,
    center_coeff0: Vector3<f32>,
    extents_coeff0: Vector3<f32>,
    center_coeff1: Vector3<f32>,
    extents_coeff1: Vector3<f32>,
    /// Leaf triangle fetched by the no-leaf traversals, already transformed
    /// into the opposite model's frame.
    leaf_tri: Triangle,
    leaf_index: u32,
    pairs: Vec<ContactPair>,
    contact: bool,
    stats: TreeColliderStats,
}

impl<P: TriangleOverlap, M0: MeshInterface, M1: MeshInterface> PairContext<'_, P, M0, M1> {
    fn contact_found(&self) -> bool {
        self.contact && self.settings.mode == ContactMode::FirstContact
    }

    fn box_box(
        &mut self,
        extents0: &Vector3<f32>,
        center0: &Point3<f32>,
        extents1: &Vector3<f32>,
        center1: &Point3<f32>,
    ) -> bool {
        self.stats.bv_bv_tests += 1;
        box_box_overlap(
            extents0,
            center0,
            extents1,
            center1,
            &self.rot_1to0,
            &self.abs_rot,
            &self.trans_1to0,
            self.settings.full_box_box_test,
        )
    }

    /// Cached leaf triangle against a box in the same frame.
    fn tri_box(&mut self, center: &Point3<f32>, extents: &Vector3<f32>) -> bool {
        self.stats.bv_prim_tests += 1;
        tri_box_overlap(
            &self.leaf_tri,
            center,
            extents,
            self.settings.full_prim_box_test,
        )
    }

    fn dequant0(&self, aabb: &QuantizedAabb) -> (Vector3<f32>, Point3<f32>) {
        (
            aabb.dequantize_extents(&self.extents_coeff0),
            aabb.dequantize_center(&self.center_coeff0),
        )
    }

    fn dequant1(&self, aabb: &QuantizedAabb) -> (Vector3<f32>, Point3<f32>) {
        (
            aabb.dequantize_extents(&self.extents_coeff1),
            aabb.dequantize_center(&self.center_coeff1),
        )
    }

    /// Cache a triangle of mesh 0, transformed into mesh 1's frame.
    fn fetch_leaf0(&mut self, primitive: u32) {
        self.leaf_tri = self
            .mesh0
            .triangle(primitive)
            .transformed(&self.rot_0to1, &self.trans_0to1);
        self.leaf_index = primitive;
    }

    /// Cache a triangle of mesh 1, transformed into mesh 0's frame.
    fn fetch_leaf1(&mut self, primitive: u32) {
        self.leaf_tri = self
            .mesh1
            .triangle(primitive)
            .transformed(&self.rot_1to0, &self.trans_1to0);
        self.leaf_index = primitive;
    }

    fn report(&mut self, id0: u32, id1: u32) {
        self.contact = true;
        self.pairs.push(ContactPair { id0, id1 });
    }

    /// Exact test of two primitives addressed by index.
    fn prim_test(&mut self, id0: u32, id1: u32) {
        self.stats.prim_prim_tests += 1;
        let tri0 = self.mesh0.triangle(id0);
        let tri1 = self
            .mesh1
            .triangle(id1)
            .transformed(&self.rot_1to0, &self.trans_1to0);
        if self.predicate.overlap(&tri0, &tri1) {
            self.report(id0, id1);
        }
    }

    /// Cached mesh-0 leaf against a mesh-1 primitive, in mesh 1's frame.
    fn prim_test_tri_index(&mut self, id1: u32) {
        self.stats.prim_prim_tests += 1;
        let tri1 = self.mesh1.triangle(id1);
        if self.predicate.overlap(&self.leaf_tri, &tri1) {
            self.report(self.leaf_index, id1);
        }
    }

    /// A mesh-0 primitive against the cached mesh-1 leaf, in mesh 0's frame.
    fn prim_test_index_tri(&mut self, id0: u32) {
        self.stats.prim_prim_tests += 1;
        let tri0 = self.mesh0.triangle(id0);
        if self.predicate.overlap(&tri0, &self.leaf_tri) {
            self.report(id0, self.leaf_index);
        }
    }

    fn collide_collision(
        &mut self,
        nodes0: &[CollisionNode],
        a: u32,
        nodes1: &[CollisionNode],
        b: u32,
    ) {
        let n0 = nodes0[a as usize];
        let n1 = nodes1[b as usize];
        if !self.box_box(
            &n0.aabb.extents,
            &n0.aabb.center,
            &n1.aabb.extents,
            &n1.aabb.center,
        ) {
            return;
        }

        match (n0.data, n1.data) {
            (NodeData::Leaf(p0), NodeData::Leaf(p1)) => self.prim_test(p0, p1),
            (NodeData::Branch { pos, neg }, NodeData::Leaf(_)) => {
                self.collide_collision(nodes0, neg, nodes1, b);
                if self.contact_found() {
                    return;
                }
                self.collide_collision(nodes0, pos, nodes1, b);
            }
            (NodeData::Leaf(_), NodeData::Branch { pos, neg }) => {
                self.collide_collision(nodes0, a, nodes1, neg);
                if self.contact_found() {
                    return;
                }
                self.collide_collision(nodes0, a, nodes1, pos);
            }
            (NodeData::Branch { pos, neg }, NodeData::Branch { pos: bpos, neg: bneg }) => {
                // Descend the larger box to keep the pair counts balanced.
                if n0.aabb.size() > n1.aabb.size() {
                    self.collide_collision(nodes0, neg, nodes1, b);
                    if self.contact_found() {
                        return;
                    }
                    self.collide_collision(nodes0, pos, nodes1, b);
                } else {
                    self.collide_collision(nodes0, a, nodes1, bneg);
                    if self.contact_found() {
                        return;
                    }
                    self.collide_collision(nodes0, a, nodes1, bpos);
                }
            }
        }
    }

    #[allow(clippy::too_many_arguments, clippy::similar_names)]
    fn collide_quantized(
        &mut self,
        nodes0: &[QuantizedNode],
        a: u32,
        extents0: Vector3<f32>,
        center0: Point3<f32>,
        nodes1: &[QuantizedNode],
        b: u32,
        extents1: Vector3<f32>,
        center1: Point3<f32>,
    ) {
        if !self.box_box(&extents0, &center0, &extents1, &center1) {
            return;
        }
        let n0 = nodes0[a as usize];
        let n1 = nodes1[b as usize];

        // Children are dequantized once here and carried down; nodes store
        // only the 16-bit boxes.
        let descend0 = |ctx: &mut Self, pos: u32, neg: u32| {
            let (e, c) = ctx.dequant0(&nodes0[neg as usize].aabb);
            ctx.collide_quantized(nodes0, neg, e, c, nodes1, b, extents1, center1);
            if ctx.contact_found() {
                return;
            }
            let (e, c) = ctx.dequant0(&nodes0[pos as usize].aabb);
            ctx.collide_quantized(nodes0, pos, e, c, nodes1, b, extents1, center1);
        };
        let descend1 = |ctx: &mut Self, pos: u32, neg: u32| {
            let (e, c) = ctx.dequant1(&nodes1[neg as usize].aabb);
            ctx.collide_quantized(nodes0, a, extents0, center0, nodes1, neg, e, c);
            if ctx.contact_found() {
                return;
            }
            let (e, c) = ctx.dequant1(&nodes1[pos as usize].aabb);
            ctx.collide_quantized(nodes0, a, extents0, center0, nodes1, pos, e, c);
        };

        match (n0.data, n1.data) {
            (NodeData::Leaf(p0), NodeData::Leaf(p1)) => self.prim_test(p0, p1),
            (NodeData::Branch { pos, neg }, NodeData::Leaf(_)) => descend0(self, pos, neg),
            (NodeData::Leaf(_), NodeData::Branch { pos, neg }) => descend1(self, pos, neg),
            (NodeData::Branch { pos, neg }, NodeData::Branch { pos: bpos, neg: bneg }) => {
                if extents0.norm_squared() > extents1.norm_squared() {
                    descend0(self, pos, neg);
                } else {
                    descend1(self, bpos, bneg);
                }
            }
        }
    }

    fn collide_no_leaf(&mut self, nodes0: &[NoLeafNode], a: u32, nodes1: &[NoLeafNode], b: u32) {
        let n0 = nodes0[a as usize];
        let n1 = nodes1[b as usize];
        if !self.box_box(
            &n0.aabb.extents,
            &n0.aabb.center,
            &n1.aabb.extents,
            &n1.aabb.center,
        ) {
            return;
        }

        self.no_leaf_child(nodes0, n0.pos, nodes1, n1);
        if self.contact_found() {
            return;
        }
        self.no_leaf_child(nodes0, n0.neg, nodes1, n1);
    }

    /// One child slot of tree 0 against both child slots of a tree-1 node.
    fn no_leaf_child(
        &mut self,
        nodes0: &[NoLeafNode],
        child0: NodeRef,
        nodes1: &[NoLeafNode],
        n1: NoLeafNode,
    ) {
        match child0 {
            NodeRef::Leaf(p) => {
                self.fetch_leaf0(p);
                match n1.pos {
                    NodeRef::Leaf(q) => self.prim_test_tri_index(q),
                    NodeRef::Node(bn) => self.collide_tri_box(nodes1, bn),
                }
                if self.contact_found() {
                    return;
                }
                match n1.neg {
                    NodeRef::Leaf(q) => self.prim_test_tri_index(q),
                    NodeRef::Node(bn) => self.collide_tri_box(nodes1, bn),
                }
            }
            NodeRef::Node(an) => {
                match n1.pos {
                    NodeRef::Leaf(q) => {
                        self.fetch_leaf1(q);
                        self.collide_box_tri(nodes0, an);
                    }
                    NodeRef::Node(bn) => self.collide_no_leaf(nodes0, an, nodes1, bn),
                }
                if self.contact_found() {
                    return;
                }
                match n1.neg {
                    NodeRef::Leaf(q) => {
                        self.fetch_leaf1(q);
                        self.collide_box_tri(nodes0, an);
                    }
                    NodeRef::Node(bn) => self.collide_no_leaf(nodes0, an, nodes1, bn),
                }
            }
        }
    }

    /// Cached mesh-0 leaf against a tree-1 subtree.
    fn collide_tri_box(&mut self, nodes1: &[NoLeafNode], b: u32) {
        let n1 = nodes1[b as usize];
        if !self.tri_box(&n1.aabb.center, &n1.aabb.extents) {
            return;
        }
        match n1.pos {
            NodeRef::Leaf(q) => self.prim_test_tri_index(q),
            NodeRef::Node(bn) => self.collide_tri_box(nodes1, bn),
        }
        if self.contact_found() {
            return;
        }
        match n1.neg {
            NodeRef::Leaf(q) => self.prim_test_tri_index(q),
            NodeRef::Node(bn) => self.collide_tri_box(nodes1, bn),
        }
    }

    /// A tree-0 subtree against the cached mesh-1 leaf.
    fn collide_box_tri(&mut self, nodes0: &[NoLeafNode], a: u32) {
        let n0 = nodes0[a as usize];
        if !self.tri_box(&n0.aabb.center, &n0.aabb.extents) {
            return;
        }
        match n0.pos {
            NodeRef::Leaf(p) => self.prim_test_index_tri(p),
            NodeRef::Node(an) => self.collide_box_tri(nodes0, an),
        }
        if self.contact_found() {
            return;
        }
        match n0.neg {
            NodeRef::Leaf(p) => self.prim_test_index_tri(p),
            NodeRef::Node(an) => self.collide_box_tri(nodes0, an),
        }
    }

    fn collide_quantized_no_leaf(
        &mut self,
        nodes0: &[QuantizedNoLeafNode],
        a: u32,
        nodes1: &[QuantizedNoLeafNode],
        b: u32,
    ) {
        let n0 = nodes0[a as usize];
        let n1 = nodes1[b as usize];
        let (extents0, center0) = self.dequant0(&n0.aabb);
        let (extents1, center1) = self.dequant1(&n1.aabb);
        if !self.box_box(&extents0, &center0, &extents1, &center1) {
            return;
        }

        self.quantized_no_leaf_child(nodes0, n0.pos, nodes1, n1);
        if self.contact_found() {
            return;
        }
        self.quantized_no_leaf_child(nodes0, n0.neg, nodes1, n1);
    }

    fn quantized_no_leaf_child(
        &mut self,
        nodes0: &[QuantizedNoLeafNode],
        child0: NodeRef,
        nodes1: &[QuantizedNoLeafNode],
        n1: QuantizedNoLeafNode,
    ) {
        match child0 {
            NodeRef::Leaf(p) => {
                self.fetch_leaf0(p);
                match n1.pos {
                    NodeRef::Leaf(q) => self.prim_test_tri_index(q),
                    NodeRef::Node(bn) => self.collide_q_tri_box(nodes1, bn),
                }
                if self.contact_found() {
                    return;
                }
                match n1.neg {
                    NodeRef::Leaf(q) => self.prim_test_tri_index(q),
                    NodeRef::Node(bn) => self.collide_q_tri_box(nodes1, bn),
                }
            }
            NodeRef::Node(an) => {
                match n1.pos {
                    NodeRef::Leaf(q) => {
                        self.fetch_leaf1(q);
                        self.collide_q_box_tri(nodes0, an);
                    }
                    NodeRef::Node(bn) => self.collide_quantized_no_leaf(nodes0, an, nodes1, bn),
                }
                if self.contact_found() {
                    return;
                }
                match n1.neg {
                    NodeRef::Leaf(q) => {
                        self.fetch_leaf1(q);
                        self.collide_q_box_tri(nodes0, an);
                    }
                    NodeRef::Node(bn) => self.collide_quantized_no_leaf(nodes0, an, nodes1, bn),
                }
            }
        }
    }

    fn collide_q_tri_box(&mut self, nodes1: &[QuantizedNoLeafNode], b: u32) {
        let n1 = nodes1[b as usize];
        let (extents, center) = self.dequant1(&n1.aabb);
        if !self.tri_box(&center, &extents) {
            return;
        }
        match n1.pos {
            NodeRef::Leaf(q) => self.prim_test_tri_index(q),
            NodeRef::Node(bn) => self.collide_q_tri_box(nodes1, bn),
        }
        if self.contact_found() {
            return;
        }
        match n1.neg {
            NodeRef::Leaf(q) => self.prim_test_tri_index(q),
            NodeRef::Node(bn) => self.collide_q_tri_box(nodes1, bn),
        }
    }

    fn collide_q_box_tri(&mut self, nodes0: &[QuantizedNoLeafNode], a: u32) {
        let n0 = nodes0[a as usize];
        let (extents, center) = self.dequant0(&n0.aabb);
        if !self.tri_box(&center, &extents) {
            return;
        }
        match n0.pos {
            NodeRef::Leaf(p) => self.prim_test_index_tri(p),
            NodeRef::Node(an) => self.collide_q_box_tri(nodes0, an),
        }
        if self.contact_found() {
            return;
        }
        match n0.neg {
            NodeRef::Leaf(p) => self.prim_test_index_tri(p),
            NodeRef::Node(an) => self.collide_q_box_tri(nodes0, an),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::error::QueryError;
    use crate::model::{BuildSettings, TreeLayout};
    use crate::tree::tests::MeshSource;
    use collide_types::TriMesh;

    /// Conservative predicate for the axis-aligned fixtures below: the
    /// triangles are either clearly apart or clearly interpenetrating, so
    /// an AABB check decides exactly.
    fn aabb_predicate(t0: &Triangle, t1: &Triangle) -> bool {
        let a = t0.aabb();
        let b = t1.aabb();
        (0..3).all(|k| a.min()[k] <= b.max()[k] && b.min()[k] <= a.max()[k])
    }

    /// Two coplanar triangles along x, both in the z = 0 plane.
    fn strip_mesh() -> TriMesh {
        TriMesh::new(
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
                Point3::new(2.0, 0.0, 0.0),
                Point3::new(3.0, 0.0, 0.0),
                Point3::new(2.0, 1.0, 0.0),
            ],
            vec![[0, 1, 2], [3, 4, 5]],
        )
    }

    fn build_model(mesh: &TriMesh, layout: TreeLayout) -> Model {
        Model::build(
            &MeshSource::new(mesh),
            BuildSettings {
                layout,
                fix_quantized: true,
            },
        )
        .unwrap()
    }

    fn all_layouts() -> [TreeLayout; 4] {
        [
            TreeLayout::Collision,
            TreeLayout::NoLeaf,
            TreeLayout::Quantized,
            TreeLayout::QuantizedNoLeaf,
        ]
    }

    #[test]
    fn test_contact_and_separation_all_layouts() {
        let mesh = strip_mesh();
        for layout in all_layouts() {
            let model = build_model(&mesh, layout);
            let mut collider = TreeCollider::new(aabb_predicate);
            let mut cache = PairCache::new();

            let apart = collider
                .collide(
                    &mut cache,
                    &model,
                    &mesh,
                    &Isometry3::identity(),
                    &model,
                    &mesh,
                    &Isometry3::translation(10.0, 0.0, 0.0),
                )
                .unwrap();
            assert!(!apart.contact, "{layout:?}: separated meshes touched");
            assert!(apart.pairs.is_empty());

            let touching = collider
                .collide(
                    &mut cache,
                    &model,
                    &mesh,
                    &Isometry3::identity(),
                    &model,
                    &mesh,
                    &Isometry3::translation(0.25, 0.0, 0.0),
                )
                .unwrap();
            assert!(touching.contact, "{layout:?}: overlapping meshes missed");
            assert!(!touching.pairs.is_empty());
            assert!(collider.stats().bv_bv_tests > 0, "{layout:?}");
        }
    }

    #[test]
    fn test_first_contact_stops_early() {
        let mesh = strip_mesh();
        let model = build_model(&mesh, TreeLayout::NoLeaf);
        let mut collider = TreeCollider::with_settings(
            aabb_predicate,
            TreeColliderSettings {
                mode: ContactMode::FirstContact,
                ..TreeColliderSettings::default()
            },
        );
        let mut cache = PairCache::new();
        let report = collider
            .collide(
                &mut cache,
                &model,
                &mesh,
                &Isometry3::identity(),
                &model,
                &mesh,
                &Isometry3::identity(),
            )
            .unwrap();
        assert!(report.contact);
        assert_eq!(report.pairs.len(), 1);
    }

    #[test]
    fn test_temporal_coherence_short_circuits() {
        let mesh = strip_mesh();
        let model = build_model(&mesh, TreeLayout::Collision);
        let mut collider = TreeCollider::with_settings(
            aabb_predicate,
            TreeColliderSettings {
                mode: ContactMode::FirstContact,
                temporal_coherence: true,
                ..TreeColliderSettings::default()
            },
        );
        let mut cache = PairCache::new();
        let world1 = Isometry3::translation(0.25, 0.0, 0.0);

        let first = collider
            .collide(
                &mut cache,
                &model,
                &mesh,
                &Isometry3::identity(),
                &model,
                &mesh,
                &world1,
            )
            .unwrap();
        assert!(first.contact);

        // The repeat query must resolve from the cached pair alone.
        let second = collider
            .collide(
                &mut cache,
                &model,
                &mesh,
                &Isometry3::identity(),
                &model,
                &mesh,
                &world1,
            )
            .unwrap();
        assert!(second.contact);
        assert_eq!(collider.stats().prim_prim_tests, 1);
        assert_eq!(collider.stats().bv_bv_tests, 0);
    }

    #[test]
    fn test_temporal_coherence_requires_first_contact() {
        let mesh = strip_mesh();
        let model = build_model(&mesh, TreeLayout::Collision);
        let mut collider = TreeCollider::with_settings(
            aabb_predicate,
            TreeColliderSettings {
                temporal_coherence: true,
                ..TreeColliderSettings::default()
            },
        );
        let err = collider
            .collide(
                &mut PairCache::new(),
                &model,
                &mesh,
                &Isometry3::identity(),
                &model,
                &mesh,
                &Isometry3::identity(),
            )
            .unwrap_err();
        assert!(matches!(err, QueryError::InvalidSettings(_)));
    }

    #[test]
    fn test_mismatched_layouts_rejected() {
        let mesh = strip_mesh();
        let plain = build_model(&mesh, TreeLayout::Collision);
        let quantized = build_model(&mesh, TreeLayout::Quantized);
        let mut collider = TreeCollider::new(aabb_predicate);
        let err = collider
            .collide(
                &mut PairCache::new(),
                &plain,
                &mesh,
                &Isometry3::identity(),
                &quantized,
                &mesh,
                &Isometry3::identity(),
            )
            .unwrap_err();
        assert_eq!(err, QueryError::MismatchedLayouts);
    }

    #[test]
    fn test_single_node_model_rejected() {
        let mesh = strip_mesh();
        let single_mesh = TriMesh::new(
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
            ],
            vec![[0, 1, 2]],
        );
        let model = build_model(&mesh, TreeLayout::Collision);
        let single = build_model(&single_mesh, TreeLayout::Collision);
        let mut collider = TreeCollider::new(aabb_predicate);
        let err = collider
            .collide(
                &mut PairCache::new(),
                &model,
                &mesh,
                &Isometry3::identity(),
                &single,
                &single_mesh,
                &Isometry3::identity(),
            )
            .unwrap_err();
        assert_eq!(err, QueryError::SingleNodeModel);
    }

    struct FixedOracle(bool);

    impl HullSeparation for FixedOracle {
        fn separated(&self, _: &Isometry3<f32>, _: &Isometry3<f32>) -> bool {
            self.0
        }
    }

    #[test]
    fn test_hull_filter_skips_traversal() {
        let mesh = strip_mesh();
        let model = build_model(&mesh, TreeLayout::QuantizedNoLeaf);
        let mut collider = TreeCollider::new(aabb_predicate);
        let mut cache = PairCache::new();

        let report = collider
            .collide_with_hulls(
                &mut cache,
                &FixedOracle(true),
                &model,
                &mesh,
                &Isometry3::identity(),
                &model,
                &mesh,
                &Isometry3::identity(),
            )
            .unwrap();
        assert!(!report.contact);
        assert_eq!(collider.stats(), TreeColliderStats::default());
        assert!(cache.hull_test);
    }

    #[test]
    fn test_hull_filter_disarms_on_hull_contact() {
        let mesh = strip_mesh();
        let model = build_model(&mesh, TreeLayout::QuantizedNoLeaf);
        let mut collider = TreeCollider::new(aabb_predicate);
        let mut cache = PairCache::new();

        let report = collider
            .collide_with_hulls(
                &mut cache,
                &FixedOracle(false),
                &model,
                &mesh,
                &Isometry3::identity(),
                &model,
                &mesh,
                &Isometry3::identity(),
            )
            .unwrap();
        assert!(report.contact);
        assert!(!cache.hull_test);
    }

    #[test]
    fn test_hull_filter_rearms_after_countdown() {
        let mesh = strip_mesh();
        let model = build_model(&mesh, TreeLayout::QuantizedNoLeaf);
        let mut collider = TreeCollider::new(aabb_predicate);
        let mut cache = PairCache::new();
        cache.hull_test = false;
        cache.countdown = 2;

        let apart = Isometry3::translation(10.0, 0.0, 0.0);
        for _ in 0..2 {
            let report = collider
                .collide_with_hulls(
                    &mut cache,
                    &FixedOracle(true),
                    &model,
                    &mesh,
                    &Isometry3::identity(),
                    &model,
                    &mesh,
                    &apart,
                )
                .unwrap();
            assert!(!report.contact);
        }
        assert!(cache.hull_test);
        assert_eq!(cache.countdown, HULL_TEST_COUNTDOWN);
    }

    #[test]
    fn test_aabb_support_point() {
        let aabb = Aabb::new(Point3::new(1.0, 2.0, 3.0), Vector3::new(0.5, 1.0, 2.0));
        let p = aabb.support_point(&Vector3::new(1.0, -1.0, 1.0));
        assert_eq!(p, Point3::new(1.5, 1.0, 5.0));
    }
}
