//! Shared fixtures for collider integration tests: a median-split tree
//! builder, a cube mesh, and an exact SAT triangle-triangle predicate.

#![allow(dead_code)]

use collide_core::{Aabb, MeshInterface, SourceContent, SourceNode, SourceTree, TriMesh, Triangle};
use nalgebra::{Point3, Vector3};

pub struct BuiltNode {
    aabb: Aabb,
    children: Option<(Box<BuiltNode>, Box<BuiltNode>)>,
    primitive: u32,
}

impl SourceNode for BuiltNode {
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

pub struct BuiltTree {
    root: BuiltNode,
    primitives: usize,
}

impl SourceTree for BuiltTree {
    type Node = BuiltNode;

    fn root(&self) -> &BuiltNode {
        &self.root
    }

    fn node_count(&self) -> usize {
        2 * self.primitives - 1
    }

    fn primitive_count(&self) -> usize {
        self.primitives
    }
}

/// Complete AABB tree over a mesh: recursive median split of the triangle
/// centroids along the widest axis, one triangle per leaf.
pub fn median_split_tree(mesh: &TriMesh) -> BuiltTree {
    fn centroid(mesh: &TriMesh, prim: u32) -> Point3<f32> {
        let tri = mesh.triangle(prim);
        Point3::from(
            (tri.vertices[0].coords + tri.vertices[1].coords + tri.vertices[2].coords) / 3.0,
        )
    }

    fn build(mesh: &TriMesh, mut prims: Vec<u32>) -> BuiltNode {
        let mut aabb = mesh.triangle(prims[0]).aabb();
        for &p in &prims[1..] {
            aabb = aabb.merged(&mesh.triangle(p).aabb());
        }
        if prims.len() == 1 {
            return BuiltNode {
                aabb,
                children: None,
                primitive: prims[0],
            };
        }
        let axis = aabb.extents.imax();
        prims.sort_by(|&a, &b| {
            centroid(mesh, a)[axis]
                .partial_cmp(&centroid(mesh, b)[axis])
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        let neg_half = prims.split_off(prims.len() / 2);
        BuiltNode {
            aabb,
            children: Some((
                Box::new(build(mesh, prims)),
                Box::new(build(mesh, neg_half)),
            )),
            primitive: 0,
        }
    }

    let primitives = mesh.indices().len();
    BuiltTree {
        root: build(mesh, (0..primitives as u32).collect()),
        primitives,
    }
}

/// Axis-aligned cube of half-extent 1 around `center`, as 12 triangles.
pub fn cube_mesh(center: Point3<f32>) -> TriMesh {
    let mut vertices = Vec::with_capacity(8);
    for i in 0..8u32 {
        vertices.push(Point3::new(
            center.x + if i & 1 == 0 { -1.0 } else { 1.0 },
            center.y + if i & 2 == 0 { -1.0 } else { 1.0 },
            center.z + if i & 4 == 0 { -1.0 } else { 1.0 },
        ));
    }
    let indices = vec![
        [0, 1, 3],
        [0, 3, 2],
        [4, 7, 5],
        [4, 6, 7],
        [0, 5, 1],
        [0, 4, 5],
        [2, 3, 7],
        [2, 7, 6],
        [0, 2, 6],
        [0, 6, 4],
        [1, 5, 7],
        [1, 7, 3],
    ];
    TriMesh::new(vertices, indices)
}

fn projection(tri: &Triangle, axis: &Vector3<f32>) -> (f32, f32) {
    let mut min = f32::MAX;
    let mut max = f32::MIN;
    for v in &tri.vertices {
        let d = v.coords.dot(axis);
        min = min.min(d);
        max = max.max(d);
    }
    (min, max)
}

/// Exact triangle-triangle intersection by separating axes: both face
/// normals plus the nine edge-edge cross products. Near-degenerate axes are
/// skipped, which keeps the test conservative.
pub fn tri_tri_overlap(t0: &Triangle, t1: &Triangle) -> bool {
    let edges0 = [
        t0.vertices[1] - t0.vertices[0],
        t0.vertices[2] - t0.vertices[1],
        t0.vertices[0] - t0.vertices[2],
    ];
    let edges1 = [
        t1.vertices[1] - t1.vertices[0],
        t1.vertices[2] - t1.vertices[1],
        t1.vertices[0] - t1.vertices[2],
    ];

    let mut axes = Vec::with_capacity(11);
    axes.push(edges0[0].cross(&edges0[1]));
    axes.push(edges1[0].cross(&edges1[1]));
    for e0 in &edges0 {
        for e1 in &edges1 {
            axes.push(e0.cross(e1));
        }
    }

    for axis in &axes {
        if axis.norm_squared() < 1e-10 {
            continue;
        }
        let (min0, max0) = projection(t0, axis);
        let (min1, max1) = projection(t1, axis);
        if max0 < min1 || max1 < min0 {
            return false;
        }
    }
    true
}
