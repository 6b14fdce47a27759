//! Mesh access for collision queries.
//!
//! Collision trees store triangle *indices* only; the triangle data itself
//! stays with the application. Queries pull vertices on demand through
//! [`MeshInterface`], so the same tree works against shared vertex pools,
//! deforming meshes after a refit, or generated geometry.

use crate::Triangle;
use nalgebra::Point3;

/// Read access to an indexed triangle mesh.
pub trait MeshInterface {
    /// Number of triangles in the mesh.
    fn triangle_count(&self) -> usize;

    /// Fetch the triangle with the given index.
    ///
    /// # Panics
    ///
    /// Implementations may panic when `index >= triangle_count()`.
    fn triangle(&self, index: u32) -> Triangle;
}

/// A plain indexed triangle mesh.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TriMesh {
    vertices: Vec<Point3<f32>>,
    indices: Vec<[u32; 3]>,
}

impl TriMesh {
    /// Create a mesh from vertices and triangle indices.
    #[must_use]
    pub fn new(vertices: Vec<Point3<f32>>, indices: Vec<[u32; 3]>) -> Self {
        Self { vertices, indices }
    }

    /// The vertex pool.
    #[must_use]
    pub fn vertices(&self) -> &[Point3<f32>] {
        &self.vertices
    }

    /// Mutable vertex access, for deformation followed by a refit.
    pub fn vertices_mut(&mut self) -> &mut [Point3<f32>] {
        &mut self.vertices
    }

    /// The triangle index list.
    #[must_use]
    pub fn indices(&self) -> &[[u32; 3]] {
        &self.indices
    }
}

impl MeshInterface for TriMesh {
    fn triangle_count(&self) -> usize {
        self.indices.len()
    }

    fn triangle(&self, index: u32) -> Triangle {
        let [a, b, c] = self.indices[index as usize];
        Triangle::new(
            self.vertices[a as usize],
            self.vertices[b as usize],
            self.vertices[c as usize],
        )
    }
}

impl<M: MeshInterface + ?Sized> MeshInterface for &M {
    fn triangle_count(&self) -> usize {
        (**self).triangle_count()
    }

    fn triangle(&self, index: u32) -> Triangle {
        (**self).triangle(index)
    }
}
