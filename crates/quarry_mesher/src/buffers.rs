use std::fmt;

use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3};
use quarry_shared::texture::UvQuad;

#[derive(Debug, Default, PartialEq)]
pub struct MeshBuffers {
    pub vertices: Vec<Vec3>,
    pub triangles: Vec<u32>,
    pub normals: Vec<Vec3>,
    pub uvs: Vec<Vec2>,
}

impl Clone for MeshBuffers {
    fn clone(&self) -> Self {
        Self {
            vertices: self.vertices.clone(),
            triangles: self.triangles.clone(),
            normals: self.normals.clone(),
            uvs: self.uvs.clone(),
        }
    }

    // Field-wise so each stream keeps its allocation.
    fn clone_from(&mut self, source: &Self) {
        self.vertices.clone_from(&source.vertices);
        self.triangles.clone_from(&source.triangles);
        self.normals.clone_from(&source.normals);
        self.uvs.clone_from(&source.uvs);
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}
const _: [(); 32] = [(); std::mem::size_of::<MeshVertex>()];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BufferInvariantError {
    NormalCountMismatch { vertices: usize, normals: usize },
    UvCountMismatch { vertices: usize, uvs: usize },
    PartialQuad { vertices: usize },
    TriangleCountMismatch { expected: usize, actual: usize },
    IndexOutOfRange { index: u32, vertices: usize },
}

impl fmt::Display for BufferInvariantError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NormalCountMismatch { vertices, normals } => {
                write!(f, "{normals} normals for {vertices} vertices")
            }
            Self::UvCountMismatch { vertices, uvs } => {
                write!(f, "{uvs} uvs for {vertices} vertices")
            }
            Self::PartialQuad { vertices } => {
                write!(f, "{vertices} vertices is not a whole number of quads")
            }
            Self::TriangleCountMismatch { expected, actual } => {
                write!(f, "expected {expected} triangle indices, found {actual}")
            }
            Self::IndexOutOfRange { index, vertices } => {
                write!(f, "triangle index {index} out of range for {vertices} vertices")
            }
        }
    }
}

impl std::error::Error for BufferInvariantError {}

impl MeshBuffers {
    pub fn with_face_capacity(faces: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(faces * 4),
            triangles: Vec::with_capacity(faces * 6),
            normals: Vec::with_capacity(faces * 4),
            uvs: Vec::with_capacity(faces * 4),
        }
    }

    /// Appends one quad `a, b, c, d` as triangles `a-b-c` and `c-d-a`.
    pub fn add_face(&mut self, a: Vec3, b: Vec3, c: Vec3, d: Vec3, normal: Vec3) {
        let index = self.vertices.len() as u32;
        self.vertices.extend_from_slice(&[a, b, c, d]);
        self.normals.extend_from_slice(&[normal; 4]);
        self.triangles.extend_from_slice(&[
            index,
            index + 1,
            index + 2,
            index + 2,
            index + 3,
            index,
        ]);
    }

    pub fn add_texture_face(&mut self, face: &UvQuad) {
        self.uvs.extend_from_slice(&face.corners());
    }

    pub fn clear(&mut self) {
        self.vertices.clear();
        self.triangles.clear();
        self.normals.clear();
        self.uvs.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn face_count(&self) -> usize {
        self.vertices.len() / 4
    }

    pub fn validate(&self) -> Result<(), BufferInvariantError> {
        let vertices = self.vertices.len();
        if self.normals.len() != vertices {
            return Err(BufferInvariantError::NormalCountMismatch {
                vertices,
                normals: self.normals.len(),
            });
        }
        if self.uvs.len() != vertices {
            return Err(BufferInvariantError::UvCountMismatch {
                vertices,
                uvs: self.uvs.len(),
            });
        }
        if vertices % 4 != 0 {
            return Err(BufferInvariantError::PartialQuad { vertices });
        }
        let expected = vertices / 4 * 6;
        if self.triangles.len() != expected {
            return Err(BufferInvariantError::TriangleCountMismatch {
                expected,
                actual: self.triangles.len(),
            });
        }
        if let Some(&index) = self
            .triangles
            .iter()
            .find(|&&index| index as usize >= vertices)
        {
            return Err(BufferInvariantError::IndexOutOfRange { index, vertices });
        }
        Ok(())
    }

    pub fn interleaved(&self) -> Vec<MeshVertex> {
        self.vertices
            .iter()
            .zip(&self.normals)
            .zip(&self.uvs)
            .map(|((position, normal), uv)| MeshVertex {
                position: position.to_array(),
                normal: normal.to_array(),
                uv: uv.to_array(),
            })
            .collect()
    }

    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.triangles)
    }
}
