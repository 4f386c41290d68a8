use crate::AssetError;
use bytemuck::{Pod, Zeroable};
use meshscene_common::MeshId;
use serde::Serialize;

/// One mesh vertex as laid out in GPU vertex buffers.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub color: [f32; 3],
    pub tex_coord: [f32; 2],
}

impl Vertex {
    pub const WHITE: [f32; 3] = [1.0, 1.0, 1.0];

    pub fn new(position: [f32; 3], tex_coord: [f32; 2]) -> Self {
        Self {
            position,
            color: Self::WHITE,
            tex_coord,
        }
    }

    pub fn with_color(mut self, color: [f32; 3]) -> Self {
        self.color = color;
        self
    }
}

/// Raw geometry returned by a [`MeshLoader`](crate::MeshLoader).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

/// Loaded, immutable mesh geometry.
///
/// GPU buffers are not stored here. A renderer keeps its own buffers keyed by
/// [`Mesh::id`], so one mesh can be shared by many entities and renderers.
#[derive(Debug)]
pub struct Mesh {
    id: MeshId,
    source: String,
    vertices: Vec<Vertex>,
    indices: Vec<u32>,
}

impl Mesh {
    /// Wrap loader output, rejecting indices past the end of the vertex list.
    pub fn new(source: impl Into<String>, data: MeshData) -> Result<Self, AssetError> {
        let source = source.into();
        let len = data.vertices.len();
        if let Some(&bad) = data.indices.iter().find(|&&i| i as usize >= len) {
            return Err(AssetError::IndexOutOfRange {
                path: source,
                index: bad as usize,
                len,
            });
        }
        Ok(Self {
            id: MeshId::next(),
            source,
            vertices: data.vertices,
            indices: data.indices,
        })
    }

    pub fn id(&self) -> MeshId {
        self.id
    }

    /// The cache key this mesh was loaded from.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() || self.indices.is_empty()
    }

    pub fn summary(&self) -> MeshSummary {
        MeshSummary {
            source: self.source.clone(),
            vertex_count: self.vertices.len(),
            index_count: self.indices.len(),
            triangle_count: self.indices.len() / 3,
        }
    }
}

/// Counts describing a mesh, for inspectors and CLI output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MeshSummary {
    pub source: String,
    pub vertex_count: usize,
    pub index_count: usize,
    pub triangle_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> MeshData {
        MeshData {
            vertices: vec![
                Vertex::new([0.0, 0.0, 0.0], [0.0, 0.0]),
                Vertex::new([1.0, 0.0, 0.0], [1.0, 0.0]),
                Vertex::new([0.0, 1.0, 0.0], [0.0, 1.0]),
            ],
            indices: vec![0, 1, 2],
        }
    }

    #[test]
    fn vertex_is_32_bytes() {
        assert_eq!(std::mem::size_of::<Vertex>(), 32);
    }

    #[test]
    fn mesh_accepts_valid_indices() {
        let mesh = Mesh::new("tri", triangle()).unwrap();
        assert_eq!(mesh.vertices().len(), 3);
        assert_eq!(mesh.index_bytes().len(), 12);
        assert_eq!(mesh.vertex_bytes().len(), 96);
        assert!(!mesh.is_empty());
        assert_eq!(mesh.summary().triangle_count, 1);
    }

    #[test]
    fn mesh_rejects_dangling_index() {
        let mut data = triangle();
        data.indices.push(7);
        let err = Mesh::new("tri", data).unwrap_err();
        assert!(matches!(
            err,
            AssetError::IndexOutOfRange { index: 7, len: 3, .. }
        ));
    }

    #[test]
    fn meshes_get_distinct_ids() {
        let a = Mesh::new("a", triangle()).unwrap();
        let b = Mesh::new("a", triangle()).unwrap();
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn empty_mesh_is_empty() {
        let mesh = Mesh::new("empty", MeshData::default()).unwrap();
        assert!(mesh.is_empty());
        assert_eq!(mesh.summary().vertex_count, 0);
    }
}
