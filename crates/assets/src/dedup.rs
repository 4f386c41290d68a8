//! Vertex deduplication.
//!
//! Face corners are folded into a unique vertex list plus an index list. Two
//! vertices are the same when position, colour and texture coordinate are
//! all equal. Components compare by bit pattern, except that `-0.0` and
//! `0.0` are the same value.

use crate::mesh::{MeshData, Vertex};
use std::collections::HashMap;

type VertexKey = [u32; 8];

fn key(vertex: &Vertex) -> VertexKey {
    let floats: [f32; 8] = bytemuck::cast(*vertex);
    floats.map(|f| (if f == 0.0 { 0.0f32 } else { f }).to_bits())
}

/// Collapse a stream of face corners into unique vertices and indices.
///
/// The first occurrence of a vertex fixes its index; later equal corners
/// reuse it.
pub fn deduplicate(corners: impl IntoIterator<Item = Vertex>) -> MeshData {
    let mut unique: HashMap<VertexKey, u32> = HashMap::new();
    let mut data = MeshData::default();

    for vertex in corners {
        let index = *unique.entry(key(&vertex)).or_insert_with(|| {
            data.vertices.push(vertex);
            (data.vertices.len() - 1) as u32
        });
        data.indices.push(index);
    }

    data
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_corner_collapses() {
        let a = Vertex::new([0.0, 0.0, 0.0], [0.0, 0.0]);
        let b = Vertex::new([1.0, 0.0, 0.0], [1.0, 0.0]);
        let c = Vertex::new([1.0, 1.0, 0.0], [1.0, 1.0]);
        let d = Vertex::new([0.0, 1.0, 0.0], [0.0, 1.0]);

        let data = deduplicate([a, b, c, a, c, d]);
        assert_eq!(data.vertices, vec![a, b, c, d]);
        assert_eq!(data.indices, vec![0, 1, 2, 0, 2, 3]);
    }

    #[test]
    fn differing_tex_coord_stays_distinct() {
        let a = Vertex::new([0.0, 0.0, 0.0], [0.0, 0.0]);
        let seam = Vertex::new([0.0, 0.0, 0.0], [1.0, 0.0]);
        let data = deduplicate([a, seam, a]);
        assert_eq!(data.vertices.len(), 2);
        assert_eq!(data.indices, vec![0, 1, 0]);
    }

    #[test]
    fn differing_color_stays_distinct() {
        let a = Vertex::new([0.0, 0.0, 0.0], [0.0, 0.0]);
        let red = a.with_color([1.0, 0.0, 0.0]);
        let data = deduplicate([a, red]);
        assert_eq!(data.vertices.len(), 2);
    }

    #[test]
    fn signed_zero_collapses() {
        let a = Vertex::new([0.0, 0.0, 0.0], [0.0, 0.0]);
        let b = Vertex::new([-0.0, 0.0, -0.0], [0.0, -0.0]);
        assert_eq!(a, b);

        let data = deduplicate([a, b]);
        assert_eq!(data.vertices.len(), 1);
        assert_eq!(data.indices, vec![0, 0]);
        assert_eq!(data.vertices[0].position[0].to_bits(), 0.0f32.to_bits());
    }

    #[test]
    fn empty_input() {
        let data = deduplicate(std::iter::empty());
        assert!(data.vertices.is_empty());
        assert!(data.indices.is_empty());
    }
}
