use crate::AssetError;
use crate::dedup::deduplicate;
use crate::mesh::{MeshData, Vertex};
use std::path::Path;

/// Turns a mesh source into deduplicated geometry.
///
/// The cache calls this once per cache miss.
pub trait MeshLoader {
    fn load(&self, source: &str) -> Result<MeshData, AssetError>;
}

impl<F> MeshLoader for F
where
    F: Fn(&str) -> Result<MeshData, AssetError>,
{
    fn load(&self, source: &str) -> Result<MeshData, AssetError> {
        self(source)
    }
}

/// Wavefront OBJ loader backed by `tobj`.
///
/// Polygons are triangulated. Every face corner must carry a texture
/// coordinate; the `v` axis is flipped to match top-left texture origin.
/// Vertex colours are used when the file provides them, white otherwise.
#[derive(Debug, Clone, Copy, Default)]
pub struct ObjLoader;

impl ObjLoader {
    pub fn new() -> Self {
        Self
    }

    fn options() -> tobj::LoadOptions {
        tobj::LoadOptions {
            single_index: false,
            triangulate: true,
            ignore_points: true,
            ignore_lines: true,
            ..Default::default()
        }
    }
}

impl MeshLoader for ObjLoader {
    fn load(&self, source: &str) -> Result<MeshData, AssetError> {
        tracing::info!(source, "loading mesh");
        // Materials are not used; a missing .mtl file is not an error here.
        let (models, _materials) =
            tobj::load_obj(Path::new(source), &Self::options()).map_err(|e| AssetError::Obj {
                path: source.to_string(),
                source: e,
            })?;

        let mut corners = Vec::new();
        for model in &models {
            let mesh = &model.mesh;
            if mesh.indices.is_empty() {
                continue;
            }
            if mesh.texcoord_indices.len() != mesh.indices.len() {
                return Err(AssetError::MissingAttribute {
                    path: source.to_string(),
                    attribute: "texcoord",
                });
            }

            for (&pi, &ti) in mesh.indices.iter().zip(&mesh.texcoord_indices) {
                let pi = pi as usize;
                let ti = ti as usize;
                let position = read3(&mesh.positions, pi, source)?;
                let [u, v] = read2(&mesh.texcoords, ti, source)?;
                let color = if mesh.vertex_color.is_empty() {
                    Vertex::WHITE
                } else {
                    read3(&mesh.vertex_color, pi, source)?
                };
                corners.push(Vertex {
                    position,
                    color,
                    tex_coord: [u, 1.0 - v],
                });
            }
        }

        let data = deduplicate(corners);
        tracing::debug!(
            source,
            vertices = data.vertices.len(),
            indices = data.indices.len(),
            "mesh loaded"
        );
        Ok(data)
    }
}

fn read3(values: &[f32], index: usize, source: &str) -> Result<[f32; 3], AssetError> {
    values
        .get(3 * index..3 * index + 3)
        .map(|s| [s[0], s[1], s[2]])
        .ok_or_else(|| AssetError::IndexOutOfRange {
            path: source.to_string(),
            index,
            len: values.len() / 3,
        })
}

fn read2(values: &[f32], index: usize, source: &str) -> Result<[f32; 2], AssetError> {
    values
        .get(2 * index..2 * index + 2)
        .map(|s| [s[0], s[1]])
        .ok_or_else(|| AssetError::IndexOutOfRange {
            path: source.to_string(),
            index,
            len: values.len() / 2,
        })
}
