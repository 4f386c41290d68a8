//! Mesh assets: loading, vertex deduplication and the shared mesh cache.
//!
//! Meshes are identified by their source key (a file path). The renderer and
//! the entity registry consume meshes through `Rc<Mesh>` handed out by the
//! [`MeshCache`], never by re-reading files.
//!
//! # Invariants
//! - At most one mesh is ever materialized per distinct source key.
//! - A failed load never populates the cache.
//! - A mesh's vertex list holds no structurally equal duplicates and every
//!   index refers to an existing vertex.
//!
//! The cache is single-writer: `Rc` keeps it `!Send`, so all loads happen on
//! the thread that owns it.

mod cache;
pub mod dedup;
mod loader;
mod mesh;

pub use cache::MeshCache;
pub use loader::{MeshLoader, ObjLoader};
pub use mesh::{Mesh, MeshData, MeshSummary, Vertex};

/// Errors from mesh loading.
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse OBJ {path}: {source}")]
    Obj {
        path: String,
        #[source]
        source: tobj::LoadError,
    },
    #[error("{path}: mesh has faces but no {attribute} data")]
    MissingAttribute {
        path: String,
        attribute: &'static str,
    },
    #[error("{path}: index {index} out of range ({len} entries)")]
    IndexOutOfRange {
        path: String,
        index: usize,
        len: usize,
    },
}

pub fn crate_info() -> &'static str {
    "meshscene-assets v0.1.0"
}
