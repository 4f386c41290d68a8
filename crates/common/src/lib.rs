//! Identifiers shared between the asset cache, the entity registry and the renderer.

mod types;

pub use types::{EntityId, MeshId};
