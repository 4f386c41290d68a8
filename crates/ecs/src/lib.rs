//! Minimal entity-component model.
//!
//! Entities are plain numeric ids. Each entity owns at most one
//! [`EntityRecord`], a fixed two-slot record holding an optional
//! [`RenderComponent`] and an optional [`TransformComponent`].
//!
//! # Invariants
//! - Entity ids are handed out in ascending order and never reused.
//! - Entities are never destroyed; records persist for the world's lifetime.
//! - Iteration order over entities is ascending id (BTreeSet).
//! - Adding a component of a kind already present replaces it.
//! - Adding a component to an id the world never allocated creates a record
//!   but does not make the id live.

mod component;
mod world;

pub use component::{
    Component, ComponentKind, ComponentSlot, EntityRecord, RenderComponent, TransformComponent,
};
pub use world::World;

use meshscene_common::EntityId;

/// Errors from entity registry operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EcsError {
    #[error("entity {0} has no component record")]
    NoRecord(EntityId),
}

pub fn crate_info() -> &'static str {
    "meshscene-ecs v0.1.0"
}
