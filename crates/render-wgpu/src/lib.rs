//! wgpu backend for the mesh renderer.
//!
//! Implements [`GpuBackend`](meshscene_render::GpuBackend) on a caller-owned
//! device and queue: mesh data goes through a mapped staging buffer into
//! device-local vertex/index buffers, and each frame is one render pass with
//! a push-constant model matrix per draw.
//!
//! # Invariants
//! - The device must be created with [`required_features`] and [`required_limits`].
//! - Buffers handed out by the backend are destroyed only through it.

mod backend;
mod pipeline;

pub use backend::{WgpuBackend, WgpuBuffer};
pub use pipeline::{DEPTH_FORMAT, PUSH_CONSTANT_SIZE, required_features, required_limits};
