//! Rendering adapter: renderer-agnostic frame loop over a [`GpuBackend`].
//!
//! [`FrameRenderer`] walks the entity registry each frame, lazily uploads
//! mesh geometry into device-local buffers through a staging buffer, and
//! hands the backend one indexed draw per drawable entity.
//!
//! # Invariants
//! - The renderer never mutates the world or the mesh cache.
//! - GPU buffers are owned by the renderer that created them, keyed by mesh id.
//! - A mesh is uploaded at most once per renderer until its buffers are destroyed.
//! - Release is idempotent: every handle is taken before it is freed.
//!
//! [`HeadlessBackend`] implements the backend trait in memory for tests and
//! for the CLI; the wgpu implementation lives in `meshscene-render-wgpu`.

mod backend;
mod config;
mod error;
mod headless;
mod renderer;
mod shader;

pub use backend::{BufferDesc, BufferKind, DrawCall, Frame, GpuBackend};
pub use config::RendererConfig;
pub use error::RenderError;
pub use headless::{HeadlessBackend, HeadlessBuffer, HeadlessCounters, RecordedDraw, RecordedFrame};
pub use renderer::{FrameRenderer, FrameStats, MeshBuffers, RendererState};
pub use shader::{SPIRV_MAGIC, ShaderCode};

pub fn crate_info() -> &'static str {
    "meshscene-render v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("render"));
    }
}
