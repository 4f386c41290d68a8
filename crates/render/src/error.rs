use crate::backend::BufferKind;
use crate::renderer::RendererState;
use std::path::PathBuf;

/// Errors from renderer initialization, buffer management and drawing.
///
/// All of these are fatal for the operation that raised them.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("failed to read shader {path}: {source}")]
    ShaderRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid SPIR-V in {path}: {reason}")]
    InvalidShader { path: PathBuf, reason: String },
    #[error("pipeline creation failed: {0}")]
    Pipeline(String),
    #[error("failed to allocate {kind:?} buffer '{label}' ({size} bytes): {reason}")]
    BufferAllocation {
        label: String,
        size: u64,
        kind: BufferKind,
        reason: String,
    },
    #[error("failed to write buffer '{label}': {reason}")]
    BufferWrite { label: String, reason: String },
    #[error("buffer copy failed: {0}")]
    BufferCopy(String),
    #[error("draw failed: {0}")]
    Draw(String),
    #[error("renderer is {0:?}, expected Ready")]
    NotReady(RendererState),
}
