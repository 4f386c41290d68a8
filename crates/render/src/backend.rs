use crate::RenderError;
use crate::shader::ShaderCode;
use glam::Mat4;
use meshscene_common::{EntityId, MeshId};

/// What a buffer is used for, which also fixes where it lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferKind {
    /// Host-visible transfer source, written by the CPU and freed after the copy.
    Staging,
    /// Device-local vertex buffer, filled by a copy.
    Vertex,
    /// Device-local index buffer (`u32` indices), filled by a copy.
    Index,
}

impl BufferKind {
    pub fn is_host_visible(self) -> bool {
        matches!(self, BufferKind::Staging)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BufferDesc<'a> {
    pub label: &'a str,
    pub size: u64,
    pub kind: BufferKind,
}

/// One indexed draw of a whole mesh.
#[derive(Debug)]
pub struct DrawCall<'a, B> {
    pub entity: EntityId,
    pub mesh: MeshId,
    pub vertex_buffer: &'a B,
    pub index_buffer: &'a B,
    pub index_count: u32,
    /// Pushed as the vertex-stage push constant before the draw.
    pub model: Mat4,
}

/// Everything a backend needs to record one frame.
#[derive(Debug)]
pub struct Frame<'a, B> {
    pub clear_color: [f64; 4],
    pub draws: Vec<DrawCall<'a, B>>,
}

/// The explicit GPU context a [`FrameRenderer`](crate::FrameRenderer) drives.
///
/// Implementations own the device, queue and command submission. Buffer
/// handles are plain values; whoever holds one is responsible for passing it
/// back to [`destroy_buffer`](Self::destroy_buffer).
pub trait GpuBackend {
    type Buffer;
    /// Per-frame render target (a surface texture view on wgpu).
    type Target;

    /// Build the fixed mesh pipeline from two SPIR-V modules.
    fn create_pipeline(
        &mut self,
        vertex: &ShaderCode,
        fragment: &ShaderCode,
    ) -> Result<(), RenderError>;

    fn release_pipeline(&mut self);

    /// (Re)create size-dependent resources for a `width` x `height` surface.
    fn create_swap_chain_resources(&mut self, width: u32, height: u32) -> Result<(), RenderError>;

    fn release_swap_chain_resources(&mut self);

    fn create_buffer(&mut self, desc: &BufferDesc<'_>) -> Result<Self::Buffer, RenderError>;

    /// Fill a host-visible buffer from the CPU.
    fn write_buffer(&mut self, buffer: &Self::Buffer, data: &[u8]) -> Result<(), RenderError>;

    /// Copy `size` bytes with a one-shot submission and block until the
    /// queue is idle.
    fn copy_buffer(
        &mut self,
        src: &Self::Buffer,
        dst: &Self::Buffer,
        size: u64,
    ) -> Result<(), RenderError>;

    fn destroy_buffer(&mut self, buffer: Self::Buffer);

    /// Clear `target` and record every draw in `frame`, then submit.
    fn draw_frame(
        &mut self,
        target: &Self::Target,
        frame: &Frame<'_, Self::Buffer>,
    ) -> Result<(), RenderError>;
}
