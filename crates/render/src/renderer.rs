use crate::RenderError;
use crate::backend::{BufferDesc, BufferKind, DrawCall, Frame, GpuBackend};
use crate::config::RendererConfig;
use crate::shader::ShaderCode;
use glam::Mat4;
use meshscene_assets::Mesh;
use meshscene_common::{EntityId, MeshId};
use meshscene_ecs::{RenderComponent, TransformComponent, World};
use std::collections::BTreeMap;

/// Lifecycle state of a [`FrameRenderer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RendererState {
    Uninitialized,
    Ready,
    Released,
}

/// Device-local buffers for one mesh.
///
/// A side that had no data stays `None`.
#[derive(Debug)]
pub struct MeshBuffers<Buf> {
    pub vertex: Option<Buf>,
    pub index: Option<Buf>,
    pub index_count: u32,
}

impl<Buf> MeshBuffers<Buf> {
    pub fn is_drawable(&self) -> bool {
        self.vertex.is_some() && self.index.is_some() && self.index_count > 0
    }
}

/// Counters for one call to [`FrameRenderer::start_next_frame`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Indexed draws issued.
    pub drawn: usize,
    /// Live entities not drawn (missing component, null or empty mesh).
    pub skipped: usize,
    /// Meshes uploaded during this frame.
    pub uploaded: usize,
}

/// Per-frame entity renderer.
///
/// `Uninitialized -> init_resources -> Ready -> release_resources -> Released`.
/// Frames may only be started while `Ready`. A released renderer can be
/// initialized again.
pub struct FrameRenderer<B: GpuBackend> {
    backend: B,
    config: RendererConfig,
    state: RendererState,
    swap_chain_ready: bool,
    mesh_buffers: BTreeMap<MeshId, MeshBuffers<B::Buffer>>,
}

impl<B: GpuBackend> FrameRenderer<B> {
    pub fn new(backend: B, config: RendererConfig) -> Self {
        Self {
            backend,
            config,
            state: RendererState::Uninitialized,
            swap_chain_ready: false,
            mesh_buffers: BTreeMap::new(),
        }
    }

    pub fn state(&self) -> RendererState {
        self.state
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Load both shaders and build the pipeline.
    ///
    /// Missing or malformed shader files are fatal: the renderer stays in its
    /// current state and the error is returned.
    pub fn init_resources(&mut self) -> Result<(), RenderError> {
        if self.state == RendererState::Ready {
            tracing::debug!("renderer already initialized");
            return Ok(());
        }

        let vertex = ShaderCode::from_file(&self.config.vertex_shader)?;
        let fragment = ShaderCode::from_file(&self.config.fragment_shader)?;
        self.backend.create_pipeline(&vertex, &fragment)?;

        self.state = RendererState::Ready;
        tracing::info!(
            vertex = %self.config.vertex_shader.display(),
            fragment = %self.config.fragment_shader.display(),
            "renderer initialized"
        );
        Ok(())
    }

    pub fn init_swap_chain_resources(&mut self, width: u32, height: u32) -> Result<(), RenderError> {
        if self.swap_chain_ready {
            self.release_swap_chain_resources();
        }
        self.backend.create_swap_chain_resources(width, height)?;
        self.swap_chain_ready = true;
        tracing::debug!(width, height, "swap chain resources created");
        Ok(())
    }

    pub fn release_swap_chain_resources(&mut self) {
        if self.swap_chain_ready {
            self.backend.release_swap_chain_resources();
            self.swap_chain_ready = false;
        }
    }

    /// Render one frame of `world` into `target`.
    ///
    /// Every live entity carrying both a render and a transform component
    /// with a non-empty mesh gets one indexed draw, in ascending entity
    /// order. Mesh buffers are uploaded on first use.
    pub fn start_next_frame(
        &mut self,
        world: &World,
        target: &B::Target,
    ) -> Result<FrameStats, RenderError> {
        if self.state != RendererState::Ready {
            return Err(RenderError::NotReady(self.state));
        }

        let mut stats = FrameStats::default();
        let mut pending: Vec<(EntityId, MeshId, Mat4)> = Vec::new();

        for &entity in world.get_all_entities() {
            if !world.has_component::<RenderComponent>(entity)
                || !world.has_component::<TransformComponent>(entity)
            {
                stats.skipped += 1;
                continue;
            }
            let Ok(record) = world.get_component(entity) else {
                stats.skipped += 1;
                continue;
            };
            let (Some(render), Some(transform)) = (&record.render, &record.transform) else {
                stats.skipped += 1;
                continue;
            };
            let Some(mesh) = &render.mesh else {
                tracing::trace!(%entity, "render component has no mesh");
                stats.skipped += 1;
                continue;
            };

            if self.prepare_mesh(mesh)? {
                stats.uploaded += 1;
            }
            if !self.mesh_buffers.get(&mesh.id()).is_some_and(MeshBuffers::is_drawable) {
                stats.skipped += 1;
                continue;
            }
            pending.push((entity, mesh.id(), transform.model_matrix()));
        }

        let draws: Vec<DrawCall<'_, B::Buffer>> = pending
            .iter()
            .filter_map(|&(entity, mesh, model)| {
                let buffers = self.mesh_buffers.get(&mesh)?;
                Some(DrawCall {
                    entity,
                    mesh,
                    vertex_buffer: buffers.vertex.as_ref()?,
                    index_buffer: buffers.index.as_ref()?,
                    index_count: buffers.index_count,
                    model,
                })
            })
            .collect();

        stats.drawn = draws.len();
        let frame = Frame {
            clear_color: self.config.clear_color,
            draws,
        };
        self.backend.draw_frame(target, &frame)?;

        tracing::trace!(?stats, "frame submitted");
        Ok(stats)
    }

    /// Make sure `mesh` has GPU buffers. Returns true if an upload happened.
    ///
    /// Each side is written to a staging buffer, copied into a device-local
    /// buffer, and the staging buffer freed. Empty sides are left `None`
    /// with a warning. A mesh that already has an entry is never re-uploaded.
    pub fn prepare_mesh(&mut self, mesh: &Mesh) -> Result<bool, RenderError> {
        if self.state != RendererState::Ready {
            return Err(RenderError::NotReady(self.state));
        }
        if self.mesh_buffers.contains_key(&mesh.id()) {
            return Ok(false);
        }

        let vertex = self.upload(mesh, BufferKind::Vertex, mesh.vertex_bytes())?;
        let index = match self.upload(mesh, BufferKind::Index, mesh.index_bytes()) {
            Ok(index) => index,
            Err(e) => {
                if let Some(vertex) = vertex {
                    self.backend.destroy_buffer(vertex);
                }
                return Err(e);
            }
        };

        tracing::debug!(
            mesh = %mesh.id(),
            source = mesh.source(),
            vertices = mesh.vertices().len(),
            indices = mesh.indices().len(),
            "mesh uploaded"
        );
        self.mesh_buffers.insert(
            mesh.id(),
            MeshBuffers {
                vertex,
                index,
                index_count: mesh.indices().len() as u32,
            },
        );
        Ok(true)
    }

    fn upload(
        &mut self,
        mesh: &Mesh,
        kind: BufferKind,
        bytes: &[u8],
    ) -> Result<Option<B::Buffer>, RenderError> {
        if bytes.is_empty() {
            tracing::warn!(
                mesh = %mesh.id(),
                source = mesh.source(),
                "mesh has no {kind:?} data, buffer left empty"
            );
            return Ok(None);
        }

        let size = bytes.len() as u64;
        let staging_label = format!("{}:{kind:?}:staging", mesh.source());
        let staging = self.backend.create_buffer(&BufferDesc {
            label: &staging_label,
            size,
            kind: BufferKind::Staging,
        })?;
        if let Err(e) = self.backend.write_buffer(&staging, bytes) {
            self.backend.destroy_buffer(staging);
            return Err(e);
        }

        let label = format!("{}:{kind:?}", mesh.source());
        let buffer = match self.backend.create_buffer(&BufferDesc { label: &label, size, kind }) {
            Ok(buffer) => buffer,
            Err(e) => {
                self.backend.destroy_buffer(staging);
                return Err(e);
            }
        };
        let copied = self.backend.copy_buffer(&staging, &buffer, size);
        self.backend.destroy_buffer(staging);
        if let Err(e) = copied {
            self.backend.destroy_buffer(buffer);
            return Err(e);
        }

        Ok(Some(buffer))
    }

    /// Free the GPU buffers of `mesh`, if any. Safe to call repeatedly.
    pub fn destroy_mesh_buffers(&mut self, mesh: &Mesh) {
        if let Some(buffers) = self.mesh_buffers.remove(&mesh.id()) {
            self.free(buffers);
        }
    }

    fn free(&mut self, mut buffers: MeshBuffers<B::Buffer>) {
        if let Some(vertex) = buffers.vertex.take() {
            self.backend.destroy_buffer(vertex);
        }
        if let Some(index) = buffers.index.take() {
            self.backend.destroy_buffer(index);
        }
    }

    pub fn is_uploaded(&self, mesh: &Mesh) -> bool {
        self.mesh_buffers.contains_key(&mesh.id())
    }

    pub fn mesh_buffers(&self, mesh: &Mesh) -> Option<&MeshBuffers<B::Buffer>> {
        self.mesh_buffers.get(&mesh.id())
    }

    pub fn uploaded_mesh_count(&self) -> usize {
        self.mesh_buffers.len()
    }

    /// Free all mesh buffers, swap-chain resources and the pipeline.
    ///
    /// Calling this again, or on a renderer that was never initialized, does
    /// nothing.
    pub fn release_resources(&mut self) {
        for (_, buffers) in std::mem::take(&mut self.mesh_buffers) {
            self.free(buffers);
        }
        self.release_swap_chain_resources();
        if self.state == RendererState::Ready {
            self.backend.release_pipeline();
            self.state = RendererState::Released;
            tracing::info!("renderer resources released");
        }
    }
}

impl<B: GpuBackend> Drop for FrameRenderer<B> {
    fn drop(&mut self) {
        self.release_resources();
    }
}
