use crate::pipeline::{self, PUSH_CONSTANT_SIZE};
use meshscene_render::{BufferDesc, BufferKind, Frame, GpuBackend, RenderError, ShaderCode};

/// A wgpu buffer plus the description it was created from.
#[derive(Debug)]
pub struct WgpuBuffer {
    buffer: wgpu::Buffer,
    label: String,
    kind: BufferKind,
    size: u64,
}

impl WgpuBuffer {
    pub fn raw(&self) -> &wgpu::Buffer {
        &self.buffer
    }

    pub fn kind(&self) -> BufferKind {
        self.kind
    }
}

fn buffer_usage(kind: BufferKind) -> wgpu::BufferUsages {
    match kind {
        BufferKind::Staging => wgpu::BufferUsages::MAP_WRITE | wgpu::BufferUsages::COPY_SRC,
        BufferKind::Vertex => wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        BufferKind::Index => wgpu::BufferUsages::INDEX | wgpu::BufferUsages::COPY_DST,
    }
}

fn aligned(size: u64) -> u64 {
    size.next_multiple_of(wgpu::COPY_BUFFER_ALIGNMENT)
}

/// [`GpuBackend`] over a wgpu device and queue.
///
/// The device and queue are cheap clones of the application's; the surface
/// itself stays with the application, which passes the current texture view
/// as the frame target.
pub struct WgpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    surface_format: wgpu::TextureFormat,
    pipeline: Option<wgpu::RenderPipeline>,
    depth: Option<wgpu::TextureView>,
    live_buffers: usize,
}

impl WgpuBackend {
    pub fn new(device: wgpu::Device, queue: wgpu::Queue, surface_format: wgpu::TextureFormat) -> Self {
        Self {
            device,
            queue,
            surface_format,
            pipeline: None,
            depth: None,
            live_buffers: 0,
        }
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.surface_format
    }

    pub fn live_buffers(&self) -> usize {
        self.live_buffers
    }
}

impl GpuBackend for WgpuBackend {
    type Buffer = WgpuBuffer;
    type Target = wgpu::TextureView;

    fn create_pipeline(
        &mut self,
        vertex: &ShaderCode,
        fragment: &ShaderCode,
    ) -> Result<(), RenderError> {
        let pipeline =
            pipeline::create_mesh_pipeline(&self.device, self.surface_format, vertex, fragment)?;
        self.pipeline = Some(pipeline);
        tracing::debug!(format = ?self.surface_format, "mesh pipeline created");
        Ok(())
    }

    fn release_pipeline(&mut self) {
        self.pipeline.take();
    }

    fn create_swap_chain_resources(&mut self, width: u32, height: u32) -> Result<(), RenderError> {
        self.depth = Some(pipeline::create_depth_texture(&self.device, width, height));
        Ok(())
    }

    fn release_swap_chain_resources(&mut self) {
        self.depth.take();
    }

    fn create_buffer(&mut self, desc: &BufferDesc<'_>) -> Result<WgpuBuffer, RenderError> {
        let size = aligned(desc.size);
        let fail = |reason: String| {
            tracing::error!(
                label = desc.label,
                size = desc.size,
                kind = ?desc.kind,
                %reason,
                "buffer allocation failed"
            );
            RenderError::BufferAllocation {
                label: desc.label.to_string(),
                size: desc.size,
                kind: desc.kind,
                reason,
            }
        };

        if size == 0 {
            return Err(fail("zero-size allocation".into()));
        }
        let max = self.device.limits().max_buffer_size;
        if size > max {
            return Err(fail(format!("exceeds max_buffer_size {max}")));
        }

        self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(desc.label),
            size,
            usage: buffer_usage(desc.kind),
            mapped_at_creation: desc.kind.is_host_visible(),
        });
        let validation = pollster::block_on(self.device.pop_error_scope());
        let out_of_memory = pollster::block_on(self.device.pop_error_scope());
        if let Some(err) = out_of_memory.or(validation) {
            buffer.destroy();
            return Err(fail(err.to_string()));
        }

        self.live_buffers += 1;
        Ok(WgpuBuffer {
            buffer,
            label: desc.label.to_string(),
            kind: desc.kind,
            size,
        })
    }

    fn write_buffer(&mut self, buffer: &WgpuBuffer, data: &[u8]) -> Result<(), RenderError> {
        let fail = |reason: String| RenderError::BufferWrite {
            label: buffer.label.clone(),
            reason,
        };
        if !buffer.kind.is_host_visible() {
            return Err(fail(format!("{:?} buffer is not host visible", buffer.kind)));
        }
        if data.len() as u64 > buffer.size {
            return Err(fail(format!("{} bytes do not fit in {}", data.len(), buffer.size)));
        }
        if !matches!(buffer.buffer.map_state(), wgpu::MapState::Mapped) {
            return Err(fail("staging buffer is no longer mapped".into()));
        }

        buffer.buffer.slice(..).get_mapped_range_mut()[..data.len()].copy_from_slice(data);
        buffer.buffer.unmap();
        Ok(())
    }

    fn copy_buffer(
        &mut self,
        src: &WgpuBuffer,
        dst: &WgpuBuffer,
        size: u64,
    ) -> Result<(), RenderError> {
        let size = aligned(size);
        if size > src.size || size > dst.size {
            return Err(RenderError::BufferCopy(format!(
                "{size} bytes from '{}' ({}) into '{}' ({})",
                src.label, src.size, dst.label, dst.size
            )));
        }

        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("upload_encoder"),
            });
        encoder.copy_buffer_to_buffer(&src.buffer, 0, &dst.buffer, 0, size);
        let submission = self.queue.submit(std::iter::once(encoder.finish()));
        if let Some(err) = pollster::block_on(self.device.pop_error_scope()) {
            return Err(RenderError::BufferCopy(err.to_string()));
        }

        // One-shot transfer: block until the queue has drained it.
        let _ = self
            .device
            .poll(wgpu::Maintain::WaitForSubmissionIndex(submission));
        tracing::trace!(src = %src.label, dst = %dst.label, size, "buffer copied");
        Ok(())
    }

    fn destroy_buffer(&mut self, buffer: WgpuBuffer) {
        buffer.buffer.destroy();
        self.live_buffers = self.live_buffers.saturating_sub(1);
    }

    fn draw_frame(
        &mut self,
        target: &wgpu::TextureView,
        frame: &Frame<'_, WgpuBuffer>,
    ) -> Result<(), RenderError> {
        let pipeline = self
            .pipeline
            .as_ref()
            .ok_or_else(|| RenderError::Draw("no pipeline".into()))?;
        let depth = self
            .depth
            .as_ref()
            .ok_or_else(|| RenderError::Draw("no depth target".into()))?;

        let [r, g, b, a] = frame.clear_color;
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame_encoder"),
            });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("mesh_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color { r, g, b, a }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: depth,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                ..Default::default()
            });

            pass.set_pipeline(pipeline);
            for draw in &frame.draws {
                let model = draw.model.to_cols_array();
                let bytes: &[u8] = bytemuck::cast_slice(&model);
                debug_assert_eq!(bytes.len() as u32, PUSH_CONSTANT_SIZE);
                pass.set_push_constants(wgpu::ShaderStages::VERTEX, 0, bytes);
                pass.set_vertex_buffer(0, draw.vertex_buffer.buffer.slice(..));
                pass.set_index_buffer(draw.index_buffer.buffer.slice(..), wgpu::IndexFormat::Uint32);
                pass.draw_indexed(0..draw.index_count, 0, 0..1);
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usages_match_buffer_kinds() {
        let staging = buffer_usage(BufferKind::Staging);
        assert!(staging.contains(wgpu::BufferUsages::MAP_WRITE | wgpu::BufferUsages::COPY_SRC));
        assert!(!staging.contains(wgpu::BufferUsages::VERTEX));

        assert!(buffer_usage(BufferKind::Vertex).contains(wgpu::BufferUsages::COPY_DST));
        assert!(buffer_usage(BufferKind::Index).contains(wgpu::BufferUsages::INDEX));
    }

    #[test]
    fn sizes_round_up_to_copy_alignment() {
        assert_eq!(aligned(0), 0);
        assert_eq!(aligned(1), 4);
        assert_eq!(aligned(32), 32);
        assert_eq!(aligned(33), 36);
    }
}
