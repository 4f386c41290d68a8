use crate::RenderError;
use crate::backend::{BufferDesc, BufferKind, Frame, GpuBackend};
use crate::shader::ShaderCode;
use glam::Mat4;
use meshscene_common::{EntityId, MeshId};
use std::collections::BTreeMap;
use std::fmt;

/// Handle to an in-memory buffer. Deliberately not `Clone`: it must be
/// handed back to [`GpuBackend::destroy_buffer`] exactly once.
#[derive(Debug, PartialEq, Eq)]
pub struct HeadlessBuffer {
    id: u64,
    size: u64,
    kind: BufferKind,
}

impl HeadlessBuffer {
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn kind(&self) -> BufferKind {
        self.kind
    }
}

#[derive(Debug)]
struct Allocation {
    label: String,
    kind: BufferKind,
    data: Vec<u8>,
}

/// Running totals since the backend was created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeadlessCounters {
    /// Device-local buffers created (staging not included).
    pub buffers_created: usize,
    pub staging_created: usize,
    /// Buffers of any kind destroyed.
    pub buffers_destroyed: usize,
    pub copies: usize,
    pub frames: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedDraw {
    pub entity: EntityId,
    pub mesh: MeshId,
    pub index_count: u32,
    pub model: Mat4,
}

/// What one [`GpuBackend::draw_frame`] call asked for.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedFrame {
    pub clear_color: [f64; 4],
    pub draws: Vec<RecordedDraw>,
}

impl fmt::Display for RecordedFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b, a] = self.clear_color;
        writeln!(f, "=== Frame (draws={}) ===", self.draws.len())?;
        writeln!(f, "Clear: ({r:.2}, {g:.2}, {b:.2}, {a:.2})")?;
        for draw in &self.draws {
            let p = draw.model.w_axis;
            writeln!(
                f,
                "  [{}] {} indices={} pos=({:.2}, {:.2}, {:.2})",
                draw.entity, draw.mesh, draw.index_count, p.x, p.y, p.z
            )?;
        }
        Ok(())
    }
}

/// In-memory [`GpuBackend`].
///
/// Buffers are byte vectors, copies are memcpys and frames are recorded
/// rather than rasterized. An optional memory budget makes allocation
/// failures reproducible.
#[derive(Debug, Default)]
pub struct HeadlessBackend {
    allocations: BTreeMap<u64, Allocation>,
    next_buffer: u64,
    memory_budget: Option<u64>,
    pipeline: bool,
    extent: Option<(u32, u32)>,
    counters: HeadlessCounters,
    frames: Vec<RecordedFrame>,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail any allocation that would push live bytes above `bytes`.
    pub fn with_memory_budget(bytes: u64) -> Self {
        Self {
            memory_budget: Some(bytes),
            ..Self::default()
        }
    }

    pub fn has_pipeline(&self) -> bool {
        self.pipeline
    }

    pub fn extent(&self) -> Option<(u32, u32)> {
        self.extent
    }

    pub fn counters(&self) -> HeadlessCounters {
        self.counters
    }

    pub fn live_buffers(&self) -> usize {
        self.allocations.len()
    }

    pub fn live_staging_buffers(&self) -> usize {
        self.allocations
            .values()
            .filter(|a| a.kind == BufferKind::Staging)
            .count()
    }

    pub fn allocated_bytes(&self) -> u64 {
        self.allocations.values().map(|a| a.data.len() as u64).sum()
    }

    pub fn buffer_contents(&self, buffer: &HeadlessBuffer) -> Option<&[u8]> {
        self.allocations.get(&buffer.id).map(|a| a.data.as_slice())
    }

    pub fn frames(&self) -> &[RecordedFrame] {
        &self.frames
    }

    pub fn last_frame(&self) -> Option<&RecordedFrame> {
        self.frames.last()
    }

    fn allocation(&self, buffer: &HeadlessBuffer) -> Result<&Allocation, String> {
        self.allocations
            .get(&buffer.id)
            .ok_or_else(|| format!("buffer #{} is not live", buffer.id))
    }
}

impl GpuBackend for HeadlessBackend {
    type Buffer = HeadlessBuffer;
    type Target = ();

    fn create_pipeline(
        &mut self,
        vertex: &ShaderCode,
        fragment: &ShaderCode,
    ) -> Result<(), RenderError> {
        if self.pipeline {
            return Err(RenderError::Pipeline("pipeline already exists".into()));
        }
        tracing::debug!(
            vertex_words = vertex.words().len(),
            fragment_words = fragment.words().len(),
            "headless pipeline created"
        );
        self.pipeline = true;
        Ok(())
    }

    fn release_pipeline(&mut self) {
        self.pipeline = false;
    }

    fn create_swap_chain_resources(&mut self, width: u32, height: u32) -> Result<(), RenderError> {
        self.extent = Some((width, height));
        Ok(())
    }

    fn release_swap_chain_resources(&mut self) {
        self.extent = None;
    }

    fn create_buffer(&mut self, desc: &BufferDesc<'_>) -> Result<HeadlessBuffer, RenderError> {
        let fail = |reason: String| RenderError::BufferAllocation {
            label: desc.label.to_string(),
            size: desc.size,
            kind: desc.kind,
            reason,
        };
        if desc.size == 0 {
            return Err(fail("zero-size allocation".into()));
        }
        if let Some(budget) = self.memory_budget {
            let live = self.allocated_bytes();
            if live + desc.size > budget {
                return Err(fail(format!(
                    "out of memory: {live} of {budget} bytes in use"
                )));
            }
        }
        let len = usize::try_from(desc.size).map_err(|e| fail(e.to_string()))?;

        let id = self.next_buffer;
        self.next_buffer += 1;
        self.allocations.insert(
            id,
            Allocation {
                label: desc.label.to_string(),
                kind: desc.kind,
                data: vec![0; len],
            },
        );
        if desc.kind == BufferKind::Staging {
            self.counters.staging_created += 1;
        } else {
            self.counters.buffers_created += 1;
        }
        Ok(HeadlessBuffer {
            id,
            size: desc.size,
            kind: desc.kind,
        })
    }

    fn write_buffer(&mut self, buffer: &HeadlessBuffer, data: &[u8]) -> Result<(), RenderError> {
        let allocation = self.allocations.get_mut(&buffer.id).ok_or_else(|| {
            RenderError::BufferWrite {
                label: format!("#{}", buffer.id),
                reason: "buffer is not live".into(),
            }
        })?;
        let fail = |reason: String| RenderError::BufferWrite {
            label: allocation.label.clone(),
            reason,
        };
        if !allocation.kind.is_host_visible() {
            return Err(fail(format!("{:?} buffer is not host visible", allocation.kind)));
        }
        if data.len() > allocation.data.len() {
            return Err(fail(format!(
                "{} bytes do not fit in {}",
                data.len(),
                allocation.data.len()
            )));
        }
        allocation.data[..data.len()].copy_from_slice(data);
        Ok(())
    }

    fn copy_buffer(
        &mut self,
        src: &HeadlessBuffer,
        dst: &HeadlessBuffer,
        size: u64,
    ) -> Result<(), RenderError> {
        let len = usize::try_from(size).map_err(|e| RenderError::BufferCopy(e.to_string()))?;
        let bytes = {
            let source = self.allocation(src).map_err(RenderError::BufferCopy)?;
            source
                .data
                .get(..len)
                .ok_or_else(|| {
                    RenderError::BufferCopy(format!("{size} bytes exceed source '{}'", source.label))
                })?
                .to_vec()
        };
        let target = self
            .allocations
            .get_mut(&dst.id)
            .ok_or_else(|| RenderError::BufferCopy(format!("buffer #{} is not live", dst.id)))?;
        let label = target.label.clone();
        target
            .data
            .get_mut(..len)
            .ok_or_else(|| RenderError::BufferCopy(format!("{size} bytes exceed target '{label}'")))?
            .copy_from_slice(&bytes);
        self.counters.copies += 1;
        Ok(())
    }

    fn destroy_buffer(&mut self, buffer: HeadlessBuffer) {
        if self.allocations.remove(&buffer.id).is_some() {
            self.counters.buffers_destroyed += 1;
        } else {
            tracing::warn!(buffer = buffer.id, "destroying unknown buffer");
        }
    }

    fn draw_frame(&mut self, _target: &(), frame: &Frame<'_, HeadlessBuffer>) -> Result<(), RenderError> {
        if !self.pipeline {
            return Err(RenderError::Draw("no pipeline".into()));
        }
        if self.extent.is_none() {
            return Err(RenderError::Draw("no swap chain resources".into()));
        }

        let mut draws = Vec::with_capacity(frame.draws.len());
        for draw in &frame.draws {
            let vertex = self.allocation(draw.vertex_buffer).map_err(RenderError::Draw)?;
            let index = self.allocation(draw.index_buffer).map_err(RenderError::Draw)?;
            if vertex.kind != BufferKind::Vertex || index.kind != BufferKind::Index {
                return Err(RenderError::Draw(format!(
                    "entity {} bound {:?}/{:?} buffers",
                    draw.entity, vertex.kind, index.kind
                )));
            }
            if u64::from(draw.index_count) * 4 > index.data.len() as u64 {
                return Err(RenderError::Draw(format!(
                    "entity {} draws {} indices from a {}-byte buffer",
                    draw.entity,
                    draw.index_count,
                    index.data.len()
                )));
            }
            draws.push(RecordedDraw {
                entity: draw.entity,
                mesh: draw.mesh,
                index_count: draw.index_count,
                model: draw.model,
            });
        }

        self.frames.push(RecordedFrame {
            clear_color: frame.clear_color,
            draws,
        });
        self.counters.frames += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::DrawCall;

    fn desc(kind: BufferKind, size: u64) -> BufferDesc<'static> {
        BufferDesc {
            label: "test",
            size,
            kind,
        }
    }

    #[test]
    fn staging_write_copy_roundtrip() {
        let mut backend = HeadlessBackend::new();
        let staging = backend.create_buffer(&desc(BufferKind::Staging, 8)).unwrap();
        let vertex = backend.create_buffer(&desc(BufferKind::Vertex, 8)).unwrap();
        backend.write_buffer(&staging, &[1, 2, 3, 4, 5, 6, 7, 8]).unwrap();
        backend.copy_buffer(&staging, &vertex, 8).unwrap();
        assert_eq!(backend.buffer_contents(&vertex).unwrap(), &[1, 2, 3, 4, 5, 6, 7, 8]);
        backend.destroy_buffer(staging);
        assert_eq!(backend.live_staging_buffers(), 0);
        assert_eq!(backend.live_buffers(), 1);
    }

    #[test]
    fn device_local_buffers_reject_cpu_writes() {
        let mut backend = HeadlessBackend::new();
        let vertex = backend.create_buffer(&desc(BufferKind::Vertex, 4)).unwrap();
        let err = backend.write_buffer(&vertex, &[0; 4]).unwrap_err();
        assert!(matches!(err, RenderError::BufferWrite { .. }));
    }

    #[test]
    fn zero_size_and_over_budget_allocations_fail() {
        let mut backend = HeadlessBackend::with_memory_budget(16);
        assert!(backend.create_buffer(&desc(BufferKind::Index, 0)).is_err());
        let _a = backend.create_buffer(&desc(BufferKind::Index, 12)).unwrap();
        let err = backend.create_buffer(&desc(BufferKind::Index, 8)).unwrap_err();
        assert!(matches!(err, RenderError::BufferAllocation { size: 8, .. }));
    }

    #[test]
    fn draw_requires_pipeline_and_live_buffers() {
        let mut backend = HeadlessBackend::new();
        let empty = Frame {
            clear_color: [0.0; 4],
            draws: Vec::new(),
        };
        assert!(backend.draw_frame(&(), &empty).is_err());

        let code = ShaderCode::from_bytes("x.spv", &{
            let mut b = crate::SPIRV_MAGIC.to_le_bytes().to_vec();
            b.extend_from_slice(&[0; 16]);
            b
        })
        .unwrap();
        backend.create_pipeline(&code, &code).unwrap();
        backend.create_swap_chain_resources(4, 4).unwrap();

        let vertex = backend.create_buffer(&desc(BufferKind::Vertex, 32)).unwrap();
        let index = backend.create_buffer(&desc(BufferKind::Index, 12)).unwrap();
        let frame = Frame {
            clear_color: [0.1, 0.2, 0.3, 1.0],
            draws: vec![DrawCall {
                entity: EntityId(7),
                mesh: MeshId(3),
                vertex_buffer: &vertex,
                index_buffer: &index,
                index_count: 3,
                model: Mat4::from_translation(glam::Vec3::new(1.0, 2.0, 3.0)),
            }],
        };
        backend.draw_frame(&(), &frame).unwrap();
        drop(frame);

        let text = backend.last_frame().unwrap().to_string();
        assert!(text.contains("draws=1"));
        assert!(text.contains("[e7] mesh#3 indices=3 pos=(1.00, 2.00, 3.00)"));

        backend.destroy_buffer(index);
        let dangling = HeadlessBuffer {
            id: 99,
            size: 12,
            kind: BufferKind::Index,
        };
        let frame = Frame {
            clear_color: [0.0; 4],
            draws: vec![DrawCall {
                entity: EntityId(7),
                mesh: MeshId(3),
                vertex_buffer: &vertex,
                index_buffer: &dangling,
                index_count: 3,
                model: Mat4::IDENTITY,
            }],
        };
        assert!(matches!(backend.draw_frame(&(), &frame), Err(RenderError::Draw(_))));
    }
}
