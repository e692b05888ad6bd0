use glam::Mat4;

use crate::error::{GfxError, Result};
use crate::gfx::{
    Backend, BlendMode, BufferContents, BufferDesc, BufferLayout, DrawMode, DrawParams, GeometryBuffer,
    GeometryDesc, IndexData, ProgramDesc, ShaderProgram, ShaderSource, UseParams,
};

use super::{Accumulator, BatchStats};

/// Construction parameters for an [`InstancedBatch`].
#[derive(Debug, Clone, Copy)]
pub struct InstancedDesc<'a> {
    /// Geometry and program label.
    pub label: &'a str,
    /// Base mesh, uploaded once into buffer 0.
    pub base: &'a [f32],
    /// Per-vertex layout of `base`.
    pub base_layout: BufferLayout,
    /// Triangle list over the base mesh; `None` draws `base` in order.
    pub indices: Option<&'a [u16]>,
    /// Per-instance record layout for buffer 1.
    pub instance_layout: BufferLayout,
    /// Instances per draw call. Must be non-zero.
    pub capacity: usize,
    /// Shader text for each backend the batch may run on.
    pub source: ShaderSource<'a>,
}

/// Instanced renderer over a constant base mesh.
///
/// Each `push` writes one instance record; a flush uploads the written range
/// into the instance buffer and draws the base mesh once per instance.
pub struct InstancedBatch<B: Backend> {
    label: String,
    program: B::Program,
    geometry: B::Geometry,
    acc: Accumulator,
    view_projection: Mat4,
    blend: BlendMode,
    stats: BatchStats,
}

impl<B: Backend> InstancedBatch<B> {
    pub fn new(backend: &B, desc: &InstancedDesc<'_>) -> Result<Self> {
        if desc.capacity == 0 {
            return Err(GfxError::Config(format!("{}: capacity must be non-zero", desc.label)));
        }
        let stride = desc.instance_layout.stride_floats();
        let base_vertices = desc.base.len() / desc.base_layout.stride_floats().max(1);
        let count = desc.indices.map_or(base_vertices, <[u16]>::len) as u32;

        let buffers = [
            BufferDesc { layout: desc.base_layout, contents: BufferContents::Immutable(desc.base) },
            BufferDesc { layout: desc.instance_layout, contents: BufferContents::Empty(desc.capacity * stride) },
        ];
        let geometry = backend.create_geometry(&GeometryDesc {
            label: desc.label,
            buffers: &buffers,
            indices: desc.indices.map(IndexData::U16),
            mode: DrawMode::Triangles,
            count,
            feedback: false,
        })?;
        let layouts = [desc.base_layout, desc.instance_layout];
        let program = backend.create_program(&ProgramDesc::new(desc.label, desc.source, &layouts))?;

        log::debug!("{} batch ready on {} (capacity {}, {count} base elements)", desc.label, B::NAME, desc.capacity);

        Ok(Self {
            label: desc.label.to_string(),
            program,
            geometry,
            acc: Accumulator::new(stride, desc.capacity),
            view_projection: Mat4::IDENTITY,
            blend: BlendMode::Alpha,
            stats: BatchStats::default(),
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Instances written and not yet flushed.
    #[inline]
    pub fn pending(&self) -> usize {
        self.acc.len()
    }

    /// Instances per draw; the push that reaches it flushes.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.acc.capacity()
    }

    #[inline]
    pub fn stride(&self) -> usize {
        self.acc.stride()
    }

    pub fn stats(&self) -> BatchStats {
        self.stats
    }

    pub fn program_mut(&mut self) -> &mut B::Program {
        &mut self.program
    }

    pub fn begin(&mut self, view_projection: Mat4, blend: BlendMode) {
        self.acc.clear();
        self.view_projection = view_projection;
        self.blend = blend;
        self.stats = BatchStats::default();
    }

    /// Changes blend state, flushing pending instances drawn under the old one.
    pub fn set_blend(&mut self, pass: &mut B::Pass<'_>, blend: BlendMode) {
        if blend != self.blend {
            self.flush(pass);
            self.blend = blend;
        }
    }

    /// Appends one instance record; flushes when the buffer fills.
    pub fn push(&mut self, pass: &mut B::Pass<'_>, instance: &[f32]) {
        self.acc.push_slice(instance);
        if self.acc.is_full() {
            self.flush(pass);
        }
    }

    pub fn flush(&mut self, pass: &mut B::Pass<'_>) {
        if self.acc.is_empty() {
            return;
        }
        let count = self.acc.len();

        self.geometry.bind(pass);
        self.geometry.bind_buffer(1);
        self.geometry.buffer_sub_data(pass, self.acc.as_slice());
        self.program.use_program(pass, &UseParams::new(self.view_projection).blend(self.blend));
        self.geometry.draw(pass, DrawParams::instanced(count as u32));

        self.stats.flushes += 1;
        self.stats.instances += count;
        self.acc.clear();
    }

    pub fn destroy(&mut self) {
        self.geometry.delete();
        self.program.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::recording::RecordingBackend;
    use crate::gfx::{GlslSource, StepMode, VertexAttribute};

    const BASE: [VertexAttribute; 1] = [VertexAttribute::new(0, 2)];
    const INSTANCE: [VertexAttribute; 2] = [VertexAttribute::new(1, 2), VertexAttribute::new(2, 4)];

    fn batch(backend: &RecordingBackend, capacity: usize) -> InstancedBatch<RecordingBackend> {
        let base = [0.0, 0.0, 1.0, 0.0, 1.0, 1.0];
        InstancedBatch::new(
            backend,
            &InstancedDesc {
                label: "tri",
                base: &base,
                base_layout: BufferLayout::new(StepMode::Vertex, &BASE),
                indices: None,
                instance_layout: BufferLayout::new(StepMode::Instance, &INSTANCE),
                capacity,
                source: ShaderSource { glsl: Some(GlslSource { vertex: "", fragment: "" }), wgsl: None },
            },
        )
        .unwrap()
    }

    #[test]
    fn flushes_instance_buffer_at_capacity() {
        let backend = RecordingBackend::new();
        let mut tri = batch(&backend, 3);
        tri.begin(Mat4::IDENTITY, BlendMode::Alpha);
        for i in 0..7 {
            tri.push(&mut (), &[i as f32, 0.0, 1.0, 1.0, 1.0, 1.0]);
        }
        tri.flush(&mut ());

        let draws = backend.draws();
        let instances: Vec<u32> = draws.iter().map(|d| d.2).collect();
        assert_eq!(instances, vec![3, 3, 1]);
        assert!(draws.iter().all(|d| d.1 == 3), "base mesh count is used for every draw");
        assert_eq!(backend.uploads()[2].1.len(), 6);
        assert_eq!(tri.stats().instances, 7);
    }

    #[test]
    fn blend_change_flushes_pending() {
        let backend = RecordingBackend::new();
        let mut tri = batch(&backend, 8);
        tri.begin(Mat4::IDENTITY, BlendMode::Alpha);
        tri.push(&mut (), &[0.0; 6]);
        tri.set_blend(&mut (), BlendMode::Additive);
        tri.push(&mut (), &[0.0; 6]);
        tri.flush(&mut ());
        assert_eq!(backend.draws().len(), 2);
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let backend = RecordingBackend::new();
        let base = [0.0; 2];
        let err = InstancedBatch::<RecordingBackend>::new(
            &backend,
            &InstancedDesc {
                label: "none",
                base: &base,
                base_layout: BufferLayout::new(StepMode::Vertex, &BASE),
                indices: None,
                instance_layout: BufferLayout::new(StepMode::Instance, &INSTANCE),
                capacity: 0,
                source: ShaderSource::default(),
            },
        );
        assert!(matches!(err, Err(GfxError::Config(_))));
    }
}
