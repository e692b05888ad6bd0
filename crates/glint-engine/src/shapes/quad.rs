use glam::Mat4;

use crate::batch::{BatchStats, InstancedBatch, InstancedDesc};
use crate::coords::{ColorRgba, Rect, Vec2};
use crate::error::Result;
use crate::gfx::{Backend, BlendMode, BufferLayout, GlslSource, ShaderSource, StepMode, VertexAttribute};

const BASE_ATTRIBUTES: [VertexAttribute; 1] = [VertexAttribute::new(0, 4)];
const INSTANCE_ATTRIBUTES: [VertexAttribute; 3] = [
    VertexAttribute::new(1, 4), // corners 0, 1
    VertexAttribute::new(2, 4), // corners 2, 3
    VertexAttribute::new(3, 4), // color
];

pub const QUAD_BASE_LAYOUT: BufferLayout = BufferLayout::new(StepMode::Vertex, &BASE_ATTRIBUTES);
pub const QUAD_INSTANCE_LAYOUT: BufferLayout = BufferLayout::new(StepMode::Instance, &INSTANCE_ATTRIBUTES);

/// One-hot corner weights; the vertex shader sums `corner[i] * weight[i]`.
const BASE: [f32; 16] = [
    1.0, 0.0, 0.0, 0.0, //
    0.0, 1.0, 0.0, 0.0, //
    0.0, 0.0, 1.0, 0.0, //
    0.0, 0.0, 0.0, 1.0,
];
const INDICES: [u16; 6] = [0, 1, 2, 0, 2, 3];

const VERT: &str = include_str!("../shaders/quad.vert.glsl");
const FRAG: &str = include_str!("../shaders/color.frag.glsl");
const WGSL: &str = include_str!("../shaders/quad.wgsl");

/// Solid arbitrary quads, one instance each.
///
/// Corners are given in winding order; a triangle is a quad with its last
/// two corners equal.
pub struct QuadBatch<B: Backend> {
    inner: InstancedBatch<B>,
}

impl<B: Backend> QuadBatch<B> {
    pub fn new(backend: &B, label: &str, capacity: usize) -> Result<Self> {
        let inner = InstancedBatch::new(
            backend,
            &InstancedDesc {
                label,
                base: &BASE,
                base_layout: QUAD_BASE_LAYOUT,
                indices: Some(&INDICES),
                instance_layout: QUAD_INSTANCE_LAYOUT,
                capacity,
                source: ShaderSource { glsl: Some(GlslSource { vertex: VERT, fragment: FRAG }), wgsl: Some(WGSL) },
            },
        )?;
        Ok(Self { inner })
    }

    pub fn begin(&mut self, view_projection: Mat4, blend: BlendMode) {
        self.inner.begin(view_projection, blend);
    }

    pub fn push(&mut self, pass: &mut B::Pass<'_>, corners: [Vec2; 4], color: ColorRgba) {
        let [a, b, c, d] = corners;
        let instance = [a.x, a.y, b.x, b.y, c.x, c.y, d.x, d.y, color.r, color.g, color.b, color.a];
        self.inner.push(pass, &instance);
    }

    /// Axis-aligned rect; empty rects are skipped.
    pub fn push_rect(&mut self, pass: &mut B::Pass<'_>, rect: Rect, color: ColorRgba) {
        if rect.is_empty() {
            return;
        }
        self.push(pass, rect.corners(), color);
    }

    pub fn pending(&self) -> usize {
        self.inner.pending()
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity()
    }

    pub fn stats(&self) -> BatchStats {
        self.inner.stats()
    }

    pub fn flush(&mut self, pass: &mut B::Pass<'_>) {
        self.inner.flush(pass);
    }

    pub fn destroy(&mut self) {
        self.inner.destroy();
    }
}
