use std::f32::consts::TAU;

use glam::Mat4;

use crate::batch::{BatchStats, InstancedBatch, InstancedDesc};
use crate::coords::{ColorRgba, Vec2};
use crate::error::{GfxError, Result};
use crate::gfx::{Backend, BlendMode, BufferLayout, GlslSource, ShaderSource, StepMode, VertexAttribute};

const BASE_ATTRIBUTES: [VertexAttribute; 1] = [VertexAttribute::new(0, 2)];
const INSTANCE_ATTRIBUTES: [VertexAttribute; 3] = [
    VertexAttribute::new(1, 4), // center, outer radii
    VertexAttribute::new(2, 4), // inner radii, start, sweep
    VertexAttribute::new(3, 4), // color
];

pub const FAN_BASE_LAYOUT: BufferLayout = BufferLayout::new(StepMode::Vertex, &BASE_ATTRIBUTES);
pub const FAN_INSTANCE_LAYOUT: BufferLayout = BufferLayout::new(StepMode::Instance, &INSTANCE_ATTRIBUTES);

const VERT: &str = include_str!("../shaders/fan.vert.glsl");
const FRAG: &str = include_str!("../shaders/color.frag.glsl");
const WGSL: &str = include_str!("../shaders/fan.wgsl");

/// An elliptical sector, optionally hollow.
///
/// Angles are parametric, in radians, measured from +X toward +Y (clockwise
/// on screen). A zero inner radius gives a filled fan.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Sector {
    pub center: Vec2,
    /// Outer radii along X and Y.
    pub radii: Vec2,
    /// Inner radii; zero for a filled sector.
    pub inner: Vec2,
    /// Angle of the first edge.
    pub start: f32,
    /// Signed angular extent; `TAU` closes the ellipse.
    pub sweep: f32,
}

impl Sector {
    pub fn new(center: Vec2, radius: f32, start: f32, sweep: f32) -> Self {
        Self { center, radii: Vec2::new(radius, radius), inner: Vec2::zero(), start, sweep }
    }

    /// Full ellipse.
    pub fn ellipse(center: Vec2, radii: Vec2) -> Self {
        Self { center, radii, inner: Vec2::zero(), start: 0.0, sweep: TAU }
    }

    pub fn with_inner(mut self, inner: Vec2) -> Self {
        self.inner = inner;
        self
    }

    /// Covered area.
    pub fn area(&self) -> f32 {
        0.5 * self.sweep.abs() * (self.radii.x * self.radii.y - self.inner.x * self.inner.y)
    }
}

/// Base mesh for a fan of `segments` slices: `(t, rim)` pairs along the arc,
/// inner rim first, and a triangle list joining consecutive pairs.
pub fn fan_mesh(segments: u32) -> (Vec<f32>, Vec<u16>) {
    let mut vertices = Vec::with_capacity((segments as usize + 1) * 4);
    for i in 0..=segments {
        let t = i as f32 / segments as f32;
        vertices.extend_from_slice(&[t, 0.0, t, 1.0]);
    }
    let mut indices = Vec::with_capacity(segments as usize * 6);
    for i in 0..segments as u16 {
        let (inner, outer) = (2 * i, 2 * i + 1);
        let (next_inner, next_outer) = (inner + 2, outer + 2);
        indices.extend_from_slice(&[inner, outer, next_outer, inner, next_outer, next_inner]);
    }
    (vertices, indices)
}

/// Instanced sectors and rings over a shared fan mesh.
pub struct FanBatch<B: Backend> {
    inner: InstancedBatch<B>,
    segments: u32,
}

impl<B: Backend> FanBatch<B> {
    /// `segments` is the slice count of one instance regardless of sweep.
    pub fn new(backend: &B, label: &str, capacity: usize, segments: u32) -> Result<Self> {
        if segments == 0 || segments > 8192 {
            return Err(GfxError::Config(format!("{label}: fan segments {segments} outside 1..=8192")));
        }
        let (base, indices) = fan_mesh(segments);
        let inner = InstancedBatch::new(
            backend,
            &InstancedDesc {
                label,
                base: &base,
                base_layout: FAN_BASE_LAYOUT,
                indices: Some(&indices),
                instance_layout: FAN_INSTANCE_LAYOUT,
                capacity,
                source: ShaderSource { glsl: Some(GlslSource { vertex: VERT, fragment: FRAG }), wgsl: Some(WGSL) },
            },
        )?;
        Ok(Self { inner, segments })
    }

    pub fn segments(&self) -> u32 {
        self.segments
    }

    pub fn begin(&mut self, view_projection: Mat4, blend: BlendMode) {
        self.inner.begin(view_projection, blend);
    }

    /// Zero-radius sectors are still issued.
    pub fn push(&mut self, pass: &mut B::Pass<'_>, sector: &Sector, color: ColorRgba) {
        let s = sector;
        let instance = [
            s.center.x, s.center.y, s.radii.x, s.radii.y, //
            s.inner.x, s.inner.y, s.start, s.sweep, //
            color.r, color.g, color.b, color.a,
        ];
        self.inner.push(pass, &instance);
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mesh_has_two_triangles_per_segment() {
        let (vertices, indices) = fan_mesh(10);
        assert_eq!(vertices.len(), 11 * 4);
        assert_eq!(indices.len(), 60);
        assert_eq!(*indices.iter().max().unwrap(), 21);
    }

    #[test]
    fn quarter_sector_area() {
        let s = Sector::new(Vec2::zero(), 2.0, 0.0, std::f32::consts::FRAC_PI_2);
        assert!((s.area() - std::f32::consts::PI).abs() < 1e-5);
        let ring = Sector::ellipse(Vec2::zero(), Vec2::new(2.0, 2.0)).with_inner(Vec2::new(1.0, 1.0));
        assert!((ring.area() - 3.0 * std::f32::consts::PI).abs() < 1e-4);
    }
}
