//! Instanced primitive renderers.
//!
//! Every primitive reduces to two instance kinds over constant base meshes:
//! arbitrary quads ([`QuadBatch`]) and elliptical sectors or rings
//! ([`FanBatch`]). Lines, rounded rects and ellipses are tessellated on the
//! CPU into those instances and batched like sprites.

mod cap;
mod ellipse;
mod fan;
mod join;
mod line;
mod quad;
mod rect;

pub use cap::{CapBuilder, CapSite, LineCap, NoCap, RoundCap, SquareCap};
pub use ellipse::EllipseRenderer;
pub use fan::{fan_mesh, FanBatch, Sector, FAN_BASE_LAYOUT, FAN_INSTANCE_LAYOUT};
pub use join::{BevelJoin, JoinBuilder, JoinSite, LineJoin, MiterJoin, RoundJoin};
pub use line::{tessellate, LineRenderer, LineStyle};
pub use quad::{QuadBatch, QUAD_BASE_LAYOUT, QUAD_INSTANCE_LAYOUT};
pub use rect::{decompose, stroke_parts, RectParts, RectRenderer, RectStyle};

use glam::Mat4;

use crate::coords::{ColorRgba, Rect, Vec2};
use crate::error::Result;
use crate::gfx::{Backend, BlendMode};

/// A tessellated piece of a primitive.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Primitive {
    /// Corners in winding order.
    Quad([Vec2; 4]),
    Fan(Sector),
}

impl Primitive {
    /// A triangle as a quad with a repeated last corner.
    pub fn triangle(a: Vec2, b: Vec2, c: Vec2) -> Self {
        Primitive::Quad([a, b, c, c])
    }
}

/// A quad batch and a fan batch that flush in submission order.
///
/// Each draw call is opened with [`PrimitiveBatch::start_draw`]. Pending
/// fans only ever belong to the open draw, so flushing quads before fans
/// never paints an earlier draw over a later one. Pieces of one draw may
/// land in either order.
pub(crate) struct PrimitiveBatch<B: Backend> {
    quads: QuadBatch<B>,
    fans: FanBatch<B>,
}

impl<B: Backend> PrimitiveBatch<B> {
    pub fn new(backend: &B, labels: [&str; 2], capacity: usize, segments: u32) -> Result<Self> {
        let [quad_label, fan_label] = labels;
        Ok(Self {
            quads: QuadBatch::new(backend, quad_label, capacity)?,
            fans: FanBatch::new(backend, fan_label, capacity, segments)?,
        })
    }

    pub fn begin(&mut self, view_projection: Mat4, blend: BlendMode) {
        self.quads.begin(view_projection, blend);
        self.fans.begin(view_projection, blend);
    }

    /// Flushes earlier draws if any of their fans are still pending.
    pub fn start_draw(&mut self, pass: &mut B::Pass<'_>) {
        if self.fans.pending() > 0 {
            self.flush(pass);
        }
    }

    pub fn push(&mut self, pass: &mut B::Pass<'_>, primitive: &Primitive, color: ColorRgba) {
        match primitive {
            Primitive::Quad(corners) => self.quads.push(pass, *corners, color),
            Primitive::Fan(sector) => self.push_fan(pass, sector, color),
        }
    }

    /// Axis-aligned rect; empty rects are skipped.
    pub fn push_rect(&mut self, pass: &mut B::Pass<'_>, rect: Rect, color: ColorRgba) {
        self.quads.push_rect(pass, rect, color);
    }

    pub fn push_fan(&mut self, pass: &mut B::Pass<'_>, sector: &Sector, color: ColorRgba) {
        // The fan batch is about to flush at capacity; quads of earlier draws go first.
        if self.fans.pending() + 1 >= self.fans.capacity() {
            self.quads.flush(pass);
        }
        self.fans.push(pass, sector, color);
    }

    pub fn pending(&self) -> usize {
        self.quads.pending() + self.fans.pending()
    }

    pub fn flush(&mut self, pass: &mut B::Pass<'_>) {
        self.quads.flush(pass);
        self.fans.flush(pass);
    }

    pub fn destroy(&mut self) {
        self.quads.destroy();
        self.fans.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::recording::RecordingBackend;

    #[test]
    fn full_fan_batch_flushes_pending_quads_first() {
        let backend = RecordingBackend::new();
        let mut batch = PrimitiveBatch::new(&backend, ["q", "f"], 2, 4).unwrap();
        batch.begin(Mat4::IDENTITY, BlendMode::Alpha);
        let red = ColorRgba::new(1.0, 0.0, 0.0, 1.0);
        let dot = Sector::new(Vec2::new(5.0, 5.0), 2.0, 0.0, 1.0);

        batch.start_draw(&mut ());
        batch.push_rect(&mut (), Rect::new(0.0, 0.0, 10.0, 10.0), red);
        batch.push_fan(&mut (), &dot, red);
        batch.push_fan(&mut (), &dot, red);
        assert_eq!(batch.pending(), 0);
        let labels: Vec<String> = backend.draws().into_iter().map(|d| d.0).collect();
        assert_eq!(labels, vec!["q", "f"]);
    }

    #[test]
    fn quads_only_draws_keep_batching() {
        let backend = RecordingBackend::new();
        let mut batch = PrimitiveBatch::new(&backend, ["q", "f"], 16, 4).unwrap();
        batch.begin(Mat4::IDENTITY, BlendMode::Alpha);
        for i in 0..3 {
            batch.start_draw(&mut ());
            batch.push_rect(&mut (), Rect::new(i as f32, 0.0, 1.0, 1.0), ColorRgba::white());
        }
        batch.flush(&mut ());
        assert_eq!(backend.draws(), vec![("q".to_string(), 6, 3)]);
    }
}
