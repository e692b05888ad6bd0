use glam::Mat4;

use crate::coords::{ColorRgba, Vec2};
use crate::error::Result;
use crate::gfx::{Backend, BlendMode};

use super::{FanBatch, Sector};

/// Filled and outlined ellipses, one fan instance each.
pub struct EllipseRenderer<B: Backend> {
    fans: FanBatch<B>,
}

impl<B: Backend> EllipseRenderer<B> {
    pub fn new(backend: &B, capacity: usize, segments: u32) -> Result<Self> {
        Ok(Self { fans: FanBatch::new(backend, "ellipses", capacity, segments)? })
    }

    pub fn begin(&mut self, view_projection: Mat4, blend: BlendMode) {
        self.fans.begin(view_projection, blend);
    }

    pub fn fill(&mut self, pass: &mut B::Pass<'_>, center: Vec2, radii: Vec2, color: ColorRgba) {
        self.fans.push(pass, &Sector::ellipse(center, radii), color);
    }

    pub fn fill_circle(&mut self, pass: &mut B::Pass<'_>, center: Vec2, radius: f32, color: ColorRgba) {
        self.fill(pass, center, Vec2::new(radius, radius), color);
    }

    /// Ring of `width` along the inside of the ellipse.
    pub fn stroke(&mut self, pass: &mut B::Pass<'_>, center: Vec2, radii: Vec2, width: f32, color: ColorRgba) {
        let inner = Vec2::new((radii.x - width).max(0.0), (radii.y - width).max(0.0));
        self.fans.push(pass, &Sector::ellipse(center, radii).with_inner(inner), color);
    }

    /// Fill inset by the stroke width, plus the ring.
    pub fn fill_stroke(
        &mut self,
        pass: &mut B::Pass<'_>,
        center: Vec2,
        radii: Vec2,
        fill: ColorRgba,
        stroke: ColorRgba,
        width: f32,
    ) {
        let inner = Vec2::new((radii.x - width).max(0.0), (radii.y - width).max(0.0));
        self.fill(pass, center, inner, fill);
        self.stroke(pass, center, radii, width, stroke);
    }

    /// Pie slice from `start` through `sweep` radians.
    pub fn arc(&mut self, pass: &mut B::Pass<'_>, center: Vec2, radius: f32, start: f32, sweep: f32, color: ColorRgba) {
        self.fans.push(pass, &Sector::new(center, radius, start, sweep), color);
    }

    pub fn pending(&self) -> usize {
        self.fans.pending()
    }

    pub fn flush(&mut self, pass: &mut B::Pass<'_>) {
        self.fans.flush(pass);
    }

    pub fn destroy(&mut self) {
        self.fans.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::recording::RecordingBackend;

    #[test]
    fn ellipses_batch_into_one_instanced_draw() {
        let backend = RecordingBackend::new();
        let mut ellipses = EllipseRenderer::new(&backend, 16, 25).unwrap();
        ellipses.begin(Mat4::IDENTITY, BlendMode::Alpha);
        for i in 0..5 {
            ellipses.fill_circle(&mut (), Vec2::new(i as f32 * 10.0, 0.0), 4.0, ColorRgba::white());
        }
        ellipses.stroke(&mut (), Vec2::zero(), Vec2::new(8.0, 4.0), 10.0, ColorRgba::black());
        ellipses.flush(&mut ());

        let draws = backend.draws();
        assert_eq!(draws, vec![("ellipses".to_string(), 25 * 6, 6)]);
        let data = &backend.uploads()[0].1;
        // Stroke wider than the radii collapses the inner rim to the center.
        assert_eq!(&data[5 * 12 + 4..5 * 12 + 6], &[0.0, 0.0]);
    }
}
