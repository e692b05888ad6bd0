use glam::Mat4;

use crate::coords::{ColorRgba, Vec2};
use crate::error::Result;
use crate::gfx::{Backend, BlendMode};

use super::cap::{CapSite, LineCap};
use super::join::{BevelJoin, JoinBuilder, JoinSite, LineJoin, MiterJoin, RoundJoin};
use super::{Primitive, PrimitiveBatch};

/// Consecutive points closer than this are merged.
const MIN_SEGMENT: f32 = 1e-4;

/// How a line or polyline is stroked.
#[derive(Debug, Clone)]
pub struct LineStyle {
    /// Full stroke width in logical pixels. Zero or less draws nothing.
    pub width: f32,
    pub color: ColorRgba,
    /// Shape at interior vertices.
    pub join: LineJoin,
    /// Shape at the two ends of an open line.
    pub cap: LineCap,
}

impl LineStyle {
    pub fn new(width: f32, color: ColorRgba) -> Self {
        Self { width, color, join: LineJoin::default(), cap: LineCap::default() }
    }

    pub fn join(mut self, join: LineJoin) -> Self {
        self.join = join;
        self
    }

    pub fn cap(mut self, cap: LineCap) -> Self {
        self.cap = cap;
        self
    }
}

/// Breaks a polyline into segment quads, joins at interior vertices and caps
/// at the two open ends. `closed` joins the last point back to the first and
/// skips caps.
pub fn tessellate(points: &[Vec2], width: f32, join: &LineJoin, cap: LineCap, closed: bool, out: &mut Vec<Primitive>) {
    let mut pts: Vec<Vec2> = Vec::with_capacity(points.len());
    for &p in points {
        if !p.is_finite() {
            continue;
        }
        if pts.last().is_none_or(|last| (p - *last).length() > MIN_SEGMENT) {
            pts.push(p);
        }
    }
    if closed && pts.len() > 2 && (pts[0] - pts[pts.len() - 1]).length() <= MIN_SEGMENT {
        pts.pop();
    }
    if pts.len() < 2 || width <= 0.0 {
        return;
    }
    let closed = closed && pts.len() > 2;
    let half_width = width * 0.5;

    let miter;
    let joiner: &dyn JoinBuilder = match join {
        LineJoin::Round => &RoundJoin,
        LineJoin::Bevel => &BevelJoin,
        LineJoin::Miter { limit } => {
            miter = MiterJoin { limit: *limit };
            &miter
        }
        LineJoin::Custom(custom) => custom.as_ref(),
    };

    let n = pts.len();
    let segments = if closed { n } else { n - 1 };
    for i in 0..segments {
        out.push(segment_quad(pts[i], pts[(i + 1) % n], half_width));
    }

    let interior = if closed { 0..n } else { 1..n - 1 };
    for i in interior {
        let site = JoinSite { prev: pts[(i + n - 1) % n], at: pts[i], next: pts[(i + 1) % n], half_width };
        if !site.is_straight() {
            joiner.build(&site, out);
        }
    }

    if !closed {
        let capper = cap.builder();
        let start = CapSite { at: pts[0], outward: (pts[0] - pts[1]).normalize(), half_width };
        let end = CapSite { at: pts[n - 1], outward: (pts[n - 1] - pts[n - 2]).normalize(), half_width };
        capper.build(&start, out);
        capper.build(&end, out);
    }
}

fn segment_quad(a: Vec2, b: Vec2, half_width: f32) -> Primitive {
    let n = (b - a).normalize().perp() * half_width;
    Primitive::Quad([a + n, b + n, b - n, a - n])
}

/// Polyline renderer: segment quads plus joins and caps.
pub struct LineRenderer<B: Backend> {
    batch: PrimitiveBatch<B>,
    scratch: Vec<Primitive>,
}

impl<B: Backend> LineRenderer<B> {
    pub fn new(backend: &B, capacity: usize, fan_segments: u32) -> Result<Self> {
        Ok(Self {
            batch: PrimitiveBatch::new(backend, ["line segments", "line joins"], capacity, fan_segments)?,
            scratch: Vec::new(),
        })
    }

    pub fn begin(&mut self, view_projection: Mat4, blend: BlendMode) {
        self.batch.begin(view_projection, blend);
    }

    pub fn draw_line(&mut self, pass: &mut B::Pass<'_>, a: Vec2, b: Vec2, style: &LineStyle) {
        self.draw_polyline(pass, &[a, b], style, false);
    }

    pub fn draw_polyline(&mut self, pass: &mut B::Pass<'_>, points: &[Vec2], style: &LineStyle, closed: bool) {
        self.scratch.clear();
        tessellate(points, style.width, &style.join, style.cap, closed, &mut self.scratch);
        if self.scratch.is_empty() {
            return;
        }
        self.batch.start_draw(pass);
        for primitive in &self.scratch {
            self.batch.push(pass, primitive, style.color);
        }
    }

    pub fn pending(&self) -> usize {
        self.batch.pending()
    }

    pub fn flush(&mut self, pass: &mut B::Pass<'_>) {
        self.batch.flush(pass);
    }

    pub fn destroy(&mut self) {
        self.batch.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::recording::RecordingBackend;

    fn pts(raw: &[(f32, f32)]) -> Vec<Vec2> {
        raw.iter().map(|&(x, y)| Vec2::new(x, y)).collect()
    }

    fn counts(out: &[Primitive]) -> (usize, usize) {
        let quads = out.iter().filter(|p| matches!(p, Primitive::Quad(_))).count();
        (quads, out.len() - quads)
    }

    #[test]
    fn open_polyline_has_joins_at_interior_vertices_and_two_caps() {
        let mut out = Vec::new();
        let line = pts(&[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (20.0, 10.0)]);
        tessellate(&line, 2.0, &LineJoin::Round, LineCap::Round, false, &mut out);
        // 3 segments; 2 round joins + 2 round caps.
        assert_eq!(counts(&out), (3, 4));
    }

    #[test]
    fn closed_polyline_wraps_joins_without_caps() {
        let mut out = Vec::new();
        let square = pts(&[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)]);
        tessellate(&square, 2.0, &LineJoin::Bevel, LineCap::Square, true, &mut out);
        // 4 segments + 4 bevel triangles, all quads.
        assert_eq!(counts(&out), (8, 0));
    }

    #[test]
    fn collinear_and_duplicate_points_add_nothing() {
        let mut out = Vec::new();
        let line = pts(&[(0.0, 0.0), (0.0, 0.0), (5.0, 0.0), (10.0, 0.0)]);
        tessellate(&line, 2.0, &LineJoin::Miter { limit: 4.0 }, LineCap::None, false, &mut out);
        assert_eq!(counts(&out), (2, 0));
    }

    #[test]
    fn segment_quad_spans_the_width() {
        let Primitive::Quad(q) = segment_quad(Vec2::new(0.0, 0.0), Vec2::new(4.0, 0.0), 1.5) else {
            panic!("expected a quad");
        };
        assert_eq!(q[0], Vec2::new(0.0, 1.5));
        assert_eq!(q[2], Vec2::new(4.0, -1.5));
    }

    #[test]
    fn custom_join_is_called_per_interior_vertex() {
        use std::cell::Cell;
        use std::rc::Rc;

        struct Counting(Cell<usize>);
        impl JoinBuilder for Counting {
            fn build(&self, _site: &JoinSite, _out: &mut Vec<Primitive>) {
                self.0.set(self.0.get() + 1);
            }
        }

        let counter = Rc::new(Counting(Cell::new(0)));
        let join = LineJoin::Custom(counter.clone());
        let zigzag = pts(&[(0.0, 0.0), (5.0, 5.0), (10.0, 0.0), (15.0, 5.0)]);
        tessellate(&zigzag, 1.0, &join, LineCap::None, false, &mut Vec::new());
        assert_eq!(counter.0.get(), 2);
    }

    #[test]
    fn degenerate_input_draws_nothing() {
        let mut out = Vec::new();
        tessellate(&pts(&[(1.0, 1.0)]), 2.0, &LineJoin::Round, LineCap::Round, false, &mut out);
        tessellate(&pts(&[(0.0, 0.0), (1.0, 1.0)]), 0.0, &LineJoin::Round, LineCap::Round, false, &mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn round_joins_of_an_earlier_line_stay_underneath() {
        let backend = RecordingBackend::new();
        let mut lines = LineRenderer::new(&backend, 64, 8).unwrap();
        lines.begin(Mat4::IDENTITY, BlendMode::Alpha);
        let under = LineStyle::new(6.0, ColorRgba::new(1.0, 0.0, 0.0, 1.0)).join(LineJoin::Round).cap(LineCap::Round);
        let over = LineStyle::new(2.0, ColorRgba::new(0.0, 0.0, 1.0, 1.0)).join(LineJoin::Bevel).cap(LineCap::None);
        lines.draw_polyline(&mut (), &pts(&[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0)]), &under, false);
        lines.draw_line(&mut (), Vec2::new(10.0, -5.0), Vec2::new(10.0, 5.0), &over);
        lines.flush(&mut ());

        let labels: Vec<String> = backend.draws().into_iter().map(|d| d.0).collect();
        assert_eq!(labels, vec!["line segments", "line joins", "line segments"]);
        let last = backend.uploads().pop().unwrap().1;
        assert_eq!(&last[8..12], &over.color.to_array());
    }

    #[test]
    fn miter_lines_share_one_draw() {
        let backend = RecordingBackend::new();
        let mut lines = LineRenderer::new(&backend, 64, 8).unwrap();
        lines.begin(Mat4::IDENTITY, BlendMode::Alpha);
        let style = LineStyle::new(2.0, ColorRgba::white()).join(LineJoin::Miter { limit: 4.0 }).cap(LineCap::Square);
        for i in 0..4 {
            let y = i as f32 * 10.0;
            lines.draw_polyline(&mut (), &pts(&[(0.0, y), (10.0, y), (10.0, y + 5.0)]), &style, false);
        }
        lines.flush(&mut ());
        assert_eq!(backend.draws().len(), 1);
    }
}
