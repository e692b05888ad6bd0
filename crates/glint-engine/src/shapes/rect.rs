use std::f32::consts::{FRAC_PI_2, PI};

use glam::Mat4;

use crate::coords::{ColorRgba, CornerRadii, Rect, Vec2};
use crate::error::Result;
use crate::gfx::{Backend, BlendMode};

use super::{PrimitiveBatch, Sector};

/// Start angles of the corner fans, in tl, tr, br, bl order (+Y down).
const CORNER_START: [f32; 4] = [PI, PI + FRAC_PI_2, 0.0, FRAC_PI_2];

/// A rounded rect split into axis-aligned quads and corner sectors.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RectParts {
    /// Edge strips and the inner body. Some may be empty.
    pub quads: Vec<Rect>,
    /// Corner fans in tl, tr, br, bl order.
    pub corners: Vec<Sector>,
}

impl RectParts {
    pub fn area(&self) -> f32 {
        self.quads.iter().map(|r| r.area()).sum::<f32>() + self.corners.iter().map(Sector::area).sum::<f32>()
    }
}

/// Radii floored at zero and capped at half the smaller side.
fn clamp_radii(rect: Rect, radii: CornerRadii) -> [f32; 4] {
    let limit = 0.5 * rect.size.x.min(rect.size.y).max(0.0);
    radii.non_negative().to_array().map(|r| r.min(limit))
}

fn corner_centers(rect: Rect, r: [f32; 4]) -> [Vec2; 4] {
    let (x0, y0) = (rect.origin.x, rect.origin.y);
    let (x1, y1) = (x0 + rect.size.x, y0 + rect.size.y);
    [
        Vec2::new(x0 + r[0], y0 + r[0]),
        Vec2::new(x1 - r[1], y0 + r[1]),
        Vec2::new(x1 - r[2], y1 - r[2]),
        Vec2::new(x0 + r[3], y1 - r[3]),
    ]
}

/// Five quads (top, bottom, left, right, inner) and four corner fans.
///
/// Edge strips are as thick as the larger of their two adjacent radii. With
/// equal adjacent radii the pieces tile the rounded rect exactly.
pub fn decompose(rect: Rect, radii: CornerRadii) -> RectParts {
    let rect = rect.normalized();
    let [tl, tr, br, bl] = clamp_radii(rect, radii);
    let (x, y, w, h) = (rect.origin.x, rect.origin.y, rect.size.x, rect.size.y);

    let top = tl.max(tr);
    let bottom = bl.max(br);
    let left = tl.max(bl);
    let right = tr.max(br);

    let quads = vec![
        Rect::new(x + tl, y, w - tl - tr, top),
        Rect::new(x + bl, y + h - bottom, w - bl - br, bottom),
        Rect::new(x, y + tl, left, h - tl - bl),
        Rect::new(x + w - right, y + tr, right, h - tr - br),
        Rect::new(x + left, y + top, w - left - right, h - top - bottom),
    ];

    let r = [tl, tr, br, bl];
    let centers = corner_centers(rect, r);
    let corners = (0..4).map(|i| Sector::new(centers[i], r[i], CORNER_START[i], FRAC_PI_2)).collect();

    RectParts { quads, corners }
}

/// Outline of width `stroke` along the inside of the rounded rect.
///
/// Corners with a radius of at least `stroke` become ring sectors; tighter
/// corners become square `stroke`-sized quads.
pub fn stroke_parts(rect: Rect, radii: CornerRadii, stroke: f32) -> RectParts {
    let rect = rect.normalized();
    let r = clamp_radii(rect, radii);
    let (x, y, w, h) = (rect.origin.x, rect.origin.y, rect.size.x, rect.size.y);
    let sw = stroke.max(0.0);
    // Extent each corner claims along its two edges.
    let a = r.map(|ri| ri.max(sw));

    let mut quads = vec![
        Rect::new(x + a[0], y, w - a[0] - a[1], sw),
        Rect::new(x + a[3], y + h - sw, w - a[3] - a[2], sw),
        Rect::new(x, y + a[0], sw, h - a[0] - a[3]),
        Rect::new(x + w - sw, y + a[1], sw, h - a[1] - a[2]),
    ];

    let centers = corner_centers(rect, r);
    let squares = [
        Rect::new(x, y, sw, sw),
        Rect::new(x + w - sw, y, sw, sw),
        Rect::new(x + w - sw, y + h - sw, sw, sw),
        Rect::new(x, y + h - sw, sw, sw),
    ];
    let mut corners = Vec::with_capacity(4);
    for i in 0..4 {
        if r[i] >= sw && r[i] > 0.0 {
            let inner = r[i] - sw;
            corners.push(
                Sector::new(centers[i], r[i], CORNER_START[i], FRAC_PI_2).with_inner(Vec2::new(inner, inner)),
            );
        } else {
            quads.push(squares[i]);
        }
    }

    RectParts { quads, corners }
}

/// Fill and outline of a rect draw.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct RectStyle {
    /// Interior color; `None` leaves the inside untouched.
    pub fill: Option<ColorRgba>,
    /// Outline color; ignored unless `stroke_width` is positive.
    pub stroke: Option<ColorRgba>,
    /// Outline thickness, measured inward from the rect edge.
    pub stroke_width: f32,
    /// Per-corner radii, clamped to half the shorter side.
    pub radii: CornerRadii,
}

impl RectStyle {
    pub fn fill(color: ColorRgba) -> Self {
        Self { fill: Some(color), stroke: None, stroke_width: 0.0, radii: CornerRadii::zero() }
    }

    pub fn stroke(color: ColorRgba, width: f32) -> Self {
        Self { fill: None, stroke: Some(color), stroke_width: width, radii: CornerRadii::zero() }
    }

    pub fn with_fill(mut self, color: ColorRgba) -> Self {
        self.fill = Some(color);
        self
    }

    pub fn rounded(mut self, radii: CornerRadii) -> Self {
        self.radii = radii;
        self
    }
}

/// Rounded rects from edge quads and corner fans.
pub struct RectRenderer<B: Backend> {
    batch: PrimitiveBatch<B>,
}

impl<B: Backend> RectRenderer<B> {
    pub fn new(backend: &B, capacity: usize, corner_segments: u32) -> Result<Self> {
        Ok(Self { batch: PrimitiveBatch::new(backend, ["rect quads", "rect corners"], capacity, corner_segments)? })
    }

    pub fn begin(&mut self, view_projection: Mat4, blend: BlendMode) {
        self.batch.begin(view_projection, blend);
    }

    pub fn fill(&mut self, pass: &mut B::Pass<'_>, rect: Rect, radii: CornerRadii, color: ColorRgba) {
        let parts = decompose(rect, radii);
        self.push_parts(pass, &parts, color);
    }

    /// Fill, stroke, or both. With both, the stroke color covers the whole
    /// rect and the fill is drawn on top, inset by the stroke width.
    pub fn draw(&mut self, pass: &mut B::Pass<'_>, rect: Rect, style: &RectStyle) {
        match (style.fill, style.stroke) {
            (Some(fill), Some(stroke)) if style.stroke_width > 0.0 => {
                self.fill(pass, rect, style.radii, stroke);
                let inner = rect.normalized().inset(style.stroke_width);
                if !inner.is_empty() {
                    self.fill(pass, inner, style.radii.shrunk(style.stroke_width), fill);
                }
            }
            (Some(fill), _) => self.fill(pass, rect, style.radii, fill),
            (None, Some(stroke)) if style.stroke_width > 0.0 => {
                let parts = stroke_parts(rect, style.radii, style.stroke_width);
                self.push_parts(pass, &parts, stroke);
            }
            (None, _) => {}
        }
    }

    fn push_parts(&mut self, pass: &mut B::Pass<'_>, parts: &RectParts, color: ColorRgba) {
        self.batch.start_draw(pass);
        for quad in &parts.quads {
            self.batch.push_rect(pass, *quad, color);
        }
        for corner in &parts.corners {
            self.batch.push_fan(pass, corner, color);
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

    fn overlap(a: Rect, b: Rect) -> f32 {
        a.intersect(b).map_or(0.0, Rect::area)
    }

    #[test]
    fn uniform_radii_tile_the_rounded_area() {
        let (w, h, r) = (120.0, 80.0, 12.0);
        let parts = decompose(Rect::new(5.0, 7.0, w, h), CornerRadii::all(r));
        assert_eq!(parts.quads.len(), 5);
        assert_eq!(parts.corners.len(), 4);

        let expected = w * h - 4.0 * r * r * (1.0 - PI / 4.0);
        assert!((parts.area() - expected).abs() < 1e-2, "{} vs {expected}", parts.area());

        for (i, a) in parts.quads.iter().enumerate() {
            for b in &parts.quads[i + 1..] {
                assert!(overlap(*a, *b) < 1e-4, "{a:?} overlaps {b:?}");
            }
        }
    }

    #[test]
    fn zero_radius_corners_are_still_issued() {
        let parts = decompose(Rect::new(0.0, 0.0, 10.0, 10.0), CornerRadii::zero());
        assert_eq!(parts.corners.len(), 4);
        assert!(parts.corners.iter().all(|c| c.area() == 0.0));
        assert!((parts.area() - 100.0).abs() < 1e-4);
    }

    #[test]
    fn corner_fans_point_into_their_corners() {
        let parts = decompose(Rect::new(0.0, 0.0, 100.0, 100.0), CornerRadii::all(10.0));
        let tl = parts.corners[0];
        let mid = tl.start + tl.sweep * 0.5;
        let rim = tl.center + Vec2::new(mid.cos(), mid.sin()) * tl.radii.x;
        assert!(rim.x < tl.center.x && rim.y < tl.center.y);
        let br = parts.corners[2];
        let mid = br.start + br.sweep * 0.5;
        let rim = br.center + Vec2::new(mid.cos(), mid.sin()) * br.radii.x;
        assert!(rim.x > br.center.x && rim.y > br.center.y);
    }

    #[test]
    fn stroke_area_is_outer_minus_inner() {
        let (w, h, r, sw) = (60.0, 40.0, 8.0, 3.0);
        let rect = Rect::new(0.0, 0.0, w, h);
        let outline = stroke_parts(rect, CornerRadii::all(r), sw);
        let outer = decompose(rect, CornerRadii::all(r)).area();
        let inner = decompose(rect.inset(sw), CornerRadii::all(r - sw)).area();
        assert!((outline.area() - (outer - inner)).abs() < 1e-2);
    }

    #[test]
    fn tight_corners_become_square_quads() {
        let outline = stroke_parts(Rect::new(0.0, 0.0, 20.0, 20.0), CornerRadii::all(1.0), 4.0);
        assert!(outline.corners.is_empty());
        assert_eq!(outline.quads.len(), 8);
        assert!((outline.area() - (400.0 - 144.0)).abs() < 1e-3);
    }

    #[test]
    fn fill_and_stroke_draws_inner_fill_over_outer_corners() {
        let backend = RecordingBackend::new();
        let mut rects = RectRenderer::new(&backend, 64, 10).unwrap();
        rects.begin(Mat4::IDENTITY, BlendMode::Alpha);
        let style = RectStyle::stroke(ColorRgba::black(), 2.0)
            .with_fill(ColorRgba::white())
            .rounded(CornerRadii::all(4.0));
        rects.draw(&mut (), Rect::new(0.0, 0.0, 40.0, 30.0), &style);
        // The outer pass is flushed once the inner one starts.
        assert_eq!(rects.pending(), 9);
        rects.flush(&mut ());
        let draws = backend.draws();
        let labels: Vec<&str> = draws.iter().map(|d| d.0.as_str()).collect();
        assert_eq!(labels, vec!["rect quads", "rect corners", "rect quads", "rect corners"]);
        assert_eq!(draws.iter().map(|d| d.2).sum::<u32>(), 18);
    }

    /// Index of the first upload to `geometry` carrying an instance of `color`.
    fn upload_of(backend: &RecordingBackend, geometry: &str, color: ColorRgba) -> Option<usize> {
        backend.uploads().iter().position(|(label, data)| {
            label == geometry && data.chunks(12).any(|instance| instance[8..12] == color.to_array())
        })
    }

    #[test]
    fn later_rect_draws_over_earlier_corners() {
        let backend = RecordingBackend::new();
        let mut rects = RectRenderer::new(&backend, 64, 10).unwrap();
        rects.begin(Mat4::IDENTITY, BlendMode::Alpha);
        let red = ColorRgba::new(1.0, 0.0, 0.0, 1.0);
        let blue = ColorRgba::new(0.0, 0.0, 1.0, 1.0);
        rects.fill(&mut (), Rect::new(0.0, 0.0, 40.0, 40.0), CornerRadii::all(10.0), red);
        rects.fill(&mut (), Rect::new(0.0, 0.0, 20.0, 20.0), CornerRadii::zero(), blue);
        rects.flush(&mut ());

        let red_corners = upload_of(&backend, "rect corners", red).unwrap();
        let blue_quads = upload_of(&backend, "rect quads", blue).unwrap();
        assert!(red_corners < blue_quads, "corners at {red_corners}, later quads at {blue_quads}");
    }

    #[test]
    fn full_corner_batch_keeps_rect_order() {
        let backend = RecordingBackend::new();
        // Room for one rect's corners minus one: every rect overflows the fan batch.
        let mut rects = RectRenderer::new(&backend, 3, 4).unwrap();
        rects.begin(Mat4::IDENTITY, BlendMode::Alpha);
        let colors = [ColorRgba::new(1.0, 0.0, 0.0, 1.0), ColorRgba::new(0.0, 1.0, 0.0, 1.0)];
        for color in colors {
            rects.fill(&mut (), Rect::new(0.0, 0.0, 30.0, 30.0), CornerRadii::all(5.0), color);
        }
        rects.flush(&mut ());

        let first_corners = upload_of(&backend, "rect corners", colors[0]).unwrap();
        let second_quads = upload_of(&backend, "rect quads", colors[1]).unwrap();
        assert!(first_corners < second_quads);
        // Every quad of the first rect is drawn before any of the second's.
        let uploads = backend.uploads();
        let last_first_quads = uploads
            .iter()
            .rposition(|(label, data)| label == "rect quads" && data.chunks(12).any(|i| i[8..12] == colors[0].to_array()))
            .unwrap();
        assert!(last_first_quads < second_quads);
    }
}
