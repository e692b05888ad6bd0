use std::f32::consts::TAU;
use std::fmt;
use std::rc::Rc;

use crate::coords::Vec2;

use super::{Primitive, Sector};

/// Below this, adjacent segments are treated as parallel.
const PARALLEL_EPSILON: f32 = 1e-6;

/// An interior polyline vertex and its neighbours.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct JoinSite {
    /// Start of the incoming segment.
    pub prev: Vec2,
    /// The vertex being joined.
    pub at: Vec2,
    /// End of the outgoing segment.
    pub next: Vec2,
    /// Half the line width.
    pub half_width: f32,
}

impl JoinSite {
    /// Unit directions of the incoming and outgoing segments.
    pub fn directions(&self) -> (Vec2, Vec2) {
        ((self.at - self.prev).normalize(), (self.next - self.at).normalize())
    }

    /// Offset sign pointing to the outside of the turn.
    pub fn outer_side(&self) -> f32 {
        let (d1, d2) = self.directions();
        if d1.cross(d2) > 0.0 { -1.0 } else { 1.0 }
    }

    /// Outer corners of the incoming and outgoing segment quads.
    pub fn outer_points(&self) -> (Vec2, Vec2) {
        let (d1, d2) = self.directions();
        let side = self.outer_side() * self.half_width;
        (self.at + d1.perp() * side, self.at + d2.perp() * side)
    }

    /// Whether the segments continue in the same direction.
    pub fn is_straight(&self) -> bool {
        let (d1, d2) = self.directions();
        d1.cross(d2).abs() < PARALLEL_EPSILON && d1.dot(d2) > 0.0
    }
}

/// Fills the gap between two segment quads at an interior vertex.
pub trait JoinBuilder {
    fn build(&self, site: &JoinSite, out: &mut Vec<Primitive>);
}

/// Join style of a line draw.
#[derive(Clone, Default)]
pub enum LineJoin {
    #[default]
    Round,
    /// Extends the outer edges to their intersection. Falls back to a bevel
    /// once the miter length exceeds `limit` half-widths.
    Miter { limit: f32 },
    Bevel,
    Custom(Rc<dyn JoinBuilder>),
}

impl fmt::Debug for LineJoin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LineJoin::Round => f.write_str("Round"),
            LineJoin::Miter { limit } => f.debug_struct("Miter").field("limit", limit).finish(),
            LineJoin::Bevel => f.write_str("Bevel"),
            LineJoin::Custom(_) => f.write_str("Custom"),
        }
    }
}

#[derive(Debug, Copy, Clone)]
pub struct RoundJoin;

impl JoinBuilder for RoundJoin {
    fn build(&self, site: &JoinSite, out: &mut Vec<Primitive>) {
        out.push(Primitive::Fan(Sector::new(site.at, site.half_width, 0.0, TAU)));
    }
}

#[derive(Debug, Copy, Clone)]
pub struct BevelJoin;

impl JoinBuilder for BevelJoin {
    fn build(&self, site: &JoinSite, out: &mut Vec<Primitive>) {
        let (p1, p2) = site.outer_points();
        out.push(Primitive::triangle(site.at, p1, p2));
    }
}

#[derive(Debug, Copy, Clone)]
pub struct MiterJoin {
    /// Longest miter, in half-widths, before falling back to a bevel.
    pub limit: f32,
}

impl MiterJoin {
    /// Miter tip, or `None` when it exceeds the limit or is undefined.
    pub fn tip(&self, site: &JoinSite) -> Option<Vec2> {
        let (d1, d2) = site.directions();
        let tangent = (d1 + d2).normalize();
        let miter = tangent.perp();
        let denom = miter.dot(d1.perp());
        if denom.abs() < PARALLEL_EPSILON {
            return None;
        }
        let length = site.half_width / denom;
        if (length / site.half_width).abs() > self.limit {
            return None;
        }
        Some(site.at + miter * (length * site.outer_side()))
    }
}

impl JoinBuilder for MiterJoin {
    fn build(&self, site: &JoinSite, out: &mut Vec<Primitive>) {
        let (p1, p2) = site.outer_points();
        match self.tip(site) {
            Some(tip) => out.push(Primitive::Quad([site.at, p1, tip, p2])),
            None => out.push(Primitive::triangle(site.at, p1, p2)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn right_angle(half_width: f32) -> JoinSite {
        JoinSite {
            prev: Vec2::new(0.0, 0.0),
            at: Vec2::new(10.0, 0.0),
            next: Vec2::new(10.0, 10.0),
            half_width,
        }
    }

    #[test]
    fn right_angle_miter_reaches_the_square_corner() {
        // Turning from +X to +Y (down on screen), the outside is at (-Y, +X).
        let tip = MiterJoin { limit: 4.0 }.tip(&right_angle(1.0)).unwrap();
        assert!((tip.x - 11.0).abs() < 1e-5 && (tip.y + 1.0).abs() < 1e-5, "{tip:?}");
    }

    #[test]
    fn sharp_angle_falls_back_to_bevel() {
        let site = JoinSite {
            prev: Vec2::new(0.0, 0.0),
            at: Vec2::new(10.0, 0.0),
            next: Vec2::new(0.0, 0.5),
            half_width: 1.0,
        };
        let miter = MiterJoin { limit: 4.0 };
        assert!(miter.tip(&site).is_none());
        let mut out = Vec::new();
        miter.build(&site, &mut out);
        assert!(matches!(out[0], Primitive::Quad(q) if q[2] == q[3]));
    }

    #[test]
    fn outer_points_sit_on_segment_edges() {
        let (p1, p2) = right_angle(2.0).outer_points();
        assert_eq!(p1, Vec2::new(10.0, -2.0));
        assert_eq!(p2, Vec2::new(12.0, 0.0));
    }

    #[test]
    fn collinear_segments_are_straight() {
        let site = JoinSite {
            prev: Vec2::new(0.0, 0.0),
            at: Vec2::new(5.0, 5.0),
            next: Vec2::new(10.0, 10.0),
            half_width: 1.0,
        };
        assert!(site.is_straight());
        assert!(!right_angle(1.0).is_straight());
    }
}
