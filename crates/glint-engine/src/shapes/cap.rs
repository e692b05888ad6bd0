use std::f32::consts::{FRAC_PI_2, PI};

use crate::coords::Vec2;

use super::{Primitive, Sector};

/// An open polyline end.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CapSite {
    /// The end point.
    pub at: Vec2,
    /// Unit direction pointing away from the line.
    pub outward: Vec2,
    /// Half the line width.
    pub half_width: f32,
}

/// End style of an open line.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum LineCap {
    #[default]
    None,
    /// Half-width box past the endpoint.
    Square,
    Round,
}

pub trait CapBuilder {
    fn build(&self, site: &CapSite, out: &mut Vec<Primitive>);
}

#[derive(Debug, Copy, Clone)]
pub struct NoCap;

impl CapBuilder for NoCap {
    fn build(&self, _site: &CapSite, _out: &mut Vec<Primitive>) {}
}

#[derive(Debug, Copy, Clone)]
pub struct SquareCap;

impl CapBuilder for SquareCap {
    fn build(&self, site: &CapSite, out: &mut Vec<Primitive>) {
        let side = site.outward.perp() * site.half_width;
        let ahead = site.outward * site.half_width;
        out.push(Primitive::Quad([
            site.at + side,
            site.at + side + ahead,
            site.at - side + ahead,
            site.at - side,
        ]));
    }
}

#[derive(Debug, Copy, Clone)]
pub struct RoundCap;

impl CapBuilder for RoundCap {
    fn build(&self, site: &CapSite, out: &mut Vec<Primitive>) {
        let facing = site.outward.y.atan2(site.outward.x);
        out.push(Primitive::Fan(Sector::new(site.at, site.half_width, facing - FRAC_PI_2, PI)));
    }
}

impl LineCap {
    pub(crate) fn builder(self) -> &'static dyn CapBuilder {
        match self {
            LineCap::None => &NoCap,
            LineCap::Square => &SquareCap,
            LineCap::Round => &RoundCap,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_cap_faces_outward() {
        let site = CapSite { at: Vec2::new(5.0, 5.0), outward: Vec2::new(0.0, 1.0), half_width: 2.0 };
        let mut out = Vec::new();
        RoundCap.build(&site, &mut out);
        let Primitive::Fan(s) = out[0] else { panic!("expected a fan") };
        // Middle of the sweep points along +Y.
        let mid = s.start + s.sweep * 0.5;
        assert!((mid - FRAC_PI_2).abs() < 1e-5);
        assert!((s.sweep - PI).abs() < 1e-6);
    }

    #[test]
    fn square_cap_extends_by_half_width() {
        let site = CapSite { at: Vec2::new(0.0, 0.0), outward: Vec2::new(1.0, 0.0), half_width: 3.0 };
        let mut out = Vec::new();
        SquareCap.build(&site, &mut out);
        let Primitive::Quad(q) = out[0] else { panic!("expected a quad") };
        assert!(q.iter().all(|p| p.x >= 0.0 && p.x <= 3.0 && p.y.abs() <= 3.0));
        NoCap.build(&site, &mut out);
        assert_eq!(out.len(), 1);
    }
}
