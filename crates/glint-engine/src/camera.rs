use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

use crate::coords::{Vec2, Viewport};

/// Orthographic 2D camera.
///
/// World space matches the canvas convention: origin top-left, +Y down,
/// one unit per pixel at zoom 1. The camera is owned by the caller and handed
/// to `begin()` each frame; renderers only ever read it.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera2d {
    viewport: Viewport,
    /// World position shown at the top-left corner of the viewport.
    pub position: Vec2,
    /// Magnification; values above 1 zoom in.
    pub zoom: f32,
}

/// GPU-side layout of the camera matrix.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct CameraUniform {
    pub view_projection: [[f32; 4]; 4],
}

impl Camera2d {
    pub fn new(viewport: Viewport) -> Self {
        Self { viewport, position: Vec2::zero(), zoom: 1.0 }
    }

    #[inline]
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Refreshes the projection after a canvas resize.
    pub fn resize(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    pub fn projection(&self) -> Mat4 {
        let w = self.viewport.width.max(1.0);
        let h = self.viewport.height.max(1.0);
        Mat4::orthographic_rh(0.0, w, h, 0.0, -1.0, 1.0)
    }

    pub fn view(&self) -> Mat4 {
        let zoom = if self.zoom > 0.0 { self.zoom } else { 1.0 };
        Mat4::from_scale(Vec3::new(zoom, zoom, 1.0))
            * Mat4::from_translation(Vec3::new(-self.position.x, -self.position.y, 0.0))
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection() * self.view()
    }

    pub fn uniform(&self) -> CameraUniform {
        CameraUniform { view_projection: self.view_projection().to_cols_array_2d() }
    }

    /// Converts a canvas-space point (e.g. the pointer) to world space.
    pub fn screen_to_world(&self, p: Vec2) -> Vec2 {
        let zoom = if self.zoom > 0.0 { self.zoom } else { 1.0 };
        Vec2::new(p.x / zoom + self.position.x, p.y / zoom + self.position.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;

    fn clip(cam: &Camera2d, x: f32, y: f32) -> Vec4 {
        cam.view_projection() * Vec4::new(x, y, 0.0, 1.0)
    }

    #[test]
    fn top_left_maps_to_clip_top_left() {
        let cam = Camera2d::new(Viewport::new(800.0, 600.0));
        let c = clip(&cam, 0.0, 0.0);
        assert!((c.x + 1.0).abs() < 1e-5);
        assert!((c.y - 1.0).abs() < 1e-5);
    }

    #[test]
    fn bottom_right_maps_to_clip_bottom_right() {
        let cam = Camera2d::new(Viewport::new(800.0, 600.0));
        let c = clip(&cam, 800.0, 600.0);
        assert!((c.x - 1.0).abs() < 1e-5);
        assert!((c.y + 1.0).abs() < 1e-5);
    }

    #[test]
    fn screen_to_world_undoes_zoom_and_pan() {
        let mut cam = Camera2d::new(Viewport::new(100.0, 100.0));
        cam.position = Vec2::new(10.0, 20.0);
        cam.zoom = 2.0;
        assert_eq!(cam.screen_to_world(Vec2::new(50.0, 50.0)), Vec2::new(35.0, 45.0));
    }
}
