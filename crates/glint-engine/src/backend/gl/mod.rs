//! Bind-style backend on `glow`.
//!
//! All state lives in the GL context, so [`GlPass`] only carries the canvas
//! size needed to restore the viewport when rendering returns to the default
//! framebuffer. Every object keeps an `Rc` to the context and must be used on
//! the thread that owns it.

mod geometry;
mod program;
mod texture;

use std::rc::Rc;

use glow::HasContext;

use crate::coords::ColorRgba;
use crate::error::Result;
use crate::gfx::{Backend, BlendMode, GeometryDesc, ProgramDesc, TextureDesc};

pub use geometry::GlGeometry;
pub use program::GlProgram;
pub use texture::{GlTarget, GlTexture};

/// Command-recording state for the bind-style backend.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct GlPass {
    /// Default framebuffer size in physical pixels.
    pub canvas: (u32, u32),
}

impl GlPass {
    pub fn new(width: u32, height: u32) -> Self {
        Self { canvas: (width, height) }
    }
}

pub struct GlBackend {
    gl: Rc<glow::Context>,
}

impl GlBackend {
    /// Wraps a current context. Sets the fixed state the renderers rely on.
    pub fn new(gl: Rc<glow::Context>) -> Self {
        unsafe {
            gl.disable(glow::DEPTH_TEST);
            gl.disable(glow::CULL_FACE);
            gl.enable(glow::BLEND);
            // Desktop GL ignores gl_PointSize otherwise.
            if !gl.version().is_embedded {
                gl.enable(glow::PROGRAM_POINT_SIZE);
            }
        }
        log::debug!("gl backend ready");
        Self { gl }
    }

    pub fn context(&self) -> &Rc<glow::Context> {
        &self.gl
    }

    /// Starts a frame targeting the default framebuffer.
    pub fn pass(&self, width: u32, height: u32) -> GlPass {
        unsafe {
            self.gl.bind_framebuffer(glow::FRAMEBUFFER, None);
            self.gl.viewport(0, 0, width as i32, height as i32);
        }
        GlPass::new(width, height)
    }
}

impl Backend for GlBackend {
    type Pass<'p> = GlPass;
    type Texture = GlTexture;
    type Target = GlTarget;
    type Geometry = GlGeometry;
    type Program = GlProgram;

    const NAME: &'static str = "gl";

    fn create_geometry(&self, desc: &GeometryDesc<'_>) -> Result<GlGeometry> {
        GlGeometry::new(self.gl.clone(), desc)
    }

    fn create_program(&self, desc: &ProgramDesc<'_>) -> Result<GlProgram> {
        GlProgram::new(self.gl.clone(), desc)
    }

    fn create_texture(&self, desc: &TextureDesc<'_>, pixels: Option<&[u8]>) -> Result<GlTexture> {
        texture::create_texture(&self.gl, desc, pixels)
    }

    fn destroy_texture(&self, texture: GlTexture) {
        unsafe { self.gl.delete_texture(texture.raw) };
    }

    fn create_target(&self, label: &str, width: u32, height: u32) -> Result<GlTarget> {
        texture::create_target(&self.gl, label, width, height)
    }

    fn destroy_target(&self, target: GlTarget) {
        texture::destroy_target(&self.gl, target);
    }

    fn bind_target(&self, pass: &mut GlPass, target: Option<&GlTarget>) {
        unsafe {
            match target {
                Some(t) => {
                    self.gl.bind_framebuffer(glow::FRAMEBUFFER, Some(t.fbo));
                    self.gl.viewport(0, 0, t.color.width as i32, t.color.height as i32);
                }
                None => {
                    self.gl.bind_framebuffer(glow::FRAMEBUFFER, None);
                    self.gl.viewport(0, 0, pass.canvas.0 as i32, pass.canvas.1 as i32);
                }
            }
        }
    }

    fn clear(&self, _pass: &mut GlPass, color: ColorRgba) {
        unsafe {
            self.gl.clear_color(color.r, color.g, color.b, color.a);
            self.gl.clear(glow::COLOR_BUFFER_BIT | glow::DEPTH_BUFFER_BIT | glow::STENCIL_BUFFER_BIT);
        }
    }
}

// ── state helpers ─────────────────────────────────────────────────────────

/// `(src_rgb, dst_rgb, src_alpha, dst_alpha)`, or `None` for no blending.
fn blend_factors(mode: BlendMode) -> Option<(u32, u32, u32, u32)> {
    match mode {
        BlendMode::Alpha => Some((
            glow::SRC_ALPHA,
            glow::ONE_MINUS_SRC_ALPHA,
            glow::ONE,
            glow::ONE_MINUS_SRC_ALPHA,
        )),
        BlendMode::Premultiplied => Some((
            glow::ONE,
            glow::ONE_MINUS_SRC_ALPHA,
            glow::ONE,
            glow::ONE_MINUS_SRC_ALPHA,
        )),
        BlendMode::Additive => Some((glow::SRC_ALPHA, glow::ONE, glow::ONE, glow::ONE)),
        BlendMode::Multiply => Some((
            glow::DST_COLOR,
            glow::ONE_MINUS_SRC_ALPHA,
            glow::ONE,
            glow::ONE_MINUS_SRC_ALPHA,
        )),
        BlendMode::Replace => None,
    }
}

pub(crate) fn apply_blend(gl: &glow::Context, mode: BlendMode) {
    unsafe {
        match blend_factors(mode) {
            Some((src, dst, src_a, dst_a)) => {
                gl.enable(glow::BLEND);
                gl.blend_func_separate(src, dst, src_a, dst_a);
            }
            None => gl.disable(glow::BLEND),
        }
    }
}

fn draw_mode(mode: crate::gfx::DrawMode) -> u32 {
    use crate::gfx::DrawMode;

    match mode {
        DrawMode::Triangles => glow::TRIANGLES,
        DrawMode::TriangleStrip => glow::TRIANGLE_STRIP,
        DrawMode::Lines => glow::LINES,
        DrawMode::Points => glow::POINTS,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replace_disables_blending() {
        assert_eq!(blend_factors(BlendMode::Replace), None);
    }

    #[test]
    fn additive_keeps_destination() {
        let (_, dst, _, _) = blend_factors(BlendMode::Additive).unwrap();
        assert_eq!(dst, glow::ONE);
    }
}
