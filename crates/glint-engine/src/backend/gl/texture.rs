use glow::{HasContext, PixelUnpackData};

use crate::error::{GfxError, Result};
use crate::gfx::{RenderTargetHandle, TextureDesc, TextureFilter, TextureHandle, TextureId};

#[derive(Debug, Clone)]
pub struct GlTexture {
    id: TextureId,
    pub(super) raw: glow::Texture,
    pub(super) width: u32,
    pub(super) height: u32,
}

impl TextureHandle for GlTexture {
    fn id(&self) -> TextureId {
        self.id
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }
}

/// Framebuffer object with a color texture and a depth/stencil renderbuffer.
#[derive(Debug)]
pub struct GlTarget {
    pub(super) fbo: glow::Framebuffer,
    depth: glow::Renderbuffer,
    pub(super) color: GlTexture,
}

impl RenderTargetHandle for GlTarget {
    type Texture = GlTexture;

    fn color(&self) -> &GlTexture {
        &self.color
    }
}

pub(super) fn create_texture(gl: &glow::Context, desc: &TextureDesc<'_>, pixels: Option<&[u8]>) -> Result<GlTexture> {
    if desc.width == 0 || desc.height == 0 {
        return Err(GfxError::Config(format!("texture '{}' has zero size", desc.label)));
    }
    if let Some(p) = pixels
        && p.len() != desc.byte_len()
    {
        return Err(GfxError::Config(format!(
            "texture '{}': expected {} bytes, got {}",
            desc.label,
            desc.byte_len(),
            p.len()
        )));
    }

    let filter = match desc.filter {
        TextureFilter::Linear => glow::LINEAR,
        TextureFilter::Nearest => glow::NEAREST,
    } as i32;

    unsafe {
        let raw = gl
            .create_texture()
            .map_err(|e| GfxError::Resource(format!("texture '{}': {e}", desc.label)))?;
        gl.bind_texture(glow::TEXTURE_2D, Some(raw));
        gl.tex_image_2d(
            glow::TEXTURE_2D,
            0,
            glow::RGBA8 as i32,
            desc.width as i32,
            desc.height as i32,
            0,
            glow::RGBA,
            glow::UNSIGNED_BYTE,
            PixelUnpackData::Slice(pixels),
        );
        gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MIN_FILTER, filter);
        gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MAG_FILTER, filter);
        gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_S, glow::CLAMP_TO_EDGE as i32);
        gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_T, glow::CLAMP_TO_EDGE as i32);
        gl.bind_texture(glow::TEXTURE_2D, None);

        Ok(GlTexture { id: TextureId::next(), raw, width: desc.width, height: desc.height })
    }
}

pub(super) fn create_target(gl: &glow::Context, label: &str, width: u32, height: u32) -> Result<GlTarget> {
    let color = create_texture(gl, &TextureDesc::new(label, width.max(1), height.max(1)), None)?;
    let resource = |e: String| GfxError::Resource(format!("target '{label}': {e}"));

    unsafe {
        let fbo = gl.create_framebuffer().map_err(resource)?;
        let depth = gl.create_renderbuffer().map_err(resource)?;

        gl.bind_renderbuffer(glow::RENDERBUFFER, Some(depth));
        gl.renderbuffer_storage(
            glow::RENDERBUFFER,
            glow::DEPTH24_STENCIL8,
            color.width as i32,
            color.height as i32,
        );
        gl.bind_renderbuffer(glow::RENDERBUFFER, None);

        gl.bind_framebuffer(glow::FRAMEBUFFER, Some(fbo));
        gl.framebuffer_texture_2d(
            glow::FRAMEBUFFER,
            glow::COLOR_ATTACHMENT0,
            glow::TEXTURE_2D,
            Some(color.raw),
            0,
        );
        gl.framebuffer_renderbuffer(
            glow::FRAMEBUFFER,
            glow::DEPTH_STENCIL_ATTACHMENT,
            glow::RENDERBUFFER,
            Some(depth),
        );
        let status = gl.check_framebuffer_status(glow::FRAMEBUFFER);
        gl.bind_framebuffer(glow::FRAMEBUFFER, None);

        if status != glow::FRAMEBUFFER_COMPLETE {
            gl.delete_framebuffer(fbo);
            gl.delete_renderbuffer(depth);
            gl.delete_texture(color.raw);
            return Err(GfxError::Resource(format!("target '{label}' incomplete (status {status:#x})")));
        }

        log::debug!("gl target '{label}' created ({width}x{height})");
        Ok(GlTarget { fbo, depth, color })
    }
}

pub(super) fn destroy_target(gl: &glow::Context, target: GlTarget) {
    unsafe {
        gl.delete_framebuffer(target.fbo);
        gl.delete_renderbuffer(target.depth);
        gl.delete_texture(target.color.raw);
    }
}
