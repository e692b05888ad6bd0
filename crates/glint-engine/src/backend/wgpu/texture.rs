use crate::error::{GfxError, Result};
use crate::gfx::{RenderTargetHandle, TextureDesc, TextureFilter, TextureHandle, TextureId};

use super::{Shared, DEPTH_FORMAT};

/// Texture, default view and sampler. Clones share the backend objects.
#[derive(Debug, Clone)]
pub struct WgpuTexture {
    id: TextureId,
    texture: wgpu::Texture,
    pub(crate) view: wgpu::TextureView,
    pub(crate) sampler: wgpu::Sampler,
    pub(super) width: u32,
    pub(super) height: u32,
}

impl WgpuTexture {
    pub(super) fn destroy(self) {
        self.texture.destroy();
    }
}

impl TextureHandle for WgpuTexture {
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

#[derive(Debug)]
pub struct WgpuTarget {
    pub(super) color: WgpuTexture,
    depth: wgpu::Texture,
    pub(super) depth_view: wgpu::TextureView,
}

impl WgpuTarget {
    pub(super) fn destroy(self) {
        self.depth.destroy();
        self.color.destroy();
    }
}

impl RenderTargetHandle for WgpuTarget {
    type Texture = WgpuTexture;

    fn color(&self) -> &WgpuTexture {
        &self.color
    }
}

fn sampler(device: &wgpu::Device, label: &str, filter: TextureFilter) -> wgpu::Sampler {
    let mode = match filter {
        TextureFilter::Linear => wgpu::FilterMode::Linear,
        TextureFilter::Nearest => wgpu::FilterMode::Nearest,
    };
    device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some(label),
        address_mode_u: wgpu::AddressMode::ClampToEdge,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        address_mode_w: wgpu::AddressMode::ClampToEdge,
        mag_filter: mode,
        min_filter: mode,
        ..Default::default()
    })
}

pub(super) fn create_texture(shared: &Shared, desc: &TextureDesc<'_>, pixels: Option<&[u8]>) -> Result<WgpuTexture> {
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

    let (format, extra) = if desc.render_target {
        (shared.format, wgpu::TextureUsages::RENDER_ATTACHMENT)
    } else {
        (wgpu::TextureFormat::Rgba8UnormSrgb, wgpu::TextureUsages::empty())
    };

    let size = wgpu::Extent3d { width: desc.width, height: desc.height, depth_or_array_layers: 1 };
    let texture = shared.device.create_texture(&wgpu::TextureDescriptor {
        label: Some(desc.label),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST | extra,
        view_formats: &[],
    });

    if let Some(pixels) = pixels {
        shared.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            pixels,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * desc.width),
                rows_per_image: Some(desc.height),
            },
            size,
        );
    }

    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    let sampler = sampler(&shared.device, desc.label, desc.filter);

    Ok(WgpuTexture { id: TextureId::next(), texture, view, sampler, width: desc.width, height: desc.height })
}

pub(super) fn create_target(shared: &Shared, label: &str, width: u32, height: u32) -> Result<WgpuTarget> {
    let (width, height) = (width.max(1), height.max(1));
    let mut desc = TextureDesc::new(label, width, height);
    desc.render_target = true;
    let color = create_texture(shared, &desc, None)?;

    let depth = shared.device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d { width, height, depth_or_array_layers: 1 },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    let depth_view = depth.create_view(&wgpu::TextureViewDescriptor::default());

    log::debug!("wgpu target '{label}' created ({width}x{height})");
    Ok(WgpuTarget { color, depth, depth_view })
}
