//! Explicit backend on `wgpu`.
//!
//! Every bind, upload and draw is recorded against the [`WgpuPass`] it is
//! given: the frame's command encoder plus the attachment currently drawn to.
//!
//! Host writes never go through `Queue::write_buffer`, which would apply them
//! all before the encoder runs. Instead data is written into a mapped staging
//! chunk and copied with `copy_buffer_to_buffer` at its point in the command
//! stream, so several flushes into one vertex buffer within a frame stay
//! ordered. Chunks are recycled through [`StagingPool`] after
//! [`WgpuBackend::submit`].

mod geometry;
mod program;
mod staging;
mod texture;

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::coords::ColorRgba;
use crate::error::{GfxError, Result};
use crate::gfx::{Backend, BlendMode, GeometryDesc, ProgramDesc, TextureDesc};

pub use geometry::WgpuGeometry;
pub use program::WgpuProgram;
pub use staging::{ChunkReturn, StagingChunk, StagingPool, StagingStats};
pub use texture::{WgpuTarget, WgpuTexture};

/// Depth/stencil format of off-screen targets.
pub(crate) const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth24PlusStencil8;

/// Smallest staging chunk handed out.
const MIN_STAGING_CHUNK: u64 = 64 * 1024;

/// Device objects shared by every resource the backend creates.
pub(crate) struct Shared {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    /// Color format of the canvas and of every off-screen target.
    pub format: wgpu::TextureFormat,
    pub staging: RefCell<StagingPool<wgpu::Buffer>>,
    lost: Arc<AtomicBool>,
}

impl Shared {
    /// Writes `bytes` into `dst` at `offset`, ordered within the encoder.
    pub(crate) fn upload(&self, encoder: &mut wgpu::CommandEncoder, dst: &wgpu::Buffer, offset: u64, bytes: &[u8]) {
        let size = bytes.len() as u64;
        if size == 0 {
            return;
        }
        let mut pool = self.staging.borrow_mut();
        let chunk = pool.acquire(size, |size| {
            self.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("glint staging chunk"),
                size,
                usage: wgpu::BufferUsages::MAP_WRITE | wgpu::BufferUsages::COPY_SRC,
                mapped_at_creation: true,
            })
        });
        chunk.slice(..size).get_mapped_range_mut().copy_from_slice(bytes);
        chunk.unmap();
        encoder.copy_buffer_to_buffer(&chunk, 0, dst, offset, size);
        pool.submit(chunk);
    }
}

pub struct WgpuBackend {
    shared: Rc<Shared>,
}

impl WgpuBackend {
    pub fn new(device: wgpu::Device, queue: wgpu::Queue, format: wgpu::TextureFormat) -> Self {
        let lost = Arc::new(AtomicBool::new(false));
        let flag = lost.clone();
        device.set_device_lost_callback(move |reason, message| {
            log::error!("wgpu device lost ({reason:?}): {message}");
            flag.store(true, Ordering::SeqCst);
        });

        log::debug!("wgpu backend ready (format {format:?})");

        Self {
            shared: Rc::new(Shared {
                device,
                queue,
                format,
                staging: RefCell::new(StagingPool::new(MIN_STAGING_CHUNK)),
                lost,
            }),
        }
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.shared.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.shared.queue
    }

    pub fn format(&self) -> wgpu::TextureFormat {
        self.shared.format
    }

    pub fn is_lost(&self) -> bool {
        self.shared.lost.load(Ordering::SeqCst)
    }

    pub fn staging_stats(&self) -> StagingStats {
        self.shared.staging.borrow().stats()
    }

    /// Starts recording into `encoder`, drawing to the canvas `view`.
    pub fn pass<'p>(
        &self,
        encoder: &'p mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
        size: (u32, u32),
    ) -> WgpuPass<'p> {
        WgpuPass {
            encoder,
            canvas: view.clone(),
            canvas_size: size,
            color: view.clone(),
            depth: None,
            format: self.shared.format,
            size,
            bound: None,
        }
    }

    /// Submits the frame and schedules staging chunks for reuse.
    ///
    /// Fails once the device has been lost; there is no recovery.
    pub fn submit(&self, encoder: wgpu::CommandEncoder) -> Result<()> {
        if self.is_lost() {
            return Err(GfxError::DeviceLost("device lost before submit".into()));
        }
        self.shared.queue.submit(std::iter::once(encoder.finish()));

        self.shared.staging.borrow_mut().recall(|chunk, ret| {
            let returned = chunk.clone();
            chunk.slice(..).map_async(wgpu::MapMode::Write, move |res| match res {
                Ok(()) => ret.ready(returned),
                Err(err) => {
                    log::warn!("staging chunk remap failed, dropping it: {err}");
                    ret.failed();
                }
            });
        });
        if let Err(err) = self.shared.device.poll(wgpu::PollType::Poll) {
            log::warn!("device poll after submit failed: {err}");
        }
        Ok(())
    }
}

// ── pass ──────────────────────────────────────────────────────────────────

/// Program state recorded by `use_program` and consumed by `draw`.
#[derive(Clone)]
pub(crate) struct BoundProgram {
    pub program: u64,
    pub pipeline: wgpu::RenderPipeline,
    pub globals: wgpu::BindGroup,
    pub offset: u32,
    pub texture: Option<wgpu::BindGroup>,
    pub textured: bool,
}

/// Command-recording state for the explicit backend.
pub struct WgpuPass<'p> {
    pub(crate) encoder: &'p mut wgpu::CommandEncoder,
    canvas: wgpu::TextureView,
    canvas_size: (u32, u32),
    pub(crate) color: wgpu::TextureView,
    pub(crate) depth: Option<wgpu::TextureView>,
    pub(crate) format: wgpu::TextureFormat,
    pub(crate) size: (u32, u32),
    pub(crate) bound: Option<BoundProgram>,
}

impl WgpuPass<'_> {
    /// Size of the attachment currently drawn to.
    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    pub(crate) fn begin<'a>(&'a mut self, label: &str, load: Option<wgpu::Color>) -> wgpu::RenderPass<'a> {
        let color_load = match load {
            Some(c) => wgpu::LoadOp::Clear(c),
            None => wgpu::LoadOp::Load,
        };
        let depth_load = if load.is_some() { wgpu::LoadOp::Clear(1.0) } else { wgpu::LoadOp::Load };
        let stencil_load = if load.is_some() { wgpu::LoadOp::Clear(0) } else { wgpu::LoadOp::Load };

        self.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(label),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &self.color,
                resolve_target: None,
                ops: wgpu::Operations { load: color_load, store: wgpu::StoreOp::Store },
                depth_slice: None,
            })],
            depth_stencil_attachment: self.depth.as_ref().map(|view| wgpu::RenderPassDepthStencilAttachment {
                view,
                depth_ops: Some(wgpu::Operations { load: depth_load, store: wgpu::StoreOp::Store }),
                stencil_ops: Some(wgpu::Operations { load: stencil_load, store: wgpu::StoreOp::Store }),
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        })
    }
}

impl Backend for WgpuBackend {
    type Pass<'p> = WgpuPass<'p>;
    type Texture = WgpuTexture;
    type Target = WgpuTarget;
    type Geometry = WgpuGeometry;
    type Program = WgpuProgram;

    const NAME: &'static str = "wgpu";

    fn create_geometry(&self, desc: &GeometryDesc<'_>) -> Result<WgpuGeometry> {
        WgpuGeometry::new(self.shared.clone(), desc)
    }

    fn create_program(&self, desc: &ProgramDesc<'_>) -> Result<WgpuProgram> {
        WgpuProgram::new(self.shared.clone(), desc)
    }

    fn create_texture(&self, desc: &TextureDesc<'_>, pixels: Option<&[u8]>) -> Result<WgpuTexture> {
        texture::create_texture(&self.shared, desc, pixels)
    }

    fn destroy_texture(&self, texture: WgpuTexture) {
        texture.destroy();
    }

    fn create_target(&self, label: &str, width: u32, height: u32) -> Result<WgpuTarget> {
        texture::create_target(&self.shared, label, width, height)
    }

    fn destroy_target(&self, target: WgpuTarget) {
        target.destroy();
    }

    fn bind_target(&self, pass: &mut WgpuPass<'_>, target: Option<&WgpuTarget>) {
        match target {
            Some(t) => {
                pass.color = t.color.view.clone();
                pass.depth = Some(t.depth_view.clone());
                pass.size = (t.color.width, t.color.height);
            }
            None => {
                pass.color = pass.canvas.clone();
                pass.depth = None;
                pass.size = pass.canvas_size;
            }
        }
        // Pipelines are keyed by attachment layout; force a fresh `use_program`.
        pass.bound = None;
    }

    fn clear(&self, pass: &mut WgpuPass<'_>, color: ColorRgba) {
        let c = wgpu::Color { r: color.r as f64, g: color.g as f64, b: color.b as f64, a: color.a as f64 };
        drop(pass.begin("glint clear", Some(c)));
    }
}

// ── state helpers ─────────────────────────────────────────────────────────

pub(crate) fn blend_state(mode: BlendMode) -> Option<wgpu::BlendState> {
    let over = wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::One,
        dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
        operation: wgpu::BlendOperation::Add,
    };
    match mode {
        BlendMode::Alpha => Some(wgpu::BlendState {
            color: wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::SrcAlpha,
                dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
                operation: wgpu::BlendOperation::Add,
            },
            alpha: over,
        }),
        BlendMode::Premultiplied => Some(wgpu::BlendState { color: over, alpha: over }),
        BlendMode::Additive => Some(wgpu::BlendState {
            color: wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::SrcAlpha,
                dst_factor: wgpu::BlendFactor::One,
                operation: wgpu::BlendOperation::Add,
            },
            alpha: wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::One,
                dst_factor: wgpu::BlendFactor::One,
                operation: wgpu::BlendOperation::Add,
            },
        }),
        BlendMode::Multiply => Some(wgpu::BlendState {
            color: wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::Dst,
                dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
                operation: wgpu::BlendOperation::Add,
            },
            alpha: over,
        }),
        BlendMode::Replace => None,
    }
}

pub(crate) fn topology(mode: crate::gfx::DrawMode) -> wgpu::PrimitiveTopology {
    use crate::gfx::DrawMode;

    match mode {
        DrawMode::Triangles => wgpu::PrimitiveTopology::TriangleList,
        DrawMode::TriangleStrip => wgpu::PrimitiveTopology::TriangleStrip,
        DrawMode::Lines => wgpu::PrimitiveTopology::LineList,
        DrawMode::Points => wgpu::PrimitiveTopology::PointList,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replace_has_no_blend_state() {
        assert!(blend_state(BlendMode::Replace).is_none());
        assert!(blend_state(BlendMode::Alpha).is_some());
    }

    #[test]
    fn points_map_to_point_list() {
        assert_eq!(topology(crate::gfx::DrawMode::Points), wgpu::PrimitiveTopology::PointList);
    }
}
