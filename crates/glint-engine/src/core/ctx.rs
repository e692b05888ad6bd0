use winit::window::Window;

use crate::backend::wgpu::{WgpuBackend, WgpuPass};
use crate::coords::{ColorRgba, Viewport};
use crate::device::{Gpu, SurfaceErrorAction};
use crate::error::{GfxError, Result};
use crate::gfx::Backend;
use crate::input::InputState;
use crate::time::FrameTime;

use super::app::AppControl;

/// Per-frame context handed to [`App::on_frame`](super::App::on_frame).
///
/// `'w` is the window borrow carried by `Gpu<'w>`.
pub struct FrameCtx<'a, 'w> {
    pub window: &'a Window,
    pub gpu: &'a mut Gpu<'w>,
    pub input: &'a InputState,
    pub time: FrameTime,
}

impl FrameCtx<'_, '_> {
    /// Window size in logical pixels.
    pub fn viewport(&self) -> Viewport {
        let size = self.window.inner_size().to_logical::<f32>(self.window.scale_factor());
        Viewport::new(size.width, size.height)
    }

    /// Acquires the next swapchain image, clears it, records `draw` and
    /// presents.
    ///
    /// Surface errors skip the frame or reconfigure; device loss ends the app.
    pub fn render<F>(&mut self, clear: ColorRgba, draw: F) -> AppControl
    where
        F: FnOnce(&WgpuBackend, &mut WgpuPass<'_>) -> Result<()>,
    {
        let mut frame = match self.gpu.begin_frame() {
            Ok(frame) => frame,
            Err(err) => {
                let message = err.to_string();
                return match self.gpu.handle_surface_error(err) {
                    SurfaceErrorAction::Fatal => {
                        log::error!("surface error is fatal: {message}");
                        AppControl::Exit
                    }
                    _ => AppControl::Continue,
                };
            }
        };

        let recorded = {
            let backend = self.gpu.backend();
            let mut pass = self.gpu.pass(&mut frame);
            backend.clear(&mut pass, clear);
            draw(backend, &mut pass)
        };

        if let Err(err) = recorded {
            log::warn!("frame dropped: {err}");
            return AppControl::Continue;
        }

        self.window.pre_present_notify();
        match self.gpu.submit(frame) {
            Ok(()) => AppControl::Continue,
            Err(GfxError::DeviceLost(msg)) => {
                log::error!("device lost: {msg}");
                AppControl::Exit
            }
            Err(err) => {
                log::warn!("submit failed: {err}");
                AppControl::Continue
            }
        }
    }
}
