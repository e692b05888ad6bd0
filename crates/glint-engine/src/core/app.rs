use winit::event::WindowEvent;

use crate::coords::Viewport;
use crate::device::Gpu;

use super::ctx::FrameCtx;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AppControl {
    Continue,
    Exit,
}

/// Callbacks the runtime invokes for its window.
///
/// GPU resources are created in `on_start`, once the device exists.
pub trait App {
    fn on_start(&mut self, gpu: &Gpu<'_>, viewport: Viewport) -> anyhow::Result<()>;

    /// Logical viewport and physical surface size after a resize.
    fn on_resize(&mut self, gpu: &Gpu<'_>, viewport: Viewport) {
        let _ = (gpu, viewport);
    }

    fn on_window_event(&mut self, event: &WindowEvent) -> AppControl {
        let _ = event;
        AppControl::Continue
    }

    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl;

    /// Called before the device is dropped.
    fn on_exit(&mut self, gpu: &Gpu<'_>) {
        let _ = gpu;
    }
}
