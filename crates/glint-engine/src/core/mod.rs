//! Application contract driven by the window runtime.

mod app;
mod ctx;

pub use app::{App, AppControl};
pub use ctx::FrameCtx;
