//! wgpu adapter, device and surface acquisition.
//!
//! [`Gpu`] owns the window surface and the [`WgpuBackend`](crate::backend::wgpu::WgpuBackend)
//! every renderer draws through.

mod gpu;

pub use gpu::{Gpu, GpuFrame, GpuInit, SurfaceErrorAction};
