//! glint engine crate.
//!
//! A batched 2D renderer over two graphics backends: a bind-style one on
//! `glow` and an explicit one on `wgpu`. Renderers are generic over
//! [`gfx::Backend`] and only talk to the capability traits it bundles.
//!
//! Layers, bottom-up:
//! - `gfx` traits and descriptors, `backend::{gl, wgpu}` implementations
//! - `batch` accumulator, sprite batcher and instanced batcher
//! - `shapes`, `particles`, `post` renderers built on those batchers
//! - `render::Renderer`, the frame orchestrator
//! - `device`, `window`, `core` for running on a winit window

pub mod logging;
pub mod coords;
pub mod time;
pub mod camera;
pub mod error;

pub mod gfx;
pub mod backend;
pub mod device;

pub mod assets;
pub mod batch;
pub mod shapes;
pub mod particles;
pub mod post;
pub mod render;

pub mod input;
pub mod window;
pub mod core;
