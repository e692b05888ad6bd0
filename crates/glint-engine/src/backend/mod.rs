//! Concrete graphics backends.
//!
//! - [`gl`]: bind-style, on `glow` (OpenGL ES 3 / WebGL2 semantics).
//! - [`self::wgpu`]: explicit, on `wgpu` (WebGPU semantics).

pub mod gl;
pub mod wgpu;

pub use self::gl::{GlBackend, GlGeometry, GlPass, GlProgram, GlTarget, GlTexture};
pub use self::wgpu::{
    StagingChunk, StagingPool, WgpuBackend, WgpuGeometry, WgpuPass, WgpuProgram, WgpuTarget, WgpuTexture,
};
