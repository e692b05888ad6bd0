//! Backend-agnostic graphics capabilities.
//!
//! Batchers and primitive renderers are written once against [`Backend`] and the
//! capability traits it bundles ([`GeometryBuffer`], [`ShaderProgram`],
//! [`TextureHandle`], [`RenderTargetHandle`]). Two implementations live under
//! `crate::backend`:
//!
//! - `gl`: bind-style. State is global to the context, so `Pass` carries
//!   almost nothing.
//! - `wgpu`: explicit. `Pass` carries the command encoder and the current
//!   attachment; every bind/upload/draw is recorded against it.
//!
//! Shared code never branches on which backend it runs on.

mod blend;
mod geometry;
mod program;
mod texture;

#[cfg(test)]
pub(crate) mod recording;

pub use blend::BlendMode;
pub use geometry::{
    BufferContents, BufferDesc, BufferLayout, DrawMode, DrawParams, GeometryBuffer, GeometryDesc,
    IndexData, StepMode, VertexAttribute,
};
pub use program::{
    GlslSource, ProgramDesc, ProgramState, ShaderProgram, ShaderSource, UniformEntry,
    UniformHandle, UniformKind, UniformSet, UniformValue, UseParams,
};
pub use texture::{RenderTargetHandle, TextureDesc, TextureFilter, TextureHandle, TextureId};

use crate::coords::ColorRgba;
use crate::error::Result;

/// A graphics backend: resource factory plus the associated handle types.
pub trait Backend: Sized {
    /// Command-recording state threaded through bind/upload/draw calls.
    type Pass<'p>;
    type Texture: TextureHandle;
    type Target: RenderTargetHandle<Texture = Self::Texture>;
    type Geometry: GeometryBuffer<Self>;
    type Program: ShaderProgram<Self>;

    /// Short identifier used in diagnostics ("gl", "wgpu").
    const NAME: &'static str;

    fn create_geometry(&self, desc: &GeometryDesc<'_>) -> Result<Self::Geometry>;

    fn create_program(&self, desc: &ProgramDesc<'_>) -> Result<Self::Program>;

    /// Creates a 2D RGBA8 texture. `pixels` must hold `width * height * 4`
    /// bytes when present.
    fn create_texture(&self, desc: &TextureDesc<'_>, pixels: Option<&[u8]>) -> Result<Self::Texture>;

    fn destroy_texture(&self, texture: Self::Texture);

    /// Creates an off-screen color target with a depth/stencil attachment.
    fn create_target(&self, label: &str, width: u32, height: u32) -> Result<Self::Target>;

    fn destroy_target(&self, target: Self::Target);

    /// Redirects subsequent draws into `target`, or back to the canvas for `None`.
    fn bind_target(&self, pass: &mut Self::Pass<'_>, target: Option<&Self::Target>);

    /// Clears the currently bound color attachment.
    fn clear(&self, pass: &mut Self::Pass<'_>, color: ColorRgba);
}
