//! Frame orchestration.
//!
//! [`Renderer`] owns one instance of every batcher and exposes the stable
//! `begin` / `draw_*` / `end` surface. Each batcher keeps its own pending
//! instances; switching to a different kind of draw flushes the previous one
//! so submission order is preserved across kinds.
//!
//! Convention:
//! - CPU geometry is in logical pixels (top-left origin, +Y down).
//! - The camera's view-projection is captured at `begin`.

mod renderer;

pub use renderer::{Renderer, RendererConfig};
