//! Off-screen post-processing.
//!
//! Scene rendering is redirected into an off-screen target with
//! [`PostPipeline::bind`]; [`PostPipeline::draw_pass`] then runs the effect
//! chain through ping-pong targets and composites the result onto the canvas.

mod effect;
mod pipeline;

pub use effect::PostEffect;
pub use pipeline::{PostConfig, PostPipeline};
