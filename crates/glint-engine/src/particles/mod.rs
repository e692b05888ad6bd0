//! GPU-resident particle simulation over transform feedback.

mod emitter;
mod rng;

pub use emitter::{EmitInput, ParticleConfig, ParticleEmitter, ParticleLayout};
pub use rng::Rng;
