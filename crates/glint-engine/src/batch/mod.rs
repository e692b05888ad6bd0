//! Accumulate-and-flush batching.
//!
//! [`SpriteBatch`] writes four textured vertices per sprite; [`InstancedBatch`]
//! writes one record per instance against a constant base mesh and backs the
//! primitive renderers in `crate::shapes`.

mod accumulator;
mod instanced;
mod sprite;

pub use accumulator::Accumulator;
pub use instanced::{InstancedBatch, InstancedDesc};
pub use sprite::{
    quad_corners, source_uv, SpriteBatch, SpriteBatchConfig, SpriteOptions, INDICES_PER_SPRITE, SPRITE_LAYOUT,
    SPRITE_STRIDE, VERTICES_PER_SPRITE,
};

/// Counters collected between `begin` and `end`.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct BatchStats {
    /// Draw calls issued.
    pub flushes: usize,
    /// Instances drawn across all flushes.
    pub instances: usize,
    /// Texture changes, counting the first texture of the frame.
    pub texture_switches: usize,
}

impl BatchStats {
    pub fn merge(&mut self, other: BatchStats) {
        self.flushes += other.flushes;
        self.instances += other.instances;
        self.texture_switches += other.texture_switches;
    }
}
