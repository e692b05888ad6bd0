//! Frame timing.
//!
//! One [`FrameClock`] per render loop; `tick()` once per presented frame.
//! The clamped `dt` feeds particle updates and animation.

mod frame_clock;

pub use frame_clock::{FrameClock, FrameTime};
