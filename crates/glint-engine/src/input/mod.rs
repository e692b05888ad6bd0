//! Pointer and keyboard state.
//!
//! Platform-agnostic: the window runtime translates winit events into
//! [`InputEvent`]s and feeds them to an [`InputState`].

mod state;

pub use state::{InputEvent, InputState, Key, MouseButton};
