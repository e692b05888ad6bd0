//! Files, images, textures and bitmap fonts.
//!
//! Loading happens at initialization; nothing here is on the per-frame path.

mod font;
mod loader;
mod textures;

pub use font::{pack_shelves, BitmapFont, FontAtlas, Glyph};
pub use loader::{FileLoader, FsLoader};
pub use textures::TextureManager;
