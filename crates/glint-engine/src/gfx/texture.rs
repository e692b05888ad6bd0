use std::sync::atomic::{AtomicU64, Ordering};

/// Process-unique texture identity, the key for per-texture batching and
/// pipeline caches.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct TextureId(u64);

static NEXT_TEXTURE_ID: AtomicU64 = AtomicU64::new(1);

impl TextureId {
    pub fn next() -> Self {
        Self(NEXT_TEXTURE_ID.fetch_add(1, Ordering::Relaxed))
    }

    #[inline]
    pub fn raw(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum TextureFilter {
    #[default]
    Linear,
    Nearest,
}

#[derive(Debug, Copy, Clone)]
pub struct TextureDesc<'a> {
    pub label: &'a str,
    pub width: u32,
    pub height: u32,
    pub filter: TextureFilter,
    /// Usable as a color attachment.
    pub render_target: bool,
}

impl<'a> TextureDesc<'a> {
    pub fn new(label: &'a str, width: u32, height: u32) -> Self {
        Self { label, width, height, filter: TextureFilter::Linear, render_target: false }
    }

    pub fn filter(mut self, filter: TextureFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Bytes of tightly packed RGBA8 pixel data.
    #[inline]
    pub fn byte_len(&self) -> usize {
        self.width as usize * self.height as usize * 4
    }
}

/// Opaque 2D texture handle. Clones alias the same backend object.
pub trait TextureHandle: Clone {
    fn id(&self) -> TextureId;

    fn width(&self) -> u32;

    fn height(&self) -> u32;

    #[inline]
    fn size_f32(&self) -> (f32, f32) {
        (self.width() as f32, self.height() as f32)
    }
}

/// Off-screen framebuffer: color texture plus depth/stencil attachment.
pub trait RenderTargetHandle {
    type Texture: TextureHandle;

    fn color(&self) -> &Self::Texture;

    fn size(&self) -> (u32, u32) {
        (self.color().width(), self.color().height())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique() {
        let a = TextureId::next();
        let b = TextureId::next();
        assert_ne!(a, b);
        assert!(b.raw() > a.raw());
    }
}
