use std::collections::HashMap;

use crate::error::{GfxError, Result};
use crate::gfx::{Backend, TextureDesc, TextureFilter, TextureHandle, TextureId};

use super::FileLoader;

/// Keyed texture registry. Owns the backend textures it creates.
pub struct TextureManager<B: Backend> {
    textures: HashMap<String, B::Texture>,
    next_cache: u64,
}

impl<B: Backend> Default for TextureManager<B> {
    fn default() -> Self {
        Self { textures: HashMap::new(), next_cache: 0 }
    }
}

impl<B: Backend> TextureManager<B> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }

    /// Loads and decodes `path` under `key`. A key already present is returned
    /// without touching the file.
    pub fn load_texture_2d(
        &mut self,
        backend: &B,
        loader: &dyn FileLoader,
        key: &str,
        path: &str,
        filter: TextureFilter,
    ) -> Result<B::Texture> {
        if let Some(texture) = self.textures.get(key) {
            return Ok(texture.clone());
        }
        let image = loader.load_image(path)?;
        let (width, height) = image.dimensions();
        let texture = backend.create_texture(&TextureDesc::new(key, width, height).filter(filter), Some(image.as_raw()))?;
        log::debug!("texture '{key}' loaded from {path} ({width}x{height})");
        self.textures.insert(key.to_string(), texture.clone());
        Ok(texture)
    }

    /// Creates a texture from RGBA8 pixels, replacing any texture under `key`.
    ///
    /// A replaced texture is destroyed and its id returned alongside the new
    /// one; per-texture caches holding that id must be evicted.
    pub fn create_texture(
        &mut self,
        backend: &B,
        key: &str,
        width: u32,
        height: u32,
        pixels: Option<&[u8]>,
        filter: TextureFilter,
    ) -> Result<(B::Texture, Option<TextureId>)> {
        let texture = backend.create_texture(&TextureDesc::new(key, width, height).filter(filter), pixels)?;
        let replaced = self.textures.insert(key.to_string(), texture.clone()).map(|old| {
            let id = old.id();
            backend.destroy_texture(old);
            log::debug!("texture '{key}' replaced");
            id
        });
        Ok((texture, replaced))
    }

    /// Creates a renderable scratch texture under a generated key.
    pub fn create_cache_texture(&mut self, backend: &B, width: u32, height: u32) -> Result<(String, B::Texture)> {
        let key = format!("cache:{}", self.next_cache);
        self.next_cache += 1;
        let mut desc = TextureDesc::new(&key, width, height);
        desc.render_target = true;
        let texture = backend.create_texture(&desc, None)?;
        self.textures.insert(key.clone(), texture.clone());
        Ok((key, texture))
    }

    pub fn get_texture(&self, key: &str) -> Option<&B::Texture> {
        self.textures.get(key)
    }

    /// Like [`Self::get_texture`], failing on a missing key.
    pub fn require(&self, key: &str) -> Result<&B::Texture> {
        self.get_texture(key).ok_or_else(|| GfxError::Resource(format!("no texture '{key}'")))
    }

    /// Destroys the texture under `key`. Returns its id so per-texture caches
    /// can be evicted.
    pub fn remove_texture(&mut self, backend: &B, key: &str) -> Option<TextureId> {
        let texture = self.textures.remove(key)?;
        let id = texture.id();
        backend.destroy_texture(texture);
        log::debug!("texture '{key}' removed");
        Some(id)
    }

    /// Destroys every texture. Returns the ids released.
    pub fn free_resources(&mut self, backend: &B) -> Vec<TextureId> {
        let ids = self
            .textures
            .drain()
            .map(|(_, texture)| {
                let id = texture.id();
                backend.destroy_texture(texture);
                id
            })
            .collect::<Vec<_>>();
        log::debug!("freed {} textures", ids.len());
        ids
    }
}
