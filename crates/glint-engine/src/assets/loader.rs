use std::path::{Path, PathBuf};

use crate::error::Result;

/// Source of text, bytes and decoded images.
pub trait FileLoader {
    fn load_bytes(&self, path: &str) -> Result<Vec<u8>>;

    fn load_file(&self, path: &str) -> Result<String> {
        let bytes = self.load_bytes(path)?;
        String::from_utf8(bytes).map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e).into())
    }

    /// Decodes PNG, JPEG, BMP or GIF into tightly packed RGBA8.
    fn load_image(&self, path: &str) -> Result<image::RgbaImage> {
        let bytes = self.load_bytes(path)?;
        Ok(image::load_from_memory(&bytes)?.to_rgba8())
    }
}

/// Reads paths relative to a root directory.
#[derive(Debug, Clone)]
pub struct FsLoader {
    root: PathBuf,
}

impl FsLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Default for FsLoader {
    fn default() -> Self {
        Self::new(".")
    }
}

impl FileLoader for FsLoader {
    fn load_bytes(&self, path: &str) -> Result<Vec<u8>> {
        let full = self.root.join(path);
        log::debug!("loading {}", full.display());
        Ok(std::fs::read(full)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GfxError;

    #[test]
    fn missing_file_is_an_io_error() {
        let loader = FsLoader::new(std::env::temp_dir());
        let err = loader.load_file("glint-definitely-missing.txt");
        assert!(matches!(err, Err(GfxError::Io(_))));
    }

    #[test]
    fn reads_text_relative_to_root() {
        let dir = std::env::temp_dir();
        let name = format!("glint-loader-{}.txt", std::process::id());
        std::fs::write(dir.join(&name), "hello").unwrap();
        let text = FsLoader::new(&dir).load_file(&name).unwrap();
        std::fs::remove_file(dir.join(&name)).unwrap();
        assert_eq!(text, "hello");
    }
}
