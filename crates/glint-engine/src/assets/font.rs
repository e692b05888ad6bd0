use std::collections::HashMap;

use crate::coords::{Rect, Vec2};
use crate::error::{GfxError, Result};
use crate::gfx::{Backend, TextureDesc, TextureFilter};

/// Atlas placement and metrics of one glyph, in atlas pixels.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Glyph {
    /// Sub-rect of the atlas texture.
    pub source: Rect,
    /// Top-left of the bitmap relative to the pen, which sits at the top of
    /// the line.
    pub offset: Vec2,
    pub advance: f32,
}

/// Glyph metrics over a single texture, as consumed by
/// [`SpriteBatch::draw_string`](crate::batch::SpriteBatch::draw_string).
pub trait BitmapFont<B: Backend> {
    fn texture(&self) -> &B::Texture;

    fn line_height(&self) -> f32;

    fn glyph(&self, ch: char) -> Option<&Glyph>;
}

/// Places rects on horizontal shelves of a `width`-wide atlas with 1 px of
/// padding. Returns the top-left of each rect and the total height used.
pub fn pack_shelves(sizes: &[(u32, u32)], width: u32) -> Result<(Vec<(u32, u32)>, u32)> {
    const PAD: u32 = 1;
    let mut positions = Vec::with_capacity(sizes.len());
    let (mut x, mut y, mut shelf) = (PAD, PAD, 0u32);
    for &(w, h) in sizes {
        if w + 2 * PAD > width {
            return Err(GfxError::Config(format!("glyph {w}px wide does not fit a {width}px atlas")));
        }
        if x + w + PAD > width {
            x = PAD;
            y += shelf + PAD;
            shelf = 0;
        }
        positions.push((x, y));
        x += w + PAD;
        shelf = shelf.max(h);
    }
    Ok((positions, y + shelf + PAD))
}

/// A font rasterized once at a fixed pixel size into one RGBA texture.
pub struct FontAtlas<B: Backend> {
    texture: B::Texture,
    glyphs: HashMap<char, Glyph>,
    line_height: f32,
    px: f32,
}

impl<B: Backend> FontAtlas<B> {
    pub const ATLAS_WIDTH: u32 = 512;

    /// Rasterizes every char of `charset` from a TrueType/OpenType font.
    pub fn new(backend: &B, label: &str, font_bytes: &[u8], px: f32, charset: &str) -> Result<Self> {
        let font = fontdue::Font::from_bytes(font_bytes, fontdue::FontSettings { scale: px, ..Default::default() })
            .map_err(|e| GfxError::Font(e.to_string()))?;

        let (ascent, line_height) = match font.horizontal_line_metrics(px) {
            Some(m) => (m.ascent, m.new_line_size),
            None => (px, px * 1.2),
        };

        let mut chars: Vec<char> = charset.chars().collect();
        chars.sort_unstable();
        chars.dedup();

        let rasters: Vec<(char, fontdue::Metrics, Vec<u8>)> = chars
            .into_iter()
            .map(|ch| {
                let (metrics, coverage) = font.rasterize(ch, px);
                (ch, metrics, coverage)
            })
            .collect();

        let sizes: Vec<(u32, u32)> = rasters.iter().map(|(_, m, _)| (m.width as u32, m.height as u32)).collect();
        let (positions, used) = pack_shelves(&sizes, Self::ATLAS_WIDTH)?;
        let height = used.next_power_of_two();
        let width = Self::ATLAS_WIDTH;

        let mut pixels = vec![0u8; (width * height * 4) as usize];
        let mut glyphs = HashMap::with_capacity(rasters.len());
        for ((ch, m, coverage), &(gx, gy)) in rasters.iter().zip(&positions) {
            for row in 0..m.height {
                for col in 0..m.width {
                    let alpha = coverage[row * m.width + col];
                    let i = (((gy as usize + row) * width as usize) + gx as usize + col) * 4;
                    pixels[i..i + 4].copy_from_slice(&[255, 255, 255, alpha]);
                }
            }
            glyphs.insert(
                *ch,
                Glyph {
                    source: Rect::new(gx as f32, gy as f32, m.width as f32, m.height as f32),
                    offset: Vec2::new(m.xmin as f32, ascent - m.ymin as f32 - m.height as f32),
                    advance: m.advance_width,
                },
            );
        }

        let texture =
            backend.create_texture(&TextureDesc::new(label, width, height).filter(TextureFilter::Linear), Some(&pixels))?;
        log::debug!("font atlas '{label}' built: {} glyphs at {px}px, {width}x{height}", glyphs.len());

        Ok(Self { texture, glyphs, line_height, px })
    }

    pub fn px(&self) -> f32 {
        self.px
    }

    /// Width of `text` on its longest line, at scale 1.
    pub fn measure(&self, text: &str) -> f32 {
        text.split('\n')
            .map(|line| line.chars().filter_map(|c| self.glyphs.get(&c)).map(|g| g.advance).sum::<f32>())
            .fold(0.0, f32::max)
    }

    pub fn destroy(self, backend: &B) {
        backend.destroy_texture(self.texture);
    }
}

impl<B: Backend> BitmapFont<B> for FontAtlas<B> {
    fn texture(&self) -> &B::Texture {
        &self.texture
    }

    fn line_height(&self) -> f32 {
        self.line_height
    }

    fn glyph(&self, ch: char) -> Option<&Glyph> {
        self.glyphs.get(&ch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shelves_wrap_and_never_overlap() {
        let sizes = [(100, 10), (200, 20), (150, 5), (30, 30)];
        let (positions, height) = pack_shelves(&sizes, 256).unwrap();
        assert_eq!(positions[0], (1, 1));
        assert_eq!(positions[1], (1, 12));
        assert_eq!(positions[2], (1, 33));
        assert_eq!(positions[3], (152, 33));
        assert_eq!(height, 33 + 30 + 1);

        let rects: Vec<Rect> = sizes
            .iter()
            .zip(&positions)
            .map(|(&(w, h), &(x, y))| Rect::new(x as f32, y as f32, w as f32, h as f32))
            .collect();
        for (i, a) in rects.iter().enumerate() {
            for b in &rects[i + 1..] {
                assert!(a.intersect(*b).is_none_or(|r| r.area() == 0.0));
            }
        }
    }

    #[test]
    fn oversized_glyph_is_rejected() {
        assert!(matches!(pack_shelves(&[(600, 10)], 512), Err(GfxError::Config(_))));
    }
}
