/// One full-screen effect in a post chain.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum PostEffect {
    /// Separable gaussian blur; `radius` scales the tap spacing in texels.
    Blur { radius: f32 },
    /// Bright-pass, blurred, added back onto the source.
    Bloom { threshold: f32, radius: f32 },
    /// Barrel distortion with scanlines.
    Crt { curvature: f32, scanlines: f32 },
    /// Ordered 4x4 Bayer dither to `levels` steps per channel.
    Dither { levels: f32 },
}

impl PostEffect {
    /// Full-screen draws the effect issues.
    pub fn draw_count(&self) -> usize {
        match self {
            PostEffect::Blur { .. } => 2,
            PostEffect::Bloom { .. } => 5,
            PostEffect::Crt { .. } | PostEffect::Dither { .. } => 1,
        }
    }
}

impl Default for PostEffect {
    fn default() -> Self {
        PostEffect::Bloom { threshold: 0.7, radius: 1.5 }
    }
}
