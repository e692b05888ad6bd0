use glam::Mat4;

use crate::assets::BitmapFont;
use crate::camera::Camera2d;
use crate::coords::{ColorRgba, Rect, Vec2};
use crate::error::{GfxError, Result};
use crate::gfx::{
    Backend, BlendMode, BufferContents, BufferDesc, BufferLayout, DrawMode, DrawParams, GeometryBuffer,
    GeometryDesc, GlslSource, IndexData, ProgramDesc, ShaderProgram, ShaderSource, StepMode, TextureHandle,
    TextureId, UseParams, VertexAttribute,
};

use super::{Accumulator, BatchStats};

/// Vertices per sprite quad.
pub const VERTICES_PER_SPRITE: usize = 4;
/// Indices per sprite quad.
pub const INDICES_PER_SPRITE: usize = 6;

const ATTRIBUTES: [VertexAttribute; 3] = [
    VertexAttribute::new(0, 3), // position
    VertexAttribute::new(1, 2), // texcoord
    VertexAttribute::new(2, 4), // tint
];

/// `pos.xyz, uv.xy, rgba`.
pub const SPRITE_LAYOUT: BufferLayout = BufferLayout::new(StepMode::Vertex, &ATTRIBUTES);

/// Floats per sprite instance.
pub const SPRITE_STRIDE: usize = VERTICES_PER_SPRITE * SPRITE_LAYOUT.stride_floats();

const SPRITE_VERT: &str = include_str!("../shaders/sprite.vert.glsl");
const SPRITE_FRAG: &str = include_str!("../shaders/sprite.frag.glsl");
const SPRITE_WGSL: &str = include_str!("../shaders/sprite.wgsl");

/// Construction parameters for a [`SpriteBatch`].
#[derive(Debug, Clone)]
pub struct SpriteBatchConfig {
    /// Maximum sprites per flush. Bounded by 16-bit indexing.
    pub capacity: usize,
    /// Default rotation pivot, relative to the destination rect (0..1).
    pub pivot: Vec2,
}

impl Default for SpriteBatchConfig {
    fn default() -> Self {
        Self { capacity: 2048, pivot: Vec2::new(0.5, 0.5) }
    }
}

/// Per-draw options for [`SpriteBatch::draw_ex`].
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SpriteOptions {
    /// Multiplied with the sampled texel.
    pub tint: ColorRgba,
    /// Radians, clockwise on screen.
    pub rotation: f32,
    /// World-space rotation anchor; defaults to the batch pivot.
    pub anchor: Option<Vec2>,
    /// Pixel rect within the texture; defaults to the whole texture.
    pub source: Option<Rect>,
    /// Mirrors the source horizontally.
    pub flip_x: bool,
    /// Mirrors the source vertically.
    pub flip_y: bool,
}

impl Default for SpriteOptions {
    fn default() -> Self {
        Self {
            tint: ColorRgba::white(),
            rotation: 0.0,
            anchor: None,
            source: None,
            flip_x: false,
            flip_y: false,
        }
    }
}

/// Textured-quad batcher.
///
/// Sprites sharing a texture accumulate into one upload and one indexed draw.
/// A texture change flushes with the previous texture; reaching the per-begin
/// limit flushes immediately.
pub struct SpriteBatch<B: Backend> {
    program: B::Program,
    geometry: B::Geometry,
    acc: Accumulator,
    limit: usize,
    pivot: Vec2,

    texture: Option<B::Texture>,
    blend: BlendMode,
    view_projection: Mat4,
    active: bool,
    stats: BatchStats,
}

impl<B: Backend> SpriteBatch<B> {
    pub fn new(backend: &B, config: SpriteBatchConfig) -> Result<Self> {
        let capacity = config.capacity;
        if capacity == 0 || capacity * VERTICES_PER_SPRITE > u16::MAX as usize + 1 {
            return Err(GfxError::Config(format!(
                "sprite capacity {capacity} outside 1..={}",
                (u16::MAX as usize + 1) / VERTICES_PER_SPRITE
            )));
        }

        let indices = quad_indices(capacity);
        let buffers = [BufferDesc {
            layout: SPRITE_LAYOUT,
            contents: BufferContents::Empty(capacity * SPRITE_STRIDE),
        }];
        let geometry = backend.create_geometry(&GeometryDesc {
            label: "sprite batch",
            buffers: &buffers,
            indices: Some(IndexData::U16(&indices)),
            mode: DrawMode::Triangles,
            count: (capacity * INDICES_PER_SPRITE) as u32,
            feedback: false,
        })?;

        let program = backend.create_program(
            &ProgramDesc::new(
                "sprite",
                ShaderSource {
                    glsl: Some(GlslSource { vertex: SPRITE_VERT, fragment: SPRITE_FRAG }),
                    wgsl: Some(SPRITE_WGSL),
                },
                &[SPRITE_LAYOUT],
            )
            .textured(),
        )?;

        log::debug!("sprite batch ready on {} (capacity {capacity})", B::NAME);

        Ok(Self {
            program,
            geometry,
            acc: Accumulator::new(SPRITE_STRIDE, capacity),
            limit: capacity,
            pivot: config.pivot,
            texture: None,
            blend: BlendMode::Alpha,
            view_projection: Mat4::IDENTITY,
            active: false,
            stats: BatchStats::default(),
        })
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.acc.capacity()
    }

    /// Default rotation pivot, relative to the destination rect.
    pub fn set_pivot(&mut self, pivot: Vec2) {
        self.pivot = pivot;
    }

    /// Counters since the last `begin`.
    pub fn stats(&self) -> BatchStats {
        self.stats
    }

    pub fn program_mut(&mut self) -> &mut B::Program {
        &mut self.program
    }

    /// Starts a batch. `max_instances` lowers the flush threshold for this
    /// batch only; it is clamped to the configured capacity.
    pub fn begin(&mut self, camera: &Camera2d, blend: BlendMode, max_instances: Option<usize>) {
        self.acc.clear();
        self.texture = None;
        self.blend = blend;
        self.view_projection = camera.view_projection();
        self.limit = max_instances.unwrap_or(self.acc.capacity()).clamp(1, self.acc.capacity());
        self.stats = BatchStats::default();
        self.active = true;
    }

    pub fn draw(&mut self, pass: &mut B::Pass<'_>, texture: &B::Texture, dest: Rect, tint: ColorRgba) {
        self.draw_ex(pass, texture, dest, &SpriteOptions { tint, ..SpriteOptions::default() });
    }

    /// Draws the `source` pixel rect of `texture` into `dest`.
    pub fn draw_source(
        &mut self,
        pass: &mut B::Pass<'_>,
        texture: &B::Texture,
        dest: Rect,
        source: Rect,
        tint: ColorRgba,
    ) {
        self.draw_ex(pass, texture, dest, &SpriteOptions { tint, source: Some(source), ..SpriteOptions::default() });
    }

    pub fn draw_ex(&mut self, pass: &mut B::Pass<'_>, texture: &B::Texture, dest: Rect, options: &SpriteOptions) {
        if !self.active {
            log::warn!("sprite draw outside begin/end ignored");
            return;
        }

        if self.texture.as_ref().map(TextureHandle::id) != Some(texture.id()) {
            self.flush(pass);
            self.texture = Some(texture.clone());
            self.stats.texture_switches += 1;
        }

        let anchor = options.anchor.unwrap_or_else(|| dest.point_at(self.pivot));
        let corners = quad_corners(dest, options.rotation, anchor);
        let uv = source_uv(options.source, texture.width(), texture.height(), options.flip_x, options.flip_y);
        write_quad(self.acc.push(), &corners, &uv, options.tint);

        if self.acc.len() >= self.limit {
            self.flush(pass);
        }
    }

    /// Draws `text` left to right from `position` (top-left of the first line).
    /// `\n` starts a new line. Glyphs missing from the font are skipped.
    pub fn draw_string<F>(
        &mut self,
        pass: &mut B::Pass<'_>,
        font: &F,
        text: &str,
        position: Vec2,
        tint: ColorRgba,
        scale: f32,
    ) where
        F: BitmapFont<B> + ?Sized,
    {
        let texture = font.texture();
        let mut pen = position;
        for ch in text.chars() {
            if ch == '\n' {
                pen = Vec2::new(position.x, pen.y + font.line_height() * scale);
                continue;
            }
            let Some(glyph) = font.glyph(ch) else { continue };
            if glyph.source.size.x > 0.0 && glyph.source.size.y > 0.0 {
                let dest = Rect::new(
                    pen.x + glyph.offset.x * scale,
                    pen.y + glyph.offset.y * scale,
                    glyph.source.size.x * scale,
                    glyph.source.size.y * scale,
                );
                self.draw_source(pass, texture, dest, glyph.source, tint);
            }
            pen.x += glyph.advance * scale;
        }
    }

    /// Flushes the remaining sprites and closes the batch.
    pub fn end(&mut self, pass: &mut B::Pass<'_>) {
        self.flush(pass);
        self.active = false;
    }

    /// Uploads the written range and issues one draw for it.
    pub fn flush(&mut self, pass: &mut B::Pass<'_>) {
        if self.acc.is_empty() {
            return;
        }
        let Some(texture) = self.texture.as_ref() else {
            self.acc.clear();
            return;
        };
        let count = self.acc.len();

        self.geometry.bind(pass);
        self.geometry.bind_buffer(0);
        self.geometry.buffer_sub_data(pass, self.acc.as_slice());
        self.program.use_program(
            pass,
            &UseParams { view_projection: self.view_projection, texture: Some(texture), blend: self.blend },
        );
        self.geometry.draw(pass, DrawParams::elements((count * INDICES_PER_SPRITE) as u32));

        self.stats.flushes += 1;
        self.stats.instances += count;
        self.acc.clear();
    }

    /// Drops per-texture state held for `id`.
    pub fn release_texture(&mut self, id: TextureId) {
        if self.texture.as_ref().map(TextureHandle::id) == Some(id) {
            self.texture = None;
            self.acc.clear();
        }
        self.program.release_texture(id);
    }

    pub fn destroy(&mut self) {
        self.geometry.delete();
        self.program.destroy();
    }
}

// ── geometry helpers ──────────────────────────────────────────────────────

/// `0,1,2, 0,2,3` per quad, offset by 4 vertices each.
fn quad_indices(quads: usize) -> Vec<u16> {
    (0..quads)
        .flat_map(|q| {
            let b = (q * VERTICES_PER_SPRITE) as u16;
            [b, b + 1, b + 2, b, b + 2, b + 3]
        })
        .collect()
}

/// Corners of `dest` (top-left, top-right, bottom-right, bottom-left) rotated
/// by `rotation` radians about `anchor`.
pub fn quad_corners(dest: Rect, rotation: f32, anchor: Vec2) -> [Vec2; 4] {
    let corners = dest.corners();
    if rotation == 0.0 {
        return corners;
    }
    corners.map(|c| c.rotate_about(anchor, rotation))
}

/// UV corners in the same order as [`quad_corners`].
pub fn source_uv(source: Option<Rect>, width: u32, height: u32, flip_x: bool, flip_y: bool) -> [Vec2; 4] {
    let (mut u0, mut v0, mut u1, mut v1) = match source {
        Some(s) => {
            let (w, h) = (width.max(1) as f32, height.max(1) as f32);
            let tx = s.origin.x / w;
            let ty = s.origin.y / h;
            (tx, ty, tx + s.size.x / w, ty + s.size.y / h)
        }
        None => (0.0, 0.0, 1.0, 1.0),
    };
    if flip_x {
        std::mem::swap(&mut u0, &mut u1);
    }
    if flip_y {
        std::mem::swap(&mut v0, &mut v1);
    }
    [Vec2::new(u0, v0), Vec2::new(u1, v0), Vec2::new(u1, v1), Vec2::new(u0, v1)]
}

fn write_quad(slot: &mut [f32], corners: &[Vec2; 4], uv: &[Vec2; 4], tint: ColorRgba) {
    let stride = SPRITE_LAYOUT.stride_floats();
    for (i, vertex) in slot.chunks_exact_mut(stride).enumerate() {
        vertex.copy_from_slice(&[
            corners[i].x,
            corners[i].y,
            0.0,
            uv[i].x,
            uv[i].y,
            tint.r,
            tint.g,
            tint.b,
            tint.a,
        ]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::Viewport;
    use crate::gfx::recording::{Command, RecordingBackend};

    fn setup(capacity: usize) -> (RecordingBackend, SpriteBatch<RecordingBackend>, Camera2d) {
        let backend = RecordingBackend::new();
        let batch =
            SpriteBatch::new(&backend, SpriteBatchConfig { capacity, ..SpriteBatchConfig::default() }).unwrap();
        backend.clear_log();
        (backend, batch, Camera2d::new(Viewport::new(100.0, 100.0)))
    }

    fn sprite_draws(backend: &RecordingBackend) -> Vec<u32> {
        backend.draws().into_iter().map(|(_, count, _)| count / INDICES_PER_SPRITE as u32).collect()
    }

    #[test]
    fn capacity_overflow_flushes_in_chunks() {
        let (backend, mut batch, camera) = setup(4);
        let tex = backend.texture(8, 8);
        batch.begin(&camera, BlendMode::Alpha, None);
        for i in 0..10 {
            batch.draw(&mut (), &tex, Rect::new(i as f32, 0.0, 1.0, 1.0), ColorRgba::white());
        }
        batch.end(&mut ());

        let draws = sprite_draws(&backend);
        assert_eq!(draws.len(), 10usize.div_ceil(4));
        assert_eq!(draws.iter().sum::<u32>(), 10);
        assert_eq!(batch.stats().flushes, 3);
        assert_eq!(batch.stats().instances, 10);
    }

    #[test]
    fn texture_change_flushes_with_previous_texture() {
        let (backend, mut batch, camera) = setup(16);
        let a = backend.texture(8, 8);
        let b = backend.texture(8, 8);
        let r = Rect::new(0.0, 0.0, 4.0, 4.0);
        batch.begin(&camera, BlendMode::Alpha, None);
        batch.draw(&mut (), &a, r, ColorRgba::white());
        batch.draw(&mut (), &a, r, ColorRgba::white());
        batch.draw(&mut (), &b, r, ColorRgba::white());
        batch.draw(&mut (), &a, r, ColorRgba::white());
        batch.end(&mut ());

        assert_eq!(sprite_draws(&backend), vec![2, 1, 1]);
        assert_eq!(backend.used_textures(), vec![Some(a.id), Some(b.id), Some(a.id)]);
    }

    #[test]
    fn upload_covers_only_written_instances() {
        let (backend, mut batch, camera) = setup(64);
        let tex = backend.texture(8, 8);
        batch.begin(&camera, BlendMode::Alpha, None);
        for _ in 0..5 {
            batch.draw(&mut (), &tex, Rect::new(0.0, 0.0, 1.0, 1.0), ColorRgba::white());
        }
        batch.end(&mut ());

        let uploads = backend.uploads();
        assert_eq!(uploads.len(), 1);
        let bytes = uploads[0].1.len() * std::mem::size_of::<f32>();
        assert_eq!(bytes, 5 * SPRITE_STRIDE * std::mem::size_of::<f32>());
    }

    #[test]
    fn rotation_round_trip_restores_corners() {
        let dest = Rect::new(10.0, 20.0, 30.0, 15.0);
        let anchor = Vec2::new(17.0, 23.0);
        let theta = 0.7;
        let there = quad_corners(dest, theta, anchor);
        let restored = there.map(|c| c.rotate_about(anchor, -theta));
        for (r, o) in restored.iter().zip(dest.corners().iter()) {
            assert!((r.x - o.x).abs() < 1e-4 && (r.y - o.y).abs() < 1e-4, "{r:?} vs {o:?}");
        }
    }

    #[test]
    fn full_source_rect_matches_default_uv() {
        let full = source_uv(Some(Rect::new(0.0, 0.0, 64.0, 32.0)), 64, 32, false, false);
        let default = source_uv(None, 64, 32, false, false);
        assert_eq!(full, default);
        assert_eq!(default[0], Vec2::new(0.0, 0.0));
        assert_eq!(default[2], Vec2::new(1.0, 1.0));
    }

    #[test]
    fn source_rect_is_normalized_by_texture_size() {
        let uv = source_uv(Some(Rect::new(16.0, 8.0, 16.0, 8.0)), 64, 32, false, false);
        assert_eq!(uv[0], Vec2::new(0.25, 0.25));
        assert_eq!(uv[2], Vec2::new(0.5, 0.5));
    }

    #[test]
    fn max_instances_two_gives_two_then_one() {
        let (backend, mut batch, camera) = setup(16);
        let tex = backend.texture(8, 8);
        batch.begin(&camera, BlendMode::Alpha, Some(2));
        batch.draw(&mut (), &tex, Rect::new(0.0, 0.0, 10.0, 10.0), ColorRgba::white());
        batch.draw(&mut (), &tex, Rect::new(10.0, 10.0, 10.0, 10.0), ColorRgba::white());
        batch.draw(&mut (), &tex, Rect::new(20.0, 20.0, 10.0, 10.0), ColorRgba::white());
        batch.end(&mut ());

        assert_eq!(sprite_draws(&backend), vec![2, 1]);
        assert_eq!(backend.used_textures(), vec![Some(tex.id), Some(tex.id)]);
        assert_eq!(batch.stats().instances, 3);
    }

    #[test]
    fn uploaded_vertices_carry_position_uv_and_tint() {
        let (backend, mut batch, camera) = setup(4);
        let tex = backend.texture(8, 8);
        let tint = ColorRgba::new(1.0, 0.5, 0.25, 1.0);
        batch.begin(&camera, BlendMode::Alpha, None);
        batch.draw(&mut (), &tex, Rect::new(2.0, 3.0, 4.0, 5.0), tint);
        batch.end(&mut ());

        let data = &backend.uploads()[0].1;
        // bottom-right vertex
        assert_eq!(&data[18..27], &[6.0, 8.0, 0.0, 1.0, 1.0, 1.0, 0.5, 0.25, 1.0]);
    }

    #[test]
    fn draw_string_advances_and_wraps() {
        use crate::assets::{BitmapFont, Glyph};

        struct Fixed(crate::gfx::recording::RecTexture, Glyph);
        impl BitmapFont<RecordingBackend> for Fixed {
            fn texture(&self) -> &crate::gfx::recording::RecTexture {
                &self.0
            }
            fn line_height(&self) -> f32 {
                10.0
            }
            fn glyph(&self, ch: char) -> Option<&Glyph> {
                (ch != ' ').then_some(&self.1)
            }
        }

        let (backend, mut batch, camera) = setup(2);
        let font = Fixed(
            backend.texture(16, 16),
            Glyph { source: Rect::new(0.0, 0.0, 4.0, 8.0), offset: Vec2::zero(), advance: 5.0 },
        );
        batch.begin(&camera, BlendMode::Alpha, None);
        batch.draw_string(&mut (), &font, "abc\nd", Vec2::new(0.0, 0.0), ColorRgba::white(), 2.0);
        batch.end(&mut ());

        // Capacity 2 forces a flush mid-string.
        assert_eq!(sprite_draws(&backend), vec![2, 2]);
        let uploads = backend.uploads();
        let last = &uploads[1].1;
        // Second upload: 'c' at x = 2 * 10, then 'd' on the next line.
        assert_eq!(last[0], 20.0);
        assert_eq!(&last[SPRITE_STRIDE..SPRITE_STRIDE + 2], &[0.0, 20.0]);
        assert!(backend.commands().iter().all(|c| !matches!(c, Command::Feedback { .. })));
    }
}
