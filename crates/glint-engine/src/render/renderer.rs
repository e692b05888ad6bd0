use crate::assets::{BitmapFont, TextureManager};
use crate::batch::{BatchStats, SpriteBatch, SpriteBatchConfig, SpriteOptions};
use crate::camera::Camera2d;
use crate::coords::{ColorRgba, Rect, Vec2, Viewport};
use crate::error::Result;
use crate::gfx::{Backend, BlendMode, TextureFilter, TextureId};
use crate::shapes::{EllipseRenderer, LineCap, LineJoin, LineRenderer, LineStyle, RectRenderer, RectStyle};

/// Capacities and tessellation settings for a [`Renderer`].
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Sprites per flush.
    pub sprite_capacity: usize,
    /// Instance capacity of each primitive batch.
    pub primitive_capacity: usize,
    /// Segments per rounded-rect corner.
    pub corner_segments: u32,
    /// Segments per ellipse, round join and round cap.
    pub ellipse_segments: u32,
    /// Used by [`Renderer::miter_style`].
    pub miter_limit: f32,
    /// Default sprite rotation pivot, relative to the destination rect.
    pub pivot: Vec2,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            sprite_capacity: 2048,
            primitive_capacity: 4096,
            corner_segments: 10,
            ellipse_segments: 25,
            miter_limit: 4.0,
            pivot: Vec2::new(0.5, 0.5),
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum Kind {
    Sprites,
    Lines,
    Rects,
    Ellipses,
}

/// Backend-agnostic 2D renderer.
pub struct Renderer<B: Backend> {
    config: RendererConfig,
    camera: Camera2d,
    sprites: SpriteBatch<B>,
    lines: LineRenderer<B>,
    rects: RectRenderer<B>,
    ellipses: EllipseRenderer<B>,
    active: Option<Kind>,
    in_frame: bool,
}

impl<B: Backend> Renderer<B> {
    pub fn new(backend: &B, viewport: Viewport, config: RendererConfig) -> Result<Self> {
        let sprites = SpriteBatch::new(
            backend,
            SpriteBatchConfig { capacity: config.sprite_capacity, pivot: config.pivot },
        )?;
        let lines = LineRenderer::new(backend, config.primitive_capacity, config.ellipse_segments)?;
        let rects = RectRenderer::new(backend, config.primitive_capacity, config.corner_segments)?;
        let ellipses = EllipseRenderer::new(backend, config.primitive_capacity, config.ellipse_segments)?;
        log::info!("renderer initialized on {} backend", B::NAME);
        Ok(Self {
            config,
            camera: Camera2d::new(viewport),
            sprites,
            lines,
            rects,
            ellipses,
            active: None,
            in_frame: false,
        })
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    pub fn camera(&self) -> &Camera2d {
        &self.camera
    }

    /// Takes effect at the next `begin`.
    pub fn camera_mut(&mut self) -> &mut Camera2d {
        &mut self.camera
    }

    /// A line style using the configured miter limit.
    pub fn miter_style(&self, width: f32, color: ColorRgba) -> LineStyle {
        LineStyle::new(width, color).join(LineJoin::Miter { limit: self.config.miter_limit }).cap(LineCap::Square)
    }

    /// Starts a frame. `max_instances` lowers the sprite flush threshold for
    /// this frame.
    pub fn begin(&mut self, blend: BlendMode, max_instances: Option<usize>) {
        if self.in_frame {
            log::warn!("begin called twice without end; pending draws are dropped");
        }
        let view_projection = self.camera.view_projection();
        self.sprites.begin(&self.camera, blend, max_instances);
        self.lines.begin(view_projection, blend);
        self.rects.begin(view_projection, blend);
        self.ellipses.begin(view_projection, blend);
        self.active = None;
        self.in_frame = true;
    }

    /// Flushes the previously active batcher when the kind changes.
    fn switch(&mut self, pass: &mut B::Pass<'_>, kind: Kind) {
        if self.active == Some(kind) {
            return;
        }
        self.flush_active(pass);
        self.active = Some(kind);
    }

    fn flush_active(&mut self, pass: &mut B::Pass<'_>) {
        match self.active {
            Some(Kind::Sprites) => self.sprites.flush(pass),
            Some(Kind::Lines) => self.lines.flush(pass),
            Some(Kind::Rects) => self.rects.flush(pass),
            Some(Kind::Ellipses) => self.ellipses.flush(pass),
            None => {}
        }
    }

    pub fn draw_sprite(&mut self, pass: &mut B::Pass<'_>, texture: &B::Texture, dest: Rect, tint: ColorRgba) {
        self.switch(pass, Kind::Sprites);
        self.sprites.draw(pass, texture, dest, tint);
    }

    pub fn draw_sprite_ex(&mut self, pass: &mut B::Pass<'_>, texture: &B::Texture, dest: Rect, options: &SpriteOptions) {
        self.switch(pass, Kind::Sprites);
        self.sprites.draw_ex(pass, texture, dest, options);
    }

    pub fn draw_source(
        &mut self,
        pass: &mut B::Pass<'_>,
        texture: &B::Texture,
        dest: Rect,
        source: Rect,
        tint: ColorRgba,
    ) {
        self.switch(pass, Kind::Sprites);
        self.sprites.draw_source(pass, texture, dest, source, tint);
    }

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
        self.switch(pass, Kind::Sprites);
        self.sprites.draw_string(pass, font, text, position, tint, scale);
    }

    pub fn draw_line(&mut self, pass: &mut B::Pass<'_>, a: Vec2, b: Vec2, style: &LineStyle) {
        self.switch(pass, Kind::Lines);
        self.lines.draw_line(pass, a, b, style);
    }

    pub fn draw_polyline(&mut self, pass: &mut B::Pass<'_>, points: &[Vec2], style: &LineStyle, closed: bool) {
        self.switch(pass, Kind::Lines);
        self.lines.draw_polyline(pass, points, style, closed);
    }

    pub fn draw_rect(&mut self, pass: &mut B::Pass<'_>, rect: Rect, style: &RectStyle) {
        self.switch(pass, Kind::Rects);
        self.rects.draw(pass, rect, style);
    }

    pub fn fill_ellipse(&mut self, pass: &mut B::Pass<'_>, center: Vec2, radii: Vec2, color: ColorRgba) {
        self.switch(pass, Kind::Ellipses);
        self.ellipses.fill(pass, center, radii, color);
    }

    pub fn fill_circle(&mut self, pass: &mut B::Pass<'_>, center: Vec2, radius: f32, color: ColorRgba) {
        self.switch(pass, Kind::Ellipses);
        self.ellipses.fill_circle(pass, center, radius, color);
    }

    pub fn stroke_ellipse(&mut self, pass: &mut B::Pass<'_>, center: Vec2, radii: Vec2, width: f32, color: ColorRgba) {
        self.switch(pass, Kind::Ellipses);
        self.ellipses.stroke(pass, center, radii, width, color);
    }

    /// Flushes everything pending and closes the frame.
    pub fn end(&mut self, pass: &mut B::Pass<'_>) {
        self.flush_active(pass);
        self.sprites.end(pass);
        self.active = None;
        self.in_frame = false;
    }

    /// Sprite counters since the last `begin`.
    pub fn sprite_stats(&self) -> BatchStats {
        self.sprites.stats()
    }

    pub fn resize(&mut self, viewport: Viewport) {
        self.camera.resize(viewport);
    }

    /// Removes `key` from `textures` and evicts every cached state tied to it.
    pub fn remove_texture(&mut self, backend: &B, textures: &mut TextureManager<B>, key: &str) -> Option<TextureId> {
        let id = textures.remove_texture(backend, key)?;
        self.sprites.release_texture(id);
        Some(id)
    }

    /// Creates or replaces the texture under `key`, evicting cached state
    /// for a replaced one.
    #[allow(clippy::too_many_arguments)]
    pub fn create_texture(
        &mut self,
        backend: &B,
        textures: &mut TextureManager<B>,
        key: &str,
        width: u32,
        height: u32,
        pixels: Option<&[u8]>,
        filter: TextureFilter,
    ) -> Result<B::Texture> {
        let (texture, replaced) = textures.create_texture(backend, key, width, height, pixels, filter)?;
        if let Some(id) = replaced {
            self.sprites.release_texture(id);
        }
        Ok(texture)
    }

    /// Destroys every texture in `textures` and evicts their cached state.
    pub fn free_textures(&mut self, backend: &B, textures: &mut TextureManager<B>) -> Vec<TextureId> {
        let ids = textures.free_resources(backend);
        for &id in &ids {
            self.sprites.release_texture(id);
        }
        ids
    }

    pub fn destroy(&mut self) {
        self.sprites.destroy();
        self.lines.destroy();
        self.rects.destroy();
        self.ellipses.destroy();
        log::debug!("renderer destroyed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::recording::{Command, RecordingBackend};

    fn renderer(backend: &RecordingBackend) -> Renderer<RecordingBackend> {
        let config = RendererConfig { sprite_capacity: 8, primitive_capacity: 8, ..RendererConfig::default() };
        let r = Renderer::new(backend, Viewport::new(320.0, 240.0), config).unwrap();
        backend.clear_log();
        r
    }

    fn draw_order(backend: &RecordingBackend) -> Vec<String> {
        backend.draws().into_iter().map(|(label, _, _)| label).collect()
    }

    #[test]
    fn switching_kinds_preserves_submission_order() {
        let backend = RecordingBackend::new();
        let mut r = renderer(&backend);
        let tex = backend.texture(4, 4);

        r.begin(BlendMode::Alpha, None);
        r.draw_sprite(&mut (), &tex, Rect::new(0.0, 0.0, 4.0, 4.0), ColorRgba::white());
        r.fill_circle(&mut (), Vec2::new(10.0, 10.0), 3.0, ColorRgba::white());
        r.draw_sprite(&mut (), &tex, Rect::new(4.0, 0.0, 4.0, 4.0), ColorRgba::white());
        r.draw_rect(&mut (), Rect::new(0.0, 0.0, 10.0, 10.0), &RectStyle::fill(ColorRgba::black()));
        r.end(&mut ());

        assert_eq!(draw_order(&backend), vec!["sprite batch", "ellipses", "sprite batch", "rect quads", "rect corners"]);
    }

    #[test]
    fn end_flushes_the_active_kind_once() {
        let backend = RecordingBackend::new();
        let mut r = renderer(&backend);
        r.begin(BlendMode::Alpha, None);
        let style = LineStyle::new(2.0, ColorRgba::white());
        r.draw_line(&mut (), Vec2::new(0.0, 0.0), Vec2::new(10.0, 0.0), &style);
        r.draw_line(&mut (), Vec2::new(0.0, 5.0), Vec2::new(10.0, 5.0), &style);
        r.end(&mut ());
        assert_eq!(draw_order(&backend), vec!["line segments"]);
        assert_eq!(backend.draws()[0].2, 2);
    }

    #[test]
    fn remove_texture_evicts_program_caches() {
        let backend = RecordingBackend::new();
        let mut r = renderer(&backend);
        let mut textures = TextureManager::new();
        let tex = r.create_texture(&backend, &mut textures, "hero", 2, 2, None, TextureFilter::Nearest).unwrap();

        let id = r.remove_texture(&backend, &mut textures, "hero");
        assert_eq!(id, Some(tex.id));
        let commands = backend.commands();
        assert!(commands.contains(&Command::DestroyTexture(tex.id)));
        assert!(commands.contains(&Command::ReleaseTexture { program: "sprite".into(), id: tex.id }));
        assert_eq!(r.remove_texture(&backend, &mut textures, "hero"), None);
    }

    fn released(backend: &RecordingBackend) -> Vec<TextureId> {
        backend
            .commands()
            .into_iter()
            .filter_map(|c| match c {
                Command::ReleaseTexture { program, id } if program == "sprite" => Some(id),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn replacing_a_keyed_texture_evicts_the_old_one() {
        let backend = RecordingBackend::new();
        let mut r = renderer(&backend);
        let mut textures = TextureManager::new();
        let old = r.create_texture(&backend, &mut textures, "hero", 2, 2, None, TextureFilter::Nearest).unwrap();
        assert!(released(&backend).is_empty());

        r.begin(BlendMode::Alpha, None);
        r.draw_sprite(&mut (), &old, Rect::new(0.0, 0.0, 2.0, 2.0), ColorRgba::white());
        r.end(&mut ());
        let new = r.create_texture(&backend, &mut textures, "hero", 4, 4, None, TextureFilter::Nearest).unwrap();

        assert_eq!(released(&backend), vec![old.id]);
        assert!(backend.commands().contains(&Command::DestroyTexture(old.id)));
        assert_eq!(textures.get_texture("hero").map(|t| t.id), Some(new.id));
    }

    #[test]
    fn freeing_textures_evicts_each_one() {
        let backend = RecordingBackend::new();
        let mut r = renderer(&backend);
        let mut textures = TextureManager::new();
        let a = r.create_texture(&backend, &mut textures, "a", 1, 1, None, TextureFilter::Linear).unwrap();
        let b = r.create_texture(&backend, &mut textures, "b", 1, 1, None, TextureFilter::Linear).unwrap();

        let mut freed = r.free_textures(&backend, &mut textures);
        freed.sort();
        let mut evicted = released(&backend);
        evicted.sort();
        let mut expected = vec![a.id, b.id];
        expected.sort();
        assert_eq!(freed, expected);
        assert_eq!(evicted, expected);
        assert!(textures.is_empty());
    }

    #[test]
    fn begin_uses_the_current_camera() {
        let backend = RecordingBackend::new();
        let mut r = renderer(&backend);
        r.resize(Viewport::new(640.0, 480.0));
        r.camera_mut().zoom = 2.0;
        r.begin(BlendMode::Alpha, None);
        assert_eq!(r.camera().viewport(), Viewport::new(640.0, 480.0));
        r.end(&mut ());
        assert!(backend.draws().is_empty());
    }
}
