//! Interactive tour of the renderer on the wgpu backend.
//!
//! Keys: `1`–`5` pick a post chain, `R` regenerates the sprite texture,
//! `Esc` quits. An image path passed as the first argument replaces the
//! generated checkerboard.

use std::f32::consts::TAU;

use anyhow::{Context, Result};
use glint_engine::assets::{FontAtlas, FsLoader, TextureManager};
use glint_engine::backend::WgpuBackend;
use glint_engine::batch::SpriteOptions;
use glint_engine::coords::{ColorRgba, CornerRadii, Rect, Vec2, Viewport};
use glint_engine::core::{App, AppControl, FrameCtx};
use glint_engine::device::{Gpu, GpuInit};
use glint_engine::gfx::{Backend, BlendMode, TextureFilter};
use glint_engine::input::{Key, MouseButton};
use glint_engine::logging::{init_logging, LoggingConfig};
use glint_engine::post::{PostConfig, PostEffect, PostPipeline};
use glint_engine::render::{Renderer, RendererConfig};
use glint_engine::shapes::{LineCap, LineJoin, LineStyle, RectStyle};
use glint_engine::window::{Runtime, RuntimeConfig};

const SPRITE_KEY: &str = "sprite";
const BACKGROUND: ColorRgba = ColorRgba::new(0.06, 0.07, 0.1, 1.0);
const CHARSET: &str = " !\"#$%&'()*+,-./0123456789:;<=>?@ABCDEFGHIJKLMNOPQRSTUVWXYZ[\\]^_`abcdefghijklmnopqrstuvwxyz{|}~";

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let studio = Studio { image: std::env::args().nth(1), scene: None };
    let config = RuntimeConfig { title: "glint studio".to_string(), ..RuntimeConfig::default() };
    Runtime::run(config, GpuInit::default(), studio)
}

struct Studio {
    image: Option<String>,
    scene: Option<Scene>,
}

struct Scene {
    renderer: Renderer<WgpuBackend>,
    textures: TextureManager<WgpuBackend>,
    font: Option<FontAtlas<WgpuBackend>>,
    post: PostPipeline<WgpuBackend>,
    generation: u32,
}

fn post_chain(digit: u8) -> Vec<PostEffect> {
    match digit {
        2 => vec![PostEffect::default()],
        3 => vec![PostEffect::Blur { radius: 2.0 }],
        4 => vec![PostEffect::Crt { curvature: 0.12, scanlines: 0.35 }],
        5 => vec![PostEffect::default(), PostEffect::Dither { levels: 6.0 }],
        _ => Vec::new(),
    }
}

/// Two-tone checkerboard; the palette shifts with `generation`.
fn checker_pixels(size: u32, generation: u32) -> Vec<u8> {
    let hue = (generation % 3) as usize;
    let mut light = [90u8, 90, 90, 255];
    light[hue] = 230;
    let dark = [30u8, 30, 40, 255];
    let mut pixels = Vec::with_capacity((size * size * 4) as usize);
    for y in 0..size {
        for x in 0..size {
            let on = ((x / 8) + (y / 8)) % 2 == 0;
            pixels.extend_from_slice(if on { &light } else { &dark });
        }
    }
    pixels
}

fn system_font() -> Option<Vec<u8>> {
    [
        "/usr/share/fonts/TTF/DejaVuSans.ttf",
        "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/noto/NotoSans-Regular.ttf",
        "/usr/share/fonts/truetype/noto/NotoSans-Regular.ttf",
        "C:\\Windows\\Fonts\\arial.ttf",
        "/System/Library/Fonts/Supplemental/Arial.ttf",
    ]
    .iter()
    .find_map(|p| std::fs::read(p).ok())
}

impl Scene {
    fn new(backend: &WgpuBackend, viewport: Viewport, size: (u32, u32), image: Option<&str>) -> Result<Self> {
        let mut renderer = Renderer::new(backend, viewport, RendererConfig::default()).context("renderer")?;
        let mut textures = TextureManager::new();

        match image {
            Some(path) => {
                let loader = FsLoader::default();
                textures
                    .load_texture_2d(backend, &loader, SPRITE_KEY, path, TextureFilter::Linear)
                    .with_context(|| format!("failed to load {path}"))?;
            }
            None => {
                let pixels = checker_pixels(64, 0);
                renderer.create_texture(backend, &mut textures, SPRITE_KEY, 64, 64, Some(&pixels), TextureFilter::Nearest)?;
            }
        }

        let font = match system_font() {
            Some(bytes) => Some(FontAtlas::new(backend, "studio font", &bytes, 22.0, CHARSET)?),
            None => {
                log::warn!("no system font found; text is disabled");
                None
            }
        };

        let post = PostPipeline::new(backend, size.0, size.1, PostConfig::default()).context("post pipeline")?;

        Ok(Self { renderer, textures, font, post, generation: 0 })
    }

    /// Replaces the sprite texture, evicting everything cached for the old one.
    fn regenerate(&mut self, backend: &WgpuBackend) -> Result<()> {
        self.generation += 1;
        let pixels = checker_pixels(64, self.generation);
        self.renderer
            .create_texture(backend, &mut self.textures, SPRITE_KEY, 64, 64, Some(&pixels), TextureFilter::Nearest)?;
        Ok(())
    }

    fn destroy(mut self, backend: &WgpuBackend) {
        self.renderer.free_textures(backend, &mut self.textures);
        self.renderer.destroy();
        self.post.destroy(backend);
        if let Some(font) = self.font.take() {
            font.destroy(backend);
        }
    }
}

impl App for Studio {
    fn on_start(&mut self, gpu: &Gpu<'_>, viewport: Viewport) -> Result<()> {
        let size = gpu.size();
        let scene = Scene::new(gpu.backend(), viewport, (size.width, size.height), self.image.as_deref())?;
        self.scene = Some(scene);
        Ok(())
    }

    fn on_resize(&mut self, gpu: &Gpu<'_>, viewport: Viewport) {
        let Some(scene) = self.scene.as_mut() else {
            return;
        };
        scene.renderer.resize(viewport);
        let size = gpu.size();
        if size.width > 0 && size.height > 0 {
            if let Err(err) = scene.post.resize(gpu.backend(), size.width, size.height) {
                log::error!("post targets not recreated: {err}");
            }
        }
    }

    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl {
        let Some(scene) = self.scene.as_mut() else {
            return AppControl::Continue;
        };
        if ctx.input.key_pressed(Key::Escape) {
            return AppControl::Exit;
        }
        for digit in 1..=5 {
            if ctx.input.key_pressed(Key::Digit(digit)) {
                scene.post.set_effects(post_chain(digit));
            }
        }
        if ctx.input.key_pressed(Key::Letter('R')) {
            if let Err(err) = scene.regenerate(ctx.gpu.backend()) {
                log::error!("{err}");
            }
        }

        let viewport = ctx.viewport();
        let t = ctx.time.elapsed;
        let pointer = ctx.input.pointer;
        let pressed = ctx.input.button_down(MouseButton::Left);

        ctx.render(BACKGROUND, |backend, pass| {
            let Scene { renderer, textures, font, post, .. } = scene;
            let sprite = textures.require(SPRITE_KEY)?;

            post.bind(backend, pass);
            backend.clear(pass, BACKGROUND);
            renderer.begin(BlendMode::Alpha, None);

            // Ring of rotating sprites.
            let center = Vec2::new(viewport.width * 0.5, viewport.height * 0.5);
            for i in 0..24 {
                let a = t * 0.5 + i as f32 / 24.0 * TAU;
                let p = center + Vec2::new(a.cos(), a.sin()) * (viewport.height * 0.32);
                let options = SpriteOptions {
                    rotation: t + i as f32,
                    tint: ColorRgba::new(1.0, 0.6 + 0.4 * (a.sin() * 0.5 + 0.5), 1.0, 1.0),
                    flip_x: i % 2 == 1,
                    ..SpriteOptions::default()
                };
                renderer.draw_sprite_ex(pass, sprite, Rect::new(p.x - 24.0, p.y - 24.0, 48.0, 48.0), &options);
            }

            let panel = RectStyle::stroke(ColorRgba::new(0.4, 0.5, 0.9, 1.0), 2.0)
                .with_fill(ColorRgba::new(0.12, 0.14, 0.2, 0.9))
                .rounded(CornerRadii::all(14.0));
            renderer.draw_rect(pass, Rect::new(20.0, 20.0, 360.0, 110.0), &panel);

            let wave: Vec<Vec2> = (0..=64)
                .map(|i| {
                    let x = 40.0 + i as f32 * (viewport.width - 80.0) / 64.0;
                    Vec2::new(x, viewport.height - 80.0 + (x * 0.02 + t * 2.0).sin() * 30.0)
                })
                .collect();
            let style = LineStyle::new(6.0, ColorRgba::new(0.3, 0.9, 0.7, 1.0))
                .join(LineJoin::Miter { limit: 4.0 })
                .cap(LineCap::Round);
            renderer.draw_polyline(pass, &wave, &style, false);

            renderer.stroke_ellipse(pass, center, Vec2::new(90.0, 60.0), 4.0, ColorRgba::new(1.0, 0.8, 0.3, 1.0));
            if let Some(p) = pointer {
                let color = if pressed { ColorRgba::new(1.0, 0.3, 0.3, 0.8) } else { ColorRgba::white().with_alpha(0.6) };
                renderer.fill_circle(pass, p, 10.0, color);
            }

            if let Some(font) = font {
                let text = format!("glint studio\nbackend: wgpu  t = {t:.1}s\n1-5 post  R texture  Esc quit");
                renderer.draw_string(pass, &*font, &text, Vec2::new(36.0, 30.0), ColorRgba::white(), 1.0);
            }

            renderer.end(pass);
            post.draw_pass(backend, pass)
        })
    }

    fn on_exit(&mut self, gpu: &Gpu<'_>) {
        if let Some(scene) = self.scene.take() {
            let stats = scene.renderer.sprite_stats();
            log::info!("last frame: {} sprites in {} flushes", stats.instances, stats.flushes);
            scene.destroy(gpu.backend());
        }
    }
}
