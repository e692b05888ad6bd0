use glam::Mat4;

use crate::error::{GfxError, Result};
use crate::gfx::{
    Backend, BlendMode, BufferContents, BufferDesc, BufferLayout, DrawMode, DrawParams, GeometryBuffer,
    GeometryDesc, GlslSource, IndexData, ProgramDesc, RenderTargetHandle, ShaderProgram, ShaderSource, StepMode,
    TextureHandle, UniformHandle, UniformKind, UniformValue, UseParams, VertexAttribute,
};

use super::PostEffect;

const QUAD_ATTRIBUTES: [VertexAttribute; 1] = [VertexAttribute::new(0, 2)];
const QUAD_LAYOUT: BufferLayout = BufferLayout::new(StepMode::Vertex, &QUAD_ATTRIBUTES);
const QUAD: [f32; 8] = [-1.0, -1.0, 1.0, -1.0, 1.0, 1.0, -1.0, 1.0];
const QUAD_INDICES: [u16; 6] = [0, 1, 2, 0, 2, 3];

/// Uniform slots per stage; each draw of a frame takes the next one.
const STAGE_SLOTS: u32 = 16;

const VERT: &str = include_str!("../shaders/post.vert.glsl");
const COMMON_WGSL: &str = include_str!("../shaders/post_common.wgsl");

const BLIT_FRAG: &str = include_str!("../shaders/post_blit.frag.glsl");
const BLIT_WGSL: &str = include_str!("../shaders/post_blit.wgsl");
const BRIGHT_FRAG: &str = include_str!("../shaders/post_bright.frag.glsl");
const BRIGHT_WGSL: &str = include_str!("../shaders/post_bright.wgsl");
const BLUR_FRAG: &str = include_str!("../shaders/post_blur.frag.glsl");
const BLUR_WGSL: &str = include_str!("../shaders/post_blur.wgsl");
const CRT_FRAG: &str = include_str!("../shaders/post_crt.frag.glsl");
const CRT_WGSL: &str = include_str!("../shaders/post_crt.wgsl");
const DITHER_FRAG: &str = include_str!("../shaders/post_dither.frag.glsl");
const DITHER_WGSL: &str = include_str!("../shaders/post_dither.wgsl");

/// Index of the scene target; 1 and 2 are scratch.
const SCENE: usize = 0;

#[derive(Debug, Clone, Default)]
pub struct PostConfig {
    /// Applied in order. Empty composites the scene unchanged.
    pub effects: Vec<PostEffect>,
}

/// A full-screen program and its user uniforms in registration order.
struct Stage<B: Backend> {
    program: B::Program,
    uniforms: Vec<UniformHandle>,
    next_slot: u32,
}

impl<B: Backend> Stage<B> {
    fn new(backend: &B, label: &str, fragment: &str, wgsl: &str, uniforms: &[(&str, UniformKind)]) -> Result<Self> {
        let wgsl = format!("{COMMON_WGSL}\n{wgsl}");
        let layouts = [QUAD_LAYOUT];
        let mut program = backend.create_program(
            &ProgramDesc::new(
                label,
                ShaderSource { glsl: Some(GlslSource { vertex: VERT, fragment }), wgsl: Some(&wgsl) },
                &layouts,
            )
            .textured()
            .instance_slots(STAGE_SLOTS),
        )?;
        let uniforms = uniforms
            .iter()
            .map(|(name, kind)| program.create_uniform(name, *kind, None))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { program, uniforms, next_slot: 0 })
    }

    /// Takes a fresh uniform slot and writes `values` into it.
    fn prepare(&mut self, pass: &mut B::Pass<'_>, values: &[UniformValue]) -> Result<()> {
        self.program.bind_instance(pass, self.next_slot % STAGE_SLOTS);
        self.next_slot += 1;
        for (handle, value) in self.uniforms.iter().zip(values) {
            self.program.set_uniform(*handle, *value)?;
        }
        Ok(())
    }
}

/// Draws the full-screen quad sampling `source` into `target` (the canvas for
/// `None`).
#[allow(clippy::too_many_arguments)]
fn apply<B: Backend>(
    backend: &B,
    pass: &mut B::Pass<'_>,
    quad: &mut B::Geometry,
    stage: &mut Stage<B>,
    values: &[UniformValue],
    source: &B::Texture,
    target: Option<&B::Target>,
    blend: BlendMode,
) -> Result<()> {
    stage.prepare(pass, values)?;
    backend.bind_target(pass, target);
    stage.program.use_program(pass, &UseParams { view_projection: Mat4::IDENTITY, texture: Some(source), blend });
    quad.bind(pass);
    quad.draw(pass, DrawParams::all());
    Ok(())
}

/// The two target indices other than `current`.
fn free_targets(current: usize) -> (usize, usize) {
    match current {
        0 => (1, 2),
        1 => (0, 2),
        _ => (0, 1),
    }
}

/// Scene target, two scratch targets and the effect programs.
pub struct PostPipeline<B: Backend> {
    quad: B::Geometry,
    blit: Stage<B>,
    bright: Stage<B>,
    blur: Stage<B>,
    crt: Stage<B>,
    dither: Stage<B>,
    /// `[scene, scratch a, scratch b]`; empty after `destroy`.
    targets: Vec<B::Target>,
    effects: Vec<PostEffect>,
    size: (u32, u32),
}

impl<B: Backend> PostPipeline<B> {
    pub fn new(backend: &B, width: u32, height: u32, config: PostConfig) -> Result<Self> {
        let buffers = [BufferDesc { layout: QUAD_LAYOUT, contents: BufferContents::Immutable(&QUAD) }];
        let quad = backend.create_geometry(&GeometryDesc {
            label: "post quad",
            buffers: &buffers,
            indices: Some(IndexData::U16(&QUAD_INDICES)),
            mode: DrawMode::Triangles,
            count: QUAD_INDICES.len() as u32,
            feedback: false,
        })?;

        let blit = Stage::new(backend, "post blit", BLIT_FRAG, BLIT_WGSL, &[])?;
        let bright = Stage::new(backend, "post bright", BRIGHT_FRAG, BRIGHT_WGSL, &[("u_threshold", UniformKind::Float)])?;
        let blur = Stage::new(
            backend,
            "post blur",
            BLUR_FRAG,
            BLUR_WGSL,
            &[("u_direction", UniformKind::Vec2), ("u_radius", UniformKind::Float)],
        )?;
        let crt = Stage::new(
            backend,
            "post crt",
            CRT_FRAG,
            CRT_WGSL,
            &[("u_curvature", UniformKind::Float), ("u_scanlines", UniformKind::Float)],
        )?;
        let dither = Stage::new(backend, "post dither", DITHER_FRAG, DITHER_WGSL, &[("u_levels", UniformKind::Float)])?;

        let mut pipeline = Self {
            quad,
            blit,
            bright,
            blur,
            crt,
            dither,
            targets: Vec::with_capacity(3),
            effects: config.effects,
            size: (0, 0),
        };
        pipeline.resize(backend, width, height)?;
        Ok(pipeline)
    }

    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    pub fn effects(&self) -> &[PostEffect] {
        &self.effects
    }

    pub fn set_effects(&mut self, effects: Vec<PostEffect>) {
        self.effects = effects;
    }

    /// Color texture the scene renders into.
    pub fn scene_texture(&self) -> Option<&B::Texture> {
        self.targets.get(SCENE).map(RenderTargetHandle::color)
    }

    /// Redirects subsequent rendering into the scene target.
    pub fn bind(&self, backend: &B, pass: &mut B::Pass<'_>) {
        backend.bind_target(pass, self.targets.get(SCENE));
    }

    /// Runs the effect chain and composites the result onto the canvas.
    /// Leaves the canvas bound.
    pub fn draw_pass(&mut self, backend: &B, pass: &mut B::Pass<'_>) -> Result<()> {
        if self.targets.len() != 3 {
            return Err(GfxError::Resource("post pipeline has no targets".into()));
        }
        for stage in [&mut self.blit, &mut self.bright, &mut self.blur, &mut self.crt, &mut self.dither] {
            stage.next_slot = 0;
        }

        let quad = &mut self.quad;
        let targets = &self.targets;
        let mut current = SCENE;

        for effect in &self.effects {
            let (a, b) = free_targets(current);
            let src = targets[current].color();
            match *effect {
                PostEffect::Blur { radius } => {
                    let h = [UniformValue::Vec2([1.0, 0.0]), UniformValue::Float(radius)];
                    let v = [UniformValue::Vec2([0.0, 1.0]), UniformValue::Float(radius)];
                    apply(backend, pass, quad, &mut self.blur, &h, src, Some(&targets[a]), BlendMode::Replace)?;
                    let tex_a = targets[a].color();
                    apply(backend, pass, quad, &mut self.blur, &v, tex_a, Some(&targets[b]), BlendMode::Replace)?;
                    current = b;
                }
                PostEffect::Bloom { threshold, radius } => {
                    let (tex_a, tex_b) = (targets[a].color(), targets[b].color());
                    let h = [UniformValue::Vec2([1.0, 0.0]), UniformValue::Float(radius)];
                    let v = [UniformValue::Vec2([0.0, 1.0]), UniformValue::Float(radius)];
                    let bright = [UniformValue::Float(threshold)];
                    apply(backend, pass, quad, &mut self.bright, &bright, src, Some(&targets[a]), BlendMode::Replace)?;
                    apply(backend, pass, quad, &mut self.blur, &h, tex_a, Some(&targets[b]), BlendMode::Replace)?;
                    apply(backend, pass, quad, &mut self.blur, &v, tex_b, Some(&targets[a]), BlendMode::Replace)?;
                    apply(backend, pass, quad, &mut self.blit, &[], src, Some(&targets[b]), BlendMode::Replace)?;
                    apply(backend, pass, quad, &mut self.blit, &[], tex_a, Some(&targets[b]), BlendMode::Additive)?;
                    current = b;
                }
                PostEffect::Crt { curvature, scanlines } => {
                    let values = [UniformValue::Float(curvature), UniformValue::Float(scanlines)];
                    apply(backend, pass, quad, &mut self.crt, &values, src, Some(&targets[a]), BlendMode::Replace)?;
                    current = a;
                }
                PostEffect::Dither { levels } => {
                    let values = [UniformValue::Float(levels)];
                    apply(backend, pass, quad, &mut self.dither, &values, src, Some(&targets[a]), BlendMode::Replace)?;
                    current = a;
                }
            }
        }

        apply(backend, pass, quad, &mut self.blit, &[], targets[current].color(), None, BlendMode::Replace)
    }

    /// Deletes the targets, then creates new ones at the given size.
    pub fn resize(&mut self, backend: &B, width: u32, height: u32) -> Result<()> {
        self.release_targets(backend);
        let (width, height) = (width.max(1), height.max(1));
        for label in ["post scene", "post scratch a", "post scratch b"] {
            self.targets.push(backend.create_target(label, width, height)?);
        }
        self.size = (width, height);
        log::debug!("post targets recreated at {width}x{height}");
        Ok(())
    }

    fn release_targets(&mut self, backend: &B) {
        for target in self.targets.drain(..) {
            let id = target.color().id();
            for stage in [&mut self.blit, &mut self.bright, &mut self.blur, &mut self.crt, &mut self.dither] {
                stage.program.release_texture(id);
            }
            backend.destroy_target(target);
        }
    }

    pub fn destroy(&mut self, backend: &B) {
        self.release_targets(backend);
        self.quad.delete();
        for stage in [&mut self.blit, &mut self.bright, &mut self.blur, &mut self.crt, &mut self.dither] {
            stage.program.destroy();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::recording::{Command, RecordingBackend};

    fn pipeline(backend: &RecordingBackend, effects: Vec<PostEffect>) -> PostPipeline<RecordingBackend> {
        let post = PostPipeline::new(backend, 64, 32, PostConfig { effects }).unwrap();
        backend.clear_log();
        post
    }

    #[test]
    fn no_effects_blits_the_scene_to_the_canvas() {
        let backend = RecordingBackend::new();
        let mut post = pipeline(&backend, Vec::new());
        let scene = post.scene_texture().unwrap().id;
        post.draw_pass(&backend, &mut ()).unwrap();
        assert_eq!(backend.used_textures(), vec![Some(scene)]);
        assert!(backend.commands().contains(&Command::BindTarget(None)));
    }

    #[test]
    fn bloom_runs_extract_blur_and_additive_composite() {
        let backend = RecordingBackend::new();
        let mut post = pipeline(&backend, vec![PostEffect::Bloom { threshold: 0.5, radius: 1.0 }]);
        post.draw_pass(&backend, &mut ()).unwrap();

        let draws = backend.draws();
        assert_eq!(draws.len(), PostEffect::Bloom { threshold: 0.0, radius: 0.0 }.draw_count() + 1);
        let blends: Vec<BlendMode> = backend
            .commands()
            .into_iter()
            .filter_map(|c| match c {
                Command::UseProgram { blend, .. } => Some(blend),
                _ => None,
            })
            .collect();
        assert_eq!(blends[4], BlendMode::Additive);
        assert!(blends.iter().enumerate().all(|(i, b)| i == 4 || *b == BlendMode::Replace));
    }

    #[test]
    fn chained_effects_ping_pong_without_reading_their_target() {
        let backend = RecordingBackend::new();
        let mut post = pipeline(
            &backend,
            vec![
                PostEffect::Blur { radius: 1.0 },
                PostEffect::Crt { curvature: 0.1, scanlines: 0.3 },
                PostEffect::Dither { levels: 4.0 },
            ],
        );
        post.draw_pass(&backend, &mut ()).unwrap();

        let mut bound = None;
        let mut steps = 0;
        for command in backend.commands() {
            match command {
                Command::BindTarget(target) => bound = target,
                Command::UseProgram { texture, .. } => {
                    assert_ne!(texture, bound, "a pass samples its own target");
                    steps += 1;
                }
                _ => {}
            }
        }
        assert_eq!(steps, 2 + 1 + 1 + 1);
    }

    #[test]
    fn resize_deletes_before_creating() {
        let backend = RecordingBackend::new();
        let mut post = pipeline(&backend, Vec::new());
        post.resize(&backend, 128, 96).unwrap();

        let commands = backend.commands();
        let first_create = commands.iter().position(|c| matches!(c, Command::CreateTarget { .. })).unwrap();
        let last_destroy = commands.iter().rposition(|c| matches!(c, Command::DestroyTarget(_))).unwrap();
        assert!(last_destroy < first_create);
        assert_eq!(commands.iter().filter(|c| matches!(c, Command::DestroyTarget(_))).count(), 3);
        assert_eq!(commands.iter().filter(|c| matches!(c, Command::ReleaseTexture { .. })).count(), 15);
        assert_eq!(post.size(), (128, 96));
    }
}
