use glam::Mat4;

use crate::coords::{ColorRgba, Vec2};
use crate::error::{GfxError, Result};
use crate::gfx::{
    Backend, BlendMode, BufferContents, BufferDesc, BufferLayout, DrawMode, DrawParams, GeometryBuffer,
    GeometryDesc, GlslSource, ProgramDesc, ShaderProgram, ShaderSource, StepMode, UniformHandle, UniformKind,
    UniformValue, UseParams, VertexAttribute,
};

use super::Rng;

const BASIC_ATTRIBUTES: [VertexAttribute; 4] = [
    VertexAttribute::new(0, 2), // position
    VertexAttribute::new(1, 2), // velocity
    VertexAttribute::new(2, 1), // age
    VertexAttribute::new(3, 1), // life
];
const ACCELERATED_ATTRIBUTES: [VertexAttribute; 5] = [
    VertexAttribute::new(0, 2),
    VertexAttribute::new(1, 2),
    VertexAttribute::new(2, 1),
    VertexAttribute::new(3, 1),
    VertexAttribute::new(4, 2), // acceleration
];

const BASIC_VARYINGS: [&str; 4] = ["v_position", "v_velocity", "v_age", "v_life"];
const ACCELERATED_VARYINGS: [&str; 5] = ["v_position", "v_velocity", "v_age", "v_life", "v_accel"];

const UPDATE_VERT: &str = include_str!("../shaders/particle_update.vert.glsl");
const UPDATE_FRAG: &str = include_str!("../shaders/particle_update.frag.glsl");
const RENDER_VERT: &str = include_str!("../shaders/particle_render.vert.glsl");
const RENDER_FRAG: &str = include_str!("../shaders/particle_render.frag.glsl");

/// Per-particle record layout.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum ParticleLayout {
    /// Position, velocity, age, life.
    #[default]
    Basic,
    /// Basic plus a constant per-particle acceleration.
    Accelerated,
}

impl ParticleLayout {
    pub fn buffer_layout(self) -> BufferLayout {
        match self {
            ParticleLayout::Basic => BufferLayout::new(StepMode::Vertex, &BASIC_ATTRIBUTES),
            ParticleLayout::Accelerated => BufferLayout::new(StepMode::Vertex, &ACCELERATED_ATTRIBUTES),
        }
    }

    fn varyings(self) -> &'static [&'static str] {
        match self {
            ParticleLayout::Basic => &BASIC_VARYINGS,
            ParticleLayout::Accelerated => &ACCELERATED_VARYINGS,
        }
    }

    fn update_source(self) -> String {
        let define = match self {
            ParticleLayout::Basic => "",
            ParticleLayout::Accelerated => "#define ACCELERATED\n",
        };
        format!("#version 300 es\n{define}{UPDATE_VERT}")
    }
}

#[derive(Debug, Clone)]
pub struct ParticleConfig {
    /// Particles simulated; fixed for the emitter's lifetime.
    pub count: usize,
    /// Record layout and the update shader that goes with it.
    pub layout: ParticleLayout,
    /// Lifetime bounds in seconds.
    pub age_range: [f32; 2],
    /// Spawn speed bounds in pixels per second.
    pub speed_range: [f32; 2],
    /// Fraction of velocity lost per second.
    pub friction: f32,
    /// Mean acceleration of the `Accelerated` layout; each particle gets
    /// 50% to 150% of it.
    pub gravity: Vec2,
    /// Rendered point size in pixels.
    pub point_size: f32,
    /// Point color; alpha is ignored.
    pub color: ColorRgba,
    pub blend: BlendMode,
    /// Seeds the stagger ages; `reset` advances it.
    pub seed: u64,
}

impl Default for ParticleConfig {
    fn default() -> Self {
        Self {
            count: 10_000,
            layout: ParticleLayout::Basic,
            age_range: [0.5, 2.0],
            speed_range: [20.0, 120.0],
            friction: 0.5,
            gravity: Vec2::new(0.0, 200.0),
            point_size: 3.0,
            color: ColorRgba::new(1.0, 0.8, 0.4, 1.0),
            blend: BlendMode::Additive,
            seed: 0x9E37_79B9_7F4A_7C15,
        }
    }
}

/// Host inputs for one simulation step.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct EmitInput {
    /// Spawn point, usually the pointer position.
    pub origin: Vec2,
    /// Whether expired particles respawn this frame.
    pub emit: bool,
}

struct UpdateUniforms {
    origin: UniformHandle,
    emit_new: UniformHandle,
    friction: UniformHandle,
    dt: UniformHandle,
    time: UniformHandle,
    age_range: UniformHandle,
    speed_range: UniformHandle,
}

/// Double-buffered point cloud simulated on the GPU.
///
/// `update` captures the read buffer's simulated records into the write
/// buffer; `draw` renders the read buffer and swaps the two roles.
pub struct ParticleEmitter<B: Backend> {
    config: ParticleConfig,
    buffers: [B::Geometry; 2],
    read: usize,
    update: B::Program,
    render: B::Program,
    update_uniforms: UpdateUniforms,
    point_size: UniformHandle,
    color: UniformHandle,
    time: f32,
}

impl<B: Backend> ParticleEmitter<B> {
    pub fn new(backend: &B, config: ParticleConfig) -> Result<Self> {
        if config.count == 0 {
            return Err(GfxError::Config("particle count must be non-zero".into()));
        }
        let layout = config.layout.buffer_layout();
        let initial = seed_records(&config);

        let update_source = config.layout.update_source();
        let layouts = [layout];
        let mut update = backend.create_program(
            &ProgramDesc::new(
                "particle update",
                ShaderSource {
                    glsl: Some(GlslSource { vertex: &update_source, fragment: UPDATE_FRAG }),
                    wgsl: None,
                },
                &layouts,
            )
            .mode(DrawMode::Points)
            .feedback(config.layout.varyings()),
        )?;
        let mut render = backend.create_program(
            &ProgramDesc::new(
                "particle render",
                ShaderSource { glsl: Some(GlslSource { vertex: RENDER_VERT, fragment: RENDER_FRAG }), wgsl: None },
                &layouts,
            )
            .mode(DrawMode::Points),
        )?;

        let geometry = |label: &str| {
            let buffers = [BufferDesc { layout, contents: BufferContents::Mutable(&initial) }];
            backend.create_geometry(&GeometryDesc {
                label,
                buffers: &buffers,
                indices: None,
                mode: DrawMode::Points,
                count: config.count as u32,
                feedback: true,
            })
        };
        let buffers = [geometry("particles.a")?, geometry("particles.b")?];

        let update_uniforms = UpdateUniforms {
            origin: update.create_uniform("u_origin", UniformKind::Vec2, Some("origin"))?,
            emit_new: update.create_uniform("u_emit_new", UniformKind::Bool, Some("emit_new"))?,
            friction: update.create_uniform("u_friction", UniformKind::Float, Some("friction"))?,
            dt: update.create_uniform("u_dt", UniformKind::Float, Some("dt"))?,
            time: update.create_uniform("u_time", UniformKind::Float, Some("time"))?,
            age_range: update.create_uniform("u_age_range", UniformKind::Vec2, Some("age_range"))?,
            speed_range: update.create_uniform("u_speed_range", UniformKind::Vec2, Some("speed_range"))?,
        };
        update.set_uniform(update_uniforms.friction, UniformValue::Float(config.friction))?;
        update.set_uniform(update_uniforms.age_range, UniformValue::Vec2(config.age_range))?;
        update.set_uniform(update_uniforms.speed_range, UniformValue::Vec2(config.speed_range))?;

        let point_size = render.create_uniform("u_point_size", UniformKind::Float, Some("point_size"))?;
        let color = render.create_uniform("u_color", UniformKind::Vec3, Some("color"))?;
        render.set_uniform(point_size, UniformValue::Float(config.point_size))?;
        render.set_uniform(color, UniformValue::Vec3([config.color.r, config.color.g, config.color.b]))?;

        log::debug!("particle emitter ready on {} ({} particles, {:?})", B::NAME, config.count, config.layout);

        Ok(Self {
            config,
            buffers,
            read: 0,
            update,
            render,
            update_uniforms,
            point_size,
            color,
            time: 0.0,
        })
    }

    pub fn config(&self) -> &ParticleConfig {
        &self.config
    }

    /// Buffer the next `update` reads from and `draw` renders.
    pub fn read_buffer(&self) -> &B::Geometry {
        &self.buffers[self.read]
    }

    /// Buffer the next `update` writes into.
    pub fn write_buffer(&self) -> &B::Geometry {
        &self.buffers[self.read ^ 1]
    }

    pub fn update_program_mut(&mut self) -> &mut B::Program {
        &mut self.update
    }

    pub fn set_point_size(&mut self, size: f32) -> Result<()> {
        self.render.set_uniform(self.point_size, UniformValue::Float(size))
    }

    pub fn set_color(&mut self, color: ColorRgba) -> Result<()> {
        self.render.set_uniform(self.color, UniformValue::Vec3([color.r, color.g, color.b]))
    }

    /// Advances the simulation by `dt` seconds.
    pub fn update(&mut self, pass: &mut B::Pass<'_>, dt: f32, input: EmitInput) -> Result<()> {
        self.time += dt;
        let u = &self.update_uniforms;
        self.update.set_uniform(u.origin, UniformValue::Vec2(input.origin.to_array()))?;
        self.update.set_uniform(u.emit_new, UniformValue::Bool(input.emit))?;
        self.update.set_uniform(u.dt, UniformValue::Float(dt))?;
        self.update.set_uniform(u.time, UniformValue::Float(self.time))?;
        self.update.use_program(pass, &UseParams::new(Mat4::IDENTITY).blend(self.config.blend));

        let [a, b] = &mut self.buffers;
        let (read, write) = if self.read == 0 { (a, b) } else { (b, a) };
        read.transform_feedback(pass, write, None, Some(DrawMode::Points))
    }

    /// Renders the current read buffer, then swaps read and write.
    pub fn draw(&mut self, pass: &mut B::Pass<'_>, view_projection: Mat4) {
        self.render.use_program(pass, &UseParams::new(view_projection).blend(self.config.blend));
        let read = &mut self.buffers[self.read];
        read.bind(pass);
        read.draw(pass, DrawParams::all());
        self.read ^= 1;
    }

    /// Reseeds both buffers with fresh stagger ages.
    pub fn reset(&mut self, pass: &mut B::Pass<'_>) {
        self.config.seed = self.config.seed.wrapping_add(1);
        let records = seed_records(&self.config);
        for buffer in &mut self.buffers {
            buffer.bind(pass);
            buffer.bind_buffer(0);
            buffer.buffer_sub_data(pass, &records);
        }
        self.read = 0;
        self.time = 0.0;
    }

    pub fn destroy(&mut self) {
        for buffer in &mut self.buffers {
            buffer.delete();
        }
        self.update.destroy();
        self.render.destroy();
    }
}

/// Initial records: unborn particles with ages spread over `[-max_age, 0)`,
/// so they spawn at staggered times once emission starts.
fn seed_records(config: &ParticleConfig) -> Vec<f32> {
    let stride = config.layout.buffer_layout().stride_floats();
    let mut rng = Rng::new(config.seed);
    let mut data = Vec::with_capacity(config.count * stride);
    for _ in 0..config.count {
        let age = -rng.range(0.0, config.age_range[1]);
        data.extend_from_slice(&[0.0, 0.0, 0.0, 0.0, age, 0.0]);
        if config.layout == ParticleLayout::Accelerated {
            let scale = rng.range(0.5, 1.5);
            data.extend_from_slice(&[config.gravity.x * scale, config.gravity.y * scale]);
        }
    }
    data
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::recording::{Command, RecordingBackend};

    fn emitter(backend: &RecordingBackend, layout: ParticleLayout) -> ParticleEmitter<RecordingBackend> {
        ParticleEmitter::new(backend, ParticleConfig { count: 64, layout, ..ParticleConfig::default() }).unwrap()
    }

    #[test]
    fn draw_swaps_buffer_roles() {
        let backend = RecordingBackend::new();
        let mut particles = emitter(&backend, ParticleLayout::Basic);
        let input = EmitInput { origin: Vec2::new(5.0, 5.0), emit: true };

        let first_write: *const _ = particles.write_buffer();
        particles.update(&mut (), 0.016, input).unwrap();
        particles.draw(&mut (), Mat4::IDENTITY);
        assert!(std::ptr::eq(particles.read_buffer(), first_write));
        particles.update(&mut (), 0.016, input).unwrap();

        let feedback: Vec<(String, String)> = backend
            .commands()
            .into_iter()
            .filter_map(|c| match c {
                Command::Feedback { source, target, .. } => Some((source, target)),
                _ => None,
            })
            .collect();
        assert_eq!(
            feedback,
            vec![
                ("particles.a".to_string(), "particles.b".to_string()),
                ("particles.b".to_string(), "particles.a".to_string()),
            ]
        );
    }

    #[test]
    fn draw_renders_every_particle_as_points() {
        let backend = RecordingBackend::new();
        let mut particles = emitter(&backend, ParticleLayout::Basic);
        particles.draw(&mut (), Mat4::IDENTITY);
        assert_eq!(backend.draws(), vec![("particles.a".to_string(), 64, 1)]);
    }

    #[test]
    fn seeding_staggers_ages_and_sizes_records() {
        let config = ParticleConfig { count: 32, layout: ParticleLayout::Accelerated, ..ParticleConfig::default() };
        let data = seed_records(&config);
        assert_eq!(data.len(), 32 * 8);
        let ages: Vec<f32> = data.chunks_exact(8).map(|r| r[4]).collect();
        assert!(ages.iter().all(|&a| a <= 0.0 && a > -config.age_range[1]));
        assert!(ages.windows(2).any(|w| w[0] != w[1]));
        assert_eq!(seed_records(&config), data);
    }

    #[test]
    fn reset_reseeds_both_buffers_and_restores_read_role() {
        let backend = RecordingBackend::new();
        let mut particles = emitter(&backend, ParticleLayout::Basic);
        particles.update(&mut (), 0.1, EmitInput::default()).unwrap();
        particles.draw(&mut (), Mat4::IDENTITY);
        backend.clear_log();

        particles.reset(&mut ());
        let uploads = backend.uploads();
        assert_eq!(uploads.len(), 2);
        assert_eq!(uploads[0].1.len(), 64 * 6);
        assert_eq!(particles.read_buffer().label, "particles.a");
    }

    #[test]
    fn reset_writes_fresh_records_into_both_buffers() {
        let backend = RecordingBackend::new();
        let mut particles = emitter(&backend, ParticleLayout::Basic);
        let seeded = particles.read_buffer().buffer(0).to_vec();
        assert_eq!(particles.write_buffer().buffer(0), seeded.as_slice());

        particles.update(&mut (), 0.1, EmitInput::default()).unwrap();
        particles.reset(&mut ());
        let reseeded = seed_records(particles.config());
        assert_ne!(reseeded, seeded);
        assert_eq!(particles.read_buffer().buffer(0), reseeded.as_slice());
        assert_eq!(particles.write_buffer().buffer(0), reseeded.as_slice());
    }

    #[test]
    fn zero_count_is_a_config_error() {
        let backend = RecordingBackend::new();
        let result = ParticleEmitter::new(&backend, ParticleConfig { count: 0, ..ParticleConfig::default() });
        assert!(matches!(result, Err(GfxError::Config(_))));
    }
}
