use std::rc::Rc;

use glow::HasContext;

use crate::error::{GfxError, Result};
use crate::gfx::{
    ProgramDesc, ProgramState, ShaderProgram, TextureId, UniformHandle, UniformKind, UniformSet, UniformValue,
    UseParams,
};

use super::{apply_blend, GlBackend, GlPass};

/// Camera matrix uniform every program may declare.
const VIEW_PROJECTION: &str = "u_view_projection";
/// Sampler bound to texture unit 0.
const TEXTURE: &str = "u_texture";

pub struct GlProgram {
    gl: Rc<glow::Context>,
    label: String,
    program: Option<glow::Program>,
    view_projection: Option<glow::UniformLocation>,
    texture: Option<glow::UniformLocation>,
    uniforms: UniformSet,
    /// Parallel to `uniforms`; `None` when the name did not resolve.
    locations: Vec<Option<glow::UniformLocation>>,
    warned_destroyed: bool,
}

impl GlProgram {
    pub(super) fn new(gl: Rc<glow::Context>, desc: &ProgramDesc<'_>) -> Result<Self> {
        let source = desc.source.glsl.ok_or_else(|| GfxError::MissingShaderSource {
            label: desc.label.to_string(),
            backend: "gl",
        })?;

        let program = unsafe { link(&gl, desc.label, source.vertex, source.fragment, desc.feedback_varyings)? };

        let (view_projection, texture) = unsafe {
            (
                gl.get_uniform_location(program, VIEW_PROJECTION),
                gl.get_uniform_location(program, TEXTURE),
            )
        };
        if desc.textured && texture.is_none() {
            log::warn!("program '{}': textured but '{TEXTURE}' is not active", desc.label);
        }

        log::debug!("gl program '{}' linked", desc.label);

        Ok(Self {
            gl,
            label: desc.label.to_string(),
            program: Some(program),
            view_projection,
            texture,
            uniforms: UniformSet::new(),
            locations: Vec::new(),
            warned_destroyed: false,
        })
    }

    fn push_uniform(&self, location: &glow::UniformLocation, value: UniformValue) {
        unsafe {
            match value {
                UniformValue::Float(v) => self.gl.uniform_1_f32(Some(location), v),
                UniformValue::Vec2([x, y]) => self.gl.uniform_2_f32(Some(location), x, y),
                UniformValue::Vec3([x, y, z]) => self.gl.uniform_3_f32(Some(location), x, y, z),
                UniformValue::Bool(b) => self.gl.uniform_1_i32(Some(location), b as i32),
            }
        }
    }
}

impl ShaderProgram<GlBackend> for GlProgram {
    fn label(&self) -> &str {
        &self.label
    }

    fn state(&self) -> ProgramState {
        if self.program.is_some() { ProgramState::Initialized } else { ProgramState::Destroyed }
    }

    fn uniforms(&self) -> &UniformSet {
        &self.uniforms
    }

    fn uniforms_mut(&mut self) -> &mut UniformSet {
        &mut self.uniforms
    }

    fn create_uniform(&mut self, name: &str, kind: UniformKind, key: Option<&str>) -> Result<UniformHandle> {
        let handle = self.uniforms.register(name, kind, key)?;
        let location = match self.program {
            Some(program) => unsafe { self.gl.get_uniform_location(program, name) },
            None => None,
        };
        if location.is_none() {
            log::warn!("program '{}': uniform '{name}' not found, pushes are ignored", self.label);
        }
        self.locations.push(location);
        Ok(handle)
    }

    fn use_program(&mut self, _pass: &mut GlPass, params: &UseParams<'_, GlBackend>) {
        let Some(program) = self.program else {
            if !self.warned_destroyed {
                log::warn!("program '{}' used after destroy", self.label);
                self.warned_destroyed = true;
            }
            return;
        };

        unsafe {
            self.gl.use_program(Some(program));
            if let Some(loc) = &self.view_projection {
                self.gl
                    .uniform_matrix_4_f32_slice(Some(loc), false, &params.view_projection.to_cols_array());
            }
            if let Some(texture) = params.texture {
                self.gl.active_texture(glow::TEXTURE0);
                self.gl.bind_texture(glow::TEXTURE_2D, Some(texture.raw));
                if let Some(loc) = &self.texture {
                    self.gl.uniform_1_i32(Some(loc), 0);
                }
            }
        }
        apply_blend(&self.gl, params.blend);

        for ((_, entry), location) in self.uniforms.iter().zip(&self.locations) {
            if let Some(location) = location {
                self.push_uniform(location, entry.value);
            }
        }
    }

    fn bind_instance(&mut self, _pass: &mut GlPass, _index: u32) {}

    fn release_texture(&mut self, _id: TextureId) {}

    fn destroy(&mut self) {
        if let Some(program) = self.program.take() {
            unsafe { self.gl.delete_program(program) };
            log::debug!("gl program '{}' destroyed", self.label);
        }
        self.locations.clear();
    }
}

impl Drop for GlProgram {
    fn drop(&mut self) {
        self.destroy();
    }
}

// ── compile / link ────────────────────────────────────────────────────────

unsafe fn compile(gl: &glow::Context, label: &str, stage: u32, source: &str) -> Result<glow::Shader> {
    unsafe {
        let shader = gl
            .create_shader(stage)
            .map_err(|e| GfxError::Resource(format!("shader '{label}': {e}")))?;
        gl.shader_source(shader, source);
        gl.compile_shader(shader);
        if !gl.get_shader_compile_status(shader) {
            let log = gl.get_shader_info_log(shader);
            gl.delete_shader(shader);
            return Err(GfxError::ShaderCompile { label: label.to_string(), log });
        }
        Ok(shader)
    }
}

unsafe fn link(
    gl: &glow::Context,
    label: &str,
    vertex: &str,
    fragment: &str,
    varyings: &[&str],
) -> Result<glow::Program> {
    unsafe {
        let vs = compile(gl, label, glow::VERTEX_SHADER, vertex)?;
        let fs = match compile(gl, label, glow::FRAGMENT_SHADER, fragment) {
            Ok(fs) => fs,
            Err(e) => {
                gl.delete_shader(vs);
                return Err(e);
            }
        };

        let program = gl
            .create_program()
            .map_err(|e| GfxError::Resource(format!("program '{label}': {e}")))?;
        gl.attach_shader(program, vs);
        gl.attach_shader(program, fs);
        if !varyings.is_empty() {
            gl.transform_feedback_varyings(program, varyings, glow::INTERLEAVED_ATTRIBS);
        }
        gl.link_program(program);

        gl.detach_shader(program, vs);
        gl.detach_shader(program, fs);
        gl.delete_shader(vs);
        gl.delete_shader(fs);

        if !gl.get_program_link_status(program) {
            let log = gl.get_program_info_log(program);
            gl.delete_program(program);
            return Err(GfxError::ShaderLink { label: label.to_string(), log });
        }
        Ok(program)
    }
}
