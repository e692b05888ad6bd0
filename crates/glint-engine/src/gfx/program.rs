use glam::Mat4;

use crate::error::{GfxError, Result};

use super::{Backend, BlendMode, BufferLayout, DrawMode, TextureId};

// ── uniforms ──────────────────────────────────────────────────────────────

/// Declared numeric type of a user uniform.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum UniformKind {
    Float,
    Vec2,
    Vec3,
    Bool,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    Bool(bool),
}

impl UniformValue {
    pub fn zero(kind: UniformKind) -> Self {
        match kind {
            UniformKind::Float => UniformValue::Float(0.0),
            UniformKind::Vec2 => UniformValue::Vec2([0.0; 2]),
            UniformKind::Vec3 => UniformValue::Vec3([0.0; 3]),
            UniformKind::Bool => UniformValue::Bool(false),
        }
    }

    fn one(kind: UniformKind) -> Self {
        match kind {
            UniformKind::Float => UniformValue::Float(1.0),
            UniformKind::Vec2 => UniformValue::Vec2([1.0; 2]),
            UniformKind::Vec3 => UniformValue::Vec3([1.0; 3]),
            UniformKind::Bool => UniformValue::Bool(true),
        }
    }

    pub fn kind(&self) -> UniformKind {
        match self {
            UniformValue::Float(_) => UniformKind::Float,
            UniformValue::Vec2(_) => UniformKind::Vec2,
            UniformValue::Vec3(_) => UniformKind::Vec3,
            UniformValue::Bool(_) => UniformKind::Bool,
        }
    }

    /// Padded to a `vec4<f32>`; booleans become 0.0 / 1.0.
    pub fn to_vec4(&self) -> [f32; 4] {
        match *self {
            UniformValue::Float(v) => [v, 0.0, 0.0, 0.0],
            UniformValue::Vec2([x, y]) => [x, y, 0.0, 0.0],
            UniformValue::Vec3([x, y, z]) => [x, y, z, 0.0],
            UniformValue::Bool(b) => [if b { 1.0 } else { 0.0 }, 0.0, 0.0, 0.0],
        }
    }
}

/// Index of a uniform within its program's [`UniformSet`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct UniformHandle(pub(crate) usize);

impl UniformHandle {
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

/// A user-adjustable uniform.
///
/// `min`/`max` describe the range offered to tooling; they are not enforced
/// when the value is pushed.
#[derive(Debug, Clone, PartialEq)]
pub struct UniformEntry {
    /// Variable name inside the shader.
    pub name: String,
    /// Lookup alias; equals `name` unless one was given at registration.
    pub key: String,
    pub value: UniformValue,
    pub min: UniformValue,
    pub max: UniformValue,
}

impl UniformEntry {
    #[inline]
    pub fn kind(&self) -> UniformKind {
        self.value.kind()
    }
}

/// Ordered set of user uniforms, unique by key.
#[derive(Debug, Clone, Default)]
pub struct UniformSet {
    entries: Vec<UniformEntry>,
}

impl UniformSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: &str, kind: UniformKind, key: Option<&str>) -> Result<UniformHandle> {
        let key = key.unwrap_or(name);
        if self.find(key).is_some() {
            return Err(GfxError::DuplicateUniform(key.to_string()));
        }
        self.entries.push(UniformEntry {
            name: name.to_string(),
            key: key.to_string(),
            value: UniformValue::zero(kind),
            min: UniformValue::zero(kind),
            max: UniformValue::one(kind),
        });
        Ok(UniformHandle(self.entries.len() - 1))
    }

    pub fn find(&self, key: &str) -> Option<UniformHandle> {
        self.entries.iter().position(|e| e.key == key).map(UniformHandle)
    }

    pub fn get(&self, handle: UniformHandle) -> Option<&UniformEntry> {
        self.entries.get(handle.0)
    }

    pub fn value(&self, handle: UniformHandle) -> Option<UniformValue> {
        self.get(handle).map(|e| e.value)
    }

    /// Replaces the value. The new value must have the declared kind.
    pub fn set(&mut self, handle: UniformHandle, value: UniformValue) -> Result<()> {
        let entry = self
            .entries
            .get_mut(handle.0)
            .ok_or_else(|| GfxError::Config(format!("unknown uniform handle {}", handle.0)))?;
        if entry.kind() != value.kind() {
            return Err(GfxError::Config(format!(
                "uniform '{}' is {:?}, got {:?}",
                entry.key,
                entry.kind(),
                value.kind()
            )));
        }
        entry.value = value;
        Ok(())
    }

    /// Sets the tooling range. Both bounds must have the declared kind.
    pub fn set_range(&mut self, handle: UniformHandle, min: UniformValue, max: UniformValue) -> Result<()> {
        let entry = self
            .entries
            .get_mut(handle.0)
            .ok_or_else(|| GfxError::Config(format!("unknown uniform handle {}", handle.0)))?;
        if min.kind() != entry.kind() || max.kind() != entry.kind() {
            return Err(GfxError::Config(format!("range kind mismatch for uniform '{}'", entry.key)));
        }
        entry.min = min;
        entry.max = max;
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = (UniformHandle, &UniformEntry)> {
        self.entries.iter().enumerate().map(|(i, e)| (UniformHandle(i), e))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ── programs ──────────────────────────────────────────────────────────────

#[derive(Debug, Copy, Clone)]
pub struct GlslSource<'a> {
    pub vertex: &'a str,
    pub fragment: &'a str,
}

/// Shader text per backend. A backend fails with `MissingShaderSource` when
/// its entry is absent.
#[derive(Debug, Copy, Clone, Default)]
pub struct ShaderSource<'a> {
    pub glsl: Option<GlslSource<'a>>,
    /// Single module with `vs_main` / `fs_main` entry points.
    pub wgsl: Option<&'a str>,
}

/// Description of a shader program and the fixed state it is used with.
#[derive(Debug, Clone)]
pub struct ProgramDesc<'a> {
    pub label: &'a str,
    pub source: ShaderSource<'a>,
    /// Vertex buffer layouts, in geometry buffer order.
    pub vertex_buffers: &'a [BufferLayout],
    pub mode: DrawMode,
    /// Samples one color texture bound through [`UseParams::texture`].
    pub textured: bool,
    /// Vertex outputs captured during a feedback pass, interleaved in order.
    /// Empty for ordinary render programs.
    pub feedback_varyings: &'a [&'a str],
    /// Number of per-instance uniform slots selectable with `bind_instance`.
    pub instance_slots: u32,
}

impl<'a> ProgramDesc<'a> {
    pub fn new(label: &'a str, source: ShaderSource<'a>, vertex_buffers: &'a [BufferLayout]) -> Self {
        Self {
            label,
            source,
            vertex_buffers,
            mode: DrawMode::Triangles,
            textured: false,
            feedback_varyings: &[],
            instance_slots: 1,
        }
    }

    pub fn mode(mut self, mode: DrawMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn textured(mut self) -> Self {
        self.textured = true;
        self
    }

    pub fn feedback(mut self, varyings: &'a [&'a str]) -> Self {
        self.feedback_varyings = varyings;
        self
    }

    pub fn instance_slots(mut self, slots: u32) -> Self {
        self.instance_slots = slots.max(1);
        self
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ProgramState {
    Initialized,
    Destroyed,
}

/// Per-use inputs pushed alongside the user uniforms.
pub struct UseParams<'a, B: Backend> {
    pub view_projection: Mat4,
    pub texture: Option<&'a B::Texture>,
    pub blend: BlendMode,
}

impl<'a, B: Backend> UseParams<'a, B> {
    pub fn new(view_projection: Mat4) -> Self {
        Self { view_projection, texture: None, blend: BlendMode::Alpha }
    }

    pub fn texture(mut self, texture: &'a B::Texture) -> Self {
        self.texture = Some(texture);
        self
    }

    pub fn blend(mut self, blend: BlendMode) -> Self {
        self.blend = blend;
        self
    }
}

/// Compiled program with named user uniforms.
///
/// Programs are created initialized by [`Backend::create_program`]; `destroy`
/// moves them to [`ProgramState::Destroyed`], after which `use_program` logs and
/// does nothing.
pub trait ShaderProgram<B: Backend> {
    fn label(&self) -> &str;

    fn state(&self) -> ProgramState;

    fn uniforms(&self) -> &UniformSet;

    fn uniforms_mut(&mut self) -> &mut UniformSet;

    /// Registers a user uniform named `name` in the shader, looked up by `key`
    /// (defaults to `name`). A name the compiled program does not expose is
    /// logged and kept CPU-side only.
    fn create_uniform(&mut self, name: &str, kind: UniformKind, key: Option<&str>) -> Result<UniformHandle>;

    /// Activates the program and pushes the camera, blend, texture and every
    /// registered uniform.
    fn use_program(&mut self, pass: &mut B::Pass<'_>, params: &UseParams<'_, B>);

    /// Selects the per-instance uniform slot for the next `use_program` and
    /// the draws following it. Bind-style backends ignore it.
    fn bind_instance(&mut self, pass: &mut B::Pass<'_>, index: u32);

    /// Drops cached state tied to a texture about to be destroyed.
    fn release_texture(&mut self, id: TextureId);

    fn destroy(&mut self);

    fn set_uniform(&mut self, handle: UniformHandle, value: UniformValue) -> Result<()> {
        self.uniforms_mut().set(handle, value)
    }

    fn set_uniform_by_key(&mut self, key: &str, value: UniformValue) -> Result<()> {
        let handle = self
            .uniforms()
            .find(key)
            .ok_or_else(|| GfxError::Config(format!("program '{}' has no uniform '{key}'", self.label())))?;
        self.set_uniform(handle, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_key_is_rejected() {
        let mut set = UniformSet::new();
        set.register("u_strength", UniformKind::Float, None).unwrap();
        let err = set.register("u_other", UniformKind::Float, Some("u_strength"));
        assert!(matches!(err, Err(GfxError::DuplicateUniform(k)) if k == "u_strength"));
    }

    #[test]
    fn alias_is_found_by_key_not_name() {
        let mut set = UniformSet::new();
        let h = set.register("u_radius", UniformKind::Float, Some("radius")).unwrap();
        assert_eq!(set.find("radius"), Some(h));
        assert_eq!(set.find("u_radius"), None);
        assert_eq!(set.get(h).unwrap().name, "u_radius");
    }

    #[test]
    fn set_checks_kind() {
        let mut set = UniformSet::new();
        let h = set.register("u_dir", UniformKind::Vec2, None).unwrap();
        assert!(set.set(h, UniformValue::Float(1.0)).is_err());
        set.set(h, UniformValue::Vec2([1.0, 0.0])).unwrap();
        assert_eq!(set.value(h), Some(UniformValue::Vec2([1.0, 0.0])));
    }

    #[test]
    fn default_range_is_zero_to_one() {
        let mut set = UniformSet::new();
        let h = set.register("u_on", UniformKind::Bool, None).unwrap();
        let e = set.get(h).unwrap();
        assert_eq!(e.min, UniformValue::Bool(false));
        assert_eq!(e.max, UniformValue::Bool(true));
    }

    #[test]
    fn bool_pads_to_vec4() {
        assert_eq!(UniformValue::Bool(true).to_vec4(), [1.0, 0.0, 0.0, 0.0]);
        assert_eq!(UniformValue::Vec3([1.0, 2.0, 3.0]).to_vec4(), [1.0, 2.0, 3.0, 0.0]);
    }
}
