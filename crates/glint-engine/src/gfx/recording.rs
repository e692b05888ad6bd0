//! In-memory backend for tests. Every call is appended to a shared log.

use std::cell::RefCell;
use std::rc::Rc;

use crate::coords::ColorRgba;
use crate::error::{GfxError, Result};

use super::{
    Backend, BlendMode, DrawMode, DrawParams, GeometryBuffer, GeometryDesc, ProgramDesc, ProgramState,
    RenderTargetHandle, ShaderProgram, TextureDesc, TextureHandle, TextureId, UniformHandle, UniformKind,
    UniformSet, UseParams,
};

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Upload { geometry: String, buffer: usize, data: Vec<f32> },
    Draw { geometry: String, first: u32, count: u32, instances: u32 },
    UseProgram { program: String, texture: Option<TextureId>, blend: BlendMode },
    BindInstance { program: String, index: u32 },
    Feedback { source: String, target: String, count: u32, mode: DrawMode },
    BindTarget(Option<TextureId>),
    Clear(ColorRgba),
    CreateTarget { id: TextureId, width: u32, height: u32 },
    DestroyTarget(TextureId),
    DestroyTexture(TextureId),
    ReleaseTexture { program: String, id: TextureId },
}

pub type Log = Rc<RefCell<Vec<Command>>>;

#[derive(Default)]
pub struct RecordingBackend {
    pub log: Log,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> Vec<Command> {
        self.log.borrow().clone()
    }

    pub fn clear_log(&self) {
        self.log.borrow_mut().clear();
    }

    /// Draw commands only, as `(geometry, count, instances)`.
    pub fn draws(&self) -> Vec<(String, u32, u32)> {
        self.log
            .borrow()
            .iter()
            .filter_map(|c| match c {
                Command::Draw { geometry, count, instances, .. } => {
                    Some((geometry.clone(), *count, *instances))
                }
                _ => None,
            })
            .collect()
    }

    /// Upload commands only, as `(geometry, data)`.
    pub fn uploads(&self) -> Vec<(String, Vec<f32>)> {
        self.log
            .borrow()
            .iter()
            .filter_map(|c| match c {
                Command::Upload { geometry, data, .. } => Some((geometry.clone(), data.clone())),
                _ => None,
            })
            .collect()
    }

    /// Textures passed to `use_program`, in order.
    pub fn used_textures(&self) -> Vec<Option<TextureId>> {
        self.log
            .borrow()
            .iter()
            .filter_map(|c| match c {
                Command::UseProgram { texture, .. } => Some(*texture),
                _ => None,
            })
            .collect()
    }

    pub fn texture(&self, width: u32, height: u32) -> RecTexture {
        RecTexture { id: TextureId::next(), width, height }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecTexture {
    pub id: TextureId,
    pub width: u32,
    pub height: u32,
}

impl TextureHandle for RecTexture {
    fn id(&self) -> TextureId {
        self.id
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }
}

#[derive(Debug)]
pub struct RecTarget {
    color: RecTexture,
}

impl RenderTargetHandle for RecTarget {
    type Texture = RecTexture;

    fn color(&self) -> &RecTexture {
        &self.color
    }
}

#[derive(Debug)]
pub struct RecGeometry {
    pub label: String,
    log: Log,
    buffers: Vec<Vec<f32>>,
    bound: usize,
    count: u32,
    mode: DrawMode,
    pub deleted: bool,
}

impl RecGeometry {
    /// Current contents of buffer `index`.
    pub fn buffer(&self, index: usize) -> &[f32] {
        &self.buffers[index]
    }
}

impl GeometryBuffer<RecordingBackend> for RecGeometry {
    fn bind(&mut self, _pass: &mut ()) {}

    fn bind_buffer(&mut self, index: usize) {
        self.bound = index;
    }

    fn buffer_sub_data(&mut self, _pass: &mut (), data: &[f32]) {
        let buf = &mut self.buffers[self.bound];
        buf[..data.len()].copy_from_slice(data);
        self.log.borrow_mut().push(Command::Upload {
            geometry: self.label.clone(),
            buffer: self.bound,
            data: data.to_vec(),
        });
    }

    fn draw(&mut self, _pass: &mut (), params: DrawParams) {
        self.log.borrow_mut().push(Command::Draw {
            geometry: self.label.clone(),
            first: params.first,
            count: params.count.unwrap_or(self.count),
            instances: params.instances,
        });
    }

    fn transform_feedback(
        &mut self,
        _pass: &mut (),
        target: &mut Self,
        count: Option<u32>,
        mode: Option<DrawMode>,
    ) -> Result<()> {
        let count = count.unwrap_or(self.count);
        let copied = self.buffers[0].clone();
        let n = copied.len().min(target.buffers[0].len());
        target.buffers[0][..n].copy_from_slice(&copied[..n]);
        self.log.borrow_mut().push(Command::Feedback {
            source: self.label.clone(),
            target: target.label.clone(),
            count,
            mode: mode.unwrap_or(self.mode),
        });
        Ok(())
    }

    fn delete(&mut self) {
        self.deleted = true;
    }
}

#[derive(Debug)]
pub struct RecProgram {
    label: String,
    log: Log,
    uniforms: UniformSet,
    state: ProgramState,
}

impl ShaderProgram<RecordingBackend> for RecProgram {
    fn label(&self) -> &str {
        &self.label
    }

    fn state(&self) -> ProgramState {
        self.state
    }

    fn uniforms(&self) -> &UniformSet {
        &self.uniforms
    }

    fn uniforms_mut(&mut self) -> &mut UniformSet {
        &mut self.uniforms
    }

    fn create_uniform(&mut self, name: &str, kind: UniformKind, key: Option<&str>) -> Result<UniformHandle> {
        self.uniforms.register(name, kind, key)
    }

    fn use_program(&mut self, _pass: &mut (), params: &UseParams<'_, RecordingBackend>) {
        self.log.borrow_mut().push(Command::UseProgram {
            program: self.label.clone(),
            texture: params.texture.map(|t| t.id),
            blend: params.blend,
        });
    }

    fn bind_instance(&mut self, _pass: &mut (), index: u32) {
        self.log.borrow_mut().push(Command::BindInstance { program: self.label.clone(), index });
    }

    fn release_texture(&mut self, id: TextureId) {
        self.log.borrow_mut().push(Command::ReleaseTexture { program: self.label.clone(), id });
    }

    fn destroy(&mut self) {
        self.state = ProgramState::Destroyed;
    }
}

impl Backend for RecordingBackend {
    type Pass<'p> = ();
    type Texture = RecTexture;
    type Target = RecTarget;
    type Geometry = RecGeometry;
    type Program = RecProgram;

    const NAME: &'static str = "recording";

    fn create_geometry(&self, desc: &GeometryDesc<'_>) -> Result<RecGeometry> {
        desc.validate()?;
        let buffers = desc
            .buffers
            .iter()
            .map(|b| match b.contents {
                super::BufferContents::Immutable(d) | super::BufferContents::Mutable(d) => d.to_vec(),
                super::BufferContents::Empty(n) => vec![0.0; n],
            })
            .collect();
        Ok(RecGeometry {
            label: desc.label.to_string(),
            log: self.log.clone(),
            buffers,
            bound: 0,
            count: desc.count,
            mode: desc.mode,
            deleted: false,
        })
    }

    fn create_program(&self, desc: &ProgramDesc<'_>) -> Result<RecProgram> {
        if desc.source.glsl.is_none() && desc.source.wgsl.is_none() {
            return Err(GfxError::MissingShaderSource { label: desc.label.to_string(), backend: Self::NAME });
        }
        Ok(RecProgram {
            label: desc.label.to_string(),
            log: self.log.clone(),
            uniforms: UniformSet::new(),
            state: ProgramState::Initialized,
        })
    }

    fn create_texture(&self, desc: &TextureDesc<'_>, _pixels: Option<&[u8]>) -> Result<RecTexture> {
        Ok(self.texture(desc.width, desc.height))
    }

    fn destroy_texture(&self, texture: RecTexture) {
        self.log.borrow_mut().push(Command::DestroyTexture(texture.id));
    }

    fn create_target(&self, _label: &str, width: u32, height: u32) -> Result<RecTarget> {
        let color = self.texture(width, height);
        self.log.borrow_mut().push(Command::CreateTarget { id: color.id, width, height });
        Ok(RecTarget { color })
    }

    fn destroy_target(&self, target: RecTarget) {
        self.log.borrow_mut().push(Command::DestroyTarget(target.color.id));
    }

    fn bind_target(&self, _pass: &mut (), target: Option<&RecTarget>) {
        self.log.borrow_mut().push(Command::BindTarget(target.map(|t| t.color.id)));
    }

    fn clear(&self, _pass: &mut (), color: ColorRgba) {
        self.log.borrow_mut().push(Command::Clear(color));
    }
}
