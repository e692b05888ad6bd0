use crate::error::Result;

use super::Backend;

/// One `f32`-vector vertex attribute.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct VertexAttribute {
    /// Shader input location.
    pub location: u32,
    /// Number of `f32` components (1–4).
    pub components: u32,
}

impl VertexAttribute {
    #[inline]
    pub const fn new(location: u32, components: u32) -> Self {
        Self { location, components }
    }
}

/// Whether a buffer advances per vertex or per instance.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum StepMode {
    Vertex,
    Instance,
}

/// Interleaved attribute layout of a single vertex buffer.
///
/// Attributes are tightly packed in declaration order.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct BufferLayout {
    pub step: StepMode,
    pub attributes: &'static [VertexAttribute],
}

impl BufferLayout {
    #[inline]
    pub const fn new(step: StepMode, attributes: &'static [VertexAttribute]) -> Self {
        Self { step, attributes }
    }

    /// Floats per element (vertex or instance).
    pub const fn stride_floats(&self) -> usize {
        let mut total = 0;
        let mut i = 0;
        while i < self.attributes.len() {
            total += self.attributes[i].components as usize;
            i += 1;
        }
        total
    }

    #[inline]
    pub const fn stride_bytes(&self) -> usize {
        self.stride_floats() * std::mem::size_of::<f32>()
    }

    /// `(attribute, byte offset)` pairs.
    pub fn offsets(&self) -> impl Iterator<Item = (VertexAttribute, usize)> + '_ {
        let mut offset = 0;
        self.attributes.iter().map(move |a| {
            let this = offset;
            offset += a.components as usize * std::mem::size_of::<f32>();
            (*a, this)
        })
    }
}

/// Initial storage of a vertex buffer.
#[derive(Debug, Copy, Clone)]
pub enum BufferContents<'a> {
    /// Uploaded once, never rewritten (base geometry).
    Immutable(&'a [f32]),
    /// Uploaded once, then rewritten by host uploads or GPU feedback.
    Mutable(&'a [f32]),
    /// Zero-filled, writable, sized in floats.
    Empty(usize),
}

impl BufferContents<'_> {
    pub fn len_floats(&self) -> usize {
        match self {
            BufferContents::Immutable(d) | BufferContents::Mutable(d) => d.len(),
            BufferContents::Empty(n) => *n,
        }
    }

    #[inline]
    pub fn is_writable(&self) -> bool {
        !matches!(self, BufferContents::Immutable(_))
    }
}

#[derive(Debug, Copy, Clone)]
pub struct BufferDesc<'a> {
    pub layout: BufferLayout,
    pub contents: BufferContents<'a>,
}

/// Index data for indexed geometry.
#[derive(Debug, Copy, Clone)]
pub enum IndexData<'a> {
    U16(&'a [u16]),
    /// Rejected by both backends with `GfxError::Unimplemented`.
    U32(&'a [u32]),
}

impl IndexData<'_> {
    pub fn len(&self) -> usize {
        match self {
            IndexData::U16(i) => i.len(),
            IndexData::U32(i) => i.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Primitive topology.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum DrawMode {
    #[default]
    Triangles,
    TriangleStrip,
    Lines,
    Points,
}

/// Description of a geometry buffer: vertex buffers, optional indices, draw defaults.
#[derive(Debug, Clone)]
pub struct GeometryDesc<'a> {
    pub label: &'a str,
    pub buffers: &'a [BufferDesc<'a>],
    pub indices: Option<IndexData<'a>>,
    pub mode: DrawMode,
    /// Elements (indices when indexed, vertices otherwise) drawn when
    /// `DrawParams::count` is `None`; also the default feedback count.
    pub count: u32,
    /// Buffer 0 may be the source or target of a feedback capture.
    pub feedback: bool,
}

impl<'a> GeometryDesc<'a> {
    /// Checks the fields every backend relies on.
    pub fn validate(&self) -> Result<()> {
        use crate::error::GfxError;

        if self.buffers.is_empty() {
            return Err(GfxError::Config(format!("geometry '{}' has no vertex buffers", self.label)));
        }
        for (i, b) in self.buffers.iter().enumerate() {
            if b.layout.attributes.is_empty() {
                return Err(GfxError::Config(format!(
                    "geometry '{}' buffer {i} declares no attributes",
                    self.label
                )));
            }
            if b.contents.len_floats() == 0 {
                return Err(GfxError::Config(format!(
                    "geometry '{}' buffer {i} has zero size",
                    self.label
                )));
            }
            if b.contents.len_floats() % b.layout.stride_floats() != 0 {
                return Err(GfxError::Config(format!(
                    "geometry '{}' buffer {i} size is not a multiple of its stride",
                    self.label
                )));
            }
        }
        match self.indices {
            Some(IndexData::U32(_)) => Err(GfxError::Unimplemented("32-bit index buffers")),
            Some(idx) if idx.is_empty() => Err(GfxError::Config(format!(
                "geometry '{}' has an empty index buffer",
                self.label
            ))),
            _ => Ok(()),
        }
    }
}

/// Parameters of a single draw call.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct DrawParams {
    /// First element (index or vertex).
    pub first: u32,
    /// Element count; `None` uses the geometry's configured count.
    pub count: Option<u32>,
    pub instances: u32,
}

impl DrawParams {
    /// Draw the configured element count once.
    #[inline]
    pub const fn all() -> Self {
        Self { first: 0, count: None, instances: 1 }
    }

    /// Draw the first `count` elements once.
    #[inline]
    pub const fn elements(count: u32) -> Self {
        Self { first: 0, count: Some(count), instances: 1 }
    }

    /// Draw the configured base geometry `instances` times.
    #[inline]
    pub const fn instanced(instances: u32) -> Self {
        Self { first: 0, count: None, instances }
    }
}

impl Default for DrawParams {
    fn default() -> Self {
        Self::all()
    }
}

/// Backend vertex/index buffer plus attribute layout.
///
/// `pass` is the backend's command-recording handle: unused by the bind-style
/// backend, the encoder + attachment for the explicit backend.
pub trait GeometryBuffer<B: Backend> {
    /// Makes this geometry's layout current.
    fn bind(&mut self, pass: &mut B::Pass<'_>);

    /// Selects the vertex buffer targeted by subsequent uploads.
    fn bind_buffer(&mut self, index: usize);

    /// Uploads `data` to the start of the bound vertex buffer. Only
    /// `data.len()` floats are transferred, never the whole allocation.
    fn buffer_sub_data(&mut self, pass: &mut B::Pass<'_>, data: &[f32]);

    fn draw(&mut self, pass: &mut B::Pass<'_>, params: DrawParams);

    /// Runs the current program over this geometry with rasterization off and
    /// captures the vertex outputs into `target`'s first buffer.
    ///
    /// `count` defaults to this geometry's configured count, `mode` to its
    /// configured draw mode.
    fn transform_feedback(
        &mut self,
        pass: &mut B::Pass<'_>,
        target: &mut Self,
        count: Option<u32>,
        mode: Option<DrawMode>,
    ) -> Result<()>;

    /// Frees the backend resources. Later calls are no-ops.
    fn delete(&mut self);
}
