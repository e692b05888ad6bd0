use std::fmt;

/// Errors raised by backends, batchers and asset loading.
///
/// Configuration problems are reported at construction time. Per-draw calls
/// never return errors: capacity is enforced structurally by auto-flushing.
#[derive(Debug)]
pub enum GfxError {
    /// Invalid or missing descriptor fields (e.g. a buffer without attributes).
    Config(String),
    /// A program was created without source text for the active backend.
    MissingShaderSource { label: String, backend: &'static str },
    /// Shader stage failed to compile; carries the driver log.
    ShaderCompile { label: String, log: String },
    /// Program failed to link; carries the driver log.
    ShaderLink { label: String, log: String },
    /// A uniform key was registered twice on the same program.
    DuplicateUniform(String),
    /// The backend's per-program uniform block is full.
    TooManyUniforms { label: String, max: usize },
    /// The backend has no implementation for the requested path.
    Unimplemented(&'static str),
    /// The explicit backend lost its device. Not recoverable.
    DeviceLost(String),
    /// A backend object could not be created.
    Resource(String),
    Io(std::io::Error),
    Image(image::ImageError),
    Font(String),
}

pub type Result<T, E = GfxError> = std::result::Result<T, E>;

impl fmt::Display for GfxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GfxError::Config(msg) => write!(f, "invalid configuration: {msg}"),
            GfxError::MissingShaderSource { label, backend } => {
                write!(f, "program '{label}' has no {backend} shader source")
            }
            GfxError::ShaderCompile { label, log } => {
                write!(f, "shader '{label}' failed to compile: {log}")
            }
            GfxError::ShaderLink { label, log } => {
                write!(f, "program '{label}' failed to link: {log}")
            }
            GfxError::DuplicateUniform(key) => write!(f, "uniform key '{key}' already registered"),
            GfxError::TooManyUniforms { label, max } => {
                write!(f, "program '{label}' exceeds {max} user uniforms")
            }
            GfxError::Unimplemented(what) => write!(f, "not implemented: {what}"),
            GfxError::DeviceLost(reason) => write!(f, "GPU device lost: {reason}"),
            GfxError::Resource(msg) => write!(f, "GPU resource error: {msg}"),
            GfxError::Io(e) => write!(f, "i/o error: {e}"),
            GfxError::Image(e) => write!(f, "image decode error: {e}"),
            GfxError::Font(msg) => write!(f, "font error: {msg}"),
        }
    }
}

impl std::error::Error for GfxError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GfxError::Io(e) => Some(e),
            GfxError::Image(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for GfxError {
    fn from(e: std::io::Error) -> Self {
        GfxError::Io(e)
    }
}

impl From<image::ImageError> for GfxError {
    fn from(e: image::ImageError) -> Self {
        GfxError::Image(e)
    }
}
