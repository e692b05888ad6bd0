/// Color blending applied by a program for the duration of a flush.
///
/// Bind-style backends set it as global state on `use`; explicit backends bake
/// it into the pipeline, so it is part of the pipeline cache key.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum BlendMode {
    /// Straight alpha: `src * a + dst * (1 - a)`.
    #[default]
    Alpha,
    /// Premultiplied alpha: `src + dst * (1 - a)`.
    Premultiplied,
    /// `src * a + dst`.
    Additive,
    /// `src * dst`.
    Multiply,
    /// Blending disabled; source overwrites destination.
    Replace,
}
