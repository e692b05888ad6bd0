use std::rc::Rc;

use glow::HasContext;

use crate::error::{GfxError, Result};
use crate::gfx::{BufferContents, DrawMode, DrawParams, GeometryBuffer, GeometryDesc, IndexData, StepMode};

use super::{draw_mode, GlBackend, GlPass};

/// Vertex array object with its vertex buffers and optional `u16` index buffer.
pub struct GlGeometry {
    gl: Rc<glow::Context>,
    label: String,
    vao: Option<glow::VertexArray>,
    buffers: Vec<glow::Buffer>,
    index: Option<glow::Buffer>,
    bound: usize,
    mode: DrawMode,
    count: u32,
}

impl GlGeometry {
    pub(super) fn new(gl: Rc<glow::Context>, desc: &GeometryDesc<'_>) -> Result<Self> {
        desc.validate()?;

        let resource = |e: String| GfxError::Resource(format!("geometry '{}': {e}", desc.label));

        unsafe {
            let vao = gl.create_vertex_array().map_err(resource)?;
            gl.bind_vertex_array(Some(vao));

            let mut buffers = Vec::with_capacity(desc.buffers.len());
            for b in desc.buffers {
                let buffer = gl.create_buffer().map_err(resource)?;
                gl.bind_buffer(glow::ARRAY_BUFFER, Some(buffer));

                let usage = match b.contents {
                    BufferContents::Immutable(_) => glow::STATIC_DRAW,
                    _ if desc.feedback => glow::DYNAMIC_COPY,
                    _ => glow::DYNAMIC_DRAW,
                };
                match b.contents {
                    BufferContents::Immutable(data) | BufferContents::Mutable(data) => {
                        gl.buffer_data_u8_slice(glow::ARRAY_BUFFER, bytemuck::cast_slice(data), usage);
                    }
                    BufferContents::Empty(floats) => {
                        gl.buffer_data_size(
                            glow::ARRAY_BUFFER,
                            (floats * std::mem::size_of::<f32>()) as i32,
                            usage,
                        );
                    }
                }

                let stride = b.layout.stride_bytes() as i32;
                for (attr, offset) in b.layout.offsets() {
                    gl.enable_vertex_attrib_array(attr.location);
                    gl.vertex_attrib_pointer_f32(
                        attr.location,
                        attr.components as i32,
                        glow::FLOAT,
                        false,
                        stride,
                        offset as i32,
                    );
                    if b.layout.step == StepMode::Instance {
                        gl.vertex_attrib_divisor(attr.location, 1);
                    }
                }
                buffers.push(buffer);
            }

            let index = match desc.indices {
                Some(IndexData::U16(indices)) => {
                    let ibo = gl.create_buffer().map_err(resource)?;
                    gl.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, Some(ibo));
                    gl.buffer_data_u8_slice(
                        glow::ELEMENT_ARRAY_BUFFER,
                        bytemuck::cast_slice(indices),
                        glow::STATIC_DRAW,
                    );
                    Some(ibo)
                }
                Some(IndexData::U32(_)) => return Err(GfxError::Unimplemented("32-bit index buffers")),
                None => None,
            };

            gl.bind_vertex_array(None);
            gl.bind_buffer(glow::ARRAY_BUFFER, None);

            log::debug!("gl geometry '{}' created ({} buffers)", desc.label, buffers.len());

            Ok(Self {
                gl,
                label: desc.label.to_string(),
                vao: Some(vao),
                buffers,
                index,
                bound: 0,
                mode: desc.mode,
                count: desc.count,
            })
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

impl GeometryBuffer<GlBackend> for GlGeometry {
    fn bind(&mut self, _pass: &mut GlPass) {
        unsafe { self.gl.bind_vertex_array(self.vao) };
    }

    fn bind_buffer(&mut self, index: usize) {
        self.bound = index.min(self.buffers.len().saturating_sub(1));
    }

    fn buffer_sub_data(&mut self, _pass: &mut GlPass, data: &[f32]) {
        let Some(buffer) = self.buffers.get(self.bound).copied() else { return };
        if data.is_empty() {
            return;
        }
        unsafe {
            self.gl.bind_buffer(glow::ARRAY_BUFFER, Some(buffer));
            self.gl.buffer_sub_data_u8_slice(glow::ARRAY_BUFFER, 0, bytemuck::cast_slice(data));
            self.gl.bind_buffer(glow::ARRAY_BUFFER, None);
        }
    }

    fn draw(&mut self, _pass: &mut GlPass, params: DrawParams) {
        let Some(vao) = self.vao else { return };
        let count = params.count.unwrap_or(self.count) as i32;
        if count == 0 || params.instances == 0 {
            return;
        }
        let mode = draw_mode(self.mode);
        unsafe {
            self.gl.bind_vertex_array(Some(vao));
            if self.index.is_some() {
                let offset = (params.first as usize * std::mem::size_of::<u16>()) as i32;
                self.gl.draw_elements_instanced(
                    mode,
                    count,
                    glow::UNSIGNED_SHORT,
                    offset,
                    params.instances as i32,
                );
            } else {
                self.gl.draw_arrays_instanced(mode, params.first as i32, count, params.instances as i32);
            }
            self.gl.bind_vertex_array(None);
        }
    }

    fn transform_feedback(
        &mut self,
        _pass: &mut GlPass,
        target: &mut Self,
        count: Option<u32>,
        mode: Option<DrawMode>,
    ) -> Result<()> {
        let (Some(vao), Some(&out)) = (self.vao, target.buffers.first()) else {
            return Err(GfxError::Resource(format!("feedback on deleted geometry '{}'", self.label)));
        };
        let mode = mode.unwrap_or(self.mode);
        let primitive = match mode {
            DrawMode::Points => glow::POINTS,
            DrawMode::Lines => glow::LINES,
            DrawMode::Triangles => glow::TRIANGLES,
            DrawMode::TriangleStrip => {
                return Err(GfxError::Unimplemented("feedback capture of triangle strips"));
            }
        };
        let count = count.unwrap_or(self.count) as i32;

        unsafe {
            self.gl.enable(glow::RASTERIZER_DISCARD);
            self.gl.bind_vertex_array(Some(vao));
            self.gl.bind_buffer_base(glow::TRANSFORM_FEEDBACK_BUFFER, 0, Some(out));
            self.gl.begin_transform_feedback(primitive);
            self.gl.draw_arrays(primitive, 0, count);
            self.gl.end_transform_feedback();
            self.gl.bind_buffer_base(glow::TRANSFORM_FEEDBACK_BUFFER, 0, None);
            self.gl.bind_vertex_array(None);
            self.gl.disable(glow::RASTERIZER_DISCARD);
        }
        Ok(())
    }

    fn delete(&mut self) {
        unsafe {
            if let Some(vao) = self.vao.take() {
                self.gl.delete_vertex_array(vao);
            }
            for buffer in self.buffers.drain(..) {
                self.gl.delete_buffer(buffer);
            }
            if let Some(ibo) = self.index.take() {
                self.gl.delete_buffer(ibo);
            }
        }
    }
}

impl Drop for GlGeometry {
    fn drop(&mut self) {
        self.delete();
    }
}
