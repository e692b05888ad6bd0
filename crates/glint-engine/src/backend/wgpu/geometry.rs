use std::rc::Rc;

use wgpu::util::DeviceExt;

use crate::error::{GfxError, Result};
use crate::gfx::{BufferContents, DrawMode, DrawParams, GeometryBuffer, GeometryDesc, IndexData};

use super::{Shared, WgpuBackend, WgpuPass};

pub struct WgpuGeometry {
    shared: Rc<Shared>,
    label: String,
    buffers: Vec<wgpu::Buffer>,
    index: Option<wgpu::Buffer>,
    bound: usize,
    count: u32,
    warned_unbound: bool,
}

impl WgpuGeometry {
    pub(super) fn new(shared: Rc<Shared>, desc: &GeometryDesc<'_>) -> Result<Self> {
        desc.validate()?;

        let device = &shared.device;
        let buffers = desc
            .buffers
            .iter()
            .enumerate()
            .map(|(i, b)| {
                let label = format!("{} vbo {i}", desc.label);
                let usage = match b.contents {
                    BufferContents::Immutable(_) => wgpu::BufferUsages::VERTEX,
                    _ => wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                };
                match b.contents {
                    BufferContents::Immutable(data) | BufferContents::Mutable(data) => {
                        device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                            label: Some(&label),
                            contents: bytemuck::cast_slice(data),
                            usage,
                        })
                    }
                    BufferContents::Empty(floats) => device.create_buffer(&wgpu::BufferDescriptor {
                        label: Some(&label),
                        size: (floats * std::mem::size_of::<f32>()) as u64,
                        usage,
                        mapped_at_creation: false,
                    }),
                }
            })
            .collect::<Vec<_>>();

        let index = match desc.indices {
            Some(IndexData::U16(indices)) => {
                // Buffer sizes must be 4-byte aligned; pad odd u16 counts.
                let mut padded = indices.to_vec();
                if padded.len() % 2 == 1 {
                    padded.push(0);
                }
                Some(device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(&format!("{} ibo", desc.label)),
                    contents: bytemuck::cast_slice(&padded),
                    usage: wgpu::BufferUsages::INDEX,
                }))
            }
            Some(IndexData::U32(_)) => return Err(GfxError::Unimplemented("32-bit index buffers")),
            None => None,
        };

        log::debug!("wgpu geometry '{}' created ({} buffers)", desc.label, buffers.len());

        Ok(Self {
            shared,
            label: desc.label.to_string(),
            buffers,
            index,
            bound: 0,
            count: desc.count,
            warned_unbound: false,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

impl GeometryBuffer<WgpuBackend> for WgpuGeometry {
    /// Vertex buffers are attached per draw; nothing to record.
    fn bind(&mut self, _pass: &mut WgpuPass<'_>) {}

    fn bind_buffer(&mut self, index: usize) {
        self.bound = index.min(self.buffers.len().saturating_sub(1));
    }

    fn buffer_sub_data(&mut self, pass: &mut WgpuPass<'_>, data: &[f32]) {
        let Some(buffer) = self.buffers.get(self.bound) else { return };
        self.shared.upload(pass.encoder, buffer, 0, bytemuck::cast_slice(data));
    }

    fn draw(&mut self, pass: &mut WgpuPass<'_>, params: DrawParams) {
        let count = params.count.unwrap_or(self.count);
        if count == 0 || params.instances == 0 || self.buffers.is_empty() {
            return;
        }
        let Some(bound) = pass.bound.clone() else {
            if !self.warned_unbound {
                log::warn!("geometry '{}' drawn without a program in use", self.label);
                self.warned_unbound = true;
            }
            return;
        };
        if bound.textured && bound.texture.is_none() {
            log::warn!("geometry '{}' drawn with a textured program but no texture", self.label);
            return;
        }

        let mut rpass = pass.begin(&self.label, None);
        rpass.set_pipeline(&bound.pipeline);
        rpass.set_bind_group(0, &bound.globals, &[bound.offset]);
        if let Some(group) = &bound.texture {
            rpass.set_bind_group(1, group, &[]);
        }
        for (slot, buffer) in self.buffers.iter().enumerate() {
            rpass.set_vertex_buffer(slot as u32, buffer.slice(..));
        }
        let range = params.first..params.first + count;
        match &self.index {
            Some(ibo) => {
                rpass.set_index_buffer(ibo.slice(..), wgpu::IndexFormat::Uint16);
                rpass.draw_indexed(range, 0, 0..params.instances);
            }
            None => rpass.draw(range, 0..params.instances),
        }
    }

    fn transform_feedback(
        &mut self,
        _pass: &mut WgpuPass<'_>,
        _target: &mut Self,
        _count: Option<u32>,
        _mode: Option<DrawMode>,
    ) -> Result<()> {
        Err(GfxError::Unimplemented("transform feedback on the wgpu backend"))
    }

    fn delete(&mut self) {
        for buffer in self.buffers.drain(..) {
            buffer.destroy();
        }
        if let Some(ibo) = self.index.take() {
            ibo.destroy();
        }
    }
}

impl Drop for WgpuGeometry {
    fn drop(&mut self) {
        self.delete();
    }
}
