use std::collections::HashMap;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use bytemuck::{Pod, Zeroable};

use crate::error::{GfxError, Result};
use crate::gfx::{
    BlendMode, DrawMode, ProgramDesc, ProgramState, ShaderProgram, StepMode, TextureHandle, TextureId,
    UniformHandle, UniformKind, UniformSet, UseParams,
};

use super::{blend_state, topology, BoundProgram, Shared, WgpuBackend, WgpuPass, DEPTH_FORMAT};

/// User uniforms per program, each padded to a `vec4<f32>`.
pub const MAX_USER_UNIFORMS: usize = 8;

static NEXT_PROGRAM_ID: AtomicU64 = AtomicU64::new(1);

/// `@group(0) @binding(0) var<uniform> globals: Globals;`
///
/// ```wgsl
/// struct Globals {
///     view_proj: mat4x4<f32>,
///     params: array<vec4<f32>, 8>,
/// }
/// ```
///
/// User uniforms occupy `params` in registration order.
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct Globals {
    view_projection: [[f32; 4]; 4],
    params: [[f32; 4]; MAX_USER_UNIFORMS],
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
struct PipelineKey {
    blend: BlendMode,
    format: wgpu::TextureFormat,
    depth: bool,
}

struct VertexBuffer {
    stride: u64,
    step: wgpu::VertexStepMode,
    attributes: Vec<wgpu::VertexAttribute>,
}

pub struct WgpuProgram {
    shared: Rc<Shared>,
    id: u64,
    label: String,
    state: ProgramState,
    module: wgpu::ShaderModule,
    layout: wgpu::PipelineLayout,
    texture_layout: Option<wgpu::BindGroupLayout>,
    vertex_buffers: Vec<VertexBuffer>,
    mode: DrawMode,

    globals_buffer: wgpu::Buffer,
    globals_group: wgpu::BindGroup,
    slot_stride: u64,
    slots: u32,
    instance: u32,

    pipelines: HashMap<PipelineKey, wgpu::RenderPipeline>,
    /// Render parts: one texture bind group per texture identity.
    texture_groups: HashMap<TextureId, wgpu::BindGroup>,

    uniforms: UniformSet,
    warned_destroyed: bool,
}

impl WgpuProgram {
    pub(super) fn new(shared: Rc<Shared>, desc: &ProgramDesc<'_>) -> Result<Self> {
        if !desc.feedback_varyings.is_empty() {
            return Err(GfxError::Unimplemented("transform feedback on the wgpu backend"));
        }
        let source = desc.source.wgsl.ok_or_else(|| GfxError::MissingShaderSource {
            label: desc.label.to_string(),
            backend: "wgpu",
        })?;

        let device = &shared.device;
        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(desc.label),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });

        let globals_size = std::mem::size_of::<Globals>() as u64;
        let align = device.limits().min_uniform_buffer_offset_alignment.max(1) as u64;
        let slot_stride = globals_size.div_ceil(align) * align;
        let slots = desc.instance_slots.max(1);

        let globals_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("glint globals bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: wgpu::BufferSize::new(globals_size),
                },
                count: None,
            }],
        });

        let texture_layout = desc.textured.then(|| {
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("glint texture bgl"),
                entries: &[
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Texture {
                            sample_type: wgpu::TextureSampleType::Float { filterable: true },
                            view_dimension: wgpu::TextureViewDimension::D2,
                            multisampled: false,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 1,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                        count: None,
                    },
                ],
            })
        });

        let mut group_layouts = vec![&globals_layout];
        if let Some(tl) = texture_layout.as_ref() {
            group_layouts.push(tl);
        }
        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(desc.label),
            bind_group_layouts: &group_layouts,
            immediate_size: 0,
        });

        let globals_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("glint globals ubo"),
            size: slot_stride * slots as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let globals_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("glint globals bind group"),
            layout: &globals_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &globals_buffer,
                    offset: 0,
                    size: wgpu::BufferSize::new(globals_size),
                }),
            }],
        });

        let vertex_buffers = desc
            .vertex_buffers
            .iter()
            .map(|b| VertexBuffer {
                stride: b.stride_bytes() as u64,
                step: match b.step {
                    StepMode::Vertex => wgpu::VertexStepMode::Vertex,
                    StepMode::Instance => wgpu::VertexStepMode::Instance,
                },
                attributes: b
                    .offsets()
                    .map(|(a, offset)| wgpu::VertexAttribute {
                        format: match a.components {
                            1 => wgpu::VertexFormat::Float32,
                            2 => wgpu::VertexFormat::Float32x2,
                            3 => wgpu::VertexFormat::Float32x3,
                            _ => wgpu::VertexFormat::Float32x4,
                        },
                        offset: offset as u64,
                        shader_location: a.location,
                    })
                    .collect(),
            })
            .collect();

        log::debug!("wgpu program '{}' created ({slots} slots)", desc.label);

        Ok(Self {
            id: NEXT_PROGRAM_ID.fetch_add(1, Ordering::Relaxed),
            label: desc.label.to_string(),
            state: ProgramState::Initialized,
            module,
            layout,
            texture_layout,
            vertex_buffers,
            mode: desc.mode,
            globals_buffer,
            globals_group,
            slot_stride,
            slots,
            instance: 0,
            pipelines: HashMap::new(),
            texture_groups: HashMap::new(),
            uniforms: UniformSet::new(),
            warned_destroyed: false,
            shared,
        })
    }

    /// Number of cached per-texture bind groups.
    pub fn cached_textures(&self) -> usize {
        self.texture_groups.len()
    }

    fn ensure_pipeline(&mut self, key: PipelineKey) -> wgpu::RenderPipeline {
        if let Some(p) = self.pipelines.get(&key) {
            return p.clone();
        }

        let buffers: Vec<wgpu::VertexBufferLayout<'_>> = self
            .vertex_buffers
            .iter()
            .map(|b| wgpu::VertexBufferLayout {
                array_stride: b.stride,
                step_mode: b.step,
                attributes: &b.attributes,
            })
            .collect();

        let pipeline = self.shared.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(&self.label),
            layout: Some(&self.layout),
            vertex: wgpu::VertexState {
                module: &self.module,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &buffers,
            },
            fragment: Some(wgpu::FragmentState {
                module: &self.module,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: key.format,
                    blend: blend_state(key.blend),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: topology(self.mode),
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: key.depth.then(|| wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: false,
                depth_compare: wgpu::CompareFunction::Always,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        log::debug!("wgpu program '{}': pipeline for {key:?}", self.label);
        self.pipelines.insert(key, pipeline.clone());
        pipeline
    }

    fn ensure_texture_group(&mut self, texture: &super::WgpuTexture) -> Option<wgpu::BindGroup> {
        let layout = self.texture_layout.as_ref()?;
        let group = self.texture_groups.entry(texture.id()).or_insert_with(|| {
            self.shared.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("glint texture bind group"),
                layout,
                entries: &[
                    wgpu::BindGroupEntry { binding: 0, resource: wgpu::BindingResource::TextureView(&texture.view) },
                    wgpu::BindGroupEntry { binding: 1, resource: wgpu::BindingResource::Sampler(&texture.sampler) },
                ],
            })
        });
        Some(group.clone())
    }

    #[inline]
    fn offset(&self) -> u32 {
        (self.instance as u64 * self.slot_stride) as u32
    }
}

impl ShaderProgram<WgpuBackend> for WgpuProgram {
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

    /// User uniforms are positional: the n-th registered one is `globals.params[n]`.
    fn create_uniform(&mut self, name: &str, kind: UniformKind, key: Option<&str>) -> Result<UniformHandle> {
        if self.uniforms.len() >= MAX_USER_UNIFORMS {
            return Err(GfxError::TooManyUniforms { label: self.label.clone(), max: MAX_USER_UNIFORMS });
        }
        self.uniforms.register(name, kind, key)
    }

    fn use_program(&mut self, pass: &mut WgpuPass<'_>, params: &UseParams<'_, WgpuBackend>) {
        if self.state == ProgramState::Destroyed {
            if !self.warned_destroyed {
                log::warn!("program '{}' used after destroy", self.label);
                self.warned_destroyed = true;
            }
            return;
        }

        let mut globals = Globals {
            view_projection: params.view_projection.to_cols_array_2d(),
            params: [[0.0; 4]; MAX_USER_UNIFORMS],
        };
        for (slot, (_, entry)) in globals.params.iter_mut().zip(self.uniforms.iter()) {
            *slot = entry.value.to_vec4();
        }
        let offset = self.offset();
        self.shared
            .upload(pass.encoder, &self.globals_buffer, offset as u64, bytemuck::bytes_of(&globals));

        let pipeline = self.ensure_pipeline(PipelineKey {
            blend: params.blend,
            format: pass.format,
            depth: pass.depth.is_some(),
        });
        let texture = params.texture.and_then(|t| self.ensure_texture_group(t));

        pass.bound = Some(BoundProgram {
            program: self.id,
            pipeline,
            globals: self.globals_group.clone(),
            offset,
            texture,
            textured: self.texture_layout.is_some(),
        });
    }

    fn bind_instance(&mut self, pass: &mut WgpuPass<'_>, index: u32) {
        if index >= self.slots {
            log::warn!("program '{}': instance {index} out of {} slots", self.label, self.slots);
        }
        self.instance = index.min(self.slots - 1);
        let offset = self.offset();
        if let Some(bound) = pass.bound.as_mut()
            && bound.program == self.id
        {
            bound.offset = offset;
        }
    }

    fn release_texture(&mut self, id: TextureId) {
        if self.texture_groups.remove(&id).is_some() {
            log::debug!("wgpu program '{}': evicted texture {}", self.label, id.raw());
        }
    }

    fn destroy(&mut self) {
        if self.state == ProgramState::Destroyed {
            return;
        }
        self.pipelines.clear();
        self.texture_groups.clear();
        self.globals_buffer.destroy();
        self.state = ProgramState::Destroyed;
        log::debug!("wgpu program '{}' destroyed", self.label);
    }
}
