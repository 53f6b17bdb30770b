//! Shader programs with a typed uniform block and an ordered set of texture
//! slots.
//!
//! Bind group layout of every material: textures at bindings `0..n`, the
//! uniform block at binding `n`. A shader may leave any of them undeclared.

use super::{context::Gpu, mesh::Mesh, mesh::Vertex, targets::PassTarget};
use crate::error::GfxError;
use bytemuck::{Pod, Zeroable};

/// Uniform block for materials that take no parameters.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Pod, Zeroable)]
pub struct NoUniforms {
    _pad: [f32; 4],
}

/// Compiles WGSL inside a validation error scope.
pub fn compile_shader(
    device: &wgpu::Device,
    label: &str,
    source: &str,
) -> Result<wgpu::ShaderModule, GfxError> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    });
    match pollster::block_on(device.pop_error_scope()) {
        Some(err) => Err(GfxError::ShaderCompile {
            label: label.to_owned(),
            message: err.to_string(),
        }),
        None => Ok(module),
    }
}

pub struct MaterialDesc<'a> {
    pub label: &'a str,
    pub module: &'a wgpu::ShaderModule,
    pub vs_entry: &'a str,
    pub fs_entry: &'a str,
    pub texture_slots: u32,
    pub color_format: wgpu::TextureFormat,
    pub depth_format: Option<wgpu::TextureFormat>,
    pub cull_mode: Option<wgpu::Face>,
}

pub struct Material<U: Pod> {
    label: String,
    pipeline: wgpu::RenderPipeline,
    layout: wgpu::BindGroupLayout,
    texture_slots: u32,
    ubo: wgpu::Buffer,
    /// Written to the GPU on every `render`. There is one buffer per material
    /// and the write is staged on the queue, so drawing the same material
    /// twice in one submission with different values gives both draws the
    /// last value. Use a separate material per draw in that case.
    pub uniforms: U,
}

impl<U: Pod> Material<U> {
    pub fn new(device: &wgpu::Device, desc: &MaterialDesc<'_>, uniforms: U) -> Result<Self, GfxError> {
        let mut entries: Vec<wgpu::BindGroupLayoutEntry> = (0..desc.texture_slots)
            .map(|binding| wgpu::BindGroupLayoutEntry {
                binding,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: false },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            })
            .collect();
        entries.push(wgpu::BindGroupLayoutEntry {
            binding: desc.texture_slots,
            visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: wgpu::BufferSize::new(std::mem::size_of::<U>() as u64),
            },
            count: None,
        });

        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(&format!("{} Layout", desc.label)),
            entries: &entries,
        });

        let pipe_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(&format!("{} PipelineLayout", desc.label)),
            bind_group_layouts: &[&layout],
            push_constant_ranges: &[],
        });

        // Entry point or interface mismatches only surface at pipeline creation.
        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(&format!("{} Pipeline", desc.label)),
            layout: Some(&pipe_layout),
            vertex: wgpu::VertexState {
                module: desc.module,
                entry_point: desc.vs_entry,
                buffers: &[Vertex::layout()],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: desc.module,
                entry_point: desc.fs_entry,
                targets: &[Some(wgpu::ColorTargetState {
                    format: desc.color_format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: desc.cull_mode,
                ..Default::default()
            },
            depth_stencil: desc.depth_format.map(|format| wgpu::DepthStencilState {
                format,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::LessEqual,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
        });
        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            return Err(GfxError::ShaderCompile {
                label: desc.label.to_owned(),
                message: err.to_string(),
            });
        }

        let ubo = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&format!("{} UBO", desc.label)),
            size: std::mem::size_of::<U>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Ok(Self {
            label: desc.label.to_owned(),
            pipeline,
            layout,
            texture_slots: desc.texture_slots,
            ubo,
            uniforms,
        })
    }

    /// Records one pass: pushes the uniforms, binds `textures` in slot order
    /// and draws `mesh` into `target`, clearing it first when `clear` is set.
    pub fn render(
        &self,
        gpu: &Gpu,
        encoder: &mut wgpu::CommandEncoder,
        target: PassTarget<'_>,
        textures: &[&wgpu::TextureView],
        mesh: &Mesh,
        clear: Option<wgpu::Color>,
    ) {
        debug_assert_eq!(
            textures.len(),
            self.texture_slots as usize,
            "{}: wrong number of textures",
            self.label
        );

        gpu.queue
            .write_buffer(&self.ubo, 0, bytemuck::bytes_of(&self.uniforms));

        let mut entries: Vec<wgpu::BindGroupEntry> = textures
            .iter()
            .enumerate()
            .map(|(slot, view)| wgpu::BindGroupEntry {
                binding: slot as u32,
                resource: wgpu::BindingResource::TextureView(view),
            })
            .collect();
        entries.push(wgpu::BindGroupEntry {
            binding: self.texture_slots,
            resource: self.ubo.as_entire_binding(),
        });

        let bind = gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&self.label),
            layout: &self.layout,
            entries: &entries,
        });

        let mut pass = target.begin(encoder, &self.label, clear);
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &bind, &[]);
        mesh.draw(&mut pass);
    }
}
