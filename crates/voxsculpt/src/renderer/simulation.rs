//! Texture-resident voxel simulation.
//!
//! Every pass that reads a texture it also updates renders into a private
//! scratch texture first, then copies the scratch into the real destination.

use super::{
    context::Gpu,
    material::{compile_shader, Material, MaterialDesc},
    mesh::Mesh,
    targets::{GpuTexture, RenderTarget},
};
use crate::error::GfxError;
use bytemuck::{Pod, Zeroable};
use half::f16;
use voxfield::{
    kernel::{DAMPING, PULL, STIFFNESS},
    FrameParams, GridLayout, ImportPayload,
};

const COPY_WGSL: &str = include_str!("../../shaders/copy.wgsl");
const INIT_WGSL: &str = include_str!("../../shaders/init_lattice.wgsl");
const VELOCITY_WGSL: &str = include_str!("../../shaders/velocity.wgsl");
const POSITION_WGSL: &str = include_str!("../../shaders/position.wgsl");

const DATA_CLEAR: wgpu::Color = wgpu::Color::TRANSPARENT;

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Pod, Zeroable)]
pub struct SimUniforms {
    voxel_to_clip: [[f32; 4]; 4],
    clip_to_voxel: [[f32; 4]; 4],
    brush: [f32; 4],
    dt: f32,
    aspect: f32,
    stiffness: f32,
    damping: f32,
    pull: f32,
    _pad: [f32; 3],
}

impl SimUniforms {
    pub fn new(params: &FrameParams) -> Self {
        let brush = &params.brush;
        Self {
            voxel_to_clip: params.voxel_to_clip.to_cols_array_2d(),
            clip_to_voxel: params.clip_to_voxel.to_cols_array_2d(),
            brush: [
                brush.plane.x,
                brush.plane.y,
                brush.radius,
                if brush.active { 1.0 } else { 0.0 },
            ],
            dt: params.dt,
            aspect: params.aspect,
            stiffness: STIFFNESS,
            damping: DAMPING,
            pull: PULL,
            _pad: [0.0; 3],
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Pod, Zeroable)]
pub struct StepUniforms {
    dt: f32,
    _pad: [f32; 3],
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Pod, Zeroable)]
pub struct CopyUniforms {
    dst_size: [f32; 2],
    _pad: [f32; 2],
}

impl CopyUniforms {
    fn new(size: u32) -> Self {
        Self {
            dst_size: [size as f32; 2],
            _pad: [0.0; 2],
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Pod, Zeroable)]
pub struct LatticeUniforms {
    cube: f32,
    layers_per_row: f32,
    _pad: [f32; 2],
}

/// Which simulation texture to read back.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SimField {
    Position,
    Velocity,
    Desired,
}

/// The three S×S textures holding the voxel field.
pub struct SimulationState {
    pub position: RenderTarget,
    pub velocity: RenderTarget,
    pub desired: RenderTarget,
}

impl SimulationState {
    pub fn new(gpu: &Gpu, layout: &GridLayout) -> Result<Self, GfxError> {
        Ok(Self {
            position: data_target(gpu, "Position", layout)?,
            velocity: data_target(gpu, "Velocity", layout)?,
            desired: data_target(gpu, "Desired Position", layout)?,
        })
    }

    pub fn get(&self, field: SimField) -> &RenderTarget {
        match field {
            SimField::Position => &self.position,
            SimField::Velocity => &self.velocity,
            SimField::Desired => &self.desired,
        }
    }
}

fn data_desc<'a>(
    label: &'a str,
    module: &'a wgpu::ShaderModule,
    texture_slots: u32,
    color_format: wgpu::TextureFormat,
) -> MaterialDesc<'a> {
    MaterialDesc {
        label,
        module,
        vs_entry: "vs_quad",
        fs_entry: "fs_main",
        texture_slots,
        color_format,
        depth_format: None,
        cull_mode: None,
    }
}

/// An S×S target in the negotiated simulation format.
pub fn data_target(gpu: &Gpu, label: &str, layout: &GridLayout) -> Result<RenderTarget, GfxError> {
    RenderTarget::new(
        &gpu.device,
        label,
        layout.size(),
        layout.size(),
        gpu.sim_format,
        None,
    )
}

pub struct SimulationPipeline {
    layout: GridLayout,
    pub state: SimulationState,
    scratch: RenderTarget,
    export_target: RenderTarget,
    quad: Mesh,
    copy: Material<CopyUniforms>,
    copy_rgba8: Material<CopyUniforms>,
    init: Material<LatticeUniforms>,
    velocity: Material<SimUniforms>,
    position: Material<StepUniforms>,
}

impl SimulationPipeline {
    /// Allocates the state, compiles every data material and seeds the lattice.
    pub fn new(gpu: &Gpu, layout: GridLayout) -> Result<Self, GfxError> {
        let device = &gpu.device;
        let size = layout.size();

        let copy_module = compile_shader(device, "copy.wgsl", COPY_WGSL)?;
        let init_module = compile_shader(device, "init_lattice.wgsl", INIT_WGSL)?;
        let velocity_module = compile_shader(device, "velocity.wgsl", VELOCITY_WGSL)?;
        let position_module = compile_shader(device, "position.wgsl", POSITION_WGSL)?;

        let copy = Material::new(
            device,
            &data_desc("Copy", &copy_module, 1, gpu.sim_format),
            CopyUniforms::new(size),
        )?;
        let copy_rgba8 = Material::new(
            device,
            &data_desc("Copy RGBA8", &copy_module, 1, wgpu::TextureFormat::Rgba8Unorm),
            CopyUniforms::new(size),
        )?;
        let init = Material::new(
            device,
            &data_desc("Init Lattice", &init_module, 0, gpu.sim_format),
            LatticeUniforms {
                cube: layout.cube_size() as f32,
                layers_per_row: layout.layers_per_row() as f32,
                _pad: [0.0; 2],
            },
        )?;
        let velocity = Material::new(
            device,
            &data_desc("Velocity", &velocity_module, 3, gpu.sim_format),
            SimUniforms::default(),
        )?;
        let position = Material::new(
            device,
            &data_desc("Position", &position_module, 2, gpu.sim_format),
            StepUniforms::default(),
        )?;

        let state = SimulationState::new(gpu, &layout)?;
        let scratch = data_target(gpu, "Scratch", &layout)?;
        let export_target = RenderTarget::new(
            device,
            "Export",
            size,
            size,
            wgpu::TextureFormat::Rgba8Unorm,
            None,
        )?;

        let mut pipeline = Self {
            layout,
            state,
            scratch,
            export_target,
            quad: Mesh::screen_quad(device),
            copy,
            copy_rgba8,
            init,
            velocity,
            position,
        };
        pipeline.seed(gpu);

        log::info!(
            "Simulation {}x{} texels, {}³ voxels",
            size,
            size,
            layout.cube_size()
        );
        Ok(pipeline)
    }

    #[inline]
    pub fn layout(&self) -> &GridLayout {
        &self.layout
    }

    #[inline]
    pub fn position_view(&self) -> &wgpu::TextureView {
        &self.state.position.color().view
    }

    /// Puts every voxel back on its lattice cell, at rest.
    pub fn seed(&mut self, gpu: &Gpu) {
        let mut encoder = self.encoder(gpu, "Seed Encoder");
        self.render_data(gpu, &mut encoder, &self.init, &[], &self.state.position);
        self.settle(gpu, &mut encoder);
        gpu.queue.submit(std::iter::once(encoder.finish()));
    }

    /// Advances the field by one frame: the velocity pass, then the position
    /// pass reading the velocities just written.
    pub fn step(&mut self, gpu: &Gpu, params: &FrameParams) {
        self.velocity.uniforms = SimUniforms::new(params);
        self.position.uniforms = StepUniforms {
            dt: params.dt,
            _pad: [0.0; 3],
        };

        let state = &self.state;
        let position = &state.position.color().view;
        let velocity = &state.velocity.color().view;
        let desired = &state.desired.color().view;

        let mut encoder = self.encoder(gpu, "Simulation Encoder");
        self.render_data(
            gpu,
            &mut encoder,
            &self.velocity,
            &[position, velocity, desired],
            &state.velocity,
        );
        self.render_data(
            gpu,
            &mut encoder,
            &self.position,
            &[position, velocity],
            &state.position,
        );
        gpu.queue.submit(std::iter::once(encoder.finish()));
    }

    /// Draws `src` into `dst` through the copy shader. `src` must not be a
    /// view of `dst`.
    pub fn copy_texture(
        &self,
        gpu: &Gpu,
        encoder: &mut wgpu::CommandEncoder,
        src: &wgpu::TextureView,
        dst: &RenderTarget,
    ) {
        self.copy
            .render(gpu, encoder, dst.pass_target(), &[src], &self.quad, Some(DATA_CLEAR));
    }

    /// Replaces Position with `payload` and makes it the new rest shape.
    /// On error nothing is written.
    pub fn import(&mut self, gpu: &Gpu, payload: &ImportPayload) -> Result<(), GfxError> {
        payload
            .validate(&self.layout)
            .map_err(|e| GfxError::Payload(e.to_string()))?;
        if let ImportPayload::Bitmap { width, height, .. } = payload {
            let max = gpu.device.limits().max_texture_dimension_2d;
            if *width > max || *height > max {
                return Err(GfxError::Payload(format!(
                    "bitmap {}x{} exceeds the device texture limit of {}",
                    width, height, max
                )));
            }
        }

        let mut encoder = self.encoder(gpu, "Import Encoder");
        match payload {
            ImportPayload::Bitmap {
                width,
                height,
                rgba8,
            } => {
                let staging = GpuTexture::new(
                    &gpu.device,
                    "Import Staging",
                    *width,
                    *height,
                    wgpu::TextureFormat::Rgba8Unorm,
                    wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                );
                staging.upload(&gpu.queue, rgba8);
                self.copy_texture(gpu, &mut encoder, &staging.view, &self.state.position);
            }
            ImportPayload::Field(texels) => {
                let bytes = encode_texels(gpu.sim_format, texels);
                self.state.position.color().upload(&gpu.queue, &bytes);
            }
        }
        self.settle(gpu, &mut encoder);
        gpu.queue.submit(std::iter::once(encoder.finish()));

        log::info!("Imported {} payload", payload.kind());
        Ok(())
    }

    /// Position as S·S·4 bytes, each channel clamped to [0,1] and scaled to 255.
    /// Blocks until the GPU catches up.
    pub fn read_position_rgba8(&self, gpu: &Gpu) -> Result<Vec<u8>, GfxError> {
        let mut encoder = self.encoder(gpu, "Export Encoder");
        self.copy_rgba8.render(
            gpu,
            &mut encoder,
            self.export_target.pass_target(),
            &[self.position_view()],
            &self.quad,
            Some(DATA_CLEAR),
        );
        gpu.queue.submit(std::iter::once(encoder.finish()));
        self.export_target.color().read_texels(gpu)
    }

    /// Reads one simulation texture back as float texels. Blocks.
    pub fn read_field(&self, gpu: &Gpu, field: SimField) -> Result<Vec<[f32; 4]>, GfxError> {
        read_target(gpu, self.state.get(field))
    }

    fn encoder(&self, gpu: &Gpu, label: &str) -> wgpu::CommandEncoder {
        gpu.device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some(label) })
    }

    /// Renders `material` into the scratch texture, then copies the scratch
    /// into `dest`.
    fn render_data<U: Pod>(
        &self,
        gpu: &Gpu,
        encoder: &mut wgpu::CommandEncoder,
        material: &Material<U>,
        textures: &[&wgpu::TextureView],
        dest: &RenderTarget,
    ) {
        material.render(
            gpu,
            encoder,
            self.scratch.pass_target(),
            textures,
            &self.quad,
            Some(DATA_CLEAR),
        );
        self.copy_texture(gpu, encoder, &self.scratch.color().view, dest);
    }

    /// Desired ← Position, Velocity ← 0.
    fn settle(&self, gpu: &Gpu, encoder: &mut wgpu::CommandEncoder) {
        self.copy_texture(gpu, encoder, self.position_view(), &self.state.desired);
        let _clear = self
            .state
            .velocity
            .pass_target()
            .begin(encoder, "Velocity Clear", Some(DATA_CLEAR));
    }
}

/// Reads any float render target back as texels. Blocks.
pub fn read_target(gpu: &Gpu, target: &RenderTarget) -> Result<Vec<[f32; 4]>, GfxError> {
    let color = target.color();
    let bytes = color.read_texels(gpu)?;
    Ok(decode_texels(color.format, &bytes))
}

/// Float texels → upload bytes for `format` (32- or 16-bit float channels).
pub fn encode_texels(format: wgpu::TextureFormat, texels: &[[f32; 4]]) -> Vec<u8> {
    match format {
        wgpu::TextureFormat::Rgba16Float => texels
            .iter()
            .flatten()
            .flat_map(|c| f16::from_f32(*c).to_le_bytes())
            .collect(),
        _ => bytemuck::cast_slice(texels).to_vec(),
    }
}

/// Readback bytes → float texels.
pub fn decode_texels(format: wgpu::TextureFormat, bytes: &[u8]) -> Vec<[f32; 4]> {
    let channels: Vec<f32> = match format {
        wgpu::TextureFormat::Rgba16Float => bytes
            .chunks_exact(2)
            .map(|b| f16::from_le_bytes([b[0], b[1]]).to_f32())
            .collect(),
        wgpu::TextureFormat::Rgba8Unorm => bytes.iter().map(|b| *b as f32 / 255.0).collect(),
        _ => bytes
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect(),
    };
    channels
        .chunks_exact(4)
        .map(|c| [c[0], c[1], c[2], c[3]])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Mat4, Vec2};
    use voxfield::Brush;

    #[test]
    fn uniform_blocks_match_wgsl_sizes() {
        assert_eq!(std::mem::size_of::<SimUniforms>(), 176);
        assert_eq!(std::mem::size_of::<StepUniforms>(), 16);
        assert_eq!(std::mem::size_of::<CopyUniforms>(), 16);
        assert_eq!(std::mem::size_of::<LatticeUniforms>(), 16);
    }

    #[test]
    fn sim_uniforms_carry_the_brush() {
        let brush = Brush {
            plane: Vec2::new(0.25, 0.75),
            radius: 0.2,
            active: true,
        };
        let u = SimUniforms::new(&FrameParams::new(1.0, Mat4::IDENTITY, 1.5, brush));
        assert_eq!(u.brush, [0.25, 0.75, 0.2, 1.0]);
        assert_eq!(u.dt, voxfield::kernel::MAX_DELTA_TIME);
        assert_eq!(u.aspect, 1.5);

        let idle = SimUniforms::new(&FrameParams::new(0.01, Mat4::IDENTITY, 1.0, Brush::INACTIVE));
        assert_eq!(idle.brush[3], 0.0);
    }

    #[test]
    fn half_float_texels_survive_encoding() {
        let texels = vec![[0.5, 0.25, 1.0, 0.0], [0.0625, 0.75, 0.125, 1.0]];
        for format in [
            wgpu::TextureFormat::Rgba16Float,
            wgpu::TextureFormat::Rgba32Float,
        ] {
            let bytes = encode_texels(format, &texels);
            assert_eq!(bytes.len(), texels.len() * format.block_copy_size(None).unwrap() as usize);
            assert_eq!(decode_texels(format, &bytes), texels);
        }
    }
}
