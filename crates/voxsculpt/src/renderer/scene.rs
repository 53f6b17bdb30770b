//! Voxel draw into an off-screen target, then compose onto the surface.

use super::{
    context::Gpu,
    material::{compile_shader, Material, MaterialDesc},
    mesh::Mesh,
    targets::{PassTarget, RenderTarget, SCENE_COLOR_FORMAT, SCENE_DEPTH_FORMAT},
};
use crate::{camera::CameraRig, error::GfxError};
use bytemuck::{Pod, Zeroable};
use voxfield::GridLayout;

const VOXEL_WGSL: &str = include_str!("../../shaders/voxel.wgsl");
const COMPOSE_WGSL: &str = include_str!("../../shaders/compose.wgsl");

const SCENE_CLEAR: wgpu::Color = wgpu::Color {
    r: 0.5,
    g: 0.5,
    b: 0.5,
    a: 0.0,
};

/// Fraction of a lattice cell a cube fills; the rest is the gap between cubes.
const VOXEL_FILL: f32 = 0.92;

pub const DEFAULT_VIGNETTE: f32 = 0.6;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum VoxelStyle {
    #[default]
    Solid,
    Wireframe,
}

impl VoxelStyle {
    pub const ALL: [VoxelStyle; 2] = [VoxelStyle::Solid, VoxelStyle::Wireframe];

    fn index(self) -> usize {
        self as usize
    }

    pub fn toggled(self) -> Self {
        match self {
            VoxelStyle::Solid => VoxelStyle::Wireframe,
            VoxelStyle::Wireframe => VoxelStyle::Solid,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            VoxelStyle::Solid => "Solid",
            VoxelStyle::Wireframe => "Wireframe",
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Pod, Zeroable)]
pub struct VoxelUniforms {
    voxel_to_clip: [[f32; 4]; 4],
    grid_size: u32,
    voxel_extent: f32,
    _pad: [f32; 2],
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Pod, Zeroable)]
pub struct ComposeUniforms {
    size: [f32; 2],
    vignette: f32,
    _pad: f32,
}

pub struct SceneRenderer {
    target: RenderTarget,
    cubes: Mesh,
    quad: Mesh,
    /// Indexed by `VoxelStyle`; both built up front so switching is free.
    voxel_materials: [Material<VoxelUniforms>; 2],
    compose: Material<ComposeUniforms>,
    grid_size: u32,
    voxel_extent: f32,
    pub style: VoxelStyle,
    pub vignette: f32,
}

impl SceneRenderer {
    pub fn new(
        gpu: &Gpu,
        surface_format: wgpu::TextureFormat,
        width: u32,
        height: u32,
        layout: &GridLayout,
    ) -> Result<Self, GfxError> {
        let device = &gpu.device;
        let voxel_module = compile_shader(device, "voxel.wgsl", VOXEL_WGSL)?;
        let compose_module = compile_shader(device, "compose.wgsl", COMPOSE_WGSL)?;

        let voxel_material = |style: VoxelStyle| {
            let (fs_entry, cull_mode) = match style {
                VoxelStyle::Solid => ("fs_solid", Some(wgpu::Face::Back)),
                VoxelStyle::Wireframe => ("fs_wire", None),
            };
            Material::new(
                device,
                &MaterialDesc {
                    label: &format!("Voxel {}", style.label()),
                    module: &voxel_module,
                    vs_entry: "vs_main",
                    fs_entry,
                    texture_slots: 1,
                    color_format: SCENE_COLOR_FORMAT,
                    depth_format: Some(SCENE_DEPTH_FORMAT),
                    cull_mode,
                },
                VoxelUniforms::default(),
            )
        };
        let voxel_materials = [
            voxel_material(VoxelStyle::Solid)?,
            voxel_material(VoxelStyle::Wireframe)?,
        ];

        let compose = Material::new(
            device,
            &MaterialDesc {
                label: "Compose",
                module: &compose_module,
                vs_entry: "vs_quad",
                fs_entry: "fs_main",
                texture_slots: 1,
                color_format: surface_format,
                depth_format: None,
                cull_mode: None,
            },
            ComposeUniforms::default(),
        )?;

        let target = RenderTarget::new(
            device,
            "Scene",
            width.max(1),
            height.max(1),
            SCENE_COLOR_FORMAT,
            Some(SCENE_DEPTH_FORMAT),
        )?;

        Ok(Self {
            target,
            cubes: Mesh::cube_batch(device, layout.voxel_count()),
            quad: Mesh::screen_quad(device),
            voxel_materials,
            compose,
            grid_size: layout.size(),
            voxel_extent: VOXEL_FILL / layout.cube_size() as f32,
            style: VoxelStyle::default(),
            vignette: DEFAULT_VIGNETTE,
        })
    }

    /// Recreates the off-screen target. A failed resize keeps the old one.
    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        if let Err(err) = self.target.resize(device, width, height) {
            log::warn!("Keeping {:?} scene target: {}", self.target.size(), err);
        }
    }

    pub fn target(&self) -> &RenderTarget {
        &self.target
    }

    /// Draws the voxels from `position` into the off-screen target, then
    /// composes that onto `surface`.
    pub fn render(
        &mut self,
        gpu: &Gpu,
        encoder: &mut wgpu::CommandEncoder,
        surface: &wgpu::TextureView,
        position: &wgpu::TextureView,
        camera: &CameraRig,
    ) {
        let voxel = &mut self.voxel_materials[self.style.index()];
        voxel.uniforms = VoxelUniforms {
            voxel_to_clip: camera.voxel_to_clip().to_cols_array_2d(),
            grid_size: self.grid_size,
            voxel_extent: self.voxel_extent,
            _pad: [0.0; 2],
        };
        voxel.render(
            gpu,
            encoder,
            self.target.pass_target(),
            &[position],
            &self.cubes,
            Some(SCENE_CLEAR),
        );

        let (width, height) = self.target.size();
        self.compose.uniforms = ComposeUniforms {
            size: [width as f32, height as f32],
            vignette: self.vignette,
            _pad: 0.0,
        };
        self.compose.render(
            gpu,
            encoder,
            PassTarget::surface(surface),
            &[&self.target.color().view],
            &self.quad,
            Some(wgpu::Color::BLACK),
        );
    }
}
