//! The rendering orchestrator. Owns the GPU context, the simulation, the
//! scene renderer and the egui renderer.

pub mod context;
pub mod material;
pub mod mesh;
pub mod scene;
pub mod simulation;
pub mod targets;

use self::{context::GfxContext, scene::SceneRenderer, simulation::SimulationPipeline};
use crate::camera::CameraRig;
use std::sync::Arc;
use voxfield::{FrameParams, GridLayout};
use winit::window::Window;

/// Tessellated egui output for one frame.
pub struct OverlayFrame {
    pub shapes: Vec<egui::ClippedPrimitive>,
    pub textures: egui::TexturesDelta,
    pub screen: egui_wgpu::ScreenDescriptor,
}

/// Owns all rendering-related state.
pub struct Renderer {
    pub gfx: GfxContext,
    pub sim: SimulationPipeline,
    pub scene: SceneRenderer,
    pub egui_renderer: egui_wgpu::Renderer,
}

impl Renderer {
    pub async fn new(window: Arc<Window>, layout: GridLayout) -> anyhow::Result<Self> {
        let gfx = GfxContext::new(window).await?;
        let size = gfx.size;

        let sim = SimulationPipeline::new(&gfx.gpu, layout)?;
        let scene = SceneRenderer::new(&gfx.gpu, gfx.config.format, size.width, size.height, &layout)?;
        let egui_renderer =
            egui_wgpu::Renderer::new(&gfx.gpu.device, gfx.config.format, None, 1);

        Ok(Self {
            gfx,
            sim,
            scene,
            egui_renderer,
        })
    }

    pub fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.gfx.resize(new_size);
            self.scene
                .resize(&self.gfx.gpu.device, new_size.width, new_size.height);
        }
    }

    /// Runs the velocity and position passes for one frame.
    pub fn step(&mut self, params: &FrameParams) {
        self.sim.step(&self.gfx.gpu, params);
    }

    /// Scene, compose and overlay in one submission.
    pub fn render(&mut self, swap_view: &wgpu::TextureView, camera: &CameraRig, overlay: &OverlayFrame) {
        let gpu = &self.gfx.gpu;
        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });

        self.scene
            .render(gpu, &mut encoder, swap_view, self.sim.position_view(), camera);

        for (id, delta) in &overlay.textures.set {
            self.egui_renderer
                .update_texture(&gpu.device, &gpu.queue, *id, delta);
        }
        let callbacks = self.egui_renderer.update_buffers(
            &gpu.device,
            &gpu.queue,
            &mut encoder,
            &overlay.shapes,
            &overlay.screen,
        );

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("EGUI Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: swap_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            self.egui_renderer
                .render(&mut render_pass, &overlay.shapes, &overlay.screen);
        }

        gpu.queue
            .submit(callbacks.into_iter().chain(std::iter::once(encoder.finish())));

        for id in &overlay.textures.free {
            self.egui_renderer.free_texture(id);
        }
    }
}
