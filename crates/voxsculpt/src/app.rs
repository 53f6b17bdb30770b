use crate::{
    camera::CameraRig,
    config::Config,
    data::{load_payload, save_bitmap},
    input::{self, GestureMapper, InputQueue, PointerTracker, ToolState},
    renderer::{OverlayFrame, Renderer},
    ui::{self, HudStats, UiAction},
};
use anyhow::Result;
use std::{path::Path, sync::Arc, time::Instant};
use winit::{
    event::{ElementState, WindowEvent},
    keyboard::{KeyCode, PhysicalKey},
    window::Window,
};

pub struct App {
    pub config: Config,
    pub renderer: Renderer,
    pub camera: CameraRig,
    pub tool: ToolState,
    pub input: InputQueue,
    pub gestures: GestureMapper,
    pub pointers: PointerTracker,
    pub egui_ctx: egui::Context,
    pub egui_state: egui_winit::State,
    last_frame: Instant,
    fps: f32,
}

impl App {
    pub async fn new(window: Arc<Window>, config: Config) -> Result<Self> {
        let layout = config.layout()?;
        let mut renderer = Renderer::new(window.clone(), layout).await?;
        let size = renderer.gfx.size;

        if config.wireframe {
            renderer.scene.style = renderer.scene.style.toggled();
        }
        let tool = ToolState {
            radius: config.brush_radius,
            sculpt_mode: config.sculpt,
            ..ToolState::default()
        };

        let egui_ctx = egui::Context::default();
        let egui_state = egui_winit::State::new(
            egui_ctx.clone(),
            egui_ctx.viewport_id(),
            &*window,
            None,
            None,
        );

        Ok(Self {
            config,
            renderer,
            camera: CameraRig::new(size.width, size.height),
            tool,
            input: InputQueue::default(),
            gestures: GestureMapper::new(size.width, size.height),
            pointers: PointerTracker::new(size),
            egui_ctx,
            egui_state,
            last_frame: Instant::now(),
            fps: 0.0,
        })
    }

    pub fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.renderer.resize(new_size);
            self.camera.resize(new_size.width, new_size.height);
            self.gestures.resize(new_size.width, new_size.height);
        }
    }

    /// Returns true when the event was consumed.
    pub fn handle_event(&mut self, window: &Window, event: &WindowEvent) -> bool {
        let response = self.egui_state.on_window_event(window, event);
        if response.consumed {
            if input::ends_gesture(event) {
                self.pointers.handle_event(event, &mut self.input);
            }
            return true;
        }

        self.pointers.handle_event(event, &mut self.input);

        match event {
            WindowEvent::Resized(physical_size) => self.resize(*physical_size),
            WindowEvent::KeyboardInput { event, .. }
                if event.state == ElementState::Pressed && !event.repeat =>
            {
                return self.handle_key(event.physical_key);
            }
            _ => {}
        }

        false
    }

    fn handle_key(&mut self, key: PhysicalKey) -> bool {
        match key {
            PhysicalKey::Code(KeyCode::KeyW) => {
                self.renderer.scene.style = self.renderer.scene.style.toggled();
            }
            PhysicalKey::Code(KeyCode::KeyS) => {
                self.tool.sculpt_mode = !self.tool.sculpt_mode;
                self.tool.active = false;
                log::info!("Sculpt mode {}", if self.tool.sculpt_mode { "on" } else { "off" });
            }
            PhysicalKey::Code(KeyCode::KeyE) => self.export(),
            PhysicalKey::Code(KeyCode::KeyR) => self.reset(),
            _ => return false,
        }
        true
    }

    /// Decodes `path` and loads it into the field. Failures are logged and
    /// leave the field untouched.
    pub fn import(&mut self, path: &Path) {
        let payload = match load_payload(path) {
            Ok(payload) => payload,
            Err(err) => {
                log::error!("Import failed: {:#}", err);
                return;
            }
        };
        if let Err(err) = self.renderer.sim.import(&self.renderer.gfx.gpu, &payload) {
            log::warn!("Import of {} rejected: {}", path.display(), err);
        }
    }

    /// Reads the field back and writes it to the configured export path.
    pub fn export(&mut self) {
        let size = self.renderer.sim.layout().size();
        let result = self
            .renderer
            .sim
            .read_position_rgba8(&self.renderer.gfx.gpu)
            .map_err(anyhow::Error::from)
            .and_then(|bytes| save_bitmap(&self.config.export_path, size, &bytes));
        if let Err(err) = result {
            log::error!("Export failed: {:#}", err);
        }
    }

    pub fn reset(&mut self) {
        self.renderer.sim.seed(&self.renderer.gfx.gpu);
        log::info!("Field reset to the lattice");
    }

    /// Drains input and advances the simulation by the time since the last frame.
    fn update(&mut self) {
        let now = Instant::now();
        let dt = now.duration_since(self.last_frame).as_secs_f32();
        self.last_frame = now;
        if dt > 0.0 {
            self.fps = self.fps * 0.9 + 0.1 / dt;
        }

        self.gestures
            .drain(&mut self.input, &mut self.camera, &mut self.tool);

        let params = self.camera.frame_params(dt, self.tool.brush());
        self.renderer.step(&params);
    }

    fn run_ui(&mut self, window: &Window) -> OverlayFrame {
        let egui_input = self.egui_state.take_egui_input(window);
        self.egui_ctx.begin_frame(egui_input);

        ui::draw_hud(
            &self.egui_ctx,
            &HudStats {
                voxels: self.renderer.sim.layout().voxel_count(),
                distance: self.camera.distance(),
                fps: self.fps,
                sim_format: self.renderer.gfx.gpu.sim_format,
            },
        );
        let action = ui::draw_tool_panel(
            &self.egui_ctx,
            &mut self.tool,
            &mut self.renderer.scene.style,
            &mut self.renderer.scene.vignette,
        );

        let egui_output = self.egui_ctx.end_frame();
        self.egui_state
            .handle_platform_output(window, egui_output.platform_output);

        match action {
            Some(UiAction::Export) => self.export(),
            Some(UiAction::Reset) => self.reset(),
            None => {}
        }

        OverlayFrame {
            shapes: self
                .egui_ctx
                .tessellate(egui_output.shapes, egui_output.pixels_per_point),
            textures: egui_output.textures_delta,
            screen: egui_wgpu::ScreenDescriptor {
                size_in_pixels: [
                    self.renderer.gfx.config.width,
                    self.renderer.gfx.config.height,
                ],
                pixels_per_point: egui_output.pixels_per_point,
            },
        }
    }

    pub fn render(&mut self, window: &Window) -> Result<(), wgpu::SurfaceError> {
        let frame = self.renderer.gfx.surface.get_current_texture()?;
        let swap_view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        self.update();
        let overlay = self.run_ui(window);
        self.renderer.render(&swap_view, &self.camera, &overlay);

        frame.present();
        Ok(())
    }
}
