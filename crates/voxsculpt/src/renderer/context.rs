use crate::error::GfxError;
use std::sync::Arc;
use winit::window::Window;

/// Simulation texel formats in order of preference.
pub const SIM_FORMAT_CANDIDATES: [wgpu::TextureFormat; 2] = [
    wgpu::TextureFormat::Rgba32Float,
    wgpu::TextureFormat::Rgba16Float,
];

/// Device, queue and the simulation format the adapter agreed to.
pub struct Gpu {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub sim_format: wgpu::TextureFormat,
}

impl Gpu {
    /// Creates a device without a surface, for tests and offline tools.
    pub async fn headless() -> Result<Self, GfxError> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor::default());
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok_or(GfxError::NoAdapter)?;
        Self::from_adapter(&adapter).await
    }

    /// Negotiates the simulation format, then requests the device.
    pub async fn from_adapter(adapter: &wgpu::Adapter) -> Result<Self, GfxError> {
        let sim_format = negotiate_sim_format(adapter)?;

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                },
                None,
            )
            .await?;

        let info = adapter.get_info();
        log::info!(
            "Using {} ({:?}), simulation format {:?}",
            info.name,
            info.backend,
            sim_format
        );

        Ok(Self {
            device,
            queue,
            sim_format,
        })
    }
}

/// Picks the first candidate format the adapter can both render to and sample.
pub fn negotiate_sim_format(adapter: &wgpu::Adapter) -> Result<wgpu::TextureFormat, GfxError> {
    let required =
        wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING;

    SIM_FORMAT_CANDIDATES
        .iter()
        .copied()
        .find(|fmt| {
            adapter
                .get_texture_format_features(*fmt)
                .allowed_usages
                .contains(required)
        })
        .ok_or_else(|| GfxError::CapabilityMissing {
            tried: SIM_FORMAT_CANDIDATES.to_vec(),
        })
}

/// Holds all GPU resources needed for presenting to a window.
pub struct GfxContext {
    pub surface: wgpu::Surface<'static>,
    pub gpu: Gpu,
    pub config: wgpu::SurfaceConfiguration,
    pub size: winit::dpi::PhysicalSize<u32>,
}

impl GfxContext {
    /// Creates a new graphics context bound to the given window.
    pub async fn new(window: Arc<Window>) -> Result<Self, GfxError> {
        let size = window.inner_size();
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor::default());

        // The surface must outlive the window; `Arc` guarantees this.
        let surface = instance.create_surface(window.clone())?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(GfxError::NoAdapter)?;

        let gpu = Gpu::from_adapter(&adapter).await?;

        // Prefer an sRGB surface.
        let caps = surface.get_capabilities(&adapter);
        let surface_format = caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| caps.formats.first().copied())
            .ok_or(GfxError::SurfaceIncompatible)?;
        let alpha_mode = caps
            .alpha_modes
            .first()
            .copied()
            .ok_or(GfxError::SurfaceIncompatible)?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&gpu.device, &config);

        Ok(Self {
            surface,
            gpu,
            config,
            size,
        })
    }

    /// Reconfigures the swap chain. Zero-sized requests are ignored.
    pub fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.size = new_size;
            self.config.width = new_size.width;
            self.config.height = new_size.height;
            self.surface.configure(&self.gpu.device, &self.config);
        }
    }

    #[inline]
    pub fn aspect(&self) -> f32 {
        self.config.width as f32 / self.config.height.max(1) as f32
    }
}
