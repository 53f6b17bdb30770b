//! Errors raised by the graphics layer.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GfxError {
    #[error("failed to find a suitable GPU adapter")]
    NoAdapter,

    /// No 4-channel float or half-float format can be both rendered to and
    /// sampled. Fatal: the simulation cannot hold positions without one.
    #[error("device and driver need floating point or half floating point render targets (tried {tried:?})")]
    CapabilityMissing { tried: Vec<wgpu::TextureFormat> },

    #[error("the window surface is not supported by the chosen adapter")]
    SurfaceIncompatible,

    #[error("failed to create surface: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),

    #[error("failed to request device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),

    #[error("shader `{label}` failed to compile: {message}")]
    ShaderCompile { label: String, message: String },

    #[error("invalid render target size {width}x{height}")]
    ResizeFailure { width: u32, height: u32 },

    #[error("payload rejected: {0}")]
    Payload(String),

    #[error("GPU readback failed: {0}")]
    Readback(#[from] wgpu::BufferAsyncError),

    #[error("GPU readback was dropped before completing")]
    ReadbackAborted,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn surface_and_payload_errors_name_the_problem() {
        let surface = GfxError::SurfaceIncompatible.to_string();
        assert!(surface.contains("surface"), "{}", surface);

        let payload = GfxError::Payload("bitmap 8193x1 exceeds the device texture limit of 8192".into());
        assert!(payload.to_string().starts_with("payload rejected: bitmap 8193x1"));
    }
}
