//! Textures and the render targets that wrap them.
//!
//! Shaders read textures with `textureLoad` at integer texel coordinates, so
//! there are no samplers: lookups are nearest and out-of-range coordinates are
//! clamped in the shader.

use super::context::Gpu;
use crate::error::GfxError;

pub const SCENE_COLOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
pub const SCENE_DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// A 2D image with fixed dimensions and format.
pub struct GpuTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub width: u32,
    pub height: u32,
    pub format: wgpu::TextureFormat,
}

impl GpuTexture {
    pub fn new(
        device: &wgpu::Device,
        label: &str,
        width: u32,
        height: u32,
        format: wgpu::TextureFormat,
        usage: wgpu::TextureUsages,
    ) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        Self {
            texture,
            view,
            width,
            height,
            format,
        }
    }

    /// Bytes per texel, for uploads and readbacks.
    #[inline]
    pub fn texel_size(&self) -> u32 {
        self.format.block_copy_size(None).unwrap_or(4)
    }

    #[inline]
    pub fn extent(&self) -> wgpu::Extent3d {
        wgpu::Extent3d {
            width: self.width,
            height: self.height,
            depth_or_array_layers: 1,
        }
    }

    /// Replaces the whole texture with tightly packed rows of `bytes`.
    pub fn upload(&self, queue: &wgpu::Queue, bytes: &[u8]) {
        queue.write_texture(
            self.texture.as_image_copy(),
            bytes,
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(self.width * self.texel_size()),
                rows_per_image: Some(self.height),
            },
            self.extent(),
        );
    }

    /// Copies the texture back to the host and strips row padding.
    /// Blocks until the device has finished all submitted work.
    pub fn read_texels(&self, gpu: &Gpu) -> Result<Vec<u8>, GfxError> {
        let unpadded = self.width * self.texel_size();
        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let padded = unpadded.div_ceil(align) * align;

        let buffer = gpu.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Readback Buffer"),
            size: padded as u64 * self.height as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Readback Encoder"),
            });
        encoder.copy_texture_to_buffer(
            self.texture.as_image_copy(),
            wgpu::ImageCopyBuffer {
                buffer: &buffer,
                layout: wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(padded),
                    rows_per_image: Some(self.height),
                },
            },
            self.extent(),
        );
        gpu.queue.submit(std::iter::once(encoder.finish()));

        let slice = buffer.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        gpu.device.poll(wgpu::Maintain::Wait);
        rx.recv().map_err(|_| GfxError::ReadbackAborted)??;

        let mut out = Vec::with_capacity((unpadded * self.height) as usize);
        {
            let mapped = slice.get_mapped_range();
            for row in mapped.chunks_exact(padded as usize) {
                out.extend_from_slice(&row[..unpadded as usize]);
            }
        }
        buffer.unmap();

        Ok(out)
    }
}

/// Color attachment plus an optional depth attachment.
///
/// Materials never hold on to a target's views; bind groups are built from
/// the current view at draw time, so a resized target is picked up by every
/// material that draws from it.
pub struct RenderTarget {
    label: String,
    color: GpuTexture,
    depth: Option<GpuTexture>,
}

impl RenderTarget {
    pub fn new(
        device: &wgpu::Device,
        label: &str,
        width: u32,
        height: u32,
        color_format: wgpu::TextureFormat,
        depth_format: Option<wgpu::TextureFormat>,
    ) -> Result<Self, GfxError> {
        let max = device.limits().max_texture_dimension_2d;
        if width == 0 || height == 0 || width > max || height > max {
            return Err(GfxError::ResizeFailure { width, height });
        }

        let color = GpuTexture::new(
            device,
            &format!("{label} Color"),
            width,
            height,
            color_format,
            wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC
                | wgpu::TextureUsages::COPY_DST,
        );
        let depth = depth_format.map(|format| {
            GpuTexture::new(
                device,
                &format!("{label} Depth"),
                width,
                height,
                format,
                wgpu::TextureUsages::RENDER_ATTACHMENT,
            )
        });

        Ok(Self {
            label: label.to_owned(),
            color,
            depth,
        })
    }

    /// Rebuilds the attachments at the new size. On error the previous
    /// attachments are kept.
    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) -> Result<(), GfxError> {
        if (width, height) == self.size() {
            return Ok(());
        }
        let depth_format = self.depth.as_ref().map(|d| d.format);
        *self = Self::new(
            device,
            &self.label,
            width,
            height,
            self.color.format,
            depth_format,
        )?;
        Ok(())
    }

    #[inline]
    pub fn color(&self) -> &GpuTexture {
        &self.color
    }

    #[inline]
    pub fn depth(&self) -> Option<&GpuTexture> {
        self.depth.as_ref()
    }

    #[inline]
    pub fn size(&self) -> (u32, u32) {
        (self.color.width, self.color.height)
    }

    pub fn pass_target(&self) -> PassTarget<'_> {
        PassTarget {
            color: &self.color.view,
            depth: self.depth.as_ref().map(|d| &d.view),
        }
    }
}

/// Where a pass draws: a render target or the swap chain image.
#[derive(Clone, Copy)]
pub struct PassTarget<'a> {
    pub color: &'a wgpu::TextureView,
    pub depth: Option<&'a wgpu::TextureView>,
}

impl<'a> PassTarget<'a> {
    pub fn surface(view: &'a wgpu::TextureView) -> Self {
        Self {
            color: view,
            depth: None,
        }
    }

    /// Begins a pass. `clear = None` keeps the existing contents.
    pub fn begin<'p>(
        &self,
        encoder: &'p mut wgpu::CommandEncoder,
        label: &str,
        clear: Option<wgpu::Color>,
    ) -> wgpu::RenderPass<'p>
    where
        'a: 'p,
    {
        let load = match clear {
            Some(color) => wgpu::LoadOp::Clear(color),
            None => wgpu::LoadOp::Load,
        };
        let depth_load = match clear {
            Some(_) => wgpu::LoadOp::Clear(1.0),
            None => wgpu::LoadOp::Load,
        };

        encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(label),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: self.color,
                resolve_target: None,
                ops: wgpu::Operations {
                    load,
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: self.depth.map(|view| {
                wgpu::RenderPassDepthStencilAttachment {
                    view,
                    depth_ops: Some(wgpu::Operations {
                        load: depth_load,
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        })
    }
}
