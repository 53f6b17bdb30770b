//! Import payloads and the RGBA8 encoding used for export.
//!
//! RGBA8 channels hold normalized position and visibility: `byte = round(clamp(v, 0, 1) · 255)`.
//! This is what an RGBA8 render target stores when a float field is drawn into it.

use crate::layout::GridLayout;
use anyhow::{bail, Result};
use glam::Vec4;

/// What an importer hands over for the Position texture.
#[derive(Debug, Clone, PartialEq)]
pub enum ImportPayload {
    /// Decoded image, row-major from the top row, 4 bytes per pixel. Any size;
    /// it is resampled (nearest) onto the grid.
    Bitmap {
        width: u32,
        height: u32,
        rgba8: Vec<u8>,
    },
    /// Exactly one float texel per voxel, in texel order.
    Field(Vec<[f32; 4]>),
}

impl ImportPayload {
    pub fn kind(&self) -> &'static str {
        match self {
            ImportPayload::Bitmap { .. } => "bitmap",
            ImportPayload::Field(_) => "field",
        }
    }

    /// Checks the payload is well formed and fits `layout`.
    pub fn validate(&self, layout: &GridLayout) -> Result<()> {
        match self {
            ImportPayload::Bitmap {
                width,
                height,
                rgba8,
            } => {
                if *width == 0 || *height == 0 {
                    bail!("bitmap has zero size ({}x{})", width, height);
                }
                let expected = *width as usize * *height as usize * 4;
                if rgba8.len() != expected {
                    bail!(
                        "bitmap {}x{} needs {} bytes, got {}",
                        width,
                        height,
                        expected,
                        rgba8.len()
                    );
                }
            }
            ImportPayload::Field(texels) => {
                let expected = layout.voxel_count() as usize;
                if texels.len() != expected {
                    bail!(
                        "field payload holds {} texels, grid {}x{} needs {}",
                        texels.len(),
                        layout.size(),
                        layout.size(),
                        expected
                    );
                }
            }
        }
        Ok(())
    }
}

#[inline]
fn unorm8(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Float field → RGBA8 bytes, texel order.
pub fn encode_rgba8(field: &[Vec4]) -> Vec<u8> {
    field
        .iter()
        .flat_map(|t| t.to_array().map(unorm8))
        .collect()
}

/// RGBA8 bytes → float texels. Trailing bytes that do not form a full texel
/// are ignored.
pub fn decode_rgba8(bytes: &[u8]) -> Vec<[f32; 4]> {
    bytes
        .chunks_exact(4)
        .map(|px| [px[0], px[1], px[2], px[3]].map(|b| b as f32 / 255.0))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_clamps_and_rounds() {
        let bytes = encode_rgba8(&[Vec4::new(-0.5, 0.5, 1.5, 1.0)]);
        assert_eq!(bytes, vec![0, 128, 255, 255]);
    }

    #[test]
    fn lattice_survives_rgba8_within_one_step() {
        let layout = GridLayout::default();
        let rest = layout.rest_field();
        let decoded = decode_rgba8(&encode_rgba8(&rest));
        assert_eq!(decoded.len(), rest.len());
        for (a, b) in rest.iter().zip(&decoded) {
            for (x, y) in a.to_array().iter().zip(b) {
                assert!((x - y).abs() <= 0.5 / 255.0 + 1e-6);
            }
        }
    }

    #[test]
    fn validate_rejects_mismatched_payloads() {
        let layout = GridLayout::new(8).unwrap();
        let short = ImportPayload::Bitmap {
            width: 4,
            height: 4,
            rgba8: vec![0; 10],
        };
        assert!(short.validate(&layout).is_err());

        let empty = ImportPayload::Bitmap {
            width: 0,
            height: 4,
            rgba8: vec![],
        };
        assert!(empty.validate(&layout).is_err());

        // Bitmaps of other sizes are resampled, fields are not.
        let other_size = ImportPayload::Bitmap {
            width: 3,
            height: 5,
            rgba8: vec![7; 60],
        };
        assert!(other_size.validate(&layout).is_ok());
        assert!(ImportPayload::Field(vec![[0.0; 4]; 63]).validate(&layout).is_err());
        assert!(ImportPayload::Field(vec![[0.0; 4]; 64]).validate(&layout).is_ok());
    }
}
