use anyhow::{bail, Context, Result};
use std::path::Path;
use voxfield::ImportPayload;

/// Decodes a PNG or BMP into an RGBA8 bitmap payload. Any size is accepted;
/// the importer resamples it onto the grid.
pub fn load_payload(path: &Path) -> Result<ImportPayload> {
    let image = image::open(path)
        .with_context(|| format!("failed to decode {}", path.display()))?
        .to_rgba8();
    let (width, height) = image.dimensions();
    log::info!("Decoded {} ({}x{})", path.display(), width, height);

    Ok(ImportPayload::Bitmap {
        width,
        height,
        rgba8: image.into_raw(),
    })
}

/// Writes an exported S×S RGBA8 field. The extension of `path` picks the format.
pub fn save_bitmap(path: &Path, size: u32, rgba8: &[u8]) -> Result<()> {
    let expected = size as usize * size as usize * 4;
    if rgba8.len() != expected {
        bail!("export holds {} bytes, {}x{} needs {}", rgba8.len(), size, size, expected);
    }
    image::save_buffer(path, rgba8, size, size, image::ExtendedColorType::Rgba8)
        .with_context(|| format!("failed to write {}", path.display()))?;
    log::info!("Exported voxel field to {}", path.display());
    Ok(())
}
