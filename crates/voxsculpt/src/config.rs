use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use voxfield::GridLayout;

/// `voxsculpt` - pull a cube of voxels into shape.
///
/// Drag to spin the model, right-drag or scroll to zoom. In sculpt mode a
/// left drag pulls the voxels under the brush toward the pointer.
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
pub struct Config {
    /// Edge of the square simulation texture, in texels.
    ///
    /// Each texel holds one voxel, so the cube has grid-size² voxels. The
    /// value must be a perfect cube (8, 27, 64, 125, ...).
    #[arg(long, env = "VOXSCULPT_GRID_SIZE", default_value_t = voxfield::DEFAULT_GRID_SIZE)]
    pub grid_size: u32,

    /// Brush radius as a fraction of the window height.
    #[arg(long, env = "VOXSCULPT_BRUSH_RADIUS", default_value_t = crate::input::DEFAULT_BRUSH_RADIUS)]
    pub brush_radius: f32,

    /// PNG or BMP image to load into the Position texture at startup.
    #[arg(long, env = "VOXSCULPT_IMPORT")]
    pub import: Option<PathBuf>,

    /// Where the export key writes the voxel field. The extension picks the
    /// image format.
    #[arg(long, env = "VOXSCULPT_EXPORT_PATH", default_value = "voxsculpt.bmp")]
    pub export_path: PathBuf,

    /// Start with wireframe cubes.
    #[arg(long)]
    pub wireframe: bool,

    /// Start in sculpt mode.
    #[arg(long)]
    pub sculpt: bool,
}

impl Config {
    pub fn layout(&self) -> Result<GridLayout> {
        GridLayout::new(self.grid_size).context("invalid --grid-size")
    }
}
