//! Packing of the voxel cube into simulation texels.

use anyhow::{bail, Result};
use glam::{UVec2, UVec3, Vec4};

/// Texture edge used when nothing else is configured (4096 voxels, 16³).
pub const DEFAULT_GRID_SIZE: u32 = 64;

/// Largest texture edge accepted (16.7M voxels, 256³).
pub const MAX_GRID_SIZE: u32 = 4096;

/// Geometry of an S×S simulation texture holding a C×C×C voxel cube.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridLayout {
    size: u32,
    cube: u32,
    layers_per_row: u32,
}

impl GridLayout {
    /// Builds the layout for a texture edge `size`.
    ///
    /// `size²` must be a perfect cube, which holds exactly when `size` itself
    /// is a perfect cube k³ (then C = k², L = k).
    pub fn new(size: u32) -> Result<Self> {
        if size == 0 {
            bail!("grid size must be non-zero");
        }
        if size > MAX_GRID_SIZE {
            bail!("grid size {} exceeds the maximum of {}", size, MAX_GRID_SIZE);
        }

        let k = (1..=size).find(|k| k * k * k >= size).unwrap_or(size);
        if k * k * k != size {
            bail!(
                "grid size {} cannot hold a voxel cube: it must be a perfect cube (8, 27, 64, 125, ...)",
                size
            );
        }

        Ok(Self {
            size,
            cube: k * k,
            layers_per_row: k,
        })
    }

    /// Texture edge S.
    #[inline]
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Cube edge C, in voxels.
    #[inline]
    pub fn cube_size(&self) -> u32 {
        self.cube
    }

    /// Number of z-layer tiles per texture row.
    #[inline]
    pub fn layers_per_row(&self) -> u32 {
        self.layers_per_row
    }

    /// S², which is also C³.
    #[inline]
    pub fn voxel_count(&self) -> u32 {
        self.size * self.size
    }

    /// Instance index → texel coordinate.
    #[inline]
    pub fn texel_of(&self, index: u32) -> UVec2 {
        debug_assert!(index < self.voxel_count());
        UVec2::new(index % self.size, index / self.size)
    }

    /// Texel coordinate → instance index.
    #[inline]
    pub fn index_of(&self, texel: UVec2) -> u32 {
        debug_assert!(texel.x < self.size && texel.y < self.size);
        texel.y * self.size + texel.x
    }

    /// Lattice cell (x, y, layer) a texel stores at rest.
    pub fn lattice_cell(&self, texel: UVec2) -> UVec3 {
        let tile = texel / self.cube;
        UVec3::new(
            texel.x % self.cube,
            texel.y % self.cube,
            tile.y * self.layers_per_row + tile.x,
        )
    }

    /// Rest position of instance `index`: the normalized centre of its
    /// lattice cell, fully visible.
    pub fn rest_position(&self, index: u32) -> Vec4 {
        let cell = self.lattice_cell(self.texel_of(index)).as_vec3();
        ((cell + 0.5) / self.cube as f32).extend(1.0)
    }

    /// Rest positions for every texel, in texel order.
    pub fn rest_field(&self) -> Vec<Vec4> {
        (0..self.voxel_count()).map(|i| self.rest_position(i)).collect()
    }
}

impl Default for GridLayout {
    fn default() -> Self {
        Self {
            size: DEFAULT_GRID_SIZE,
            cube: 16,
            layers_per_row: 4,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn default_matches_sixty_four() {
        assert_eq!(GridLayout::new(64).unwrap(), GridLayout::default());
        let layout = GridLayout::default();
        assert_eq!(layout.cube_size(), 16);
        assert_eq!(layout.layers_per_row(), 4);
        assert_eq!(layout.voxel_count(), 4096);
    }

    #[test]
    fn accepts_perfect_cubes_only() {
        for size in [8, 27, 64, 125, 512, 4096] {
            let layout = GridLayout::new(size).unwrap();
            let c = layout.cube_size() as u64;
            assert_eq!(c * c * c, (size as u64) * (size as u64));
        }
        for size in [0, 1 << 13, 16, 32, 100, 128, 256] {
            assert!(GridLayout::new(size).is_err(), "size {} accepted", size);
        }
    }

    #[test]
    fn texel_mapping_known_points() {
        let layout = GridLayout::default();
        assert_eq!(layout.texel_of(0), UVec2::new(0, 0));
        assert_eq!(layout.texel_of(65), UVec2::new(1, 1));
        assert_eq!(layout.texel_of(4095), UVec2::new(63, 63));
    }

    #[test]
    fn texel_mapping_is_bijective() {
        let layout = GridLayout::default();
        let mut seen = HashSet::new();
        for i in 0..layout.voxel_count() {
            let texel = layout.texel_of(i);
            assert!(texel.x < 64 && texel.y < 64);
            assert!(seen.insert(texel), "texel {:?} hit twice", texel);
            assert_eq!(layout.index_of(texel), i);
        }
        assert_eq!(seen.len(), 4096);
    }

    #[test]
    fn lattice_covers_cube_once() {
        let layout = GridLayout::new(27).unwrap();
        let mut cells = HashSet::new();
        for i in 0..layout.voxel_count() {
            let cell = layout.lattice_cell(layout.texel_of(i));
            assert!(cell.max_element() < layout.cube_size());
            assert!(cells.insert(cell));
        }
        assert_eq!(cells.len() as u32, layout.voxel_count());
    }

    #[test]
    fn rest_positions_are_cell_centres() {
        let layout = GridLayout::default();
        // texel (17, 33): tile (1, 2) → layer 9, in-tile (1, 1)
        let p = layout.rest_position(layout.index_of(UVec2::new(17, 33)));
        assert_eq!(p, Vec4::new(1.5 / 16.0, 1.5 / 16.0, 9.5 / 16.0, 1.0));

        for p in layout.rest_field() {
            assert!(p.x > 0.0 && p.x < 1.0);
            assert!(p.z > 0.0 && p.z < 1.0);
            assert_eq!(p.w, 1.0);
        }
    }
}
