//! voxfield: GPU-free description of a texel-packed voxel field.
//!
//! A C×C×C voxel cube is stored in an S×S RGBA texture (C³ = S²). Each texel
//! holds one voxel:
//!
//!   Position        : xyz = normalized model coordinates in [0,1]³, w = visibility
//!   Velocity        : xyz = normalized units per second, w unused
//!   DesiredPosition : same encoding as Position (rest target)
//!
//! Instance `i` of the cube batch reads texel `(i mod S, i div S)`. Z-layers of
//! the cube are laid out as C×C tiles, L = S / C tiles per texture row.
//!
//! The `kernel` module is the host reference of the per-texel update that the
//! GPU passes run; `field::HostField` steps a whole field with it.

pub mod field;
pub mod kernel;
pub mod layout;
pub mod payload;

pub use field::HostField;
pub use kernel::{Brush, FrameParams};
pub use layout::{GridLayout, DEFAULT_GRID_SIZE, MAX_GRID_SIZE};
pub use payload::{decode_rgba8, encode_rgba8, ImportPayload};
