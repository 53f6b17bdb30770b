//! Image assets going in and out of the voxel field.

pub mod assets;

pub use self::assets::{load_payload, save_bitmap};
