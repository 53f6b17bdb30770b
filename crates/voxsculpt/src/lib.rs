//! Interactive voxel sculpting on the GPU.
//!
//! A cube of voxels lives in three float textures (position, velocity,
//! rest position). Each frame a velocity pass and a position pass update
//! every texel; the cubes are then drawn instanced straight from the position
//! texture and composed onto the window.

pub mod app;
pub mod camera;
pub mod config;
pub mod data;
pub mod error;
pub mod input;
pub mod renderer;
pub mod ui;
