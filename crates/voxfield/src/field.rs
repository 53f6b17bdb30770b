//! Host-side voxel field stepped with the reference kernel.
//!
//! Used to check GPU output and to exercise the update rules without a device.

use crate::kernel::{integrate, velocity_step, FrameParams};
use crate::layout::GridLayout;
use anyhow::{bail, Result};
use glam::Vec4;
use rayon::prelude::*;

#[derive(Debug, Clone)]
pub struct HostField {
    pub layout: GridLayout,
    pub position: Vec<Vec4>,
    pub velocity: Vec<Vec4>,
    pub desired: Vec<Vec4>,
}

impl HostField {
    /// Field at rest on the lattice: Position and DesiredPosition both seeded,
    /// Velocity zero.
    pub fn seeded(layout: GridLayout) -> Self {
        let rest = layout.rest_field();
        Self {
            layout,
            position: rest.clone(),
            velocity: vec![Vec4::ZERO; rest.len()],
            desired: rest,
        }
    }

    /// One frame: the velocity pass over every texel, then the position pass
    /// reading the updated velocities.
    pub fn step(&mut self, params: &FrameParams) {
        let position = &self.position;
        let desired = &self.desired;
        self.velocity
            .par_iter_mut()
            .enumerate()
            .for_each(|(i, v)| *v = velocity_step(position[i], *v, desired[i], params));

        let velocity = &self.velocity;
        self.position
            .par_iter_mut()
            .zip(velocity.par_iter())
            .for_each(|(p, v)| *p = integrate(*p, *v, params.dt));
    }

    /// Replaces the shape: the payload becomes both current and rest position,
    /// velocities are cleared.
    pub fn import(&mut self, positions: &[Vec4]) -> Result<()> {
        let expected = self.layout.voxel_count() as usize;
        if positions.len() != expected {
            bail!(
                "payload holds {} texels, field needs {}",
                positions.len(),
                expected
            );
        }
        self.position.copy_from_slice(positions);
        self.desired.copy_from_slice(positions);
        self.velocity.fill(Vec4::ZERO);
        Ok(())
    }

    /// Largest per-texel distance from the rest shape.
    pub fn max_displacement(&self) -> f32 {
        self.position
            .iter()
            .zip(&self.desired)
            .map(|(p, d)| p.truncate().distance(d.truncate()))
            .fold(0.0, f32::max)
    }
}
