//! Per-texel update rules. `velocity.wgsl` and `position.wgsl` implement the
//! same arithmetic on the GPU; keep the two in step.

use glam::{Mat4, Vec2, Vec3, Vec3Swizzles, Vec4, Vec4Swizzles};

/// Spring constant pulling each voxel toward its desired position (1/s²).
pub const STIFFNESS: f32 = 40.0;

/// Velocity multiplier applied once per frame, independent of dt.
pub const DAMPING: f32 = 0.9;

/// Strength of the brush attraction (1/s²).
pub const PULL: f32 = 6.0;

/// Upper bound for a single frame's delta time, in seconds.
pub const MAX_DELTA_TIME: f32 = 1.0 / 20.0;

/// Brush as seen by the update pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Brush {
    /// Screen position in [0,1]², y up.
    pub plane: Vec2,
    /// Radius in the same units (x scaled by aspect).
    pub radius: f32,
    pub active: bool,
}

impl Brush {
    pub const INACTIVE: Brush = Brush {
        plane: Vec2::splat(0.5),
        radius: 0.0,
        active: false,
    };
}

impl Default for Brush {
    fn default() -> Self {
        Self::INACTIVE
    }
}

/// Everything a frame's update needs besides the textures themselves.
#[derive(Debug, Clone, Copy)]
pub struct FrameParams {
    /// Already clamped by `FrameParams::new`: a stalled frame advances by at
    /// most `MAX_DELTA_TIME`, so `p + v·dt` holds for the clamped value.
    pub dt: f32,
    /// Normalized voxel coordinates → clip space.
    pub voxel_to_clip: Mat4,
    /// Inverse of `voxel_to_clip`.
    pub clip_to_voxel: Mat4,
    /// Surface width / height.
    pub aspect: f32,
    pub brush: Brush,
}

impl FrameParams {
    pub fn new(dt: f32, voxel_to_clip: Mat4, aspect: f32, brush: Brush) -> Self {
        Self {
            dt: clamp_delta_time(dt),
            voxel_to_clip,
            clip_to_voxel: voxel_to_clip.inverse(),
            aspect,
            brush,
        }
    }
}

/// Clamps a frame delta into `[0, MAX_DELTA_TIME]`; NaN becomes 0.
#[inline]
pub fn clamp_delta_time(dt: f32) -> f32 {
    if dt.is_nan() {
        0.0
    } else {
        dt.clamp(0.0, MAX_DELTA_TIME)
    }
}

/// Screen-plane position ([0,1]², y up) and NDC depth of a voxel.
/// `None` when the voxel is behind the camera.
pub fn project(p: Vec3, voxel_to_clip: &Mat4) -> Option<(Vec2, f32)> {
    let clip = *voxel_to_clip * p.extend(1.0);
    if clip.w <= 0.0 {
        return None;
    }
    let ndc = clip.xyz() / clip.w;
    Some((ndc.xy() * 0.5 + 0.5, ndc.z))
}

/// Aspect-corrected screen distance between a voxel and the brush centre.
pub fn brush_distance(plane: Vec2, brush: &Brush, aspect: f32) -> f32 {
    let mut d = plane - brush.plane;
    d.x *= aspect;
    d.length()
}

/// Brush acceleration acting on a voxel at `p`.
///
/// The target is the point under the brush at the voxel's own depth, so the
/// voxel is drawn sideways toward the brush ray. Falloff is linear from the
/// centre to the rim.
pub fn brush_accel(p: Vec3, params: &FrameParams) -> Vec3 {
    let brush = &params.brush;
    if !brush.active || brush.radius <= 0.0 {
        return Vec3::ZERO;
    }
    let Some((plane, depth)) = project(p, &params.voxel_to_clip) else {
        return Vec3::ZERO;
    };

    let dist = brush_distance(plane, brush, params.aspect);
    if dist >= brush.radius {
        return Vec3::ZERO;
    }
    let falloff = 1.0 - dist / brush.radius;

    let target_ndc = (brush.plane * 2.0 - 1.0).extend(depth).extend(1.0);
    let t = params.clip_to_voxel * target_ndc;
    let target = t.xyz() / t.w;

    (target - p) * (PULL * falloff)
}

/// Velocity pass: spring toward `desired`, plus the brush, damped per frame.
pub fn velocity_step(p: Vec4, v: Vec4, desired: Vec4, params: &FrameParams) -> Vec4 {
    let dt = params.dt.max(0.0);
    let accel = (desired.xyz() - p.xyz()) * STIFFNESS + brush_accel(p.xyz(), params);
    ((v.xyz() + accel * dt) * DAMPING).extend(0.0)
}

/// Position pass: semi-implicit Euler with the already-updated velocity.
/// Visibility is carried through.
#[inline]
pub fn integrate(p: Vec4, v: Vec4, dt: f32) -> Vec4 {
    (p.xyz() + v.xyz() * dt).extend(p.w)
}
