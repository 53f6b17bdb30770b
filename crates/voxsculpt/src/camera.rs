use glam::{Mat4, Quat, Vec3};
use voxfield::{Brush, FrameParams};

/// Vertical field of view, degrees.
pub const FOV_Y_DEG: f32 = 45.0;
pub const Z_NEAR: f32 = 1.0;
pub const Z_FAR: f32 = 500.0;

/// Allowed camera distance from the model, world units.
pub const MIN_DISTANCE: f32 = 10.0;
pub const MAX_DISTANCE: f32 = 250.0;

/// Radians of model rotation per unit of drag (one full window width).
pub const ROTATE_SENSITIVITY: f32 = 30.0;

/// Edge length of the voxel cube in world units.
pub const MODEL_EXTENT: f32 = 64.0;

const DEFAULT_CAMERA_POSITION: Vec3 = Vec3::new(0.0, 0.0, -150.0);
const DEFAULT_MODEL_ROTATION: [f32; 4] = [-0.876, 0.151, 0.266, 0.373];

/// Camera and model transforms.
///
/// The view matrix is built straight from the camera rotation and position,
/// so the camera sits at `-z` distance in front of the model. Dragging spins
/// the model, not the camera.
#[derive(Debug, Clone)]
pub struct CameraRig {
    pub camera_position: Vec3,
    pub camera_rotation: Quat,
    pub model_position: Vec3,
    model_rotation: Quat,

    forward: Vec3,
    right: Vec3,
    up: Vec3,

    aspect: f32,
    proj: Mat4,
}

impl CameraRig {
    pub fn new(width: u32, height: u32) -> Self {
        let mut rig = Self {
            camera_position: DEFAULT_CAMERA_POSITION,
            camera_rotation: Quat::IDENTITY,
            model_position: Vec3::ZERO,
            model_rotation: Quat::from_array(DEFAULT_MODEL_ROTATION).normalize(),
            forward: Vec3::NEG_Z,
            right: Vec3::X,
            up: Vec3::Y,
            aspect: 1.0,
            proj: Mat4::IDENTITY,
        };
        rig.resize(width, height);
        rig.update_basis();
        rig
    }

    /// Recomputes the projection. Zero sizes are ignored.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.aspect = width as f32 / height as f32;
        self.proj = Mat4::perspective_rh(FOV_Y_DEG.to_radians(), self.aspect, Z_NEAR, Z_FAR);
    }

    /// Moves the camera along the view axis; positive deltas move closer.
    pub fn zoom(&mut self, delta: f32) {
        if !delta.is_finite() {
            return;
        }
        self.camera_position.z = (self.camera_position.z + delta).clamp(-MAX_DISTANCE, -MIN_DISTANCE);
    }

    /// Spins the model: yaw by `dx`, then pitch by `dy`, both scaled by
    /// `ROTATE_SENSITIVITY`.
    pub fn rotate(&mut self, dx: f32, dy: f32) {
        let yaw = Quat::from_rotation_y(dx * ROTATE_SENSITIVITY);
        let pitch = Quat::from_rotation_x(dy * ROTATE_SENSITIVITY);
        self.model_rotation = (pitch * (yaw * self.model_rotation)).normalize();
        self.update_basis();
    }

    /// Re-derives forward/right/up from the model rotation and normalizes them.
    fn update_basis(&mut self) {
        self.forward = (self.model_rotation * Vec3::NEG_Z).normalize();
        // Forward parallel to up: keep the previous right, made orthogonal.
        self.right = self.forward.cross(self.up).try_normalize().unwrap_or_else(|| {
            (self.right - self.forward * self.right.dot(self.forward)).normalize()
        });
        self.up = self.right.cross(self.forward).normalize();
    }

    #[inline]
    pub fn distance(&self) -> f32 {
        -self.camera_position.z
    }

    #[inline]
    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    #[inline]
    pub fn model_rotation(&self) -> Quat {
        self.model_rotation
    }

    /// Forward, right and up.
    #[inline]
    pub fn basis(&self) -> (Vec3, Vec3, Vec3) {
        (self.forward, self.right, self.up)
    }

    #[inline]
    pub fn projection(&self) -> Mat4 {
        self.proj
    }

    pub fn view(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.camera_rotation, self.camera_position)
    }

    pub fn model(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.model_rotation, self.model_position)
    }

    /// Normalized voxel coordinates ([0,1]³) → model space, cube centred on
    /// the origin.
    pub fn voxel_to_model() -> Mat4 {
        Mat4::from_scale(Vec3::splat(MODEL_EXTENT)) * Mat4::from_translation(Vec3::splat(-0.5))
    }

    pub fn view_proj(&self) -> Mat4 {
        self.proj * self.view()
    }

    /// Normalized voxel coordinates → clip space. Drives both the voxel draw
    /// and the brush test.
    pub fn voxel_to_clip(&self) -> Mat4 {
        self.view_proj() * self.model() * Self::voxel_to_model()
    }

    pub fn frame_params(&self, dt: f32, brush: Brush) -> FrameParams {
        FrameParams::new(dt, self.voxel_to_clip(), self.aspect, brush)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use voxfield::kernel::project;

    #[test]
    fn zoom_stays_in_range() {
        let mut rig = CameraRig::new(800, 600);
        assert_eq!(rig.distance(), 150.0);

        for _ in 0..100 {
            rig.zoom(1_000.0);
            assert!((MIN_DISTANCE..=MAX_DISTANCE).contains(&rig.distance()));
        }
        assert_eq!(rig.distance(), MIN_DISTANCE);

        for _ in 0..100 {
            rig.zoom(-1_000.0);
        }
        assert_eq!(rig.distance(), MAX_DISTANCE);

        rig.zoom(f32::NAN);
        assert_eq!(rig.distance(), MAX_DISTANCE);
    }

    #[test]
    fn zero_zoom_is_a_no_op() {
        let mut rig = CameraRig::new(800, 600);
        rig.zoom(-37.5);
        let before = rig.camera_position;
        for _ in 0..1_000 {
            rig.zoom(0.0);
        }
        assert_eq!(rig.camera_position, before);
    }

    #[test]
    fn basis_stays_orthonormal() {
        let mut rig = CameraRig::new(1280, 720);
        for i in 0..10_000 {
            let s = if i % 7 == 0 { -1.0 } else { 1.0 };
            rig.rotate(0.0013 * s, -0.0007);
        }

        let (f, r, u) = rig.basis();
        const EPS: f32 = 1e-4;
        for v in [f, r, u] {
            assert!((v.length() - 1.0).abs() < EPS, "length {}", v.length());
        }
        assert!(f.dot(r).abs() < EPS);
        assert!(f.dot(u).abs() < EPS);
        assert!(r.dot(u).abs() < EPS);
        assert!((rig.model_rotation().length() - 1.0).abs() < EPS);
    }

    #[test]
    fn cube_centre_is_on_screen_centre() {
        let rig = CameraRig::new(1024, 768);
        let (plane, depth) = project(Vec3::splat(0.5), &rig.voxel_to_clip()).unwrap();
        assert!((plane.x - 0.5).abs() < 1e-5 && (plane.y - 0.5).abs() < 1e-5);
        assert!(depth > 0.0 && depth < 1.0);
    }

    #[test]
    fn resize_ignores_zero() {
        let mut rig = CameraRig::new(1000, 500);
        let proj = rig.projection();
        rig.resize(0, 300);
        assert_eq!(rig.projection(), proj);
        assert_eq!(rig.aspect(), 2.0);
        rig.resize(300, 300);
        assert_eq!(rig.aspect(), 1.0);
        assert_ne!(rig.projection(), proj);
    }
}
