//! First-person camera.

use bytemuck::{Pod, Zeroable};
use engine_core::Transform;
use glam::{Mat4, Quat, Vec3};

/// Mouse look: a quarter degree of rotation per pixel of motion.
pub const LOOK_SENSITIVITY: f32 = 0.25 * (std::f32::consts::PI / 180.0);

/// FPS camera with configurable FOV and clipping planes.
///
/// Orientation is yaw about +Y followed by pitch about the local X axis;
/// the camera never rolls.
#[derive(Debug, Clone)]
pub struct Camera {
    /// Camera transform (position and rotation).
    pub transform: Transform,
    /// Field of view in degrees.
    pub fov_degrees: f32,
    /// Near clipping plane.
    pub near: f32,
    /// Far clipping plane.
    pub far: f32,
    /// Aspect ratio (width / height).
    pub aspect: f32,
    /// Radians of rotation per pixel of mouse motion.
    pub sensitivity: f32,
    /// Current pitch (up/down rotation) in radians.
    pitch: f32,
    /// Current yaw (left/right rotation) in radians.
    yaw: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            transform: Transform::default(),
            fov_degrees: 75.0,
            near: 0.1,
            far: 1000.0,
            aspect: 16.0 / 9.0,
            sensitivity: LOOK_SENSITIVITY,
            pitch: 0.0,
            yaw: 0.0,
        }
    }
}

impl Camera {
    /// Create a new camera at the given position.
    pub fn new(position: Vec3) -> Self {
        Self {
            transform: Transform::from_position(position),
            ..Default::default()
        }
    }

    /// Update aspect ratio (call on window resize).
    pub fn set_aspect(&mut self, width: u32, height: u32) {
        self.aspect = width as f32 / height.max(1) as f32;
    }

    /// Rotate by a mouse delta in pixels. Moving right turns right, moving
    /// down looks down.
    pub fn look(&mut self, delta_x: f32, delta_y: f32) {
        self.set_yaw_pitch(
            self.yaw - delta_x * self.sensitivity,
            self.pitch - delta_y * self.sensitivity,
        );
    }

    /// Set yaw and pitch directly (in radians) and rebuild rotation.
    pub fn set_yaw_pitch(&mut self, yaw: f32, pitch: f32) {
        self.yaw = yaw;
        let max_pitch = std::f32::consts::FRAC_PI_2;
        self.pitch = pitch.clamp(-max_pitch, max_pitch);
        self.transform.rotation = Quat::from_rotation_y(self.yaw) * Quat::from_rotation_x(self.pitch);
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.transform.position = position;
    }

    pub fn position(&self) -> Vec3 {
        self.transform.position
    }

    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    pub fn forward(&self) -> Vec3 {
        self.transform.forward()
    }

    pub fn right(&self) -> Vec3 {
        self.transform.right()
    }

    /// Forward direction projected onto the ground plane.
    pub fn flat_forward(&self) -> Vec3 {
        Vec3::new(-self.yaw.sin(), 0.0, -self.yaw.cos())
    }

    /// Right direction projected onto the ground plane.
    pub fn flat_right(&self) -> Vec3 {
        Vec3::new(self.yaw.cos(), 0.0, -self.yaw.sin())
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.transform.rotation, self.transform.position).inverse()
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_degrees.to_radians(), self.aspect, self.near, self.far)
    }

    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }
}

/// Per-frame uniform for the mesh shader (must match `Frame` in mesh.wgsl).
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct FrameUniform {
    pub view_proj: [[f32; 4]; 4],
    /// Unit vector toward the directional light (w unused).
    pub light_dir: [f32; 4],
    /// Light color premultiplied by intensity (w unused).
    pub light_color: [f32; 4],
    pub ambient: [f32; 4],
}

impl FrameUniform {
    pub fn new(camera: &Camera, lighting: &crate::Lighting) -> Self {
        let dir = lighting.light_direction();
        Self {
            view_proj: camera.view_projection_matrix().to_cols_array_2d(),
            light_dir: [dir.x, dir.y, dir.z, 0.0],
            light_color: lighting.light_radiance(),
            ambient: lighting.ambient_radiance(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-5
    }

    #[test]
    fn defaults_match_first_person_view() {
        let camera = Camera::default();
        assert_eq!(camera.fov_degrees, 75.0);
        assert_eq!(camera.near, 0.1);
        assert_eq!(camera.far, 1000.0);
        assert!(approx(camera.forward(), Vec3::NEG_Z));
    }

    #[test]
    fn look_applies_quarter_degree_per_pixel() {
        let mut camera = Camera::default();
        camera.look(4.0, 0.0);
        assert!((camera.yaw() + 1.0_f32.to_radians()).abs() < 1e-6);
        // Turning right moves forward toward +X.
        assert!(camera.forward().x > 0.0);
    }

    #[test]
    fn pitch_clamps_at_vertical() {
        let mut camera = Camera::default();
        camera.look(0.0, -1.0e5);
        assert_eq!(camera.pitch(), std::f32::consts::FRAC_PI_2);
        camera.look(0.0, 1.0e5);
        assert_eq!(camera.pitch(), -std::f32::consts::FRAC_PI_2);
    }

    #[test]
    fn flat_axes_ignore_pitch() {
        let mut camera = Camera::default();
        camera.set_yaw_pitch(0.7, 1.2);
        let forward = camera.forward();
        let flat = Vec3::new(forward.x, 0.0, forward.z).normalize();
        assert!(approx(camera.flat_forward(), flat));
        assert!(approx(camera.flat_right(), camera.right()));
        assert!(camera.flat_forward().dot(camera.flat_right()).abs() < 1e-6);
    }

    #[test]
    fn view_matrix_moves_eye_to_origin() {
        let mut camera = Camera::new(Vec3::new(3.0, 2.0, -1.0));
        camera.set_yaw_pitch(1.0, -0.3);
        let eye = camera.view_matrix().transform_point3(camera.position());
        assert!(approx(eye, Vec3::ZERO));
        let ahead = camera.view_matrix().transform_point3(camera.position() + camera.forward());
        assert!(approx(ahead, Vec3::NEG_Z));
    }
}
