use super::camera_utils::{convert_matrix4_to_array, Camera, CameraUniform};
use cgmath::*;

#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: cgmath::Matrix4<f32> = cgmath::Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.5,
    0.0, 0.0, 0.0, 1.0,
);

/// Y-up camera orbiting a target point.
///
/// `yaw_offset` and `pitch_offset` are added on top of the user-controlled
/// angles; the soft hand pointer drives them without fighting mouse input.
#[derive(Debug, Clone, Copy)]
pub struct OrbitCamera {
    pub distance: f32,
    pub pitch: f32,
    pub yaw: f32,
    pub yaw_offset: f32,
    pub pitch_offset: f32,
    pub eye: Vector3<f32>,
    pub target: Vector3<f32>,
    pub up: Vector3<f32>,
    pub bounds: OrbitCameraBounds,
    pub aspect: f32,
    pub fovy: Rad<f32>,
    pub znear: f32,
    pub zfar: f32,
    pub uniform: CameraUniform,
}

impl Camera for OrbitCamera {
    fn build_view_projection_matrix(&self) -> Matrix4<f32> {
        let eye = Point3::from_vec(self.eye);
        let target = Point3::from_vec(self.target);
        let view = Matrix4::look_at_rh(eye, target, self.up);
        let proj =
            OPENGL_TO_WGPU_MATRIX * perspective(self.fovy, self.aspect, self.znear, self.zfar);
        proj * view
    }
}

impl OrbitCamera {
    pub const DEFAULT_DISTANCE: f32 = 35.0;
    pub const DEFAULT_PITCH: f32 = 0.06;
    pub const DEFAULT_YAW: f32 = 0.0;

    pub fn new(distance: f32, pitch: f32, yaw: f32, target: Vector3<f32>, aspect: f32) -> Self {
        let mut camera = Self {
            distance,
            pitch,
            yaw,
            yaw_offset: 0.0,
            pitch_offset: 0.0,
            eye: Vector3::zero(), // Recomputed by `update()` below.
            target,
            up: Vector3::unit_y(),
            bounds: OrbitCameraBounds::default(),
            aspect,
            fovy: cgmath::Rad(std::f32::consts::PI / 4.0),
            znear: 0.1,
            zfar: 500.0,
            uniform: CameraUniform::default(),
        };
        camera.update();
        camera
    }

    /// Front view of the whole tree.
    pub fn framing_tree(aspect: f32) -> Self {
        Self::new(
            Self::DEFAULT_DISTANCE,
            Self::DEFAULT_PITCH,
            Self::DEFAULT_YAW,
            Vector3::new(0.0, 0.5, 0.0),
            aspect,
        )
    }

    pub fn reset_to_default(&mut self) {
        self.distance = Self::DEFAULT_DISTANCE;
        self.pitch = Self::DEFAULT_PITCH;
        self.yaw = Self::DEFAULT_YAW;
        self.update();
    }

    pub fn set_distance(&mut self, distance: f32) {
        self.distance = distance.clamp(
            self.bounds.min_distance.unwrap_or(f32::EPSILON),
            self.bounds.max_distance.unwrap_or(f32::MAX),
        );
        self.update();
    }

    pub fn add_distance(&mut self, delta: f32) {
        let corrected_zoom = f32::log10(self.distance) * delta;
        self.set_distance(self.distance + corrected_zoom);
    }

    pub fn set_pitch(&mut self, pitch: f32) {
        self.pitch = pitch.clamp(self.bounds.min_pitch, self.bounds.max_pitch);
        self.update();
    }

    pub fn add_pitch(&mut self, delta: f32) {
        self.set_pitch(self.pitch + delta);
    }

    pub fn set_yaw(&mut self, yaw: f32) {
        let mut bounded_yaw = yaw;
        if let Some(min_yaw) = self.bounds.min_yaw {
            bounded_yaw = bounded_yaw.clamp(min_yaw, f32::MAX);
        }
        if let Some(max_yaw) = self.bounds.max_yaw {
            bounded_yaw = bounded_yaw.clamp(f32::MIN, max_yaw);
        }
        self.yaw = bounded_yaw;
        self.update();
    }

    pub fn add_yaw(&mut self, delta: f32) {
        self.set_yaw(self.yaw + delta);
    }

    /// Sets the pointer-driven angular offsets.
    pub fn set_offset(&mut self, yaw_offset: f32, pitch_offset: f32) {
        self.yaw_offset = yaw_offset;
        self.pitch_offset = pitch_offset;
        self.update();
    }

    /// Recomputes `eye` after changing `distance`, `pitch`, `yaw` or an offset.
    fn update(&mut self) {
        let pitch = (self.pitch + self.pitch_offset).clamp(self.bounds.min_pitch, self.bounds.max_pitch);
        self.eye = calculate_cartesian_eye_position(
            pitch,
            self.yaw + self.yaw_offset,
            self.distance,
            self.target,
        );
    }

    pub fn resize_projection(&mut self, width: u32, height: u32) {
        self.aspect = width as f32 / height.max(1) as f32;
    }

    pub fn update_view_proj(&mut self) {
        self.uniform.view_position = [self.eye.x, self.eye.y, self.eye.z, 1.0];
        self.uniform.view_proj = convert_matrix4_to_array(self.build_view_projection_matrix());
    }
}

#[derive(Debug, Clone, Copy)]
pub struct OrbitCameraBounds {
    pub min_distance: Option<f32>,
    pub max_distance: Option<f32>,
    pub min_pitch: f32,
    pub max_pitch: f32,
    pub min_yaw: Option<f32>,
    pub max_yaw: Option<f32>,
}

impl Default for OrbitCameraBounds {
    fn default() -> Self {
        Self {
            min_distance: Some(10.0),
            max_distance: Some(60.0),
            min_pitch: -std::f32::consts::PI / 2.0 + 0.01,
            max_pitch: std::f32::consts::PI / 2.0 - 0.01,
            min_yaw: None,
            max_yaw: None,
        }
    }
}

fn calculate_cartesian_eye_position(
    pitch: f32,
    yaw: f32,
    distance: f32,
    target: Vector3<f32>,
) -> Vector3<f32> {
    Vector3::new(
        distance * yaw.sin() * pitch.cos(),
        distance * pitch.sin(),
        distance * yaw.cos() * pitch.cos(),
    ) + target
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_view_looks_down_negative_z() {
        let camera = OrbitCamera::new(20.0, 0.0, 0.0, Vector3::zero(), 1.0);
        assert!((camera.eye - Vector3::new(0.0, 0.0, 20.0)).magnitude() < 1e-5);
    }

    #[test]
    fn test_distance_is_bounded() {
        let mut camera = OrbitCamera::framing_tree(1.5);
        camera.set_distance(1000.0);
        assert_eq!(camera.distance, 60.0);
        camera.set_distance(0.0);
        assert_eq!(camera.distance, 10.0);
    }

    #[test]
    fn test_offset_moves_eye_but_not_yaw() {
        let mut camera = OrbitCamera::framing_tree(1.5);
        let before = camera.eye;
        camera.set_offset(0.3, 0.0);
        assert_eq!(camera.yaw, OrbitCamera::DEFAULT_YAW);
        assert!((camera.eye - before).magnitude() > 1.0);
        assert!(((camera.eye - camera.target).magnitude() - camera.distance).abs() < 1e-3);
    }

    #[test]
    fn test_pitch_offset_cannot_flip_over_pole() {
        let mut camera = OrbitCamera::framing_tree(1.0);
        camera.set_pitch(1.5);
        camera.set_offset(0.0, 1.0);
        assert!(camera.eye.y - camera.target.y < camera.distance);
    }
}
