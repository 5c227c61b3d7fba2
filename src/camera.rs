use cgmath::{Angle, Deg, InnerSpace, Matrix4, SquareMatrix, Vector3};

pub type Mat4 = Matrix4<f32>;
pub type Vec3 = Vector3<f32>;

/// Direction passed to `Camera::r#move`. Matches `evkCameraDir`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraDirection {
    Forward,
    Backward,
    Left,
    Right,
}

const WORLD_UP: Vec3 = Vector3::new(0.0, 1.0, 0.0);
const PITCH_LIMIT_DEG: f32 = 89.0;
const YAW_PITCH_WRAP_DEG: f32 = 360.0;

/// A first-person fly camera producing a Vulkan-convention view/projection
/// pair (flipped Y, depth range 0..1) and their inverses. See spec §4.9.
#[derive(Debug, Clone)]
pub struct Camera {
    fov_deg: f32,
    near: f32,
    far: f32,
    aspect_ratio: f32,
    movement_speed: f32,
    rotation_speed: f32,
    modifier_speed: f32,

    view: Mat4,
    view_inverse: Mat4,
    perspective: Mat4,
    perspective_inverse: Mat4,

    /// (pitch, yaw, roll) in degrees; roll is unused by the fly camera but
    /// kept so `rotate` can take a full `Vec3` delta as the original does.
    rotation: Vec3,
    position: Vec3,
    scale: Vec3,
    forward: Vec3,

    should_move: bool,
    modifier_pressed: bool,
    moving_forward: bool,
    moving_backward: bool,
    moving_left: bool,
    moving_right: bool,
}

impl Camera {
    pub fn new(aspect_ratio: f32) -> Self {
        let mut camera = Self {
            fov_deg: 45.0,
            near: 0.1,
            far: 256.0,
            aspect_ratio,
            movement_speed: 1.0,
            rotation_speed: 1.0,
            modifier_speed: 2.5,

            view: Mat4::identity(),
            view_inverse: Mat4::identity(),
            perspective: Mat4::identity(),
            perspective_inverse: Mat4::identity(),

            rotation: Vector3::new(0.0, 0.0, 0.0),
            position: Vector3::new(0.0, 1.0, 0.0),
            scale: Vector3::new(1.0, 1.0, 1.0),
            forward: Vector3::new(1.0, 0.0, 0.0),

            should_move: true,
            modifier_pressed: false,
            moving_forward: false,
            moving_backward: false,
            moving_left: false,
            moving_right: false,
        };
        camera.rebuild_perspective();
        camera.rebuild_view();
        camera
    }

    fn rebuild_perspective(&mut self) {
        self.perspective = vulkan_perspective(Deg(self.fov_deg), self.aspect_ratio, self.near, self.far);
        self.perspective_inverse = self
            .perspective
            .invert()
            .unwrap_or_else(Mat4::identity);
    }

    fn rebuild_view(&mut self) {
        let target = self.position + self.forward;
        self.view = vulkan_look_at(self.position, target, WORLD_UP);
    }

    /// Per-tick update (§4.9). No-op unless `should_move` (the lock flag)
    /// is set.
    pub fn update(&mut self, timestep: f32) {
        if !self.should_move {
            return;
        }

        let yaw = Deg(self.rotation.y);
        let pitch = Deg(self.rotation.x);
        self.forward = Vector3::new(
            yaw.cos() * pitch.cos(),
            pitch.sin(),
            yaw.sin() * pitch.cos(),
        )
        .normalize();

        let mut move_speed = timestep * self.movement_speed;
        if self.modifier_pressed {
            move_speed *= self.modifier_speed;
        }

        let right = WORLD_UP.cross(self.forward).normalize();

        if self.moving_forward {
            self.position += self.forward * move_speed;
        }
        if self.moving_backward {
            self.position -= self.forward * move_speed;
        }
        if self.moving_left {
            self.position -= right * move_speed;
        }
        if self.moving_right {
            self.position += right * move_speed;
        }

        self.rebuild_view();
        self.view_inverse = self.view.invert().unwrap_or_else(Mat4::identity);
    }

    /// Scales the incoming delta by `rotationSpeed * 0.5`, adds it, clamps
    /// pitch to [-89, 89], then wraps yaw/pitch at +-360 back to 0, then
    /// rebuilds the view. The clamp must run *before* the wrap: a clamped
    /// pitch is always within (-360, 360), so the wrap can never zero it
    /// out from under the clamp. This ordering is what makes a single
    /// oversized delta (spec §8 scenario 6: `rotate({1000, 0, 0})` once
    /// from pitch=0 must land exactly on 89) land on the bound instead of
    /// wrapping straight past it to 0.
    pub fn rotate(&mut self, delta: Vec3) {
        let scaled = delta * (self.rotation_speed * 0.5);
        self.rotation += scaled;

        if self.rotation.x >= PITCH_LIMIT_DEG {
            self.rotation.x = PITCH_LIMIT_DEG;
        }
        if self.rotation.x <= -PITCH_LIMIT_DEG {
            self.rotation.x = -PITCH_LIMIT_DEG;
        }

        if self.rotation.x >= YAW_PITCH_WRAP_DEG {
            self.rotation.x = 0.0;
        }
        if self.rotation.x <= -YAW_PITCH_WRAP_DEG {
            self.rotation.x = 0.0;
        }
        if self.rotation.y >= YAW_PITCH_WRAP_DEG {
            self.rotation.y = 0.0;
        }
        if self.rotation.y <= -YAW_PITCH_WRAP_DEG {
            self.rotation.y = 0.0;
        }

        self.rebuild_view();
    }

    pub fn translate(&mut self, delta: Vec3) {
        self.position += delta;
        self.rebuild_view();
    }

    pub fn set_aspect_ratio(&mut self, aspect: f32) {
        self.aspect_ratio = aspect;
        self.rebuild_perspective();
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.aspect_ratio
    }

    pub fn fov(&self) -> f32 {
        self.fov_deg
    }

    pub fn set_lock(&mut self, moving: bool) {
        self.should_move = moving;
    }

    pub fn locked(&self) -> bool {
        !self.should_move
    }

    pub fn r#move(&mut self, dir: CameraDirection, moving: bool) {
        match dir {
            CameraDirection::Forward => self.moving_forward = moving,
            CameraDirection::Backward => self.moving_backward = moving,
            CameraDirection::Left => self.moving_left = moving,
            CameraDirection::Right => self.moving_right = moving,
        }
    }

    pub fn set_speed_modifier(&mut self, pressed: bool, speed: f32) {
        self.modifier_pressed = pressed;
        self.modifier_speed = speed;
    }

    pub fn speed_modifier(&self) -> (bool, f32) {
        (self.modifier_pressed, self.modifier_speed)
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn forward(&self) -> Vec3 {
        self.forward
    }

    pub fn scale(&self) -> Vec3 {
        self.scale
    }

    pub fn view(&self) -> Mat4 {
        self.view
    }

    pub fn view_inverse(&self) -> Mat4 {
        self.view_inverse
    }

    pub fn perspective(&self) -> Mat4 {
        self.perspective
    }

    pub fn perspective_inverse(&self) -> Mat4 {
        self.perspective_inverse
    }
}

/// `lookAt` using the Vulkan convention (same handedness cgmath's
/// `look_at_rh` gives; the Y-flip lives in the projection, not here).
fn vulkan_look_at(eye: Vec3, center: Vec3, up: Vec3) -> Mat4 {
    Mat4::look_at_rh(
        cgmath::Point3::from_vec(eye),
        cgmath::Point3::from_vec(center),
        up,
    )
}

/// Perspective projection with Vulkan's flipped-Y / 0..1 depth convention.
fn vulkan_perspective(fovy: Deg<f32>, aspect: f32, near: f32, far: f32) -> Mat4 {
    let proj = cgmath::perspective(fovy, aspect, near, far);
    let clip_fixup = Mat4::new(
        1.0, 0.0, 0.0, 0.0,
        0.0, -1.0, 0.0, 0.0,
        0.0, 0.0, 0.5, 0.0,
        0.0, 0.0, 0.5, 1.0,
    );
    clip_fixup * proj
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pitch_clamps_to_89_degrees() {
        let mut camera = Camera::new(16.0 / 9.0);
        camera.rotate(Vector3::new(1000.0, 0.0, 0.0));
        assert_eq!(camera.rotation.x, PITCH_LIMIT_DEG);
    }

    #[test]
    fn pitch_clamps_negative() {
        let mut camera = Camera::new(16.0 / 9.0);
        camera.rotate(Vector3::new(-1000.0, 0.0, 0.0));
        assert_eq!(camera.rotation.x, -PITCH_LIMIT_DEG);
    }

    #[test]
    fn repeated_rotation_stays_in_range() {
        let mut camera = Camera::new(1.0);
        for _ in 0..50 {
            camera.rotate(Vector3::new(17.0, 33.0, 0.0));
            assert!(camera.rotation.x <= PITCH_LIMIT_DEG);
            assert!(camera.rotation.x >= -PITCH_LIMIT_DEG);
        }
    }

    #[test]
    fn set_aspect_ratio_updates_perspective_and_inverse() {
        let mut camera = Camera::new(1.0);
        let before = camera.perspective();
        camera.set_aspect_ratio(16.0 / 9.0);
        assert_ne!(before, camera.perspective());
        assert_eq!(camera.aspect_ratio(), 16.0 / 9.0);
        let round_trip = camera.perspective() * camera.perspective_inverse();
        for i in 0..4 {
            for j in 0..4 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert!((round_trip[i][j] - expected).abs() < 1e-3);
            }
        }
    }

    #[test]
    fn locked_camera_does_not_move() {
        let mut camera = Camera::new(1.0);
        camera.set_lock(false);
        assert!(camera.locked());
        camera.r#move(CameraDirection::Forward, true);
        let before = camera.position();
        camera.update(1.0);
        assert_eq!(before, camera.position());
    }

    #[test]
    fn forward_movement_advances_position() {
        let mut camera = Camera::new(1.0);
        camera.set_lock(true);
        camera.r#move(CameraDirection::Forward, true);
        let before = camera.position();
        camera.update(1.0 / 60.0);
        assert_ne!(before, camera.position());
    }
}
