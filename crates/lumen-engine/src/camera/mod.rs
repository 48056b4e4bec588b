//! First-person camera for the 3D scenes.

use glam::{Mat4, Vec3};

use crate::input::{InputFrame, InputState, Key, MouseButton};

/// First-person camera.
///
/// `rotation` holds Euler angles in degrees. The view matrix is built as
/// `Rx * Ry * Rz * T(position)`, so `position` is the negated eye position.
#[derive(Debug, Clone)]
pub struct Camera {
    pub rotation: Vec3,
    pub position: Vec3,

    pub fov_deg: f32,
    pub znear: f32,
    pub zfar: f32,
    pub aspect: f32,

    /// Units per second for WASD movement.
    pub movement_speed: f32,
    /// Degrees per pixel of pointer drag.
    pub rotation_speed: f32,

    view: Mat4,
    perspective: Mat4,
}

impl Default for Camera {
    fn default() -> Self {
        let mut c = Self {
            rotation: Vec3::ZERO,
            position: Vec3::ZERO,
            fov_deg: 60.0,
            znear: 0.1,
            zfar: 256.0,
            aspect: 1.0,
            movement_speed: 1.0,
            rotation_speed: 1.0,
            view: Mat4::IDENTITY,
            perspective: Mat4::IDENTITY,
        };
        c.update_view();
        c.update_perspective();
        c
    }
}

impl Camera {
    pub fn set_perspective(&mut self, fov_deg: f32, aspect: f32, znear: f32, zfar: f32) {
        self.fov_deg = fov_deg;
        self.aspect = aspect;
        self.znear = znear;
        self.zfar = zfar;
        self.update_perspective();
    }

    pub fn set_aspect_ratio(&mut self, aspect: f32) {
        self.aspect = aspect.max(f32::EPSILON);
        self.update_perspective();
    }

    pub fn set_rotation(&mut self, rotation: Vec3) {
        self.rotation = rotation;
        self.update_view();
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
        self.update_view();
    }

    pub fn rotate(&mut self, delta: Vec3) {
        self.rotation += delta;
        self.update_view();
    }

    pub fn translate(&mut self, delta: Vec3) {
        self.position += delta;
        self.update_view();
    }

    pub fn view(&self) -> Mat4 {
        self.view
    }

    pub fn perspective(&self) -> Mat4 {
        self.perspective
    }

    /// Eye position in world space.
    pub fn eye(&self) -> Vec3 {
        -self.position
    }

    /// Unit vector the camera looks along, derived from pitch (x) and yaw (y).
    pub fn front(&self) -> Vec3 {
        let pitch = self.rotation.x.to_radians();
        let yaw = self.rotation.y.to_radians();
        Vec3::new(
            -pitch.cos() * yaw.sin(),
            pitch.sin(),
            pitch.cos() * yaw.cos(),
        )
        .normalize()
    }

    /// Applies WASD movement and left-drag rotation.
    ///
    /// Returns `true` when the view matrix changed.
    pub fn update(&mut self, dt: f32, input: &InputState, frame: &InputFrame) -> bool {
        let mut changed = false;

        let front = self.front();
        let right = front.cross(Vec3::Y).normalize_or_zero();
        let step = self.movement_speed * dt;

        let mut delta = Vec3::ZERO;
        if input.key_down(Key::W) {
            delta += front * step;
        }
        if input.key_down(Key::S) {
            delta -= front * step;
        }
        if input.key_down(Key::A) {
            delta -= right * step;
        }
        if input.key_down(Key::D) {
            delta += right * step;
        }
        if delta != Vec3::ZERO {
            self.position += delta;
            changed = true;
        }

        let (dx, dy) = frame.pointer_delta;
        if input.button_down(MouseButton::Left) && (dx != 0.0 || dy != 0.0) {
            self.rotation += Vec3::new(dy * self.rotation_speed, -dx * self.rotation_speed, 0.0);
            changed = true;
        }

        if changed {
            self.update_view();
        }
        changed
    }

    fn update_view(&mut self) {
        let r = self.rotation;
        let rot = Mat4::from_rotation_x(r.x.to_radians())
            * Mat4::from_rotation_y(r.y.to_radians())
            * Mat4::from_rotation_z(r.z.to_radians());
        self.view = rot * Mat4::from_translation(self.position);
    }

    fn update_perspective(&mut self) {
        self.perspective =
            Mat4::perspective_rh(self.fov_deg.to_radians(), self.aspect, self.znear, self.zfar);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{ButtonState, InputEvent};
    use glam::Vec4;

    #[test]
    fn view_is_translation_without_rotation() {
        let mut cam = Camera::default();
        cam.set_position(Vec3::new(0.0, 0.0, -5.0));
        let p = cam.view() * Vec4::new(0.0, 0.0, 0.0, 1.0);
        assert!((p.z + 5.0).abs() < 1e-5);
        assert_eq!(cam.eye(), Vec3::new(0.0, 0.0, 5.0));
    }

    #[test]
    fn perspective_maps_near_plane_to_zero_depth() {
        let mut cam = Camera::default();
        cam.set_perspective(60.0, 16.0 / 9.0, 0.1, 256.0);
        let clip = cam.perspective() * Vec4::new(0.0, 0.0, -0.1, 1.0);
        assert!((clip.z / clip.w).abs() < 1e-4);
        let clip = cam.perspective() * Vec4::new(0.0, 0.0, -256.0, 1.0);
        assert!((clip.z / clip.w - 1.0).abs() < 1e-4);
    }

    #[test]
    fn update_without_input_keeps_view() {
        let mut cam = Camera::default();
        let before = cam.view();
        let changed = cam.update(0.016, &InputState::default(), &InputFrame::default());
        assert!(!changed);
        assert_eq!(cam.view(), before);
    }

    #[test]
    fn holding_w_moves_along_front() {
        let mut cam = Camera::default();
        cam.movement_speed = 2.0;
        let mut state = InputState::default();
        let mut frame = InputFrame::default();
        state.apply_event(
            &mut frame,
            InputEvent::Key { key: Key::W, state: ButtonState::Pressed, repeat: false },
        );

        let front = cam.front();
        assert!(cam.update(0.5, &state, &frame));
        assert!((cam.position - front).length() < 1e-5);
    }

    #[test]
    fn left_drag_rotates() {
        let mut cam = Camera::default();
        cam.rotation_speed = 0.5;
        let mut state = InputState::default();
        let mut frame = InputFrame::default();
        state.apply_event(
            &mut frame,
            InputEvent::PointerButton { button: MouseButton::Left, state: ButtonState::Pressed },
        );
        frame.pointer_delta = (4.0, 2.0);

        assert!(cam.update(0.016, &state, &frame));
        assert_eq!(cam.rotation, Vec3::new(1.0, -2.0, 0.0));
    }

    #[test]
    fn rotate_and_translate_accumulate() {
        let mut cam = Camera::default();
        cam.translate(Vec3::new(0.0, 0.0, -2.0));
        cam.translate(Vec3::new(0.0, 0.0, -3.0));
        assert_eq!(cam.eye(), Vec3::new(0.0, 0.0, 5.0));

        cam.rotate(Vec3::new(0.0, 90.0, 0.0));
        cam.rotate(Vec3::new(0.0, 90.0, 0.0));
        assert_eq!(cam.rotation.y, 180.0);
        // Half a turn about y leaves the origin behind the camera.
        let p = cam.view() * Vec4::new(0.0, 0.0, 0.0, 1.0);
        assert!((p.z - 5.0).abs() < 1e-4);
    }
}
