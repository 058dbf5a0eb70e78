//! Perspective camera with orbit controls.
//!
//! The camera always looks at a target (the origin for this scene) and its
//! position is kept in spherical coordinates so the controller can rotate and
//! dolly it without accumulating drift. Controller input is damped: pointer
//! deltas are stored and bled into the camera over the following frames.

use std::collections::HashMap;

use cgmath::{InnerSpace, Matrix4, Point3, Rad, Vector3, perspective};
use winit::{
    dpi::PhysicalPosition,
    event::{ElementState, MouseButton, MouseScrollDelta, Touch, TouchPhase, WindowEvent},
};

#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

/// Keeps the polar angle away from the poles where `look_at` degenerates.
const POLAR_EPSILON: f32 = 1e-6;

/// Pixel-delta wheel events are converted to "lines" with this many pixels per line.
const PIXELS_PER_LINE: f64 = 100.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OrbitCamera {
    pub target: Point3<f32>,
    pub radius: f32,
    /// Polar angle from +Y.
    pub phi: f32,
    /// Azimuth around +Y, measured from +Z.
    pub theta: f32,
}

impl OrbitCamera {
    /// A camera on the +Z axis at `distance`, looking at the origin.
    pub fn new(distance: f32) -> Self {
        Self {
            target: Point3::new(0.0, 0.0, 0.0),
            radius: distance,
            phi: std::f32::consts::FRAC_PI_2,
            theta: 0.0,
        }
    }

    pub fn position(&self) -> Point3<f32> {
        let sin_phi = self.phi.sin();
        self.target
            + Vector3::new(
                self.radius * sin_phi * self.theta.sin(),
                self.radius * self.phi.cos(),
                self.radius * sin_phi * self.theta.cos(),
            )
    }

    pub fn calc_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(self.position(), self.target, Vector3::unit_y())
    }

    /// Camera-space right and up axes in world coordinates.
    pub fn basis(&self) -> (Vector3<f32>, Vector3<f32>) {
        let forward = (self.target - self.position()).normalize();
        let right = forward.cross(Vector3::unit_y()).normalize();
        let up = right.cross(forward);
        (right, up)
    }
}

#[derive(Clone, Copy, Debug)]
pub struct Projection {
    aspect: f32,
    fovy: Rad<f32>,
    znear: f32,
    zfar: f32,
}

impl Projection {
    pub fn new<F: Into<Rad<f32>>>(width: u32, height: u32, fovy: F, znear: f32, zfar: f32) -> Self {
        Self {
            aspect: width as f32 / height.max(1) as f32,
            fovy: fovy.into(),
            znear,
            zfar,
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.aspect = width as f32 / height.max(1) as f32;
    }

    pub fn set_fovy<F: Into<Rad<f32>>>(&mut self, fovy: F) {
        self.fovy = fovy.into();
    }

    pub fn set_clip(&mut self, znear: f32, zfar: f32) {
        self.znear = znear;
        self.zfar = zfar;
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn calc_matrix(&self) -> Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX * perspective(self.fovy, self.aspect, self.znear, self.zfar)
    }
}

/// Pointer-driven orbit controls: drag to rotate, wheel or pinch to dolly. No panning.
#[derive(Debug)]
pub struct OrbitController {
    pub damping_factor: f32,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    delta_theta: f32,
    delta_phi: f32,
    scale: f32,
    viewport_height: f32,
    rotating: bool,
    cursor: Option<PhysicalPosition<f64>>,
    touches: HashMap<u64, PhysicalPosition<f64>>,
    pinch_distance: Option<f64>,
}

impl OrbitController {
    pub fn new(damping_factor: f32, min_distance: f32, max_distance: f32) -> Self {
        Self {
            damping_factor,
            rotate_speed: 1.0,
            zoom_speed: 1.0,
            min_distance,
            max_distance,
            delta_theta: 0.0,
            delta_phi: 0.0,
            scale: 1.0,
            viewport_height: 1.0,
            rotating: false,
            cursor: None,
            touches: HashMap::new(),
            pinch_distance: None,
        }
    }

    pub fn set_viewport_height(&mut self, height: u32) {
        self.viewport_height = height.max(1) as f32;
    }

    /// Queue a rotation for a pointer movement of `dx`/`dy` physical pixels.
    pub fn rotate(&mut self, dx: f64, dy: f64) {
        let per_pixel = std::f32::consts::TAU / self.viewport_height * self.rotate_speed;
        self.delta_theta -= dx as f32 * per_pixel;
        self.delta_phi -= dy as f32 * per_pixel;
    }

    /// Positive steps move the camera closer.
    pub fn dolly(&mut self, steps: f32) {
        let zoom = 0.95_f32.powf(self.zoom_speed * steps.abs());
        if steps > 0.0 {
            self.scale *= zoom;
        } else if steps < 0.0 {
            self.scale /= zoom;
        }
    }

    /// Scale the distance directly, e.g. by a pinch ratio (< 1 zooms in).
    pub fn dolly_by(&mut self, factor: f32) {
        if factor.is_finite() && factor > 0.0 {
            self.scale *= factor;
        }
    }

    pub fn handle_window_events(&mut self, event: &WindowEvent) -> bool {
        match event {
            WindowEvent::Resized(size) => {
                self.set_viewport_height(size.height);
                false
            }
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => {
                self.rotating = *state == ElementState::Pressed;
                true
            }
            WindowEvent::CursorMoved { position, .. } => {
                let previous = self.cursor.replace(*position);
                match previous {
                    Some(previous) if self.rotating => {
                        self.rotate(position.x - previous.x, position.y - previous.y);
                        true
                    }
                    _ => false,
                }
            }
            WindowEvent::CursorLeft { .. } => {
                self.cursor = None;
                self.rotating = false;
                false
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let steps = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(p) => (p.y / PIXELS_PER_LINE) as f32,
                };
                self.dolly(steps);
                true
            }
            WindowEvent::Touch(touch) => {
                self.handle_touch(touch);
                true
            }
            _ => false,
        }
    }

    fn handle_touch(&mut self, touch: &Touch) {
        match touch.phase {
            TouchPhase::Started => {
                self.touches.insert(touch.id, touch.location);
                self.pinch_distance = self.current_pinch();
            }
            TouchPhase::Moved => {
                let previous = self.touches.insert(touch.id, touch.location);
                match self.touches.len() {
                    1 => {
                        if let Some(previous) = previous {
                            self.rotate(
                                touch.location.x - previous.x,
                                touch.location.y - previous.y,
                            );
                        }
                    }
                    2 => {
                        let current = self.current_pinch();
                        if let (Some(before), Some(now)) = (self.pinch_distance, current) {
                            if now > 0.0 {
                                self.dolly_by((before / now) as f32);
                            }
                        }
                        self.pinch_distance = current;
                    }
                    _ => (),
                }
            }
            TouchPhase::Ended | TouchPhase::Cancelled => {
                self.touches.remove(&touch.id);
                self.pinch_distance = self.current_pinch();
            }
        }
    }

    fn current_pinch(&self) -> Option<f64> {
        if self.touches.len() != 2 {
            return None;
        }
        let mut points = self.touches.values();
        let a = points.next()?;
        let b = points.next()?;
        Some(((a.x - b.x).powi(2) + (a.y - b.y).powi(2)).sqrt())
    }

    /// Apply one frame of damped motion to `camera`.
    pub fn update(&mut self, camera: &mut OrbitCamera) {
        camera.theta += self.delta_theta * self.damping_factor;
        camera.phi += self.delta_phi * self.damping_factor;
        camera.phi = camera
            .phi
            .clamp(POLAR_EPSILON, std::f32::consts::PI - POLAR_EPSILON);
        camera.radius = (camera.radius * self.scale).clamp(self.min_distance, self.max_distance);

        let decay = 1.0 - self.damping_factor;
        self.delta_theta *= decay;
        self.delta_phi *= decay;
        self.scale = 1.0;
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    view_position: [f32; 4],
    view_proj: [[f32; 4]; 4],
    right: [f32; 4],
    up: [f32; 4],
}

impl CameraUniform {
    pub fn new() -> Self {
        use cgmath::SquareMatrix;
        Self {
            view_position: [0.0; 4],
            view_proj: Matrix4::identity().into(),
            right: [1.0, 0.0, 0.0, 0.0],
            up: [0.0, 1.0, 0.0, 0.0],
        }
    }

    pub fn update_view_proj(&mut self, camera: &OrbitCamera, projection: &Projection) {
        self.view_position = camera.position().to_homogeneous().into();
        self.view_proj = (projection.calc_matrix() * camera.calc_matrix()).into();
        let (right, up) = camera.basis();
        self.right = right.extend(0.0).into();
        self.up = up.extend(0.0).into();
    }
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
pub struct CameraResources {
    pub camera: OrbitCamera,
    pub controller: OrbitController,
    pub uniform: CameraUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{EuclideanSpace, MetricSpace};

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn starts_on_positive_z() {
        let camera = OrbitCamera::new(8.0);
        let p = camera.position();
        assert!(approx(p.x, 0.0) && approx(p.y, 0.0) && approx(p.z, 8.0), "{p:?}");
        let (right, up) = camera.basis();
        assert!(approx(right.x, 1.0), "{right:?}");
        assert!(approx(up.y, 1.0), "{up:?}");
    }

    #[test]
    fn damping_bleeds_rotation_over_frames() {
        let mut camera = OrbitCamera::new(8.0);
        let mut controller = OrbitController::new(0.05, 5.0, 20.0);
        controller.set_viewport_height(100);
        controller.rotate(-10.0, 0.0);

        let total = std::f32::consts::TAU * 10.0 / 100.0;
        controller.update(&mut camera);
        assert!(approx(camera.theta, total * 0.05), "{}", camera.theta);

        for _ in 0..2000 {
            controller.update(&mut camera);
        }
        assert!(approx(camera.theta, total), "{} vs {}", camera.theta, total);
        assert!(approx(camera.radius, 8.0));
    }

    #[test]
    fn polar_angle_never_reaches_the_poles() {
        let mut camera = OrbitCamera::new(8.0);
        let mut controller = OrbitController::new(1.0, 5.0, 20.0);
        controller.set_viewport_height(10);
        controller.rotate(0.0, 1000.0);
        controller.update(&mut camera);
        assert!(camera.phi > 0.0);
        assert!(camera.position().y.is_finite());
    }

    #[test]
    fn dolly_is_clamped_to_distance_limits() {
        let mut camera = OrbitCamera::new(8.0);
        let mut controller = OrbitController::new(0.05, 5.0, 20.0);

        controller.dolly(1.0);
        controller.update(&mut camera);
        assert!(approx(camera.radius, 8.0 * 0.95));

        controller.dolly(200.0);
        controller.update(&mut camera);
        assert!(approx(camera.radius, 5.0));

        controller.dolly(-200.0);
        controller.update(&mut camera);
        assert!(approx(camera.radius, 20.0));
        assert!(approx(camera.position().distance(Point3::origin()), 20.0));
    }

    #[test]
    fn rotation_keeps_distance_to_target() {
        let mut camera = OrbitCamera::new(10.0);
        camera.theta = 1.2;
        camera.phi = 0.7;
        assert!(approx(camera.position().distance(camera.target), 10.0));
    }

    mod input {
        use super::*;
        use winit::event::{DeviceId, Touch};

        fn controller() -> OrbitController {
            // undamped so a single update applies the whole gesture
            let mut controller = OrbitController::new(1.0, 1.0, 20.0);
            controller.set_viewport_height(100);
            controller
        }

        fn cursor(x: f64, y: f64) -> WindowEvent {
            WindowEvent::CursorMoved {
                device_id: DeviceId::dummy(),
                position: PhysicalPosition::new(x, y),
            }
        }

        fn left(state: ElementState) -> WindowEvent {
            WindowEvent::MouseInput {
                device_id: DeviceId::dummy(),
                state,
                button: MouseButton::Left,
            }
        }

        fn wheel(delta: MouseScrollDelta) -> WindowEvent {
            WindowEvent::MouseWheel {
                device_id: DeviceId::dummy(),
                delta,
                phase: TouchPhase::Moved,
            }
        }

        fn touch(id: u64, phase: TouchPhase, x: f64, y: f64) -> WindowEvent {
            WindowEvent::Touch(Touch {
                device_id: DeviceId::dummy(),
                phase,
                location: PhysicalPosition::new(x, y),
                force: None,
                id,
            })
        }

        fn feed(controller: &mut OrbitController, camera: &mut OrbitCamera, events: &[WindowEvent]) {
            for event in events {
                controller.handle_window_events(event);
            }
            controller.update(camera);
        }

        #[test]
        fn left_drag_orbits_around_y() {
            let mut camera = OrbitCamera::new(8.0);
            let mut controller = controller();
            feed(
                &mut controller,
                &mut camera,
                &[cursor(10.0, 10.0), left(ElementState::Pressed), cursor(20.0, 10.0)],
            );
            assert!(approx(camera.theta, -std::f32::consts::TAU / 10.0), "{}", camera.theta);
            assert!(approx(camera.phi, std::f32::consts::FRAC_PI_2));

            // moving with the button released does nothing
            feed(
                &mut controller,
                &mut camera,
                &[left(ElementState::Released), cursor(60.0, 40.0)],
            );
            assert!(approx(camera.theta, -std::f32::consts::TAU / 10.0));
        }

        #[test]
        fn leaving_the_window_ends_the_drag() {
            let mut camera = OrbitCamera::new(8.0);
            let mut controller = controller();
            let left_window = WindowEvent::CursorLeft {
                device_id: DeviceId::dummy(),
            };
            feed(
                &mut controller,
                &mut camera,
                &[
                    left(ElementState::Pressed),
                    cursor(10.0, 10.0),
                    left_window,
                    cursor(50.0, 10.0),
                    cursor(90.0, 10.0),
                ],
            );
            assert_eq!(camera.theta, 0.0);
        }

        #[test]
        fn wheel_lines_and_pixels_dolly() {
            let mut camera = OrbitCamera::new(8.0);
            let mut controller = controller();
            feed(
                &mut controller,
                &mut camera,
                &[wheel(MouseScrollDelta::LineDelta(0.0, 1.0))],
            );
            assert!(approx(camera.radius, 8.0 * 0.95), "{}", camera.radius);

            feed(
                &mut controller,
                &mut camera,
                &[wheel(MouseScrollDelta::PixelDelta(PhysicalPosition::new(0.0, -100.0)))],
            );
            assert!(approx(camera.radius, 8.0), "{}", camera.radius);
        }

        #[test]
        fn one_finger_rotates() {
            let mut camera = OrbitCamera::new(8.0);
            let mut controller = controller();
            feed(
                &mut controller,
                &mut camera,
                &[
                    touch(1, TouchPhase::Started, 0.0, 0.0),
                    touch(1, TouchPhase::Moved, 0.0, 20.0),
                    touch(1, TouchPhase::Ended, 0.0, 20.0),
                ],
            );
            let expected = std::f32::consts::FRAC_PI_2 - std::f32::consts::TAU * 0.2;
            assert!(approx(camera.phi, expected), "{}", camera.phi);
            assert_eq!(camera.theta, 0.0);
        }

        #[test]
        fn two_finger_pinch_dollies_without_rotating() {
            let mut camera = OrbitCamera::new(8.0);
            let mut controller = controller();
            feed(
                &mut controller,
                &mut camera,
                &[
                    touch(1, TouchPhase::Started, 0.0, 0.0),
                    touch(2, TouchPhase::Started, 100.0, 0.0),
                    // fingers spread to twice the distance
                    touch(2, TouchPhase::Moved, 200.0, 0.0),
                ],
            );
            assert!(approx(camera.radius, 4.0), "{}", camera.radius);
            assert_eq!(camera.theta, 0.0);
            assert!(approx(camera.phi, std::f32::consts::FRAC_PI_2));

            // pinching back in moves away again
            feed(
                &mut controller,
                &mut camera,
                &[touch(2, TouchPhase::Moved, 50.0, 0.0)],
            );
            assert!(approx(camera.radius, 16.0), "{}", camera.radius);
        }
    }

    #[test]
    fn projection_tracks_aspect() {
        let mut projection = Projection::new(800, 400, cgmath::Deg(60.0), 0.1, 1000.0);
        assert!(approx(projection.aspect(), 2.0));
        projection.resize(400, 800);
        assert!(approx(projection.aspect(), 0.5));
        projection.resize(400, 0);
        assert!(projection.aspect().is_finite());
    }
}
