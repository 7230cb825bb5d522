//! Perspective camera with a damped orbit controller.
//!
//! The controller never moves the camera directly from input. Pointer and
//! wheel input only accumulate pending rotation, pan and zoom; each
//! [`CameraRig::update`] applies a `damping_factor` fraction of what is
//! pending and decays the rest, so motion eases out over several frames.

use cgmath::{InnerSpace, Matrix4, Point3, Rad, Vector3};
use wgpu::util::DeviceExt;

use crate::config::CameraConfig;

#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

/// Keeps the polar angle away from the poles where `look_at` degenerates.
const POLAR_EPSILON: f32 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub position: Point3<f32>,
    pub target: Point3<f32>,
    pub up: Vector3<f32>,
}

impl Camera {
    pub fn new<P: Into<Point3<f32>>>(position: P, target: P) -> Self {
        Self {
            position: position.into(),
            target: target.into(),
            up: Vector3::unit_y(),
        }
    }

    pub fn calc_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(self.position, self.target, self.up)
    }

    pub fn distance(&self) -> f32 {
        (self.position - self.target).magnitude()
    }

    /// Camera-space right and up axes expressed in world space.
    fn screen_axes(&self) -> (Vector3<f32>, Vector3<f32>) {
        let forward = (self.target - self.position).normalize();
        let right = forward.cross(self.up).normalize();
        let up = right.cross(forward);
        (right, up)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    aspect: f32,
    fovy: Rad<f32>,
    znear: f32,
    zfar: f32,
}

impl Projection {
    pub fn new<F: Into<Rad<f32>>>(aspect: f32, fovy: F, znear: f32, zfar: f32) -> Self {
        Self {
            aspect,
            fovy: fovy.into(),
            znear,
            zfar,
        }
    }

    pub fn set_aspect(&mut self, aspect: f32) {
        self.aspect = aspect;
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn fovy(&self) -> Rad<f32> {
        self.fovy
    }

    pub fn calc_matrix(&self) -> Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX * cgmath::perspective(self.fovy, self.aspect, self.znear, self.zfar)
    }
}

/// Radius plus polar (`phi`, from +Y) and azimuthal (`theta`, around +Y from +Z) angles.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Spherical {
    radius: f32,
    phi: f32,
    theta: f32,
}

impl Spherical {
    fn from_offset(offset: Vector3<f32>) -> Self {
        let radius = offset.magnitude();
        if radius == 0.0 {
            return Self {
                radius,
                phi: 0.0,
                theta: 0.0,
            };
        }
        Self {
            radius,
            theta: offset.x.atan2(offset.z),
            phi: (offset.y / radius).clamp(-1.0, 1.0).acos(),
        }
    }

    fn to_offset(self) -> Vector3<f32> {
        let sin_phi = self.phi.sin();
        Vector3::new(
            self.radius * sin_phi * self.theta.sin(),
            self.radius * self.phi.cos(),
            self.radius * sin_phi * self.theta.cos(),
        )
    }
}

/// Damped orbit around `Camera::target`.
#[derive(Debug, Clone, PartialEq)]
pub struct OrbitController {
    damping_factor: f32,
    rotate_speed: f32,
    zoom_speed: f32,
    pan_speed: f32,
    min_distance: f32,
    max_distance: f32,
    delta_theta: f32,
    delta_phi: f32,
    pan_offset: Vector3<f32>,
    scale: f32,
}

impl OrbitController {
    pub fn new(config: &CameraConfig) -> Self {
        Self {
            damping_factor: config.damping_factor,
            rotate_speed: config.rotate_speed,
            zoom_speed: config.zoom_speed,
            pan_speed: config.pan_speed,
            min_distance: config.min_distance,
            max_distance: config.max_distance,
            delta_theta: 0.0,
            delta_phi: 0.0,
            pan_offset: Vector3::new(0.0, 0.0, 0.0),
            scale: 1.0,
        }
    }

    /// Drag by `(dx, dy)` pixels. A drag across the full viewport height is one turn.
    pub fn rotate(&mut self, dx: f32, dy: f32, viewport_height: f32) {
        let height = viewport_height.max(1.0);
        self.delta_theta -= std::f32::consts::TAU * dx / height * self.rotate_speed;
        self.delta_phi -= std::f32::consts::TAU * dy / height * self.rotate_speed;
    }

    /// Drag the target by `(dx, dy)` pixels in the camera's screen plane.
    pub fn pan(
        &mut self,
        dx: f32,
        dy: f32,
        viewport_height: f32,
        camera: &Camera,
        projection: &Projection,
    ) {
        let height = viewport_height.max(1.0);
        let target_distance = camera.distance() * (projection.fovy().0 * 0.5).tan();
        let (right, up) = camera.screen_axes();
        let left = -right * (2.0 * dx * self.pan_speed * target_distance / height);
        let upward = up * (2.0 * dy * self.pan_speed * target_distance / height);
        self.pan_offset += left + upward;
    }

    /// Positive steps move towards the target, negative steps away from it.
    pub fn zoom(&mut self, steps: f32) {
        self.scale *= 0.95f32.powf(self.zoom_speed * steps);
    }

    pub fn is_settled(&self) -> bool {
        const REST: f32 = 1e-6;
        self.delta_theta.abs() < REST
            && self.delta_phi.abs() < REST
            && self.pan_offset.magnitude() < REST
            && self.scale == 1.0
    }

    /// Advance damping by one step and write the result into `camera`.
    pub fn update(&mut self, camera: &mut Camera) {
        let mut spherical = Spherical::from_offset(camera.position - camera.target);

        spherical.theta += self.delta_theta * self.damping_factor;
        spherical.phi += self.delta_phi * self.damping_factor;
        spherical.phi = spherical
            .phi
            .clamp(POLAR_EPSILON, std::f32::consts::PI - POLAR_EPSILON);
        spherical.radius =
            (spherical.radius * self.scale).clamp(self.min_distance, self.max_distance);

        camera.target += self.pan_offset * self.damping_factor;
        camera.position = camera.target + spherical.to_offset();

        let decay = 1.0 - self.damping_factor;
        self.delta_theta *= decay;
        self.delta_phi *= decay;
        self.pan_offset *= decay;
        self.scale = 1.0;
    }
}

/// The camera, its projection and the controller that moves it.
#[derive(Debug, Clone)]
pub struct CameraRig {
    camera: Camera,
    projection: Projection,
    controller: OrbitController,
}

impl CameraRig {
    pub fn new(config: &CameraConfig, aspect: f32) -> Self {
        Self {
            camera: Camera::new(config.position, config.target),
            projection: Projection::new(
                aspect,
                cgmath::Deg(config.fov_deg),
                config.near,
                config.far,
            ),
            controller: OrbitController::new(config),
        }
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    pub fn projection_mut(&mut self) -> &mut Projection {
        &mut self.projection
    }

    pub fn controller(&self) -> &OrbitController {
        &self.controller
    }

    pub fn rotate(&mut self, dx: f32, dy: f32, viewport_height: f32) {
        self.controller.rotate(dx, dy, viewport_height);
    }

    pub fn pan(&mut self, dx: f32, dy: f32, viewport_height: f32) {
        self.controller
            .pan(dx, dy, viewport_height, &self.camera, &self.projection);
    }

    pub fn zoom(&mut self, steps: f32) {
        self.controller.zoom(steps);
    }

    /// One damping step.
    pub fn update(&mut self) {
        self.controller.update(&mut self.camera);
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    view_position: [f32; 4],
    view_proj: [[f32; 4]; 4],
}

impl CameraUniform {
    pub fn new() -> Self {
        use cgmath::SquareMatrix;
        Self {
            view_position: [0.0; 4],
            view_proj: Matrix4::identity().into(),
        }
    }

    pub fn update_view_proj(&mut self, camera: &Camera, projection: &Projection) {
        self.view_position = camera.position.to_homogeneous().into();
        self.view_proj = (projection.calc_matrix() * camera.calc_matrix()).into();
    }
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
pub struct CameraResources {
    pub uniform: CameraUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

impl CameraResources {
    pub fn new(device: &wgpu::Device, rig: &CameraRig) -> Self {
        let mut uniform = CameraUniform::new();
        uniform.update_view_proj(rig.camera(), rig.projection());

        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera Buffer"),
            contents: bytemuck::cast_slice(&[uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
            label: Some("camera_bind_group_layout"),
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
            label: Some("camera_bind_group"),
        });

        Self {
            uniform,
            buffer,
            bind_group,
            bind_group_layout,
        }
    }

    pub fn write(&mut self, queue: &wgpu::Queue, rig: &CameraRig) {
        self.uniform.update_view_proj(rig.camera(), rig.projection());
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[self.uniform]));
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    fn rig() -> CameraRig {
        CameraRig::new(&CameraConfig::default(), 16.0 / 9.0)
    }

    #[test]
    fn idle_rig_keeps_its_pose() {
        let mut rig = rig();
        let before = *rig.camera();
        for _ in 0..100 {
            rig.update();
        }
        let after = rig.camera();
        assert_abs_diff_eq!(after.position.x, before.position.x, epsilon = 1e-5);
        assert_abs_diff_eq!(after.position.y, before.position.y, epsilon = 1e-5);
        assert_abs_diff_eq!(after.position.z, before.position.z, epsilon = 1e-5);
        assert!(rig.controller().is_settled());
    }

    #[test]
    fn rotation_eases_in_and_keeps_the_radius() {
        let mut rig = rig();
        let radius = rig.camera().distance();
        rig.rotate(100.0, 0.0, 720.0);

        rig.update();
        let first_step = rig.camera().position;
        // Only a damping-sized fraction is applied on the first frame.
        let expected_first = -std::f32::consts::TAU * 100.0 / 720.0 * 0.05;
        let theta = first_step.x.atan2(first_step.z);
        assert_abs_diff_eq!(theta, expected_first, epsilon = 1e-4);

        for _ in 0..600 {
            rig.update();
        }
        let settled = rig.camera().position;
        let theta = settled.x.atan2(settled.z);
        assert_abs_diff_eq!(theta, -std::f32::consts::TAU * 100.0 / 720.0, epsilon = 1e-3);
        assert_abs_diff_eq!(rig.camera().distance(), radius, epsilon = 1e-4);
        assert!(rig.controller().is_settled());
    }

    #[test]
    fn polar_angle_stays_off_the_pole() {
        let mut rig = rig();
        let radius = rig.camera().distance();
        rig.rotate(0.0, 10_000.0, 720.0);
        for _ in 0..50 {
            rig.update();
            let offset = rig.camera().position - rig.camera().target;
            assert!(offset.x.is_finite() && offset.y.is_finite() && offset.z.is_finite());
            assert!(offset.y > 0.0, "camera flipped over the pole");
            assert_abs_diff_eq!(rig.camera().distance(), radius, epsilon = 1e-4);
        }
    }

    #[test]
    fn zoom_is_applied_at_once_and_clamped() {
        let mut rig = rig();
        let radius = rig.camera().distance();
        rig.zoom(1.0);
        rig.update();
        assert_abs_diff_eq!(rig.camera().distance(), radius * 0.95, epsilon = 1e-5);

        rig.zoom(-1000.0);
        rig.update();
        assert_abs_diff_eq!(rig.camera().distance(), 10.0, epsilon = 1e-4);
    }

    #[test]
    fn pan_moves_target_and_camera_together() {
        let mut rig = rig();
        let offset_before = rig.camera().position - rig.camera().target;
        rig.pan(50.0, 0.0, 720.0);
        for _ in 0..400 {
            rig.update();
        }
        let camera = rig.camera();
        assert!(camera.target.x < 0.0, "dragging right slides the scene left");
        let offset_after = camera.position - camera.target;
        assert_abs_diff_eq!(offset_after.x, offset_before.x, epsilon = 1e-4);
        assert_abs_diff_eq!(offset_after.y, offset_before.y, epsilon = 1e-4);
        assert_abs_diff_eq!(offset_after.z, offset_before.z, epsilon = 1e-4);
    }

    #[test]
    fn projection_tracks_aspect() {
        let mut rig = rig();
        rig.projection_mut().set_aspect(2.0);
        assert_eq!(rig.projection().aspect(), 2.0);
    }
}
