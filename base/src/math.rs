//! Linear algebra aliases and the projections used by the samples.
//!
//! Projections target Vulkan clip space: right-handed view space looking down `-Z`,
//! depth in `[0, 1]` and `+Y` pointing down in normalized device coordinates.

use nalgebra::{Matrix4, Point3, Vector2, Vector3, Vector4};

pub type Vec2F = Vector2<f32>;
pub type Vec3F = Vector3<f32>;
pub type Vec4F = Vector4<f32>;
pub type Mat4F = Matrix4<f32>;
pub type Point3F = Point3<f32>;

/// Perspective projection, `fovy` is the vertical field of view in radians.
pub fn perspective_vk(fovy: f32, aspect: f32, near: f32, far: f32) -> Mat4F {

    debug_assert!(aspect > 0.0 && near > 0.0 && far > near);

    let focal = 1.0 / (fovy * 0.5).tan();

    Mat4F::new(
        focal / aspect, 0.0,    0.0,                 0.0,
        0.0,            -focal, 0.0,                 0.0,
        0.0,            0.0,    far / (near - far),  (near * far) / (near - far),
        0.0,            0.0,    -1.0,                0.0,
    )
}

/// Asymmetric perspective projection from the extents of the near plane.
pub fn frustum_vk(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Mat4F {

    Mat4F::new(
        2.0 * near / (right - left), 0.0,                          (right + left) / (right - left),  0.0,
        0.0,                         -2.0 * near / (top - bottom), -(top + bottom) / (top - bottom), 0.0,
        0.0,                         0.0,                          far / (near - far),               (near * far) / (near - far),
        0.0,                         0.0,                          -1.0,                             0.0,
    )
}

pub fn ortho_vk(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Mat4F {

    Mat4F::new(
        2.0 / (right - left), 0.0,                  0.0,                 -(right + left) / (right - left),
        0.0,                  -2.0 / (top - bottom), 0.0,                (top + bottom) / (top - bottom),
        0.0,                  0.0,                  -1.0 / (far - near), -near / (far - near),
        0.0,                  0.0,                  0.0,                 1.0,
    )
}

#[inline]
pub fn look_at(eye: &Point3F, target: &Point3F, up: &Vec3F) -> Mat4F {
    Mat4F::look_at_rh(eye, target, up)
}

/// A view orbiting around a target point, optionally rotating by itself over time.
#[derive(Debug, Clone)]
pub struct OrbitView {

    pub target: Point3F,
    pub distance: f32,
    /// rotation around the X axis in degrees.
    pub pitch: f32,
    /// rotation around the Y axis in degrees.
    pub yaw: f32,
    /// degrees per second added to `yaw` by `update`.
    pub rotate_speed: f32,
}

impl OrbitView {

    pub fn new(target: Point3F, distance: f32, pitch: f32, yaw: f32) -> OrbitView {
        OrbitView { target, distance, pitch, yaw, rotate_speed: 0.0 }
    }

    pub fn with_rotate_speed(mut self, degrees_per_second: f32) -> OrbitView {
        self.rotate_speed = degrees_per_second; self
    }

    pub fn update(&mut self, delta_time: f32) {
        self.yaw = (self.yaw + self.rotate_speed * delta_time) % 360.0;
    }

    pub fn position(&self) -> Point3F {

        let (pitch, yaw) = (self.pitch.to_radians(), self.yaw.to_radians());
        let offset = Vec3F::new(
            pitch.cos() * yaw.sin(),
            pitch.sin(),
            pitch.cos() * yaw.cos(),
        );
        self.target + offset * self.distance
    }

    pub fn view_matrix(&self) -> Mat4F {
        look_at(&self.position(), &self.target, &Vec3F::y())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn project(m: &Mat4F, p: Vec3F) -> Vec3F {
        let clip = m * Vec4F::new(p.x, p.y, p.z, 1.0);
        clip.xyz() / clip.w
    }

    #[test]
    fn perspective_maps_depth_to_unit_range() {

        let proj = perspective_vk(60.0_f32.to_radians(), 16.0 / 9.0, 0.1, 100.0);
        assert_relative_eq!(project(&proj, Vec3F::new(0.0, 0.0, -0.1)).z, 0.0, epsilon = 1e-5);
        assert_relative_eq!(project(&proj, Vec3F::new(0.0, 0.0, -100.0)).z, 1.0, epsilon = 1e-5);
        // +Y in view space is up, which is -Y in Vulkan NDC.
        assert!(project(&proj, Vec3F::new(0.0, 1.0, -5.0)).y < 0.0);
    }

    #[test]
    fn symmetric_frustum_equals_perspective() {

        let near = 0.5;
        let half_height = near * (45.0_f32.to_radians() * 0.5).tan();
        let half_width = half_height * 2.0;

        let frustum = frustum_vk(-half_width, half_width, -half_height, half_height, near, 50.0);
        let perspective = perspective_vk(45.0_f32.to_radians(), 2.0, near, 50.0);
        assert_relative_eq!(frustum, perspective, epsilon = 1e-5);
    }

    #[test]
    fn ortho_maps_box_to_clip_volume() {

        let proj = ortho_vk(-2.0, 2.0, -1.0, 1.0, 0.0, 10.0);
        let corner = project(&proj, Vec3F::new(2.0, 1.0, -10.0));
        assert_relative_eq!(corner, Vec3F::new(1.0, -1.0, 1.0), epsilon = 1e-6);
        assert_relative_eq!(project(&proj, Vec3F::new(0.0, 0.0, 0.0)).z, 0.0);
    }

    #[test]
    fn orbit_keeps_distance_and_rotates() {

        let mut orbit = OrbitView::new(Point3F::new(1.0, 0.0, 0.0), 5.0, 30.0, 0.0)
            .with_rotate_speed(90.0);
        assert_relative_eq!((orbit.position() - orbit.target).norm(), 5.0, epsilon = 1e-5);

        orbit.update(1.0);
        assert_relative_eq!(orbit.yaw, 90.0);
        let eye_in_view = orbit.view_matrix().transform_point(&orbit.position());
        assert_relative_eq!(eye_in_view.coords.norm(), 0.0, epsilon = 1e-5);
    }
}
