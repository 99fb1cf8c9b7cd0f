
use vkbase::math::frustum_vk;
use vkbase::mesh::{self, Mesh};
use vkbase::{Mat4F, Vec3F, Vec4F};

/// Number of views rendered by the multiview pass, one for each eye.
pub const VIEW_COUNT: usize = 2;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Eye {
    Left,
    Right,
}

impl Eye {

    /// -1 for the left eye and 1 for the right eye, along the camera right axis.
    fn side(&self) -> f32 {
        match self {
            | Eye::Left  => -1.0,
            | Eye::Right =>  1.0,
        }
    }
}

/// Off-axis stereo projection.
///
/// Both eyes look parallel to the center eye, and their frusta are shifted so that
/// they meet at the plane `focal_length` away from the viewer, where the parallax is zero.
#[derive(Debug, Clone, Copy)]
pub struct StereoCamera {
    /// distance between the two eyes, in world units.
    pub eye_separation: f32,
    pub focal_length: f32,
    /// vertical field of view in radians.
    pub fov: f32,
    pub z_near: f32,
    pub z_far: f32,
}

impl Default for StereoCamera {

    fn default() -> StereoCamera {
        StereoCamera {
            eye_separation: 0.08,
            focal_length: 0.5,
            fov: 90.0_f32.to_radians(),
            z_near: 0.1,
            z_far: 256.0,
        }
    }
}

impl StereoCamera {

    pub fn projection(&self, eye: Eye, aspect: f32) -> Mat4F {

        let half_height = self.z_near * (self.fov * 0.5).tan();
        // shift of the near plane that makes the frusta converge at the focal length.
        let shift = -eye.side() * 0.5 * self.eye_separation * self.z_near / self.focal_length;

        frustum_vk(
            -aspect * half_height + shift,
             aspect * half_height + shift,
            -half_height,
             half_height,
            self.z_near, self.z_far)
    }

    /// The view of `eye`, offset from `center_view` along its right axis.
    pub fn view(&self, eye: Eye, center_view: &Mat4F) -> Mat4F {

        let offset = Vec3F::new(-eye.side() * 0.5 * self.eye_separation, 0.0, 0.0);
        Mat4F::new_translation(&offset) * center_view
    }
}

/// Uniform block of the multiview pass, indexed by `gl_ViewIndex`.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct UboStereo {
    pub projection: [Mat4F; VIEW_COUNT],
    pub modelview: [Mat4F; VIEW_COUNT],
    pub light_pos: Vec4F,
}

impl UboStereo {

    pub fn new(camera: &StereoCamera, aspect: f32, center_view: &Mat4F) -> UboStereo {

        UboStereo {
            projection: [
                camera.projection(Eye::Left, aspect),
                camera.projection(Eye::Right, aspect),
            ],
            modelview: [
                camera.view(Eye::Left, center_view),
                camera.view(Eye::Right, center_view),
            ],
            light_pos: Vec4F::new(-2.5, 5.0, 2.5, 1.0),
        }
    }
}

/// A ring of colored spheres and cubes around a pedestal.
pub fn generate_scene() -> Mesh {

    const RING_COUNT: usize = 8;
    const RING_RADIUS: f32 = 3.0;

    let mut scene = mesh::grid(16.0, 16.0, 8, 8)
        .colored([0.6, 0.6, 0.6]);

    scene = scene.merge(mesh::cube(1.0)
        .translated([0.0, 0.5, 0.0])
        .colored([0.8, 0.8, 0.8]));

    for i in 0..RING_COUNT {

        let angle = (i as f32 / RING_COUNT as f32) * std::f32::consts::PI * 2.0;
        let position = [angle.cos() * RING_RADIUS, 0.5, angle.sin() * RING_RADIUS];
        let hue = i as f32 / RING_COUNT as f32;

        let shape = if i % 2 == 0 {
            mesh::uv_sphere(0.5, 24, 16)
        } else {
            mesh::cube(0.8)
        };
        scene = scene.merge(shape.translated(position).colored(hue_color(hue)));
    }

    scene
}

/// Fully saturated color of `hue` in [0, 1).
fn hue_color(hue: f32) -> [f32; 3] {

    let channel = |offset: f32| {
        let t = (hue + offset).fract() * 6.0;
        (t - 3.0).abs().min(2.0).max(1.0) - 1.0
    };
    [channel(0.0), channel(2.0 / 3.0), channel(1.0 / 3.0)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use vkbase::math::{look_at, perspective_vk};
    use vkbase::Point3F;

    fn center_view() -> Mat4F {
        look_at(&Point3F::new(1.0, 2.0, 5.0), &Point3F::new(0.0, 0.5, 0.0), &Vec3F::y())
    }

    fn eye_position(view: &Mat4F) -> Point3F {
        let inverse = view.try_inverse().unwrap();
        inverse.transform_point(&Point3F::origin())
    }

    #[test]
    fn eyes_are_symmetric_about_center() {

        let camera = StereoCamera::default();
        let center = center_view();

        let left = eye_position(&camera.view(Eye::Left, &center));
        let right = eye_position(&camera.view(Eye::Right, &center));
        let middle = eye_position(&center);

        assert_relative_eq!((left.coords + right.coords) * 0.5, middle.coords, epsilon = 1e-4);
        assert_relative_eq!((right - left).norm(), camera.eye_separation, epsilon = 1e-4);

        // the projections are mirrored shifts of each other.
        let left_proj = camera.projection(Eye::Left, 1.5);
        let right_proj = camera.projection(Eye::Right, 1.5);
        assert_relative_eq!(left_proj[(0, 2)], -right_proj[(0, 2)], epsilon = 1e-6);
        assert_relative_eq!(left_proj[(0, 0)], right_proj[(0, 0)], epsilon = 1e-6);
        assert!(left_proj[(0, 2)] > 0.0);
    }

    #[test]
    fn no_separation_is_plain_perspective() {

        let camera = StereoCamera { eye_separation: 0.0, ..StereoCamera::default() };
        let perspective = perspective_vk(camera.fov, 1.5, camera.z_near, camera.z_far);

        assert_relative_eq!(camera.projection(Eye::Left, 1.5), perspective, epsilon = 1e-5);
        assert_relative_eq!(camera.view(Eye::Right, &center_view()), center_view(), epsilon = 1e-6);
    }

    #[test]
    fn eyes_converge_at_focal_length() {

        let camera = StereoCamera::default();
        let center = Mat4F::identity();
        // a point on the focal plane straight ahead of the viewer.
        let point = Vec4F::new(0.0, 0.0, -camera.focal_length, 1.0);

        let ndc_x = |eye: Eye| {
            let clip = camera.projection(eye, 1.0) * camera.view(eye, &center) * point;
            clip.x / clip.w
        };
        assert_relative_eq!(ndc_x(Eye::Left), 0.0, epsilon = 1e-5);
        assert_relative_eq!(ndc_x(Eye::Right), 0.0, epsilon = 1e-5);
    }

    #[test]
    fn hues_are_saturated() {

        assert_eq!(hue_color(0.0), [1.0, 0.0, 0.0]);
        for &hue in [0.1, 0.35, 0.6, 0.9].iter() {
            let color = hue_color(hue);
            assert!(color.iter().cloned().fold(0.0, f32::max) > 0.99);
            assert!(color.iter().all(|&c| c >= 0.0 && c <= 1.0));
        }
    }
}
