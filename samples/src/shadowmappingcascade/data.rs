
use vkbase::math::{ortho_vk, look_at};
use vkbase::mesh::{self, Mesh};
use vkbase::{Mat4F, Vec3F, Vec4F, Point3F};

pub const SHADOW_MAP_CASCADE_COUNT: usize = 4;
pub const SHADOW_MAP_DIM: u32 = 4096;

/// Uniform block shared by the depth pass and the scene pass.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct UboShared {
    pub projection: Mat4F,
    pub view      : Mat4F,
    pub model     : Mat4F,
    pub cascade_view_proj: [Mat4F; SHADOW_MAP_CASCADE_COUNT],
    pub cascade_splits: Vec4F,
    pub light_dir: Vec4F,
    pub color_cascades: u32,
    pub filter_pcf: u32,
    _padding: [u32; 2],
}

impl Default for UboShared {

    fn default() -> UboShared {
        UboShared {
            projection: Mat4F::identity(),
            view      : Mat4F::identity(),
            model     : Mat4F::identity(),
            cascade_view_proj: [Mat4F::identity(); SHADOW_MAP_CASCADE_COUNT],
            cascade_splits: Vec4F::zeros(),
            light_dir: Vec4F::new(0.0, -1.0, 0.0, 0.0),
            color_cascades: 0,
            filter_pcf: 1,
            _padding: [0; 2],
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Cascade {
    /// view space depth where this cascade ends, negative in front of the camera.
    pub split_depth: f32,
    pub view_proj: Mat4F,
}

/// Split the camera clip range into `count` parts, blending logarithmic and uniform distribution by `lambda`.
///
/// The returned values are normalized into `[0, 1]` of the clip range, the last one is always 1.0.
pub fn compute_cascade_splits(near: f32, far: f32, lambda: f32, count: usize) -> Vec<f32> {

    let range = far - near;
    let ratio = far / near;

    (0..count).map(|i| {
        let p = (i + 1) as f32 / count as f32;
        let log = near * ratio.powf(p);
        let uniform = near + range * p;
        let d = lambda * (log - uniform) + uniform;
        (d - near) / range
    }).collect()
}

/// Fit an orthographic light projection around the slice of camera frustum covered by each split.
///
/// `inv_cam` is the inverse of camera projection * view, `light_dir` points from the light into the scene.
pub fn compute_cascades(inv_cam: &Mat4F, splits: &[f32], near: f32, far: f32, light_dir: &Vec3F) -> Vec<Cascade> {

    let clip_range = far - near;
    let light_dir = light_dir.normalize();
    let up = if light_dir.y.abs() > 0.99 { Vec3F::z() } else { Vec3F::y() };

    // frustum corners in NDC, near plane first.
    let ndc_corners = [
        Vec3F::new(-1.0,  1.0, 0.0), Vec3F::new(1.0,  1.0, 0.0),
        Vec3F::new( 1.0, -1.0, 0.0), Vec3F::new(-1.0, -1.0, 0.0),
        Vec3F::new(-1.0,  1.0, 1.0), Vec3F::new(1.0,  1.0, 1.0),
        Vec3F::new( 1.0, -1.0, 1.0), Vec3F::new(-1.0, -1.0, 1.0),
    ];

    let world_corners: Vec<Vec3F> = ndc_corners.iter().map(|c| {
        let corner = inv_cam * Vec4F::new(c.x, c.y, c.z, 1.0);
        corner.xyz() / corner.w
    }).collect();

    let mut last_split = 0.0;
    splits.iter().map(|&split| {

        let mut corners = [Vec3F::zeros(); 8];
        for j in 0..4 {
            let dist = world_corners[j + 4] - world_corners[j];
            corners[j + 4] = world_corners[j] + dist * split;
            corners[j]     = world_corners[j] + dist * last_split;
        }

        let center = corners.iter().fold(Vec3F::zeros(), |acc, c| acc + c) / 8.0;
        let radius = corners.iter()
            .map(|c| (c - center).norm())
            .fold(0.0_f32, f32::max);
        // snapping the radius reduces shimmering when the camera moves.
        let radius = (radius * 16.0).ceil() / 16.0;

        let eye = Point3F::from(center - light_dir * radius);
        let light_view = look_at(&eye, &Point3F::from(center), &up);
        let light_ortho = ortho_vk(-radius, radius, -radius, radius, 0.0, radius * 2.0);

        last_split = split;

        Cascade {
            split_depth: (near + split * clip_range) * -1.0,
            view_proj: light_ortho * light_view,
        }
    }).collect()
}

/// The light position rotates slowly, `timer` is in `[0, 1)`.
pub fn light_direction(timer: f32) -> Vec3F {

    let angle = (timer * 360.0).to_radians();
    let light_pos = Vec3F::new(angle.cos() * 40.0, 50.0 + angle.sin() * 20.0, 25.0 + angle.sin() * 5.0);
    // the light looks at the origin.
    (-light_pos).normalize()
}

/// A ground plane with rows of cubes and spheres long enough to span every cascade.
pub fn generate_scene() -> Mesh {

    let mut scene = mesh::grid(60.0, 60.0, 8, 8)
        .colored([0.6, 0.6, 0.6]);

    for row in 0..6 {
        let z = 6.0 - row as f32 * 7.0;
        for column in 0..3 {
            let x = (column as f32 - 1.0) * 6.0;
            let object = if (row + column) % 2 == 0 {
                mesh::cube(1.6).translated([x, 0.8, z]).colored([0.9, 0.35, 0.2])
            } else {
                mesh::uv_sphere(1.0, 24, 16).translated([x, 1.0, z]).colored([0.2, 0.5, 0.9])
            };
            scene = scene.merge(object);
        }
    }

    // a tall pillar to cast long shadows.
    scene.merge(mesh::cube(1.0).translated([8.0, 0.5, -4.0]).colored([0.8, 0.8, 0.3]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use vkbase::math::perspective_vk;

    #[test]
    fn splits_increase_and_end_at_far() {

        let splits = compute_cascade_splits(0.5, 48.0, 0.95, SHADOW_MAP_CASCADE_COUNT);
        assert_eq!(splits.len(), SHADOW_MAP_CASCADE_COUNT);
        assert!(splits.windows(2).all(|w| w[0] < w[1]));
        assert!(splits[0] > 0.0);
        assert_relative_eq!(*splits.last().unwrap(), 1.0, epsilon = 1e-5);
    }

    #[test]
    fn zero_lambda_splits_uniformly() {

        let splits = compute_cascade_splits(1.0, 101.0, 0.0, 4);
        for (i, split) in splits.iter().enumerate() {
            assert_relative_eq!(*split, (i + 1) as f32 / 4.0, epsilon = 1e-5);
        }
    }

    #[test]
    fn logarithmic_splits_favor_the_near_range() {

        let uniform = compute_cascade_splits(0.5, 48.0, 0.0, 4);
        let logarithmic = compute_cascade_splits(0.5, 48.0, 1.0, 4);
        assert!(logarithmic[0] < uniform[0]);
    }

    #[test]
    fn cascades_contain_their_frustum_slice() {

        let (near, far) = (0.5, 48.0);
        let proj = perspective_vk(45.0_f32.to_radians(), 16.0 / 9.0, near, far);
        let view = look_at(&Point3F::new(0.0, 3.0, 10.0), &Point3F::origin(), &Vec3F::y());
        let inv_cam = (proj * view).try_inverse().unwrap();

        let splits = compute_cascade_splits(near, far, 0.95, SHADOW_MAP_CASCADE_COUNT);
        let light_dir = light_direction(0.1);
        let cascades = compute_cascades(&inv_cam, &splits, near, far, &light_dir);

        assert_eq!(cascades.len(), SHADOW_MAP_CASCADE_COUNT);
        assert!(cascades.windows(2).all(|w| w[0].split_depth > w[1].split_depth));
        assert_relative_eq!(cascades[3].split_depth, -far, epsilon = 1e-3);

        let unproject = |z: f32| {
            let p = inv_cam * Vec4F::new(0.0, 0.0, z, 1.0);
            p.xyz() / p.w
        };
        let (near_center, far_center) = (unproject(0.0), unproject(1.0));

        // the center of each slice along the view direction lands inside the light frustum.
        let mut last = 0.0;
        for (cascade, &split) in cascades.iter().zip(splits.iter()) {

            let center = near_center + (far_center - near_center) * (0.5 * (last + split));

            let clip = cascade.view_proj * Vec4F::new(center.x, center.y, center.z, 1.0);
            assert!(clip.x.abs() <= 1.0 && clip.y.abs() <= 1.0);
            assert!(clip.z >= 0.0 && clip.z <= 1.0);
            last = split;
        }
    }

    #[test]
    fn light_always_points_downwards() {

        for step in 0..10 {
            let dir = light_direction(step as f32 / 10.0);
            assert!(dir.y < 0.0);
            assert_relative_eq!(dir.norm(), 1.0, epsilon = 1e-5);
        }
    }

    #[test]
    fn uniform_block_follows_std140() {
        // 3 + 4 matrices, 2 vectors and 4 scalars.
        assert_eq!(std::mem::size_of::<UboShared>(), 7 * 64 + 2 * 16 + 16);
    }
}
