
use ash::vk;
use memoffset::offset_of;

use vkbase::ci::pipeline::VertexInputSCI;
use vkbase::{Mat4F, Vec4F, Point3F};
use vkbase::vkuint;

pub const HEIGHTMAP_DIM: u32 = 512;
/// Vertices along each side of the patch grid.
pub const PATCH_SIZE: u32 = 64;
/// World units between two neighbouring patch vertices.
pub const PATCH_SPACING: f32 = 2.0;
/// Height in world units of the highest point of the heightmap.
pub const DISPLACEMENT_FACTOR: f32 = 32.0;
/// Target length in pixels of a tessellated edge on screen.
pub const TESSELLATED_EDGE_SIZE: f32 = 20.0;
pub const TESSELLATION_FACTOR: f32 = 0.75;

pub const LAYER_COUNT: u32 = 6;
pub const LAYER_DIM: u32 = 256;

// ----------------------------------------------------------------------------------------------
/// A square 16 bit heightmap made of fractal value noise.
#[derive(Debug, Clone)]
pub struct Heightmap {
    dim: u32,
    heights: Vec<u16>,
}

impl Heightmap {

    /// Sum `octaves` layers of value noise, each twice the frequency and half the amplitude of the last.
    /// The result is stretched to the full `u16` range.
    pub fn generate(dim: u32, seed: u32, octaves: u32) -> Heightmap {

        const BASE_FREQUENCY: f32 = 4.0;

        let mut raw = Vec::with_capacity((dim * dim) as usize);
        for y in 0..dim {
            for x in 0..dim {
                let (u, v) = (x as f32 / dim as f32, y as f32 / dim as f32);
                raw.push(fractal_noise(u * BASE_FREQUENCY, v * BASE_FREQUENCY, seed, octaves));
            }
        }

        let min = raw.iter().cloned().fold(f32::MAX, f32::min);
        let max = raw.iter().cloned().fold(f32::MIN, f32::max);
        let range = (max - min).max(std::f32::EPSILON);

        let heights = raw.into_iter()
            .map(|h| (((h - min) / range) * u16::MAX as f32).round() as u16)
            .collect();

        Heightmap { dim, heights }
    }

    /// A heightmap of constant `height` in [0, 1].
    pub fn flat(dim: u32, height: f32) -> Heightmap {
        Heightmap { dim, heights: vec![(height * u16::MAX as f32) as u16; (dim * dim) as usize] }
    }

    pub fn dim(&self) -> u32 {
        self.dim
    }

    pub fn texels(&self) -> &[u16] {
        &self.heights
    }

    /// Height in [0, 1] of the texel at `x`, `y`, clamped to the borders.
    pub fn height(&self, x: i32, y: i32) -> f32 {

        let max = self.dim as i32 - 1;
        let (x, y) = (x.max(0).min(max), y.max(0).min(max));
        self.heights[(y * self.dim as i32 + x) as usize] as f32 / u16::MAX as f32
    }

    fn texel_of(&self, u: f32, v: f32) -> (i32, i32) {

        let texel = |t: f32| (t.max(0.0).min(1.0) * (self.dim - 1) as f32).round() as i32;
        (texel(u), texel(v))
    }

    /// Height at texture coordinate `u`, `v`, clamped to [0, 1] like the heightmap sampler.
    pub fn sample(&self, u: f32, v: f32) -> f32 {
        let (x, y) = self.texel_of(u, v);
        self.height(x, y)
    }

    /// Surface normal at `u`, `v` of the terrain displaced by `displacement`, with `texel_size` world units per texel.
    pub fn normal(&self, u: f32, v: f32, displacement: f32, texel_size: f32) -> [f32; 3] {

        let (x, y) = self.texel_of(u, v);

        let dx = (self.height(x + 1, y) - self.height(x - 1, y)) * displacement / (2.0 * texel_size);
        let dz = (self.height(x, y + 1) - self.height(x, y - 1)) * displacement / (2.0 * texel_size);

        let length = (dx * dx + 1.0 + dz * dz).sqrt();
        [-dx / length, 1.0 / length, -dz / length]
    }
}

fn lattice_value(x: i32, y: i32, seed: u32) -> f32 {

    let mut h = (x as u32).wrapping_mul(0x27d4_eb2d)
        ^ (y as u32).wrapping_mul(0x1656_67b1)
        ^ seed.wrapping_mul(0x9e37_79b9);
    h ^= h >> 15;
    h = h.wrapping_mul(0x85eb_ca6b);
    h ^= h >> 13;
    h = h.wrapping_mul(0xc2b2_ae35);
    h ^= h >> 16;

    h as f32 / u32::MAX as f32
}

fn value_noise(x: f32, y: f32, seed: u32) -> f32 {

    let (x0, y0) = (x.floor(), y.floor());
    let (fx, fy) = (x - x0, y - y0);
    let (ix, iy) = (x0 as i32, y0 as i32);

    let smooth = |t: f32| t * t * (3.0 - 2.0 * t);
    let (sx, sy) = (smooth(fx), smooth(fy));

    let top    = lattice_value(ix, iy, seed) * (1.0 - sx) + lattice_value(ix + 1, iy, seed) * sx;
    let bottom = lattice_value(ix, iy + 1, seed) * (1.0 - sx) + lattice_value(ix + 1, iy + 1, seed) * sx;
    top * (1.0 - sy) + bottom * sy
}

/// Fractal sum of value noise, roughly in [0, 1].
pub fn fractal_noise(x: f32, y: f32, seed: u32, octaves: u32) -> f32 {

    let (mut sum, mut amplitude, mut frequency, mut total) = (0.0, 1.0, 1.0, 0.0);

    for octave in 0..octaves.max(1) {
        sum += value_noise(x * frequency, y * frequency, seed.wrapping_add(octave)) * amplitude;
        total += amplitude;
        amplitude *= 0.5;
        frequency *= 2.0;
    }

    sum / total
}
// ----------------------------------------------------------------------------------------------

// ----------------------------------------------------------------------------------------------
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TerrainVertex {
    pub pos   : [f32; 3],
    pub normal: [f32; 3],
    pub uv    : [f32; 2],
}

impl TerrainVertex {

    pub fn input_description(binding: vkuint) -> VertexInputSCI {

        let attribute = |location: vkuint, format: vk::Format, offset: usize| vk::VertexInputAttributeDescription {
            location, binding, format,
            offset: offset as _,
        };

        VertexInputSCI::new()
            .add_binding(vk::VertexInputBindingDescription {
                binding,
                stride: ::std::mem::size_of::<TerrainVertex>() as _,
                input_rate: vk::VertexInputRate::VERTEX,
            })
            .add_attribute(attribute(0, vk::Format::R32G32B32_SFLOAT, offset_of!(TerrainVertex, pos)))
            .add_attribute(attribute(1, vk::Format::R32G32B32_SFLOAT, offset_of!(TerrainVertex, normal)))
            .add_attribute(attribute(2, vk::Format::R32G32_SFLOAT,    offset_of!(TerrainVertex, uv)))
    }
}

/// Flat control points of the terrain, 4 indices for each quad patch.
#[derive(Debug, Clone, Default)]
pub struct TerrainPatches {
    pub vertices: Vec<TerrainVertex>,
    pub indices : Vec<u32>,
}

/// A `patch_size` x `patch_size` grid of control points centered at the origin,
/// with normals of the displaced `heightmap` and texture coordinates spanning `uv_scale`.
///
/// The corners of each patch are in the order the evaluation shader interpolates them:
/// (i, j), (i, j + 1), (i + 1, j + 1), (i + 1, j).
pub fn generate_terrain_patches(heightmap: &Heightmap, patch_size: u32, uv_scale: f32) -> TerrainPatches {

    debug_assert!(patch_size >= 2);

    let half_extent = (patch_size - 1) as f32 * PATCH_SPACING * 0.5;
    let texel_size = (patch_size - 1) as f32 * PATCH_SPACING / (heightmap.dim() as f32 * uv_scale);

    let mut vertices = Vec::with_capacity((patch_size * patch_size) as usize);
    for j in 0..patch_size {
        for i in 0..patch_size {

            let uv = [
                i as f32 / (patch_size - 1) as f32 * uv_scale,
                j as f32 / (patch_size - 1) as f32 * uv_scale,
            ];

            vertices.push(TerrainVertex {
                pos: [i as f32 * PATCH_SPACING - half_extent, 0.0, j as f32 * PATCH_SPACING - half_extent],
                normal: heightmap.normal(uv[0], uv[1], DISPLACEMENT_FACTOR, texel_size),
                uv,
            });
        }
    }

    let quad_count = (patch_size - 1) * (patch_size - 1);
    let mut indices = Vec::with_capacity((quad_count * 4) as usize);
    let at = |i: u32, j: u32| j * patch_size + i;

    for j in 0..(patch_size - 1) {
        for i in 0..(patch_size - 1) {
            indices.extend_from_slice(&[at(i, j), at(i, j + 1), at(i + 1, j + 1), at(i + 1, j)]);
        }
    }

    TerrainPatches { vertices, indices }
}
// ----------------------------------------------------------------------------------------------

// ----------------------------------------------------------------------------------------------
/// The six planes bounding a view frustum, pointing inwards, normalized.
#[derive(Debug, Clone, Copy)]
pub struct Frustum {
    pub planes: [Vec4F; 6],
}

impl Frustum {

    /// Extract the planes from a view-projection matrix with depth in [0, 1].
    pub fn from_matrix(matrix: &Mat4F) -> Frustum {

        let row = |r: usize| Vec4F::new(matrix[(r, 0)], matrix[(r, 1)], matrix[(r, 2)], matrix[(r, 3)]);
        let (r0, r1, r2, r3) = (row(0), row(1), row(2), row(3));

        // left, right, top, bottom, near, far.
        let mut planes = [
            r3 + r0,
            r3 - r0,
            r3 + r1,
            r3 - r1,
            r2,
            r3 - r2,
        ];

        for plane in planes.iter_mut() {
            let length = plane.xyz().norm();
            if length > std::f32::EPSILON {
                *plane /= length;
            }
        }

        Frustum { planes }
    }

    pub fn contains_sphere(&self, center: &Point3F, radius: f32) -> bool {
        self.planes.iter()
            .all(|plane| plane.x * center.x + plane.y * center.y + plane.z * center.z + plane.w >= -radius)
    }

    pub fn contains_point(&self, point: &Point3F) -> bool {
        self.contains_sphere(point, 0.0)
    }
}
// ----------------------------------------------------------------------------------------------

// ----------------------------------------------------------------------------------------------
/// Uniform block read by all tessellation stages.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct UboTessellation {
    pub projection: Mat4F,
    pub modelview: Mat4F,
    pub light_pos: Vec4F,
    pub frustum_planes: [Vec4F; 6],
    pub displacement_factor: f32,
    /// 0.0 disables tessellation.
    pub tessellation_factor: f32,
    pub viewport_dim: [f32; 2],
    pub tessellated_edge_size: f32,
    _padding: [f32; 3],
}

impl UboTessellation {

    pub fn new(projection: Mat4F, modelview: Mat4F, viewport_dim: [f32; 2], is_tessellation: bool) -> UboTessellation {

        let frustum = Frustum::from_matrix(&(projection * modelview));

        UboTessellation {
            projection, modelview, viewport_dim,
            light_pos: Vec4F::new(-48.0, 80.0, 46.0, 0.0),
            frustum_planes: frustum.planes,
            displacement_factor: DISPLACEMENT_FACTOR,
            tessellation_factor: if is_tessellation { TESSELLATION_FACTOR } else { 0.0 },
            tessellated_edge_size: TESSELLATED_EDGE_SIZE,
            _padding: [0.0; 3],
        }
    }
}

/// RGBA8 texels of terrain layer `layer`, ordered from the lowest to the highest ground.
pub fn generate_layer(layer: u32, dim: u32) -> Vec<[u8; 4]> {

    const BASE_COLORS: [[f32; 3]; LAYER_COUNT as usize] = [
        [0.76, 0.70, 0.50], // sand
        [0.33, 0.52, 0.20], // grass
        [0.22, 0.38, 0.15], // forest
        [0.45, 0.40, 0.35], // dirt
        [0.52, 0.52, 0.54], // rock
        [0.95, 0.95, 0.97], // snow
    ];

    let base = BASE_COLORS[(layer as usize).min(BASE_COLORS.len() - 1)];
    let mut texels = Vec::with_capacity((dim * dim) as usize);

    for y in 0..dim {
        for x in 0..dim {
            let detail = fractal_noise(x as f32 / dim as f32 * 16.0, y as f32 / dim as f32 * 16.0, 101 + layer, 3);
            let shade = 0.75 + 0.5 * detail;
            let channel = |c: f32| ((c * shade).min(1.0) * 255.0) as u8;
            texels.push([channel(base[0]), channel(base[1]), channel(base[2]), 255]);
        }
    }

    texels
}
// ----------------------------------------------------------------------------------------------

// ----------------------------------------------------------------------------------------------
/// The pipeline statistics queries of the terrain pass, one per command buffer.
///
/// Query `i` belongs to command buffer `i`, so the pool is recreated whenever the swapchain
/// comes back with a different number of images.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatisticSlots {
    query_count: vkuint,
}

impl StatisticSlots {

    pub fn for_commands(command_count: usize) -> StatisticSlots {
        StatisticSlots { query_count: command_count as vkuint }
    }

    pub fn query_count(&self) -> vkuint {
        self.query_count
    }

    pub fn query_of(&self, command_index: usize) -> Option<vkuint> {

        if command_index < self.query_count as usize {
            Some(command_index as vkuint)
        } else {
            None
        }
    }

    pub fn is_outdated(&self, command_count: usize) -> bool {
        self.query_count as usize != command_count
    }
}
// ----------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use vkbase::math::{perspective_vk, look_at};
    use vkbase::Vec3F;

    #[test]
    fn heightmap_spans_full_range_and_is_deterministic() {

        let a = Heightmap::generate(64, 7, 5);
        let b = Heightmap::generate(64, 7, 5);
        let c = Heightmap::generate(64, 8, 5);

        assert_eq!(a.texels(), b.texels());
        assert_ne!(a.texels(), c.texels());
        assert_eq!(*a.texels().iter().min().unwrap(), 0);
        assert_eq!(*a.texels().iter().max().unwrap(), u16::MAX);
    }

    #[test]
    fn heightmap_is_smooth() {

        let map = Heightmap::generate(128, 3, 4);
        for y in 0..127 {
            for x in 0..127 {
                assert!((map.height(x, y) - map.height(x + 1, y)).abs() < 0.5);
            }
        }
        assert!(fractal_noise(0.3, 0.7, 1, 6) >= 0.0 && fractal_noise(0.3, 0.7, 1, 6) <= 1.0);
    }

    #[test]
    fn patches_cover_the_grid() {

        let map = Heightmap::flat(16, 0.5);
        let patches = generate_terrain_patches(&map, 5, 1.0);

        assert_eq!(patches.vertices.len(), 25);
        assert_eq!(patches.indices.len(), 4 * 4 * 4);
        assert!(patches.indices.iter().all(|&i| (i as usize) < patches.vertices.len()));

        let first = patches.vertices.first().unwrap();
        let last  = patches.vertices.last().unwrap();
        assert_relative_eq!(first.pos[0], -last.pos[0]);
        assert_relative_eq!(first.pos[2], -last.pos[2]);
        assert_eq!(last.uv, [1.0, 1.0]);

        // flat ground faces up.
        for vertex in patches.vertices.iter() {
            assert_relative_eq!(vertex.normal[1], 1.0);
        }
        // the first patch starts at its own corner.
        assert_eq!(&patches.indices[..4], &[0, 5, 6, 1]);
    }

    #[test]
    fn normals_lean_away_from_slopes() {

        let map = Heightmap::generate(64, 11, 4);
        let patches = generate_terrain_patches(&map, 16, 1.0);
        for vertex in patches.vertices.iter() {
            let n = vertex.normal;
            assert_relative_eq!((n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt(), 1.0, epsilon = 1e-4);
            assert!(n[1] > 0.0);
        }
    }

    #[test]
    fn frustum_classifies_points_and_spheres() {

        let projection = perspective_vk(60.0_f32.to_radians(), 1.0, 0.1, 100.0);
        let view = look_at(&Point3F::new(0.0, 0.0, 0.0), &Point3F::new(0.0, 0.0, -1.0), &Vec3F::y());
        let frustum = Frustum::from_matrix(&(projection * view));

        assert!(frustum.contains_point(&Point3F::new(0.0, 0.0, -10.0)));
        // behind the camera, beyond the far plane, outside the sides.
        assert!(!frustum.contains_point(&Point3F::new(0.0, 0.0, 10.0)));
        assert!(!frustum.contains_point(&Point3F::new(0.0, 0.0, -150.0)));
        assert!(!frustum.contains_point(&Point3F::new(30.0, 0.0, -10.0)));
        assert!(!frustum.contains_point(&Point3F::new(0.0, -30.0, -10.0)));

        // a sphere crossing the left plane is kept.
        assert!(frustum.contains_sphere(&Point3F::new(-7.0, 0.0, -10.0), 2.0));
        assert!(!frustum.contains_sphere(&Point3F::new(-12.0, 0.0, -10.0), 2.0));

        for plane in frustum.planes.iter() {
            assert_relative_eq!(plane.xyz().norm(), 1.0, epsilon = 1e-5);
        }
    }

    #[test]
    fn layers_are_opaque_and_distinct() {

        let sand = generate_layer(0, 8);
        let snow = generate_layer(LAYER_COUNT - 1, 8);
        assert_eq!(sand.len(), 64);
        assert!(sand.iter().chain(snow.iter()).all(|t| t[3] == 255));
        assert!(snow[0][2] > sand[0][2]);
    }

    #[test]
    fn tessellation_uniform_matches_std140_layout() {

        assert_eq!(offset_of!(UboTessellation, frustum_planes), 144);
        assert_eq!(offset_of!(UboTessellation, viewport_dim), 248);
        assert_eq!(std::mem::size_of::<UboTessellation>(), 272);
    }

    #[test]
    fn statistic_slots_follow_the_command_count() {

        let slots = StatisticSlots::for_commands(2);
        assert_eq!(slots.query_of(1), Some(1));
        assert_eq!(slots.query_of(2), None);

        // the swapchain came back with one more image.
        assert!(slots.is_outdated(3));
        let rebuilt = StatisticSlots::for_commands(3);
        assert!(!rebuilt.is_outdated(3));
        assert_eq!(rebuilt.query_count(), 3);
        assert!((0..3).all(|i| rebuilt.query_of(i).is_some()));
    }
}
