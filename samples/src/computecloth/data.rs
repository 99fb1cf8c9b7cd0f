
use ash::vk;
use memoffset::offset_of;

use vkbase::ci::pipeline::VertexInputSCI;
use vkbase::{Mat4F, Vec4F};
use vkbase::vkuint;

/// Particles along x and y of the cloth.
pub const GRID_SIZE: [u32; 2] = [60, 60];
/// Extent of the cloth in world units.
pub const CLOTH_SIZE: [f32; 2] = [5.0, 5.0];
/// Height the cloth starts to fall from.
pub const CLOTH_HEIGHT: f32 = 2.0;
pub const SPHERE_RADIUS: f32 = 1.0;

/// Simulation steps per frame, each one reads one storage buffer and writes the other.
pub const COMPUTE_ITERATIONS: u32 = 64;
/// Must match `local_size_x` and `local_size_y` of cloth.comp.glsl.
pub const WORKGROUP_SIZE: u32 = 10;

pub const PRIMITIVE_RESTART_INDEX: u32 = u32::MAX;

/// One particle, laid out as std430 in storage buffers and read as vertex by the graphics pipeline.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Particle {
    pub pos   : [f32; 4],
    pub vel   : [f32; 4],
    /// xy is texture coordinate, z is 1.0 for pinned particles.
    pub uv    : [f32; 4],
    pub normal: [f32; 4],
}

impl Particle {

    pub fn input_description(binding: vkuint) -> VertexInputSCI {

        VertexInputSCI::new()
            .add_binding(vk::VertexInputBindingDescription {
                binding,
                stride: ::std::mem::size_of::<Particle>() as _,
                input_rate: vk::VertexInputRate::VERTEX,
            })
            .add_attribute(vk::VertexInputAttributeDescription {
                location: 0, binding,
                format: vk::Format::R32G32B32_SFLOAT,
                offset: offset_of!(Particle, pos) as _,
            })
            .add_attribute(vk::VertexInputAttributeDescription {
                location: 1, binding,
                format: vk::Format::R32G32_SFLOAT,
                offset: offset_of!(Particle, uv) as _,
            })
            .add_attribute(vk::VertexInputAttributeDescription {
                location: 2, binding,
                format: vk::Format::R32G32B32_SFLOAT,
                offset: offset_of!(Particle, normal) as _,
            })
    }

    pub fn is_pinned(&self) -> bool {
        self.uv[2] > 0.5
    }
}

/// The spring distances between a particle and its horizontal, vertical and diagonal neighbours at rest.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RestLengths {
    pub horizontal: f32,
    pub vertical  : f32,
    pub diagonal  : f32,
}

/// A rectangular cloth of `grid[0]` x `grid[1]` particles spanning `size`, lying flat on the xz plane.
#[derive(Debug, Clone, Copy)]
pub struct ClothGrid {
    pub grid: [u32; 2],
    pub size: [f32; 2],
}

impl ClothGrid {

    pub fn new(grid: [u32; 2], size: [f32; 2]) -> ClothGrid {

        debug_assert!(grid[0] >= 2 && grid[1] >= 2);
        ClothGrid { grid, size }
    }

    pub fn particle_count(&self) -> usize {
        (self.grid[0] * self.grid[1]) as usize
    }

    pub fn rest_lengths(&self) -> RestLengths {

        let horizontal = self.size[0] / (self.grid[0] - 1) as f32;
        let vertical   = self.size[1] / (self.grid[1] - 1) as f32;

        RestLengths {
            horizontal, vertical,
            diagonal: (horizontal * horizontal + vertical * vertical).sqrt(),
        }
    }

    /// Particles at rest, centered above the origin at `height`, row by row along x.
    ///
    /// With `pin_corners` the two corners of the far row stay fixed.
    pub fn particles(&self, height: f32, pin_corners: bool) -> Vec<Particle> {

        let [columns, rows] = self.grid;
        let rest = self.rest_lengths();
        let origin = [-self.size[0] * 0.5, -self.size[1] * 0.5];

        let mut particles = Vec::with_capacity(self.particle_count());

        for y in 0..rows {
            for x in 0..columns {

                let is_pinned = pin_corners && y == 0 && (x == 0 || x == columns - 1);

                particles.push(Particle {
                    pos: [origin[0] + rest.horizontal * x as f32, height, origin[1] + rest.vertical * y as f32, 1.0],
                    vel: [0.0; 4],
                    uv : [x as f32 / (columns - 1) as f32, y as f32 / (rows - 1) as f32, if is_pinned { 1.0 } else { 0.0 }, 0.0],
                    normal: [0.0, 1.0, 0.0, 0.0],
                });
            }
        }

        particles
    }

    /// One triangle strip per pair of rows, each terminated by `PRIMITIVE_RESTART_INDEX`.
    pub fn strip_indices(&self) -> Vec<u32> {

        let [columns, rows] = self.grid;
        let mut indices = Vec::with_capacity(((rows - 1) * (columns * 2 + 1)) as usize);

        for y in 0..(rows - 1) {
            for x in 0..columns {
                indices.push((y + 1) * columns + x);
                indices.push(y * columns + x);
            }
            indices.push(PRIMITIVE_RESTART_INDEX);
        }

        indices
    }

    /// Number of workgroups to cover every particle with one invocation.
    pub fn workgroup_count(&self) -> [u32; 2] {
        [
            (self.grid[0] + WORKGROUP_SIZE - 1) / WORKGROUP_SIZE,
            (self.grid[1] + WORKGROUP_SIZE - 1) / WORKGROUP_SIZE,
        ]
    }
}

/// Uniform block of cloth.comp.glsl.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct UboCompute {
    pub delta_t: f32,
    pub particle_mass: f32,
    pub spring_stiffness: f32,
    pub damping: f32,
    pub rest_dist_h: f32,
    pub rest_dist_v: f32,
    pub rest_dist_d: f32,
    pub sphere_radius: f32,
    pub sphere_pos: Vec4F,
    /// gravity plus wind.
    pub external_force: Vec4F,
    pub particle_count: [i32; 2],
    _padding: [i32; 2],
}

impl UboCompute {

    pub fn new(cloth: &ClothGrid, sphere_radius: f32) -> UboCompute {

        let rest = cloth.rest_lengths();

        UboCompute {
            delta_t: 0.0,
            particle_mass: 0.1,
            spring_stiffness: 2000.0,
            damping: 0.25,
            rest_dist_h: rest.horizontal,
            rest_dist_v: rest.vertical,
            rest_dist_d: rest.diagonal,
            sphere_radius,
            sphere_pos: Vec4F::new(0.0, 0.0, 0.0, 0.0),
            external_force: Vec4F::new(0.0, -9.8, 0.0, 0.0),
            particle_count: [cloth.grid[0] as i32, cloth.grid[1] as i32],
            _padding: [0; 2],
        }
    }
}

/// Uniform block shared by the cloth and sphere shaders.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct UboScene {
    pub projection: Mat4F,
    pub view: Mat4F,
    pub light_pos: Vec4F,
}

/// Time step of one simulation iteration, the frame time is clamped to keep the springs stable.
pub fn iteration_delta(frame_time: f32) -> f32 {
    frame_time.min(0.02) / COMPUTE_ITERATIONS as f32
}

/// Horizontal wind varying with `timer` seconds, added to gravity.
pub fn wind_force(timer: f32) -> Vec4F {

    let strength = 4.0 + 3.0 * (timer * 1.3).sin();
    Vec4F::new(strength * (timer * 0.4).cos(), 0.0, strength * 0.5, 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn strips_restart_once_per_row_pair() {

        let cloth = ClothGrid::new([6, 4], [2.0, 1.0]);
        let indices = cloth.strip_indices();

        let restarts = indices.iter().filter(|&&i| i == PRIMITIVE_RESTART_INDEX).count();
        assert_eq!(restarts, 3);
        assert_eq!(*indices.last().unwrap(), PRIMITIVE_RESTART_INDEX);

        for strip in indices.split(|&i| i == PRIMITIVE_RESTART_INDEX).filter(|s| !s.is_empty()) {
            assert_eq!(strip.len(), 12);
        }
        assert!(indices.iter()
            .filter(|&&i| i != PRIMITIVE_RESTART_INDEX)
            .all(|&i| (i as usize) < cloth.particle_count()));
    }

    #[test]
    fn particles_span_the_cloth() {

        let cloth = ClothGrid::new(GRID_SIZE, CLOTH_SIZE);
        let particles = cloth.particles(CLOTH_HEIGHT, false);
        assert_eq!(particles.len(), cloth.particle_count());

        let first = particles.first().unwrap();
        let last  = particles.last().unwrap();
        assert_relative_eq!(last.pos[0] - first.pos[0], CLOTH_SIZE[0], epsilon = 1e-4);
        assert_relative_eq!(last.pos[2] - first.pos[2], CLOTH_SIZE[1], epsilon = 1e-4);
        assert!(particles.iter().all(|p| p.pos[1] == CLOTH_HEIGHT && !p.is_pinned()));
        assert_eq!(last.uv[..2], [1.0, 1.0]);
    }

    #[test]
    fn pinning_fixes_two_corners() {

        let cloth = ClothGrid::new([4, 4], [1.0, 1.0]);
        let particles = cloth.particles(0.0, true);
        let pinned: Vec<usize> = particles.iter().enumerate()
            .filter(|(_, p)| p.is_pinned())
            .map(|(i, _)| i)
            .collect();
        assert_eq!(pinned, vec![0, 3]);
    }

    #[test]
    fn rest_lengths_match_spacing() {

        let cloth = ClothGrid::new([5, 3], [4.0, 1.0]);
        let rest = cloth.rest_lengths();
        assert_relative_eq!(rest.horizontal, 1.0);
        assert_relative_eq!(rest.vertical, 0.5);
        assert_relative_eq!(rest.diagonal, 1.25_f32.sqrt());
    }

    #[test]
    fn workgroups_cover_every_particle() {

        assert_eq!(ClothGrid::new(GRID_SIZE, CLOTH_SIZE).workgroup_count(), [6, 6]);
        assert_eq!(ClothGrid::new([61, 9], CLOTH_SIZE).workgroup_count(), [7, 1]);
    }

    #[test]
    fn compute_uniform_matches_std140_layout() {

        assert_eq!(std::mem::size_of::<Particle>(), 64);
        assert_eq!(offset_of!(UboCompute, sphere_pos), 32);
        assert_eq!(offset_of!(UboCompute, particle_count), 64);
        assert!(iteration_delta(1.0) <= 0.02 / COMPUTE_ITERATIONS as f32);
    }
}
