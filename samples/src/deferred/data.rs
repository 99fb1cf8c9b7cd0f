
use vkbase::mesh::{self, Mesh};
use vkbase::{Mat4F, Vec4F};

/// Width and height of every G-buffer attachment.
pub const GBUFFER_DIM: u32 = 2048;
pub const LIGHT_COUNT: usize = 6;
/// Must match the array length of `instancePos` in mrt.vert.glsl.
pub const INSTANCE_COUNT: usize = 3;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Light {
    pub position: Vec4F,
    /// rgb color and the radius of influence in w.
    pub color_radius: [f32; 4],
}

impl Light {

    fn new(position: [f32; 3], color: [f32; 3], radius: f32) -> Light {
        Light {
            position: Vec4F::new(position[0], position[1], position[2], 1.0),
            color_radius: [color[0], color[1], color[2], radius],
        }
    }

    pub fn radius(&self) -> f32 {
        self.color_radius[3]
    }
}

/// Uniform block of the G-buffer pass.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct UboOffscreen {
    pub projection: Mat4F,
    pub view: Mat4F,
    pub instance_pos: [Vec4F; INSTANCE_COUNT],
}

impl UboOffscreen {

    pub fn new(projection: Mat4F, view: Mat4F) -> UboOffscreen {
        UboOffscreen {
            projection, view,
            instance_pos: [
                Vec4F::new( 0.0, 0.0,  0.0, 0.0),
                Vec4F::new(-4.0, 0.0, -4.0, 0.0),
                Vec4F::new( 4.0, 0.0, -4.0, 0.0),
            ],
        }
    }
}

/// Uniform block of the composition pass.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct UboComposition {
    pub lights: [Light; LIGHT_COUNT],
    pub view_pos: Vec4F,
    pub display_target: i32,
    _padding: [i32; 3],
}

impl UboComposition {

    pub fn new(lights: [Light; LIGHT_COUNT], view_pos: Vec4F, target: DisplayTarget) -> UboComposition {
        UboComposition {
            lights, view_pos,
            display_target: target.value(),
            _padding: [0; 3],
        }
    }
}

/// What the composition pass shows on screen.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum DisplayTarget {
    /// the lit scene.
    Composition,
    Position,
    Normal,
    Albedo,
}

impl DisplayTarget {

    pub fn value(&self) -> i32 {
        match self {
            | DisplayTarget::Composition => 0,
            | DisplayTarget::Position    => 1,
            | DisplayTarget::Normal      => 2,
            | DisplayTarget::Albedo      => 3,
        }
    }

    pub fn next(&self) -> DisplayTarget {
        match self {
            | DisplayTarget::Composition => DisplayTarget::Position,
            | DisplayTarget::Position    => DisplayTarget::Normal,
            | DisplayTarget::Normal      => DisplayTarget::Albedo,
            | DisplayTarget::Albedo      => DisplayTarget::Composition,
        }
    }
}

/// Positions of the point lights at `timer`, which loops over [0, 1).
pub fn animate_lights(timer: f32) -> [Light; LIGHT_COUNT] {

    let angle = (360.0 * timer).to_radians();

    let mut lights = [
        Light::new([0.0, 1.0, 1.0], [1.5, 1.5, 1.5], 4.0),
        Light::new([-2.0, 0.5, 0.0], [1.0, 0.0, 0.0], 15.0),
        Light::new([2.0, 1.0, 0.0], [0.0, 0.0, 2.5], 5.0),
        Light::new([0.0, 0.9, 0.5], [1.0, 1.0, 0.0], 2.0),
        Light::new([0.0, 0.5, 0.0], [0.0, 1.0, 0.2], 5.0),
        Light::new([0.0, 1.0, 0.0], [1.0, 0.7, 0.3], 25.0),
    ];

    let mut orbit = |light: usize, center: [f32; 2], radius: f32, phase_x: f32, phase_z: f32| {
        lights[light].position.x = center[0] + (angle + phase_x).sin() * radius;
        lights[light].position.z = center[1] + (angle + phase_z).cos() * radius;
    };

    orbit(0, [ 0.0, 0.0], 5.0, 0.0, 0.0);
    orbit(1, [-4.0, 0.0], 2.0, 45.0_f32.to_radians(), 45.0_f32.to_radians());
    orbit(2, [ 4.0, 0.0], 2.0, 0.0, 0.0);
    orbit(4, [ 0.0, 0.0], 5.0, 90.0_f32.to_radians(), 45.0_f32.to_radians());

    // the last light circles the other way.
    lights[5].position.x = (-angle + 135.0_f32.to_radians()).sin() * 10.0;
    lights[5].position.z = -(-angle - 45.0_f32.to_radians()).cos() * 10.0;

    lights
}

/// The floor of the scene.
pub fn generate_floor() -> Mesh {

    mesh::grid(24.0, 24.0, 12, 12)
        .colored([0.75, 0.75, 0.72])
}

/// One model drawn with `INSTANCE_COUNT` instances: a pedestal, a column and a sphere on top.
pub fn generate_model() -> Mesh {

    let pedestal = mesh::cube(1.4)
        .translated([0.0, 0.7, 0.0])
        .colored([0.45, 0.42, 0.40]);
    let column = mesh::cube(0.6)
        .translated([0.0, 1.7, 0.0])
        .colored([0.8, 0.78, 0.7]);
    let head = mesh::uv_sphere(0.7, 32, 24)
        .translated([0.0, 2.7, 0.0])
        .colored([0.85, 0.55, 0.3]);

    pedestal.merge(column).merge(head)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn lights_loop_with_timer() {

        let start = animate_lights(0.0);
        let end = animate_lights(1.0);

        for (a, b) in start.iter().zip(end.iter()) {
            assert_relative_eq!(a.position.x, b.position.x, epsilon = 1e-4);
            assert_relative_eq!(a.position.z, b.position.z, epsilon = 1e-4);
            assert_eq!(a.color_radius, b.color_radius);
        }
    }

    #[test]
    fn lights_move_on_their_orbit() {

        for &timer in [0.0, 0.13, 0.5, 0.77].iter() {
            let lights = animate_lights(timer);

            let first = lights[0].position;
            assert_relative_eq!((first.x * first.x + first.z * first.z).sqrt(), 5.0, epsilon = 1e-4);

            let red = lights[1].position;
            assert_relative_eq!(((red.x + 4.0).powi(2) + red.z.powi(2)).sqrt(), 2.0, epsilon = 1e-4);

            assert!(lights.iter().all(|l| l.position.y > 0.0 && l.radius() > 0.0));
        }
        // the yellow light does not move.
        assert_eq!(animate_lights(0.3)[3], animate_lights(0.6)[3]);
    }

    #[test]
    fn display_targets_cycle() {

        let mut target = DisplayTarget::Composition;
        let mut values = Vec::new();
        for _ in 0..4 {
            target = target.next();
            values.push(target.value());
        }
        assert_eq!(values, vec![1, 2, 3, 0]);
    }

    #[test]
    fn composition_uniform_matches_std140_layout() {

        assert_eq!(std::mem::size_of::<Light>(), 32);
        assert_eq!(memoffset::offset_of!(UboComposition, view_pos), 32 * LIGHT_COUNT);
        assert_eq!(std::mem::size_of::<UboComposition>() % 16, 0);
    }

    #[test]
    fn model_stands_on_the_floor() {

        let model = generate_model();
        let lowest = model.vertices.iter().map(|v| v.position[1]).fold(f32::MAX, f32::min);
        assert_relative_eq!(lowest, 0.0, epsilon = 1e-4);
        assert!(model.indices.iter().all(|&i| (i as usize) < model.vertices.len()));
    }
}
