//! Procedurally generated meshes and their GPU buffers.

use ash::vk;
use memoffset::offset_of;

use crate::ci::pipeline::VertexInputSCI;
use crate::ci::vma::{VmaBuffer, device_buffer_with_data};
use crate::command::{VkCmdRecorder, IGraphics, CmdGraphicsApi};
use crate::context::VkDevice;
use crate::error::VkResult;
use crate::{vkuint, vkbytes};

use std::f32::consts::PI;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub normal  : [f32; 3],
    pub uv      : [f32; 2],
    pub color   : [f32; 3],
}

impl MeshVertex {

    fn new(position: [f32; 3], normal: [f32; 3], uv: [f32; 2]) -> MeshVertex {
        MeshVertex { position, normal, uv, color: [1.0; 3] }
    }

    /// Vertex layout with location 0..=3 for position, normal, uv and color.
    pub fn input_description(binding: vkuint) -> VertexInputSCI {

        let attribute = |location: vkuint, format: vk::Format, offset: usize| vk::VertexInputAttributeDescription {
            location, binding, format,
            offset: offset as _,
        };

        VertexInputSCI::new()
            .add_binding(vk::VertexInputBindingDescription {
                binding,
                stride: ::std::mem::size_of::<MeshVertex>() as _,
                input_rate: vk::VertexInputRate::VERTEX,
            })
            .add_attribute(attribute(0, vk::Format::R32G32B32_SFLOAT, offset_of!(MeshVertex, position)))
            .add_attribute(attribute(1, vk::Format::R32G32B32_SFLOAT, offset_of!(MeshVertex, normal)))
            .add_attribute(attribute(2, vk::Format::R32G32_SFLOAT,    offset_of!(MeshVertex, uv)))
            .add_attribute(attribute(3, vk::Format::R32G32B32_SFLOAT, offset_of!(MeshVertex, color)))
    }
}

/// Triangle list geometry.
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    pub vertices: Vec<MeshVertex>,
    pub indices : Vec<u32>,
}

impl Mesh {

    /// Paint every vertex with `color`.
    pub fn colored(mut self, color: [f32; 3]) -> Mesh {
        self.vertices.iter_mut().for_each(|v| v.color = color); self
    }

    /// Move every vertex by `offset`.
    pub fn translated(mut self, offset: [f32; 3]) -> Mesh {

        for vertex in self.vertices.iter_mut() {
            for axis in 0..3 {
                vertex.position[axis] += offset[axis];
            }
        }
        self
    }

    /// Append `other`, rebasing its indices.
    pub fn merge(mut self, other: Mesh) -> Mesh {

        let base = self.vertices.len() as u32;
        self.vertices.extend(other.vertices);
        self.indices.extend(other.indices.into_iter().map(|i| i + base));
        self
    }
}

/// An axis aligned cube centered at the origin, each face has its own vertices.
pub fn cube(size: f32) -> Mesh {

    let h = size * 0.5;
    // (normal, tangent u, tangent v) of each face.
    let faces: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
        ([ 1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
        ([-1.0, 0.0, 0.0], [0.0, 0.0,  1.0], [0.0, 1.0, 0.0]),
        ([0.0,  1.0, 0.0], [1.0, 0.0,  0.0], [0.0, 0.0, -1.0]),
        ([0.0, -1.0, 0.0], [1.0, 0.0,  0.0], [0.0, 0.0,  1.0]),
        ([0.0, 0.0,  1.0], [1.0, 0.0,  0.0], [0.0, 1.0, 0.0]),
        ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
    ];

    let mut mesh = Mesh::default();
    for (normal, u, v) in faces.iter() {

        let base = mesh.vertices.len() as u32;
        for &(su, sv) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)].iter() {
            let position = [
                (normal[0] + u[0] * su + v[0] * sv) * h,
                (normal[1] + u[1] * su + v[1] * sv) * h,
                (normal[2] + u[2] * su + v[2] * sv) * h,
            ];
            let uv = [(su + 1.0) * 0.5, 1.0 - (sv + 1.0) * 0.5];
            mesh.vertices.push(MeshVertex::new(position, *normal, uv));
        }
        mesh.indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }
    mesh
}

/// A square in the XZ plane facing +Y.
pub fn plane(size: f32) -> Mesh {
    grid(size, size, 1, 1)
}

/// A `width` x `depth` grid in the XZ plane facing +Y with `nx` x `nz` cells.
pub fn grid(width: f32, depth: f32, nx: u32, nz: u32) -> Mesh {

    let (nx, nz) = (nx.max(1), nz.max(1));
    let mut mesh = Mesh::default();

    for z in 0..=nz {
        for x in 0..=nx {
            let (u, v) = (x as f32 / nx as f32, z as f32 / nz as f32);
            let position = [(u - 0.5) * width, 0.0, (v - 0.5) * depth];
            mesh.vertices.push(MeshVertex::new(position, [0.0, 1.0, 0.0], [u, v]));
        }
    }

    let row = nx + 1;
    for z in 0..nz {
        for x in 0..nx {
            let i = z * row + x;
            // counter clockwise when seen from above.
            mesh.indices.extend_from_slice(&[i, i + row, i + 1, i + 1, i + row, i + row + 1]);
        }
    }
    mesh
}

/// A sphere with `segments` slices around the Y axis and `rings` stacks from pole to pole.
pub fn uv_sphere(radius: f32, segments: u32, rings: u32) -> Mesh {

    let (segments, rings) = (segments.max(3), rings.max(2));
    let mut mesh = Mesh::default();

    for ring in 0..=rings {
        let theta = PI * ring as f32 / rings as f32;
        for segment in 0..=segments {
            let phi = 2.0 * PI * segment as f32 / segments as f32;
            let normal = [theta.sin() * phi.cos(), theta.cos(), theta.sin() * phi.sin()];
            let position = [normal[0] * radius, normal[1] * radius, normal[2] * radius];
            let uv = [segment as f32 / segments as f32, ring as f32 / rings as f32];
            mesh.vertices.push(MeshVertex::new(position, normal, uv));
        }
    }

    let row = segments + 1;
    for ring in 0..rings {
        for segment in 0..segments {
            let i = ring * row + segment;
            mesh.indices.extend_from_slice(&[i, i + 1, i + row, i + 1, i + row + 1, i + row]);
        }
    }
    mesh
}

/// A mesh uploaded to device local vertex and index buffers.
pub struct MeshBuffer {

    pub vertices: VmaBuffer,
    pub indices : VmaBuffer,
    pub index_count: vkuint,
}

impl MeshBuffer {

    pub fn upload(device: &VkDevice, pool: vk::CommandPool, queue: vk::Queue, mesh: &Mesh) -> VkResult<MeshBuffer> {

        MeshBuffer::upload_with_usage(device, pool, queue, mesh, vk::BufferUsageFlags::empty())
    }

    /// Upload with `extra_usage` added to both buffers, e.g. for acceleration structure inputs.
    pub fn upload_with_usage(device: &VkDevice, pool: vk::CommandPool, queue: vk::Queue, mesh: &Mesh, extra_usage: vk::BufferUsageFlags) -> VkResult<MeshBuffer> {

        let vertices = device_buffer_with_data(device, pool, queue, vk::BufferUsageFlags::VERTEX_BUFFER | extra_usage, &mesh.vertices)?;
        let indices  = device_buffer_with_data(device, pool, queue, vk::BufferUsageFlags::INDEX_BUFFER | extra_usage, &mesh.indices)?;

        let buffer = MeshBuffer { vertices, indices, index_count: mesh.indices.len() as _ };
        Ok(buffer)
    }

    pub fn draw(&self, recorder: &VkCmdRecorder<IGraphics>, instance_count: vkuint) {

        recorder
            .bind_vertex_buffers(0, &[self.vertices.handle], &[0 as vkbytes])
            .bind_index_buffer(self.indices.handle, vk::IndexType::UINT32, 0)
            .draw_indexed(self.index_count, instance_count, 0, 0, 0);
    }

    pub fn discard_by(&mut self, device: &VkDevice) -> VkResult<()> {

        device.vma_discard(&mut self.vertices)?;
        device.vma_discard(&mut self.indices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn indices_in_range(mesh: &Mesh) -> bool {
        mesh.indices.iter().all(|&i| (i as usize) < mesh.vertices.len())
    }

    #[test]
    fn cube_faces_point_outwards() {

        let mesh = cube(2.0);
        assert_eq!(mesh.vertices.len(), 24);
        assert_eq!(mesh.indices.len(), 36);
        assert!(indices_in_range(&mesh));

        for vertex in mesh.vertices.iter() {
            let dot: f32 = (0..3).map(|i| vertex.position[i] * vertex.normal[i]).sum();
            assert_relative_eq!(dot, 1.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn grid_counts_and_winding() {

        let mesh = grid(4.0, 2.0, 4, 2);
        assert_eq!(mesh.vertices.len(), 15);
        assert_eq!(mesh.indices.len(), 4 * 2 * 6);
        assert!(indices_in_range(&mesh));

        // the first triangle faces +Y.
        let p = |i: u32| Vec3::from(mesh.vertices[i as usize].position);
        let (a, b, c) = (p(mesh.indices[0]), p(mesh.indices[1]), p(mesh.indices[2]));
        assert!((b - a).cross(&(c - a)).y > 0.0);
    }

    #[test]
    fn sphere_vertices_lie_on_radius() {

        let mesh = uv_sphere(3.0, 16, 8);
        assert!(indices_in_range(&mesh));
        for vertex in mesh.vertices.iter() {
            assert_relative_eq!(Vec3::from(vertex.position).norm(), 3.0, epsilon = 1e-4);
        }
    }

    #[test]
    fn merged_indices_are_rebased() {

        let merged = cube(1.0).merge(plane(1.0).translated([0.0, -1.0, 0.0]).colored([0.5; 3]));
        assert_eq!(merged.vertices.len(), 28);
        assert_eq!(*merged.indices.last().unwrap(), 24 + 3);
        assert!(indices_in_range(&merged));
        assert_eq!(merged.vertices[24].color, [0.5; 3]);
    }

    type Vec3 = crate::math::Vec3F;
}
