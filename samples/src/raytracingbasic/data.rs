
use ash::vk;

use vkbase::command::ShaderBindingRegions;
use vkbase::utils::memory::bound_to_alignment;
use vkbase::{Mat4F, vkuint, vkbytes};

pub const TRIANGLE_VERTICES: [[f32; 3]; 3] = [
    [ 1.0,  1.0, 0.0],
    [-1.0,  1.0, 0.0],
    [ 0.0, -1.0, 0.0],
];
pub const TRIANGLE_INDICES: [u32; 3] = [0, 1, 2];

/// Number of shader groups of each kind, in the order they are declared in the pipeline.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct ShaderGroups {
    pub raygen: vkuint,
    pub miss  : vkuint,
    pub hit   : vkuint,
}

impl ShaderGroups {

    pub fn total(&self) -> vkuint {
        self.raygen + self.miss + self.hit
    }
}

/// One region of the shader binding table, relative to the start of the table.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct SbtRegion {
    pub offset: vkbytes,
    pub stride: vkbytes,
    pub size  : vkbytes,
}

impl SbtRegion {

    fn at(&self, table_address: vk::DeviceAddress) -> vk::StridedDeviceAddressRegionKHR {
        vk::StridedDeviceAddressRegionKHR {
            device_address: table_address + self.offset,
            stride: self.stride,
            size  : self.size,
        }
    }
}

/// Placement of the shader group handles in the shader binding table.
///
/// Each region starts at a multiple of `base_alignment`, and each record in a region
/// at a multiple of `handle_alignment`.
/// The raygen region holds a single record, so its size equals its stride.
#[derive(Debug, Clone, Copy)]
pub struct ShaderBindingTableLayout {
    pub handle_size: vkuint,
    pub groups: ShaderGroups,
    pub raygen: SbtRegion,
    pub miss  : SbtRegion,
    pub hit   : SbtRegion,
    pub total_size: vkbytes,
}

impl ShaderBindingTableLayout {

    pub fn new(handle_size: vkuint, handle_alignment: vkuint, base_alignment: vkuint, groups: ShaderGroups) -> ShaderBindingTableLayout {

        debug_assert_eq!(groups.raygen, 1, "vkCmdTraceRaysKHR accepts exactly one raygen record");

        let base_alignment = base_alignment as vkbytes;
        let record_stride = bound_to_alignment(handle_size as vkbytes, handle_alignment as vkbytes);

        let raygen_stride = bound_to_alignment(record_stride, base_alignment);
        let raygen = SbtRegion { offset: 0, stride: raygen_stride, size: raygen_stride };

        let region_after = |previous: &SbtRegion, count: vkuint| SbtRegion {
            offset: previous.offset + previous.size,
            stride: record_stride,
            size  : bound_to_alignment(record_stride * count as vkbytes, base_alignment),
        };
        let miss = region_after(&raygen, groups.miss);
        let hit = region_after(&miss, groups.hit);

        ShaderBindingTableLayout {
            handle_size, groups, raygen, miss, hit,
            total_size: hit.offset + hit.size,
        }
    }

    /// Scatter the tightly packed `handles` returned by `vkGetRayTracingShaderGroupHandlesKHR`
    /// into the bytes of the table.
    pub fn arrange_handles(&self, handles: &[u8]) -> Vec<u8> {

        let handle_size = self.handle_size as usize;
        debug_assert!(handles.len() >= handle_size * self.groups.total() as usize);

        let mut table = vec![0_u8; self.total_size as usize];
        let mut group = 0_usize;

        for &(region, count) in [(self.raygen, self.groups.raygen), (self.miss, self.groups.miss), (self.hit, self.groups.hit)].iter() {
            for record in 0..count as usize {
                let dst = region.offset as usize + record * region.stride as usize;
                let src = group * handle_size;
                table[dst..(dst + handle_size)].copy_from_slice(&handles[src..(src + handle_size)]);
                group += 1;
            }
        }

        table
    }

    /// The regions of the table stored at `table_address`, no callable shaders are used.
    pub fn regions(&self, table_address: vk::DeviceAddress) -> ShaderBindingRegions {
        ShaderBindingRegions {
            raygen  : self.raygen.at(table_address),
            miss    : self.miss.at(table_address),
            hit     : self.hit.at(table_address),
            callable: vk::StridedDeviceAddressRegionKHR::default(),
        }
    }
}

/// The upper 3x4 part of `matrix` in row-major order, as an acceleration structure instance expects it.
pub fn transform_matrix(matrix: &Mat4F) -> vk::TransformMatrixKHR {

    let mut rows = [0.0_f32; 12];
    for row in 0..3 {
        for column in 0..4 {
            rows[row * 4 + column] = matrix[(row, column)];
        }
    }
    vk::TransformMatrixKHR { matrix: rows }
}

/// Uniform block of the raygen shader, it unprojects pixels back to world space rays.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct UboCamera {
    pub view_inverse: Mat4F,
    pub proj_inverse: Mat4F,
}

impl UboCamera {

    pub fn new(view: &Mat4F, projection: &Mat4F) -> UboCamera {
        UboCamera {
            view_inverse: view.try_inverse().unwrap_or_else(Mat4F::identity),
            proj_inverse: projection.try_inverse().unwrap_or_else(Mat4F::identity),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vkbase::Vec3F;

    const GROUPS: ShaderGroups = ShaderGroups { raygen: 1, miss: 1, hit: 1 };

    #[test]
    fn regions_respect_alignments() {

        // a common layout on desktop hardware.
        let layout = ShaderBindingTableLayout::new(32, 32, 64, GROUPS);

        assert_eq!(layout.raygen, SbtRegion { offset: 0, stride: 64, size: 64 });
        assert_eq!(layout.miss, SbtRegion { offset: 64, stride: 32, size: 64 });
        assert_eq!(layout.hit, SbtRegion { offset: 128, stride: 32, size: 64 });
        assert_eq!(layout.total_size, 192);

        let layout = ShaderBindingTableLayout::new(24, 16, 128, ShaderGroups { raygen: 1, miss: 2, hit: 5 });
        for region in [layout.raygen, layout.miss, layout.hit].iter() {
            assert_eq!(region.offset % 128, 0);
            assert_eq!(region.stride % 16, 0);
            assert!(region.stride >= 24);
        }
        assert!(layout.miss.size >= 2 * layout.miss.stride);
        assert!(layout.hit.size >= 5 * layout.hit.stride);
        assert_eq!(layout.raygen.size, layout.raygen.stride);
    }

    #[test]
    fn handles_are_placed_at_their_records() {

        let layout = ShaderBindingTableLayout::new(4, 8, 16, ShaderGroups { raygen: 1, miss: 2, hit: 1 });
        let handles: Vec<u8> = (1..=16).collect();

        let table = layout.arrange_handles(&handles);
        assert_eq!(table.len() as vkbytes, layout.total_size);

        assert_eq!(&table[0..4], &[1, 2, 3, 4]);
        let miss = layout.miss.offset as usize;
        assert_eq!(&table[miss..miss + 4], &[5, 6, 7, 8]);
        assert_eq!(&table[miss + 8..miss + 12], &[9, 10, 11, 12]);
        let hit = layout.hit.offset as usize;
        assert_eq!(&table[hit..hit + 4], &[13, 14, 15, 16]);
        // padding stays zeroed.
        assert!(table[4..miss].iter().all(|&b| b == 0));
    }

    #[test]
    fn regions_are_offset_by_table_address() {

        let layout = ShaderBindingTableLayout::new(32, 32, 64, GROUPS);
        let regions = layout.regions(0x1000);

        assert_eq!(regions.raygen.device_address, 0x1000);
        assert_eq!(regions.miss.device_address, 0x1000 + 64);
        assert_eq!(regions.hit.device_address, 0x1000 + 128);
        assert_eq!(regions.callable.size, 0);
    }

    #[test]
    fn transform_is_row_major() {

        let matrix = Mat4F::new_translation(&Vec3F::new(1.0, 2.0, 3.0));
        let transform = transform_matrix(&matrix);

        assert_eq!(transform.matrix, [
            1.0, 0.0, 0.0, 1.0,
            0.0, 1.0, 0.0, 2.0,
            0.0, 0.0, 1.0, 3.0,
        ]);
    }
}
