//! Types which simplify the creation of Vulkan descriptor objects.

use ash::vk;

use crate::context::VkDevice;
use crate::context::{VkObjectDiscardable, VkObjectAllocatable};
use crate::ci::{VulkanCI, VkObjectBuildableCI};
use crate::error::{VkResult, VkError};
use crate::vkuint;

use std::marker::PhantomData;

// ----------------------------------------------------------------------------------------------
/// Wrapper class for `vk::DescriptorPoolCreateInfo`.
#[derive(Debug, Clone)]
pub struct DescriptorPoolCI {

    inner: vk::DescriptorPoolCreateInfo,
    pool_sizes: Vec<vk::DescriptorPoolSize>,
}

impl VulkanCI<vk::DescriptorPoolCreateInfo> for DescriptorPoolCI {

    fn default_ci() -> vk::DescriptorPoolCreateInfo {

        vk::DescriptorPoolCreateInfo {
            max_sets: 0,
            ..Default::default()
        }
    }
}

impl VkObjectBuildableCI for DescriptorPoolCI {
    type ObjectType = vk::DescriptorPool;

    fn build(&self, device: &VkDevice) -> VkResult<Self::ObjectType> {

        debug_assert!(!self.pool_sizes.is_empty(), "The count of pool sizes must be greater than 0!");

        let pool_ci = vk::DescriptorPoolCreateInfo {
            pool_size_count: self.pool_sizes.len() as _,
            p_pool_sizes   : self.pool_sizes.as_ptr(),
            ..self.inner
        };

        let descriptor_pool = unsafe {
            device.logic.handle.create_descriptor_pool(&pool_ci, None)
                .map_err(|_| VkError::create("Descriptor Pool"))?
        };
        Ok(descriptor_pool)
    }
}

impl DescriptorPoolCI {

    /// `max_set_count` is the maximum number of descriptor sets that this descriptor pool may allocated.
    pub fn new(max_set_count: vkuint) -> DescriptorPoolCI {

        debug_assert!(max_set_count > 0, "max_set_count must be greater than 0!");

        DescriptorPoolCI {
            inner: vk::DescriptorPoolCreateInfo {
                max_sets: max_set_count,
                ..DescriptorPoolCI::default_ci()
            },
            pool_sizes: Vec::new(),
        }
    }

    #[inline(always)]
    pub fn flags(mut self, flags: vk::DescriptorPoolCreateFlags) -> DescriptorPoolCI {
        self.inner.flags = flags; self
    }

    /// Allow `count` descriptors of `ty` to be allocated from this pool.
    #[inline]
    pub fn add_descriptor(mut self, ty: vk::DescriptorType, count: vkuint) -> DescriptorPoolCI {

        debug_assert!(count > 0, "The count of descriptor must be greater than 0!");

        match self.pool_sizes.iter_mut().find(|size| size.ty == ty) {
            | Some(size) => size.descriptor_count += count,
            | None => self.pool_sizes.push(vk::DescriptorPoolSize { ty, descriptor_count: count }),
        }
        self
    }
}

impl VkObjectDiscardable for vk::DescriptorPool {

    fn discard_by(self, device: &VkDevice) {
        unsafe {
            device.logic.handle.destroy_descriptor_pool(self, None);
        }
    }
}
// ----------------------------------------------------------------------------------------------


// ----------------------------------------------------------------------------------------------
/// Wrapper class for `vk::DescriptorSetLayoutCreateInfo`.
#[derive(Debug, Clone)]
pub struct DescriptorSetLayoutCI {

    inner: vk::DescriptorSetLayoutCreateInfo,
    bindings: Vec<vk::DescriptorSetLayoutBinding>,
}

impl VulkanCI<vk::DescriptorSetLayoutCreateInfo> for DescriptorSetLayoutCI {

    fn default_ci() -> vk::DescriptorSetLayoutCreateInfo {
        vk::DescriptorSetLayoutCreateInfo::default()
    }
}

impl VkObjectBuildableCI for DescriptorSetLayoutCI {
    type ObjectType = vk::DescriptorSetLayout;

    fn build(&self, device: &VkDevice) -> VkResult<Self::ObjectType> {

        let layout_ci = vk::DescriptorSetLayoutCreateInfo {
            binding_count: self.bindings.len() as _,
            p_bindings   : self.bindings.as_ptr(),
            ..self.inner
        };

        let descriptor_set_layout = unsafe {
            device.logic.handle.create_descriptor_set_layout(&layout_ci, None)
                .map_err(|_| VkError::create("Descriptor Set Layout"))?
        };
        Ok(descriptor_set_layout)
    }
}

impl DescriptorSetLayoutCI {

    #[inline(always)]
    pub fn new() -> DescriptorSetLayoutCI {

        DescriptorSetLayoutCI {
            inner: DescriptorSetLayoutCI::default_ci(),
            bindings: Vec::new(),
        }
    }

    #[inline(always)]
    pub fn add_binding(mut self, binding: vk::DescriptorSetLayoutBinding) -> DescriptorSetLayoutCI {
        self.bindings.push(binding); self
    }

    /// Add a binding of one descriptor at the next binding index.
    pub fn add_descriptor(self, ty: vk::DescriptorType, stages: vk::ShaderStageFlags) -> DescriptorSetLayoutCI {

        let binding = self.bindings.len() as vkuint;
        self.add_binding(vk::DescriptorSetLayoutBinding {
            binding,
            descriptor_type: ty,
            descriptor_count: 1,
            stage_flags: stages,
            ..Default::default()
        })
    }

    #[inline(always)]
    pub fn flags(mut self, flags: vk::DescriptorSetLayoutCreateFlags) -> DescriptorSetLayoutCI {
        self.inner.flags = flags; self
    }
}

impl VkObjectDiscardable for vk::DescriptorSetLayout {

    fn discard_by(self, device: &VkDevice) {
        unsafe {
            device.logic.handle.destroy_descriptor_set_layout(self, None);
        }
    }
}
// ----------------------------------------------------------------------------------------------

// ----------------------------------------------------------------------------------------------
/// Wrapper class for `vk::DescriptorSetAllocateInfo`.
#[derive(Debug, Clone)]
pub struct DescriptorSetAI {

    inner: vk::DescriptorSetAllocateInfo,
    set_layouts: Vec<vk::DescriptorSetLayout>,
}

impl VulkanCI<vk::DescriptorSetAllocateInfo> for DescriptorSetAI {

    fn default_ci() -> vk::DescriptorSetAllocateInfo {
        vk::DescriptorSetAllocateInfo::default()
    }
}

impl VkObjectBuildableCI for DescriptorSetAI {
    type ObjectType = Vec<vk::DescriptorSet>;

    fn build(&self, device: &VkDevice) -> VkResult<Self::ObjectType> {

        debug_assert!(!self.set_layouts.is_empty(), "Descriptor sets count must be greater than 0!");

        let allocate_info = vk::DescriptorSetAllocateInfo {
            descriptor_set_count: self.set_layouts.len() as _,
            p_set_layouts       : self.set_layouts.as_ptr(),
            ..self.inner
        };

        let descriptor_sets = unsafe {
            device.logic.handle.allocate_descriptor_sets(&allocate_info)
                .map_err(|_| VkError::create("Allocate Descriptor Set"))?
        };
        Ok(descriptor_sets)
    }
}

impl DescriptorSetAI {

    /// `pool` is the pool where these sets will be allocated from.
    pub fn new(pool: vk::DescriptorPool) -> DescriptorSetAI {

        DescriptorSetAI {
            inner: vk::DescriptorSetAllocateInfo {
                descriptor_pool: pool,
                ..DescriptorSetAI::default_ci()
            },
            set_layouts: Vec::new(),
        }
    }

    #[inline(always)]
    pub fn add_set_layout(mut self, set_layout: vk::DescriptorSetLayout) -> DescriptorSetAI {
        self.set_layouts.push(set_layout); self
    }
}

impl VkObjectAllocatable for &[vk::DescriptorSet] {
    type AllocatePool = vk::DescriptorPool;

    fn free(self, device: &VkDevice, pool: Self::AllocatePool) {
        let result = unsafe {
            device.logic.handle.free_descriptor_sets(pool, self)
        };
        warn_on_free_failure(result);
    }
}

/// Returns whether freeing failed. A failure is only logged, the sets go away with their pool anyway.
fn warn_on_free_failure(result: Result<(), vk::Result>) -> bool {

    match result {
        | Ok(()) => false,
        | Err(e) => {
            log::warn!("Failed to free descriptor sets({}), the pool may lack FREE_DESCRIPTOR_SET flag.", e);
            true
        },
    }
}
// ----------------------------------------------------------------------------------------------

// ----------------------------------------------------------------------------------------------
/// Wrapper class for `vk::WriteDescriptorSet` updating buffer descriptors.
#[derive(Debug)]
pub struct DescriptorBufferSetWI {

    inner: vk::WriteDescriptorSet,
    writes: Vec<vk::DescriptorBufferInfo>,
}

impl DescriptorBufferSetWI {

    /// `set` is the destination descriptor set, `binding` the binding within the set.
    pub fn new(set: vk::DescriptorSet, binding: vkuint, ty: vk::DescriptorType) -> DescriptorBufferSetWI {

        DescriptorBufferSetWI {
            inner: vk::WriteDescriptorSet {
                dst_set: set,
                dst_binding: binding,
                descriptor_type: ty,
                ..Default::default()
            },
            writes: Vec::new(),
        }
    }

    #[inline(always)]
    pub fn add_buffer(mut self, info: vk::DescriptorBufferInfo) -> DescriptorBufferSetWI {

        self.writes.push(info);
        self.inner.descriptor_count = self.writes.len() as _;
        self.inner.p_buffer_info    = self.writes.as_ptr(); self
    }

}

impl AsRef<vk::WriteDescriptorSet> for DescriptorBufferSetWI {

    fn as_ref(&self) -> &vk::WriteDescriptorSet {
        &self.inner
    }
}
// ----------------------------------------------------------------------------------------------

// ----------------------------------------------------------------------------------------------
/// Wrapper class for `vk::WriteDescriptorSet` updating image descriptors.
#[derive(Debug)]
pub struct DescriptorImageSetWI {

    inner: vk::WriteDescriptorSet,
    writes: Vec<vk::DescriptorImageInfo>,
}

impl DescriptorImageSetWI {

    pub fn new(set: vk::DescriptorSet, binding: vkuint, ty: vk::DescriptorType) -> DescriptorImageSetWI {

        DescriptorImageSetWI {
            inner: vk::WriteDescriptorSet {
                dst_set: set,
                dst_binding: binding,
                descriptor_type: ty,
                ..Default::default()
            },
            writes: Vec::new(),
        }
    }

    #[inline(always)]
    pub fn add_image(mut self, info: vk::DescriptorImageInfo) -> DescriptorImageSetWI {

        self.writes.push(info);
        self.inner.descriptor_count = self.writes.len() as _;
        self.inner.p_image_info     = self.writes.as_ptr(); self
    }

}

impl AsRef<vk::WriteDescriptorSet> for DescriptorImageSetWI {

    fn as_ref(&self) -> &vk::WriteDescriptorSet {
        &self.inner
    }
}
// ----------------------------------------------------------------------------------------------

// ----------------------------------------------------------------------------------------------
/// Wrapper class for `vk::WriteDescriptorSet` updating acceleration structure descriptors.
pub struct DescriptorAccelerationSetWI {

    inner: vk::WriteDescriptorSet,
    structures: Box<(vk::WriteDescriptorSetAccelerationStructureKHR, Vec<vk::AccelerationStructureKHR>)>,
}

impl DescriptorAccelerationSetWI {

    pub fn new(set: vk::DescriptorSet, binding: vkuint, structures: Vec<vk::AccelerationStructureKHR>) -> DescriptorAccelerationSetWI {

        let mut structures = Box::new((vk::WriteDescriptorSetAccelerationStructureKHR::default(), structures));
        structures.0.acceleration_structure_count = structures.1.len() as _;
        structures.0.p_acceleration_structures = structures.1.as_ptr();

        let inner = vk::WriteDescriptorSet {
            p_next: &structures.0 as *const vk::WriteDescriptorSetAccelerationStructureKHR as *const _,
            dst_set: set,
            dst_binding: binding,
            descriptor_count: structures.1.len() as _,
            descriptor_type: vk::DescriptorType::ACCELERATION_STRUCTURE_KHR,
            ..Default::default()
        };

        DescriptorAccelerationSetWI { inner, structures }
    }
}

impl AsRef<vk::WriteDescriptorSet> for DescriptorAccelerationSetWI {

    fn as_ref(&self) -> &vk::WriteDescriptorSet {
        &self.inner
    }
}
// ----------------------------------------------------------------------------------------------

// ----------------------------------------------------------------------------------------------
/// Collects descriptor writes, then updates them in one call.
///
/// The lifetime keeps every borrowed writer alive until `update` is called.
#[derive(Default)]
pub struct DescriptorSetsUpdateCI<'a> {

    writes: Vec<vk::WriteDescriptorSet>,

    phantom_type: PhantomData<&'a ()>,
}

pub trait DescriptorSetWritable: AsRef<vk::WriteDescriptorSet> {}

impl DescriptorSetWritable for DescriptorBufferSetWI {}
impl DescriptorSetWritable for DescriptorImageSetWI  {}
impl DescriptorSetWritable for DescriptorAccelerationSetWI {}

impl<'a> DescriptorSetsUpdateCI<'a> {

    #[inline(always)]
    pub fn new() -> DescriptorSetsUpdateCI<'a> {
        DescriptorSetsUpdateCI::default()
    }

    #[inline(always)]
    pub fn add_write(mut self, value: &'a impl DescriptorSetWritable) -> DescriptorSetsUpdateCI<'a> {
        self.writes.push(*value.as_ref()); self
    }

    pub fn update(self, device: &VkDevice) {

        unsafe {
            device.logic.handle.update_descriptor_sets(&self.writes, &[]);
        }
    }
}
// ----------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_free_is_reported() {
        assert!(!warn_on_free_failure(Ok(())));
        assert!(warn_on_free_failure(Err(vk::Result::ERROR_FRAGMENTED_POOL)));
    }

    #[test]
    fn pool_merges_sizes_of_same_type() {

        let pool = DescriptorPoolCI::new(2)
            .add_descriptor(vk::DescriptorType::UNIFORM_BUFFER, 2)
            .add_descriptor(vk::DescriptorType::COMBINED_IMAGE_SAMPLER, 1)
            .add_descriptor(vk::DescriptorType::UNIFORM_BUFFER, 3);

        assert_eq!(pool.pool_sizes.len(), 2);
        assert_eq!(pool.pool_sizes[0].descriptor_count, 5);
    }

    #[test]
    fn descriptors_get_sequential_bindings() {

        let layout = DescriptorSetLayoutCI::new()
            .add_descriptor(vk::DescriptorType::UNIFORM_BUFFER, vk::ShaderStageFlags::VERTEX)
            .add_descriptor(vk::DescriptorType::COMBINED_IMAGE_SAMPLER, vk::ShaderStageFlags::FRAGMENT);

        assert_eq!(layout.bindings[1].binding, 1);
        assert_eq!(layout.bindings[1].stage_flags, vk::ShaderStageFlags::FRAGMENT);
    }

    #[test]
    fn writes_point_to_owned_infos() {

        let write = DescriptorImageSetWI::new(vk::DescriptorSet::null(), 2, vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
            .add_image(vk::DescriptorImageInfo::default())
            .add_image(vk::DescriptorImageInfo::default());

        let raw = write.as_ref();
        assert_eq!(raw.descriptor_count, 2);
        assert_eq!(raw.p_image_info, write.writes.as_ptr());

        let accel = DescriptorAccelerationSetWI::new(vk::DescriptorSet::null(), 0, vec![vk::AccelerationStructureKHR::null()]);
        assert!(!accel.as_ref().p_next.is_null());
    }
}
