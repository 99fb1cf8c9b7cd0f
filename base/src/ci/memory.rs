//! Raw `vk::DeviceMemory` allocation, for the resources the vma allocator does not cover.

use ash::vk;

use crate::context::{VkDevice, VkObjectDiscardable};
use crate::ci::{VulkanCI, VkObjectBuildableCI};
use crate::error::{VkResult, VkError};
use crate::{vkuint, vkbytes};

use std::os::raw::c_void;
use std::ptr;

// ----------------------------------------------------------------------------------------------
/// Wrapper class for `vk::MemoryAllocateInfo`, optionally chained with `vk::MemoryAllocateFlagsInfo`.
#[derive(Debug, Clone)]
pub struct MemoryAI {

    inner: vk::MemoryAllocateInfo,
    allocate_flags: vk::MemoryAllocateFlags,
}

impl VulkanCI<vk::MemoryAllocateInfo> for MemoryAI {

    fn default_ci() -> vk::MemoryAllocateInfo {
        vk::MemoryAllocateInfo::default()
    }
}

impl VkObjectBuildableCI for MemoryAI {
    type ObjectType = vk::DeviceMemory;

    fn build(&self, device: &VkDevice) -> VkResult<vk::DeviceMemory> {

        let flags_info = vk::MemoryAllocateFlagsInfo {
            flags: self.allocate_flags,
            ..Default::default()
        };

        let allocate_info = vk::MemoryAllocateInfo {
            p_next: if self.allocate_flags.is_empty() {
                ptr::null()
            } else {
                &flags_info as *const vk::MemoryAllocateFlagsInfo as *const c_void
            },
            ..self.inner
        };

        unsafe {
            device.logic.handle.allocate_memory(&allocate_info, None)
                .map_err(|_| VkError::create("Device Memory"))
        }
    }
}

impl MemoryAI {

    /// `memory_type_index` usually comes from `utils::memory::get_memory_type_index`.
    pub fn new(allocation_size: vkbytes, memory_type_index: vkuint) -> MemoryAI {

        MemoryAI {
            inner: vk::MemoryAllocateInfo {
                allocation_size, memory_type_index,
                ..MemoryAI::default_ci()
            },
            allocate_flags: vk::MemoryAllocateFlags::empty(),
        }
    }

    /// Required for the memory of buffers whose address is queried by `VkDevice::buffer_address`.
    pub fn with_device_address(mut self) -> MemoryAI {
        self.allocate_flags |= vk::MemoryAllocateFlags::DEVICE_ADDRESS; self
    }
}

impl VkObjectDiscardable for vk::DeviceMemory {

    fn discard_by(self, device: &VkDevice) {
        unsafe {
            device.logic.handle.free_memory(self, None);
        }
    }
}
// ----------------------------------------------------------------------------------------------
