
use ash::vk;

use crate::context::{VkDevice, VkObjectDiscardable, VkObjectBindable};
use crate::ci::{VulkanCI, VkObjectBuildableCI};
use crate::error::{VkResult, VkError};
use crate::{vkuint, vkbytes};

// ----------------------------------------------------------------------------------------------
/// Wrapper class for vk::BufferCreateInfo.
#[derive(Debug, Clone)]
pub struct BufferCI {

    inner: vk::BufferCreateInfo,
    queue_families: Vec<vkuint>,
}

impl VulkanCI<vk::BufferCreateInfo> for BufferCI {

    fn default_ci() -> vk::BufferCreateInfo {

        vk::BufferCreateInfo {
            size  : 0,
            usage : vk::BufferUsageFlags::empty(),
            sharing_mode: vk::SharingMode::EXCLUSIVE,
            ..Default::default()
        }
    }
}

impl VkObjectBuildableCI for BufferCI {
    type ObjectType = (vk::Buffer, vk::MemoryRequirements);

    /// Create a buffer without memory, and return it with its memory requirement.
    fn build(&self, device: &VkDevice) -> VkResult<Self::ObjectType> {

        let buffer = unsafe {
            device.logic.handle.create_buffer(&self.value(), None)
                .map_err(|_| VkError::create("Buffer"))?
        };

        let requirement = unsafe {
            device.logic.handle.get_buffer_memory_requirements(buffer)
        };

        Ok((buffer, requirement))
    }
}

impl BufferCI {

    pub fn new(size: vkbytes) -> BufferCI {

        BufferCI {
            inner: vk::BufferCreateInfo {
                size,
                ..BufferCI::default_ci()
            },
            queue_families: Vec::new(),
        }
    }

    pub fn value(&self) -> vk::BufferCreateInfo {

        vk::BufferCreateInfo {
            queue_family_index_count: self.queue_families.len() as _,
            p_queue_family_indices  : self.queue_families.as_ptr(),
            ..self.inner
        }
    }

    #[inline(always)]
    pub fn flags(mut self, flags: vk::BufferCreateFlags) -> BufferCI {
        self.inner.flags = flags; self
    }

    #[inline(always)]
    pub fn usage(mut self, flags: vk::BufferUsageFlags) -> BufferCI {
        self.inner.usage = flags; self
    }

    /// Share the buffer between several queue families.
    ///
    /// Sharing mode falls back to exclusive when all the families are the same.
    pub fn sharing_queues(mut self, mut families_indices: Vec<vkuint>) -> BufferCI {

        families_indices.sort_unstable();
        families_indices.dedup();

        if families_indices.len() > 1 {
            self.inner.sharing_mode = vk::SharingMode::CONCURRENT;
            self.queue_families = families_indices;
        } else {
            self.inner.sharing_mode = vk::SharingMode::EXCLUSIVE;
            self.queue_families.clear();
        }
        self
    }

    #[inline]
    pub fn size(&self) -> vkbytes {
        self.inner.size
    }
}

impl VkObjectDiscardable for vk::Buffer {

    fn discard_by(self, device: &VkDevice) {
        unsafe {
            device.logic.handle.destroy_buffer(self, None)
        }
    }
}

impl VkObjectBindable for vk::Buffer {

    fn bind(self, device: &VkDevice, memory: vk::DeviceMemory, offset: vkbytes) -> VkResult<()> {
        unsafe {
            device.logic.handle.bind_buffer_memory(self, memory, offset)
                .map_err(|_| VkError::device("Binding Buffer Memory"))
        }
    }
}
// ----------------------------------------------------------------------------------------------

// ----------------------------------------------------------------------------------------------
/// Wrapper class for vk::BufferMemoryBarrier.
#[derive(Debug, Clone)]
pub struct BufferBarrierCI {
    inner: vk::BufferMemoryBarrier,
}

impl VulkanCI<vk::BufferMemoryBarrier> for BufferBarrierCI {

    fn default_ci() -> vk::BufferMemoryBarrier {

        vk::BufferMemoryBarrier {
            src_queue_family_index: vk::QUEUE_FAMILY_IGNORED,
            dst_queue_family_index: vk::QUEUE_FAMILY_IGNORED,
            offset: 0,
            size  : vk::WHOLE_SIZE,
            ..Default::default()
        }
    }
}

impl BufferBarrierCI {

    pub fn new(buffer: vk::Buffer, size: vkbytes) -> BufferBarrierCI {

        BufferBarrierCI {
            inner: vk::BufferMemoryBarrier {
                buffer, size,
                ..BufferBarrierCI::default_ci()
            },
        }
    }

    #[inline(always)]
    pub fn value(&self) -> vk::BufferMemoryBarrier {
        self.inner
    }

    #[inline(always)]
    pub fn access_mask(mut self, from: vk::AccessFlags, to: vk::AccessFlags) -> BufferBarrierCI {
        self.inner.src_access_mask = from;
        self.inner.dst_access_mask = to; self
    }

    /// Transfer the ownership of buffer from queue family `from` to `to`.
    #[inline(always)]
    pub fn queue_family_index(mut self, from: vkuint, to: vkuint) -> BufferBarrierCI {
        self.inner.src_queue_family_index = from;
        self.inner.dst_queue_family_index = to; self
    }
}

impl From<BufferBarrierCI> for vk::BufferMemoryBarrier {

    fn from(value: BufferBarrierCI) -> vk::BufferMemoryBarrier {
        value.inner
    }
}
// ----------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sharing_same_family_stays_exclusive() {

        let ci = BufferCI::new(64).sharing_queues(vec![2, 2]);
        assert_eq!(ci.value().sharing_mode, vk::SharingMode::EXCLUSIVE);
        assert_eq!(ci.value().queue_family_index_count, 0);

        let ci = BufferCI::new(64).sharing_queues(vec![1, 0, 1]);
        let value = ci.value();
        assert_eq!(value.sharing_mode, vk::SharingMode::CONCURRENT);
        assert_eq!(value.queue_family_index_count, 2);
    }

    #[test]
    fn barrier_defaults_cover_whole_buffer() {

        let barrier = BufferBarrierCI::new(vk::Buffer::null(), vk::WHOLE_SIZE).value();
        assert_eq!(barrier.size, vk::WHOLE_SIZE);
        assert_eq!(barrier.src_queue_family_index, vk::QUEUE_FAMILY_IGNORED);
    }
}
