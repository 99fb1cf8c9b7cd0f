
use ash::vk;

use crate::context::VkDevice;
use crate::context::{VkObjectDiscardable, VkObjectWaitable};
use crate::ci::{VulkanCI, VkObjectBuildableCI};
use crate::error::{VkResult, VkError};
use crate::utils::time::VkTimeDuration;

// ----------------------------------------------------------------------------------------------
/// Wrapper class for `vk::SemaphoreCreateInfo`.
#[derive(Debug, Clone)]
pub struct SemaphoreCI {
    inner: vk::SemaphoreCreateInfo,
}

impl VulkanCI<vk::SemaphoreCreateInfo> for SemaphoreCI {

    fn default_ci() -> vk::SemaphoreCreateInfo {
        vk::SemaphoreCreateInfo::default()
    }
}

impl VkObjectBuildableCI for SemaphoreCI {
    type ObjectType = vk::Semaphore;

    fn build(&self, device: &VkDevice) -> VkResult<Self::ObjectType> {

        let semaphore = unsafe {
            device.logic.handle.create_semaphore(&self.inner, None)
                .map_err(|_| VkError::create("Semaphore"))?
        };
        Ok(semaphore)
    }
}

impl SemaphoreCI {

    pub fn new() -> SemaphoreCI {
        SemaphoreCI { inner: SemaphoreCI::default_ci() }
    }
}

impl VkObjectDiscardable for vk::Semaphore {

    fn discard_by(self, device: &VkDevice) {
        unsafe {
            device.logic.handle.destroy_semaphore(self, None);
        }
    }
}
// ----------------------------------------------------------------------------------------------

// ----------------------------------------------------------------------------------------------
/// Wrapper class for `vk::FenceCreateInfo`.
#[derive(Debug, Clone)]
pub struct FenceCI {
    inner: vk::FenceCreateInfo,
}

impl VulkanCI<vk::FenceCreateInfo> for FenceCI {

    fn default_ci() -> vk::FenceCreateInfo {
        vk::FenceCreateInfo::default()
    }
}

impl VkObjectBuildableCI for FenceCI {
    type ObjectType = vk::Fence;

    fn build(&self, device: &VkDevice) -> VkResult<Self::ObjectType> {

        let fence = unsafe {
            device.logic.handle.create_fence(&self.inner, None)
                .map_err(|_| VkError::create("Fence"))?
        };
        Ok(fence)
    }
}

impl FenceCI {

    /// `is_signed` creates the fence in signaled state, so that the first wait returns immediately.
    pub fn new(is_signed: bool) -> FenceCI {

        let mut fence = FenceCI { inner: FenceCI::default_ci() };

        if is_signed {
            fence.inner.flags = vk::FenceCreateFlags::SIGNALED;
        }

        fence
    }
}

impl VkObjectDiscardable for vk::Fence {

    fn discard_by(self, device: &VkDevice) {
        unsafe {
            device.logic.handle.destroy_fence(self, None);
        }
    }
}

impl VkObjectWaitable for vk::Fence {

    fn wait(self, device: &VkDevice, time: VkTimeDuration) -> VkResult<()> {
        unsafe {
            device.logic.handle.wait_for_fences(&[self], true, time.into())
                .map_err(|_| VkError::device("Wait for fences"))
        }
    }
}

impl VkObjectWaitable for &[vk::Fence] {

    fn wait(self, device: &VkDevice, time: VkTimeDuration) -> VkResult<()> {

        if self.is_empty() {
            return Ok(())
        }

        unsafe {
            device.logic.handle.wait_for_fences(self, true, time.into())
                .map_err(|_| VkError::device("Wait for fences"))
        }
    }
}
// ----------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fence_signal_state() {
        assert_eq!(FenceCI::new(true).inner.flags, vk::FenceCreateFlags::SIGNALED);
        assert!(FenceCI::new(false).inner.flags.is_empty());
    }
}
