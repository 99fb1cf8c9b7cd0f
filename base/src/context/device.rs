
mod physical;
mod logical;
mod queue;

pub use self::logical::{VkLogicalDevice, VkQueue, LogicDevConfig, DeviceExtensionFeatures};
pub use self::physical::{VkPhysicalDevice, PhysicalDevConfig};

use ash::vk;

use crate::context::instance::VkInstance;
use crate::ci::VkObjectBuildableCI;
use crate::error::{VkResult, VkError, VkErrorKind};
use crate::vkbytes;

use std::mem::ManuallyDrop;

pub struct VkDevice {

    pub logic : logical::VkLogicalDevice,
    pub phy   : physical::VkPhysicalDevice,
    /// a clone of instance function table, used by extension loaders of samples.
    pub instance: ash::Instance,

    vma: ManuallyDrop<vma::Allocator>,
}

impl VkDevice {

    pub(crate) fn new(instance: &VkInstance, logic: VkLogicalDevice, phy: VkPhysicalDevice) -> VkResult<VkDevice> {

        // buffers that need device address are allocated by samples through `MemoryAI` directly.
        let allocator_ci = vma::AllocatorCreateInfo::new(&instance.handle, &logic.handle, phy.handle);
        let allocator = vma::Allocator::new(allocator_ci)
            .map_err(VkErrorKind::Vma)?;

        let device = VkDevice {
            instance: instance.handle.clone(),
            vma: ManuallyDrop::new(allocator),
            logic, phy,
        };
        Ok(device)
    }

    #[inline]
    pub fn build<T>(&self, ci: &T) -> VkResult<T::ObjectType>
        where
            T: VkObjectBuildableCI {
        ci.build(self)
    }

    #[inline]
    pub fn discard(&self, object: impl VkObjectDiscardable) {
        object.discard_by(self);
    }

    #[inline]
    pub fn vma(&self) -> &vma::Allocator {
        &self.vma
    }

    #[inline]
    pub fn vma_discard(&self, object: impl VmaResourceDiscardable) -> VkResult<()> {
        object.discard_by(&self.vma)
    }

    #[inline]
    pub fn free<T>(&self, object: T, pool: T::AllocatePool)
        where
            T: VkObjectAllocatable {
        object.free(self, pool);
    }

    #[inline]
    pub fn bind_memory(&self, object: impl VkObjectBindable, memory: vk::DeviceMemory, offset: vkbytes) -> VkResult<()> {
        object.bind(self, memory, offset)
    }

    #[inline]
    pub fn submit(&self, ci: impl VkSubmitCI, queue: vk::Queue, wait_fence: vk::Fence) -> VkResult<()> {
        ci.submit(self, queue, wait_fence)
    }

    #[inline]
    pub fn wait(&self, object: impl VkObjectWaitable, time: crate::utils::time::VkTimeDuration) -> VkResult<()> {
        object.wait(self, time)
    }

    pub fn wait_idle(&self) -> VkResult<()> {
        unsafe {
            self.logic.handle.device_wait_idle()
                .map_err(|_| VkError::device("Device Waiting Idle"))
        }
    }

    /// Query the device address of a buffer created with `SHADER_DEVICE_ADDRESS` usage.
    pub fn buffer_address(&self, buffer: vk::Buffer) -> vk::DeviceAddress {

        let address_info = vk::BufferDeviceAddressInfo {
            buffer,
            ..Default::default()
        };
        unsafe {
            self.logic.handle.get_buffer_device_address(&address_info)
        }
    }

    /// Destroy the allocator and then the logical device.
    pub(crate) fn discard_self(&mut self) {

        unsafe {
            ManuallyDrop::drop(&mut self.vma);
        }
        self.logic.discard();
    }
}

/// Vulkan handles that are destroyed by the logical device.
pub trait VkObjectDiscardable: Sized {

    fn discard_by(self, device: &VkDevice);
}

impl<T> VkObjectDiscardable for &Vec<T> where T: VkObjectDiscardable + Copy {

    fn discard_by(self, device: &VkDevice) {
        self.iter().for_each(|obj| obj.discard_by(device));
    }
}

impl<T> VkObjectDiscardable for &[T] where T: VkObjectDiscardable + Copy {

    fn discard_by(self, device: &VkDevice) {
        self.iter().for_each(|obj| obj.discard_by(device));
    }
}

/// Vulkan objects allocated from a pool.
pub trait VkObjectAllocatable {
    type AllocatePool: Copy;

    fn free(self, device: &VkDevice, pool: Self::AllocatePool);
}

pub trait VkObjectBindable: Copy {

    fn bind(self, device: &VkDevice, memory: vk::DeviceMemory, offset: vkbytes) -> VkResult<()>;
}

pub trait VkObjectWaitable {

    fn wait(self, device: &VkDevice, time: crate::utils::time::VkTimeDuration) -> VkResult<()>;
}

pub trait VkSubmitCI {

    fn submit(self, device: &VkDevice, queue: vk::Queue, wait_fence: vk::Fence) -> VkResult<()>;
}

/// Resources allocated from `vma::Allocator`.
pub trait VmaResourceDiscardable {

    fn discard_by(self, vma: &vma::Allocator) -> VkResult<()>;
}
