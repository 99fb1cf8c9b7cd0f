
use ash::vk;
use vma::Alloc;

use crate::ci::VulkanCI;
use crate::ci::buffer::BufferCI;
use crate::ci::image::ImageCI;
use crate::context::{VkDevice, VmaResourceDiscardable};
use crate::utils::memory::copy_to_ptr;
use crate::error::{VkResult, VkErrorKind};
use crate::vkbytes;

// ----------------------------------------------------------------------------------------------
/// A buffer together with its allocation from `vma::Allocator`.
pub struct VmaBuffer {

    /// the handle of vk::Buffer.
    pub handle: vk::Buffer,
    /// allocation info managed by vma.
    pub allocation: vma::Allocation,
    /// the size requested in buffer creation.
    pub size: vkbytes,
}

impl VmaBuffer {

    /// Map the allocation, the returned pointer remains valid until `unmap` is called.
    pub fn map(&mut self, device: &VkDevice) -> VkResult<*mut u8> {
        unsafe {
            let ptr = device.vma().map_memory(&mut self.allocation)
                .map_err(VkErrorKind::Vma)?;
            Ok(ptr)
        }
    }

    pub fn unmap(&mut self, device: &VkDevice) {
        unsafe {
            device.vma().unmap_memory(&mut self.allocation);
        }
    }

    /// Copy `data` to the start of a host visible buffer.
    pub fn write<T: Copy>(&mut self, device: &VkDevice, data: &[T]) -> VkResult<()> {

        debug_assert!(std::mem::size_of_val(data) as vkbytes <= self.size);

        let ptr = self.map(device)?;
        unsafe { copy_to_ptr(ptr, data); }
        self.unmap(device);
        Ok(())
    }
}

impl VmaResourceDiscardable for VmaBuffer {

    fn discard_by(mut self, vma: &vma::Allocator) -> VkResult<()> {
        (&mut self).discard_by(vma)
    }
}

/// Discard a buffer owned by a sample that is released in `RenderWorkflow::deinit`.
impl VmaResourceDiscardable for &mut VmaBuffer {

    fn discard_by(self, vma: &vma::Allocator) -> VkResult<()> {
        unsafe {
            vma.destroy_buffer(self.handle, &mut self.allocation);
        }
        self.handle = vk::Buffer::null();
        Ok(())
    }
}

/// An image together with its allocation from `vma::Allocator`.
pub struct VmaImage {

    /// the handle of vk::Image.
    pub handle: vk::Image,
    /// allocation info managed by vma.
    pub allocation: vma::Allocation,
}

impl VmaResourceDiscardable for VmaImage {

    fn discard_by(mut self, vma: &vma::Allocator) -> VkResult<()> {
        (&mut self).discard_by(vma)
    }
}

impl VmaResourceDiscardable for &mut VmaImage {

    fn discard_by(self, vma: &vma::Allocator) -> VkResult<()> {
        unsafe {
            vma.destroy_image(self.handle, &mut self.allocation);
        }
        self.handle = vk::Image::null();
        Ok(())
    }
}
// ----------------------------------------------------------------------------------------------


// ----------------------------------------------------------------------------------------------
/// Wrapper class for vma::AllocationCreateInfo.
pub struct VmaAllocationCI {
    inner: vma::AllocationCreateInfo,
}

impl VulkanCI<vma::AllocationCreateInfo> for VmaAllocationCI {

    fn default_ci() -> vma::AllocationCreateInfo {

        vma::AllocationCreateInfo {
            usage: vma::MemoryUsage::Auto,
            flags: vma::AllocationCreateFlags::empty(),
            required_flags : vk::MemoryPropertyFlags::empty(),
            preferred_flags: vk::MemoryPropertyFlags::empty(),
            ..Default::default()
        }
    }
}

impl VmaAllocationCI {

    pub fn new(usage: vma::MemoryUsage, required_flags: vk::MemoryPropertyFlags) -> VmaAllocationCI {

        VmaAllocationCI {
            inner: vma::AllocationCreateInfo {
                usage, required_flags,
                ..VmaAllocationCI::default_ci()
            }
        }
    }

    /// Memory written sequentially by the host, e.g. staging or uniform buffers.
    pub fn host_visible() -> VmaAllocationCI {
        VmaAllocationCI::new(vma::MemoryUsage::AutoPreferHost, vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT)
            .flags(vma::AllocationCreateFlags::HOST_ACCESS_SEQUENTIAL_WRITE)
    }

    /// Memory accessed only by the device.
    pub fn device_local() -> VmaAllocationCI {
        VmaAllocationCI::new(vma::MemoryUsage::AutoPreferDevice, vk::MemoryPropertyFlags::DEVICE_LOCAL)
    }

    #[inline(always)]
    pub fn flags(mut self, flags: vma::AllocationCreateFlags) -> VmaAllocationCI {
        self.inner.flags = flags; self
    }

    pub fn build_buffer(&self, device: &VkDevice, buffer_ci: &BufferCI) -> VkResult<VmaBuffer> {

        let (handle, allocation) = unsafe {
            device.vma().create_buffer(&buffer_ci.value(), &self.inner)
                .map_err(VkErrorKind::Vma)?
        };
        Ok(VmaBuffer { handle, allocation, size: buffer_ci.size() })
    }

    pub fn build_image(&self, device: &VkDevice, image_ci: &ImageCI) -> VkResult<VmaImage> {

        let (handle, allocation) = unsafe {
            device.vma().create_image(&image_ci.value(), &self.inner)
                .map_err(VkErrorKind::Vma)?
        };
        Ok(VmaImage { handle, allocation })
    }
}
// ----------------------------------------------------------------------------------------------

/// Create a host visible buffer filled with `data`.
pub fn host_buffer_with_data<T: Copy>(device: &VkDevice, usage: vk::BufferUsageFlags, data: &[T]) -> VkResult<VmaBuffer> {

    let buffer_ci = BufferCI::new(std::mem::size_of_val(data) as vkbytes)
        .usage(usage);
    let mut buffer = VmaAllocationCI::host_visible()
        .build_buffer(device, &buffer_ci)?;
    buffer.write(device, data)?;

    Ok(buffer)
}

/// Create a device local buffer filled with `data` through a temporary staging buffer.
///
/// `usage` gets `TRANSFER_DST` added, the copy is submitted to `queue` and waited on.
pub fn device_buffer_with_data<T: Copy>(device: &VkDevice, pool: vk::CommandPool, queue: vk::Queue, usage: vk::BufferUsageFlags, data: &[T]) -> VkResult<VmaBuffer> {

    use crate::command::CmdTransferApi;

    let staging = host_buffer_with_data(device, vk::BufferUsageFlags::TRANSFER_SRC, data)?;

    let buffer_ci = BufferCI::new(staging.size)
        .usage(usage | vk::BufferUsageFlags::TRANSFER_DST);
    let buffer = VmaAllocationCI::device_local()
        .build_buffer(device, &buffer_ci)?;

    let copy_region = vk::BufferCopy { src_offset: 0, dst_offset: 0, size: staging.size };
    let copy_result = crate::command::record_once(device, pool, queue, |recorder| {
        recorder.copy_buf2buf(staging.handle, buffer.handle, &[copy_region]);
        Ok(())
    });

    device.vma_discard(staging)?;
    copy_result?;

    Ok(buffer)
}
