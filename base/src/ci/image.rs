
use ash::vk;

use crate::context::{VkDevice, VkObjectDiscardable, VkObjectBindable};
use crate::ci::{VulkanCI, VkObjectBuildableCI};
use crate::error::{VkResult, VkError};
use crate::{vkbytes, vkuint, vkfloat};

// ----------------------------------------------------------------------------------------------
/// Wrapper class for vk::ImageCreateInfo.
#[derive(Debug, Clone)]
pub struct ImageCI {

    inner: vk::ImageCreateInfo,
    queue_families: Vec<vkuint>,
}

impl VulkanCI<vk::ImageCreateInfo> for ImageCI {

    fn default_ci() -> vk::ImageCreateInfo {

        vk::ImageCreateInfo {
            image_type  : vk::ImageType::TYPE_2D,
            mip_levels  : 1,
            array_layers: 1,
            samples: vk::SampleCountFlags::TYPE_1,
            tiling : vk::ImageTiling::OPTIMAL,
            sharing_mode  : vk::SharingMode::EXCLUSIVE,
            initial_layout: vk::ImageLayout::UNDEFINED,
            ..Default::default()
        }
    }
}

impl VkObjectBuildableCI for ImageCI {
    type ObjectType = (vk::Image, vk::MemoryRequirements);

    fn build(&self, device: &VkDevice) -> VkResult<Self::ObjectType> {

        let image = unsafe {
            device.logic.handle.create_image(&self.value(), None)
                .map_err(|_| VkError::create("Image"))?
        };

        let requirement = unsafe {
            device.logic.handle.get_image_memory_requirements(image)
        };

        Ok((image, requirement))
    }
}

impl ImageCI {

    pub fn new(r#type: vk::ImageType, format: vk::Format, dimension: vk::Extent3D) -> ImageCI {

        ImageCI {
            inner: vk::ImageCreateInfo {
                image_type: r#type,
                format,
                extent: dimension,
                ..ImageCI::default_ci()
            },
            queue_families: Vec::new(),
        }
    }

    pub fn new_2d(format: vk::Format, dimension: vk::Extent2D) -> ImageCI {

        let extent = vk::Extent3D {
            width : dimension.width,
            height: dimension.height,
            depth : 1,
        };

        ImageCI::new(vk::ImageType::TYPE_2D, format, extent)
    }

    pub fn value(&self) -> vk::ImageCreateInfo {

        vk::ImageCreateInfo {
            queue_family_index_count: self.queue_families.len() as _,
            p_queue_family_indices  : self.queue_families.as_ptr(),
            ..self.inner
        }
    }

    #[inline(always)]
    pub fn flags(mut self, flags: vk::ImageCreateFlags) -> ImageCI {
        self.inner.flags = flags; self
    }

    #[inline(always)]
    pub fn usages(mut self, flags: vk::ImageUsageFlags) -> ImageCI {
        self.inner.usage = flags; self
    }

    #[inline(always)]
    pub fn mip_levels(mut self, level: vkuint) -> ImageCI {
        self.inner.mip_levels = level; self
    }

    #[inline(always)]
    pub fn array_layers(mut self, layers: vkuint) -> ImageCI {
        self.inner.array_layers = layers; self
    }

    #[inline(always)]
    pub fn sharing_queues(mut self, mode: vk::SharingMode, families_indices: Vec<vkuint>) -> ImageCI {
        self.queue_families = families_indices;
        self.inner.sharing_mode = mode; self
    }
}

/// The number of mip levels of a full mip chain for an image of `width` x `height`.
pub fn full_mip_levels(width: vkuint, height: vkuint) -> vkuint {
    32 - width.max(height).max(1).leading_zeros()
}

impl VkObjectDiscardable for vk::Image {

    fn discard_by(self, device: &VkDevice) {
        unsafe {
            device.logic.handle.destroy_image(self, None);
        }
    }
}

impl VkObjectBindable for vk::Image {

    fn bind(self, device: &VkDevice, memory: vk::DeviceMemory, offset: vkbytes) -> VkResult<()> {
        unsafe {
            device.logic.handle.bind_image_memory(self, memory, offset)
                .map_err(|_| VkError::device("Binding Image Memory"))
        }
    }
}
// ----------------------------------------------------------------------------------------------

// ----------------------------------------------------------------------------------------------
/// Wrapper class for vk::ImageViewCreateInfo.
#[derive(Debug, Clone)]
pub struct ImageViewCI {
    inner: vk::ImageViewCreateInfo,
}

impl VulkanCI<vk::ImageViewCreateInfo> for ImageViewCI {

    fn default_ci() -> vk::ImageViewCreateInfo {

        vk::ImageViewCreateInfo {
            view_type: vk::ImageViewType::TYPE_2D,
            components: vk::ComponentMapping {
                r: vk::ComponentSwizzle::R,
                g: vk::ComponentSwizzle::G,
                b: vk::ComponentSwizzle::B,
                a: vk::ComponentSwizzle::A,
            },
            subresource_range: vk::ImageSubresourceRange {
                aspect_mask      : vk::ImageAspectFlags::COLOR,
                base_mip_level   : 0,
                level_count      : 1,
                base_array_layer : 0,
                layer_count      : 1,
            },
            ..Default::default()
        }
    }
}

impl VkObjectBuildableCI for ImageViewCI {
    type ObjectType = vk::ImageView;

    fn build(&self, device: &VkDevice) -> VkResult<Self::ObjectType> {

        let view = unsafe {
            device.logic.handle.create_image_view(&self.inner, None)
                .map_err(|_| VkError::create("Image View"))?
        };
        Ok(view)
    }
}

impl ImageViewCI {

    pub fn new(image: vk::Image, r#type: vk::ImageViewType, format: vk::Format) -> ImageViewCI {

        ImageViewCI {
            inner: vk::ImageViewCreateInfo {
                image, format,
                view_type: r#type,
                ..ImageViewCI::default_ci()
            },
        }
    }

    #[inline(always)]
    pub fn aspect_mask(mut self, aspect: vk::ImageAspectFlags) -> ImageViewCI {
        self.inner.subresource_range.aspect_mask = aspect; self
    }

    #[inline(always)]
    pub fn mip_level(mut self, base_level: vkuint, level_count: vkuint) -> ImageViewCI {
        self.inner.subresource_range.base_mip_level = base_level;
        self.inner.subresource_range.level_count = level_count; self
    }

    #[inline(always)]
    pub fn array_layers(mut self, base_layer: vkuint, layer_count: vkuint) -> ImageViewCI {
        self.inner.subresource_range.base_array_layer = base_layer;
        self.inner.subresource_range.layer_count = layer_count; self
    }
}

impl VkObjectDiscardable for vk::ImageView {

    fn discard_by(self, device: &VkDevice) {
        unsafe {
            device.logic.handle.destroy_image_view(self, None)
        }
    }
}
// ----------------------------------------------------------------------------------------------

// ----------------------------------------------------------------------------------------------
/// Wrapper class for vk::ImageMemoryBarrier.
#[derive(Debug, Clone)]
pub struct ImageBarrierCI {
    inner: vk::ImageMemoryBarrier,
}

impl VulkanCI<vk::ImageMemoryBarrier> for ImageBarrierCI {

    fn default_ci() -> vk::ImageMemoryBarrier {

        vk::ImageMemoryBarrier {
            old_layout: vk::ImageLayout::UNDEFINED,
            new_layout: vk::ImageLayout::UNDEFINED,
            src_queue_family_index: vk::QUEUE_FAMILY_IGNORED,
            dst_queue_family_index: vk::QUEUE_FAMILY_IGNORED,
            ..Default::default()
        }
    }
}

impl ImageBarrierCI {

    pub fn new(image: vk::Image, subrange: vk::ImageSubresourceRange) -> ImageBarrierCI {

        ImageBarrierCI {
            inner: vk::ImageMemoryBarrier {
                image,
                subresource_range: subrange,
                ..ImageBarrierCI::default_ci()
            },
        }
    }

    /// A barrier for the color aspect of all mip levels and layers.
    pub fn color(image: vk::Image) -> ImageBarrierCI {
        ImageBarrierCI::new(image, subresource_all(vk::ImageAspectFlags::COLOR))
    }

    #[inline(always)]
    pub fn value(&self) -> vk::ImageMemoryBarrier {
        self.inner
    }

    #[inline(always)]
    pub fn access_mask(mut self, from: vk::AccessFlags, to: vk::AccessFlags) -> ImageBarrierCI {
        self.inner.src_access_mask = from;
        self.inner.dst_access_mask = to; self
    }

    #[inline(always)]
    pub fn layout(mut self, from: vk::ImageLayout, to: vk::ImageLayout) -> ImageBarrierCI {
        self.inner.old_layout = from;
        self.inner.new_layout = to; self
    }

    #[inline(always)]
    pub fn queue_family_index(mut self, from: vkuint, to: vkuint) -> ImageBarrierCI {
        self.inner.src_queue_family_index = from;
        self.inner.dst_queue_family_index = to; self
    }
}

impl From<ImageBarrierCI> for vk::ImageMemoryBarrier {

    fn from(value: ImageBarrierCI) -> vk::ImageMemoryBarrier {
        value.inner
    }
}

/// Subresource range covering every mip level and array layer of an image.
pub fn subresource_all(aspect: vk::ImageAspectFlags) -> vk::ImageSubresourceRange {

    vk::ImageSubresourceRange {
        aspect_mask      : aspect,
        base_mip_level   : 0,
        level_count      : vk::REMAINING_MIP_LEVELS,
        base_array_layer : 0,
        layer_count      : vk::REMAINING_ARRAY_LAYERS,
    }
}
// ----------------------------------------------------------------------------------------------

// ----------------------------------------------------------------------------------------------
/// Wrapper class for vk::SamplerCreateInfo.
#[derive(Debug, Clone)]
pub struct SamplerCI {
    inner: vk::SamplerCreateInfo,
}

impl VulkanCI<vk::SamplerCreateInfo> for SamplerCI {

    fn default_ci() -> vk::SamplerCreateInfo {

        vk::SamplerCreateInfo {
            mag_filter: vk::Filter::LINEAR,
            min_filter: vk::Filter::LINEAR,
            mipmap_mode: vk::SamplerMipmapMode::LINEAR,
            address_mode_u: vk::SamplerAddressMode::REPEAT,
            address_mode_v: vk::SamplerAddressMode::REPEAT,
            address_mode_w: vk::SamplerAddressMode::REPEAT,
            max_anisotropy: 1.0,
            compare_op: vk::CompareOp::ALWAYS,
            border_color: vk::BorderColor::FLOAT_OPAQUE_WHITE,
            ..Default::default()
        }
    }
}

impl VkObjectBuildableCI for SamplerCI {
    type ObjectType = vk::Sampler;

    fn build(&self, device: &VkDevice) -> VkResult<Self::ObjectType> {

        let sampler = unsafe {
            device.logic.handle.create_sampler(&self.inner, None)
                .map_err(|_| VkError::create("Sampler"))?
        };
        Ok(sampler)
    }
}

impl SamplerCI {

    #[inline(always)]
    pub fn new() -> SamplerCI {
        SamplerCI {
            inner: SamplerCI::default_ci(),
        }
    }

    #[inline(always)]
    pub fn filter(mut self, mag: vk::Filter, min: vk::Filter) -> SamplerCI {
        self.inner.mag_filter = mag;
        self.inner.min_filter = min; self
    }

    /// `mode` specifies the mipmap filter, `u`, `v`, `w` specify the addressing mode outside [0..1] range.
    #[inline(always)]
    pub fn mipmap(mut self, mode: vk::SamplerMipmapMode, u: vk::SamplerAddressMode, v: vk::SamplerAddressMode, w: vk::SamplerAddressMode) -> SamplerCI {
        self.inner.mipmap_mode = mode;
        self.inner.address_mode_u = u;
        self.inner.address_mode_v = v;
        self.inner.address_mode_w = w; self
    }

    /// Use the same addressing mode for all coordinates.
    #[inline(always)]
    pub fn address_mode(self, mode: vk::SamplerAddressMode) -> SamplerCI {
        let mipmap_mode = self.inner.mipmap_mode;
        self.mipmap(mipmap_mode, mode, mode, mode)
    }

    #[inline(always)]
    pub fn lod(mut self, mip_bias: vkfloat, min: vkfloat, max: vkfloat) -> SamplerCI {
        self.inner.mip_lod_bias = mip_bias;
        self.inner.min_lod = min;
        self.inner.max_lod = max; self
    }

    /// Requires the physical feature 'sampler_anisotropy'. `None` disables anisotropy.
    #[inline(always)]
    pub fn anisotropy(mut self, max: Option<vkfloat>) -> SamplerCI {

        if let Some(max) = max {
            self.inner.anisotropy_enable = vk::TRUE;
            self.inner.max_anisotropy = max;
        } else {
            self.inner.anisotropy_enable = vk::FALSE;
        }
        self
    }

    #[inline(always)]
    pub fn border_color(mut self, color: vk::BorderColor) -> SamplerCI {
        self.inner.border_color = color; self
    }
}

impl VkObjectDiscardable for vk::Sampler {

    fn discard_by(self, device: &VkDevice) {
        unsafe {
            device.logic.handle.destroy_sampler(self, None);
        }
    }
}
// ----------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mip_chain_length() {

        assert_eq!(full_mip_levels(1, 1), 1);
        assert_eq!(full_mip_levels(2, 1), 2);
        assert_eq!(full_mip_levels(1024, 512), 11);
        assert_eq!(full_mip_levels(8192, 8192), 14);
        assert_eq!(full_mip_levels(0, 0), 1);
    }

    #[test]
    fn image_ci_keeps_queue_families() {

        let ci = ImageCI::new_2d(vk::Format::R8G8B8A8_UNORM, vk::Extent2D { width: 4, height: 4 })
            .sharing_queues(vk::SharingMode::CONCURRENT, vec![0, 1]);
        let value = ci.value();
        assert_eq!(value.queue_family_index_count, 2);
        assert_eq!(value.extent.depth, 1);
        assert_eq!(value.sharing_mode, vk::SharingMode::CONCURRENT);
    }
}
