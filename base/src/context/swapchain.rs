
use ash::vk;
use failure::Fail;

use crate::context::instance::VkInstance;
use crate::context::device::{VkDevice, VkQueue};
use crate::context::surface::VkSurface;
use crate::utils::time::VkTimeDuration;
use crate::error::{VkResult, VkError};
use crate::{vkuint, vklint};

pub struct SwapchainConfig {

    pub present_vsync: bool,
    pub dimension_preference: vk::Extent2D,
    pub image_acquire_time: vklint,
}

impl Default for SwapchainConfig {

    fn default() -> SwapchainConfig {
        SwapchainConfig {
            present_vsync: false,
            dimension_preference: vk::Extent2D { width: 1280, height: 720 },
            image_acquire_time: VkTimeDuration::Infinite.into(),
        }
    }
}

pub struct VkSwapchain {

    /// handle of `vk::SwapchainKHR`.
    handle: vk::SwapchainKHR,
    /// the extension loader provides functions for creation and destruction of `vk::SwapchainKHR` object.
    loader: ash::extensions::khr::Swapchain,
    /// image resources of current swapchain.
    pub images: Vec<SwapchainImage>,
    /// the format of presentable images.
    pub format: vk::Format,
    /// the dimension of presentable images.
    pub dimension: vk::Extent2D,
    /// the queue used to present image.
    present_queue: VkQueue,

    config: SwapchainConfig,
}

pub struct SwapchainImage {

    /// the presentable image owned by swapchain, destroyed along with `vk::SwapchainKHR`.
    pub image: vk::Image,
    pub view : vk::ImageView,
}

#[derive(Debug, Fail)]
pub enum SwapchainSyncError {
    #[fail(display = "No image became available within the time allowed.")]
    TimeOut,
    #[fail(display = "Swapchain does not match the surface properties exactly.")]
    SubOptimal,
    #[fail(display = "Surface has changed and is not compatible with the swapchain.")]
    SurfaceOutDate,
    #[fail(display = "Get unknown error when acquiring image.")]
    Unknown,
}

impl VkSwapchain {

    pub fn new(instance: &VkInstance, device: &VkDevice, surface: &VkSurface, config: SwapchainConfig, dimension: vk::Extent2D) -> VkResult<VkSwapchain> {

        let loader = ash::extensions::khr::Swapchain::new(&instance.handle, &device.logic.handle);

        let mut swapchain = VkSwapchain {
            handle: vk::SwapchainKHR::null(),
            loader, config,
            images: Vec::new(),
            format: vk::Format::UNDEFINED,
            dimension,
            present_queue: device.logic.queues.graphics,
        };
        swapchain.rebuild(device, surface, dimension)?;

        Ok(swapchain)
    }

    /// Create a new `vk::SwapchainKHR` matching current surface, then retire the old one.
    pub fn rebuild(&mut self, device: &VkDevice, surface: &VkSurface, dimension: vk::Extent2D) -> VkResult<()> {

        let support = surface.query_support(device.phy.handle)?;
        let swapchain_format = choose_surface_format(&support.formats)
            .ok_or(VkError::query("Surface Formats"))?;
        let capability = choose_capability(&support.capabilities, dimension);
        let present_mode = choose_present_mode(&support.present_modes, self.config.present_vsync);

        let swapchain_ci = vk::SwapchainCreateInfoKHR {
            surface                  : surface.handle,
            min_image_count          : capability.desired_image_count,
            image_format             : swapchain_format.format,
            image_color_space        : swapchain_format.color_space,
            image_extent             : capability.swapchain_extent,
            image_array_layers       : 1,
            image_usage              : capability.support_usage,
            image_sharing_mode       : vk::SharingMode::EXCLUSIVE,
            pre_transform            : capability.pre_transform,
            composite_alpha          : capability.composite_alpha,
            present_mode,
            // allows the implementation to discard rendering outside of the surface area.
            clipped                  : vk::TRUE,
            old_swapchain            : self.handle,
            ..Default::default()
        };

        let new_handle = unsafe {
            self.loader.create_swapchain(&swapchain_ci, None)
                .or(Err(VkError::create("Swapchain")))?
        };

        // retiring the old swapchain also cleans up all its presentable images.
        self.discard(device);

        self.handle = new_handle;
        self.format = swapchain_format.format;
        self.dimension = capability.swapchain_extent;
        self.images = obtain_swapchain_images(device, new_handle, &self.loader, swapchain_format.format)?;

        log::info!("Swapchain (re)created: {}x{}, {} images, {:?}, {:?}.",
            self.dimension.width, self.dimension.height, self.images.len(), self.format, present_mode);

        Ok(())
    }

    /// The number of presentable images, which is also the number of frames in flight.
    #[inline]
    pub fn frame_in_flight(&self) -> usize {
        self.images.len()
    }

    /// Acquire an available presentable image to use, and retrieve the index of that image.
    pub fn next_image(&self, semaphore: Option<vk::Semaphore>, fence: Option<vk::Fence>) -> Result<vkuint, SwapchainSyncError> {

        let semaphore = semaphore.unwrap_or(vk::Semaphore::null());
        let fence = fence.unwrap_or(vk::Fence::null());

        let (image_index, is_sub_optimal) = unsafe {
            self.loader.acquire_next_image(self.handle, self.config.image_acquire_time, semaphore, fence)
                .map_err(|error| match error {
                    | vk::Result::TIMEOUT
                    | vk::Result::NOT_READY => SwapchainSyncError::TimeOut,
                    | vk::Result::ERROR_OUT_OF_DATE_KHR => SwapchainSyncError::SurfaceOutDate,
                    | _ => SwapchainSyncError::Unknown,
                })?
        };

        if is_sub_optimal {
            Err(SwapchainSyncError::SubOptimal)
        } else {
            Ok(image_index)
        }
    }

    /// Queue an image for presentation after all `wait_semaphores` are signaled.
    pub fn present(&self, wait_semaphores: &[vk::Semaphore], image_index: vkuint) -> Result<(), SwapchainSyncError> {

        let present_info = vk::PresentInfoKHR {
            wait_semaphore_count: wait_semaphores.len() as _,
            p_wait_semaphores   : wait_semaphores.as_ptr(),
            swapchain_count     : 1,
            p_swapchains        : &self.handle,
            p_image_indices     : &image_index,
            ..Default::default()
        };

        let is_sub_optimal = unsafe {
            self.loader.queue_present(self.present_queue.handle, &present_info)
                .map_err(|error| match error {
                    | vk::Result::ERROR_OUT_OF_DATE_KHR => SwapchainSyncError::SurfaceOutDate,
                    | _ => SwapchainSyncError::Unknown,
                })?
        };

        if is_sub_optimal {
            Err(SwapchainSyncError::SubOptimal)
        } else {
            Ok(())
        }
    }

    /// Destroy the image views and the `vk::SwapchainKHR` object.
    ///
    /// All outstanding operations on acquired images must have completed before this call.
    pub fn discard(&mut self, device: &VkDevice) {

        unsafe {
            self.images.drain(..).for_each(|swapchain_image| {
                device.logic.handle.destroy_image_view(swapchain_image.view, None);
            });

            if self.handle != vk::SwapchainKHR::null() {
                self.loader.destroy_swapchain(self.handle, None);
                self.handle = vk::SwapchainKHR::null();
            }
        }
    }
}

fn obtain_swapchain_images(device: &VkDevice, swapchain: vk::SwapchainKHR, loader: &ash::extensions::khr::Swapchain, format: vk::Format) -> VkResult<Vec<SwapchainImage>> {

    use crate::ci::image::ImageViewCI;
    use crate::ci::VkObjectBuildableCI;

    let image_handles = unsafe {
        loader.get_swapchain_images(swapchain)
            .or(Err(VkError::query("Swapchain Images")))?
    };

    image_handles.into_iter().map(|image| {
        let view = ImageViewCI::new(image, vk::ImageViewType::TYPE_2D, format)
            .build(device)?;
        Ok(SwapchainImage { image, view })
    }).collect()
}

// -----------------------------------------------------------------------------------
pub(crate) fn choose_present_mode(available_modes: &[vk::PresentModeKHR], vsync: bool) -> vk::PresentModeKHR {

    // FIFO waits for the vertical blank and is always available.
    if vsync {
        return vk::PresentModeKHR::FIFO
    }

    // mailbox is the lowest latency non-tearing mode, then fall back to immediate.
    [vk::PresentModeKHR::MAILBOX, vk::PresentModeKHR::IMMEDIATE].iter()
        .find(|mode| available_modes.contains(mode))
        .cloned()
        .unwrap_or(vk::PresentModeKHR::FIFO)
}

pub(crate) fn choose_surface_format(support_formats: &[vk::SurfaceFormatKHR]) -> Option<vk::SurfaceFormatKHR> {

    let first = support_formats.first()?;

    // a single UNDEFINED entry means there is no preferred format.
    if support_formats.len() == 1 && first.format == vk::Format::UNDEFINED {
        return Some(vk::SurfaceFormatKHR {
            format: vk::Format::B8G8R8A8_UNORM,
            color_space: first.color_space,
        })
    }

    support_formats.iter()
        .find(|f| f.format == vk::Format::B8G8R8A8_UNORM)
        .or(Some(first))
        .cloned()
}

pub(crate) struct SwapchainCapability {

    pub support_usage: vk::ImageUsageFlags,
    pub desired_image_count: vkuint,
    pub swapchain_extent: vk::Extent2D,
    pub pre_transform: vk::SurfaceTransformFlagsKHR,
    pub composite_alpha: vk::CompositeAlphaFlagsKHR,
}

pub(crate) fn choose_capability(surface_caps: &vk::SurfaceCapabilitiesKHR, preference: vk::Extent2D) -> SwapchainCapability {

    let mut image_usage = vk::ImageUsageFlags::COLOR_ATTACHMENT;
    // transfer usages are needed by samples copying into swapchain images.
    if surface_caps.supported_usage_flags.contains(vk::ImageUsageFlags::TRANSFER_SRC) {
        image_usage |= vk::ImageUsageFlags::TRANSFER_SRC;
    }
    if surface_caps.supported_usage_flags.contains(vk::ImageUsageFlags::TRANSFER_DST) {
        image_usage |= vk::ImageUsageFlags::TRANSFER_DST;
    }

    // the special value 0xFFFFFFFF means the size of the surface will be set by the swapchain.
    let swapchain_extent = if surface_caps.current_extent.width == vkuint::MAX {
        vk::Extent2D {
            width : preference.width.clamp(surface_caps.min_image_extent.width, surface_caps.max_image_extent.width),
            height: preference.height.clamp(surface_caps.min_image_extent.height, surface_caps.max_image_extent.height),
        }
    } else {
        surface_caps.current_extent
    };

    let mut desired_image_count = surface_caps.min_image_count + 1;
    if surface_caps.max_image_count > 0 && desired_image_count > surface_caps.max_image_count {
        desired_image_count = surface_caps.max_image_count;
    }

    // prefer a non-rotated transform.
    let pre_transform = if surface_caps.supported_transforms.contains(vk::SurfaceTransformFlagsKHR::IDENTITY) {
        vk::SurfaceTransformFlagsKHR::IDENTITY
    } else {
        surface_caps.current_transform
    };

    // not all devices support alpha opaque.
    let composite_alpha = [
        vk::CompositeAlphaFlagsKHR::OPAQUE,
        vk::CompositeAlphaFlagsKHR::PRE_MULTIPLIED,
        vk::CompositeAlphaFlagsKHR::POST_MULTIPLIED,
        vk::CompositeAlphaFlagsKHR::INHERIT,
    ].iter().find(|&&flag| surface_caps.supported_composite_alpha.contains(flag))
        .cloned()
        .unwrap_or(vk::CompositeAlphaFlagsKHR::OPAQUE);

    SwapchainCapability {
        support_usage: image_usage,
        desired_image_count, swapchain_extent, pre_transform, composite_alpha,
    }
}
// -----------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vsync_forces_fifo() {

        let modes = [vk::PresentModeKHR::IMMEDIATE, vk::PresentModeKHR::MAILBOX, vk::PresentModeKHR::FIFO];
        assert_eq!(choose_present_mode(&modes, true), vk::PresentModeKHR::FIFO);
        assert_eq!(choose_present_mode(&modes, false), vk::PresentModeKHR::MAILBOX);
        assert_eq!(choose_present_mode(&[vk::PresentModeKHR::FIFO], false), vk::PresentModeKHR::FIFO);
    }

    #[test]
    fn undefined_format_means_any() {

        let formats = [vk::SurfaceFormatKHR { format: vk::Format::UNDEFINED, color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR }];
        assert_eq!(choose_surface_format(&formats).unwrap().format, vk::Format::B8G8R8A8_UNORM);

        let formats = [
            vk::SurfaceFormatKHR { format: vk::Format::R8G8B8A8_SRGB, color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR },
            vk::SurfaceFormatKHR { format: vk::Format::B8G8R8A8_UNORM, color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR },
        ];
        assert_eq!(choose_surface_format(&formats).unwrap().format, vk::Format::B8G8R8A8_UNORM);
        assert!(choose_surface_format(&[]).is_none());
    }

    #[test]
    fn extent_is_clamped_when_surface_defers() {

        let caps = vk::SurfaceCapabilitiesKHR {
            current_extent: vk::Extent2D { width: u32::MAX, height: u32::MAX },
            min_image_extent: vk::Extent2D { width: 1, height: 1 },
            max_image_extent: vk::Extent2D { width: 1024, height: 1024 },
            min_image_count: 2,
            max_image_count: 2,
            supported_transforms: vk::SurfaceTransformFlagsKHR::IDENTITY,
            supported_composite_alpha: vk::CompositeAlphaFlagsKHR::INHERIT,
            ..Default::default()
        };

        let capability = choose_capability(&caps, vk::Extent2D { width: 1920, height: 600 });
        assert_eq!(capability.swapchain_extent.width, 1024);
        assert_eq!(capability.swapchain_extent.height, 600);
        assert_eq!(capability.desired_image_count, 2);
        assert_eq!(capability.composite_alpha, vk::CompositeAlphaFlagsKHR::INHERIT);
    }
}
