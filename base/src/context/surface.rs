
use ash::vk;
use ash::extensions::khr::Surface;
use raw_window_handle::{HasRawDisplayHandle, HasRawWindowHandle};

use crate::context::instance::VkInstance;
use crate::error::{VkResult, VkError};
use crate::vkuint;

/// The presentation target of the sample window.
pub struct VkSurface {

    pub(crate) handle: vk::SurfaceKHR,
    loader: Surface,
}

/// Everything a swapchain needs to know about the surface on one physical device.
pub struct SurfaceSupport {
    pub capabilities : vk::SurfaceCapabilitiesKHR,
    pub formats      : Vec<vk::SurfaceFormatKHR>,
    pub present_modes: Vec<vk::PresentModeKHR>,
}

impl VkSurface {

    pub fn new(instance: &VkInstance, window: &winit::window::Window) -> VkResult<VkSurface> {

        // ash-window picks the platform specific surface extension for us.
        let handle = unsafe {
            ash_window::create_surface(&instance.entry, &instance.handle, window.raw_display_handle(), window.raw_window_handle(), None)
                .map_err(|_| VkError::unlink("Platform Surface"))?
        };
        let loader = Surface::new(&instance.entry, &instance.handle);

        Ok(VkSurface { handle, loader })
    }

    /// Whether `family` of `phy` can present to this surface. Query failures count as no.
    pub fn query_is_family_presentable(&self, phy: vk::PhysicalDevice, family: vkuint) -> bool {
        unsafe {
            self.loader.get_physical_device_surface_support(phy, family, self.handle)
                .unwrap_or(false)
        }
    }

    pub fn query_support(&self, phy: vk::PhysicalDevice) -> VkResult<SurfaceSupport> {

        unsafe {
            let capabilities = self.loader.get_physical_device_surface_capabilities(phy, self.handle)
                .map_err(|_| VkError::query("Surface Capabilities"))?;
            let formats = self.loader.get_physical_device_surface_formats(phy, self.handle)
                .map_err(|_| VkError::query("Surface Formats"))?;
            let present_modes = self.loader.get_physical_device_surface_present_modes(phy, self.handle)
                .map_err(|_| VkError::query("Surface Present Modes"))?;

            Ok(SurfaceSupport { capabilities, formats, present_modes })
        }
    }

    pub fn discard(&self) {
        unsafe {
            self.loader.destroy_surface(self.handle, None);
        }
    }
}
