
pub use self::device::{VkDevice, VkLogicalDevice, VkPhysicalDevice, VkQueue};
pub use self::device::{VkObjectDiscardable, VkObjectAllocatable, VkObjectBindable};
pub use self::device::{VmaResourceDiscardable, VkObjectWaitable, VkSubmitCI};
pub use self::device::DeviceExtensionFeatures;
pub use self::swapchain::{VkSwapchain, SwapchainSyncError};

pub use self::instance::InstanceConfig;
pub use self::debug::{ValidationConfig, DebugUtilsConfig};
pub use self::device::{LogicDevConfig, PhysicalDevConfig};
pub use self::swapchain::SwapchainConfig;

mod instance;
mod debug;
mod surface;
mod device;
mod swapchain;

use crate::config::SampleConfig;
use crate::workflow::WindowContext;
use crate::error::VkResult;

#[derive(Default)]
pub struct VulkanConfig {

    instance  : InstanceConfig,
    debugger  : ValidationConfig,
    dev_logic : LogicDevConfig,
    dev_phy   : PhysicalDevConfig,
    swapchain : SwapchainConfig,
}

/// The objects shared by every sample, created and destroyed in a fixed order.
pub struct VulkanContext {

    instance  : instance::VkInstance,
    debugger  : debug::VkDebugger,
    surface   : surface::VkSurface,

    pub swapchain: swapchain::VkSwapchain,
    pub device: device::VkDevice,
}

impl VulkanContext {

    pub fn new(window: &WindowContext) -> VulkanContextBuilder {

        VulkanContextBuilder {
            window,
            config: VulkanConfig::default(),
        }
    }

    pub(crate) fn recreate_swapchain(&mut self, window: &WindowContext) -> VkResult<()> {

        let dimension = window.dimension()?;
        self.swapchain.rebuild(&self.device, &self.surface, dimension)?;

        Ok(())
    }

    pub(crate) fn wait_idle(&self) -> VkResult<()> {
        self.device.wait_idle()
    }

    pub(crate) fn discard(mut self) {

        self.swapchain.discard(&self.device);
        self.device.discard_self();

        self.surface.discard();
        self.debugger.discard();
        self.instance.discard();
    }
}

pub struct VulkanContextBuilder<'a> {

    window: &'a WindowContext,
    config: VulkanConfig,
}

impl<'a> VulkanContextBuilder<'a> {

    /// Apply the values of sample configuration that concern Vulkan objects.
    pub fn with_sample_config(mut self, sample: &SampleConfig) -> VulkanContextBuilder<'a> {

        self.config.debugger.is_enable = sample.graphics.validation;
        self.config.dev_phy.gpu_index = sample.graphics.gpu_index;
        self.config.swapchain.present_vsync = sample.graphics.vsync;
        self.config.swapchain.dimension_preference = ash::vk::Extent2D {
            width : sample.window.width,
            height: sample.window.height,
        };
        self
    }

    pub fn with_instance_config(mut self, config: InstanceConfig) -> VulkanContextBuilder<'a> {
        self.config.instance = config; self
    }

    pub fn with_logic_device_config(mut self, config: LogicDevConfig) -> VulkanContextBuilder<'a> {
        self.config.dev_logic = config; self
    }

    pub fn with_physical_device_config(mut self, config: PhysicalDevConfig) -> VulkanContextBuilder<'a> {
        // keep the device index chosen from command line.
        let gpu_index = self.config.dev_phy.gpu_index;
        self.config.dev_phy = config;
        self.config.dev_phy.gpu_index = self.config.dev_phy.gpu_index.or(gpu_index);
        self
    }

    pub fn build(self) -> VkResult<VulkanContext> {

        let instance = instance::VkInstance::new(self.config.instance, &self.config.debugger, self.window.display_handle())?;
        let debugger = debug::VkDebugger::new(&instance, &self.config.debugger)?;
        let surface = surface::VkSurface::new(&instance, &self.window.handle)?;

        let phy_device = device::VkPhysicalDevice::new(&instance, self.config.dev_phy)?;
        let logic_device = device::VkLogicalDevice::new(&instance, &phy_device, &surface, self.config.dev_logic)?;
        let device = device::VkDevice::new(&instance, logic_device, phy_device)?;

        let dimension = self.window.dimension()?;
        let swapchain = swapchain::VkSwapchain::new(&instance, &device, &surface, self.config.swapchain, dimension)?;

        let context = VulkanContext { instance, debugger, surface, device, swapchain };
        Ok(context)
    }
}
