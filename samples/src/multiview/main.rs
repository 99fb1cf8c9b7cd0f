//!
//! Vulkan Example - Multiview rendering
//!
//! The scene is rendered once in a render pass with a view mask covering two views,
//! which broadcasts every draw into the two layers of the attachments, one for each eye.
//! Both layers are then shown side by side.
//! Press Space to toggle the camera rotation.
//!

mod data;
mod example;

use ash::vk;
use vkbase::context::DeviceExtensionFeatures;

use std::os::raw::c_void;

const WINDOW_TITLE: &'static str = "Vulkan Example - Multiview rendering";

struct MultiviewFeatures {
    multiview: vk::PhysicalDeviceMultiviewFeatures,
}

impl DeviceExtensionFeatures for MultiviewFeatures {

    fn chain_head(&mut self) -> *const c_void {
        &self.multiview as *const vk::PhysicalDeviceMultiviewFeatures as *const c_void
    }
}

fn main() {

    use vkbase::context::LogicDevConfig;

    vksamples::run_sample(WINDOW_TITLE, |builder| {

        // multiview is core since Vulkan 1.1, only the feature needs to be enabled.
        let features = MultiviewFeatures {
            multiview: vk::PhysicalDeviceMultiviewFeatures {
                multiview: vk::TRUE,
                ..Default::default()
            },
        };
        let logic_config = LogicDevConfig::default()
            .extension_features(Box::new(features));

        builder.with_logic_device_config(logic_config)

    }, |context, _config| example::VulkanExample::new(context));
}
