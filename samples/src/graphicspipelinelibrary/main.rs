//!
//! Vulkan Example - Graphics pipeline library
//!
//! Pipelines are assembled from independently built libraries. The vertex input, pre-rasterization
//! and fragment output parts are shared, only the fragment shader part differs between variants.
//! Press N to link another variant on a background thread, O to toggle link time optimization.
//!

mod data;
mod example;

use ash::vk;
use vkbase::context::DeviceExtensionFeatures;

use std::os::raw::c_void;

const WINDOW_TITLE: &'static str = "Vulkan Example - Graphics pipeline library";

struct PipelineLibraryFeatures {
    library: vk::PhysicalDeviceGraphicsPipelineLibraryFeaturesEXT,
}

impl DeviceExtensionFeatures for PipelineLibraryFeatures {

    fn chain_head(&mut self) -> *const c_void {
        &self.library as *const vk::PhysicalDeviceGraphicsPipelineLibraryFeaturesEXT as *const c_void
    }
}

fn main() {

    use vkbase::context::{PhysicalDevConfig, LogicDevConfig};

    vksamples::run_sample(WINDOW_TITLE, |builder| {

        let phy_config = PhysicalDevConfig::default()
            .add_extensions(&[
                vk::KhrPipelineLibraryFn::name(),
                vk::ExtGraphicsPipelineLibraryFn::name(),
            ]);

        let features = PipelineLibraryFeatures {
            library: vk::PhysicalDeviceGraphicsPipelineLibraryFeaturesEXT {
                graphics_pipeline_library: vk::TRUE,
                ..Default::default()
            },
        };
        let logic_config = LogicDevConfig::default()
            .extension_features(Box::new(features));

        builder
            .with_physical_device_config(phy_config)
            .with_logic_device_config(logic_config)

    }, |context, _config| example::VulkanExample::new(context));
}
