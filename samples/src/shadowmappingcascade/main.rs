//!
//! Vulkan Example - Cascaded shadow mapping for directional light sources
//!
//! The view frustum is split into multiple cascades and each of them gets its own
//! shadow map layer, so that the shadow resolution stays high near the viewer.
//!

mod data;
mod example;

const WINDOW_TITLE: &'static str = "Vulkan Example - Cascaded shadow mapping";

fn main() {

    use ash::vk;
    use vkbase::context::PhysicalDevConfig;

    vksamples::run_sample(WINDOW_TITLE, |builder| {

        // depth clamp keeps the casters behind the light near plane, it is used only if supported.
        let phy_config = PhysicalDevConfig::default()
            .optional_features(vk::PhysicalDeviceFeatures {
                depth_clamp: vk::TRUE,
                ..Default::default()
            });
        builder.with_physical_device_config(phy_config)

    }, |context, _config| example::VulkanExample::new(context));
}
