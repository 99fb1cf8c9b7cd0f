//!
//! Vulkan Example - Dynamic terrain tessellation
//!
//! A flat grid of quad patches is displaced by a heightmap in the tessellation evaluation shader.
//! The tessellation level of every patch edge follows its size on screen,
//! and patches outside of the view frustum are culled in the control shader.
//! Press W to toggle wireframe and T to toggle tessellation.
//!

mod data;
mod example;

const WINDOW_TITLE: &'static str = "Vulkan Example - Dynamic terrain tessellation";

fn main() {

    use ash::vk;
    use vkbase::context::PhysicalDevConfig;

    vksamples::run_sample(WINDOW_TITLE, |builder| {

        let phy_config = PhysicalDevConfig::default()
            .request_features(vk::PhysicalDeviceFeatures {
                tessellation_shader: vk::TRUE,
                ..Default::default()
            })
            .optional_features(vk::PhysicalDeviceFeatures {
                fill_mode_non_solid: vk::TRUE,
                pipeline_statistics_query: vk::TRUE,
                sampler_anisotropy: vk::TRUE,
                ..Default::default()
            });
        builder.with_physical_device_config(phy_config)

    }, |context, _config| example::VulkanExample::new(context));
}
