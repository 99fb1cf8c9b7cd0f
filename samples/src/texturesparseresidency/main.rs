//!
//! Vulkan Example - Sparse texture residency
//!
//! A large virtual texture whose pages are backed by device memory only when requested.
//! Press R to bind random pages, T to bind the mip tail, F to release random pages,
//! and +/- to change the LOD bias.
//!

mod data;
mod example;

const WINDOW_TITLE: &'static str = "Vulkan Example - Sparse texture residency";

fn main() {

    use ash::vk;
    use vkbase::context::{PhysicalDevConfig, LogicDevConfig};

    vksamples::run_sample(WINDOW_TITLE, |builder| {

        let phy_config = PhysicalDevConfig::default()
            .request_features(vk::PhysicalDeviceFeatures {
                sparse_binding: vk::TRUE,
                sparse_residency_image2_d: vk::TRUE,
                shader_resource_residency: vk::TRUE,
                ..Default::default()
            });

        let logic_config = LogicDevConfig::default()
            .request_queues(vk::QueueFlags::SPARSE_BINDING);

        builder
            .with_physical_device_config(phy_config)
            .with_logic_device_config(logic_config)

    }, |context, _config| example::VulkanExample::new(context));
}
