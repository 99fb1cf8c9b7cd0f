//!
//! Vulkan Example - Compute shader cloth simulation
//!
//! A mass-spring cloth simulated in a compute shader and dropped on a sphere.
//! The particles are ping-ponged between two storage buffers for several iterations each frame,
//! and the final buffer is drawn directly as vertex buffer.
//! Press Space to pause the simulation and W to toggle wind.
//!

mod data;
mod example;

const WINDOW_TITLE: &'static str = "Vulkan Example - Compute shader cloth simulation";

fn main() {

    use ash::vk;
    use vkbase::context::LogicDevConfig;

    vksamples::run_sample(WINDOW_TITLE, |builder| {

        // a dedicated compute queue family is preferred when the device has one.
        let logic_config = LogicDevConfig::default()
            .request_queues(vk::QueueFlags::COMPUTE);

        builder.with_logic_device_config(logic_config)

    }, |context, _config| example::VulkanExample::new(context));
}
