//!
//! Vulkan Example - Basic hardware accelerated ray tracing
//!
//! A single triangle is placed in a bottom level acceleration structure, which is instanced once
//! by a top level acceleration structure. The raygen shader traces one ray for every pixel into a
//! storage image, which is then copied to the swapchain image.
//! Use the arrow keys to orbit the camera.
//!

mod data;
mod example;

use ash::vk;
use vkbase::context::DeviceExtensionFeatures;

use std::os::raw::c_void;

const WINDOW_TITLE: &'static str = "Vulkan Example - Basic hardware accelerated ray tracing";

/// The feature structures of ray tracing, linked in one pNext chain.
struct RayTracingFeatures {
    address: vk::PhysicalDeviceBufferDeviceAddressFeatures,
    acceleration: vk::PhysicalDeviceAccelerationStructureFeaturesKHR,
    pipeline: vk::PhysicalDeviceRayTracingPipelineFeaturesKHR,
}

impl DeviceExtensionFeatures for RayTracingFeatures {

    fn chain_head(&mut self) -> *const c_void {

        // buffer device address -> acceleration structure -> ray tracing pipeline.
        self.acceleration.p_next = &mut self.pipeline as *mut vk::PhysicalDeviceRayTracingPipelineFeaturesKHR as *mut c_void;
        self.address.p_next = &mut self.acceleration as *mut vk::PhysicalDeviceAccelerationStructureFeaturesKHR as *mut c_void;

        &self.address as *const vk::PhysicalDeviceBufferDeviceAddressFeatures as *const c_void
    }
}

fn main() {

    use vkbase::context::{InstanceConfig, PhysicalDevConfig, LogicDevConfig};

    vksamples::run_sample(WINDOW_TITLE, |builder| {

        let instance_config = InstanceConfig::default()
            .api_version(vk::API_VERSION_1_2);

        let phy_config = PhysicalDevConfig::default()
            .add_extensions(&[
                vk::KhrAccelerationStructureFn::name(),
                vk::KhrRayTracingPipelineFn::name(),
                vk::KhrDeferredHostOperationsFn::name(),
                vk::KhrBufferDeviceAddressFn::name(),
                vk::KhrSpirv14Fn::name(),
                vk::KhrShaderFloatControlsFn::name(),
            ]);

        let features = RayTracingFeatures {
            address: vk::PhysicalDeviceBufferDeviceAddressFeatures {
                buffer_device_address: vk::TRUE,
                ..Default::default()
            },
            acceleration: vk::PhysicalDeviceAccelerationStructureFeaturesKHR {
                acceleration_structure: vk::TRUE,
                ..Default::default()
            },
            pipeline: vk::PhysicalDeviceRayTracingPipelineFeaturesKHR {
                ray_tracing_pipeline: vk::TRUE,
                ..Default::default()
            },
        };
        let logic_config = LogicDevConfig::default()
            .extension_features(Box::new(features));

        builder
            .with_instance_config(instance_config)
            .with_physical_device_config(phy_config)
            .with_logic_device_config(logic_config)

    }, |context, _config| example::VulkanExample::new(context));
}
