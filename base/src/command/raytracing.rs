
use ash::vk;
use ash::extensions::khr::{AccelerationStructure, RayTracingPipeline};

use crate::command::VkCommandType;
use crate::command::recorder::VkCmdRecorder;
use crate::vkuint;

pub struct IRayTracing;

impl VkCommandType for IRayTracing {
    const BIND_POINT: vk::PipelineBindPoint = vk::PipelineBindPoint::RAY_TRACING_KHR;
}

/// The four regions of a shader binding table passed to `vkCmdTraceRaysKHR`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShaderBindingRegions {
    pub raygen  : vk::StridedDeviceAddressRegionKHR,
    pub miss    : vk::StridedDeviceAddressRegionKHR,
    pub hit     : vk::StridedDeviceAddressRegionKHR,
    pub callable: vk::StridedDeviceAddressRegionKHR,
}

impl<'a, T: VkCommandType> VkCmdRecorder<'a, T> {

    /// Acceleration structures are usually built by one-time commands, so it is available to every recorder.
    ///
    /// `ranges` holds the build ranges of each geometry, one slice for each element of `infos`.
    pub fn build_acceleration_structures(&self, loader: &AccelerationStructure, infos: &[vk::AccelerationStructureBuildGeometryInfoKHR], ranges: &[&[vk::AccelerationStructureBuildRangeInfoKHR]]) -> &Self {
        unsafe {
            loader.cmd_build_acceleration_structures(self.command, infos, ranges);
        } self
    }
}

impl<'a> CmdRayTracingApi for VkCmdRecorder<'a, IRayTracing> {

    fn trace_rays(&self, loader: &RayTracingPipeline, regions: &ShaderBindingRegions, width: vkuint, height: vkuint, depth: vkuint) -> &Self {
        unsafe {
            loader.cmd_trace_rays(self.command, &regions.raygen, &regions.miss, &regions.hit, &regions.callable, width, height, depth);
        } self
    }
}

pub trait CmdRayTracingApi {

    fn trace_rays(&self, loader: &RayTracingPipeline, regions: &ShaderBindingRegions, width: vkuint, height: vkuint, depth: vkuint) -> &Self;
}
