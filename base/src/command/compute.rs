
use ash::vk;

use crate::command::VkCommandType;
use crate::command::recorder::VkCmdRecorder;
use crate::vkuint;

pub struct ICompute;

impl VkCommandType for ICompute {
    const BIND_POINT: vk::PipelineBindPoint = vk::PipelineBindPoint::COMPUTE;
}

impl<'a> CmdComputeApi for VkCmdRecorder<'a, ICompute> {

    fn dispatch(&self, group_count_x: vkuint, group_count_y: vkuint, group_count_z: vkuint) -> &Self {
        unsafe {
            self.device.logic.handle.cmd_dispatch(self.command, group_count_x, group_count_y, group_count_z);
        } self
    }

    fn dispatch_indirect(&self, buffer: vk::Buffer, offset: vk::DeviceSize) -> &Self {
        unsafe {
            self.device.logic.handle.cmd_dispatch_indirect(self.command, buffer, offset);
        } self
    }

    fn buffer_pipeline_barrier(&self, src_stage: vk::PipelineStageFlags, dst_stage: vk::PipelineStageFlags, dependencies: vk::DependencyFlags, buffer_barriers: &[vk::BufferMemoryBarrier]) -> &Self {
        unsafe {
            self.device.logic.handle.cmd_pipeline_barrier(self.command, src_stage, dst_stage, dependencies, &[], buffer_barriers, &[]);
        } self
    }
}

pub trait CmdComputeApi {

    fn dispatch(&self, group_count_x: vkuint, group_count_y: vkuint, group_count_z: vkuint) -> &Self;

    fn dispatch_indirect(&self, buffer: vk::Buffer, offset: vk::DeviceSize) -> &Self;

    /// Make the writes of one dispatch visible to the next one, or hand buffers to another queue family.
    fn buffer_pipeline_barrier(&self, src_stage: vk::PipelineStageFlags, dst_stage: vk::PipelineStageFlags, dependencies: vk::DependencyFlags, buffer_barriers: &[vk::BufferMemoryBarrier]) -> &Self;
}
