
use ash::vk;

use crate::command::VkCommandType;
use crate::context::VkDevice;
use crate::error::{VkResult, VkError};
use crate::utils::memory::as_bytes;
use crate::vkuint;

use std::marker::PhantomData;

pub struct VkCmdRecorder<'a, T> {

    phantom_marker: PhantomData<T>,

    pub(super) device: &'a VkDevice,
    pub(super) command: vk::CommandBuffer,
    usage: vk::CommandBufferUsageFlags,
}

impl<'a, T: VkCommandType> VkCmdRecorder<'a, T> {

    pub fn new(device: &'a VkDevice, command: vk::CommandBuffer) -> VkCmdRecorder<'a, T> {

        VkCmdRecorder {
            device, command,
            usage: vk::CommandBufferUsageFlags::empty(),
            phantom_marker: PhantomData,
        }
    }

    pub fn set_usage(&mut self, flags: vk::CommandBufferUsageFlags) {
        self.usage = flags;
    }

    pub fn begin_record(&self) -> VkResult<&VkCmdRecorder<'a, T>> {

        let begin_ci = vk::CommandBufferBeginInfo {
            flags: self.usage,
            ..Default::default()
        };

        unsafe {
            self.device.logic.handle.begin_command_buffer(self.command, &begin_ci)
                .map_err(|_| VkError::device("Begin Command Buffer."))?;
        }
        Ok(self)
    }

    pub fn end_record(&self) -> VkResult<()> {

        unsafe {
            self.device.logic.handle.end_command_buffer(self.command)
                .map_err(|_| VkError::device("End Command Buffer."))
        }
    }

    pub fn bind_pipeline(&self, pipeline: vk::Pipeline) -> &VkCmdRecorder<'a, T> {
        unsafe {
            self.device.logic.handle.cmd_bind_pipeline(self.command, T::BIND_POINT, pipeline);
        } self
    }

    pub fn bind_descriptor_sets(&self, layout: vk::PipelineLayout, first_set: vkuint, descriptor_sets: &[vk::DescriptorSet], dynamic_offsets: &[vkuint]) -> &VkCmdRecorder<'a, T> {
        unsafe {
            self.device.logic.handle.cmd_bind_descriptor_sets(self.command, T::BIND_POINT, layout, first_set, descriptor_sets, dynamic_offsets);
        } self
    }

    pub fn push_constants<D: Copy>(&self, layout: vk::PipelineLayout, stage: vk::ShaderStageFlags, offset: vkuint, data: &D) -> &VkCmdRecorder<'a, T> {
        unsafe {
            self.device.logic.handle.cmd_push_constants(self.command, layout, stage, offset, as_bytes(::std::slice::from_ref(data)));
        } self
    }

    pub fn pipeline_barrier(&self, src_stage: vk::PipelineStageFlags, dst_stage: vk::PipelineStageFlags, dependencies: vk::DependencyFlags, memory_barriers: &[vk::MemoryBarrier], buffer_barriers: &[vk::BufferMemoryBarrier], image_barriers: &[vk::ImageMemoryBarrier]) -> &VkCmdRecorder<'a, T> {
        unsafe {
            self.device.logic.handle.cmd_pipeline_barrier(self.command, src_stage, dst_stage, dependencies, memory_barriers, buffer_barriers, image_barriers);
        } self
    }

    pub fn reset_query_pool(&self, pool: vk::QueryPool, first_query: vkuint, count: vkuint) -> &VkCmdRecorder<'a, T> {
        unsafe {
            self.device.logic.handle.cmd_reset_query_pool(self.command, pool, first_query, count);
        } self
    }

    pub fn begin_query(&self, pool: vk::QueryPool, query: vkuint) -> &VkCmdRecorder<'a, T> {
        unsafe {
            self.device.logic.handle.cmd_begin_query(self.command, pool, query, vk::QueryControlFlags::empty());
        } self
    }

    pub fn end_query(&self, pool: vk::QueryPool, query: vkuint) -> &VkCmdRecorder<'a, T> {
        unsafe {
            self.device.logic.handle.cmd_end_query(self.command, pool, query);
        } self
    }
}
