
use ash::vk;

use crate::ci::sync::FenceCI;
use crate::ci::device::SubmitCI;
use crate::ci::VkObjectBuildableCI;

use crate::command::VkCommandType;
use crate::command::recorder::VkCmdRecorder;

use crate::context::VkSubmitCI;
use crate::utils::time::VkTimeDuration;
use crate::VkResult;

pub struct ITransfer;

impl VkCommandType for ITransfer {
    const BIND_POINT: vk::PipelineBindPoint = vk::PipelineBindPoint::GRAPHICS;
}

impl<'a, T: VkCommandType> VkCmdRecorder<'a, T> {

    /// Submit the recorded command to `queue` and wait until it has been executed.
    pub fn flush_copy_command(&self, queue: vk::Queue) -> VkResult<()> {

        let submit_ci = SubmitCI::new()
            .add_command(self.command);

        let wait_fence = FenceCI::new(false).build(self.device)?;

        let result = submit_ci.submit(self.device, queue, wait_fence)
            .and_then(|_| self.device.wait(wait_fence, VkTimeDuration::Infinite));

        self.device.discard(wait_fence);
        result
    }
}

impl<'a, T: VkCommandType> CmdTransferApi for VkCmdRecorder<'a, T> {

    fn copy_buf2buf(&self, src: vk::Buffer, dst: vk::Buffer, regions: &[vk::BufferCopy]) -> &Self {
        unsafe {
            self.device.logic.handle.cmd_copy_buffer(self.command, src, dst, regions);
        } self
    }

    fn copy_buf2img(&self, src: vk::Buffer, dst: vk::Image, dst_layout: vk::ImageLayout, regions: &[vk::BufferImageCopy]) -> &Self {
        unsafe {
            self.device.logic.handle.cmd_copy_buffer_to_image(self.command, src, dst, dst_layout, regions);
        } self
    }

    fn copy_img2buf(&self, src: vk::Image, src_layout: vk::ImageLayout, dst: vk::Buffer, regions: &[vk::BufferImageCopy]) -> &Self {
        unsafe {
            self.device.logic.handle.cmd_copy_image_to_buffer(self.command, src, src_layout, dst, regions);
        } self
    }

    fn copy_img2img(&self, src: vk::Image, src_layout: vk::ImageLayout, dst: vk::Image, dst_layout: vk::ImageLayout, regions: &[vk::ImageCopy]) -> &Self {
        unsafe {
            self.device.logic.handle.cmd_copy_image(self.command, src, src_layout, dst, dst_layout, regions);
        } self
    }

    fn image_pipeline_barrier(&self, src_stage: vk::PipelineStageFlags, dst_stage: vk::PipelineStageFlags, dependencies: vk::DependencyFlags, image_barriers: &[vk::ImageMemoryBarrier]) -> &Self {
        unsafe {
            self.device.logic.handle.cmd_pipeline_barrier(self.command, src_stage, dst_stage, dependencies, &[], &[], image_barriers);
        } self
    }

    fn blit_image(&self, src: vk::Image, src_layout: vk::ImageLayout, dst: vk::Image, dst_layout: vk::ImageLayout, regions: &[vk::ImageBlit], filter: vk::Filter) -> &Self {
        unsafe {
            self.device.logic.handle.cmd_blit_image(self.command, src, src_layout, dst, dst_layout, regions, filter);
        } self
    }
}

pub trait CmdTransferApi {

    fn copy_buf2buf(&self, src: vk::Buffer, dst: vk::Buffer, regions: &[vk::BufferCopy]) -> &Self;

    fn copy_buf2img(&self, src: vk::Buffer, dst: vk::Image, dst_layout: vk::ImageLayout, regions: &[vk::BufferImageCopy]) -> &Self;

    fn copy_img2buf(&self, src: vk::Image, src_layout: vk::ImageLayout, dst: vk::Buffer, regions: &[vk::BufferImageCopy]) -> &Self;

    fn copy_img2img(&self, src: vk::Image, src_layout: vk::ImageLayout, dst: vk::Image, dst_layout: vk::ImageLayout, regions: &[vk::ImageCopy]) -> &Self;

    fn image_pipeline_barrier(&self, src_stage: vk::PipelineStageFlags, dst_stage: vk::PipelineStageFlags, dependencies: vk::DependencyFlags, image_barriers: &[vk::ImageMemoryBarrier]) -> &Self;

    fn blit_image(&self, src: vk::Image, src_layout: vk::ImageLayout, dst: vk::Image, dst_layout: vk::ImageLayout, regions: &[vk::ImageBlit], filter: vk::Filter) -> &Self;
}
