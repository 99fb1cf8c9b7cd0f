
use ash::vk;

use crate::command::VkCommandType;
use crate::command::recorder::VkCmdRecorder;
use crate::ci::pipeline::RenderPassBI;
use crate::{vkuint, vkfloat, vksint, vkbytes};

pub struct IGraphics;

impl VkCommandType for IGraphics {
    const BIND_POINT: vk::PipelineBindPoint = vk::PipelineBindPoint::GRAPHICS;
}

impl<'a> CmdGraphicsApi for VkCmdRecorder<'a, IGraphics> {

    fn begin_render_pass(&self, bi: RenderPassBI) -> &Self {

        // only primary command buffers are recorded, so the contents are always inline.
        let begin_info = bi.value();
        unsafe {
            self.device.logic.handle.cmd_begin_render_pass(self.command, &begin_info, vk::SubpassContents::INLINE);
        } self
    }

    fn next_subpass(&self) -> &Self {
        unsafe {
            self.device.logic.handle.cmd_next_subpass(self.command, vk::SubpassContents::INLINE);
        } self
    }

    fn set_viewport(&self, first_viewport: vkuint, viewports: &[vk::Viewport]) -> &Self {
        unsafe {
            self.device.logic.handle.cmd_set_viewport(self.command, first_viewport, viewports);
        } self
    }

    fn set_scissor(&self, first_scissor: vkuint, scissors: &[vk::Rect2D]) -> &Self {
        unsafe {
            self.device.logic.handle.cmd_set_scissor(self.command, first_scissor, scissors);
        } self
    }

    fn set_line_width(&self, width: vkfloat) -> &Self {
        unsafe {
            self.device.logic.handle.cmd_set_line_width(self.command, width);
        } self
    }

    fn set_depth_bias(&self, constant_factor: vkfloat, clamp: vkfloat, slope_factor: vkfloat) -> &Self {
        unsafe {
            self.device.logic.handle.cmd_set_depth_bias(self.command, constant_factor, clamp, slope_factor);
        } self
    }

    fn set_blend_constants(&self, constants: [vkfloat; 4]) -> &Self {
        unsafe {
            self.device.logic.handle.cmd_set_blend_constants(self.command, &constants);
        } self
    }

    fn set_depth_bound(&self, min: vkfloat, max: vkfloat) -> &Self {
        unsafe {
            self.device.logic.handle.cmd_set_depth_bounds(self.command, min, max);
        } self
    }

    fn set_stencil_compare_mask(&self, face: vk::StencilFaceFlags, mask: vkuint) -> &Self {
        unsafe {
            self.device.logic.handle.cmd_set_stencil_compare_mask(self.command, face, mask);
        } self
    }

    fn set_stencil_write_mask(&self, face: vk::StencilFaceFlags, mask: vkuint) -> &Self {
        unsafe {
            self.device.logic.handle.cmd_set_stencil_write_mask(self.command, face, mask);
        } self
    }

    fn set_stencil_reference(&self, face: vk::StencilFaceFlags, reference: vkuint) -> &Self {
        unsafe {
            self.device.logic.handle.cmd_set_stencil_reference(self.command, face, reference);
        } self
    }

    fn bind_vertex_buffers(&self, first_binding: vkuint, buffers: &[vk::Buffer], offsets: &[vkbytes]) -> &Self {
        unsafe {
            self.device.logic.handle.cmd_bind_vertex_buffers(self.command, first_binding, buffers, offsets);
        } self
    }

    fn bind_index_buffer(&self, buffer: vk::Buffer, index_type: vk::IndexType, offset: vkbytes) -> &Self {
        unsafe {
            self.device.logic.handle.cmd_bind_index_buffer(self.command, buffer, offset, index_type);
        } self
    }

    fn draw(&self, vertex_count: vkuint, instance_count: vkuint, first_vertex: vkuint, first_instance: vkuint) -> &Self {
        unsafe {
            self.device.logic.handle.cmd_draw(self.command, vertex_count, instance_count, first_vertex, first_instance);
        } self
    }

    fn draw_indexed(&self, index_count: vkuint, instance_count: vkuint, first_index: vkuint, vertex_offset: vksint, first_instance: vkuint) -> &Self {
        unsafe {
            self.device.logic.handle.cmd_draw_indexed(self.command, index_count, instance_count, first_index, vertex_offset, first_instance);
        } self
    }

    fn end_render_pass(&self) -> &Self {
        unsafe {
            self.device.logic.handle.cmd_end_render_pass(self.command);
        } self
    }
}

pub trait CmdGraphicsApi {

    fn begin_render_pass(&self, bi: RenderPassBI) -> &Self;

    fn next_subpass(&self) -> &Self;

    /// Set the viewport dynamically.
    fn set_viewport(&self, first_viewport: vkuint, viewports: &[vk::Viewport]) -> &Self;

    /// Set the scissor rectangles dynamically.
    fn set_scissor(&self, first_scissor: vkuint, scissors: &[vk::Rect2D]) -> &Self;

    fn set_line_width(&self, width: vkfloat) -> &Self;

    fn set_depth_bias(&self, constant_factor: vkfloat, clamp: vkfloat, slope_factor: vkfloat) -> &Self;

    fn set_blend_constants(&self, constants: [vkfloat; 4]) -> &Self;

    fn set_depth_bound(&self, min: vkfloat, max: vkfloat) -> &Self;

    fn set_stencil_compare_mask(&self, face: vk::StencilFaceFlags, mask: vkuint) -> &Self;

    fn set_stencil_write_mask(&self, face: vk::StencilFaceFlags, mask: vkuint) -> &Self;

    fn set_stencil_reference(&self, face: vk::StencilFaceFlags, reference: vkuint) -> &Self;

    fn bind_vertex_buffers(&self, first_binding: vkuint, buffers: &[vk::Buffer], offsets: &[vkbytes]) -> &Self;

    fn bind_index_buffer(&self, buffer: vk::Buffer, index_type: vk::IndexType, offset: vkbytes) -> &Self;

    fn draw(&self, vertex_count: vkuint, instance_count: vkuint, first_vertex: vkuint, first_instance: vkuint) -> &Self;

    fn draw_indexed(&self, index_count: vkuint, instance_count: vkuint, first_index: vkuint, vertex_offset: vksint, first_instance: vkuint) -> &Self;

    fn end_render_pass(&self) -> &Self;
}
