
use ash::vk;

use crate::context::{VkDevice, VkObjectDiscardable};
use crate::ci::{VulkanCI, VkObjectBuildableCI};
use crate::error::{VkResult, VkError};
use crate::vkuint;

use std::ops::Deref;
use std::ptr;

// ----------------------------------------------------------------------------------------------
/// Wrapper class for `vk::RenderPassBeginInfo`.
#[derive(Clone)]
pub struct RenderPassBI {

    inner: vk::RenderPassBeginInfo,
    clears: Vec<vk::ClearValue>,
}

impl VulkanCI<vk::RenderPassBeginInfo> for RenderPassBI {

    fn default_ci() -> vk::RenderPassBeginInfo {
        vk::RenderPassBeginInfo::default()
    }
}

impl RenderPassBI {

    pub fn new(render_pass: vk::RenderPass, framebuffer: vk::Framebuffer) -> RenderPassBI {

        RenderPassBI {
            inner: vk::RenderPassBeginInfo {
                render_pass, framebuffer,
                ..RenderPassBI::default_ci()
            },
            clears: Vec::new(),
        }
    }

    #[inline(always)]
    pub fn render_extent(mut self, area: vk::Extent2D) -> RenderPassBI {
        self.inner.render_area.extent = area; self
    }

    #[inline(always)]
    pub fn add_clear_value(mut self, value: vk::ClearValue) -> RenderPassBI {
        self.clears.push(value); self
    }

    #[inline(always)]
    pub fn set_clear_values(mut self, values: Vec<vk::ClearValue>) -> RenderPassBI {
        self.clears = values; self
    }

    pub fn value(&self) -> vk::RenderPassBeginInfo {

        vk::RenderPassBeginInfo {
            clear_value_count: self.clears.len() as _,
            p_clear_values   : self.clears.as_ptr(),
            ..self.inner
        }
    }
}
// ----------------------------------------------------------------------------------------------

// ----------------------------------------------------------------------------------------------
/// Wrapper class for `vk::RenderPassCreateInfo`.
#[derive(Debug, Clone)]
pub struct RenderPassCI {

    inner: vk::RenderPassCreateInfo,
    attachments : Vec<vk::AttachmentDescription>,
    subpasses   : Vec<SubpassDescCI>,
    dependencies: Vec<vk::SubpassDependency>,

    view_masks: Vec<vkuint>,
    correlation_masks: Vec<vkuint>,
}

impl VulkanCI<vk::RenderPassCreateInfo> for RenderPassCI {

    fn default_ci() -> vk::RenderPassCreateInfo {
        vk::RenderPassCreateInfo::default()
    }
}

impl VkObjectBuildableCI for RenderPassCI {
    type ObjectType = vk::RenderPass;

    fn build(&self, device: &VkDevice) -> VkResult<Self::ObjectType> {

        debug_assert!(!self.subpasses.is_empty(), "A render pass requires at least one subpass.");

        let subpasses: Vec<vk::SubpassDescription> = self.subpasses.iter()
            .map(SubpassDescCI::value)
            .collect();

        let multiview_ci = vk::RenderPassMultiviewCreateInfo {
            subpass_count          : self.view_masks.len() as _,
            p_view_masks           : self.view_masks.as_ptr(),
            correlation_mask_count : self.correlation_masks.len() as _,
            p_correlation_masks    : self.correlation_masks.as_ptr(),
            ..Default::default()
        };

        let render_pass_ci = vk::RenderPassCreateInfo {
            p_next: if self.view_masks.is_empty() {
                ptr::null()
            } else {
                &multiview_ci as *const vk::RenderPassMultiviewCreateInfo as *const _
            },
            attachment_count: self.attachments.len() as _,
            p_attachments   : self.attachments.as_ptr(),
            subpass_count   : subpasses.len() as _,
            p_subpasses     : subpasses.as_ptr(),
            dependency_count: self.dependencies.len() as _,
            p_dependencies  : self.dependencies.as_ptr(),
            ..self.inner
        };

        let render_pass = unsafe {
            device.logic.handle.create_render_pass(&render_pass_ci, None)
                .map_err(|_| VkError::create("Render Pass"))?
        };
        Ok(render_pass)
    }
}

impl RenderPassCI {

    pub fn new() -> RenderPassCI {

        RenderPassCI {
            inner: RenderPassCI::default_ci(),
            attachments : Vec::new(),
            subpasses   : Vec::new(),
            dependencies: Vec::new(),
            view_masks: Vec::new(),
            correlation_masks: Vec::new(),
        }
    }

    #[inline]
    pub fn add_attachment(mut self, attachment: AttachmentDescCI) -> RenderPassCI {
        self.attachments.push(attachment.inner); self
    }

    #[inline]
    pub fn add_subpass(mut self, subpass: SubpassDescCI) -> RenderPassCI {
        self.subpasses.push(subpass); self
    }

    #[inline]
    pub fn add_dependency(mut self, dependency: SubpassDependencyCI) -> RenderPassCI {
        self.dependencies.push(dependency.inner); self
    }

    /// Render into several views at once, `view_masks` holds one mask per subpass.
    pub fn multiview(mut self, view_masks: Vec<vkuint>, correlation_masks: Vec<vkuint>) -> RenderPassCI {
        self.view_masks = view_masks;
        self.correlation_masks = correlation_masks; self
    }

    #[inline(always)]
    pub fn flags(mut self, flags: vk::RenderPassCreateFlags) -> RenderPassCI {
        self.inner.flags = flags; self
    }
}

impl VkObjectDiscardable for vk::RenderPass {

    fn discard_by(self, device: &VkDevice) {
        unsafe {
            device.logic.handle.destroy_render_pass(self, None);
        }
    }
}
// ----------------------------------------------------------------------------------------------

// ----------------------------------------------------------------------------------------------
/// Wrapper class for `vk::AttachmentDescription`.
#[derive(Debug, Clone)]
pub struct AttachmentDescCI {
    inner: vk::AttachmentDescription,
}

impl VulkanCI<vk::AttachmentDescription> for AttachmentDescCI {

    fn default_ci() -> vk::AttachmentDescription {

        vk::AttachmentDescription {
            samples          : vk::SampleCountFlags::TYPE_1,
            load_op          : vk::AttachmentLoadOp::CLEAR,
            store_op         : vk::AttachmentStoreOp::STORE,
            stencil_load_op  : vk::AttachmentLoadOp::DONT_CARE,
            stencil_store_op : vk::AttachmentStoreOp::DONT_CARE,
            initial_layout   : vk::ImageLayout::UNDEFINED,
            final_layout     : vk::ImageLayout::PRESENT_SRC_KHR,
            ..Default::default()
        }
    }
}

impl Deref for AttachmentDescCI {
    type Target = vk::AttachmentDescription;

    fn deref(&self) -> &vk::AttachmentDescription {
        &self.inner
    }
}

impl AttachmentDescCI {

    pub fn new(format: vk::Format) -> AttachmentDescCI {

        AttachmentDescCI {
            inner: vk::AttachmentDescription {
                format,
                ..AttachmentDescCI::default_ci()
            },
        }
    }

    #[inline(always)]
    pub fn op(mut self, load: vk::AttachmentLoadOp, store: vk::AttachmentStoreOp) -> AttachmentDescCI {
        self.inner.load_op = load;
        self.inner.store_op = store; self
    }

    #[inline(always)]
    pub fn layout(mut self, initial: vk::ImageLayout, r#final: vk::ImageLayout) -> AttachmentDescCI {
        self.inner.initial_layout = initial;
        self.inner.final_layout = r#final; self
    }
}
// ----------------------------------------------------------------------------------------------

// ----------------------------------------------------------------------------------------------
/// Wrapper class for `vk::SubpassDescription`.
#[derive(Debug, Clone)]
pub struct SubpassDescCI {

    inner: vk::SubpassDescription,

    colors: Vec<vk::AttachmentReference>,
    depth_stencil: Option<Box<vk::AttachmentReference>>,
}

impl VulkanCI<vk::SubpassDescription> for SubpassDescCI {

    fn default_ci() -> vk::SubpassDescription {

        vk::SubpassDescription {
            pipeline_bind_point: vk::PipelineBindPoint::GRAPHICS,
            ..Default::default()
        }
    }
}

impl SubpassDescCI {

    pub fn new(bind_point: vk::PipelineBindPoint) -> SubpassDescCI {

        SubpassDescCI {
            inner: vk::SubpassDescription {
                pipeline_bind_point: bind_point,
                ..SubpassDescCI::default_ci()
            },
            colors: Vec::new(),
            depth_stencil: None,
        }
    }

    #[inline]
    pub fn add_color_attachment(mut self, attachment: vkuint, layout: vk::ImageLayout) -> SubpassDescCI {
        self.colors.push(vk::AttachmentReference { attachment, layout }); self
    }

    pub fn set_depth_stencil_attachment(mut self, attachment: vkuint, layout: vk::ImageLayout) -> SubpassDescCI {
        self.depth_stencil = Some(Box::new(vk::AttachmentReference { attachment, layout })); self
    }

    pub fn value(&self) -> vk::SubpassDescription {

        let depth_stencil = self.depth_stencil.as_ref()
            .map(|reference| reference.as_ref() as *const vk::AttachmentReference)
            .unwrap_or(ptr::null());

        vk::SubpassDescription {
            color_attachment_count    : self.colors.len() as _,
            p_color_attachments       : self.colors.as_ptr(),
            p_depth_stencil_attachment: depth_stencil,
            ..self.inner
        }
    }
}
// ----------------------------------------------------------------------------------------------

// ----------------------------------------------------------------------------------------------
/// Wrapper class for `vk::SubpassDependency`.
#[derive(Debug, Clone)]
pub struct SubpassDependencyCI {
    inner: vk::SubpassDependency,
}

impl VulkanCI<vk::SubpassDependency> for SubpassDependencyCI {

    fn default_ci() -> vk::SubpassDependency {

        vk::SubpassDependency {
            src_subpass: vk::SUBPASS_EXTERNAL,
            dst_subpass: 0,
            dependency_flags: vk::DependencyFlags::BY_REGION,
            ..Default::default()
        }
    }
}

impl Deref for SubpassDependencyCI {
    type Target = vk::SubpassDependency;

    fn deref(&self) -> &vk::SubpassDependency {
        &self.inner
    }
}

impl SubpassDependencyCI {

    pub fn new(src: vkuint, dst: vkuint) -> SubpassDependencyCI {

        SubpassDependencyCI {
            inner: vk::SubpassDependency {
                src_subpass: src,
                dst_subpass: dst,
                ..SubpassDependencyCI::default_ci()
            },
        }
    }

    #[inline(always)]
    pub fn stage_mask(mut self, src: vk::PipelineStageFlags, dst: vk::PipelineStageFlags) -> SubpassDependencyCI {
        self.inner.src_stage_mask = src;
        self.inner.dst_stage_mask = dst; self
    }

    #[inline(always)]
    pub fn access_mask(mut self, src: vk::AccessFlags, dst: vk::AccessFlags) -> SubpassDependencyCI {
        self.inner.src_access_mask = src;
        self.inner.dst_access_mask = dst; self
    }

    #[inline(always)]
    pub fn flags(mut self, flags: vk::DependencyFlags) -> SubpassDependencyCI {
        self.inner.dependency_flags = flags; self
    }
}
// ----------------------------------------------------------------------------------------------

// ----------------------------------------------------------------------------------------------
/// Wrapper class for `vk::FramebufferCreateInfo`.
#[derive(Debug, Clone)]
pub struct FramebufferCI {

    inner: vk::FramebufferCreateInfo,
    attachments: Vec<vk::ImageView>,
}

impl VulkanCI<vk::FramebufferCreateInfo> for FramebufferCI {

    fn default_ci() -> vk::FramebufferCreateInfo {

        vk::FramebufferCreateInfo {
            layers: 1,
            ..Default::default()
        }
    }
}

impl VkObjectBuildableCI for FramebufferCI {
    type ObjectType = vk::Framebuffer;

    fn build(&self, device: &VkDevice) -> VkResult<Self::ObjectType> {

        let framebuffer_ci = vk::FramebufferCreateInfo {
            attachment_count: self.attachments.len() as _,
            p_attachments   : self.attachments.as_ptr(),
            ..self.inner
        };

        let framebuffer = unsafe {
            device.logic.handle.create_framebuffer(&framebuffer_ci, None)
                .map_err(|_| VkError::create("Framebuffer"))?
        };
        Ok(framebuffer)
    }
}

impl FramebufferCI {

    pub fn new(render_pass: vk::RenderPass, dimension: vk::Extent3D) -> FramebufferCI {

        FramebufferCI {
            inner: vk::FramebufferCreateInfo {
                render_pass,
                width : dimension.width,
                height: dimension.height,
                layers: dimension.depth,
                ..FramebufferCI::default_ci()
            },
            attachments: Vec::new(),
        }
    }

    pub fn new_2d(render_pass: vk::RenderPass, dimension: vk::Extent2D) -> FramebufferCI {

        FramebufferCI::new(render_pass, vk::Extent3D {
            width : dimension.width,
            height: dimension.height,
            depth : 1,
        })
    }

    #[inline(always)]
    pub fn add_attachment(mut self, attachment: vk::ImageView) -> FramebufferCI {
        self.attachments.push(attachment); self
    }
}

impl VkObjectDiscardable for vk::Framebuffer {

    fn discard_by(self, device: &VkDevice) {
        unsafe {
            device.logic.handle.destroy_framebuffer(self, None);
        }
    }
}
// ----------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subpass_references_point_to_owned_arrays() {

        let subpass = SubpassDescCI::new(vk::PipelineBindPoint::GRAPHICS)
            .add_color_attachment(0, vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)
            .add_color_attachment(1, vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)
            .set_depth_stencil_attachment(2, vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL);

        let raw = subpass.value();
        assert_eq!(raw.color_attachment_count, 2);
        assert!(raw.p_resolve_attachments.is_null());
        assert_eq!(unsafe { (*raw.p_depth_stencil_attachment).attachment }, 2);
    }

    #[test]
    fn render_pass_collects_every_part() {

        let render_pass = RenderPassCI::new()
            .add_attachment(AttachmentDescCI::new(vk::Format::B8G8R8A8_UNORM))
            .add_subpass(SubpassDescCI::new(vk::PipelineBindPoint::GRAPHICS)
                .add_color_attachment(0, vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL))
            .add_dependency(SubpassDependencyCI::new(vk::SUBPASS_EXTERNAL, 0))
            .multiview(vec![0b11], vec![0b11]);

        assert_eq!(render_pass.attachments.len(), 1);
        assert_eq!(render_pass.subpasses.len(), 1);
        assert_eq!(render_pass.view_masks, vec![0b11]);
    }

    #[test]
    fn layered_framebuffer_keeps_layer_count() {

        let framebuffer = FramebufferCI::new(vk::RenderPass::null(), vk::Extent3D { width: 64, height: 32, depth: 4 });
        assert_eq!(framebuffer.inner.layers, 4);
        assert_eq!(FramebufferCI::new_2d(vk::RenderPass::null(), vk::Extent2D { width: 1, height: 1 }).inner.layers, 1);
    }
}
