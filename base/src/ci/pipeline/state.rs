//! Fixed-function states of a graphics pipeline.
//!
//! States which own arrays expose `value()`, which returns the raw struct pointing into those arrays.
//! The returned struct is only valid while the state object is alive and unmoved.

use ash::vk;

use crate::ci::VulkanCI;
use crate::{vkuint, vkbool};

use std::ops::Deref;
use std::ptr;

#[inline(always)]
fn vk_bool(value: bool) -> vkbool {
    if value { vk::TRUE } else { vk::FALSE }
}

// ----------------------------------------------------------------------------------------------
/// Wrapper class for `vk::PipelineVertexInputStateCreateInfo`.
#[derive(Debug, Clone)]
pub struct VertexInputSCI {

    inner: vk::PipelineVertexInputStateCreateInfo,
    bindings  : Vec<vk::VertexInputBindingDescription>,
    attributes: Vec<vk::VertexInputAttributeDescription>,
}

impl VulkanCI<vk::PipelineVertexInputStateCreateInfo> for VertexInputSCI {

    fn default_ci() -> vk::PipelineVertexInputStateCreateInfo {
        vk::PipelineVertexInputStateCreateInfo::default()
    }
}

impl VertexInputSCI {

    pub fn new() -> VertexInputSCI {

        VertexInputSCI {
            inner: VertexInputSCI::default_ci(),
            bindings  : Vec::new(),
            attributes: Vec::new(),
        }
    }

    #[inline(always)]
    pub fn add_binding(mut self, binding: vk::VertexInputBindingDescription) -> VertexInputSCI {
        self.bindings.push(binding); self
    }

    #[inline(always)]
    pub fn add_attribute(mut self, attribute: vk::VertexInputAttributeDescription) -> VertexInputSCI {
        self.attributes.push(attribute); self
    }

    #[inline(always)]
    pub fn flags(mut self, flags: vk::PipelineVertexInputStateCreateFlags) -> VertexInputSCI {
        self.inner.flags = flags; self
    }

    /// The stride of the vertex buffer at `binding`, or `None` if the binding is not declared.
    pub fn stride_of(&self, binding: vkuint) -> Option<vkuint> {
        self.bindings.iter()
            .find(|b| b.binding == binding)
            .map(|b| b.stride)
    }

    pub fn value(&self) -> vk::PipelineVertexInputStateCreateInfo {

        vk::PipelineVertexInputStateCreateInfo {
            vertex_binding_description_count  : self.bindings.len() as _,
            p_vertex_binding_descriptions     : self.bindings.as_ptr(),
            vertex_attribute_description_count: self.attributes.len() as _,
            p_vertex_attribute_descriptions   : self.attributes.as_ptr(),
            ..self.inner
        }
    }
}
// ----------------------------------------------------------------------------------------------

// ----------------------------------------------------------------------------------------------
/// Wrapper class for `vk::PipelineInputAssemblyStateCreateInfo`.
#[derive(Debug, Clone)]
pub struct InputAssemblySCI {
    inner: vk::PipelineInputAssemblyStateCreateInfo,
}

impl VulkanCI<vk::PipelineInputAssemblyStateCreateInfo> for InputAssemblySCI {

    fn default_ci() -> vk::PipelineInputAssemblyStateCreateInfo {

        vk::PipelineInputAssemblyStateCreateInfo {
            topology: vk::PrimitiveTopology::TRIANGLE_LIST,
            primitive_restart_enable: vk::FALSE,
            ..Default::default()
        }
    }
}

impl Deref for InputAssemblySCI {
    type Target = vk::PipelineInputAssemblyStateCreateInfo;

    fn deref(&self) -> &vk::PipelineInputAssemblyStateCreateInfo {
        &self.inner
    }
}

impl InputAssemblySCI {

    #[inline(always)]
    pub fn new() -> InputAssemblySCI {
        InputAssemblySCI { inner: InputAssemblySCI::default_ci() }
    }

    #[inline(always)]
    pub fn topology(mut self, topology: vk::PrimitiveTopology) -> InputAssemblySCI {
        self.inner.topology = topology; self
    }

    #[inline(always)]
    pub fn primitive_restart(mut self, is_enable: bool) -> InputAssemblySCI {
        self.inner.primitive_restart_enable = vk_bool(is_enable); self
    }
}
// ----------------------------------------------------------------------------------------------

// ----------------------------------------------------------------------------------------------
/// Wrapper class for `vk::PipelineTessellationStateCreateInfo`.
#[derive(Debug, Clone)]
pub struct TessellationSCI {
    inner: vk::PipelineTessellationStateCreateInfo,
}

impl VulkanCI<vk::PipelineTessellationStateCreateInfo> for TessellationSCI {

    fn default_ci() -> vk::PipelineTessellationStateCreateInfo {

        vk::PipelineTessellationStateCreateInfo {
            patch_control_points: 3,
            ..Default::default()
        }
    }
}

impl Deref for TessellationSCI {
    type Target = vk::PipelineTessellationStateCreateInfo;

    fn deref(&self) -> &vk::PipelineTessellationStateCreateInfo {
        &self.inner
    }
}

impl TessellationSCI {

    pub fn new(patch_control_points: vkuint) -> TessellationSCI {

        debug_assert!(patch_control_points > 0);

        TessellationSCI {
            inner: vk::PipelineTessellationStateCreateInfo {
                patch_control_points,
                ..TessellationSCI::default_ci()
            },
        }
    }
}
// ----------------------------------------------------------------------------------------------

// ----------------------------------------------------------------------------------------------
/// Wrapper class for `vk::PipelineRasterizationStateCreateInfo`.
#[derive(Debug, Clone)]
pub struct RasterizationSCI {
    inner: vk::PipelineRasterizationStateCreateInfo,
}

impl VulkanCI<vk::PipelineRasterizationStateCreateInfo> for RasterizationSCI {

    fn default_ci() -> vk::PipelineRasterizationStateCreateInfo {

        vk::PipelineRasterizationStateCreateInfo {
            polygon_mode: vk::PolygonMode::FILL,
            cull_mode   : vk::CullModeFlags::NONE,
            front_face  : vk::FrontFace::COUNTER_CLOCKWISE,
            line_width  : 1.0,
            ..Default::default()
        }
    }
}

impl Deref for RasterizationSCI {
    type Target = vk::PipelineRasterizationStateCreateInfo;

    fn deref(&self) -> &vk::PipelineRasterizationStateCreateInfo {
        &self.inner
    }
}

impl RasterizationSCI {

    #[inline(always)]
    pub fn new() -> RasterizationSCI {
        RasterizationSCI { inner: RasterizationSCI::default_ci() }
    }

    /// Clamp fragment depth instead of clipping primitives, used by shadow map passes.
    #[inline(always)]
    pub fn depth_clamp(mut self, is_enable: bool) -> RasterizationSCI {
        self.inner.depth_clamp_enable = vk_bool(is_enable); self
    }

    #[inline(always)]
    pub fn cull_face(mut self, mode: vk::CullModeFlags, front_face: vk::FrontFace) -> RasterizationSCI {
        self.inner.cull_mode = mode;
        self.inner.front_face = front_face; self
    }

    #[inline(always)]
    pub fn polygon(mut self, mode: vk::PolygonMode) -> RasterizationSCI {
        self.inner.polygon_mode = mode; self
    }

}
// ----------------------------------------------------------------------------------------------

// ----------------------------------------------------------------------------------------------
/// Wrapper class for `vk::PipelineColorBlendStateCreateInfo`.
#[derive(Debug, Clone)]
pub struct ColorBlendSCI {

    inner: vk::PipelineColorBlendStateCreateInfo,
    attachments: Vec<vk::PipelineColorBlendAttachmentState>,
}

impl VulkanCI<vk::PipelineColorBlendStateCreateInfo> for ColorBlendSCI {

    fn default_ci() -> vk::PipelineColorBlendStateCreateInfo {

        vk::PipelineColorBlendStateCreateInfo {
            logic_op: vk::LogicOp::COPY,
            ..Default::default()
        }
    }
}

impl ColorBlendSCI {

    pub fn new() -> ColorBlendSCI {

        ColorBlendSCI {
            inner: ColorBlendSCI::default_ci(),
            attachments: Vec::new(),
        }
    }

    #[inline(always)]
    pub fn add_attachment(mut self, attachment: BlendAttachmentSCI) -> ColorBlendSCI {
        self.attachments.push(attachment.inner); self
    }

    /// Add the same opaque attachment `count` times, e.g. for each target of a G-Buffer.
    pub fn add_opaque_attachments(mut self, count: usize) -> ColorBlendSCI {
        self.attachments.extend((0..count).map(|_| BlendAttachmentSCI::new().inner)); self
    }

    pub fn value(&self) -> vk::PipelineColorBlendStateCreateInfo {

        vk::PipelineColorBlendStateCreateInfo {
            attachment_count: self.attachments.len() as _,
            p_attachments   : self.attachments.as_ptr(),
            ..self.inner
        }
    }
}
// ----------------------------------------------------------------------------------------------

// ----------------------------------------------------------------------------------------------
/// Wrapper class for `vk::PipelineColorBlendAttachmentState`.
#[derive(Debug, Clone)]
pub struct BlendAttachmentSCI {
    inner: vk::PipelineColorBlendAttachmentState,
}

impl VulkanCI<vk::PipelineColorBlendAttachmentState> for BlendAttachmentSCI {

    fn default_ci() -> vk::PipelineColorBlendAttachmentState {

        vk::PipelineColorBlendAttachmentState {
            blend_enable: vk::FALSE,
            src_color_blend_factor: vk::BlendFactor::ONE,
            dst_color_blend_factor: vk::BlendFactor::ZERO,
            color_blend_op: vk::BlendOp::ADD,
            src_alpha_blend_factor: vk::BlendFactor::ONE,
            dst_alpha_blend_factor: vk::BlendFactor::ZERO,
            alpha_blend_op: vk::BlendOp::ADD,
            color_write_mask: vk::ColorComponentFlags::RGBA,
        }
    }
}

impl Deref for BlendAttachmentSCI {
    type Target = vk::PipelineColorBlendAttachmentState;

    fn deref(&self) -> &vk::PipelineColorBlendAttachmentState {
        &self.inner
    }
}

impl BlendAttachmentSCI {

    pub fn new() -> BlendAttachmentSCI {
        BlendAttachmentSCI { inner: BlendAttachmentSCI::default_ci() }
    }

    #[inline(always)]
    pub fn color(mut self, op: vk::BlendOp, src_factor: vk::BlendFactor, dst_factor: vk::BlendFactor) -> BlendAttachmentSCI {
        self.inner.color_blend_op = op;
        self.inner.src_color_blend_factor = src_factor;
        self.inner.dst_color_blend_factor = dst_factor; self
    }

}
// ----------------------------------------------------------------------------------------------

// ----------------------------------------------------------------------------------------------
/// Wrapper class for `vk::PipelineViewportStateCreateInfo`.
///
/// Viewports and scissors may be left empty when they are dynamic states,
/// in that case only their count is provided to Vulkan.
#[derive(Debug, Clone)]
pub struct ViewportSCI {

    inner: vk::PipelineViewportStateCreateInfo,
    viewports: Vec<vk::Viewport>,
    scissors : Vec<vk::Rect2D>,
}

impl VulkanCI<vk::PipelineViewportStateCreateInfo> for ViewportSCI {

    fn default_ci() -> vk::PipelineViewportStateCreateInfo {

        vk::PipelineViewportStateCreateInfo {
            viewport_count: 1,
            scissor_count : 1,
            ..Default::default()
        }
    }
}

impl ViewportSCI {

    /// One dynamic viewport and one dynamic scissor.
    pub fn new() -> ViewportSCI {
        ViewportSCI::dynamic(1)
    }

    pub fn dynamic(count: vkuint) -> ViewportSCI {

        ViewportSCI {
            inner: vk::PipelineViewportStateCreateInfo {
                viewport_count: count,
                scissor_count : count,
                ..ViewportSCI::default_ci()
            },
            viewports: Vec::new(),
            scissors : Vec::new(),
        }
    }

    #[inline(always)]
    pub fn add_viewport(mut self, viewport: vk::Viewport) -> ViewportSCI {
        self.viewports.push(viewport); self
    }

    #[inline(always)]
    pub fn add_scissor(mut self, scissor: vk::Rect2D) -> ViewportSCI {
        self.scissors.push(scissor); self
    }

    pub fn value(&self) -> vk::PipelineViewportStateCreateInfo {

        let mut value = self.inner;

        if !self.viewports.is_empty() {
            value.viewport_count = self.viewports.len() as _;
            value.p_viewports = self.viewports.as_ptr();
        }
        if !self.scissors.is_empty() {
            value.scissor_count = self.scissors.len() as _;
            value.p_scissors = self.scissors.as_ptr();
        }

        value
    }
}
// ----------------------------------------------------------------------------------------------

// ----------------------------------------------------------------------------------------------
/// Wrapper class for `vk::PipelineDepthStencilStateCreateInfo`.
#[derive(Debug, Clone)]
pub struct DepthStencilSCI {
    inner: vk::PipelineDepthStencilStateCreateInfo,
}

impl VulkanCI<vk::PipelineDepthStencilStateCreateInfo> for DepthStencilSCI {

    fn default_ci() -> vk::PipelineDepthStencilStateCreateInfo {

        let stencil_op = vk::StencilOpState {
            fail_op: vk::StencilOp::KEEP,
            pass_op: vk::StencilOp::KEEP,
            compare_op: vk::CompareOp::ALWAYS,
            ..Default::default()
        };

        vk::PipelineDepthStencilStateCreateInfo {
            depth_compare_op: vk::CompareOp::LESS_OR_EQUAL,
            front: stencil_op,
            back : stencil_op,
            min_depth_bounds: 0.0,
            max_depth_bounds: 1.0,
            ..Default::default()
        }
    }
}

impl Deref for DepthStencilSCI {
    type Target = vk::PipelineDepthStencilStateCreateInfo;

    fn deref(&self) -> &vk::PipelineDepthStencilStateCreateInfo {
        &self.inner
    }
}

impl DepthStencilSCI {

    #[inline(always)]
    pub fn new() -> DepthStencilSCI {
        DepthStencilSCI { inner: DepthStencilSCI::default_ci() }
    }

    #[inline(always)]
    pub fn depth_test(mut self, is_enable_test: bool, is_enable_write: bool, compare_op: vk::CompareOp) -> DepthStencilSCI {
        self.inner.depth_test_enable = vk_bool(is_enable_test);
        self.inner.depth_write_enable = vk_bool(is_enable_write);
        self.inner.depth_compare_op = compare_op; self
    }

}
// ----------------------------------------------------------------------------------------------

// ----------------------------------------------------------------------------------------------
/// Wrapper class for `vk::PipelineMultisampleStateCreateInfo`.
#[derive(Debug, Clone)]
pub struct MultisampleSCI {

    inner: vk::PipelineMultisampleStateCreateInfo,
    sample_mask: Option<Box<vk::SampleMask>>,
}

impl VulkanCI<vk::PipelineMultisampleStateCreateInfo> for MultisampleSCI {

    fn default_ci() -> vk::PipelineMultisampleStateCreateInfo {

        vk::PipelineMultisampleStateCreateInfo {
            rasterization_samples: vk::SampleCountFlags::TYPE_1,
            ..Default::default()
        }
    }
}

impl MultisampleSCI {

    pub fn new() -> MultisampleSCI {

        MultisampleSCI {
            inner: MultisampleSCI::default_ci(),
            sample_mask: None,
        }
    }

    pub fn value(&self) -> vk::PipelineMultisampleStateCreateInfo {

        vk::PipelineMultisampleStateCreateInfo {
            p_sample_mask: self.sample_mask.as_ref()
                .map(|mask| mask.as_ref() as *const vk::SampleMask)
                .unwrap_or(ptr::null()),
            ..self.inner
        }
    }
}
// ----------------------------------------------------------------------------------------------

// ----------------------------------------------------------------------------------------------
/// Wrapper class for `vk::PipelineDynamicStateCreateInfo`.
#[derive(Debug, Clone)]
pub struct DynamicSCI {

    inner: vk::PipelineDynamicStateCreateInfo,
    dynamics: Vec<vk::DynamicState>,
}

impl VulkanCI<vk::PipelineDynamicStateCreateInfo> for DynamicSCI {

    fn default_ci() -> vk::PipelineDynamicStateCreateInfo {
        vk::PipelineDynamicStateCreateInfo::default()
    }
}

impl DynamicSCI {

    pub fn new() -> DynamicSCI {

        DynamicSCI {
            inner: DynamicSCI::default_ci(),
            dynamics: Vec::new(),
        }
    }

    #[inline(always)]
    pub fn add_dynamic(mut self, state: vk::DynamicState) -> DynamicSCI {

        if !self.dynamics.contains(&state) {
            self.dynamics.push(state);
        }
        self
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.dynamics.is_empty()
    }

    pub fn value(&self) -> vk::PipelineDynamicStateCreateInfo {

        vk::PipelineDynamicStateCreateInfo {
            dynamic_state_count: self.dynamics.len() as _,
            p_dynamic_states   : self.dynamics.as_ptr(),
            ..self.inner
        }
    }
}
// ----------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dynamic_viewports_only_carry_counts() {

        let dynamic = ViewportSCI::dynamic(2).value();
        assert_eq!(dynamic.viewport_count, 2);
        assert!(dynamic.p_viewports.is_null());

        let fixed = ViewportSCI::new()
            .add_viewport(vk::Viewport::default())
            .add_scissor(vk::Rect2D::default())
            .value();
        assert_eq!(fixed.scissor_count, 1);
        assert!(!fixed.p_scissors.is_null());
    }

    #[test]
    fn dynamic_states_are_unique() {

        let dynamics = DynamicSCI::new()
            .add_dynamic(vk::DynamicState::VIEWPORT)
            .add_dynamic(vk::DynamicState::SCISSOR)
            .add_dynamic(vk::DynamicState::VIEWPORT);
        assert_eq!(dynamics.value().dynamic_state_count, 2);
    }

    #[test]
    fn vertex_strides_are_looked_up_by_binding() {

        let input = VertexInputSCI::new()
            .add_binding(vk::VertexInputBindingDescription { binding: 1, stride: 32, input_rate: vk::VertexInputRate::VERTEX });
        assert_eq!(input.stride_of(1), Some(32));
        assert_eq!(input.stride_of(0), None);
        assert_eq!(input.value().vertex_binding_description_count, 1);
    }

    #[test]
    fn opaque_attachments_write_all_channels() {

        let blend = ColorBlendSCI::new().add_opaque_attachments(3);
        let value = blend.value();
        assert_eq!(value.attachment_count, 3);
        assert_eq!(blend.attachments[2].color_write_mask, vk::ColorComponentFlags::RGBA);
        assert_eq!(blend.attachments[2].blend_enable, vk::FALSE);
    }
}
