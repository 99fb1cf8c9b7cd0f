//! Pipeline, pipeline layout and render pass related builders.

pub use self::state::{VertexInputSCI, InputAssemblySCI, TessellationSCI, RasterizationSCI};
pub use self::state::{ColorBlendSCI, BlendAttachmentSCI, ViewportSCI, DepthStencilSCI, MultisampleSCI, DynamicSCI};
pub use self::renderpass::{RenderPassCI, RenderPassBI, AttachmentDescCI, SubpassDescCI, SubpassDependencyCI, FramebufferCI};

mod state;
mod renderpass;

use ash::vk;

use crate::context::{VkDevice, VkObjectDiscardable};
use crate::ci::{VulkanCI, VkObjectBuildableCI};
use crate::ci::shader::ShaderStageCI;
use crate::error::{VkResult, VkError};
use crate::vkuint;

use std::os::raw::c_void;
use std::ptr;

// ----------------------------------------------------------------------------------------------
/// Wrapper class for `vk::GraphicsPipelineCreateInfo`.
///
/// Also describes the parts of a graphics pipeline library and the linking of those parts.
/// States left as `None` are not provided to Vulkan.
#[derive(Debug, Clone)]
pub struct GraphicsPipelineCI {

    inner: vk::GraphicsPipelineCreateInfo,

    shaders        : Vec<ShaderStageCI>,
    vertex_input   : Option<VertexInputSCI>,
    input_assembly : Option<InputAssemblySCI>,
    tessellation   : Option<TessellationSCI>,
    viewport       : Option<ViewportSCI>,
    rasterization  : Option<RasterizationSCI>,
    multisample    : Option<MultisampleSCI>,
    depth_stencil  : Option<DepthStencilSCI>,
    color_blend    : Option<ColorBlendSCI>,
    dynamics       : Option<DynamicSCI>,

    library_part: Option<vk::GraphicsPipelineLibraryFlagsEXT>,
    libraries: Vec<vk::Pipeline>,
}

impl VulkanCI<vk::GraphicsPipelineCreateInfo> for GraphicsPipelineCI {

    fn default_ci() -> vk::GraphicsPipelineCreateInfo {

        vk::GraphicsPipelineCreateInfo {
            subpass: 0,
            base_pipeline_index: -1,
            ..Default::default()
        }
    }
}

impl VkObjectBuildableCI for GraphicsPipelineCI {
    type ObjectType = vk::Pipeline;

    fn build(&self, device: &VkDevice) -> VkResult<Self::ObjectType> {
        self.build_by(&device.logic.handle)
    }
}

impl GraphicsPipelineCI {

    /// A complete pipeline with default fixed-function states, dynamic viewport and scissor.
    pub fn new(render_pass: vk::RenderPass, layout: vk::PipelineLayout) -> GraphicsPipelineCI {

        GraphicsPipelineCI {
            inner: vk::GraphicsPipelineCreateInfo {
                render_pass, layout,
                ..GraphicsPipelineCI::default_ci()
            },
            shaders        : Vec::new(),
            vertex_input   : Some(VertexInputSCI::new()),
            input_assembly : Some(InputAssemblySCI::new()),
            tessellation   : None,
            viewport       : Some(ViewportSCI::new()),
            rasterization  : Some(RasterizationSCI::new()),
            multisample    : Some(MultisampleSCI::new()),
            depth_stencil  : Some(DepthStencilSCI::new()),
            color_blend    : Some(ColorBlendSCI::new().add_attachment(BlendAttachmentSCI::new())),
            dynamics       : Some(DynamicSCI::new()
                .add_dynamic(vk::DynamicState::VIEWPORT)
                .add_dynamic(vk::DynamicState::SCISSOR)),
            library_part: None,
            libraries: Vec::new(),
        }
    }

    /// One part of a graphics pipeline library. Only the states relevant to `part` need to be set.
    pub fn new_library(part: vk::GraphicsPipelineLibraryFlagsEXT, render_pass: vk::RenderPass, layout: vk::PipelineLayout) -> GraphicsPipelineCI {

        let mut library = GraphicsPipelineCI::new(render_pass, layout).clear_states();
        library.inner.flags = vk::PipelineCreateFlags::LIBRARY_KHR
            | vk::PipelineCreateFlags::RETAIN_LINK_TIME_OPTIMIZATION_INFO_EXT;
        library.library_part = Some(part);
        library
    }

    /// Link several library parts into an executable pipeline.
    pub fn link(libraries: Vec<vk::Pipeline>, layout: vk::PipelineLayout, is_optimize: bool) -> GraphicsPipelineCI {

        let mut linked = GraphicsPipelineCI::new(vk::RenderPass::null(), layout).clear_states();
        if is_optimize {
            linked.inner.flags = vk::PipelineCreateFlags::LINK_TIME_OPTIMIZATION_EXT;
        }
        linked.libraries = libraries;
        linked
    }

    fn clear_states(mut self) -> GraphicsPipelineCI {

        self.vertex_input   = None;
        self.input_assembly = None;
        self.viewport       = None;
        self.rasterization  = None;
        self.multisample    = None;
        self.depth_stencil  = None;
        self.color_blend    = None;
        self.dynamics       = None;
        self
    }

    #[inline]
    pub fn set_shaders(&mut self, shaders: Vec<ShaderStageCI>) {
        self.shaders = shaders;
    }

    #[inline]
    pub fn set_vertex_input(&mut self, state: VertexInputSCI) {
        self.vertex_input = Some(state);
    }

    #[inline]
    pub fn set_input_assembly(&mut self, state: InputAssemblySCI) {
        self.input_assembly = Some(state);
    }

    #[inline]
    pub fn set_tessellation(&mut self, state: TessellationSCI) {
        self.tessellation = Some(state);
    }

    #[inline]
    pub fn set_viewport(&mut self, state: ViewportSCI) {
        self.viewport = Some(state);
    }

    #[inline]
    pub fn set_rasterization(&mut self, state: RasterizationSCI) {
        self.rasterization = Some(state);
    }

    #[inline]
    pub fn set_multisample(&mut self, state: MultisampleSCI) {
        self.multisample = Some(state);
    }

    #[inline]
    pub fn set_depth_stencil(&mut self, state: DepthStencilSCI) {
        self.depth_stencil = Some(state);
    }

    #[inline]
    pub fn set_color_blend(&mut self, state: ColorBlendSCI) {
        self.color_blend = Some(state);
    }

    #[inline]
    pub fn set_dynamic(&mut self, state: DynamicSCI) {
        self.dynamics = if state.is_empty() { None } else { Some(state) };
    }

    #[inline]
    pub fn is_library(&self) -> bool {
        self.library_part.is_some()
    }

    /// Create the pipeline with a raw device, so that it can be called from a worker thread.
    pub fn build_by(&self, device: &ash::Device) -> VkResult<vk::Pipeline> {

        let shaders: Vec<vk::PipelineShaderStageCreateInfo> = self.shaders.iter()
            .map(ShaderStageCI::value)
            .collect();

        let vertex_input   = self.vertex_input.as_ref().map(VertexInputSCI::value);
        let input_assembly = self.input_assembly.as_ref().map(|s| **s);
        let tessellation   = self.tessellation.as_ref().map(|s| **s);
        let viewport       = self.viewport.as_ref().map(ViewportSCI::value);
        let rasterization  = self.rasterization.as_ref().map(|s| **s);
        let multisample    = self.multisample.as_ref().map(MultisampleSCI::value);
        let depth_stencil  = self.depth_stencil.as_ref().map(|s| **s);
        let color_blend    = self.color_blend.as_ref().map(ColorBlendSCI::value);
        let dynamics       = self.dynamics.as_ref().map(DynamicSCI::value);

        let library_ci = vk::PipelineLibraryCreateInfoKHR {
            library_count: self.libraries.len() as _,
            p_libraries  : self.libraries.as_ptr(),
            ..Default::default()
        };

        let library_part_ci = vk::GraphicsPipelineLibraryCreateInfoEXT {
            p_next: if self.libraries.is_empty() {
                ptr::null::<c_void>() as _
            } else {
                &library_ci as *const vk::PipelineLibraryCreateInfoKHR as _
            },
            flags : self.library_part.unwrap_or_default(),
            ..Default::default()
        };

        let p_next: *const c_void = if self.library_part.is_some() {
            &library_part_ci as *const vk::GraphicsPipelineLibraryCreateInfoEXT as *const _
        } else if !self.libraries.is_empty() {
            &library_ci as *const vk::PipelineLibraryCreateInfoKHR as *const _
        } else {
            ptr::null()
        };

        let pipeline_ci = vk::GraphicsPipelineCreateInfo {
            p_next,
            stage_count: shaders.len() as _,
            p_stages   : shaders.as_ptr(),
            p_vertex_input_state  : optional_ptr(&vertex_input),
            p_input_assembly_state: optional_ptr(&input_assembly),
            p_tessellation_state  : optional_ptr(&tessellation),
            p_viewport_state      : optional_ptr(&viewport),
            p_rasterization_state : optional_ptr(&rasterization),
            p_multisample_state   : optional_ptr(&multisample),
            p_depth_stencil_state : optional_ptr(&depth_stencil),
            p_color_blend_state   : optional_ptr(&color_blend),
            p_dynamic_state       : optional_ptr(&dynamics),
            ..self.inner
        };

        let pipelines = unsafe {
            device.create_graphics_pipelines(vk::PipelineCache::null(), &[pipeline_ci], None)
                .map_err(|_| VkError::create("Graphics Pipeline"))?
        };

        pipelines.into_iter().next()
            .ok_or(VkError::create("Graphics Pipeline"))
    }
}

#[inline]
fn optional_ptr<T>(value: &Option<T>) -> *const T {
    value.as_ref().map(|v| v as *const T).unwrap_or(ptr::null())
}
// ----------------------------------------------------------------------------------------------

// ----------------------------------------------------------------------------------------------
/// Wrapper class for `vk::ComputePipelineCreateInfo`.
#[derive(Debug, Clone)]
pub struct ComputePipelineCI {

    inner: vk::ComputePipelineCreateInfo,
    shader: ShaderStageCI,
}

impl VulkanCI<vk::ComputePipelineCreateInfo> for ComputePipelineCI {

    fn default_ci() -> vk::ComputePipelineCreateInfo {

        vk::ComputePipelineCreateInfo {
            base_pipeline_index: -1,
            ..Default::default()
        }
    }
}

impl VkObjectBuildableCI for ComputePipelineCI {
    type ObjectType = vk::Pipeline;

    fn build(&self, device: &VkDevice) -> VkResult<Self::ObjectType> {

        let pipeline_ci = vk::ComputePipelineCreateInfo {
            stage: self.shader.value(),
            ..self.inner
        };

        let pipelines = unsafe {
            device.logic.handle.create_compute_pipelines(vk::PipelineCache::null(), &[pipeline_ci], None)
                .map_err(|_| VkError::create("Compute Pipeline"))?
        };

        pipelines.into_iter().next()
            .ok_or(VkError::create("Compute Pipeline"))
    }
}

impl ComputePipelineCI {

    pub fn new(shader: ShaderStageCI, layout: vk::PipelineLayout) -> ComputePipelineCI {

        debug_assert_eq!(shader.stage(), vk::ShaderStageFlags::COMPUTE);

        ComputePipelineCI {
            inner: vk::ComputePipelineCreateInfo {
                layout,
                ..ComputePipelineCI::default_ci()
            },
            shader,
        }
    }

    #[inline(always)]
    pub fn flags(mut self, flags: vk::PipelineCreateFlags) -> ComputePipelineCI {
        self.inner.flags = flags; self
    }

}

impl VkObjectDiscardable for vk::Pipeline {

    fn discard_by(self, device: &VkDevice) {
        unsafe {
            device.logic.handle.destroy_pipeline(self, None);
        }
    }
}
// ----------------------------------------------------------------------------------------------

// ----------------------------------------------------------------------------------------------
/// Wrapper class for `vk::PipelineLayoutCreateInfo`.
#[derive(Debug, Clone)]
pub struct PipelineLayoutCI {

    inner: vk::PipelineLayoutCreateInfo,
    set_layouts: Vec<vk::DescriptorSetLayout>,
    push_constants: Vec<vk::PushConstantRange>,
}

impl VulkanCI<vk::PipelineLayoutCreateInfo> for PipelineLayoutCI {

    fn default_ci() -> vk::PipelineLayoutCreateInfo {
        vk::PipelineLayoutCreateInfo::default()
    }
}

impl VkObjectBuildableCI for PipelineLayoutCI {
    type ObjectType = vk::PipelineLayout;

    fn build(&self, device: &VkDevice) -> VkResult<Self::ObjectType> {

        let layout_ci = vk::PipelineLayoutCreateInfo {
            set_layout_count          : self.set_layouts.len() as _,
            p_set_layouts             : self.set_layouts.as_ptr(),
            push_constant_range_count : self.push_constants.len() as _,
            p_push_constant_ranges    : self.push_constants.as_ptr(),
            ..self.inner
        };

        let pipeline_layout = unsafe {
            device.logic.handle.create_pipeline_layout(&layout_ci, None)
                .map_err(|_| VkError::create("Pipeline Layout"))?
        };
        Ok(pipeline_layout)
    }
}

impl PipelineLayoutCI {

    pub fn new() -> PipelineLayoutCI {

        PipelineLayoutCI {
            inner: PipelineLayoutCI::default_ci(),
            set_layouts: Vec::new(),
            push_constants: Vec::new(),
        }
    }

    #[inline(always)]
    pub fn add_set_layout(mut self, set_layout: vk::DescriptorSetLayout) -> PipelineLayoutCI {
        self.set_layouts.push(set_layout); self
    }

    /// Append a push constant range of `size` bytes right after the previous range.
    pub fn add_push_constants(mut self, stages: vk::ShaderStageFlags, size: vkuint) -> PipelineLayoutCI {

        let offset = self.push_constants.last()
            .map(|range| range.offset + range.size)
            .unwrap_or(0);

        self.push_constants.push(vk::PushConstantRange { stage_flags: stages, offset, size }); self
    }

    #[inline(always)]
    pub fn flags(mut self, flags: vk::PipelineLayoutCreateFlags) -> PipelineLayoutCI {
        self.inner.flags = flags; self
    }
}

impl VkObjectDiscardable for vk::PipelineLayout {

    fn discard_by(self, device: &VkDevice) {
        unsafe {
            device.logic.handle.destroy_pipeline_layout(self, None);
        }
    }
}
// ----------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_constant_ranges_are_contiguous() {

        let layout = PipelineLayoutCI::new()
            .add_push_constants(vk::ShaderStageFlags::VERTEX, 64)
            .add_push_constants(vk::ShaderStageFlags::FRAGMENT, 16);

        assert_eq!(layout.push_constants[1].offset, 64);
        assert_eq!(layout.push_constants[1].size, 16);
    }

    #[test]
    fn library_parts_start_without_states() {

        let library = GraphicsPipelineCI::new_library(
            vk::GraphicsPipelineLibraryFlagsEXT::FRAGMENT_OUTPUT_INTERFACE,
            vk::RenderPass::null(), vk::PipelineLayout::null());

        assert!(library.is_library());
        assert!(library.color_blend.is_none());
        assert!(library.inner.flags.contains(vk::PipelineCreateFlags::LIBRARY_KHR));

        let linked = GraphicsPipelineCI::link(vec![vk::Pipeline::null(); 4], vk::PipelineLayout::null(), true);
        assert!(!linked.is_library());
        assert_eq!(linked.libraries.len(), 4);
        assert_eq!(linked.inner.flags, vk::PipelineCreateFlags::LINK_TIME_OPTIMIZATION_EXT);
    }

    #[test]
    fn complete_pipelines_use_dynamic_viewport() {

        let pipeline = GraphicsPipelineCI::new(vk::RenderPass::null(), vk::PipelineLayout::null());
        let dynamics = pipeline.dynamics.as_ref().map(|d| d.value().dynamic_state_count);
        assert_eq!(dynamics, Some(2));
        assert!(pipeline.tessellation.is_none());
    }
}
