
use ash::vk;

use vkbase::context::{VkDevice, VkSwapchain, VulkanContext, VulkanContextBuilder};
use vkbase::ci::VkObjectBuildableCI;
use vkbase::ci::sync::SemaphoreCI;
use vkbase::ci::shader::ShaderModuleCI;
use vkbase::ci::vma::{VmaImage, VmaAllocationCI};
use vkbase::config::SampleConfig;
use vkbase::utils::shaderc::VkShaderCompiler;
use vkbase::{RenderWorkflow, WindowConfig, WindowContext, ProcPipeline};
use vkbase::{vkuint, vkfloat};
use vkbase::{VkResult, VkError};

pub const DEFAULT_CLEAR_COLOR: vk::ClearValue = vk::ClearValue {
    color: vk::ClearColorValue {
        float32: [0.025, 0.025, 0.025, 1.0]
    }
};

pub const DEFAULT_CLEAR_DEPTH: vk::ClearValue = vk::ClearValue {
    depth_stencil: vk::ClearDepthStencilValue {
        depth: 1.0,
        stencil: 0,
    }
};

pub const DEFAULT_CLEAR_VALUES: [vk::ClearValue; 2] = [DEFAULT_CLEAR_COLOR, DEFAULT_CLEAR_DEPTH];


/// Load configuration, open the window, create the Vulkan context and run the sample until it exits.
///
/// `setup` customizes the context(extensions, features, queues) before creation.
pub fn run_sample<A, S, F>(title: &str, setup: S, create: F)
    where
        A: RenderWorkflow,
        S: for<'a> FnOnce(VulkanContextBuilder<'a>) -> VulkanContextBuilder<'a>,
        F: FnOnce(&VulkanContext, &SampleConfig) -> VkResult<A> {

    let config = match SampleConfig::from_command_line() {
        | Ok(config) => config,
        | Err(e) => {
            eprintln!("{}", e);
            std::process::exit(2)
        },
    };
    vkbase::logging::init_logger(config.log_level.as_deref());

    if let Err(e) = launch(title, &config, setup, create) {
        log::error!("{}", e);
        std::process::exit(1)
    }
}

fn launch<A, S, F>(title: &str, config: &SampleConfig, setup: S, create: F) -> VkResult<()>
    where
        A: RenderWorkflow,
        S: for<'a> FnOnce(VulkanContextBuilder<'a>) -> VulkanContextBuilder<'a>,
        F: FnOnce(&VulkanContext, &SampleConfig) -> VkResult<A> {

    let window = WindowContext::new(WindowConfig::from_sample(title, config))?;

    let builder = VulkanContext::new(&window)
        .with_sample_config(config);
    let vk_context = setup(builder).build()?;

    log::info!("Running \"{}\" on {}.", title, vk_context.device.phy.device_name());

    let app = create(&vk_context, config)?;

    ProcPipeline::new(window, vk_context)?
        .with_benchmark(&config.benchmark)
        .launch(app)
}


/// The render pass, framebuffers and command buffers that present to the swapchain.
pub struct VkExampleBackendRes {

    pub dimension: vk::Extent2D,
    pub render_pass: vk::RenderPass,
    pub framebuffers: Vec<vk::Framebuffer>,

    pub await_rendering: vk::Semaphore,

    pub command_pool: vk::CommandPool,
    /// render command buffer for each framebuffer.
    pub commands: Vec<vk::CommandBuffer>,

    depth_image: DepthImage,
}

struct DepthImage {
    image: VmaImage,
    view : vk::ImageView,
}

impl VkExampleBackendRes {

    pub fn new(device: &VkDevice, swapchain: &VkSwapchain, render_pass: vk::RenderPass) -> VkResult<VkExampleBackendRes> {

        let dimension = swapchain.dimension;
        let (command_pool, commands) = setup_commands(device, swapchain.frame_in_flight() as _)?;
        let depth_image = setup_depth_image(device, dimension)?;
        let await_rendering = device.build(&SemaphoreCI::new())?;

        let mut target = VkExampleBackendRes {
            depth_image, await_rendering,
            commands, command_pool, dimension, render_pass,
            framebuffers: Vec::new(),
        };
        target.setup_framebuffers(device, swapchain)?;

        Ok(target)
    }

    fn setup_framebuffers(&mut self, device: &VkDevice, swapchain: &VkSwapchain) -> VkResult<()> {

        use vkbase::ci::pipeline::FramebufferCI;

        // create a frame buffer for every image in the swapchain.
        self.framebuffers = Vec::with_capacity(swapchain.frame_in_flight());

        for image in swapchain.images.iter() {

            let framebuffer = FramebufferCI::new_2d(self.render_pass, self.dimension)
                .add_attachment(image.view)
                .add_attachment(self.depth_image.view)
                .build(device)?;
            self.framebuffers.push(framebuffer);
        }

        Ok(())
    }

    pub fn swapchain_reload(&mut self, device: &VkDevice, new_chain: &VkSwapchain) -> VkResult<()> {

        self.dimension = new_chain.dimension;

        self.depth_image.discard_by(device)?;
        self.depth_image = setup_depth_image(device, self.dimension)?;

        device.discard(&self.framebuffers);
        self.setup_framebuffers(device, new_chain)?;

        if self.commands.len() != new_chain.frame_in_flight() {
            device.free(self.commands.as_slice(), self.command_pool);
            self.commands = vkbase::ci::command::CommandBufferAI::new(self.command_pool, new_chain.frame_in_flight() as _)
                .build(device)?;
        }

        unsafe {
            device.logic.handle.reset_command_pool(self.command_pool, vk::CommandPoolResetFlags::empty())
                .map_err(|_| VkError::device("Reset Command Pool"))?;
        }

        Ok(())
    }

    pub fn viewport(&self) -> vk::Viewport {
        viewport_of(self.dimension)
    }

    pub fn scissor(&self) -> vk::Rect2D {
        scissor_of(self.dimension)
    }

    pub fn discard_by(&mut self, device: &VkDevice) -> VkResult<()> {

        device.discard(self.render_pass);
        device.discard(&self.framebuffers);

        device.discard(self.command_pool);
        device.discard(self.await_rendering);

        self.depth_image.discard_by(device)
    }
}

impl DepthImage {

    fn discard_by(&mut self, device: &VkDevice) -> VkResult<()> {
        device.discard(self.view);
        device.vma_discard(&mut self.image)
    }
}

fn setup_depth_image(device: &VkDevice, dimension: vk::Extent2D) -> VkResult<DepthImage> {

    use vkbase::ci::image::{ImageCI, ImageViewCI};

    let image_ci = ImageCI::new_2d(device.phy.depth_format, dimension)
        .usages(vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT);
    let image = VmaAllocationCI::device_local()
        .build_image(device, &image_ci)?;

    let view = ImageViewCI::new(image.handle, vk::ImageViewType::TYPE_2D, device.phy.depth_format)
        .aspect_mask(depth_aspect(device.phy.depth_format))
        .build(device)?;

    let result = DepthImage { image, view };
    Ok(result)
}

fn setup_commands(device: &VkDevice, buffer_count: vkuint) -> VkResult<(vk::CommandPool, Vec<vk::CommandBuffer>)> {

    use vkbase::ci::command::{CommandPoolCI, CommandBufferAI};

    let command_pool = CommandPoolCI::new(device.logic.queues.graphics.family_index)
        .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER)
        .build(device)?;

    let command_buffers = CommandBufferAI::new(command_pool, buffer_count)
        .build(device)?;

    Ok((command_pool, command_buffers))
}

/// The render pass used by most samples: one swapchain color attachment and one depth attachment.
pub fn setup_present_renderpass(device: &VkDevice, swapchain: &VkSwapchain) -> VkResult<vk::RenderPass> {

    use vkbase::ci::pipeline::{RenderPassCI, AttachmentDescCI, SubpassDescCI, SubpassDependencyCI};

    let color_attachment = AttachmentDescCI::new(swapchain.format)
        .op(vk::AttachmentLoadOp::CLEAR, vk::AttachmentStoreOp::STORE)
        .layout(vk::ImageLayout::UNDEFINED, vk::ImageLayout::PRESENT_SRC_KHR);

    let depth_attachment = AttachmentDescCI::new(device.phy.depth_format)
        .op(vk::AttachmentLoadOp::CLEAR, vk::AttachmentStoreOp::DONT_CARE)
        .layout(vk::ImageLayout::UNDEFINED, vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL);

    let subpass_description = SubpassDescCI::new(vk::PipelineBindPoint::GRAPHICS)
        .add_color_attachment(0, vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)
        .set_depth_stencil_attachment(1, vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL);

    let dependency0 = SubpassDependencyCI::new(vk::SUBPASS_EXTERNAL, 0)
        .stage_mask(vk::PipelineStageFlags::BOTTOM_OF_PIPE, vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT | vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS)
        .access_mask(vk::AccessFlags::MEMORY_READ, vk::AccessFlags::COLOR_ATTACHMENT_READ | vk::AccessFlags::COLOR_ATTACHMENT_WRITE | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE);

    let dependency1 = SubpassDependencyCI::new(0, vk::SUBPASS_EXTERNAL)
        .stage_mask(vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT, vk::PipelineStageFlags::BOTTOM_OF_PIPE)
        .access_mask(vk::AccessFlags::COLOR_ATTACHMENT_READ | vk::AccessFlags::COLOR_ATTACHMENT_WRITE, vk::AccessFlags::MEMORY_READ);

    let render_pass = RenderPassCI::new()
        .add_attachment(color_attachment)
        .add_attachment(depth_attachment)
        .add_subpass(subpass_description)
        .add_dependency(dependency0)
        .add_dependency(dependency1)
        .build(device)?;

    Ok(render_pass)
}

/// Compile a GLSL source embedded in the sample binary and create its shader module.
pub fn build_shader(device: &VkDevice, compiler: &mut VkShaderCompiler, stage: vk::ShaderStageFlags, source: &str, tag_name: &str) -> VkResult<vk::ShaderModule> {

    ShaderModuleCI::from_glsl(compiler, stage, source, tag_name)?
        .build(device)
}

pub fn depth_aspect(format: vk::Format) -> vk::ImageAspectFlags {

    match format {
        | vk::Format::D16_UNORM_S8_UINT
        | vk::Format::D24_UNORM_S8_UINT
        | vk::Format::D32_SFLOAT_S8_UINT => vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL,
        | _ => vk::ImageAspectFlags::DEPTH,
    }
}

pub fn viewport_of(dimension: vk::Extent2D) -> vk::Viewport {

    vk::Viewport {
        x: 0.0, y: 0.0,
        width : dimension.width  as vkfloat,
        height: dimension.height as vkfloat,
        min_depth: 0.0, max_depth: 1.0,
    }
}

pub fn scissor_of(dimension: vk::Extent2D) -> vk::Rect2D {

    vk::Rect2D {
        extent: dimension,
        offset: vk::Offset2D { x: 0, y: 0 },
    }
}

/// Aspect ratio of the swapchain extent, never dividing by zero.
pub fn aspect_ratio(dimension: vk::Extent2D) -> f32 {
    dimension.width as f32 / dimension.height.max(1) as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stencil_formats_include_stencil_aspect() {
        assert_eq!(depth_aspect(vk::Format::D32_SFLOAT), vk::ImageAspectFlags::DEPTH);
        assert!(depth_aspect(vk::Format::D24_UNORM_S8_UINT).contains(vk::ImageAspectFlags::STENCIL));
    }

    #[test]
    fn viewport_covers_extent() {

        let extent = vk::Extent2D { width: 800, height: 0 };
        let viewport = viewport_of(extent);
        assert_eq!(viewport.width, 800.0);
        assert_eq!(viewport.max_depth, 1.0);
        assert_eq!(aspect_ratio(extent), 800.0);
    }
}
