
use ash::vk;
use winit::event::VirtualKeyCode;

use vkbase::context::{VulkanContext, VkDevice, VkSwapchain};
use vkbase::ci::VkObjectBuildableCI;
use vkbase::ci::vma::{VmaBuffer, VmaImage, VmaAllocationCI};
use vkbase::ci::pipeline::*;
use vkbase::ci::shader::ShaderStageCI;
use vkbase::command::{VkCmdRecorder, IGraphics, CmdGraphicsApi};
use vkbase::math::OrbitView;
use vkbase::mesh::{MeshVertex, MeshBuffer};
use vkbase::utils::shaderc::VkShaderCompiler;
use vkbase::{InputController, FrameAction};
use vkbase::{vkuint, vksint, Point3F};
use vkbase::VkResult;

use vksamples::VkExampleBackendRes;
use crate::data::{StereoCamera, UboStereo, VIEW_COUNT};

const VIEW_FORMAT: vk::Format = vk::Format::R8G8B8A8_UNORM;
/// Render both views in the only subpass.
const VIEW_MASK: vkuint = 0b11;
/// Views with a spatial coherence that the implementation may exploit.
const CORRELATION_MASK: vkuint = 0b11;

pub struct VulkanExample {

    backend: VkExampleBackendRes,
    view: OrbitView,
    camera: StereoCamera,

    scene: MeshBuffer,
    ubo_buffer: VmaBuffer,

    multiview: MultiviewPass,
    pipelines: PipelineStaff,
    descriptors: DescriptorStaff,

    is_cmd_dirty: bool,
}

/// The offscreen pass rendering both eyes into the layers of one image.
struct MultiviewPass {
    render_pass: vk::RenderPass,
    targets: ViewTargets,
    sampler: vk::Sampler,
}

/// Layered attachments of the multiview pass, sized to one eye and rebuilt with the swapchain.
struct ViewTargets {
    color: LayeredAttachment,
    depth: LayeredAttachment,
    framebuffer: vk::Framebuffer,
    extent: vk::Extent2D,
}

struct LayeredAttachment {
    image: VmaImage,
    view : vk::ImageView,
}

struct PipelineStaff {
    scene: vk::Pipeline,
    scene_layout: vk::PipelineLayout,
    display: vk::Pipeline,
    display_layout: vk::PipelineLayout,
}

struct DescriptorStaff {
    pool: vk::DescriptorPool,
    scene_set: vk::DescriptorSet,
    scene_layout: vk::DescriptorSetLayout,
    display_set: vk::DescriptorSet,
    display_layout: vk::DescriptorSetLayout,
}

impl VulkanExample {

    pub fn new(context: &VulkanContext) -> VkResult<VulkanExample> {

        let device = &context.device;
        let swapchain = &context.swapchain;

        let render_pass = vksamples::setup_present_renderpass(device, swapchain)?;
        let backend = VkExampleBackendRes::new(device, swapchain, render_pass)?;

        let scene = MeshBuffer::upload(device, backend.command_pool, device.logic.queues.graphics.handle, &super::data::generate_scene())?;

        let view = OrbitView::new(Point3F::new(0.0, 0.5, 0.0), 7.0, 20.0, 0.0)
            .with_rotate_speed(10.0);
        let camera = StereoCamera::default();

        let ubo_data = UboStereo::new(&camera, 1.0, &view.view_matrix());
        let ubo_buffer = vkbase::ci::vma::host_buffer_with_data(device, vk::BufferUsageFlags::UNIFORM_BUFFER, &[ubo_data])?;

        let multiview = MultiviewPass::new(device, eye_extent(backend.dimension))?;
        let descriptors = setup_descriptor(device, &ubo_buffer, &multiview)?;
        let pipelines = prepare_pipelines(device, backend.render_pass, multiview.render_pass, &descriptors)?;

        let target = VulkanExample {
            backend, view, camera, scene, ubo_buffer,
            multiview, pipelines, descriptors,
            is_cmd_dirty: true,
        };
        Ok(target)
    }
}

impl vkbase::RenderWorkflow for VulkanExample {

    fn init(&mut self, device: &VkDevice) -> VkResult<()> {

        self.update_uniforms(device)?;
        self.record_commands(device)?;
        Ok(())
    }

    fn render_frame(&mut self, device: &VkDevice, device_available: vk::Fence, image_available: vk::Semaphore, image_index: usize, delta_time: f32) -> VkResult<vk::Semaphore> {

        self.view.update(delta_time);
        self.update_uniforms(device)?;

        if self.is_cmd_dirty {
            device.wait_idle()?;
            self.record_commands(device)?;
        }

        let submit_ci = vkbase::ci::device::SubmitCI::new()
            .add_wait(vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT, image_available)
            .add_command(self.backend.commands[image_index])
            .add_signal(self.backend.await_rendering);

        device.submit(submit_ci, device.logic.queues.graphics.handle, device_available)?;

        Ok(self.backend.await_rendering)
    }

    fn swapchain_reload(&mut self, device: &VkDevice, new_chain: &VkSwapchain) -> VkResult<()> {

        self.backend.swapchain_reload(device, new_chain)?;

        // each eye covers half of the new window.
        self.multiview.rebuild_targets(device, eye_extent(self.backend.dimension))?;
        update_display_set(device, self.descriptors.display_set, &self.multiview);

        self.is_cmd_dirty = true;
        Ok(())
    }

    fn receive_input(&mut self, inputer: &InputController, delta_time: f32) -> FrameAction {

        if inputer.is_key_just_pressed(VirtualKeyCode::Space) {
            self.view.rotate_speed = if self.view.rotate_speed == 0.0 { 10.0 } else { 0.0 };
        }

        let rotate = 60.0 * delta_time;
        if inputer.is_key_pressed(VirtualKeyCode::Left) {
            self.view.yaw -= rotate;
        }
        if inputer.is_key_pressed(VirtualKeyCode::Right) {
            self.view.yaw += rotate;
        }
        if inputer.is_key_pressed(VirtualKeyCode::Up) {
            self.view.pitch = (self.view.pitch + rotate).min(85.0);
        }
        if inputer.is_key_pressed(VirtualKeyCode::Down) {
            self.view.pitch = (self.view.pitch - rotate).max(5.0);
        }

        FrameAction::Rendering
    }

    fn deinit(&mut self, device: &VkDevice) -> VkResult<()> {

        device.discard(self.descriptors.scene_layout);
        device.discard(self.descriptors.display_layout);
        device.discard(self.descriptors.pool);

        device.discard(self.pipelines.scene);
        device.discard(self.pipelines.scene_layout);
        device.discard(self.pipelines.display);
        device.discard(self.pipelines.display_layout);

        self.multiview.discard_by(device)?;

        device.vma_discard(&mut self.ubo_buffer)?;
        self.scene.discard_by(device)?;

        self.backend.discard_by(device)
    }
}

impl VulkanExample {

    fn record_commands(&mut self, device: &VkDevice) -> VkResult<()> {

        let eye_extent = self.multiview.targets.extent;
        let view_clears = vec![vksamples::DEFAULT_CLEAR_COLOR, vksamples::DEFAULT_CLEAR_DEPTH];

        for (i, &command) in self.backend.commands.iter().enumerate() {

            let recorder: VkCmdRecorder<IGraphics> = VkCmdRecorder::new(device, command);
            recorder.begin_record()?;

            // render the scene once, broadcast to both layers. ---------------------------------
            let multiview_bi = RenderPassBI::new(self.multiview.render_pass, self.multiview.targets.framebuffer)
                .render_extent(eye_extent)
                .set_clear_values(view_clears.clone());

            recorder
                .begin_render_pass(multiview_bi)
                .set_viewport(0, &[vksamples::viewport_of(eye_extent)])
                .set_scissor(0, &[vksamples::scissor_of(eye_extent)])
                .bind_pipeline(self.pipelines.scene)
                .bind_descriptor_sets(self.pipelines.scene_layout, 0, &[self.descriptors.scene_set], &[]);

            self.scene.draw(&recorder, 1);
            recorder.end_render_pass();
            // ---------------------------------------------------------------------------------

            // show the left layer on the left half and the right layer on the right half. ----
            let display_bi = RenderPassBI::new(self.backend.render_pass, self.backend.framebuffers[i])
                .render_extent(self.backend.dimension)
                .set_clear_values(vksamples::DEFAULT_CLEAR_VALUES.to_vec());

            recorder
                .begin_render_pass(display_bi)
                .set_scissor(0, &[self.backend.scissor()])
                .bind_pipeline(self.pipelines.display)
                .bind_descriptor_sets(self.pipelines.display_layout, 0, &[self.descriptors.display_set], &[]);

            for layer in 0..VIEW_COUNT {

                let mut viewport = vksamples::viewport_of(eye_extent);
                viewport.x = (layer as vkuint * eye_extent.width) as f32;

                recorder
                    .set_viewport(0, &[viewport])
                    .push_constants(self.pipelines.display_layout, vk::ShaderStageFlags::FRAGMENT, 0, &(layer as vksint))
                    .draw(3, 1, 0, 0);
            }

            recorder.end_render_pass();
            // ---------------------------------------------------------------------------------

            recorder.end_record()?;
        }

        self.is_cmd_dirty = false;
        Ok(())
    }

    fn update_uniforms(&mut self, device: &VkDevice) -> VkResult<()> {

        let aspect = vksamples::aspect_ratio(self.multiview.targets.extent);
        let ubo_data = UboStereo::new(&self.camera, aspect, &self.view.view_matrix());
        self.ubo_buffer.write(device, &[ubo_data])
    }
}

fn eye_extent(window: vk::Extent2D) -> vk::Extent2D {
    vk::Extent2D {
        width : (window.width / VIEW_COUNT as vkuint).max(1),
        height: window.height.max(1),
    }
}

impl MultiviewPass {

    fn new(device: &VkDevice, extent: vk::Extent2D) -> VkResult<MultiviewPass> {

        use vkbase::ci::image::SamplerCI;

        let depth_format = device.phy.depth_format;

        let color_attachment = AttachmentDescCI::new(VIEW_FORMAT)
            .op(vk::AttachmentLoadOp::CLEAR, vk::AttachmentStoreOp::STORE)
            .layout(vk::ImageLayout::UNDEFINED, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL);
        let depth_attachment = AttachmentDescCI::new(depth_format)
            .op(vk::AttachmentLoadOp::CLEAR, vk::AttachmentStoreOp::DONT_CARE)
            .layout(vk::ImageLayout::UNDEFINED, vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL);

        let subpass = SubpassDescCI::new(vk::PipelineBindPoint::GRAPHICS)
            .add_color_attachment(0, vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)
            .set_depth_stencil_attachment(1, vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL);

        let dependency0 = SubpassDependencyCI::new(vk::SUBPASS_EXTERNAL, 0)
            .stage_mask(vk::PipelineStageFlags::FRAGMENT_SHADER, vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT | vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS)
            .access_mask(vk::AccessFlags::SHADER_READ, vk::AccessFlags::COLOR_ATTACHMENT_WRITE | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE)
            .flags(vk::DependencyFlags::BY_REGION);
        let dependency1 = SubpassDependencyCI::new(0, vk::SUBPASS_EXTERNAL)
            .stage_mask(vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT, vk::PipelineStageFlags::FRAGMENT_SHADER)
            .access_mask(vk::AccessFlags::COLOR_ATTACHMENT_WRITE, vk::AccessFlags::SHADER_READ)
            .flags(vk::DependencyFlags::BY_REGION);

        let render_pass = RenderPassCI::new()
            .add_attachment(color_attachment)
            .add_attachment(depth_attachment)
            .add_subpass(subpass)
            .add_dependency(dependency0)
            .add_dependency(dependency1)
            .multiview(vec![VIEW_MASK], vec![CORRELATION_MASK])
            .build(device)?;

        let targets = ViewTargets::new(device, render_pass, extent)?;

        let sampler = SamplerCI::new()
            .filter(vk::Filter::LINEAR, vk::Filter::LINEAR)
            .address_mode(vk::SamplerAddressMode::CLAMP_TO_EDGE)
            .lod(0.0, 0.0, 1.0)
            .build(device)?;

        let result = MultiviewPass { render_pass, targets, sampler };
        Ok(result)
    }

    fn rebuild_targets(&mut self, device: &VkDevice, extent: vk::Extent2D) -> VkResult<()> {

        self.targets.discard_by(device)?;
        self.targets = ViewTargets::new(device, self.render_pass, extent)?;
        Ok(())
    }

    fn discard_by(&mut self, device: &VkDevice) -> VkResult<()> {

        device.discard(self.sampler);
        device.discard(self.render_pass);
        self.targets.discard_by(device)
    }
}

impl ViewTargets {

    fn new(device: &VkDevice, render_pass: vk::RenderPass, extent: vk::Extent2D) -> VkResult<ViewTargets> {

        let depth_format = device.phy.depth_format;

        let color = LayeredAttachment::new(device, VIEW_FORMAT, extent, vk::ImageUsageFlags::COLOR_ATTACHMENT | vk::ImageUsageFlags::SAMPLED, vk::ImageAspectFlags::COLOR)?;
        let depth = LayeredAttachment::new(device, depth_format, extent, vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT, vksamples::depth_aspect(depth_format))?;

        // a multiview framebuffer has a single layer, the views select the image layers.
        let framebuffer = FramebufferCI::new_2d(render_pass, extent)
            .add_attachment(color.view)
            .add_attachment(depth.view)
            .build(device)?;

        log::debug!("Multiview targets of {}x{} for each eye.", extent.width, extent.height);

        let result = ViewTargets { color, depth, framebuffer, extent };
        Ok(result)
    }

    fn discard_by(&mut self, device: &VkDevice) -> VkResult<()> {

        device.discard(self.framebuffer);
        self.color.discard_by(device)?;
        self.depth.discard_by(device)
    }
}

impl LayeredAttachment {

    fn new(device: &VkDevice, format: vk::Format, extent: vk::Extent2D, usage: vk::ImageUsageFlags, aspect: vk::ImageAspectFlags) -> VkResult<LayeredAttachment> {

        use vkbase::ci::image::{ImageCI, ImageViewCI};

        let image_ci = ImageCI::new_2d(format, extent)
            .usages(usage)
            .array_layers(VIEW_COUNT as _);
        let image = VmaAllocationCI::device_local()
            .build_image(device, &image_ci)?;

        let view = ImageViewCI::new(image.handle, vk::ImageViewType::TYPE_2D_ARRAY, format)
            .aspect_mask(aspect)
            .array_layers(0, VIEW_COUNT as _)
            .build(device)?;

        let attachment = LayeredAttachment { image, view };
        Ok(attachment)
    }

    fn discard_by(&mut self, device: &VkDevice) -> VkResult<()> {
        device.discard(self.view);
        device.vma_discard(&mut self.image)
    }
}

fn setup_descriptor(device: &VkDevice, ubo_buffer: &VmaBuffer, multiview: &MultiviewPass) -> VkResult<DescriptorStaff> {

    use vkbase::ci::descriptor::{DescriptorPoolCI, DescriptorSetLayoutCI, DescriptorSetAI};
    use vkbase::ci::descriptor::{DescriptorBufferSetWI, DescriptorSetsUpdateCI};

    let pool = DescriptorPoolCI::new(2)
        .add_descriptor(vk::DescriptorType::UNIFORM_BUFFER, 1)
        .add_descriptor(vk::DescriptorType::COMBINED_IMAGE_SAMPLER, 1)
        .build(device)?;

    // binding 0: matrices of both eyes.
    let scene_layout = DescriptorSetLayoutCI::new()
        .add_descriptor(vk::DescriptorType::UNIFORM_BUFFER, vk::ShaderStageFlags::VERTEX)
        .build(device)?;
    // binding 0: the layered color attachment.
    let display_layout = DescriptorSetLayoutCI::new()
        .add_descriptor(vk::DescriptorType::COMBINED_IMAGE_SAMPLER, vk::ShaderStageFlags::FRAGMENT)
        .build(device)?;

    let sets = DescriptorSetAI::new(pool)
        .add_set_layout(scene_layout)
        .add_set_layout(display_layout)
        .build(device)?;
    let (scene_set, display_set) = (sets[0], sets[1]);

    let ubo_write = DescriptorBufferSetWI::new(scene_set, 0, vk::DescriptorType::UNIFORM_BUFFER)
        .add_buffer(vk::DescriptorBufferInfo {
            buffer: ubo_buffer.handle,
            offset: 0,
            range : vk::WHOLE_SIZE,
        });

    DescriptorSetsUpdateCI::new()
        .add_write(&ubo_write)
        .update(device);
    update_display_set(device, display_set, multiview);

    let result = DescriptorStaff { pool, scene_set, scene_layout, display_set, display_layout };
    Ok(result)
}

/// Point the display set to the current color attachment of `multiview`.
fn update_display_set(device: &VkDevice, display_set: vk::DescriptorSet, multiview: &MultiviewPass) {

    use vkbase::ci::descriptor::{DescriptorImageSetWI, DescriptorSetsUpdateCI};

    let view_write = DescriptorImageSetWI::new(display_set, 0, vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
        .add_image(vk::DescriptorImageInfo {
            sampler: multiview.sampler,
            image_view: multiview.targets.color.view,
            image_layout: vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
        });

    DescriptorSetsUpdateCI::new()
        .add_write(&view_write)
        .update(device);
}

fn prepare_pipelines(device: &VkDevice, present_pass: vk::RenderPass, multiview_pass: vk::RenderPass, descriptors: &DescriptorStaff) -> VkResult<PipelineStaff> {

    let scene_layout = PipelineLayoutCI::new()
        .add_set_layout(descriptors.scene_layout)
        .build(device)?;
    let display_layout = PipelineLayoutCI::new()
        .add_set_layout(descriptors.display_layout)
        .add_push_constants(vk::ShaderStageFlags::FRAGMENT, std::mem::size_of::<vksint>() as _)
        .build(device)?;

    let mut compiler = VkShaderCompiler::new()?;
    let scene_vert = vksamples::build_shader(device, &mut compiler, vk::ShaderStageFlags::VERTEX, include_str!("scene.vert.glsl"), "scene.vert")?;
    let scene_frag = vksamples::build_shader(device, &mut compiler, vk::ShaderStageFlags::FRAGMENT, include_str!("scene.frag.glsl"), "scene.frag")?;
    let display_vert = vksamples::build_shader(device, &mut compiler, vk::ShaderStageFlags::VERTEX, include_str!("viewdisplay.vert.glsl"), "viewdisplay.vert")?;
    let display_frag = vksamples::build_shader(device, &mut compiler, vk::ShaderStageFlags::FRAGMENT, include_str!("viewdisplay.frag.glsl"), "viewdisplay.frag")?;

    let mut pipeline_ci = GraphicsPipelineCI::new(multiview_pass, scene_layout);
    pipeline_ci.set_vertex_input(MeshVertex::input_description(0));
    pipeline_ci.set_rasterization(RasterizationSCI::new()
        .cull_face(vk::CullModeFlags::BACK, vk::FrontFace::COUNTER_CLOCKWISE));
    pipeline_ci.set_depth_stencil(DepthStencilSCI::new()
        .depth_test(true, true, vk::CompareOp::LESS_OR_EQUAL));
    pipeline_ci.set_shaders(vec![
        ShaderStageCI::new(vk::ShaderStageFlags::VERTEX, scene_vert),
        ShaderStageCI::new(vk::ShaderStageFlags::FRAGMENT, scene_frag),
    ]);
    let scene = pipeline_ci.build(device)?;

    let mut pipeline_ci = GraphicsPipelineCI::new(present_pass, display_layout);
    pipeline_ci.set_vertex_input(VertexInputSCI::new());
    pipeline_ci.set_rasterization(RasterizationSCI::new()
        .cull_face(vk::CullModeFlags::NONE, vk::FrontFace::COUNTER_CLOCKWISE));
    pipeline_ci.set_shaders(vec![
        ShaderStageCI::new(vk::ShaderStageFlags::VERTEX, display_vert),
        ShaderStageCI::new(vk::ShaderStageFlags::FRAGMENT, display_frag),
    ]);
    let display = pipeline_ci.build(device)?;

    device.discard(scene_vert);
    device.discard(scene_frag);
    device.discard(display_vert);
    device.discard(display_frag);

    let result = PipelineStaff { scene, scene_layout, display, display_layout };
    Ok(result)
}
