
use ash::vk;
use winit::event::VirtualKeyCode;

use vkbase::context::{VulkanContext, VkDevice, VkSwapchain};
use vkbase::ci::VkObjectBuildableCI;
use vkbase::ci::vma::{VmaBuffer, VmaImage, VmaAllocationCI};
use vkbase::ci::pipeline::*;
use vkbase::ci::shader::ShaderStageCI;
use vkbase::command::{VkCmdRecorder, IGraphics, CmdGraphicsApi};
use vkbase::math::{perspective_vk, OrbitView};
use vkbase::mesh::{MeshVertex, MeshBuffer};
use vkbase::utils::shaderc::VkShaderCompiler;
use vkbase::{InputController, FrameAction};
use vkbase::{vkuint, Point3F, Vec4F};
use vkbase::VkResult;

use vksamples::VkExampleBackendRes;
use crate::data::{UboOffscreen, UboComposition, DisplayTarget};
use crate::data::{GBUFFER_DIM, INSTANCE_COUNT};

const POSITION_FORMAT: vk::Format = vk::Format::R16G16B16A16_SFLOAT;
const NORMAL_FORMAT  : vk::Format = vk::Format::R16G16B16A16_SFLOAT;
const ALBEDO_FORMAT  : vk::Format = vk::Format::R8G8B8A8_UNORM;

pub struct VulkanExample {

    backend: VkExampleBackendRes,
    view: OrbitView,

    floor: MeshBuffer,
    model: MeshBuffer,

    offscreen_ubo: VmaBuffer,
    composition_ubo: VmaBuffer,

    gbuffer: GBuffer,
    pipelines: PipelineStaff,
    descriptors: DescriptorStaff,

    display_target: DisplayTarget,
    timer: f32,
    is_animate_lights: bool,
    is_cmd_dirty: bool,
}

/// The offscreen framebuffer the scene is rendered to, before lighting.
struct GBuffer {
    position: FrameAttachment,
    normal  : FrameAttachment,
    albedo  : FrameAttachment,
    depth   : FrameAttachment,
    render_pass: vk::RenderPass,
    framebuffer: vk::Framebuffer,
    /// sampler for all color attachments in composition pass.
    sampler: vk::Sampler,
}

struct FrameAttachment {
    image: VmaImage,
    view : vk::ImageView,
}

struct PipelineStaff {
    offscreen: vk::Pipeline,
    offscreen_layout: vk::PipelineLayout,
    composition: vk::Pipeline,
    composition_layout: vk::PipelineLayout,
}

struct DescriptorStaff {
    pool: vk::DescriptorPool,
    offscreen_set: vk::DescriptorSet,
    offscreen_layout: vk::DescriptorSetLayout,
    composition_set: vk::DescriptorSet,
    composition_layout: vk::DescriptorSetLayout,
}

impl VulkanExample {

    pub fn new(context: &VulkanContext) -> VkResult<VulkanExample> {

        let device = &context.device;
        let swapchain = &context.swapchain;

        let render_pass = vksamples::setup_present_renderpass(device, swapchain)?;
        let backend = VkExampleBackendRes::new(device, swapchain, render_pass)?;

        let queue = device.logic.queues.graphics.handle;
        let floor = MeshBuffer::upload(device, backend.command_pool, queue, &super::data::generate_floor())?;
        let model = MeshBuffer::upload(device, backend.command_pool, queue, &super::data::generate_model())?;

        let view = OrbitView::new(Point3F::new(0.0, 1.5, -2.0), 12.0, 25.0, 180.0);

        let offscreen_data = UboOffscreen::new(perspective_vk(60.0_f32.to_radians(), 1.0, 0.1, 256.0), view.view_matrix());
        let offscreen_ubo = vkbase::ci::vma::host_buffer_with_data(device, vk::BufferUsageFlags::UNIFORM_BUFFER, &[offscreen_data])?;
        let composition_data = UboComposition::new(super::data::animate_lights(0.0), Vec4F::zeros(), DisplayTarget::Composition);
        let composition_ubo = vkbase::ci::vma::host_buffer_with_data(device, vk::BufferUsageFlags::UNIFORM_BUFFER, &[composition_data])?;

        let gbuffer = setup_gbuffer(device)?;
        let descriptors = setup_descriptor(device, &offscreen_ubo, &composition_ubo, &gbuffer)?;
        let pipelines = prepare_pipelines(device, backend.render_pass, gbuffer.render_pass, &descriptors)?;

        let target = VulkanExample {
            backend, view, floor, model,
            offscreen_ubo, composition_ubo,
            gbuffer, pipelines, descriptors,
            display_target: DisplayTarget::Composition,
            timer: 0.0,
            is_animate_lights: true,
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

        if self.is_animate_lights {
            self.timer = (self.timer + delta_time * 0.08) % 1.0;
        }
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
        self.is_cmd_dirty = true;
        Ok(())
    }

    fn receive_input(&mut self, inputer: &InputController, delta_time: f32) -> FrameAction {

        if inputer.is_key_just_pressed(VirtualKeyCode::D) {
            self.display_target = self.display_target.next();
            log::info!("Display target: {:?}.", self.display_target);
        }
        if inputer.is_key_just_pressed(VirtualKeyCode::Space) {
            self.is_animate_lights = !self.is_animate_lights;
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

        device.discard(self.descriptors.offscreen_layout);
        device.discard(self.descriptors.composition_layout);
        device.discard(self.descriptors.pool);

        device.discard(self.pipelines.offscreen);
        device.discard(self.pipelines.offscreen_layout);
        device.discard(self.pipelines.composition);
        device.discard(self.pipelines.composition_layout);

        self.gbuffer.discard_by(device)?;

        device.vma_discard(&mut self.offscreen_ubo)?;
        device.vma_discard(&mut self.composition_ubo)?;
        self.floor.discard_by(device)?;
        self.model.discard_by(device)?;

        self.backend.discard_by(device)
    }
}

impl VulkanExample {

    fn record_commands(&mut self, device: &VkDevice) -> VkResult<()> {

        let gbuffer_extent = vk::Extent2D { width: GBUFFER_DIM, height: GBUFFER_DIM };

        let clear_color = vk::ClearValue { color: vk::ClearColorValue { float32: [0.0; 4] } };
        let gbuffer_clears = vec![clear_color, clear_color, clear_color, vksamples::DEFAULT_CLEAR_DEPTH];

        for (i, &command) in self.backend.commands.iter().enumerate() {

            let recorder: VkCmdRecorder<IGraphics> = VkCmdRecorder::new(device, command);
            recorder.begin_record()?;

            // fill the G-buffer. --------------------------------------------------------------
            let offscreen_bi = RenderPassBI::new(self.gbuffer.render_pass, self.gbuffer.framebuffer)
                .render_extent(gbuffer_extent)
                .set_clear_values(gbuffer_clears.clone());

            recorder
                .begin_render_pass(offscreen_bi)
                .set_viewport(0, &[vksamples::viewport_of(gbuffer_extent)])
                .set_scissor(0, &[vksamples::scissor_of(gbuffer_extent)])
                .bind_pipeline(self.pipelines.offscreen)
                .bind_descriptor_sets(self.pipelines.offscreen_layout, 0, &[self.descriptors.offscreen_set], &[]);

            recorder.push_constants(self.pipelines.offscreen_layout, vk::ShaderStageFlags::VERTEX, 0, &(0 as vkuint));
            self.floor.draw(&recorder, 1);

            recorder.push_constants(self.pipelines.offscreen_layout, vk::ShaderStageFlags::VERTEX, 0, &(1 as vkuint));
            self.model.draw(&recorder, INSTANCE_COUNT as _);

            recorder.end_render_pass();
            // ---------------------------------------------------------------------------------

            // light the scene from the G-buffer. ----------------------------------------------
            let composition_bi = RenderPassBI::new(self.backend.render_pass, self.backend.framebuffers[i])
                .render_extent(self.backend.dimension)
                .set_clear_values(vksamples::DEFAULT_CLEAR_VALUES.to_vec());

            recorder
                .begin_render_pass(composition_bi)
                .set_viewport(0, &[self.backend.viewport()])
                .set_scissor(0, &[self.backend.scissor()])
                .bind_pipeline(self.pipelines.composition)
                .bind_descriptor_sets(self.pipelines.composition_layout, 0, &[self.descriptors.composition_set], &[])
                .draw(3, 1, 0, 0)
                .end_render_pass();
            // ---------------------------------------------------------------------------------

            recorder.end_record()?;
        }

        self.is_cmd_dirty = false;
        Ok(())
    }

    fn update_uniforms(&mut self, device: &VkDevice) -> VkResult<()> {

        // the G-buffer is stretched to the window, so it is rendered with the window aspect.
        let aspect = vksamples::aspect_ratio(self.backend.dimension);
        let projection = perspective_vk(60.0_f32.to_radians(), aspect, 0.1, 256.0);
        let offscreen_data = UboOffscreen::new(projection, self.view.view_matrix());
        self.offscreen_ubo.write(device, &[offscreen_data])?;

        let eye = self.view.position();
        let composition_data = UboComposition::new(
            super::data::animate_lights(self.timer),
            Vec4F::new(eye.x, eye.y, eye.z, 1.0),
            self.display_target);
        self.composition_ubo.write(device, &[composition_data])
    }
}

impl GBuffer {

    fn discard_by(&mut self, device: &VkDevice) -> VkResult<()> {

        device.discard(self.sampler);
        device.discard(self.framebuffer);
        device.discard(self.render_pass);

        self.position.discard_by(device)?;
        self.normal.discard_by(device)?;
        self.albedo.discard_by(device)?;
        self.depth.discard_by(device)
    }
}

impl FrameAttachment {

    fn new(device: &VkDevice, format: vk::Format, usage: vk::ImageUsageFlags, aspect: vk::ImageAspectFlags) -> VkResult<FrameAttachment> {

        use vkbase::ci::image::{ImageCI, ImageViewCI};

        let image_ci = ImageCI::new_2d(format, vk::Extent2D { width: GBUFFER_DIM, height: GBUFFER_DIM })
            .usages(usage | vk::ImageUsageFlags::SAMPLED);
        let image = VmaAllocationCI::device_local()
            .build_image(device, &image_ci)?;

        let view = ImageViewCI::new(image.handle, vk::ImageViewType::TYPE_2D, format)
            .aspect_mask(aspect)
            .build(device)?;

        let attachment = FrameAttachment { image, view };
        Ok(attachment)
    }

    fn discard_by(&mut self, device: &VkDevice) -> VkResult<()> {
        device.discard(self.view);
        device.vma_discard(&mut self.image)
    }
}

fn setup_gbuffer(device: &VkDevice) -> VkResult<GBuffer> {

    use vkbase::ci::image::SamplerCI;

    let depth_format = device.phy.depth_format;

    let position = FrameAttachment::new(device, POSITION_FORMAT, vk::ImageUsageFlags::COLOR_ATTACHMENT, vk::ImageAspectFlags::COLOR)?;
    let normal   = FrameAttachment::new(device, NORMAL_FORMAT, vk::ImageUsageFlags::COLOR_ATTACHMENT, vk::ImageAspectFlags::COLOR)?;
    let albedo   = FrameAttachment::new(device, ALBEDO_FORMAT, vk::ImageUsageFlags::COLOR_ATTACHMENT, vk::ImageAspectFlags::COLOR)?;
    let depth    = FrameAttachment::new(device, depth_format, vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT, vksamples::depth_aspect(depth_format))?;

    // color attachments are read by the composition pass after this render pass.
    let color_attachment = |format: vk::Format| {
        AttachmentDescCI::new(format)
            .op(vk::AttachmentLoadOp::CLEAR, vk::AttachmentStoreOp::STORE)
            .layout(vk::ImageLayout::UNDEFINED, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL)
    };
    let depth_attachment = AttachmentDescCI::new(depth_format)
        .op(vk::AttachmentLoadOp::CLEAR, vk::AttachmentStoreOp::DONT_CARE)
        .layout(vk::ImageLayout::UNDEFINED, vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL);

    let subpass = SubpassDescCI::new(vk::PipelineBindPoint::GRAPHICS)
        .add_color_attachment(0, vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)
        .add_color_attachment(1, vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)
        .add_color_attachment(2, vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)
        .set_depth_stencil_attachment(3, vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL);

    let dependency0 = SubpassDependencyCI::new(vk::SUBPASS_EXTERNAL, 0)
        .stage_mask(vk::PipelineStageFlags::FRAGMENT_SHADER, vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT | vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS)
        .access_mask(vk::AccessFlags::SHADER_READ, vk::AccessFlags::COLOR_ATTACHMENT_WRITE | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE)
        .flags(vk::DependencyFlags::BY_REGION);
    let dependency1 = SubpassDependencyCI::new(0, vk::SUBPASS_EXTERNAL)
        .stage_mask(vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT, vk::PipelineStageFlags::FRAGMENT_SHADER)
        .access_mask(vk::AccessFlags::COLOR_ATTACHMENT_WRITE, vk::AccessFlags::SHADER_READ)
        .flags(vk::DependencyFlags::BY_REGION);

    let render_pass = RenderPassCI::new()
        .add_attachment(color_attachment(POSITION_FORMAT))
        .add_attachment(color_attachment(NORMAL_FORMAT))
        .add_attachment(color_attachment(ALBEDO_FORMAT))
        .add_attachment(depth_attachment)
        .add_subpass(subpass)
        .add_dependency(dependency0)
        .add_dependency(dependency1)
        .build(device)?;

    let framebuffer = FramebufferCI::new_2d(render_pass, vk::Extent2D { width: GBUFFER_DIM, height: GBUFFER_DIM })
        .add_attachment(position.view)
        .add_attachment(normal.view)
        .add_attachment(albedo.view)
        .add_attachment(depth.view)
        .build(device)?;

    let sampler = SamplerCI::new()
        .filter(vk::Filter::NEAREST, vk::Filter::NEAREST)
        .address_mode(vk::SamplerAddressMode::CLAMP_TO_EDGE)
        .lod(0.0, 0.0, 1.0)
        .build(device)?;

    log::debug!("G-buffer of {0}x{0}, depth format {1:?}.", GBUFFER_DIM, depth_format);

    let result = GBuffer { position, normal, albedo, depth, render_pass, framebuffer, sampler };
    Ok(result)
}

fn setup_descriptor(device: &VkDevice, offscreen_ubo: &VmaBuffer, composition_ubo: &VmaBuffer, gbuffer: &GBuffer) -> VkResult<DescriptorStaff> {

    use vkbase::ci::descriptor::{DescriptorPoolCI, DescriptorSetLayoutCI, DescriptorSetAI};
    use vkbase::ci::descriptor::{DescriptorBufferSetWI, DescriptorImageSetWI, DescriptorSetsUpdateCI};

    let pool = DescriptorPoolCI::new(2)
        .add_descriptor(vk::DescriptorType::UNIFORM_BUFFER, 2)
        .add_descriptor(vk::DescriptorType::COMBINED_IMAGE_SAMPLER, 3)
        .build(device)?;

    // binding 0: scene matrices and instance positions.
    let offscreen_layout = DescriptorSetLayoutCI::new()
        .add_descriptor(vk::DescriptorType::UNIFORM_BUFFER, vk::ShaderStageFlags::VERTEX)
        .build(device)?;

    // binding 0..=2: position, normal and albedo attachments.
    // binding 3: lights.
    let composition_layout = DescriptorSetLayoutCI::new()
        .add_descriptor(vk::DescriptorType::COMBINED_IMAGE_SAMPLER, vk::ShaderStageFlags::FRAGMENT)
        .add_descriptor(vk::DescriptorType::COMBINED_IMAGE_SAMPLER, vk::ShaderStageFlags::FRAGMENT)
        .add_descriptor(vk::DescriptorType::COMBINED_IMAGE_SAMPLER, vk::ShaderStageFlags::FRAGMENT)
        .add_descriptor(vk::DescriptorType::UNIFORM_BUFFER, vk::ShaderStageFlags::FRAGMENT)
        .build(device)?;

    let sets = DescriptorSetAI::new(pool)
        .add_set_layout(offscreen_layout)
        .add_set_layout(composition_layout)
        .build(device)?;
    let (offscreen_set, composition_set) = (sets[0], sets[1]);

    let offscreen_write = DescriptorBufferSetWI::new(offscreen_set, 0, vk::DescriptorType::UNIFORM_BUFFER)
        .add_buffer(vk::DescriptorBufferInfo {
            buffer: offscreen_ubo.handle,
            offset: 0,
            range : vk::WHOLE_SIZE,
        });

    let attachment_write = |binding: vkuint, attachment: &FrameAttachment| {
        DescriptorImageSetWI::new(composition_set, binding, vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
            .add_image(vk::DescriptorImageInfo {
                sampler: gbuffer.sampler,
                image_view: attachment.view,
                image_layout: vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
            })
    };
    let position_write = attachment_write(0, &gbuffer.position);
    let normal_write   = attachment_write(1, &gbuffer.normal);
    let albedo_write   = attachment_write(2, &gbuffer.albedo);

    let lights_write = DescriptorBufferSetWI::new(composition_set, 3, vk::DescriptorType::UNIFORM_BUFFER)
        .add_buffer(vk::DescriptorBufferInfo {
            buffer: composition_ubo.handle,
            offset: 0,
            range : vk::WHOLE_SIZE,
        });

    DescriptorSetsUpdateCI::new()
        .add_write(&offscreen_write)
        .add_write(&position_write)
        .add_write(&normal_write)
        .add_write(&albedo_write)
        .add_write(&lights_write)
        .update(device);

    let result = DescriptorStaff { pool, offscreen_set, offscreen_layout, composition_set, composition_layout };
    Ok(result)
}

fn prepare_pipelines(device: &VkDevice, present_pass: vk::RenderPass, gbuffer_pass: vk::RenderPass, descriptors: &DescriptorStaff) -> VkResult<PipelineStaff> {

    let offscreen_layout = PipelineLayoutCI::new()
        .add_set_layout(descriptors.offscreen_layout)
        .add_push_constants(vk::ShaderStageFlags::VERTEX, std::mem::size_of::<vkuint>() as _)
        .build(device)?;
    let composition_layout = PipelineLayoutCI::new()
        .add_set_layout(descriptors.composition_layout)
        .build(device)?;

    let mut compiler = VkShaderCompiler::new()?;
    let mrt_vert = vksamples::build_shader(device, &mut compiler, vk::ShaderStageFlags::VERTEX, include_str!("mrt.vert.glsl"), "mrt.vert")?;
    let mrt_frag = vksamples::build_shader(device, &mut compiler, vk::ShaderStageFlags::FRAGMENT, include_str!("mrt.frag.glsl"), "mrt.frag")?;
    let composition_vert = vksamples::build_shader(device, &mut compiler, vk::ShaderStageFlags::VERTEX, include_str!("deferred.vert.glsl"), "deferred.vert")?;
    let composition_frag = vksamples::build_shader(device, &mut compiler, vk::ShaderStageFlags::FRAGMENT, include_str!("deferred.frag.glsl"), "deferred.frag")?;

    // G-buffer pipeline, writing to the 3 color attachments.
    let mut pipeline_ci = GraphicsPipelineCI::new(gbuffer_pass, offscreen_layout);
    pipeline_ci.set_vertex_input(MeshVertex::input_description(0));
    pipeline_ci.set_rasterization(RasterizationSCI::new()
        .cull_face(vk::CullModeFlags::BACK, vk::FrontFace::COUNTER_CLOCKWISE));
    pipeline_ci.set_depth_stencil(DepthStencilSCI::new()
        .depth_test(true, true, vk::CompareOp::LESS_OR_EQUAL));
    pipeline_ci.set_color_blend(ColorBlendSCI::new()
        .add_opaque_attachments(3));
    pipeline_ci.set_shaders(vec![
        ShaderStageCI::new(vk::ShaderStageFlags::VERTEX, mrt_vert),
        ShaderStageCI::new(vk::ShaderStageFlags::FRAGMENT, mrt_frag),
    ]);
    let offscreen = pipeline_ci.build(device)?;

    // composition pipeline, a full screen triangle without vertex input.
    let mut pipeline_ci = GraphicsPipelineCI::new(present_pass, composition_layout);
    pipeline_ci.set_vertex_input(VertexInputSCI::new());
    pipeline_ci.set_rasterization(RasterizationSCI::new()
        .cull_face(vk::CullModeFlags::NONE, vk::FrontFace::COUNTER_CLOCKWISE));
    pipeline_ci.set_shaders(vec![
        ShaderStageCI::new(vk::ShaderStageFlags::VERTEX, composition_vert),
        ShaderStageCI::new(vk::ShaderStageFlags::FRAGMENT, composition_frag),
    ]);
    let composition = pipeline_ci.build(device)?;

    device.discard(mrt_vert);
    device.discard(mrt_frag);
    device.discard(composition_vert);
    device.discard(composition_frag);

    let result = PipelineStaff { offscreen, offscreen_layout, composition, composition_layout };
    Ok(result)
}
