
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
use crate::data::{UboShared, SHADOW_MAP_CASCADE_COUNT, SHADOW_MAP_DIM};

const DEPTH_FORMAT: vk::Format = vk::Format::D32_SFLOAT;
const CASCADE_SPLIT_LAMBDA: f32 = 0.95;
const Z_NEAR: f32 = 0.5;
const Z_FAR : f32 = 48.0;

pub struct VulkanExample {

    backend: VkExampleBackendRes,
    view: OrbitView,

    scene: MeshBuffer,

    ubo_buffer: VmaBuffer,
    ubo_data: UboShared,

    cascades: CascadeStaff,
    pipelines: PipelineStaff,
    descriptors: DescriptorStaff,

    timer: f32,
    is_animate_light: bool,
    is_cmd_dirty: bool,
}

/// The layered shadow map and the objects to render into each layer of it.
struct CascadeStaff {
    image: VmaImage,
    /// view of all layers, sampled in scene pass.
    array_view: vk::ImageView,
    /// one view for each cascade, used as depth attachment.
    layer_views: Vec<vk::ImageView>,
    framebuffers: Vec<vk::Framebuffer>,
    render_pass: vk::RenderPass,
    sampler: vk::Sampler,
}

struct PipelineStaff {
    depth_pass: vk::Pipeline,
    scene: vk::Pipeline,
    layout: vk::PipelineLayout,
}

struct DescriptorStaff {
    pool  : vk::DescriptorPool,
    set   : vk::DescriptorSet,
    layout: vk::DescriptorSetLayout,
}

impl VulkanExample {

    pub fn new(context: &VulkanContext) -> VkResult<VulkanExample> {

        let device = &context.device;
        let swapchain = &context.swapchain;

        let render_pass = vksamples::setup_present_renderpass(device, swapchain)?;
        let backend = VkExampleBackendRes::new(device, swapchain, render_pass)?;

        let scene_mesh = super::data::generate_scene();
        let scene = MeshBuffer::upload(device, backend.command_pool, device.logic.queues.graphics.handle, &scene_mesh)?;

        let ubo_data = UboShared::default();
        let ubo_buffer = vkbase::ci::vma::host_buffer_with_data(device, vk::BufferUsageFlags::UNIFORM_BUFFER, &[ubo_data])?;

        let cascades = setup_cascades(device)?;
        let descriptors = setup_descriptor(device, &ubo_buffer, &cascades)?;
        let pipelines = prepare_pipelines(device, backend.render_pass, cascades.render_pass, descriptors.layout)?;

        let view = OrbitView::new(Point3F::new(0.0, 0.5, -6.0), 14.0, 22.0, 35.0);

        let target = VulkanExample {
            backend, view, scene, ubo_buffer, ubo_data,
            cascades, pipelines, descriptors,
            timer: 0.2,
            is_animate_light: true,
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

        if self.is_animate_light {
            self.timer = (self.timer + delta_time * 0.025) % 1.0;
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

        if inputer.is_key_just_pressed(VirtualKeyCode::C) {
            self.ubo_data.color_cascades ^= 1;
            log::info!("Cascade visualization: {}.", self.ubo_data.color_cascades == 1);
        }
        if inputer.is_key_just_pressed(VirtualKeyCode::F) {
            self.ubo_data.filter_pcf ^= 1;
            log::info!("PCF filtering: {}.", self.ubo_data.filter_pcf == 1);
        }
        if inputer.is_key_just_pressed(VirtualKeyCode::Space) {
            self.is_animate_light = !self.is_animate_light;
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

        device.discard(self.descriptors.layout);
        device.discard(self.descriptors.pool);

        device.discard(self.pipelines.depth_pass);
        device.discard(self.pipelines.scene);
        device.discard(self.pipelines.layout);

        device.discard(self.cascades.sampler);
        device.discard(&self.cascades.framebuffers);
        device.discard(&self.cascades.layer_views);
        device.discard(self.cascades.array_view);
        device.discard(self.cascades.render_pass);
        device.vma_discard(&mut self.cascades.image)?;

        device.vma_discard(&mut self.ubo_buffer)?;
        self.scene.discard_by(device)?;

        self.backend.discard_by(device)
    }
}

impl VulkanExample {

    fn record_commands(&mut self, device: &VkDevice) -> VkResult<()> {

        let shadow_extent = vk::Extent2D { width: SHADOW_MAP_DIM, height: SHADOW_MAP_DIM };

        for (i, &command) in self.backend.commands.iter().enumerate() {

            let recorder: VkCmdRecorder<IGraphics> = VkCmdRecorder::new(device, command);
            recorder.begin_record()?;

            // generate the shadow map of each cascade. --------------------------------------
            for (cascade_index, &framebuffer) in self.cascades.framebuffers.iter().enumerate() {

                let depth_bi = RenderPassBI::new(self.cascades.render_pass, framebuffer)
                    .render_extent(shadow_extent)
                    .add_clear_value(vksamples::DEFAULT_CLEAR_DEPTH);

                recorder
                    .begin_render_pass(depth_bi)
                    .set_viewport(0, &[vksamples::viewport_of(shadow_extent)])
                    .set_scissor(0, &[vksamples::scissor_of(shadow_extent)])
                    .bind_pipeline(self.pipelines.depth_pass)
                    .bind_descriptor_sets(self.pipelines.layout, 0, &[self.descriptors.set], &[])
                    .push_constants(self.pipelines.layout, vk::ShaderStageFlags::VERTEX, 0, &(cascade_index as vkuint));

                self.scene.draw(&recorder, 1);
                recorder.end_render_pass();
            }
            // ---------------------------------------------------------------------------------

            // render the scene with the generated shadow map. --------------------------------
            let scene_bi = RenderPassBI::new(self.backend.render_pass, self.backend.framebuffers[i])
                .render_extent(self.backend.dimension)
                .set_clear_values(vksamples::DEFAULT_CLEAR_VALUES.to_vec());

            recorder
                .begin_render_pass(scene_bi)
                .set_viewport(0, &[self.backend.viewport()])
                .set_scissor(0, &[self.backend.scissor()])
                .bind_pipeline(self.pipelines.scene)
                .bind_descriptor_sets(self.pipelines.layout, 0, &[self.descriptors.set], &[]);

            self.scene.draw(&recorder, 1);
            recorder.end_render_pass();
            // ---------------------------------------------------------------------------------

            recorder.end_record()?;
        }

        self.is_cmd_dirty = false;
        Ok(())
    }

    fn update_uniforms(&mut self, device: &VkDevice) -> VkResult<()> {

        let aspect = vksamples::aspect_ratio(self.backend.dimension);
        let projection = perspective_vk(45.0_f32.to_radians(), aspect, Z_NEAR, Z_FAR);
        let view = self.view.view_matrix();

        let light_dir = super::data::light_direction(self.timer);

        let inv_cam = (projection * view).try_inverse()
            .ok_or(vkbase::VkError::other("Camera matrix is not invertible."))?;
        let splits = super::data::compute_cascade_splits(Z_NEAR, Z_FAR, CASCADE_SPLIT_LAMBDA, SHADOW_MAP_CASCADE_COUNT);
        let cascades = super::data::compute_cascades(&inv_cam, &splits, Z_NEAR, Z_FAR, &light_dir);

        for (i, cascade) in cascades.iter().enumerate() {
            self.ubo_data.cascade_splits[i] = cascade.split_depth;
            self.ubo_data.cascade_view_proj[i] = cascade.view_proj;
        }

        self.ubo_data.projection = projection;
        self.ubo_data.view = view;
        self.ubo_data.light_dir = Vec4F::new(light_dir.x, light_dir.y, light_dir.z, 0.0);

        self.ubo_buffer.write(device, &[self.ubo_data])
    }
}

fn setup_cascades(device: &VkDevice) -> VkResult<CascadeStaff> {

    use vkbase::ci::image::{ImageCI, ImageViewCI, SamplerCI};

    let image_ci = ImageCI::new(vk::ImageType::TYPE_2D, DEPTH_FORMAT, vk::Extent3D { width: SHADOW_MAP_DIM, height: SHADOW_MAP_DIM, depth: 1 })
        .array_layers(SHADOW_MAP_CASCADE_COUNT as _)
        .usages(vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT | vk::ImageUsageFlags::SAMPLED);
    let image = VmaAllocationCI::device_local()
        .build_image(device, &image_ci)?;

    let array_view = ImageViewCI::new(image.handle, vk::ImageViewType::TYPE_2D_ARRAY, DEPTH_FORMAT)
        .aspect_mask(vk::ImageAspectFlags::DEPTH)
        .array_layers(0, SHADOW_MAP_CASCADE_COUNT as _)
        .build(device)?;

    // depth only render pass, the result is read in fragment shader of scene pass.
    let depth_attachment = AttachmentDescCI::new(DEPTH_FORMAT)
        .op(vk::AttachmentLoadOp::CLEAR, vk::AttachmentStoreOp::STORE)
        .layout(vk::ImageLayout::UNDEFINED, vk::ImageLayout::DEPTH_STENCIL_READ_ONLY_OPTIMAL);

    let subpass = SubpassDescCI::new(vk::PipelineBindPoint::GRAPHICS)
        .set_depth_stencil_attachment(0, vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL);

    let dependency0 = SubpassDependencyCI::new(vk::SUBPASS_EXTERNAL, 0)
        .stage_mask(vk::PipelineStageFlags::FRAGMENT_SHADER, vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS)
        .access_mask(vk::AccessFlags::SHADER_READ, vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE);
    let dependency1 = SubpassDependencyCI::new(0, vk::SUBPASS_EXTERNAL)
        .stage_mask(vk::PipelineStageFlags::LATE_FRAGMENT_TESTS, vk::PipelineStageFlags::FRAGMENT_SHADER)
        .access_mask(vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE, vk::AccessFlags::SHADER_READ);

    let render_pass = RenderPassCI::new()
        .add_attachment(depth_attachment)
        .add_subpass(subpass)
        .add_dependency(dependency0)
        .add_dependency(dependency1)
        .build(device)?;

    let mut layer_views = Vec::with_capacity(SHADOW_MAP_CASCADE_COUNT);
    let mut framebuffers = Vec::with_capacity(SHADOW_MAP_CASCADE_COUNT);

    for layer in 0..SHADOW_MAP_CASCADE_COUNT {

        let view = ImageViewCI::new(image.handle, vk::ImageViewType::TYPE_2D_ARRAY, DEPTH_FORMAT)
            .aspect_mask(vk::ImageAspectFlags::DEPTH)
            .array_layers(layer as _, 1)
            .build(device)?;

        let framebuffer = FramebufferCI::new_2d(render_pass, vk::Extent2D { width: SHADOW_MAP_DIM, height: SHADOW_MAP_DIM })
            .add_attachment(view)
            .build(device)?;

        layer_views.push(view);
        framebuffers.push(framebuffer);
    }

    let sampler = SamplerCI::new()
        .filter(vk::Filter::LINEAR, vk::Filter::LINEAR)
        .address_mode(vk::SamplerAddressMode::CLAMP_TO_EDGE)
        .lod(0.0, 0.0, 1.0)
        .border_color(vk::BorderColor::FLOAT_OPAQUE_WHITE)
        .build(device)?;

    let result = CascadeStaff { image, array_view, layer_views, framebuffers, render_pass, sampler };
    Ok(result)
}

fn setup_descriptor(device: &VkDevice, ubo_buffer: &VmaBuffer, cascades: &CascadeStaff) -> VkResult<DescriptorStaff> {

    use vkbase::ci::descriptor::{DescriptorPoolCI, DescriptorSetLayoutCI, DescriptorSetAI};
    use vkbase::ci::descriptor::{DescriptorBufferSetWI, DescriptorImageSetWI, DescriptorSetsUpdateCI};

    let pool = DescriptorPoolCI::new(1)
        .add_descriptor(vk::DescriptorType::UNIFORM_BUFFER, 1)
        .add_descriptor(vk::DescriptorType::COMBINED_IMAGE_SAMPLER, 1)
        .build(device)?;

    // binding 0: shared uniform buffer.
    // binding 1: layered shadow map.
    let layout = DescriptorSetLayoutCI::new()
        .add_descriptor(vk::DescriptorType::UNIFORM_BUFFER, vk::ShaderStageFlags::VERTEX | vk::ShaderStageFlags::FRAGMENT)
        .add_descriptor(vk::DescriptorType::COMBINED_IMAGE_SAMPLER, vk::ShaderStageFlags::FRAGMENT)
        .build(device)?;

    let mut sets = DescriptorSetAI::new(pool)
        .add_set_layout(layout)
        .build(device)?;
    let set = sets.remove(0);

    let ubo_write = DescriptorBufferSetWI::new(set, 0, vk::DescriptorType::UNIFORM_BUFFER)
        .add_buffer(vk::DescriptorBufferInfo {
            buffer: ubo_buffer.handle,
            offset: 0,
            range : vk::WHOLE_SIZE,
        });
    let shadow_write = DescriptorImageSetWI::new(set, 1, vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
        .add_image(vk::DescriptorImageInfo {
            sampler: cascades.sampler,
            image_view: cascades.array_view,
            image_layout: vk::ImageLayout::DEPTH_STENCIL_READ_ONLY_OPTIMAL,
        });

    DescriptorSetsUpdateCI::new()
        .add_write(&ubo_write)
        .add_write(&shadow_write)
        .update(device);

    let result = DescriptorStaff { pool, set, layout };
    Ok(result)
}

fn prepare_pipelines(device: &VkDevice, scene_pass: vk::RenderPass, depth_pass: vk::RenderPass, set_layout: vk::DescriptorSetLayout) -> VkResult<PipelineStaff> {

    let layout = PipelineLayoutCI::new()
        .add_set_layout(set_layout)
        .add_push_constants(vk::ShaderStageFlags::VERTEX, std::mem::size_of::<vkuint>() as _)
        .build(device)?;

    let mut compiler = VkShaderCompiler::new()?;
    let depth_vert = vksamples::build_shader(device, &mut compiler, vk::ShaderStageFlags::VERTEX, include_str!("depthpass.vert.glsl"), "depthpass.vert")?;
    let scene_vert = vksamples::build_shader(device, &mut compiler, vk::ShaderStageFlags::VERTEX, include_str!("scene.vert.glsl"), "scene.vert")?;
    let scene_frag = vksamples::build_shader(device, &mut compiler, vk::ShaderStageFlags::FRAGMENT, include_str!("scene.frag.glsl"), "scene.frag")?;

    let depth_state = DepthStencilSCI::new()
        .depth_test(true, true, vk::CompareOp::LESS_OR_EQUAL);

    // scene pipeline.
    let mut pipeline_ci = GraphicsPipelineCI::new(scene_pass, layout);
    pipeline_ci.set_vertex_input(MeshVertex::input_description(0));
    pipeline_ci.set_depth_stencil(depth_state.clone());
    pipeline_ci.set_rasterization(RasterizationSCI::new()
        .cull_face(vk::CullModeFlags::BACK, vk::FrontFace::COUNTER_CLOCKWISE));
    pipeline_ci.set_shaders(vec![
        ShaderStageCI::new(vk::ShaderStageFlags::VERTEX, scene_vert),
        ShaderStageCI::new(vk::ShaderStageFlags::FRAGMENT, scene_frag),
    ]);
    let scene = pipeline_ci.build(device)?;

    // depth pass pipeline, without fragment shader and color attachment.
    let mut pipeline_ci = GraphicsPipelineCI::new(depth_pass, layout);
    pipeline_ci.set_vertex_input(MeshVertex::input_description(0));
    pipeline_ci.set_depth_stencil(depth_state);
    pipeline_ci.set_color_blend(ColorBlendSCI::new());
    // enable depth clamp to keep the geometry behind the light near plane.
    pipeline_ci.set_rasterization(RasterizationSCI::new()
        .depth_clamp(device.phy.enable_features().depth_clamp == vk::TRUE)
        .cull_face(vk::CullModeFlags::NONE, vk::FrontFace::COUNTER_CLOCKWISE));
    pipeline_ci.set_shaders(vec![
        ShaderStageCI::new(vk::ShaderStageFlags::VERTEX, depth_vert),
    ]);
    let depth_pass = pipeline_ci.build(device)?;

    device.discard(depth_vert);
    device.discard(scene_vert);
    device.discard(scene_frag);

    let result = PipelineStaff { depth_pass, scene, layout };
    Ok(result)
}
