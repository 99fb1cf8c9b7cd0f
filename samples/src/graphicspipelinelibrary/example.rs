
use ash::vk;
use winit::event::VirtualKeyCode;

use vkbase::context::{VulkanContext, VkDevice, VkSwapchain};
use vkbase::ci::VkObjectBuildableCI;
use vkbase::ci::vma::VmaBuffer;
use vkbase::ci::pipeline::*;
use vkbase::ci::shader::{ShaderModuleCI, ShaderStageCI, SpecializationCI};
use vkbase::command::{VkCmdRecorder, IGraphics, CmdGraphicsApi};
use vkbase::math::perspective_vk;
use vkbase::mesh::{MeshVertex, MeshBuffer};
use vkbase::utils::shaderc::VkShaderCompiler;
use vkbase::{InputController, FrameAction};
use vkbase::{Mat4F, Vec3F, Vec4F, Point3F};
use vkbase::{VkResult, VkError};

use vksamples::VkExampleBackendRes;
use crate::data::{UboScene, CellPushConstants, ShadingModel, LinkedVariant, PipelineQueue};
use crate::data::{GRID_COLUMNS, GRID_ROWS, MAX_VARIANTS};

use std::thread::JoinHandle;
use std::time::Instant;

/// variants linked on the render thread during initialization.
const INITIAL_VARIANTS: usize = 3;

const UBER_FRAG_SOURCE: &str = include_str!("uber.frag.glsl");

pub struct VulkanExample {

    backend: VkExampleBackendRes,

    model: MeshBuffer,
    ubo_buffer: VmaBuffer,
    rotation: f32,

    layout: vk::PipelineLayout,
    libraries: SharedLibraries,
    variants: Vec<LinkedVariant>,
    descriptors: DescriptorStaff,

    background: BackgroundBuilder,
    is_optimize_link: bool,

    is_cmd_dirty: bool,
}

/// The library parts shared by every pipeline variant.
#[derive(Debug, Clone, Copy)]
struct SharedLibraries {
    vertex_input: vk::Pipeline,
    pre_rasterization: vk::Pipeline,
    fragment_output: vk::Pipeline,
    render_pass: vk::RenderPass,
}

#[derive(Debug, Clone, Copy)]
struct VariantRequest {
    index: usize,
    is_optimize: bool,
}

/// Worker threads linking variants, with the queue where their results arrive.
struct BackgroundBuilder {
    queue: PipelineQueue<VkResult<LinkedVariant>>,
    workers: Vec<JoinHandle<()>>,
    pending: usize,
    is_requested: bool,
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

        let model_mesh = vkbase::mesh::uv_sphere(1.0, 48, 32);
        let model = MeshBuffer::upload(device, backend.command_pool, device.logic.queues.graphics.handle, &model_mesh)?;

        let ubo_buffer = vkbase::ci::vma::host_buffer_with_data(device, vk::BufferUsageFlags::UNIFORM_BUFFER, &[UboScene {
            projection: Mat4F::identity(),
            model_view: Mat4F::identity(),
            light_pos : Vec4F::new(0.0, 2.0, 1.0, 0.0),
        }])?;

        let descriptors = setup_descriptor(device, &ubo_buffer)?;

        let layout = PipelineLayoutCI::new()
            .add_set_layout(descriptors.layout)
            .add_push_constants(vk::ShaderStageFlags::FRAGMENT, std::mem::size_of::<CellPushConstants>() as _)
            .build(device)?;

        let mut compiler = VkShaderCompiler::new()?;
        let libraries = prepare_shared_libraries(device, &mut compiler, render_pass, layout)?;

        let mut variants = Vec::with_capacity(MAX_VARIANTS);
        for index in 0..INITIAL_VARIANTS {
            let request = VariantRequest { index, is_optimize: true };
            let variant = build_variant(&device.logic.handle, &mut compiler, &libraries, layout, request)?;
            log::info!("Variant {} ({:?}) linked in {:.2} ms.", index, variant.model, variant.build_millis);
            variants.push(variant);
        }

        let background = BackgroundBuilder {
            queue: PipelineQueue::default(),
            workers: Vec::new(),
            pending: 0,
            is_requested: false,
        };

        let mut target = VulkanExample {
            backend, model, ubo_buffer, layout, libraries, variants, descriptors, background,
            rotation: 0.0,
            is_optimize_link: true,
            is_cmd_dirty: true,
        };

        // one more variant is compiled and linked while the first frames are rendered.
        target.request_background_variant(device);

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

        self.collect_background_variants();

        self.rotation += delta_time * 30.0;
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

    fn receive_input(&mut self, inputer: &InputController, _delta_time: f32) -> FrameAction {

        if inputer.is_key_just_pressed(VirtualKeyCode::N) {
            self.background.is_requested = true;
        }
        if inputer.is_key_just_pressed(VirtualKeyCode::O) {
            self.is_optimize_link = !self.is_optimize_link;
            log::info!("Link time optimization for new variants: {}.", self.is_optimize_link);
        }

        FrameAction::Rendering
    }

    fn deinit(&mut self, device: &VkDevice) -> VkResult<()> {

        // the workers use the device, so they must finish first.
        for worker in self.background.workers.drain(..) {
            if worker.join().is_err() {
                log::error!("A pipeline worker thread panicked.");
            }
        }
        for result in self.background.queue.poll() {
            if let Ok(variant) = result {
                self.variants.push(variant);
            }
        }

        for variant in self.variants.iter() {
            device.discard(variant.pipeline);
            device.discard(variant.fragment_library);
        }
        device.discard(self.libraries.vertex_input);
        device.discard(self.libraries.pre_rasterization);
        device.discard(self.libraries.fragment_output);
        device.discard(self.layout);

        device.discard(self.descriptors.layout);
        device.discard(self.descriptors.pool);

        device.vma_discard(&mut self.ubo_buffer)?;
        self.model.discard_by(device)?;

        self.backend.discard_by(device)
    }
}

impl VulkanExample {

    fn request_background_variant(&mut self, device: &VkDevice) {

        let index = self.variants.len() + self.background.pending;
        if index >= MAX_VARIANTS {
            log::info!("Every cell has a pipeline already.");
            return
        }

        let request = VariantRequest { index, is_optimize: self.is_optimize_link };
        let raw_device = device.logic.handle.clone();
        let libraries = self.libraries;
        let layout = self.layout;
        let queue = self.background.queue.clone();

        let worker = std::thread::spawn(move || {

            let result = VkShaderCompiler::new().and_then(|mut compiler| {
                build_variant(&raw_device, &mut compiler, &libraries, layout, request)
            });
            queue.push(result);
        });

        log::info!("Building variant {} on a background thread.", index);
        self.background.workers.push(worker);
        self.background.pending += 1;
    }

    /// Pick up the variants finished by background threads since last frame.
    fn collect_background_variants(&mut self) {

        for result in self.background.queue.poll() {

            self.background.pending -= 1;
            match result {
                | Ok(variant) => {
                    log::info!("Variant {} ({:?}) linked in background in {:.2} ms.", self.variants.len(), variant.model, variant.build_millis);
                    self.variants.push(variant);
                    self.is_cmd_dirty = true;
                },
                | Err(e) => log::error!("Failed to build pipeline variant: {}", e),
            }
        }

        // finished workers have pushed their result, their handles can go.
        self.background.workers.retain(|worker| !worker.is_finished());
    }

    fn record_commands(&mut self, device: &VkDevice) -> VkResult<()> {

        let cells = super::data::viewport_cells(self.backend.dimension, GRID_COLUMNS, GRID_ROWS);

        for (i, &command) in self.backend.commands.iter().enumerate() {

            let recorder: VkCmdRecorder<IGraphics> = VkCmdRecorder::new(device, command);

            let render_pass_bi = RenderPassBI::new(self.backend.render_pass, self.backend.framebuffers[i])
                .render_extent(self.backend.dimension)
                .set_clear_values(vksamples::DEFAULT_CLEAR_VALUES.to_vec());

            recorder.begin_record()?
                .begin_render_pass(render_pass_bi)
                .bind_descriptor_sets(self.layout, 0, &[self.descriptors.set], &[]);

            for (variant, cell) in self.variants.iter().zip(cells.iter()) {

                let push_constants = CellPushConstants { color: variant.color };
                recorder
                    .set_viewport(0, &[*cell])
                    .set_scissor(0, &[super::data::scissor_of_cell(cell)])
                    .bind_pipeline(variant.pipeline)
                    .push_constants(self.layout, vk::ShaderStageFlags::FRAGMENT, 0, &push_constants);

                self.model.draw(&recorder, 1);
            }

            recorder
                .end_render_pass()
                .end_record()?;
        }

        self.is_cmd_dirty = false;
        Ok(())
    }

    fn update_uniforms(&mut self, device: &VkDevice) -> VkResult<()> {

        if self.background.is_requested {
            self.background.is_requested = false;
            self.request_background_variant(device);
        }

        let cell_aspect = (self.backend.dimension.width as f32 / GRID_COLUMNS as f32)
            / (self.backend.dimension.height.max(1) as f32 / GRID_ROWS as f32);

        let view = vkbase::math::look_at(&Point3F::new(0.0, 0.0, 3.2), &Point3F::origin(), &Vec3F::y());
        let model = Mat4F::from_axis_angle(&Vec3F::y_axis(), self.rotation.to_radians());

        let ubo_data = UboScene {
            projection: perspective_vk(45.0_f32.to_radians(), cell_aspect, 0.1, 64.0),
            model_view: view * model,
            light_pos : Vec4F::new(2.0, 3.0, 4.0, 0.0),
        };
        self.ubo_buffer.write(device, &[ubo_data])
    }
}

/// Build the vertex input, pre-rasterization and fragment output libraries.
fn prepare_shared_libraries(device: &VkDevice, compiler: &mut VkShaderCompiler, render_pass: vk::RenderPass, layout: vk::PipelineLayout) -> VkResult<SharedLibraries> {

    // vertex input interface. ------------------------------------------------------------
    let mut library_ci = GraphicsPipelineCI::new_library(vk::GraphicsPipelineLibraryFlagsEXT::VERTEX_INPUT_INTERFACE, render_pass, layout);
    library_ci.set_vertex_input(MeshVertex::input_description(0));
    library_ci.set_input_assembly(InputAssemblySCI::new());
    let vertex_input = library_ci.build(device)?;
    // ---------------------------------------------------------------------------------------

    // pre-rasterization shaders and states. -----------------------------------------------
    let vert = vksamples::build_shader(device, compiler, vk::ShaderStageFlags::VERTEX, include_str!("shared.vert.glsl"), "shared.vert")?;

    let mut library_ci = GraphicsPipelineCI::new_library(vk::GraphicsPipelineLibraryFlagsEXT::PRE_RASTERIZATION_SHADERS, render_pass, layout);
    library_ci.set_shaders(vec![ShaderStageCI::new(vk::ShaderStageFlags::VERTEX, vert)]);
    library_ci.set_viewport(ViewportSCI::new());
    library_ci.set_rasterization(RasterizationSCI::new()
        .cull_face(vk::CullModeFlags::BACK, vk::FrontFace::COUNTER_CLOCKWISE));
    library_ci.set_dynamic(DynamicSCI::new()
        .add_dynamic(vk::DynamicState::VIEWPORT)
        .add_dynamic(vk::DynamicState::SCISSOR));
    let pre_rasterization = library_ci.build(device)?;

    device.discard(vert);
    // ---------------------------------------------------------------------------------------

    // fragment output interface. ----------------------------------------------------------
    let mut library_ci = GraphicsPipelineCI::new_library(vk::GraphicsPipelineLibraryFlagsEXT::FRAGMENT_OUTPUT_INTERFACE, render_pass, layout);
    library_ci.set_color_blend(ColorBlendSCI::new().add_attachment(BlendAttachmentSCI::new()));
    library_ci.set_multisample(MultisampleSCI::new());
    let fragment_output = library_ci.build(device)?;
    // ---------------------------------------------------------------------------------------

    let libraries = SharedLibraries { vertex_input, pre_rasterization, fragment_output, render_pass };
    Ok(libraries)
}

/// Compile the fragment shader library of one variant and link it with the shared libraries.
///
/// Only the raw device is used, so that this can run on any thread.
fn build_variant(device: &ash::Device, compiler: &mut VkShaderCompiler, libraries: &SharedLibraries, layout: vk::PipelineLayout, request: VariantRequest) -> VkResult<LinkedVariant> {

    let start = Instant::now();
    let model = ShadingModel::for_variant(request.index);

    let frag = ShaderModuleCI::from_glsl(compiler, vk::ShaderStageFlags::FRAGMENT, UBER_FRAG_SOURCE, "uber.frag")?
        .build_by(device)?;

    let specialization = SpecializationCI::new()
        .add_constant(0, model.constant() as i32);

    let mut library_ci = GraphicsPipelineCI::new_library(vk::GraphicsPipelineLibraryFlagsEXT::FRAGMENT_SHADER, libraries.render_pass, layout);
    library_ci.set_shaders(vec![
        ShaderStageCI::new(vk::ShaderStageFlags::FRAGMENT, frag).specialization(specialization),
    ]);
    library_ci.set_depth_stencil(DepthStencilSCI::new()
        .depth_test(true, true, vk::CompareOp::LESS_OR_EQUAL));
    library_ci.set_multisample(MultisampleSCI::new());
    let fragment_library = library_ci.build_by(device);

    unsafe {
        device.destroy_shader_module(frag, None);
    }
    let fragment_library = fragment_library?;

    let linked_ci = GraphicsPipelineCI::link(vec![
        libraries.vertex_input,
        libraries.pre_rasterization,
        fragment_library,
        libraries.fragment_output,
    ], layout, request.is_optimize);

    let pipeline = match linked_ci.build_by(device) {
        | Ok(pipeline) => pipeline,
        | Err(e) => {
            unsafe { device.destroy_pipeline(fragment_library, None); }
            return Err(e)
        },
    };

    let variant = LinkedVariant {
        model, fragment_library, pipeline,
        color: super::data::variant_color(request.index),
        build_millis: start.elapsed().as_secs_f32() * 1000.0,
    };
    Ok(variant)
}

fn setup_descriptor(device: &VkDevice, ubo_buffer: &VmaBuffer) -> VkResult<DescriptorStaff> {

    use vkbase::ci::descriptor::{DescriptorPoolCI, DescriptorSetLayoutCI, DescriptorSetAI};
    use vkbase::ci::descriptor::{DescriptorBufferSetWI, DescriptorSetsUpdateCI};

    let pool = DescriptorPoolCI::new(1)
        .add_descriptor(vk::DescriptorType::UNIFORM_BUFFER, 1)
        .build(device)?;

    let layout = DescriptorSetLayoutCI::new()
        .add_descriptor(vk::DescriptorType::UNIFORM_BUFFER, vk::ShaderStageFlags::VERTEX)
        .build(device)?;

    let set = DescriptorSetAI::new(pool)
        .add_set_layout(layout)
        .build(device)?
        .into_iter().next()
        .ok_or(VkError::create("Descriptor Set"))?;

    let ubo_write = DescriptorBufferSetWI::new(set, 0, vk::DescriptorType::UNIFORM_BUFFER)
        .add_buffer(vk::DescriptorBufferInfo {
            buffer: ubo_buffer.handle,
            offset: 0,
            range : vk::WHOLE_SIZE,
        });

    DescriptorSetsUpdateCI::new()
        .add_write(&ubo_write)
        .update(device);

    let result = DescriptorStaff { pool, set, layout };
    Ok(result)
}
