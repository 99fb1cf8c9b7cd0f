
use ash::vk;
use winit::event::VirtualKeyCode;

use vkbase::context::{VulkanContext, VkDevice, VkSwapchain, VkQueue};
use vkbase::ci::VkObjectBuildableCI;
use vkbase::ci::buffer::BufferBarrierCI;
use vkbase::ci::command::{CommandPoolCI, CommandBufferAI};
use vkbase::ci::device::SubmitCI;
use vkbase::ci::vma::VmaBuffer;
use vkbase::ci::sync::{FenceCI, SemaphoreCI};
use vkbase::ci::pipeline::*;
use vkbase::ci::shader::ShaderStageCI;
use vkbase::command::{VkCmdRecorder, IGraphics, ICompute, CmdGraphicsApi, CmdComputeApi};
use vkbase::math::{perspective_vk, OrbitView};
use vkbase::mesh::{MeshVertex, MeshBuffer};
use vkbase::utils::shaderc::VkShaderCompiler;
use vkbase::utils::time::VkTimeDuration;
use vkbase::{InputController, FrameAction};
use vkbase::{vkuint, vkbytes, Point3F, Vec4F};
use vkbase::{VkResult, VkError};

use vksamples::VkExampleBackendRes;
use crate::data::{ClothGrid, Particle, UboCompute, UboScene};
use crate::data::{GRID_SIZE, CLOTH_SIZE, CLOTH_HEIGHT, SPHERE_RADIUS, COMPUTE_ITERATIONS};

pub struct VulkanExample {

    backend: VkExampleBackendRes,
    view: OrbitView,

    sphere: MeshBuffer,
    scene_ubo: VmaBuffer,

    cloth: ClothStaff,
    compute: ComputeStaff,
    pipelines: PipelineStaff,
    descriptors: DescriptorStaff,

    timer: f32,
    is_simulating: bool,
    is_wind: bool,
    is_cmd_dirty: bool,
}

struct ClothStaff {
    grid: ClothGrid,
    /// the input of the first iteration and the output of the last one, drawn as vertex buffer.
    particles: VmaBuffer,
    /// the intermediate buffer of each iteration pair.
    particles_swap: VmaBuffer,
    indices: VmaBuffer,
    index_count: vkuint,
}

struct ComputeStaff {

    queue: VkQueue,
    /// the particle buffer changes queue family twice per frame if this is false.
    is_shared_family: bool,

    command_pool: vk::CommandPool,
    command: vk::CommandBuffer,

    ubo_buffer: VmaBuffer,
    ubo_data: UboCompute,

    pipeline: vk::Pipeline,
    pipeline_layout: vk::PipelineLayout,

    descriptor_pool: vk::DescriptorPool,
    set_layout: vk::DescriptorSetLayout,
    /// sets[0] reads `particles` and writes `particles_swap`, sets[1] the other way around.
    sets: [vk::DescriptorSet; 2],

    /// compute waits for the graphics work reading the particles of last frame.
    graphics_complete: vk::Semaphore,
    compute_complete: vk::Semaphore,
    fence: vk::Fence,
}

struct PipelineStaff {
    cloth: vk::Pipeline,
    sphere: vk::Pipeline,
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

        let sphere_mesh = vkbase::mesh::uv_sphere(SPHERE_RADIUS * 0.97, 48, 32)
            .colored([0.55, 0.6, 0.7]);
        let sphere = MeshBuffer::upload(device, backend.command_pool, device.logic.queues.graphics.handle, &sphere_mesh)?;

        let view = OrbitView::new(Point3F::new(0.0, 0.0, 0.0), 9.0, 30.0, 40.0);
        let scene_ubo = vkbase::ci::vma::host_buffer_with_data(device, vk::BufferUsageFlags::UNIFORM_BUFFER, &[scene_uniforms(&view, backend.dimension)])?;

        let cloth = prepare_cloth(device, &backend)?;
        let compute = prepare_compute(device, &cloth)?;

        let descriptors = setup_descriptor(device, &scene_ubo)?;
        let pipelines = prepare_pipelines(device, backend.render_pass, descriptors.layout)?;

        let target = VulkanExample {
            backend, view, sphere, scene_ubo,
            cloth, compute, pipelines, descriptors,
            timer: 0.0,
            is_simulating: true,
            is_wind: false,
            is_cmd_dirty: true,
        };
        Ok(target)
    }
}

impl vkbase::RenderWorkflow for VulkanExample {

    fn init(&mut self, device: &VkDevice) -> VkResult<()> {

        self.record_compute_command(device)?;
        self.record_commands(device)?;

        // the first compute submission waits on this semaphore too.
        let submit_ci = SubmitCI::new()
            .add_signal(self.compute.graphics_complete);
        device.submit(submit_ci, device.logic.queues.graphics.handle, vk::Fence::null())
    }

    fn render_frame(&mut self, device: &VkDevice, device_available: vk::Fence, image_available: vk::Semaphore, image_index: usize, delta_time: f32) -> VkResult<vk::Semaphore> {

        if self.is_cmd_dirty {
            device.wait_idle()?;
            self.record_commands(device)?;
        }

        self.timer += delta_time;
        self.update_uniforms(device, delta_time)?;

        // simulation. ---------------------------------------------------------------------
        let compute_ci = SubmitCI::new()
            .add_wait(vk::PipelineStageFlags::COMPUTE_SHADER, self.compute.graphics_complete)
            .add_command(self.compute.command)
            .add_signal(self.compute.compute_complete);
        device.submit(compute_ci, self.compute.queue.handle, self.compute.fence)?;
        // ---------------------------------------------------------------------------------

        // rendering. ----------------------------------------------------------------------
        let graphics_ci = SubmitCI::new()
            .add_wait(vk::PipelineStageFlags::VERTEX_INPUT, self.compute.compute_complete)
            .add_wait(vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT, image_available)
            .add_command(self.backend.commands[image_index])
            .add_signal(self.compute.graphics_complete)
            .add_signal(self.backend.await_rendering);
        device.submit(graphics_ci, device.logic.queues.graphics.handle, device_available)?;
        // ---------------------------------------------------------------------------------

        Ok(self.backend.await_rendering)
    }

    fn swapchain_reload(&mut self, device: &VkDevice, new_chain: &VkSwapchain) -> VkResult<()> {

        self.backend.swapchain_reload(device, new_chain)?;
        self.is_cmd_dirty = true;
        Ok(())
    }

    fn receive_input(&mut self, inputer: &InputController, delta_time: f32) -> FrameAction {

        if inputer.is_key_just_pressed(VirtualKeyCode::Space) {
            self.is_simulating = !self.is_simulating;
            log::info!("Cloth simulation: {}.", if self.is_simulating { "running" } else { "paused" });
        }
        if inputer.is_key_just_pressed(VirtualKeyCode::W) {
            self.is_wind = !self.is_wind;
            log::info!("Wind: {}.", self.is_wind);
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
            self.view.pitch = (self.view.pitch - rotate).max(-30.0);
        }

        FrameAction::Rendering
    }

    fn deinit(&mut self, device: &VkDevice) -> VkResult<()> {

        device.discard(self.descriptors.layout);
        device.discard(self.descriptors.pool);

        device.discard(self.pipelines.cloth);
        device.discard(self.pipelines.sphere);
        device.discard(self.pipelines.layout);

        self.compute.discard_by(device)?;

        device.vma_discard(&mut self.cloth.particles)?;
        device.vma_discard(&mut self.cloth.particles_swap)?;
        device.vma_discard(&mut self.cloth.indices)?;

        device.vma_discard(&mut self.scene_ubo)?;
        self.sphere.discard_by(device)?;

        self.backend.discard_by(device)
    }
}

impl VulkanExample {

    /// The simulation work does not change between frames, so it is recorded once.
    fn record_compute_command(&self, device: &VkDevice) -> VkResult<()> {

        let graphics_family = device.logic.queues.graphics.family_index;
        let compute_family  = self.compute.queue.family_index;

        let particles = self.cloth.particles.handle;
        let particles_size = self.cloth.particles.size;
        let swap_size = self.cloth.particles_swap.size;
        let [group_x, group_y] = self.cloth.grid.workgroup_count();

        let recorder: VkCmdRecorder<ICompute> = VkCmdRecorder::new(device, self.compute.command);
        recorder.begin_record()?;

        if self.compute.is_shared_family {
            let barrier = BufferBarrierCI::new(particles, particles_size)
                .access_mask(vk::AccessFlags::VERTEX_ATTRIBUTE_READ, vk::AccessFlags::SHADER_WRITE);
            recorder.buffer_pipeline_barrier(vk::PipelineStageFlags::VERTEX_INPUT, vk::PipelineStageFlags::COMPUTE_SHADER, vk::DependencyFlags::empty(), &[barrier.value()]);
        } else {
            // acquire the particles released by the graphics queue.
            let barrier = BufferBarrierCI::new(particles, particles_size)
                .access_mask(vk::AccessFlags::empty(), vk::AccessFlags::SHADER_WRITE)
                .queue_family_index(graphics_family, compute_family);
            recorder.buffer_pipeline_barrier(vk::PipelineStageFlags::TOP_OF_PIPE, vk::PipelineStageFlags::COMPUTE_SHADER, vk::DependencyFlags::empty(), &[barrier.value()]);
        }

        recorder
            .bind_pipeline(self.compute.pipeline);

        for iteration in 0..COMPUTE_ITERATIONS {

            let read_set = (iteration % 2) as usize;
            let calculate_normals: vkuint = if iteration == COMPUTE_ITERATIONS - 1 { 1 } else { 0 };
            let (written, written_size) = if read_set == 0 {
                (self.cloth.particles_swap.handle, swap_size)
            } else {
                (particles, particles_size)
            };

            let barrier = BufferBarrierCI::new(written, written_size)
                .access_mask(vk::AccessFlags::SHADER_WRITE, vk::AccessFlags::SHADER_READ);

            recorder
                .push_constants(self.compute.pipeline_layout, vk::ShaderStageFlags::COMPUTE, 0, &calculate_normals)
                .bind_descriptor_sets(self.compute.pipeline_layout, 0, &[self.compute.sets[read_set]], &[])
                .dispatch(group_x, group_y, 1);

            if iteration != COMPUTE_ITERATIONS - 1 {
                recorder.buffer_pipeline_barrier(vk::PipelineStageFlags::COMPUTE_SHADER, vk::PipelineStageFlags::COMPUTE_SHADER, vk::DependencyFlags::empty(), &[barrier.value()]);
            }
        }

        if !self.compute.is_shared_family {
            // release the result to the graphics queue.
            let barrier = BufferBarrierCI::new(particles, particles_size)
                .access_mask(vk::AccessFlags::SHADER_WRITE, vk::AccessFlags::empty())
                .queue_family_index(compute_family, graphics_family);
            recorder.buffer_pipeline_barrier(vk::PipelineStageFlags::COMPUTE_SHADER, vk::PipelineStageFlags::BOTTOM_OF_PIPE, vk::DependencyFlags::empty(), &[barrier.value()]);
        }

        recorder.end_record()
    }

    fn record_commands(&mut self, device: &VkDevice) -> VkResult<()> {

        let graphics_family = device.logic.queues.graphics.family_index;
        let compute_family  = self.compute.queue.family_index;

        let particles = self.cloth.particles.handle;
        let particles_size = self.cloth.particles.size;

        let (acquire, acquire_stage) = if self.compute.is_shared_family {
            let barrier = BufferBarrierCI::new(particles, particles_size)
                .access_mask(vk::AccessFlags::SHADER_WRITE, vk::AccessFlags::VERTEX_ATTRIBUTE_READ);
            (barrier, vk::PipelineStageFlags::COMPUTE_SHADER)
        } else {
            let barrier = BufferBarrierCI::new(particles, particles_size)
                .access_mask(vk::AccessFlags::empty(), vk::AccessFlags::VERTEX_ATTRIBUTE_READ)
                .queue_family_index(compute_family, graphics_family);
            (barrier, vk::PipelineStageFlags::TOP_OF_PIPE)
        };

        let release = BufferBarrierCI::new(particles, particles_size)
            .access_mask(vk::AccessFlags::VERTEX_ATTRIBUTE_READ, vk::AccessFlags::empty())
            .queue_family_index(graphics_family, compute_family);

        for (i, &command) in self.backend.commands.iter().enumerate() {

            let recorder: VkCmdRecorder<IGraphics> = VkCmdRecorder::new(device, command);
            recorder.begin_record()?;

            recorder.pipeline_barrier(acquire_stage, vk::PipelineStageFlags::VERTEX_INPUT, vk::DependencyFlags::empty(), &[], &[acquire.value()], &[]);

            let render_pass_bi = RenderPassBI::new(self.backend.render_pass, self.backend.framebuffers[i])
                .render_extent(self.backend.dimension)
                .set_clear_values(vksamples::DEFAULT_CLEAR_VALUES.to_vec());

            recorder
                .begin_render_pass(render_pass_bi)
                .set_viewport(0, &[self.backend.viewport()])
                .set_scissor(0, &[self.backend.scissor()])
                .bind_descriptor_sets(self.pipelines.layout, 0, &[self.descriptors.set], &[]);

            // sphere collider.
            recorder.bind_pipeline(self.pipelines.sphere);
            self.sphere.draw(&recorder, 1);

            // cloth, read from the particle buffer directly.
            recorder
                .bind_pipeline(self.pipelines.cloth)
                .bind_vertex_buffers(0, &[particles], &[0 as vkbytes])
                .bind_index_buffer(self.cloth.indices.handle, vk::IndexType::UINT32, 0)
                .draw_indexed(self.cloth.index_count, 1, 0, 0, 0)
                .end_render_pass();

            if !self.compute.is_shared_family {
                recorder.pipeline_barrier(vk::PipelineStageFlags::VERTEX_INPUT, vk::PipelineStageFlags::BOTTOM_OF_PIPE, vk::DependencyFlags::empty(), &[], &[release.value()], &[]);
            }

            recorder.end_record()?;
        }

        self.is_cmd_dirty = false;
        Ok(())
    }

    fn update_uniforms(&mut self, device: &VkDevice, delta_time: f32) -> VkResult<()> {

        let scene = scene_uniforms(&self.view, self.backend.dimension);
        self.scene_ubo.write(device, &[scene])?;

        let ubo = &mut self.compute.ubo_data;
        ubo.delta_t = if self.is_simulating { crate::data::iteration_delta(delta_time) } else { 0.0 };
        ubo.external_force = Vec4F::new(0.0, -9.8, 0.0, 0.0);
        if self.is_wind {
            ubo.external_force += crate::data::wind_force(self.timer);
        }

        // the uniform buffer may still be read by the simulation of last frame.
        device.wait(self.compute.fence, VkTimeDuration::Infinite)?;
        unsafe {
            device.logic.handle.reset_fences(&[self.compute.fence])
                .map_err(|_| VkError::device("Reset Fence"))?;
        }

        let ubo_data = self.compute.ubo_data;
        self.compute.ubo_buffer.write(device, &[ubo_data])
    }
}

impl ComputeStaff {

    fn discard_by(&mut self, device: &VkDevice) -> VkResult<()> {

        device.discard(self.fence);
        device.discard(self.compute_complete);
        device.discard(self.graphics_complete);

        device.discard(self.set_layout);
        device.discard(self.descriptor_pool);

        device.discard(self.pipeline);
        device.discard(self.pipeline_layout);

        device.discard(self.command_pool);
        device.vma_discard(&mut self.ubo_buffer)
    }
}

fn scene_uniforms(view: &OrbitView, dimension: vk::Extent2D) -> UboScene {

    UboScene {
        projection: perspective_vk(60.0_f32.to_radians(), vksamples::aspect_ratio(dimension), 0.1, 256.0),
        view: view.view_matrix(),
        light_pos: Vec4F::new(2.0, 6.0, 3.0, 1.0),
    }
}

fn prepare_cloth(device: &VkDevice, backend: &VkExampleBackendRes) -> VkResult<ClothStaff> {

    let grid = ClothGrid::new(GRID_SIZE, CLOTH_SIZE);
    let particle_data = grid.particles(CLOTH_HEIGHT, false);
    let index_data = grid.strip_indices();

    let queue = device.logic.queues.graphics.handle;
    let usage = vk::BufferUsageFlags::STORAGE_BUFFER | vk::BufferUsageFlags::VERTEX_BUFFER;

    // both buffers start from the same state, the first iteration overwrites the swap buffer anyway.
    let particles      = vkbase::ci::vma::device_buffer_with_data(device, backend.command_pool, queue, usage, &particle_data)?;
    let particles_swap = vkbase::ci::vma::device_buffer_with_data(device, backend.command_pool, queue, usage, &particle_data)?;
    let indices        = vkbase::ci::vma::device_buffer_with_data(device, backend.command_pool, queue, vk::BufferUsageFlags::INDEX_BUFFER, &index_data)?;

    log::debug!("Cloth of {} particles, {} strip indices.", grid.particle_count(), index_data.len());

    let cloth = ClothStaff { grid, particles, particles_swap, indices, index_count: index_data.len() as _ };
    Ok(cloth)
}

fn prepare_compute(device: &VkDevice, cloth: &ClothStaff) -> VkResult<ComputeStaff> {

    use vkbase::ci::descriptor::{DescriptorPoolCI, DescriptorSetLayoutCI, DescriptorSetAI};
    use vkbase::ci::descriptor::{DescriptorBufferSetWI, DescriptorSetsUpdateCI};

    debug_assert_eq!(COMPUTE_ITERATIONS % 2, 0, "The last iteration must write the particle buffer used as vertex buffer.");

    let queue = device.logic.queues.compute;
    let graphics = device.logic.queues.graphics;
    let is_shared_family = queue.is_same_family(&graphics);
    log::info!("Simulating on queue family {} ({}).", queue.family_index,
        if is_shared_family { "shared with graphics" } else { "dedicated" });

    let command_pool = CommandPoolCI::new(queue.family_index)
        .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER)
        .build(device)?;
    let command = CommandBufferAI::new(command_pool, 1)
        .build(device)?
        .into_iter().next()
        .ok_or(VkError::create("Command Buffers"))?;

    if !is_shared_family {
        hand_particles_to_compute(device, cloth, command_pool, &graphics, &queue)?;
    }

    let ubo_data = UboCompute::new(&cloth.grid, SPHERE_RADIUS);
    let ubo_buffer = vkbase::ci::vma::host_buffer_with_data(device, vk::BufferUsageFlags::UNIFORM_BUFFER, &[ubo_data])?;

    // descriptors. ---------------------------------------------------------------------------
    let descriptor_pool = DescriptorPoolCI::new(2)
        .add_descriptor(vk::DescriptorType::STORAGE_BUFFER, 4)
        .add_descriptor(vk::DescriptorType::UNIFORM_BUFFER, 2)
        .build(device)?;

    // binding 0: particles to read.
    // binding 1: particles to write.
    // binding 2: simulation parameters.
    let set_layout = DescriptorSetLayoutCI::new()
        .add_descriptor(vk::DescriptorType::STORAGE_BUFFER, vk::ShaderStageFlags::COMPUTE)
        .add_descriptor(vk::DescriptorType::STORAGE_BUFFER, vk::ShaderStageFlags::COMPUTE)
        .add_descriptor(vk::DescriptorType::UNIFORM_BUFFER, vk::ShaderStageFlags::COMPUTE)
        .build(device)?;

    let sets = DescriptorSetAI::new(descriptor_pool)
        .add_set_layout(set_layout)
        .add_set_layout(set_layout)
        .build(device)?;
    let sets = [sets[0], sets[1]];

    let whole = |buffer: &VmaBuffer| vk::DescriptorBufferInfo {
        buffer: buffer.handle,
        offset: 0,
        range : vk::WHOLE_SIZE,
    };

    let mut update_ci = DescriptorSetsUpdateCI::new();
    let mut writes = Vec::with_capacity(6);
    for (&set, (input, output)) in sets.iter().zip([(&cloth.particles, &cloth.particles_swap), (&cloth.particles_swap, &cloth.particles)].iter()) {

        writes.push(DescriptorBufferSetWI::new(set, 0, vk::DescriptorType::STORAGE_BUFFER).add_buffer(whole(input)));
        writes.push(DescriptorBufferSetWI::new(set, 1, vk::DescriptorType::STORAGE_BUFFER).add_buffer(whole(output)));
        writes.push(DescriptorBufferSetWI::new(set, 2, vk::DescriptorType::UNIFORM_BUFFER).add_buffer(whole(&ubo_buffer)));
    }
    for write in writes.iter() {
        update_ci = update_ci.add_write(write);
    }
    update_ci.update(device);
    // -----------------------------------------------------------------------------------------

    // pipeline. -------------------------------------------------------------------------------
    let pipeline_layout = PipelineLayoutCI::new()
        .add_set_layout(set_layout)
        .add_push_constants(vk::ShaderStageFlags::COMPUTE, std::mem::size_of::<vkuint>() as _)
        .build(device)?;

    let mut compiler = VkShaderCompiler::new()?;
    let shader = vksamples::build_shader(device, &mut compiler, vk::ShaderStageFlags::COMPUTE, include_str!("cloth.comp.glsl"), "cloth.comp")?;

    let pipeline = ComputePipelineCI::new(ShaderStageCI::new(vk::ShaderStageFlags::COMPUTE, shader), pipeline_layout)
        .build(device);
    device.discard(shader);
    let pipeline = pipeline?;
    // -----------------------------------------------------------------------------------------

    let graphics_complete = device.build(&SemaphoreCI::new())?;
    let compute_complete  = device.build(&SemaphoreCI::new())?;
    let fence = device.build(&FenceCI::new(true))?;

    let result = ComputeStaff {
        queue, is_shared_family,
        command_pool, command,
        ubo_buffer, ubo_data,
        pipeline, pipeline_layout,
        descriptor_pool, set_layout, sets,
        graphics_complete, compute_complete, fence,
    };
    Ok(result)
}

/// Move both particle buffers, uploaded by the graphics queue, to the compute queue family.
///
/// The swap buffer is acquired here. The other one is acquired at the beginning of every simulation command.
fn hand_particles_to_compute(device: &VkDevice, cloth: &ClothStaff, compute_pool: vk::CommandPool, graphics: &VkQueue, compute: &VkQueue) -> VkResult<()> {

    let release = |buffer: &VmaBuffer| {
        BufferBarrierCI::new(buffer.handle, buffer.size)
            .access_mask(vk::AccessFlags::TRANSFER_WRITE, vk::AccessFlags::empty())
            .queue_family_index(graphics.family_index, compute.family_index)
            .value()
    };
    let releases = [release(&cloth.particles), release(&cloth.particles_swap)];

    let graphics_pool = CommandPoolCI::new(graphics.family_index)
        .flags(vk::CommandPoolCreateFlags::TRANSIENT)
        .build(device)?;
    let release_result = vkbase::command::record_once(device, graphics_pool, graphics.handle, |recorder| {
        recorder.pipeline_barrier(vk::PipelineStageFlags::TRANSFER, vk::PipelineStageFlags::BOTTOM_OF_PIPE, vk::DependencyFlags::empty(), &[], &releases, &[]);
        Ok(())
    });
    device.discard(graphics_pool);
    release_result?;

    let acquire = BufferBarrierCI::new(cloth.particles_swap.handle, cloth.particles_swap.size)
        .access_mask(vk::AccessFlags::empty(), vk::AccessFlags::SHADER_READ | vk::AccessFlags::SHADER_WRITE)
        .queue_family_index(graphics.family_index, compute.family_index)
        .value();

    vkbase::command::record_once(device, compute_pool, compute.handle, |recorder| {
        recorder.pipeline_barrier(vk::PipelineStageFlags::TOP_OF_PIPE, vk::PipelineStageFlags::COMPUTE_SHADER, vk::DependencyFlags::empty(), &[], &[acquire], &[]);
        Ok(())
    })
}

fn setup_descriptor(device: &VkDevice, scene_ubo: &VmaBuffer) -> VkResult<DescriptorStaff> {

    use vkbase::ci::descriptor::{DescriptorPoolCI, DescriptorSetLayoutCI, DescriptorSetAI};
    use vkbase::ci::descriptor::{DescriptorBufferSetWI, DescriptorSetsUpdateCI};

    let pool = DescriptorPoolCI::new(1)
        .add_descriptor(vk::DescriptorType::UNIFORM_BUFFER, 1)
        .build(device)?;

    let layout = DescriptorSetLayoutCI::new()
        .add_descriptor(vk::DescriptorType::UNIFORM_BUFFER, vk::ShaderStageFlags::VERTEX)
        .build(device)?;

    let mut sets = DescriptorSetAI::new(pool)
        .add_set_layout(layout)
        .build(device)?;
    let set = sets.remove(0);

    let ubo_write = DescriptorBufferSetWI::new(set, 0, vk::DescriptorType::UNIFORM_BUFFER)
        .add_buffer(vk::DescriptorBufferInfo {
            buffer: scene_ubo.handle,
            offset: 0,
            range : vk::WHOLE_SIZE,
        });

    DescriptorSetsUpdateCI::new()
        .add_write(&ubo_write)
        .update(device);

    let result = DescriptorStaff { pool, set, layout };
    Ok(result)
}

fn prepare_pipelines(device: &VkDevice, render_pass: vk::RenderPass, set_layout: vk::DescriptorSetLayout) -> VkResult<PipelineStaff> {

    let layout = PipelineLayoutCI::new()
        .add_set_layout(set_layout)
        .build(device)?;

    let mut compiler = VkShaderCompiler::new()?;
    let cloth_vert  = vksamples::build_shader(device, &mut compiler, vk::ShaderStageFlags::VERTEX, include_str!("cloth.vert.glsl"), "cloth.vert")?;
    let cloth_frag  = vksamples::build_shader(device, &mut compiler, vk::ShaderStageFlags::FRAGMENT, include_str!("cloth.frag.glsl"), "cloth.frag")?;
    let sphere_vert = vksamples::build_shader(device, &mut compiler, vk::ShaderStageFlags::VERTEX, include_str!("sphere.vert.glsl"), "sphere.vert")?;
    let sphere_frag = vksamples::build_shader(device, &mut compiler, vk::ShaderStageFlags::FRAGMENT, include_str!("sphere.frag.glsl"), "sphere.frag")?;

    let depth_state = DepthStencilSCI::new()
        .depth_test(true, true, vk::CompareOp::LESS_OR_EQUAL);

    // cloth pipeline, one strip per particle row.
    let mut pipeline_ci = GraphicsPipelineCI::new(render_pass, layout);
    pipeline_ci.set_vertex_input(Particle::input_description(0));
    pipeline_ci.set_input_assembly(InputAssemblySCI::new()
        .topology(vk::PrimitiveTopology::TRIANGLE_STRIP)
        .primitive_restart(true));
    pipeline_ci.set_rasterization(RasterizationSCI::new()
        .cull_face(vk::CullModeFlags::NONE, vk::FrontFace::COUNTER_CLOCKWISE));
    pipeline_ci.set_depth_stencil(depth_state.clone());
    pipeline_ci.set_shaders(vec![
        ShaderStageCI::new(vk::ShaderStageFlags::VERTEX, cloth_vert),
        ShaderStageCI::new(vk::ShaderStageFlags::FRAGMENT, cloth_frag),
    ]);
    let cloth = pipeline_ci.build(device)?;

    // sphere pipeline.
    let mut pipeline_ci = GraphicsPipelineCI::new(render_pass, layout);
    pipeline_ci.set_vertex_input(MeshVertex::input_description(0));
    pipeline_ci.set_rasterization(RasterizationSCI::new()
        .cull_face(vk::CullModeFlags::BACK, vk::FrontFace::COUNTER_CLOCKWISE));
    pipeline_ci.set_depth_stencil(depth_state);
    pipeline_ci.set_shaders(vec![
        ShaderStageCI::new(vk::ShaderStageFlags::VERTEX, sphere_vert),
        ShaderStageCI::new(vk::ShaderStageFlags::FRAGMENT, sphere_frag),
    ]);
    let sphere = pipeline_ci.build(device)?;

    device.discard(cloth_vert);
    device.discard(cloth_frag);
    device.discard(sphere_vert);
    device.discard(sphere_frag);

    let result = PipelineStaff { cloth, sphere, layout };
    Ok(result)
}
