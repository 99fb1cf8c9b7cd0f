
use ash::vk;
use winit::event::VirtualKeyCode;

use vkbase::context::{VulkanContext, VkDevice, VkSwapchain, VkQueue};
use vkbase::ci::VkObjectBuildableCI;
use vkbase::ci::vma::VmaBuffer;
use vkbase::ci::image::{ImageCI, ImageViewCI, ImageBarrierCI, SamplerCI};
use vkbase::ci::memory::MemoryAI;
use vkbase::ci::sync::FenceCI;
use vkbase::ci::pipeline::*;
use vkbase::ci::shader::ShaderStageCI;
use vkbase::command::{VkCmdRecorder, IGraphics, ITransfer, CmdGraphicsApi, CmdTransferApi};
use vkbase::math::{perspective_vk, OrbitView};
use vkbase::mesh::{MeshVertex, MeshBuffer};
use vkbase::utils::shaderc::VkShaderCompiler;
use vkbase::utils::time::VkTimeDuration;
use vkbase::{InputController, FrameAction};
use vkbase::{vkuint, vkbytes, Mat4F, Point3F};
use vkbase::{VkResult, VkError};

use vksamples::VkExampleBackendRes;
use crate::data::{UboVS, VirtualTexture, SparsePageLayout, MipTailInfo, PagePool, SparseBindBatch};
use crate::data::{TEXTURE_DIM, TEXTURE_FORMAT};

pub struct VulkanExample {

    backend: VkExampleBackendRes,
    view: OrbitView,

    plane: MeshBuffer,
    ubo_buffer: VmaBuffer,
    lod_bias: f32,

    texture: SparseTexture,
    pipelines: PipelineStaff,
    descriptors: DescriptorStaff,

    is_cmd_dirty: bool,
}

/// The sparse image with its residency state and the memory backing resident pages.
struct SparseTexture {

    image: vk::Image,
    view: vk::ImageView,
    sampler: vk::Sampler,

    extent: vk::Extent3D,
    mip_levels: vkuint,

    virtual_texture: VirtualTexture,
    page_pool: PagePool,
    memory_type_index: vkuint,
    /// alignment required by each memory bind.
    page_alignment: vkbytes,

    sparse_queue: VkQueue,
    bind_fence: vk::Fence,

    pending: Option<ResidencyRequest>,
}

struct PipelineStaff {
    pipeline: vk::Pipeline,
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

        // a plane facing upward, spanning the whole view.
        let plane_mesh = vkbase::mesh::plane(40.0);
        let plane = MeshBuffer::upload(device, backend.command_pool, device.logic.queues.graphics.handle, &plane_mesh)?;

        let ubo_buffer = vkbase::ci::vma::host_buffer_with_data(device, vk::BufferUsageFlags::UNIFORM_BUFFER,
            &[UboVS::new(Mat4F::identity(), Mat4F::identity(), [0.0; 4], 0.0)])?;

        let texture = SparseTexture::new(device, backend.command_pool)?;
        let descriptors = setup_descriptor(device, &ubo_buffer, &texture)?;
        let pipelines = prepare_pipelines(device, backend.render_pass, descriptors.layout)?;

        let view = OrbitView::new(Point3F::origin(), 28.0, 60.0, 0.0)
            .with_rotate_speed(4.0);

        let target = VulkanExample {
            backend, view, plane, ubo_buffer, texture, pipelines, descriptors,
            lod_bias: 0.0,
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
        self.is_cmd_dirty = true;
        Ok(())
    }

    fn receive_input(&mut self, inputer: &InputController, _delta_time: f32) -> FrameAction {

        // residency changes need the device, they are applied at the start of next frame.
        if inputer.is_key_just_pressed(VirtualKeyCode::R) {
            self.texture.pending = Some(ResidencyRequest::FillRandomPages);
        } else if inputer.is_key_just_pressed(VirtualKeyCode::T) {
            self.texture.pending = Some(ResidencyRequest::FillMipTail);
        } else if inputer.is_key_just_pressed(VirtualKeyCode::F) {
            self.texture.pending = Some(ResidencyRequest::FlushRandomPages);
        }

        let max_lod = (self.texture.mip_levels - 1) as f32;
        if inputer.is_key_just_pressed(VirtualKeyCode::Plus) || inputer.is_key_just_pressed(VirtualKeyCode::NumpadAdd) || inputer.is_key_just_pressed(VirtualKeyCode::Equals) {
            self.lod_bias = (self.lod_bias + 1.0).min(max_lod);
            log::info!("LOD bias: {}.", self.lod_bias);
        }
        if inputer.is_key_just_pressed(VirtualKeyCode::Minus) || inputer.is_key_just_pressed(VirtualKeyCode::NumpadSubtract) {
            self.lod_bias = (self.lod_bias - 1.0).max(0.0);
            log::info!("LOD bias: {}.", self.lod_bias);
        }

        FrameAction::Rendering
    }

    fn deinit(&mut self, device: &VkDevice) -> VkResult<()> {

        device.discard(self.descriptors.layout);
        device.discard(self.descriptors.pool);

        device.discard(self.pipelines.pipeline);
        device.discard(self.pipelines.layout);

        self.texture.discard_by(device);

        device.vma_discard(&mut self.ubo_buffer)?;
        self.plane.discard_by(device)?;

        self.backend.discard_by(device)
    }
}

impl VulkanExample {

    fn record_commands(&mut self, device: &VkDevice) -> VkResult<()> {

        for (i, &command) in self.backend.commands.iter().enumerate() {

            let recorder: VkCmdRecorder<IGraphics> = VkCmdRecorder::new(device, command);

            let render_pass_bi = RenderPassBI::new(self.backend.render_pass, self.backend.framebuffers[i])
                .render_extent(self.backend.dimension)
                .set_clear_values(vksamples::DEFAULT_CLEAR_VALUES.to_vec());

            recorder.begin_record()?
                .begin_render_pass(render_pass_bi)
                .set_viewport(0, &[self.backend.viewport()])
                .set_scissor(0, &[self.backend.scissor()])
                .bind_pipeline(self.pipelines.pipeline)
                .bind_descriptor_sets(self.pipelines.layout, 0, &[self.descriptors.set], &[]);

            self.plane.draw(&recorder, 1);

            recorder
                .end_render_pass()
                .end_record()?;
        }

        self.is_cmd_dirty = false;
        Ok(())
    }

    fn update_uniforms(&mut self, device: &VkDevice) -> VkResult<()> {

        if let Some(request) = self.texture.pending.take() {
            let queue = device.logic.queues.graphics.handle;
            match request {
                | ResidencyRequest::FillRandomPages  => self.texture.fill_random_pages(device, self.backend.command_pool, queue)?,
                | ResidencyRequest::FillMipTail      => self.texture.fill_mip_tail(device, self.backend.command_pool, queue)?,
                | ResidencyRequest::FlushRandomPages => self.texture.flush_random_pages(device)?,
            }
        }

        let aspect = vksamples::aspect_ratio(self.backend.dimension);
        let projection = perspective_vk(60.0_f32.to_radians(), aspect, 0.1, 256.0);
        let position = self.view.position();

        let ubo_data = UboVS::new(
            projection * self.view.view_matrix(),
            Mat4F::identity(),
            [position.x, position.y, position.z, 1.0],
            self.lod_bias);

        self.ubo_buffer.write(device, &[ubo_data])
    }
}

#[derive(Debug, Clone, Copy)]
enum ResidencyRequest {
    FillRandomPages,
    FillMipTail,
    FlushRandomPages,
}

impl SparseTexture {

    fn new(device: &VkDevice, pool: vk::CommandPool) -> VkResult<SparseTexture> {

        let sparse_queue = device.logic.queues.sparse;
        if sparse_queue.handle == vk::Queue::null() {
            return Err(VkError::unsupported("Queue with sparse binding support"))
        }

        let dimension = TEXTURE_DIM.min(device.phy.limits.max_image_dimension2_d);
        let extent = vk::Extent3D { width: dimension, height: dimension, depth: 1 };
        let mip_levels = vkbase::ci::image::full_mip_levels(dimension, dimension);

        let usage = vk::ImageUsageFlags::SAMPLED | vk::ImageUsageFlags::TRANSFER_DST;
        check_sparse_format_support(device, usage)?;

        let graphics_family = device.logic.queues.graphics.family_index;
        let sharing = if sparse_queue.family_index == graphics_family {
            (vk::SharingMode::EXCLUSIVE, Vec::new())
        } else {
            (vk::SharingMode::CONCURRENT, vec![graphics_family, sparse_queue.family_index])
        };

        let image_ci = ImageCI::new(vk::ImageType::TYPE_2D, TEXTURE_FORMAT, extent)
            .flags(vk::ImageCreateFlags::SPARSE_BINDING | vk::ImageCreateFlags::SPARSE_RESIDENCY)
            .usages(usage)
            .mip_levels(mip_levels)
            .sharing_queues(sharing.0, sharing.1);
        let (image, memory_requirements) = device.build(&image_ci)?;

        if memory_requirements.size > device.phy.properties.limits.sparse_address_space_size {
            device.discard(image);
            return Err(VkError::unsupported("Sparse address space for the requested texture size"))
        }

        let sparse_requirements = unsafe {
            device.logic.handle.get_image_sparse_memory_requirements(image)
        };
        let color_requirements = sparse_requirements.iter()
            .find(|r| r.format_properties.aspect_mask.contains(vk::ImageAspectFlags::COLOR))
            .ok_or(VkError::unsupported("Sparse memory requirements for color aspect"))?;

        let granularity = color_requirements.format_properties.image_granularity;
        let mip_tail = MipTailInfo::from_requirements(color_requirements);
        let layout = SparsePageLayout::compute(extent, 1, granularity, mip_tail.first_lod.min(mip_levels));

        log::info!("Sparse image: {}x{} with {} mip levels, page granularity {}x{}, mip tail starts at level {}.",
            dimension, dimension, mip_levels, granularity.width, granularity.height, mip_tail.first_lod);
        log::info!("Virtual texture has {} pages of {} bytes.", layout.page_count(), memory_requirements.alignment);

        let memory_type_index = vkbase::utils::memory::get_memory_type_index(device, memory_requirements.memory_type_bits, vk::MemoryPropertyFlags::DEVICE_LOCAL)?;

        let view = ImageViewCI::new(image, vk::ImageViewType::TYPE_2D, TEXTURE_FORMAT)
            .aspect_mask(vk::ImageAspectFlags::COLOR)
            .mip_level(0, mip_levels)
            .build(device)?;

        let sampler = SamplerCI::new()
            .filter(vk::Filter::LINEAR, vk::Filter::LINEAR)
            .mipmap(vk::SamplerMipmapMode::LINEAR, vk::SamplerAddressMode::REPEAT, vk::SamplerAddressMode::REPEAT, vk::SamplerAddressMode::REPEAT)
            .lod(0.0, 0.0, mip_levels as f32)
            .anisotropy(None)
            .build(device)?;

        let bind_fence = device.build(&FenceCI::new(false))?;

        let texture = SparseTexture {
            image, view, sampler, extent, mip_levels,
            virtual_texture: VirtualTexture::new(layout, mip_tail),
            page_pool: PagePool::new(memory_requirements.alignment),
            page_alignment: memory_requirements.alignment,
            memory_type_index, sparse_queue, bind_fence,
            pending: None,
        };

        // the image stays in shader read layout except while pages are uploaded.
        vkbase::command::record_once(device, pool, device.logic.queues.graphics.handle, |recorder| {
            texture.transition(recorder, vk::ImageLayout::UNDEFINED, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL);
            Ok(())
        })?;

        Ok(texture)
    }

    /// Bind memory to about half of the non-resident pages and fill each of them with a random color.
    fn fill_random_pages(&mut self, device: &VkDevice, pool: vk::CommandPool, queue: vk::Queue) -> VkResult<()> {

        device.wait_idle()?;

        let mut rng = rand::thread_rng();
        let selected = self.virtual_texture.select_pages_to_fill(&mut rng);
        if selected.is_empty() {
            log::info!("Every page is resident already.");
            return Ok(())
        }

        let memory_type_index = self.memory_type_index;
        self.virtual_texture.fill_pages(&selected, &mut self.page_pool, |size| {
            device.build(&MemoryAI::new(size, memory_type_index))
        })?;

        let batch = self.virtual_texture.update_sparse_bind_info();
        queue_bind_sparse(device, &self.sparse_queue, self.image, &batch, self.bind_fence)?;

        // one staging region per page, every page with its own color.
        let mut texels: Vec<[u8; 4]> = Vec::new();
        let mut regions = Vec::with_capacity(selected.len());
        for &index in selected.iter() {

            let page = &self.virtual_texture.pages[index];
            regions.push(page.copy_region((texels.len() * 4) as vkbytes));

            let color = super::data::random_page_color(&mut rng);
            texels.extend(std::iter::repeat(color).take(page.texel_count()));
        }
        self.upload(device, pool, queue, &texels, &regions)?;

        log::info!("Bound {} pages, {} of {} pages are resident, {} pool slots in use.",
            selected.len(), self.virtual_texture.resident_count(), self.virtual_texture.pages.len(), self.page_pool.used_slots());
        Ok(())
    }

    /// Release the memory of about half of the resident pages.
    fn flush_random_pages(&mut self, device: &VkDevice) -> VkResult<()> {

        device.wait_idle()?;

        let mut rng = rand::thread_rng();
        let selected = self.virtual_texture.select_pages_to_flush(&mut rng);

        for index in selected.iter() {
            if let Some(slot) = self.virtual_texture.release_page(*index) {
                self.page_pool.release(slot);
            }
        }

        let batch = self.virtual_texture.update_sparse_bind_info();
        queue_bind_sparse(device, &self.sparse_queue, self.image, &batch, self.bind_fence)?;

        log::info!("Released {} pages, {} pages remain resident.", selected.len(), self.virtual_texture.resident_count());
        Ok(())
    }

    /// Bind the mip tail and fill each of its levels with a gray marker color.
    fn fill_mip_tail(&mut self, device: &VkDevice, pool: vk::CommandPool, queue: vk::Queue) -> VkResult<()> {

        if self.virtual_texture.mip_tail.is_resident() {
            log::info!("Mip tail is resident already.");
            return Ok(())
        }
        if self.virtual_texture.mip_tail.first_lod >= self.mip_levels {
            log::info!("The texture has no mip tail.");
            return Ok(())
        }

        device.wait_idle()?;

        let tail_size = vkbase::utils::memory::bound_to_alignment(self.virtual_texture.mip_tail.size, self.page_alignment);
        let region_count = self.virtual_texture.mip_tail.region_count(1);
        let mut tail_memory = Vec::with_capacity(region_count);
        for _ in 0..region_count {
            match device.build(&MemoryAI::new(tail_size, self.memory_type_index)) {
                | Ok(memory) => tail_memory.push(memory),
                | Err(e) => {
                    device.discard(&tail_memory);
                    return Err(e)
                },
            }
        }
        self.virtual_texture.bind_mip_tail(tail_memory);

        let batch = self.virtual_texture.update_sparse_bind_info();
        queue_bind_sparse(device, &self.sparse_queue, self.image, &batch, self.bind_fence)?;

        let mut texels: Vec<[u8; 4]> = Vec::new();
        let mut regions = Vec::new();
        for level in self.virtual_texture.mip_tail.first_lod..self.mip_levels {

            let width  = (self.extent.width  >> level).max(1);
            let height = (self.extent.height >> level).max(1);

            regions.push(vk::BufferImageCopy {
                buffer_offset: (texels.len() * 4) as vkbytes,
                buffer_row_length: 0,
                buffer_image_height: 0,
                image_subresource: vk::ImageSubresourceLayers {
                    aspect_mask: vk::ImageAspectFlags::COLOR,
                    mip_level: level,
                    base_array_layer: 0,
                    layer_count: 1,
                },
                image_offset: vk::Offset3D { x: 0, y: 0, z: 0 },
                image_extent: vk::Extent3D { width, height, depth: 1 },
            });

            let color = super::data::mip_tail_color(level - self.virtual_texture.mip_tail.first_lod);
            texels.extend(std::iter::repeat(color).take((width * height) as usize));
        }
        self.upload(device, pool, queue, &texels, &regions)?;

        log::info!("Mip tail bound, {} levels from level {}.", regions.len(), self.virtual_texture.mip_tail.first_lod);
        Ok(())
    }

    fn upload(&self, device: &VkDevice, pool: vk::CommandPool, queue: vk::Queue, texels: &[[u8; 4]], regions: &[vk::BufferImageCopy]) -> VkResult<()> {

        let staging = vkbase::ci::vma::host_buffer_with_data(device, vk::BufferUsageFlags::TRANSFER_SRC, texels)?;

        let copy_result = vkbase::command::record_once(device, pool, queue, |recorder| {

            self.transition(recorder, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL, vk::ImageLayout::TRANSFER_DST_OPTIMAL);
            recorder.copy_buf2img(staging.handle, self.image, vk::ImageLayout::TRANSFER_DST_OPTIMAL, regions);
            self.transition(recorder, vk::ImageLayout::TRANSFER_DST_OPTIMAL, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL);
            Ok(())
        });

        device.vma_discard(staging)?;
        copy_result
    }

    fn transition(&self, recorder: &VkCmdRecorder<ITransfer>, from: vk::ImageLayout, to: vk::ImageLayout) {

        let (src_access, src_stage) = match from {
            | vk::ImageLayout::TRANSFER_DST_OPTIMAL => (vk::AccessFlags::TRANSFER_WRITE, vk::PipelineStageFlags::TRANSFER),
            | vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL => (vk::AccessFlags::SHADER_READ, vk::PipelineStageFlags::FRAGMENT_SHADER),
            | _ => (vk::AccessFlags::empty(), vk::PipelineStageFlags::TOP_OF_PIPE),
        };
        let (dst_access, dst_stage) = match to {
            | vk::ImageLayout::TRANSFER_DST_OPTIMAL => (vk::AccessFlags::TRANSFER_WRITE, vk::PipelineStageFlags::TRANSFER),
            | _ => (vk::AccessFlags::SHADER_READ, vk::PipelineStageFlags::FRAGMENT_SHADER),
        };

        let barrier = ImageBarrierCI::new(self.image, vk::ImageSubresourceRange {
                aspect_mask: vk::ImageAspectFlags::COLOR,
                base_mip_level: 0,
                level_count: self.mip_levels,
                base_array_layer: 0,
                layer_count: 1,
            })
            .access_mask(src_access, dst_access)
            .layout(from, to);

        recorder.image_pipeline_barrier(src_stage, dst_stage, vk::DependencyFlags::empty(), &[barrier.value()]);
    }

    fn discard_by(&mut self, device: &VkDevice) {

        device.discard(self.bind_fence);
        device.discard(self.sampler);
        device.discard(self.view);
        device.discard(self.image);

        for memory in self.page_pool.drain_blocks() {
            device.discard(memory);
        }
        for memory in self.virtual_texture.mip_tail.memory.drain(..) {
            device.discard(memory);
        }
    }
}

/// Submit the sparse binds on the sparse queue and wait until they are done.
fn queue_bind_sparse(device: &VkDevice, queue: &VkQueue, image: vk::Image, batch: &SparseBindBatch, fence: vk::Fence) -> VkResult<()> {

    if batch.is_empty() {
        return Ok(())
    }

    let image_bind_info = vk::SparseImageMemoryBindInfo {
        image,
        bind_count: batch.image_binds.len() as _,
        p_binds   : batch.image_binds.as_ptr(),
    };
    let opaque_bind_info = vk::SparseImageOpaqueMemoryBindInfo {
        image,
        bind_count: batch.opaque_binds.len() as _,
        p_binds   : batch.opaque_binds.as_ptr(),
    };

    let (image_bind_count, opaque_bind_count) = (
        if batch.image_binds.is_empty() { 0 } else { 1 },
        if batch.opaque_binds.is_empty() { 0 } else { 1 },
    );

    let bind_sparse_info = vk::BindSparseInfo {
        image_bind_count,
        p_image_binds: &image_bind_info,
        image_opaque_bind_count: opaque_bind_count,
        p_image_opaque_binds: &opaque_bind_info,
        ..Default::default()
    };

    unsafe {
        device.logic.handle.queue_bind_sparse(queue.handle, &[bind_sparse_info], fence)
            .map_err(|_| VkError::device("Queue Bind Sparse"))?;
    }

    device.wait(fence, VkTimeDuration::Infinite)?;
    unsafe {
        device.logic.handle.reset_fences(&[fence])
            .map_err(|_| VkError::device("Reset Fence"))?;
    }

    log::debug!("Submitted {} image binds and {} opaque binds.", batch.image_binds.len(), batch.opaque_binds.len());
    Ok(())
}

fn check_sparse_format_support(device: &VkDevice, usage: vk::ImageUsageFlags) -> VkResult<()> {

    let properties = unsafe {
        device.instance.get_physical_device_sparse_image_format_properties(
            device.phy.handle, TEXTURE_FORMAT, vk::ImageType::TYPE_2D, vk::SampleCountFlags::TYPE_1, usage, vk::ImageTiling::OPTIMAL)
    };

    if properties.is_empty() {
        Err(VkError::unsupported(format!("Sparse residency for {:?}", TEXTURE_FORMAT)))
    } else {
        Ok(())
    }
}

fn setup_descriptor(device: &VkDevice, ubo_buffer: &VmaBuffer, texture: &SparseTexture) -> VkResult<DescriptorStaff> {

    use vkbase::ci::descriptor::{DescriptorPoolCI, DescriptorSetLayoutCI, DescriptorSetAI};
    use vkbase::ci::descriptor::{DescriptorBufferSetWI, DescriptorImageSetWI, DescriptorSetsUpdateCI};

    let pool = DescriptorPoolCI::new(1)
        .add_descriptor(vk::DescriptorType::UNIFORM_BUFFER, 1)
        .add_descriptor(vk::DescriptorType::COMBINED_IMAGE_SAMPLER, 1)
        .build(device)?;

    let layout = DescriptorSetLayoutCI::new()
        .add_descriptor(vk::DescriptorType::UNIFORM_BUFFER, vk::ShaderStageFlags::VERTEX)
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
    let texture_write = DescriptorImageSetWI::new(set, 1, vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
        .add_image(vk::DescriptorImageInfo {
            sampler: texture.sampler,
            image_view: texture.view,
            image_layout: vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
        });

    DescriptorSetsUpdateCI::new()
        .add_write(&ubo_write)
        .add_write(&texture_write)
        .update(device);

    let result = DescriptorStaff { pool, set, layout };
    Ok(result)
}

fn prepare_pipelines(device: &VkDevice, render_pass: vk::RenderPass, set_layout: vk::DescriptorSetLayout) -> VkResult<PipelineStaff> {

    let layout = PipelineLayoutCI::new()
        .add_set_layout(set_layout)
        .build(device)?;

    let mut compiler = VkShaderCompiler::new()?;
    let vert = vksamples::build_shader(device, &mut compiler, vk::ShaderStageFlags::VERTEX, include_str!("sparse.vert.glsl"), "sparse.vert")?;
    let frag = vksamples::build_shader(device, &mut compiler, vk::ShaderStageFlags::FRAGMENT, include_str!("sparse.frag.glsl"), "sparse.frag")?;

    let mut pipeline_ci = GraphicsPipelineCI::new(render_pass, layout);
    pipeline_ci.set_vertex_input(MeshVertex::input_description(0));
    pipeline_ci.set_depth_stencil(DepthStencilSCI::new()
        .depth_test(true, true, vk::CompareOp::LESS_OR_EQUAL));
    pipeline_ci.set_shaders(vec![
        ShaderStageCI::new(vk::ShaderStageFlags::VERTEX, vert),
        ShaderStageCI::new(vk::ShaderStageFlags::FRAGMENT, frag),
    ]);
    let pipeline = pipeline_ci.build(device)?;

    device.discard(vert);
    device.discard(frag);

    let result = PipelineStaff { pipeline, layout };
    Ok(result)
}
