
use ash::vk;
use winit::event::VirtualKeyCode;

use vkbase::context::{VulkanContext, VkDevice, VkSwapchain};
use vkbase::ci::VkObjectBuildableCI;
use vkbase::ci::vma::{VmaBuffer, VmaImage, VmaAllocationCI};
use vkbase::ci::pipeline::*;
use vkbase::ci::shader::ShaderStageCI;
use vkbase::command::{VkCmdRecorder, IGraphics, ITransfer, CmdGraphicsApi, CmdTransferApi};
use vkbase::math::{perspective_vk, OrbitView};
use vkbase::utils::shaderc::VkShaderCompiler;
use vkbase::{InputController, FrameAction};
use vkbase::{vkuint, vkbytes, Point3F};
use vkbase::{VkResult, VkError};

use vksamples::VkExampleBackendRes;
use crate::data::{Heightmap, TerrainVertex, UboTessellation, StatisticSlots};
use crate::data::{HEIGHTMAP_DIM, PATCH_SIZE, LAYER_COUNT, LAYER_DIM};

const SKY_COLOR: vk::ClearValue = vk::ClearValue {
    color: vk::ClearColorValue { float32: [0.47, 0.5, 0.67, 1.0] },
};

/// Counters collected for each frame: vertex shader and evaluation shader invocations.
const STATISTIC_FLAGS: vk::QueryPipelineStatisticFlags = vk::QueryPipelineStatisticFlags::from_raw(
    vk::QueryPipelineStatisticFlags::VERTEX_SHADER_INVOCATIONS.as_raw()
        | vk::QueryPipelineStatisticFlags::TESSELLATION_EVALUATION_SHADER_INVOCATIONS.as_raw());

const STATISTIC_LOG_INTERVAL: f32 = 2.0;

pub struct VulkanExample {

    backend: VkExampleBackendRes,
    view: OrbitView,

    terrain: TerrainStaff,
    heightmap: Texture,
    layers: Texture,

    ubo_buffer: VmaBuffer,

    pipelines: PipelineStaff,
    descriptors: DescriptorStaff,
    statistics: Option<StatisticsQuery>,

    is_wireframe: bool,
    is_tessellation: bool,
    statistic_timer: f32,
    is_cmd_dirty: bool,
}

struct StatisticsQuery {
    pool: vk::QueryPool,
    slots: StatisticSlots,
}

struct TerrainStaff {
    vertices: VmaBuffer,
    indices: VmaBuffer,
    index_count: vkuint,
}

struct Texture {
    image: VmaImage,
    view: vk::ImageView,
    sampler: vk::Sampler,
}

struct PipelineStaff {
    solid: vk::Pipeline,
    /// only available when the device supports non solid fill modes.
    wireframe: Option<vk::Pipeline>,
    layout: vk::PipelineLayout,
}

struct DescriptorStaff {
    pool: vk::DescriptorPool,
    set: vk::DescriptorSet,
    set_layout: vk::DescriptorSetLayout,
}

impl VulkanExample {

    pub fn new(context: &VulkanContext) -> VkResult<VulkanExample> {

        let device = &context.device;
        let swapchain = &context.swapchain;

        let render_pass = vksamples::setup_present_renderpass(device, swapchain)?;
        let backend = VkExampleBackendRes::new(device, swapchain, render_pass)?;

        let queue = device.logic.queues.graphics.handle;
        let heightmap_data = Heightmap::generate(HEIGHTMAP_DIM, 1337, 6);

        let terrain = TerrainStaff::upload(device, backend.command_pool, queue, &heightmap_data)?;
        let heightmap = Texture::heightmap(device, backend.command_pool, queue, &heightmap_data)?;
        let layers = Texture::layers(device, backend.command_pool, queue)?;

        let view = OrbitView::new(Point3F::new(0.0, 8.0, 0.0), 90.0, 30.0, 45.0);

        let ubo_data = UboTessellation::new(perspective_vk(60.0_f32.to_radians(), 1.0, 0.1, 512.0), view.view_matrix(), [1.0, 1.0], true);
        let ubo_buffer = vkbase::ci::vma::host_buffer_with_data(device, vk::BufferUsageFlags::UNIFORM_BUFFER, &[ubo_data])?;

        let descriptors = setup_descriptor(device, &ubo_buffer, &heightmap, &layers)?;
        let pipelines = prepare_pipelines(device, backend.render_pass, descriptors.set_layout)?;

        let statistics = if device.phy.enabled_features.pipeline_statistics_query == vk::TRUE {
            Some(StatisticsQuery::new(device, backend.commands.len())?)
        } else {
            log::warn!("Pipeline statistics query is not supported, no statistics will be collected.");
            None
        };

        let target = VulkanExample {
            backend, view, terrain, heightmap, layers, ubo_buffer,
            pipelines, descriptors, statistics,
            is_wireframe: false,
            is_tessellation: true,
            statistic_timer: 0.0,
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

        self.update_uniforms(device)?;

        if self.is_cmd_dirty {
            device.wait_idle()?;
            self.record_commands(device)?;
        }

        self.statistic_timer += delta_time;
        if self.statistic_timer > STATISTIC_LOG_INTERVAL {
            self.statistic_timer = 0.0;
            self.log_statistics(device, image_index);
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

        let command_count = self.backend.commands.len();
        if let Some(ref mut query) = self.statistics {
            if query.slots.is_outdated(command_count) {
                let rebuilt = StatisticsQuery::new(device, command_count)?;
                device.discard(std::mem::replace(query, rebuilt).pool);
            }
        }

        self.is_cmd_dirty = true;
        Ok(())
    }

    fn receive_input(&mut self, inputer: &InputController, delta_time: f32) -> FrameAction {

        if inputer.is_key_just_pressed(VirtualKeyCode::W) {
            if self.pipelines.wireframe.is_some() {
                self.is_wireframe = !self.is_wireframe;
                self.is_cmd_dirty = true;
            } else {
                log::warn!("Wireframe rendering is not supported by this device.");
            }
        }
        if inputer.is_key_just_pressed(VirtualKeyCode::T) {
            self.is_tessellation = !self.is_tessellation;
            log::info!("Tessellation {}.", if self.is_tessellation { "enabled" } else { "disabled" });
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

        if let Some(ref query) = self.statistics {
            device.discard(query.pool);
        }

        device.discard(self.descriptors.set_layout);
        device.discard(self.descriptors.pool);

        device.discard(self.pipelines.solid);
        if let Some(wireframe) = self.pipelines.wireframe {
            device.discard(wireframe);
        }
        device.discard(self.pipelines.layout);

        device.vma_discard(&mut self.ubo_buffer)?;
        self.heightmap.discard_by(device)?;
        self.layers.discard_by(device)?;
        self.terrain.discard_by(device)?;

        self.backend.discard_by(device)
    }
}

impl VulkanExample {

    fn record_commands(&mut self, device: &VkDevice) -> VkResult<()> {

        let pipeline = match self.pipelines.wireframe {
            | Some(wireframe) if self.is_wireframe => wireframe,
            | _ => self.pipelines.solid,
        };
        let clear_values = [SKY_COLOR, vksamples::DEFAULT_CLEAR_DEPTH];

        for (i, &command) in self.backend.commands.iter().enumerate() {

            let recorder: VkCmdRecorder<IGraphics> = VkCmdRecorder::new(device, command);
            let query = self.statistics.as_ref()
                .and_then(|statistics| statistics.slots.query_of(i).map(|query| (statistics.pool, query)));

            let render_pass_bi = RenderPassBI::new(self.backend.render_pass, self.backend.framebuffers[i])
                .render_extent(self.backend.dimension)
                .set_clear_values(clear_values.to_vec());

            recorder.begin_record()?;

            if let Some((pool, query)) = query {
                recorder.reset_query_pool(pool, query, 1);
            }

            recorder
                .begin_render_pass(render_pass_bi)
                .set_viewport(0, &[self.backend.viewport()])
                .set_scissor(0, &[self.backend.scissor()]);

            if let Some((pool, query)) = query {
                recorder.begin_query(pool, query);
            }

            recorder
                .bind_pipeline(pipeline)
                .bind_descriptor_sets(self.pipelines.layout, 0, &[self.descriptors.set], &[])
                .bind_vertex_buffers(0, &[self.terrain.vertices.handle], &[0])
                .bind_index_buffer(self.terrain.indices.handle, vk::IndexType::UINT32, 0)
                .draw_indexed(self.terrain.index_count, 1, 0, 0, 0);

            if let Some((pool, query)) = query {
                recorder.end_query(pool, query);
            }

            recorder.end_render_pass();
            recorder.end_record()?;
        }

        self.is_cmd_dirty = false;
        Ok(())
    }

    fn update_uniforms(&mut self, device: &VkDevice) -> VkResult<()> {

        let dimension = self.backend.dimension;
        let projection = perspective_vk(60.0_f32.to_radians(), vksamples::aspect_ratio(dimension), 0.1, 512.0);

        let ubo_data = UboTessellation::new(
            projection, self.view.view_matrix(),
            [dimension.width as f32, dimension.height as f32],
            self.is_tessellation);
        self.ubo_buffer.write(device, &[ubo_data])
    }

    /// Print the statistics of the last time the command buffer of `image_index` was executed.
    ///
    /// Results that are not available yet are skipped instead of waited for.
    fn log_statistics(&self, device: &VkDevice, image_index: usize) {

        let (pool, query) = match self.statistics {
            | Some(ref statistics) => match statistics.slots.query_of(image_index) {
                | Some(query) => (statistics.pool, query),
                | None => return,
            },
            | None => return,
        };

        let mut results = [[0_u64; 2]; 1];
        let query_result = unsafe {
            device.logic.handle.get_query_pool_results(pool, query, 1, &mut results, vk::QueryResultFlags::TYPE_64)
        };

        match query_result {
            | Ok(_) => {
                let [vertex_invocations, evaluation_invocations] = results[0];
                log::info!("Vertex shader invocations: {}, tessellation evaluation shader invocations: {}.", vertex_invocations, evaluation_invocations);
            },
            | Err(vk::Result::NOT_READY) => {},
            | Err(e) => log::warn!("Failed to read pipeline statistics: {}.", e),
        }
    }
}

impl StatisticsQuery {

    fn new(device: &VkDevice, command_count: usize) -> VkResult<StatisticsQuery> {

        use vkbase::ci::query::QueryPoolCI;

        let slots = StatisticSlots::for_commands(command_count);
        let pool = QueryPoolCI::new(vk::QueryType::PIPELINE_STATISTICS, slots.query_count())
            .pipeline_statistics(STATISTIC_FLAGS)
            .build(device)?;

        Ok(StatisticsQuery { pool, slots })
    }
}

impl TerrainStaff {

    fn upload(device: &VkDevice, pool: vk::CommandPool, queue: vk::Queue, heightmap: &Heightmap) -> VkResult<TerrainStaff> {

        use vkbase::ci::vma::device_buffer_with_data;

        let patches = super::data::generate_terrain_patches(heightmap, PATCH_SIZE, 1.0);

        let vertices = device_buffer_with_data(device, pool, queue, vk::BufferUsageFlags::VERTEX_BUFFER, &patches.vertices)?;
        let indices = device_buffer_with_data(device, pool, queue, vk::BufferUsageFlags::INDEX_BUFFER, &patches.indices)?;

        log::debug!("Terrain of {} patches.", patches.indices.len() / 4);

        let result = TerrainStaff { vertices, indices, index_count: patches.indices.len() as _ };
        Ok(result)
    }

    fn discard_by(&mut self, device: &VkDevice) -> VkResult<()> {
        device.vma_discard(&mut self.vertices)?;
        device.vma_discard(&mut self.indices)
    }
}

impl Texture {

    /// The heightmap as single channel 16 bit texture, clamped at the borders.
    fn heightmap(device: &VkDevice, pool: vk::CommandPool, queue: vk::Queue, heightmap: &Heightmap) -> VkResult<Texture> {

        use vkbase::ci::image::SamplerCI;

        let dim = heightmap.dim();
        let image = upload_image(device, pool, queue, vk::Format::R16_UNORM, dim, 1, heightmap.texels())?;
        let view = image_view(device, &image, vk::ImageViewType::TYPE_2D, vk::Format::R16_UNORM, 1)?;

        let sampler = SamplerCI::new()
            .filter(vk::Filter::LINEAR, vk::Filter::LINEAR)
            .address_mode(vk::SamplerAddressMode::CLAMP_TO_EDGE)
            .lod(0.0, 0.0, 1.0)
            .build(device)?;

        let result = Texture { image, view, sampler };
        Ok(result)
    }

    /// The ground layers as one texture array, repeated over the terrain.
    fn layers(device: &VkDevice, pool: vk::CommandPool, queue: vk::Queue) -> VkResult<Texture> {

        use vkbase::ci::image::SamplerCI;

        let texels: Vec<[u8; 4]> = (0..LAYER_COUNT)
            .flat_map(|layer| super::data::generate_layer(layer, LAYER_DIM))
            .collect();

        let format = vk::Format::R8G8B8A8_UNORM;
        let image = upload_image(device, pool, queue, format, LAYER_DIM, LAYER_COUNT, &texels)?;
        let view = image_view(device, &image, vk::ImageViewType::TYPE_2D_ARRAY, format, LAYER_COUNT)?;

        let mut sampler_ci = SamplerCI::new()
            .filter(vk::Filter::LINEAR, vk::Filter::LINEAR)
            .address_mode(vk::SamplerAddressMode::REPEAT)
            .lod(0.0, 0.0, 1.0);
        if device.phy.enabled_features.sampler_anisotropy == vk::TRUE {
            sampler_ci = sampler_ci.anisotropy(Some(device.phy.limits.max_sampler_anisotropy));
        }
        let sampler = sampler_ci.build(device)?;

        let result = Texture { image, view, sampler };
        Ok(result)
    }

    fn discard_by(&mut self, device: &VkDevice) -> VkResult<()> {
        device.discard(self.sampler);
        device.discard(self.view);
        device.vma_discard(&mut self.image)
    }
}

/// Create a square `dim` x `dim` image of `layer_count` layers and fill it with `texels`, layer after layer.
///
/// The image is left in shader read only layout.
fn upload_image<T: Copy>(device: &VkDevice, pool: vk::CommandPool, queue: vk::Queue, format: vk::Format, dim: vkuint, layer_count: vkuint, texels: &[T]) -> VkResult<VmaImage> {

    use vkbase::ci::image::{ImageCI, ImageBarrierCI};

    let expected_texels = (dim * dim * layer_count) as usize;
    if texels.len() != expected_texels {
        return Err(VkError::other(format!("Expect {} texels for the image, but {} are given.", expected_texels, texels.len())))
    }

    let staging = vkbase::ci::vma::host_buffer_with_data(device, vk::BufferUsageFlags::TRANSFER_SRC, texels)?;

    let image_ci = ImageCI::new_2d(format, vk::Extent2D { width: dim, height: dim })
        .usages(vk::ImageUsageFlags::SAMPLED | vk::ImageUsageFlags::TRANSFER_DST)
        .array_layers(layer_count);
    let image = VmaAllocationCI::device_local()
        .build_image(device, &image_ci)?;

    let layer_size = (dim * dim) as vkbytes * std::mem::size_of::<T>() as vkbytes;
    let regions: Vec<vk::BufferImageCopy> = (0..layer_count).map(|layer| {
        vk::BufferImageCopy {
            buffer_offset: layer as vkbytes * layer_size,
            buffer_row_length: 0,
            buffer_image_height: 0,
            image_subresource: vk::ImageSubresourceLayers {
                aspect_mask: vk::ImageAspectFlags::COLOR,
                mip_level: 0,
                base_array_layer: layer,
                layer_count: 1,
            },
            image_offset: vk::Offset3D { x: 0, y: 0, z: 0 },
            image_extent: vk::Extent3D { width: dim, height: dim, depth: 1 },
        }
    }).collect();

    let subrange = vk::ImageSubresourceRange {
        aspect_mask: vk::ImageAspectFlags::COLOR,
        base_mip_level: 0,
        level_count: 1,
        base_array_layer: 0,
        layer_count,
    };

    let copy_result = vkbase::command::record_once(device, pool, queue, |recorder: &VkCmdRecorder<ITransfer>| {

        let to_transfer = ImageBarrierCI::new(image.handle, subrange)
            .access_mask(vk::AccessFlags::empty(), vk::AccessFlags::TRANSFER_WRITE)
            .layout(vk::ImageLayout::UNDEFINED, vk::ImageLayout::TRANSFER_DST_OPTIMAL);
        let to_shader = ImageBarrierCI::new(image.handle, subrange)
            .access_mask(vk::AccessFlags::TRANSFER_WRITE, vk::AccessFlags::SHADER_READ)
            .layout(vk::ImageLayout::TRANSFER_DST_OPTIMAL, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL);

        // the heightmap is read from the tessellation stages as well as from the fragment shader.
        let read_stages = vk::PipelineStageFlags::TESSELLATION_CONTROL_SHADER
            | vk::PipelineStageFlags::TESSELLATION_EVALUATION_SHADER
            | vk::PipelineStageFlags::FRAGMENT_SHADER;

        recorder
            .image_pipeline_barrier(vk::PipelineStageFlags::TOP_OF_PIPE, vk::PipelineStageFlags::TRANSFER, vk::DependencyFlags::empty(), &[to_transfer.value()])
            .copy_buf2img(staging.handle, image.handle, vk::ImageLayout::TRANSFER_DST_OPTIMAL, &regions)
            .image_pipeline_barrier(vk::PipelineStageFlags::TRANSFER, read_stages, vk::DependencyFlags::empty(), &[to_shader.value()]);
        Ok(())
    });

    device.vma_discard(staging)?;
    copy_result?;

    Ok(image)
}

fn image_view(device: &VkDevice, image: &VmaImage, view_type: vk::ImageViewType, format: vk::Format, layer_count: vkuint) -> VkResult<vk::ImageView> {

    use vkbase::ci::image::ImageViewCI;

    ImageViewCI::new(image.handle, view_type, format)
        .aspect_mask(vk::ImageAspectFlags::COLOR)
        .array_layers(0, layer_count)
        .build(device)
}

fn setup_descriptor(device: &VkDevice, ubo_buffer: &VmaBuffer, heightmap: &Texture, layers: &Texture) -> VkResult<DescriptorStaff> {

    use vkbase::ci::descriptor::{DescriptorPoolCI, DescriptorSetLayoutCI, DescriptorSetAI};
    use vkbase::ci::descriptor::{DescriptorBufferSetWI, DescriptorImageSetWI, DescriptorSetsUpdateCI};

    let pool = DescriptorPoolCI::new(1)
        .add_descriptor(vk::DescriptorType::UNIFORM_BUFFER, 1)
        .add_descriptor(vk::DescriptorType::COMBINED_IMAGE_SAMPLER, 2)
        .build(device)?;

    let tessellation_stages = vk::ShaderStageFlags::TESSELLATION_CONTROL | vk::ShaderStageFlags::TESSELLATION_EVALUATION;

    // binding 0: matrices, frustum planes and tessellation parameters.
    // binding 1: heightmap.
    // binding 2: terrain layers.
    let set_layout = DescriptorSetLayoutCI::new()
        .add_descriptor(vk::DescriptorType::UNIFORM_BUFFER, tessellation_stages)
        .add_descriptor(vk::DescriptorType::COMBINED_IMAGE_SAMPLER, tessellation_stages | vk::ShaderStageFlags::FRAGMENT)
        .add_descriptor(vk::DescriptorType::COMBINED_IMAGE_SAMPLER, vk::ShaderStageFlags::FRAGMENT)
        .build(device)?;

    let set = DescriptorSetAI::new(pool)
        .add_set_layout(set_layout)
        .build(device)?
        .remove(0);

    let ubo_write = DescriptorBufferSetWI::new(set, 0, vk::DescriptorType::UNIFORM_BUFFER)
        .add_buffer(vk::DescriptorBufferInfo {
            buffer: ubo_buffer.handle,
            offset: 0,
            range : vk::WHOLE_SIZE,
        });

    let texture_write = |binding: vkuint, texture: &Texture| {
        DescriptorImageSetWI::new(set, binding, vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
            .add_image(vk::DescriptorImageInfo {
                sampler: texture.sampler,
                image_view: texture.view,
                image_layout: vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
            })
    };
    let heightmap_write = texture_write(1, heightmap);
    let layers_write = texture_write(2, layers);

    DescriptorSetsUpdateCI::new()
        .add_write(&ubo_write)
        .add_write(&heightmap_write)
        .add_write(&layers_write)
        .update(device);

    let result = DescriptorStaff { pool, set, set_layout };
    Ok(result)
}

fn prepare_pipelines(device: &VkDevice, render_pass: vk::RenderPass, set_layout: vk::DescriptorSetLayout) -> VkResult<PipelineStaff> {

    let layout = PipelineLayoutCI::new()
        .add_set_layout(set_layout)
        .build(device)?;

    let mut compiler = VkShaderCompiler::new()?;
    let vert = vksamples::build_shader(device, &mut compiler, vk::ShaderStageFlags::VERTEX, include_str!("terrain.vert.glsl"), "terrain.vert")?;
    let tesc = vksamples::build_shader(device, &mut compiler, vk::ShaderStageFlags::TESSELLATION_CONTROL, include_str!("terrain.tesc.glsl"), "terrain.tesc")?;
    let tese = vksamples::build_shader(device, &mut compiler, vk::ShaderStageFlags::TESSELLATION_EVALUATION, include_str!("terrain.tese.glsl"), "terrain.tese")?;
    let frag = vksamples::build_shader(device, &mut compiler, vk::ShaderStageFlags::FRAGMENT, include_str!("terrain.frag.glsl"), "terrain.frag")?;

    let mut pipeline_ci = GraphicsPipelineCI::new(render_pass, layout);
    pipeline_ci.set_vertex_input(TerrainVertex::input_description(0));
    pipeline_ci.set_input_assembly(InputAssemblySCI::new()
        .topology(vk::PrimitiveTopology::PATCH_LIST));
    pipeline_ci.set_tessellation(TessellationSCI::new(4));
    pipeline_ci.set_rasterization(RasterizationSCI::new()
        .cull_face(vk::CullModeFlags::BACK, vk::FrontFace::COUNTER_CLOCKWISE));
    pipeline_ci.set_depth_stencil(DepthStencilSCI::new()
        .depth_test(true, true, vk::CompareOp::LESS_OR_EQUAL));
    pipeline_ci.set_shaders(vec![
        ShaderStageCI::new(vk::ShaderStageFlags::VERTEX, vert),
        ShaderStageCI::new(vk::ShaderStageFlags::TESSELLATION_CONTROL, tesc),
        ShaderStageCI::new(vk::ShaderStageFlags::TESSELLATION_EVALUATION, tese),
        ShaderStageCI::new(vk::ShaderStageFlags::FRAGMENT, frag),
    ]);
    let solid = pipeline_ci.build(device)?;

    let wireframe = if device.phy.enabled_features.fill_mode_non_solid == vk::TRUE {
        pipeline_ci.set_rasterization(RasterizationSCI::new()
            .polygon(vk::PolygonMode::LINE)
            .cull_face(vk::CullModeFlags::BACK, vk::FrontFace::COUNTER_CLOCKWISE));
        Some(pipeline_ci.build(device)?)
    } else {
        None
    };

    device.discard(vert);
    device.discard(tesc);
    device.discard(tese);
    device.discard(frag);

    let result = PipelineStaff { solid, wireframe, layout };
    Ok(result)
}
