
use ash::vk;
use ash::extensions::khr::{AccelerationStructure, RayTracingPipeline};
use winit::event::VirtualKeyCode;

use vkbase::context::{VulkanContext, VkDevice, VkSwapchain};
use vkbase::ci::VkObjectBuildableCI;
use vkbase::ci::buffer::BufferCI;
use vkbase::ci::memory::MemoryAI;
use vkbase::ci::image::{ImageCI, ImageViewCI, ImageBarrierCI};
use vkbase::ci::vma::{VmaBuffer, VmaImage, VmaAllocationCI};
use vkbase::ci::pipeline::PipelineLayoutCI;
use vkbase::ci::shader::ShaderStageCI;
use vkbase::command::{VkCmdRecorder, IRayTracing, CmdRayTracingApi, CmdTransferApi, ShaderBindingRegions};
use vkbase::math::{OrbitView, perspective_vk};
use vkbase::utils::memory::{get_memory_type_index, as_bytes};
use vkbase::utils::shaderc::{VkShaderCompiler, ShadercOptions};
use vkbase::{InputController, FrameAction};
use vkbase::{vkuint, vkbytes, Mat4F, Point3F};
use vkbase::{VkResult, VkError};

use vksamples::VkExampleBackendRes;
use crate::data::{ShaderGroups, ShaderBindingTableLayout, UboCamera, TRIANGLE_VERTICES, TRIANGLE_INDICES};

const STORAGE_FORMAT: vk::Format = vk::Format::R8G8B8A8_UNORM;
const SHADER_GROUPS: ShaderGroups = ShaderGroups { raygen: 1, miss: 1, hit: 1 };

pub struct VulkanExample {

    backend: VkExampleBackendRes,
    /// the images copied to by each command buffer, in the order of `backend.commands`.
    present_images: Vec<vk::Image>,
    view: OrbitView,

    loaders: RayTracingLoaders,

    geometry: GeometryStaff,
    bottom_level: AccelerationStructureRes,
    top_level: AccelerationStructureRes,

    storage: StorageImage,
    ubo_buffer: VmaBuffer,

    pipelines: PipelineStaff,
    sbt: ShaderBindingTable,
    descriptors: DescriptorStaff,

    is_cmd_dirty: bool,
}

struct RayTracingLoaders {
    acceleration: AccelerationStructure,
    pipeline: RayTracingPipeline,
}

/// A buffer bound to memory of its own, referenced by its device address.
struct AddressBuffer {
    handle : vk::Buffer,
    memory : vk::DeviceMemory,
    address: vk::DeviceAddress,
}

struct GeometryStaff {
    vertices : AddressBuffer,
    indices  : AddressBuffer,
    transform: AddressBuffer,
    instances: AddressBuffer,
}

struct AccelerationStructureRes {
    handle : vk::AccelerationStructureKHR,
    buffer : AddressBuffer,
    address: vk::DeviceAddress,
}

/// The image written by the raygen shader, it stays in GENERAL layout between frames.
struct StorageImage {
    image : VmaImage,
    view  : vk::ImageView,
    extent: vk::Extent2D,
}

struct PipelineStaff {
    pipeline: vk::Pipeline,
    layout  : vk::PipelineLayout,
}

struct ShaderBindingTable {
    buffer : AddressBuffer,
    regions: ShaderBindingRegions,
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
        let present_images = swapchain.images.iter().map(|i| i.image).collect();

        let loaders = RayTracingLoaders {
            acceleration: AccelerationStructure::new(&device.instance, &device.logic.handle),
            pipeline: RayTracingPipeline::new(&device.instance, &device.logic.handle),
        };
        let properties = unsafe {
            RayTracingPipeline::get_properties(&device.instance, device.phy.handle)
        };
        log::info!("Shader group handle size: {}, max recursion depth: {}.", properties.shader_group_handle_size, properties.max_ray_recursion_depth);

        let queue = device.logic.queues.graphics.handle;
        let geometry = GeometryStaff::new(device)?;
        let bottom_level = build_bottom_level(device, &loaders.acceleration, backend.command_pool, queue, &geometry)?;
        let (geometry, top_level) = build_top_level(device, &loaders.acceleration, backend.command_pool, queue, geometry, &bottom_level)?;

        let storage = StorageImage::new(device, backend.command_pool, backend.dimension)?;

        let view = OrbitView::new(Point3F::origin(), 2.5, 0.0, 0.0);
        let ubo_data = camera_uniforms(&view, backend.dimension);
        let ubo_buffer = vkbase::ci::vma::host_buffer_with_data(device, vk::BufferUsageFlags::UNIFORM_BUFFER, &[ubo_data])?;

        let descriptors = setup_descriptor(device, &top_level, &storage, &ubo_buffer)?;
        let pipelines = prepare_pipelines(device, &loaders.pipeline, &descriptors)?;
        let sbt = ShaderBindingTable::new(device, &loaders.pipeline, &properties, pipelines.pipeline)?;

        let target = VulkanExample {
            backend, present_images, view, loaders,
            geometry, bottom_level, top_level,
            storage, ubo_buffer, pipelines, sbt, descriptors,
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
            .add_wait(vk::PipelineStageFlags::TRANSFER, image_available)
            .add_command(self.backend.commands[image_index])
            .add_signal(self.backend.await_rendering);

        device.submit(submit_ci, device.logic.queues.graphics.handle, device_available)?;

        Ok(self.backend.await_rendering)
    }

    fn swapchain_reload(&mut self, device: &VkDevice, new_chain: &VkSwapchain) -> VkResult<()> {

        self.backend.swapchain_reload(device, new_chain)?;
        self.present_images = new_chain.images.iter().map(|i| i.image).collect();

        self.storage.discard_by(device)?;
        self.storage = StorageImage::new(device, self.backend.command_pool, self.backend.dimension)?;
        update_storage_write(device, self.descriptors.set, &self.storage);

        self.is_cmd_dirty = true;
        Ok(())
    }

    fn receive_input(&mut self, inputer: &InputController, delta_time: f32) -> FrameAction {

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
            self.view.pitch = (self.view.pitch - rotate).max(-85.0);
        }

        FrameAction::Rendering
    }

    fn deinit(&mut self, device: &VkDevice) -> VkResult<()> {

        device.discard(self.descriptors.layout);
        device.discard(self.descriptors.pool);

        device.discard(self.pipelines.pipeline);
        device.discard(self.pipelines.layout);
        self.sbt.buffer.discard_by(device);

        self.top_level.discard_by(device, &self.loaders.acceleration);
        self.bottom_level.discard_by(device, &self.loaders.acceleration);
        self.geometry.discard_by(device);

        self.storage.discard_by(device)?;
        device.vma_discard(&mut self.ubo_buffer)?;

        self.backend.discard_by(device)
    }
}

impl VulkanExample {

    fn record_commands(&mut self, device: &VkDevice) -> VkResult<()> {

        let extent = self.storage.extent;
        let storage_image = self.storage.image.handle;

        let subresource = vk::ImageSubresourceLayers {
            aspect_mask: vk::ImageAspectFlags::COLOR,
            mip_level: 0,
            base_array_layer: 0,
            layer_count: 1,
        };
        let corner = vk::Offset3D { x: extent.width as i32, y: extent.height as i32, z: 1 };
        let blit_region = vk::ImageBlit {
            src_subresource: subresource,
            src_offsets: [vk::Offset3D::default(), corner],
            dst_subresource: subresource,
            dst_offsets: [vk::Offset3D::default(), corner],
        };

        for (i, &command) in self.backend.commands.iter().enumerate() {

            let present_image = self.present_images[i];

            let recorder: VkCmdRecorder<IRayTracing> = VkCmdRecorder::new(device, command);
            recorder.begin_record()?;

            recorder
                .bind_pipeline(self.pipelines.pipeline)
                .bind_descriptor_sets(self.pipelines.layout, 0, &[self.descriptors.set], &[])
                .trace_rays(&self.loaders.pipeline, &self.sbt.regions, extent.width, extent.height, 1);

            // copy the traced image to the swapchain image. ------------------------------------
            let to_transfer = [
                ImageBarrierCI::color(present_image)
                    .access_mask(vk::AccessFlags::empty(), vk::AccessFlags::TRANSFER_WRITE)
                    .layout(vk::ImageLayout::UNDEFINED, vk::ImageLayout::TRANSFER_DST_OPTIMAL)
                    .value(),
                ImageBarrierCI::color(storage_image)
                    .access_mask(vk::AccessFlags::SHADER_WRITE, vk::AccessFlags::TRANSFER_READ)
                    .layout(vk::ImageLayout::GENERAL, vk::ImageLayout::TRANSFER_SRC_OPTIMAL)
                    .value(),
            ];
            recorder.image_pipeline_barrier(
                vk::PipelineStageFlags::RAY_TRACING_SHADER_KHR | vk::PipelineStageFlags::TRANSFER,
                vk::PipelineStageFlags::TRANSFER,
                vk::DependencyFlags::empty(), &to_transfer);

            // the blit converts to the format of the swapchain.
            recorder.blit_image(
                storage_image, vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
                present_image, vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                &[blit_region], vk::Filter::NEAREST);

            let to_present = [
                ImageBarrierCI::color(present_image)
                    .access_mask(vk::AccessFlags::TRANSFER_WRITE, vk::AccessFlags::empty())
                    .layout(vk::ImageLayout::TRANSFER_DST_OPTIMAL, vk::ImageLayout::PRESENT_SRC_KHR)
                    .value(),
                ImageBarrierCI::color(storage_image)
                    .access_mask(vk::AccessFlags::TRANSFER_READ, vk::AccessFlags::SHADER_WRITE)
                    .layout(vk::ImageLayout::TRANSFER_SRC_OPTIMAL, vk::ImageLayout::GENERAL)
                    .value(),
            ];
            recorder.image_pipeline_barrier(
                vk::PipelineStageFlags::TRANSFER,
                vk::PipelineStageFlags::RAY_TRACING_SHADER_KHR | vk::PipelineStageFlags::BOTTOM_OF_PIPE,
                vk::DependencyFlags::empty(), &to_present);
            // ---------------------------------------------------------------------------------

            recorder.end_record()?;
        }

        self.is_cmd_dirty = false;
        Ok(())
    }

    fn update_uniforms(&mut self, device: &VkDevice) -> VkResult<()> {
        let ubo_data = camera_uniforms(&self.view, self.storage.extent);
        self.ubo_buffer.write(device, &[ubo_data])
    }
}

fn camera_uniforms(view: &OrbitView, extent: vk::Extent2D) -> UboCamera {

    let projection = perspective_vk(60.0_f32.to_radians(), vksamples::aspect_ratio(extent), 0.1, 512.0);
    UboCamera::new(&view.view_matrix(), &projection)
}

impl AddressBuffer {

    fn new(device: &VkDevice, size: vkbytes, usage: vk::BufferUsageFlags, properties: vk::MemoryPropertyFlags) -> VkResult<AddressBuffer> {

        let (handle, _) = BufferCI::new(size)
            .usage(usage | vk::BufferUsageFlags::SHADER_DEVICE_ADDRESS)
            .build(device)?;

        let requirement = unsafe {
            device.logic.handle.get_buffer_memory_requirements(handle)
        };
        let type_index = get_memory_type_index(device, requirement.memory_type_bits, properties)?;

        // the allocator of VkDevice does not create device address memory.
        let memory = MemoryAI::new(requirement.size, type_index)
            .with_device_address()
            .build(device)?;
        device.bind_memory(handle, memory, 0)?;
        let address = device.buffer_address(handle);

        let buffer = AddressBuffer { handle, memory, address };
        Ok(buffer)
    }

    /// Create a host visible buffer filled with `data`.
    fn with_data<T: Copy>(device: &VkDevice, usage: vk::BufferUsageFlags, data: &[T]) -> VkResult<AddressBuffer> {

        let bytes = as_bytes(data);
        let buffer = AddressBuffer::new(device, bytes.len() as vkbytes, usage, vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT)?;

        unsafe {
            let data_ptr = device.logic.handle.map_memory(buffer.memory, 0, vk::WHOLE_SIZE, vk::MemoryMapFlags::empty())
                .map_err(|_| VkError::device("Map Memory"))?;
            std::ptr::copy_nonoverlapping(bytes.as_ptr(), data_ptr as *mut u8, bytes.len());
            device.logic.handle.unmap_memory(buffer.memory);
        }

        Ok(buffer)
    }

    fn discard_by(&self, device: &VkDevice) {
        device.discard(self.handle);
        device.discard(self.memory);
    }
}

impl GeometryStaff {

    fn new(device: &VkDevice) -> VkResult<GeometryStaff> {

        let usage = vk::BufferUsageFlags::ACCELERATION_STRUCTURE_BUILD_INPUT_READ_ONLY_KHR;

        let vertices = AddressBuffer::with_data(device, usage, &TRIANGLE_VERTICES)?;
        let indices = AddressBuffer::with_data(device, usage, &TRIANGLE_INDICES)?;
        let transform = AddressBuffer::with_data(device, usage, &[crate::data::transform_matrix(&Mat4F::identity())])?;

        let geometry = GeometryStaff {
            vertices, indices, transform,
            // filled after the bottom level structure is built.
            instances: AddressBuffer { handle: vk::Buffer::null(), memory: vk::DeviceMemory::null(), address: 0 },
        };
        Ok(geometry)
    }

    fn discard_by(&self, device: &VkDevice) {
        self.vertices.discard_by(device);
        self.indices.discard_by(device);
        self.transform.discard_by(device);
        self.instances.discard_by(device);
    }
}

impl AccelerationStructureRes {

    fn discard_by(&self, device: &VkDevice, loader: &AccelerationStructure) {
        unsafe {
            loader.destroy_acceleration_structure(self.handle, None);
        }
        self.buffer.discard_by(device);
    }
}

fn build_bottom_level(device: &VkDevice, loader: &AccelerationStructure, pool: vk::CommandPool, queue: vk::Queue, geometry: &GeometryStaff) -> VkResult<AccelerationStructureRes> {

    let triangles = vk::AccelerationStructureGeometryKHR {
        geometry_type: vk::GeometryTypeKHR::TRIANGLES,
        geometry: vk::AccelerationStructureGeometryDataKHR {
            triangles: vk::AccelerationStructureGeometryTrianglesDataKHR {
                vertex_format: vk::Format::R32G32B32_SFLOAT,
                vertex_data: vk::DeviceOrHostAddressConstKHR { device_address: geometry.vertices.address },
                vertex_stride: std::mem::size_of::<[f32; 3]>() as vkbytes,
                max_vertex: (TRIANGLE_VERTICES.len() - 1) as vkuint,
                index_type: vk::IndexType::UINT32,
                index_data: vk::DeviceOrHostAddressConstKHR { device_address: geometry.indices.address },
                transform_data: vk::DeviceOrHostAddressConstKHR { device_address: geometry.transform.address },
                ..Default::default()
            },
        },
        flags: vk::GeometryFlagsKHR::OPAQUE,
        ..Default::default()
    };

    let primitive_count = (TRIANGLE_INDICES.len() / 3) as vkuint;
    build_acceleration_structure(device, loader, pool, queue, vk::AccelerationStructureTypeKHR::BOTTOM_LEVEL, &triangles, primitive_count)
}

fn build_top_level(device: &VkDevice, loader: &AccelerationStructure, pool: vk::CommandPool, queue: vk::Queue, mut geometry: GeometryStaff, bottom_level: &AccelerationStructureRes) -> VkResult<(GeometryStaff, AccelerationStructureRes)> {

    let instance = vk::AccelerationStructureInstanceKHR {
        transform: crate::data::transform_matrix(&Mat4F::identity()),
        instance_custom_index_and_mask: vk::Packed24_8::new(0, 0xFF),
        instance_shader_binding_table_record_offset_and_flags: vk::Packed24_8::new(0, vk::GeometryInstanceFlagsKHR::TRIANGLE_FACING_CULL_DISABLE.as_raw() as u8),
        acceleration_structure_reference: vk::AccelerationStructureReferenceKHR {
            device_handle: bottom_level.address,
        },
    };
    geometry.instances = AddressBuffer::with_data(device, vk::BufferUsageFlags::ACCELERATION_STRUCTURE_BUILD_INPUT_READ_ONLY_KHR, &[instance])?;

    let instances = vk::AccelerationStructureGeometryKHR {
        geometry_type: vk::GeometryTypeKHR::INSTANCES,
        geometry: vk::AccelerationStructureGeometryDataKHR {
            instances: vk::AccelerationStructureGeometryInstancesDataKHR {
                array_of_pointers: vk::FALSE,
                data: vk::DeviceOrHostAddressConstKHR { device_address: geometry.instances.address },
                ..Default::default()
            },
        },
        flags: vk::GeometryFlagsKHR::OPAQUE,
        ..Default::default()
    };

    let top_level = build_acceleration_structure(device, loader, pool, queue, vk::AccelerationStructureTypeKHR::TOP_LEVEL, &instances, 1)?;
    Ok((geometry, top_level))
}

/// Create an acceleration structure of a single geometry and build it on `queue`, blocking until it is done.
fn build_acceleration_structure(device: &VkDevice, loader: &AccelerationStructure, pool: vk::CommandPool, queue: vk::Queue, ty: vk::AccelerationStructureTypeKHR, geometry: &vk::AccelerationStructureGeometryKHR, primitive_count: vkuint) -> VkResult<AccelerationStructureRes> {

    let mut build_info = vk::AccelerationStructureBuildGeometryInfoKHR {
        ty,
        flags: vk::BuildAccelerationStructureFlagsKHR::PREFER_FAST_TRACE,
        mode: vk::BuildAccelerationStructureModeKHR::BUILD,
        geometry_count: 1,
        p_geometries: geometry,
        ..Default::default()
    };

    let sizes = unsafe {
        loader.get_acceleration_structure_build_sizes(vk::AccelerationStructureBuildTypeKHR::DEVICE, &build_info, &[primitive_count])
    };

    let buffer = AddressBuffer::new(device, sizes.acceleration_structure_size, vk::BufferUsageFlags::ACCELERATION_STRUCTURE_STORAGE_KHR, vk::MemoryPropertyFlags::DEVICE_LOCAL)?;

    let structure_ci = vk::AccelerationStructureCreateInfoKHR {
        buffer: buffer.handle,
        size: sizes.acceleration_structure_size,
        ty,
        ..Default::default()
    };
    let handle = unsafe {
        loader.create_acceleration_structure(&structure_ci, None)
            .map_err(|_| VkError::create("Acceleration Structure"))?
    };

    let scratch = AddressBuffer::new(device, sizes.build_scratch_size, vk::BufferUsageFlags::STORAGE_BUFFER, vk::MemoryPropertyFlags::DEVICE_LOCAL)?;
    build_info.dst_acceleration_structure = handle;
    build_info.scratch_data = vk::DeviceOrHostAddressKHR { device_address: scratch.address };

    let build_range = vk::AccelerationStructureBuildRangeInfoKHR {
        primitive_count,
        primitive_offset: 0,
        first_vertex: 0,
        transform_offset: 0,
    };

    let build_result = vkbase::command::record_once(device, pool, queue, |recorder| {
        recorder.build_acceleration_structures(loader, &[build_info], &[&[build_range]]);
        Ok(())
    });
    scratch.discard_by(device);
    build_result?;

    let address = unsafe {
        loader.get_acceleration_structure_device_address(&vk::AccelerationStructureDeviceAddressInfoKHR {
            acceleration_structure: handle,
            ..Default::default()
        })
    };
    log::debug!("{:?} acceleration structure of {} bytes.", ty, sizes.acceleration_structure_size);

    let result = AccelerationStructureRes { handle, buffer, address };
    Ok(result)
}

impl StorageImage {

    fn new(device: &VkDevice, pool: vk::CommandPool, extent: vk::Extent2D) -> VkResult<StorageImage> {

        let image_ci = ImageCI::new_2d(STORAGE_FORMAT, extent)
            .usages(vk::ImageUsageFlags::STORAGE | vk::ImageUsageFlags::TRANSFER_SRC);
        let image = VmaAllocationCI::device_local()
            .build_image(device, &image_ci)?;

        let view = ImageViewCI::new(image.handle, vk::ImageViewType::TYPE_2D, STORAGE_FORMAT)
            .aspect_mask(vk::ImageAspectFlags::COLOR)
            .build(device)?;

        let image_handle = image.handle;
        vkbase::command::record_once(device, pool, device.logic.queues.graphics.handle, |recorder| {

            let barrier = ImageBarrierCI::color(image_handle)
                .access_mask(vk::AccessFlags::empty(), vk::AccessFlags::SHADER_WRITE)
                .layout(vk::ImageLayout::UNDEFINED, vk::ImageLayout::GENERAL)
                .value();
            recorder.image_pipeline_barrier(vk::PipelineStageFlags::TOP_OF_PIPE, vk::PipelineStageFlags::RAY_TRACING_SHADER_KHR, vk::DependencyFlags::empty(), &[barrier]);
            Ok(())
        })?;

        let storage = StorageImage { image, view, extent };
        Ok(storage)
    }

    fn discard_by(&mut self, device: &VkDevice) -> VkResult<()> {
        device.discard(self.view);
        device.vma_discard(&mut self.image)
    }
}

fn setup_descriptor(device: &VkDevice, top_level: &AccelerationStructureRes, storage: &StorageImage, ubo_buffer: &VmaBuffer) -> VkResult<DescriptorStaff> {

    use vkbase::ci::descriptor::{DescriptorPoolCI, DescriptorSetLayoutCI, DescriptorSetAI};
    use vkbase::ci::descriptor::{DescriptorBufferSetWI, DescriptorAccelerationSetWI, DescriptorSetsUpdateCI};

    let pool = DescriptorPoolCI::new(1)
        .add_descriptor(vk::DescriptorType::ACCELERATION_STRUCTURE_KHR, 1)
        .add_descriptor(vk::DescriptorType::STORAGE_IMAGE, 1)
        .add_descriptor(vk::DescriptorType::UNIFORM_BUFFER, 1)
        .build(device)?;

    // binding 0: top level acceleration structure.
    // binding 1: storage image of the traced result.
    // binding 2: camera matrices.
    let layout = DescriptorSetLayoutCI::new()
        .add_descriptor(vk::DescriptorType::ACCELERATION_STRUCTURE_KHR, vk::ShaderStageFlags::RAYGEN_KHR)
        .add_descriptor(vk::DescriptorType::STORAGE_IMAGE, vk::ShaderStageFlags::RAYGEN_KHR)
        .add_descriptor(vk::DescriptorType::UNIFORM_BUFFER, vk::ShaderStageFlags::RAYGEN_KHR)
        .build(device)?;

    let set = DescriptorSetAI::new(pool)
        .add_set_layout(layout)
        .build(device)?
        .into_iter().next()
        .ok_or(VkError::create("Descriptor Set"))?;

    let structure_write = DescriptorAccelerationSetWI::new(set, 0, vec![top_level.handle]);
    let ubo_write = DescriptorBufferSetWI::new(set, 2, vk::DescriptorType::UNIFORM_BUFFER)
        .add_buffer(vk::DescriptorBufferInfo {
            buffer: ubo_buffer.handle,
            offset: 0,
            range : vk::WHOLE_SIZE,
        });
    DescriptorSetsUpdateCI::new()
        .add_write(&structure_write)
        .add_write(&ubo_write)
        .update(device);
    update_storage_write(device, set, storage);

    let result = DescriptorStaff { pool, set, layout };
    Ok(result)
}

fn update_storage_write(device: &VkDevice, set: vk::DescriptorSet, storage: &StorageImage) {

    use vkbase::ci::descriptor::{DescriptorImageSetWI, DescriptorSetsUpdateCI};

    let storage_write = DescriptorImageSetWI::new(set, 1, vk::DescriptorType::STORAGE_IMAGE)
        .add_image(vk::DescriptorImageInfo {
            sampler: vk::Sampler::null(),
            image_view: storage.view,
            image_layout: vk::ImageLayout::GENERAL,
        });

    DescriptorSetsUpdateCI::new()
        .add_write(&storage_write)
        .update(device);
}

fn prepare_pipelines(device: &VkDevice, loader: &RayTracingPipeline, descriptors: &DescriptorStaff) -> VkResult<PipelineStaff> {

    let layout = PipelineLayoutCI::new()
        .add_set_layout(descriptors.layout)
        .build(device)?;

    let mut compiler = VkShaderCompiler::with_options(ShadercOptions::for_ray_tracing())?;
    let raygen = vksamples::build_shader(device, &mut compiler, vk::ShaderStageFlags::RAYGEN_KHR, include_str!("raygen.rgen.glsl"), "raygen.rgen")?;
    let miss = vksamples::build_shader(device, &mut compiler, vk::ShaderStageFlags::MISS_KHR, include_str!("miss.rmiss.glsl"), "miss.rmiss")?;
    let closest_hit = vksamples::build_shader(device, &mut compiler, vk::ShaderStageFlags::CLOSEST_HIT_KHR, include_str!("closesthit.rchit.glsl"), "closesthit.rchit")?;

    // the stage index of each shader is used by the groups below.
    let stages = [
        ShaderStageCI::new(vk::ShaderStageFlags::RAYGEN_KHR, raygen),
        ShaderStageCI::new(vk::ShaderStageFlags::MISS_KHR, miss),
        ShaderStageCI::new(vk::ShaderStageFlags::CLOSEST_HIT_KHR, closest_hit),
    ];
    let stage_values: Vec<vk::PipelineShaderStageCreateInfo> = stages.iter()
        .map(ShaderStageCI::value)
        .collect();

    let general_group = |shader: vkuint| vk::RayTracingShaderGroupCreateInfoKHR {
        ty: vk::RayTracingShaderGroupTypeKHR::GENERAL,
        general_shader: shader,
        closest_hit_shader: vk::SHADER_UNUSED_KHR,
        any_hit_shader: vk::SHADER_UNUSED_KHR,
        intersection_shader: vk::SHADER_UNUSED_KHR,
        ..Default::default()
    };
    let groups = [
        general_group(0),
        general_group(1),
        vk::RayTracingShaderGroupCreateInfoKHR {
            ty: vk::RayTracingShaderGroupTypeKHR::TRIANGLES_HIT_GROUP,
            general_shader: vk::SHADER_UNUSED_KHR,
            closest_hit_shader: 2,
            any_hit_shader: vk::SHADER_UNUSED_KHR,
            intersection_shader: vk::SHADER_UNUSED_KHR,
            ..Default::default()
        },
    ];
    debug_assert_eq!(groups.len() as vkuint, SHADER_GROUPS.total());

    let pipeline_ci = vk::RayTracingPipelineCreateInfoKHR {
        stage_count: stage_values.len() as _,
        p_stages: stage_values.as_ptr(),
        group_count: groups.len() as _,
        p_groups: groups.as_ptr(),
        max_pipeline_ray_recursion_depth: 1,
        layout,
        ..Default::default()
    };

    let pipeline_result = unsafe {
        loader.create_ray_tracing_pipelines(vk::DeferredOperationKHR::null(), vk::PipelineCache::null(), &[pipeline_ci], None)
    };

    device.discard(raygen);
    device.discard(miss);
    device.discard(closest_hit);

    let pipeline = pipeline_result
        .map_err(|_| VkError::create("Ray Tracing Pipeline"))?
        .into_iter().next()
        .ok_or(VkError::create("Ray Tracing Pipeline"))?;

    let result = PipelineStaff { pipeline, layout };
    Ok(result)
}

impl ShaderBindingTable {

    fn new(device: &VkDevice, loader: &RayTracingPipeline, properties: &vk::PhysicalDeviceRayTracingPipelinePropertiesKHR, pipeline: vk::Pipeline) -> VkResult<ShaderBindingTable> {

        let layout = ShaderBindingTableLayout::new(
            properties.shader_group_handle_size,
            properties.shader_group_handle_alignment,
            properties.shader_group_base_alignment,
            SHADER_GROUPS);

        let handles_size = (properties.shader_group_handle_size * SHADER_GROUPS.total()) as usize;
        let handles = unsafe {
            loader.get_ray_tracing_shader_group_handles(pipeline, 0, SHADER_GROUPS.total(), handles_size)
                .map_err(|_| VkError::query("Shader Group Handles"))?
        };

        let table = layout.arrange_handles(&handles);
        let buffer = AddressBuffer::with_data(device, vk::BufferUsageFlags::SHADER_BINDING_TABLE_KHR, &table)?;
        let regions = layout.regions(buffer.address);

        let sbt = ShaderBindingTable { buffer, regions };
        Ok(sbt)
    }
}
