
use ash::vk;

use crate::context::instance::VkInstance;
use crate::utils::cast::{chars2string, chars2cstring};
use crate::error::{VkResult, VkError};

use std::ffi::{CStr, CString};


#[derive(Debug, Clone)]
pub struct PhysicalDevConfig {

    pub device_type_preference: vk::PhysicalDeviceType,
    /// force to use the device at this index of enumeration, if it satisfies all requirements.
    pub gpu_index: Option<usize>,

    pub print_available_extensions: bool,
    pub request_extensions: Vec<CString>,

    /// features the device must support.
    pub request_features: vk::PhysicalDeviceFeatures,
    /// features that are enabled only when the device supports them.
    pub optional_features: vk::PhysicalDeviceFeatures,
}

impl Default for PhysicalDevConfig {

    fn default() -> PhysicalDevConfig {

        PhysicalDevConfig {
            device_type_preference: vk::PhysicalDeviceType::DISCRETE_GPU,
            gpu_index: None,

            print_available_extensions: false,
            request_extensions: vec![
                ash::extensions::khr::Swapchain::name().to_owned(),
            ],

            request_features: vk::PhysicalDeviceFeatures::default(),
            optional_features: vk::PhysicalDeviceFeatures::default(),
        }
    }
}

impl PhysicalDevConfig {

    pub fn add_extensions(mut self, names: &[&CStr]) -> PhysicalDevConfig {

        for name in names {
            if !self.request_extensions.iter().any(|e| e.as_c_str() == *name) {
                self.request_extensions.push((*name).to_owned());
            }
        }
        self
    }

    pub fn request_features(mut self, features: vk::PhysicalDeviceFeatures) -> PhysicalDevConfig {
        self.request_features = features; self
    }

    pub fn optional_features(mut self, features: vk::PhysicalDeviceFeatures) -> PhysicalDevConfig {
        self.optional_features = features; self
    }
}

pub struct VkPhysicalDevice {

    pub handle: vk::PhysicalDevice,
    pub properties: vk::PhysicalDeviceProperties,
    pub memories: vk::PhysicalDeviceMemoryProperties,
    pub families: Vec<vk::QueueFamilyProperties>,
    pub depth_format: vk::Format,
    pub limits: vk::PhysicalDeviceLimits,

    /// all the features the device supports.
    pub supported_features: vk::PhysicalDeviceFeatures,
    /// the features enabled in logical device.
    pub enabled_features: vk::PhysicalDeviceFeatures,

    enabled_extensions: Vec<CString>,
}

struct PhyDeviceTmp {

    handle: vk::PhysicalDevice,
    property: vk::PhysicalDeviceProperties,
}

impl VkPhysicalDevice {

    pub(crate) fn new(instance: &VkInstance, config: PhysicalDevConfig) -> VkResult<VkPhysicalDevice> {

        let candidates = unsafe {
            instance.handle.enumerate_physical_devices()
                .or(Err(VkError::query("Physical Device")))?
        };

        let candidates: Vec<PhyDeviceTmp> = candidates.into_iter().map(|handle| {
            let property = unsafe { instance.handle.get_physical_device_properties(handle) };
            PhyDeviceTmp { handle, property }
        }).collect();

        let device_types: Vec<vk::PhysicalDeviceType> = candidates.iter()
            .map(|c| c.property.device_type)
            .collect();

        let mut last_rejection = None;

        for index in rank_devices(&device_types, config.device_type_preference, config.gpu_index) {

            let candidate = &candidates[index];
            let device_name = chars2string(&candidate.property.device_name);

            // make sure all requested extensions are support by device.
            let unsupported_extensions = query_missing_extensions(instance, candidate, &config)?;
            if !unsupported_extensions.is_empty() {
                log::debug!("Skip device {}: missing extensions {:?}.", device_name, unsupported_extensions);
                last_rejection = Some(format!("Device extension {:?}", unsupported_extensions));
                continue
            }

            // make sure all requested features are support by device.
            let supported_features = unsafe {
                instance.handle.get_physical_device_features(candidate.handle)
            };
            let unsupported_features = missing_features(&supported_features, &config.request_features);
            if !unsupported_features.is_empty() {
                log::debug!("Skip device {}: missing features {:?}.", device_name, unsupported_features);
                last_rejection = Some(format!("Device feature {:?}", unsupported_features));
                continue
            }

            log_device_properties(&candidate.property);

            let memories = unsafe {
                instance.handle.get_physical_device_memory_properties(candidate.handle)
            };
            let families = unsafe {
                instance.handle.get_physical_device_queue_family_properties(candidate.handle)
            };
            let depth_format = query_depth_format(instance, candidate.handle)?;

            let enabled_features = merge_features(
                &config.request_features,
                &supported_subset(&supported_features, &config.optional_features));

            let dst_device = VkPhysicalDevice {
                handle: candidate.handle,
                properties: candidate.property,
                limits: candidate.property.limits,
                enabled_extensions: config.request_extensions,
                memories, families, depth_format, supported_features, enabled_features,
            };
            return Ok(dst_device)
        }

        Err(last_rejection
            .map(VkError::unsupported)
            .unwrap_or(VkError::other("Failed to find supportive Vulkan device.")))
    }

    pub fn enable_features(&self) -> &vk::PhysicalDeviceFeatures {
        &self.enabled_features
    }

    pub fn enable_extensions(&self) -> &[CString] {
        &self.enabled_extensions
    }

    pub fn device_name(&self) -> String {
        chars2string(&self.properties.device_name)
    }
}

/// Order devices for selection: the forced index first, then devices of preferred type, integrated GPUs and the others.
pub(crate) fn rank_devices(device_types: &[vk::PhysicalDeviceType], preference: vk::PhysicalDeviceType, forced: Option<usize>) -> Vec<usize> {

    let priority = |device_type: vk::PhysicalDeviceType| {
        if device_type == preference {
            0
        } else if device_type == vk::PhysicalDeviceType::INTEGRATED_GPU {
            1
        } else {
            2
        }
    };

    let mut ranked: Vec<usize> = (0..device_types.len()).collect();
    ranked.sort_by_key(|&i| priority(device_types[i]));

    if let Some(forced) = forced {
        if let Some(position) = ranked.iter().position(|&i| i == forced) {
            let selected = ranked.remove(position);
            ranked.insert(0, selected);
        } else {
            log::warn!("GPU index {} is out of range({} devices available), ignore it.", forced, device_types.len());
        }
    }

    ranked
}

fn query_missing_extensions(instance: &VkInstance, phy_device: &PhyDeviceTmp, config: &PhysicalDevConfig) -> VkResult<Vec<CString>> {

    let query_extensions = unsafe {
        instance.handle.enumerate_device_extension_properties(phy_device.handle)
            .or(Err(VkError::query("Device Extensions")))?
    };

    let available_extensions: Vec<CString> = query_extensions.into_iter().map(|extension| {
        chars2cstring(&extension.extension_name)
    }).collect();

    if config.print_available_extensions {
        log::debug!("Available extensions for {}: {:?}", chars2string(&phy_device.property.device_name), available_extensions);
    }

    Ok(missing_extensions(&available_extensions, &config.request_extensions))
}

pub(crate) fn missing_extensions(available: &[CString], requested: &[CString]) -> Vec<CString> {

    requested.iter()
        .filter(|r| !available.contains(r))
        .cloned()
        .collect()
}

fn log_device_properties(property: &vk::PhysicalDeviceProperties) {

    let device_type = match property.device_type {
        | vk::PhysicalDeviceType::CPU            => "CPU",
        | vk::PhysicalDeviceType::INTEGRATED_GPU => "Integrated GPU",
        | vk::PhysicalDeviceType::DISCRETE_GPU   => "Discrete GPU",
        | vk::PhysicalDeviceType::VIRTUAL_GPU    => "Virtual GPU",
        | _ => "Unknown",
    };

    log::info!("Using device: {} ({}), Vulkan API {}.{}.{}",
        chars2string(&property.device_name), device_type,
        vk::api_version_major(property.api_version),
        vk::api_version_minor(property.api_version),
        vk::api_version_patch(property.api_version));
}

fn query_depth_format(instance: &VkInstance, phy_device: vk::PhysicalDevice) -> VkResult<vk::Format> {

    // all depth formats may be optional, start with the highest precision packed format.
    let candidates = [
        vk::Format::D32_SFLOAT_S8_UINT,
        vk::Format::D32_SFLOAT,
        vk::Format::D24_UNORM_S8_UINT,
        vk::Format::D16_UNORM_S8_UINT,
        vk::Format::D16_UNORM,
    ];

    candidates.iter().cloned().find(|&format| {
        let format_properties = unsafe {
            instance.handle.get_physical_device_format_properties(phy_device, format)
        };
        format_properties.optimal_tiling_features.contains(vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT)
    }).ok_or(VkError::unsupported("Depth Stencil Format"))
}

// Physical Feature ------------------------------------------------------------------
macro_rules! feature_operations {
    ($($feature:ident,)*) => {

        /// Return the names of requested features that are not available.
        pub(crate) fn missing_features(available: &vk::PhysicalDeviceFeatures, request: &vk::PhysicalDeviceFeatures) -> Vec<&'static str> {

            let mut missing = Vec::new();
            $(
                if request.$feature == vk::TRUE && available.$feature == vk::FALSE {
                    missing.push(stringify!($feature));
                }
            )*
            missing
        }

        fn supported_subset(available: &vk::PhysicalDeviceFeatures, optional: &vk::PhysicalDeviceFeatures) -> vk::PhysicalDeviceFeatures {

            let mut result = vk::PhysicalDeviceFeatures::default();
            $(
                result.$feature = optional.$feature & available.$feature;
            )*
            result
        }

        fn merge_features(lhs: &vk::PhysicalDeviceFeatures, rhs: &vk::PhysicalDeviceFeatures) -> vk::PhysicalDeviceFeatures {

            let mut result = vk::PhysicalDeviceFeatures::default();
            $(
                result.$feature = lhs.$feature | rhs.$feature;
            )*
            result
        }
    };
}

feature_operations! {
    robust_buffer_access,
    full_draw_index_uint32,
    image_cube_array,
    independent_blend,
    geometry_shader,
    tessellation_shader,
    sample_rate_shading,
    dual_src_blend,
    logic_op,
    multi_draw_indirect,
    draw_indirect_first_instance,
    depth_clamp,
    depth_bias_clamp,
    fill_mode_non_solid,
    depth_bounds,
    wide_lines,
    large_points,
    alpha_to_one,
    multi_viewport,
    sampler_anisotropy,
    texture_compression_etc2,
    texture_compression_astc_ldr,
    texture_compression_bc,
    occlusion_query_precise,
    pipeline_statistics_query,
    vertex_pipeline_stores_and_atomics,
    fragment_stores_and_atomics,
    shader_tessellation_and_geometry_point_size,
    shader_image_gather_extended,
    shader_storage_image_extended_formats,
    shader_storage_image_multisample,
    shader_storage_image_read_without_format,
    shader_storage_image_write_without_format,
    shader_uniform_buffer_array_dynamic_indexing,
    shader_sampled_image_array_dynamic_indexing,
    shader_storage_buffer_array_dynamic_indexing,
    shader_storage_image_array_dynamic_indexing,
    shader_clip_distance,
    shader_cull_distance,
    shader_float64,
    shader_int64,
    shader_int16,
    shader_resource_residency,
    shader_resource_min_lod,
    sparse_binding,
    sparse_residency_buffer,
    sparse_residency_image2_d,
    sparse_residency_image3_d,
    sparse_residency2_samples,
    sparse_residency4_samples,
    sparse_residency8_samples,
    sparse_residency16_samples,
    sparse_residency_aliased,
    variable_multisample_rate,
    inherited_queries,
}
// ----------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preferred_device_type_comes_first() {

        let types = [
            vk::PhysicalDeviceType::CPU,
            vk::PhysicalDeviceType::INTEGRATED_GPU,
            vk::PhysicalDeviceType::DISCRETE_GPU,
        ];
        assert_eq!(rank_devices(&types, vk::PhysicalDeviceType::DISCRETE_GPU, None), vec![2, 1, 0]);
    }

    #[test]
    fn forced_index_overrides_preference() {

        let types = [vk::PhysicalDeviceType::DISCRETE_GPU, vk::PhysicalDeviceType::INTEGRATED_GPU];
        assert_eq!(rank_devices(&types, vk::PhysicalDeviceType::DISCRETE_GPU, Some(1)), vec![1, 0]);
        // out of range index is ignored.
        assert_eq!(rank_devices(&types, vk::PhysicalDeviceType::DISCRETE_GPU, Some(5)), vec![0, 1]);
    }

    #[test]
    fn missing_features_are_reported_by_name() {

        let available = vk::PhysicalDeviceFeatures {
            sampler_anisotropy: vk::TRUE,
            ..Default::default()
        };
        let request = vk::PhysicalDeviceFeatures {
            sampler_anisotropy: vk::TRUE,
            tessellation_shader: vk::TRUE,
            ..Default::default()
        };
        assert_eq!(missing_features(&available, &request), vec!["tessellation_shader"]);
    }

    #[test]
    fn optional_features_are_masked_by_support() {

        let available = vk::PhysicalDeviceFeatures {
            fill_mode_non_solid: vk::TRUE,
            ..Default::default()
        };
        let optional = vk::PhysicalDeviceFeatures {
            fill_mode_non_solid: vk::TRUE,
            pipeline_statistics_query: vk::TRUE,
            ..Default::default()
        };
        let request = vk::PhysicalDeviceFeatures {
            tessellation_shader: vk::TRUE,
            ..Default::default()
        };

        let enabled = merge_features(&request, &supported_subset(&available, &optional));
        assert_eq!(enabled.fill_mode_non_solid, vk::TRUE);
        assert_eq!(enabled.pipeline_statistics_query, vk::FALSE);
        assert_eq!(enabled.tessellation_shader, vk::TRUE);
    }

    #[test]
    fn extensions_are_matched_exactly() {

        let available = vec![CString::new("VK_KHR_swapchain").unwrap()];
        let requested = vec![
            CString::new("VK_KHR_swapchain").unwrap(),
            CString::new("VK_KHR_ray_tracing_pipeline").unwrap(),
        ];
        assert_eq!(missing_extensions(&available, &requested), vec![requested[1].clone()]);
    }
}
