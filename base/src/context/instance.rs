
use ash::vk;
use raw_window_handle::RawDisplayHandle;

use crate::context::debug::ValidationConfig;
use crate::utils::cast::{chars2string, cstrings2ptrs};
use crate::vkuint;
use crate::error::{VkResult, VkError};

use std::ffi::{CStr, CString};

const VALIDATION_LAYER_NAME: &str = "VK_LAYER_KHRONOS_validation";

/// The configuration parameters used in the initialization of `vk::Instance`.
pub struct InstanceConfig {

    /// `api_version` must be the highest version of Vulkan that the application is designed to use.
    pub api_version: vkuint,
    pub application_version: vkuint,
    pub engine_version: vkuint,
    pub application_name: String,
    pub engine_name: String,
    /// log all available instance layers at debug level.
    pub print_available_layers: bool,
    /// the layers to load besides the validation layer.
    pub require_layer_names: Vec<String>,
    /// the extensions to enable besides the ones required by surface and debug utils.
    pub require_extensions: Vec<CString>,
}

impl Default for InstanceConfig {

    fn default() -> InstanceConfig {
       InstanceConfig {
           api_version         : vk::API_VERSION_1_1,
           application_version : vk::make_api_version(0, 1, 0, 0),
           engine_version      : vk::make_api_version(0, 1, 0, 0),
           application_name    : String::from("Vulkan Example"),
           engine_name         : String::from("vkbase"),
           print_available_layers: false,
           require_layer_names : Vec::new(),
           require_extensions  : Vec::new(),
       }
    }
}

impl InstanceConfig {

    pub fn api_version(mut self, version: vkuint) -> InstanceConfig {
        self.api_version = version; self
    }

}

/// Wrapper class for `vk::Instance` object.
pub struct VkInstance {

    /// handle of `vk::Instance`.
    pub(crate) handle: ash::Instance,
    /// the object used in instance creation define in ash crate.
    pub(crate) entry: ash::Entry,
    /// the names of vulkan layers enabled in instance creation.
    pub(crate) enable_layer_names: Vec<CString>,
    /// whether the validation layer and debug utils are available.
    pub(crate) is_validation_enabled: bool,
    pub(crate) api_version: vkuint,
}

impl VkInstance {

    pub fn new(config: InstanceConfig, validation: &ValidationConfig, display: RawDisplayHandle) -> VkResult<VkInstance> {

        let entry = unsafe {
            ash::Entry::load()
                .map_err(|e| {
                    log::error!("Failed to load Vulkan library: {}", e);
                    VkError::unlink("Entry")
                })?
        };

        let app_name = CString::new(config.application_name.as_bytes())
            .map_err(|_| VkError::other("Failed to cast application name to CString."))?;
        let engine_name = CString::new(config.engine_name.as_bytes())
            .map_err(|_| VkError::other("Failed to cast engine name to CString."))?;

        let application_info = vk::ApplicationInfo {
            p_application_name  : app_name.as_ptr(),
            application_version : config.application_version,
            p_engine_name       : engine_name.as_ptr(),
            engine_version      : config.engine_version,
            api_version         : config.api_version,
            ..Default::default()
        };

        let available_layers = query_available_layers(&entry, config.print_available_layers)?;

        let mut require_layers = config.require_layer_names.clone();
        let is_validation_enabled = if validation.is_enable {
            if available_layers.iter().any(|l| l == VALIDATION_LAYER_NAME) {
                require_layers.push(String::from(VALIDATION_LAYER_NAME));
                true
            } else {
                log::warn!("Validation layer {} is not available, continue without validation.", VALIDATION_LAYER_NAME);
                false
            }
        } else {
            false
        };

        if let Some(missing) = require_layers.iter().find(|l| !available_layers.contains(l)) {
            return Err(VkError::unsupported(format!("Instance layer {}", missing)))
        }

        // get the names of required vulkan layers.
        let enable_layer_names = crate::utils::cast::strs2cstrings(&require_layers);
        let enable_layer_names_ptr = cstrings2ptrs(&enable_layer_names);

        // request extension about platform specific surface and debug tools.
        let mut enable_extension_names = ash_window::enumerate_required_extensions(display)
            .map_err(|_| VkError::query("Surface Extensions"))?
            .to_vec();
        if is_validation_enabled {
            enable_extension_names.push(ash::extensions::ext::DebugUtils::name().as_ptr());
        }
        enable_extension_names.extend(config.require_extensions.iter().map(|e| e.as_ptr()));

        let instance_ci = vk::InstanceCreateInfo {
            p_application_info         : &application_info,
            enabled_layer_count        : enable_layer_names_ptr.len() as _,
            pp_enabled_layer_names     : enable_layer_names_ptr.as_ptr(),
            enabled_extension_count    : enable_extension_names.len() as _,
            pp_enabled_extension_names : enable_extension_names.as_ptr(),
            ..Default::default()
        };

        let handle = unsafe {
            entry.create_instance(&instance_ci, None)
                .or(Err(VkError::unlink("Instance")))?
        };

        log::debug!("Vulkan instance created with layers {:?}.", require_layers);

        let instance = VkInstance {
            entry, handle, enable_layer_names, is_validation_enabled,
            api_version: config.api_version,
        };
        Ok(instance)
    }

    /// Destroy the `vk::Instance` object.
    ///
    /// All child objects created using instance must have been destroyed prior to this call.
    pub fn discard(&self) {

        unsafe {
            self.handle.destroy_instance(None);
        }
    }
}

fn query_available_layers(entry: &ash::Entry, print_available_layers: bool) -> VkResult<Vec<String>> {

    let layer_properties = entry.enumerate_instance_layer_properties()
        .or(Err(VkError::query("Layer Properties")))?;

    let available_layer_names: Vec<String> = layer_properties.into_iter().map(|available_layer| {
        chars2string(&available_layer.layer_name)
    }).collect();

    if print_available_layers {
        log::debug!("Available instance layers: {:?}", available_layer_names);
    }

    Ok(available_layer_names)
}
