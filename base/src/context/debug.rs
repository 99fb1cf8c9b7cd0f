
use ash::vk;

use crate::context::instance::VkInstance;
use crate::{vkptr, vkbool};
use crate::error::{VkResult, VkError};

use std::ffi::CStr;

#[derive(Debug)]
pub struct ValidationConfig {

    /// `is_enable` tell if validation layer should be enabled.
    pub is_enable: bool,
    /// `utils_config` specifies the configuration parameters used in Debug Utils.
    pub utils_config: DebugUtilsConfig,
}

impl Default for ValidationConfig {

    fn default() -> ValidationConfig {
        ValidationConfig {
            is_enable: cfg!(debug_assertions),
            utils_config: DebugUtilsConfig::default(),
        }
    }
}

/// Wrapper class for the validation tools used in Vulkan.
pub struct VkDebugger {

    target: Option<VkDebugUtils>,
}

impl VkDebugger {

    pub fn new(instance: &VkInstance, config: &ValidationConfig) -> VkResult<VkDebugger> {

        let target = if instance.is_validation_enabled {
            Some(VkDebugUtils::new(instance, &config.utils_config)?)
        } else {
            None
        };

        Ok(VkDebugger { target })
    }

    pub fn discard(&self) {

        if let Some(ref utils) = self.target {
            unsafe {
                utils.loader.destroy_debug_utils_messenger(utils.utils_messenger, None);
            }
        }
    }
}

/// Map the severity reported by validation layer to a log level.
pub(crate) fn severity_to_level(severity: vk::DebugUtilsMessageSeverityFlagsEXT) -> log::Level {

    if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
        log::Level::Error
    } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING) {
        log::Level::Warn
    } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::INFO) {
        log::Level::Debug
    } else {
        log::Level::Trace
    }
}

/// the callback function used in Debug Utils.
unsafe extern "system" fn vulkan_debug_utils_callback(
    message_severity : vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type     : vk::DebugUtilsMessageTypeFlagsEXT,
    p_callback_data  : *const vk::DebugUtilsMessengerCallbackDataEXT,
    _p_user_data     : vkptr
) -> vkbool {

    let types = match message_type {
        | vk::DebugUtilsMessageTypeFlagsEXT::GENERAL     => "General",
        | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE => "Performance",
        | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION  => "Validation",
        | _ => "Unknown",
    };

    if !p_callback_data.is_null() && !(*p_callback_data).p_message.is_null() {
        let message = CStr::from_ptr((*p_callback_data).p_message);
        log::log!(target: "vulkan", severity_to_level(message_severity), "[{}] {}", types, message.to_string_lossy());
    }

    vk::FALSE
}

/// The configuration parameters used in the initialization of `vk::DebugUtils`.
#[derive(Debug)]
pub struct DebugUtilsConfig {

    pub flags    : vk::DebugUtilsMessengerCreateFlagsEXT,
    pub severity : vk::DebugUtilsMessageSeverityFlagsEXT,
    pub types    : vk::DebugUtilsMessageTypeFlagsEXT,
}

impl Default for DebugUtilsConfig {

    fn default() -> DebugUtilsConfig {
        DebugUtilsConfig {
            flags: vk::DebugUtilsMessengerCreateFlagsEXT::empty(),
            severity:
                vk::DebugUtilsMessageSeverityFlagsEXT::WARNING |
                vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
            types:
                vk::DebugUtilsMessageTypeFlagsEXT::GENERAL |
                vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE |
                vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION,
        }
    }
}

struct VkDebugUtils {

    loader: ash::extensions::ext::DebugUtils,
    utils_messenger: vk::DebugUtilsMessengerEXT,
}

impl VkDebugUtils {

    fn new(instance: &VkInstance, config: &DebugUtilsConfig) -> VkResult<VkDebugUtils> {

        let loader = ash::extensions::ext::DebugUtils::new(&instance.entry, &instance.handle);

        let messenger_ci = vk::DebugUtilsMessengerCreateInfoEXT {
            flags            : config.flags,
            message_severity : config.severity,
            message_type     : config.types,
            pfn_user_callback: Some(vulkan_debug_utils_callback),
            ..Default::default()
        };

        let utils_messenger = unsafe {
            loader.create_debug_utils_messenger(&messenger_ci, None)
                .or(Err(VkError::create("Debug Utils Callback")))?
        };

        Ok(VkDebugUtils { loader, utils_messenger })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_picks_most_severe_level() {

        type Severity = vk::DebugUtilsMessageSeverityFlagsEXT;

        assert_eq!(severity_to_level(Severity::ERROR), log::Level::Error);
        assert_eq!(severity_to_level(Severity::WARNING | Severity::ERROR), log::Level::Error);
        assert_eq!(severity_to_level(Severity::WARNING), log::Level::Warn);
        assert_eq!(severity_to_level(Severity::INFO), log::Level::Debug);
        assert_eq!(severity_to_level(Severity::VERBOSE), log::Level::Trace);
    }
}
