
use ash::vk;

use crate::context::instance::VkInstance;
use crate::context::surface::VkSurface;
use crate::context::device::physical::VkPhysicalDevice;
use crate::context::device::queue::QueueRequester;
use crate::utils::cast::cstrings2ptrs;
use crate::error::{VkResult, VkError};
use crate::vkuint;

use std::os::raw::c_void;

/// Supplies the `p_next` chain of extension feature structures used in device creation.
///
/// Implementors keep the chained structures in a boxed struct, so that the pointers linked in `chain_head` stay valid.
pub trait DeviceExtensionFeatures {

    fn chain_head(&mut self) -> *const c_void;
}

pub struct LogicDevConfig {

    /// the queues to create, `GRAPHICS` is always created with present support.
    pub request_queues: vk::QueueFlags,
    pub extension_features: Option<Box<dyn DeviceExtensionFeatures>>,
}

impl Default for LogicDevConfig {

    fn default() -> LogicDevConfig {

        LogicDevConfig {
            request_queues: vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE | vk::QueueFlags::TRANSFER,
            extension_features: None,
        }
    }
}

impl LogicDevConfig {

    pub fn request_queues(mut self, queues: vk::QueueFlags) -> LogicDevConfig {
        self.request_queues |= queues; self
    }

    pub fn extension_features(mut self, features: Box<dyn DeviceExtensionFeatures>) -> LogicDevConfig {
        self.extension_features = Some(features); self
    }
}


pub struct VkLogicalDevice {

    pub handle: ash::Device,
    pub queues: QueueFamilies,
}

pub struct QueueFamilies {

    pub graphics: VkQueue,
    pub compute : VkQueue,
    pub transfer: VkQueue,
    /// queue supporting sparse memory binding, null if not requested.
    pub sparse  : VkQueue,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct VkQueue {

    pub handle: vk::Queue,
    pub family_index: vkuint,
    pub queue_index: vkuint,
}

impl VkQueue {

    /// Check if two queues are from the same queue family, in which case no ownership transfer is needed.
    pub fn is_same_family(&self, other: &VkQueue) -> bool {
        self.family_index == other.family_index
    }
}

impl Default for VkQueue {

    fn default() -> VkQueue {
        VkQueue {
            handle: vk::Queue::null(),
            family_index: 0,
            queue_index: 0,
        }
    }
}

impl VkLogicalDevice {

    pub fn new(instance: &VkInstance, phy: &VkPhysicalDevice, surface: &VkSurface, mut config: LogicDevConfig) -> VkResult<VkLogicalDevice> {

        let mut requester = QueueRequester::new(phy.families.clone());

        let graphics_request = requester.request_queue(vk::QueueFlags::GRAPHICS, 1.0, |family| {
            surface.query_is_family_presentable(phy.handle, family as vkuint)
        })?;

        let optional_request = |requester: &mut QueueRequester, flag: vk::QueueFlags| -> VkResult<Option<usize>> {
            if config.request_queues.contains(flag) {
                requester.request_queue(flag, 1.0, |_| true).map(Some)
            } else {
                Ok(None)
            }
        };

        let compute_request  = optional_request(&mut requester, vk::QueueFlags::COMPUTE)?;
        let transfer_request = optional_request(&mut requester, vk::QueueFlags::TRANSFER)?;
        let sparse_request   = optional_request(&mut requester, vk::QueueFlags::SPARSE_BINDING)?;

        let queue_cis = requester.queue_cis();

        let enable_layer_names = cstrings2ptrs(&instance.enable_layer_names);
        let enable_extension_names = cstrings2ptrs(phy.enable_extensions());

        let p_next = config.extension_features.as_mut()
            .map(|features| features.chain_head())
            .unwrap_or(std::ptr::null());

        let device_ci = vk::DeviceCreateInfo {
            p_next,
            queue_create_info_count    : queue_cis.len() as _,
            p_queue_create_infos       : queue_cis.as_ptr(),
            enabled_layer_count        : enable_layer_names.len() as _,
            pp_enabled_layer_names     : enable_layer_names.as_ptr(),
            enabled_extension_count    : enable_extension_names.len() as _,
            pp_enabled_extension_names : enable_extension_names.as_ptr(),
            p_enabled_features         : phy.enable_features(),
            ..Default::default()
        };

        let handle = unsafe {
            instance.handle.create_device(phy.handle, &device_ci, None)
                .or(Err(VkError::create("Logical Device")))?
        };

        let graphics = requester.dispatch_queue(&handle, graphics_request);
        let dispatch_or = |request: Option<usize>, fallback: VkQueue| {
            request.map(|r| requester.dispatch_queue(&handle, r)).unwrap_or(fallback)
        };

        let queues = QueueFamilies {
            graphics,
            compute : dispatch_or(compute_request, graphics),
            transfer: dispatch_or(transfer_request, graphics),
            sparse  : dispatch_or(sparse_request, VkQueue::default()),
        };

        log::debug!("Queue families: graphics({}), compute({}), transfer({}).",
            queues.graphics.family_index, queues.compute.family_index, queues.transfer.family_index);

        let device = VkLogicalDevice { handle, queues };
        Ok(device)
    }

    pub fn discard(&self) {

        unsafe {
            self.handle.destroy_device(None);
        }
    }
}
