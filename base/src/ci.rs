//! Builders over the raw create-info structures of Vulkan.
//!
//! Each wrapper owns its `vk::*CreateInfo` together with the arrays its pointers refer to,
//! so a builder can be moved around freely before it is consumed.

pub mod shader;
pub mod pipeline;
pub mod device;
pub mod image;
pub mod buffer;
pub mod vma;
pub mod descriptor;
pub mod memory;
pub mod command;
pub mod sync;
pub mod query;

use crate::context::VkDevice;
use crate::VkResult;

pub(crate) trait VulkanCI<CI>: Sized {

    fn default_ci() -> CI;
}

pub trait VkObjectBuildableCI {
    type ObjectType;

    fn build(&self, device: &VkDevice) -> VkResult<Self::ObjectType>;
}
