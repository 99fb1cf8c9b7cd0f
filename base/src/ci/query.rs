
use ash::vk;

use crate::context::{VkDevice, VkObjectDiscardable};
use crate::ci::{VulkanCI, VkObjectBuildableCI};
use crate::error::{VkResult, VkError};
use crate::vkuint;

// ----------------------------------------------------------------------------------------------
/// Wrapper class for `vk::QueryPoolCreateInfo`.
#[derive(Debug, Clone)]
pub struct QueryPoolCI {
    inner: vk::QueryPoolCreateInfo,
}

impl VulkanCI<vk::QueryPoolCreateInfo> for QueryPoolCI {

    fn default_ci() -> vk::QueryPoolCreateInfo {
        vk::QueryPoolCreateInfo::default()
    }
}

impl VkObjectBuildableCI for QueryPoolCI {
    type ObjectType = vk::QueryPool;

    fn build(&self, device: &VkDevice) -> VkResult<Self::ObjectType> {

        let pool = unsafe {
            device.logic.handle.create_query_pool(&self.inner, None)
                .map_err(|_| VkError::create("Query Pool"))?
        };
        Ok(pool)
    }
}

impl QueryPoolCI {

    pub fn new(query_type: vk::QueryType, count: vkuint) -> QueryPoolCI {

        QueryPoolCI {
            inner: vk::QueryPoolCreateInfo {
                query_type,
                query_count: count,
                ..QueryPoolCI::default_ci()
            },
        }
    }

    /// The counters to collect, only used by `vk::QueryType::PIPELINE_STATISTICS`.
    ///
    /// Each query returns one value per set bit, in the order of the bits.
    #[inline(always)]
    pub fn pipeline_statistics(mut self, flags: vk::QueryPipelineStatisticFlags) -> QueryPoolCI {
        self.inner.pipeline_statistics = flags; self
    }

    #[inline(always)]
    pub fn value(&self) -> vk::QueryPoolCreateInfo {
        self.inner
    }
}

impl VkObjectDiscardable for vk::QueryPool {

    fn discard_by(self, device: &VkDevice) {
        unsafe {
            device.logic.handle.destroy_query_pool(self, None);
        }
    }
}
// ----------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statistics_are_kept_with_query_type() {

        let flags = vk::QueryPipelineStatisticFlags::TESSELLATION_CONTROL_SHADER_PATCHES
            | vk::QueryPipelineStatisticFlags::TESSELLATION_EVALUATION_SHADER_INVOCATIONS;
        let ci = QueryPoolCI::new(vk::QueryType::PIPELINE_STATISTICS, 3)
            .pipeline_statistics(flags);

        assert_eq!(ci.value().query_count, 3);
        assert_eq!(ci.value().pipeline_statistics.as_raw().count_ones(), 2);
    }
}
