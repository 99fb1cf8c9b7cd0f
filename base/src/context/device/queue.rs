
use ash::vk;

use crate::context::device::logical::VkQueue;
use crate::error::{VkResult, VkError};
use crate::{vkfloat, vkuint};

type FamilyIndex   = usize;
type QueueIndex    = usize;
type QueuePriority = vkfloat;

/// Decides which queue family and queue index serves each requested queue.
///
/// A family with fewer unrelated capabilities is preferred, so that compute or transfer requests land on
/// dedicated families when the device exposes them. When every candidate family is exhausted, the request
/// shares the first queue already created in a candidate family.
pub struct QueueRequester {

    // record the current create info of each queue family.
    cis: Vec<FamilyQueuesCreateInfo>,
    // the properties of each queue family queried from Vulkan.
    family_properties: Vec<vk::QueueFamilyProperties>,
    // record the family index and inner queue index of each requested queue.
    queues_requested: Vec<(FamilyIndex, QueueIndex)>,
}

#[derive(Default)]
struct FamilyQueuesCreateInfo {

    priorities: Vec<QueuePriority>,
}

impl QueueRequester {

    pub fn new(family_properties: Vec<vk::QueueFamilyProperties>) -> QueueRequester {

        let cis = family_properties.iter()
            .map(|_| FamilyQueuesCreateInfo::default())
            .collect();

        QueueRequester {
            cis, family_properties,
            queues_requested: Vec::new(),
        }
    }

    /// Request a queue supporting `request_queue`, and filtered by `family_filter`.
    ///
    /// Return the index of this request, used later in `dispatch_queue`.
    pub fn request_queue(&mut self, request_queue: vk::QueueFlags, priority: QueuePriority, family_filter: impl Fn(FamilyIndex) -> bool) -> VkResult<usize> {

        let mut candidate_families: Vec<FamilyIndex> = self.family_properties.iter().enumerate()
            .filter(|(i, family)| family.queue_flags.contains(request_queue) && family_filter(*i))
            .map(|(i, _)| i)
            .collect();

        if candidate_families.is_empty() {
            return Err(VkError::unsupported(format!("Queue with flags({:?})", request_queue)))
        }

        // stable sort, so families keep their device order within the same rank.
        candidate_families.sort_by_key(|&i| extra_capabilities(self.family_properties[i].queue_flags, request_queue));

        let selected_family = candidate_families.iter().cloned().find(|&family_index| {
            (self.cis[family_index].priorities.len() as vkuint) < self.family_properties[family_index].queue_count
        });

        let requested_index = self.queues_requested.len();

        if let Some(final_family) = selected_family {

            let queue_index = self.cis[final_family].priorities.len();
            self.cis[final_family].priorities.push(priority);
            self.queues_requested.push((final_family, queue_index));
        } else {

            // all queues are in use, share the first queue of the best candidate family.
            self.queues_requested.push((candidate_families[0], 0));
        }

        Ok(requested_index)
    }

    /// Return the (family index, queue index) pair that the request at `request_index` resolves to.
    pub fn resolved(&self, request_index: usize) -> (FamilyIndex, QueueIndex) {
        self.queues_requested[request_index]
    }

    pub fn queue_cis(&self) -> Vec<vk::DeviceQueueCreateInfo> {

        self.cis.iter().enumerate().filter_map(|(family_index, ci)| {

            if ci.priorities.is_empty() {
                None
            } else {
                let device_queue_ci = vk::DeviceQueueCreateInfo {
                    queue_family_index: family_index as _,
                    queue_count       : ci.priorities.len() as _,
                    p_queue_priorities: ci.priorities.as_ptr(),
                    ..Default::default()
                };
                Some(device_queue_ci)
            }
        }).collect()
    }

    pub fn dispatch_queue(&self, device: &ash::Device, request_index: usize) -> VkQueue {

        let (family_index, queue_index) = self.resolved(request_index);

        let handle = unsafe {
            device.get_device_queue(family_index as vkuint, queue_index as vkuint)
        };

        VkQueue {
            handle,
            family_index: family_index as _,
            queue_index : queue_index as _,
        }
    }
}

/// Count the main capabilities a family has beyond the ones requested.
fn extra_capabilities(family: vk::QueueFlags, request: vk::QueueFlags) -> u32 {

    [vk::QueueFlags::GRAPHICS, vk::QueueFlags::COMPUTE, vk::QueueFlags::TRANSFER].iter()
        .filter(|&&flag| family.contains(flag) && !request.contains(flag))
        .count() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn family(flags: vk::QueueFlags, count: vkuint) -> vk::QueueFamilyProperties {
        vk::QueueFamilyProperties {
            queue_flags: flags,
            queue_count: count,
            ..Default::default()
        }
    }

    fn typical_families() -> Vec<vk::QueueFamilyProperties> {
        vec![
            family(vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE | vk::QueueFlags::TRANSFER | vk::QueueFlags::SPARSE_BINDING, 1),
            family(vk::QueueFlags::COMPUTE | vk::QueueFlags::TRANSFER, 2),
            family(vk::QueueFlags::TRANSFER, 1),
        ]
    }

    #[test]
    fn dedicated_families_are_preferred() {

        let mut requester = QueueRequester::new(typical_families());
        let graphics = requester.request_queue(vk::QueueFlags::GRAPHICS, 1.0, |_| true).unwrap();
        let compute  = requester.request_queue(vk::QueueFlags::COMPUTE, 1.0, |_| true).unwrap();
        let transfer = requester.request_queue(vk::QueueFlags::TRANSFER, 1.0, |_| true).unwrap();

        assert_eq!(requester.resolved(graphics), (0, 0));
        assert_eq!(requester.resolved(compute), (1, 0));
        assert_eq!(requester.resolved(transfer), (2, 0));
        assert_eq!(requester.queue_cis().len(), 3);
    }

    #[test]
    fn exhausted_family_shares_queue() {

        let families = vec![family(vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE, 1)];
        let mut requester = QueueRequester::new(families);

        let graphics = requester.request_queue(vk::QueueFlags::GRAPHICS, 1.0, |_| true).unwrap();
        let compute  = requester.request_queue(vk::QueueFlags::COMPUTE, 1.0, |_| true).unwrap();

        assert_eq!(requester.resolved(graphics), requester.resolved(compute));
        let cis = requester.queue_cis();
        assert_eq!(cis.len(), 1);
        assert_eq!(cis[0].queue_count, 1);
    }

    #[test]
    fn unsupported_flags_fail() {

        let families = vec![family(vk::QueueFlags::TRANSFER, 1)];
        let mut requester = QueueRequester::new(families);
        assert!(requester.request_queue(vk::QueueFlags::GRAPHICS, 1.0, |_| true).is_err());
    }

    #[test]
    fn filter_restricts_families() {

        let mut requester = QueueRequester::new(typical_families());
        // only family 0 can present in this setup.
        let graphics = requester.request_queue(vk::QueueFlags::GRAPHICS, 1.0, |i| i == 0).unwrap();
        assert_eq!(requester.resolved(graphics).0, 0);
        assert!(requester.request_queue(vk::QueueFlags::COMPUTE, 1.0, |i| i == 5).is_err());
    }
}
