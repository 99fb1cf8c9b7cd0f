
use ash::vk;

use crate::context::VkDevice;
use crate::error::{VkResult, VkError};
use crate::{vkuint, vkbytes};

/// Search the memory types of `memories` for one allowed by `type_bits` that contains all `properties`.
pub fn find_memory_type(memories: &vk::PhysicalDeviceMemoryProperties, type_bits: vkuint, properties: vk::MemoryPropertyFlags) -> Option<vkuint> {

    (0..memories.memory_type_count).find(|&i| {
        (type_bits & (1 << i)) != 0 &&
            memories.memory_types[i as usize].property_flags.contains(properties)
    })
}

pub fn get_memory_type_index(device: &VkDevice, type_bits: vkuint, properties: vk::MemoryPropertyFlags) -> VkResult<vkuint> {

    find_memory_type(&device.phy.memories, type_bits, properties)
        .ok_or_else(|| VkError::unsupported(format!("Memory type with {:?}", properties)))
}

#[inline]
pub fn bound_to_alignment(bound_value: vkbytes, alignment: vkbytes) -> vkbytes {

    if alignment == 0 {
        return bound_value
    }
    // `!` operator will make 1 to 0 or make 0 to 1 for each bit for any integer type.
    (bound_value + alignment - 1) & !(alignment - 1)
}

/// Copy `data` to mapped memory starting at `ptr`.
///
/// The caller must make sure `ptr` points to at least `size_of_val(data)` writable bytes.
pub unsafe fn copy_to_ptr<T: Copy>(ptr: *mut u8, data: &[T]) {

    let bytes = std::mem::size_of_val(data);
    std::ptr::copy_nonoverlapping(data.as_ptr() as *const u8, ptr, bytes);
}

/// View a slice of plain data as raw bytes.
pub fn as_bytes<T: Copy>(data: &[T]) -> &[u8] {
    unsafe {
        std::slice::from_raw_parts(data.as_ptr() as *const u8, std::mem::size_of_val(data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_properties() -> vk::PhysicalDeviceMemoryProperties {

        let mut props = vk::PhysicalDeviceMemoryProperties::default();
        props.memory_type_count = 3;
        props.memory_types[0].property_flags = vk::MemoryPropertyFlags::DEVICE_LOCAL;
        props.memory_types[1].property_flags = vk::MemoryPropertyFlags::HOST_VISIBLE;
        props.memory_types[2].property_flags = vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT;
        props
    }

    #[test]
    fn memory_type_respects_type_bits() {

        let props = memory_properties();
        let host = vk::MemoryPropertyFlags::HOST_VISIBLE;

        assert_eq!(find_memory_type(&props, 0b111, host), Some(1));
        assert_eq!(find_memory_type(&props, 0b100, host), Some(2));
        assert_eq!(find_memory_type(&props, 0b001, host), None);
        assert_eq!(find_memory_type(&props, 0b111, host | vk::MemoryPropertyFlags::HOST_COHERENT), Some(2));
    }

    #[test]
    fn types_beyond_count_are_ignored() {

        let props = memory_properties();
        assert_eq!(find_memory_type(&props, 0b1000, vk::MemoryPropertyFlags::empty()), None);
    }

    #[test]
    fn alignment_rounds_up() {

        assert_eq!(bound_to_alignment(0, 256), 0);
        assert_eq!(bound_to_alignment(1, 256), 256);
        assert_eq!(bound_to_alignment(256, 256), 256);
        assert_eq!(bound_to_alignment(300, 64), 320);
        assert_eq!(bound_to_alignment(17, 0), 17);
    }

    #[test]
    fn copy_writes_every_byte() {

        let source = [1.0_f32, 2.0, 3.0];
        let mut target = [0.0_f32; 3];
        unsafe { copy_to_ptr(target.as_mut_ptr() as *mut u8, &source); }
        assert_eq!(source, target);
        assert_eq!(as_bytes(&source).len(), 12);
    }
}
