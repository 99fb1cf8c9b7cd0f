
use crate::vkchar;

use std::ffi::{CStr, CString};

/// Convert a nul-terminated `[c_char; N]` returned by vulkan to `String`, replacing invalid UTF-8 sequences.
pub fn chars2string(raw_string_array: &[vkchar]) -> String {

    chars2cstring(raw_string_array)
        .to_string_lossy()
        .into_owned()
}

pub fn chars2cstring(raw_string_array: &[vkchar]) -> CString {

    // guard against arrays without nul terminator.
    let length = raw_string_array.iter()
        .position(|&c| c == 0)
        .unwrap_or(raw_string_array.len());

    let bytes: Vec<u8> = raw_string_array[..length].iter()
        .map(|&c| c as u8)
        .collect();

    // `bytes` contains no interior nul since it stops at the first one.
    CString::new(bytes).unwrap_or_default()
}

pub fn cstrings2ptrs(raw_string_array: &[CString]) -> Vec<*const vkchar> {

    raw_string_array.iter()
        .map(|l| l.as_ptr()).collect()
}

/// Convert names like extensions or layers into `CString`s that can be handed to vulkan.
pub fn strs2cstrings<S: AsRef<str>>(names: &[S]) -> Vec<CString> {

    names.iter()
        .filter_map(|n| CString::new(n.as_ref()).ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_arrays_stop_at_nul() {

        let mut raw = [0 as vkchar; 16];
        for (i, c) in b"VK_KHR_swapchain".iter().take(15).enumerate() {
            raw[i] = *c as vkchar;
        }
        assert_eq!(chars2string(&raw), "VK_KHR_swapchai");

        let unterminated = [b'a' as vkchar, b'b' as vkchar];
        assert_eq!(chars2string(&unterminated), "ab");
    }

    #[test]
    fn cstrings_keep_pointer_order() {

        let names = strs2cstrings(&["VK_LAYER_KHRONOS_validation", "VK_EXT_debug_utils"]);
        let ptrs = cstrings2ptrs(&names);
        assert_eq!(ptrs.len(), 2);
        assert_eq!(ptrs[1], names[1].as_ptr());
    }
}
