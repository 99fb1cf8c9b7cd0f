
use ash::vk;

use crate::context::{VkDevice, VkObjectDiscardable};
use crate::ci::{VulkanCI, VkObjectBuildableCI};
use crate::utils::shaderc::VkShaderCompiler;
use crate::error::{VkResult, VkError};
use crate::vkuint;

use std::io::Cursor;
use std::ptr;

// ---------------------------------------------------------------------------------------------------
/// Wrapper class for `vk::ShaderModuleCreateInfo`.
#[derive(Debug, Clone)]
pub struct ShaderModuleCI {

    inner: vk::ShaderModuleCreateInfo,
    codes: Vec<u32>,
}

impl VulkanCI<vk::ShaderModuleCreateInfo> for ShaderModuleCI {

    fn default_ci() -> vk::ShaderModuleCreateInfo {
        vk::ShaderModuleCreateInfo::default()
    }
}

impl VkObjectBuildableCI for ShaderModuleCI {
    type ObjectType = vk::ShaderModule;

    fn build(&self, device: &VkDevice) -> VkResult<Self::ObjectType> {
        self.build_by(&device.logic.handle)
    }
}

impl ShaderModuleCI {

    /// `spirv` is the binary produced by a shader compiler.
    pub fn new(spirv: &[u8]) -> VkResult<ShaderModuleCI> {

        let codes = ash::util::read_spv(&mut Cursor::new(spirv))
            .map_err(|_| VkError::other("Invalid SPIR-V binary."))?;

        let module_ci = ShaderModuleCI {
            inner: ShaderModuleCI::default_ci(),
            codes,
        };
        Ok(module_ci)
    }

    /// Compile GLSL source text and wrap the result.
    pub fn from_glsl(compiler: &mut VkShaderCompiler, stage: vk::ShaderStageFlags, source: &str, tag_name: &str) -> VkResult<ShaderModuleCI> {

        let spirv = compiler.compile_from_str(source, stage, tag_name, "main")?;
        ShaderModuleCI::new(&spirv)
    }

    /// Create the module with a raw device, for threads that do not own the `VkDevice`.
    pub fn build_by(&self, device: &ash::Device) -> VkResult<vk::ShaderModule> {

        let module_ci = vk::ShaderModuleCreateInfo {
            code_size: self.codes.len() * ::std::mem::size_of::<u32>(),
            p_code   : self.codes.as_ptr(),
            ..self.inner
        };

        let module = unsafe {
            device.create_shader_module(&module_ci, None)
                .map_err(|_| VkError::create("Shader Module"))?
        };
        Ok(module)
    }
}

impl VkObjectDiscardable for vk::ShaderModule {

    fn discard_by(self, device: &VkDevice) {
        unsafe {
            device.logic.handle.destroy_shader_module(self, None);
        }
    }
}
// ---------------------------------------------------------------------------------------------------

// ---------------------------------------------------------------------------------------------------
/// Wrapper class for `vk::SpecializationInfo`.
#[derive(Debug, Clone)]
pub struct SpecializationCI {

    inner: vk::SpecializationInfo,
    entries: Vec<vk::SpecializationMapEntry>,
    data: Vec<u8>,
}

impl VulkanCI<vk::SpecializationInfo> for SpecializationCI {

    fn default_ci() -> vk::SpecializationInfo {
        vk::SpecializationInfo::default()
    }
}

impl SpecializationCI {

    pub fn new() -> SpecializationCI {

        SpecializationCI {
            inner: SpecializationCI::default_ci(),
            entries: Vec::new(),
            data: Vec::new(),
        }
    }

    /// Append the value of the specialization constant with `constant_id`.
    pub fn add_constant<T: Copy>(mut self, constant_id: vkuint, value: T) -> SpecializationCI {

        let offset = self.data.len();
        let size = ::std::mem::size_of::<T>();

        self.data.extend_from_slice(crate::utils::memory::as_bytes(&[value]));
        self.entries.push(vk::SpecializationMapEntry {
            constant_id,
            offset: offset as _,
            size,
        });
        self
    }

    pub fn value(&self) -> vk::SpecializationInfo {

        vk::SpecializationInfo {
            map_entry_count: self.entries.len() as _,
            p_map_entries  : self.entries.as_ptr(),
            data_size      : self.data.len(),
            p_data         : self.data.as_ptr() as _,
            ..self.inner
        }
    }
}
// ---------------------------------------------------------------------------------------------------

// ---------------------------------------------------------------------------------------------------
const DEFAULT_ENTRY: &[u8] = b"main\0";

/// Wrapper class for `vk::PipelineShaderStageCreateInfo`.
#[derive(Debug)]
pub struct ShaderStageCI {

    inner: vk::PipelineShaderStageCreateInfo,

    specialization: Option<Box<(SpecializationCI, vk::SpecializationInfo)>>,
}

impl Clone for ShaderStageCI {

    fn clone(&self) -> ShaderStageCI {

        let stage = ShaderStageCI {
            inner: self.inner,
            specialization: None,
        };

        // the raw specialization info must point into the arrays of the new copy.
        match self.specialization {
            | Some(ref pair) => stage.specialization(pair.0.clone()),
            | None => stage,
        }
    }
}

impl VulkanCI<vk::PipelineShaderStageCreateInfo> for ShaderStageCI {

    fn default_ci() -> vk::PipelineShaderStageCreateInfo {
        vk::PipelineShaderStageCreateInfo::default()
    }
}

impl ShaderStageCI {

    pub fn new(stage: vk::ShaderStageFlags, module: vk::ShaderModule) -> ShaderStageCI {

        ShaderStageCI {
            inner: vk::PipelineShaderStageCreateInfo {
                stage, module,
                ..ShaderStageCI::default_ci()
            },
            specialization: None,
        }
    }

    #[inline(always)]
    pub fn flags(mut self, flags: vk::PipelineShaderStageCreateFlags) -> ShaderStageCI {
        self.inner.flags = flags; self
    }

    pub fn specialization(mut self, info: SpecializationCI) -> ShaderStageCI {

        let mut pair = Box::new((info, vk::SpecializationInfo::default()));
        pair.1 = pair.0.value();
        self.specialization = Some(pair); self
    }

    #[inline(always)]
    pub fn stage(&self) -> vk::ShaderStageFlags {
        self.inner.stage
    }

    pub fn value(&self) -> vk::PipelineShaderStageCreateInfo {

        let specialization = self.specialization.as_ref()
            .map(|pair| &pair.1 as *const vk::SpecializationInfo)
            .unwrap_or(ptr::null());

        vk::PipelineShaderStageCreateInfo {
            p_name: DEFAULT_ENTRY.as_ptr() as *const _,
            p_specialization_info: specialization,
            ..self.inner
        }
    }
}
// ---------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn specialization_constants_are_packed() {

        let info = SpecializationCI::new()
            .add_constant(0, 2_u32)
            .add_constant(1, 0.5_f32);

        let raw = info.value();
        assert_eq!(raw.map_entry_count, 2);
        assert_eq!(raw.data_size, 8);
        assert_eq!(info.entries[1].offset, 4);
    }

    #[test]
    fn stage_points_to_boxed_specialization() {

        let stage = ShaderStageCI::new(vk::ShaderStageFlags::FRAGMENT, vk::ShaderModule::null())
            .specialization(SpecializationCI::new().add_constant(0, 1_u32));
        let moved = stage.clone();
        drop(stage);

        let raw = moved.value();
        assert!(!raw.p_specialization_info.is_null());
        assert_eq!(unsafe { (*raw.p_specialization_info).map_entry_count }, 1);
    }

    #[test]
    fn misaligned_spirv_is_rejected() {
        assert!(ShaderModuleCI::new(&[0x03, 0x02, 0x23]).is_err());
    }
}
