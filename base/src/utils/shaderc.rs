
use ash::vk;

use crate::error::{VkResult, VkError};

use std::path::Path;

pub struct ShadercOptions {

    pub optimal_level   : shaderc::OptimizationLevel,
    pub debug_info      : bool,
    pub suppress_warning: bool,
    pub error_warning   : bool,
    /// target Vulkan 1.2 and SPIR-V 1.4, required by ray tracing stages.
    pub target_vulkan_1_2: bool,
}

impl Default for ShadercOptions {

    fn default() -> ShadercOptions {

        ShadercOptions {
            optimal_level    : shaderc::OptimizationLevel::Performance,
            debug_info       : cfg!(debug_assertions),
            suppress_warning : false,
            error_warning    : false,
            target_vulkan_1_2: false,
        }
    }
}

impl ShadercOptions {

    pub fn for_ray_tracing() -> ShadercOptions {
        ShadercOptions { target_vulkan_1_2: true, ..Default::default() }
    }

    fn to_shaderc_options(&self) -> VkResult<shaderc::CompileOptions> {

        // Default to compile target is vulkan and GLSL.
        let mut shaderc_options = shaderc::CompileOptions::new()
            .ok_or(VkError::shaderc("There are conflict in Shader Compile Options."))?;
        shaderc_options.set_optimization_level(self.optimal_level);

        if self.debug_info {
            shaderc_options.set_generate_debug_info();
        }
        if self.suppress_warning {
            shaderc_options.set_suppress_warnings();
        }
        if self.error_warning {
            shaderc_options.set_warnings_as_errors();
        }
        if self.target_vulkan_1_2 {
            shaderc_options.set_target_env(shaderc::TargetEnv::Vulkan, shaderc::EnvVersion::Vulkan1_2 as u32);
            shaderc_options.set_target_spirv(shaderc::SpirvVersion::V1_4);
        }

        Ok(shaderc_options)
    }
}

/// Map a single vulkan shader stage to the kind shaderc should compile.
pub fn stage_to_kind(stage: vk::ShaderStageFlags) -> VkResult<shaderc::ShaderKind> {

    let kind = match stage {
        | vk::ShaderStageFlags::VERTEX                  => shaderc::ShaderKind::Vertex,
        | vk::ShaderStageFlags::FRAGMENT                => shaderc::ShaderKind::Fragment,
        | vk::ShaderStageFlags::COMPUTE                 => shaderc::ShaderKind::Compute,
        | vk::ShaderStageFlags::GEOMETRY                => shaderc::ShaderKind::Geometry,
        | vk::ShaderStageFlags::TESSELLATION_CONTROL    => shaderc::ShaderKind::TessControl,
        | vk::ShaderStageFlags::TESSELLATION_EVALUATION => shaderc::ShaderKind::TessEvaluation,
        | vk::ShaderStageFlags::RAYGEN_KHR              => shaderc::ShaderKind::RayGeneration,
        | vk::ShaderStageFlags::MISS_KHR                => shaderc::ShaderKind::Miss,
        | vk::ShaderStageFlags::CLOSEST_HIT_KHR         => shaderc::ShaderKind::ClosestHit,
        | vk::ShaderStageFlags::ANY_HIT_KHR             => shaderc::ShaderKind::AnyHit,
        | vk::ShaderStageFlags::INTERSECTION_KHR        => shaderc::ShaderKind::Intersection,
        | _ => return Err(VkError::unsupported(format!("Shader stage {:?}", stage))),
    };
    Ok(kind)
}

pub struct VkShaderCompiler {

    compiler: shaderc::Compiler,
    options: ShadercOptions,
}

impl VkShaderCompiler {

    pub fn new() -> VkResult<VkShaderCompiler> {
        VkShaderCompiler::with_options(ShadercOptions::default())
    }

    pub fn with_options(options: ShadercOptions) -> VkResult<VkShaderCompiler> {

        let compiler = shaderc::Compiler::new()
            .ok_or(VkError::shaderc("Failed to initialize shader compiler."))?;

        let target = VkShaderCompiler { compiler, options };
        Ok(target)
    }

    pub fn compile_from_str(&mut self, source_text: &str, stage: vk::ShaderStageFlags, input_name: &str, entry_name: &str) -> VkResult<Vec<u8>> {

        let kind = stage_to_kind(stage)?;
        let compile_options = self.options.to_shaderc_options()?;

        let result = self.compiler.compile_into_spirv(source_text, kind, input_name, entry_name, Some(&compile_options))
            .map_err(|e| VkError::shaderc(format!("Failed to compile {}({})", input_name, e)))?;

        if result.get_num_warnings() > 0 {
            log::warn!("{}: {}", input_name, result.get_warning_messages());
        }

        let spirv = result.as_binary_u8().to_owned();
        Ok(spirv)
    }

    pub fn compile_from_path(&mut self, path: impl AsRef<Path>, stage: vk::ShaderStageFlags, entry_name: &str) -> VkResult<Vec<u8>> {

        let path = path.as_ref();
        let source_text = std::fs::read_to_string(path)
            .map_err(|_| VkError::path(path))?;
        let input_name = path.file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("shader");

        log::debug!("Compiling shader {}.", path.display());
        self.compile_from_str(&source_text, stage, input_name, entry_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stages_map_to_shader_kind() {

        assert_eq!(stage_to_kind(vk::ShaderStageFlags::VERTEX).unwrap(), shaderc::ShaderKind::Vertex);
        assert_eq!(stage_to_kind(vk::ShaderStageFlags::TESSELLATION_CONTROL).unwrap(), shaderc::ShaderKind::TessControl);
        assert_eq!(stage_to_kind(vk::ShaderStageFlags::RAYGEN_KHR).unwrap(), shaderc::ShaderKind::RayGeneration);
        assert_eq!(stage_to_kind(vk::ShaderStageFlags::CLOSEST_HIT_KHR).unwrap(), shaderc::ShaderKind::ClosestHit);
    }

    #[test]
    fn combined_stages_are_rejected() {

        let combined = vk::ShaderStageFlags::VERTEX | vk::ShaderStageFlags::FRAGMENT;
        assert!(stage_to_kind(combined).is_err());
    }

    #[test]
    fn missing_source_reports_path() {

        let mut compiler = match VkShaderCompiler::new() {
            | Ok(compiler) => compiler,
            // shaderc could not be initialized in this environment.
            | Err(_) => return,
        };
        let error = compiler.compile_from_path("not/exist.vert.glsl", vk::ShaderStageFlags::VERTEX, "main").unwrap_err();
        match error.kind() {
            | crate::VkErrorKind::Path { .. } => {},
            | other => panic!("unexpected error kind: {:?}", other),
        }
    }
}
