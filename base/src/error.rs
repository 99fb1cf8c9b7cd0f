
use ash::vk;
use failure::{Backtrace, Context, Fail};

use std::fmt;
use std::path::{Path, PathBuf};

pub type VkResult<T> = Result<T, VkError>;

/// Error of every fallible operation in the framework and the samples.
///
/// Use `kind` to inspect what failed, `Display` prints a one line description.
#[derive(Debug)]
pub struct VkError {
    ctx: Context<VkErrorKind>,
}

#[derive(Debug, Fail)]
pub enum VkErrorKind {

    /// The application could not be connected to the Vulkan loader or the platform.
    #[fail(display = "Unable to link {} with Vulkan.", target_name)]
    Unlink { target_name: &'static str },
    #[fail(display = "Unable to query {} from the device.", query_target)]
    Query { query_target: &'static str },
    #[fail(display = "Failed to create {}.", create_target)]
    Create { create_target: &'static str },
    /// A required extension, feature, format or queue is not available.
    #[fail(display = "{} is not supported by the selected device.", feature)]
    UnSupport { feature: String },
    #[fail(display = "Device operation failed: {}", ops_description)]
    Device { ops_description: &'static str },
    #[fail(display = "Shader compilation failed: {}.", compile_message)]
    Shaderc { compile_message: String },
    #[fail(display = "Window error: {}.", description)]
    Window { description: String },
    #[fail(display = "Invalid configuration: {}.", description)]
    Config { description: String },
    #[fail(display = "Unable to access file {:?}.", path)]
    Path { path: PathBuf },
    #[fail(display = "Vma operation failed: {}.", _0)]
    Vma(vk::Result),
    #[fail(display = "{}", description)]
    Other { description: String },
}

impl VkError {

    pub fn kind(&self) -> &VkErrorKind {
        self.ctx.get_context()
    }

    pub fn unlink(target_name: &'static str) -> VkError {
        VkErrorKind::Unlink { target_name }.into()
    }

    pub fn query(query_target: &'static str) -> VkError {
        VkErrorKind::Query { query_target }.into()
    }

    pub fn create(create_target: &'static str) -> VkError {
        VkErrorKind::Create { create_target }.into()
    }

    pub fn unsupported(feature: impl AsRef<str>) -> VkError {
        VkErrorKind::UnSupport { feature: feature.as_ref().to_owned() }.into()
    }

    pub fn device(ops_description: &'static str) -> VkError {
        VkErrorKind::Device { ops_description }.into()
    }

    pub fn shaderc(compile_message: impl AsRef<str>) -> VkError {
        VkErrorKind::Shaderc { compile_message: compile_message.as_ref().to_owned() }.into()
    }

    pub(crate) fn window(description: impl AsRef<str>) -> VkError {
        VkErrorKind::Window { description: description.as_ref().to_owned() }.into()
    }

    pub(crate) fn config(description: impl AsRef<str>) -> VkError {
        VkErrorKind::Config { description: description.as_ref().to_owned() }.into()
    }

    pub fn path(path: impl AsRef<Path>) -> VkError {
        VkErrorKind::Path { path: path.as_ref().to_path_buf() }.into()
    }

    pub fn other(description: impl AsRef<str>) -> VkError {
        VkErrorKind::Other { description: description.as_ref().to_owned() }.into()
    }
}

impl Fail for VkError {

    fn cause(&self) -> Option<&dyn Fail> {
        self.ctx.cause()
    }

    fn backtrace(&self) -> Option<&Backtrace> {
        self.ctx.backtrace()
    }
}

impl fmt::Display for VkError {

    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(&self.ctx, f)
    }
}

impl From<VkErrorKind> for VkError {

    fn from(kind: VkErrorKind) -> VkError {
        VkError { ctx: Context::new(kind) }
    }
}

impl From<Context<VkErrorKind>> for VkError {

    fn from(ctx: Context<VkErrorKind>) -> VkError {
        VkError { ctx }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kind_is_preserved() {

        let error = VkError::create("Pipeline");
        match error.kind() {
            | VkErrorKind::Create { create_target } => assert_eq!(*create_target, "Pipeline"),
            | other => panic!("unexpected error kind: {:?}", other),
        }
        assert_eq!(error.to_string(), "Failed to create Pipeline.");
    }

    #[test]
    fn vma_errors_convert_through_kind() {

        let error: VkError = VkErrorKind::Vma(vk::Result::ERROR_OUT_OF_DEVICE_MEMORY).into();
        assert!(error.to_string().starts_with("Vma operation failed"));
    }
}
