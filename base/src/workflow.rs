
pub use self::window::{WindowContext, WindowConfig, WindowMode};
pub use self::loops::ProcPipeline;
pub use self::fps::{FpsCounter, BenchmarkRecorder, BenchmarkReport};

mod window;
mod loops;
mod fps;

use ash::vk;

use crate::context::{VkDevice, VkSwapchain};
use crate::input::InputController;
use crate::utils::frame::FrameAction;
use crate::error::VkResult;

/// The callbacks a sample implements to be driven by `ProcPipeline`.
pub trait RenderWorkflow {

    fn init(&mut self, _device: &VkDevice) -> VkResult<()> {
        Ok(())
    }

    /// Record or submit the work of one frame.
    ///
    /// `device_available` must be signaled by the submission, `image_available` is signaled when
    /// the swapchain image at `image_index` can be written. Return the semaphore to wait before presenting.
    fn render_frame(&mut self, device: &VkDevice, device_available: vk::Fence, image_available: vk::Semaphore, image_index: usize, delta_time: f32) -> VkResult<vk::Semaphore>;

    fn swapchain_reload(&mut self, _device: &VkDevice, _new_chain: &VkSwapchain) -> VkResult<()> {
        Ok(())
    }

    fn receive_input(&mut self, inputer: &InputController, delta_time: f32) -> FrameAction;

    fn deinit(&mut self, device: &VkDevice) -> VkResult<()>;
}
