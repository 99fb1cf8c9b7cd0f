//! Typed recording of command buffers.
//!
//! `VkCmdRecorder<T>` is parameterized by the kind of work it records, which decides the pipeline
//! bind point and the set of commands available on it.

pub use self::recorder::VkCmdRecorder;
pub use self::graphics::{IGraphics, CmdGraphicsApi};
pub use self::compute::{ICompute, CmdComputeApi};
pub use self::transfer::{ITransfer, CmdTransferApi};
pub use self::raytracing::{IRayTracing, CmdRayTracingApi, ShaderBindingRegions};

mod recorder;
mod graphics;
mod compute;
mod transfer;
mod raytracing;

use ash::vk;

use crate::ci::command::CommandBufferAI;
use crate::ci::VkObjectBuildableCI;
use crate::context::VkDevice;
use crate::error::{VkResult, VkError};

pub trait VkCommandType {
    const BIND_POINT: vk::PipelineBindPoint;
}

/// Allocate a temporary command buffer from `pool`, record it by `recording`,
/// then submit it to `queue` and block until the GPU finishes it.
pub fn record_once<F>(device: &VkDevice, pool: vk::CommandPool, queue: vk::Queue, recording: F) -> VkResult<()>
    where
        F: FnOnce(&VkCmdRecorder<ITransfer>) -> VkResult<()> {

    let command = CommandBufferAI::new(pool, 1)
        .build(device)?
        .into_iter().next()
        .ok_or(VkError::create("Command Buffers"))?;

    let mut recorder: VkCmdRecorder<ITransfer> = VkCmdRecorder::new(device, command);
    recorder.set_usage(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);

    let result = recorder.begin_record()
        .and_then(|recorder| recording(recorder))
        .and_then(|_| recorder.end_record())
        .and_then(|_| recorder.flush_copy_command(queue));

    device.free(command, pool);
    result
}
