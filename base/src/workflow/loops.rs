
use ash::vk;
use winit::event::{Event, WindowEvent, KeyboardInput, VirtualKeyCode, ElementState};
use winit::event_loop::ControlFlow;
use winit::platform::run_return::EventLoopExtRunReturn;

use crate::config::BenchmarkSection;
use crate::context::{VulkanContext, VkDevice, SwapchainSyncError, VkObjectWaitable};
use crate::workflow::{RenderWorkflow, FpsCounter, BenchmarkRecorder};
use crate::workflow::window::WindowContext;
use crate::input::InputController;
use crate::utils::time::{VkTimeDuration, FrameTimer};
use crate::utils::frame::{FrameCounter, FrameAction};
use crate::error::{VkResult, VkError};

/// Drives a `RenderWorkflow` with the window events and the swapchain.
pub struct ProcPipeline {

    window: WindowContext,
    vulkan: VulkanContext,

    syncs: SyncResource,

    frame_counter: FrameCounter,
    benchmark: Option<BenchmarkRecorder>,
}

/// The state shared between frames of the event loop.
struct LoopState {

    inputer: InputController,
    timer: FrameTimer,
    fps_counter: FpsCounter,
    is_minimized: bool,
    result: VkResult<()>,
}

impl ProcPipeline {

    pub fn new(window: WindowContext, vulkan: VulkanContext) -> VkResult<ProcPipeline> {

        let frame_in_flight = vulkan.swapchain.frame_in_flight();
        let syncs = SyncResource::new(&vulkan.device, frame_in_flight)?;
        let frame_counter = FrameCounter::new(frame_in_flight);

        let target = ProcPipeline { window, vulkan, syncs, frame_counter, benchmark: None };
        Ok(target)
    }

    /// Render a fixed count of frames, print timing statistics and then exit.
    pub fn with_benchmark(mut self, config: &BenchmarkSection) -> ProcPipeline {

        if config.enabled {
            log::info!("Benchmark mode: {} warm-up frames, {} measured frames.", config.warmup_frames, config.frames);
            self.benchmark = Some(BenchmarkRecorder::new(config.warmup_frames, config.frames));
        }
        self
    }

    pub fn frame_in_flight(&self) -> usize {
        self.vulkan.swapchain.frame_in_flight()
    }

    pub fn launch(mut self, mut app: impl RenderWorkflow) -> VkResult<()> {

        app.init(&self.vulkan.device)?;

        let loop_result = self.main_loop(&mut app);

        self.vulkan.wait_idle()?;
        app.deinit(&self.vulkan.device)?;
        // free the sample specific resource.
        drop(app);
        // and then free vulkan context resource.
        self.syncs.discard(&self.vulkan.device);
        self.vulkan.discard();

        if let Some(ref benchmark) = self.benchmark {
            match benchmark.report() {
                | Some(report) => log::info!(
                    "Benchmark: {} frames, average {:.3} ms ({:.1} fps), min {:.3} ms, max {:.3} ms.",
                    report.frames, report.average_ms, report.fps, report.min_ms, report.max_ms),
                | None => log::warn!("Benchmark finished before any frame was measured."),
            }
        }

        loop_result
    }

    fn main_loop(&mut self, app: &mut impl RenderWorkflow) -> VkResult<()> {

        let mut event_loop = self.window.event_loop.take()
            .ok_or(VkError::window("The event loop has been consumed."))?;

        let mut state = LoopState {
            inputer: InputController::default(),
            timer: FrameTimer::new(),
            fps_counter: FpsCounter::new(),
            is_minimized: false,
            result: Ok(()),
        };

        event_loop.run_return(|event, _, control_flow| {

            control_flow.set_poll();

            match event {
                | Event::WindowEvent { event, .. } => match event {
                    | WindowEvent::CloseRequested => {
                        self.frame_counter.set_action(FrameAction::Terminal);
                    },
                    | WindowEvent::KeyboardInput { input: KeyboardInput { virtual_keycode: Some(code), state: key_state, .. }, .. } => {
                        if code == VirtualKeyCode::Escape && key_state == ElementState::Pressed {
                            self.frame_counter.set_action(FrameAction::Terminal);
                        } else {
                            state.inputer.record_key(code, key_state);
                        }
                    },
                    | WindowEvent::Resized(size) => {
                        state.is_minimized = size.width == 0 || size.height == 0;

                        let current = self.vulkan.swapchain.dimension;
                        if !state.is_minimized && (size.width != current.width || size.height != current.height) {
                            self.frame_counter.set_action(FrameAction::SwapchainRecreate);
                        }
                    },
                    | _ => {},
                },
                | Event::MainEventsCleared => {

                    if let Err(e) = self.tick_frame(app, &mut state) {
                        state.result = Err(e);
                        self.frame_counter.set_action(FrameAction::Terminal);
                    }

                    if self.frame_counter.current_action() == FrameAction::Terminal {
                        control_flow.set_exit();
                    }
                },
                | _ => {},
            }
        });

        self.window.event_loop = Some(event_loop);
        state.result
    }

    fn tick_frame(&mut self, app: &mut impl RenderWorkflow, state: &mut LoopState) -> VkResult<()> {

        let delta_time = state.timer.tick();

        let input_feedback = app.receive_input(&state.inputer, delta_time);
        self.frame_counter.set_action(input_feedback);
        state.inputer.tick_frame();

        if self.frame_counter.current_action() == FrameAction::SwapchainRecreate {
            self.recreate_swapchain(app)?;
            self.frame_counter.set_action(FrameAction::Rendering);
        }

        if self.frame_counter.current_action() == FrameAction::Terminal || state.is_minimized {
            return Ok(())
        }

        let render_feedback = self.render_frame(app, delta_time)?;
        self.frame_counter.set_action(render_feedback);

        state.fps_counter.tick_frame(delta_time);
        if self.frame_counter.total_frames() % 600 == 599 {
            log::debug!("{:.1} fps ({:.3} ms/frame).", state.fps_counter.fps(), state.fps_counter.frame_time() * 1000.0);
        }

        if let Some(ref mut benchmark) = self.benchmark {
            if benchmark.record(delta_time) {
                self.frame_counter.set_action(FrameAction::Terminal);
            }
        }

        self.frame_counter.next_frame();
        Ok(())
    }

    fn recreate_swapchain(&mut self, app: &mut impl RenderWorkflow) -> VkResult<()> {

        self.vulkan.wait_idle()?;
        self.vulkan.recreate_swapchain(&self.window)?;
        app.swapchain_reload(&self.vulkan.device, &self.vulkan.swapchain)?;

        let frame_in_flight = self.vulkan.swapchain.frame_in_flight();
        if frame_in_flight != self.syncs.frame_count {
            self.syncs.reset(&self.vulkan.device, frame_in_flight)?;
            self.frame_counter = FrameCounter::new(frame_in_flight);
        }

        log::debug!("Swapchain recreated with dimension {}x{}.",
            self.vulkan.swapchain.dimension.width, self.vulkan.swapchain.dimension.height);
        Ok(())
    }

    fn render_frame(&mut self, app: &mut impl RenderWorkflow, delta_time: f32) -> VkResult<FrameAction> {

        // wait and acquire next image. -------------------------------------
        let fence_ready = self.syncs.sync_fences[self.frame_counter.current_frame()];
        let await_present = self.syncs.await_present[self.frame_counter.current_frame()];
        fence_ready.wait(&self.vulkan.device, VkTimeDuration::Infinite)?;

        let acquire_image_index = match self.vulkan.swapchain.next_image(Some(await_present), None) {
            | Ok(image_index) => image_index,
            | Err(e) => match e {
                | SwapchainSyncError::SurfaceOutDate
                | SwapchainSyncError::SubOptimal => {
                    return Ok(FrameAction::SwapchainRecreate)
                },
                | SwapchainSyncError::TimeOut
                | SwapchainSyncError::Unknown => {
                    return Err(VkError::other(e.to_string()))
                },
            }
        };

        unsafe {
            self.vulkan.device.logic.handle.reset_fences(&[fence_ready])
                .map_err(|_| VkError::device("Fence Resetting"))?;
        }
        // ------------------------------------------------------------------

        // call command buffer(activate pipeline to draw) -------------------
        let await_render = app.render_frame(&self.vulkan.device, fence_ready, await_present, acquire_image_index as _, delta_time)?;
        // ------------------------------------------------------------------

        // present image. ---------------------------------------------------
        match self.vulkan.swapchain.present(&[await_render], acquire_image_index) {
            | Ok(_) => {},
            | Err(e) => match e {
                | SwapchainSyncError::SurfaceOutDate
                | SwapchainSyncError::SubOptimal => {
                    return Ok(FrameAction::SwapchainRecreate)
                },
                | SwapchainSyncError::TimeOut
                | SwapchainSyncError::Unknown => {
                    return Err(VkError::other(e.to_string()))
                },
            },
        }
        // ------------------------------------------------------------------

        Ok(FrameAction::Rendering)
    }
}

/// One acquire semaphore and one fence for each frame in flight.
struct SyncResource {

    frame_count: usize,

    await_present: Vec<vk::Semaphore>,
    sync_fences  : Vec<vk::Fence>,
}

impl SyncResource {

    fn new(device: &VkDevice, frame_count: usize) -> VkResult<SyncResource> {

        use crate::ci::sync::{SemaphoreCI, FenceCI};

        let semaphore_ci = SemaphoreCI::new();
        let fence_ci = FenceCI::new(true);

        let mut await_present = Vec::with_capacity(frame_count);
        let mut sync_fences = Vec::with_capacity(frame_count);

        for _ in 0..frame_count {
            await_present.push(device.build(&semaphore_ci)?);
            sync_fences.push(device.build(&fence_ci)?);
        }

        let syncs = SyncResource { frame_count, await_present, sync_fences };
        Ok(syncs)
    }

    fn reset(&mut self, device: &VkDevice, frame_count: usize) -> VkResult<()> {

        self.discard(device);
        *self = SyncResource::new(device, frame_count)?;

        Ok(())
    }

    fn discard(&mut self, device: &VkDevice) {

        device.discard(&self.await_present);
        device.discard(&self.sync_fences);

        self.await_present.clear();
        self.sync_fences.clear();
    }
}
