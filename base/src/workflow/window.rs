
use ash::vk;
use raw_window_handle::{HasRawDisplayHandle, RawDisplayHandle};
use winit::dpi::PhysicalSize;
use winit::event_loop::EventLoop;
use winit::window::{Fullscreen, Window, WindowBuilder};

use crate::config::SampleConfig;
use crate::error::{VkResult, VkError};

#[derive(Debug, Clone)]
pub struct WindowConfig {

    pub title: String,
    pub mode: WindowMode,

    pub dimension: vk::Extent2D,
    pub min_dimension: Option<vk::Extent2D>,

    pub is_resizable: bool,
}

impl Default for WindowConfig {

    fn default() -> WindowConfig {

        WindowConfig {
            title: String::from("Vulkan Example"),
            mode: WindowMode::Normal,
            dimension: vk::Extent2D {
                width : 1280,
                height: 720,
            },
            min_dimension: None,
            is_resizable: true,
        }
    }
}

impl WindowConfig {

    pub fn from_sample(title: impl Into<String>, config: &SampleConfig) -> WindowConfig {

        WindowConfig {
            title: title.into(),
            mode: if config.window.fullscreen { WindowMode::Fullscreen } else { WindowMode::Normal },
            dimension: vk::Extent2D {
                width : config.window.width,
                height: config.window.height,
            },
            min_dimension: None,
            is_resizable: config.window.resizable,
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum WindowMode {
    Normal,
    Maximized,
    Fullscreen,
}

pub struct WindowContext {

    pub(crate) event_loop: Option<EventLoop<()>>,
    pub(crate) handle: Window,
}

impl WindowContext {

    pub fn new(config: WindowConfig) -> VkResult<WindowContext> {

        let event_loop = EventLoop::new();

        let mut builder = WindowBuilder::new()
            .with_title(config.title)
            .with_inner_size(PhysicalSize::new(config.dimension.width, config.dimension.height))
            .with_resizable(config.is_resizable);

        if let Some(min) = config.min_dimension {
            builder = builder.with_min_inner_size(PhysicalSize::new(min.width, min.height));
        }

        builder = match config.mode {
            | WindowMode::Maximized => {
                builder.with_maximized(true)
            },
            | WindowMode::Fullscreen => {
                builder.with_fullscreen(Some(Fullscreen::Borderless(None)))
            },
            | WindowMode::Normal => {
                builder
            },
        };

        let handle = builder.build(&event_loop)
            .map_err(|e| VkError::window(e.to_string()))?;

        let window = WindowContext { event_loop: Some(event_loop), handle };
        Ok(window)
    }

    pub fn dimension(&self) -> VkResult<vk::Extent2D> {

        let size = self.handle.inner_size();
        if size.width == 0 || size.height == 0 {
            Err(VkError::window("The window has been minimized."))
        } else {
            Ok(vk::Extent2D { width: size.width, height: size.height })
        }
    }

    pub(crate) fn display_handle(&self) -> RawDisplayHandle {
        self.handle.raw_display_handle()
    }
}
