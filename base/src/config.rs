//! Sample configuration shared by every binary.
//!
//! Values are layered: built-in defaults, then an optional TOML file, then command line flags.

use serde::Deserialize;
use clap::Parser;

use crate::error::{VkResult, VkError};

use std::path::{Path, PathBuf};

/// Root configuration of a sample.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SampleConfig {

    pub window: WindowSection,
    pub graphics: GraphicsSection,
    pub benchmark: BenchmarkSection,
    pub log_level: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WindowSection {

    pub width : u32,
    pub height: u32,
    pub fullscreen: bool,
    pub resizable : bool,
}

impl Default for WindowSection {

    fn default() -> WindowSection {
        WindowSection {
            width : 1280,
            height: 720,
            fullscreen: false,
            resizable : true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GraphicsSection {

    /// wait for vertical blank before presenting.
    pub vsync: bool,
    /// enable the khronos validation layer and the debug utils messenger.
    pub validation: bool,
    /// force the index of physical device to use.
    pub gpu_index: Option<usize>,
}

impl Default for GraphicsSection {

    fn default() -> GraphicsSection {
        GraphicsSection {
            vsync: false,
            validation: cfg!(debug_assertions),
            gpu_index: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BenchmarkSection {

    pub enabled: bool,
    pub warmup_frames: u32,
    pub frames: u32,
}

impl Default for BenchmarkSection {

    fn default() -> BenchmarkSection {
        BenchmarkSection {
            enabled: false,
            warmup_frames: 60,
            frames: 600,
        }
    }
}

/// Command line flags understood by every sample.
#[derive(Debug, Clone, Default, Parser)]
#[command(about = "Vulkan sample")]
pub struct SampleArgs {

    /// Path to a TOML configuration file.
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Window width in pixels.
    #[arg(long)]
    pub width: Option<u32>,
    /// Window height in pixels.
    #[arg(long)]
    pub height: Option<u32>,
    /// Start in fullscreen mode.
    #[arg(long)]
    pub fullscreen: bool,
    /// Enable v-sync.
    #[arg(long)]
    pub vsync: bool,
    /// Disable v-sync, even if the configuration file enables it.
    #[arg(long, conflicts_with = "vsync")]
    pub no_vsync: bool,
    /// Enable validation layers.
    #[arg(long)]
    pub validation: bool,
    /// Disable validation layers, which are enabled by default in debug builds.
    #[arg(long, conflicts_with = "validation")]
    pub no_validation: bool,
    /// Index of the physical device to use.
    #[arg(long = "gpu")]
    pub gpu_index: Option<usize>,
    /// Run in benchmark mode and exit when done.
    #[arg(long, short = 'b')]
    pub benchmark: bool,
    /// Number of measured frames in benchmark mode.
    #[arg(long)]
    pub benchmark_frames: Option<u32>,
    /// Log level filter(error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,
}

impl SampleConfig {

    /// Parse the command line of current process and resolve the final configuration.
    pub fn from_command_line() -> VkResult<SampleConfig> {
        SampleConfig::resolve(SampleArgs::parse())
    }

    pub fn resolve(args: SampleArgs) -> VkResult<SampleConfig> {

        let base = match args.config {
            | Some(ref path) => SampleConfig::load_file(path)?,
            | None => SampleConfig::default(),
        };

        Ok(base.override_by(&args))
    }

    pub fn load_file(path: impl AsRef<Path>) -> VkResult<SampleConfig> {

        let source = std::fs::read_to_string(path.as_ref())
            .map_err(|_| VkError::path(path.as_ref()))?;
        SampleConfig::parse_toml(&source)
    }

    pub fn parse_toml(source: &str) -> VkResult<SampleConfig> {

        toml::from_str(source)
            .map_err(|e| VkError::config(e.to_string()))
    }

    fn override_by(mut self, args: &SampleArgs) -> SampleConfig {

        if let Some(width) = args.width {
            self.window.width = width;
        }
        if let Some(height) = args.height {
            self.window.height = height;
        }
        if let Some(index) = args.gpu_index {
            self.graphics.gpu_index = Some(index);
        }
        if let Some(frames) = args.benchmark_frames {
            self.benchmark.frames = frames;
        }
        if let Some(ref level) = args.log_level {
            self.log_level = Some(level.clone());
        }

        self.window.fullscreen |= args.fullscreen;
        self.benchmark.enabled |= args.benchmark;
        if let Some(vsync) = switch(args.vsync, args.no_vsync) {
            self.graphics.vsync = vsync;
        }
        if let Some(validation) = switch(args.validation, args.no_validation) {
            self.graphics.validation = validation;
        }

        self
    }
}

/// The state requested by a `--x`/`--no-x` pair of flags, `None` if neither is given.
fn switch(on: bool, off: bool) -> Option<bool> {
    match (on, off) {
        | (true, _) => Some(true),
        | (false, true) => Some(false),
        | (false, false) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_sections_fall_back_to_defaults() {

        let config = SampleConfig::parse_toml("[window]\nwidth = 800\n").unwrap();
        assert_eq!(config.window.width, 800);
        assert_eq!(config.window.height, 720);
        assert_eq!(config.benchmark.frames, 600);
        assert!(config.log_level.is_none());
    }

    #[test]
    fn command_line_overrides_file() {

        let file = SampleConfig::parse_toml(r#"
            log_level = "warn"
            [window]
            width = 800
            height = 600
            [benchmark]
            frames = 100
        "#).unwrap();

        let args = SampleArgs {
            height: Some(1080),
            benchmark: true,
            benchmark_frames: Some(10),
            ..SampleArgs::default()
        };

        let config = file.override_by(&args);
        assert_eq!(config.window.width, 800);
        assert_eq!(config.window.height, 1080);
        assert!(config.benchmark.enabled);
        assert_eq!(config.benchmark.frames, 10);
        assert_eq!(config.log_level.as_deref(), Some("warn"));
    }

    #[test]
    fn malformed_file_is_a_config_error() {

        let error = SampleConfig::parse_toml("[window]\nwidth = \"wide\"").unwrap_err();
        match error.kind() {
            | crate::VkErrorKind::Config { .. } => {},
            | other => panic!("unexpected error kind: {:?}", other),
        }
    }

    #[test]
    fn validation_can_be_turned_off() {

        let file = SampleConfig::parse_toml("[graphics]\nvalidation = true\nvsync = true\n").unwrap();

        let args = SampleArgs::try_parse_from(&["sample", "--no-validation"]).unwrap();
        let config = file.clone().override_by(&args);
        assert!(!config.graphics.validation);
        assert!(config.graphics.vsync);

        let args = SampleArgs::try_parse_from(&["sample", "--no-vsync"]).unwrap();
        let config = file.override_by(&args);
        assert!(config.graphics.validation);
        assert!(!config.graphics.vsync);

        let mut defaults = SampleConfig::default();
        defaults.graphics.validation = true;
        let config = defaults.override_by(&SampleArgs::try_parse_from(&["sample", "--no-validation"]).unwrap());
        assert!(!config.graphics.validation);

        assert!(SampleArgs::try_parse_from(&["sample", "--validation", "--no-validation"]).is_err());
    }

    #[test]
    fn flags_parse_from_command_line() {

        let args = SampleArgs::try_parse_from(&["sample", "--width", "640", "--gpu", "1", "-b"]).unwrap();
        assert_eq!(args.width, Some(640));
        assert_eq!(args.gpu_index, Some(1));
        assert!(args.benchmark);
    }
}
