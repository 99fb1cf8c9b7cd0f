//!
//! Vulkan Example - Deferred shading
//!
//! The scene is rendered to a G-buffer of world position, normal and albedo attachments first,
//! then a full screen pass lights every pixel with six animated point lights.
//! Press D to cycle through the G-buffer attachments and Space to pause the lights.
//!

mod data;
mod example;

const WINDOW_TITLE: &'static str = "Vulkan Example - Deferred shading";

fn main() {
    vksamples::run_sample(WINDOW_TITLE, |builder| builder, |context, _config| example::VulkanExample::new(context));
}
