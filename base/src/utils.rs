
pub mod memory;
pub mod frame;
pub mod time;
pub mod cast;
pub mod shaderc;
