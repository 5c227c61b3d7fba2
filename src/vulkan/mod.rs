pub mod buffers;
pub mod commands;
pub mod debug;
pub mod device;
pub mod image;
pub mod instance;
pub mod physical_device;
pub mod picker;
pub mod pipeline;
pub mod queue;
pub mod renderphase;
pub mod swapchain;
pub mod sync;
