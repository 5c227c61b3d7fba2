use std::os::raw::c_void;

use vulkanalia::prelude::v1_0::*;

use crate::camera::Camera;
use crate::config::Msaa;
use crate::id_allocator::IdAllocator;
use crate::vulkan::pipeline::PipelineLibrary;
use crate::vulkan::renderphase::RenderphaseTag;

/// Everything a render/UI callback needs to draw through the sprite API
/// for one phase recording, bundled instead of passed as the separate
/// `(context, timestep)` / `(context, commandBuffer)` pairs the original C
/// facade used — idiomatic Rust prefers one borrowed struct over two
/// positional args whose meaning depends on which callback receives them.
pub struct RenderContext<'a> {
    pub device: &'a Device,
    pub command_buffer: vk::CommandBuffer,
    pub pipeline_library: &'a PipelineLibrary,
    pub phase: RenderphaseTag,
    pub frame: usize,
    pub timestep: f32,
    pub user_data: *mut c_void,
}

pub type RenderCallback = unsafe fn(&RenderContext);
pub type UiRenderCallback = unsafe fn(&RenderContext);

/// The process-wide engine state that is not GPU-resident: callbacks, the
/// frozen config flags, the size/minimized/resize bookkeeping, the main
/// camera, and the id allocator. Spec §3 Data Model "Engine Context".
pub struct EngineContext {
    pub render_callback: Option<RenderCallback>,
    pub ui_render_callback: Option<UiRenderCallback>,
    pub user_data: *mut c_void,

    vsync: bool,
    viewport_enabled: bool,
    msaa: Msaa,

    viewport_logical_size: (u32, u32),
    framebuffer_size: (u32, u32),
    pub(crate) minimized: bool,
    pub(crate) resize_pending: bool,

    pub main_camera: Camera,
    pub id_allocator: IdAllocator,
}

/// Below this, a dimension is treated as zero for the purposes of the
/// minimized flag — matches the boundary behavior in spec §8 ("width = 0
/// or height = 0 => minimized asserted").
const MINIMIZED_EPSILON: u32 = 0;

impl EngineContext {
    pub fn new(
        width: u32,
        height: u32,
        msaa: Msaa,
        vsync: bool,
        viewport_enabled: bool,
    ) -> Self {
        let aspect = width as f32 / height.max(1) as f32;
        Self {
            render_callback: None,
            ui_render_callback: None,
            user_data: std::ptr::null_mut(),
            vsync,
            viewport_enabled,
            msaa,
            viewport_logical_size: (width, height),
            framebuffer_size: (width, height),
            minimized: width <= MINIMIZED_EPSILON || height <= MINIMIZED_EPSILON,
            resize_pending: false,
            main_camera: Camera::new(aspect),
            id_allocator: IdAllocator::new(),
        }
    }

    pub fn using_vsync(&self) -> bool {
        self.vsync
    }

    pub fn using_viewport(&self) -> bool {
        self.viewport_enabled
    }

    pub fn msaa(&self) -> Msaa {
        self.msaa
    }

    pub fn viewport_size(&self) -> (u32, u32) {
        self.viewport_logical_size
    }

    pub fn set_viewport_size(&mut self, width: u32, height: u32) {
        self.viewport_logical_size = (width, height);
    }

    pub fn framebuffer_size(&self) -> (u32, u32) {
        self.framebuffer_size
    }

    /// Marks `resizePending`; a zero-or-negative dimension instead marks
    /// `minimized` and does not request a resize (spec §6 `set_framebuffer_size`).
    pub fn set_framebuffer_size(&mut self, width: u32, height: u32) {
        if width <= MINIMIZED_EPSILON || height <= MINIMIZED_EPSILON {
            self.minimized = true;
            return;
        }
        self.minimized = false;
        self.framebuffer_size = (width, height);
        self.resize_pending = true;
    }

    pub fn minimized(&self) -> bool {
        self.minimized
    }

    pub fn allocate_id(&mut self) -> u64 {
        self.id_allocator.allocate()
    }
}
