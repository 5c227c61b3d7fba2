//! The top-level engine value, owning both the non-GPU `EngineContext` and
//! the GPU-resident `GpuBackend`. Spec §9 Design Notes "Global singleton":
//! re-architected as a value the caller owns instead of a process-wide
//! singleton; the crate root layers a thread-local free-function facade on
//! top of this for C-ABI parity.

pub mod backend;
pub mod context;

use std::os::raw::c_void;

use anyhow::Result;
use cgmath::{Matrix4, Vector3};

use crate::camera::{Camera, CameraDirection};
use crate::config::{EngineConfig, Msaa};

use backend::GpuBackend;
pub use context::{EngineContext, RenderCallback, RenderContext, UiRenderCallback};

pub struct Engine {
    context: EngineContext,
    backend: GpuBackend,
}

impl Engine {
    /// Spec §4.1 Init: builds the context, then the GPU backend against
    /// the same config. The backend's own nine init steps do all the
    /// Vulkan object creation; this just wires the two halves together.
    ///
    /// Spec §7 kind-1 "fatal initialization": instance/device/swapchain/
    /// renderpass/pipeline creation failures are not recoverable, so a
    /// failed `GpuBackend::create` is logged at Fatal and aborts here
    /// rather than being handed back as a `Result` the host could ignore.
    pub unsafe fn init(config: &EngineConfig<'_>) -> Result<Self> {
        let context = EngineContext::new(
            config.width,
            config.height,
            config.msaa,
            config.vsync,
            config.viewport,
        );
        let backend = match GpuBackend::create(config) {
            Ok(backend) => backend,
            Err(e) => crate::fatal!("evk: GPU backend initialization failed: {}", e),
        };
        Ok(Self { context, backend })
    }

    /// Spec §4.1 per-tick update, step 1: the `minimized` early-out lives
    /// here since it is a pure context check with no GPU work; steps 2-10
    /// are `GpuBackend::tick`'s responsibility.
    ///
    /// A tick failure (an unexpected, non-out-of-date acquire/submit/
    /// present error) is not one of the recoverable swapchain events
    /// `GpuBackend::resize` already handles, so spec §7 classifies it with
    /// fatal initialization failures: logged at Fatal, then abort.
    pub unsafe fn update(&mut self, timestep: f32) -> Result<()> {
        if self.context.minimized() {
            return Ok(());
        }
        match self.backend.tick(&mut self.context, timestep) {
            Ok(()) => Ok(()),
            Err(e) => crate::fatal!("evk: frame tick failed: {}", e),
        }
    }

    /// Spec §4.1 Shutdown.
    pub unsafe fn shutdown(&mut self) {
        self.backend.destroy();
    }

    /// Spec §4.7 / §6 `pickObject`.
    pub unsafe fn pick_object(&self, x: i32, y: i32) -> Result<u32> {
        self.backend.pick(x, y, self.context.viewport_size())
    }

    pub fn get_context(&self) -> &EngineContext {
        &self.context
    }

    pub fn get_main_camera(&self) -> &Camera {
        &self.context.main_camera
    }

    pub fn using_vsync(&self) -> bool {
        self.context.using_vsync()
    }

    pub fn using_viewport(&self) -> bool {
        self.context.using_viewport()
    }

    pub fn get_msaa(&self) -> Msaa {
        self.context.msaa()
    }

    pub fn get_viewport_size(&self) -> (u32, u32) {
        self.context.viewport_size()
    }

    pub fn set_viewport_size(&mut self, width: u32, height: u32) {
        self.context.set_viewport_size(width, height);
    }

    pub fn get_framebuffer_size(&self) -> (u32, u32) {
        self.context.framebuffer_size()
    }

    pub fn set_framebuffer_size(&mut self, width: u32, height: u32) {
        self.context.set_framebuffer_size(width, height);
    }

    pub fn set_render_callback(&mut self, callback: Option<RenderCallback>) {
        self.context.render_callback = callback;
    }

    pub fn set_ui_render_callback(&mut self, callback: Option<UiRenderCallback>) {
        self.context.ui_render_callback = callback;
    }

    pub fn set_user_data(&mut self, user_data: *mut c_void) {
        self.context.user_data = user_data;
    }

    pub fn allocate_id(&mut self) -> u64 {
        self.context.allocate_id()
    }

    // Camera passthroughs, spec §4.9 / §6.

    pub fn translate(&mut self, delta: Vector3<f32>) {
        self.context.main_camera.translate(delta);
    }

    pub fn rotate(&mut self, delta: Vector3<f32>) {
        self.context.main_camera.rotate(delta);
    }

    pub fn r#move(&mut self, dir: CameraDirection, moving: bool) {
        self.context.main_camera.r#move(dir, moving);
    }

    pub fn set_lock(&mut self, moving: bool) {
        self.context.main_camera.set_lock(moving);
    }

    pub fn set_speed_modifier(&mut self, pressed: bool, speed: f32) {
        self.context.main_camera.set_speed_modifier(pressed, speed);
    }

    pub fn view(&self) -> Matrix4<f32> {
        self.context.main_camera.view()
    }

    pub fn view_inverse(&self) -> Matrix4<f32> {
        self.context.main_camera.view_inverse()
    }

    pub fn perspective(&self) -> Matrix4<f32> {
        self.context.main_camera.perspective()
    }

    pub fn perspective_inverse(&self) -> Matrix4<f32> {
        self.context.main_camera.perspective_inverse()
    }

    pub fn position(&self) -> Vector3<f32> {
        self.context.main_camera.position()
    }

    pub fn forward(&self) -> Vector3<f32> {
        self.context.main_camera.forward()
    }

    pub fn fov(&self) -> f32 {
        self.context.main_camera.fov()
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.context.main_camera.aspect_ratio()
    }
}
