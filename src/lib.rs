#![allow(clippy::too_many_arguments)]

pub mod camera;
pub mod config;
pub mod engine;
pub mod errors;
pub mod id_allocator;
pub mod logging;
pub mod sprite;
pub mod sprite_pipelines;
pub mod uniforms;
pub mod vulkan;

use vulkanalia::vk;
use vulkanalia::Version;

pub use engine::Engine;

/// Frames-in-flight, process-wide (spec §1 Non-goals: "two frames in
/// flight"). The buffer/synchronizer/command-buffer arrays throughout
/// `vulkan::*` are all sized against this constant.
pub const MAX_FRAMES_IN_FLIGHT: usize = 2;

pub const VALIDATION_ENABLED: bool = cfg!(debug_assertions);
pub const VALIDATION_LAYER: vk::ExtensionName =
    vk::ExtensionName::from_bytes(b"VK_LAYER_KHRONOS_validation");
pub const PORTABILITY_MACOS_VERSION: Version = Version::new(1, 3, 216);

/// Spec §9 Design Notes "Global singleton": the free-function surface
/// wraps a thread-local `Option<Engine>` instead of a real process-wide
/// global, for callers that prefer the original single-instance call
/// style over carrying an owned `Engine` value themselves. Every function
/// here is a thin forward onto the matching `Engine` method; prefer
/// `Engine` directly when an owned value is convenient, since borrowing
/// accessors (`getContext`/`getMainCamera`) can't be expressed safely
/// against a thread-local cell and are only available on `Engine` itself.
pub mod facade {
    use std::cell::RefCell;
    use std::os::raw::c_void;

    use anyhow::{anyhow, Result};
    use cgmath::{Matrix4, Vector3};

    use crate::camera::CameraDirection;
    use crate::config::{EngineConfig, Msaa};
    use crate::engine::{Engine, RenderCallback, UiRenderCallback};

    thread_local! {
        static ENGINE: RefCell<Option<Engine>> = RefCell::new(None);
    }

    fn with_engine<R>(f: impl FnOnce(&mut Engine) -> R) -> Option<R> {
        ENGINE.with(|cell| cell.borrow_mut().as_mut().map(f))
    }

    fn with_engine_ref<R>(f: impl FnOnce(&Engine) -> R) -> Option<R> {
        ENGINE.with(|cell| cell.borrow().as_ref().map(f))
    }

    /// Spec §6 `init(config) -> result`. Replaces any engine already
    /// installed on this thread.
    pub unsafe fn init(config: &EngineConfig<'_>) -> Result<()> {
        let engine = Engine::init(config)?;
        ENGINE.with(|cell| *cell.borrow_mut() = Some(engine));
        Ok(())
    }

    /// Spec §6 `shutdown() -> result`. A no-op if no engine is installed.
    pub unsafe fn shutdown() {
        let engine = ENGINE.with(|cell| cell.borrow_mut().take());
        if let Some(mut engine) = engine {
            unsafe { engine.shutdown() };
        }
    }

    /// Spec §6 `update(timestep)`. Errors if called with no engine
    /// installed, since unlike the query accessors there is no sensible
    /// silent-no-op value to return.
    pub unsafe fn update(timestep: f32) -> Result<()> {
        with_engine(|engine| unsafe { engine.update(timestep) })
            .unwrap_or_else(|| Err(anyhow!("evk: update called with no engine initialized")))
    }

    /// Spec §6 `pickObject(x, y) -> u32`. No engine installed behaves
    /// exactly like "no object under the cursor".
    pub unsafe fn pick_object(x: i32, y: i32) -> Result<u32> {
        with_engine_ref(|engine| unsafe { engine.pick_object(x, y) }).unwrap_or(Ok(0))
    }

    pub fn using_vsync() -> bool {
        with_engine_ref(Engine::using_vsync).unwrap_or(false)
    }

    pub fn using_viewport() -> bool {
        with_engine_ref(Engine::using_viewport).unwrap_or(false)
    }

    pub fn get_msaa() -> Option<Msaa> {
        with_engine_ref(Engine::get_msaa)
    }

    pub fn get_viewport_size() -> (u32, u32) {
        with_engine_ref(Engine::get_viewport_size).unwrap_or((0, 0))
    }

    pub fn set_viewport_size(width: u32, height: u32) {
        with_engine(|engine| engine.set_viewport_size(width, height));
    }

    pub fn get_framebuffer_size() -> (u32, u32) {
        with_engine_ref(Engine::get_framebuffer_size).unwrap_or((0, 0))
    }

    pub fn set_framebuffer_size(width: u32, height: u32) {
        with_engine(|engine| engine.set_framebuffer_size(width, height));
    }

    pub fn set_render_callback(callback: Option<RenderCallback>) {
        with_engine(|engine| engine.set_render_callback(callback));
    }

    pub fn set_ui_render_callback(callback: Option<UiRenderCallback>) {
        with_engine(|engine| engine.set_ui_render_callback(callback));
    }

    pub fn set_user_data(user_data: *mut c_void) {
        with_engine(|engine| engine.set_user_data(user_data));
    }

    pub fn allocate_id() -> u64 {
        with_engine(Engine::allocate_id).unwrap_or(0)
    }

    pub fn translate(delta: Vector3<f32>) {
        with_engine(|engine| engine.translate(delta));
    }

    pub fn rotate(delta: Vector3<f32>) {
        with_engine(|engine| engine.rotate(delta));
    }

    pub fn r#move(dir: CameraDirection, moving: bool) {
        with_engine(|engine| engine.r#move(dir, moving));
    }

    pub fn set_lock(moving: bool) {
        with_engine(|engine| engine.set_lock(moving));
    }

    pub fn set_speed_modifier(pressed: bool, speed: f32) {
        with_engine(|engine| engine.set_speed_modifier(pressed, speed));
    }

    pub fn view() -> Option<Matrix4<f32>> {
        with_engine_ref(Engine::view)
    }

    pub fn view_inverse() -> Option<Matrix4<f32>> {
        with_engine_ref(Engine::view_inverse)
    }

    pub fn perspective() -> Option<Matrix4<f32>> {
        with_engine_ref(Engine::perspective)
    }

    pub fn perspective_inverse() -> Option<Matrix4<f32>> {
        with_engine_ref(Engine::perspective_inverse)
    }

    pub fn position() -> Option<Vector3<f32>> {
        with_engine_ref(Engine::position)
    }

    pub fn forward() -> Option<Vector3<f32>> {
        with_engine_ref(Engine::forward)
    }

    pub fn fov() -> Option<f32> {
        with_engine_ref(Engine::fov)
    }

    pub fn aspect_ratio() -> Option<f32> {
        with_engine_ref(Engine::aspect_ratio)
    }
}
