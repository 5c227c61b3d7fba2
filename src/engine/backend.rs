use anyhow::{anyhow, Result};
use log::*;
use vulkanalia::loader::{LibloadingLoader, LIBRARY};
use vulkanalia::prelude::v1_0::*;
use vulkanalia::vk::{ExtDebugUtilsExtension, KhrSurfaceExtension, KhrSwapchainExtension};
use vulkanalia::window as vk_window;

use crate::config::{EngineConfig, Msaa};
use crate::engine::context::{EngineContext, RenderContext};
use crate::uniforms::CameraUbo;
use crate::vulkan::buffers::library::{BufferKey, BufferLibrary};
use crate::vulkan::device::{create_logical_device, Queues};
use crate::vulkan::instance::create_instance;
use crate::vulkan::physical_device::{pick_physical_device, SelectedDevice};
use crate::vulkan::pipeline::PipelineLibrary;
use crate::vulkan::renderphase::main_phase::MainPhase;
use crate::vulkan::renderphase::picking::PickingPhase;
use crate::vulkan::renderphase::ui::UiPhase;
use crate::vulkan::renderphase::viewport::ViewportPhase;
use crate::vulkan::renderphase::RenderphaseTag;
use crate::vulkan::swapchain::Swapchain;
use crate::vulkan::sync::FrameSynchronizer;
use crate::{sprite_pipelines, MAX_FRAMES_IN_FLIGHT, VALIDATION_ENABLED};

/// Everything GPU-resident: instance/device/swapchain, the four
/// renderphases, the pipeline and buffer libraries, and the queues. Spec
/// §3 Data Model "GPU Backend". Owned exclusively by `Engine`.
pub struct GpuBackend {
    pub entry: Entry,
    pub instance: Instance,
    messenger: vk::DebugUtilsMessengerEXT,
    surface: vk::SurfaceKHR,
    physical: SelectedDevice,
    pub device: Device,
    queues: Queues,

    swapchain: Swapchain,
    sync: FrameSynchronizer,

    main: MainPhase,
    picking: PickingPhase,
    viewport: Option<ViewportPhase>,
    ui: UiPhase,

    pub pipeline_library: PipelineLibrary,
    buffer_library: BufferLibrary,

    current_phase: RenderphaseTag,
    msaa: Msaa,
    viewport_enabled: bool,
}

impl GpuBackend {
    pub unsafe fn create(config: &EngineConfig<'_>) -> Result<Self> {
        let loader = LibloadingLoader::new(LIBRARY)?;
        let entry = Entry::new(loader).map_err(|e| anyhow!("{}", e))?;

        let instance_bundle = create_instance(
            &entry,
            config.window,
            config.app_name,
            config.engine_name,
            config.app_version,
            config.engine_version,
        )?;
        let instance = instance_bundle.instance;
        let messenger = instance_bundle.messenger;

        let surface = vk_window::create_surface(&instance, config.window, config.window)?;

        let physical = pick_physical_device(&instance, surface)?;
        let msaa = config.msaa.clamp_to_supported(physical.msaa_supported);

        let (device, queues) =
            create_logical_device(&entry, &instance, physical.physical_device, physical.queue_families)?;

        let swapchain = Swapchain::create(
            &instance,
            &device,
            surface,
            physical.physical_device,
            physical.queue_families,
            config.width,
            config.height,
            config.vsync,
        )?;

        let sync = FrameSynchronizer::create(&device, swapchain.image_count())?;

        let main = MainPhase::create(
            &instance,
            &device,
            physical.physical_device,
            physical.queue_families.graphics,
            swapchain.format,
            msaa.as_vk(),
            swapchain.extent,
            &swapchain.image_views,
            false,
        )?;

        let picking = PickingPhase::create(
            &instance,
            &device,
            physical.physical_device,
            physical.queue_families.graphics,
            swapchain.extent,
            swapchain.image_count(),
        )?;

        let viewport = if config.viewport {
            Some(ViewportPhase::create(
                &instance,
                &device,
                physical.physical_device,
                physical.queue_families.graphics,
                main.shared.command_pool,
                queues.graphics,
                swapchain.format,
                msaa.as_vk(),
                swapchain.extent,
                swapchain.image_count(),
            )?)
        } else {
            None
        };

        let ui = UiPhase::create(
            &device,
            physical.queue_families.graphics,
            swapchain.format,
            swapchain.extent,
            &swapchain.image_views,
            true,
        )?;

        let buffer_library =
            BufferLibrary::create(&instance, &device, physical.physical_device, MAX_FRAMES_IN_FLIGHT)?;

        let scene_render_pass = if let Some(viewport) = &viewport {
            viewport.shared.render_pass
        } else {
            main.shared.render_pass
        };

        let pipeline_library = sprite_pipelines::build_sprite_pipelines(
            &device,
            scene_render_pass,
            msaa.as_vk(),
            picking.shared.render_pass,
        )?;

        info!("GPU backend initialized: {} swapchain images.", swapchain.image_count());

        Ok(Self {
            entry,
            instance,
            messenger,
            surface,
            physical,
            device,
            queues,
            swapchain,
            sync,
            main,
            picking,
            viewport,
            ui,
            pipeline_library,
            buffer_library,
            current_phase: RenderphaseTag::Main,
            msaa,
            viewport_enabled: config.viewport,
        })
    }

    pub fn current_phase(&self) -> RenderphaseTag {
        self.current_phase
    }

    pub fn swapchain_extent(&self) -> vk::Extent2D {
        self.swapchain.extent
    }

    pub fn graphics_queue_family(&self) -> u32 {
        self.physical.queue_families.graphics
    }

    pub fn msaa(&self) -> Msaa {
        self.msaa
    }

    pub fn camera_ubo_buffer(&self) -> &crate::vulkan::buffers::perframe::PerFrameBuffer {
        self.buffer_library.get(BufferKey::MainCamera)
    }

    /// One tick of the frame orchestrator (spec §4.1). Returns `Ok(())`
    /// whether or not a submit actually happened this tick (out-of-date
    /// acquire short-circuits after a resize, per step 5).
    pub unsafe fn tick(&mut self, context: &mut EngineContext, timestep: f32) -> Result<()> {
        let frame = self.sync.current_frame();

        context.main_camera.update(timestep);

        let camera = &context.main_camera;
        let ubo = CameraUbo {
            view: camera.view(),
            view_inverse: camera.view_inverse(),
            proj: camera.perspective(),
        };
        let ubo_size = std::mem::size_of::<CameraUbo>() as vk::DeviceSize;
        self.buffer_library.get_mut(BufferKey::MainCamera).copy(
            frame,
            &ubo as *const CameraUbo as *const u8,
            ubo_size,
            0,
        )?;

        self.device.wait_for_fences(&[self.sync.in_flight_fences[frame]], true, u64::MAX)?;

        let acquire_result = self.device.acquire_next_image_khr(
            self.swapchain.handle,
            u64::MAX,
            self.sync.image_available_semaphores[frame],
            vk::Fence::null(),
        );

        let image_index = match acquire_result {
            Ok((index, _)) => index as usize,
            Err(vk::ErrorCode::OUT_OF_DATE_KHR) => {
                self.resize(context)?;
                self.sync.advance();
                return Ok(());
            }
            Err(e) => return Err(anyhow!(e)),
        };

        self.device.reset_fences(&[self.sync.in_flight_fences[frame]])?;

        self.record_main(context, frame, image_index, timestep)?;
        self.record_picking(context, frame, image_index, timestep)?;
        if self.viewport.is_some() {
            self.record_viewport(context, frame, image_index, timestep)?;
        }
        self.record_ui(context, frame, image_index, timestep)?;

        let mut command_buffers = vec![self.main.shared.command_buffers[frame]];
        command_buffers.push(self.picking.shared.command_buffers[frame]);
        if let Some(viewport) = &self.viewport {
            command_buffers.push(viewport.shared.command_buffers[frame]);
        }
        command_buffers.push(self.ui.shared.command_buffers[frame]);

        let wait_semaphores = &[self.sync.image_available_semaphores[frame]];
        let wait_stages = &[vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        let signal_semaphores = &[self.sync.render_finished_semaphores[image_index]];

        let submit_info = vk::SubmitInfo::builder()
            .wait_semaphores(wait_semaphores)
            .wait_dst_stage_mask(wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(signal_semaphores);

        self.device.queue_submit(self.queues.graphics, &[submit_info], self.sync.in_flight_fences[frame])?;

        let swapchains = &[self.swapchain.handle];
        let image_indices = &[image_index as u32];
        let present_info = vk::PresentInfoKHR::builder()
            .wait_semaphores(signal_semaphores)
            .swapchains(swapchains)
            .image_indices(image_indices);

        let present_result = self.device.queue_present_khr(self.queues.present, &present_info);

        let out_of_date_or_suboptimal = present_result == Ok(vk::SuccessCode::SUBOPTIMAL_KHR)
            || present_result == Err(vk::ErrorCode::OUT_OF_DATE_KHR);

        if out_of_date_or_suboptimal || context.resize_pending {
            self.resize(context)?;
        } else if let Err(e) = present_result {
            return Err(anyhow!(e));
        }

        self.sync.advance();
        Ok(())
    }

    unsafe fn record_main(
        &mut self,
        context: &EngineContext,
        frame: usize,
        image_index: usize,
        timestep: f32,
    ) -> Result<()> {
        self.current_phase = RenderphaseTag::Main;
        let command_buffer = self.main.shared.command_buffers[frame];
        self.device.reset_command_buffer(command_buffer, vk::CommandBufferResetFlags::empty())?;

        let begin_info = vk::CommandBufferBeginInfo::builder();
        self.device.begin_command_buffer(command_buffer, &begin_info)?;

        let color_clear =
            vk::ClearValue { color: vk::ClearColorValue { float32: [0.0, 0.0, 0.0, 1.0] } };
        let depth_clear = vk::ClearValue {
            depth_stencil: vk::ClearDepthStencilValue { depth: 1.0, stencil: 0 },
        };
        let clear_values = &[color_clear, depth_clear, color_clear];

        let render_area = vk::Rect2D::builder()
            .offset(vk::Offset2D { x: 0, y: 0 })
            .extent(self.swapchain.extent);

        let render_pass_info = vk::RenderPassBeginInfo::builder()
            .render_pass(self.main.shared.render_pass)
            .framebuffer(self.main.shared.framebuffers[image_index])
            .render_area(render_area)
            .clear_values(clear_values);

        self.device.cmd_begin_render_pass(command_buffer, &render_pass_info, vk::SubpassContents::INLINE);
        set_dynamic_viewport_scissor(&self.device, command_buffer, self.swapchain.extent);

        // Main suppresses the draw callback when Viewport is enabled, since
        // then Viewport is the scene target (spec §4.2 record protocol).
        if !self.viewport_enabled {
            self.invoke_render_callback(context, command_buffer, frame, timestep)?;
        }

        self.device.cmd_end_render_pass(command_buffer);
        self.device.end_command_buffer(command_buffer)?;
        Ok(())
    }

    unsafe fn record_picking(
        &mut self,
        context: &EngineContext,
        frame: usize,
        image_index: usize,
        timestep: f32,
    ) -> Result<()> {
        self.current_phase = RenderphaseTag::Picking;
        let command_buffer = self.picking.shared.command_buffers[frame];
        self.device.reset_command_buffer(command_buffer, vk::CommandBufferResetFlags::empty())?;

        let begin_info = vk::CommandBufferBeginInfo::builder();
        self.device.begin_command_buffer(command_buffer, &begin_info)?;

        let color_clear =
            vk::ClearValue { color: vk::ClearColorValue { uint32: [0, 0, 0, 0] } };
        let depth_clear = vk::ClearValue {
            depth_stencil: vk::ClearDepthStencilValue { depth: 1.0, stencil: 0 },
        };
        let clear_values = &[color_clear, depth_clear];

        let render_area = vk::Rect2D::builder()
            .offset(vk::Offset2D { x: 0, y: 0 })
            .extent(self.swapchain.extent);

        let render_pass_info = vk::RenderPassBeginInfo::builder()
            .render_pass(self.picking.shared.render_pass)
            .framebuffer(self.picking.shared.framebuffers[image_index])
            .render_area(render_area)
            .clear_values(clear_values);

        self.device.cmd_begin_render_pass(command_buffer, &render_pass_info, vk::SubpassContents::INLINE);
        set_dynamic_viewport_scissor(&self.device, command_buffer, self.swapchain.extent);

        self.invoke_render_callback(context, command_buffer, frame, timestep)?;

        self.device.cmd_end_render_pass(command_buffer);
        self.device.end_command_buffer(command_buffer)?;
        Ok(())
    }

    unsafe fn record_viewport(
        &mut self,
        context: &EngineContext,
        frame: usize,
        image_index: usize,
        timestep: f32,
    ) -> Result<()> {
        self.current_phase = RenderphaseTag::Viewport;
        let viewport = self.viewport.as_ref().unwrap();
        let command_buffer = viewport.shared.command_buffers[frame];
        self.device.reset_command_buffer(command_buffer, vk::CommandBufferResetFlags::empty())?;

        let begin_info = vk::CommandBufferBeginInfo::builder();
        self.device.begin_command_buffer(command_buffer, &begin_info)?;

        let color_clear =
            vk::ClearValue { color: vk::ClearColorValue { float32: [0.0, 0.0, 0.0, 1.0] } };
        let depth_clear = vk::ClearValue {
            depth_stencil: vk::ClearDepthStencilValue { depth: 1.0, stencil: 0 },
        };
        let clear_values = &[color_clear, depth_clear];

        let render_area = vk::Rect2D::builder()
            .offset(vk::Offset2D { x: 0, y: 0 })
            .extent(self.swapchain.extent);

        let render_pass_info = vk::RenderPassBeginInfo::builder()
            .render_pass(viewport.shared.render_pass)
            .framebuffer(viewport.shared.framebuffers[image_index])
            .render_area(render_area)
            .clear_values(clear_values);

        self.device.cmd_begin_render_pass(command_buffer, &render_pass_info, vk::SubpassContents::INLINE);
        set_dynamic_viewport_scissor(&self.device, command_buffer, self.swapchain.extent);

        self.invoke_render_callback(context, command_buffer, frame, timestep)?;

        self.device.cmd_end_render_pass(command_buffer);
        self.device.end_command_buffer(command_buffer)?;
        Ok(())
    }

    unsafe fn record_ui(
        &mut self,
        context: &EngineContext,
        frame: usize,
        image_index: usize,
        timestep: f32,
    ) -> Result<()> {
        self.current_phase = RenderphaseTag::UI;
        let command_buffer = self.ui.shared.command_buffers[frame];
        self.device.reset_command_buffer(command_buffer, vk::CommandBufferResetFlags::empty())?;

        let begin_info = vk::CommandBufferBeginInfo::builder();
        self.device.begin_command_buffer(command_buffer, &begin_info)?;

        let color_clear =
            vk::ClearValue { color: vk::ClearColorValue { float32: [0.0, 0.0, 0.0, 1.0] } };
        let clear_values = &[color_clear];

        let render_area = vk::Rect2D::builder()
            .offset(vk::Offset2D { x: 0, y: 0 })
            .extent(self.swapchain.extent);

        let render_pass_info = vk::RenderPassBeginInfo::builder()
            .render_pass(self.ui.shared.render_pass)
            .framebuffer(self.ui.shared.framebuffers[image_index])
            .render_area(render_area)
            .clear_values(clear_values);

        self.device.cmd_begin_render_pass(command_buffer, &render_pass_info, vk::SubpassContents::INLINE);

        if let Some(callback) = context.ui_render_callback {
            let render_context = RenderContext {
                device: &self.device,
                command_buffer,
                pipeline_library: &self.pipeline_library,
                phase: RenderphaseTag::UI,
                frame,
                timestep,
                user_data: context.user_data,
            };
            callback(&render_context);
        }

        self.device.cmd_end_render_pass(command_buffer);
        self.device.end_command_buffer(command_buffer)?;
        Ok(())
    }

    unsafe fn invoke_render_callback(
        &self,
        context: &EngineContext,
        command_buffer: vk::CommandBuffer,
        frame: usize,
        timestep: f32,
    ) -> Result<()> {
        if let Some(callback) = context.render_callback {
            let render_context = RenderContext {
                device: &self.device,
                command_buffer,
                pipeline_library: &self.pipeline_library,
                phase: self.current_phase,
                frame,
                timestep,
                user_data: context.user_data,
            };
            callback(&render_context);
        }
        Ok(())
    }

    /// Resize recovery (spec §4.4): wait device idle, destroy all four
    /// renderphases UI -> Viewport? -> Picking -> Main, destroy+recreate
    /// the swapchain, rebuild phases in original order, update the main
    /// camera's aspect ratio.
    pub unsafe fn resize(&mut self, context: &mut EngineContext) -> Result<()> {
        self.device.device_wait_idle()?;

        self.ui.destroy(&self.device);
        if let Some(viewport) = &mut self.viewport {
            viewport.destroy(&self.device);
        }
        self.picking.destroy(&self.device);
        self.main.destroy(&self.device);

        self.swapchain.destroy(&self.device);

        let (width, height) = context.framebuffer_size();
        self.swapchain = Swapchain::create(
            &self.instance,
            &self.device,
            self.surface,
            self.physical.physical_device,
            self.physical.queue_families,
            width,
            height,
            context.using_vsync(),
        )?;

        if self.swapchain.image_count() != self.sync.render_finished_semaphores.len() {
            self.sync
                .resize_render_finished_semaphores(&self.device, self.swapchain.image_count())?;
        }

        self.main = MainPhase::create(
            &self.instance,
            &self.device,
            self.physical.physical_device,
            self.physical.queue_families.graphics,
            self.swapchain.format,
            self.msaa.as_vk(),
            self.swapchain.extent,
            &self.swapchain.image_views,
            false,
        )?;

        self.picking = PickingPhase::create(
            &self.instance,
            &self.device,
            self.physical.physical_device,
            self.physical.queue_families.graphics,
            self.swapchain.extent,
            self.swapchain.image_count(),
        )?;

        self.viewport = if self.viewport_enabled {
            Some(ViewportPhase::create(
                &self.instance,
                &self.device,
                self.physical.physical_device,
                self.physical.queue_families.graphics,
                self.main.shared.command_pool,
                self.queues.graphics,
                self.swapchain.format,
                self.msaa.as_vk(),
                self.swapchain.extent,
                self.swapchain.image_count(),
            )?)
        } else {
            None
        };

        self.ui = UiPhase::create(
            &self.device,
            self.physical.queue_families.graphics,
            self.swapchain.format,
            self.swapchain.extent,
            &self.swapchain.image_views,
            true,
        )?;

        context.resize_pending = false;
        context.main_camera.set_aspect_ratio(width as f32 / height as f32);

        Ok(())
    }

    /// Picker readback (spec §4.7): scales the caller's logical pointer
    /// coordinate into a framebuffer pixel and reads it back from the
    /// picking color attachment.
    pub unsafe fn pick(&self, logical_x: i32, logical_y: i32, viewport_logical_size: (u32, u32)) -> Result<u32> {
        let (fb_x, fb_y) = crate::vulkan::picker::scale_to_framebuffer(
            logical_x,
            logical_y,
            self.swapchain.extent,
            if self.viewport_enabled {
                viewport_logical_size
            } else {
                (self.swapchain.extent.width, self.swapchain.extent.height)
            },
        );

        crate::vulkan::picker::pick(
            &self.device,
            &self.instance,
            self.physical.physical_device,
            self.queues.graphics,
            self.picking.shared.command_pool,
            self.picking.color_image,
            self.swapchain.extent,
            fb_x,
            fb_y,
        )
    }

    pub unsafe fn destroy(&mut self) {
        let _ = self.device.device_wait_idle();

        self.buffer_library.destroy(&self.device);
        self.pipeline_library.destroy(&self.device);

        self.ui.destroy(&self.device);
        if let Some(viewport) = &mut self.viewport {
            viewport.destroy(&self.device);
        }
        self.picking.destroy(&self.device);
        self.main.destroy(&self.device);

        self.sync.destroy(&self.device);
        self.swapchain.destroy(&self.device);

        self.device.destroy_device(None);
        if VALIDATION_ENABLED {
            self.instance.destroy_debug_utils_messenger_ext(self.messenger, None);
        }
        self.instance.destroy_surface_khr(self.surface, None);
        self.instance.destroy_instance(None);
    }
}

fn set_dynamic_viewport_scissor(device: &Device, command_buffer: vk::CommandBuffer, extent: vk::Extent2D) {
    let viewport = vk::Viewport::builder()
        .x(0.0)
        .y(0.0)
        .width(extent.width as f32)
        .height(extent.height as f32)
        .min_depth(0.0)
        .max_depth(1.0);

    let scissor = vk::Rect2D::builder()
        .offset(vk::Offset2D { x: 0, y: 0 })
        .extent(extent);

    unsafe {
        device.cmd_set_viewport(command_buffer, 0, &[viewport]);
        device.cmd_set_scissor(command_buffer, 0, &[scissor]);
    }
}
