pub mod main_phase;
pub mod picking;
pub mod ui;
pub mod viewport;

use anyhow::Result;
use vulkanalia::prelude::v1_0::*;

pub use main_phase::MainPhase;
pub use picking::PickingPhase;
pub use ui::UiPhase;
pub use viewport::ViewportPhase;

use crate::vulkan::commands::{allocate_command_buffers, create_command_pool};
use crate::MAX_FRAMES_IN_FLIGHT;

/// Which of the four phases is currently being recorded. Sprites consult
/// this to pick their pipeline (spec §4.8). Design Notes: tagged variant
/// instead of per-struct duplication.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RenderphaseTag {
    Main,
    Picking,
    Viewport,
    UI,
}

/// The shape every renderphase variant shares: a renderpass, a reset-flag
/// command pool with `MAX_FRAMES_IN_FLIGHT` primary command buffers, and a
/// framebuffer per swapchain image. Spec §4.2.
pub struct Renderpass {
    pub render_pass: vk::RenderPass,
    pub command_pool: vk::CommandPool,
    pub command_buffers: Vec<vk::CommandBuffer>,
    pub framebuffers: Vec<vk::Framebuffer>,
}

impl Renderpass {
    pub unsafe fn create(
        device: &Device,
        queue_family: u32,
        render_pass: vk::RenderPass,
    ) -> Result<Self> {
        let command_pool = create_command_pool(device, queue_family)?;
        let command_buffers =
            allocate_command_buffers(device, command_pool, MAX_FRAMES_IN_FLIGHT as u32)?;

        Ok(Self { render_pass, command_pool, command_buffers, framebuffers: Vec::new() })
    }

    pub unsafe fn destroy_framebuffers(&mut self, device: &Device) {
        for &framebuffer in &self.framebuffers {
            device.destroy_framebuffer(framebuffer, None);
        }
        self.framebuffers.clear();
    }

    pub unsafe fn destroy(&mut self, device: &Device) {
        self.destroy_framebuffers(device);
        device.destroy_command_pool(self.command_pool, None);
        device.destroy_render_pass(self.render_pass, None);
    }
}

/// Two external subpass dependencies covering depth read/write and color
/// read/write, shared by every scene-shaped variant (Main, Picking,
/// Viewport). Spec §4.2.
pub fn scene_subpass_dependencies() -> [vk::SubpassDependencyBuilder<'static>; 1] {
    [vk::SubpassDependency::builder()
        .src_subpass(vk::SUBPASS_EXTERNAL)
        .dst_subpass(0)
        .src_stage_mask(
            vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT
                | vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS,
        )
        .src_access_mask(vk::AccessFlags::empty())
        .dst_stage_mask(
            vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT
                | vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS,
        )
        .dst_access_mask(
            vk::AccessFlags::COLOR_ATTACHMENT_WRITE
                | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
        )]
}
