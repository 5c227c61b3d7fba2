use anyhow::Result;
use vulkanalia::prelude::v1_0::*;

use crate::vulkan::buffers::depth_buffer::pick_depth_format;
use crate::vulkan::image::{create_image, create_image_view};
use crate::vulkan::renderphase::{scene_subpass_dependencies, Renderpass};

pub const PICKING_FORMAT: vk::Format = vk::Format::R32_UINT;

/// Offscreen, single-sample object-id buffer. Spec §4.2 "Picking": color
/// `R32_UINT` cleared to 0, red-channel-only write mask enforced by the
/// picking pipeline rather than here.
pub struct PickingPhase {
    pub shared: Renderpass,
    pub color_image: vk::Image,
    pub color_memory: vk::DeviceMemory,
    pub color_view: vk::ImageView,
    pub depth_image: vk::Image,
    pub depth_memory: vk::DeviceMemory,
    pub depth_view: vk::ImageView,
}

impl PickingPhase {
    pub unsafe fn create(
        instance: &Instance,
        device: &Device,
        physical_device: vk::PhysicalDevice,
        queue_family: u32,
        extent: vk::Extent2D,
        framebuffer_count: usize,
    ) -> Result<Self> {
        let depth_format = pick_depth_format(instance, physical_device)?;
        let render_pass = create_render_pass(device, depth_format)?;

        let mut shared = Renderpass::create(device, queue_family, render_pass)?;

        let (color_image, color_memory) = create_image(
            instance,
            device,
            physical_device,
            extent.width,
            extent.height,
            PICKING_FORMAT,
            vk::ImageTiling::OPTIMAL,
            vk::ImageUsageFlags::COLOR_ATTACHMENT | vk::ImageUsageFlags::TRANSFER_SRC,
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
            vk::SampleCountFlags::_1,
        )?;
        let color_view =
            create_image_view(device, color_image, PICKING_FORMAT, vk::ImageAspectFlags::COLOR)?;

        let (depth_image, depth_memory) = create_image(
            instance,
            device,
            physical_device,
            extent.width,
            extent.height,
            depth_format,
            vk::ImageTiling::OPTIMAL,
            vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT,
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
            vk::SampleCountFlags::_1,
        )?;
        let depth_view =
            create_image_view(device, depth_image, depth_format, vk::ImageAspectFlags::DEPTH)?;

        let attachments = &[color_view, depth_view];
        let mut framebuffers = Vec::with_capacity(framebuffer_count);
        for _ in 0..framebuffer_count {
            let info = vk::FramebufferCreateInfo::builder()
                .render_pass(render_pass)
                .attachments(attachments)
                .width(extent.width)
                .height(extent.height)
                .layers(1);
            framebuffers.push(device.create_framebuffer(&info, None)?);
        }
        shared.framebuffers = framebuffers;

        Ok(Self { shared, color_image, color_memory, color_view, depth_image, depth_memory, depth_view })
    }

    pub unsafe fn destroy(&mut self, device: &Device) {
        device.destroy_image_view(self.color_view, None);
        device.destroy_image(self.color_image, None);
        device.free_memory(self.color_memory, None);
        device.destroy_image_view(self.depth_view, None);
        device.destroy_image(self.depth_image, None);
        device.free_memory(self.depth_memory, None);
        self.shared.destroy(device);
    }
}

unsafe fn create_render_pass(device: &Device, depth_format: vk::Format) -> Result<vk::RenderPass> {
    let color_attachment = vk::AttachmentDescription::builder()
        .format(PICKING_FORMAT)
        .samples(vk::SampleCountFlags::_1)
        .load_op(vk::AttachmentLoadOp::CLEAR)
        .store_op(vk::AttachmentStoreOp::STORE)
        .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
        .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
        .initial_layout(vk::ImageLayout::UNDEFINED)
        .final_layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL);

    let depth_attachment = vk::AttachmentDescription::builder()
        .format(depth_format)
        .samples(vk::SampleCountFlags::_1)
        .load_op(vk::AttachmentLoadOp::CLEAR)
        .store_op(vk::AttachmentStoreOp::DONT_CARE)
        .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
        .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
        .initial_layout(vk::ImageLayout::UNDEFINED)
        .final_layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL);

    let color_ref = vk::AttachmentReference::builder()
        .attachment(0)
        .layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL);
    let depth_ref = vk::AttachmentReference::builder()
        .attachment(1)
        .layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL);

    let color_attachments = &[color_ref];
    let subpass = vk::SubpassDescription::builder()
        .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
        .color_attachments(color_attachments)
        .depth_stencil_attachment(&depth_ref);

    let attachments = &[color_attachment, depth_attachment];
    let subpasses = &[subpass];
    let dependencies = scene_subpass_dependencies();
    let info = vk::RenderPassCreateInfo::builder()
        .attachments(attachments)
        .subpasses(subpasses)
        .dependencies(&dependencies);

    Ok(device.create_render_pass(&info, None)?)
}
