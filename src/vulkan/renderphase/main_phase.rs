use anyhow::Result;
use vulkanalia::prelude::v1_0::*;

use crate::vulkan::buffers::depth_buffer::pick_depth_format;
use crate::vulkan::image::{create_image, create_image_view};
use crate::vulkan::renderphase::{scene_subpass_dependencies, Renderpass};

/// The main scene phase: multisample color resolved into the swapchain
/// image, plus a multisample depth buffer. Spec §4.2 "Main (scene)".
pub struct MainPhase {
    pub shared: Renderpass,
    pub color_image: vk::Image,
    pub color_memory: vk::DeviceMemory,
    pub color_view: vk::ImageView,
    pub depth_image: vk::Image,
    pub depth_memory: vk::DeviceMemory,
    pub depth_view: vk::ImageView,
    msaa_samples: vk::SampleCountFlags,
    color_format: vk::Format,
}

impl MainPhase {
    pub unsafe fn create(
        instance: &Instance,
        device: &Device,
        physical_device: vk::PhysicalDevice,
        queue_family: u32,
        color_format: vk::Format,
        msaa_samples: vk::SampleCountFlags,
        extent: vk::Extent2D,
        swapchain_views: &[vk::ImageView],
        final_phase: bool,
    ) -> Result<Self> {
        let depth_format = pick_depth_format(instance, physical_device)?;
        let render_pass =
            create_render_pass(device, color_format, depth_format, msaa_samples, final_phase)?;

        let mut shared = Renderpass::create(device, queue_family, render_pass)?;

        let (color_image, color_memory) = create_image(
            instance,
            device,
            physical_device,
            extent.width,
            extent.height,
            color_format,
            vk::ImageTiling::OPTIMAL,
            vk::ImageUsageFlags::TRANSIENT_ATTACHMENT | vk::ImageUsageFlags::COLOR_ATTACHMENT,
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
            msaa_samples,
        )?;
        let color_view =
            create_image_view(device, color_image, color_format, vk::ImageAspectFlags::COLOR)?;

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
            msaa_samples,
        )?;
        let depth_view =
            create_image_view(device, depth_image, depth_format, vk::ImageAspectFlags::DEPTH)?;

        shared.framebuffers = swapchain_views
            .iter()
            .map(|&view| {
                let attachments = &[color_view, depth_view, view];
                let info = vk::FramebufferCreateInfo::builder()
                    .render_pass(render_pass)
                    .attachments(attachments)
                    .width(extent.width)
                    .height(extent.height)
                    .layers(1);
                device.create_framebuffer(&info, None)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            shared,
            color_image,
            color_memory,
            color_view,
            depth_image,
            depth_memory,
            depth_view,
            msaa_samples,
            color_format,
        })
    }

    pub fn msaa_samples(&self) -> vk::SampleCountFlags {
        self.msaa_samples
    }

    pub fn color_format(&self) -> vk::Format {
        self.color_format
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

unsafe fn create_render_pass(
    device: &Device,
    color_format: vk::Format,
    depth_format: vk::Format,
    msaa_samples: vk::SampleCountFlags,
    final_phase: bool,
) -> Result<vk::RenderPass> {
    let color_attachment = vk::AttachmentDescription::builder()
        .format(color_format)
        .samples(msaa_samples)
        .load_op(vk::AttachmentLoadOp::CLEAR)
        .store_op(vk::AttachmentStoreOp::STORE)
        .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
        .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
        .initial_layout(vk::ImageLayout::UNDEFINED)
        .final_layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL);

    let depth_attachment = vk::AttachmentDescription::builder()
        .format(depth_format)
        .samples(msaa_samples)
        .load_op(vk::AttachmentLoadOp::CLEAR)
        .store_op(vk::AttachmentStoreOp::DONT_CARE)
        .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
        .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
        .initial_layout(vk::ImageLayout::UNDEFINED)
        .final_layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL);

    let resolve_final_layout = if final_phase {
        vk::ImageLayout::PRESENT_SRC_KHR
    } else {
        vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL
    };

    let resolve_attachment = vk::AttachmentDescription::builder()
        .format(color_format)
        .samples(vk::SampleCountFlags::_1)
        .load_op(vk::AttachmentLoadOp::DONT_CARE)
        .store_op(vk::AttachmentStoreOp::STORE)
        .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
        .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
        .initial_layout(vk::ImageLayout::UNDEFINED)
        .final_layout(resolve_final_layout);

    let color_ref = vk::AttachmentReference::builder()
        .attachment(0)
        .layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL);
    let depth_ref = vk::AttachmentReference::builder()
        .attachment(1)
        .layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL);
    let resolve_ref = vk::AttachmentReference::builder()
        .attachment(2)
        .layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL);

    let color_attachments = &[color_ref];
    let resolve_attachments = &[resolve_ref];
    let subpass = vk::SubpassDescription::builder()
        .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
        .color_attachments(color_attachments)
        .depth_stencil_attachment(&depth_ref)
        .resolve_attachments(resolve_attachments);

    let attachments = &[color_attachment, depth_attachment, resolve_attachment];
    let subpasses = &[subpass];
    let dependencies = scene_subpass_dependencies();
    let info = vk::RenderPassCreateInfo::builder()
        .attachments(attachments)
        .subpasses(subpasses)
        .dependencies(&dependencies);

    Ok(device.create_render_pass(&info, None)?)
}
