use anyhow::Result;
use vulkanalia::prelude::v1_0::*;

use crate::vulkan::buffers::depth_buffer::pick_depth_format;
use crate::vulkan::commands::{begin_single_time_commands, end_single_time_commands};
use crate::vulkan::image::{create_image, create_image_view, create_sampler};
use crate::vulkan::renderphase::{scene_subpass_dependencies, Renderpass};

/// Optional offscreen scene target sampled by the UI phase. Spec §4.2
/// "Viewport (optional)": MSAA color ending in `SHADER_READ_ONLY`, plus a
/// sampler and single-binding descriptor set referencing it.
///
/// An MSAA attachment cannot itself be bound behind a
/// `COMBINED_IMAGE_SAMPLER` (the UI fragment shader samples with a plain
/// `sampler2D`, not `sampler2DMS`), so — mirroring the resolve attachment
/// the Main phase already carries — this owns a single-sample resolve
/// image/view and it is that resolve view, not the MSAA color view, that
/// ends in `SHADER_READ_ONLY` and backs the descriptor set.
pub struct ViewportPhase {
    pub shared: Renderpass,
    pub color_image: vk::Image,
    pub color_memory: vk::DeviceMemory,
    pub color_view: vk::ImageView,
    pub resolve_image: vk::Image,
    pub resolve_memory: vk::DeviceMemory,
    pub resolve_view: vk::ImageView,
    pub depth_image: vk::Image,
    pub depth_memory: vk::DeviceMemory,
    pub depth_view: vk::ImageView,
    pub sampler: vk::Sampler,
    pub descriptor_pool: vk::DescriptorPool,
    pub descriptor_set_layout: vk::DescriptorSetLayout,
    pub descriptor_set: vk::DescriptorSet,
}

impl ViewportPhase {
    pub unsafe fn create(
        instance: &Instance,
        device: &Device,
        physical_device: vk::PhysicalDevice,
        queue_family: u32,
        transfer_pool: vk::CommandPool,
        transfer_queue: vk::Queue,
        color_format: vk::Format,
        msaa_samples: vk::SampleCountFlags,
        extent: vk::Extent2D,
        framebuffer_count: usize,
    ) -> Result<Self> {
        let depth_format = pick_depth_format(instance, physical_device)?;
        let render_pass = create_render_pass(device, color_format, depth_format, msaa_samples)?;

        let mut shared = Renderpass::create(device, queue_family, render_pass)?;

        let (color_image, color_memory) = create_image(
            instance,
            device,
            physical_device,
            extent.width,
            extent.height,
            color_format,
            vk::ImageTiling::OPTIMAL,
            vk::ImageUsageFlags::COLOR_ATTACHMENT | vk::ImageUsageFlags::SAMPLED,
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
            msaa_samples,
        )?;
        let color_view =
            create_image_view(device, color_image, color_format, vk::ImageAspectFlags::COLOR)?;

        let (resolve_image, resolve_memory) = create_image(
            instance,
            device,
            physical_device,
            extent.width,
            extent.height,
            color_format,
            vk::ImageTiling::OPTIMAL,
            vk::ImageUsageFlags::COLOR_ATTACHMENT | vk::ImageUsageFlags::SAMPLED,
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
            vk::SampleCountFlags::_1,
        )?;
        let resolve_view =
            create_image_view(device, resolve_image, color_format, vk::ImageAspectFlags::COLOR)?;

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

        let attachments = &[color_view, depth_view, resolve_view];
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

        // On creation the resolve image is transitioned UNDEFINED ->
        // SHADER_READ_ONLY via a single-time command buffer (spec §4.2) —
        // it is the resolve image the UI phase samples, not the MSAA
        // color image.
        let command_buffer = begin_single_time_commands(device, transfer_pool)?;
        let subresource = vk::ImageSubresourceRange::builder()
            .aspect_mask(vk::ImageAspectFlags::COLOR)
            .base_mip_level(0)
            .level_count(1)
            .base_array_layer(0)
            .layer_count(1);
        let barrier = vk::ImageMemoryBarrier::builder()
            .image(resolve_image)
            .old_layout(vk::ImageLayout::UNDEFINED)
            .new_layout(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL)
            .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .subresource_range(subresource)
            .src_access_mask(vk::AccessFlags::empty())
            .dst_access_mask(vk::AccessFlags::SHADER_READ);
        device.cmd_pipeline_barrier(
            command_buffer,
            vk::PipelineStageFlags::TOP_OF_PIPE,
            vk::PipelineStageFlags::FRAGMENT_SHADER,
            vk::DependencyFlags::empty(),
            &[] as &[vk::MemoryBarrier],
            &[] as &[vk::BufferMemoryBarrier],
            &[barrier],
        );
        end_single_time_commands(device, transfer_pool, transfer_queue, command_buffer)?;

        let sampler = create_sampler(device)?;
        let descriptor_set_layout = create_descriptor_set_layout(device)?;
        let descriptor_pool = create_descriptor_pool(device)?;
        let descriptor_set = create_descriptor_set(
            device,
            descriptor_pool,
            descriptor_set_layout,
            resolve_view,
            sampler,
        )?;

        Ok(Self {
            shared,
            color_image,
            color_memory,
            color_view,
            resolve_image,
            resolve_memory,
            resolve_view,
            depth_image,
            depth_memory,
            depth_view,
            sampler,
            descriptor_pool,
            descriptor_set_layout,
            descriptor_set,
        })
    }

    pub unsafe fn destroy(&mut self, device: &Device) {
        device.destroy_descriptor_pool(self.descriptor_pool, None);
        device.destroy_descriptor_set_layout(self.descriptor_set_layout, None);
        device.destroy_sampler(self.sampler, None);
        device.destroy_image_view(self.color_view, None);
        device.destroy_image(self.color_image, None);
        device.free_memory(self.color_memory, None);
        device.destroy_image_view(self.resolve_view, None);
        device.destroy_image(self.resolve_image, None);
        device.free_memory(self.resolve_memory, None);
        device.destroy_image_view(self.depth_view, None);
        device.destroy_image(self.depth_image, None);
        device.free_memory(self.depth_memory, None);
        self.shared.destroy(device);
    }
}

unsafe fn create_descriptor_set_layout(device: &Device) -> Result<vk::DescriptorSetLayout> {
    let binding = vk::DescriptorSetLayoutBinding::builder()
        .binding(0)
        .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
        .descriptor_count(1)
        .stage_flags(vk::ShaderStageFlags::FRAGMENT);

    let bindings = &[binding];
    let info = vk::DescriptorSetLayoutCreateInfo::builder().bindings(bindings);
    Ok(device.create_descriptor_set_layout(&info, None)?)
}

unsafe fn create_descriptor_pool(device: &Device) -> Result<vk::DescriptorPool> {
    let size = vk::DescriptorPoolSize::builder()
        .type_(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
        .descriptor_count(1);

    let pool_sizes = &[size];
    let info = vk::DescriptorPoolCreateInfo::builder().pool_sizes(pool_sizes).max_sets(1);
    Ok(device.create_descriptor_pool(&info, None)?)
}

unsafe fn create_descriptor_set(
    device: &Device,
    pool: vk::DescriptorPool,
    layout: vk::DescriptorSetLayout,
    view: vk::ImageView,
    sampler: vk::Sampler,
) -> Result<vk::DescriptorSet> {
    let layouts = &[layout];
    let info = vk::DescriptorSetAllocateInfo::builder().descriptor_pool(pool).set_layouts(layouts);
    let set = device.allocate_descriptor_sets(&info)?[0];

    let image_info = vk::DescriptorImageInfo::builder()
        .image_layout(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL)
        .image_view(view)
        .sampler(sampler);
    let image_infos = &[image_info];

    let write = vk::WriteDescriptorSet::builder()
        .dst_set(set)
        .dst_binding(0)
        .dst_array_element(0)
        .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
        .image_info(image_infos);

    device.update_descriptor_sets(&[write], &[] as &[vk::CopyDescriptorSet]);

    Ok(set)
}

unsafe fn create_render_pass(
    device: &Device,
    color_format: vk::Format,
    depth_format: vk::Format,
    msaa_samples: vk::SampleCountFlags,
) -> Result<vk::RenderPass> {
    let color_attachment = vk::AttachmentDescription::builder()
        .format(color_format)
        .samples(msaa_samples)
        .load_op(vk::AttachmentLoadOp::CLEAR)
        .store_op(vk::AttachmentStoreOp::DONT_CARE)
        .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
        .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
        .initial_layout(vk::ImageLayout::UNDEFINED)
        .final_layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL);

    let depth_attachment = vk::AttachmentDescription::builder()
        .format(depth_format)
        .samples(msaa_samples)
        .load_op(vk::AttachmentLoadOp::CLEAR)
        .store_op(vk::AttachmentStoreOp::STORE)
        .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
        .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
        .initial_layout(vk::ImageLayout::UNDEFINED)
        .final_layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL);

    let resolve_attachment = vk::AttachmentDescription::builder()
        .format(color_format)
        .samples(vk::SampleCountFlags::_1)
        .load_op(vk::AttachmentLoadOp::DONT_CARE)
        .store_op(vk::AttachmentStoreOp::STORE)
        .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
        .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
        .initial_layout(vk::ImageLayout::UNDEFINED)
        .final_layout(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL);

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
