use anyhow::Result;
use vulkanalia::prelude::v1_0::*;

use crate::vulkan::renderphase::Renderpass;

/// The UI overlay phase: single-sample, `load=LOAD` so it preserves
/// whatever the prior phase already painted into the swapchain image,
/// `store=STORE`. Spec §4.2 "UI". Owns an auxiliary descriptor pool (1000
/// sets x 11 descriptor types) and a combined-image-sampler layout the UI
/// integration layer uses to sample arbitrary textures at draw time.
pub struct UiPhase {
    pub shared: Renderpass,
    pub descriptor_pool: vk::DescriptorPool,
    pub descriptor_set_layout: vk::DescriptorSetLayout,
}

const UI_POOL_MAX_SETS: u32 = 1000;

impl UiPhase {
    pub unsafe fn create(
        device: &Device,
        queue_family: u32,
        color_format: vk::Format,
        extent: vk::Extent2D,
        swapchain_views: &[vk::ImageView],
        final_phase: bool,
    ) -> Result<Self> {
        let render_pass = create_render_pass(device, color_format, final_phase)?;
        let mut shared = Renderpass::create(device, queue_family, render_pass)?;

        shared.framebuffers = swapchain_views
            .iter()
            .map(|&view| {
                let attachments = &[view];
                let info = vk::FramebufferCreateInfo::builder()
                    .render_pass(render_pass)
                    .attachments(attachments)
                    .width(extent.width)
                    .height(extent.height)
                    .layers(1);
                device.create_framebuffer(&info, None)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let descriptor_pool = create_ui_descriptor_pool(device)?;
        let descriptor_set_layout = create_ui_descriptor_set_layout(device)?;

        Ok(Self { shared, descriptor_pool, descriptor_set_layout })
    }

    pub unsafe fn destroy(&mut self, device: &Device) {
        device.destroy_descriptor_set_layout(self.descriptor_set_layout, None);
        device.destroy_descriptor_pool(self.descriptor_pool, None);
        self.shared.destroy(device);
    }
}

/// One binding: combined image sampler, fragment stage. Spec §4.2 "UI".
unsafe fn create_ui_descriptor_set_layout(device: &Device) -> Result<vk::DescriptorSetLayout> {
    let binding = vk::DescriptorSetLayoutBinding::builder()
        .binding(0)
        .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
        .descriptor_count(1)
        .stage_flags(vk::ShaderStageFlags::FRAGMENT);

    let bindings = &[binding];
    let info = vk::DescriptorSetLayoutCreateInfo::builder().bindings(bindings);
    Ok(device.create_descriptor_set_layout(&info, None)?)
}

/// Sized 1000 sets across all 11 core descriptor types, matching the UI
/// toolkit's own sizing convention (e.g. Dear ImGui's Vulkan backend),
/// since the UI integration layer allocates its own sets from this pool on
/// demand and this crate has no visibility into how many it will need.
unsafe fn create_ui_descriptor_pool(device: &Device) -> Result<vk::DescriptorPool> {
    let descriptor_types = [
        vk::DescriptorType::SAMPLER,
        vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
        vk::DescriptorType::SAMPLED_IMAGE,
        vk::DescriptorType::STORAGE_IMAGE,
        vk::DescriptorType::UNIFORM_TEXEL_BUFFER,
        vk::DescriptorType::STORAGE_TEXEL_BUFFER,
        vk::DescriptorType::UNIFORM_BUFFER,
        vk::DescriptorType::STORAGE_BUFFER,
        vk::DescriptorType::UNIFORM_BUFFER_DYNAMIC,
        vk::DescriptorType::STORAGE_BUFFER_DYNAMIC,
        vk::DescriptorType::INPUT_ATTACHMENT,
    ];

    let pool_sizes: Vec<_> = descriptor_types
        .iter()
        .map(|&ty| {
            vk::DescriptorPoolSize::builder()
                .type_(ty)
                .descriptor_count(UI_POOL_MAX_SETS)
                .build()
        })
        .collect();

    let info = vk::DescriptorPoolCreateInfo::builder()
        .flags(vk::DescriptorPoolCreateFlags::FREE_DESCRIPTOR_SET)
        .pool_sizes(&pool_sizes)
        .max_sets(UI_POOL_MAX_SETS);

    Ok(device.create_descriptor_pool(&info, None)?)
}

unsafe fn create_render_pass(
    device: &Device,
    color_format: vk::Format,
    final_phase: bool,
) -> Result<vk::RenderPass> {
    let final_layout = if final_phase {
        vk::ImageLayout::PRESENT_SRC_KHR
    } else {
        vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL
    };

    let color_attachment = vk::AttachmentDescription::builder()
        .format(color_format)
        .samples(vk::SampleCountFlags::_1)
        .load_op(vk::AttachmentLoadOp::LOAD)
        .store_op(vk::AttachmentStoreOp::STORE)
        .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
        .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
        .initial_layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)
        .final_layout(final_layout);

    let color_ref = vk::AttachmentReference::builder()
        .attachment(0)
        .layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL);

    let color_attachments = &[color_ref];
    let subpass = vk::SubpassDescription::builder()
        .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
        .color_attachments(color_attachments);

    let dependency = vk::SubpassDependency::builder()
        .src_subpass(vk::SUBPASS_EXTERNAL)
        .dst_subpass(0)
        .src_stage_mask(vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT)
        .src_access_mask(vk::AccessFlags::empty())
        .dst_stage_mask(vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT)
        .dst_access_mask(
            vk::AccessFlags::COLOR_ATTACHMENT_READ | vk::AccessFlags::COLOR_ATTACHMENT_WRITE,
        );

    let attachments = &[color_attachment];
    let subpasses = &[subpass];
    let dependencies = &[dependency];
    let info = vk::RenderPassCreateInfo::builder()
        .attachments(attachments)
        .subpasses(subpasses)
        .dependencies(dependencies);

    Ok(device.create_render_pass(&info, None)?)
}
