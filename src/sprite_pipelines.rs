use anyhow::Result;
use vulkanalia::prelude::v1_0::*;

use crate::vulkan::pipeline::{Pipeline, PipelineDescriptor, PipelineLibrary};

const SPRITE_DEFAULT_VERT: &[u8] =
    include_bytes!(concat!(env!("OUT_DIR"), "/sprite_default.vert.spv"));
const SPRITE_DEFAULT_FRAG: &[u8] =
    include_bytes!(concat!(env!("OUT_DIR"), "/sprite_default.frag.spv"));
const SPRITE_PICKING_VERT: &[u8] =
    include_bytes!(concat!(env!("OUT_DIR"), "/sprite_picking.vert.spv"));
const SPRITE_PICKING_FRAG: &[u8] =
    include_bytes!(concat!(env!("OUT_DIR"), "/sprite_picking.frag.spv"));

/// Bindings shared by both sprite pipelines: (0) camera UBO, (1) per-sprite
/// UBO, (2) albedo combined-image-sampler. Spec §4.3.
fn sprite_bindings() -> Vec<vk::DescriptorSetLayoutBindingBuilder<'static>> {
    vec![
        vk::DescriptorSetLayoutBinding::builder()
            .binding(0)
            .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
            .descriptor_count(1)
            .stage_flags(vk::ShaderStageFlags::VERTEX | vk::ShaderStageFlags::FRAGMENT),
        vk::DescriptorSetLayoutBinding::builder()
            .binding(1)
            .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
            .descriptor_count(1)
            .stage_flags(vk::ShaderStageFlags::VERTEX | vk::ShaderStageFlags::FRAGMENT),
        vk::DescriptorSetLayoutBinding::builder()
            .binding(2)
            .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
            .descriptor_count(1)
            .stage_flags(vk::ShaderStageFlags::FRAGMENT),
    ]
}

/// Builds the sprite default + picking pipelines, bound respectively to the
/// active scene renderpass (viewport if enabled, else main) and the picking
/// renderpass. Spec §4.1 init step 10, §4.3.
pub unsafe fn build_sprite_pipelines(
    device: &Device,
    scene_render_pass: vk::RenderPass,
    scene_msaa_samples: vk::SampleCountFlags,
    picking_render_pass: vk::RenderPass,
) -> Result<PipelineLibrary> {
    let bindings = sprite_bindings();

    let sprite_default = Pipeline::build(
        device,
        &PipelineDescriptor {
            render_pass: scene_render_pass,
            vertex_spv: SPRITE_DEFAULT_VERT,
            fragment_spv: SPRITE_DEFAULT_FRAG,
            set_layout_bindings: &bindings,
            alpha_blend: true,
            color_write_mask: vk::ColorComponentFlags::all(),
            cull_mode: vk::CullModeFlags::BACK,
            depth_test: true,
            depth_write: true,
            depth_compare: vk::CompareOp::LESS_OR_EQUAL,
            msaa_samples: scene_msaa_samples,
        },
    )?;

    let sprite_picking = Pipeline::build(
        device,
        &PipelineDescriptor {
            render_pass: picking_render_pass,
            vertex_spv: SPRITE_PICKING_VERT,
            fragment_spv: SPRITE_PICKING_FRAG,
            set_layout_bindings: &bindings,
            alpha_blend: false,
            color_write_mask: vk::ColorComponentFlags::R,
            cull_mode: vk::CullModeFlags::BACK,
            depth_test: true,
            depth_write: true,
            depth_compare: vk::CompareOp::LESS_OR_EQUAL,
            msaa_samples: vk::SampleCountFlags::_1,
        },
    )?;

    PipelineLibrary::create(device, sprite_default, sprite_picking)
}
