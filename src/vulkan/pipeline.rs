use anyhow::Result;
use vulkanalia::bytecode::Bytecode;
use vulkanalia::prelude::v1_0::*;

/// Identifies one of the compile-time-known pipelines the sprite system
/// needs. A typed key instead of a string tag, per Design Notes "Keyed
/// object libraries" — the draw path matches on this instead of hashing.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PipelineKey {
    SpriteDefault,
    SpritePicking,
}

/// `{ id: u64, model: mat4 }`, visible to vertex+fragment. Spec §6
/// "On-wire / GPU-visible layouts".
#[repr(C)]
#[derive(Copy, Clone, Debug)]
pub struct PushConstant {
    pub id: u64,
    pub model: cgmath::Matrix4<f32>,
}

/// Everything needed to build one graphics pipeline, independent of any
/// owning object — renderphases hand this to `Pipeline::build` without the
/// pipeline storing a pointer back to them (Design Notes "Cyclic-looking
/// references").
pub struct PipelineDescriptor<'a> {
    pub render_pass: vk::RenderPass,
    pub vertex_spv: &'a [u8],
    pub fragment_spv: &'a [u8],
    pub set_layout_bindings: &'a [vk::DescriptorSetLayoutBindingBuilder<'a>],
    pub alpha_blend: bool,
    pub color_write_mask: vk::ColorComponentFlags,
    pub cull_mode: vk::CullModeFlags,
    pub depth_test: bool,
    pub depth_write: bool,
    pub depth_compare: vk::CompareOp,
    pub msaa_samples: vk::SampleCountFlags,
}

/// A built graphics pipeline plus the layout objects that outlive any one
/// `build` call. No vertex input is ever bound (sprites synthesize their
/// quad from `gl_VertexIndex`), so there are no vertex binding/attribute
/// arrays to own — unlike the teacher's mesh pipeline, this family needs
/// none.
pub struct Pipeline {
    pub descriptor_set_layout: vk::DescriptorSetLayout,
    pub pipeline_layout: vk::PipelineLayout,
    pub pipeline: vk::Pipeline,
}

impl Pipeline {
    /// Builds with dynamic viewport+scissor (spec §4.3 "`build` finalizes
    /// the pipeline with dynamic viewport+scissor"), a single push-constant
    /// range covering `PushConstant` visible to vertex+fragment.
    pub unsafe fn build(device: &Device, descriptor: &PipelineDescriptor) -> Result<Self> {
        let vert_module = create_shader_module(device, descriptor.vertex_spv)?;
        let frag_module = create_shader_module(device, descriptor.fragment_spv)?;

        let vert_stage = vk::PipelineShaderStageCreateInfo::builder()
            .stage(vk::ShaderStageFlags::VERTEX)
            .module(vert_module)
            .name(b"main\0");

        let frag_stage = vk::PipelineShaderStageCreateInfo::builder()
            .stage(vk::ShaderStageFlags::FRAGMENT)
            .module(frag_module)
            .name(b"main\0");

        // No vertex input: the quad is synthesized in the vertex shader
        // from `gl_VertexIndex` over a 6-vertex draw.
        let vertex_input_state = vk::PipelineVertexInputStateCreateInfo::builder();

        let input_assembly_state = vk::PipelineInputAssemblyStateCreateInfo::builder()
            .topology(vk::PrimitiveTopology::TRIANGLE_LIST)
            .primitive_restart_enable(false);

        let viewport_state = vk::PipelineViewportStateCreateInfo::builder()
            .viewport_count(1)
            .scissor_count(1);

        let dynamic_states = &[vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];
        let dynamic_state =
            vk::PipelineDynamicStateCreateInfo::builder().dynamic_states(dynamic_states);

        let rasterization_state = vk::PipelineRasterizationStateCreateInfo::builder()
            .depth_clamp_enable(false)
            .rasterizer_discard_enable(false)
            .polygon_mode(vk::PolygonMode::FILL)
            .line_width(1.0)
            .cull_mode(descriptor.cull_mode)
            .front_face(vk::FrontFace::CLOCKWISE)
            .depth_bias_enable(false);

        let multisample_state = vk::PipelineMultisampleStateCreateInfo::builder()
            .sample_shading_enable(false)
            .rasterization_samples(descriptor.msaa_samples);

        let depth_stencil_state = vk::PipelineDepthStencilStateCreateInfo::builder()
            .depth_test_enable(descriptor.depth_test)
            .depth_write_enable(descriptor.depth_write)
            .depth_compare_op(descriptor.depth_compare)
            .depth_bounds_test_enable(false)
            .stencil_test_enable(false);

        let attachment = vk::PipelineColorBlendAttachmentState::builder()
            .color_write_mask(descriptor.color_write_mask)
            .blend_enable(descriptor.alpha_blend)
            .src_color_blend_factor(vk::BlendFactor::SRC_ALPHA)
            .dst_color_blend_factor(vk::BlendFactor::ONE_MINUS_SRC_ALPHA)
            .color_blend_op(vk::BlendOp::ADD)
            .src_alpha_blend_factor(vk::BlendFactor::ONE)
            .dst_alpha_blend_factor(vk::BlendFactor::ONE_MINUS_SRC_ALPHA)
            .alpha_blend_op(vk::BlendOp::ADD);

        let attachments = &[attachment];
        let color_blend_state = vk::PipelineColorBlendStateCreateInfo::builder()
            .logic_op_enable(false)
            .logic_op(vk::LogicOp::COPY)
            .attachments(attachments)
            .blend_constants([0.0, 0.0, 0.0, 0.0]);

        let bindings: Vec<vk::DescriptorSetLayoutBinding> =
            descriptor.set_layout_bindings.iter().map(|b| **b).collect();
        let layout_info = vk::DescriptorSetLayoutCreateInfo::builder().bindings(&bindings);
        let descriptor_set_layout = device.create_descriptor_set_layout(&layout_info, None)?;

        let push_constant_range = vk::PushConstantRange::builder()
            .stage_flags(vk::ShaderStageFlags::VERTEX | vk::ShaderStageFlags::FRAGMENT)
            .offset(0)
            .size(std::mem::size_of::<PushConstant>() as u32);

        let set_layouts = &[descriptor_set_layout];
        let push_constant_ranges = &[push_constant_range];
        let layout_info = vk::PipelineLayoutCreateInfo::builder()
            .set_layouts(set_layouts)
            .push_constant_ranges(push_constant_ranges);

        let pipeline_layout = device.create_pipeline_layout(&layout_info, None)?;

        let stages = &[vert_stage, frag_stage];
        let info = vk::GraphicsPipelineCreateInfo::builder()
            .stages(stages)
            .vertex_input_state(&vertex_input_state)
            .input_assembly_state(&input_assembly_state)
            .viewport_state(&viewport_state)
            .dynamic_state(&dynamic_state)
            .rasterization_state(&rasterization_state)
            .multisample_state(&multisample_state)
            .depth_stencil_state(&depth_stencil_state)
            .color_blend_state(&color_blend_state)
            .layout(pipeline_layout)
            .render_pass(descriptor.render_pass)
            .subpass(0);

        let pipeline =
            device.create_graphics_pipelines(vk::PipelineCache::null(), &[info], None)?.0[0];

        device.destroy_shader_module(vert_module, None);
        device.destroy_shader_module(frag_module, None);

        Ok(Self { descriptor_set_layout, pipeline_layout, pipeline })
    }

    pub unsafe fn destroy(&self, device: &Device) {
        device.destroy_pipeline(self.pipeline, None);
        device.destroy_pipeline_layout(self.pipeline_layout, None);
        device.destroy_descriptor_set_layout(self.descriptor_set_layout, None);
    }
}

/// How many sprite descriptor sets the shared pool backs, across every
/// frame-in-flight. An implementer may replace per-sprite descriptor pools
/// with a shared pool managed by the pipeline library (Design Notes
/// "Per-sprite descriptor sets"); this crate takes that option.
pub const SPRITE_DESCRIPTOR_POOL_MAX_SETS: u32 = 4096;

/// Owns the sprite default and picking pipelines by name instead of a
/// hash map, per Design Notes "Keyed object libraries": `get` is a match,
/// not a lookup. Also owns the descriptor pool every sprite allocates its
/// per-frame descriptor sets from, since `sprite_default` and
/// `sprite_picking` were built with identically defined bindings and push
/// constant ranges and are therefore pipeline-layout-compatible: one set
/// allocated against either's layout binds validly to both.
pub struct PipelineLibrary {
    pub sprite_default: Pipeline,
    pub sprite_picking: Pipeline,
    sprite_descriptor_pool: vk::DescriptorPool,
}

impl PipelineLibrary {
    pub unsafe fn create(device: &Device, sprite_default: Pipeline, sprite_picking: Pipeline) -> Result<Self> {
        let sprite_descriptor_pool = crate::vulkan::buffers::perframe::create_sprite_descriptor_pool(
            device,
            SPRITE_DESCRIPTOR_POOL_MAX_SETS,
        )?;

        Ok(Self { sprite_default, sprite_picking, sprite_descriptor_pool })
    }

    pub fn get(&self, key: PipelineKey) -> &Pipeline {
        match key {
            PipelineKey::SpriteDefault => &self.sprite_default,
            PipelineKey::SpritePicking => &self.sprite_picking,
        }
    }

    pub fn sprite_descriptor_set_layout(&self) -> vk::DescriptorSetLayout {
        self.sprite_default.descriptor_set_layout
    }

    /// Allocates one descriptor set per frame-in-flight for a single
    /// sprite from the shared pool, bound to {camera UBO, this sprite's
    /// own UBO, its albedo}. Spec §4.8.
    #[allow(clippy::too_many_arguments)]
    pub unsafe fn allocate_sprite_descriptor_sets(
        &self,
        device: &Device,
        frames_in_flight: usize,
        camera_ubo: &crate::vulkan::buffers::perframe::PerFrameBuffer,
        camera_ubo_size: vk::DeviceSize,
        sprite_ubo: &crate::vulkan::buffers::perframe::PerFrameBuffer,
        sprite_ubo_size: vk::DeviceSize,
        image_view: vk::ImageView,
        sampler: vk::Sampler,
    ) -> Result<Vec<vk::DescriptorSet>> {
        crate::vulkan::buffers::perframe::create_sprite_descriptor_sets(
            device,
            self.sprite_descriptor_pool,
            self.sprite_descriptor_set_layout(),
            frames_in_flight,
            camera_ubo,
            camera_ubo_size,
            sprite_ubo,
            sprite_ubo_size,
            image_view,
            sampler,
        )
    }

    pub unsafe fn destroy(&self, device: &Device) {
        device.destroy_descriptor_pool(self.sprite_descriptor_pool, None);
        self.sprite_default.destroy(device);
        self.sprite_picking.destroy(device);
    }
}

unsafe fn create_shader_module(device: &Device, bytecode: &[u8]) -> Result<vk::ShaderModule> {
    let bytecode = Bytecode::new(bytecode).unwrap();
    let info = vk::ShaderModuleCreateInfo::builder()
        .code_size(bytecode.code_size())
        .code(bytecode.code());

    Ok(device.create_shader_module(&info, None)?)
}