use anyhow::Result;
use cgmath::Matrix4;
use vulkanalia::prelude::v1_0::*;

use crate::uniforms::SpriteUbo;
use crate::vulkan::buffers::perframe::PerFrameBuffer;
use crate::vulkan::image::Texture2D;
use crate::vulkan::pipeline::{PipelineKey, PipelineLibrary, PushConstant};
use crate::vulkan::renderphase::RenderphaseTag;

/// External collaborator contract (spec §4.8): a sprite owns an id, a
/// per-sprite UBO and its per-frame buffer, one albedo texture, and a
/// per-frame descriptor set array bound to {camera UBO, sprite UBO,
/// albedo}. `render` consults the current renderphase tag to pick the
/// matching pipeline and is a no-op outside Main/Viewport/Picking.
pub struct Sprite {
    id: u64,
    ubo: SpriteUbo,
    ubo_buffer: PerFrameBuffer,
    pub texture: Texture2D,
    descriptor_sets: Vec<vk::DescriptorSet>,
}

impl Sprite {
    #[allow(clippy::too_many_arguments)]
    pub unsafe fn create(
        instance: &Instance,
        device: &Device,
        physical_device: vk::PhysicalDevice,
        frames_in_flight: usize,
        id: u64,
        texture: Texture2D,
        camera_ubo: &PerFrameBuffer,
        pipeline_library: &PipelineLibrary,
    ) -> Result<Self> {
        let ubo = SpriteUbo::new(0.0, [0.0, 0.0], [1.0, 1.0]);
        let ubo_size = std::mem::size_of::<SpriteUbo>() as vk::DeviceSize;

        let mut ubo_buffer = PerFrameBuffer::create(
            instance,
            device,
            physical_device,
            frames_in_flight,
            ubo_size,
            vk::BufferUsageFlags::UNIFORM_BUFFER,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
        )?;

        for frame in 0..frames_in_flight {
            ubo_buffer.copy(
                frame,
                &ubo as *const SpriteUbo as *const u8,
                ubo_size,
                0,
            )?;
        }

        let camera_ubo_size = std::mem::size_of::<crate::uniforms::CameraUbo>() as vk::DeviceSize;

        let descriptor_sets = pipeline_library.allocate_sprite_descriptor_sets(
            device,
            frames_in_flight,
            camera_ubo,
            camera_ubo_size,
            &ubo_buffer,
            ubo_size,
            texture.view,
            texture.sampler,
        )?;

        Ok(Self { id, ubo, ubo_buffer, texture, descriptor_sets })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn set_uv(&mut self, rotation: f32, offset: [f32; 2], scale: [f32; 2]) {
        self.ubo = SpriteUbo::new(rotation, offset, scale);
    }

    /// Writes the sprite's current UBO into this frame's sub-buffer.
    /// Callers invoke this once per tick, mirroring how the camera UBO is
    /// written (spec §4.1 step 3), before any `render` call for that frame.
    pub unsafe fn write_ubo(&mut self, frame: usize) -> Result<()> {
        let size = std::mem::size_of::<SpriteUbo>() as vk::DeviceSize;
        self.ubo_buffer.copy(frame, &self.ubo as *const SpriteUbo as *const u8, size, 0)
    }

    /// Picks `SPRITE:DEFAULT` for Main/Viewport, `SPRITE:PICKING` for
    /// Picking, and draws nothing for UI — spec §4.8, resolving Open
    /// Question 1 (no Viewport-falls-through-to-Picking bug).
    pub unsafe fn render(
        &self,
        device: &Device,
        command_buffer: vk::CommandBuffer,
        pipeline_library: &PipelineLibrary,
        phase: RenderphaseTag,
        frame: usize,
        model: Matrix4<f32>,
    ) {
        let key = match phase {
            RenderphaseTag::Main | RenderphaseTag::Viewport => PipelineKey::SpriteDefault,
            RenderphaseTag::Picking => PipelineKey::SpritePicking,
            RenderphaseTag::UI => return,
        };

        let pipeline = pipeline_library.get(key);

        let push_constant = PushConstant { id: self.id, model };
        let bytes = std::slice::from_raw_parts(
            &push_constant as *const PushConstant as *const u8,
            std::mem::size_of::<PushConstant>(),
        );

        device.cmd_bind_pipeline(command_buffer, vk::PipelineBindPoint::GRAPHICS, pipeline.pipeline);
        device.cmd_push_constants(
            command_buffer,
            pipeline.pipeline_layout,
            vk::ShaderStageFlags::VERTEX | vk::ShaderStageFlags::FRAGMENT,
            0,
            bytes,
        );
        device.cmd_bind_descriptor_sets(
            command_buffer,
            vk::PipelineBindPoint::GRAPHICS,
            pipeline.pipeline_layout,
            0,
            &[self.descriptor_sets[frame]],
            &[],
        );
        device.cmd_draw(command_buffer, 6, 1, 0, 0);
    }

    /// The descriptor set is freed implicitly when the shared pool in
    /// `PipelineLibrary` is destroyed at shutdown, not here (the pool is
    /// not created with `FREE_DESCRIPTOR_SET`, matching the teacher's
    /// per-device rather than per-object pooling idiom).
    pub unsafe fn destroy(&mut self, device: &Device) {
        self.texture.destroy(device);
        self.ubo_buffer.destroy(device);
    }
}
