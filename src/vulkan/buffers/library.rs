use anyhow::Result;
use vulkanalia::prelude::v1_0::*;

use crate::uniforms::CameraUbo;
use crate::vulkan::buffers::perframe::PerFrameBuffer;

/// Identifies one of the compile-time-known per-frame buffers the engine
/// itself owns. Only the camera buffer lives here; sprites own their own
/// per-sprite `PerFrameBuffer` directly (§4.8), so this library never grows
/// beyond what the engine's own uniform data needs. Typed key instead of a
/// string tag, per Design Notes "Keyed object libraries".
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BufferKey {
    MainCamera,
}

/// Owns the `"MainCamera"` per-frame uniform buffer (spec §4.1 init step 9:
/// sized to `sizeof(CameraUBO)`, N sub-buffers, host-visible-coherent,
/// usage = uniform).
pub struct BufferLibrary {
    main_camera: PerFrameBuffer,
}

impl BufferLibrary {
    pub unsafe fn create(
        instance: &Instance,
        device: &Device,
        physical_device: vk::PhysicalDevice,
        frames_in_flight: usize,
    ) -> Result<Self> {
        let main_camera = PerFrameBuffer::create(
            instance,
            device,
            physical_device,
            frames_in_flight,
            std::mem::size_of::<CameraUbo>() as vk::DeviceSize,
            vk::BufferUsageFlags::UNIFORM_BUFFER,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
        )?;

        Ok(Self { main_camera })
    }

    pub fn get(&self, key: BufferKey) -> &PerFrameBuffer {
        match key {
            BufferKey::MainCamera => &self.main_camera,
        }
    }

    pub fn get_mut(&mut self, key: BufferKey) -> &mut PerFrameBuffer {
        match key {
            BufferKey::MainCamera => &mut self.main_camera,
        }
    }

    pub unsafe fn destroy(&mut self, device: &Device) {
        self.main_camera.destroy(device);
    }
}
