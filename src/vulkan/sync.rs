use anyhow::Result;
use vulkanalia::prelude::v1_0::*;

use crate::MAX_FRAMES_IN_FLIGHT;

/// Owns the semaphores and fences that pace the double-buffered frame loop.
/// Spec §4.5: `image_available` semaphores and `in_flight` fences are sized
/// to `MAX_FRAMES_IN_FLIGHT`, but `render_finished` semaphores are sized to
/// the swapchain's image count — a frame and the swapchain image it ends up
/// presenting are not the same index, so a single render-finished semaphore
/// per frame-in-flight can be signaled while still awaited by a present
/// call from a different frame. One per swapchain image avoids that.
pub struct FrameSynchronizer {
    pub image_available_semaphores: Vec<vk::Semaphore>,
    pub render_finished_semaphores: Vec<vk::Semaphore>,
    pub in_flight_fences: Vec<vk::Fence>,
    current_frame: usize,
}

impl FrameSynchronizer {
    pub unsafe fn create(device: &Device, swapchain_image_count: usize) -> Result<Self> {
        let semaphore_info = vk::SemaphoreCreateInfo::builder();
        let fence_info = vk::FenceCreateInfo::builder().flags(vk::FenceCreateFlags::SIGNALED);

        let mut image_available_semaphores = Vec::with_capacity(MAX_FRAMES_IN_FLIGHT);
        let mut in_flight_fences = Vec::with_capacity(MAX_FRAMES_IN_FLIGHT);

        for _ in 0..MAX_FRAMES_IN_FLIGHT {
            image_available_semaphores.push(device.create_semaphore(&semaphore_info, None)?);
            in_flight_fences.push(device.create_fence(&fence_info, None)?);
        }

        let mut render_finished_semaphores = Vec::with_capacity(swapchain_image_count);
        for _ in 0..swapchain_image_count {
            render_finished_semaphores.push(device.create_semaphore(&semaphore_info, None)?);
        }

        Ok(Self {
            image_available_semaphores,
            render_finished_semaphores,
            in_flight_fences,
            current_frame: 0,
        })
    }

    pub fn current_frame(&self) -> usize {
        self.current_frame
    }

    pub fn advance(&mut self) {
        self.current_frame = (self.current_frame + 1) % MAX_FRAMES_IN_FLIGHT;
    }

    /// Destroys and recreates only `render_finished_semaphores`, the single
    /// swapchain-image-count-sized resource this struct owns. Used by resize
    /// recovery, which must not touch the frame-indexed fences/semaphores.
    pub unsafe fn resize_render_finished_semaphores(
        &mut self,
        device: &Device,
        swapchain_image_count: usize,
    ) -> Result<()> {
        for &semaphore in &self.render_finished_semaphores {
            device.destroy_semaphore(semaphore, None);
        }

        let semaphore_info = vk::SemaphoreCreateInfo::builder();
        let mut render_finished_semaphores = Vec::with_capacity(swapchain_image_count);
        for _ in 0..swapchain_image_count {
            render_finished_semaphores.push(device.create_semaphore(&semaphore_info, None)?);
        }
        self.render_finished_semaphores = render_finished_semaphores;
        Ok(())
    }

    pub unsafe fn destroy(&mut self, device: &Device) {
        for &semaphore in &self.render_finished_semaphores {
            device.destroy_semaphore(semaphore, None);
        }
        for &semaphore in &self.image_available_semaphores {
            device.destroy_semaphore(semaphore, None);
        }
        for &fence in &self.in_flight_fences {
            device.destroy_fence(fence, None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_wraps_modulo_frames_in_flight() {
        let mut frame = 0usize;
        for _ in 0..MAX_FRAMES_IN_FLIGHT * 3 {
            frame = (frame + 1) % MAX_FRAMES_IN_FLIGHT;
        }
        assert!(frame < MAX_FRAMES_IN_FLIGHT);
    }
}
