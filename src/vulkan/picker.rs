use anyhow::Result;
use vulkanalia::prelude::v1_0::*;

use crate::vulkan::buffers::buffer::create_buffer;
use crate::vulkan::renderphase::picking::PICKING_FORMAT;

/// Scales a logical pointer coordinate into a swapchain-pixel coordinate:
/// `fb = logical * swapchainExtent / viewportLogicalSize`. When the
/// viewport phase is disabled, `viewport_logical_size` is the swapchain
/// extent itself, making the scale a no-op. Spec §4.7 step 4.
pub fn scale_to_framebuffer(
    logical_x: i32,
    logical_y: i32,
    swapchain_extent: vk::Extent2D,
    viewport_logical_size: (u32, u32),
) -> (i32, i32) {
    let (vw, vh) = viewport_logical_size;
    if vw == 0 || vh == 0 {
        return (logical_x, logical_y);
    }
    let fx = (logical_x as i64 * swapchain_extent.width as i64) / vw as i64;
    let fy = (logical_y as i64 * swapchain_extent.height as i64) / vh as i64;
    (fx as i32, fy as i32)
}

/// Synchronous GPU -> host readback of one pixel from the picking color
/// attachment. Spec §4.7. Every allocation made here (staging buffer,
/// memory, command buffer, fence) is freed on every return path, including
/// the early "out of bounds" return that skips touching the GPU at all.
pub unsafe fn pick(
    device: &Device,
    instance: &Instance,
    physical_device: vk::PhysicalDevice,
    queue: vk::Queue,
    command_pool: vk::CommandPool,
    picking_color_image: vk::Image,
    swapchain_extent: vk::Extent2D,
    fb_x: i32,
    fb_y: i32,
) -> Result<u32> {
    if fb_x < 0
        || fb_y < 0
        || fb_x as u32 >= swapchain_extent.width
        || fb_y as u32 >= swapchain_extent.height
    {
        return Ok(0);
    }

    const STAGING_SIZE: vk::DeviceSize = 4;

    let (staging_buffer, staging_memory) = create_buffer(
        instance,
        device,
        physical_device,
        STAGING_SIZE,
        vk::BufferUsageFlags::TRANSFER_DST,
        vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
    )?;

    let result = record_and_submit_readback(
        device,
        queue,
        command_pool,
        picking_color_image,
        staging_buffer,
        fb_x as u32,
        fb_y as u32,
    );

    let pixel = match result {
        Ok(()) => {
            let memory = device.map_memory(staging_memory, 0, STAGING_SIZE, vk::MemoryMapFlags::empty());
            match memory {
                Ok(ptr) => {
                    let value = *(ptr as *const u32);
                    device.unmap_memory(staging_memory);
                    Ok(value)
                }
                Err(e) => Err(e.into()),
            }
        }
        Err(e) => Err(e),
    };

    device.destroy_buffer(staging_buffer, None);
    device.free_memory(staging_memory, None);

    pixel
}

unsafe fn record_and_submit_readback(
    device: &Device,
    queue: vk::Queue,
    command_pool: vk::CommandPool,
    picking_color_image: vk::Image,
    staging_buffer: vk::Buffer,
    fb_x: u32,
    fb_y: u32,
) -> Result<()> {
    let alloc_info = vk::CommandBufferAllocateInfo::builder()
        .command_pool(command_pool)
        .level(vk::CommandBufferLevel::PRIMARY)
        .command_buffer_count(1);
    let command_buffer = device.allocate_command_buffers(&alloc_info)?[0];

    let result = (|| -> Result<()> {
        let begin_info = vk::CommandBufferBeginInfo::builder()
            .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
        device.begin_command_buffer(command_buffer, &begin_info)?;

        let subresource = vk::ImageSubresourceRange::builder()
            .aspect_mask(vk::ImageAspectFlags::COLOR)
            .base_mip_level(0)
            .level_count(1)
            .base_array_layer(0)
            .layer_count(1);

        let to_transfer_src = vk::ImageMemoryBarrier::builder()
            .image(picking_color_image)
            .old_layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)
            .new_layout(vk::ImageLayout::TRANSFER_SRC_OPTIMAL)
            .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .subresource_range(subresource)
            .src_access_mask(vk::AccessFlags::COLOR_ATTACHMENT_WRITE)
            .dst_access_mask(vk::AccessFlags::TRANSFER_READ);

        device.cmd_pipeline_barrier(
            command_buffer,
            vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
            vk::PipelineStageFlags::TRANSFER,
            vk::DependencyFlags::empty(),
            &[] as &[vk::MemoryBarrier],
            &[] as &[vk::BufferMemoryBarrier],
            &[to_transfer_src],
        );

        let image_subresource = vk::ImageSubresourceLayers::builder()
            .aspect_mask(vk::ImageAspectFlags::COLOR)
            .mip_level(0)
            .base_array_layer(0)
            .layer_count(1);

        let region = vk::BufferImageCopy::builder()
            .buffer_offset(0)
            .buffer_row_length(0)
            .buffer_image_height(0)
            .image_subresource(image_subresource)
            .image_offset(vk::Offset3D { x: fb_x as i32, y: fb_y as i32, z: 0 })
            .image_extent(vk::Extent3D { width: 1, height: 1, depth: 1 });

        device.cmd_copy_image_to_buffer(
            command_buffer,
            picking_color_image,
            vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
            staging_buffer,
            &[region],
        );

        let back_to_shader_read = vk::ImageMemoryBarrier::builder()
            .image(picking_color_image)
            .old_layout(vk::ImageLayout::TRANSFER_SRC_OPTIMAL)
            .new_layout(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL)
            .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .subresource_range(subresource)
            .src_access_mask(vk::AccessFlags::TRANSFER_READ)
            .dst_access_mask(vk::AccessFlags::SHADER_READ);

        device.cmd_pipeline_barrier(
            command_buffer,
            vk::PipelineStageFlags::TRANSFER,
            vk::PipelineStageFlags::FRAGMENT_SHADER,
            vk::DependencyFlags::empty(),
            &[] as &[vk::MemoryBarrier],
            &[] as &[vk::BufferMemoryBarrier],
            &[back_to_shader_read],
        );

        device.end_command_buffer(command_buffer)?;

        let fence_info = vk::FenceCreateInfo::builder();
        let fence = device.create_fence(&fence_info, None)?;

        let command_buffers = &[command_buffer];
        let submit_info = vk::SubmitInfo::builder().command_buffers(command_buffers);

        let submit_result = device
            .queue_submit(queue, &[submit_info], fence)
            .and_then(|_| device.wait_for_fences(&[fence], true, u64::MAX));

        device.destroy_fence(fence, None);
        submit_result?;

        Ok(())
    })();

    device.free_command_buffers(command_pool, &[command_buffer]);

    result
}

/// Returns the picking renderphase's color image format, re-exported here
/// so callers needn't reach into `renderphase::picking` directly.
pub const fn picking_format() -> vk::Format {
    PICKING_FORMAT
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scale_is_identity_when_viewport_disabled() {
        let extent = vk::Extent2D { width: 1920, height: 1080 };
        let (x, y) = scale_to_framebuffer(100, 200, extent, (1920, 1080));
        assert_eq!((x, y), (100, 200));
    }

    #[test]
    fn scale_maps_logical_viewport_into_framebuffer_pixels() {
        let extent = vk::Extent2D { width: 1920, height: 1080 };
        let (x, y) = scale_to_framebuffer(50, 50, extent, (960, 540));
        assert_eq!((x, y), (100, 100));
    }
}
