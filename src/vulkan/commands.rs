use anyhow::Result;
use vulkanalia::prelude::v1_0::*;

/// Creates a command pool for `queue_family` with `RESET_COMMAND_BUFFER` set,
/// per spec §4.2 ("a command pool (reset-command-buffer flag set)").
pub unsafe fn create_command_pool(device: &Device, queue_family: u32) -> Result<vk::CommandPool> {
    let info = vk::CommandPoolCreateInfo::builder()
        .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER)
        .queue_family_index(queue_family);

    Ok(device.create_command_pool(&info, None)?)
}

/// Allocates `count` primary command buffers from `pool`.
pub unsafe fn allocate_command_buffers(
    device: &Device,
    pool: vk::CommandPool,
    count: u32,
) -> Result<Vec<vk::CommandBuffer>> {
    let info = vk::CommandBufferAllocateInfo::builder()
        .command_pool(pool)
        .level(vk::CommandBufferLevel::PRIMARY)
        .command_buffer_count(count);

    Ok(device.allocate_command_buffers(&info)?)
}

/// Allocates one transient command buffer and begins it
/// `ONE_TIME_SUBMIT`, for single-shot transfer/barrier work (texture
/// uploads, the picker blit).
pub unsafe fn begin_single_time_commands(
    device: &Device,
    pool: vk::CommandPool,
) -> Result<vk::CommandBuffer> {
    let command_buffer = allocate_command_buffers(device, pool, 1)?[0];

    let info = vk::CommandBufferBeginInfo::builder()
        .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);

    device.begin_command_buffer(command_buffer, &info)?;

    Ok(command_buffer)
}

/// Ends, submits, and waits for `command_buffer` on `queue`, then frees it.
/// Used where an immediate round-trip is required (no frame-in-flight
/// pipelining), matching the teacher's `copy_buffer` helper.
pub unsafe fn end_single_time_commands(
    device: &Device,
    pool: vk::CommandPool,
    queue: vk::Queue,
    command_buffer: vk::CommandBuffer,
) -> Result<()> {
    device.end_command_buffer(command_buffer)?;

    let command_buffers = &[command_buffer];
    let info = vk::SubmitInfo::builder().command_buffers(command_buffers);

    device.queue_submit(queue, &[info], vk::Fence::null())?;
    device.queue_wait_idle(queue)?;

    device.free_command_buffers(pool, command_buffers);

    Ok(())
}
