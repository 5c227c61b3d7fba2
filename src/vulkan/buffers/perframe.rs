use std::ffi::c_void;
use std::ptr::copy_nonoverlapping as memcpy;

use anyhow::Result;
use vulkanalia::prelude::v1_0::*;

use crate::errors::EvkError;
use crate::vulkan::buffers::buffer::create_buffer;

/// A keyed, per-frame-in-flight buffer: N independent device allocations,
/// one per frame-in-flight index, so that writing frame `i`'s data never
/// races the GPU still reading frame `i - N`'s data. Spec §4.6.
pub struct PerFrameBuffer {
    pub logical_size: vk::DeviceSize,
    pub aligned_per_frame_stride: vk::DeviceSize,
    usage: vk::BufferUsageFlags,
    memory_properties: vk::MemoryPropertyFlags,
    buffers: Vec<vk::Buffer>,
    memories: Vec<vk::DeviceMemory>,
    mapped: Vec<Option<*mut c_void>>,
}

impl PerFrameBuffer {
    pub unsafe fn create(
        instance: &Instance,
        device: &Device,
        physical_device: vk::PhysicalDevice,
        frames_in_flight: usize,
        size: vk::DeviceSize,
        usage: vk::BufferUsageFlags,
        memory_properties: vk::MemoryPropertyFlags,
    ) -> Result<Self> {
        let host_visible = memory_properties.contains(vk::MemoryPropertyFlags::HOST_VISIBLE);

        let mut buffers = Vec::with_capacity(frames_in_flight);
        let mut memories = Vec::with_capacity(frames_in_flight);

        for _ in 0..frames_in_flight {
            let (buffer, memory) =
                create_buffer(instance, device, physical_device, size, usage, memory_properties)?;
            buffers.push(buffer);
            memories.push(memory);
        }

        let mut mapped = vec![None; frames_in_flight];

        if host_visible {
            for (i, m) in mapped.iter_mut().enumerate() {
                let ptr = device.map_memory(memories[i], 0, size, vk::MemoryMapFlags::empty())?;
                *m = Some(ptr);
            }
        }

        Ok(Self {
            logical_size: size,
            aligned_per_frame_stride: size,
            usage,
            memory_properties,
            buffers,
            memories,
            mapped,
        })
    }

    /// `ceil(size / align) * align` where `align = max(non_coherent_atom_size,
    /// min_uniform_buffer_offset_alignment)`. Spec §4.6.
    pub fn compute_aligned_stride(
        size: vk::DeviceSize,
        non_coherent_atom_size: vk::DeviceSize,
        min_uniform_buffer_offset_alignment: vk::DeviceSize,
    ) -> vk::DeviceSize {
        let align = non_coherent_atom_size.max(min_uniform_buffer_offset_alignment).max(1);
        ((size + align - 1) / align) * align
    }

    pub fn set_aligned_stride(&mut self, stride: vk::DeviceSize) {
        self.aligned_per_frame_stride = stride;
    }

    pub fn buffer(&self, index: usize) -> vk::Buffer {
        self.buffers[index]
    }

    pub fn usage(&self) -> vk::BufferUsageFlags {
        self.usage
    }

    pub unsafe fn destroy(&mut self, device: &Device) {
        for i in 0..self.buffers.len() {
            self.unmap(device, i);
            device.destroy_buffer(self.buffers[i], None);
            device.free_memory(self.memories[i], None);
        }
    }

    /// Maps the whole range of sub-buffer `index` if not already mapped.
    pub unsafe fn map(&mut self, device: &Device, index: usize) -> Result<*mut c_void> {
        if !self.memory_properties.contains(vk::MemoryPropertyFlags::HOST_VISIBLE) {
            return Err(EvkError::NotHostVisible.into());
        }
        if let Some(ptr) = self.mapped[index] {
            return Ok(ptr);
        }
        let ptr = device.map_memory(
            self.memories[index],
            0,
            self.logical_size,
            vk::MemoryMapFlags::empty(),
        )?;
        self.mapped[index] = Some(ptr);
        Ok(ptr)
    }

    /// Idempotent: unmapping an already-unmapped sub-buffer is a no-op.
    pub unsafe fn unmap(&mut self, device: &Device, index: usize) {
        if self.mapped[index].take().is_some() {
            device.unmap_memory(self.memories[index]);
        }
    }

    /// `memcpy`s `size` bytes from `src` into sub-buffer `index` at
    /// `dst_offset`. Fails if the region is out of bounds or not mapped.
    pub unsafe fn copy(
        &mut self,
        index: usize,
        src: *const u8,
        size: vk::DeviceSize,
        dst_offset: vk::DeviceSize,
    ) -> Result<()> {
        if dst_offset + size > self.logical_size {
            return Err(EvkError::CopyOutOfBounds {
                size,
                offset: dst_offset,
                capacity: self.logical_size,
            }
            .into());
        }
        let ptr = match self.mapped[index] {
            Some(ptr) => ptr,
            None => return Err(EvkError::NotMapped(index).into()),
        };
        memcpy(src, (ptr as *mut u8).add(dst_offset as usize), size as usize);
        Ok(())
    }

    /// No-op for host-coherent memory; otherwise rounds `[offset,
    /// offset+size)` outward to `non_coherent_atom_size` and clamps it to
    /// the buffer's logical size before flushing. Spec §4.6.
    pub unsafe fn flush(
        &self,
        device: &Device,
        index: usize,
        size: vk::DeviceSize,
        non_coherent_atom_size: vk::DeviceSize,
        offset: vk::DeviceSize,
    ) -> Result<()> {
        if self.memory_properties.contains(vk::MemoryPropertyFlags::HOST_COHERENT) {
            return Ok(());
        }

        let (flush_offset, flush_size) =
            Self::align_flush_range(offset, size, non_coherent_atom_size, self.logical_size);

        let range = vk::MappedMemoryRange::builder()
            .memory(self.memories[index])
            .offset(flush_offset)
            .size(flush_size);

        device.flush_mapped_memory_ranges(&[range])?;
        Ok(())
    }

    /// Pure helper (host-computable, no device needed): expands `[offset,
    /// offset+size)` outward to multiples of `atom`, then clamps to
    /// `capacity`.
    pub fn align_flush_range(
        offset: vk::DeviceSize,
        size: vk::DeviceSize,
        atom: vk::DeviceSize,
        capacity: vk::DeviceSize,
    ) -> (vk::DeviceSize, vk::DeviceSize) {
        if atom == 0 {
            return (offset, size.min(capacity.saturating_sub(offset)));
        }
        let aligned_offset = (offset / atom) * atom;
        let end = offset + size;
        let aligned_end = ((end + atom - 1) / atom) * atom;
        let aligned_end = aligned_end.min(capacity);
        let aligned_size = aligned_end.saturating_sub(aligned_offset);
        (aligned_offset, aligned_size)
    }

    /// Records a device-side copy from one frame slot of `src` to one frame
    /// slot of `dst`.
    pub unsafe fn command_copy(
        device: &Device,
        command_buffer: vk::CommandBuffer,
        src: &PerFrameBuffer,
        src_index: usize,
        dst: &PerFrameBuffer,
        dst_index: usize,
        size: vk::DeviceSize,
        src_offset: vk::DeviceSize,
        dst_offset: vk::DeviceSize,
    ) {
        let region = vk::BufferCopy::builder()
            .src_offset(src_offset)
            .dst_offset(dst_offset)
            .size(size);

        device.cmd_copy_buffer(
            command_buffer,
            src.buffers[src_index],
            dst.buffers[dst_index],
            &[region],
        );
    }
}

/// A descriptor pool sized for `max_sets` sprite descriptor sets (each
/// consuming two uniform-buffer descriptors and one combined-image-sampler
/// descriptor). Spec §4.3.
pub unsafe fn create_sprite_descriptor_pool(
    device: &Device,
    max_sets: u32,
) -> Result<vk::DescriptorPool> {
    let ubo_size = vk::DescriptorPoolSize::builder()
        .type_(vk::DescriptorType::UNIFORM_BUFFER)
        .descriptor_count(max_sets * 2);

    let sampler_size = vk::DescriptorPoolSize::builder()
        .type_(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
        .descriptor_count(max_sets);

    let pool_sizes = &[ubo_size, sampler_size];
    let info = vk::DescriptorPoolCreateInfo::builder()
        .pool_sizes(pool_sizes)
        .max_sets(max_sets);

    Ok(device.create_descriptor_pool(&info, None)?)
}

/// Allocates one descriptor set per frame-in-flight and binds it to the
/// camera UBO, the sprite's own per-frame UBO, and the albedo's combined
/// image sampler.
pub unsafe fn create_sprite_descriptor_sets(
    device: &Device,
    pool: vk::DescriptorPool,
    layout: vk::DescriptorSetLayout,
    frames_in_flight: usize,
    camera_ubo: &PerFrameBuffer,
    camera_ubo_size: vk::DeviceSize,
    sprite_ubo: &PerFrameBuffer,
    sprite_ubo_size: vk::DeviceSize,
    image_view: vk::ImageView,
    sampler: vk::Sampler,
) -> Result<Vec<vk::DescriptorSet>> {
    let layouts = vec![layout; frames_in_flight];
    let info = vk::DescriptorSetAllocateInfo::builder()
        .descriptor_pool(pool)
        .set_layouts(&layouts);

    let sets = device.allocate_descriptor_sets(&info)?;

    for (i, set) in sets.iter().enumerate() {
        let camera_info = vk::DescriptorBufferInfo::builder()
            .buffer(camera_ubo.buffer(i))
            .offset(0)
            .range(camera_ubo_size);
        let camera_buffer_info = &[camera_info];

        let sprite_info = vk::DescriptorBufferInfo::builder()
            .buffer(sprite_ubo.buffer(i))
            .offset(0)
            .range(sprite_ubo_size);
        let sprite_buffer_info = &[sprite_info];

        let image_info = vk::DescriptorImageInfo::builder()
            .image_layout(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL)
            .image_view(image_view)
            .sampler(sampler);
        let image_infos = &[image_info];

        let camera_write = vk::WriteDescriptorSet::builder()
            .dst_set(*set)
            .dst_binding(0)
            .dst_array_element(0)
            .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
            .buffer_info(camera_buffer_info);

        let sprite_write = vk::WriteDescriptorSet::builder()
            .dst_set(*set)
            .dst_binding(1)
            .dst_array_element(0)
            .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
            .buffer_info(sprite_buffer_info);

        let sampler_write = vk::WriteDescriptorSet::builder()
            .dst_set(*set)
            .dst_binding(2)
            .dst_array_element(0)
            .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
            .image_info(image_infos);

        device.update_descriptor_sets(
            &[camera_write, sprite_write, sampler_write],
            &[] as &[vk::CopyDescriptorSet],
        );
    }

    Ok(sets)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aligned_stride_rounds_up_to_alignment() {
        let stride = PerFrameBuffer::compute_aligned_stride(20, 0, 64);
        assert_eq!(stride, 64);
        let stride_exact = PerFrameBuffer::compute_aligned_stride(64, 0, 64);
        assert_eq!(stride_exact, 64);
    }

    #[test]
    fn aligned_stride_picks_larger_of_the_two_alignments() {
        let stride = PerFrameBuffer::compute_aligned_stride(20, 256, 64);
        assert_eq!(stride, 256);
    }

    #[test]
    fn flush_range_rounds_outward_and_clamps() {
        let (offset, size) = PerFrameBuffer::align_flush_range(10, 20, 16, 1024);
        assert_eq!(offset, 0);
        assert_eq!(size, 32);
    }

    #[test]
    fn flush_range_clamps_to_buffer_capacity() {
        let (offset, size) = PerFrameBuffer::align_flush_range(1000, 50, 16, 1024);
        assert_eq!(offset, 992);
        assert_eq!(size, 32);
    }

    #[test]
    fn flush_range_is_noop_sized_when_atom_is_zero() {
        let (offset, size) = PerFrameBuffer::align_flush_range(10, 20, 0, 1024);
        assert_eq!(offset, 10);
        assert_eq!(size, 20);
    }
}
