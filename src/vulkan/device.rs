use std::collections::HashSet;

use anyhow::Result;
use vulkanalia::prelude::v1_0::*;

use crate::vulkan::physical_device::DEVICE_EXTENSIONS;
use crate::vulkan::queue::QueueFamilyIndices;
use crate::{PORTABILITY_MACOS_VERSION, VALIDATION_ENABLED, VALIDATION_LAYER};

pub struct Queues {
    pub graphics: vk::Queue,
    pub present: vk::Queue,
    pub compute: vk::Queue,
}

pub unsafe fn create_logical_device(
    entry: &Entry,
    instance: &Instance,
    physical_device: vk::PhysicalDevice,
    indices: QueueFamilyIndices,
) -> Result<(Device, Queues)> {
    let unique_families: HashSet<u32> = [indices.graphics, indices.present, indices.compute]
        .into_iter()
        .collect();

    let queue_priorities = &[1.0];
    let queue_infos: Vec<_> = unique_families
        .iter()
        .map(|&family| {
            vk::DeviceQueueCreateInfo::builder()
                .queue_family_index(family)
                .queue_priorities(queue_priorities)
        })
        .collect();

    let layers = if VALIDATION_ENABLED {
        vec![VALIDATION_LAYER.as_ptr()]
    } else {
        vec![]
    };

    let mut extensions: Vec<_> = DEVICE_EXTENSIONS.iter().map(|e| e.as_ptr()).collect();

    // Required by Vulkan SDK on macOS since 1.3.216.
    if cfg!(target_os = "macos") && entry.version()? >= PORTABILITY_MACOS_VERSION {
        extensions.push(vk::KHR_PORTABILITY_SUBSET_EXTENSION.name.as_ptr());
    }

    let features = vk::PhysicalDeviceFeatures::builder();

    let info = vk::DeviceCreateInfo::builder()
        .queue_create_infos(&queue_infos)
        .enabled_layer_names(&layers)
        .enabled_extension_names(&extensions)
        .enabled_features(&features);

    let device = instance.create_device(physical_device, &info, None)?;

    let queues = Queues {
        graphics: device.get_device_queue(indices.graphics, 0),
        present: device.get_device_queue(indices.present, 0),
        compute: device.get_device_queue(indices.compute, 0),
    };

    Ok((device, queues))
}
