use anyhow::{anyhow, Result};
use vulkanalia::prelude::v1_0::*;
use vulkanalia::vk::KhrSurfaceExtension;

use crate::errors::SuitabilityError;

/// Family indices for the three queues the spec's Data Model table names
/// (graphics, present, compute). Only graphics + present are required to be
/// distinct-or-not for swapchain sharing mode; compute is requested so the
/// backend owns a compute-capable queue handle even though this crate's
/// Non-goals exclude compute *pipelines* — the queue itself is still part
/// of the GPU Backend's contract (§3 Data Model).
#[derive(Copy, Clone, Debug)]
pub struct QueueFamilyIndices {
    pub graphics: u32,
    pub present: u32,
    pub compute: u32,
}

impl QueueFamilyIndices {
    pub unsafe fn get(
        instance: &Instance,
        surface: vk::SurfaceKHR,
        physical_device: vk::PhysicalDevice,
    ) -> Result<Self> {
        let properties = instance.get_physical_device_queue_family_properties(physical_device);

        let graphics = properties
            .iter()
            .position(|p| p.queue_flags.contains(vk::QueueFlags::GRAPHICS))
            .map(|i| i as u32);

        let compute = properties
            .iter()
            .position(|p| p.queue_flags.contains(vk::QueueFlags::COMPUTE))
            .map(|i| i as u32)
            .or(graphics);

        let mut present = None;
        for (index, _) in properties.iter().enumerate() {
            if instance.get_physical_device_surface_support_khr(physical_device, index as u32, surface)? {
                present = Some(index as u32);
                break;
            }
        }

        match (graphics, present, compute) {
            (Some(graphics), Some(present), Some(compute)) => Ok(Self {
                graphics,
                present,
                compute,
            }),
            _ => Err(anyhow!(SuitabilityError("missing required queue families"))),
        }
    }
}
