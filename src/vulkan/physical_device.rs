use std::collections::HashSet;

use anyhow::{anyhow, Result};
use log::*;
use vulkanalia::prelude::v1_0::*;

use crate::errors::SuitabilityError;
use crate::vulkan::queue::QueueFamilyIndices;
use crate::vulkan::swapchain::SwapchainSupport;

pub const DEVICE_EXTENSIONS: &[vk::ExtensionName] = &[vk::KHR_SWAPCHAIN_EXTENSION.name];

pub struct SelectedDevice {
    pub physical_device: vk::PhysicalDevice,
    pub properties: vk::PhysicalDeviceProperties,
    pub features: vk::PhysicalDeviceFeatures,
    pub memory_properties: vk::PhysicalDeviceMemoryProperties,
    pub queue_families: QueueFamilyIndices,
    pub msaa_supported: vk::SampleCountFlags,
}

/// Enumerates and scores physical devices, picking the first suitable one in
/// enumeration order (the original source does the same — no discrete-GPU
/// preference scoring exists in `evk`, so none is invented here).
pub unsafe fn pick_physical_device(
    instance: &Instance,
    surface: vk::SurfaceKHR,
) -> Result<SelectedDevice> {
    for physical_device in instance.enumerate_physical_devices()? {
        let properties = instance.get_physical_device_properties(physical_device);

        match check_physical_device(instance, surface, physical_device) {
            Err(error) => {
                warn!(
                    "Skipping physical device ('{}'): {}",
                    properties.device_name, error
                );
            }
            Ok(queue_families) => {
                info!("Selected physical device ('{}').", properties.device_name);
                let features = instance.get_physical_device_features(physical_device);
                let memory_properties = instance.get_physical_device_memory_properties(physical_device);
                let msaa_supported = max_msaa_samples(instance, physical_device);
                return Ok(SelectedDevice {
                    physical_device,
                    properties,
                    features,
                    memory_properties,
                    queue_families,
                    msaa_supported,
                });
            }
        }
    }
    Err(anyhow!("failed to find a suitable physical device"))
}

unsafe fn check_physical_device(
    instance: &Instance,
    surface: vk::SurfaceKHR,
    physical_device: vk::PhysicalDevice,
) -> Result<QueueFamilyIndices> {
    let queue_families = QueueFamilyIndices::get(instance, surface, physical_device)?;

    let support = SwapchainSupport::get(instance, surface, physical_device)?;
    if support.formats.is_empty() || support.present_modes.is_empty() {
        return Err(anyhow!(SuitabilityError("insufficient swapchain support")));
    }

    check_physical_device_extensions(instance, physical_device)?;

    Ok(queue_families)
}

unsafe fn check_physical_device_extensions(
    instance: &Instance,
    physical_device: vk::PhysicalDevice,
) -> Result<()> {
    let extensions = instance
        .enumerate_device_extension_properties(physical_device, None)?
        .iter()
        .map(|e| e.extension_name)
        .collect::<HashSet<_>>();

    if DEVICE_EXTENSIONS.iter().all(|e| extensions.contains(e)) {
        Ok(())
    } else {
        Err(anyhow!(SuitabilityError("missing required device extensions")))
    }
}

/// The greatest sample count the device supports for both color and depth
/// attachments, used to clamp whatever `Msaa` the caller requested.
unsafe fn max_msaa_samples(instance: &Instance, physical_device: vk::PhysicalDevice) -> vk::SampleCountFlags {
    let properties = instance.get_physical_device_properties(physical_device);
    properties.limits.framebuffer_color_sample_counts
        & properties.limits.framebuffer_depth_sample_counts
}
