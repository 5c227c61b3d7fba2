use anyhow::Result;
use vulkanalia::prelude::v1_0::*;
use vulkanalia::vk::{KhrSurfaceExtension, KhrSwapchainExtension};

use crate::vulkan::queue::QueueFamilyIndices;

/// Surface capabilities/formats/present-modes for one physical device, as
/// queried fresh every time the swapchain is (re)built.
#[derive(Debug, Clone)]
pub struct SwapchainSupport {
    pub capabilities: vk::SurfaceCapabilitiesKHR,
    pub formats: Vec<vk::SurfaceFormatKHR>,
    pub present_modes: Vec<vk::PresentModeKHR>,
}

impl SwapchainSupport {
    pub unsafe fn get(
        instance: &Instance,
        surface: vk::SurfaceKHR,
        physical_device: vk::PhysicalDevice,
    ) -> Result<Self> {
        Ok(Self {
            capabilities: instance
                .get_physical_device_surface_capabilities_khr(physical_device, surface)?,
            formats: instance
                .get_physical_device_surface_formats_khr(physical_device, surface)?,
            present_modes: instance
                .get_physical_device_surface_present_modes_khr(physical_device, surface)?,
        })
    }
}

/// Prefers `B8G8R8A8_UNORM` + `SRGB_NONLINEAR`; otherwise the first reported
/// format. Spec §4.4.
pub fn choose_surface_format(formats: &[vk::SurfaceFormatKHR]) -> vk::SurfaceFormatKHR {
    formats
        .iter()
        .cloned()
        .find(|f| {
            f.format == vk::Format::B8G8R8A8_UNORM
                && f.color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR
        })
        .unwrap_or(formats[0])
}

/// vsync => FIFO; else MAILBOX if present; else IMMEDIATE if present; else
/// FIFO. Spec §4.4 / testable property 9.
pub fn choose_present_mode(vsync: bool, available: &[vk::PresentModeKHR]) -> vk::PresentModeKHR {
    if vsync {
        return vk::PresentModeKHR::FIFO;
    }
    if available.contains(&vk::PresentModeKHR::MAILBOX) {
        vk::PresentModeKHR::MAILBOX
    } else if available.contains(&vk::PresentModeKHR::IMMEDIATE) {
        vk::PresentModeKHR::IMMEDIATE
    } else {
        vk::PresentModeKHR::FIFO
    }
}

/// Uses `currentExtent` when defined (not `u32::MAX`), otherwise clamps the
/// requested pixel size to the surface's min/max extent.
pub fn choose_extent(
    width: u32,
    height: u32,
    capabilities: &vk::SurfaceCapabilitiesKHR,
) -> vk::Extent2D {
    if capabilities.current_extent.width != u32::MAX {
        capabilities.current_extent
    } else {
        vk::Extent2D {
            width: width.clamp(
                capabilities.min_image_extent.width,
                capabilities.max_image_extent.width,
            ),
            height: height.clamp(
                capabilities.min_image_extent.height,
                capabilities.max_image_extent.height,
            ),
        }
    }
}

/// `minImageCount + 1`, clamped by `maxImageCount` (0 means unbounded).
pub fn choose_image_count(capabilities: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let preferred = capabilities.min_image_count + 1;
    if capabilities.max_image_count > 0 {
        preferred.min(capabilities.max_image_count)
    } else {
        preferred
    }
}

pub struct Swapchain {
    pub handle: vk::SwapchainKHR,
    pub format: vk::Format,
    pub extent: vk::Extent2D,
    pub images: Vec<vk::Image>,
    pub image_views: Vec<vk::ImageView>,
    pub image_index: usize,
}

impl Swapchain {
    pub unsafe fn create(
        instance: &Instance,
        device: &Device,
        surface: vk::SurfaceKHR,
        physical_device: vk::PhysicalDevice,
        indices: QueueFamilyIndices,
        width: u32,
        height: u32,
        vsync: bool,
    ) -> Result<Self> {
        let support = SwapchainSupport::get(instance, surface, physical_device)?;

        let surface_format = choose_surface_format(&support.formats);
        let present_mode = choose_present_mode(vsync, &support.present_modes);
        let extent = choose_extent(width, height, &support.capabilities);
        let image_count = choose_image_count(&support.capabilities);

        let mut queue_family_indices = vec![];
        let image_sharing_mode = if indices.graphics != indices.present {
            queue_family_indices.push(indices.graphics);
            queue_family_indices.push(indices.present);
            vk::SharingMode::CONCURRENT
        } else {
            vk::SharingMode::EXCLUSIVE
        };

        let info = vk::SwapchainCreateInfoKHR::builder()
            .surface(surface)
            .min_image_count(image_count)
            .image_format(surface_format.format)
            .image_color_space(surface_format.color_space)
            .image_extent(extent)
            .image_array_layers(1)
            .image_usage(
                vk::ImageUsageFlags::COLOR_ATTACHMENT | vk::ImageUsageFlags::TRANSFER_SRC,
            )
            .image_sharing_mode(image_sharing_mode)
            .queue_family_indices(&queue_family_indices)
            .pre_transform(support.capabilities.current_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(present_mode)
            .clipped(true)
            .old_swapchain(vk::SwapchainKHR::null());

        let handle = device.create_swapchain_khr(&info, None)?;
        let images = device.get_swapchain_images_khr(handle)?;
        let image_views = images
            .iter()
            .map(|i| create_swapchain_image_view(device, *i, surface_format.format))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            handle,
            format: surface_format.format,
            extent,
            images,
            image_views,
            image_index: 0,
        })
    }

    pub unsafe fn destroy(&self, device: &Device) {
        self.image_views
            .iter()
            .for_each(|v| device.destroy_image_view(*v, None));
        device.destroy_swapchain_khr(self.handle, None);
    }

    pub fn image_count(&self) -> usize {
        self.images.len()
    }
}

unsafe fn create_swapchain_image_view(
    device: &Device,
    image: vk::Image,
    format: vk::Format,
) -> Result<vk::ImageView> {
    let subresource_range = vk::ImageSubresourceRange::builder()
        .aspect_mask(vk::ImageAspectFlags::COLOR)
        .base_mip_level(0)
        .level_count(1)
        .base_array_layer(0)
        .layer_count(1);

    let info = vk::ImageViewCreateInfo::builder()
        .image(image)
        .view_type(vk::ImageViewType::_2D)
        .format(format)
        .subresource_range(subresource_range);

    Ok(device.create_image_view(&info, None)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caps(min: u32, max: u32, current: vk::Extent2D) -> vk::SurfaceCapabilitiesKHR {
        vk::SurfaceCapabilitiesKHR::builder()
            .min_image_count(min)
            .max_image_count(max)
            .current_extent(current)
            .min_image_extent(vk::Extent2D { width: 1, height: 1 })
            .max_image_extent(vk::Extent2D {
                width: 4096,
                height: 4096,
            })
            .build()
    }

    #[test]
    fn vsync_forces_fifo() {
        let modes = [
            vk::PresentModeKHR::MAILBOX,
            vk::PresentModeKHR::IMMEDIATE,
            vk::PresentModeKHR::FIFO,
        ];
        assert_eq!(choose_present_mode(true, &modes), vk::PresentModeKHR::FIFO);
    }

    #[test]
    fn no_vsync_prefers_mailbox() {
        let modes = [vk::PresentModeKHR::IMMEDIATE, vk::PresentModeKHR::MAILBOX];
        assert_eq!(
            choose_present_mode(false, &modes),
            vk::PresentModeKHR::MAILBOX
        );
    }

    #[test]
    fn no_vsync_falls_back_to_immediate() {
        let modes = [vk::PresentModeKHR::IMMEDIATE];
        assert_eq!(
            choose_present_mode(false, &modes),
            vk::PresentModeKHR::IMMEDIATE
        );
    }

    #[test]
    fn no_vsync_falls_back_to_fifo_when_nothing_else_available() {
        let modes = [vk::PresentModeKHR::FIFO];
        assert_eq!(choose_present_mode(false, &modes), vk::PresentModeKHR::FIFO);
    }

    #[test]
    fn image_count_is_min_plus_one_clamped() {
        let capabilities = caps(2, 3, vk::Extent2D { width: 800, height: 600 });
        assert_eq!(choose_image_count(&capabilities), 3);
        let capabilities_unbounded = caps(2, 0, vk::Extent2D { width: 800, height: 600 });
        assert_eq!(choose_image_count(&capabilities_unbounded), 3);
    }

    #[test]
    fn extent_uses_current_when_defined() {
        let capabilities = caps(2, 3, vk::Extent2D { width: 800, height: 600 });
        assert_eq!(
            choose_extent(1920, 1080, &capabilities),
            vk::Extent2D { width: 800, height: 600 }
        );
    }

    #[test]
    fn extent_clamps_when_current_is_undefined() {
        let capabilities = caps(
            2,
            3,
            vk::Extent2D {
                width: u32::MAX,
                height: u32::MAX,
            },
        );
        assert_eq!(
            choose_extent(8000, 1, &capabilities),
            vk::Extent2D { width: 4096, height: 1 }
        );
    }
}
