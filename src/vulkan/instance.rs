use anyhow::{anyhow, Result};
use log::*;
use vulkanalia::prelude::v1_0::*;
use vulkanalia::vk::ExtDebugUtilsExtension;
use vulkanalia::window as vk_window;
use vulkanalia::Version;

use crate::config::WindowHandle;
use crate::vulkan::debug::messenger_create_info;
use crate::{VALIDATION_ENABLED, VALIDATION_LAYER};

pub struct InstanceBundle {
    pub instance: Instance,
    pub messenger: vk::DebugUtilsMessengerEXT,
}

/// Builds the Vulkan instance requesting the platform surface extension and,
/// when validations are enabled, the debug-utils extension plus the standard
/// validation layer. Spec §4.1 step 2.
pub unsafe fn create_instance(
    entry: &Entry,
    window: &WindowHandle,
    app_name: &str,
    engine_name: &str,
    app_version: u32,
    engine_version: u32,
) -> Result<InstanceBundle> {
    let application_info = vk::ApplicationInfo::builder()
        .application_name(app_name.as_bytes())
        .application_version(app_version)
        .engine_name(engine_name.as_bytes())
        .engine_version(engine_version)
        .api_version(vk::make_version(1, 0, 0));

    let available_layers = entry
        .enumerate_instance_layer_properties()?
        .iter()
        .map(|l| l.layer_name)
        .collect::<std::collections::HashSet<_>>();

    if VALIDATION_ENABLED && !available_layers.contains(&VALIDATION_LAYER) {
        return Err(anyhow!("validation layer requested but not supported"));
    }

    let layers = if VALIDATION_ENABLED {
        vec![VALIDATION_LAYER.as_ptr()]
    } else {
        vec![]
    };

    let mut extensions = vk_window::get_required_instance_extensions(window)
        .iter()
        .map(|e| e.as_ptr())
        .collect::<Vec<_>>();

    if VALIDATION_ENABLED {
        extensions.push(vk::EXT_DEBUG_UTILS_EXTENSION.name.as_ptr());
    }

    // Required by Vulkan SDK on macOS since 1.3.216.
    let flags = if cfg!(target_os = "macos") && entry.version()? >= Version::new(1, 3, 216) {
        extensions.push(vk::KHR_PORTABILITY_ENUMERATION_EXTENSION.name.as_ptr());
        extensions.push(vk::KHR_GET_PHYSICAL_DEVICE_PROPERTIES2_EXTENSION.name.as_ptr());
        vk::InstanceCreateFlags::ENUMERATE_PORTABILITY_KHR
    } else {
        vk::InstanceCreateFlags::empty()
    };

    let mut debug_info = messenger_create_info();

    let mut info = vk::InstanceCreateInfo::builder()
        .application_info(&application_info)
        .enabled_layer_names(&layers)
        .enabled_extension_names(&extensions)
        .flags(flags);

    if VALIDATION_ENABLED {
        info = info.push_next(&mut debug_info);
    }

    let instance = entry.create_instance(&info, None)?;

    let messenger = if VALIDATION_ENABLED {
        instance.create_debug_utils_messenger_ext(&debug_info, None)?
    } else {
        vk::DebugUtilsMessengerEXT::null()
    };

    info!("Vulkan instance created ('{}').", app_name);

    Ok(InstanceBundle { instance, messenger })
}
