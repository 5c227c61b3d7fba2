use vulkanalia::vk;
use raw_window_handle::{HasRawDisplayHandle, HasRawWindowHandle, RawDisplayHandle, RawWindowHandle};

/// Sample count for the Main/Picking/Viewport attachments. Fixed for the
/// lifetime of the `Engine`, per spec §3 ("MSAA is fixed for the lifetime").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Msaa {
    Off,
    X2,
    X4,
    X8,
    X16,
    X32,
    X64,
}

impl Msaa {
    pub fn as_vk(self) -> vk::SampleCountFlags {
        match self {
            Msaa::Off => vk::SampleCountFlags::_1,
            Msaa::X2 => vk::SampleCountFlags::_2,
            Msaa::X4 => vk::SampleCountFlags::_4,
            Msaa::X8 => vk::SampleCountFlags::_8,
            Msaa::X16 => vk::SampleCountFlags::_16,
            Msaa::X32 => vk::SampleCountFlags::_32,
            Msaa::X64 => vk::SampleCountFlags::_64,
        }
    }

    /// Clamps a requested sample count down to whatever the device actually
    /// supports, the way `physical_device::get_max_msaa_samples` picks the
    /// best available count.
    pub fn clamp_to_supported(self, supported: vk::SampleCountFlags) -> Msaa {
        let wanted = self.as_vk();
        if supported.contains(wanted) {
            return self;
        }
        for candidate in [
            Msaa::X64,
            Msaa::X32,
            Msaa::X16,
            Msaa::X8,
            Msaa::X4,
            Msaa::X2,
        ] {
            if supported.contains(candidate.as_vk()) {
                return candidate;
            }
        }
        Msaa::Off
    }
}

/// Holds a native window handle tagged by platform, adapted into whatever
/// `raw-window-handle` traits `vulkanalia::window::create_surface` needs.
/// The platform window creation and input handling themselves stay outside
/// this crate's scope per spec §1.
pub struct WindowHandle {
    raw_window: RawWindowHandle,
    raw_display: RawDisplayHandle,
}

impl WindowHandle {
    pub fn new<W>(window: &W) -> Self
    where
        W: HasRawWindowHandle + HasRawDisplayHandle,
    {
        Self {
            raw_window: window.raw_window_handle(),
            raw_display: window.raw_display_handle(),
        }
    }
}

unsafe impl HasRawWindowHandle for WindowHandle {
    fn raw_window_handle(&self) -> RawWindowHandle {
        self.raw_window
    }
}

unsafe impl HasRawDisplayHandle for WindowHandle {
    fn raw_display_handle(&self) -> RawDisplayHandle {
        self.raw_display
    }
}

/// Configuration passed to `Engine::init`. Mirrors `evkCreateInfo` in the
/// original source (§6 Configuration table).
pub struct EngineConfig<'w> {
    pub app_name: &'static str,
    pub engine_name: &'static str,
    pub app_version: u32,
    pub engine_version: u32,
    pub width: u32,
    pub height: u32,
    pub msaa: Msaa,
    pub vsync: bool,
    pub viewport: bool,
    pub window: &'w WindowHandle,
}
