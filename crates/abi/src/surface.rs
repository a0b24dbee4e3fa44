//! Platform surface parameters.

use std::mem::size_of;

/// Display-plane surface parameters.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DisplaySurface {
	pub display_mode: u64,
	pub plane_index: u32,
	pub plane_stack_index: u32,
	pub global_alpha: f32,
	pub image_extent: [u32; 2],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct XcbSurface {
	pub connection: usize,
	pub window: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct XlibSurface {
	pub display: usize,
	pub window: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WaylandSurface {
	pub display: usize,
	pub surface: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Win32Surface {
	pub hinstance: usize,
	pub hwnd: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetalSurface {
	pub layer: usize,
}

/// Window-system platforms a surface can be created for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SurfacePlatform {
	Headless,
	Display,
	Xcb,
	Xlib,
	Wayland,
	Win32,
	Metal,
}

impl SurfacePlatform {
	pub const ALL: [Self; 7] = [Self::Headless, Self::Display, Self::Xcb, Self::Xlib, Self::Wayland, Self::Win32, Self::Metal];

	/// Name of the instance extension that enables this platform.
	pub const fn extension_name(self) -> &'static str {
		match self {
			Self::Headless => "VK_EXT_headless_surface",
			Self::Display => "VK_KHR_display",
			Self::Xcb => "VK_KHR_xcb_surface",
			Self::Xlib => "VK_KHR_xlib_surface",
			Self::Wayland => "VK_KHR_wayland_surface",
			Self::Win32 => "VK_KHR_win32_surface",
			Self::Metal => "VK_EXT_metal_surface",
		}
	}
}

/// Name of the base surface extension every platform requires.
pub const SURFACE_EXTENSION_NAME: &str = "VK_KHR_surface";

/// Platform-specific parameters for creating a surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SurfaceCreateInfo {
	Headless,
	Display(DisplaySurface),
	Xcb(XcbSurface),
	Xlib(XlibSurface),
	Wayland(WaylandSurface),
	Win32(Win32Surface),
	Metal(MetalSurface),
}

impl SurfaceCreateInfo {
	pub const fn platform(&self) -> SurfacePlatform {
		match self {
			Self::Headless => SurfacePlatform::Headless,
			Self::Display(_) => SurfacePlatform::Display,
			Self::Xcb(_) => SurfacePlatform::Xcb,
			Self::Xlib(_) => SurfacePlatform::Xlib,
			Self::Wayland(_) => SurfacePlatform::Wayland,
			Self::Win32(_) => SurfacePlatform::Win32,
			Self::Metal(_) => SurfacePlatform::Metal,
		}
	}

	/// Size in bytes of the platform-specific payload.
	pub const fn payload_size(&self) -> usize {
		match self {
			Self::Headless => 0,
			Self::Display(_) => size_of::<DisplaySurface>(),
			Self::Xcb(_) => size_of::<XcbSurface>(),
			Self::Xlib(_) => size_of::<XlibSurface>(),
			Self::Wayland(_) => size_of::<WaylandSurface>(),
			Self::Win32(_) => size_of::<Win32Surface>(),
			Self::Metal(_) => size_of::<MetalSurface>(),
		}
	}
}
