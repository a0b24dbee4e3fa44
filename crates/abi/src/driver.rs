//! The driver side of the loader boundary.

use crate::alloc::AllocationCallbacks;
use crate::debug::{MessengerCreateInfo, ReportCallbackCreateInfo, ReportMessage};
use crate::handle::{NativeHandle, ProcAddr};
use crate::status::Status;
use crate::surface::{SurfaceCreateInfo, SurfacePlatform};

/// Driver ABI interface version, negotiated when the driver is loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InterfaceVersion(pub u32);

impl InterfaceVersion {
	/// First version whose drivers create their own surface objects.
	pub const SURFACE: Self = Self(3);
	/// First version exporting a physical-device proc-address query.
	pub const PHYSICAL_DEVICE_PROC: Self = Self(4);
	/// Newest version this loader understands.
	pub const CURRENT: Self = Self(7);
}

bitflags::bitflags! {
	/// Optional entry points a driver exports.
	///
	/// An absent bit is treated exactly like a null function pointer: the
	/// loader never calls the corresponding [`Driver`] method.
	#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
	pub struct EntryPoints: u32 {
		const CREATE_HEADLESS_SURFACE = 1 << 0;
		const CREATE_DISPLAY_PLANE_SURFACE = 1 << 1;
		const CREATE_XCB_SURFACE = 1 << 2;
		const CREATE_XLIB_SURFACE = 1 << 3;
		const CREATE_WAYLAND_SURFACE = 1 << 4;
		const CREATE_WIN32_SURFACE = 1 << 5;
		const CREATE_METAL_SURFACE = 1 << 6;
		const DESTROY_SURFACE = 1 << 7;
		const GET_SURFACE_SUPPORT = 1 << 8;
		const CREATE_DEBUG_REPORT_CALLBACK = 1 << 9;
		const DESTROY_DEBUG_REPORT_CALLBACK = 1 << 10;
		const DEBUG_REPORT_MESSAGE = 1 << 11;
		const CREATE_DEBUG_MESSENGER = 1 << 12;
		const DESTROY_DEBUG_MESSENGER = 1 << 13;
		const GET_PHYSICAL_DEVICE_PROC_ADDR = 1 << 14;

		const ALL_SURFACES = Self::CREATE_HEADLESS_SURFACE.bits()
			| Self::CREATE_DISPLAY_PLANE_SURFACE.bits()
			| Self::CREATE_XCB_SURFACE.bits()
			| Self::CREATE_XLIB_SURFACE.bits()
			| Self::CREATE_WAYLAND_SURFACE.bits()
			| Self::CREATE_WIN32_SURFACE.bits()
			| Self::CREATE_METAL_SURFACE.bits()
			| Self::DESTROY_SURFACE.bits()
			| Self::GET_SURFACE_SUPPORT.bits();
		const DEBUG_REPORT = Self::CREATE_DEBUG_REPORT_CALLBACK.bits()
			| Self::DESTROY_DEBUG_REPORT_CALLBACK.bits()
			| Self::DEBUG_REPORT_MESSAGE.bits();
		const DEBUG_MESSENGER = Self::CREATE_DEBUG_MESSENGER.bits() | Self::DESTROY_DEBUG_MESSENGER.bits();
	}
}

impl EntryPoints {
	/// The create entry point for surfaces of `platform`.
	pub const fn create_surface(platform: SurfacePlatform) -> Self {
		match platform {
			SurfacePlatform::Headless => Self::CREATE_HEADLESS_SURFACE,
			SurfacePlatform::Display => Self::CREATE_DISPLAY_PLANE_SURFACE,
			SurfacePlatform::Xcb => Self::CREATE_XCB_SURFACE,
			SurfacePlatform::Xlib => Self::CREATE_XLIB_SURFACE,
			SurfacePlatform::Wayland => Self::CREATE_WAYLAND_SURFACE,
			SurfacePlatform::Win32 => Self::CREATE_WIN32_SURFACE,
			SurfacePlatform::Metal => Self::CREATE_METAL_SURFACE,
		}
	}
}

/// Instance parameters forwarded to one driver.
///
/// `enabled_extensions` only lists extensions this driver advertised.
#[derive(Debug, Clone, Copy, Default)]
pub struct DriverInstanceCreateInfo<'a> {
	pub application_name: Option<&'a str>,
	pub enabled_extensions: &'a [&'a str],
}

/// Device parameters forwarded to the driver owning the physical device.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceCreateInfo {
	pub queue_families: Vec<u32>,
	pub enabled_extensions: Vec<String>,
}

/// An installable client driver.
///
/// Methods guarded by an [`EntryPoints`] bit are only called when the driver
/// reports that bit; their default bodies stand in for a null entry.
pub trait Driver: Send + Sync {
	/// Name used in diagnostics.
	fn name(&self) -> &str;

	fn interface_version(&self) -> InterfaceVersion;

	/// Optional entry points this driver exports.
	fn entry_points(&self) -> EntryPoints;

	/// Instance extensions this driver advertises.
	fn instance_extensions(&self) -> &[String];

	fn create_instance(&self, info: &DriverInstanceCreateInfo<'_>, allocator: &AllocationCallbacks) -> Result<NativeHandle, Status>;

	fn destroy_instance(&self, instance: NativeHandle, allocator: &AllocationCallbacks);

	fn enumerate_physical_devices(&self, instance: NativeHandle) -> Result<Vec<NativeHandle>, Status>;

	/// Looks up an instance-level entry point by name.
	fn get_instance_proc_addr(&self, instance: NativeHandle, name: &str) -> Option<ProcAddr>;

	/// Looks up a physical-device entry point by name.
	///
	/// Requires [`EntryPoints::GET_PHYSICAL_DEVICE_PROC_ADDR`] and an interface
	/// version of at least [`InterfaceVersion::PHYSICAL_DEVICE_PROC`].
	fn get_physical_device_proc_addr(&self, _instance: NativeHandle, _name: &str) -> Option<ProcAddr> {
		None
	}

	fn create_device(
		&self,
		physical_device: NativeHandle,
		info: &DeviceCreateInfo,
		allocator: &AllocationCallbacks,
	) -> Result<NativeHandle, Status>;

	fn destroy_device(&self, device: NativeHandle, allocator: &AllocationCallbacks);

	/// Looks up a device-level entry point by name.
	fn get_device_proc_addr(&self, device: NativeHandle, name: &str) -> Option<ProcAddr>;

	fn create_surface(
		&self,
		_instance: NativeHandle,
		_info: &SurfaceCreateInfo,
		_allocator: &AllocationCallbacks,
	) -> Result<NativeHandle, Status> {
		Err(Status::ExtensionNotPresent)
	}

	fn destroy_surface(&self, _instance: NativeHandle, _surface: NativeHandle, _allocator: &AllocationCallbacks) {}

	/// Whether `queue_family` of `physical_device` can present to `surface`.
	///
	/// `surface` is this driver's own surface when it created one, otherwise
	/// the loader's handle for the logical surface.
	fn get_physical_device_surface_support(
		&self,
		_physical_device: NativeHandle,
		_queue_family: u32,
		_surface: NativeHandle,
	) -> Result<bool, Status> {
		Err(Status::ExtensionNotPresent)
	}

	fn create_debug_report_callback(
		&self,
		_instance: NativeHandle,
		_info: &ReportCallbackCreateInfo,
		_allocator: &AllocationCallbacks,
	) -> Result<NativeHandle, Status> {
		Err(Status::ExtensionNotPresent)
	}

	fn destroy_debug_report_callback(&self, _instance: NativeHandle, _callback: NativeHandle, _allocator: &AllocationCallbacks) {}

	/// Injects a legacy message into the driver's own reporting.
	fn debug_report_message(&self, _instance: NativeHandle, _message: &ReportMessage<'_>) {}

	fn create_debug_messenger(
		&self,
		_instance: NativeHandle,
		_info: &MessengerCreateInfo,
		_allocator: &AllocationCallbacks,
	) -> Result<NativeHandle, Status> {
		Err(Status::ExtensionNotPresent)
	}

	fn destroy_debug_messenger(&self, _instance: NativeHandle, _messenger: NativeHandle, _allocator: &AllocationCallbacks) {}
}
