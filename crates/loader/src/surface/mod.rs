//! Surfaces: the loader's aggregate of one native surface per driver.
//!
//! Only drivers at [`InterfaceVersion::SURFACE`] or newer create their own
//! surface objects. Consumers that need a driver's view of a surface fall
//! back to the loader's handle when the driver has no object of its own.

use std::mem::size_of;
use std::num::NonZeroU64;

use strata_abi::{
	AllocationCallbacks, AllocationScope, EntryPoints, InterfaceVersion, NativeHandle, SURFACE_EXTENSION_NAME, Status, SurfaceCreateInfo,
	SurfacePlatform,
};

use crate::alloc::HostAllocation;
use crate::driver::{DriverId, DriverTerminator};
use crate::error::{LoaderError, Result};
use crate::fanout::{self, DriverSlot, FanOut, PerDriverHandles};
use crate::instance::{Instance, KnownExtensions, PhysicalDevice};
use crate::log::LoaderLogFlags;

/// Loader handle for a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceHandle(NonZeroU64);

impl SurfaceHandle {
	fn from_key(key: usize) -> Self {
		Self(NonZeroU64::MIN.saturating_add(key as u64))
	}

	fn key(self) -> usize {
		(self.0.get() - 1) as usize
	}

	pub fn as_raw(self) -> u64 {
		self.0.get()
	}

	/// The handle as a driver would receive it when it owns no surface of
	/// its own.
	pub fn as_native(self) -> NativeHandle {
		NativeHandle::from(self.0)
	}
}

/// Declared layout of a surface object.
///
/// The base part is shared by every platform; the platform part holds the
/// window-system parameters. Recording both sizes lets either part grow
/// without breaking consumers that only know an older layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceHeader {
	pub base_size: usize,
	pub platform_size: usize,
	pub entire_size: usize,
}

impl SurfaceHeader {
	fn for_info(info: &SurfaceCreateInfo) -> Self {
		let base_size = size_of::<SurfaceHeader>() + size_of::<SurfacePlatform>();
		let platform_size = info.payload_size();
		Self {
			base_size,
			platform_size,
			entire_size: base_size + platform_size,
		}
	}
}

pub(crate) struct IcdSurface {
	header: SurfaceHeader,
	info: SurfaceCreateInfo,
	per_driver: PerDriverHandles,
	_charge: HostAllocation,
}

pub(crate) struct SurfaceFanOut;

impl FanOut for SurfaceFanOut {
	type CreateInfo = SurfaceCreateInfo;

	const OBJECT: &'static str = "surface";
	const MIN_INTERFACE_VERSION: Option<InterfaceVersion> = Some(InterfaceVersion::SURFACE);
	const DESTROY_ENTRY_POINT: EntryPoints = EntryPoints::DESTROY_SURFACE;

	fn create_entry_point(info: &SurfaceCreateInfo) -> EntryPoints {
		EntryPoints::create_surface(info.platform())
	}

	fn create(driver: &DriverTerminator, info: &SurfaceCreateInfo, allocator: &AllocationCallbacks) -> Result<NativeHandle, Status> {
		driver.driver().create_surface(driver.native(), info, allocator)
	}

	fn destroy(driver: &DriverTerminator, handle: NativeHandle, allocator: &AllocationCallbacks) {
		driver.driver().destroy_surface(driver.native(), handle, allocator);
	}
}

impl Instance {
	/// Creates a surface on every driver that supports surfaces.
	///
	/// Fails with [`LoaderError::ExtensionNotPresent`] unless the platform's
	/// extension was enabled. If any driver fails, every driver surface
	/// already created is destroyed and that driver's error is returned.
	pub fn create_surface(&self, info: &SurfaceCreateInfo, allocator: Option<&AllocationCallbacks>) -> Result<SurfaceHandle> {
		let platform = info.platform();
		if !self.extensions().contains(KnownExtensions::SURFACE) {
			return Err(LoaderError::ExtensionNotPresent(SURFACE_EXTENSION_NAME.to_owned()));
		}
		if !self.extensions().contains(KnownExtensions::for_platform(platform)) {
			return Err(LoaderError::ExtensionNotPresent(platform.extension_name().to_owned()));
		}
		let allocator = allocator.unwrap_or(&self.allocator);

		let mut surfaces = self.surfaces.lock();
		let header = SurfaceHeader::for_info(info);
		let charge = HostAllocation::for_bytes(allocator, header.entire_size, AllocationScope::Object)?;
		let per_driver = fanout::create::<SurfaceFanOut>(&self.drivers, info, allocator)?;
		let key = surfaces.insert(IcdSurface {
			header,
			info: *info,
			per_driver,
			_charge: charge,
		});
		let handle = SurfaceHandle::from_key(key);
		tracing::debug!(?platform, surface = handle.as_raw(), "surface created");
		Ok(handle)
	}

	/// Destroys every driver surface behind `surface`. Unknown handles are
	/// ignored.
	pub fn destroy_surface(&self, surface: SurfaceHandle, allocator: Option<&AllocationCallbacks>) {
		let allocator = allocator.unwrap_or(&self.allocator);
		let mut surfaces = self.surfaces.lock();
		let Some(icd_surface) = surfaces.try_remove(surface.key()) else {
			drop(surfaces);
			self.log(LoaderLogFlags::WARN, &format!("destroy of unknown surface {:#x}", surface.as_raw()));
			return;
		};
		fanout::destroy::<SurfaceFanOut>(&self.drivers, icd_surface.per_driver, allocator);
	}

	/// Asks the physical device's driver whether `queue_family` can present
	/// to `surface`.
	///
	/// The driver receives its own surface when it created one, otherwise
	/// the loader's handle.
	pub fn physical_device_surface_support(&self, physical_device: PhysicalDevice, queue_family: u32, surface: SurfaceHandle) -> Result<bool> {
		let driver = self.driver(physical_device.driver)?;
		if !driver.exports(EntryPoints::GET_SURFACE_SUPPORT) {
			return Err(LoaderError::ExtensionNotPresent("vkGetPhysicalDeviceSurfaceSupportKHR".to_owned()));
		}
		let target = {
			let surfaces = self.surfaces.lock();
			let icd_surface = surfaces.get(surface.key()).ok_or(LoaderError::InvalidHandle("surface"))?;
			icd_surface.per_driver.get(driver.id()).unwrap_or_else(|| surface.as_native())
		};
		driver
			.driver()
			.get_physical_device_surface_support(physical_device.native, queue_family, target)
			.map_err(|status| LoaderError::Driver { driver: driver.id(), status })
	}

	/// Native surface `driver` created for `surface`, if any.
	pub fn surface_for_driver(&self, surface: SurfaceHandle, driver: DriverId) -> Option<NativeHandle> {
		self.surfaces.lock().get(surface.key())?.per_driver.get(driver)
	}

	/// Per-driver slots of `surface`, empty when no drivers are loaded.
	pub fn surface_driver_slots(&self, surface: SurfaceHandle) -> Option<Vec<DriverSlot>> {
		Some(self.surfaces.lock().get(surface.key())?.per_driver.slots().to_vec())
	}

	pub fn surface_header(&self, surface: SurfaceHandle) -> Option<SurfaceHeader> {
		self.surfaces.lock().get(surface.key()).map(|icd_surface| icd_surface.header)
	}

	pub fn surface_platform(&self, surface: SurfaceHandle) -> Option<SurfacePlatform> {
		self.surfaces.lock().get(surface.key()).map(|icd_surface| icd_surface.info.platform())
	}

	/// Destroys every surface the application leaked.
	pub(crate) fn destroy_leaked_surfaces(&self) {
		let leaked: Vec<_> = self.surfaces.lock().drain().collect();
		for icd_surface in leaked {
			self.log(
				LoaderLogFlags::WARN,
				&format!("destroying leaked {:?} surface at instance teardown", icd_surface.info.platform()),
			);
			fanout::destroy::<SurfaceFanOut>(&self.drivers, icd_surface.per_driver, &self.allocator);
		}
	}
}

#[cfg(test)]
mod tests;
