//! Logical devices and their extension dispatch arrays.

use std::num::NonZeroU64;

use parking_lot::RwLock;
use strata_abi::{AllocationCallbacks, AllocationScope, DeviceCreateInfo, NativeHandle, ProcAddr};

use super::{Instance, PhysicalDevice};
use crate::alloc::{self, HostAllocation};
use crate::chain::LayerChain;
use crate::driver::DriverTerminator;
use crate::error::{LoaderError, Result};
use crate::log::LoaderLogFlags;

/// Loader handle for a logical device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceHandle(NonZeroU64);

impl DeviceHandle {
	fn from_key(key: usize) -> Self {
		Self(NonZeroU64::MIN.saturating_add(key as u64))
	}

	pub(crate) fn key(self) -> usize {
		(self.0.get() - 1) as usize
	}

	pub fn as_raw(self) -> u64 {
		self.0.get()
	}
}

pub(crate) struct Device {
	physical: PhysicalDevice,
	native: NativeHandle,
	/// One entry per device extension table slot.
	ext_dispatch: RwLock<Box<[Option<ProcAddr>]>>,
	_charge: HostAllocation,
}

impl Device {
	pub(crate) fn physical(&self) -> PhysicalDevice {
		self.physical
	}

	/// Fills `slot` with whatever this device's chain returns for `name`.
	/// A device without an implementation keeps the slot empty.
	pub(crate) fn populate_ext_slot(&self, chain: &LayerChain, driver: &DriverTerminator, slot: u32, name: &str) {
		if let Some(addr) = chain.device_proc_addr(driver, self.native, name)
			&& let Some(entry) = self.ext_dispatch.write().get_mut(slot as usize)
		{
			*entry = Some(addr);
		}
	}

	pub(crate) fn ext_proc(&self, slot: u32) -> Option<ProcAddr> {
		self.ext_dispatch.read().get(slot as usize).copied().flatten()
	}
}

impl Instance {
	/// Creates a logical device on the driver owning `physical_device`.
	///
	/// Every device extension function resolved so far is populated in the
	/// new device's dispatch array before the handle is returned.
	pub fn create_device(
		&self,
		physical_device: PhysicalDevice,
		info: &DeviceCreateInfo,
		allocator: Option<&AllocationCallbacks>,
	) -> Result<DeviceHandle> {
		let driver = self.driver(physical_device.driver)?;
		let allocator = allocator.unwrap_or(&self.allocator);

		let table = self.device_ext.read();
		let charge = HostAllocation::for_array::<Option<ProcAddr>>(allocator, table.capacity(), AllocationScope::Device)?;
		let ext_dispatch = alloc::try_filled(table.capacity(), None)?;
		let native = driver
			.driver()
			.create_device(physical_device.native, info, allocator)
			.map_err(|status| LoaderError::Driver { driver: driver.id(), status })?;

		let device = Device {
			physical: physical_device,
			native,
			ext_dispatch: RwLock::new(ext_dispatch),
			_charge: charge,
		};
		for (slot, name) in table.names() {
			device.populate_ext_slot(&self.layers, driver, slot, name);
		}
		let handle = DeviceHandle::from_key(self.devices.write().insert(device));
		drop(table);

		tracing::debug!(driver = driver.name(), %native, device = handle.as_raw(), "device created");
		Ok(handle)
	}

	/// Destroys `device` on its driver. Unknown handles are ignored.
	pub fn destroy_device(&self, device: DeviceHandle, allocator: Option<&AllocationCallbacks>) {
		let allocator = allocator.unwrap_or(&self.allocator);
		let Some(removed) = self.devices.write().try_remove(device.key()) else {
			self.log(LoaderLogFlags::WARN, &format!("destroy of unknown device {:#x}", device.as_raw()));
			return;
		};
		self.destroy_native_device(&removed, allocator);
	}

	/// The driver's own handle for `device`.
	pub fn native_device(&self, device: DeviceHandle) -> Option<NativeHandle> {
		self.devices.read().get(device.key()).map(|device| device.native)
	}

	pub fn device_count(&self) -> usize {
		self.devices.read().len()
	}

	fn destroy_native_device(&self, device: &Device, allocator: &AllocationCallbacks) {
		if let Some(driver) = self.drivers.get(device.physical.driver) {
			driver.driver().destroy_device(device.native, allocator);
		}
	}

	/// Destroys every device the application leaked.
	pub(crate) fn destroy_leaked_devices(&self) {
		let leaked: Vec<_> = self.devices.write().drain().collect();
		for device in leaked {
			self.log(LoaderLogFlags::WARN, &format!("destroying leaked device {} at instance teardown", device.native));
			self.destroy_native_device(&device, &self.allocator);
		}
	}
}
