use strata_abi::ProcAddr;

use super::ResolutionTable;
use crate::error::Result;
use crate::instance::{DeviceHandle, Instance};
use crate::log::LoaderLogFlags;

/// A resolved device extension function: a slot in every device's
/// extension dispatch array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceExtFn {
	slot: u32,
}

impl DeviceExtFn {
	pub fn slot(self) -> u32 {
		self.slot
	}
}

fn cached(table: &ResolutionTable, name: &str) -> Option<Option<DeviceExtFn>> {
	if let Some(slot) = table.lookup(name) {
		return Some(Some(DeviceExtFn { slot }));
	}
	table.is_unsupported(name).then_some(None)
}

impl Instance {
	/// Resolves device extension function `name` to a dispatch slot.
	///
	/// `Ok(None)` means no driver and no layer implements it. Each driver
	/// and layer is asked at most once per name over the instance's life.
	pub fn resolve_device_extension(&self, name: &str) -> Result<Option<DeviceExtFn>> {
		if let Some(resolved) = cached(&self.device_ext.read(), name) {
			return Ok(resolved);
		}

		let mut table = self.device_ext.write();
		if let Some(resolved) = cached(&table, name) {
			return Ok(resolved);
		}

		let by_drivers = self
			.drivers
			.iter()
			.filter(|driver| driver.driver().get_instance_proc_addr(driver.native(), name).is_some())
			.count();
		let by_layers = self.layers.declares_device_entry_point(name);
		if by_drivers == 0 && !by_layers {
			table.mark_unsupported(name)?;
			tracing::debug!(name, "device extension function has no implementation");
			return Ok(None);
		}

		let slot = match table.insert(name) {
			Ok(slot) => slot,
			Err(err) => {
				drop(table);
				self.log(LoaderLogFlags::ERROR, &format!("cannot add {name} to the device extension table: {err}"));
				return Err(err);
			}
		};

		// Devices created from here on populate the slot themselves; the
		// table lock is held until every existing device has it.
		let devices = self.devices.read();
		for (_, device) in devices.iter() {
			if let Some(driver) = self.drivers.get(device.physical().driver) {
				device.populate_ext_slot(&self.layers, driver, slot, name);
			}
		}
		drop(devices);
		drop(table);

		self.log(
			LoaderLogFlags::DEBUG,
			&format!("device extension function {name} assigned slot {slot} ({by_drivers} drivers, layers: {by_layers})"),
		);
		Ok(Some(DeviceExtFn { slot }))
	}

	/// What `device` dispatches `function` to, `None` when that device's
	/// chain has no implementation even though another device's does.
	pub fn device_extension_proc(&self, device: DeviceHandle, function: DeviceExtFn) -> Option<ProcAddr> {
		self.devices.read().get(device.key())?.ext_proc(function.slot)
	}

	/// Names holding a device extension slot, in slot order.
	pub fn device_extension_names(&self) -> Vec<(u32, String)> {
		self.device_ext.read().names().map(|(slot, name)| (slot, name.to_owned())).collect()
	}
}
