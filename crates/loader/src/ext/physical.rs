use strata_abi::{AllocationCallbacks, AllocationScope, EntryPoints, InterfaceVersion, ProcAddr};

use super::{ResolutionTable, TableKind};
use crate::alloc::HostAllocation;
use crate::driver::{DriverId, DriverTerminator};
use crate::error::{LoaderError, Result};
use crate::instance::{Instance, PhysicalDevice};
use crate::log::LoaderLogFlags;

/// How one driver answered a physical-device extension function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverSupport {
	/// The driver's interface version predates physical-device queries; it
	/// was never asked.
	BelowInterfaceVersion,
	Unsupported,
	Supported(ProcAddr),
}

impl DriverSupport {
	fn query(driver: &DriverTerminator, name: &str) -> Self {
		if driver.interface_version() < InterfaceVersion::PHYSICAL_DEVICE_PROC {
			return Self::BelowInterfaceVersion;
		}
		if !driver.exports(EntryPoints::GET_PHYSICAL_DEVICE_PROC_ADDR) {
			return Self::Unsupported;
		}
		match driver.driver().get_physical_device_proc_addr(driver.native(), name) {
			Some(addr) => Self::Supported(addr),
			None => Self::Unsupported,
		}
	}

	pub fn addr(self) -> Option<ProcAddr> {
		match self {
			Self::Supported(addr) => Some(addr),
			Self::BelowInterfaceVersion | Self::Unsupported => None,
		}
	}
}

/// What the instance-level slot of a physical-device function calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhysDevExtEntry {
	/// The first active layer intercepting the function.
	Layer { layer: usize, addr: ProcAddr },
	/// The only driver implementing the function, called directly.
	Driver { driver: DriverId, addr: ProcAddr },
	/// The loader terminator, which forwards to the physical device's own
	/// driver.
	Terminator,
}

/// A resolved physical-device extension function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhysicalDeviceExtFn {
	slot: u32,
	entry: PhysDevExtEntry,
}

impl PhysicalDeviceExtFn {
	pub fn slot(&self) -> u32 {
		self.slot
	}

	pub fn entry(&self) -> PhysDevExtEntry {
		self.entry
	}
}

struct ResolvedSlot {
	entry: PhysDevExtEntry,
	/// Indexed by [`DriverId`].
	drivers: Box<[DriverSupport]>,
	_charge: HostAllocation,
}

/// The physical-device table plus what each claimed slot resolved to.
pub(crate) struct PhysDevExtTable {
	table: ResolutionTable,
	resolved: Vec<Option<ResolvedSlot>>,
}

impl PhysDevExtTable {
	pub(crate) fn new(capacity: usize, allocator: &AllocationCallbacks) -> Result<Self> {
		let table = ResolutionTable::new(TableKind::PhysicalDevice, capacity, allocator)?;
		let mut resolved = Vec::new();
		resolved.try_reserve_exact(capacity).map_err(|_| LoaderError::OutOfHostMemory)?;
		resolved.resize_with(capacity, || None);
		Ok(Self { table, resolved })
	}

	pub(crate) fn table(&self) -> &ResolutionTable {
		&self.table
	}

	fn cached(&self, name: &str) -> Option<Option<PhysicalDeviceExtFn>> {
		if let Some(slot) = self.table.lookup(name) {
			let entry = self.resolved.get(slot as usize)?.as_ref()?.entry;
			return Some(Some(PhysicalDeviceExtFn { slot, entry }));
		}
		self.table.is_unsupported(name).then_some(None)
	}

	fn mark_unsupported(&mut self, name: &str) -> Result<()> {
		self.table.mark_unsupported(name)
	}

	fn support(&self, slot: u32) -> Option<&[DriverSupport]> {
		Some(&self.resolved.get(slot as usize)?.as_ref()?.drivers)
	}
}

/// Chooses the instance-level entry: an intercepting layer wins, then a
/// lone supporting driver, then the terminator.
fn select_entry(layer: Option<(usize, ProcAddr)>, drivers: &[DriverSupport]) -> PhysDevExtEntry {
	if let Some((layer, addr)) = layer {
		return PhysDevExtEntry::Layer { layer, addr };
	}
	let mut supporting = drivers
		.iter()
		.enumerate()
		.filter_map(|(index, support)| support.addr().map(|addr| (DriverId::from_index(index), addr)));
	match (supporting.next(), supporting.next()) {
		(Some((driver, addr)), None) => PhysDevExtEntry::Driver { driver, addr },
		_ => PhysDevExtEntry::Terminator,
	}
}

impl Instance {
	/// Resolves physical-device extension function `name`.
	///
	/// Only drivers at [`InterfaceVersion::PHYSICAL_DEVICE_PROC`] or newer
	/// and layers new enough to answer are asked. `Ok(None)` means none of
	/// them implements it.
	pub fn resolve_physical_device_extension(&self, name: &str) -> Result<Option<PhysicalDeviceExtFn>> {
		if let Some(resolved) = self.phys_dev_ext.read().cached(name) {
			return Ok(resolved);
		}

		let mut table = self.phys_dev_ext.write();
		if let Some(resolved) = table.cached(name) {
			return Ok(resolved);
		}

		let charge = HostAllocation::for_array::<DriverSupport>(&self.allocator, self.drivers.len(), AllocationScope::Instance)?;
		let mut drivers = Vec::new();
		drivers.try_reserve_exact(self.drivers.len()).map_err(|_| LoaderError::OutOfHostMemory)?;
		drivers.extend(self.drivers.iter().map(|driver| DriverSupport::query(driver, name)));
		let layer = self.layers.physical_device_interceptor(name);

		if layer.is_none() && drivers.iter().all(|support| support.addr().is_none()) {
			table.mark_unsupported(name)?;
			tracing::debug!(name, "physical-device extension function has no implementation");
			return Ok(None);
		}

		let slot = match table.table.insert(name) {
			Ok(slot) => slot,
			Err(err) => {
				drop(table);
				self.log(LoaderLogFlags::ERROR, &format!("cannot add {name} to the physical-device extension table: {err}"));
				return Err(err);
			}
		};
		let entry = select_entry(layer, &drivers);
		table.resolved[slot as usize] = Some(ResolvedSlot {
			entry,
			drivers: drivers.into_boxed_slice(),
			_charge: charge,
		});
		drop(table);

		self.log(
			LoaderLogFlags::DEBUG,
			&format!("physical-device extension function {name} assigned slot {slot}, dispatching to {entry:?}"),
		);
		Ok(Some(PhysicalDeviceExtFn { slot, entry }))
	}

	/// The terminator for `function`: the implementation of the driver that
	/// owns `physical_device`, if it has one.
	pub fn physical_device_extension_proc(&self, physical_device: PhysicalDevice, function: &PhysicalDeviceExtFn) -> Option<ProcAddr> {
		self.phys_dev_ext
			.read()
			.support(function.slot)?
			.get(physical_device.driver.index())?
			.addr()
	}

	/// Names holding a physical-device extension slot, in slot order.
	pub fn physical_device_extension_names(&self) -> Vec<(u32, String)> {
		self.phys_dev_ext.read().table().names().map(|(slot, name)| (slot, name.to_owned())).collect()
	}

	/// Per-driver answers recorded for `function`, indexed by [`DriverId`].
	pub fn physical_device_extension_support(&self, function: &PhysicalDeviceExtFn) -> Vec<DriverSupport> {
		self.phys_dev_ext.read().support(function.slot).map(<[_]>::to_vec).unwrap_or_default()
	}
}
