//! Create-everywhere-or-undo for objects backed by one native object per
//! driver.
//!
//! A fan-out category (surfaces, debug report callbacks, debug messengers)
//! implements [`FanOut`]. [`create`] walks the drivers in [`DriverId`]
//! order and asks every participating driver to create its own object; the
//! first failure stops the walk and destroys everything already created
//! before the driver's error is returned. [`destroy`] visits every created
//! slot exactly once.

use std::fmt;

use strata_abi::{AllocationCallbacks, AllocationScope, EntryPoints, InterfaceVersion, NativeHandle, Status};

use crate::alloc::{self, HostAllocation};
use crate::driver::{DriverArena, DriverId, DriverTerminator};
use crate::error::{LoaderError, Result};

/// One driver's entry in a per-driver handle array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DriverSlot {
	/// The driver was skipped or has not been reached.
	#[default]
	NotCreated,
	Created(NativeHandle),
}

impl DriverSlot {
	pub const fn handle(self) -> Option<NativeHandle> {
		match self {
			Self::NotCreated => None,
			Self::Created(handle) => Some(handle),
		}
	}
}

/// Per-driver native handles of one aggregate object.
///
/// Either absent (no drivers were loaded) or exactly one slot per loaded
/// driver, indexed by [`DriverId`].
pub struct PerDriverHandles {
	slots: Option<(Box<[DriverSlot]>, HostAllocation)>,
}

impl PerDriverHandles {
	pub(crate) const fn absent() -> Self {
		Self { slots: None }
	}

	pub fn is_absent(&self) -> bool {
		self.slots.is_none()
	}

	pub fn slots(&self) -> &[DriverSlot] {
		match &self.slots {
			Some((slots, _)) => slots,
			None => &[],
		}
	}

	/// The native handle `driver` created, if any. Absent arrays and
	/// `NotCreated` slots look the same here.
	pub fn get(&self, driver: DriverId) -> Option<NativeHandle> {
		self.slots().get(driver.index()).and_then(|slot| slot.handle())
	}

	/// Created slots with their driver.
	pub fn created(&self) -> impl Iterator<Item = (DriverId, NativeHandle)> + '_ {
		self.slots()
			.iter()
			.enumerate()
			.filter_map(|(index, slot)| slot.handle().map(|handle| (DriverId::from_index(index), handle)))
	}

	fn set(&mut self, driver: DriverId, handle: NativeHandle) {
		if let Some((slots, _)) = &mut self.slots {
			slots[driver.index()] = DriverSlot::Created(handle);
		}
	}
}

impl fmt::Debug for PerDriverHandles {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match &self.slots {
			None => f.write_str("PerDriverHandles(absent)"),
			Some((slots, _)) => f.debug_tuple("PerDriverHandles").field(slots).finish(),
		}
	}
}

/// A category of object that exists once per driver.
pub(crate) trait FanOut {
	type CreateInfo: ?Sized;

	/// Object name used in diagnostics.
	const OBJECT: &'static str;

	/// Drivers below this version are skipped. `None` means every driver
	/// participates.
	const MIN_INTERFACE_VERSION: Option<InterfaceVersion>;

	const DESTROY_ENTRY_POINT: EntryPoints;

	fn create_entry_point(info: &Self::CreateInfo) -> EntryPoints;

	fn create(driver: &DriverTerminator, info: &Self::CreateInfo, allocator: &AllocationCallbacks) -> Result<NativeHandle, Status>;

	fn destroy(driver: &DriverTerminator, handle: NativeHandle, allocator: &AllocationCallbacks);

	fn participates(driver: &DriverTerminator) -> bool {
		Self::MIN_INTERFACE_VERSION.is_none_or(|min| driver.interface_version() >= min)
	}
}

/// Creates one native object per participating driver, or none at all.
pub(crate) fn create<C: FanOut>(drivers: &DriverArena, info: &C::CreateInfo, allocator: &AllocationCallbacks) -> Result<PerDriverHandles> {
	if drivers.is_empty() {
		return Ok(PerDriverHandles::absent());
	}

	let charge = HostAllocation::for_array::<DriverSlot>(allocator, drivers.len(), AllocationScope::Object)?;
	let mut handles = PerDriverHandles {
		slots: Some((alloc::try_filled(drivers.len(), DriverSlot::NotCreated)?, charge)),
	};

	let entry_point = C::create_entry_point(info);
	for driver in drivers.iter() {
		if !C::participates(driver) || !driver.exports(entry_point) {
			continue;
		}
		match C::create(driver, info, allocator) {
			Ok(handle) => handles.set(driver.id(), handle),
			Err(status) => {
				tracing::debug!(object = C::OBJECT, driver = driver.name(), %status, "fan-out create failed, rolling back");
				destroy::<C>(drivers, handles, allocator);
				return Err(LoaderError::Driver { driver: driver.id(), status });
			}
		}
	}
	Ok(handles)
}

/// Destroys every created slot and releases the array.
pub(crate) fn destroy<C: FanOut>(drivers: &DriverArena, handles: PerDriverHandles, allocator: &AllocationCallbacks) {
	for (id, handle) in handles.created() {
		let Some(driver) = drivers.get(id) else {
			continue;
		};
		debug_assert!(C::participates(driver), "{} created on a driver below the interface gate", C::OBJECT);
		if driver.exports(C::DESTROY_ENTRY_POINT) {
			C::destroy(driver, handle, allocator);
		} else {
			tracing::warn!(object = C::OBJECT, driver = driver.name(), %handle, "driver exports no destroy entry point");
		}
	}
}
