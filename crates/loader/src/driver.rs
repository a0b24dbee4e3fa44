//! Driver terminators and the per-instance driver arena.
//!
//! Each driver that accepted the instance gets a [`DriverTerminator`]
//! holding its native instance handle and the entry points it exports. The
//! terminators live in a [`DriverArena`] whose order is fixed for the life
//! of the instance; a terminator's [`DriverId`] is its arena index and is
//! what every per-driver array is indexed by.

use std::fmt;
use std::sync::Arc;

use strata_abi::{AllocationCallbacks, Driver, DriverInstanceCreateInfo, EntryPoints, InterfaceVersion, NativeHandle, Status};

use crate::error::{LoaderError, Result};
use crate::log::LoaderLogFlags;

/// Stable index of a driver terminator within its instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DriverId(u32);

impl DriverId {
	pub const fn index(self) -> usize {
		self.0 as usize
	}

	pub(crate) const fn from_index(index: usize) -> Self {
		Self(index as u32)
	}
}

impl fmt::Display for DriverId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "#{}", self.0)
	}
}

/// One loaded driver as seen by the loader.
pub struct DriverTerminator {
	id: DriverId,
	driver: Arc<dyn Driver>,
	native: NativeHandle,
	entry_points: EntryPoints,
	interface_version: InterfaceVersion,
}

impl DriverTerminator {
	pub fn id(&self) -> DriverId {
		self.id
	}

	pub fn name(&self) -> &str {
		self.driver.name()
	}

	/// The driver's own instance handle.
	pub fn native(&self) -> NativeHandle {
		self.native
	}

	pub fn interface_version(&self) -> InterfaceVersion {
		self.interface_version
	}

	/// Whether the driver exports every entry point in `entry_points`.
	pub fn exports(&self, entry_points: EntryPoints) -> bool {
		self.entry_points.contains(entry_points)
	}

	pub fn driver(&self) -> &dyn Driver {
		&*self.driver
	}
}

impl fmt::Debug for DriverTerminator {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("DriverTerminator")
			.field("id", &self.id)
			.field("name", &self.name())
			.field("native", &self.native)
			.field("interface_version", &self.interface_version)
			.finish()
	}
}

/// Ordered driver terminators of one instance.
pub(crate) struct DriverArena {
	terminators: Vec<DriverTerminator>,
	allocator: AllocationCallbacks,
}

impl DriverArena {
	/// Creates a native instance on every candidate, in order.
	///
	/// A candidate that rejects the instance is skipped. Running out of host
	/// memory aborts and destroys the native instances created so far.
	pub(crate) fn create(
		candidates: Vec<Arc<dyn Driver>>,
		application_name: Option<&str>,
		enabled_extensions: &[String],
		allocator: &AllocationCallbacks,
		log: &dyn Fn(LoaderLogFlags, &str),
	) -> Result<Self> {
		let mut arena = Self {
			terminators: Vec::new(),
			allocator: allocator.clone(),
		};
		arena
			.terminators
			.try_reserve_exact(candidates.len())
			.map_err(|_| LoaderError::OutOfHostMemory)?;

		if candidates.is_empty() {
			log(LoaderLogFlags::WARN | LoaderLogFlags::DRIVER, "no drivers were offered to the instance");
			return Ok(arena);
		}

		let offered = candidates.len();
		for driver in candidates {
			let advertised = driver.instance_extensions();
			let enabled: Vec<&str> = enabled_extensions
				.iter()
				.map(String::as_str)
				.filter(|name| advertised.iter().any(|ext| ext == name))
				.collect();
			let info = DriverInstanceCreateInfo {
				application_name,
				enabled_extensions: &enabled,
			};

			match driver.create_instance(&info, allocator) {
				Ok(native) => {
					let id = DriverId::from_index(arena.terminators.len());
					tracing::debug!(driver = driver.name(), %id, %native, "driver instance created");
					arena.terminators.push(DriverTerminator {
						id,
						entry_points: driver.entry_points(),
						interface_version: driver.interface_version(),
						native,
						driver,
					});
				}
				Err(Status::OutOfHostMemory) => return Err(LoaderError::OutOfHostMemory),
				Err(status) => {
					log(
						LoaderLogFlags::ERROR | LoaderLogFlags::DRIVER,
						&format!("driver {} rejected instance creation: {status}", driver.name()),
					);
				}
			}
		}

		if arena.terminators.is_empty() {
			tracing::warn!(offered, "every driver rejected the instance");
			return Err(LoaderError::IncompatibleDriver);
		}
		Ok(arena)
	}

	pub(crate) fn len(&self) -> usize {
		self.terminators.len()
	}

	pub(crate) fn is_empty(&self) -> bool {
		self.terminators.is_empty()
	}

	pub(crate) fn iter(&self) -> std::slice::Iter<'_, DriverTerminator> {
		self.terminators.iter()
	}

	pub(crate) fn get(&self, id: DriverId) -> Option<&DriverTerminator> {
		self.terminators.get(id.index())
	}

	/// Destroys every native instance, newest first.
	pub(crate) fn destroy_all(&mut self) {
		while let Some(terminator) = self.terminators.pop() {
			terminator.driver.destroy_instance(terminator.native, &self.allocator);
		}
	}
}

impl Drop for DriverArena {
	fn drop(&mut self) {
		self.destroy_all();
	}
}

#[cfg(test)]
mod tests {
	use std::cell::RefCell;

	use strata_test_icd::{CallKind, TestDriver};

	use super::*;

	fn no_log(_: LoaderLogFlags, _: &str) {}

	fn candidates(drivers: &[&Arc<TestDriver>]) -> Vec<Arc<dyn Driver>> {
		drivers.iter().map(|driver| Arc::clone(driver) as Arc<dyn Driver>).collect()
	}

	#[test]
	fn ids_follow_accepted_order() {
		let a = TestDriver::builder("a").build();
		let rejecting = TestDriver::builder("b").fail(CallKind::CreateInstance, Status::IncompatibleDriver).build();
		let c = TestDriver::builder("c").build();
		let logged = RefCell::new(Vec::new());
		let log = |flags: LoaderLogFlags, message: &str| logged.borrow_mut().push((flags, message.to_owned()));

		let arena = DriverArena::create(candidates(&[&a, &rejecting, &c]), None, &[], &AllocationCallbacks::system(), &log).unwrap();

		let names: Vec<_> = arena.iter().map(|t| (t.id().index(), t.name().to_owned())).collect();
		assert_eq!(names, vec![(0, "a".to_owned()), (1, "c".to_owned())]);
		assert_eq!(logged.borrow().len(), 1);
		assert!(logged.borrow()[0].0.contains(LoaderLogFlags::ERROR));
	}

	#[test]
	fn only_advertised_extensions_are_forwarded() {
		let driver = TestDriver::builder("a").extensions(["VK_KHR_surface"]).build();
		let enabled = vec!["VK_KHR_surface".to_owned(), "VK_EXT_debug_utils".to_owned()];
		let _arena = DriverArena::create(candidates(&[&driver]), Some("app"), &enabled, &AllocationCallbacks::system(), &no_log).unwrap();
		assert_eq!(driver.enabled_extensions(), vec!["VK_KHR_surface".to_owned()]);
	}

	#[test]
	fn all_rejecting_is_incompatible() {
		let driver = TestDriver::builder("a").fail(CallKind::CreateInstance, Status::InitializationFailed).build();
		let err = DriverArena::create(candidates(&[&driver]), None, &[], &AllocationCallbacks::system(), &no_log).err();
		assert_eq!(err, Some(LoaderError::IncompatibleDriver));
	}

	#[test]
	fn out_of_memory_unwinds_created_instances() {
		let a = TestDriver::builder("a").build();
		let b = TestDriver::builder("b").fail(CallKind::CreateInstance, Status::OutOfHostMemory).build();
		let err = DriverArena::create(candidates(&[&a, &b]), None, &[], &AllocationCallbacks::system(), &no_log).err();
		assert_eq!(err, Some(LoaderError::OutOfHostMemory));
		assert_eq!(a.handles(CallKind::DestroyInstance), a.handles(CallKind::CreateInstance));
	}

	#[test]
	fn drop_destroys_native_instances() {
		let a = TestDriver::builder("a").build();
		let arena = DriverArena::create(candidates(&[&a]), None, &[], &AllocationCallbacks::system(), &no_log).unwrap();
		assert_eq!(arena.len(), 1);
		drop(arena);
		assert_eq!(a.count(CallKind::DestroyInstance), 1);
	}

	#[test]
	fn no_candidates_is_an_empty_arena() {
		let arena = DriverArena::create(Vec::new(), None, &[], &AllocationCallbacks::system(), &no_log).unwrap();
		assert!(arena.is_empty());
	}
}
