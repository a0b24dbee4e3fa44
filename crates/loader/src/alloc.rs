//! Charging bookkeeping allocations against the active allocator.

use std::alloc::Layout;

use strata_abi::{AllocationCallbacks, AllocationScope};

use crate::error::{LoaderError, Result};

/// An accepted charge, released when dropped.
///
/// Loader-owned bookkeeping objects hold one of these for their lifetime,
/// so failure paths and teardown release exactly what was charged.
pub(crate) struct HostAllocation {
	callbacks: AllocationCallbacks,
	layout: Layout,
	scope: AllocationScope,
}

impl HostAllocation {
	pub(crate) fn charge(callbacks: &AllocationCallbacks, layout: Layout, scope: AllocationScope) -> Result<Self> {
		if !callbacks.reserve(layout, scope) {
			tracing::debug!(size = layout.size(), ?scope, "host allocation refused");
			return Err(LoaderError::OutOfHostMemory);
		}
		Ok(Self {
			callbacks: callbacks.clone(),
			layout,
			scope,
		})
	}

	pub(crate) fn for_value<T>(callbacks: &AllocationCallbacks, scope: AllocationScope) -> Result<Self> {
		Self::charge(callbacks, Layout::new::<T>(), scope)
	}

	pub(crate) fn for_array<T>(callbacks: &AllocationCallbacks, len: usize, scope: AllocationScope) -> Result<Self> {
		let layout = Layout::array::<T>(len).map_err(|_| LoaderError::OutOfHostMemory)?;
		Self::charge(callbacks, layout, scope)
	}

	pub(crate) fn for_bytes(callbacks: &AllocationCallbacks, len: usize, scope: AllocationScope) -> Result<Self> {
		Self::for_array::<u8>(callbacks, len, scope)
	}
}

impl Drop for HostAllocation {
	fn drop(&mut self) {
		self.callbacks.release(self.layout, self.scope);
	}
}

/// Builds a boxed slice of `len` copies of `value`, reporting allocation
/// failure instead of aborting.
pub(crate) fn try_filled<T: Clone>(len: usize, value: T) -> Result<Box<[T]>> {
	let mut items = Vec::new();
	items.try_reserve_exact(len).map_err(|_| LoaderError::OutOfHostMemory)?;
	items.resize(len, value);
	Ok(items.into_boxed_slice())
}
