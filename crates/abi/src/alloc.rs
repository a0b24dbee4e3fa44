//! Caller-supplied host allocation hooks.
//!
//! The loader charges every bookkeeping allocation against the active
//! [`AllocationCallbacks`]. A caller allocator may refuse a charge, which the
//! loader reports as out-of-host-memory after unwinding whatever it had
//! already built. Without a caller allocator every charge succeeds.

use std::alloc::Layout;
use std::fmt;
use std::sync::Arc;

/// Lifetime class of an allocation, forwarded to the caller allocator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AllocationScope {
	Command,
	Object,
	Cache,
	Device,
	Instance,
}

/// Host allocator supplied by the application.
pub trait HostAllocator: Send + Sync {
	/// Charges an allocation. Returning `false` refuses it.
	fn reserve(&self, layout: Layout, scope: AllocationScope) -> bool;

	/// Releases a charge previously accepted by [`HostAllocator::reserve`].
	fn release(&self, layout: Layout, scope: AllocationScope);
}

/// The allocator configuration attached to an instance or a single call.
#[derive(Clone, Default)]
pub struct AllocationCallbacks {
	allocator: Option<Arc<dyn HostAllocator>>,
}

impl AllocationCallbacks {
	pub fn new(allocator: Arc<dyn HostAllocator>) -> Self {
		Self { allocator: Some(allocator) }
	}

	/// The default configuration, backed by the global allocator.
	pub fn system() -> Self {
		Self::default()
	}

	pub fn is_system(&self) -> bool {
		self.allocator.is_none()
	}

	pub fn reserve(&self, layout: Layout, scope: AllocationScope) -> bool {
		match &self.allocator {
			Some(allocator) => allocator.reserve(layout, scope),
			None => true,
		}
	}

	pub fn release(&self, layout: Layout, scope: AllocationScope) {
		if let Some(allocator) = &self.allocator {
			allocator.release(layout, scope);
		}
	}
}

impl fmt::Debug for AllocationCallbacks {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("AllocationCallbacks").field("system", &self.is_system()).finish()
	}
}
