use std::alloc::Layout;
use std::sync::atomic::{AtomicUsize, Ordering};

use strata_abi::{AllocationScope, HostAllocator};

/// Host allocator that tracks outstanding charges and can refuse them.
#[derive(Debug, Default)]
pub struct CountingAllocator {
	accepted: AtomicUsize,
	refused: AtomicUsize,
	outstanding: AtomicUsize,
	outstanding_bytes: AtomicUsize,
	/// Accept this many charges, refuse every later one. Zero means never refuse.
	budget: AtomicUsize,
}

impl CountingAllocator {
	pub fn new() -> Self {
		Self::default()
	}

	/// Allocator that accepts `count` charges and refuses the rest.
	pub fn failing_after(count: usize) -> Self {
		let allocator = Self::default();
		allocator.budget.store(count + 1, Ordering::SeqCst);
		allocator
	}

	/// Charges accepted and not yet released.
	pub fn outstanding(&self) -> usize {
		self.outstanding.load(Ordering::SeqCst)
	}

	pub fn outstanding_bytes(&self) -> usize {
		self.outstanding_bytes.load(Ordering::SeqCst)
	}

	pub fn accepted(&self) -> usize {
		self.accepted.load(Ordering::SeqCst)
	}

	pub fn refused(&self) -> usize {
		self.refused.load(Ordering::SeqCst)
	}
}

impl HostAllocator for CountingAllocator {
	fn reserve(&self, layout: Layout, _scope: AllocationScope) -> bool {
		let budget = self.budget.load(Ordering::SeqCst);
		if budget != 0 && self.accepted.load(Ordering::SeqCst) + 1 >= budget {
			self.refused.fetch_add(1, Ordering::SeqCst);
			return false;
		}
		self.accepted.fetch_add(1, Ordering::SeqCst);
		self.outstanding.fetch_add(1, Ordering::SeqCst);
		self.outstanding_bytes.fetch_add(layout.size(), Ordering::SeqCst);
		true
	}

	fn release(&self, layout: Layout, _scope: AllocationScope) {
		self.outstanding.fetch_sub(1, Ordering::SeqCst);
		self.outstanding_bytes.fetch_sub(layout.size(), Ordering::SeqCst);
	}
}
