//! Fixed-capacity open-addressed name table with per-slot overflow lists.

use std::hash::Hasher;

use rustc_hash::{FxHashMap, FxHasher};
use smallvec::SmallVec;
use strata_abi::{AllocationCallbacks, AllocationScope};

use super::TableKind;
use crate::alloc::{self, HostAllocation};
use crate::error::{LoaderError, Result};

#[derive(Default, Clone)]
struct Slot {
	name: Option<Box<str>>,
	/// Slots claimed by names whose primary slot is this one.
	overflow: SmallVec<[u32; 4]>,
}

/// Maps names to slot indices. Slots are claimed once and never released
/// before the table itself.
pub struct ResolutionTable {
	kind: TableKind,
	slots: Box<[Slot]>,
	claimed: usize,
	/// Names no driver provides, each with its own host charge.
	unsupported: FxHashMap<Box<str>, HostAllocation>,
	allocator: AllocationCallbacks,
	charges: Vec<HostAllocation>,
}

impl ResolutionTable {
	pub(crate) fn new(kind: TableKind, capacity: usize, allocator: &AllocationCallbacks) -> Result<Self> {
		let charge = HostAllocation::for_array::<Slot>(allocator, capacity, AllocationScope::Instance)?;
		let mut charges = Vec::new();
		charges.try_reserve(capacity + 1).map_err(|_| LoaderError::OutOfHostMemory)?;
		charges.push(charge);
		Ok(Self {
			kind,
			slots: alloc::try_filled(capacity, Slot::default())?,
			claimed: 0,
			unsupported: FxHashMap::default(),
			allocator: allocator.clone(),
			charges,
		})
	}

	pub fn kind(&self) -> TableKind {
		self.kind
	}

	pub fn capacity(&self) -> usize {
		self.slots.len()
	}

	/// Number of claimed slots.
	pub fn claimed(&self) -> usize {
		self.claimed
	}

	fn primary(&self, name: &str) -> usize {
		let mut hasher = FxHasher::default();
		hasher.write(name.as_bytes());
		(hasher.finish() % self.slots.len() as u64) as usize
	}

	/// The slot holding `name`: its primary slot, or one of the alternates
	/// recorded in the primary slot's overflow list.
	pub fn lookup(&self, name: &str) -> Option<u32> {
		if self.slots.is_empty() {
			return None;
		}
		let primary = self.primary(name);
		let slot = &self.slots[primary];
		if slot.name.as_deref() == Some(name) {
			return Some(primary as u32);
		}
		slot.overflow
			.iter()
			.copied()
			.find(|&alternate| self.slots[alternate as usize].name.as_deref() == Some(name))
	}

	/// Whether `name` was already confirmed unsupported.
	pub fn is_unsupported(&self, name: &str) -> bool {
		self.unsupported.contains_key(name)
	}

	/// Records `name` as unsupported. On failure the name stays unknown and
	/// the next lookup asks the drivers again.
	pub(crate) fn mark_unsupported(&mut self, name: &str) -> Result<()> {
		if self.unsupported.contains_key(name) {
			return Ok(());
		}
		let charge = HostAllocation::for_bytes(&self.allocator, name.len() + 1, AllocationScope::Instance)?;
		self.unsupported.try_reserve(1).map_err(|_| LoaderError::OutOfHostMemory)?;
		self.unsupported.insert(name.into(), charge);
		Ok(())
	}

	/// Claims a slot for `name`, which must not be present yet.
	///
	/// The primary slot is used when free. Otherwise the next free slot
	/// after it (wrapping) is claimed and recorded in the primary slot's
	/// overflow list. On failure nothing was claimed.
	pub(crate) fn insert(&mut self, name: &str) -> Result<u32> {
		debug_assert!(self.lookup(name).is_none(), "{name} is already in the {} table", self.kind);
		let capacity = self.slots.len();
		let exhausted = LoaderError::TableExhausted { table: self.kind, capacity };
		if capacity == 0 {
			return Err(exhausted);
		}

		let primary = self.primary(name);
		let target = if self.slots[primary].name.is_none() {
			primary
		} else {
			(1..capacity)
				.map(|step| (primary + step) % capacity)
				.find(|&index| self.slots[index].name.is_none())
				.ok_or(exhausted)?
		};

		let charge = HostAllocation::for_bytes(&self.allocator, name.len() + 1, AllocationScope::Instance)?;
		if target != primary {
			self.slots[primary].overflow.try_reserve(1).map_err(|_| LoaderError::OutOfHostMemory)?;
			self.slots[primary].overflow.push(target as u32);
		}
		self.slots[target].name = Some(name.into());
		self.charges.push(charge);
		self.claimed += 1;
		Ok(target as u32)
	}

	/// Claimed slots with their names, in slot order.
	pub fn names(&self) -> impl Iterator<Item = (u32, &str)> {
		self.slots
			.iter()
			.enumerate()
			.filter_map(|(index, slot)| slot.name.as_deref().map(|name| (index as u32, name)))
	}

	/// Primary slot index of `name`, exposed for collision tests.
	#[cfg(test)]
	pub(crate) fn primary_slot(&self, name: &str) -> usize {
		self.primary(name)
	}
}
