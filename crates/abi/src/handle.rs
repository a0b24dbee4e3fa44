//! Opaque handles and callable addresses.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::num::NonZeroU64;

/// A handle a driver produced for one of its own objects.
///
/// The loader never interprets the value. It stores it and hands it back to
/// the driver that minted it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NativeHandle(NonZeroU64);

impl NativeHandle {
	/// Wraps a raw handle value. Returns `None` for the null handle.
	pub const fn new(raw: u64) -> Option<Self> {
		match NonZeroU64::new(raw) {
			Some(raw) => Some(Self(raw)),
			None => None,
		}
	}

	/// Returns the raw handle value.
	pub const fn as_raw(self) -> u64 {
		self.0.get()
	}
}

impl From<NonZeroU64> for NativeHandle {
	fn from(raw: NonZeroU64) -> Self {
		Self(raw)
	}
}

impl fmt::Display for NativeHandle {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{:#x}", self.0.get())
	}
}

/// Untyped function pointer, the common currency of proc-address queries.
pub type VoidFunction = unsafe extern "C" fn();

/// A callable address returned by a driver or layer capability query.
///
/// The signature is unknown to the loader; callers cast it to the concrete
/// type of the capability they asked for. Equality is address equality.
#[derive(Clone, Copy)]
pub struct ProcAddr(VoidFunction);

impl ProcAddr {
	pub const fn new(function: VoidFunction) -> Self {
		Self(function)
	}

	/// Returns the underlying function pointer.
	pub const fn as_fn(self) -> VoidFunction {
		self.0
	}

	/// Returns the numeric address.
	pub fn addr(self) -> usize {
		self.0 as usize
	}
}

impl PartialEq for ProcAddr {
	fn eq(&self, other: &Self) -> bool {
		self.addr() == other.addr()
	}
}

impl Eq for ProcAddr {}

impl Hash for ProcAddr {
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.addr().hash(state);
	}
}

impl fmt::Debug for ProcAddr {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "ProcAddr({:#x})", self.addr())
	}
}
