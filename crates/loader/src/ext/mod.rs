//! Resolution of extension functions unknown at build time.
//!
//! Every instance owns two [`ResolutionTable`]s, one for device-level and
//! one for physical-device-level functions. A name is looked up first; on a
//! miss every driver and layer is asked once whether it implements the
//! function. Supported names claim a slot for the rest of the instance's
//! life, unsupported ones are remembered and resolve to `Ok(None)`.
//!
//! Lookups of already-resolved names take only the table's read lock.

use std::fmt;

mod device;
mod physical;
mod table;

pub use device::DeviceExtFn;
pub use physical::{DriverSupport, PhysDevExtEntry, PhysicalDeviceExtFn};
pub(crate) use physical::PhysDevExtTable;
pub use table::ResolutionTable;

/// Which resolution table a slot belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableKind {
	Device,
	PhysicalDevice,
}

impl fmt::Display for TableKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			Self::Device => "device",
			Self::PhysicalDevice => "physical-device",
		})
	}
}

#[cfg(test)]
mod tests;
