//! Loader error type.

use strata_abi::Status;
use thiserror::Error;

use crate::debug::DebugCallbackHandle;
use crate::driver::DriverId;
use crate::ext::TableKind;

/// Errors returned by loader entry points.
///
/// An unsupported extension function is not an error; resolution reports it
/// as `Ok(None)`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoaderError {
	/// A bookkeeping allocation was refused.
	#[error("out of host memory")]
	OutOfHostMemory,

	/// A driver failed while the loader fanned a call out to it. Everything
	/// the loader had already created for the call has been destroyed.
	#[error("driver {driver} failed: {status}")]
	Driver { driver: DriverId, status: Status },

	/// The required instance extension was not enabled or not provided.
	#[error("extension not present: {0}")]
	ExtensionNotPresent(String),

	/// Drivers were offered but none accepted the instance.
	#[error("no compatible driver accepted the instance")]
	IncompatibleDriver,

	/// The extension resolution table ran out of slots.
	#[error("{table} extension table exhausted after {capacity} functions")]
	TableExhausted { table: TableKind, capacity: usize },

	#[error("debug callback {0} is already registered")]
	HandleInUse(DebugCallbackHandle),

	#[error("unknown {0} handle")]
	InvalidHandle(&'static str),
}

impl LoaderError {
	/// Result code a C entry point would return for this error.
	pub const fn status(&self) -> Status {
		match self {
			Self::OutOfHostMemory => Status::OutOfHostMemory,
			Self::Driver { status, .. } => *status,
			Self::ExtensionNotPresent(_) => Status::ExtensionNotPresent,
			Self::IncompatibleDriver => Status::IncompatibleDriver,
			Self::TableExhausted { .. } | Self::HandleInUse(_) => Status::InitializationFailed,
			Self::InvalidHandle(_) => Status::Unknown,
		}
	}
}

/// Result type for loader operations.
pub type Result<T, E = LoaderError> = std::result::Result<T, E>;
