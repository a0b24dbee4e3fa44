/// A failing result code reported by a driver or returned by the loader.
///
/// Success is not a variant: fallible driver calls return `Result<T, Status>`.
/// Discriminants match the raw codes of the wrapped API so a C surface can
/// forward them unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
#[repr(i32)]
pub enum Status {
	#[error("out of host memory")]
	OutOfHostMemory = -1,
	#[error("out of device memory")]
	OutOfDeviceMemory = -2,
	#[error("initialization failed")]
	InitializationFailed = -3,
	#[error("layer not present")]
	LayerNotPresent = -6,
	#[error("extension not present")]
	ExtensionNotPresent = -7,
	#[error("feature not present")]
	FeatureNotPresent = -8,
	#[error("incompatible driver")]
	IncompatibleDriver = -9,
	#[error("unknown error")]
	Unknown = -13,
	#[error("surface lost")]
	SurfaceLost = -1_000_000_000,
	#[error("native window in use")]
	NativeWindowInUse = -1_000_000_001,
}

impl Status {
	/// Raw code for success.
	pub const SUCCESS: i32 = 0;

	/// Returns the raw result code.
	pub const fn as_raw(self) -> i32 {
		self as i32
	}

	/// Maps a raw result code back to a failing status.
	///
	/// Returns `None` for success and for non-negative informational codes.
	/// Unrecognised negative codes collapse to [`Status::Unknown`].
	pub const fn from_raw(raw: i32) -> Option<Self> {
		Some(match raw {
			0.. => return None,
			-1 => Self::OutOfHostMemory,
			-2 => Self::OutOfDeviceMemory,
			-3 => Self::InitializationFailed,
			-6 => Self::LayerNotPresent,
			-7 => Self::ExtensionNotPresent,
			-8 => Self::FeatureNotPresent,
			-9 => Self::IncompatibleDriver,
			-1_000_000_000 => Self::SurfaceLost,
			-1_000_000_001 => Self::NativeWindowInUse,
			_ => Self::Unknown,
		})
	}
}
