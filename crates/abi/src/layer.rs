//! The layer side of the loader boundary.

use crate::handle::{NativeHandle, ProcAddr};

/// First layer interface version exporting a physical-device proc query.
pub const LAYER_PHYSICAL_DEVICE_PROC_VERSION: u32 = 2;

/// An interceptor inserted between the application and the drivers.
///
/// The loader only consults a layer for extension resolution; the static
/// part of the call chain is wired elsewhere.
pub trait Layer: Send + Sync {
	fn name(&self) -> &str;

	fn interface_version(&self) -> u32 {
		1
	}

	/// Instance extensions this layer implements.
	fn instance_extensions(&self) -> &[String] {
		&[]
	}

	/// Device entry points declared by the layer manifest.
	fn device_extension_entry_points(&self) -> &[String] {
		&[]
	}

	/// Physical-device entry point query. Only consulted when
	/// [`Layer::interface_version`] is at least [`LAYER_PHYSICAL_DEVICE_PROC_VERSION`].
	fn get_physical_device_proc_addr(&self, _name: &str) -> Option<ProcAddr> {
		None
	}

	/// Device entry point query for a device created through this layer.
	fn get_device_proc_addr(&self, _device: NativeHandle, _name: &str) -> Option<ProcAddr> {
		None
	}
}
