//! Boundary types for the strata loader.
//!
//! Everything that crosses between the loader and the components it routes
//! to lives here: opaque handles, callable addresses, result codes, the
//! diagnostic flag sets of both callback generations, and the traits a
//! driver or layer implements to be loadable.
//!
//! The loader crate consumes these types; driver and layer implementations
//! (including the simulated ones used in tests) depend only on this crate.

pub mod alloc;
pub mod debug;
pub mod driver;
pub mod handle;
pub mod layer;
pub mod status;
pub mod surface;

pub use alloc::{AllocationCallbacks, AllocationScope, HostAllocator};
pub use debug::{
	DEBUG_REPORT_EXTENSION_NAME, DEBUG_UTILS_EXTENSION_NAME, MessageSeverity, MessageType, MessengerCallback, MessengerCallbackData,
	MessengerCreateInfo, ObjectName, ObjectType, ReportCallback, ReportCallbackCreateInfo, ReportFlags, ReportMessage, ReportObjectType,
};
pub use driver::{DeviceCreateInfo, Driver, DriverInstanceCreateInfo, EntryPoints, InterfaceVersion};
pub use handle::{NativeHandle, ProcAddr, VoidFunction};
pub use layer::{LAYER_PHYSICAL_DEVICE_PROC_VERSION, Layer};
pub use status::Status;
pub use surface::{SURFACE_EXTENSION_NAME, SurfaceCreateInfo, SurfacePlatform};
