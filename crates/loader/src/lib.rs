//! Dispatch and fan-out core of the strata loader.
//!
//! An [`Instance`] sits between an application and any number of drivers and
//! layers. It owns three pieces of machinery:
//!
//! * [`fanout`]: create a logical object once per loaded driver, or undo
//!   every per-driver object already created when one driver fails.
//!   Surfaces ([`surface`]) and debug callbacks ([`debug`]) use it.
//! * [`debug`]: the callback broadcast registry, delivering every diagnostic
//!   event to both legacy report observers and modern messenger observers.
//! * [`ext`]: lazily populated resolution tables mapping extension function
//!   names discovered at run time to dispatch slots.
//!
//! Driver discovery is external: the caller hands [`InstanceBuilder`] an
//! ordered list of candidate [`Driver`](strata_abi::Driver)s and
//! [`Layer`](strata_abi::Layer)s.

mod alloc;
pub mod chain;
pub mod debug;
pub mod driver;
mod error;
pub mod ext;
pub mod fanout;
pub mod instance;
pub mod log;
pub mod settings;
pub mod surface;
#[cfg(test)]
mod testing;

pub use debug::{DebugCallbackHandle, DebugEvent, EventFlags};
pub use driver::{DriverId, DriverTerminator};
pub use error::{LoaderError, Result};
pub use ext::{DeviceExtFn, DriverSupport, PhysDevExtEntry, PhysicalDeviceExtFn, TableKind};
pub use fanout::{DriverSlot, PerDriverHandles};
pub use instance::{DeviceHandle, Instance, InstanceBuilder, InstanceCreateInfo, KnownExtensions, PhysicalDevice};
pub use log::LoaderLogFlags;
pub use settings::{LoaderSettings, SettingsError};
pub use strata_abi as abi;
pub use surface::{SurfaceHandle, SurfaceHeader};
