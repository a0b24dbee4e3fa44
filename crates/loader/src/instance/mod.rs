//! The instance: root of every object a loader client creates.
//!
//! An [`Instance`] owns its drivers, its layer chain, its callback registry,
//! both extension resolution tables and every aggregate object created
//! through it. All shared state sits behind the instance's own locks, so two
//! instances never contend with each other.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;
use slab::Slab;
use strata_abi::{
	AllocationCallbacks, AllocationScope, DEBUG_REPORT_EXTENSION_NAME, DEBUG_UTILS_EXTENSION_NAME, Driver, Layer, MessengerCreateInfo, NativeHandle,
	ReportCallbackCreateInfo, SURFACE_EXTENSION_NAME, SurfacePlatform,
};

use crate::alloc::HostAllocation;
use crate::chain::LayerChain;
use crate::debug::{CallbackKind, CallbackRegistry, DebugCallbackHandle, DebugObject};
use crate::driver::{DriverArena, DriverId, DriverTerminator};
use crate::error::{LoaderError, Result};
use crate::ext::{PhysDevExtTable, ResolutionTable, TableKind};
use crate::log::{LoaderLogFlags, loader_log};
use crate::settings::LoaderSettings;
use crate::surface::IcdSurface;

mod device;

pub(crate) use device::Device;
pub use device::DeviceHandle;

static NEXT_INSTANCE_ID: AtomicU64 = AtomicU64::new(1);

bitflags::bitflags! {
	/// Well-known instance extensions the loader itself acts on.
	#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
	pub struct KnownExtensions: u32 {
		const DEBUG_REPORT = 1 << 0;
		const DEBUG_UTILS = 1 << 1;
		const SURFACE = 1 << 2;
		const HEADLESS_SURFACE = 1 << 3;
		const DISPLAY = 1 << 4;
		const XCB_SURFACE = 1 << 5;
		const XLIB_SURFACE = 1 << 6;
		const WAYLAND_SURFACE = 1 << 7;
		const WIN32_SURFACE = 1 << 8;
		const METAL_SURFACE = 1 << 9;
	}
}

impl KnownExtensions {
	/// Extensions implemented by the loader regardless of drivers.
	pub const LOADER_PROVIDED: Self = Self::DEBUG_REPORT.union(Self::DEBUG_UTILS);

	/// The flag for extension `name`, empty for names the loader does not
	/// track.
	pub fn from_extension_name(name: &str) -> Self {
		match name {
			DEBUG_REPORT_EXTENSION_NAME => Self::DEBUG_REPORT,
			DEBUG_UTILS_EXTENSION_NAME => Self::DEBUG_UTILS,
			SURFACE_EXTENSION_NAME => Self::SURFACE,
			_ => SurfacePlatform::ALL
				.into_iter()
				.find(|platform| platform.extension_name() == name)
				.map_or(Self::empty(), Self::for_platform),
		}
	}

	pub const fn for_platform(platform: SurfacePlatform) -> Self {
		match platform {
			SurfacePlatform::Headless => Self::HEADLESS_SURFACE,
			SurfacePlatform::Display => Self::DISPLAY,
			SurfacePlatform::Xcb => Self::XCB_SURFACE,
			SurfacePlatform::Xlib => Self::XLIB_SURFACE,
			SurfacePlatform::Wayland => Self::WAYLAND_SURFACE,
			SurfacePlatform::Win32 => Self::WIN32_SURFACE,
			SurfacePlatform::Metal => Self::METAL_SURFACE,
		}
	}
}

/// A physical device, owned by exactly one driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PhysicalDevice {
	pub driver: DriverId,
	pub native: NativeHandle,
}

/// Application parameters for creating an instance.
///
/// Debug observers listed here are registered before any driver is loaded,
/// so they also see diagnostics emitted while the instance is being built.
#[derive(Debug, Clone, Default)]
pub struct InstanceCreateInfo {
	pub application_name: Option<String>,
	pub enabled_extensions: Vec<String>,
	pub debug_reports: Vec<ReportCallbackCreateInfo>,
	pub debug_messengers: Vec<MessengerCreateInfo>,
}

impl InstanceCreateInfo {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_application_name(mut self, name: impl Into<String>) -> Self {
		self.application_name = Some(name.into());
		self
	}

	pub fn with_extension(mut self, name: impl Into<String>) -> Self {
		self.enabled_extensions.push(name.into());
		self
	}

	pub fn with_extensions<I, S>(mut self, names: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.enabled_extensions.extend(names.into_iter().map(Into::into));
		self
	}

	pub fn with_debug_report(mut self, info: ReportCallbackCreateInfo) -> Self {
		self.debug_reports.push(info);
		self
	}

	pub fn with_debug_messenger(mut self, info: MessengerCreateInfo) -> Self {
		self.debug_messengers.push(info);
		self
	}
}

/// Collects candidate drivers and layers, then creates an [`Instance`].
#[derive(Default)]
pub struct InstanceBuilder {
	drivers: Vec<Arc<dyn Driver>>,
	layers: Vec<Arc<dyn Layer>>,
	settings: Option<LoaderSettings>,
	allocator: AllocationCallbacks,
}

impl InstanceBuilder {
	pub fn new() -> Self {
		Self::default()
	}

	/// Appends a candidate driver. Candidates are tried in the order given.
	pub fn driver(mut self, driver: Arc<dyn Driver>) -> Self {
		self.drivers.push(driver);
		self
	}

	pub fn drivers(mut self, drivers: impl IntoIterator<Item = Arc<dyn Driver>>) -> Self {
		self.drivers.extend(drivers);
		self
	}

	/// Appends an active layer. Layers are consulted in the order given.
	pub fn layer(mut self, layer: Arc<dyn Layer>) -> Self {
		self.layers.push(layer);
		self
	}

	pub fn layers(mut self, layers: impl IntoIterator<Item = Arc<dyn Layer>>) -> Self {
		self.layers.extend(layers);
		self
	}

	/// Settings for the instance. Defaults to [`LoaderSettings::from_env`].
	pub fn settings(mut self, settings: LoaderSettings) -> Self {
		self.settings = Some(settings);
		self
	}

	/// The allocator attached to the instance for its whole lifetime.
	pub fn allocator(mut self, allocator: AllocationCallbacks) -> Self {
		self.allocator = allocator;
		self
	}

	pub fn create(self, info: &InstanceCreateInfo) -> Result<Instance> {
		Instance::create(self, info)
	}
}

/// A loader instance.
pub struct Instance {
	id: u64,
	extensions: KnownExtensions,
	settings: LoaderSettings,
	pub(crate) allocator: AllocationCallbacks,
	pub(crate) registry: Mutex<CallbackRegistry>,
	pub(crate) drivers: DriverArena,
	pub(crate) layers: LayerChain,
	pub(crate) surfaces: Mutex<Slab<IcdSurface>>,
	pub(crate) debug_objects: Mutex<FxHashMap<DebugCallbackHandle, DebugObject>>,
	pub(crate) next_debug_handle: AtomicU64,
	pub(crate) device_ext: RwLock<ResolutionTable>,
	pub(crate) phys_dev_ext: RwLock<PhysDevExtTable>,
	pub(crate) devices: RwLock<Slab<Device>>,
	_charge: HostAllocation,
}

impl Instance {
	pub fn builder() -> InstanceBuilder {
		InstanceBuilder::new()
	}

	fn create(builder: InstanceBuilder, info: &InstanceCreateInfo) -> Result<Self> {
		let InstanceBuilder {
			drivers: candidates,
			layers,
			settings,
			allocator,
		} = builder;
		let settings = settings.unwrap_or_else(LoaderSettings::from_env);
		let charge = HostAllocation::for_value::<Self>(&allocator, AllocationScope::Instance)?;
		let id = NEXT_INSTANCE_ID.fetch_add(1, Ordering::Relaxed);

		let mut registry = CallbackRegistry::new();
		for request in &info.debug_reports {
			registry.register(DebugCallbackHandle::for_request(request), CallbackKind::from(request), &allocator)?;
		}
		for request in &info.debug_messengers {
			registry.register(DebugCallbackHandle::for_request(request), CallbackKind::from(request), &allocator)?;
		}
		let registry = Mutex::new(registry);
		let log = |flags: LoaderLogFlags, message: &str| loader_log(&registry, settings.log_filter, id, flags, message);

		let layers = LayerChain::new(layers);
		let mut extensions = KnownExtensions::empty();
		for name in &info.enabled_extensions {
			let known = KnownExtensions::from_extension_name(name);
			let provided = (!known.is_empty() && KnownExtensions::LOADER_PROVIDED.contains(known))
				|| candidates.iter().any(|driver| driver.instance_extensions().iter().any(|ext| ext == name))
				|| layers.provides_instance_extension(name);
			if !provided {
				log(LoaderLogFlags::ERROR, &format!("instance extension {name} is not provided by the loader, any driver or any layer"));
				return Err(LoaderError::ExtensionNotPresent(name.clone()));
			}
			extensions |= known;
		}
		for layer in layers.iter() {
			log(LoaderLogFlags::INFO | LoaderLogFlags::LAYER, &format!("layer {} active", layer.name()));
		}

		let drivers = DriverArena::create(candidates, info.application_name.as_deref(), &info.enabled_extensions, &allocator, &log)?;
		let capacity = settings.unknown_function_capacity;
		let device_ext = ResolutionTable::new(TableKind::Device, capacity, &allocator)?;
		let phys_dev_ext = PhysDevExtTable::new(capacity, &allocator)?;

		tracing::debug!(instance = id, drivers = drivers.len(), layers = layers.len(), ?extensions, "instance created");
		Ok(Self {
			id,
			extensions,
			settings,
			allocator,
			registry,
			drivers,
			layers,
			surfaces: Mutex::new(Slab::new()),
			debug_objects: Mutex::new(FxHashMap::default()),
			next_debug_handle: AtomicU64::new(0),
			device_ext: RwLock::new(device_ext),
			phys_dev_ext: RwLock::new(phys_dev_ext),
			devices: RwLock::new(Slab::new()),
			_charge: charge,
		})
	}

	/// Process-unique identity, used as the subject of loader messages.
	pub fn id(&self) -> u64 {
		self.id
	}

	/// Well-known extensions enabled on this instance.
	pub fn extensions(&self) -> KnownExtensions {
		self.extensions
	}

	pub fn settings(&self) -> &LoaderSettings {
		&self.settings
	}

	pub fn allocator(&self) -> &AllocationCallbacks {
		&self.allocator
	}

	/// Drivers that accepted the instance, in [`DriverId`] order.
	pub fn drivers(&self) -> impl Iterator<Item = &DriverTerminator> {
		self.drivers.iter()
	}

	pub fn driver_count(&self) -> usize {
		self.drivers.len()
	}

	pub fn driver(&self, id: DriverId) -> Result<&DriverTerminator> {
		self.drivers.get(id).ok_or(LoaderError::InvalidHandle("driver"))
	}

	pub fn layers(&self) -> &LayerChain {
		&self.layers
	}

	/// Emits a loader message. Must not be called while the registry is
	/// locked.
	pub(crate) fn log(&self, flags: LoaderLogFlags, message: &str) {
		loader_log(&self.registry, self.settings.log_filter, self.id, flags, message);
	}

	/// Physical devices of every driver, in driver order.
	pub fn enumerate_physical_devices(&self) -> Result<Vec<PhysicalDevice>> {
		let mut physical_devices = Vec::new();
		for driver in self.drivers.iter() {
			let natives = driver
				.driver()
				.enumerate_physical_devices(driver.native())
				.map_err(|status| LoaderError::Driver { driver: driver.id(), status })?;
			physical_devices.try_reserve(natives.len()).map_err(|_| LoaderError::OutOfHostMemory)?;
			physical_devices.extend(natives.into_iter().map(|native| PhysicalDevice { driver: driver.id(), native }));
		}
		Ok(physical_devices)
	}
}

impl Drop for Instance {
	fn drop(&mut self) {
		self.destroy_leaked_devices();
		self.destroy_leaked_surfaces();
		self.destroy_leaked_debug_objects();
		self.drivers.destroy_all();
		self.registry.get_mut().clear();
		tracing::debug!(instance = self.id, "instance destroyed");
	}
}
