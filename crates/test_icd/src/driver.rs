use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use strata_abi::surface::SURFACE_EXTENSION_NAME;
use strata_abi::{
	AllocationCallbacks, DeviceCreateInfo, Driver, DriverInstanceCreateInfo, EntryPoints, InterfaceVersion, MessengerCreateInfo, NativeHandle,
	ProcAddr, ReportCallbackCreateInfo, ReportMessage, Status, SurfaceCreateInfo, SurfacePlatform,
};

static NEXT_HANDLE: AtomicU64 = AtomicU64::new(0x1000);

fn mint() -> NativeHandle {
	let raw = NEXT_HANDLE.fetch_add(1, Ordering::Relaxed);
	NativeHandle::new(raw).unwrap_or_else(|| unreachable!("handle counter starts above zero"))
}

/// Entry points a [`TestDriver`] records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallKind {
	CreateInstance,
	DestroyInstance,
	EnumeratePhysicalDevices,
	InstanceProcQuery,
	PhysicalDeviceProcQuery,
	CreateDevice,
	DestroyDevice,
	DeviceProcQuery,
	CreateSurface,
	DestroySurface,
	SurfaceSupport,
	CreateReportCallback,
	DestroyReportCallback,
	ReportMessage,
	CreateMessenger,
	DestroyMessenger,
}

/// One recorded call.
///
/// `handle` is the object created or consumed, `None` when a create failed.
/// `name` carries the queried entry point or the message text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
	pub kind: CallKind,
	pub handle: Option<NativeHandle>,
	pub name: Option<String>,
}

/// A driver that records every call and fails on demand.
pub struct TestDriver {
	name: String,
	interface_version: InterfaceVersion,
	entry_points: EntryPoints,
	extensions: Vec<String>,
	physical_devices: Vec<NativeHandle>,
	failures: FxHashMap<CallKind, Status>,
	instance_procs: FxHashMap<String, ProcAddr>,
	physical_device_procs: FxHashMap<String, ProcAddr>,
	device_procs: FxHashMap<String, ProcAddr>,
	surface_support: bool,
	enabled_extensions: Mutex<Vec<String>>,
	log: Mutex<Vec<Call>>,
}

impl TestDriver {
	pub fn builder(name: impl Into<String>) -> TestDriverBuilder {
		TestDriverBuilder::new(name)
	}

	/// Every call received so far, in order.
	pub fn calls(&self) -> Vec<Call> {
		self.log.lock().clone()
	}

	pub fn count(&self, kind: CallKind) -> usize {
		self.log.lock().iter().filter(|call| call.kind == kind).count()
	}

	/// Handles recorded for `kind`, skipping failed creates.
	pub fn handles(&self, kind: CallKind) -> Vec<NativeHandle> {
		self.log.lock().iter().filter(|call| call.kind == kind).filter_map(|call| call.handle).collect()
	}

	/// How many times entry point `name` was queried through `kind`.
	pub fn queries(&self, kind: CallKind, name: &str) -> usize {
		self.log
			.lock()
			.iter()
			.filter(|call| call.kind == kind && call.name.as_deref() == Some(name))
			.count()
	}

	pub fn clear_calls(&self) {
		self.log.lock().clear();
	}

	/// Extensions the loader enabled on the most recent native instance.
	pub fn enabled_extensions(&self) -> Vec<String> {
		self.enabled_extensions.lock().clone()
	}

	pub fn physical_devices(&self) -> &[NativeHandle] {
		&self.physical_devices
	}

	fn record(&self, kind: CallKind, handle: Option<NativeHandle>, name: Option<&str>) {
		self.log.lock().push(Call {
			kind,
			handle,
			name: name.map(str::to_owned),
		});
	}

	fn create(&self, kind: CallKind) -> Result<NativeHandle, Status> {
		if let Some(&status) = self.failures.get(&kind) {
			self.record(kind, None, None);
			return Err(status);
		}
		let handle = mint();
		self.record(kind, Some(handle), None);
		Ok(handle)
	}
}

impl Driver for TestDriver {
	fn name(&self) -> &str {
		&self.name
	}

	fn interface_version(&self) -> InterfaceVersion {
		self.interface_version
	}

	fn entry_points(&self) -> EntryPoints {
		self.entry_points
	}

	fn instance_extensions(&self) -> &[String] {
		&self.extensions
	}

	fn create_instance(&self, info: &DriverInstanceCreateInfo<'_>, _allocator: &AllocationCallbacks) -> Result<NativeHandle, Status> {
		*self.enabled_extensions.lock() = info.enabled_extensions.iter().map(|name| (*name).to_owned()).collect();
		self.create(CallKind::CreateInstance)
	}

	fn destroy_instance(&self, instance: NativeHandle, _allocator: &AllocationCallbacks) {
		self.record(CallKind::DestroyInstance, Some(instance), None);
	}

	fn enumerate_physical_devices(&self, instance: NativeHandle) -> Result<Vec<NativeHandle>, Status> {
		self.record(CallKind::EnumeratePhysicalDevices, Some(instance), None);
		if let Some(&status) = self.failures.get(&CallKind::EnumeratePhysicalDevices) {
			return Err(status);
		}
		Ok(self.physical_devices.clone())
	}

	fn get_instance_proc_addr(&self, instance: NativeHandle, name: &str) -> Option<ProcAddr> {
		self.record(CallKind::InstanceProcQuery, Some(instance), Some(name));
		self.instance_procs.get(name).copied()
	}

	fn get_physical_device_proc_addr(&self, instance: NativeHandle, name: &str) -> Option<ProcAddr> {
		self.record(CallKind::PhysicalDeviceProcQuery, Some(instance), Some(name));
		self.physical_device_procs.get(name).copied()
	}

	fn create_device(&self, _physical_device: NativeHandle, _info: &DeviceCreateInfo, _allocator: &AllocationCallbacks) -> Result<NativeHandle, Status> {
		self.create(CallKind::CreateDevice)
	}

	fn destroy_device(&self, device: NativeHandle, _allocator: &AllocationCallbacks) {
		self.record(CallKind::DestroyDevice, Some(device), None);
	}

	fn get_device_proc_addr(&self, device: NativeHandle, name: &str) -> Option<ProcAddr> {
		self.record(CallKind::DeviceProcQuery, Some(device), Some(name));
		self.device_procs.get(name).copied()
	}

	fn create_surface(&self, _instance: NativeHandle, _info: &SurfaceCreateInfo, _allocator: &AllocationCallbacks) -> Result<NativeHandle, Status> {
		self.create(CallKind::CreateSurface)
	}

	fn destroy_surface(&self, _instance: NativeHandle, surface: NativeHandle, _allocator: &AllocationCallbacks) {
		self.record(CallKind::DestroySurface, Some(surface), None);
	}

	fn get_physical_device_surface_support(&self, _physical_device: NativeHandle, _queue_family: u32, surface: NativeHandle) -> Result<bool, Status> {
		self.record(CallKind::SurfaceSupport, Some(surface), None);
		Ok(self.surface_support)
	}

	fn create_debug_report_callback(
		&self,
		_instance: NativeHandle,
		_info: &ReportCallbackCreateInfo,
		_allocator: &AllocationCallbacks,
	) -> Result<NativeHandle, Status> {
		self.create(CallKind::CreateReportCallback)
	}

	fn destroy_debug_report_callback(&self, _instance: NativeHandle, callback: NativeHandle, _allocator: &AllocationCallbacks) {
		self.record(CallKind::DestroyReportCallback, Some(callback), None);
	}

	fn debug_report_message(&self, instance: NativeHandle, message: &ReportMessage<'_>) {
		self.record(CallKind::ReportMessage, Some(instance), Some(message.message));
	}

	fn create_debug_messenger(&self, _instance: NativeHandle, _info: &MessengerCreateInfo, _allocator: &AllocationCallbacks) -> Result<NativeHandle, Status> {
		self.create(CallKind::CreateMessenger)
	}

	fn destroy_debug_messenger(&self, _instance: NativeHandle, messenger: NativeHandle, _allocator: &AllocationCallbacks) {
		self.record(CallKind::DestroyMessenger, Some(messenger), None);
	}
}

/// Builder for [`TestDriver`].
///
/// Defaults to the newest interface version, every optional entry point,
/// the surface extensions of every platform, and one physical device.
pub struct TestDriverBuilder {
	name: String,
	interface_version: InterfaceVersion,
	entry_points: EntryPoints,
	extensions: Vec<String>,
	physical_devices: usize,
	failures: FxHashMap<CallKind, Status>,
	instance_procs: FxHashMap<String, ProcAddr>,
	physical_device_procs: FxHashMap<String, ProcAddr>,
	device_procs: FxHashMap<String, ProcAddr>,
	surface_support: bool,
}

impl TestDriverBuilder {
	fn new(name: impl Into<String>) -> Self {
		let extensions = std::iter::once(SURFACE_EXTENSION_NAME)
			.chain(SurfacePlatform::ALL.iter().map(|platform| platform.extension_name()))
			.map(str::to_owned)
			.collect();
		Self {
			name: name.into(),
			interface_version: InterfaceVersion::CURRENT,
			entry_points: EntryPoints::all(),
			extensions,
			physical_devices: 1,
			failures: FxHashMap::default(),
			instance_procs: FxHashMap::default(),
			physical_device_procs: FxHashMap::default(),
			device_procs: FxHashMap::default(),
			surface_support: true,
		}
	}

	pub fn interface_version(mut self, version: u32) -> Self {
		self.interface_version = InterfaceVersion(version);
		self
	}

	pub fn entry_points(mut self, entry_points: EntryPoints) -> Self {
		self.entry_points = entry_points;
		self
	}

	pub fn without(mut self, entry_points: EntryPoints) -> Self {
		self.entry_points.remove(entry_points);
		self
	}

	/// Replaces the advertised instance extensions.
	pub fn extensions<I, S>(mut self, names: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.extensions = names.into_iter().map(Into::into).collect();
		self
	}

	pub fn physical_devices(mut self, count: usize) -> Self {
		self.physical_devices = count;
		self
	}

	/// Makes every call of `kind` fail with `status`.
	pub fn fail(mut self, kind: CallKind, status: Status) -> Self {
		self.failures.insert(kind, status);
		self
	}

	pub fn instance_proc(mut self, name: &str, addr: ProcAddr) -> Self {
		self.instance_procs.insert(name.to_owned(), addr);
		self
	}

	pub fn physical_device_proc(mut self, name: &str, addr: ProcAddr) -> Self {
		self.physical_device_procs.insert(name.to_owned(), addr);
		self
	}

	pub fn device_proc(mut self, name: &str, addr: ProcAddr) -> Self {
		self.device_procs.insert(name.to_owned(), addr);
		self
	}

	pub fn surface_support(mut self, supported: bool) -> Self {
		self.surface_support = supported;
		self
	}

	pub fn build(self) -> Arc<TestDriver> {
		Arc::new(TestDriver {
			name: self.name,
			interface_version: self.interface_version,
			entry_points: self.entry_points,
			extensions: self.extensions,
			physical_devices: (0..self.physical_devices).map(|_| mint()).collect(),
			failures: self.failures,
			instance_procs: self.instance_procs,
			physical_device_procs: self.physical_device_procs,
			device_procs: self.device_procs,
			surface_support: self.surface_support,
			enabled_extensions: Mutex::new(Vec::new()),
			log: Mutex::new(Vec::new()),
		})
	}
}
