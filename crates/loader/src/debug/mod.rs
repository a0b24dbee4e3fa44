//! Debug observers of both callback generations.
//!
//! Every observer lives in the instance's [`CallbackRegistry`]. Observers
//! created through the instance are also fanned out to every driver that
//! exports the matching entry point, so driver-side diagnostics reach them
//! too. Observers attached to [`InstanceCreateInfo`](crate::InstanceCreateInfo)
//! are registered before any driver is loaded and stay registered until the
//! instance is dropped.

use std::fmt;
use std::num::NonZeroU64;
use std::sync::atomic::Ordering;

use strata_abi::{
	AllocationCallbacks, DEBUG_REPORT_EXTENSION_NAME, DEBUG_UTILS_EXTENSION_NAME, EntryPoints, InterfaceVersion, MessageSeverity, MessageType,
	MessengerCallbackData, MessengerCreateInfo, NativeHandle, ObjectName, ObjectType, ReportCallbackCreateInfo, ReportFlags, ReportMessage, Status,
};

use crate::driver::DriverTerminator;
use crate::error::{LoaderError, Result};
use crate::fanout::{self, FanOut, PerDriverHandles};
use crate::instance::{Instance, KnownExtensions};
use crate::log::LoaderLogFlags;

pub mod registry;
pub mod translate;

pub use registry::{CallbackKind, CallbackRegistry};

/// Opaque handle of a registered observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DebugCallbackHandle(NonZeroU64);

impl DebugCallbackHandle {
	const REQUEST_TAG: u64 = 1 << 63;

	pub const fn from_raw(raw: u64) -> Option<Self> {
		match NonZeroU64::new(raw) {
			Some(raw) => Some(Self(raw)),
			None => None,
		}
	}

	/// Handle derived from the identity of a registration request.
	///
	/// Used for observers registered while the instance is still being
	/// built. The tag bit keeps these apart from minted handles.
	pub fn for_request<T>(request: &T) -> Self {
		let address = std::ptr::from_ref(request) as u64;
		Self(NonZeroU64::MIN.saturating_add(address) | Self::REQUEST_TAG)
	}

	pub const fn as_raw(self) -> u64 {
		self.0.get()
	}
}

impl fmt::Display for DebugCallbackHandle {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{:#x}", self.0.get())
	}
}

/// Classification of a raw event in whichever generation produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventFlags {
	Report(ReportFlags),
	Messenger(MessageSeverity, MessageType),
}

/// A diagnostic event before translation.
#[derive(Debug, Clone, Copy)]
pub struct DebugEvent<'a> {
	pub flags: EventFlags,
	/// Subject object.
	pub object_type: ObjectType,
	pub object: u64,
	pub location: usize,
	pub message_id_name: Option<&'a str>,
	pub message_id_number: i32,
	pub message: &'a str,
	/// Every object the message refers to. Empty means just the subject.
	pub objects: &'a [ObjectName<'a>],
}

impl<'a> DebugEvent<'a> {
	pub fn new(flags: EventFlags, message: &'a str) -> Self {
		Self {
			flags,
			object_type: ObjectType::Unknown,
			object: 0,
			location: 0,
			message_id_name: None,
			message_id_number: 0,
			message,
			objects: &[],
		}
	}

	/// Event produced by a modern-style producer. The first object becomes
	/// the subject.
	pub fn from_messenger(severity: MessageSeverity, types: MessageType, data: &MessengerCallbackData<'a>) -> Self {
		let subject = data.objects.first().copied().unwrap_or_default();
		Self {
			flags: EventFlags::Messenger(severity, types),
			object_type: subject.object_type,
			object: subject.handle,
			location: 0,
			message_id_name: data.message_id_name,
			message_id_number: data.message_id_number,
			message: data.message,
			objects: data.objects,
		}
	}

	/// Event produced by a legacy-style producer.
	pub fn from_report(message: &ReportMessage<'a>) -> Self {
		Self {
			flags: EventFlags::Report(message.flags),
			object_type: message.object_type.to_object_type(),
			object: message.object,
			location: message.location,
			message_id_name: Some(message.layer_prefix),
			message_id_number: message.message_code,
			message: message.message,
			objects: &[],
		}
	}

	pub fn with_object(mut self, object_type: ObjectType, object: u64) -> Self {
		self.object_type = object_type;
		self.object = object;
		self
	}
}

pub(crate) struct ReportCallbackFanOut;

impl FanOut for ReportCallbackFanOut {
	type CreateInfo = ReportCallbackCreateInfo;

	const OBJECT: &'static str = "debug report callback";
	const MIN_INTERFACE_VERSION: Option<InterfaceVersion> = None;
	const DESTROY_ENTRY_POINT: EntryPoints = EntryPoints::DESTROY_DEBUG_REPORT_CALLBACK;

	fn create_entry_point(_info: &ReportCallbackCreateInfo) -> EntryPoints {
		EntryPoints::CREATE_DEBUG_REPORT_CALLBACK
	}

	fn create(driver: &DriverTerminator, info: &ReportCallbackCreateInfo, allocator: &AllocationCallbacks) -> Result<NativeHandle, Status> {
		driver.driver().create_debug_report_callback(driver.native(), info, allocator)
	}

	fn destroy(driver: &DriverTerminator, handle: NativeHandle, allocator: &AllocationCallbacks) {
		driver.driver().destroy_debug_report_callback(driver.native(), handle, allocator);
	}
}

pub(crate) struct MessengerFanOut;

impl FanOut for MessengerFanOut {
	type CreateInfo = MessengerCreateInfo;

	const OBJECT: &'static str = "debug messenger";
	const MIN_INTERFACE_VERSION: Option<InterfaceVersion> = None;
	const DESTROY_ENTRY_POINT: EntryPoints = EntryPoints::DESTROY_DEBUG_MESSENGER;

	fn create_entry_point(_info: &MessengerCreateInfo) -> EntryPoints {
		EntryPoints::CREATE_DEBUG_MESSENGER
	}

	fn create(driver: &DriverTerminator, info: &MessengerCreateInfo, allocator: &AllocationCallbacks) -> Result<NativeHandle, Status> {
		driver.driver().create_debug_messenger(driver.native(), info, allocator)
	}

	fn destroy(driver: &DriverTerminator, handle: NativeHandle, allocator: &AllocationCallbacks) {
		driver.driver().destroy_debug_messenger(driver.native(), handle, allocator);
	}
}

/// Per-driver objects behind one observer created through the instance.
pub(crate) enum DebugObject {
	Report(PerDriverHandles),
	Messenger(PerDriverHandles),
}

impl Instance {
	/// Registers a legacy observer and creates its per-driver callbacks.
	pub fn create_debug_report_callback(
		&self,
		info: &ReportCallbackCreateInfo,
		allocator: Option<&AllocationCallbacks>,
	) -> Result<DebugCallbackHandle> {
		if !self.extensions().contains(KnownExtensions::DEBUG_REPORT) {
			return Err(LoaderError::ExtensionNotPresent(DEBUG_REPORT_EXTENSION_NAME.to_owned()));
		}
		self.create_debug_object::<ReportCallbackFanOut>(info, CallbackKind::from(info), DebugObject::Report, allocator)
	}

	/// Registers a modern observer and creates its per-driver messengers.
	pub fn create_debug_messenger(&self, info: &MessengerCreateInfo, allocator: Option<&AllocationCallbacks>) -> Result<DebugCallbackHandle> {
		if !self.extensions().contains(KnownExtensions::DEBUG_UTILS) {
			return Err(LoaderError::ExtensionNotPresent(DEBUG_UTILS_EXTENSION_NAME.to_owned()));
		}
		self.create_debug_object::<MessengerFanOut>(info, CallbackKind::from(info), DebugObject::Messenger, allocator)
	}

	fn create_debug_object<C: FanOut>(
		&self,
		info: &C::CreateInfo,
		kind: CallbackKind,
		wrap: fn(PerDriverHandles) -> DebugObject,
		allocator: Option<&AllocationCallbacks>,
	) -> Result<DebugCallbackHandle> {
		let allocator = allocator.unwrap_or(&self.allocator);
		let mut objects = self.debug_objects.lock();

		let per_driver = fanout::create::<C>(&self.drivers, info, allocator)?;
		let handle = self.mint_debug_handle();
		if let Err(err) = self.registry.lock().register(handle, kind, allocator) {
			fanout::destroy::<C>(&self.drivers, per_driver, allocator);
			return Err(err);
		}
		objects.insert(handle, wrap(per_driver));
		tracing::debug!(object = C::OBJECT, %handle, "debug observer registered");
		Ok(handle)
	}

	fn mint_debug_handle(&self) -> DebugCallbackHandle {
		let serial = self.next_debug_handle.fetch_add(1, Ordering::Relaxed);
		DebugCallbackHandle(NonZeroU64::MIN.saturating_add(serial))
	}

	/// Unregisters the observer behind `handle` and destroys its per-driver
	/// objects. Unknown handles are ignored.
	pub fn destroy_debug_callback(&self, handle: DebugCallbackHandle, allocator: Option<&AllocationCallbacks>) {
		let allocator = allocator.unwrap_or(&self.allocator);
		let mut objects = self.debug_objects.lock();
		let object = objects.remove(&handle);
		let unregistered = self.registry.lock().unregister(handle);
		drop(objects);

		match object {
			Some(DebugObject::Report(per_driver)) => fanout::destroy::<ReportCallbackFanOut>(&self.drivers, per_driver, allocator),
			Some(DebugObject::Messenger(per_driver)) => fanout::destroy::<MessengerFanOut>(&self.drivers, per_driver, allocator),
			None if unregistered => {}
			None => tracing::debug!(%handle, "destroy of unknown debug observer ignored"),
		}
	}

	/// Delivers `event` to every matching observer. Returns whether any of
	/// them asked for the triggering call to be aborted.
	pub fn broadcast(&self, event: &DebugEvent<'_>) -> bool {
		self.registry.lock().broadcast(event)
	}

	/// Modern producer entry point.
	pub fn submit_debug_message(&self, severity: MessageSeverity, types: MessageType, data: &MessengerCallbackData<'_>) -> bool {
		self.broadcast(&DebugEvent::from_messenger(severity, types, data))
	}

	/// Legacy producer entry point: forwards `message` to every driver that
	/// accepts injected messages, then broadcasts it.
	pub fn debug_report_message(&self, message: &ReportMessage<'_>) -> bool {
		for driver in self.drivers.iter().filter(|driver| driver.exports(EntryPoints::DEBUG_REPORT_MESSAGE)) {
			driver.driver().debug_report_message(driver.native(), message);
		}
		self.broadcast(&DebugEvent::from_report(message))
	}

	/// Number of registered observers, construction-time ones included.
	pub fn debug_callback_count(&self) -> usize {
		self.registry.lock().len()
	}

	/// Destroys every observer the application leaked.
	pub(crate) fn destroy_leaked_debug_objects(&self) {
		let leaked: Vec<_> = self.debug_objects.lock().drain().collect();
		for (handle, object) in leaked {
			self.registry.lock().unregister(handle);
			self.log(LoaderLogFlags::WARN, &format!("destroying leaked debug observer {handle} at instance teardown"));
			match object {
				DebugObject::Report(per_driver) => fanout::destroy::<ReportCallbackFanOut>(&self.drivers, per_driver, &self.allocator),
				DebugObject::Messenger(per_driver) => fanout::destroy::<MessengerFanOut>(&self.drivers, per_driver, &self.allocator),
			}
		}
	}
}
