//! Diagnostic callback types for both callback generations.
//!
//! The legacy "report" generation classifies a message with a single
//! [`ReportFlags`] mask. The modern "messenger" generation splits it into a
//! [`MessageSeverity`] and a [`MessageType`]. Observers of either kind are
//! reference-counted closures; whatever user context they need is captured
//! by the closure itself.

use std::fmt;
use std::sync::Arc;

pub const DEBUG_REPORT_EXTENSION_NAME: &str = "VK_EXT_debug_report";
pub const DEBUG_UTILS_EXTENSION_NAME: &str = "VK_EXT_debug_utils";

bitflags::bitflags! {
	/// Legacy report categories.
	#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
	pub struct ReportFlags: u32 {
		const INFORMATION = 0x1;
		const WARNING = 0x2;
		const PERFORMANCE_WARNING = 0x4;
		const ERROR = 0x8;
		const DEBUG = 0x10;
	}
}

bitflags::bitflags! {
	/// Modern message severities.
	#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
	pub struct MessageSeverity: u32 {
		const VERBOSE = 0x1;
		const INFO = 0x10;
		const WARNING = 0x100;
		const ERROR = 0x1000;
	}
}

bitflags::bitflags! {
	/// Modern message types.
	#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
	pub struct MessageType: u32 {
		const GENERAL = 0x1;
		const VALIDATION = 0x2;
		const PERFORMANCE = 0x4;
	}
}

/// Object type as seen by modern observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(i32)]
pub enum ObjectType {
	#[default]
	Unknown = 0,
	Instance = 1,
	PhysicalDevice = 2,
	Device = 3,
	Queue = 4,
	Semaphore = 5,
	CommandBuffer = 6,
	Fence = 7,
	DeviceMemory = 8,
	Buffer = 9,
	Image = 10,
	Surface = 1_000_000_000,
	Swapchain = 1_000_001_000,
	DebugReportCallback = 1_000_011_000,
	DebugMessenger = 1_000_128_000,
}

/// Object type as seen by legacy observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(i32)]
pub enum ReportObjectType {
	#[default]
	Unknown = 0,
	Instance = 1,
	PhysicalDevice = 2,
	Device = 3,
	Queue = 4,
	Semaphore = 5,
	CommandBuffer = 6,
	Fence = 7,
	DeviceMemory = 8,
	Buffer = 9,
	Image = 10,
	Surface = 26,
	Swapchain = 27,
	DebugReportCallback = 28,
}

impl ObjectType {
	/// Converts to the legacy object type. Types with no legacy equivalent
	/// become [`ReportObjectType::Unknown`].
	pub const fn to_report(self) -> ReportObjectType {
		match self {
			Self::Unknown | Self::DebugMessenger => ReportObjectType::Unknown,
			Self::Instance => ReportObjectType::Instance,
			Self::PhysicalDevice => ReportObjectType::PhysicalDevice,
			Self::Device => ReportObjectType::Device,
			Self::Queue => ReportObjectType::Queue,
			Self::Semaphore => ReportObjectType::Semaphore,
			Self::CommandBuffer => ReportObjectType::CommandBuffer,
			Self::Fence => ReportObjectType::Fence,
			Self::DeviceMemory => ReportObjectType::DeviceMemory,
			Self::Buffer => ReportObjectType::Buffer,
			Self::Image => ReportObjectType::Image,
			Self::Surface => ReportObjectType::Surface,
			Self::Swapchain => ReportObjectType::Swapchain,
			Self::DebugReportCallback => ReportObjectType::DebugReportCallback,
		}
	}
}

impl ReportObjectType {
	/// Converts to the modern object type.
	pub const fn to_object_type(self) -> ObjectType {
		match self {
			Self::Unknown => ObjectType::Unknown,
			Self::Instance => ObjectType::Instance,
			Self::PhysicalDevice => ObjectType::PhysicalDevice,
			Self::Device => ObjectType::Device,
			Self::Queue => ObjectType::Queue,
			Self::Semaphore => ObjectType::Semaphore,
			Self::CommandBuffer => ObjectType::CommandBuffer,
			Self::Fence => ObjectType::Fence,
			Self::DeviceMemory => ObjectType::DeviceMemory,
			Self::Buffer => ObjectType::Buffer,
			Self::Image => ObjectType::Image,
			Self::Surface => ObjectType::Surface,
			Self::Swapchain => ObjectType::Swapchain,
			Self::DebugReportCallback => ObjectType::DebugReportCallback,
		}
	}
}

/// One subject object attached to a modern message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ObjectName<'a> {
	pub object_type: ObjectType,
	pub handle: u64,
	pub name: Option<&'a str>,
}

/// Payload delivered to modern observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MessengerCallbackData<'a> {
	pub message_id_name: Option<&'a str>,
	pub message_id_number: i32,
	pub message: &'a str,
	pub objects: &'a [ObjectName<'a>],
}

/// Payload delivered to legacy observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReportMessage<'a> {
	pub flags: ReportFlags,
	pub object_type: ReportObjectType,
	pub object: u64,
	pub location: usize,
	pub message_code: i32,
	pub layer_prefix: &'a str,
	pub message: &'a str,
}

/// Legacy observer. Returning `true` asks the producer to abort the call
/// that triggered the message.
pub type ReportCallback = Arc<dyn Fn(&ReportMessage<'_>) -> bool + Send + Sync>;

/// Modern observer. Returning `true` asks the producer to abort the call
/// that triggered the message.
pub type MessengerCallback = Arc<dyn Fn(MessageSeverity, MessageType, &MessengerCallbackData<'_>) -> bool + Send + Sync>;

/// Parameters for registering a legacy observer.
#[derive(Clone)]
pub struct ReportCallbackCreateInfo {
	pub flags: ReportFlags,
	pub callback: ReportCallback,
}

impl ReportCallbackCreateInfo {
	pub fn new(flags: ReportFlags, callback: impl Fn(&ReportMessage<'_>) -> bool + Send + Sync + 'static) -> Self {
		Self {
			flags,
			callback: Arc::new(callback),
		}
	}
}

impl fmt::Debug for ReportCallbackCreateInfo {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ReportCallbackCreateInfo").field("flags", &self.flags).finish_non_exhaustive()
	}
}

/// Parameters for registering a modern observer.
#[derive(Clone)]
pub struct MessengerCreateInfo {
	pub severity: MessageSeverity,
	pub types: MessageType,
	pub callback: MessengerCallback,
}

impl MessengerCreateInfo {
	pub fn new(
		severity: MessageSeverity,
		types: MessageType,
		callback: impl Fn(MessageSeverity, MessageType, &MessengerCallbackData<'_>) -> bool + Send + Sync + 'static,
	) -> Self {
		Self {
			severity,
			types,
			callback: Arc::new(callback),
		}
	}
}

impl fmt::Debug for MessengerCreateInfo {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("MessengerCreateInfo")
			.field("severity", &self.severity)
			.field("types", &self.types)
			.finish_non_exhaustive()
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;

	#[test]
	fn object_types_convert_both_ways() {
		for ty in [ObjectType::Instance, ObjectType::Device, ObjectType::Surface, ObjectType::DebugReportCallback] {
			assert_eq!(ty.to_report().to_object_type(), ty);
		}
	}

	#[test]
	fn messenger_has_no_legacy_object_type() {
		assert_eq!(ObjectType::DebugMessenger.to_report(), ReportObjectType::Unknown);
	}

	#[test]
	fn create_info_debug_omits_callback() {
		let info = ReportCallbackCreateInfo::new(ReportFlags::ERROR, |_| false);
		assert_eq!(format!("{info:?}"), "ReportCallbackCreateInfo { flags: ReportFlags(ERROR), .. }");
	}
}
