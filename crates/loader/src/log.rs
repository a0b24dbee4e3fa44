//! The loader's own diagnostics.
//!
//! A loader message goes two ways: it is broadcast to every registered debug
//! observer as a modern-style event, and it is emitted as a `tracing` event
//! when the instance's log filter selects it.

use parking_lot::Mutex;
use strata_abi::{MessengerCallbackData, ObjectName, ObjectType};

use crate::debug::registry::CallbackRegistry;
use crate::debug::{DebugEvent, translate};

bitflags::bitflags! {
	/// Categories of loader messages.
	#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
	pub struct LoaderLogFlags: u32 {
		const INFO = 0x1;
		const WARN = 0x2;
		const PERF = 0x4;
		const ERROR = 0x8;
		const DEBUG = 0x10;
		const LAYER = 0x20;
		const DRIVER = 0x40;
		const VALIDATION = 0x80;
		/// Always emitted, regardless of the filter.
		const FATAL_ERROR = 0x100;
	}
}

impl LoaderLogFlags {
	/// Maps one word of a log filter specification to its categories.
	pub fn from_word(word: &str) -> Option<Self> {
		Some(match word {
			"all" => Self::all(),
			"info" => Self::INFO,
			"warn" | "warning" => Self::WARN,
			"perf" => Self::PERF,
			"error" => Self::ERROR,
			"debug" => Self::DEBUG,
			"layer" => Self::LAYER,
			"driver" | "implem" | "icd" => Self::DRIVER,
			"validation" => Self::VALIDATION,
			_ => return None,
		})
	}
}

/// Message-id name attached to every loader message.
pub const LOADER_MESSAGE_ID: &str = "Loader Message";

/// Broadcasts a loader message and traces it when `filter` selects it.
///
/// Must not be called while `registry` is locked.
pub(crate) fn loader_log(registry: &Mutex<CallbackRegistry>, filter: LoaderLogFlags, instance: u64, flags: LoaderLogFlags, message: &str) {
	let (severity, types) = translate::log_flags_to_messenger(flags);
	let object = ObjectName {
		object_type: ObjectType::Instance,
		handle: instance,
		name: None,
	};
	let data = MessengerCallbackData {
		message_id_name: Some(LOADER_MESSAGE_ID),
		message_id_number: 0,
		message,
		objects: std::slice::from_ref(&object),
	};
	registry.lock().broadcast(&DebugEvent::from_messenger(severity, types, &data));

	if filter.intersects(flags) || flags.contains(LoaderLogFlags::FATAL_ERROR) {
		trace(flags, message);
	}
}

fn trace(flags: LoaderLogFlags, message: &str) {
	if flags.intersects(LoaderLogFlags::ERROR | LoaderLogFlags::FATAL_ERROR) {
		tracing::error!(?flags, "{message}");
	} else if flags.contains(LoaderLogFlags::WARN) {
		tracing::warn!(?flags, "{message}");
	} else if flags.intersects(LoaderLogFlags::INFO | LoaderLogFlags::PERF | LoaderLogFlags::LAYER | LoaderLogFlags::DRIVER) {
		tracing::info!(?flags, "{message}");
	} else {
		tracing::debug!(?flags, "{message}");
	}
}
