//! The callback broadcast registry.

use std::sync::Arc;

use smallvec::SmallVec;
use strata_abi::{
	AllocationCallbacks, AllocationScope, MessageSeverity, MessageType, MessengerCallback, MessengerCallbackData, MessengerCreateInfo,
	ObjectName, ReportCallback, ReportCallbackCreateInfo, ReportFlags, ReportMessage,
};

use super::{DebugCallbackHandle, DebugEvent, EventFlags, translate};
use crate::alloc::HostAllocation;
use crate::error::{LoaderError, Result};

/// Which generation an observer registered with, and its filter.
#[derive(Clone)]
pub enum CallbackKind {
	Report { flags: ReportFlags, callback: ReportCallback },
	Messenger { severity: MessageSeverity, types: MessageType, callback: MessengerCallback },
}

impl CallbackKind {
	pub fn report(flags: ReportFlags, callback: impl Fn(&ReportMessage<'_>) -> bool + Send + Sync + 'static) -> Self {
		Self::Report {
			flags,
			callback: Arc::new(callback),
		}
	}

	pub fn messenger(
		severity: MessageSeverity,
		types: MessageType,
		callback: impl Fn(MessageSeverity, MessageType, &MessengerCallbackData<'_>) -> bool + Send + Sync + 'static,
	) -> Self {
		Self::Messenger {
			severity,
			types,
			callback: Arc::new(callback),
		}
	}

	pub fn is_messenger(&self) -> bool {
		matches!(self, Self::Messenger { .. })
	}
}

impl From<&ReportCallbackCreateInfo> for CallbackKind {
	fn from(info: &ReportCallbackCreateInfo) -> Self {
		Self::Report {
			flags: info.flags,
			callback: info.callback.clone(),
		}
	}
}

impl From<&MessengerCreateInfo> for CallbackKind {
	fn from(info: &MessengerCreateInfo) -> Self {
		Self::Messenger {
			severity: info.severity,
			types: info.types,
			callback: info.callback.clone(),
		}
	}
}

struct CallbackRecord {
	handle: DebugCallbackHandle,
	kind: CallbackKind,
	_charge: HostAllocation,
}

/// Registered observers of one instance.
///
/// Records are stored oldest first; delivery walks them newest first.
#[derive(Default)]
pub struct CallbackRegistry {
	records: SmallVec<[CallbackRecord; 4]>,
}

impl CallbackRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn len(&self) -> usize {
		self.records.len()
	}

	pub fn is_empty(&self) -> bool {
		self.records.is_empty()
	}

	/// Handles in delivery order.
	pub fn handles(&self) -> impl Iterator<Item = DebugCallbackHandle> + '_ {
		self.records.iter().rev().map(|record| record.handle)
	}

	pub fn contains(&self, handle: DebugCallbackHandle) -> bool {
		self.records.iter().any(|record| record.handle == handle)
	}

	/// Adds an observer in front of every existing one.
	pub fn register(&mut self, handle: DebugCallbackHandle, kind: CallbackKind, allocator: &AllocationCallbacks) -> Result<()> {
		if self.contains(handle) {
			return Err(LoaderError::HandleInUse(handle));
		}
		let charge = HostAllocation::for_value::<CallbackRecord>(allocator, AllocationScope::Object)?;
		self.records.try_reserve(1).map_err(|_| LoaderError::OutOfHostMemory)?;
		self.records.push(CallbackRecord {
			handle,
			kind,
			_charge: charge,
		});
		Ok(())
	}

	/// Removes the observer registered under `handle`. Returns whether one
	/// was found.
	pub fn unregister(&mut self, handle: DebugCallbackHandle) -> bool {
		match self.records.iter().position(|record| record.handle == handle) {
			Some(index) => {
				self.records.remove(index);
				true
			}
			None => false,
		}
	}

	/// Delivers `event` to every observer whose filter matches it.
	///
	/// Returns whether any invoked observer asked for the triggering call to
	/// be aborted. Every matching observer runs regardless of earlier
	/// answers.
	pub fn broadcast(&self, event: &DebugEvent<'_>) -> bool {
		if self.records.is_empty() {
			return false;
		}

		let (report_flags, severity, types) = match event.flags {
			EventFlags::Report(flags) => {
				let (severity, types) = translate::report_to_messenger(flags, false);
				(flags, severity, types)
			}
			EventFlags::Messenger(severity, types) => (translate::messenger_to_report(severity, types), severity, types),
		};

		let report = ReportMessage {
			flags: report_flags,
			object_type: event.object_type.to_report(),
			object: event.object,
			location: event.location,
			message_code: event.message_id_number,
			layer_prefix: event.message_id_name.unwrap_or_default(),
			message: event.message,
		};
		let subject = [ObjectName {
			object_type: event.object_type,
			handle: event.object,
			name: None,
		}];
		let data = MessengerCallbackData {
			message_id_name: event.message_id_name,
			message_id_number: event.message_id_number,
			message: event.message,
			objects: if event.objects.is_empty() { &subject[..] } else { event.objects },
		};

		let mut abort = false;
		for record in self.records.iter().rev() {
			abort |= match &record.kind {
				CallbackKind::Report { flags, callback } if flags.intersects(report_flags) => callback(&report),
				CallbackKind::Messenger {
					severity: wanted_severity,
					types: wanted_types,
					callback,
				} if wanted_severity.intersects(severity) && wanted_types.intersects(types) => callback(severity, types, &data),
				_ => false,
			};
		}
		abort
	}

	/// Releases every record.
	pub fn clear(&mut self) {
		self.records.clear();
	}
}
