//! Translation between the legacy and modern diagnostic classifications.
//!
//! A legacy-to-modern-to-legacy round trip keeps the severity bucket but may
//! drop type bits.

use strata_abi::{MessageSeverity, MessageType, ReportFlags};

use crate::log::LoaderLogFlags;

/// Legacy flags to modern severity and type.
///
/// Severity follows the priority information, warning, error, debug: the
/// first matching legacy bit decides. Performance warnings add the
/// performance type on top of whatever severity was chosen. Without any
/// type-bearing bit the type is validation when `default_is_validation`,
/// general otherwise.
pub fn report_to_messenger(flags: ReportFlags, default_is_validation: bool) -> (MessageSeverity, MessageType) {
	let mut severity = MessageSeverity::empty();
	let mut types = MessageType::empty();

	if flags.contains(ReportFlags::INFORMATION) {
		severity = MessageSeverity::INFO;
		types = MessageType::GENERAL;
	} else if flags.intersects(ReportFlags::WARNING | ReportFlags::PERFORMANCE_WARNING) {
		severity = MessageSeverity::WARNING;
	} else if flags.contains(ReportFlags::ERROR) {
		severity = MessageSeverity::ERROR;
	} else if flags.contains(ReportFlags::DEBUG) {
		severity = MessageSeverity::VERBOSE;
		types = MessageType::GENERAL;
	}

	if flags.contains(ReportFlags::PERFORMANCE_WARNING) {
		types |= MessageType::PERFORMANCE;
	} else if types.is_empty() {
		types = if default_is_validation {
			MessageType::VALIDATION
		} else {
			MessageType::GENERAL
		};
	}

	(severity, types)
}

/// Modern severity and type to legacy flags.
///
/// Exactly one legacy bit comes out, picked by the priority error, warning,
/// info, verbose. A warning whose type includes performance becomes a
/// performance warning.
pub fn messenger_to_report(severity: MessageSeverity, types: MessageType) -> ReportFlags {
	if severity.contains(MessageSeverity::ERROR) {
		ReportFlags::ERROR
	} else if severity.contains(MessageSeverity::WARNING) {
		if types.contains(MessageType::PERFORMANCE) {
			ReportFlags::PERFORMANCE_WARNING
		} else {
			ReportFlags::WARNING
		}
	} else if severity.contains(MessageSeverity::INFO) {
		ReportFlags::INFORMATION
	} else if severity.contains(MessageSeverity::VERBOSE) {
		ReportFlags::DEBUG
	} else {
		ReportFlags::empty()
	}
}

/// Loader message categories to modern severity and type.
///
/// Severity priority is info, warning, error, debug; messages tagged only
/// with the layer or driver category are informational.
pub fn log_flags_to_messenger(flags: LoaderLogFlags) -> (MessageSeverity, MessageType) {
	let severity = if flags.contains(LoaderLogFlags::INFO) {
		MessageSeverity::INFO
	} else if flags.contains(LoaderLogFlags::WARN) {
		MessageSeverity::WARNING
	} else if flags.intersects(LoaderLogFlags::ERROR | LoaderLogFlags::FATAL_ERROR) {
		MessageSeverity::ERROR
	} else if flags.contains(LoaderLogFlags::DEBUG) {
		MessageSeverity::VERBOSE
	} else if flags.intersects(LoaderLogFlags::LAYER | LoaderLogFlags::DRIVER) {
		MessageSeverity::INFO
	} else {
		MessageSeverity::empty()
	};

	let types = if flags.contains(LoaderLogFlags::PERF) {
		MessageType::PERFORMANCE
	} else if flags.contains(LoaderLogFlags::VALIDATION) {
		MessageType::GENERAL | MessageType::VALIDATION
	} else {
		MessageType::GENERAL
	};

	(severity, types)
}
