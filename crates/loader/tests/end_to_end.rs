//! Full loader sessions driven through the public API only.
//!
//! Each test builds an instance over simulated drivers, runs a sequence of
//! application calls, and checks what every driver observed.

use std::sync::Arc;

use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use strata_loader::abi::{
	DEBUG_UTILS_EXTENSION_NAME, DeviceCreateInfo, Driver, MessageSeverity, MessageType, MessengerCallbackData, MessengerCreateInfo,
	SURFACE_EXTENSION_NAME, Status, SurfaceCreateInfo,
};
use strata_loader::{Instance, InstanceCreateInfo, LoaderError, LoaderSettings, PhysDevExtEntry};
use strata_test_icd::{CallKind, TestDriver, proc_addr};

const HEADLESS: &str = "VK_EXT_headless_surface";

fn init_tracing() {
	let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn instance(drivers: &[Arc<TestDriver>], info: &InstanceCreateInfo) -> Instance {
	Instance::builder()
		.drivers(drivers.iter().map(|driver| Arc::clone(driver) as Arc<dyn Driver>))
		.settings(LoaderSettings::default().with_log_spec("all"))
		.create(info)
		.unwrap()
}

#[test]
fn third_driver_failing_a_surface_unwinds_the_first_two() {
	init_tracing();
	let drivers = vec![
		TestDriver::builder("icd0").build(),
		TestDriver::builder("icd1").build(),
		TestDriver::builder("icd2").fail(CallKind::CreateSurface, Status::OutOfDeviceMemory).build(),
	];
	let instance = instance(&drivers, &InstanceCreateInfo::new().with_extensions([SURFACE_EXTENSION_NAME, HEADLESS]));

	let err = instance.create_surface(&SurfaceCreateInfo::Headless, None).unwrap_err();

	let LoaderError::Driver { driver, status } = &err else {
		panic!("expected a driver error, got {err:?}");
	};
	assert_eq!(driver.index(), 2);
	assert_eq!(*status, Status::OutOfDeviceMemory);
	assert_eq!(err.status(), Status::OutOfDeviceMemory);
	for driver in &drivers[..2] {
		assert_eq!(driver.count(CallKind::DestroySurface), 1);
		assert_eq!(driver.handles(CallKind::DestroySurface), driver.handles(CallKind::CreateSurface));
	}
	assert_eq!(drivers[2].count(CallKind::DestroySurface), 0);
}

#[test]
fn full_session() {
	init_tracing();
	let drivers = vec![
		TestDriver::builder("gpu")
			.physical_devices(2)
			.instance_proc("vkCmdSetDepthBiasEXT", proc_addr(14))
			.device_proc("vkCmdSetDepthBiasEXT", proc_addr(14))
			.physical_device_proc("vkGetPhysicalDeviceToolsEXT", proc_addr(15))
			.build(),
		TestDriver::builder("software").interface_version(2).build(),
	];
	let messages = Arc::new(Mutex::new(Vec::new()));
	let sink = messages.clone();
	let observer = MessengerCreateInfo::new(MessageSeverity::all(), MessageType::GENERAL, move |_, _, data| {
		sink.lock().push(data.message.to_owned());
		false
	});
	let info = InstanceCreateInfo::new()
		.with_application_name("end-to-end")
		.with_extensions([SURFACE_EXTENSION_NAME, HEADLESS, DEBUG_UTILS_EXTENSION_NAME]);
	let instance = instance(&drivers, &info);

	let physical = instance.enumerate_physical_devices().unwrap();
	assert_eq!(physical.len(), 3);
	let device = instance.create_device(physical[0], &DeviceCreateInfo::default(), None).unwrap();

	let depth_bias = instance.resolve_device_extension("vkCmdSetDepthBiasEXT").unwrap().unwrap();
	assert_eq!(instance.device_extension_proc(device, depth_bias), Some(proc_addr(14)));

	let tools = instance.resolve_physical_device_extension("vkGetPhysicalDeviceToolsEXT").unwrap().unwrap();
	assert!(matches!(tools.entry(), PhysDevExtEntry::Driver { driver, .. } if driver.index() == 0));
	assert_eq!(instance.physical_device_extension_proc(physical[2], &tools), None);

	let surface = instance.create_surface(&SurfaceCreateInfo::Headless, None).unwrap();
	assert!(instance.physical_device_surface_support(physical[2], 0, surface).unwrap());
	assert_eq!(drivers[1].handles(CallKind::SurfaceSupport), vec![surface.as_native()]);

	let messenger = instance.create_debug_messenger(&observer, None).unwrap();
	let data = MessengerCallbackData {
		message: "frame submitted",
		..Default::default()
	};
	assert!(!instance.submit_debug_message(MessageSeverity::INFO, MessageType::GENERAL, &data));
	assert_eq!(*messages.lock(), vec!["frame submitted".to_owned()]);

	instance.destroy_debug_callback(messenger, None);
	instance.destroy_surface(surface, None);
	instance.destroy_device(device, None);
	assert_eq!(instance.debug_callback_count(), 0);
	drop(instance);

	for driver in &drivers {
		assert_eq!(driver.count(CallKind::DestroyInstance), 1);
		assert_eq!(driver.handles(CallKind::DestroyMessenger), driver.handles(CallKind::CreateMessenger));
	}
	assert_eq!(drivers[0].count(CallKind::DestroyDevice), 1);
}
