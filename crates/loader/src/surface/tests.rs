use std::sync::Arc;

use pretty_assertions::assert_eq;
use rstest::rstest;
use strata_abi::surface::{DisplaySurface, WaylandSurface, XcbSurface};
use strata_test_icd::{CallKind, CountingAllocator, TestDriver};

use super::*;
use crate::testing::{instance, plain_drivers};

const HEADLESS: [&str; 2] = [SURFACE_EXTENSION_NAME, "VK_EXT_headless_surface"];

#[rstest]
#[case::headless(SurfaceCreateInfo::Headless, 0)]
#[case::xcb(SurfaceCreateInfo::Xcb(XcbSurface { connection: 1, window: 2 }), size_of::<XcbSurface>())]
#[case::wayland(SurfaceCreateInfo::Wayland(WaylandSurface::default()), size_of::<WaylandSurface>())]
#[case::display(SurfaceCreateInfo::Display(DisplaySurface::default()), size_of::<DisplaySurface>())]
fn header_records_both_parts(#[case] info: SurfaceCreateInfo, #[case] platform_size: usize) {
	let drivers = plain_drivers(1);
	let instance = instance(&drivers, &[SURFACE_EXTENSION_NAME, info.platform().extension_name()]);

	let surface = instance.create_surface(&info, None).unwrap();
	let header = instance.surface_header(surface).unwrap();

	assert_eq!(header.platform_size, platform_size);
	assert_eq!(header.entire_size, header.base_size + platform_size);
	assert_eq!(instance.surface_platform(surface), Some(info.platform()));
}

#[test]
fn surfaces_need_the_base_and_platform_extensions() {
	let drivers = plain_drivers(1);

	let platform_only = instance(&drivers, &["VK_EXT_headless_surface"]);
	assert_eq!(
		platform_only.create_surface(&SurfaceCreateInfo::Headless, None).err(),
		Some(LoaderError::ExtensionNotPresent(SURFACE_EXTENSION_NAME.to_owned()))
	);

	let base_only = instance(&drivers, &[SURFACE_EXTENSION_NAME]);
	assert_eq!(
		base_only.create_surface(&SurfaceCreateInfo::Headless, None).err(),
		Some(LoaderError::ExtensionNotPresent("VK_EXT_headless_surface".to_owned()))
	);
	assert_eq!(drivers[0].count(CallKind::CreateSurface), 0);
}

#[test]
fn old_drivers_are_skipped_and_consume_the_loader_handle() {
	let test_drivers = vec![
		TestDriver::builder("old").interface_version(2).build(),
		TestDriver::builder("new").build(),
	];
	let instance = instance(&test_drivers, &HEADLESS);
	let physical = instance.enumerate_physical_devices().unwrap();

	let surface = instance.create_surface(&SurfaceCreateInfo::Headless, None).unwrap();
	let own = test_drivers[1].handles(CallKind::CreateSurface);

	assert_eq!(test_drivers[0].count(CallKind::CreateSurface), 0);
	assert_eq!(
		instance.surface_driver_slots(surface),
		Some(vec![DriverSlot::NotCreated, DriverSlot::Created(own[0])])
	);

	assert!(instance.physical_device_surface_support(physical[0], 0, surface).unwrap());
	assert!(instance.physical_device_surface_support(physical[1], 0, surface).unwrap());
	assert_eq!(test_drivers[0].handles(CallKind::SurfaceSupport), vec![surface.as_native()]);
	assert_eq!(test_drivers[1].handles(CallKind::SurfaceSupport), own);
}

#[test]
fn driver_failure_unwinds_the_surface() {
	let test_drivers = vec![
		TestDriver::builder("a").build(),
		TestDriver::builder("b").fail(CallKind::CreateSurface, Status::SurfaceLost).build(),
		TestDriver::builder("c").build(),
	];
	let instance = instance(&test_drivers, &HEADLESS);

	let err = instance.create_surface(&SurfaceCreateInfo::Headless, None).err();

	assert_eq!(
		err,
		Some(LoaderError::Driver {
			driver: DriverId::from_index(1),
			status: Status::SurfaceLost
		})
	);
	assert_eq!(test_drivers[0].handles(CallKind::DestroySurface), test_drivers[0].handles(CallKind::CreateSurface));
	assert_eq!(test_drivers[2].count(CallKind::CreateSurface), 0);
	assert!(instance.surfaces.lock().is_empty());
}

#[test]
fn destroy_visits_only_created_slots() {
	let test_drivers = vec![
		TestDriver::builder("a").build(),
		TestDriver::builder("no-headless").without(EntryPoints::CREATE_HEADLESS_SURFACE).build(),
	];
	let instance = instance(&test_drivers, &HEADLESS);
	let surface = instance.create_surface(&SurfaceCreateInfo::Headless, None).unwrap();

	instance.destroy_surface(surface, None);
	instance.destroy_surface(surface, None);

	assert_eq!(test_drivers[0].count(CallKind::DestroySurface), 1);
	assert_eq!(test_drivers[1].count(CallKind::DestroySurface), 0);
	assert_eq!(instance.surface_header(surface), None);
}

#[test]
fn surface_charges_go_to_the_call_allocator() {
	let drivers = plain_drivers(2);
	let instance = instance(&drivers, &HEADLESS);
	let counter = Arc::new(CountingAllocator::new());
	let callbacks = AllocationCallbacks::new(counter.clone());

	let surface = instance.create_surface(&SurfaceCreateInfo::Headless, Some(&callbacks)).unwrap();
	assert_eq!(counter.outstanding(), 2);

	instance.destroy_surface(surface, Some(&callbacks));
	assert_eq!(counter.outstanding(), 0);
}

#[test]
fn leaked_surfaces_are_destroyed_with_the_instance() {
	let drivers = plain_drivers(2);
	let instance = instance(&drivers, &HEADLESS);
	instance.create_surface(&SurfaceCreateInfo::Headless, None).unwrap();
	instance.create_surface(&SurfaceCreateInfo::Headless, None).unwrap();

	drop(instance);

	for driver in &drivers {
		assert_eq!(driver.handles(CallKind::DestroySurface), driver.handles(CallKind::CreateSurface));
		assert_eq!(driver.count(CallKind::DestroySurface), 2);
	}
}
