use std::collections::HashSet;
use std::sync::Arc;

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use strata_abi::{AllocationCallbacks, DeviceCreateInfo};
use strata_test_icd::{CallKind, CountingAllocator, TestDriver, TestLayer, proc_addr};

use super::*;
use crate::error::LoaderError;
use crate::instance::{Instance, InstanceCreateInfo};
use crate::settings::LoaderSettings;
use crate::testing::{drivers, instance, layers};
use crate::DriverId;

const CMD: &str = "vkCmdDrawClusterHUAWEI";

fn with_capacity(test_drivers: &[Arc<TestDriver>], capacity: usize) -> Instance {
	let settings = LoaderSettings::default().with_unknown_function_capacity(capacity).unwrap();
	Instance::builder()
		.drivers(drivers(test_drivers))
		.settings(settings)
		.create(&InstanceCreateInfo::new())
		.unwrap()
}

/// Two names sharing a primary slot in `table`.
fn colliding_pair(table: &ResolutionTable) -> (String, String) {
	let first = "vkFirstEXT".to_owned();
	let primary = table.primary_slot(&first);
	let second = (0..)
		.map(|index| format!("vkOther{index}EXT"))
		.find(|name| table.primary_slot(name) == primary)
		.unwrap();
	(first, second)
}

#[test]
fn resolution_is_idempotent_and_queries_once() {
	let test_drivers = vec![
		TestDriver::builder("a").instance_proc(CMD, proc_addr(0)).build(),
		TestDriver::builder("b").build(),
	];
	let layer = TestLayer::builder("l").build();
	let instance = Instance::builder()
		.drivers(drivers(&test_drivers))
		.layers(layers(&[layer.clone()]))
		.settings(LoaderSettings::default())
		.create(&InstanceCreateInfo::new())
		.unwrap();

	let first = instance.resolve_device_extension(CMD).unwrap();
	let second = instance.resolve_device_extension(CMD).unwrap();

	assert!(first.is_some());
	assert_eq!(first, second);
	for driver in &test_drivers {
		assert_eq!(driver.queries(CallKind::InstanceProcQuery, CMD), 1);
	}
	assert_eq!(layer.manifest_queries(), 1);
}

#[test]
fn unsupported_names_claim_no_slot() {
	let test_drivers = vec![TestDriver::builder("a").build(), TestDriver::builder("b").build()];
	let instance = instance(&test_drivers, &[]);

	assert_eq!(instance.resolve_device_extension("vkMissingA").unwrap(), None);
	assert_eq!(instance.resolve_device_extension("vkMissingB").unwrap(), None);
	assert_eq!(instance.resolve_device_extension("vkMissingA").unwrap(), None);

	assert!(instance.device_extension_names().is_empty());
	assert_eq!(test_drivers[0].queries(CallKind::InstanceProcQuery, "vkMissingA"), 1);
}

#[test]
fn exhaustion_is_explicit_and_leaves_no_slot() {
	let driver = TestDriver::builder("a")
		.instance_proc("vkOneEXT", proc_addr(0))
		.instance_proc("vkTwoEXT", proc_addr(1))
		.instance_proc("vkThreeEXT", proc_addr(2))
		.build();
	let instance = with_capacity(&[driver], 2);

	let one = instance.resolve_device_extension("vkOneEXT").unwrap().unwrap();
	let two = instance.resolve_device_extension("vkTwoEXT").unwrap().unwrap();
	let err = instance.resolve_device_extension("vkThreeEXT").err();

	assert_eq!(
		err,
		Some(LoaderError::TableExhausted {
			table: TableKind::Device,
			capacity: 2
		})
	);
	let names: Vec<_> = instance.device_extension_names().into_iter().map(|(_, name)| name).collect();
	assert_eq!(names.len(), 2);
	assert!(!names.contains(&"vkThreeEXT".to_owned()));
	assert_eq!(instance.resolve_device_extension("vkOneEXT").unwrap(), Some(one));
	assert_eq!(instance.resolve_device_extension("vkTwoEXT").unwrap(), Some(two));
}

#[test]
fn colliding_names_resolve_through_the_overflow_list() {
	let mut table = ResolutionTable::new(TableKind::Device, 8, &AllocationCallbacks::system()).unwrap();
	let (first, second) = colliding_pair(&table);

	let first_slot = table.insert(&first).unwrap();
	let second_slot = table.insert(&second).unwrap();

	assert_eq!(first_slot as usize, table.primary_slot(&first));
	assert_ne!(second_slot, first_slot);
	assert_eq!(table.lookup(&first), Some(first_slot));
	assert_eq!(table.lookup(&second), Some(second_slot));
	assert_eq!(table.claimed(), 2);
}

#[test]
fn probing_wraps_around_the_end() {
	let mut table = ResolutionTable::new(TableKind::PhysicalDevice, 3, &AllocationCallbacks::system()).unwrap();
	let names = ["vkAlpha", "vkBeta", "vkGamma"];
	let slots: Vec<_> = names.iter().map(|name| table.insert(name).unwrap()).collect();

	let distinct: HashSet<_> = slots.iter().collect();
	assert_eq!(distinct.len(), 3);
	for (name, slot) in names.iter().zip(&slots) {
		assert_eq!(table.lookup(name), Some(*slot));
	}
	assert_eq!(
		table.insert("vkDelta").err(),
		Some(LoaderError::TableExhausted {
			table: TableKind::PhysicalDevice,
			capacity: 3
		})
	);
	assert_eq!(table.lookup("vkDelta"), None);
}

#[test]
fn name_charges_follow_the_table() {
	let counter = Arc::new(CountingAllocator::new());
	let callbacks = AllocationCallbacks::new(counter.clone());
	let mut table = ResolutionTable::new(TableKind::Device, 4, &callbacks).unwrap();
	table.insert("vkA").unwrap();
	table.insert("vkB").unwrap();
	assert_eq!(counter.outstanding(), 3);
	drop(table);
	assert_eq!(counter.outstanding(), 0);
}

#[test]
fn refused_name_charge_claims_nothing() {
	let counter = Arc::new(CountingAllocator::failing_after(1));
	let mut table = ResolutionTable::new(TableKind::Device, 4, &AllocationCallbacks::new(counter)).unwrap();
	assert_eq!(table.insert("vkA").err(), Some(LoaderError::OutOfHostMemory));
	assert_eq!(table.claimed(), 0);
	assert_eq!(table.lookup("vkA"), None);
}

#[test]
fn unsupported_names_are_charged_once() {
	let counter = Arc::new(CountingAllocator::new());
	let callbacks = AllocationCallbacks::new(counter.clone());
	let mut table = ResolutionTable::new(TableKind::Device, 4, &callbacks).unwrap();
	table.mark_unsupported("vkMissingA").unwrap();
	table.mark_unsupported("vkMissingB").unwrap();
	table.mark_unsupported("vkMissingA").unwrap();
	assert_eq!(counter.outstanding(), 3);
	assert!(table.is_unsupported("vkMissingA"));
	drop(table);
	assert_eq!(counter.outstanding(), 0);
}

#[test]
fn refused_unsupported_charge_records_nothing() {
	let counter = Arc::new(CountingAllocator::failing_after(1));
	let mut table = ResolutionTable::new(TableKind::Device, 4, &AllocationCallbacks::new(counter)).unwrap();
	assert_eq!(table.mark_unsupported("vkMissing").err(), Some(LoaderError::OutOfHostMemory));
	assert!(!table.is_unsupported("vkMissing"));
}

proptest! {
	#[test]
	fn every_inserted_name_is_found_at_its_slot(
		names in prop::collection::hash_set("vk[A-Za-z]{1,10}", 1..24),
		capacity in 1usize..24,
	) {
		let mut table = ResolutionTable::new(TableKind::Device, capacity, &AllocationCallbacks::system()).unwrap();
		let mut inserted = Vec::new();
		for name in &names {
			match table.insert(name) {
				Ok(slot) => inserted.push((name.clone(), slot)),
				Err(err) => {
					prop_assert_eq!(inserted.len(), capacity);
					prop_assert_eq!(err, LoaderError::TableExhausted { table: TableKind::Device, capacity });
				}
			}
		}
		prop_assert_eq!(table.claimed(), inserted.len());
		for (name, slot) in &inserted {
			prop_assert_eq!(table.lookup(name), Some(*slot));
		}
		for name in names.iter().filter(|name| !inserted.iter().any(|(done, _)| done == *name)) {
			prop_assert_eq!(table.lookup(name), None);
		}
	}
}

#[test]
fn existing_and_new_devices_get_the_slot() {
	let test_drivers = vec![
		TestDriver::builder("a").instance_proc(CMD, proc_addr(3)).device_proc(CMD, proc_addr(3)).build(),
		TestDriver::builder("b").build(),
	];
	let instance = instance(&test_drivers, &[]);
	let physical = instance.enumerate_physical_devices().unwrap();
	let early = instance.create_device(physical[0], &DeviceCreateInfo::default(), None).unwrap();
	let other = instance.create_device(physical[1], &DeviceCreateInfo::default(), None).unwrap();

	let function = instance.resolve_device_extension(CMD).unwrap().unwrap();
	let late = instance.create_device(physical[0], &DeviceCreateInfo::default(), None).unwrap();

	assert_eq!(instance.device_extension_proc(early, function), Some(proc_addr(3)));
	assert_eq!(instance.device_extension_proc(late, function), Some(proc_addr(3)));
	assert_eq!(instance.device_extension_proc(other, function), None);
}

#[test]
fn layer_declared_functions_resolve_through_the_layer() {
	let driver = TestDriver::builder("a").device_proc("vkLayerOnlyEXT", proc_addr(4)).build();
	let layer = TestLayer::builder("l").device_proc("vkLayerOnlyEXT", proc_addr(5)).build();
	let instance = Instance::builder()
		.drivers(drivers(&[driver.clone()]))
		.layers(layers(&[layer.clone()]))
		.settings(LoaderSettings::default())
		.create(&InstanceCreateInfo::new())
		.unwrap();
	let physical = instance.enumerate_physical_devices().unwrap();
	let device = instance.create_device(physical[0], &DeviceCreateInfo::default(), None).unwrap();

	let function = instance.resolve_device_extension("vkLayerOnlyEXT").unwrap().unwrap();

	assert_eq!(instance.device_extension_proc(device, function), Some(proc_addr(5)));
	assert_eq!(driver.queries(CallKind::DeviceProcQuery, "vkLayerOnlyEXT"), 0);
}

const PHYS: &str = "vkGetPhysicalDeviceThingEXT";

#[test]
fn lone_supporting_driver_is_called_directly() {
	let test_drivers = vec![
		TestDriver::builder("old").interface_version(3).physical_device_proc(PHYS, proc_addr(6)).build(),
		TestDriver::builder("supporting").physical_device_proc(PHYS, proc_addr(7)).build(),
		TestDriver::builder("silent").build(),
	];
	let instance = instance(&test_drivers, &[]);

	let function = instance.resolve_physical_device_extension(PHYS).unwrap().unwrap();

	assert_eq!(
		function.entry(),
		PhysDevExtEntry::Driver {
			driver: DriverId::from_index(1),
			addr: proc_addr(7)
		}
	);
	assert_eq!(
		instance.physical_device_extension_support(&function),
		vec![DriverSupport::BelowInterfaceVersion, DriverSupport::Supported(proc_addr(7)), DriverSupport::Unsupported]
	);
	assert_eq!(test_drivers[0].count(CallKind::PhysicalDeviceProcQuery), 0);
	assert_eq!(test_drivers[2].queries(CallKind::PhysicalDeviceProcQuery, PHYS), 1);
}

#[test]
fn several_supporting_drivers_go_through_the_terminator() {
	let test_drivers = vec![
		TestDriver::builder("a").physical_device_proc(PHYS, proc_addr(8)).build(),
		TestDriver::builder("b").build(),
		TestDriver::builder("c").physical_device_proc(PHYS, proc_addr(9)).build(),
	];
	let instance = instance(&test_drivers, &[]);
	let physical = instance.enumerate_physical_devices().unwrap();

	let function = instance.resolve_physical_device_extension(PHYS).unwrap().unwrap();

	assert_eq!(function.entry(), PhysDevExtEntry::Terminator);
	assert_eq!(instance.physical_device_extension_proc(physical[0], &function), Some(proc_addr(8)));
	assert_eq!(instance.physical_device_extension_proc(physical[1], &function), None);
	assert_eq!(instance.physical_device_extension_proc(physical[2], &function), Some(proc_addr(9)));
	assert_eq!(instance.resolve_physical_device_extension(PHYS).unwrap(), Some(function));
	assert_eq!(instance.physical_device_extension_names(), vec![(function.slot(), PHYS.to_owned())]);
	for driver in &test_drivers {
		assert_eq!(driver.queries(CallKind::PhysicalDeviceProcQuery, PHYS), 1);
	}
}

#[test]
fn intercepting_layer_takes_the_instance_slot() {
	let driver = TestDriver::builder("a").physical_device_proc(PHYS, proc_addr(10)).build();
	let old = TestLayer::builder("old").interface_version(1).physical_device_proc(PHYS, proc_addr(11)).build();
	let new = TestLayer::builder("new").physical_device_proc(PHYS, proc_addr(12)).build();
	let instance = Instance::builder()
		.drivers(drivers(&[driver]))
		.layers(layers(&[old.clone(), new]))
		.settings(LoaderSettings::default())
		.create(&InstanceCreateInfo::new())
		.unwrap();

	let function = instance.resolve_physical_device_extension(PHYS).unwrap().unwrap();

	assert_eq!(function.entry(), PhysDevExtEntry::Layer { layer: 1, addr: proc_addr(12) });
	assert_eq!(old.physical_device_queries(), 0);
}

#[test]
fn drivers_without_the_query_entry_point_are_unsupported() {
	let driver = TestDriver::builder("a")
		.without(strata_abi::EntryPoints::GET_PHYSICAL_DEVICE_PROC_ADDR)
		.physical_device_proc(PHYS, proc_addr(13))
		.build();
	let instance = instance(&[driver.clone()], &[]);

	assert_eq!(instance.resolve_physical_device_extension(PHYS).unwrap(), None);
	assert_eq!(driver.count(CallKind::PhysicalDeviceProcQuery), 0);
	assert_eq!(instance.resolve_physical_device_extension("vkOther").unwrap(), None);
}
