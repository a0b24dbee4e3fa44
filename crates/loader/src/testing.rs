//! Shared fixtures for unit tests.

use std::sync::Arc;

use strata_abi::{AllocationCallbacks, Driver, Layer};
use strata_test_icd::{TestDriver, TestLayer};

use crate::driver::DriverArena;
use crate::instance::{Instance, InstanceCreateInfo};
use crate::log::LoaderLogFlags;
use crate::settings::LoaderSettings;

pub(crate) fn no_log(_: LoaderLogFlags, _: &str) {}

pub(crate) fn drivers(drivers: &[Arc<TestDriver>]) -> Vec<Arc<dyn Driver>> {
	drivers.iter().map(|driver| Arc::clone(driver) as Arc<dyn Driver>).collect()
}

pub(crate) fn layers(layers: &[Arc<TestLayer>]) -> Vec<Arc<dyn Layer>> {
	layers.iter().map(|layer| Arc::clone(layer) as Arc<dyn Layer>).collect()
}

/// Arena over `drivers`, all of which must accept the instance.
pub(crate) fn arena(test_drivers: &[Arc<TestDriver>]) -> DriverArena {
	DriverArena::create(drivers(test_drivers), None, &[], &AllocationCallbacks::system(), &no_log).unwrap()
}

/// `count` default drivers named `icd0`, `icd1`, ...
pub(crate) fn plain_drivers(count: usize) -> Vec<Arc<TestDriver>> {
	(0..count).map(|index| TestDriver::builder(format!("icd{index}")).build()).collect()
}

/// Instance over `test_drivers` with `extensions` enabled and default
/// settings, independent of the environment.
pub(crate) fn instance(test_drivers: &[Arc<TestDriver>], extensions: &[&str]) -> Instance {
	Instance::builder()
		.drivers(drivers(test_drivers))
		.settings(LoaderSettings::default())
		.create(&InstanceCreateInfo::new().with_extensions(extensions.iter().copied()))
		.unwrap()
}
