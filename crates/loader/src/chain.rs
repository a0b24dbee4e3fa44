//! The active layer chain.
//!
//! The static part of each call chain is wired outside the loader core. What
//! the core needs from the chain is the ability to ask the active layers,
//! in order, whether they implement a given entry point.

use std::sync::Arc;

use strata_abi::{LAYER_PHYSICAL_DEVICE_PROC_VERSION, Layer, NativeHandle, ProcAddr};

use crate::driver::DriverTerminator;

/// Active layers in application enable order.
#[derive(Default)]
pub struct LayerChain {
	layers: Vec<Arc<dyn Layer>>,
}

impl LayerChain {
	pub fn new(layers: Vec<Arc<dyn Layer>>) -> Self {
		Self { layers }
	}

	pub fn len(&self) -> usize {
		self.layers.len()
	}

	pub fn is_empty(&self) -> bool {
		self.layers.is_empty()
	}

	pub fn iter(&self) -> impl Iterator<Item = &dyn Layer> {
		self.layers.iter().map(|layer| &**layer)
	}

	/// Whether any layer implements instance extension `name`.
	pub fn provides_instance_extension(&self, name: &str) -> bool {
		self.iter().any(|layer| layer.instance_extensions().iter().any(|ext| ext == name))
	}

	/// Whether any layer manifest declares device entry point `name`.
	///
	/// Every layer is consulted exactly once.
	pub(crate) fn declares_device_entry_point(&self, name: &str) -> bool {
		self.iter()
			.filter(|layer| layer.device_extension_entry_points().iter().any(|entry| entry == name))
			.count() > 0
	}

	/// The first layer intercepting physical-device entry point `name`.
	///
	/// Every layer new enough to answer is consulted exactly once.
	pub(crate) fn physical_device_interceptor(&self, name: &str) -> Option<(usize, ProcAddr)> {
		self.iter()
			.enumerate()
			.filter(|(_, layer)| layer.interface_version() >= LAYER_PHYSICAL_DEVICE_PROC_VERSION)
			.filter_map(|(index, layer)| layer.get_physical_device_proc_addr(name).map(|addr| (index, addr)))
			.fold(None, |first, found| first.or(Some(found)))
	}

	/// Resolves device entry point `name` through the chain: the first layer
	/// answering wins, otherwise the device's driver answers.
	pub(crate) fn device_proc_addr(&self, driver: &DriverTerminator, device: NativeHandle, name: &str) -> Option<ProcAddr> {
		self.iter()
			.find_map(|layer| layer.get_device_proc_addr(device, name))
			.or_else(|| driver.driver().get_device_proc_addr(device, name))
	}
}

#[cfg(test)]
mod tests {
	use strata_test_icd::{TestLayer, proc_addr};

	use super::*;

	fn chain(layers: &[&Arc<TestLayer>]) -> LayerChain {
		LayerChain::new(layers.iter().map(|layer| Arc::clone(layer) as Arc<dyn Layer>).collect())
	}

	#[test]
	fn manifest_query_visits_every_layer_once() {
		let first = TestLayer::builder("first").device_proc("vkCmdThingEXT", proc_addr(0)).build();
		let second = TestLayer::builder("second").build();
		let chain = chain(&[&first, &second]);

		assert!(chain.declares_device_entry_point("vkCmdThingEXT"));
		assert_eq!(first.manifest_queries(), 1);
		assert_eq!(second.manifest_queries(), 1);
	}

	#[test]
	fn first_intercepting_layer_wins() {
		let old = TestLayer::builder("old").interface_version(1).physical_device_proc("vkThing", proc_addr(1)).build();
		let a = TestLayer::builder("a").physical_device_proc("vkThing", proc_addr(2)).build();
		let b = TestLayer::builder("b").physical_device_proc("vkThing", proc_addr(3)).build();
		let chain = chain(&[&old, &a, &b]);

		assert_eq!(chain.physical_device_interceptor("vkThing"), Some((1, proc_addr(2))));
		assert_eq!(old.physical_device_queries(), 0);
		assert_eq!(a.physical_device_queries(), 1);
		assert_eq!(b.physical_device_queries(), 1);
	}

	#[test]
	fn instance_extensions_come_from_any_layer() {
		let layer = TestLayer::builder("validation").instance_extension("VK_EXT_validation_features").build();
		let chain = chain(&[&layer]);
		assert!(chain.provides_instance_extension("VK_EXT_validation_features"));
		assert!(!chain.provides_instance_extension("VK_KHR_surface"));
	}
}
