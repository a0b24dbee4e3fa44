use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use rustc_hash::FxHashMap;
use strata_abi::{Layer, NativeHandle, ProcAddr};

/// A layer with canned proc-address answers and query counters.
pub struct TestLayer {
	name: String,
	interface_version: u32,
	instance_extensions: Vec<String>,
	device_entry_points: Vec<String>,
	physical_device_procs: FxHashMap<String, ProcAddr>,
	device_procs: FxHashMap<String, ProcAddr>,
	manifest_queries: AtomicUsize,
	physical_device_queries: AtomicUsize,
	device_queries: AtomicUsize,
}

impl TestLayer {
	pub fn builder(name: impl Into<String>) -> TestLayerBuilder {
		TestLayerBuilder {
			name: name.into(),
			interface_version: 2,
			instance_extensions: Vec::new(),
			device_entry_points: Vec::new(),
			physical_device_procs: FxHashMap::default(),
			device_procs: FxHashMap::default(),
		}
	}

	/// Times the manifest's device entry point list was read.
	pub fn manifest_queries(&self) -> usize {
		self.manifest_queries.load(Ordering::SeqCst)
	}

	pub fn physical_device_queries(&self) -> usize {
		self.physical_device_queries.load(Ordering::SeqCst)
	}

	pub fn device_queries(&self) -> usize {
		self.device_queries.load(Ordering::SeqCst)
	}
}

impl Layer for TestLayer {
	fn name(&self) -> &str {
		&self.name
	}

	fn interface_version(&self) -> u32 {
		self.interface_version
	}

	fn instance_extensions(&self) -> &[String] {
		&self.instance_extensions
	}

	fn device_extension_entry_points(&self) -> &[String] {
		self.manifest_queries.fetch_add(1, Ordering::SeqCst);
		&self.device_entry_points
	}

	fn get_physical_device_proc_addr(&self, name: &str) -> Option<ProcAddr> {
		self.physical_device_queries.fetch_add(1, Ordering::SeqCst);
		self.physical_device_procs.get(name).copied()
	}

	fn get_device_proc_addr(&self, _device: NativeHandle, name: &str) -> Option<ProcAddr> {
		self.device_queries.fetch_add(1, Ordering::SeqCst);
		self.device_procs.get(name).copied()
	}
}

pub struct TestLayerBuilder {
	name: String,
	interface_version: u32,
	instance_extensions: Vec<String>,
	device_entry_points: Vec<String>,
	physical_device_procs: FxHashMap<String, ProcAddr>,
	device_procs: FxHashMap<String, ProcAddr>,
}

impl TestLayerBuilder {
	pub fn interface_version(mut self, version: u32) -> Self {
		self.interface_version = version;
		self
	}

	pub fn instance_extension(mut self, name: &str) -> Self {
		self.instance_extensions.push(name.to_owned());
		self
	}

	/// Declares a device entry point in the manifest and answers queries for
	/// it with `addr`.
	pub fn device_proc(mut self, name: &str, addr: ProcAddr) -> Self {
		self.device_entry_points.push(name.to_owned());
		self.device_procs.insert(name.to_owned(), addr);
		self
	}

	pub fn physical_device_proc(mut self, name: &str, addr: ProcAddr) -> Self {
		self.physical_device_procs.insert(name.to_owned(), addr);
		self
	}

	pub fn build(self) -> Arc<TestLayer> {
		Arc::new(TestLayer {
			name: self.name,
			interface_version: self.interface_version,
			instance_extensions: self.instance_extensions,
			device_entry_points: self.device_entry_points,
			physical_device_procs: self.physical_device_procs,
			device_procs: self.device_procs,
			manifest_queries: AtomicUsize::new(0),
			physical_device_queries: AtomicUsize::new(0),
			device_queries: AtomicUsize::new(0),
		})
	}
}
