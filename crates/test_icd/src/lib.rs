//! Simulated drivers, layers, and allocators.
//!
//! Every simulated component records the calls it receives so tests can
//! assert on exactly which entry points the loader reached, in which order,
//! and with which handles.

mod alloc;
mod driver;
mod layer;
mod procs;

pub use alloc::CountingAllocator;
pub use driver::{Call, CallKind, TestDriver, TestDriverBuilder};
pub use layer::{TestLayer, TestLayerBuilder};
pub use procs::{POOL_SIZE, proc_addr, proc_hits};
