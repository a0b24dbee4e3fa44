use std::sync::atomic::{AtomicUsize, Ordering};

use strata_abi::{ProcAddr, VoidFunction};

/// Number of distinct addresses in the pool.
pub const POOL_SIZE: usize = 16;

static HITS: [AtomicUsize; POOL_SIZE] = [const { AtomicUsize::new(0) }; POOL_SIZE];

macro_rules! proc_pool {
	($($name:ident = $idx:literal),* $(,)?) => {
		$(
			unsafe extern "C" fn $name() {
				HITS[$idx].fetch_add(1, Ordering::Relaxed);
			}
		)*

		static POOL: [VoidFunction; POOL_SIZE] = [$($name),*];
	};
}

proc_pool! {
	proc_0 = 0,
	proc_1 = 1,
	proc_2 = 2,
	proc_3 = 3,
	proc_4 = 4,
	proc_5 = 5,
	proc_6 = 6,
	proc_7 = 7,
	proc_8 = 8,
	proc_9 = 9,
	proc_10 = 10,
	proc_11 = 11,
	proc_12 = 12,
	proc_13 = 13,
	proc_14 = 14,
	proc_15 = 15,
}

/// Returns the `index`-th distinct callable address.
///
/// # Panics
///
/// Panics if `index >= POOL_SIZE`.
pub fn proc_addr(index: usize) -> ProcAddr {
	ProcAddr::new(POOL[index])
}

/// How many times the `index`-th address has been invoked.
pub fn proc_hits(index: usize) -> usize {
	HITS[index].load(Ordering::Relaxed)
}
