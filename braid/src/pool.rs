// SPDX-License-Identifier: Apache-2.0

//! The segment pool: one bucket per hashed thread slot, each holding a stack
//! of idle segments. Contention is never waited out. A `take` that finds its
//! bucket locked allocates a fresh segment; a `recycle` that finds it locked
//! drops the segment instead. Worst case is an extra allocation, never a
//! blocked thread. The thread that recycled a segment is the likeliest to
//! claim it back, so buckets are keyed by thread.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use tracing::trace;
use crate::segment::{Segment, SIZE};

/// Aggregate byte cap kept idle per bucket.
const MAX_BUCKET_SIZE: usize = 256 * SIZE;
const MAX_BUCKET_SEGMENTS: usize = MAX_BUCKET_SIZE / SIZE;

static POOL: Lazy<Pool> = Lazy::new(Pool::new);

static NEXT_THREAD_SLOT: AtomicUsize = AtomicUsize::new(0);

thread_local! {
	static THREAD_SLOT: usize = NEXT_THREAD_SLOT.fetch_add(1, Ordering::Relaxed);
}

/// Claims a segment from the current thread's bucket of the process pool.
pub fn take() -> Segment { POOL.take() }

/// Returns a segment to the current thread's bucket of the process pool.
/// Shared segments are dropped; their blocks are still aliased elsewhere.
pub fn recycle(segment: Segment) { POOL.recycle(segment) }

struct Bucket {
	shelf: Mutex<Vec<Segment>>,
}

struct Pool {
	buckets: Box<[Bucket]>,
	mask: usize,
}

impl Pool {
	fn new() -> Self {
		let cpus = thread::available_parallelism().map_or(1, |n| n.get());
		let count = (cpus * 2).next_power_of_two();
		let buckets = (0..count)
			.map(|_| Bucket { shelf: Mutex::new(Vec::new()) })
			.collect();
		Self { buckets, mask: count - 1 }
	}

	fn bucket(&self) -> &Bucket {
		let slot = THREAD_SLOT.with(|slot| *slot);
		&self.buckets[slot & self.mask]
	}

	fn take(&self) -> Segment {
		let Some(mut shelf) = self.bucket().shelf.try_lock() else {
			trace!("pool bucket contended, allocating fresh segment");
			return Segment::new();
		};
		shelf.pop().unwrap_or_else(Segment::new)
	}

	fn recycle(&self, mut segment: Segment) {
		if !segment.is_owner() {
			return;
		}
		let Some(mut shelf) = self.bucket().shelf.try_lock() else {
			trace!("pool bucket contended, dropping segment");
			return;
		};
		if shelf.len() >= MAX_BUCKET_SEGMENTS {
			return;
		}
		segment.reset();
		shelf.push(segment);
	}
}
