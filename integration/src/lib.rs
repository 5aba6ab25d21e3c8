//! Allocation-tracking harness for supervisor lifecycle tests.
//!
//! `TrackingAllocator` forwards to the system allocator and counts, per
//! thread, every block handed out and returned. A test binary installs it with
//! `#[global_allocator]` and compares `snapshot()`s around the code under test.
//! Counters are thread-local so concurrently running tests do not see each
//! other's traffic.

use std::alloc::{GlobalAlloc, Layout, System};
use std::cell::Cell;

thread_local! {
    static ALLOCS: Cell<usize> = const { Cell::new(0) };
    static FREES: Cell<usize> = const { Cell::new(0) };
    static LIVE_BYTES: Cell<isize> = const { Cell::new(0) };
}

pub struct TrackingAllocator;

/// Counters for the current thread
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AllocSnapshot {
    pub allocs: usize,
    pub frees: usize,
    pub live_bytes: isize,
}

impl AllocSnapshot {
    /// Blocks still held that were allocated after `earlier`
    pub fn outstanding_since(&self, earlier: &AllocSnapshot) -> isize {
        (self.allocs - earlier.allocs) as isize - (self.frees - earlier.frees) as isize
    }
}

pub fn snapshot() -> AllocSnapshot {
    AllocSnapshot {
        allocs: ALLOCS.try_with(Cell::get).unwrap_or(0),
        frees: FREES.try_with(Cell::get).unwrap_or(0),
        live_bytes: LIVE_BYTES.try_with(Cell::get).unwrap_or(0),
    }
}

fn on_alloc(size: usize) {
    let _ = ALLOCS.try_with(|c| c.set(c.get() + 1));
    let _ = LIVE_BYTES.try_with(|c| c.set(c.get() + size as isize));
}

fn on_free(size: usize) {
    let _ = FREES.try_with(|c| c.set(c.get() + 1));
    let _ = LIVE_BYTES.try_with(|c| c.set(c.get() - size as isize));
}

unsafe impl GlobalAlloc for TrackingAllocator {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let ptr = System.alloc(layout);
        if !ptr.is_null() {
            on_alloc(layout.size());
        }
        ptr
    }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        let ptr = System.alloc_zeroed(layout);
        if !ptr.is_null() {
            on_alloc(layout.size());
        }
        ptr
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        System.dealloc(ptr, layout);
        on_free(layout.size());
    }

    // A resized block is still one block
    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        let new_ptr = System.realloc(ptr, layout, new_size);
        if !new_ptr.is_null() {
            let delta = new_size as isize - layout.size() as isize;
            let _ = LIVE_BYTES.try_with(|c| c.set(c.get() + delta));
        }
        new_ptr
    }
}
