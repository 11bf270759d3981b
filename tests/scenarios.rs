// SPDX-License-Identifier: Apache-2.0

//! Integration tests mirroring the userspace stress programs this crate's
//! eviction policy was checked against: writing far more pages than there
//! are physical frames, reading them back after forced swapping, and
//! confirming a fork-style copy never lets one address space's writes leak
//! into another's.

use paging_core::consts::{NFRAMES, PGSIZE};
use paging_core::sim::SimDisk;
use paging_core::{MemorySubsystem, Perm, Pid, SimpleProcess};

fn new_subsystem() -> MemorySubsystem {
    MemorySubsystem::new(Box::new(SimDisk::new()))
}

/// `swaploop`: allocate more pages than physical frames, write a per-page
/// tag into each, force every one of them out to swap, then read every tag
/// back and confirm it survived the round trip.
#[test]
fn swaploop_round_trips_every_page_through_swap() {
    let sys = new_subsystem();
    let pt = sys.pt_new().unwrap();
    // Comfortably under both NFRAMES and the swap capacity, so the whole
    // working set can sit in swap at once without any implicit eviction
    // racing the explicit one below.
    let num_pages = 256;

    for i in 0..num_pages {
        let frame = sys.alloc_frame().unwrap();
        sys.pt_map(&pt, i * PGSIZE, PGSIZE, frame, Perm::R | Perm::W | Perm::U).unwrap();
        sys.copy_out(&pt, i * PGSIZE, &[(i % 256) as u8]).unwrap();
    }
    assert_eq!(sys.num_lru_pages(), num_pages);

    // Force every mapped page out to swap; allocation pressure alone would
    // only evict as many as are needed, so drive it explicitly to exercise
    // the full round trip rather than leaving some pages untouched.
    while sys.num_lru_pages() > 0 {
        assert!(sys.evict_one().is_ok());
    }

    let mut proc = SimpleProcess::new(Pid(1), pt.root);
    for i in 0..num_pages {
        sys.fault_handle(&mut proc, i * PGSIZE);
        assert!(!proc.is_killed(), "page {} should have faulted back in cleanly", i);
        let mut out = [0u8; 1];
        sys.copy_in(&pt, i * PGSIZE, &mut out).unwrap();
        assert_eq!(out[0], (i % 256) as u8, "page {} lost its tag across swap", i);
    }
}

/// `swapstress`: allocate a working set well beyond physical memory,
/// writing a distinct byte into every page, then confirm every page's
/// contents are intact after the allocator has been forced to cycle pages
/// through swap to satisfy later allocations.
#[test]
fn swapstress_preserves_data_under_allocation_pressure() {
    let sys = new_subsystem();
    let pt = sys.pt_new().unwrap();
    // Enough pages to exhaust the free-list and force `frame_alloc` to
    // couple into the Replacer on its own, but few enough evictions that
    // the swap area (sized independently of physical memory) never fills.
    let num_pages = NFRAMES + 64;

    for i in 0..num_pages {
        let frame = sys.alloc_frame().unwrap();
        sys.pt_map(&pt, i * PGSIZE, PGSIZE, frame, Perm::R | Perm::W | Perm::U).unwrap();
        sys.copy_out(&pt, i * PGSIZE, &[(i % 256) as u8]).unwrap();
    }

    let mut proc = SimpleProcess::new(Pid(1), pt.root);
    for i in 0..num_pages {
        sys.fault_handle(&mut proc, i * PGSIZE);
        let mut out = [0u8; 1];
        sys.copy_in(&pt, i * PGSIZE, &mut out).unwrap();
        assert_eq!(out[0], (i % 256) as u8);
    }
    assert!(!proc.is_killed());
}

/// `forkmmap`: a child's page table is a `copy_space` of the parent's.
/// Writes through the child's mapping must never be visible through the
/// parent's: they are backed by distinct frames, not shared ones.
#[test]
fn copy_space_isolates_writes_between_copies() {
    let sys = new_subsystem();
    let parent = sys.pt_new().unwrap();
    let num_pages = 4;

    for i in 0..num_pages {
        let frame = sys.alloc_frame().unwrap();
        sys.pt_map(&parent, i * PGSIZE, PGSIZE, frame, Perm::R | Perm::W | Perm::U).unwrap();
        sys.copy_out(&parent, i * PGSIZE, &[i as u8]).unwrap();
    }

    let child = sys.pt_new().unwrap();
    sys.pt_copy_space(&parent, &child, num_pages * PGSIZE).unwrap();

    for i in 0..num_pages {
        sys.copy_out(&child, i * PGSIZE, &[(i + 100) as u8]).unwrap();
    }

    for i in 0..num_pages {
        let mut out = [0u8; 1];
        sys.copy_in(&parent, i * PGSIZE, &mut out).unwrap();
        assert_eq!(out[0], i as u8, "parent page {} corrupted by child's write", i);
        sys.copy_in(&child, i * PGSIZE, &mut out).unwrap();
        assert_eq!(out[0], (i + 100) as u8);
    }
}
