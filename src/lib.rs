// SPDX-License-Identifier: Apache-2.0

//! Demand-paging core: a three-level Sv39 page table with transparent
//! swap-out/swap-in, Clock-over-LRU eviction, and the allocator/LRU/swap
//! bookkeeping underneath it.
//!
//! [`MemorySubsystem`] is the single entry point a host kernel constructs
//! at boot (supplying its own [`swapstore::BlockDevice`]) and then shares
//! by reference across harts. Everything else in this crate is reached
//! through it.

#![cfg_attr(baremetal, no_std)]

#[cfg(baremetal)]
extern crate alloc;

pub mod consts;
pub mod error;
mod falloc;
mod fault;
mod frame;
mod lru;
mod macros;
mod pagetable;
mod phys;
pub mod process;
mod pte;
mod replacer;
#[cfg(any(test, not(baremetal)))]
pub mod sim;
pub mod swapstore;
mod subsystem;

pub use error::{PagingError, Result};
pub use pagetable::PageTable;
pub use process::{CurrentProcess, Pid, SimpleProcess};
pub use pte::{Perm, PteFlags};
pub use subsystem::MemorySubsystem;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::{KERNBASE, PGSIZE};
    use crate::sim::SimDisk;

    fn new_subsystem() -> MemorySubsystem {
        MemorySubsystem::new(Box::new(SimDisk::new()))
    }

    #[test]
    fn map_then_walk_round_trips() {
        let sys = new_subsystem();
        let pt = sys.pt_new().unwrap();
        let frame = sys.alloc_frame().unwrap();
        sys.pt_map(&pt, 0x1000, PGSIZE, frame, Perm::R | Perm::W | Perm::U).unwrap();
        assert_eq!(sys.pt_walkaddr(&pt, 0x1000).unwrap(), frame);
        assert_eq!(sys.num_lru_pages(), 1);
    }

    #[test]
    fn evict_then_fault_restores_contents() {
        let sys = new_subsystem();
        let pt = sys.pt_new().unwrap();
        let frame = sys.alloc_frame().unwrap();
        sys.pt_map(&pt, 0x1000, PGSIZE, frame, Perm::R | Perm::W | Perm::U).unwrap();
        sys.copy_out(&pt, 0x1000, &[0xAB; 8]).unwrap();

        sys.evict_one().unwrap();
        assert_eq!(sys.num_lru_pages(), 0);
        assert_eq!(sys.free_swap_slots(), crate::consts::MAX_SWAP_PAGES - 1);

        let mut proc = SimpleProcess::new(Pid(1), pt.root);
        sys.fault_handle(&mut proc, 0x1000);
        assert!(!proc.is_killed());

        let mut out = [0u8; 8];
        sys.copy_in(&pt, 0x1000, &mut out).unwrap();
        assert_eq!(out, [0xAB; 8]);
        assert_eq!(sys.num_lru_pages(), 1);
        assert_eq!(sys.swap_in_count(), 1);
    }

    #[test]
    fn fault_on_unmapped_address_kills_process() {
        let sys = new_subsystem();
        let pt = sys.pt_new().unwrap();
        let mut proc = SimpleProcess::new(Pid(2), pt.root);
        sys.fault_handle(&mut proc, 0x2000);
        assert!(proc.is_killed());
    }

    #[test]
    fn copy_space_duplicates_resident_and_swapped_pages() {
        let sys = new_subsystem();
        let src = sys.pt_new().unwrap();
        let dst = sys.pt_new().unwrap();

        let f0 = sys.alloc_frame().unwrap();
        sys.pt_map(&src, 0, PGSIZE, f0, Perm::R | Perm::W | Perm::U).unwrap();
        sys.copy_out(&src, 0, &[1u8; 4]).unwrap();

        let f1 = sys.alloc_frame().unwrap();
        sys.pt_map(&src, PGSIZE, PGSIZE, f1, Perm::R | Perm::W | Perm::U).unwrap();
        sys.copy_out(&src, PGSIZE, &[2u8; 4]).unwrap();
        sys.evict_one().unwrap();

        sys.pt_copy_space(&src, &dst, 2 * PGSIZE).unwrap();

        let mut out = [0u8; 4];
        sys.copy_in(&dst, 0, &mut out).unwrap();
        assert_eq!(out, [1u8; 4]);
        sys.copy_in(&dst, PGSIZE, &mut out).unwrap();
        assert_eq!(out, [2u8; 4]);
    }

    #[test]
    fn unmap_of_swapped_page_frees_slot_without_touching_lru() {
        let sys = new_subsystem();
        let pt = sys.pt_new().unwrap();
        let frame = sys.alloc_frame().unwrap();
        sys.pt_map(&pt, KERNBASE - PGSIZE, PGSIZE, frame, Perm::R | Perm::U).unwrap();
        sys.evict_one().unwrap();

        let before = sys.free_swap_slots();
        sys.pt_unmap(&pt, KERNBASE - PGSIZE, 1, true);
        assert_eq!(sys.free_swap_slots(), before + 1);
    }

    #[test]
    fn repeated_eviction_picks_distinct_victims_round_robin() {
        let sys = new_subsystem();
        let pt = sys.pt_new().unwrap();
        for i in 0..4 {
            let frame = sys.alloc_frame().unwrap();
            sys.pt_map(&pt, i * PGSIZE, PGSIZE, frame, Perm::R | Perm::U).unwrap();
        }
        assert_eq!(sys.num_lru_pages(), 4);
        for _ in 0..4 {
            sys.evict_one().unwrap();
        }
        assert_eq!(sys.num_lru_pages(), 0);
        assert_eq!(sys.free_swap_slots(), crate::consts::MAX_SWAP_PAGES - 4);
    }
}
