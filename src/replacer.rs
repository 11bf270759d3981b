// SPDX-License-Identifier: Apache-2.0

//! Clock-over-LRU victim selection and eviction.

use crate::consts::KERNBASE;
use crate::error::{PagingError, Result};
use crate::frame::FrameMeta;
use crate::pagetable;
use crate::phys;
use crate::pte::{Pte, PteView};
use crate::subsystem::MemorySubsystem;

/// Sweeps the LRU ring from the Clock hand. A record whose PTE no longer
/// exists, is invalid, or addresses kernel space is skipped defensively
/// (the LRU admission filters in `pagetable`/`fault` are the real
/// guarantee this never happens). A record with its `A` bit set is given
/// a second chance: the bit is cleared and the record moves to the tail.
/// The first record found with `A` clear is the victim; if the hand
/// wraps back to where it started without finding one, that starting
/// record is taken as victim. `None` only for an empty ring.
pub fn select_victim(sys: &MemorySubsystem) -> Option<usize> {
    let mut frames = sys.lock_frames();
    let mut lru = sys.lock_lru();
    if lru.is_empty() {
        return None;
    }
    let start = lru.clock_hand().unwrap();
    let ring_len = lru.len();
    let mut candidate = start;

    for _ in 0..ring_len {
        let meta: FrameMeta = *frames.get(candidate);
        let next = lru.next_of(&frames, candidate).unwrap_or(start);

        let pte_word = meta
            .owner_pt
            .filter(|_| meta.vaddr < KERNBASE)
            .and_then(|root| pagetable::walk(sys, root, meta.vaddr, false).ok())
            .map(|(leaf, slot)| unsafe { phys::frame_as_pagetable(leaf)[slot] });

        match pte_word.map(Pte).filter(|p| p.is_valid()) {
            None => {
                lru.set_clock_hand(Some(next));
                candidate = next;
            }
            Some(pte) if pte.accessed() => {
                let root = meta.owner_pt.unwrap();
                let (leaf, slot) = pagetable::walk(sys, root, meta.vaddr, false)
                    .expect("select_victim: PTE vanished while page+lru were held");
                sys.write_pte(leaf, slot, pte.with_accessed_cleared().0, meta.vaddr);
                lru.move_to_tail(&mut frames, candidate);
                lru.set_clock_hand(Some(next));
                candidate = next;
            }
            Some(_) => {
                lru.set_clock_hand(Some(next));
                return Some(candidate);
            }
        }
    }

    Some(start)
}

/// Chooses a victim and evicts it: writes it to a fresh swap slot,
/// unlinks it from the LRU, rewrites its PTE to the swapped encoding, and
/// returns the frame to the `FrameAllocator`. Aborts (reporting failure,
/// never leaving partial state) if the ring is empty, the victim's PTE
/// raced with a concurrent unmap, or the swap store is full.
pub fn evict_one(sys: &MemorySubsystem) -> Result<()> {
    let victim = select_victim(sys).ok_or(PagingError::OutOfMemory)?;

    let (root, vaddr) = {
        let frames = sys.lock_frames();
        let meta = *frames.get(victim);
        (meta.owner_pt.expect("evicted frame has no owning page table"), meta.vaddr)
    };

    let (leaf, slot_in_leaf) = pagetable::walk(sys, root, vaddr, false).map_err(|_| PagingError::OutOfMemory)?;
    let word = unsafe { phys::frame_as_pagetable(leaf)[slot_in_leaf] };
    let pte = Pte(word);
    let perm = match pte.decode() {
        PteView::Resident { perm, .. } => perm,
        // A concurrent unmap raced us between selection and eviction.
        _ => return Err(PagingError::OutOfMemory),
    };

    let swap_slot = sys.swap_alloc_slot()?;
    sys.swap_write(victim, swap_slot);

    sys.lru_remove_if_present(victim);

    sys.write_pte(leaf, slot_in_leaf, Pte::swapped(swap_slot, perm).0, vaddr);

    sys.clear_and_release_frame(victim);
    sys.record_eviction();

    crate::trace_evict!("evict: frame {} -> slot {} (va {:#x})", victim, swap_slot, vaddr);
    Ok(())
}
