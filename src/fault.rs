// SPDX-License-Identifier: Apache-2.0

//! The page-fault entry point: reloads a swapped page and retries.

use crate::consts::{MAXVA, PGSIZE};
use crate::error::{PagingError, Result};
use crate::pagetable;
use crate::phys;
use crate::process::CurrentProcess;
use crate::pte::{Pte, PteView};
use crate::subsystem::MemorySubsystem;

/// Shared swap-in body (steps 2-5 of `fault_handle`): allocates a frame
/// (coupled through the Replacer exactly like any other allocation),
/// reads the slot's contents into it, frees the slot, rewrites the PTE to
/// resident, and re-admits the frame to the LRU. Used both by the trap
/// path and by `pagetable::walkaddr`/`copy_in`/`copy_out` when a kernel
/// copy touches a swapped page.
pub(crate) fn swap_in_at(
    sys: &MemorySubsystem,
    root: usize,
    leaf_frame: usize,
    slot_in_leaf: usize,
    va: usize,
) -> Result<usize> {
    let word = unsafe { phys::frame_as_pagetable(leaf_frame)[slot_in_leaf] };
    let (slot, perm) = match Pte(word).decode() {
        PteView::Swapped { slot, perm } => (slot, perm),
        _ => return Err(PagingError::NotMapped),
    };

    let frame = sys.frame_alloc()?;
    sys.swap_read_into(frame, slot);
    sys.swap_free_slot(slot);

    sys.write_pte(leaf_frame, slot_in_leaf, Pte::resident(frame, perm).0, va);

    if va < MAXVA {
        sys.lru_insert(frame, root, va);
    }
    sys.record_swap_in();
    crate::trace_fault!("swap-in: slot {} -> frame {} (va {:#x})", slot, frame, va);
    Ok(frame)
}

/// Supervisor page-fault entry point (`scause ∈ {13, 15}`, faulting
/// address in `stval`). Reloads a swapped page so the caller can restart
/// the faulting instruction; kills the process on a genuine fault (PTE
/// missing or not swapped) or on an unrecoverable swap-in failure.
pub fn fault_handle(sys: &MemorySubsystem, proc: &mut dyn CurrentProcess, fault_va: usize) {
    let root = proc.pagetable_root();
    let page_base = fault_va & !(PGSIZE - 1);

    let (leaf, slot) = match pagetable::walk(sys, root, page_base, false) {
        Ok(w) => w,
        Err(_) => {
            proc.kill();
            return;
        }
    };
    let word = unsafe { phys::frame_as_pagetable(leaf)[slot] };
    if !matches!(Pte(word).decode(), PteView::Swapped { .. }) {
        proc.kill();
        return;
    }

    if swap_in_at(sys, root, leaf, slot, page_base).is_err() {
        proc.kill();
    }
}
