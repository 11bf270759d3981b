// SPDX-License-Identifier: Apache-2.0

//! Physical frame access, split by target: one implementation casts
//! physical addresses to raw pointers, the other is backed by a plain
//! buffer so the exact same `PageTable`/`Replacer`/`FaultHandler` code
//! runs under `cargo test` without a RISC-V target.

use crate::consts::{KERNEL_END, NFRAMES, PGSIZE};

/// Translates a frame index into its physical base address.
pub fn frame_idx_to_pa(idx: usize) -> usize {
    KERNEL_END + idx * PGSIZE
}

/// Translates a physical address into a frame index.
///
/// Panics on misaligned or out-of-range addresses: this is an invariant
/// violation, not a recoverable error.
pub fn pa_to_frame_idx(pa: usize) -> usize {
    assert!(pa >= KERNEL_END, "physical address below allocator range");
    let off = pa - KERNEL_END;
    assert!(off % PGSIZE == 0, "misaligned physical address");
    let idx = off / PGSIZE;
    assert!(idx < NFRAMES, "physical address above allocator range");
    idx
}

/// Borrows frame `idx` as a flat byte page.
///
/// # Safety
/// The caller must ensure no other live reference to the same frame exists.
/// Frame ownership is tracked by `FrameTable`/`FrameAllocator`, not by the
/// borrow checker, so this discipline is on the caller, not the compiler.
pub unsafe fn frame_bytes_mut(idx: usize) -> &'static mut [u8; PGSIZE] {
    assert!(idx < NFRAMES, "frame index out of range");
    imp::frame_bytes_mut(idx)
}

/// Borrows frame `idx` as a flat byte page, shared.
///
/// # Safety
/// Same discipline as [`frame_bytes_mut`].
pub unsafe fn frame_bytes(idx: usize) -> &'static [u8; PGSIZE] {
    assert!(idx < NFRAMES, "frame index out of range");
    imp::frame_bytes(idx)
}

/// Borrows frame `idx` as 512 64-bit page-table entries. Used for both
/// interior and leaf page-table levels, which share one on-disk layout.
///
/// # Safety
/// Same discipline as [`frame_bytes_mut`]; additionally the frame must
/// actually be a page-table page (`FrameMeta::is_page_table`).
pub unsafe fn frame_as_pagetable_mut(idx: usize) -> &'static mut [u64; 512] {
    &mut *(frame_bytes_mut(idx) as *mut [u8; PGSIZE] as *mut [u64; 512])
}

/// Shared counterpart of [`frame_as_pagetable_mut`].
///
/// # Safety
/// Same discipline as [`frame_as_pagetable_mut`].
pub unsafe fn frame_as_pagetable(idx: usize) -> &'static [u64; 512] {
    &*(frame_bytes(idx) as *const [u8; PGSIZE] as *const [u64; 512])
}

#[cfg(baremetal)]
mod imp {
    use super::*;

    pub unsafe fn frame_bytes_mut(idx: usize) -> &'static mut [u8; PGSIZE] {
        &mut *(frame_idx_to_pa(idx) as *mut [u8; PGSIZE])
    }

    pub unsafe fn frame_bytes(idx: usize) -> &'static [u8; PGSIZE] {
        &*(frame_idx_to_pa(idx) as *const [u8; PGSIZE])
    }
}

#[cfg(not(baremetal))]
mod imp {
    use super::*;
    use spin::Once;

    struct SimRam(Box<[[u8; PGSIZE]]>);
    // The whole point of this backend is to let multiple harts (or, in the
    // hosted case, multiple threads standing in for harts) touch disjoint
    // frames concurrently; callers serialize same-frame access through the
    // `page`/`pte` locks exactly as they would on real hardware.
    unsafe impl Sync for SimRam {}

    static SIM_RAM: Once<SimRam> = Once::new();

    fn ram() -> &'static SimRam {
        SIM_RAM.call_once(|| SimRam(vec![[0u8; PGSIZE]; NFRAMES].into_boxed_slice()))
    }

    pub unsafe fn frame_bytes_mut(idx: usize) -> &'static mut [u8; PGSIZE] {
        let base = ram().0.as_ptr() as *mut [u8; PGSIZE];
        &mut *base.add(idx)
    }

    pub unsafe fn frame_bytes(idx: usize) -> &'static [u8; PGSIZE] {
        &ram().0[idx]
    }
}
