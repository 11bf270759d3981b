// SPDX-License-Identifier: Apache-2.0

//! The three-level hardware-format page table: walk, map, unmap, fork
//! copy, and the user↔kernel copy primitives. Mirrors the split between
//! `mem.rs` (orchestration, locking) and `arch::riscv::mem` (raw walk) by
//! keeping these as free functions over `&MemorySubsystem` rather than
//! methods with their own state; the subsystem already owns every lock
//! these need.

use crate::consts::{MAXVA, PGSIZE};
use crate::error::{PagingError, Result};
use crate::pte::{vpn, Perm, Pte, PteFlags, PteView};
use crate::phys;
use crate::subsystem::MemorySubsystem;

/// A page-table handle: just the frame index of its root. Concrete radix
/// levels live entirely in frame-backed storage, reached through `walk`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PageTable {
    pub root: usize,
}

/// Allocates a fresh, empty page table (one zeroed frame marked
/// `is_page_table`).
pub fn pt_new(sys: &MemorySubsystem) -> Result<PageTable> {
    let root = sys.frame_alloc_pt()?;
    Ok(PageTable { root })
}

/// Unmaps and frees every page in `[0, size)`, then frees the radix's
/// interior nodes themselves, asserting every leaf was already cleared.
pub fn pt_free(sys: &MemorySubsystem, pt: PageTable, size: usize) {
    free_space(sys, pt.root, size);
}

/// Descends the two interior radix levels for `va`, returning the frame
/// index of the level-0 (leaf) page-table page and the entry within it.
/// Allocates missing interior levels when `allocate` is set; otherwise a
/// missing level is reported as `NotMapped`.
pub fn walk(sys: &MemorySubsystem, root: usize, va: usize, allocate: bool) -> Result<(usize, usize)> {
    assert!(va < MAXVA, "walk past MAXVA");
    let mut cur = root;
    for level in [2usize, 1usize] {
        let slot = vpn(va, level);
        let word = unsafe { phys::frame_as_pagetable(cur)[slot] };
        match Pte(word).decode() {
            PteView::Interior { frame } => cur = frame,
            PteView::Unmapped => {
                if !allocate {
                    return Err(PagingError::NotMapped);
                }
                let frame = sys.frame_alloc_pt()?;
                sys.write_pte(cur, slot, Pte::interior(frame).0, va);
                cur = frame;
            }
            PteView::Resident { .. } | PteView::Swapped { .. } => {
                panic!("walk: leaf PTE encountered at an interior radix level")
            }
        }
    }
    Ok((cur, vpn(va, 0)))
}

/// Writes a fresh resident leaf PTE for an already-allocated frame and, if
/// the permission includes user access, admits it to the LRU ring. Shared
/// by `map_range` (caller-supplied frame) and `copy_space` (freshly
/// allocated + copied frame).
fn install_resident(sys: &MemorySubsystem, root: usize, va: usize, frame: usize, perm: Perm) -> Result<()> {
    let (leaf_frame, slot) = walk(sys, root, va, true)?;
    let existing = Pte(unsafe { phys::frame_as_pagetable(leaf_frame)[slot] });
    assert!(!existing.is_valid(), "install_resident: remap of a live PTE");
    sys.write_pte(leaf_frame, slot, Pte::resident(frame, perm).0, va);
    if perm.contains(Perm::U) {
        sys.lru_insert(frame, root, va);
    }
    Ok(())
}

/// `va`/`size` page-aligned, `size > 0`. Panics on remap of a live PTE.
pub fn map_range(sys: &MemorySubsystem, root: usize, va: usize, size: usize, pa: usize, perm: Perm) -> Result<()> {
    assert_eq!(va % PGSIZE, 0, "map_range: va not page-aligned");
    assert_eq!(size % PGSIZE, 0, "map_range: size not page-aligned");
    assert!(size > 0, "map_range: zero-size mapping");
    let npages = size / PGSIZE;
    for i in 0..npages {
        let page_va = va + i * PGSIZE;
        let page_pa = pa + i * PGSIZE;
        let frame = phys::pa_to_frame_idx(page_pa);
        install_resident(sys, root, page_va, frame, perm)?;
    }
    Ok(())
}

/// For each of `npages` pages starting at `va`: if `free_phys`, detaches
/// the frame from the LRU (if linked) and frees it; else if the PTE was
/// swapped, frees the referenced slot. Always zeroes the PTE and flushes.
/// Panics if a page in range is missing or not a leaf.
pub fn unmap_range(sys: &MemorySubsystem, root: usize, va: usize, npages: usize, free_phys: bool) {
    assert_eq!(va % PGSIZE, 0, "unmap_range: va not page-aligned");
    for i in 0..npages {
        let page_va = va + i * PGSIZE;
        let (leaf_frame, slot) =
            walk(sys, root, page_va, false).expect("unmap_range: missing or non-leaf PTE");
        let word = unsafe { phys::frame_as_pagetable(leaf_frame)[slot] };
        match Pte(word).decode() {
            PteView::Resident { frame, .. } => {
                sys.lru_remove_if_present(frame);
                if free_phys {
                    sys.frame_free(frame);
                }
            }
            PteView::Swapped { slot: swap_slot, .. } => {
                sys.swap_free_slot(swap_slot);
            }
            PteView::Unmapped | PteView::Interior { .. } => {
                panic!("unmap_range: missing or non-leaf PTE")
            }
        }
        sys.write_pte(leaf_frame, slot, 0, page_va);
    }
}

/// Clears the `U` bit of a single leaf PTE, e.g. to make a stack guard
/// page inaccessible to user code while leaving it mapped for the kernel.
pub fn strip_user(sys: &MemorySubsystem, root: usize, va: usize) -> Result<()> {
    let (leaf_frame, slot) = walk(sys, root, va, false)?;
    let word = unsafe { phys::frame_as_pagetable(leaf_frame)[slot] };
    assert!(Pte(word).is_valid(), "strip_user: PTE not valid");
    sys.write_pte(leaf_frame, slot, word & !PteFlags::U.bits(), va);
    Ok(())
}

/// Copies every page of `[0, size)` from `src` into `dst` (fork). Resident
/// source pages are copied byte-for-byte into a fresh frame; swapped
/// source pages are read from their slot into a fresh frame and the
/// parent's slot is left allocated. Every page in range must be mapped in
/// `src`; a hole panics, matching the reference `uvmcopy`'s treatment of a
/// missing or invalid source PTE as a kernel bug rather than something a
/// caller can recover from. A recoverable failure (allocation or swap
/// exhaustion) unwinds the child pages mapped so far.
pub fn copy_space(sys: &MemorySubsystem, src_root: usize, dst_root: usize, size: usize) -> Result<()> {
    assert_eq!(size % PGSIZE, 0, "copy_space: size not page-aligned");
    let npages = size / PGSIZE;
    for i in 0..npages {
        let va = i * PGSIZE;
        let (src_leaf, slot) =
            walk(sys, src_root, va, false).expect("copy_space: missing source PTE");
        let word = unsafe { phys::frame_as_pagetable(src_leaf)[slot] };
        let outcome = copy_one_page(sys, dst_root, va, Pte(word).decode());
        if let Err(e) = outcome {
            unmap_range(sys, dst_root, 0, i, true);
            return Err(e);
        }
    }
    Ok(())
}

fn copy_one_page(sys: &MemorySubsystem, dst_root: usize, va: usize, src: PteView) -> Result<()> {
    match src {
        PteView::Unmapped => panic!("copy_space: source page not present at {:#x}", va),
        PteView::Resident { frame, perm } => {
            let child = sys.frame_alloc()?;
            unsafe {
                let src_bytes = *phys::frame_bytes(frame);
                phys::frame_bytes_mut(child).copy_from_slice(&src_bytes);
            }
            install_resident(sys, dst_root, va, child, perm)
        }
        PteView::Swapped { slot, perm } => {
            let child = sys.frame_alloc()?;
            sys.swap_read_into(child, slot);
            install_resident(sys, dst_root, va, child, perm)
        }
        PteView::Interior { .. } => unreachable!("leaf walk returned an interior PTE"),
    }
}

/// Unmaps `[0, size)` (freeing frames and swap slots), then frees the
/// radix's own interior and leaf page-table pages.
pub fn free_space(sys: &MemorySubsystem, root: usize, size: usize) {
    assert_eq!(size % PGSIZE, 0, "free_space: size not page-aligned");
    let npages = size / PGSIZE;
    for i in 0..npages {
        let va = i * PGSIZE;
        if let Ok((leaf_frame, slot)) = walk(sys, root, va, false) {
            let word = unsafe { phys::frame_as_pagetable(leaf_frame)[slot] };
            match Pte(word).decode() {
                PteView::Resident { frame, .. } => {
                    sys.lru_remove_if_present(frame);
                    sys.frame_free(frame);
                    sys.write_pte(leaf_frame, slot, 0, va);
                }
                PteView::Swapped { slot: swap_slot, .. } => {
                    sys.swap_free_slot(swap_slot);
                    sys.write_pte(leaf_frame, slot, 0, va);
                }
                PteView::Unmapped | PteView::Interior { .. } => {}
            }
        }
    }
    free_radix(sys, root, 2);
}

fn free_radix(sys: &MemorySubsystem, frame: usize, level: usize) {
    if level > 0 {
        let table = unsafe { *phys::frame_as_pagetable(frame) };
        for word in table.iter() {
            let decoded = Pte(*word).decode();
            if let PteView::Interior { frame: child } = decoded {
                free_radix(sys, child, level - 1);
            }
            debug_assert!(
                !matches!(decoded, PteView::Resident { .. } | PteView::Swapped { .. }),
                "free_space: leaf still populated during radix teardown"
            );
        }
    }
    sys.frame_free(frame);
}

/// Translates a user virtual address to its backing frame and current
/// permission, transparently swapping the page in if it was swapped out.
fn translate(sys: &MemorySubsystem, root: usize, va: usize) -> Result<(usize, Perm)> {
    let (leaf_frame, slot) = walk(sys, root, va, false)?;
    let word = unsafe { phys::frame_as_pagetable(leaf_frame)[slot] };
    match Pte(word).decode() {
        PteView::Resident { frame, perm } => Ok((frame, perm)),
        PteView::Swapped { .. } => {
            let frame = crate::fault::swap_in_at(sys, root, leaf_frame, slot, va)?;
            let refreshed = unsafe { phys::frame_as_pagetable(leaf_frame)[slot] };
            match Pte(refreshed).decode() {
                PteView::Resident { perm, .. } => Ok((frame, perm)),
                _ => unreachable!("swap_in_at left a non-resident PTE"),
            }
        }
        PteView::Unmapped | PteView::Interior { .. } => Err(PagingError::NotMapped),
    }
}

/// `pt_walkaddr`: translates `va` to a physical address, swapping the page
/// in on demand.
pub fn walkaddr(sys: &MemorySubsystem, root: usize, va: usize) -> Result<usize> {
    translate(sys, root, va).map(|(frame, _)| phys::frame_idx_to_pa(frame))
}

/// Copies `src` into user memory at `dst_va`, looping across page
/// boundaries and swapping pages in as needed. Requires `V|U|W` on every
/// page touched.
pub fn copy_out(sys: &MemorySubsystem, root: usize, dst_va: usize, src: &[u8]) -> Result<()> {
    let mut va = dst_va;
    let mut remaining = src;
    while !remaining.is_empty() {
        let page_base = va & !(PGSIZE - 1);
        let (frame, perm) = translate(sys, root, page_base)?;
        if !perm.contains(Perm::U) || !perm.contains(Perm::W) {
            return Err(PagingError::ShareViolation);
        }
        let offset = va - page_base;
        let n = core::cmp::min(PGSIZE - offset, remaining.len());
        unsafe {
            phys::frame_bytes_mut(frame)[offset..offset + n].copy_from_slice(&remaining[..n]);
        }
        remaining = &remaining[n..];
        va += n;
    }
    Ok(())
}

/// Copies from user memory at `src_va` into `dst`, looping across page
/// boundaries and swapping pages in as needed. Requires `V|U`.
pub fn copy_in(sys: &MemorySubsystem, root: usize, src_va: usize, dst: &mut [u8]) -> Result<()> {
    let mut va = src_va;
    let mut written = 0;
    while written < dst.len() {
        let page_base = va & !(PGSIZE - 1);
        let (frame, perm) = translate(sys, root, page_base)?;
        if !perm.contains(Perm::U) {
            return Err(PagingError::ShareViolation);
        }
        let offset = va - page_base;
        let n = core::cmp::min(PGSIZE - offset, dst.len() - written);
        unsafe {
            dst[written..written + n].copy_from_slice(&phys::frame_bytes(frame)[offset..offset + n]);
        }
        written += n;
        va += n;
    }
    Ok(())
}

/// Like `copy_in`, but stops at the first NUL byte (inclusive) or when
/// `dst` fills up, returning the number of bytes written.
pub fn copy_in_str(sys: &MemorySubsystem, root: usize, src_va: usize, dst: &mut [u8]) -> Result<usize> {
    let mut va = src_va;
    let mut written = 0;
    while written < dst.len() {
        let page_base = va & !(PGSIZE - 1);
        let (frame, perm) = translate(sys, root, page_base)?;
        if !perm.contains(Perm::U) {
            return Err(PagingError::ShareViolation);
        }
        let offset = va - page_base;
        let avail = PGSIZE - offset;
        let bytes = unsafe { &phys::frame_bytes(frame)[offset..offset + avail] };
        for &b in bytes {
            if written >= dst.len() {
                return Ok(written);
            }
            dst[written] = b;
            written += 1;
            if b == 0 {
                return Ok(written);
            }
        }
        va += avail;
    }
    Ok(written)
}
