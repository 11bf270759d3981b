// SPDX-License-Identifier: Apache-2.0

//! `MemorySubsystem`: the single owned value that is the frame table, the
//! free-list, the LRU ring, the swap bitmap, and the clock hand, rather
//! than a scatter of module-private statics. Constructed once at boot and
//! shared by reference afterwards: every field here is already
//! interior-mutable behind its own `spin::Mutex`, so a shared
//! `&MemorySubsystem` is enough for every operation in this crate.
//!
//! Lock order, identical to the concurrency model: `page -> lru -> pte ->
//! kmem -> swap_bitmap`. Every method below that takes more than one lock
//! acquires them in that order and never holds two at once out of order.
//! PTE mutation is serialized at the granularity of a single word: the
//! `pte` lock is taken only around one `write_pte` call (word write plus
//! its `sfence_vma`), never across a whole walk or range operation, so an
//! eviction triggered by a nested allocation can freely rewrite an
//! unrelated PTE without self-deadlocking.

use core::sync::atomic::{AtomicUsize, Ordering};

#[cfg(baremetal)]
use alloc::boxed::Box;

use crate::consts::NFRAMES;
use crate::error::Result;
use crate::falloc::FrameAllocator;
use crate::frame::FrameTable;
use crate::lru::LruRing;
use crate::pagetable::{self, PageTable};
use crate::phys;
use crate::process::CurrentProcess;
use crate::pte::Perm;
use crate::swapstore::{BlockDevice, SwapStore};

pub struct MemorySubsystem {
    frame_table: spin::Mutex<FrameTable>,
    lru: spin::Mutex<LruRing>,
    kmem: spin::Mutex<FrameAllocator>,
    swap: spin::Mutex<SwapStore>,
    pte_lock: spin::Mutex<()>,
    /// The block layer this core consumes. Not one of the five named
    /// locks: it is an external collaborator, and callers never hold a
    /// core lock while calling into it.
    disk: spin::Mutex<Box<dyn BlockDevice>>,
    swap_in_count: AtomicUsize,
    swap_out_count: AtomicUsize,
}

impl MemorySubsystem {
    /// Builds a fresh subsystem: frame table empty, free-list swept over
    /// every allocator-eligible frame, LRU ring and swap bitmap empty.
    pub fn new(disk: Box<dyn BlockDevice>) -> Self {
        let mut kmem = FrameAllocator::new();
        kmem.init();
        MemorySubsystem {
            frame_table: spin::Mutex::new(FrameTable::new()),
            lru: spin::Mutex::new(LruRing::new()),
            kmem: spin::Mutex::new(kmem),
            swap: spin::Mutex::new(SwapStore::new()),
            pte_lock: spin::Mutex::new(()),
            disk: spin::Mutex::new(disk),
            swap_in_count: AtomicUsize::new(0),
            swap_out_count: AtomicUsize::new(0),
        }
    }

    // ---- Internal primitives, used by `pagetable`/`replacer`/`fault` ----

    pub(crate) fn lock_frames(&self) -> spin::MutexGuard<'_, FrameTable> {
        self.frame_table.lock()
    }

    pub(crate) fn lock_lru(&self) -> spin::MutexGuard<'_, LruRing> {
        self.lru.lock()
    }

    /// Allocates a frame, triggering at most one eviction attempt when the
    /// free-list is empty and retrying exactly once.
    pub(crate) fn frame_alloc(&self) -> Result<usize> {
        if let Some(idx) = self.kmem.lock().try_alloc() {
            return Ok(idx);
        }
        if crate::replacer::evict_one(self).is_ok() {
            if let Some(idx) = self.kmem.lock().try_alloc() {
                return Ok(idx);
            }
        }
        Err(crate::error::PagingError::OutOfMemory)
    }

    /// Allocates a frame and marks it as a page-table page: zeroed,
    /// `is_page_table = true`, never LRU-eligible.
    pub(crate) fn frame_alloc_pt(&self) -> Result<usize> {
        let idx = self.frame_alloc()?;
        unsafe { phys::frame_bytes_mut(idx).fill(0) };
        self.frame_table.lock().get_mut(idx).is_page_table = true;
        Ok(idx)
    }

    /// Detaches `idx` from the LRU (if linked), clears its metadata, and
    /// returns it to the free-list.
    pub(crate) fn frame_free(&self, idx: usize) {
        self.lru_remove_if_present(idx);
        self.clear_and_release_frame(idx);
    }

    /// Clears frame metadata and pushes it onto the free-list, without
    /// touching the LRU. Used by `Replacer::evict_one` once it has already
    /// unlinked the victim itself, so the LRU-removal and the metadata
    /// clear/free happen as two distinct, spec-ordered steps rather than
    /// being folded into one `frame_free` call.
    pub(crate) fn clear_and_release_frame(&self, idx: usize) {
        self.frame_table.lock().clear(idx);
        self.kmem.lock().free(idx);
    }

    /// Records `idx` as mapped at `(owner_pt, va)` and admits it to the
    /// LRU tail. Locks `page` then `lru`, per the global order.
    pub(crate) fn lru_insert(&self, idx: usize, owner_pt: usize, va: usize) {
        let mut frames = self.frame_table.lock();
        frames.get_mut(idx).owner_pt = Some(owner_pt);
        frames.get_mut(idx).vaddr = va;
        let mut lru = self.lru.lock();
        lru.insert_tail(&mut frames, idx);
    }

    /// Unlinks `idx` from the LRU if it is currently linked; a no-op
    /// otherwise (page-table frames and already-evicted frames).
    pub(crate) fn lru_remove_if_present(&self, idx: usize) {
        let mut frames = self.frame_table.lock();
        if frames.get(idx).in_lru {
            let mut lru = self.lru.lock();
            lru.remove(&mut frames, idx);
        }
    }

    /// Writes one PTE word under the `pte` lock and flushes the
    /// translation for `va` before releasing it, satisfying ordering
    /// guarantee (a): the V-to-SWAP (or any) transition is visible to any
    /// subsequent walk on this hart, and to other harts after the fence.
    pub(crate) fn write_pte(&self, frame_idx: usize, slot: usize, word: u64, va: usize) {
        let _guard = self.pte_lock.lock();
        unsafe { phys::frame_as_pagetable_mut(frame_idx)[slot] = word };
        sfence_vma(va);
    }

    pub(crate) fn swap_alloc_slot(&self) -> Result<usize> {
        self.swap.lock().alloc_slot()
    }

    pub(crate) fn swap_free_slot(&self, slot: usize) {
        self.swap.lock().free_slot(slot);
    }

    /// Writes frame `frame_idx` to swap slot `slot`. Never called while a
    /// core lock is held, per §4.2.
    pub(crate) fn swap_write(&self, frame_idx: usize, slot: usize) {
        let bytes = unsafe { phys::frame_bytes(frame_idx) };
        self.disk.lock().write_block(slot, bytes);
        self.swap_out_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Reads swap slot `slot` into frame `frame_idx`. Never called while a
    /// core lock is held.
    pub(crate) fn swap_read_into(&self, frame_idx: usize, slot: usize) {
        let bytes = unsafe { phys::frame_bytes_mut(frame_idx) };
        self.disk.lock().read_block(slot, bytes);
    }

    pub(crate) fn record_eviction(&self) {
        // swap_out_count is incremented in `swap_write`, at the point the
        // page actually left for the backing store.
    }

    pub(crate) fn record_swap_in(&self) {
        self.swap_in_count.fetch_add(1, Ordering::Relaxed);
    }

    // ---- Observability (an addition beyond the distilled spec: see
    // SPEC_FULL.md §3) ----

    pub fn used_frames(&self) -> usize {
        NFRAMES - self.kmem.lock().free_count()
    }

    pub fn free_swap_slots(&self) -> usize {
        self.swap.lock().free_count()
    }

    pub fn num_lru_pages(&self) -> usize {
        self.lru.lock().len()
    }

    pub fn swap_in_count(&self) -> usize {
        self.swap_in_count.load(Ordering::Relaxed)
    }

    pub fn swap_out_count(&self) -> usize {
        self.swap_out_count.load(Ordering::Relaxed)
    }

    // ---- Public surface exposed to the rest of the kernel (§6) ----

    pub fn pt_new(&self) -> Result<PageTable> {
        pagetable::pt_new(self)
    }

    pub fn pt_free(&self, pt: PageTable, size: usize) {
        pagetable::pt_free(self, pt, size)
    }

    pub fn pt_map(&self, pt: &PageTable, va: usize, size: usize, pa: usize, perm: Perm) -> Result<()> {
        pagetable::map_range(self, pt.root, va, size, pa, perm)
    }

    pub fn pt_unmap(&self, pt: &PageTable, va: usize, npages: usize, free_phys: bool) {
        pagetable::unmap_range(self, pt.root, va, npages, free_phys)
    }

    pub fn pt_walkaddr(&self, pt: &PageTable, va: usize) -> Result<usize> {
        pagetable::walkaddr(self, pt.root, va)
    }

    pub fn pt_copy_space(&self, src: &PageTable, dst: &PageTable, size: usize) -> Result<()> {
        pagetable::copy_space(self, src.root, dst.root, size)
    }

    pub fn pt_strip_user(&self, pt: &PageTable, va: usize) -> Result<()> {
        pagetable::strip_user(self, pt.root, va)
    }

    pub fn copy_out(&self, pt: &PageTable, dst_va: usize, src: &[u8]) -> Result<()> {
        pagetable::copy_out(self, pt.root, dst_va, src)
    }

    pub fn copy_in(&self, pt: &PageTable, src_va: usize, dst: &mut [u8]) -> Result<()> {
        pagetable::copy_in(self, pt.root, src_va, dst)
    }

    pub fn copy_in_str(&self, pt: &PageTable, src_va: usize, dst: &mut [u8]) -> Result<usize> {
        pagetable::copy_in_str(self, pt.root, src_va, dst)
    }

    /// `frame_alloc`/`frame_free`, exposed for callers (e.g. `sbrk`) that
    /// need a raw frame outside of any `PageTable` operation.
    pub fn alloc_frame(&self) -> Result<usize> {
        self.frame_alloc().map(phys::frame_idx_to_pa)
    }

    pub fn free_frame(&self, pa: usize) {
        self.frame_free(phys::pa_to_frame_idx(pa));
    }

    pub fn fault_handle(&self, proc: &mut dyn CurrentProcess, fault_va: usize) {
        crate::fault::fault_handle(self, proc, fault_va)
    }

    /// Runs one Clock-over-LRU eviction cycle. Ordinarily triggered
    /// implicitly by `frame_alloc` when the free-list is empty; exposed
    /// directly for a host kernel's explicit "reclaim memory now" path and
    /// for tests that want to force a page out without first exhausting
    /// every free frame.
    pub fn evict_one(&self) -> Result<()> {
        crate::replacer::evict_one(self)
    }
}

#[cfg(all(baremetal, target_arch = "riscv64"))]
fn sfence_vma(va: usize) {
    unsafe { core::arch::asm!("sfence.vma {0}, zero", in(reg) va) };
}

#[cfg(not(all(baremetal, target_arch = "riscv64")))]
fn sfence_vma(_va: usize) {}
