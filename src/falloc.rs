// SPDX-License-Identifier: Apache-2.0

//! The free-list allocator, guarded by the `kmem` lock. Grounded directly
//! on the reference `kalloc`/`kfree`: a LIFO stack threaded through the
//! first bytes of each free frame (`struct run { struct run *next; }`),
//! poisoned on both alloc and free so a read-before-write or
//! use-after-free reads garbage instead of quietly seeing zero.
//!
//! Eviction coupling (alloc-empty triggers one `Replacer::evict_one()` and
//! retries once) lives one level up, in `MemorySubsystem::frame_alloc`,
//! since the allocator itself has no notion of a Replacer.

use crate::consts::{ALLOC_POISON, FREE_POISON, NFRAMES};
use crate::phys;

pub struct FrameAllocator {
    free_head: Option<usize>,
    free_count: usize,
}

impl FrameAllocator {
    pub fn new() -> Self {
        FrameAllocator { free_head: None, free_count: 0 }
    }

    /// Sweeps every allocator-eligible frame onto the free list. Mirrors
    /// `freerange(end, PHYSTOP)` at boot.
    pub fn init(&mut self) {
        for idx in 0..NFRAMES {
            self.push_free(idx);
        }
    }

    pub fn free_count(&self) -> usize {
        self.free_count
    }

    /// Pops the top of the free list, if any, poisoning the frame with a
    /// non-zero pattern before handing it back.
    pub fn try_alloc(&mut self) -> Option<usize> {
        let idx = self.pop_free()?;
        unsafe { phys::frame_bytes_mut(idx).fill(ALLOC_POISON) };
        Some(idx)
    }

    /// Poisons and pushes frame `idx` back onto the free list.
    pub fn free(&mut self, idx: usize) {
        unsafe { phys::frame_bytes_mut(idx).fill(FREE_POISON) };
        self.push_free(idx);
    }

    fn push_free(&mut self, idx: usize) {
        // Encode the previous head as (prev_idx + 1), 0 meaning "none", so
        // frame index 0 is representable as a link target.
        let encoded: u64 = self.free_head.map(|i| i as u64 + 1).unwrap_or(0);
        unsafe {
            let bytes = phys::frame_bytes_mut(idx);
            bytes[0..8].copy_from_slice(&encoded.to_ne_bytes());
        }
        self.free_head = Some(idx);
        self.free_count += 1;
    }

    fn pop_free(&mut self) -> Option<usize> {
        let idx = self.free_head?;
        let encoded = unsafe {
            let bytes = phys::frame_bytes(idx);
            let mut buf = [0u8; 8];
            buf.copy_from_slice(&bytes[0..8]);
            u64::from_ne_bytes(buf)
        };
        self.free_head = if encoded == 0 { None } else { Some((encoded - 1) as usize) };
        self.free_count -= 1;
        Some(idx)
    }
}

impl Default for FrameAllocator {
    fn default() -> Self {
        Self::new()
    }
}
