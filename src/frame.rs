// SPDX-License-Identifier: Apache-2.0

//! Per-frame metadata: one record per physical frame index, guarded by the
//! `page` lock. This is `frames[]` in the concurrency model.

use crate::consts::NFRAMES;

#[cfg(baremetal)]
use alloc::vec;
#[cfg(baremetal)]
use alloc::vec::Vec;

/// One metadata record per physical frame.
///
/// Invariants (checked by debug assertions at the handful of call sites
/// that can violate them, never silently repaired):
/// - `is_page_table ⇒ !in_lru`
/// - `in_lru ⇒ vaddr < MAXVA ∧ owner_pt.is_some()`
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct FrameMeta {
    /// Frame index of the page table this frame is mapped under, if any.
    pub owner_pt: Option<usize>,
    /// User virtual address this frame is mapped at; meaningless unless
    /// `owner_pt.is_some()`.
    pub vaddr: usize,
    /// Whether this record is currently threaded into the LRU ring.
    pub in_lru: bool,
    /// True for frames holding page-table pages; never eviction-eligible.
    pub is_page_table: bool,
    /// LRU ring predecessor, valid only while `in_lru`.
    pub prev: Option<usize>,
    /// LRU ring successor, valid only while `in_lru`.
    pub next: Option<usize>,
}

impl FrameMeta {
    /// Whether this record may be admitted to / currently sits in the LRU
    /// ring: a resident user data page, never a page-table page.
    pub fn lru_eligible(&self) -> bool {
        !self.is_page_table
    }
}

/// The `frames[]` array: one [`FrameMeta`] per allocator-eligible physical
/// frame, indexed by frame index (see `phys::pa_to_frame_idx`).
pub struct FrameTable {
    frames: Vec<FrameMeta>,
}

impl FrameTable {
    pub fn new() -> Self {
        FrameTable { frames: vec![FrameMeta::default(); NFRAMES] }
    }

    pub fn get(&self, idx: usize) -> &FrameMeta {
        &self.frames[idx]
    }

    pub fn get_mut(&mut self, idx: usize) -> &mut FrameMeta {
        &mut self.frames[idx]
    }

    /// Resets a frame's metadata to the unowned default, e.g. after the
    /// Replacer evicts it and returns it to the `FrameAllocator`.
    pub fn clear(&mut self, idx: usize) {
        self.frames[idx] = FrameMeta::default();
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }
}

impl Default for FrameTable {
    fn default() -> Self {
        Self::new()
    }
}
