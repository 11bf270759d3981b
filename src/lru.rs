// SPDX-License-Identifier: Apache-2.0

//! The LRU ring and Clock hand, guarded by the `lru` lock.
//!
//! Per the design notes, the ring is an index-based intrusive list threaded
//! through `frames[]` rather than an owned, pointer-based `Vec`/linked
//! list: every frame already has a stable integer index, and `prev`/`next`
//! are `Option<usize>` into that same space. This sidesteps the
//! shared-ownership cycles a real doubly-linked list would need and keeps
//! the ring's storage inside the frame table it already shares a lock
//! order with (`page` is always taken before `lru`).

use crate::frame::FrameTable;

/// Head = oldest (next victim candidate), tail = most recently inserted.
/// The Clock hand sweeps independently of head/tail and is re-seeded at
/// `head` whenever it falls off a ring that still has members.
#[derive(Default)]
pub struct LruRing {
    head: Option<usize>,
    tail: Option<usize>,
    clock_hand: Option<usize>,
    count: usize,
}

impl LruRing {
    pub fn new() -> Self {
        LruRing::default()
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn head(&self) -> Option<usize> {
        self.head
    }

    /// Links frame `idx` at the tail of the ring. Consecutive inserts
    /// preserve their relative order, satisfying ordering guarantee (b).
    pub fn insert_tail(&mut self, frames: &mut FrameTable, idx: usize) {
        debug_assert!(!frames.get(idx).in_lru, "frame already in LRU ring");
        debug_assert!(frames.get(idx).lru_eligible(), "page-table frame admitted to LRU");

        frames.get_mut(idx).prev = self.tail;
        frames.get_mut(idx).next = None;
        frames.get_mut(idx).in_lru = true;

        if let Some(old_tail) = self.tail {
            frames.get_mut(old_tail).next = Some(idx);
        } else {
            // Ring was empty: idx is both head and tail.
            self.head = Some(idx);
        }
        self.tail = Some(idx);
        self.count += 1;

        if self.clock_hand.is_none() {
            self.clock_hand = self.head;
        }
    }

    /// Unlinks frame `idx` from wherever it sits in the ring. If the Clock
    /// hand currently points at it, the hand is advanced first so it never
    /// lags a removal (ordering guarantee (c)).
    pub fn remove(&mut self, frames: &mut FrameTable, idx: usize) {
        debug_assert!(frames.get(idx).in_lru, "removing a frame that is not in the LRU ring");

        if self.clock_hand == Some(idx) {
            self.clock_hand = frames.get(idx).next.or(self.head).filter(|&h| h != idx);
        }

        let prev = frames.get(idx).prev;
        let next = frames.get(idx).next;
        match prev {
            Some(p) => frames.get_mut(p).next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => frames.get_mut(n).prev = prev,
            None => self.tail = prev,
        }

        let meta = frames.get_mut(idx);
        meta.in_lru = false;
        meta.prev = None;
        meta.next = None;
        self.count -= 1;

        if self.count == 0 {
            self.head = None;
            self.tail = None;
            self.clock_hand = None;
        }
    }

    /// Moves `idx` from its current position to the tail without touching
    /// `in_lru`/`count`. Used by the Clock sweep's second-chance re-link.
    pub fn move_to_tail(&mut self, frames: &mut FrameTable, idx: usize) {
        let prev = frames.get(idx).prev;
        let next = frames.get(idx).next;
        if self.tail == Some(idx) {
            // Already at the tail.
            return;
        }
        match prev {
            Some(p) => frames.get_mut(p).next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => frames.get_mut(n).prev = prev,
            None => unreachable!("tail mismatch while idx is not the tail"),
        }
        frames.get_mut(idx).prev = self.tail;
        frames.get_mut(idx).next = None;
        if let Some(old_tail) = self.tail {
            frames.get_mut(old_tail).next = Some(idx);
        }
        self.tail = Some(idx);
    }

    /// Current Clock hand, re-seeding at `head` if it has fallen off an
    /// now-populated ring (e.g. boot, or after the ring emptied and refilled).
    pub fn clock_hand(&mut self) -> Option<usize> {
        if self.clock_hand.is_none() {
            self.clock_hand = self.head;
        }
        self.clock_hand
    }

    pub fn set_clock_hand(&mut self, idx: Option<usize>) {
        self.clock_hand = idx;
    }

    pub fn next_of(&self, frames: &FrameTable, idx: usize) -> Option<usize> {
        frames.get(idx).next.or(self.head)
    }
}
