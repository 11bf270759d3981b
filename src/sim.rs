// SPDX-License-Identifier: Apache-2.0

//! A `BlockDevice` backed by plain memory, for tests and for any hosted
//! build that has no real swap disk. Mirrors `phys`'s own hosted/baremetal
//! split: the algorithms under test never know the difference.

use crate::consts::{MAX_SWAP_PAGES, PGSIZE};
use crate::swapstore::BlockDevice;

pub struct SimDisk {
    slots: Vec<[u8; PGSIZE]>,
}

impl SimDisk {
    pub fn new() -> Self {
        SimDisk { slots: vec![[0u8; PGSIZE]; MAX_SWAP_PAGES] }
    }
}

impl Default for SimDisk {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockDevice for SimDisk {
    fn read_block(&self, slot: usize, buf: &mut [u8; PGSIZE]) {
        buf.copy_from_slice(&self.slots[slot]);
    }

    fn write_block(&mut self, slot: usize, buf: &[u8; PGSIZE]) {
        self.slots[slot].copy_from_slice(buf);
    }
}
