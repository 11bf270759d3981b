// SPDX-License-Identifier: Apache-2.0

//! The page-table-entry bit layout and the tagged view over it.
//!
//! A leaf PTE is one of {unmapped, resident(frame, perm), swapped(slot,
//! perm)}; per the design notes this is modeled as a small sum type decoded
//! on read and encoded on write, not as subtyping, so the bit-exact Sv39
//! layout stays in one place. Flag bits are a `bitflags!` set over the low
//! bits of the word, plus one extra software-defined bit (`SWAP`) in the
//! otherwise-reserved RSW field.

use crate::consts::PTE_PER_PAGE;

bitflags::bitflags! {
    pub struct PteFlags: u64 {
        const V    = 0b0000_0001;
        const R    = 0b0000_0010;
        const W    = 0b0000_0100;
        const X    = 0b0000_1000;
        const U    = 0b0001_0000;
        const G    = 0b0010_0000;
        const A    = 0b0100_0000;
        const D    = 0b1000_0000;
        /// Software-defined: PTE addresses a swap slot, not a frame.
        const SWAP = 0b1_0000_0000;
    }
}

/// Permission bits a caller may request on `map_range`/request to preserve
/// across an evict/fault round trip. A plain alias over `PteFlags`, masked
/// to just R/W/X/U, so requested and stored permission share one flags
/// type.
pub type Perm = PteFlags;

pub fn perm_mask() -> PteFlags {
    PteFlags::R | PteFlags::W | PteFlags::X | PteFlags::U
}

const PPN_SHIFT: u32 = 10;
const PPN_MASK: u64 = (1u64 << 44) - 1;

/// Decoded contents of a leaf PTE.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PteView {
    Unmapped,
    /// Points at another page-table page (`V=1`, `R=W=X=0`).
    Interior { frame: usize },
    /// `V=1, SWAP=0`: resident user or kernel page.
    Resident { frame: usize, perm: Perm },
    /// `V=0, SWAP=1`: contents live in the given swap slot.
    Swapped { slot: usize, perm: Perm },
}

/// A single 64-bit page-table word, read or about to be written.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Pte(pub u64);

impl Pte {
    pub const ZERO: Pte = Pte(0);

    pub fn flags(self) -> PteFlags {
        PteFlags::from_bits_truncate(self.0)
    }

    pub fn ppn(self) -> usize {
        ((self.0 >> PPN_SHIFT) & PPN_MASK) as usize
    }

    /// Decodes this word into a tagged view. `V=1,SWAP=1` is undefined and
    /// panics; `V=0,SWAP=0` decodes to `Unmapped` (true both for a
    /// never-mapped entry and for one explicitly cleared by `unmap_range`).
    pub fn decode(self) -> PteView {
        let flags = self.flags();
        if self.0 == 0 {
            return PteView::Unmapped;
        }
        let valid = flags.contains(PteFlags::V);
        let swapped = flags.contains(PteFlags::SWAP);
        match (valid, swapped) {
            (false, false) => PteView::Unmapped,
            (true, true) => panic!("undefined PTE: V and SWAP both set"),
            (true, false) => {
                if flags.intersects(PteFlags::R | PteFlags::W | PteFlags::X) {
                    PteView::Resident { frame: self.ppn(), perm: flags & perm_mask() }
                } else {
                    PteView::Interior { frame: self.ppn() }
                }
            }
            (false, true) => PteView::Swapped { slot: self.ppn(), perm: flags & perm_mask() },
        }
    }

    pub fn is_valid(self) -> bool {
        self.flags().contains(PteFlags::V)
    }

    pub fn is_leaf(self) -> bool {
        matches!(self.decode(), PteView::Resident { .. } | PteView::Swapped { .. })
    }

    pub fn interior(frame: usize) -> Pte {
        Pte(((frame as u64) << PPN_SHIFT) | PteFlags::V.bits())
    }

    pub fn resident(frame: usize, perm: Perm) -> Pte {
        Pte(((frame as u64) << PPN_SHIFT) | (perm & perm_mask()).bits() | PteFlags::V.bits())
    }

    pub fn swapped(slot: usize, perm: Perm) -> Pte {
        Pte(((slot as u64) << PPN_SHIFT) | (perm & perm_mask()).bits() | PteFlags::SWAP.bits())
    }

    pub fn accessed(self) -> bool {
        self.flags().contains(PteFlags::A)
    }

    pub fn with_accessed_cleared(self) -> Pte {
        Pte(self.0 & !PteFlags::A.bits())
    }
}

/// Splits a Sv39 virtual address into its three 9-bit VPN fields, root
/// first, matching the order `walk` descends in.
pub fn vpn(va: usize, level: usize) -> usize {
    (va >> (12 + 9 * level)) & (PTE_PER_PAGE - 1)
}
