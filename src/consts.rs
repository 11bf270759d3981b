// SPDX-License-Identifier: Apache-2.0

//! Compile-time tunables. There is no configuration file, CLI, or
//! environment variable in this crate; everything below is a `const`,
//! fixed at compile time. A consumer targeting real hardware overrides
//! these by swapping in its own `consts` values behind a board feature.

/// Size of a physical frame / virtual page, and the unit of swap I/O.
pub const PGSIZE: usize = 4096;

/// log2(PGSIZE).
pub const PAGE_SHIFT: usize = 12;

/// Entries per page-table level (Sv39: 9 VPN bits per level).
pub const PTE_PER_PAGE: usize = 512;

/// Bits of virtual-page-number per Sv39 radix level.
pub const VPN_BITS: usize = 9;

/// Base of physical RAM. Frames below this address do not exist.
pub const KERNBASE: usize = 0x8000_0000;

/// End of the fixed kernel image; frames in `[KERNEL_END, PHYSTOP)` are the
/// ones the allocator may hand out. A teaching-scale default: two megabytes
/// reserved for kernel text/data/stack.
pub const KERNEL_END: usize = KERNBASE + 2 * 1024 * 1024;

/// Top of physical RAM. Deliberately small so the hosted test backend can
/// afford to back it with a plain buffer; a real target overrides this.
pub const PHYSTOP: usize = KERNEL_END + 8 * 1024 * 1024;

/// Number of allocator-eligible frames.
pub const NFRAMES: usize = (PHYSTOP - KERNEL_END) / PGSIZE;

/// Highest virtual address a user page table may map. Sv39 addresses are
/// sign-extended above bit 38; we only ever use the canonical low half.
pub const MAXVA: usize = 1 << 38;

/// Size in bytes of the swap area on the backing store.
pub const SWAPMAX: usize = 4 * 1024 * 1024;

/// Number of fixed-size swap slots the bitmap tracks.
pub const MAX_SWAP_PAGES: usize = SWAPMAX / PGSIZE;

/// Non-zero fill pattern frames are poisoned with on alloc, so a
/// read-before-write bug reads garbage instead of quietly seeing zero.
pub const ALLOC_POISON: u8 = 0xA5;

/// Fill pattern used when a frame is freed, distinct from the alloc pattern
/// so a used-after-free can be told apart from a read-before-write in a
/// debugger dump.
pub const FREE_POISON: u8 = 0x11;
