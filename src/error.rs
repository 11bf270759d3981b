// SPDX-License-Identifier: Apache-2.0

//! The only failure type this crate hands back to callers. Invariant
//! violations are not represented here; a bad walk or a double-free is a
//! kernel bug, not a recoverable `Error` variant, so those stay
//! `panic!`/`assert!`.

use core::fmt;

/// Recoverable failures a caller is expected to handle: resource
/// exhaustion and the user-facing fault outcomes that cause a process to
/// be killed rather than the kernel to panic.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum PagingError {
    /// The frame allocator's free-list was empty and the one eviction
    /// attempt it is allowed did not free a frame.
    OutOfMemory,
    /// The swap bitmap has no free slot.
    SwapFull,
    /// A supplied virtual address is outside `[0, MAXVA)`.
    BadAddress,
    /// A supplied address or size was not page-aligned.
    BadAlignment,
    /// A walk reached a leaf that was never mapped.
    NotMapped,
    /// `map_range` was asked to map a page that is already resident.
    AlreadyMapped,
    /// `copy_out`/`copy_in` target lacked the required permission bits.
    ShareViolation,
}

impl fmt::Display for PagingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            PagingError::OutOfMemory => "out of physical memory",
            PagingError::SwapFull => "swap store exhausted",
            PagingError::BadAddress => "virtual address out of range",
            PagingError::BadAlignment => "address or size not page-aligned",
            PagingError::NotMapped => "page not mapped",
            PagingError::AlreadyMapped => "page already mapped",
            PagingError::ShareViolation => "permission mismatch on user copy",
        };
        f.write_str(msg)
    }
}

pub type Result<T> = core::result::Result<T, PagingError>;
