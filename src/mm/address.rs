//! User Virtual Address Types
//!
//! Type-safe wrapper for addresses handed to the kernel by user code, and
//! the region of the address space user code is allowed to name.
//!
//! # Layout (32-bit teaching kernel)
//! ```text
//! 0x0000_0000 ┌──────────────────────┐
//!             │ null page (unmapped) │
//! 0x0000_1000 ├──────────────────────┤ USER_START
//!             │ user code, data,     │
//!             │ heap and stack       │
//! 0xC000_0000 ├──────────────────────┤ PHYS_BASE
//!             │ kernel               │
//! 0xFFFF_FFFF └──────────────────────┘
//! ```

use core::fmt;

/// Page size (4 KiB)
pub const PAGE_SIZE: usize = 4096;
/// Page size mask
pub const PAGE_MASK: usize = PAGE_SIZE - 1;

/// Default bounds of user-accessible memory.
pub mod regions {
    /// First user address. The null page is never mapped.
    pub const USER_START: usize = 0x0000_1000;
    /// Base of kernel virtual memory; user addresses lie strictly below.
    pub const PHYS_BASE: usize = 0xC000_0000;
}

/// A virtual address supplied by (or destined for) user code.
///
/// Holding a `VirtAddr` says nothing about validity. Only the syscall
/// validator turns one into something the kernel may dereference.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct VirtAddr(usize);

impl VirtAddr {
    #[inline]
    pub const fn new(addr: usize) -> Self {
        Self(addr)
    }

    /// Get the raw address value.
    #[inline]
    pub const fn as_usize(self) -> usize {
        self.0
    }

    #[inline]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }

    /// Offset within the containing page.
    #[inline]
    pub const fn page_offset(self) -> usize {
        self.0 & PAGE_MASK
    }

    /// Align the address down to the nearest page boundary.
    #[inline]
    pub const fn align_down(self) -> Self {
        Self(self.0 & !PAGE_MASK)
    }

    /// Add an offset, returning `None` on wraparound.
    #[inline]
    pub const fn checked_add(self, offset: usize) -> Option<Self> {
        match self.0.checked_add(offset) {
            Some(addr) => Some(Self(addr)),
            None => None,
        }
    }
}

impl fmt::Debug for VirtAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VirtAddr({:#010x})", self.0)
    }
}

impl fmt::Display for VirtAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

/// A half-open range `[start, end)` of user-accessible addresses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UserRegion {
    start: VirtAddr,
    end: VirtAddr,
}

impl UserRegion {
    /// Create a region. Returns `None` for empty regions, regions that
    /// include the null page, or regions reaching into kernel space.
    pub const fn new(start: usize, end: usize) -> Option<Self> {
        if start == 0 || start >= end || end > regions::PHYS_BASE {
            return None;
        }
        Some(Self {
            start: VirtAddr(start),
            end: VirtAddr(end),
        })
    }

    /// Create a region without checking it against the kernel layout.
    #[cfg(test)]
    pub(crate) const fn new_unchecked(start: usize, end: usize) -> Self {
        Self {
            start: VirtAddr(start),
            end: VirtAddr(end),
        }
    }

    /// The whole user half of the address space.
    pub const fn full() -> Self {
        Self {
            start: VirtAddr(regions::USER_START),
            end: VirtAddr(regions::PHYS_BASE),
        }
    }

    #[inline]
    pub const fn start(&self) -> VirtAddr {
        self.start
    }

    #[inline]
    pub const fn end(&self) -> VirtAddr {
        self.end
    }

    #[inline]
    pub const fn contains(&self, addr: VirtAddr) -> bool {
        addr.0 >= self.start.0 && addr.0 < self.end.0
    }
}

impl Default for UserRegion {
    fn default() -> Self {
        Self::full()
    }
}
