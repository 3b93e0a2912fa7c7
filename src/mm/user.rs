//! Direct user memory access
//!
//! While a syscall is being serviced the caller's page directory is still
//! active, so a validated user address can be dereferenced directly.

use super::address::{UserRegion, VirtAddr};
use super::AddressSpace;

/// Address space backed by the live page tables of the trapping process.
#[derive(Debug, Clone, Copy)]
pub struct RawUserMemory {
    region: UserRegion,
}

impl RawUserMemory {
    /// Create an accessor for `region`.
    ///
    /// # Safety
    /// Every address in `region` must be mapped and readable/writable for
    /// as long as this value is used, and must not alias kernel data that
    /// is borrowed elsewhere.
    pub const unsafe fn new(region: UserRegion) -> Self {
        Self { region }
    }

    pub const fn region(&self) -> UserRegion {
        self.region
    }
}

impl AddressSpace for RawUserMemory {
    fn is_user_address(&self, addr: VirtAddr) -> bool {
        self.region.contains(addr)
    }

    fn copy_from_user(&self, addr: VirtAddr, buf: &mut [u8]) {
        if buf.is_empty() {
            return;
        }
        // SAFETY:
        // - The validator checked every page of [addr, addr + len)
        // - The constructor contract guarantees the region is mapped
        // - `buf` is kernel memory and cannot overlap the user range
        unsafe {
            core::ptr::copy_nonoverlapping(
                addr.as_usize() as *const u8,
                buf.as_mut_ptr(),
                buf.len(),
            );
        }
    }

    fn copy_to_user(&mut self, addr: VirtAddr, data: &[u8]) {
        if data.is_empty() {
            return;
        }
        // SAFETY: Same as copy_from_user, with the region writable
        unsafe {
            core::ptr::copy_nonoverlapping(
                data.as_ptr(),
                addr.as_usize() as *mut u8,
                data.len(),
            );
        }
    }
}
