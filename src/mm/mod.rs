//! Memory subsystem interface for the syscall layer
//!
//! Provides:
//! - User address types and the default user region
//! - The [`AddressSpace`] contract the validator checks against
//! - [`RawUserMemory`], an address space for kernels that share the user's
//!   page tables while servicing a trap
//!
//! # Security Principles
//! - Nothing here decides on its own that a pointer is safe; callers must
//!   go through `syscall::validate` first
//! - Byte accessors assume the range was already validated

mod address;
mod user;

pub use address::{regions, UserRegion, VirtAddr, PAGE_MASK, PAGE_SIZE};
pub use user::RawUserMemory;

/// The calling process's view of memory.
pub trait AddressSpace {
    /// Is `addr` inside the range this process may legitimately name?
    fn is_user_address(&self, addr: VirtAddr) -> bool;

    /// Copy `buf.len()` bytes starting at `addr` into `buf`.
    ///
    /// Only called on ranges the validator accepted.
    fn copy_from_user(&self, addr: VirtAddr, buf: &mut [u8]);

    /// Copy `data` into user memory starting at `addr`.
    ///
    /// Only called on ranges the validator accepted.
    fn copy_to_user(&mut self, addr: VirtAddr, data: &[u8]);

    /// Read one validated byte.
    fn read_byte(&self, addr: VirtAddr) -> u8 {
        let mut byte = [0u8; 1];
        self.copy_from_user(addr, &mut byte);
        byte[0]
    }
}
