//! System Call Input Validation
//!
//! Every address that comes out of a call frame is checked here before the
//! kernel reads or writes through it.
//!
//! # Security Principles
//! - Validate ALL inputs before use
//! - Fail-secure: deny by default
//! - Prevent common vulnerabilities:
//!   - Buffer overflows (every page of a range is checked)
//!   - Address wraparound (checked arithmetic)
//!   - Null pointer dereference (explicit checks)
//!   - Unterminated strings (bounded scan)

use alloc::vec::Vec;

use super::handler::SyscallError;
use crate::mm::{AddressSpace, VirtAddr, PAGE_SIZE};

/// Width of one call frame slot.
pub const WORD_SIZE: usize = 4;

/// Longest string, terminator included, accepted from user code.
pub const MAX_STR_LEN: usize = PAGE_SIZE;

/// A validated user buffer the kernel reads from.
///
/// This type guarantees that:
/// - Every byte of the buffer is inside the caller's user region
/// - The length doesn't overflow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserBuffer {
    addr: VirtAddr,
    len: usize,
}

impl UserBuffer {
    #[inline]
    pub fn addr(&self) -> VirtAddr {
        self.addr
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Copy the bytes at `offset..` into `buf`, stopping at the end of the
    /// buffer. Returns the number of bytes copied.
    pub fn copy_in<M: AddressSpace + ?Sized>(&self, mem: &M, offset: usize, buf: &mut [u8]) -> usize {
        let n = buf.len().min(self.len.saturating_sub(offset));
        if n > 0 {
            mem.copy_from_user(VirtAddr::new(self.addr.as_usize() + offset), &mut buf[..n]);
        }
        n
    }
}

/// A validated user buffer the kernel writes into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserBufferMut {
    addr: VirtAddr,
    len: usize,
}

impl UserBufferMut {
    #[inline]
    pub fn addr(&self) -> VirtAddr {
        self.addr
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Copy `data` to `offset..`, stopping at the end of the buffer.
    /// Returns the number of bytes copied.
    pub fn copy_out<M: AddressSpace + ?Sized>(&self, mem: &mut M, offset: usize, data: &[u8]) -> usize {
        let n = data.len().min(self.len.saturating_sub(offset));
        if n > 0 {
            mem.copy_to_user(VirtAddr::new(self.addr.as_usize() + offset), &data[..n]);
        }
        n
    }
}

/// Validate a single user address.
///
/// The null page is never user memory, whatever the address space says.
pub fn validate_ptr<M: AddressSpace + ?Sized>(mem: &M, addr: VirtAddr) -> Result<VirtAddr, SyscallError> {
    if addr.is_null() || !mem.is_user_address(addr) {
        return Err(SyscallError::BadAddress(addr));
    }
    Ok(addr)
}

/// Validate `[ptr, ptr + len)`.
///
/// # Security Checks
/// 1. `ptr` itself is a user address, even when `len` is zero
/// 2. `ptr + len` doesn't overflow
/// 3. Every page the range touches is a user address
/// 4. The last byte is a user address
fn validate_range<M: AddressSpace + ?Sized>(mem: &M, ptr: VirtAddr, len: usize) -> Result<(), SyscallError> {
    validate_ptr(mem, ptr)?;
    if len == 0 {
        return Ok(());
    }

    let last = ptr.checked_add(len - 1).ok_or(SyscallError::BadAddress(ptr))?;

    let mut page = ptr.align_down();
    while let Some(next) = page.checked_add(PAGE_SIZE) {
        if next > last {
            break;
        }
        validate_ptr(mem, next)?;
        page = next;
    }

    validate_ptr(mem, last)?;
    Ok(())
}

/// Validate a user buffer the kernel will read from.
pub fn validate_user_read<M: AddressSpace + ?Sized>(
    mem: &M,
    ptr: VirtAddr,
    len: usize,
) -> Result<UserBuffer, SyscallError> {
    validate_range(mem, ptr, len)?;
    Ok(UserBuffer { addr: ptr, len })
}

/// Validate a user buffer the kernel will write into.
///
/// Same checks as read validation.
pub fn validate_user_write<M: AddressSpace + ?Sized>(
    mem: &M,
    ptr: VirtAddr,
    len: usize,
) -> Result<UserBufferMut, SyscallError> {
    validate_range(mem, ptr, len)?;
    Ok(UserBufferMut { addr: ptr, len })
}

/// Validate and read one little-endian call frame word.
pub fn read_word<M: AddressSpace + ?Sized>(mem: &M, addr: VirtAddr) -> Result<u32, SyscallError> {
    let slot = validate_user_read(mem, addr, WORD_SIZE)?;
    let mut bytes = [0u8; WORD_SIZE];
    slot.copy_in(mem, 0, &mut bytes);
    Ok(u32::from_le_bytes(bytes))
}

/// Copy a NUL-terminated string out of user memory, terminator excluded.
///
/// Each byte is validated before it is read. A string with no terminator
/// in the first [`MAX_STR_LEN`] bytes is rejected like a bad pointer.
pub fn read_cstr<M: AddressSpace + ?Sized>(mem: &M, ptr: VirtAddr) -> Result<Vec<u8>, SyscallError> {
    let mut bytes = Vec::new();
    for offset in 0..MAX_STR_LEN {
        let addr = ptr.checked_add(offset).ok_or(SyscallError::BadAddress(ptr))?;
        validate_ptr(mem, addr)?;
        match mem.read_byte(addr) {
            0 => return Ok(bytes),
            byte => bytes.push(byte),
        }
    }
    Err(SyscallError::BadAddress(ptr))
}
