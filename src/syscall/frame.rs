//! Trap frame and call frame access

use super::handler::SyscallError;
use super::validate::{read_word, WORD_SIZE};
use crate::mm::{AddressSpace, VirtAddr};

/// The part of the saved register state the syscall layer uses.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IntrFrame {
    /// User stack pointer at the time of the trap; points at the call frame.
    pub esp: u32,
    /// Return value register.
    pub eax: u32,
}

impl IntrFrame {
    pub const fn new(esp: u32) -> Self {
        Self { esp, eax: 0 }
    }
}

/// Read-only view of the untrusted call frame on the user stack.
///
/// Every accessor validates the slot it reads.
pub struct CallFrame<'m, M: AddressSpace + ?Sized> {
    mem: &'m M,
    esp: VirtAddr,
}

impl<'m, M: AddressSpace + ?Sized> CallFrame<'m, M> {
    pub fn new(mem: &'m M, esp: u32) -> Self {
        Self {
            mem,
            esp: VirtAddr::new(esp as usize),
        }
    }

    #[inline]
    pub fn mem(&self) -> &'m M {
        self.mem
    }

    /// The syscall number in slot 0.
    pub fn number(&self) -> Result<u32, SyscallError> {
        read_word(self.mem, self.esp)
    }

    /// Argument `index`, counted from the slot after the number.
    pub fn arg(&self, index: usize) -> Result<u32, SyscallError> {
        let addr = (index + 1)
            .checked_mul(WORD_SIZE)
            .and_then(|offset| self.esp.checked_add(offset))
            .ok_or(SyscallError::BadAddress(self.esp))?;
        read_word(self.mem, addr)
    }
}
