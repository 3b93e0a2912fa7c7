//! Syscall numbers, arities and request decoding
//!
//! Decoding is all-or-nothing: every slot the call needs, and every buffer
//! or string those slots point at, is validated before a [`Request`] exists.
//! A handler that receives a `Request` never faults on user memory.

use alloc::vec::Vec;

use super::frame::CallFrame;
use super::handler::SyscallError;
use super::validate::{self, UserBuffer, UserBufferMut};
use crate::mm::{AddressSpace, VirtAddr};
use crate::process::Pid;

/// System call numbers
pub mod numbers {
    pub const SYS_HALT: u32 = 0;
    pub const SYS_EXIT: u32 = 1;
    pub const SYS_EXEC: u32 = 2;
    pub const SYS_WAIT: u32 = 3;
    pub const SYS_CREATE: u32 = 4;
    pub const SYS_REMOVE: u32 = 5;
    pub const SYS_OPEN: u32 = 6;
    pub const SYS_FILESIZE: u32 = 7;
    pub const SYS_READ: u32 = 8;
    pub const SYS_WRITE: u32 = 9;
    pub const SYS_SEEK: u32 = 10;
    pub const SYS_TELL: u32 = 11;
    pub const SYS_CLOSE: u32 = 12;
    // 13..=19 belong to virtual memory and directory calls.
    pub const SYS_FIBONACCI: u32 = 20;
    pub const SYS_SUM4: u32 = 21;
}

/// Most arguments any syscall takes.
pub const MAX_ARGS: usize = 4;

/// Every syscall the dispatcher knows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Syscall {
    Halt,
    Exit,
    Exec,
    Wait,
    Create,
    Remove,
    Open,
    Filesize,
    Read,
    Write,
    Seek,
    Tell,
    Close,
    Fibonacci,
    Sum4,
}

impl Syscall {
    pub const fn from_number(number: u32) -> Option<Self> {
        use self::numbers::*;
        Some(match number {
            SYS_HALT => Self::Halt,
            SYS_EXIT => Self::Exit,
            SYS_EXEC => Self::Exec,
            SYS_WAIT => Self::Wait,
            SYS_CREATE => Self::Create,
            SYS_REMOVE => Self::Remove,
            SYS_OPEN => Self::Open,
            SYS_FILESIZE => Self::Filesize,
            SYS_READ => Self::Read,
            SYS_WRITE => Self::Write,
            SYS_SEEK => Self::Seek,
            SYS_TELL => Self::Tell,
            SYS_CLOSE => Self::Close,
            SYS_FIBONACCI => Self::Fibonacci,
            SYS_SUM4 => Self::Sum4,
            _ => return None,
        })
    }

    /// Number of argument slots following the syscall number.
    pub const fn arity(self) -> usize {
        match self {
            Self::Halt => 0,
            Self::Exit
            | Self::Exec
            | Self::Wait
            | Self::Remove
            | Self::Open
            | Self::Filesize
            | Self::Tell
            | Self::Close
            | Self::Fibonacci => 1,
            Self::Create | Self::Seek => 2,
            Self::Read | Self::Write => 3,
            Self::Sum4 => 4,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Halt => "halt",
            Self::Exit => "exit",
            Self::Exec => "exec",
            Self::Wait => "wait",
            Self::Create => "create",
            Self::Remove => "remove",
            Self::Open => "open",
            Self::Filesize => "filesize",
            Self::Read => "read",
            Self::Write => "write",
            Self::Seek => "seek",
            Self::Tell => "tell",
            Self::Close => "close",
            Self::Fibonacci => "fibonacci",
            Self::Sum4 => "sum4",
        }
    }
}

/// A fully validated syscall with typed arguments.
///
/// Strings are already copied into the kernel. Buffers are validated
/// ranges that are copied in chunks by the handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Halt,
    Exit { status: i32 },
    Exec { cmd_line: Vec<u8> },
    Wait { pid: Pid },
    Create { path: Vec<u8>, initial_size: u32 },
    Remove { path: Vec<u8> },
    Open { path: Vec<u8> },
    Filesize { fd: i32 },
    Read { fd: i32, buf: UserBufferMut },
    Write { fd: i32, buf: UserBuffer },
    Seek { fd: i32, position: u32 },
    Tell { fd: i32 },
    Close { fd: i32 },
    Fibonacci { n: i32 },
    Sum4 { a: i32, b: i32, c: i32, d: i32 },
}

impl Request {
    /// Decode the call frame at `frame`.
    ///
    /// Order of checks: number slot, number known, every argument slot,
    /// then pointees.
    pub fn decode<M: AddressSpace + ?Sized>(frame: &CallFrame<'_, M>) -> Result<Self, SyscallError> {
        let number = frame.number()?;
        let call = Syscall::from_number(number).ok_or(SyscallError::UnknownSyscall(number))?;

        let mut w = [0u32; MAX_ARGS];
        for (index, slot) in w.iter_mut().enumerate().take(call.arity()) {
            *slot = frame.arg(index)?;
        }

        let mem = frame.mem();
        let ptr = |word: u32| VirtAddr::new(word as usize);

        Ok(match call {
            Syscall::Halt => Self::Halt,
            Syscall::Exit => Self::Exit { status: w[0] as i32 },
            Syscall::Exec => Self::Exec {
                cmd_line: validate::read_cstr(mem, ptr(w[0]))?,
            },
            Syscall::Wait => Self::Wait { pid: w[0] as Pid },
            Syscall::Create => Self::Create {
                path: validate::read_cstr(mem, ptr(w[0]))?,
                initial_size: w[1],
            },
            Syscall::Remove => Self::Remove {
                path: validate::read_cstr(mem, ptr(w[0]))?,
            },
            Syscall::Open => Self::Open {
                path: validate::read_cstr(mem, ptr(w[0]))?,
            },
            Syscall::Filesize => Self::Filesize { fd: w[0] as i32 },
            Syscall::Read => Self::Read {
                fd: w[0] as i32,
                buf: validate::validate_user_write(mem, ptr(w[1]), w[2] as usize)?,
            },
            Syscall::Write => Self::Write {
                fd: w[0] as i32,
                buf: validate::validate_user_read(mem, ptr(w[1]), w[2] as usize)?,
            },
            Syscall::Seek => Self::Seek {
                fd: w[0] as i32,
                position: w[1],
            },
            Syscall::Tell => Self::Tell { fd: w[0] as i32 },
            Syscall::Close => Self::Close { fd: w[0] as i32 },
            Syscall::Fibonacci => Self::Fibonacci { n: w[0] as i32 },
            Syscall::Sum4 => Self::Sum4 {
                a: w[0] as i32,
                b: w[1] as i32,
                c: w[2] as i32,
                d: w[3] as i32,
            },
        })
    }

    pub fn syscall(&self) -> Syscall {
        match self {
            Self::Halt => Syscall::Halt,
            Self::Exit { .. } => Syscall::Exit,
            Self::Exec { .. } => Syscall::Exec,
            Self::Wait { .. } => Syscall::Wait,
            Self::Create { .. } => Syscall::Create,
            Self::Remove { .. } => Syscall::Remove,
            Self::Open { .. } => Syscall::Open,
            Self::Filesize { .. } => Syscall::Filesize,
            Self::Read { .. } => Syscall::Read,
            Self::Write { .. } => Syscall::Write,
            Self::Seek { .. } => Syscall::Seek,
            Self::Tell { .. } => Syscall::Tell,
            Self::Close { .. } => Syscall::Close,
            Self::Fibonacci { .. } => Syscall::Fibonacci,
            Self::Sum4 { .. } => Syscall::Sum4,
        }
    }
}
