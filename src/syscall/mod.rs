//! System Call Interface
//!
//! Entry point for every request a user program makes of the kernel.
//!
//! # Calling Convention
//! User code pushes the syscall number and its arguments as 32-bit words
//! on its own stack and traps through vector [`SYSCALL_VECTOR`]. The trap
//! glue hands the saved stack pointer to [`Syscalls::handle`] in an
//! [`IntrFrame`]; the result comes back in `eax`.
//!
//! ```text
//! esp + 12  arg 2
//! esp +  8  arg 1
//! esp +  4  arg 0
//! esp       syscall number
//! ```
//!
//! # Security Model
//! - Whitelist approach: only the numbers in [`abi::numbers`] are accepted;
//!   anything else kills the caller
//! - Every stack slot and every pointed-to buffer is validated before it is
//!   read, and all of it before the handler starts
//! - A bad pointer or a dead descriptor is fatal: the caller exits with -1
//!
//! # Current Syscalls
//! halt, exit, exec, wait, create, remove, open, filesize, read, write,
//! seek, tell, close, plus the fibonacci and sum4 protocol exercises.

pub mod abi;
mod file;
mod frame;
mod handler;
mod process;
pub mod validate;

pub use abi::{Request, Syscall};
pub use frame::{CallFrame, IntrFrame};
pub use handler::{Completion, Flow, SyscallError, Syscalls};
pub use process::{fibonacci, sum4};
pub use validate::{UserBuffer, UserBufferMut};

/// Interrupt vector user programs trap through.
pub const SYSCALL_VECTOR: u8 = 0x30;
