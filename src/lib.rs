//! userprog - User Program Boundary for a Teaching Kernel
//!
//! Everything a user process can ask of the kernel passes through here.
//!
//! # Responsibilities
//! - Decode the raw call frame pushed by user code into a typed request
//! - Validate every user pointer before the kernel touches it
//! - Own the per-process file descriptor table
//! - Run the exit protocol: record status, report it, drain descriptors
//!
//! # Collaborators
//! The scheduler, the memory subsystem, the filesystem and the devices are
//! not implemented here. They are reached through the traits in
//! [`process`], [`mm`], [`fs`] and [`drivers`].
//!
//! # Security Model
//! - Whitelist dispatch: unknown syscall numbers kill the caller
//! - Bad pointers and dead descriptors kill the caller with status -1
//! - Filesystem access is serialized behind one lock that is never held
//!   across a process kill

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_op_in_unsafe_fn)]

extern crate alloc;

pub mod drivers;
pub mod fs;
pub mod mm;
pub mod process;
pub mod syscall;

#[cfg(test)]
mod testing;

pub use process::{Pid, Process, ProcessControl};
pub use syscall::{Flow, IntrFrame, SyscallError, Syscalls};
