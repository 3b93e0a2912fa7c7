//! System Call Handler
//!
//! Decodes a call frame, dispatches it and turns the outcome into either a
//! return value in `eax` or the death of the caller.
//!
//! # Security Considerations
//! - Decoding validates every slot and pointee before any handler runs, so
//!   a rejected call has no side effects
//! - Handlers return `Err(SyscallError)` for protocol violations; the
//!   dispatcher answers every such error with exit(-1)
//! - The I/O lock is released before the exit protocol starts

use core::fmt;

use log::{debug, warn};

use super::abi::Request;
use super::frame::{CallFrame, IntrFrame};
use crate::drivers::Devices;
use crate::fs::{FileSystem, IoLock};
use crate::mm::{AddressSpace, VirtAddr};
use crate::process::{self, FdError, Process, ProcessControl, ProcessState};

/// Fatal syscall errors.
///
/// None of these reach user code as a value: each one terminates the
/// caller with [`SyscallError::EXIT_STATUS`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyscallError {
    /// Pointer outside the caller's user region, or a string that never
    /// terminates.
    BadAddress(VirtAddr),
    /// Descriptor that does not name an open file.
    BadDescriptor(FdError),
    /// Syscall number with no handler.
    UnknownSyscall(u32),
}

impl SyscallError {
    /// Exit status of a process killed by a fatal syscall error.
    pub const EXIT_STATUS: i32 = -1;
}

impl fmt::Display for SyscallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadAddress(addr) => write!(f, "bad user address {}", addr),
            Self::BadDescriptor(err) => write!(f, "bad descriptor: {}", err),
            Self::UnknownSyscall(number) => write!(f, "unknown syscall {}", number),
        }
    }
}

impl From<FdError> for SyscallError {
    fn from(err: FdError) -> Self {
        Self::BadDescriptor(err)
    }
}

/// What a handler produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// Store this in `eax` and resume.
    Value(u32),
    /// Resume without touching `eax`.
    Void,
    /// The caller ran the exit protocol.
    Exited(i32),
    /// The machine is powering off.
    PowerOff,
}

impl Completion {
    #[inline]
    pub const fn int(value: i32) -> Self {
        Self::Value(value as u32)
    }

    #[inline]
    pub const fn bool(value: bool) -> Self {
        Self::Value(value as u32)
    }
}

/// What the trap glue should do once [`Syscalls::handle`] returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Return to user mode.
    Resume,
    /// The process has exited; schedule something else.
    Exited(i32),
    /// Power is being cut; nothing else should run.
    PowerOff,
}

/// The syscall dispatcher.
///
/// One instance serves every process. Per-process state arrives with each
/// call, so the same process can never be inside two syscalls at once.
pub struct Syscalls<FS: FileSystem> {
    pub(super) io: IoLock<FS>,
    pub(super) procs: &'static (dyn ProcessControl + Sync),
    pub(super) devices: Devices,
}

impl<FS: FileSystem> Syscalls<FS> {
    /// Set up the dispatcher. The filesystem moves behind the global I/O
    /// lock here and is only reachable through it afterwards.
    pub const fn new(fs: FS, procs: &'static (dyn ProcessControl + Sync), devices: Devices) -> Self {
        Self {
            io: IoLock::new(fs),
            procs,
            devices,
        }
    }

    /// The global I/O lock.
    pub fn io(&self) -> &IoLock<FS> {
        &self.io
    }

    /// Trap entry: service the syscall described by `frame` for `process`.
    ///
    /// `mem` is the caller's address space. On [`Flow::Resume`], `frame.eax`
    /// holds the result of value-returning calls.
    pub fn handle<M: AddressSpace + ?Sized>(
        &self,
        process: &mut Process<FS::File>,
        mem: &mut M,
        frame: &mut IntrFrame,
    ) -> Flow {
        if let ProcessState::Exited(status) = process.state() {
            warn!("[SYSCALL] {}: syscall after exit ignored", process.name());
            return Flow::Exited(status);
        }

        let request = match Request::decode(&CallFrame::new(&*mem, frame.esp)) {
            Ok(request) => request,
            Err(err) => return self.kill(process, err),
        };
        debug!("[SYSCALL] {}: {:?}", process.name(), request);

        match self.dispatch(process, mem, request) {
            Ok(Completion::Value(value)) => {
                frame.eax = value;
                Flow::Resume
            }
            Ok(Completion::Void) => Flow::Resume,
            Ok(Completion::Exited(status)) => Flow::Exited(status),
            Ok(Completion::PowerOff) => Flow::PowerOff,
            Err(err) => self.kill(process, err),
        }
    }

    /// Dispatch a decoded request.
    ///
    /// # Returns
    /// The handler's completion, or the fatal error that must end `process`.
    pub fn dispatch<M: AddressSpace + ?Sized>(
        &self,
        process: &mut Process<FS::File>,
        mem: &mut M,
        request: Request,
    ) -> Result<Completion, SyscallError> {
        match request {
            Request::Halt => Ok(self.sys_halt(process)),
            Request::Exit { status } => Ok(self.sys_exit(process, status)),
            Request::Exec { cmd_line } => Ok(self.sys_exec(&cmd_line)),
            Request::Wait { pid } => Ok(self.sys_wait(pid)),
            Request::Create { path, initial_size } => Ok(self.sys_create(&path, initial_size)),
            Request::Remove { path } => Ok(self.sys_remove(&path)),
            Request::Open { path } => Ok(self.sys_open(process, &path)),
            Request::Filesize { fd } => self.sys_filesize(process, fd),
            Request::Read { fd, buf } => self.sys_read(process, mem, fd, buf),
            Request::Write { fd, buf } => self.sys_write(process, &*mem, fd, buf),
            Request::Seek { fd, position } => self.sys_seek(process, fd, position),
            Request::Tell { fd } => self.sys_tell(process, fd),
            Request::Close { fd } => self.sys_close(process, fd),
            Request::Fibonacci { n } => Ok(Completion::int(super::fibonacci(n))),
            Request::Sum4 { a, b, c, d } => Ok(Completion::int(super::sum4(a, b, c, d))),
        }
    }

    /// Run the exit protocol for `process` with `status`.
    pub fn exit(&self, process: &mut Process<FS::File>, status: i32) -> i32 {
        process::exit(process, status, &self.io, self.devices.console, self.procs)
    }

    /// Terminate `process` for a protocol violation.
    fn kill(&self, process: &mut Process<FS::File>, err: SyscallError) -> Flow {
        warn!(
            "[SYSCALL] {} (pid {}): {}, terminating",
            process.name(),
            process.pid(),
            err
        );
        Flow::Exited(self.exit(process, SyscallError::EXIT_STATUS))
    }
}
