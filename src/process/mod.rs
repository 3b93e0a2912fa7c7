//! Process state owned by the syscall layer
//!
//! The scheduler owns threads and address spaces. What lives here is the
//! part of a process this layer is responsible for: its name, its exit
//! status cell and its descriptor table.
//!
//! # Lifecycle
//! ```text
//! Running ──exit(status) / fatal fault──▶ Exited(status)
//! ```
//! Once exited, a process has no open descriptors and no further syscalls
//! are dispatched for it.

pub mod exit;
pub mod fd;

use alloc::string::{String, ToString};

pub use exit::exit;
pub use fd::{Fd, FdError, FdTable, HandleFlags, OpenFile, FD_TABLE_SIZE};

/// Process identifier as seen by user code.
pub type Pid = i32;

/// Returned by `exec` when the child could not be started.
pub const PID_ERROR: Pid = -1;

/// Scheduler-side process control.
pub trait ProcessControl {
    /// Start a new process running `cmd_line`. `None` if it could not be
    /// loaded.
    fn execute(&self, cmd_line: &str) -> Option<Pid>;

    /// Block until child `pid` exits and return its status, or -1 if `pid`
    /// is not a waitable child.
    fn wait(&self, pid: Pid) -> i32;

    /// Tear down `pid` after its exit protocol has run. The exit status is
    /// already recorded; waiters can collect it from here on.
    fn terminate(&self, pid: Pid, status: i32);
}

/// Coarse process state, derived from the exit status cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    Running,
    Exited(i32),
}

/// A user process, as far as the syscall layer is concerned.
#[derive(Debug)]
pub struct Process<F> {
    name: String,
    pid: Pid,
    exit_status: Option<i32>,
    fds: FdTable<F>,
}

impl<F> Process<F> {
    pub fn new(name: &str, pid: Pid) -> Self {
        Self {
            name: name.to_string(),
            pid,
            exit_status: None,
            fds: FdTable::new(),
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn pid(&self) -> Pid {
        self.pid
    }

    /// Recorded exit status; `None` while running.
    #[inline]
    pub fn exit_status(&self) -> Option<i32> {
        self.exit_status
    }

    pub fn state(&self) -> ProcessState {
        match self.exit_status {
            Some(status) => ProcessState::Exited(status),
            None => ProcessState::Running,
        }
    }

    #[inline]
    pub fn fds(&self) -> &FdTable<F> {
        &self.fds
    }

    #[inline]
    pub fn fds_mut(&mut self) -> &mut FdTable<F> {
        &mut self.fds
    }

    /// Does `path` name this process's own executable?
    pub fn is_own_image(&self, path: &str) -> bool {
        self.name == path
    }

    pub(crate) fn set_exit_status(&mut self, status: i32) {
        self.exit_status = Some(status);
    }
}
