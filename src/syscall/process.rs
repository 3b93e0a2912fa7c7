//! Process-control syscalls and the two protocol exercises

use core::str;

use log::{info, warn};

use super::handler::{Completion, Syscalls};
use crate::fs::FileSystem;
use crate::process::{Pid, Process, PID_ERROR};

impl<FS: FileSystem> Syscalls<FS> {
    pub(super) fn sys_halt(&self, process: &Process<FS::File>) -> Completion {
        info!("[SYSCALL] {} (pid {}): halt", process.name(), process.pid());
        self.devices.power.power_off();
        Completion::PowerOff
    }

    pub(super) fn sys_exit(&self, process: &mut Process<FS::File>, status: i32) -> Completion {
        Completion::Exited(self.exit(process, status))
    }

    pub(super) fn sys_exec(&self, cmd_line: &[u8]) -> Completion {
        let Ok(cmd_line) = str::from_utf8(cmd_line) else {
            return Completion::int(PID_ERROR);
        };
        match self.procs.execute(cmd_line) {
            Some(pid) => Completion::int(pid),
            None => {
                warn!("[SYSCALL] exec {:?} failed", cmd_line);
                Completion::int(PID_ERROR)
            }
        }
    }

    pub(super) fn sys_wait(&self, pid: Pid) -> Completion {
        Completion::int(self.procs.wait(pid))
    }
}

/// The `n`th Fibonacci number, 1-indexed: 1, 1, 2, 3, 5, 8, ...
///
/// Anything below 3, zero and negatives included, gives 1. Overflow wraps.
pub fn fibonacci(n: i32) -> i32 {
    let (mut prev, mut cur) = (1i32, 1i32);
    for _ in 2..n {
        (prev, cur) = (cur, prev.wrapping_add(cur));
    }
    cur
}

/// Sum of four integers with two's-complement wraparound.
pub fn sum4(a: i32, b: i32, c: i32, d: i32) -> i32 {
    a.wrapping_add(b).wrapping_add(c).wrapping_add(d)
}
