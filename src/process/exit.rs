//! Process exit protocol
//!
//! Runs for a voluntary `exit(status)` and for every fatal fault (status -1):
//! 1. Record the status in the process
//! 2. Print `"<name>: exit(<status>)"` on the console, under the I/O lock
//! 3. Close every open descriptor, lowest first, each handle exactly once
//! 4. Hand the process back to the scheduler for teardown
//!
//! The sweep is internal cleanup. It cannot fault, so a broken descriptor
//! can never turn an exit into a second exit.

use log::{debug, info};

use super::{Process, ProcessControl};
use crate::console_println;
use crate::drivers::Console;
use crate::fs::{FileSystem, IoLock};

/// Run the exit protocol for `process`. Returns the recorded status.
///
/// Exiting an already exited process changes nothing and returns the
/// status recorded the first time.
///
/// The caller must not hold `io`.
pub fn exit<FS: FileSystem>(
    process: &mut Process<FS::File>,
    status: i32,
    io: &IoLock<FS>,
    console: &dyn Console,
    procs: &dyn ProcessControl,
) -> i32 {
    if let Some(recorded) = process.exit_status() {
        debug!("[EXIT] {} already exited with {}", process.name(), recorded);
        return recorded;
    }

    process.set_exit_status(status);

    let pid = process.pid();
    let mut closed = 0usize;
    {
        let mut fs = io.lock();
        console_println!(console, "{}: exit({})", process.name(), status);
        for (fd, open) in process.fds_mut().drain() {
            debug!("[EXIT] pid {}: closing {}", pid, fd);
            fs.close(open.into_file());
            closed += 1;
        }
    }

    info!(
        "[EXIT] {} (pid {}) exited with {}, {} descriptor(s) closed",
        process.name(),
        pid,
        status,
        closed
    );

    procs.terminate(pid, status);
    status
}
