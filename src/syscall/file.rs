//! File and standard-stream syscalls
//!
//! Descriptor 0 is the keyboard, 1 is the console, 2 is reserved. Everything
//! from 3 up names a filesystem handle in the caller's table.
//!
//! Every handler that does I/O holds the I/O lock for its whole duration,
//! standard streams included, so one process's console write is never
//! interleaved with another's. A dead descriptor returns `Err` with the
//! guard still on the stack, so the lock is dropped before the caller is
//! killed.

use core::str;

use log::{debug, warn};

use super::handler::{Completion, SyscallError, Syscalls};
use super::validate::{UserBuffer, UserBufferMut};
use crate::fs::FileSystem;
use crate::mm::AddressSpace;
use crate::process::{Fd, HandleFlags, OpenFile, Process};

/// Bounce buffer size for moving file data across the user boundary.
const CHUNK_SIZE: usize = 512;

/// Returned by `open`, `read` and `write` on failure.
const FAILURE: i32 = -1;

impl<FS: FileSystem> Syscalls<FS> {
    pub(super) fn sys_create(&self, path: &[u8], initial_size: u32) -> Completion {
        let Ok(path) = str::from_utf8(path) else {
            return Completion::bool(false);
        };
        Completion::bool(self.io.lock().create(path, initial_size))
    }

    pub(super) fn sys_remove(&self, path: &[u8]) -> Completion {
        let Ok(path) = str::from_utf8(path) else {
            return Completion::bool(false);
        };
        Completion::bool(self.io.lock().remove(path))
    }

    /// Open system call
    ///
    /// # Arguments
    /// * `process` - Caller, whose table receives the handle
    /// * `path` - Path already copied out of user memory
    ///
    /// # Returns
    /// The lowest free descriptor at or above 3, or -1 when the path does
    /// not resolve or the table is full.
    ///
    /// # Security
    /// - Opening the caller's own executable denies writes to it until the
    ///   handle is closed
    /// - On a full table the fresh handle is closed again, never leaked
    pub(super) fn sys_open(&self, process: &mut Process<FS::File>, path: &[u8]) -> Completion {
        let Ok(path) = str::from_utf8(path) else {
            return Completion::int(FAILURE);
        };

        let mut fs = self.io.lock();
        let Some(mut file) = fs.open(path) else {
            return Completion::int(FAILURE);
        };

        let mut flags = HandleFlags::empty();
        if process.is_own_image(path) {
            fs.deny_write(&mut file);
            flags |= HandleFlags::DENY_WRITE;
        }

        match process.fds_mut().allocate(OpenFile::new(file, flags)) {
            Ok(fd) => {
                debug!("[SYSCALL] {}: open {:?} -> {}", process.name(), path, fd);
                Completion::int(fd.as_raw())
            }
            Err(open) => {
                warn!("[SYSCALL] {}: descriptor table full", process.name());
                fs.close(open.into_file());
                Completion::int(FAILURE)
            }
        }
    }

    pub(super) fn sys_filesize(
        &self,
        process: &mut Process<FS::File>,
        fd: i32,
    ) -> Result<Completion, SyscallError> {
        let mut fs = self.io.lock();
        let open = process.fds().lookup(fd)?;
        Ok(Completion::int(fs.length(open.file()) as i32))
    }

    /// Read system call
    ///
    /// # Arguments
    /// * `fd` - 0 for the keyboard, or an open file
    /// * `buf` - Destination, validated during decoding
    ///
    /// # Returns
    /// Bytes actually read; -1 for descriptors 1 and 2.
    ///
    /// # Security
    /// - A vacant or out-of-range descriptor is fatal
    /// - Data is bounced through a kernel buffer and never written past
    ///   the validated range
    pub(super) fn sys_read<M: AddressSpace + ?Sized>(
        &self,
        process: &mut Process<FS::File>,
        mem: &mut M,
        fd: i32,
        buf: UserBufferMut,
    ) -> Result<Completion, SyscallError> {
        if fd == Fd::STDOUT.as_raw() || fd == Fd::RESERVED.as_raw() {
            return Ok(Completion::int(FAILURE));
        }

        let mut fs = self.io.lock();
        if fd == Fd::STDIN.as_raw() {
            return Ok(Completion::int(self.read_keyboard(mem, buf) as i32));
        }
        let open = process.fds_mut().lookup_mut(fd)?;

        let mut chunk = [0u8; CHUNK_SIZE];
        let mut total = 0;
        while total < buf.len() {
            let want = CHUNK_SIZE.min(buf.len() - total);
            let got = fs.read(open.file_mut(), &mut chunk[..want]);
            total += buf.copy_out(mem, total, &chunk[..got]);
            if got < want {
                break;
            }
        }
        Ok(Completion::int(total as i32))
    }

    /// Write system call
    ///
    /// # Arguments
    /// * `fd` - 1 for the console, or an open file
    /// * `buf` - Source, validated during decoding
    ///
    /// # Returns
    /// Bytes actually written: all of them for the console, the
    /// filesystem's count for files, 0 for a write-denied handle, -1 for
    /// descriptors 0 and 2.
    ///
    /// # Security
    /// - A vacant or out-of-range descriptor is fatal
    /// - A handle on the caller's running image is never written; the
    ///   filesystem is not even called
    pub(super) fn sys_write<M: AddressSpace + ?Sized>(
        &self,
        process: &mut Process<FS::File>,
        mem: &M,
        fd: i32,
        buf: UserBuffer,
    ) -> Result<Completion, SyscallError> {
        if fd == Fd::STDIN.as_raw() || fd == Fd::RESERVED.as_raw() {
            return Ok(Completion::int(FAILURE));
        }

        let pid = process.pid();
        let mut fs = self.io.lock();
        if fd == Fd::STDOUT.as_raw() {
            self.write_console(mem, buf);
            return Ok(Completion::int(buf.len() as i32));
        }
        let open = process.fds_mut().lookup_mut(fd)?;
        if open.is_deny_write() {
            debug!("[SYSCALL] pid {}: write to running image via fd {} refused", pid, fd);
            return Ok(Completion::int(0));
        }

        let mut chunk = [0u8; CHUNK_SIZE];
        let mut total = 0;
        while total < buf.len() {
            let n = buf.copy_in(mem, total, &mut chunk);
            let put = fs.write(open.file_mut(), &chunk[..n]);
            total += put;
            if put < n {
                break;
            }
        }
        Ok(Completion::int(total as i32))
    }

    pub(super) fn sys_seek(
        &self,
        process: &mut Process<FS::File>,
        fd: i32,
        position: u32,
    ) -> Result<Completion, SyscallError> {
        let mut fs = self.io.lock();
        let open = process.fds_mut().lookup_mut(fd)?;
        fs.seek(open.file_mut(), position);
        Ok(Completion::Void)
    }

    pub(super) fn sys_tell(
        &self,
        process: &mut Process<FS::File>,
        fd: i32,
    ) -> Result<Completion, SyscallError> {
        let mut fs = self.io.lock();
        let open = process.fds().lookup(fd)?;
        Ok(Completion::Value(fs.tell(open.file())))
    }

    /// Close system call
    ///
    /// # Arguments
    /// * `fd` - Descriptor to release
    ///
    /// # Security
    /// - Descriptors 0, 1, 2, vacant slots and out-of-range values are
    ///   fatal, so a handle can never be released twice
    pub(super) fn sys_close(
        &self,
        process: &mut Process<FS::File>,
        fd: i32,
    ) -> Result<Completion, SyscallError> {
        let mut fs = self.io.lock();
        let open = process.fds_mut().remove(fd)?;
        fs.close(open.into_file());
        Ok(Completion::Void)
    }

    /// Fill `buf` from the keyboard until it is full or input runs dry.
    ///
    /// Called with the I/O lock held.
    fn read_keyboard<M: AddressSpace + ?Sized>(&self, mem: &mut M, buf: UserBufferMut) -> usize {
        let mut chunk = [0u8; CHUNK_SIZE];
        let mut total = 0;
        while total < buf.len() {
            let want = CHUNK_SIZE.min(buf.len() - total);
            let mut got = 0;
            while got < want {
                match self.devices.keyboard.read_byte() {
                    Some(byte) => {
                        chunk[got] = byte;
                        got += 1;
                    }
                    None => break,
                }
            }
            total += buf.copy_out(mem, total, &chunk[..got]);
            if got < want {
                break;
            }
        }
        total
    }

    /// Called with the I/O lock held.
    fn write_console<M: AddressSpace + ?Sized>(&self, mem: &M, buf: UserBuffer) {
        let mut chunk = [0u8; CHUNK_SIZE];
        let mut offset = 0;
        while offset < buf.len() {
            let n = buf.copy_in(mem, offset, &mut chunk);
            self.devices.console.write_bytes(&chunk[..n]);
            offset += n;
        }
    }
}
