//! Global I/O serialization
//!
//! One spinlock guards the whole filesystem. The guard is an RAII value, so
//! every return path out of a syscall handler releases it, including the
//! early `?` returns that end in a process kill.

use spin::{Mutex, MutexGuard};

use super::FileSystem;

/// Held access to the filesystem.
pub type IoGuard<'a, FS> = MutexGuard<'a, FS>;

/// The single mutual-exclusion domain around all filesystem calls.
pub struct IoLock<FS: FileSystem> {
    fs: Mutex<FS>,
}

impl<FS: FileSystem> IoLock<FS> {
    pub const fn new(fs: FS) -> Self {
        Self { fs: Mutex::new(fs) }
    }

    /// Acquire the lock, spinning until it is free.
    #[inline]
    pub fn lock(&self) -> IoGuard<'_, FS> {
        self.fs.lock()
    }

    /// Whether some context currently holds the lock.
    ///
    /// Only meaningful as a diagnostic; the answer may be stale by the
    /// time it is read.
    #[inline]
    pub fn is_locked(&self) -> bool {
        self.fs.is_locked()
    }
}
