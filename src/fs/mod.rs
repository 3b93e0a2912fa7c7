//! Filesystem collaborator and its global lock
//!
//! The on-disk filesystem is not reentrant. Every call into it goes through
//! [`IoLock`], which owns the filesystem value outright: there is no way to
//! reach a [`FileSystem`] method without holding the lock.

mod lock;
#[cfg(test)]
pub mod memfs;

pub use lock::{IoGuard, IoLock};
#[cfg(test)]
pub use memfs::MemFs;

/// Filesystem operations the syscall layer needs.
///
/// `File` is an owned open-file handle carrying its own cursor. It is
/// released exactly once, by passing it back to [`FileSystem::close`].
pub trait FileSystem {
    type File;

    /// Create `path` with `initial_size` zero bytes. `false` if it exists
    /// or cannot be created.
    fn create(&mut self, path: &str, initial_size: u32) -> bool;

    /// Remove `path`. Handles that are already open stay usable.
    fn remove(&mut self, path: &str) -> bool;

    /// Open `path`, yielding a fresh handle positioned at offset 0.
    fn open(&mut self, path: &str) -> Option<Self::File>;

    /// Release a handle.
    fn close(&mut self, file: Self::File);

    /// Read at the handle's cursor and advance it. Short at end of file.
    fn read(&mut self, file: &mut Self::File, buf: &mut [u8]) -> usize;

    /// Write at the handle's cursor and advance it. Returns 0 when writes
    /// to the underlying file are denied.
    fn write(&mut self, file: &mut Self::File, buf: &[u8]) -> usize;

    /// Move the cursor. Positions past end of file are allowed.
    fn seek(&mut self, file: &mut Self::File, position: u32);

    fn tell(&mut self, file: &Self::File) -> u32;

    /// Size of the file in bytes.
    fn length(&mut self, file: &Self::File) -> u32;

    /// Deny writes to the file behind `file` until that handle is closed.
    fn deny_write(&mut self, file: &mut Self::File);
}
