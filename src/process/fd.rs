//! File Descriptor Table
//!
//! A per-process, fixed-size table mapping small integers to open files.
//!
//! # Design
//! - Fixed-size array of slots, each `Vacant` or `Occupied`
//! - Slots 0, 1, 2 are reserved for the standard streams and never hold a file
//! - Allocation always takes the lowest vacant slot at or above 3
//! - A slot owns its handle; taking it out of the table is the only way to
//!   get the handle back for release
//!
//! The table has no lock. It belongs to one process and is only touched
//! from that process's syscall path.

use core::fmt;

use bitflags::bitflags;

/// Number of slots in a descriptor table.
pub const FD_TABLE_SIZE: usize = 128;

/// A descriptor number known to be inside the table.
///
/// This is a newtype to prevent using arbitrary integers as slot indices.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[repr(transparent)]
pub struct Fd(u32);

impl Fd {
    /// Standard input.
    pub const STDIN: Self = Self(0);

    /// Standard output.
    pub const STDOUT: Self = Self(1);

    /// Reserved, never valid for I/O.
    pub const RESERVED: Self = Self(2);

    /// First descriptor that can name an open file.
    pub const FIRST_USER: Self = Self(3);

    /// Interpret a raw descriptor from user code.
    ///
    /// Returns None if the value is negative or past the end of the table.
    #[inline]
    pub const fn new(raw: i32) -> Option<Self> {
        if raw >= 0 && (raw as usize) < FD_TABLE_SIZE {
            Some(Self(raw as u32))
        } else {
            None
        }
    }

    /// Get the index value.
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// The value handed back to user code.
    #[inline]
    pub const fn as_raw(self) -> i32 {
        self.0 as i32
    }

    #[inline]
    pub const fn is_reserved(self) -> bool {
        self.0 < Self::FIRST_USER.0
    }
}

impl fmt::Display for Fd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fd {}", self.0)
    }
}

bitflags! {
    /// Per-handle state kept by the table alongside the file.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct HandleFlags: u32 {
        /// The handle backs the running executable; writes through it are
        /// refused.
        const DENY_WRITE = 1 << 0;
    }
}

/// An open file owned by a descriptor slot.
#[derive(Debug)]
pub struct OpenFile<F> {
    file: F,
    flags: HandleFlags,
}

impl<F> OpenFile<F> {
    pub fn new(file: F, flags: HandleFlags) -> Self {
        Self { file, flags }
    }

    #[inline]
    pub fn file(&self) -> &F {
        &self.file
    }

    #[inline]
    pub fn file_mut(&mut self) -> &mut F {
        &mut self.file
    }

    #[inline]
    pub fn is_deny_write(&self) -> bool {
        self.flags.contains(HandleFlags::DENY_WRITE)
    }

    /// Give up the slot's ownership, for release to the filesystem.
    pub fn into_file(self) -> F {
        self.file
    }
}

/// One entry of the table.
#[derive(Debug)]
pub enum Slot<F> {
    Vacant,
    Occupied(OpenFile<F>),
}

impl<F> Default for Slot<F> {
    fn default() -> Self {
        Slot::Vacant
    }
}

impl<F> Slot<F> {
    #[inline]
    pub const fn is_vacant(&self) -> bool {
        matches!(self, Slot::Vacant)
    }
}

/// Error type for descriptor table operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FdError {
    /// The descriptor is negative or past the end of the table.
    OutOfRange(i32),
    /// The descriptor is one of the standard streams.
    Reserved(Fd),
    /// Nothing is open at this descriptor.
    Vacant(Fd),
}

impl fmt::Display for FdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfRange(raw) => write!(f, "descriptor {} out of range", raw),
            Self::Reserved(fd) => write!(f, "{} is reserved", fd),
            Self::Vacant(fd) => write!(f, "{} is not open", fd),
        }
    }
}

/// Descriptor table for one process.
#[derive(Debug)]
pub struct FdTable<F> {
    slots: [Slot<F>; FD_TABLE_SIZE],
}

impl<F> FdTable<F> {
    /// Create a table with every slot vacant.
    pub fn new() -> Self {
        Self {
            slots: core::array::from_fn(|_| Slot::Vacant),
        }
    }

    /// Resolve a raw descriptor to an open file.
    pub fn lookup(&self, raw: i32) -> Result<&OpenFile<F>, FdError> {
        let fd = Self::user_fd(raw)?;
        match &self.slots[fd.index()] {
            Slot::Occupied(open) => Ok(open),
            Slot::Vacant => Err(FdError::Vacant(fd)),
        }
    }

    pub fn lookup_mut(&mut self, raw: i32) -> Result<&mut OpenFile<F>, FdError> {
        let fd = Self::user_fd(raw)?;
        match &mut self.slots[fd.index()] {
            Slot::Occupied(open) => Ok(open),
            Slot::Vacant => Err(FdError::Vacant(fd)),
        }
    }

    /// Lowest vacant descriptor at or above [`Fd::FIRST_USER`].
    pub fn find_free(&self) -> Option<Fd> {
        (Fd::FIRST_USER.index()..FD_TABLE_SIZE)
            .find(|&i| self.slots[i].is_vacant())
            .map(|i| Fd(i as u32))
    }

    /// Install `open` in the lowest vacant slot.
    ///
    /// When the table is full the file is handed back untouched so the
    /// caller can release it.
    pub fn allocate(&mut self, open: OpenFile<F>) -> Result<Fd, OpenFile<F>> {
        match self.find_free() {
            Some(fd) => {
                self.slots[fd.index()] = Slot::Occupied(open);
                Ok(fd)
            }
            None => Err(open),
        }
    }

    /// Take the open file out of its slot, leaving the slot vacant.
    pub fn remove(&mut self, raw: i32) -> Result<OpenFile<F>, FdError> {
        let fd = Self::user_fd(raw)?;
        match core::mem::take(&mut self.slots[fd.index()]) {
            Slot::Occupied(open) => Ok(open),
            Slot::Vacant => Err(FdError::Vacant(fd)),
        }
    }

    /// Empty every user slot, yielding the open files in ascending
    /// descriptor order.
    pub fn drain(&mut self) -> impl Iterator<Item = (Fd, OpenFile<F>)> + '_ {
        self.slots[Fd::FIRST_USER.index()..]
            .iter_mut()
            .enumerate()
            .filter_map(|(i, slot)| match core::mem::take(slot) {
                Slot::Occupied(open) => Some((Fd((i + Fd::FIRST_USER.index()) as u32), open)),
                Slot::Vacant => None,
            })
    }

    /// Number of open files.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| !s.is_vacant()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn user_fd(raw: i32) -> Result<Fd, FdError> {
        let fd = Fd::new(raw).ok_or(FdError::OutOfRange(raw))?;
        if fd.is_reserved() {
            return Err(FdError::Reserved(fd));
        }
        Ok(fd)
    }
}

impl<F> Default for FdTable<F> {
    fn default() -> Self {
        Self::new()
    }
}
