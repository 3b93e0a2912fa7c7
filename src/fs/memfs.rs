//! In-memory filesystem for host tests
//!
//! A flat, fixed-size-file filesystem with the semantics the syscall layer
//! expects from the real one: files keep the size they were created with,
//! writes past the end are short, deny-write is counted per inode and lifted
//! when the denying handle closes.
//!
//! Every handle carries a unique id and every close is recorded, so a
//! release of the same handle twice, or a handle that is never released,
//! is observable.

use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};
use alloc::vec;
use alloc::vec::Vec;

use super::FileSystem;

type InodeId = u64;

/// Largest file `create` will make. Backing storage is allocated eagerly.
pub const MAX_FILE_SIZE: u32 = 1 << 20;

/// Identity of an open-file handle, unique for the filesystem's lifetime.
pub type HandleId = u64;

#[derive(Debug)]
struct Inode {
    data: Vec<u8>,
    deny_write_count: u32,
}

/// An open file on a [`MemFs`].
///
/// Deliberately neither `Clone` nor `Copy`: a handle has one owner.
#[derive(Debug)]
pub struct MemFile {
    id: HandleId,
    inode: InodeId,
    pos: u32,
    denies_write: bool,
}

impl MemFile {
    pub fn id(&self) -> HandleId {
        self.id
    }

    pub fn denies_write(&self) -> bool {
        self.denies_write
    }
}

#[derive(Debug, Default)]
pub struct MemFs {
    names: BTreeMap<String, InodeId>,
    inodes: BTreeMap<InodeId, Inode>,
    next_inode: InodeId,
    next_handle: HandleId,
    live: Vec<HandleId>,
    closed: Vec<HandleId>,
}

impl MemFs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a filesystem holding one file per `(name, contents)` pair.
    pub fn with_files<'a>(files: impl IntoIterator<Item = (&'a str, &'a [u8])>) -> Self {
        let mut fs = Self::new();
        for (name, contents) in files {
            fs.insert(name, contents.to_vec());
        }
        fs
    }

    fn insert(&mut self, name: &str, data: Vec<u8>) {
        let inode = self.next_inode;
        self.next_inode += 1;
        self.inodes.insert(
            inode,
            Inode {
                data,
                deny_write_count: 0,
            },
        );
        self.names.insert(name.to_string(), inode);
    }

    /// Contents of the file currently named `path`.
    pub fn contents(&self, path: &str) -> Option<&[u8]> {
        let inode = self.names.get(path)?;
        self.inodes.get(inode).map(|i| i.data.as_slice())
    }

    pub fn exists(&self, path: &str) -> bool {
        self.names.contains_key(path)
    }

    /// Handles opened and not yet closed.
    pub fn open_handles(&self) -> usize {
        self.live.len()
    }

    /// How many times the handle `id` has been closed.
    pub fn close_count(&self, id: HandleId) -> usize {
        self.closed.iter().filter(|&&c| c == id).count()
    }

    /// Every close, in order.
    pub fn close_log(&self) -> &[HandleId] {
        &self.closed
    }

    pub fn is_write_denied(&self, path: &str) -> bool {
        self.names
            .get(path)
            .and_then(|inode| self.inodes.get(inode))
            .is_some_and(|inode| inode.deny_write_count > 0)
    }

    fn inode_mut(&mut self, id: InodeId) -> &mut Inode {
        // Inodes are never reclaimed, so a handle's inode always exists.
        self.inodes
            .entry(id)
            .or_insert_with(|| Inode { data: Vec::new(), deny_write_count: 0 })
    }

    fn inode_len(&self, id: InodeId) -> u32 {
        self.inodes.get(&id).map_or(0, |i| i.data.len() as u32)
    }
}

impl FileSystem for MemFs {
    type File = MemFile;

    fn create(&mut self, path: &str, initial_size: u32) -> bool {
        if path.is_empty() || initial_size > MAX_FILE_SIZE || self.names.contains_key(path) {
            return false;
        }
        self.insert(path, vec![0; initial_size as usize]);
        true
    }

    fn remove(&mut self, path: &str) -> bool {
        self.names.remove(path).is_some()
    }

    fn open(&mut self, path: &str) -> Option<MemFile> {
        let inode = *self.names.get(path)?;
        let id = self.next_handle;
        self.next_handle += 1;
        self.live.push(id);
        Some(MemFile {
            id,
            inode,
            pos: 0,
            denies_write: false,
        })
    }

    fn close(&mut self, file: MemFile) {
        if file.denies_write {
            let inode = self.inode_mut(file.inode);
            inode.deny_write_count = inode.deny_write_count.saturating_sub(1);
        }
        self.live.retain(|&id| id != file.id);
        self.closed.push(file.id);
    }

    fn read(&mut self, file: &mut MemFile, buf: &mut [u8]) -> usize {
        let data = &self.inode_mut(file.inode).data;
        let start = (file.pos as usize).min(data.len());
        let n = buf.len().min(data.len() - start);
        buf[..n].copy_from_slice(&data[start..start + n]);
        file.pos += n as u32;
        n
    }

    fn write(&mut self, file: &mut MemFile, buf: &[u8]) -> usize {
        let inode = self.inode_mut(file.inode);
        if inode.deny_write_count > 0 {
            return 0;
        }
        let start = (file.pos as usize).min(inode.data.len());
        let n = buf.len().min(inode.data.len() - start);
        inode.data[start..start + n].copy_from_slice(&buf[..n]);
        file.pos += n as u32;
        n
    }

    fn seek(&mut self, file: &mut MemFile, position: u32) {
        file.pos = position;
    }

    fn tell(&mut self, file: &MemFile) -> u32 {
        file.pos
    }

    fn length(&mut self, file: &MemFile) -> u32 {
        self.inode_len(file.inode)
    }

    fn deny_write(&mut self, file: &mut MemFile) {
        if !file.denies_write {
            file.denies_write = true;
            self.inode_mut(file.inode).deny_write_count += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_is_exclusive() {
        let mut fs = MemFs::new();
        assert!(fs.create("a", 10));
        assert!(!fs.create("a", 10));
        assert!(!fs.create("", 10));
        assert_eq!(fs.contents("a"), Some(&[0u8; 10][..]));
    }

    #[test]
    fn test_create_refuses_oversized_files() {
        let mut fs = MemFs::new();
        assert!(!fs.create("huge", u32::MAX));
        assert!(!fs.create("huge", MAX_FILE_SIZE + 1));
        assert!(!fs.exists("huge"));
        assert!(fs.create("huge", MAX_FILE_SIZE));
        assert_eq!(fs.contents("huge").map(<[u8]>::len), Some(MAX_FILE_SIZE as usize));
    }

    #[test]
    fn test_files_do_not_grow() {
        let mut fs = MemFs::new();
        fs.create("small", 4);
        let mut file = fs.open("small").unwrap();
        assert_eq!(fs.write(&mut file, b"abcdef"), 4);
        assert_eq!(fs.tell(&file), 4);
        assert_eq!(fs.write(&mut file, b"x"), 0);
        assert_eq!(fs.length(&file), 4);
        fs.close(file);
        assert_eq!(fs.contents("small"), Some(&b"abcd"[..]));
    }

    #[test]
    fn test_read_is_short_at_eof() {
        let mut fs = MemFs::with_files([("f", &b"hello"[..])]);
        let mut file = fs.open("f").unwrap();
        fs.seek(&mut file, 3);
        let mut buf = [0u8; 8];
        assert_eq!(fs.read(&mut file, &mut buf), 2);
        assert_eq!(&buf[..2], b"lo");
        fs.seek(&mut file, 100);
        assert_eq!(fs.read(&mut file, &mut buf), 0);
        fs.close(file);
    }

    #[test]
    fn test_deny_write_lifted_on_close() {
        let mut fs = MemFs::with_files([("prog", &b"\x7fELF"[..])]);
        let mut image = fs.open("prog").unwrap();
        fs.deny_write(&mut image);
        assert!(fs.is_write_denied("prog"));

        let mut other = fs.open("prog").unwrap();
        assert_eq!(fs.write(&mut other, b"XX"), 0);

        fs.close(image);
        assert!(!fs.is_write_denied("prog"));
        assert_eq!(fs.write(&mut other, b"XX"), 2);
        fs.close(other);
    }

    #[test]
    fn test_close_accounting() {
        let mut fs = MemFs::with_files([("f", &b""[..])]);
        let a = fs.open("f").unwrap();
        let b = fs.open("f").unwrap();
        let (a_id, b_id) = (a.id(), b.id());
        assert_ne!(a_id, b_id);
        assert_eq!(fs.open_handles(), 2);

        fs.close(b);
        fs.close(a);
        assert_eq!(fs.open_handles(), 0);
        assert_eq!(fs.close_log(), &[b_id, a_id]);
        assert_eq!(fs.close_count(a_id), 1);
    }

    #[test]
    fn test_removed_file_stays_readable_through_open_handle() {
        let mut fs = MemFs::with_files([("tmp", &b"data"[..])]);
        let mut file = fs.open("tmp").unwrap();
        assert!(fs.remove("tmp"));
        assert!(!fs.exists("tmp"));
        assert!(fs.open("tmp").is_none());

        let mut buf = [0u8; 4];
        assert_eq!(fs.read(&mut file, &mut buf), 4);
        assert_eq!(&buf, b"data");
        fs.close(file);
    }
}
