use serde::Serialize;

/// Classification of a directory child, normalized from whichever listing
/// mechanism produced it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
pub enum FileType {
    Directory,
    RegularFile,
    SymbolicLink,
    #[default]
    Unknown,
}

/// One directory child.
///
/// Names are not stored inline. Each record addresses its bytes as
/// `(name_offset, name_len)` into the caller's name arena, where names are
/// packed contiguously and NUL-terminated; `name_len` excludes the
/// terminator. `.` and `..` are never emitted.
#[derive(Clone, Copy, Debug, Default, Serialize)]
pub struct DirEntry {
    pub name_offset: u32,
    pub name_len: u32,
    pub file_type: FileType,
    /// Byte count of file content. 0 for directories, best-effort otherwise.
    pub logical_size: u64,
    /// Bytes actually occupying storage, block-rounded. May diverge from
    /// `logical_size` in either direction (sparse files, compression).
    pub allocated_size: u64,
    /// Filesystem object identifier, 0 if unavailable.
    pub inode: u64,
    /// True implies `file_type == SymbolicLink`; both paths also guarantee
    /// the converse.
    pub is_symlink: bool,
}

impl DirEntry {
    /// Borrow this entry's name out of the arena it was written into,
    /// without the trailing NUL.
    #[inline]
    pub fn name<'a>(&self, arena: &'a [u8]) -> &'a [u8] {
        let start = self.name_offset as usize;
        &arena[start..start + self.name_len as usize]
    }
}
