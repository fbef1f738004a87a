use crate::{
    entry::{DirEntry, FileType},
    Enumeration,
};

/// Metadata for one child, already normalized from whichever source
/// produced it (bulk attribute record or dirent + stat).
#[derive(Clone, Copy, Debug, Default)]
pub struct EntryMeta {
    pub file_type: FileType,
    pub logical_size: u64,
    pub allocated_size: u64,
    pub inode: u64,
    pub is_symlink: bool,
}

/// Writer over the two caller-owned output buffers.
///
/// Both strategies emit through this so the packing rules live in one
/// place: names go into the arena in emission order, NUL-terminated, and an
/// entry is written only when both its table slot and its whole name
/// (terminator included) fit. A name is therefore never partially copied.
pub struct EntrySink<'a> {
    entries: &'a mut [DirEntry],
    arena: &'a mut [u8],
    written: usize,
    arena_used: usize,
    truncated: bool,
}

impl<'a> EntrySink<'a> {
    pub fn new(entries: &'a mut [DirEntry], arena: &'a mut [u8]) -> Self {
        Self {
            entries,
            arena,
            written: 0,
            arena_used: 0,
            truncated: false,
        }
    }

    /// Append one entry. Returns false without writing anything when either
    /// capacity is exhausted; the strategy must stop listing at that point
    /// and return what was produced so far.
    pub fn push(&mut self, name: &[u8], meta: EntryMeta) -> bool {
        if self.written == self.entries.len() {
            self.truncated = true;
            return false;
        }
        let need = name.len() + 1;
        if need > self.arena.len() - self.arena_used {
            self.truncated = true;
            return false;
        }
        let off = self.arena_used;
        self.arena[off..off + name.len()].copy_from_slice(name);
        self.arena[off + name.len()] = 0;
        self.entries[self.written] = DirEntry {
            name_offset: off as u32,
            name_len: name.len() as u32,
            file_type: meta.file_type,
            logical_size: meta.logical_size,
            allocated_size: meta.allocated_size,
            inode: meta.inode,
            is_symlink: meta.is_symlink,
        };
        self.arena_used += need;
        self.written += 1;
        true
    }

    /// Snapshot of what has been emitted so far.
    pub fn summary(&self) -> Enumeration {
        Enumeration {
            entries: self.written,
            arena_used: self.arena_used,
            truncated: self.truncated,
        }
    }
}
