use std::ffi::CStr;
use std::io;
use std::os::fd::{BorrowedFd, IntoRawFd, OwnedFd, RawFd};

use log::debug;

use crate::{
    entry::FileType,
    error_handling::{last_os_error_systemcall, ListOutcome},
    sink::{EntryMeta, EntrySink},
};

/// Owned directory stream. `fdopendir` takes over the descriptor it is
/// given, and `closedir` on drop releases both, so every exit path of the
/// scan (success, truncation, error) closes the stream exactly once.
struct DirStream(*mut libc::DIR);

impl DirStream {
    fn open(fd: OwnedFd) -> io::Result<Self> {
        let raw = fd.into_raw_fd();
        let d = unsafe { libc::fdopendir(raw) };
        if d.is_null() {
            let err = last_os_error_systemcall("fdopendir");
            unsafe { libc::close(raw) };
            return Err(err);
        }
        Ok(Self(d))
    }

    fn fd(&self) -> io::Result<RawFd> {
        let fd = unsafe { libc::dirfd(self.0) };
        if fd < 0 {
            return Err(last_os_error_systemcall("dirfd"));
        }
        Ok(fd)
    }
}

impl Drop for DirStream {
    fn drop(&mut self) {
        unsafe { libc::closedir(self.0) };
    }
}

fn classify_mode(mode: libc::mode_t) -> FileType {
    match mode & libc::S_IFMT {
        libc::S_IFDIR => FileType::Directory,
        libc::S_IFREG => FileType::RegularFile,
        libc::S_IFLNK => FileType::SymbolicLink,
        _ => FileType::Unknown,
    }
}

fn classify_dtype(d_type: u8) -> FileType {
    match d_type {
        libc::DT_DIR => FileType::Directory,
        libc::DT_REG => FileType::RegularFile,
        libc::DT_LNK => FileType::SymbolicLink,
        _ => FileType::Unknown,
    }
}

/// Normalize one child's metadata from the lookup outcome. Without a stat
/// (the child may have vanished between readdir and the lookup — a
/// tolerated race), numeric fields stay zero and the stream's type byte
/// stands in; the symlink flag tracks the classified type on both branches.
fn child_meta(st: Option<&libc::stat>, d_type: u8) -> EntryMeta {
    match st {
        Some(st) => {
            let file_type = classify_mode(st.st_mode);
            EntryMeta {
                file_type,
                logical_size: st.st_size as u64,
                allocated_size: st.st_blocks as u64 * 512,
                inode: st.st_ino as u64,
                is_symlink: file_type == FileType::SymbolicLink,
            }
        }
        None => {
            let file_type = classify_dtype(d_type);
            EntryMeta {
                file_type,
                is_symlink: file_type == FileType::SymbolicLink,
                ..EntryMeta::default()
            }
        }
    }
}

/// The correctness baseline: stream the directory one entry at a time and
/// stat each child relative to the stream, never following symlinks. Runs
/// on any POSIX target and never depends on the bulk facility.
pub(crate) fn list_dir(dirfd: BorrowedFd<'_>, sink: &mut EntrySink<'_>) -> ListOutcome {
    let cursor = match super::reopen_dir(dirfd) {
        Ok(fd) => fd,
        Err(err) => return ListOutcome::Failed(err),
    };
    let stream = match DirStream::open(cursor) {
        Ok(s) => s,
        Err(err) => return ListOutcome::Failed(err),
    };
    let stream_fd = match stream.fd() {
        Ok(fd) => fd,
        Err(err) => return ListOutcome::Failed(err),
    };

    loop {
        let ent = unsafe { libc::readdir(stream.0) };
        if ent.is_null() {
            break;
        }
        let entry = unsafe { &*ent };
        let name_c = unsafe { CStr::from_ptr(entry.d_name.as_ptr()) };
        let name = name_c.to_bytes();
        if name.is_empty() || name == b"." || name == b".." {
            continue;
        }

        let mut st: libc::stat = unsafe { std::mem::zeroed() };
        let rc = unsafe {
            libc::fstatat(
                stream_fd,
                name_c.as_ptr(),
                &mut st,
                libc::AT_SYMLINK_NOFOLLOW,
            )
        };
        let meta = if rc == 0 {
            child_meta(Some(&st), entry.d_type)
        } else {
            debug!(
                "fstatat failed for a directory child: {}",
                io::Error::last_os_error()
            );
            child_meta(None, entry.d_type)
        };

        if !sink.push(name, meta) {
            break;
        }
    }

    ListOutcome::Done(sink.summary())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stat_with(mode: libc::mode_t, size: i64, blocks: i64, ino: u64) -> libc::stat {
        let mut st: libc::stat = unsafe { std::mem::zeroed() };
        st.st_mode = mode;
        st.st_size = size as libc::off_t;
        st.st_blocks = blocks as libc::blkcnt_t;
        st.st_ino = ino as libc::ino_t;
        st
    }

    #[test]
    fn stat_metadata_populates_all_fields() {
        let st = stat_with(libc::S_IFREG | 0o644, 10, 8, 42);
        let m = child_meta(Some(&st), libc::DT_UNKNOWN);
        assert_eq!(m.file_type, FileType::RegularFile);
        assert_eq!(m.logical_size, 10);
        assert_eq!(m.allocated_size, 8 * 512);
        assert_eq!(m.inode, 42);
        assert!(!m.is_symlink);
    }

    #[test]
    fn stat_symlink_sets_flag_and_type() {
        let st = stat_with(libc::S_IFLNK | 0o777, 5, 0, 7);
        let m = child_meta(Some(&st), libc::DT_UNKNOWN);
        assert_eq!(m.file_type, FileType::SymbolicLink);
        assert!(m.is_symlink);
    }

    #[test]
    fn vanished_child_is_zero_filled_with_stream_type() {
        let m = child_meta(None, libc::DT_REG);
        assert_eq!(m.file_type, FileType::RegularFile);
        assert_eq!(m.logical_size, 0);
        assert_eq!(m.allocated_size, 0);
        assert_eq!(m.inode, 0);
        assert!(!m.is_symlink);

        let m = child_meta(None, libc::DT_DIR);
        assert_eq!(m.file_type, FileType::Directory);
        assert_eq!(m.inode, 0);
    }

    #[test]
    fn vanished_symlink_keeps_flag_and_type_in_agreement() {
        let m = child_meta(None, libc::DT_LNK);
        assert_eq!(m.file_type, FileType::SymbolicLink);
        assert!(m.is_symlink);
    }

    #[test]
    fn vanished_child_with_odd_stream_type_maps_to_unknown() {
        for d_type in [libc::DT_FIFO, libc::DT_SOCK, libc::DT_UNKNOWN] {
            let m = child_meta(None, d_type);
            assert_eq!(m.file_type, FileType::Unknown);
            assert!(!m.is_symlink);
        }
    }
}
