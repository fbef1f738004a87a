//! Single-call directory enumeration.
//!
//! [`enumerate`] lists the immediate children of an already-open directory
//! into two caller-owned buffers: a [`DirEntry`] table and a flat name
//! arena the entries point into. On macOS it issues one batched
//! `getattrlistbulk` call and decodes the self-describing attribute records
//! it returns; everywhere else, and on filesystems where the bulk facility
//! does not exist, it degrades silently to a `readdir` + `fstatat` scan
//! that produces the identical output shape.
//!
//! One call, one directory, fully synchronous. The caller's descriptor is
//! borrowed, never closed, and its read position is never advanced; both
//! strategies work over an independently opened cursor. When either output
//! buffer fills, the listing stops at a whole-entry boundary and returns
//! the complete entries produced so far with [`Enumeration::truncated`]
//! set. Symlinks are always described as themselves, never their targets.
//!
//! ```no_run
//! use std::os::fd::AsFd;
//!
//! let dir = std::fs::File::open("/tmp")?;
//! let mut entries = vec![direnum::DirEntry::default(); 1024];
//! let mut names = vec![0u8; 64 * 1024];
//! let out = direnum::enumerate(dir.as_fd(), &mut entries, &mut names)?;
//! for e in &entries[..out.entries] {
//!     let name = String::from_utf8_lossy(e.name(&names));
//!     println!("{name}: {:?}, {} bytes", e.file_type, e.logical_size);
//! }
//! # Ok::<(), std::io::Error>(())
//! ```

#[cfg(not(unix))]
compile_error!("direnum requires POSIX directory semantics or the macOS bulk facility");

use std::io;
use std::os::fd::BorrowedFd;

use log::debug;
use serde::Serialize;

mod bulk_decode;
mod entry;
mod error_handling;
mod platform;
mod sink;

pub use entry::{DirEntry, FileType};
pub use error_handling::ListOutcome;
pub use sink::{EntryMeta, EntrySink};

/// Outcome of one [`enumerate`] call.
#[derive(Clone, Copy, Debug, Default, Serialize)]
pub struct Enumeration {
    /// Entries written to the caller's table.
    pub entries: usize,
    /// Exact number of arena bytes consumed, NUL terminators included.
    pub arena_used: usize,
    /// True when a capacity limit stopped the listing before the directory
    /// was exhausted.
    pub truncated: bool,
}

/// One listing strategy over a single directory.
///
/// Implementations write complete entries through the sink and report how
/// the attempt ended; they must not close or reposition the borrowed
/// descriptor. The seam exists so tests and alternative backends can
/// substitute a strategy.
pub trait DirLister {
    fn list_dir(&self, dirfd: BorrowedFd<'_>, sink: &mut EntrySink<'_>) -> ListOutcome;
}

/// Fast path: the platform's bulk attribute facility where it has one,
/// `Unsupported` everywhere else.
#[derive(Default, Clone, Copy)]
pub struct BulkLister;

impl DirLister for BulkLister {
    #[inline]
    fn list_dir(&self, dirfd: BorrowedFd<'_>, sink: &mut EntrySink<'_>) -> ListOutcome {
        platform::bulk_list(dirfd, sink)
    }
}

/// Correctness baseline: directory stream + per-entry stat. Self-sufficient
/// on any POSIX target.
#[derive(Default, Clone, Copy)]
pub struct ScanLister;

impl DirLister for ScanLister {
    #[inline]
    fn list_dir(&self, dirfd: BorrowedFd<'_>, sink: &mut EntrySink<'_>) -> ListOutcome {
        platform::scan_list(dirfd, sink)
    }
}

/// List the immediate children of the directory behind `dirfd`.
///
/// Capacities are the slice lengths; zero-length slices are valid and yield
/// zero entries without error. Entries beyond the returned count are
/// unspecified. A returned error carries the underlying OS error code
/// (`io::Error::raw_os_error`).
pub fn enumerate(
    dirfd: BorrowedFd<'_>,
    entries: &mut [DirEntry],
    names: &mut [u8],
) -> io::Result<Enumeration> {
    enumerate_with(dirfd, entries, names, &BulkLister)
}

/// Same as [`enumerate`] but with an explicit primary strategy.
///
/// An `Unsupported` outcome from the primary is retried exactly once via
/// [`ScanLister`]; any other failure propagates immediately. Useful in
/// tests and for forcing the baseline path.
pub fn enumerate_with(
    dirfd: BorrowedFd<'_>,
    entries: &mut [DirEntry],
    names: &mut [u8],
    primary: &dyn DirLister,
) -> io::Result<Enumeration> {
    {
        let mut sink = EntrySink::new(entries, names);
        match primary.list_dir(dirfd, &mut sink) {
            ListOutcome::Done(summary) => return Ok(summary),
            ListOutcome::Failed(err) => return Err(err),
            ListOutcome::Unsupported => {}
        }
    }

    debug!("bulk listing unsupported for this directory, retrying via scan");
    let mut sink = EntrySink::new(entries, names);
    match ScanLister.list_dir(dirfd, &mut sink) {
        ListOutcome::Done(summary) => Ok(summary),
        ListOutcome::Failed(err) => Err(err),
        // The scan path never reports this itself; both strategies being
        // unavailable surfaces as the OS condition it amounts to.
        ListOutcome::Unsupported => Err(io::Error::from_raw_os_error(libc::ENOTSUP)),
    }
}
