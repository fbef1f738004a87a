use std::io;
use std::os::fd::{AsRawFd, BorrowedFd, FromRawFd, OwnedFd};

use crate::{error_handling::ListOutcome, sink::EntrySink};

#[cfg(target_os = "macos")]
mod macos_bulk;
mod unix_scan;

/// Open an independent cursor over the caller's directory.
///
/// A plain `dup` would share the open file description and with it the
/// directory read position, so the bulk call (which consumes the position)
/// or a later retry would be observable through the caller's handle.
/// Reopening `.` relative to the descriptor yields a fresh description
/// positioned at the start.
pub(crate) fn reopen_dir(dirfd: BorrowedFd<'_>) -> io::Result<OwnedFd> {
    let fd = unsafe {
        libc::openat(
            dirfd.as_raw_fd(),
            b".\0".as_ptr() as *const libc::c_char,
            libc::O_RDONLY | libc::O_DIRECTORY | libc::O_CLOEXEC,
        )
    };
    if fd < 0 {
        return Err(crate::error_handling::last_os_error_systemcall("openat"));
    }
    Ok(unsafe { OwnedFd::from_raw_fd(fd) })
}

#[cfg(target_os = "macos")]
pub(crate) fn bulk_list(dirfd: BorrowedFd<'_>, sink: &mut EntrySink<'_>) -> ListOutcome {
    macos_bulk::list_dir(dirfd, sink)
}

/// No bulk attribute facility on this target; the enumerator falls through
/// to the scan strategy.
#[cfg(not(target_os = "macos"))]
pub(crate) fn bulk_list(_dirfd: BorrowedFd<'_>, _sink: &mut EntrySink<'_>) -> ListOutcome {
    ListOutcome::Unsupported
}

pub(crate) fn scan_list(dirfd: BorrowedFd<'_>, sink: &mut EntrySink<'_>) -> ListOutcome {
    unix_scan::list_dir(dirfd, sink)
}
