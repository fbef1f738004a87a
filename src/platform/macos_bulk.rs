use std::io;
use std::os::fd::{AsRawFd, BorrowedFd};

use crate::{
    bulk_decode::{self, ATTR_BIT_MAP_COUNT, COMMON_ATTRS, FILE_ATTRS},
    error_handling::{last_os_error_systemcall, ListOutcome},
    sink::EntrySink,
};

#[repr(C)]
struct AttrList {
    bitmapcount: u16,
    reserved: u16,
    commonattr: u32,
    volattr: u32,
    dirattr: u32,
    fileattr: u32,
    forkattr: u32,
}

extern "C" {
    fn getattrlistbulk(
        dirfd: libc::c_int,
        attrlist: *mut AttrList,
        attrbuf: *mut libc::c_void,
        attrbufsize: libc::size_t,
        options: libc::c_ulong,
    ) -> libc::c_int;
}

// Entries are described as themselves, never their targets.
const FSOPT_NOFOLLOW: libc::c_ulong = 0x0000_0001;

fn bulk_buf_size() -> usize {
    if let Ok(s) = std::env::var("DIRENUM_BULK_BUF_KB") {
        if let Ok(kb) = s.parse::<usize>() {
            return kb.max(4) * 1024;
        }
    }
    64 * 1024
}

/// One bulk listing call over an independent cursor, decoded through the
/// portable record decoder. The caller's handle position is never advanced
/// and the cursor is closed on every exit path.
pub(crate) fn list_dir(dirfd: BorrowedFd<'_>, sink: &mut EntrySink<'_>) -> ListOutcome {
    let cursor = match super::reopen_dir(dirfd) {
        Ok(fd) => fd,
        Err(err) => return ListOutcome::Failed(err),
    };

    let mut al = AttrList {
        bitmapcount: ATTR_BIT_MAP_COUNT,
        reserved: 0,
        commonattr: COMMON_ATTRS,
        volattr: 0,
        dirattr: 0,
        fileattr: FILE_ATTRS,
        forkattr: 0,
    };

    let mut buf = vec![0u8; bulk_buf_size()];
    let n = unsafe {
        // Clear errno first: a zero return (empty directory) must not be
        // confused with an unsupported filesystem by a stale value.
        *libc::__error() = 0;
        getattrlistbulk(
            cursor.as_raw_fd(),
            &mut al as *mut _,
            buf.as_mut_ptr() as *mut _,
            buf.len(),
            FSOPT_NOFOLLOW,
        )
    };

    if n <= 0 {
        let errno = io::Error::last_os_error().raw_os_error().unwrap_or(0);
        if errno == libc::ENOTSUP || errno == libc::EINVAL {
            return ListOutcome::Unsupported;
        }
        if n < 0 {
            return ListOutcome::Failed(last_os_error_systemcall("getattrlistbulk"));
        }
        // Zero entries with no error: the directory is empty.
        return ListOutcome::Done(sink.summary());
    }

    bulk_decode::decode_records(&buf, n as usize, COMMON_ATTRS, FILE_ATTRS, sink);
    ListOutcome::Done(sink.summary())
}
