use std::io;

use log::debug;

use crate::Enumeration;

/// Result of one listing strategy over a single directory, consumed by the
/// enumerator via exhaustive matching.
///
/// `Unsupported` means the mechanism does not exist for this filesystem or
/// platform and the enumerator should retry via the scan strategy; it is
/// never surfaced to callers. Everything else is final.
#[derive(Debug)]
pub enum ListOutcome {
    Done(Enumeration),
    Unsupported,
    Failed(io::Error),
}

/// Fetch the last OS error after a failed system call, naming the failing
/// primitive in the debug log. The raw error code stays retrievable through
/// `io::Error::raw_os_error` on the returned value.
#[cfg(unix)]
pub(crate) fn last_os_error_systemcall(call: &'static str) -> io::Error {
    let err = io::Error::last_os_error();
    debug!("{call} failed (errno={})", err.raw_os_error().unwrap_or(-1));
    err
}
