use anyhow::{anyhow, Result};
use std::io::{self, ErrorKind};
use std::os::unix::io::RawFd;
use std::thread;
use std::time::Duration;

/// Write the entire buffer to the PTY master, retrying short writes.
pub(super) fn write_all(fd: RawFd, mut data: &[u8]) -> Result<()> {
    while !data.is_empty() {
        // SAFETY: fd is the session's open master fd and data points into a
        // live slice.
        let written =
            unsafe { libc::write(fd, data.as_ptr() as *const libc::c_void, data.len()) };
        if written < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == ErrorKind::Interrupted || err.kind() == ErrorKind::WouldBlock {
                thread::sleep(Duration::from_millis(1));
                continue;
            }
            return Err(anyhow!("write to PTY failed: {err}"));
        }
        if written == 0 {
            return Err(anyhow!("write to PTY returned 0"));
        }
        let written = written as usize;
        data = if written <= data.len() {
            &data[written..]
        } else {
            &[]
        };
    }
    Ok(())
}

/// One bounded read from the master. `Ok(None)` means the child closed its
/// side (a Linux master reports EIO once the slave is gone); `Ok(Some(0))`
/// means nothing was available right now.
pub(super) fn read_chunk(fd: RawFd, buf: &mut [u8]) -> Result<Option<usize>> {
    // SAFETY: fd is the session's open master fd and buf is a live slice.
    let n = unsafe { libc::read(fd, buf.as_mut_ptr() as *mut libc::c_void, buf.len()) };
    if n > 0 {
        return Ok(Some(n as usize));
    }
    if n == 0 {
        return Ok(None);
    }
    let err = io::Error::last_os_error();
    match err.raw_os_error() {
        Some(libc::EIO) => Ok(None),
        _ if err.kind() == ErrorKind::Interrupted || err.kind() == ErrorKind::WouldBlock => {
            Ok(Some(0))
        }
        _ => Err(anyhow!("read from PTY failed: {err}")),
    }
}
