use super::io::{read_chunk, write_all};
use super::pty::PtySession;
use std::io;
use std::os::unix::io::RawFd;
use std::time::{Duration, Instant};

fn pipe_pair() -> (RawFd, RawFd) {
    let mut fds = [0; 2];
    let result = unsafe { libc::pipe(fds.as_mut_ptr()) };
    assert_eq!(
        result,
        0,
        "pipe() failed with errno {}",
        io::Error::last_os_error()
    );
    (fds[0], fds[1])
}

fn close_fd_pair(read_fd: RawFd, write_fd: RawFd) {
    unsafe {
        libc::close(read_fd);
        libc::close(write_fd);
    }
}

/// Drain the session until `needle` shows up or the deadline passes.
fn read_until(session: &PtySession, needle: &[u8], timeout: Duration) -> Vec<u8> {
    let deadline = Instant::now() + timeout;
    let mut collected = Vec::new();
    let mut buf = [0u8; 1024];
    while Instant::now() < deadline {
        match session.read_chunk(&mut buf) {
            Ok(Some(0)) => std::thread::sleep(Duration::from_millis(10)),
            Ok(Some(n)) => {
                collected.extend_from_slice(&buf[..n]);
                if collected
                    .windows(needle.len())
                    .any(|window| window == needle)
                {
                    break;
                }
            }
            Ok(None) => break,
            Err(err) => panic!("read_chunk failed: {err:#}"),
        }
    }
    collected
}

#[test]
fn write_all_round_trips_through_a_pipe() {
    let (read_fd, write_fd) = pipe_pair();
    write_all(write_fd, b"hello pty").expect("write_all");
    let mut buf = [0u8; 32];
    let n = unsafe { libc::read(read_fd, buf.as_mut_ptr() as *mut _, buf.len()) };
    assert_eq!(&buf[..n as usize], b"hello pty");
    close_fd_pair(read_fd, write_fd);
}

#[test]
fn read_chunk_reports_eof_on_closed_pipe() {
    let (read_fd, write_fd) = pipe_pair();
    unsafe {
        libc::close(write_fd);
    }
    let mut buf = [0u8; 8];
    assert_eq!(read_chunk(read_fd, &mut buf).expect("read_chunk"), None);
    unsafe {
        libc::close(read_fd);
    }
}

#[cfg(unix)]
#[test]
fn spawned_child_echoes_input() {
    let mut session = PtySession::spawn("cat", &[]).expect("spawn cat");
    assert!(session.is_alive());
    session.write_bytes(b"roundtrip\n").expect("write to cat");
    let output = read_until(&session, b"roundtrip", Duration::from_secs(5));
    let text = String::from_utf8_lossy(&output);
    assert!(text.contains("roundtrip"), "unexpected output: {text:?}");
}

#[cfg(unix)]
#[test]
fn wait_reports_the_child_exit_code() {
    let mut session =
        PtySession::spawn("sh", &["-c".to_string(), "exit 7".to_string()]).expect("spawn sh");
    assert_eq!(session.wait().expect("wait"), 7);
}

#[cfg(unix)]
#[test]
fn wait_maps_signaled_children_to_one() {
    let mut session = PtySession::spawn(
        "sh",
        &["-c".to_string(), "kill -TERM $$".to_string()],
    )
    .expect("spawn sh");
    assert_eq!(session.wait().expect("wait"), 1);
}

#[cfg(unix)]
#[test]
fn spawn_fails_for_missing_executables() {
    // execvp fails in the child, which then exits with status 1.
    let mut session =
        PtySession::spawn("definitely-not-a-real-binary-xyz", &[]).expect("fork itself succeeds");
    assert_eq!(session.wait().expect("wait"), 1);
}

#[cfg(unix)]
#[test]
fn set_winsize_accepts_reasonable_dimensions() {
    let session = PtySession::spawn("cat", &[]).expect("spawn cat");
    session.set_winsize(23, 80).expect("set_winsize");
}
