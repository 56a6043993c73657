use crate::log_debug;
use anyhow::{anyhow, Context, Result};
use std::ffi::CString;
use std::io;
use std::mem;
use std::os::unix::io::RawFd;
use std::ptr;
use std::thread;
use std::time::{Duration, Instant};

use super::io::{read_chunk, write_all};

/// A child process attached to the slave side of a pseudo-terminal.
///
/// Owns the master fd and the child's lifetime: dropping the session closes
/// the fd and escalates SIGTERM then SIGKILL if the child is still running.
pub struct PtySession {
    master_fd: RawFd,
    child_pid: i32,
}

impl PtySession {
    /// Fork and exec `command` (resolved on PATH) attached to a fresh PTY.
    pub fn spawn(command: &str, args: &[String]) -> Result<Self> {
        let mut argv: Vec<CString> = Vec::with_capacity(args.len() + 1);
        argv.push(
            CString::new(command)
                .with_context(|| format!("command contains NUL byte: {command}"))?,
        );
        for arg in args {
            argv.push(
                CString::new(arg.as_str())
                    .with_context(|| format!("argument contains NUL byte: {arg}"))?,
            );
        }

        // SAFETY: argv entries are valid CStrings; spawn_pty_child returns a
        // valid master fd that set_nonblocking is the only other user of.
        unsafe {
            let (master_fd, child_pid) = spawn_pty_child(&argv)?;
            set_nonblocking(master_fd)?;
            Ok(Self {
                master_fd,
                child_pid,
            })
        }
    }

    /// The master fd, for readiness polling only.
    pub fn master_fd(&self) -> RawFd {
        self.master_fd
    }

    /// One bounded read of child output. `None` signals EOF.
    pub fn read_chunk(&self, buf: &mut [u8]) -> Result<Option<usize>> {
        read_chunk(self.master_fd, buf)
    }

    /// Forward raw bytes to the child.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        write_all(self.master_fd, bytes)
    }

    /// Update the PTY window size and notify the child.
    pub fn set_winsize(&self, rows: u16, cols: u16) -> Result<()> {
        // SAFETY: libc::winsize is a plain C struct; zeroed is a valid baseline.
        let mut ws: libc::winsize = unsafe { mem::zeroed() };
        ws.ws_row = rows.max(1);
        ws.ws_col = cols.max(1);
        // SAFETY: ioctl reads master_fd and the initialized ws struct.
        let result = unsafe { libc::ioctl(self.master_fd, libc::TIOCSWINSZ, &ws) };
        if result != 0 {
            return Err(errno_error("ioctl(TIOCSWINSZ) failed"));
        }
        // SAFETY: SIGWINCH goes to the child pid owned by this session.
        let _ = unsafe { libc::kill(self.child_pid, libc::SIGWINCH) };
        Ok(())
    }

    /// Peek whether the child is still running (without reaping it).
    pub fn is_alive(&self) -> bool {
        if self.child_pid < 0 {
            return false;
        }
        // SAFETY: child_pid is owned by this session; WNOHANG only inspects state.
        unsafe {
            let mut status = 0;
            libc::waitpid(self.child_pid, &mut status, libc::WNOHANG) == 0
        }
    }

    /// Reap the child and report its exit code; 1 when it was signaled.
    pub fn wait(&mut self) -> Result<i32> {
        if self.child_pid < 0 {
            return Err(anyhow!("child already reaped"));
        }
        let mut status = 0;
        // SAFETY: child_pid is owned by this session and reaped exactly once.
        let ret = unsafe { libc::waitpid(self.child_pid, &mut status, 0) };
        if ret < 0 {
            return Err(errno_error("waitpid failed"));
        }
        self.child_pid = -1;
        if libc::WIFEXITED(status) {
            Ok(libc::WEXITSTATUS(status))
        } else {
            Ok(1)
        }
    }
}

impl Drop for PtySession {
    fn drop(&mut self) {
        unsafe {
            // SAFETY: child_pid/master_fd come from spawn_pty_child; cleanup
            // uses best-effort signals and closes the fd if still open.
            if self.child_pid >= 0 && !wait_for_exit(self.child_pid, Duration::from_millis(200)) {
                if libc::kill(self.child_pid, libc::SIGTERM) != 0 {
                    log_debug(&format!(
                        "SIGTERM to PTY child failed: {}",
                        io::Error::last_os_error()
                    ));
                }
                if !wait_for_exit(self.child_pid, Duration::from_millis(500)) {
                    if libc::kill(self.child_pid, libc::SIGKILL) != 0 {
                        log_debug(&format!(
                            "SIGKILL to PTY child failed: {}",
                            io::Error::last_os_error()
                        ));
                    }
                    let mut status = 0;
                    let _ = libc::waitpid(self.child_pid, &mut status, 0);
                }
            }
            close_fd(self.master_fd);
        }
    }
}

/// Forks and execs a child process under a new PTY.
///
/// # Safety
///
/// `argv` must contain valid null-terminated C strings and the returned
/// master fd must eventually be closed. The child calls `_exit(1)` on any
/// setup failure rather than returning after `fork()`.
unsafe fn spawn_pty_child(argv: &[CString]) -> Result<(RawFd, i32)> {
    let mut master_fd: RawFd = -1;
    let mut slave_fd: RawFd = -1;

    // SAFETY: libc::winsize is a plain C struct; zeroed is a valid baseline.
    let mut winsize: libc::winsize = mem::zeroed();
    winsize.ws_row = 24;
    winsize.ws_col = 80;

    #[allow(clippy::unnecessary_mut_passed)]
    // SAFETY: openpty expects valid pointers for master/slave/winsize; we pass stack locals.
    if libc::openpty(
        &mut master_fd,
        &mut slave_fd,
        ptr::null_mut(),
        ptr::null_mut(),
        &mut winsize,
    ) != 0
    {
        return Err(errno_error("openpty failed"));
    }

    // SAFETY: fork is called before any unsafe Rust invariants are relied on.
    let pid = libc::fork();
    if pid < 0 {
        close_fd(master_fd);
        close_fd(slave_fd);
        return Err(errno_error("fork failed"));
    }

    if pid == 0 {
        child_exec(slave_fd, argv);
    }

    close_fd(slave_fd);
    Ok((master_fd, pid))
}

/// Child process setup after fork: attach the slave as the controlling
/// terminal, wire stdio to it, then exec the target binary.
///
/// # Safety
///
/// Must only be called in the child process after `fork()`. Never returns:
/// either `execvp` replaces the process image or `_exit(1)` runs.
unsafe fn child_exec(slave_fd: RawFd, argv: &[CString]) -> ! {
    let fail = |context: &str| -> ! {
        let err = io::Error::last_os_error();
        let msg = format!("child_exec {context} failed: {err}\n");
        // SAFETY: write is async-signal-safe and stderr is a valid fd in the child.
        let _ = libc::write(
            libc::STDERR_FILENO,
            msg.as_ptr() as *const libc::c_void,
            msg.len(),
        );
        libc::_exit(1);
    };

    if libc::setsid() == -1 {
        fail("setsid");
    }
    if libc::ioctl(slave_fd, libc::TIOCSCTTY as libc::c_ulong, 0) == -1 {
        fail("ioctl(TIOCSCTTY)");
    }
    if libc::dup2(slave_fd, libc::STDIN_FILENO) < 0
        || libc::dup2(slave_fd, libc::STDOUT_FILENO) < 0
        || libc::dup2(slave_fd, libc::STDERR_FILENO) < 0
    {
        fail("dup2");
    }
    close_fd(slave_fd);

    let mut argv_ptrs: Vec<*const libc::c_char> = argv.iter().map(|s| s.as_ptr()).collect();
    argv_ptrs.push(ptr::null());

    libc::execvp(argv_ptrs[0], argv_ptrs.as_ptr());
    fail("execvp");
}

/// Configure the PTY master for non-blocking reads.
///
/// # Safety
///
/// `fd` must be a valid, open file descriptor.
unsafe fn set_nonblocking(fd: RawFd) -> Result<()> {
    let flags = libc::fcntl(fd, libc::F_GETFL, 0);
    if flags < 0 {
        return Err(errno_error("fcntl(F_GETFL) failed"));
    }
    if libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK) < 0 {
        return Err(errno_error("fcntl(F_SETFL) failed"));
    }
    Ok(())
}

fn errno_error(context: &str) -> anyhow::Error {
    anyhow!("{context}: {}", io::Error::last_os_error())
}

/// Close a file descriptor while ignoring errors.
///
/// # Safety
///
/// `fd` must be a valid, open file descriptor (or -1 to ignore).
unsafe fn close_fd(fd: RawFd) {
    if fd >= 0 {
        let _ = libc::close(fd);
    }
}

/// Wait for the child to terminate, bailing out after `timeout`.
fn wait_for_exit(child_pid: i32, timeout: Duration) -> bool {
    let start = Instant::now();
    let mut status = 0;
    while start.elapsed() < timeout {
        // SAFETY: child_pid is owned by this session; WNOHANG only inspects state.
        let result = unsafe { libc::waitpid(child_pid, &mut status, libc::WNOHANG) };
        if result > 0 {
            return true;
        }
        if result < 0 {
            log_debug(&format!(
                "waitpid({}) failed: {}",
                child_pid,
                io::Error::last_os_error()
            ));
            return true;
        }
        thread::sleep(Duration::from_millis(20));
    }
    false
}
