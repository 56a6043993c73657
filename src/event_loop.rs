//! Readiness-driven multiplexer over user input and child output.
//!
//! Single-threaded: the loop blocks in `poll(2)` on stdin and the PTY
//! master, then runs every dispatch to completion before waiting again, so
//! the real terminal is only ever written by one of "forward child output"
//! or "render overlay" at a time and the session state needs no locking.

use std::io::{self, ErrorKind, Write};
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{anyhow, Result};

use crate::input::{Decision, SessionState};
use crate::logging::log_debug;
use crate::overlay::{probe_geometry, Overlay};
use crate::pty_session::PtySession;

/// Bounded read size per ready stream per iteration.
const READ_CHUNK: usize = 1024;

/// Flag set by the SIGWINCH handler to trigger a relayout.
static SIGWINCH_RECEIVED: AtomicBool = AtomicBool::new(false);

/// Signal handler for terminal resize events. Only flips an atomic flag
/// (async-signal-safe); the loop does the actual work.
extern "C" fn handle_sigwinch(_: libc::c_int) {
    SIGWINCH_RECEIVED.store(true, Ordering::SeqCst);
}

pub fn install_sigwinch_handler() -> Result<()> {
    unsafe {
        // SAFETY: handle_sigwinch is an extern "C" handler with no side
        // effects beyond flipping an atomic flag.
        let handler = handle_sigwinch as *const () as libc::sighandler_t;
        if libc::signal(libc::SIGWINCH, handler) == libc::SIG_ERR {
            return Err(anyhow!("failed to install SIGWINCH handler"));
        }
    }
    Ok(())
}

fn take_sigwinch() -> bool {
    SIGWINCH_RECEIVED.swap(false, Ordering::SeqCst)
}

/// Drive the session until the child closes its stream or an I/O error ends
/// the run. Errors are a normal shutdown path: they are logged and absorbed
/// here so the caller's cleanup always runs.
pub fn run(
    session: &mut PtySession,
    overlay: &mut Overlay,
    state: &mut SessionState,
    out: &mut impl Write,
    render_overlay: bool,
) {
    if let Err(err) = run_inner(session, overlay, state, out, render_overlay) {
        log_debug(&format!("event loop terminated: {err:#}"));
    }
}

fn run_inner(
    session: &mut PtySession,
    overlay: &mut Overlay,
    state: &mut SessionState,
    out: &mut impl Write,
    render_overlay: bool,
) -> Result<()> {
    let mut buf = [0u8; READ_CHUNK];
    // Flips to false once stdin hits EOF; the child may still be producing
    // output, so only its stream ends the session.
    let mut stdin_open = true;
    loop {
        if take_sigwinch() {
            relayout(session, overlay, state, out, render_overlay)?;
        }

        let mut fds = [
            libc::pollfd {
                // poll ignores negative fds, which drops closed stdin from
                // the wait set without reshaping the array.
                fd: if stdin_open { libc::STDIN_FILENO } else { -1 },
                events: libc::POLLIN,
                revents: 0,
            },
            libc::pollfd {
                fd: session.master_fd(),
                events: libc::POLLIN,
                revents: 0,
            },
        ];
        // SAFETY: fds is a live array of initialized pollfd structs.
        let ready = unsafe { libc::poll(fds.as_mut_ptr(), fds.len() as libc::nfds_t, -1) };
        if ready < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == ErrorKind::Interrupted {
                continue;
            }
            return Err(anyhow!("poll failed: {err}"));
        }

        if fds[0].revents & (libc::POLLIN | libc::POLLHUP | libc::POLLERR) != 0 {
            // SAFETY: stdin stays open for the process lifetime; buf is a live buffer.
            let n = unsafe {
                libc::read(
                    libc::STDIN_FILENO,
                    buf.as_mut_ptr() as *mut libc::c_void,
                    buf.len(),
                )
            };
            if n == 0 {
                log_debug("stdin closed, draining child output");
                stdin_open = false;
            } else if n < 0 {
                let err = io::Error::last_os_error();
                if err.kind() != ErrorKind::Interrupted && err.kind() != ErrorKind::WouldBlock {
                    return Err(anyhow!("stdin read failed: {err}"));
                }
            } else {
                handle_input(
                    session,
                    overlay,
                    state,
                    out,
                    &buf[..n as usize],
                    render_overlay,
                )?;
            }
        }

        if fds[1].revents & (libc::POLLIN | libc::POLLHUP | libc::POLLERR) != 0 {
            match session.read_chunk(&mut buf)? {
                Some(0) => {}
                Some(n) => {
                    out.write_all(&buf[..n])?;
                    out.flush()?;
                    // Re-assert the overlay after every chunk so it survives
                    // the child's own redraws.
                    if render_overlay {
                        overlay.render(out, &state.suggestion, &state.debug_text)?;
                    }
                }
                None => {
                    log_debug("child closed its output stream");
                    return Ok(());
                }
            }
        }
    }
}

/// Classify each input byte, forward or replace it on the child stream, and
/// re-render once per byte that changed state before looking at the next.
pub fn handle_input(
    session: &mut PtySession,
    overlay: &Overlay,
    state: &mut SessionState,
    out: &mut impl Write,
    bytes: &[u8],
    render_overlay: bool,
) -> Result<()> {
    for &byte in bytes {
        let (decision, changed) = state.classify(byte);
        match decision {
            Decision::Forward => session.write_bytes(&[byte])?,
            Decision::Suppress => {}
            Decision::SuppressAndInject(injected) => session.write_bytes(&injected)?,
        }
        if changed && render_overlay {
            overlay.render(out, &state.suggestion, &state.debug_text)?;
        }
    }
    Ok(())
}

/// The terminal changed size: recompute geometry, re-pin the scroll region,
/// resize the child's PTY, and repaint the overlay.
fn relayout(
    session: &mut PtySession,
    overlay: &mut Overlay,
    state: &SessionState,
    out: &mut impl Write,
    render_overlay: bool,
) -> Result<()> {
    let (rows, cols) = probe_geometry();
    let diagnostics = overlay.reserved_rows > 1;
    *overlay = Overlay::new(rows, cols, diagnostics);
    session.set_winsize(overlay.child_rows(), overlay.cols)?;
    if render_overlay {
        overlay.layout(out)?;
        overlay.render(out, &state.suggestion, &state.debug_text)?;
    }
    log_debug(&format!("relayout to {rows}x{cols}"));
    Ok(())
}
