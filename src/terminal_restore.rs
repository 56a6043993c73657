//! Scoped raw-mode acquisition with unconditional restoration.
//!
//! Restoration must survive every exit path, including panics inside the
//! event loop, so the state lives in process-wide atomics consulted by both
//! the guard's `Drop` and a shared panic hook.

use crossterm::{
    cursor::Show,
    execute,
    terminal::{disable_raw_mode, enable_raw_mode},
    tty::IsTty,
};
use std::{
    io::{self, Write},
    panic,
    sync::{
        atomic::{AtomicBool, Ordering},
        OnceLock,
    },
};

static RAW_MODE_ENABLED: AtomicBool = AtomicBool::new(false);
static SCROLL_REGION_SET: AtomicBool = AtomicBool::new(false);
static PANIC_HOOK_INSTALLED: OnceLock<()> = OnceLock::new();

/// RAII guard to restore terminal state on drop (and on panic via a shared hook).
pub struct RawModeGuard {
    interactive: bool,
}

impl RawModeGuard {
    /// Acquire raw mode when stdin is an interactive terminal; otherwise a
    /// no-op guard.
    pub fn acquire() -> io::Result<Self> {
        install_terminal_panic_hook();
        let interactive = io::stdin().is_tty();
        if interactive {
            enable_raw_mode()?;
            RAW_MODE_ENABLED.store(true, Ordering::SeqCst);
        }
        Ok(RawModeGuard { interactive })
    }

    pub fn is_interactive(&self) -> bool {
        self.interactive
    }

    /// Record that the overlay shrank the scroll region, so restoration
    /// resets it even on abnormal exits.
    pub fn mark_scroll_region(&self) {
        SCROLL_REGION_SET.store(true, Ordering::SeqCst);
    }

    pub fn restore(&self) {
        restore_terminal();
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        restore_terminal();
    }
}

pub fn restore_terminal() {
    if RAW_MODE_ENABLED.swap(false, Ordering::SeqCst) {
        let _ = disable_raw_mode();
    }
    let mut stdout = io::stdout();
    if SCROLL_REGION_SET.swap(false, Ordering::SeqCst) {
        // Parameterless DECSTBM resets the region to the full screen.
        let _ = stdout.write_all(b"\x1b[r");
    }
    let _ = execute!(stdout, Show);
    let _ = stdout.flush();
}

pub fn install_terminal_panic_hook() {
    PANIC_HOOK_INSTALLED.get_or_init(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            restore_terminal();
            let location = info
                .location()
                .map(|loc| format!("{}:{}", loc.file(), loc.line()))
                .unwrap_or_else(|| "unknown".to_string());
            crate::log_debug(&format!("panic at {location}"));
            previous(info);
        }));
    });
}
