//! tipterm entrypoint: run an interactive CLI under a PTY and keep a live
//! suggestion line pinned to the bottom of the terminal.

use std::io;
use std::process;

use anyhow::Result;
use clap::Parser;

use tipterm::config::Cli;
use tipterm::event_loop::{install_sigwinch_handler, run};
use tipterm::input::SessionState;
use tipterm::overlay::{probe_geometry, Overlay};
use tipterm::pty_session::PtySession;
use tipterm::terminal_restore::RawModeGuard;
use tipterm::{init_logging, log_debug, log_file_path};

fn main() {
    let cli = Cli::parse();
    init_logging(cli.debug);
    match run_wrapper(cli) {
        Ok(code) => process::exit(code),
        Err(err) => {
            eprintln!("tipterm: {err:#}");
            process::exit(1);
        }
    }
}

fn run_wrapper(cli: Cli) -> Result<i32> {
    log_debug("=== tipterm started ===");
    println!("Starting {} with autocomplete!", cli.command);
    if cli.debug {
        println!("Debug log: {}", log_file_path().display());
    }

    let mut session = PtySession::spawn(&cli.command, &cli.child_args)?;
    install_sigwinch_handler()?;

    let guard = RawModeGuard::acquire()?;
    let (rows, cols) = probe_geometry();
    let mut overlay = Overlay::new(rows, cols, cli.debug);
    let mut stdout = io::stdout();
    if guard.is_interactive() {
        session.set_winsize(overlay.child_rows(), overlay.cols)?;
        overlay.layout(&mut stdout)?;
        guard.mark_scroll_region();
    }

    let mut state = SessionState::new();
    run(
        &mut session,
        &mut overlay,
        &mut state,
        &mut stdout,
        guard.is_interactive(),
    );

    if guard.is_interactive() {
        let _ = overlay.teardown(&mut stdout);
    }
    guard.restore();

    let code = session.wait()?;
    log_debug(&format!("child exited with status {code}"));
    Ok(code)
}
