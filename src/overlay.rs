//! Status overlay rendered into rows the child never scrolls.
//!
//! The bottom row (two rows with diagnostics on) is walled off from the
//! child with a scroll region, so child output scrolls above it while the
//! suggestion line stays put. Rendering brackets every write with cursor
//! save/restore and is idempotent, which lets the multiplexer re-assert the
//! overlay after every chunk of child output.

use std::io::{self, Write};

use crossterm::terminal::size as terminal_size;
use unicode_width::UnicodeWidthChar;

const SAVE_CURSOR: &[u8] = b"\x1b[s";
const RESTORE_CURSOR: &[u8] = b"\x1b[u";
const CLEAR_LINE: &[u8] = b"\x1b[K";
const CLEAR_TO_END: &[u8] = b"\x1b[0J";
const RESET: &str = "\x1b[0m";
const SUGGESTION_STYLE: &str = "\x1b[36m";
const DEBUG_STYLE: &str = "\x1b[90m";
/// Background tint for the reserved rows.
const ROW_TINT: &str = "\x1b[48;5;236m";

/// Hard cap on the diagnostics segment, ellipsis marker included.
const DEBUG_MAX_CHARS: usize = 50;

/// Rows and columns of the controlling terminal, 24x80 when the query fails.
pub fn probe_geometry() -> (u16, u16) {
    terminal_size().map(|(cols, rows)| (rows, cols)).unwrap_or((24, 80))
}

/// Visible width of `s`, skipping SGR escape sequences.
pub fn display_width(s: &str) -> usize {
    let mut width: usize = 0;
    let mut in_escape = false;
    for ch in s.chars() {
        if ch == '\x1b' {
            in_escape = true;
        } else if in_escape {
            if ch == 'm' {
                in_escape = false;
            }
        } else {
            width += UnicodeWidthChar::width(ch).unwrap_or(0);
        }
    }
    width
}

/// Cap `text` at [`DEBUG_MAX_CHARS`] characters, marking the cut with `...`.
fn truncate_debug(text: &str) -> String {
    if text.chars().count() <= DEBUG_MAX_CHARS {
        return text.to_string();
    }
    let kept: String = text.chars().take(DEBUG_MAX_CHARS - 3).collect();
    format!("{kept}...")
}

/// Compose one reserved-row line: styled suggestion, then the capped
/// diagnostics segment, padded with spaces to `cols` of visible width.
pub fn compose_row(suggestion: &str, debug_text: &str, cols: usize) -> String {
    let mut line = String::new();
    if !suggestion.is_empty() {
        line.push_str(SUGGESTION_STYLE);
        line.push_str(suggestion);
        line.push_str(RESET);
        line.push_str(ROW_TINT);
    }
    if !debug_text.is_empty() {
        line.push_str(DEBUG_STYLE);
        line.push_str(&truncate_debug(debug_text));
        line.push_str(RESET);
        line.push_str(ROW_TINT);
    }
    let visible = display_width(&line);
    for _ in visible..cols {
        line.push(' ');
    }
    line
}

/// Geometry of the reserved region at the bottom of the terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Overlay {
    pub rows: u16,
    pub cols: u16,
    pub reserved_rows: u16,
}

impl Overlay {
    pub fn new(rows: u16, cols: u16, diagnostics: bool) -> Self {
        let reserved = if diagnostics { 2 } else { 1 };
        Self {
            rows: rows.max(1),
            cols,
            reserved_rows: reserved.min(rows.max(1)),
        }
    }

    /// Rows the child may draw into (the scrolling region).
    pub fn child_rows(&self) -> u16 {
        self.rows.saturating_sub(self.reserved_rows).max(1)
    }

    fn first_reserved_row(&self) -> u16 {
        self.rows - self.reserved_rows + 1
    }

    /// One-time layout: shrink the child's scrolling region, clear it, tint
    /// the reserved rows, and park the cursor at the top of the child area.
    pub fn layout(&self, out: &mut impl Write) -> io::Result<()> {
        let mut seq = Vec::new();
        seq.extend_from_slice(format!("\x1b[1;{}r", self.child_rows()).as_bytes());
        seq.extend_from_slice(b"\x1b[1;1H");
        seq.extend_from_slice(CLEAR_TO_END);
        for offset in 0..self.reserved_rows {
            let row = self.first_reserved_row() + offset;
            seq.extend_from_slice(format!("\x1b[{row};1H").as_bytes());
            seq.extend_from_slice(ROW_TINT.as_bytes());
            seq.extend_from_slice(CLEAR_LINE);
            seq.extend_from_slice(RESET.as_bytes());
        }
        seq.extend_from_slice(b"\x1b[1;1H");
        out.write_all(&seq)?;
        out.flush()
    }

    /// Render the current suggestion (and diagnostics row, when reserved)
    /// without disturbing the cursor or the child's screen content.
    pub fn render(&self, out: &mut impl Write, suggestion: &str, debug_text: &str) -> io::Result<()> {
        let cols = self.cols as usize;
        let mut seq = Vec::new();
        seq.extend_from_slice(SAVE_CURSOR);

        let suggestion_row = self.first_reserved_row();
        seq.extend_from_slice(format!("\x1b[{suggestion_row};1H").as_bytes());
        seq.extend_from_slice(ROW_TINT.as_bytes());
        seq.extend_from_slice(CLEAR_LINE);
        if !suggestion.is_empty() {
            seq.extend_from_slice(compose_row(suggestion, "", cols).as_bytes());
        }
        seq.extend_from_slice(RESET.as_bytes());

        if self.reserved_rows > 1 {
            let debug_row = suggestion_row + 1;
            seq.extend_from_slice(format!("\x1b[{debug_row};1H").as_bytes());
            seq.extend_from_slice(ROW_TINT.as_bytes());
            seq.extend_from_slice(CLEAR_LINE);
            if !debug_text.is_empty() {
                seq.extend_from_slice(compose_row("", debug_text, cols).as_bytes());
            }
            seq.extend_from_slice(RESET.as_bytes());
        }

        seq.extend_from_slice(RESTORE_CURSOR);
        out.write_all(&seq)?;
        out.flush()
    }

    /// Undo the layout: restore the full-screen scroll region and clear the
    /// reserved rows so the shell prompt lands on a clean line.
    pub fn teardown(&self, out: &mut impl Write) -> io::Result<()> {
        let mut seq = Vec::new();
        seq.extend_from_slice(format!("\x1b[1;{}r", self.rows).as_bytes());
        for offset in 0..self.reserved_rows {
            let row = self.first_reserved_row() + offset;
            seq.extend_from_slice(format!("\x1b[{row};1H").as_bytes());
            seq.extend_from_slice(CLEAR_LINE);
        }
        seq.extend_from_slice(format!("\x1b[{};1H", self.first_reserved_row()).as_bytes());
        out.write_all(&seq)?;
        out.flush()
    }
}
