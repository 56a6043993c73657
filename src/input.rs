//! Per-byte keystroke classification and in-progress line tracking.
//!
//! The interpreter never touches the terminal; it mutates [`SessionState`]
//! and tells the multiplexer what to do with each byte. The multiplexer
//! re-renders the overlay after every byte that changed state, before the
//! next byte is looked at.

use crate::logging::log_debug;
use crate::suggest::suggest;

pub const ENTER: u8 = 0x0D;
pub const BACKSPACE: u8 = 0x7F;
pub const CTRL_C: u8 = 0x03;
pub const TAB: u8 = 0x09;

/// What the multiplexer does with a classified input byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Forward the byte to the child unchanged.
    Forward,
    /// Consume the byte; nothing reaches the child.
    Suppress,
    /// Consume the byte and send these bytes to the child in its place.
    SuppressAndInject(Vec<u8>),
}

/// Live interpreter state shared with the overlay renderer.
#[derive(Debug, Default, Clone)]
pub struct SessionState {
    /// Printable characters of the line being typed, in order.
    pub buffer: String,
    /// Continuation derived from the buffer's trailing token ("" = none).
    pub suggestion: String,
    /// Most recent trace line, shown in the diagnostics row.
    pub debug_text: String,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify one raw input byte, mutating buffer/suggestion state.
    ///
    /// Returns the forwarding decision and whether state changed.
    pub fn classify(&mut self, byte: u8) -> (Decision, bool) {
        // Accepting a suggestion wins over everything else, but only while
        // one is active; otherwise Tab passes through like any other byte.
        if byte == TAB {
            if self.suggestion.is_empty() {
                return (Decision::Forward, false);
            }
            let injected = std::mem::take(&mut self.suggestion);
            self.buffer.push_str(&injected);
            self.set_debug(format!("accepted: '{injected}'"));
            return (Decision::SuppressAndInject(injected.into_bytes()), true);
        }
        match byte {
            ENTER => {
                self.set_debug(format!("sent: '{}'", self.buffer));
                self.buffer.clear();
                self.suggestion.clear();
                (Decision::Forward, true)
            }
            BACKSPACE => {
                self.buffer.pop();
                self.suggestion.clear();
                self.set_debug(format!("current: '{}'", self.buffer));
                (Decision::Forward, true)
            }
            CTRL_C => {
                self.buffer.clear();
                self.suggestion.clear();
                self.set_debug("cancelled".to_string());
                (Decision::Forward, true)
            }
            0x20..=0x7E => {
                self.buffer.push(byte as char);
                self.suggestion = suggest(&self.buffer).to_string();
                self.set_debug(format!("current: '{}'", self.buffer));
                (Decision::Forward, true)
            }
            _ => (Decision::Forward, false),
        }
    }

    fn set_debug(&mut self, line: String) {
        log_debug(&line);
        self.debug_text = line;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(state: &mut SessionState, bytes: &[u8]) -> Vec<Decision> {
        bytes.iter().map(|&b| state.classify(b).0).collect()
    }

    #[test]
    fn printable_bytes_accumulate_in_order() {
        let mut state = SessionState::new();
        let decisions = feed(&mut state, b"hello there");
        assert_eq!(state.buffer, "hello there");
        assert!(decisions.iter().all(|d| *d == Decision::Forward));
    }

    #[test]
    fn non_printable_bytes_forward_without_mutation() {
        let mut state = SessionState::new();
        state.classify(b'a');
        let (decision, changed) = state.classify(0x1B);
        assert_eq!(decision, Decision::Forward);
        assert!(!changed);
        assert_eq!(state.buffer, "a");
    }

    #[test]
    fn enter_resets_buffer_and_suggestion() {
        let mut state = SessionState::new();
        feed(&mut state, b"write");
        assert!(!state.suggestion.is_empty());
        let (decision, _) = state.classify(ENTER);
        assert_eq!(decision, Decision::Forward);
        assert!(state.buffer.is_empty());
        assert!(state.suggestion.is_empty());
    }

    #[test]
    fn ctrl_c_resets_buffer_and_suggestion() {
        let mut state = SessionState::new();
        feed(&mut state, b"write");
        state.classify(CTRL_C);
        assert!(state.buffer.is_empty());
        assert!(state.suggestion.is_empty());
    }

    #[test]
    fn backspace_pops_and_invalidates_suggestion() {
        let mut state = SessionState::new();
        feed(&mut state, b"write");
        assert!(!state.suggestion.is_empty());
        let (decision, _) = state.classify(BACKSPACE);
        assert_eq!(decision, Decision::Forward);
        assert_eq!(state.buffer, "writ");
        assert!(state.suggestion.is_empty());
    }

    #[test]
    fn backspace_on_empty_buffer_still_forwards() {
        let mut state = SessionState::new();
        state.suggestion = " stale".to_string();
        let (decision, _) = state.classify(BACKSPACE);
        assert_eq!(decision, Decision::Forward);
        assert!(state.buffer.is_empty());
        assert!(state.suggestion.is_empty());
    }

    #[test]
    fn tab_without_suggestion_is_forwarded_unchanged() {
        let mut state = SessionState::new();
        let (decision, changed) = state.classify(TAB);
        assert_eq!(decision, Decision::Forward);
        assert!(!changed);
        assert!(state.buffer.is_empty());
    }

    #[test]
    fn tab_accepts_the_active_suggestion() {
        let mut state = SessionState::new();
        for &b in b"write" {
            state.classify(b);
        }
        assert_eq!(state.buffer, "write");
        assert_eq!(state.suggestion, " a function to calculate fibonacci");

        let (decision, changed) = state.classify(TAB);
        assert_eq!(
            decision,
            Decision::SuppressAndInject(b" a function to calculate fibonacci".to_vec())
        );
        assert!(changed);
        assert_eq!(state.buffer, "write a function to calculate fibonacci");
        assert!(state.suggestion.is_empty());
    }

    #[test]
    fn accepted_suggestion_is_not_duplicated_by_a_second_tab() {
        let mut state = SessionState::new();
        for &b in b"write" {
            state.classify(b);
        }
        state.classify(TAB);
        let (decision, changed) = state.classify(TAB);
        assert_eq!(decision, Decision::Forward);
        assert!(!changed);
        assert_eq!(state.buffer, "write a function to calculate fibonacci");
    }
}
