//! Maps the trailing token of the in-progress line to a canned continuation.

/// Trigger word paired with the text that completes it.
const TRIGGERS: &[(&str, &str)] = &[
    ("write", " a function to calculate fibonacci"),
    ("fix", " the failing test in this file"),
    ("explain", " what this code does step by step"),
    ("refactor", " this function into smaller pieces"),
    ("add", " error handling to this function"),
    ("summarize", " the changes in this branch"),
];

/// Look up a continuation for the last whitespace-delimited token of `buffer`.
///
/// Exact full-token match, case-insensitive. Returns `""` when the buffer is
/// empty or the token has no entry; no prefix matching.
pub fn suggest(buffer: &str) -> &'static str {
    let Some(last) = buffer.trim_end().split_whitespace().last() else {
        return "";
    };
    let token = last.to_ascii_lowercase();
    TRIGGERS
        .iter()
        .find(|(word, _)| *word == token)
        .map(|(_, continuation)| *continuation)
        .unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_the_trailing_token() {
        assert_eq!(suggest("please write"), " a function to calculate fibonacci");
        assert_eq!(suggest("write"), " a function to calculate fibonacci");
    }

    #[test]
    fn lookup_is_case_insensitive() {
        assert_eq!(suggest("WRITE"), " a function to calculate fibonacci");
        assert_eq!(suggest("Fix"), " the failing test in this file");
    }

    #[test]
    fn unknown_or_empty_buffers_yield_nothing() {
        assert_eq!(suggest("banana"), "");
        assert_eq!(suggest(""), "");
        assert_eq!(suggest("   "), "");
    }

    #[test]
    fn no_prefix_matching() {
        assert_eq!(suggest("writ"), "");
        assert_eq!(suggest("writes"), "");
    }

    #[test]
    fn trailing_whitespace_is_ignored() {
        assert_eq!(suggest("write  "), " a function to calculate fibonacci");
    }
}
