use std::process::{Command, Stdio};

fn combined_output(output: &std::process::Output) -> String {
    let mut combined = String::new();
    combined.push_str(&String::from_utf8_lossy(&output.stdout));
    combined.push_str(&String::from_utf8_lossy(&output.stderr));
    combined
}

fn tipterm_bin() -> &'static str {
    option_env!("CARGO_BIN_EXE_tipterm").expect("tipterm test binary not built")
}

#[test]
fn help_mentions_the_overlay() {
    let output = Command::new(tipterm_bin())
        .arg("--help")
        .output()
        .expect("run tipterm --help");
    assert!(output.status.success());
    let combined = combined_output(&output);
    assert!(combined.contains("suggestion overlay"));
    assert!(combined.contains("--debug"));
}

#[cfg(unix)]
#[test]
fn child_output_passes_through_without_a_tty() {
    let output = Command::new(tipterm_bin())
        .args(["--command", "echo", "hello from the child"])
        .output()
        .expect("run tipterm with echo");
    assert!(output.status.success());
    let combined = combined_output(&output);
    assert!(combined.contains("hello from the child"), "{combined:?}");
    // Without an interactive terminal no overlay sequences are emitted.
    assert!(!combined.contains("\u{1b}[s"), "{combined:?}");
}

#[cfg(unix)]
#[test]
fn child_exit_code_is_propagated() {
    let status = Command::new(tipterm_bin())
        .args(["--command", "sh", "-c", "exit 7"])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .status()
        .expect("run tipterm with sh");
    assert_eq!(status.code(), Some(7));
}

#[cfg(unix)]
#[test]
fn missing_child_exits_nonzero() {
    let status = Command::new(tipterm_bin())
        .args(["--command", "definitely-not-a-real-binary-xyz"])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .status()
        .expect("run tipterm");
    assert_eq!(status.code(), Some(1));
}
