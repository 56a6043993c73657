use clap::Parser;

/// Command-line options for the wrapper itself.
///
/// Everything the wrapper does not recognize is passed through to the child
/// program untouched, including flags.
#[derive(Debug, Parser, Clone)]
#[command(about = "Terminal pass-through with a live suggestion overlay", long_about = None, version)]
pub struct Cli {
    /// Trace buffer/suggestion transitions to the log file and show the
    /// latest one in a second status row
    #[arg(long = "debug", default_value_t = false)]
    pub debug: bool,

    /// Child program to run under the pseudo-terminal
    #[arg(long = "command", default_value = "claude")]
    pub command: String,

    /// Arguments handed to the child program as-is
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub child_args: Vec<String>,
}
