pub mod config;
pub mod event_loop;
pub mod input;
pub mod logging;
pub mod overlay;
pub mod pty_session;
pub mod suggest;
pub mod terminal_restore;

pub use logging::{init_logging, log_debug, log_file_path};
