//! Pseudo-terminal plumbing: the child runs on the slave side and believes
//! it owns a real terminal, while we hold the master as one duplex stream.

mod io;
mod pty;

#[cfg(test)]
mod tests;

pub use pty::PtySession;
