//! Terminal Tutor Library Crate
//!
//! Hosts a tutoring session on the command line: configuration, the
//! line-by-line conversation driver, and the interaction event log. The
//! `aita` binary is a thin wrapper around this library.

pub mod config;
pub mod console;
pub mod event_log;
