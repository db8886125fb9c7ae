//! Command-line presentation layer over the bracket tax engine.
//!
//! The binary in `main.rs` only parses arguments, sets up tracing and maps
//! errors to exit codes; everything it prints is produced here so it can be
//! tested without spawning a process.

pub mod cli;
pub mod commands;
pub mod utils;
