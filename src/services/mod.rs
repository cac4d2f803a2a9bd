//! Process-level services
//!
//! Logging, signal handling, and terminal mode management.

pub mod log_dirs;
pub mod signal_handler;
pub mod terminal_modes;
pub mod tracing_setup;
