//! Line editing
//!
//! Key handling for the multi-line prompt, history, and completion.

pub mod completion;
pub mod controller;
pub mod edit_buffer;
pub mod history;
pub mod reader;
