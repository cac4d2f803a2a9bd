//! Terminal rendering
//!
//! Cursor math for the inline prompt and the escape sequences that move the
//! physical cursor.

pub mod display;
pub mod terminal;
