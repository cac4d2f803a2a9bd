//! Low-level primitives
//!
//! Parsing, syntax highlighting, and logical-line arithmetic.

pub mod continuation;
pub mod highlighter;
pub mod line_math;
pub mod parser;
