//! Session state and the top-level drivers (interactive console, batch).

pub mod batch;
pub mod console;
pub mod meta;
pub mod output;

use crate::channel::ExecutionChannel;
use crate::input::history::History;
use crate::primitives::highlighter::Highlighter;
use crate::primitives::parser::{CompileOptions, ParseOracle};
use meta::MetaFlags;
use output::OutputFlags;

/// Everything a console session carries from one input to the next.
pub struct Session {
    pub flags: MetaFlags,
    pub compile: CompileOptions,
    pub parser: Box<dyn ParseOracle>,
    /// Used for results and debug echo; the line reader has its own
    pub highlighter: Box<dyn Highlighter>,
    pub history: History,
    pub channel: ExecutionChannel,
}

impl Session {
    pub fn new(
        parser: Box<dyn ParseOracle>,
        highlighter: Box<dyn Highlighter>,
        history: History,
        channel: ExecutionChannel,
        compile: CompileOptions,
    ) -> Self {
        Self {
            flags: MetaFlags::default(),
            compile,
            parser,
            highlighter,
            history,
            channel,
        }
    }

    pub fn output_flags(&self) -> OutputFlags {
        OutputFlags {
            expand: self.flags.expand,
            pretty: self.flags.pretty,
        }
    }

    /// Add a submitted line to history. A failed write is logged, not fatal.
    pub fn record(&mut self, line: &str) {
        if let Err(e) = self.history.append(line) {
            tracing::warn!("Failed to write history: {}", e);
        }
    }
}
