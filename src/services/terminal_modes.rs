//! Terminal mode management
//!
//! The console only needs raw mode (so keys arrive one at a time) and
//! bracketed paste (so a pasted multi-line snippet is inserted as text
//! instead of being replayed as Enter presses). The prompt draws inline;
//! the alternate screen is never entered.

use anyhow::Result;
use crossterm::{
    event::{DisableBracketedPaste, EnableBracketedPaste},
    terminal::{disable_raw_mode, enable_raw_mode},
    ExecutableCommand,
};
use std::io::{stdout, Write};

/// Tracks which terminal modes have been enabled and provides cleanup.
///
/// Use `TerminalModes::enable()` while a line is being read; dropping the
/// value (or calling `undo()`) restores the original state.
#[derive(Debug, Default)]
pub struct TerminalModes {
    raw_mode: bool,
    bracketed_paste: bool,
}

impl TerminalModes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable raw mode and bracketed paste.
    ///
    /// On error, automatically undoes any partially enabled modes.
    pub fn enable() -> Result<Self> {
        let mut modes = Self::new();

        if let Err(e) = enable_raw_mode() {
            tracing::error!("Failed to enable raw mode: {}", e);
            return Err(e.into());
        }
        modes.raw_mode = true;
        tracing::trace!("Enabled raw mode");

        if let Err(e) = stdout().execute(EnableBracketedPaste) {
            tracing::warn!("Failed to enable bracketed paste: {}", e);
            // Non-fatal, pasted newlines then arrive as Enter presses
        } else {
            modes.bracketed_paste = true;
        }

        Ok(modes)
    }

    /// Restore terminal to original state by disabling all enabled modes.
    ///
    /// Safe to call multiple times.
    pub fn undo(&mut self) {
        if self.bracketed_paste {
            let _ = stdout().execute(DisableBracketedPaste);
            self.bracketed_paste = false;
        }

        if self.raw_mode {
            let _ = disable_raw_mode();
            self.raw_mode = false;
            tracing::trace!("Disabled raw mode");
        }

        let _ = stdout().flush();
    }
}

impl Drop for TerminalModes {
    fn drop(&mut self) {
        self.undo();
    }
}

/// Unconditionally restore terminal state without tracking.
///
/// Intended for panic hooks where the `TerminalModes` instance is out of
/// reach.
pub fn emergency_cleanup() {
    let _ = stdout().execute(DisableBracketedPaste);
    let _ = disable_raw_mode();
    let _ = stdout().flush();
}
