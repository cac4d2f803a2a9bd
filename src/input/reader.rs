//! Interactive line reader: feeds terminal events to the input controller
//! and keeps the screen in sync through the display engine.

use crate::input::controller::{InputController, InputEnv, KeyOutcome};
use crate::primitives::highlighter::Highlighter;
use crate::services::signal_handler::{Controller, CONTROLLER};
use crate::view::display::DisplayEngine;
use crate::view::terminal::terminal_width;
use anyhow::Result as AnyhowResult;
use crossterm::event::{Event as CrosstermEvent, KeyEventKind};
use std::io::Write;
use std::time::Duration;

/// How often the abort and termination flags are checked while waiting for
/// a key.
pub const POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    Line(String),
    /// Input was abandoned by Ctrl-C or SIGINT
    Interrupted,
    Eof,
    /// SIGTERM or SIGHUP arrived while reading
    Terminated(i32),
}

/// Poll crossterm for the next event.
pub fn poll_terminal(timeout: Duration) -> AnyhowResult<Option<CrosstermEvent>> {
    if crossterm::event::poll(timeout)? {
        Ok(Some(crossterm::event::read()?))
    } else {
        Ok(None)
    }
}

pub struct LineReader {
    prompt: String,
    highlighter: Box<dyn Highlighter>,
    controller: InputController,
    display: DisplayEngine,
    width_override: Option<u16>,
    signals: &'static Controller,
}

impl LineReader {
    pub fn new(prompt: impl Into<String>, highlighter: Box<dyn Highlighter>) -> Self {
        Self {
            prompt: prompt.into(),
            highlighter,
            controller: InputController::new(),
            display: DisplayEngine::new(),
            width_override: None,
            signals: &CONTROLLER,
        }
    }

    /// Use a fixed width instead of asking the terminal.
    pub fn with_width(mut self, width: u16) -> Self {
        self.width_override = Some(width);
        self
    }

    /// Take abort and termination requests from `signals` instead of the
    /// process-wide controller.
    pub fn with_signals(mut self, signals: &'static Controller) -> Self {
        self.signals = signals;
        self
    }

    fn width(&self) -> u16 {
        self.width_override.unwrap_or_else(terminal_width)
    }

    fn redraw(&mut self, out: &mut impl Write) -> AnyhowResult<()> {
        let buffer = self.controller.buffer();
        let highlighted = self.highlighter.highlight(buffer.text(), true);
        let point = buffer.point();
        let width = self.width();
        self.display
            .redisplay(out, &self.prompt, &highlighted, point, width)?;
        Ok(())
    }

    /// Print candidates under the input, then draw the prompt again below
    /// them.
    fn show_candidates(&mut self, out: &mut impl Write, candidates: &[String]) -> AnyhowResult<()> {
        self.display.finish(out)?;
        let width = usize::from(self.width());
        let column_width = candidates.iter().map(|c| c.chars().count()).max().unwrap_or(0) + 2;
        let per_row = (width / column_width.max(1)).max(1);

        for row in candidates.chunks(per_row) {
            for candidate in row {
                write!(out, "{:<column_width$}", candidate)?;
            }
            out.write_all(b"\r\n")?;
        }
        self.redraw(out)
    }

    /// Read one submitted unit.
    ///
    /// The caller holds the terminal in raw mode. `poll_event` waits up to
    /// the given timeout for an event; between events the abort flag raised
    /// by the SIGINT handler is checked.
    pub fn read_line<F>(
        &mut self,
        out: &mut impl Write,
        env: &mut InputEnv<'_>,
        mut poll_event: F,
    ) -> AnyhowResult<ReadOutcome>
    where
        F: FnMut(Duration) -> AnyhowResult<Option<CrosstermEvent>>,
    {
        self.display.reset();
        self.redraw(out)?;

        loop {
            if let Some(signal) = self.signals.pending_termination() {
                tracing::info!("terminating on signal {}", signal);
                self.controller.clear();
                self.display.finish(out)?;
                return Ok(ReadOutcome::Terminated(signal));
            }
            if self.signals.take_abort() {
                return self.abandon(out);
            }

            let Some(event) = poll_event(POLL_INTERVAL)? else {
                continue;
            };

            let outcome = match event {
                CrosstermEvent::Key(key) if key.kind != KeyEventKind::Release => {
                    self.controller.handle_key(key, env)
                }
                CrosstermEvent::Paste(text) => self.controller.paste(&text),
                CrosstermEvent::Resize(..) => KeyOutcome::Changed,
                _ => KeyOutcome::Ignored,
            };

            match outcome {
                KeyOutcome::Ignored => {}
                KeyOutcome::Changed => self.redraw(out)?,
                KeyOutcome::Candidates(candidates) => self.show_candidates(out, &candidates)?,
                KeyOutcome::Submit(line) => {
                    self.display.finish(out)?;
                    return Ok(ReadOutcome::Line(line));
                }
                KeyOutcome::Eof => {
                    self.display.finish(out)?;
                    return Ok(ReadOutcome::Eof);
                }
                KeyOutcome::Abort => return self.abandon(out),
            }
        }
    }

    fn abandon(&mut self, out: &mut impl Write) -> AnyhowResult<ReadOutcome> {
        tracing::debug!("input abandoned");
        self.controller.clear();
        self.display.finish(out)?;
        Ok(ReadOutcome::Interrupted)
    }
}
