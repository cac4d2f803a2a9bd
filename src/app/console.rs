//! The interactive read-eval-print loop.

use super::meta::MetaCommand;
use super::output::{caret_report, render_value, Rendered};
use super::Session;
use crate::channel::Reply;
use crate::input::controller::InputEnv;
use crate::input::reader::{LineReader, ReadOutcome};
use crate::services::signal_handler::{Mode, CONTROLLER};
use crate::services::terminal_modes::TerminalModes;
use anyhow::{Context, Result as AnyhowResult};
use crossterm::event::Event as CrosstermEvent;
use std::io::Write;
use std::time::Duration;

/// Whether the loop keeps going after a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

pub struct Console {
    session: Session,
    reader: LineReader,
    /// Highlight results (stdout is a terminal)
    colorize: bool,
}

impl Console {
    pub fn new(session: Session, reader: LineReader, colorize: bool) -> Self {
        Self {
            session,
            reader,
            colorize,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    /// Read and run lines until EOF, `?exit` or a terminating signal.
    ///
    /// With `raw_mode`, the terminal is switched to raw mode only while a
    /// line is being read, so SIGINT reaches the handler during evaluation.
    pub fn run<F>(
        &mut self,
        out: &mut impl Write,
        err: &mut impl Write,
        mut poll_event: F,
        raw_mode: bool,
    ) -> AnyhowResult<()>
    where
        F: FnMut(Duration) -> AnyhowResult<Option<CrosstermEvent>>,
    {
        loop {
            CONTROLLER.set_mode(Mode::AwaitingInput);
            let outcome = {
                let _modes = if raw_mode {
                    Some(TerminalModes::enable().context("Failed to enter raw mode")?)
                } else {
                    None
                };
                let session = &mut self.session;
                let mut env = InputEnv {
                    parser: session.parser.as_mut(),
                    history: &session.history,
                    completer: &mut session.channel,
                    bypass: session.flags.bypass,
                };
                self.reader.read_line(out, &mut env, &mut poll_event)
            };
            CONTROLLER.set_mode(Mode::Idle);

            let line = match outcome? {
                ReadOutcome::Line(line) => line,
                ReadOutcome::Interrupted => {
                    writeln!(out)?;
                    continue;
                }
                ReadOutcome::Eof => break,
                ReadOutcome::Terminated(signal) => {
                    tracing::info!("Console stopped by signal {}", signal);
                    break;
                }
            };

            if self.handle_line(&line, out, err)? == Flow::Exit {
                break;
            }
        }

        tracing::info!("Console loop finished");
        Ok(())
    }

    /// Run one submitted line.
    pub fn handle_line(
        &mut self,
        line: &str,
        out: &mut impl Write,
        err: &mut impl Write,
    ) -> AnyhowResult<Flow> {
        if line.trim().is_empty() {
            return Ok(Flow::Continue);
        }

        if line.starts_with('?') {
            self.session.record(line);
            return self.run_meta(&MetaCommand::parse(line), out, err);
        }

        let code = if self.session.flags.bypass {
            line.to_string()
        } else {
            match self.session.parser.compile(line, self.session.compile) {
                Ok(code) => code,
                Err(diagnostics) => {
                    if let Some(first) = diagnostics.first() {
                        write!(err, "{}", caret_report(line, first))?;
                    }
                    self.session.record(line);
                    return Ok(Flow::Continue);
                }
            }
        };
        self.session.record(line);

        if self.session.flags.debug {
            let echoed = self.colored(&code);
            writeln!(out, "cy= {}", echoed)?;
        }

        let reply = self
            .session
            .channel
            .send(&code)
            .context("Lost connection to the target")?;
        self.print_reply(reply, out, err)?;
        Ok(Flow::Continue)
    }

    fn colored(&mut self, code: &str) -> String {
        if self.colorize {
            self.session.highlighter.highlight(code, false)
        } else {
            code.to_string()
        }
    }

    fn print_reply(&mut self, reply: Reply, out: &mut impl Write, err: &mut impl Write) -> AnyhowResult<()> {
        let Reply::Value(value) = reply else {
            return Ok(());
        };

        if value.starts_with("throw ") {
            let rendered = self.colored(&value);
            writeln!(err, "{}", rendered)?;
            return Ok(());
        }

        match render_value(&value, self.session.output_flags()) {
            Rendered::Text(text) => writeln!(out, "{}", text)?,
            Rendered::Code(code) => {
                let rendered = self.colored(&code);
                writeln!(out, "{}", rendered)?;
            }
        }
        out.flush()?;
        Ok(())
    }

    fn run_meta(
        &mut self,
        command: &MetaCommand,
        out: &mut impl Write,
        err: &mut impl Write,
    ) -> AnyhowResult<Flow> {
        if let Some((name, value)) = self.session.flags.toggle(command) {
            writeln!(out, "{} == {}", name, value)?;
            return Ok(Flow::Continue);
        }

        match command {
            MetaCommand::Gc => {
                write!(out, "collecting... ")?;
                out.flush()?;
                match self.session.channel.collect_garbage() {
                    Ok(()) => writeln!(out, "done.")?,
                    Err(e) => {
                        writeln!(out)?;
                        writeln!(err, "{}", e)?;
                    }
                }
            }
            MetaCommand::Destroy => {
                if let Err(e) = self.session.channel.destroy() {
                    writeln!(err, "{}", e)?;
                }
            }
            MetaCommand::Exit => return Ok(Flow::Exit),
            MetaCommand::Unknown(name) => writeln!(err, "unknown command: ?{}", name)?,
            MetaCommand::Bypass | MetaCommand::Debug | MetaCommand::Expand | MetaCommand::Pretty => {}
        }
        Ok(Flow::Continue)
    }
}
