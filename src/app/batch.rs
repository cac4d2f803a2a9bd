//! Non-interactive execution of a whole script.

use super::output::batch_report;
use crate::channel::{ExecutionChannel, Reply};
use crate::primitives::parser::{CompileOptions, ParseOracle};
use anyhow::{Context, Result as AnyhowResult};
use std::io::Write;

/// What the batch runner should do with the generated code.
pub enum BatchAction<'a> {
    /// Print it
    Print,
    /// Run it
    Run(&'a mut ExecutionChannel),
}

/// Blank out a leading `#!` line, keeping line numbers intact.
pub fn strip_shebang(source: &str) -> &str {
    if source.starts_with("#!") {
        match source.find('\n') {
            Some(nl) => &source[nl..],
            None => "",
        }
    } else {
        source
    }
}

/// Run a script. Returns the process exit code.
pub fn run(
    source: &str,
    parser: &mut dyn ParseOracle,
    options: CompileOptions,
    action: BatchAction<'_>,
    out: &mut impl Write,
    err: &mut impl Write,
) -> AnyhowResult<i32> {
    let source = strip_shebang(source);
    let code = match parser.compile(source, options) {
        Ok(code) => code,
        Err(diagnostics) => {
            for diagnostic in &diagnostics {
                writeln!(err, "{}", batch_report(diagnostic))?;
            }
            return Ok(1);
        }
    };

    let channel = match action {
        BatchAction::Print => {
            writeln!(out, "{}", code)?;
            return Ok(0);
        }
        BatchAction::Run(channel) => channel,
    };

    let reply = channel.send(&code).context("Lost connection to the target")?;
    match reply {
        Reply::Value(value) if value.starts_with("throw ") => {
            writeln!(err, "{}", value)?;
            Ok(1)
        }
        _ => Ok(0),
    }
}
