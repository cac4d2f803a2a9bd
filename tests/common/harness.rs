// Console test harness: drives the full read-eval-print loop with scripted
// key events and renders its output on a virtual terminal.

use crossterm::event::{Event as CrosstermEvent, KeyCode, KeyEvent, KeyModifiers};
use cyrepl::app::console::Console;
use cyrepl::app::Session;
use cyrepl::channel::evaluator::Evaluator;
use cyrepl::channel::ExecutionChannel;
use cyrepl::config::HistoryPersistence;
use cyrepl::input::history::History;
use cyrepl::input::reader::LineReader;
use cyrepl::primitives::highlighter::PlainHighlighter;
use cyrepl::primitives::parser::{CompileOptions, JsParser};
use std::collections::VecDeque;
use std::path::PathBuf;
use tempfile::TempDir;

/// Evaluator with canned behavior, for tests that should not depend on an
/// interpreter.
pub struct ScriptedEvaluator;

impl Evaluator for ScriptedEvaluator {
    fn evaluate(&mut self, source: &str) -> Option<String> {
        let source = source.trim();
        if source.starts_with("throw") {
            return Some("throw new Error(\"boom\")".to_string());
        }
        match source {
            "" | "void 0" => None,
            "''" => Some(String::new()),
            other => Some(format!("\"{}\"", other.replace('"', "\\\""))),
        }
    }

    fn collect_garbage(&mut self) {}

    fn reset(&mut self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Translate bare `\n` into `\r\n` the way a cooked terminal does.
fn onlcr(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len());
    let mut prev = 0u8;
    for &b in bytes {
        if b == b'\n' && prev != b'\r' {
            out.push(b'\r');
        }
        out.push(b);
        prev = b;
    }
    out
}

pub struct ConsoleTestHarness {
    console: Console,
    events: VecDeque<CrosstermEvent>,
    terminal: vt100::Parser,
    stdout: Vec<u8>,
    stderr: Vec<u8>,
    _temp_dir: TempDir,
    history_path: PathBuf,
}

impl ConsoleTestHarness {
    /// Console on a `width` x `height` terminal with the given target.
    pub fn with_channel(width: u16, height: u16, channel: ExecutionChannel) -> anyhow::Result<Self> {
        let temp_dir = tempfile::tempdir()?;
        let history_path = temp_dir.path().join("history");
        let history = History::load(&history_path, HistoryPersistence::Incremental, 100)?;

        let session = Session::new(
            Box::new(JsParser::new()?),
            Box::new(PlainHighlighter),
            history,
            channel,
            CompileOptions::default(),
        );
        let reader = LineReader::new("cy# ", Box::new(PlainHighlighter)).with_width(width);

        Ok(Self {
            console: Console::new(session, reader, false),
            events: VecDeque::new(),
            terminal: vt100::Parser::new(height, width, 0),
            stdout: Vec::new(),
            stderr: Vec::new(),
            _temp_dir: temp_dir,
            history_path,
        })
    }

    /// Console backed by [`ScriptedEvaluator`].
    pub fn new(width: u16, height: u16) -> anyhow::Result<Self> {
        Self::with_channel(width, height, ExecutionChannel::local(Box::new(ScriptedEvaluator)))
    }

    pub fn send_key(&mut self, code: KeyCode, modifiers: KeyModifiers) -> &mut Self {
        self.events
            .push_back(CrosstermEvent::Key(KeyEvent::new(code, modifiers)));
        self
    }

    /// Queue typed text; `\n` is an Enter press.
    pub fn type_text(&mut self, text: &str) -> &mut Self {
        for c in text.chars() {
            let code = match c {
                '\n' => KeyCode::Enter,
                '\t' => KeyCode::Tab,
                c => KeyCode::Char(c),
            };
            self.send_key(code, KeyModifiers::NONE);
        }
        self
    }

    pub fn paste(&mut self, text: &str) -> &mut Self {
        self.events.push_back(CrosstermEvent::Paste(text.to_string()));
        self
    }

    /// Run the console over everything queued, then end input with Ctrl-D.
    pub fn run(&mut self) -> anyhow::Result<()> {
        self.send_key(KeyCode::Char('d'), KeyModifiers::CONTROL);
        let mut events = std::mem::take(&mut self.events);
        let mut stdout = Vec::new();
        let mut stderr = Vec::new();

        self.console.run(
            &mut stdout,
            &mut stderr,
            |_| match events.pop_front() {
                Some(event) => Ok(Some(event)),
                None => anyhow::bail!("console read past the end of scripted input"),
            },
            false,
        )?;

        self.terminal.process(&onlcr(&stdout));
        self.stdout.extend_from_slice(&stdout);
        self.stderr.extend_from_slice(&stderr);
        Ok(())
    }

    pub fn screen_to_string(&self) -> String {
        self.terminal.screen().contents()
    }

    pub fn assert_screen_contains(&self, text: &str) {
        let screen = self.screen_to_string();
        assert!(
            screen.contains(text),
            "Expected screen to contain {:?}\nScreen:\n{}",
            text,
            screen
        );
    }

    pub fn stdout(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub fn stderr(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }

    pub fn history(&self) -> &[String] {
        self.console.session().history.entries()
    }

    pub fn history_file(&self) -> String {
        std::fs::read_to_string(&self.history_path).unwrap_or_default()
    }

    pub fn console(&mut self) -> &mut Console {
        &mut self.console
    }
}
