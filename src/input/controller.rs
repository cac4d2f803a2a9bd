//! Key handling for the multi-line prompt.
//!
//! The controller owns the edit buffer and turns key events into edits.
//! Whether Enter submits or opens a new line is decided by probing the
//! parser: input whose only errors sit on its final line is complete (the
//! errors are real and get reported after submission), while an error
//! reported past the final line means a construct is still open.

use crate::input::completion::{self, Completer, Completion};
use crate::input::edit_buffer::EditBuffer;
use crate::input::history::{History, HistoryCursor};
use crate::primitives::line_math::{
    column_at, indent_before, leading_spaces_before, line_count, line_end, line_range, line_start,
    offset_at_column,
};
use crate::primitives::parser::ParseOracle;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Width of one indentation step.
pub const INDENT_WIDTH: usize = 4;

/// Result of handling one key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyOutcome {
    /// Nothing changed; no redraw needed
    Ignored,
    /// Buffer or point changed; redraw
    Changed,
    /// The buffer was submitted
    Submit(String),
    /// End of input on an empty buffer
    Eof,
    /// Partial input abandoned (Ctrl-C)
    Abort,
    /// Ambiguous completion; show these below the input
    Candidates(Vec<String>),
}

/// Collaborators a key handler may consult.
pub struct InputEnv<'a> {
    pub parser: &'a mut dyn ParseOracle,
    pub history: &'a History,
    pub completer: &'a mut dyn Completer,
    /// Enter at the end of the buffer always submits
    pub bypass: bool,
}

#[derive(Debug, Default)]
pub struct InputController {
    buffer: EditBuffer,
    history_cursor: HistoryCursor,
}

impl InputController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn buffer(&self) -> &EditBuffer {
        &self.buffer
    }

    /// Drop any partial input.
    pub fn clear(&mut self) {
        self.buffer.take();
        self.history_cursor.reset();
    }

    pub fn handle_key(&mut self, key: KeyEvent, env: &mut InputEnv<'_>) -> KeyOutcome {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        let alt = key.modifiers.contains(KeyModifiers::ALT);

        match key.code {
            KeyCode::Enter => self.submit_or_newline(env),
            KeyCode::Up => self.line_up(env.history),
            KeyCode::Down => self.line_down(env.history),
            KeyCode::Home => self.line_home(),
            KeyCode::End => self.line_end(),
            KeyCode::Left => match self.buffer.prev_boundary() {
                Some(prev) => self.move_point(prev),
                None => KeyOutcome::Ignored,
            },
            KeyCode::Right => match self.buffer.next_boundary() {
                Some(next) => self.move_point(next),
                None => KeyOutcome::Ignored,
            },
            KeyCode::Backspace => self.backspace(),
            KeyCode::Delete => self.delete_forward(),
            KeyCode::Tab => self.tab(&mut *env.completer),
            KeyCode::Char(c) if ctrl => match c.to_ascii_lowercase() {
                'c' => KeyOutcome::Abort,
                'd' if self.buffer.is_empty() => KeyOutcome::Eof,
                'd' => self.delete_forward(),
                'a' => self.line_home(),
                'e' => self.line_end(),
                'p' => self.line_up(env.history),
                'n' => self.line_down(env.history),
                'b' => self.handle_key(KeyEvent::new(KeyCode::Left, KeyModifiers::NONE), env),
                'f' => self.handle_key(KeyEvent::new(KeyCode::Right, KeyModifiers::NONE), env),
                'k' => self.kill_to_end(),
                'u' => self.kill_to_start(),
                'j' | 'm' => self.submit_or_newline(env),
                'i' => self.tab(&mut *env.completer),
                'h' => self.backspace(),
                _ => KeyOutcome::Ignored,
            },
            KeyCode::Char(_) if alt => KeyOutcome::Ignored,
            KeyCode::Char(c) => {
                self.buffer.insert_char(c);
                KeyOutcome::Changed
            }
            _ => KeyOutcome::Ignored,
        }
    }

    /// Insert pasted text. Tabs become indentation, carriage returns become
    /// newlines, other control characters are dropped.
    pub fn paste(&mut self, text: &str) -> KeyOutcome {
        let mut cleaned = String::with_capacity(text.len());
        let mut chars = text.chars().peekable();
        while let Some(c) = chars.next() {
            match c {
                '\t' => cleaned.push_str(&" ".repeat(INDENT_WIDTH)),
                '\r' => {
                    if chars.peek() == Some(&'\n') {
                        chars.next();
                    }
                    cleaned.push('\n');
                }
                '\n' => cleaned.push('\n'),
                c if c.is_control() => {}
                c => cleaned.push(c),
            }
        }
        if cleaned.is_empty() {
            return KeyOutcome::Ignored;
        }
        self.buffer.insert(&cleaned);
        KeyOutcome::Changed
    }

    fn move_point(&mut self, point: usize) -> KeyOutcome {
        if point == self.buffer.point() {
            return KeyOutcome::Ignored;
        }
        self.buffer.set_point(point);
        KeyOutcome::Changed
    }

    fn submit(&mut self) -> KeyOutcome {
        self.history_cursor.reset();
        KeyOutcome::Submit(self.buffer.take())
    }

    pub fn submit_or_newline(&mut self, env: &mut InputEnv<'_>) -> KeyOutcome {
        let text = self.buffer.text();

        if !self.buffer.at_end() {
            if !text.contains('\n') {
                return self.submit();
            }
            self.newline_with_indent();
            return KeyOutcome::Changed;
        }

        if env.bypass || text.starts_with('?') {
            return self.submit();
        }

        let source = format!("{text}\n");
        let final_line = line_count(text);
        match env.parser.try_parse(&source) {
            Ok(()) => self.submit(),
            Err(diagnostics) => {
                if diagnostics.iter().any(|d| d.line != final_line) {
                    tracing::trace!("input incomplete: {:?}", diagnostics);
                    self.newline_with_indent();
                    KeyOutcome::Changed
                } else {
                    self.submit()
                }
            }
        }
    }

    /// Break the line at the point, carrying the current indentation over.
    pub fn newline_with_indent(&mut self) {
        let text = self.buffer.text();
        let point = self.buffer.point();
        let indent = indent_before(text, point);
        if leading_spaces_before(text, point).is_some() {
            let start = line_start(text, point);
            self.buffer.delete(start..point);
        }
        self.buffer.insert("\n");
        self.buffer.insert(&" ".repeat(indent));
    }

    pub fn line_up(&mut self, history: &History) -> KeyOutcome {
        let text = self.buffer.text();
        let point = self.buffer.point();
        let start = line_start(text, point);
        let column = column_at(text, point);

        if start == 0 {
            let Some(entry) = self.history_cursor.previous(history, text) else {
                return KeyOutcome::Ignored;
            };
            let last_line = line_range(&entry, entry.len());
            let point = offset_at_column(&entry, last_line, column);
            self.buffer.replace(entry, point);
            return KeyOutcome::Changed;
        }

        let previous = line_range(text, start - 1);
        let target = offset_at_column(text, previous, column);
        self.move_point(target);
        KeyOutcome::Changed
    }

    pub fn line_down(&mut self, history: &History) -> KeyOutcome {
        let text = self.buffer.text();
        let point = self.buffer.point();
        let end = line_end(text, point);
        let column = column_at(text, point);

        if end == text.len() {
            let Some(entry) = self.history_cursor.next(history) else {
                return KeyOutcome::Ignored;
            };
            let first_line = line_range(&entry, 0);
            let point = offset_at_column(&entry, first_line, column);
            self.buffer.replace(entry, point);
            return KeyOutcome::Changed;
        }

        let next = line_range(text, end + 1);
        let target = offset_at_column(text, next, column);
        self.move_point(target);
        KeyOutcome::Changed
    }

    pub fn line_home(&mut self) -> KeyOutcome {
        let start = line_start(self.buffer.text(), self.buffer.point());
        self.move_point(start)
    }

    pub fn line_end(&mut self) -> KeyOutcome {
        let end = line_end(self.buffer.text(), self.buffer.point());
        self.move_point(end)
    }

    /// Inside leading indentation, remove back to the previous indent stop;
    /// elsewhere remove one character.
    pub fn backspace(&mut self) -> KeyOutcome {
        let point = self.buffer.point();
        let Some(prev) = self.buffer.prev_boundary() else {
            return KeyOutcome::Ignored;
        };

        match leading_spaces_before(self.buffer.text(), point) {
            Some(run) if run > 0 => {
                let count = match run % INDENT_WIDTH {
                    0 => INDENT_WIDTH,
                    partial => partial,
                };
                self.buffer.delete(point - count..point);
            }
            _ => self.buffer.delete(prev..point),
        }
        KeyOutcome::Changed
    }

    pub fn delete_forward(&mut self) -> KeyOutcome {
        match self.buffer.next_boundary() {
            Some(next) => {
                let point = self.buffer.point();
                self.buffer.delete(point..next);
                KeyOutcome::Changed
            }
            None => KeyOutcome::Ignored,
        }
    }

    /// Soft tab inside leading indentation, completion anywhere else.
    pub fn tab(&mut self, completer: &mut dyn Completer) -> KeyOutcome {
        let text = self.buffer.text();
        let point = self.buffer.point();

        if let Some(run) = leading_spaces_before(text, point) {
            let spaces = INDENT_WIDTH - run % INDENT_WIDTH;
            self.buffer.insert(&" ".repeat(spaces));
            return KeyOutcome::Changed;
        }

        let start = completion::word_start(text, point);
        let word = &text[start..point];
        let candidates = completer.complete(&text[..start], word);
        tracing::trace!("{} completion candidates for {:?}", candidates.len(), word);

        match completion::resolve(word, candidates) {
            Completion::None => KeyOutcome::Ignored,
            Completion::Insert(rest) => {
                self.buffer.insert(&rest);
                KeyOutcome::Changed
            }
            Completion::List(candidates) => KeyOutcome::Candidates(candidates),
        }
    }

    pub fn kill_to_end(&mut self) -> KeyOutcome {
        let point = self.buffer.point();
        let end = line_end(self.buffer.text(), point);
        if end == point {
            return KeyOutcome::Ignored;
        }
        self.buffer.delete(point..end);
        KeyOutcome::Changed
    }

    pub fn kill_to_start(&mut self) -> KeyOutcome {
        let point = self.buffer.point();
        let start = line_start(self.buffer.text(), point);
        if start == point {
            return KeyOutcome::Ignored;
        }
        self.buffer.delete(start..point);
        KeyOutcome::Changed
    }

    #[cfg(test)]
    pub(crate) fn set_buffer(&mut self, text: &str, point: usize) {
        self.buffer.replace(text, point);
    }
}
