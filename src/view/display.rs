//! Virtual-cursor redisplay of the prompt and the edit buffer.
//!
//! The engine keeps a model of where the terminal cursor is, relative to the
//! start of the prompt (the origin). Text is replayed through [`advance`],
//! either only to measure where it ends up or while painting it; both paths
//! share the same step function, so a measured position is exactly where the
//! painted text leaves the cursor.

use super::terminal;
use crate::primitives::highlighter::{INVISIBLE_END, INVISIBLE_START};
use crate::primitives::line_math::char_width;
use std::io::{self, Write};
use std::ops::{Add, AddAssign, Sub};

/// Column where continuation lines start.
pub const CONTINUATION_INDENT: i32 = 4;

/// A terminal cell relative to the origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct CursorPosition {
    pub row: i32,
    pub col: i32,
}

impl CursorPosition {
    pub const ORIGIN: Self = Self { row: 0, col: 0 };

    pub const fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }
}

impl Add for CursorPosition {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.row + rhs.row, self.col + rhs.col)
    }
}

impl AddAssign for CursorPosition {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sub for CursorPosition {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.row - rhs.row, self.col - rhs.col)
    }
}

/// Terminal side effect of one [`advance`] step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Print the character
    Print,
    /// Print the character, which filled the row, then wrap
    PrintWrap,
    /// Wrap first (a wide character does not fit), then print
    WrapPrint,
    /// Logical newline into the continuation indent
    Newline,
    /// Control character other than newline, never painted
    Skip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Advance {
    pub cursor: CursorPosition,
    pub effect: Effect,
}

/// Where the cursor lands after `ch` is written at `cursor` on a terminal
/// `width` columns wide.
pub fn advance(cursor: CursorPosition, ch: char, width: u16) -> Advance {
    let width = i32::from(width.max(1));

    if ch == '\n' {
        return Advance {
            cursor: CursorPosition::new(cursor.row + 1, CONTINUATION_INDENT),
            effect: Effect::Newline,
        };
    }
    if ch.is_control() {
        return Advance {
            cursor,
            effect: Effect::Skip,
        };
    }

    let cells = char_width(ch) as i32;
    let (mut next, mut effect) = if cursor.col > 0 && cursor.col + cells > width {
        (CursorPosition::new(cursor.row + 1, cells), Effect::WrapPrint)
    } else {
        (CursorPosition::new(cursor.row, cursor.col + cells), Effect::Print)
    };

    if next.col >= width {
        next = CursorPosition::new(next.row + 1, 0);
        effect = Effect::PrintWrap;
    }

    Advance {
        cursor: next,
        effect,
    }
}

fn wrap(out: &mut dyn Write) -> io::Result<()> {
    out.write_all(b"\r\n")?;
    terminal::erase_to_end_of_screen(&mut *out)
}

fn paint_effect(out: &mut dyn Write, ch: char, effect: Effect) -> io::Result<()> {
    let mut buf = [0u8; 4];
    let encoded = ch.encode_utf8(&mut buf).as_bytes();
    match effect {
        Effect::Print => out.write_all(encoded),
        Effect::PrintWrap => {
            out.write_all(encoded)?;
            wrap(out)
        }
        Effect::WrapPrint => {
            terminal::erase_to_end_of_line(&mut *out)?;
            wrap(out)?;
            out.write_all(encoded)
        }
        Effect::Newline => {
            terminal::erase_to_end_of_line(&mut *out)?;
            out.write_all(b"\r\n")?;
            out.write_all(" ".repeat(CONTINUATION_INDENT as usize).as_bytes())
        }
        Effect::Skip => Ok(()),
    }
}

/// Virtual cursor state carried across redisplay cycles.
#[derive(Debug, Clone, Default)]
pub struct DisplayEngine {
    current: CursorPosition,
    width: Option<u16>,
    point: usize,
    end: CursorPosition,
}

impl DisplayEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Where the engine believes the terminal cursor is.
    pub fn current(&self) -> CursorPosition {
        self.current
    }

    /// Replay `text` from the current position.
    ///
    /// `offset` counts visible bytes (markers and the bytes between them are
    /// not counted); the returned position is where the cursor stood when
    /// that many visible bytes had been consumed. With `out` set, the text
    /// is painted as it is replayed.
    fn replay(
        &mut self,
        text: &str,
        offset: Option<usize>,
        width: u16,
        mut out: Option<&mut dyn Write>,
    ) -> io::Result<Option<CursorPosition>> {
        let mut target = None;
        let mut visible = 0usize;
        let mut hidden = false;

        for ch in text.chars() {
            if hidden {
                if ch == INVISIBLE_END {
                    hidden = false;
                } else if let Some(out) = out.as_deref_mut() {
                    let mut buf = [0u8; 4];
                    out.write_all(ch.encode_utf8(&mut buf).as_bytes())?;
                }
                continue;
            }

            match ch {
                INVISIBLE_START => hidden = true,
                INVISIBLE_END => {}
                _ => {
                    if target.is_none() && offset == Some(visible) {
                        target = Some(self.current);
                    }
                    let step = advance(self.current, ch, width);
                    if let Some(out) = out.as_deref_mut() {
                        paint_effect(out, ch, step.effect)?;
                    }
                    self.current = step.cursor;
                    visible += ch.len_utf8();
                }
            }
        }

        if target.is_none() && offset == Some(visible) {
            target = Some(self.current);
        }
        Ok(target)
    }

    /// Advance the virtual cursor over `text` without writing anything.
    pub fn measure(&mut self, text: &str, offset: Option<usize>, width: u16) -> Option<CursorPosition> {
        // No writer, no I/O
        self.replay(text, offset, width, None).unwrap_or(None)
    }

    /// Paint `text` from the current position.
    pub fn paint(
        &mut self,
        out: &mut impl Write,
        text: &str,
        offset: Option<usize>,
        width: u16,
    ) -> io::Result<Option<CursorPosition>> {
        self.replay(text, offset, width, Some(out as &mut dyn Write))
    }

    /// Move the physical cursor to `target`: rows first, then the column.
    pub fn move_to(&mut self, out: &mut impl Write, target: CursorPosition) -> io::Result<()> {
        if target == self.current {
            return Ok(());
        }
        let delta = target - self.current;
        terminal::move_vertical(out, delta.row)?;
        terminal::move_to_column(out, target.col)?;
        self.current = target;
        Ok(())
    }

    /// Repaint the prompt and buffer and park the cursor at `point`.
    ///
    /// `highlighted` is the buffer after highlighting with invisible markers;
    /// `point` is a byte offset into the unhighlighted buffer.
    pub fn redisplay(
        &mut self,
        out: &mut impl Write,
        prompt: &str,
        highlighted: &str,
        point: usize,
        width: u16,
    ) -> io::Result<CursorPosition> {
        if self.width.is_some() && self.width != Some(width) {
            // Where did the last cycle leave the cursor at the new width?
            tracing::debug!("terminal width changed to {}, resynchronizing", width);
            self.current = CursorPosition::ORIGIN;
            self.measure(prompt, None, width);
            let old_point = self.point;
            let resync = self.measure(highlighted, Some(old_point), width);
            if let Some(resync) = resync {
                self.current = resync;
            }
        }

        self.move_to(out, CursorPosition::ORIGIN)?;
        self.paint(out, prompt, None, width)?;
        let target = self
            .paint(out, highlighted, Some(point), width)?
            .unwrap_or(self.current);
        self.end = self.current;

        terminal::erase_to_end_of_screen(out)?;
        self.move_to(out, target)?;
        out.flush()?;

        self.width = Some(width);
        self.point = point;
        Ok(target)
    }

    /// Leave the edited input: park below its last row so output starts on
    /// a fresh line.
    pub fn finish(&mut self, out: &mut impl Write) -> io::Result<()> {
        let end = self.end;
        self.move_to(out, end)?;
        out.write_all(b"\r\n")?;
        out.flush()?;
        self.reset();
        Ok(())
    }

    /// Re-anchor the origin at the current physical cursor.
    pub fn reset(&mut self) {
        self.current = CursorPosition::ORIGIN;
        self.end = CursorPosition::ORIGIN;
        self.point = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn screen_after(bytes: &[u8], rows: u16, cols: u16) -> vt100::Parser {
        let mut parser = vt100::Parser::new(rows, cols, 0);
        parser.process(bytes);
        parser
    }

    #[test]
    fn test_advance_wraps_at_width() {
        let step = advance(CursorPosition::new(0, 8), 'x', 10);
        assert_eq!(step.cursor, CursorPosition::new(0, 9));
        assert_eq!(step.effect, Effect::Print);

        let step = advance(CursorPosition::new(0, 9), 'x', 10);
        assert_eq!(step.cursor, CursorPosition::new(1, 0));
        assert_eq!(step.effect, Effect::PrintWrap);
    }

    #[test]
    fn test_advance_newline_lands_on_indent() {
        let step = advance(CursorPosition::new(2, 7), '\n', 80);
        assert_eq!(step.cursor, CursorPosition::new(3, CONTINUATION_INDENT));
        assert_eq!(step.effect, Effect::Newline);
    }

    #[test]
    fn test_wide_char_wraps_before_printing() {
        let step = advance(CursorPosition::new(0, 9), '日', 10);
        assert_eq!(step.cursor, CursorPosition::new(1, 2));
        assert_eq!(step.effect, Effect::WrapPrint);
    }

    #[test]
    fn test_invisible_runs_do_not_move_cursor() {
        let mut engine = DisplayEngine::new();
        let text = "a\x01\x1b[34m\x02b\x01\x1b[0m\x02c";
        let target = engine.measure(text, Some(2), 80);
        assert_eq!(target, Some(CursorPosition::new(0, 2)));
        assert_eq!(engine.current(), CursorPosition::new(0, 3));
    }

    #[test]
    fn test_paint_emits_hidden_bytes_but_not_markers() {
        let mut engine = DisplayEngine::new();
        let mut out = Vec::new();
        engine
            .paint(&mut out, "a\x01\x1b[34m\x02b", None, 80)
            .unwrap();
        let painted = String::from_utf8(out).unwrap();
        assert_eq!(painted, "a\x1b[34mb");
    }

    #[test]
    fn test_redisplay_parks_cursor_at_point() {
        let mut engine = DisplayEngine::new();
        let mut out = Vec::new();
        let buffer = "if (x) {\n    y();\n}";
        // Point right after "y"
        let point = buffer.find("y").unwrap() + 1;

        let target = engine
            .redisplay(&mut out, "cy# ", buffer, point, 40)
            .unwrap();
        assert_eq!(target, CursorPosition::new(1, 9));

        let parser = screen_after(&out, 10, 40);
        let screen = parser.screen();
        assert_eq!(screen.cursor_position(), (1, 9));
        let rows: Vec<String> = screen.rows(0, 40).take(3).collect();
        assert_eq!(rows, vec!["cy# if (x) {", "        y();", "    }"]);
    }

    #[test]
    fn test_redisplay_wraps_long_line_on_real_terminal() {
        let mut engine = DisplayEngine::new();
        let mut out = Vec::new();
        let buffer = "x".repeat(16);

        let target = engine
            .redisplay(&mut out, "cy# ", &buffer, buffer.len(), 10)
            .unwrap();
        // 4 prompt cells + 16 = 20 cells: exactly two full rows
        assert_eq!(target, CursorPosition::new(2, 0));

        let parser = screen_after(&out, 10, 10);
        assert_eq!(parser.screen().cursor_position(), (2, 0));
        let rows: Vec<String> = parser.screen().rows(0, 10).take(2).collect();
        assert_eq!(rows, vec!["cy# xxxxxx", "xxxxxxxxxx"]);
    }

    #[test]
    fn test_repaint_after_edit_clears_stale_tail() {
        let mut engine = DisplayEngine::new();
        let mut out = Vec::new();
        engine
            .redisplay(&mut out, "cy# ", "abcdef\n    ghi", 14, 40)
            .unwrap();
        engine.redisplay(&mut out, "cy# ", "abc", 3, 40).unwrap();

        let parser = screen_after(&out, 10, 40);
        let rows: Vec<String> = parser.screen().rows(0, 40).take(2).collect();
        assert_eq!(rows, vec!["cy# abc", ""]);
        assert_eq!(parser.screen().cursor_position(), (0, 7));
    }

    #[test]
    fn test_width_change_resynchronizes_cursor() {
        let mut engine = DisplayEngine::new();
        let mut out = Vec::new();
        let buffer = "abcdefghijkl";
        engine
            .redisplay(&mut out, "cy# ", buffer, buffer.len(), 40)
            .unwrap();

        let mut parser = screen_after(&out, 10, 40);
        assert_eq!(parser.screen().cursor_position(), (0, 16));

        // The terminal shrinks; at 10 columns the old cursor would sit on
        // the second row of the reflowed input
        parser.set_size(10, 10);
        let mut out = Vec::new();
        let target = engine
            .redisplay(&mut out, "cy# ", buffer, buffer.len(), 10)
            .unwrap();
        assert_eq!(target, CursorPosition::new(1, 6));
        assert_eq!(out.iter().filter(|&&b| b == b'\n').count(), 1);

        parser.process(&out);
        let screen = parser.screen();
        assert_eq!(screen.cursor_position(), (1, 6));
        let rows: Vec<String> = screen.rows(0, 10).take(2).collect();
        assert_eq!(rows, vec!["cy# abcdef", "ghijkl"]);
    }

    #[test]
    fn test_finish_moves_below_input() {
        let mut engine = DisplayEngine::new();
        let mut out = Vec::new();
        engine
            .redisplay(&mut out, "cy# ", "a\nb", 0, 40)
            .unwrap();
        engine.finish(&mut out).unwrap();

        let parser = screen_after(&out, 10, 40);
        assert_eq!(parser.screen().cursor_position(), (2, 0));
        assert_eq!(engine.current(), CursorPosition::ORIGIN);
    }

    proptest! {
        #[test]
        fn prop_measure_and_paint_agree(
            text in "[a-z \n日]{0,60}",
            width in 2u16..30,
            frac in 0.0f64..=1.0,
        ) {
            let point = text
                .char_indices()
                .map(|(i, _)| i)
                .chain(std::iter::once(text.len()))
                .nth(((text.chars().count() as f64) * frac) as usize)
                .unwrap_or(text.len());

            let mut measured = DisplayEngine::new();
            let measured_target = measured.measure(&text, Some(point), width);

            let mut painted = DisplayEngine::new();
            let mut out = Vec::new();
            let painted_target = painted.paint(&mut out, &text, Some(point), width).unwrap();

            prop_assert_eq!(measured_target, painted_target);
            prop_assert_eq!(measured.current(), painted.current());
        }

        #[test]
        fn prop_row_and_column_follow_division(n in 0usize..500, width in 1u16..120) {
            let text = "a".repeat(n);
            let mut engine = DisplayEngine::new();
            engine.measure(&text, None, width);

            let w = width as usize;
            prop_assert_eq!(engine.current(), CursorPosition::new((n / w) as i32, (n % w) as i32));
        }
    }
}
