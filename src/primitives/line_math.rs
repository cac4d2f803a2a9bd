//! Logical-line arithmetic over an edit buffer.
//!
//! A logical line is a `\n`-delimited segment of the buffer. All offsets are
//! byte offsets on char boundaries; columns are display columns
//! (unicode-width), so wide characters count twice.

use std::ops::Range;
use unicode_width::UnicodeWidthChar;

/// Display width of one character; control characters are zero-width.
#[inline]
pub fn char_width(c: char) -> usize {
    c.width().unwrap_or(0)
}

/// Byte offset where the logical line containing `point` starts.
pub fn line_start(text: &str, point: usize) -> usize {
    text[..point].rfind('\n').map_or(0, |nl| nl + 1)
}

/// Byte offset of the `\n` ending the logical line containing `point`, or
/// the buffer length on the last line.
pub fn line_end(text: &str, point: usize) -> usize {
    text[point..].find('\n').map_or(text.len(), |nl| point + nl)
}

/// Range of the logical line containing `point`, without its newline.
pub fn line_range(text: &str, point: usize) -> Range<usize> {
    line_start(text, point)..line_end(text, point)
}

/// Number of logical lines (an empty buffer has one).
pub fn line_count(text: &str) -> usize {
    text.matches('\n').count() + 1
}

/// Length of the all-space run between the line start and `point`, if the
/// point is preceded only by spaces on its logical line.
///
/// Returns `Some(0)` at the very start of a line.
pub fn leading_spaces_before(text: &str, point: usize) -> Option<usize> {
    let start = line_start(text, point);
    let prefix = &text[start..point];
    prefix.bytes().all(|b| b == b' ').then_some(prefix.len())
}

/// Number of spaces that open the logical line containing `point`, counted
/// no further than `point`.
pub fn indent_before(text: &str, point: usize) -> usize {
    let start = line_start(text, point);
    text[start..point].bytes().take_while(|&b| b == b' ').count()
}

/// Display column of `point` within its logical line.
pub fn column_at(text: &str, point: usize) -> usize {
    let start = line_start(text, point);
    text[start..point].chars().map(char_width).sum()
}

/// Byte offset inside `line` (a range of `text`) at display column
/// `column`, clamped to the end of the line.
pub fn offset_at_column(text: &str, line: Range<usize>, column: usize) -> usize {
    let mut current = 0;
    for (idx, ch) in text[line.clone()].char_indices() {
        if current >= column {
            return line.start + idx;
        }
        current += char_width(ch);
    }
    line.end
}
