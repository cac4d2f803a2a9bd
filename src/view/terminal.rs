//! Terminal metrics and raw cursor control.
//!
//! Thin wrappers over crossterm commands. Every function queues into the
//! given writer; nothing is flushed here.

use crossterm::cursor::{MoveDown, MoveToColumn, MoveUp};
use crossterm::terminal::{Clear, ClearType};
use crossterm::QueueableCommand;
use std::io::{self, Write};

/// Width used when the terminal cannot be queried (output is not a tty).
pub const FALLBACK_WIDTH: u16 = 80;

/// Current terminal width in columns.
///
/// Falls back to `$COLUMNS`, then to [`FALLBACK_WIDTH`].
pub fn terminal_width() -> u16 {
    match crossterm::terminal::size() {
        Ok((width, _)) if width > 0 => width,
        _ => std::env::var("COLUMNS")
            .ok()
            .and_then(|c| c.parse::<u16>().ok())
            .filter(|&w| w > 0)
            .unwrap_or(FALLBACK_WIDTH),
    }
}

/// Move the cursor `rows` rows down (negative: up). Zero emits nothing,
/// since `CSI 0 A` moves one row on most terminals.
pub fn move_vertical(out: &mut (impl Write + ?Sized), rows: i32) -> io::Result<()> {
    let count = u16::try_from(rows.unsigned_abs()).unwrap_or(u16::MAX);
    if rows < 0 {
        out.queue(MoveUp(count))?;
    } else if rows > 0 {
        out.queue(MoveDown(count))?;
    }
    Ok(())
}

/// Set the cursor column (0-based) on the current row.
pub fn move_to_column(out: &mut (impl Write + ?Sized), column: i32) -> io::Result<()> {
    let column = u16::try_from(column.max(0)).unwrap_or(u16::MAX);
    out.queue(MoveToColumn(column))?;
    Ok(())
}

pub fn erase_to_end_of_line(out: &mut (impl Write + ?Sized)) -> io::Result<()> {
    out.queue(Clear(ClearType::UntilNewLine))?;
    Ok(())
}

pub fn erase_to_end_of_screen(out: &mut (impl Write + ?Sized)) -> io::Result<()> {
    out.queue(Clear(ClearType::FromCursorDown))?;
    Ok(())
}
