//! Persistent command history.
//!
//! Entries may span several logical lines. The file keeps one record per
//! physical line, so embedded newlines are folded into [`SENTINEL`] on the
//! way out and restored on the way in.

use crate::config::HistoryPersistence;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Stands in for `\n` inside an on-disk record.
pub const SENTINEL: char = '\x01';

/// Fold an entry into a single on-disk record.
pub fn encode_entry(entry: &str) -> String {
    entry.replace('\n', &SENTINEL.to_string())
}

/// Restore an on-disk record to the entry it came from.
pub fn decode_entry(record: &str) -> String {
    record.replace(SENTINEL, "\n")
}

/// In-memory history backed by a file.
#[derive(Debug)]
pub struct History {
    path: Option<PathBuf>,
    entries: Vec<String>,
    persistence: HistoryPersistence,
    max_entries: usize,
    /// Entries added since load, written by `close()` in `OnExit` mode
    added: usize,
    closed: bool,
}

impl History {
    /// History that lives only in memory.
    pub fn in_memory(max_entries: usize) -> Self {
        Self {
            path: None,
            entries: Vec::new(),
            persistence: HistoryPersistence::OnExit,
            max_entries: max_entries.max(1),
            added: 0,
            closed: false,
        }
    }

    /// Load `path` (a missing file is an empty history).
    ///
    /// In `Incremental` mode the file is rewritten right away from what was
    /// loaded, so later appends extend a clean base.
    pub fn load(path: &Path, persistence: HistoryPersistence, max_entries: usize) -> io::Result<Self> {
        let mut history = Self::in_memory(max_entries);
        history.path = Some(path.to_path_buf());
        history.persistence = persistence;

        match fs::read(path) {
            Ok(bytes) => {
                let contents = String::from_utf8_lossy(&bytes);
                history.entries = contents
                    .lines()
                    .filter(|record| !record.is_empty())
                    .map(decode_entry)
                    .collect();
                history.trim();
                tracing::debug!(
                    "Loaded {} history entries from {}",
                    history.entries.len(),
                    path.display()
                );
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }

        if persistence == HistoryPersistence::Incremental {
            history.rewrite()?;
        }
        Ok(history)
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.entries.get(index).map(String::as_str)
    }

    /// Record a submitted entry. Incremental mode persists it before
    /// returning.
    pub fn append(&mut self, entry: &str) -> io::Result<()> {
        if entry.is_empty() {
            return Ok(());
        }
        self.entries.push(entry.to_string());
        self.added += 1;
        self.trim();

        if self.persistence == HistoryPersistence::Incremental {
            if let Some(path) = &self.path {
                let mut file = OpenOptions::new().create(true).append(true).open(path)?;
                writeln!(file, "{}", encode_entry(entry))?;
            }
        }
        Ok(())
    }

    /// Final write. In `OnExit` mode the whole file is rewritten; calling
    /// this more than once is harmless.
    pub fn close(&mut self) -> io::Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        if self.persistence == HistoryPersistence::OnExit && self.added > 0 {
            self.rewrite()?;
            tracing::debug!("Saved {} new history entries", self.added);
        }
        Ok(())
    }

    fn trim(&mut self) {
        if self.entries.len() > self.max_entries {
            let excess = self.entries.len() - self.max_entries;
            self.entries.drain(..excess);
        }
    }

    fn rewrite(&self) -> io::Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let mut out = BufWriter::new(File::create(path)?);
        for entry in &self.entries {
            writeln!(out, "{}", encode_entry(entry))?;
        }
        out.flush()
    }
}

impl Drop for History {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::warn!("Failed to save history: {}", e);
        }
    }
}

/// Position while browsing history with Up/Down.
///
/// `index == entries.len()` means "the line being typed", which is kept in
/// `scratch` while older entries are shown.
#[derive(Debug, Clone, Default)]
pub struct HistoryCursor {
    index: Option<usize>,
    scratch: Option<String>,
}

impl HistoryCursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Step to the older entry. `current` is the text on screen.
    pub fn previous(&mut self, history: &History, current: &str) -> Option<String> {
        let index = self.index.unwrap_or(history.len());
        if index == 0 {
            return None;
        }
        if index == history.len() {
            self.scratch = Some(current.to_string());
        }
        self.index = Some(index - 1);
        history.get(index - 1).map(str::to_string)
    }

    /// Step to the newer entry, ending at the saved scratch line.
    pub fn next(&mut self, history: &History) -> Option<String> {
        let index = self.index?;
        if index + 1 >= history.len() {
            self.index = None;
            return Some(self.scratch.take().unwrap_or_default());
        }
        self.index = Some(index + 1);
        history.get(index + 1).map(str::to_string)
    }

    pub fn reset(&mut self) {
        self.index = None;
        self.scratch = None;
    }
}
