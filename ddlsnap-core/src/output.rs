//! Append-only text sinks for user-facing notices and changelog output.

use std::sync::Mutex;

/// Write-only surface receiving notices and rendered changelogs.
pub trait OutputSink: Send + Sync {
    /// Appends one line of text.
    fn line(&self, text: &str);
}

/// Prints each line to stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutSink;

impl OutputSink for StdoutSink {
    fn line(&self, text: &str) {
        println!("{text}");
    }
}

/// Collects lines in memory.
#[derive(Debug, Default)]
pub struct BufferSink {
    lines: Mutex<Vec<String>>,
}

impl BufferSink {
    /// Creates an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Lines appended so far.
    pub fn lines(&self) -> Vec<String> {
        match self.lines.lock() {
            Ok(lines) => lines.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl OutputSink for BufferSink {
    fn line(&self, text: &str) {
        match self.lines.lock() {
            Ok(mut lines) => lines.push(text.to_string()),
            Err(poisoned) => poisoned.into_inner().push(text.to_string()),
        }
    }
}
