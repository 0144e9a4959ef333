//! Indented, line-oriented trace buffer.

use std::fmt::{self, Write};

const INDENT: &str = "  ";

/// Accumulates trace lines, indenting each by the current depth.
///
/// Depth starts at -1 so the outermost comparison, which enters once before
/// writing, prints at column 0. A label leaves the line open: the next write
/// continues it without indentation.
#[derive(Debug)]
pub struct TraceWriter {
    depth: isize,
    pending_label: bool,
    buf: String,
}

impl Default for TraceWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl TraceWriter {
    pub fn new() -> Self {
        Self {
            depth: -1,
            pending_label: false,
            buf: String::new(),
        }
    }

    pub fn enter(&mut self) {
        self.depth += 1;
    }

    pub fn leave(&mut self) {
        self.depth -= 1;
    }

    pub fn depth(&self) -> isize {
        self.depth
    }

    /// Writes one full line.
    pub fn line(&mut self, args: fmt::Arguments<'_>) {
        self.indent();
        // String writes are infallible.
        let _ = self.buf.write_fmt(args);
        self.buf.push('\n');
    }

    /// Writes `args` and leaves the line open for the next write.
    pub fn label(&mut self, args: fmt::Arguments<'_>) {
        self.indent();
        // String writes are infallible.
        let _ = self.buf.write_fmt(args);
        self.pending_label = true;
    }

    fn indent(&mut self) {
        if self.pending_label {
            self.pending_label = false;
            return;
        }
        for _ in 0..self.depth.max(0) {
            self.buf.push_str(INDENT);
        }
    }

    pub fn as_str(&self) -> &str {
        &self.buf
    }

    pub fn into_string(self) -> String {
        self.buf
    }
}
