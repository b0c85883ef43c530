use std::ops::Range;
use std::path::{Path, PathBuf};

use crate::position::Position;
use crate::range::LineRange;

/// The host editor's view of the buffer being formatted
///
/// Implementors own the text; the formatter only reads it up front and
/// mutates it through [`Buffer::splice`].
pub trait Buffer {
    /// Current buffer lines, without line terminators
    fn lines(&self) -> &[String];

    /// Replace `lines()[range]` with `replacement`
    fn splice(&mut self, range: Range<usize>, replacement: &[String]);

    fn cursor(&self) -> Position;

    fn set_cursor(&mut self, pos: Position);

    /// Active line selection, if any
    fn selection(&self) -> Option<LineRange>;

    /// Path of the on-disk counterpart, used for style detection
    fn path(&self) -> Option<&Path>;

    /// Text handed to the formatter: lines joined with `\n`
    fn text(&self) -> String {
        self.lines().join("\n")
    }

    /// BLAKE3 checksum of [`Buffer::text`] (hex-encoded)
    fn checksum(&self) -> String {
        checksum(&self.text())
    }
}

/// Hex-encoded BLAKE3 hash of `text`
pub fn checksum(text: &str) -> String {
    blake3::hash(text.as_bytes()).to_hex().to_string()
}

/// In-memory buffer used by the command-line host
///
/// Always holds at least one line. Whether the source text ended in a newline
/// is remembered separately so [`Document::to_text`] can restore it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    lines: Vec<String>,
    trailing_newline: bool,
    cursor: Position,
    selection: Option<LineRange>,
    path: Option<PathBuf>,
}

impl Document {
    /// Build a document from raw text
    ///
    /// `\r\n` terminators are normalized to `\n`.
    pub fn from_text(text: &str) -> Self {
        let mut lines: Vec<String> = text.lines().map(String::from).collect();
        if lines.is_empty() {
            lines.push(String::new());
        }

        Self {
            lines,
            trailing_newline: text.ends_with('\n'),
            cursor: Position::default(),
            selection: None,
            path: None,
        }
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_cursor(mut self, cursor: Position) -> Self {
        self.cursor = cursor;
        self
    }

    pub fn with_selection(mut self, selection: Option<LineRange>) -> Self {
        self.selection = selection;
        self
    }

    /// Full text, including the trailing newline if the source had one
    pub fn to_text(&self) -> String {
        let mut text = self.lines.join("\n");
        if self.trailing_newline {
            text.push('\n');
        }
        text
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }
}

impl Buffer for Document {
    fn lines(&self) -> &[String] {
        &self.lines
    }

    fn splice(&mut self, range: Range<usize>, replacement: &[String]) {
        self.lines.splice(range, replacement.iter().cloned());
        if self.lines.is_empty() {
            self.lines.push(String::new());
        }
    }

    fn cursor(&self) -> Position {
        self.cursor
    }

    fn set_cursor(&mut self, pos: Position) {
        self.cursor = pos;
    }

    fn selection(&self) -> Option<LineRange> {
        self.selection
    }

    fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}
