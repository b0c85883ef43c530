use serde::Serialize;

use crate::error::FormatError;

/// Cursor position in a buffer
///
/// Both fields are 0-indexed. `column` counts bytes of the line's UTF-8 text,
/// the same unit the formatter uses for its flat `-cursor` offset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Position {
    /// Line index (0-indexed)
    pub line: usize,
    /// Byte column within the line (0-indexed)
    pub column: usize,
}

impl Position {
    pub const fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

/// Convert a line/column position into a flat byte offset
///
/// Lines are joined with a single `\n`, so every line before `pos.line`
/// contributes its length plus one. A column past the end of its line is
/// clamped to the line length.
///
/// # Returns
/// * `None` if `pos.line` is outside the buffer
pub fn position_to_offset<S: AsRef<str>>(lines: &[S], pos: Position) -> Option<usize> {
    let target = lines.get(pos.line)?.as_ref();

    let line_start: usize = lines[..pos.line]
        .iter()
        .map(|l| l.as_ref().len() + 1)
        .sum();

    Some(line_start + pos.column.min(target.len()))
}

/// Convert a flat byte offset into a line/column position
///
/// Offsets that land on a line's trailing `\n` stay on that line, at a column
/// equal to its length. Offsets past the end of the text clamp to the end of
/// the last line.
pub fn offset_to_position<S: AsRef<str>>(lines: &[S], offset: usize) -> Position {
    let mut line_start = 0;

    for (line, text) in lines.iter().enumerate() {
        let len = text.as_ref().len();
        if offset <= line_start + len {
            return Position::new(line, offset - line_start);
        }
        line_start += len + 1;
    }

    match lines.last() {
        Some(last) => Position::new(lines.len() - 1, last.as_ref().len()),
        None => Position::default(),
    }
}

/// Flat offset of the cursor in the text about to be formatted
///
/// An empty buffer has no addressable cursor, so the formatter must not be
/// invoked at all.
///
/// # Arguments
/// * `lines` - Buffer lines, joined with `\n` by the caller
/// * `cursor` - 0-indexed position; the column is clamped to the line length
pub fn cursor_offset<S: AsRef<str>>(lines: &[S], cursor: Position) -> Result<usize, FormatError> {
    let is_empty = match lines {
        [] => true,
        [only] => only.as_ref().is_empty(),
        _ => false,
    };
    if is_empty {
        return Err(FormatError::input(
            "couldn't determine cursor position: the buffer is empty",
        ));
    }

    position_to_offset(lines, cursor).ok_or_else(|| {
        FormatError::input(format!(
            "couldn't determine cursor position: line {} is outside a {}-line buffer",
            cursor.line + 1,
            lines.len()
        ))
    })
}

/// Where the cursor belongs after formatting
///
/// Pure function of the formatter's reported offset and the reformatted
/// lines; independent of the edit ops used to reach them.
pub fn translate_cursor<S: AsRef<str>>(formatted_lines: &[S], offset: usize) -> Position {
    offset_to_position(formatted_lines, offset)
}
