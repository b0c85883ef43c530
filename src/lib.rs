// Error taxonomy
pub mod error;

// Formatter settings
pub mod config;

// Host buffer trait and in-memory document
pub mod document;

// File operations module
pub mod file;

// Cursor offset translation
pub mod position;

// Line range selection
pub mod range;

// External formatter process
pub mod invoke;

// Formatter output parsing
pub mod response;

// Line diff and buffer reconciliation
pub mod edit;

// Full invocation pipeline
pub mod format;

// JSON report module
pub mod report;

// Re-exports
pub use config::FormatConfig;
pub use document::{Buffer, Document, checksum};
pub use edit::{
    EditOp, EditTag, ReconcileResult, apply_ops, covers, diff_lines, reconcile,
    sort_ops_descending,
};
pub use error::FormatError;
pub use file::{FileContent, FileError, read_file, write_file, write_file_if_unchanged};
pub use format::{FormatOutcome, INCOMPLETE_WARNING, format_buffer};
pub use invoke::{FormatRequest, Formatter, FormatterOutput, ProcessFormatter};
pub use position::{
    Position, cursor_offset, offset_to_position, position_to_offset, translate_cursor,
};
pub use range::{LineRange, LinesOverride, RangeRequest, TargetRanges, changed_ranges};
pub use report::{FormatReport, generate_execution_id};
pub use response::{FormatResponse, parse_response};
