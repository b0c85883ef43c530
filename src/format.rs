//! One complete format invocation.
//!
//! Ranges are resolved and the cursor offset is computed before the formatter
//! runs. The response is fully parsed before the buffer is touched, so every
//! error leaves the buffer exactly as it was.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::FormatConfig;
use crate::document::Buffer;
use crate::edit::{ReconcileResult, reconcile};
use crate::error::FormatError;
use crate::invoke::{FormatRequest, Formatter};
use crate::position::{Position, cursor_offset, translate_cursor};
use crate::range::RangeRequest;
use crate::response::parse_response;

pub const INCOMPLETE_WARNING: &str = "formatter: incomplete (syntax errors)";

/// What a single invocation did to the buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FormatOutcome {
    /// Diff-against-disk mode found no changed lines; the formatter never ran
    NothingToFormat,
    Formatted {
        /// Number of splices applied to the buffer
        applied_ops: usize,
        /// Net change in line count
        line_shift: i64,
        /// Where the cursor was moved
        cursor: Position,
        /// The formatter could not fully parse the input
        incomplete: bool,
    },
}

impl FormatOutcome {
    /// Message the user should see alongside an otherwise successful format
    pub fn warning(&self) -> Option<&'static str> {
        match self {
            FormatOutcome::Formatted { incomplete: true, .. } => Some(INCOMPLETE_WARNING),
            _ => None,
        }
    }

    pub fn is_changed(&self) -> bool {
        matches!(self, FormatOutcome::Formatted { applied_ops, .. } if *applied_ops > 0)
    }
}

/// Format `buffer` in place with `formatter`
///
/// # Arguments
/// * `buffer` - Host buffer; only touched once the response has been validated
/// * `formatter` - Runs the external tool
/// * `config` - Style and fallback style for this call
/// * `ranges` - Sources for the lines to format
///
/// # Returns
/// * `Ok(FormatOutcome::NothingToFormat)` - no changed lines in diff mode
/// * `Ok(FormatOutcome::Formatted { .. })` - edits applied, cursor moved
/// * `Err(FormatError)` - buffer untouched
pub fn format_buffer<B, F>(
    buffer: &mut B,
    formatter: &F,
    config: &FormatConfig,
    ranges: &RangeRequest,
) -> Result<FormatOutcome, FormatError>
where
    B: Buffer + ?Sized,
    F: Formatter + ?Sized,
{
    let Some(target_ranges) = ranges.resolve(buffer.lines()) else {
        info!("no changed lines to format");
        return Ok(FormatOutcome::NothingToFormat);
    };

    let offset = cursor_offset(buffer.lines(), buffer.cursor())?;

    let request = FormatRequest {
        full_text: buffer.text(),
        checksum: buffer.checksum(),
        target_ranges,
        cursor_offset: offset,
        style_name: config.style.clone(),
        fallback_style: config.fallback_style.clone(),
        source_path: buffer.path().map(|p| p.to_path_buf()),
    };
    debug!(cursor_offset = offset, ranges = ?request.target_ranges, "format request built");

    let stdout = formatter.run(&request)?.into_stdout()?;
    let response = parse_response(&stdout)?;

    let ReconcileResult {
        applied_count,
        line_shift,
    } = reconcile(buffer, &request.checksum, &response.formatted_lines)?;

    let cursor = translate_cursor(&response.formatted_lines, response.cursor_offset);
    buffer.set_cursor(cursor);

    if response.incomplete {
        warn!("{}", INCOMPLETE_WARNING);
    }
    info!(
        applied_count,
        line_shift,
        line = cursor.line,
        column = cursor.column,
        "buffer formatted"
    );

    Ok(FormatOutcome::Formatted {
        applied_ops: applied_count,
        line_shift,
        cursor,
        incomplete: response.incomplete,
    })
}
