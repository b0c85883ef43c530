use serde::Deserialize;

use crate::error::FormatError;

/// Header line the formatter writes before the reformatted text
///
/// Both fields are required; anything else in the object is ignored.
#[derive(Debug, Deserialize)]
struct ResponseHeader {
    #[serde(rename = "Cursor")]
    cursor: usize,
    #[serde(rename = "IncompleteFormat")]
    incomplete_format: bool,
}

/// Parsed formatter output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatResponse {
    /// Flat byte offset of the cursor in the reformatted text
    pub cursor_offset: usize,
    /// The formatter could not fully parse its input
    pub incomplete: bool,
    /// Reformatted text, one entry per buffer line
    pub formatted_lines: Vec<String>,
}

/// Split raw formatter stdout into header and body
///
/// # Returns
/// * `Err(FormatError::FormatterCrashed)` - stdout was empty
/// * `Err(FormatError::MalformedResponse)` - invalid UTF-8, an unparseable
///   header, or no body after the header
pub fn parse_response(stdout: &[u8]) -> Result<FormatResponse, FormatError> {
    if stdout.is_empty() {
        return Err(FormatError::FormatterCrashed);
    }

    let text = std::str::from_utf8(stdout).map_err(|e| {
        FormatError::MalformedResponse(format!("output is not valid UTF-8: {e}"))
    })?;

    // Split header from body
    let (header_line, body) = text.split_once('\n').ok_or_else(|| {
        FormatError::MalformedResponse("missing line break after the header".to_string())
    })?;

    // Parse JSON header
    let header: ResponseHeader = serde_json::from_str(header_line.trim_end_matches('\r'))
        .map_err(|e| FormatError::MalformedResponse(format!("bad header '{header_line}': {e}")))?;

    Ok(FormatResponse {
        cursor_offset: header.cursor,
        incomplete: header.incomplete_format,
        formatted_lines: body.split('\n').map(String::from).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_response_basic() {
        let out = b"{ \"Cursor\": 4, \"IncompleteFormat\": false }\nint x;\nint y;";
        let response = parse_response(out).unwrap();

        assert_eq!(response.cursor_offset, 4);
        assert!(!response.incomplete);
        assert_eq!(response.formatted_lines, vec!["int x;", "int y;"]);
    }

    #[test]
    fn test_parse_response_keeps_trailing_empty_line() {
        let out = b"{\"Cursor\":0,\"IncompleteFormat\":false}\na\n";
        let response = parse_response(out).unwrap();
        assert_eq!(response.formatted_lines, vec!["a", ""]);
    }

    #[test]
    fn test_parse_response_incomplete() {
        let out = b"{\"Cursor\":0,\"IncompleteFormat\":true}\nint x";
        assert!(parse_response(out).unwrap().incomplete);
    }

    #[test]
    fn test_parse_response_ignores_extra_fields() {
        let out = b"{\"Cursor\":1,\"IncompleteFormat\":false,\"Line\":3}\nx";
        assert_eq!(parse_response(out).unwrap().cursor_offset, 1);
    }

    #[test]
    fn test_parse_response_empty_is_crash() {
        assert!(matches!(parse_response(b""), Err(FormatError::FormatterCrashed)));
    }

    #[test]
    fn test_parse_response_not_json() {
        let out = b"int x;\nint y;";
        assert!(matches!(parse_response(out), Err(FormatError::MalformedResponse(_))));
    }

    #[test]
    fn test_parse_response_missing_field() {
        let out = b"{\"Cursor\":3}\nint x;";
        assert!(matches!(parse_response(out), Err(FormatError::MalformedResponse(_))));
    }

    #[test]
    fn test_parse_response_negative_cursor() {
        let out = b"{\"Cursor\":-1,\"IncompleteFormat\":false}\nint x;";
        assert!(matches!(parse_response(out), Err(FormatError::MalformedResponse(_))));
    }

    #[test]
    fn test_parse_response_header_only() {
        let out = b"{\"Cursor\":0,\"IncompleteFormat\":false}";
        assert!(matches!(parse_response(out), Err(FormatError::MalformedResponse(_))));
    }

    #[test]
    fn test_parse_response_invalid_utf8() {
        let out = b"{\"Cursor\":0,\"IncompleteFormat\":false}\n\xff\xfe";
        assert!(matches!(parse_response(out), Err(FormatError::MalformedResponse(_))));
    }
}
