use crate::file::FileError;

/// Everything that can stop a format invocation.
///
/// Every variant is raised before the buffer is touched. Once the reconciler
/// starts splicing, nothing in this enum can occur.
#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    /// Cursor position or target range could not be determined
    #[error("{0}")]
    Input(String),

    /// The formatter could not be started, failed, or wrote to stderr
    #[error("formatter failed: {message}")]
    ExternalTool {
        message: String,
        /// Captured stderr, verbatim
        stderr: String,
    },

    /// The formatter exited cleanly but produced no output
    #[error(
        "no output from formatter (crashed?); please report this to the formatter's bug tracker"
    )]
    FormatterCrashed,

    /// The first output line was not a valid header
    #[error("malformed formatter response: {0}")]
    MalformedResponse(String),

    /// The buffer no longer matches the text that was sent to the formatter
    #[error("buffer changed while formatting: expected checksum {expected}, got {actual}")]
    BufferChanged { expected: String, actual: String },

    #[error(transparent)]
    File(#[from] FileError),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl FormatError {
    pub fn input(message: impl Into<String>) -> Self {
        FormatError::Input(message.into())
    }

    pub fn external_tool(message: impl Into<String>, stderr: impl Into<String>) -> Self {
        FormatError::ExternalTool {
            message: message.into(),
            stderr: stderr.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_external_tool_display_carries_message() {
        let err = FormatError::external_tool("exit status 1: bad style", "bad style\n");
        assert_eq!(err.to_string(), "formatter failed: exit status 1: bad style");
    }

    #[test]
    fn test_crashed_display_mentions_bug_report() {
        assert!(FormatError::FormatterCrashed.to_string().contains("bug"));
    }
}
