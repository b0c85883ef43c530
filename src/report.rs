use serde::Serialize;

use crate::format::FormatOutcome;

/// Generate a unique execution ID for one invocation
pub fn generate_execution_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Machine-readable summary of one invocation
#[derive(Debug, Clone, Serialize)]
pub struct FormatReport {
    pub execution_id: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<FormatOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Checksum of the buffer text before formatting
    pub checksum_before: String,
    /// Checksum of the buffer text after formatting (equal to before on failure)
    pub checksum_after: String,
    /// Full formatted buffer text, only present on success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl FormatReport {
    pub fn success(
        execution_id: String,
        outcome: FormatOutcome,
        checksum_before: String,
        checksum_after: String,
        text: String,
    ) -> Self {
        Self {
            execution_id,
            success: true,
            outcome: Some(outcome),
            warning: outcome.warning().map(str::to_string),
            error: None,
            checksum_before,
            checksum_after,
            text: Some(text),
        }
    }

    pub fn failure(execution_id: String, error: String, checksum: String) -> Self {
        Self {
            execution_id,
            success: false,
            outcome: None,
            warning: None,
            error: Some(error),
            checksum_before: checksum.clone(),
            checksum_after: checksum,
            text: None,
        }
    }

    /// One-paragraph summary for a terminal
    pub fn human_summary(&self) -> String {
        if !self.success {
            return format!("Error: {}", self.error.as_deref().unwrap_or("unknown error"));
        }

        let mut summary = match self.outcome {
            Some(FormatOutcome::Formatted {
                applied_ops,
                line_shift,
                cursor,
                ..
            }) => format!(
                "Applied {} edit(s), line shift {:+}\nCursor: line {}, column {}",
                applied_ops,
                line_shift,
                cursor.line + 1,
                cursor.column + 1
            ),
            _ => "Nothing to format".to_string(),
        };
        if let Some(warning) = &self.warning {
            summary.push_str("\nWarning: ");
            summary.push_str(warning);
        }
        summary
    }
}
