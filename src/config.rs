//! Formatter settings.
//!
//! A [`FormatConfig`] is built fresh for every invocation and passed in
//! explicitly. It can be loaded from a JSON file; the command line and the
//! environment override whatever the file says.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::FormatError;
use crate::file::read_file;

pub const DEFAULT_FORMATTER: &str = "clang-format";
pub const DEFAULT_STYLE: &str = "file";

fn default_formatter_path() -> PathBuf {
    PathBuf::from(DEFAULT_FORMATTER)
}

fn default_style() -> String {
    DEFAULT_STYLE.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FormatConfig {
    /// Formatter binary, looked up on `PATH` when not absolute
    #[serde(default = "default_formatter_path")]
    pub formatter_path: PathBuf,

    /// Value passed to `-style`. "file" searches for a `.clang-format` file.
    #[serde(default = "default_style")]
    pub style: String,

    /// Value passed to `-fallback-style` when no style file is found
    #[serde(default)]
    pub fallback_style: Option<String>,

    /// Kill the formatter after this many milliseconds
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

impl Default for FormatConfig {
    fn default() -> Self {
        Self {
            formatter_path: default_formatter_path(),
            style: default_style(),
            fallback_style: None,
            timeout_ms: None,
        }
    }
}

impl FormatConfig {
    /// Load settings from a JSON file; missing keys take their defaults
    pub fn load(path: &Path) -> Result<Self, FormatError> {
        let file = read_file(path)?;
        Self::from_json(&file.content)
    }

    pub fn from_json(text: &str) -> Result<Self, FormatError> {
        serde_json::from_str(text).map_err(|e| FormatError::Config(e.to_string()))
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}
