use std::fs;
use std::io;
use std::path::Path;

use crate::document::checksum;

/// Content of a file read into memory
#[derive(Debug, Clone)]
pub struct FileContent {
    /// Path as given by the caller
    pub path: String,
    /// File content as valid UTF-8 string
    pub content: String,
    /// BLAKE3 hash of the content (hex-encoded)
    pub checksum: String,
}

/// Error types for file operations
#[derive(Debug, thiserror::Error)]
pub enum FileError {
    #[error("file not found: {0}")]
    NotFound(String),

    #[error("I/O error on '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("invalid UTF-8 in file: {0}")]
    InvalidUtf8(String),

    #[error("file changed on disk while formatting: {0}")]
    Changed(String),
}

/// Read a file from disk with UTF-8 validation
///
/// # Returns
/// * `Ok(FileContent)` - File content with its checksum
/// * `Err(FileError)` - File not found, I/O error, or invalid UTF-8
pub fn read_file<P: AsRef<Path>>(path: P) -> Result<FileContent, FileError> {
    let path_ref = path.as_ref();
    let display = path_ref.display().to_string();

    // Read raw bytes
    let bytes = fs::read(path_ref).map_err(|source| match source.kind() {
        io::ErrorKind::NotFound => FileError::NotFound(display.clone()),
        _ => FileError::Io {
            path: display.clone(),
            source,
        },
    })?;

    // Validate UTF-8
    let content = String::from_utf8(bytes).map_err(|_| FileError::InvalidUtf8(display.clone()))?;
    let checksum = checksum(&content);

    Ok(FileContent {
        path: display,
        content,
        checksum,
    })
}

/// Write `content` to `path`, replacing what was there
pub fn write_file<P: AsRef<Path>>(path: P, content: &str) -> Result<(), FileError> {
    let path_ref = path.as_ref();
    fs::write(path_ref, content).map_err(|source| FileError::Io {
        path: path_ref.display().to_string(),
        source,
    })
}

/// Overwrite `path` only if it still hashes to `expected`
///
/// # Arguments
/// * `path` - File to replace
/// * `content` - New file content
/// * `expected` - Checksum from the [`FileContent`] the caller read earlier
///
/// # Returns
/// * `Err(FileError::Changed)` - Someone else wrote the file in the meantime
pub fn write_file_if_unchanged<P: AsRef<Path>>(
    path: P,
    content: &str,
    expected: &str,
) -> Result<(), FileError> {
    let path_ref = path.as_ref();
    let current = read_file(path_ref)?;
    if current.checksum != expected {
        return Err(FileError::Changed(current.path));
    }
    write_file(path_ref, content)
}
