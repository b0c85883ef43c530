//! Running the external formatter.
//!
//! The formatter reads the whole document on stdin and answers on stdout.
//! stdin is fed while stdout and stderr are drained on the same tokio
//! runtime, so documents larger than the OS pipe buffer cannot deadlock the
//! exchange. An optional timeout kills the child without waiting for its
//! pipes to close.

use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, ChildStdin, Command};
use tracing::{debug, warn};

use crate::config::FormatConfig;
use crate::error::FormatError;
use crate::range::TargetRanges;

/// Everything the formatter needs for one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatRequest {
    /// Buffer lines joined with `\n`
    pub full_text: String,
    /// BLAKE3 checksum of `full_text`
    pub checksum: String,
    pub target_ranges: TargetRanges,
    /// Flat byte offset of the cursor in `full_text`
    pub cursor_offset: usize,
    pub style_name: String,
    pub fallback_style: Option<String>,
    /// Passed as `-assume-filename` so the formatter can pick language and style
    pub source_path: Option<PathBuf>,
}

impl FormatRequest {
    /// Formatter arguments, without the binary itself
    ///
    /// Order: `-style`, `-cursor`, every `-lines`, then the optional
    /// `-fallback-style` and `-assume-filename`.
    pub fn args(&self) -> Vec<String> {
        let mut args = vec![
            "-style".to_string(),
            self.style_name.clone(),
            "-cursor".to_string(),
            self.cursor_offset.to_string(),
        ];
        args.extend(self.target_ranges.to_args());
        if let Some(fallback) = &self.fallback_style {
            args.push("-fallback-style".to_string());
            args.push(fallback.clone());
        }
        if let Some(path) = &self.source_path {
            args.push("-assume-filename".to_string());
            args.push(path.display().to_string());
        }
        args
    }
}

/// Raw result of one formatter run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatterOutput {
    pub success: bool,
    /// Human-readable exit status
    pub status: String,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl FormatterOutput {
    /// A clean exit with the given stdout and nothing on stderr
    pub fn ok(stdout: impl Into<Vec<u8>>) -> Self {
        Self {
            success: true,
            status: "exit status: 0".to_string(),
            stdout: stdout.into(),
            stderr: Vec::new(),
        }
    }

    /// Stdout, provided the run exited cleanly and left stderr empty
    pub fn into_stdout(self) -> Result<Vec<u8>, FormatError> {
        let stderr = String::from_utf8_lossy(&self.stderr).into_owned();
        let diagnostics = stderr.trim();

        if !self.success {
            let message = if diagnostics.is_empty() {
                self.status
            } else {
                format!("{}: {}", self.status, diagnostics)
            };
            return Err(FormatError::external_tool(message, stderr));
        }
        if !diagnostics.is_empty() {
            warn!(stderr = diagnostics, "formatter wrote to stderr");
            return Err(FormatError::external_tool(diagnostics.to_string(), stderr));
        }

        Ok(self.stdout)
    }
}

/// Something that can reformat a document
pub trait Formatter {
    fn run(&self, request: &FormatRequest) -> Result<FormatterOutput, FormatError>;
}

/// Runs the configured formatter binary as a child process
#[derive(Debug, Clone)]
pub struct ProcessFormatter {
    program: PathBuf,
    timeout: Option<Duration>,
}

impl ProcessFormatter {
    pub fn new(config: &FormatConfig) -> Self {
        Self {
            program: config.formatter_path.clone(),
            timeout: config.timeout(),
        }
    }

    /// Feed the document, collect both output streams and wait for exit
    ///
    /// # Arguments
    /// * `request` - Document text and formatter arguments
    ///
    /// # Returns
    /// * `Ok(FormatterOutput)` - The child exited and both streams were read in full
    /// * `Err(FormatError::ExternalTool)` - Spawn, I/O or timeout failure; the child is killed
    async fn exchange(&self, request: &FormatRequest) -> Result<FormatterOutput, FormatError> {
        let args = request.args();
        debug!(program = %self.program.display(), ?args, "launching formatter");

        let mut child = launch(&self.program, &args).map_err(|e| {
            FormatError::external_tool(
                format!("could not start '{}': {e}", self.program.display()),
                String::new(),
            )
        })?;

        let stdin = child.stdin.take();
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        // Write, read and wait together so a full pipe never stalls the other side
        let streams = async {
            tokio::join!(
                feed_stdin(stdin, request.full_text.as_bytes()),
                read_pipe(stdout, "stdout"),
                read_pipe(stderr, "stderr"),
                child.wait(),
            )
        };

        let finished = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, streams).await.ok(),
            None => Some(streams.await),
        };

        let Some((written, stdout, stderr, status)) = finished else {
            // Our pipe ends went away with the exchange; kill and reap the child
            if let Err(e) = child.kill().await {
                debug!(error = %e, "failed to kill timed out formatter");
            }
            let limit = self.timeout.unwrap_or_default();
            warn!(timeout_ms = limit.as_millis() as u64, "formatter timed out");
            return Err(FormatError::external_tool(
                format!("timed out after {} ms", limit.as_millis()),
                String::new(),
            ));
        };

        let status = status.map_err(|e| {
            FormatError::external_tool(format!("failed to wait for formatter: {e}"), String::new())
        })?;
        let stdout = stdout?;
        let stderr = stderr?;

        match written {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
                debug!("formatter closed stdin before reading all input");
            }
            Err(e) => {
                return Err(FormatError::external_tool(
                    format!("failed to write to formatter: {e}"),
                    String::from_utf8_lossy(&stderr),
                ));
            }
        }

        debug!(
            %status,
            stdout_bytes = stdout.len(),
            stderr_bytes = stderr.len(),
            "formatter finished"
        );

        Ok(FormatterOutput {
            success: status.success(),
            status: status.to_string(),
            stdout,
            stderr,
        })
    }
}

impl Formatter for ProcessFormatter {
    fn run(&self, request: &FormatRequest) -> Result<FormatterOutput, FormatError> {
        // The host calls in synchronously; each run gets a single-threaded runtime
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| {
                FormatError::external_tool(format!("failed to start runtime: {e}"), String::new())
            })?;

        runtime.block_on(self.exchange(request))
    }
}

/// Spawn `program` with all three standard streams piped
///
/// The child is killed if its handle is dropped before it has been reaped,
/// so every early return above also stops the formatter.
fn launch(program: &Path, args: &[String]) -> io::Result<Child> {
    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    hide_window(&mut command);
    command.spawn()
}

/// Keep a console window from flashing up for the child
#[cfg(windows)]
fn hide_window(command: &mut Command) {
    const CREATE_NO_WINDOW: u32 = 0x0800_0000;
    command.creation_flags(CREATE_NO_WINDOW);
}

#[cfg(not(windows))]
fn hide_window(_command: &mut Command) {}

async fn feed_stdin(stdin: Option<ChildStdin>, input: &[u8]) -> io::Result<()> {
    let Some(mut stdin) = stdin else {
        return Ok(());
    };
    stdin.write_all(input).await?;
    // Dropping the handle closes the pipe and signals EOF
    Ok(())
}

/// Read `pipe` to EOF; a failed read is an error, never a short buffer
async fn read_pipe<R: AsyncRead + Unpin>(
    pipe: Option<R>,
    stream: &str,
) -> Result<Vec<u8>, FormatError> {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        pipe.read_to_end(&mut buf).await.map_err(|e| {
            FormatError::external_tool(
                format!("failed to read formatter {stream}: {e}"),
                String::new(),
            )
        })?;
    }
    Ok(buf)
}
