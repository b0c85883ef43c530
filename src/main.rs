use clap::Parser;
use format_buffer::{
    Buffer, Document, FileContent, FileError, FormatConfig, FormatError, FormatReport, LineRange,
    LinesOverride, Position, ProcessFormatter, RangeRequest, format_buffer, generate_execution_id,
    read_file, write_file, write_file_if_unchanged,
};
use std::io::{self, Read};
use std::path::PathBuf;
use std::str::FromStr;
use tracing_subscriber::EnvFilter;

/// Run an external formatter over a buffer and merge the result back with minimal edits
#[derive(Parser, Debug)]
#[command(name = "format-buffer")]
#[command(version = "0.1.0")]
#[command(
    about = "Format a buffer or line range with clang-format, applying only changed lines",
    long_about = None
)]
struct Args {
    /// Document to format; also passed to the formatter as -assume-filename
    #[arg(short, long)]
    file: PathBuf,

    /// Read the buffer text from stdin instead of the file (unsaved buffer)
    #[arg(long)]
    stdin: bool,

    /// Format only these lines (1-indexed, inclusive)
    #[arg(long, value_name = "START:END", conflicts_with_all = ["all", "changed"])]
    lines: Option<LineRange>,

    /// Format the whole buffer
    #[arg(long, conflicts_with = "changed")]
    all: bool,

    /// Format only lines that differ from the on-disk file
    #[arg(long)]
    changed: bool,

    /// Editor selection (1-indexed, inclusive); defaults to the cursor line
    #[arg(long, value_name = "START:END")]
    selection: Option<LineRange>,

    /// Cursor position (1-indexed)
    #[arg(long, value_name = "LINE:COL", default_value = "1:1")]
    cursor: CursorArg,

    /// Formatting style passed as -style
    #[arg(long)]
    style: Option<String>,

    /// Style used when no style file is found
    #[arg(long, env = "CLANG_FORMAT_FALLBACK_STYLE")]
    fallback_style: Option<String>,

    /// Formatter binary
    #[arg(long, env = "CLANG_FORMAT_PATH")]
    formatter_path: Option<PathBuf>,

    /// Kill the formatter after this many milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// JSON config file with formatter_path, style, fallback_style, timeout_ms
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output a structured JSON report instead of the formatted text
    #[arg(short, long)]
    json: bool,

    /// Write the formatted text to this file instead of stdout
    #[arg(short, long, conflicts_with = "in_place")]
    output: Option<PathBuf>,

    /// Write the formatted text back to --file
    #[arg(short = 'i', long)]
    in_place: bool,
}

/// `LINE:COL`, both 1-indexed
#[derive(Debug, Clone, Copy)]
struct CursorArg(Position);

impl FromStr for CursorArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (line, col) = s
            .split_once(':')
            .ok_or_else(|| format!("expected LINE:COL, got '{s}'"))?;
        let parse = |part: &str| match part.trim().parse::<usize>() {
            Ok(n) if n >= 1 => Ok(n - 1),
            _ => Err(format!("invalid cursor component '{part}' (1-indexed)")),
        };
        Ok(CursorArg(Position::new(parse(line)?, parse(col)?)))
    }
}

fn load_config(args: &Args) -> Result<FormatConfig, FormatError> {
    let mut config = match &args.config {
        Some(path) => FormatConfig::load(path)?,
        None => FormatConfig::default(),
    };

    if let Some(path) = &args.formatter_path {
        config.formatter_path = path.clone();
    }
    if let Some(style) = &args.style {
        config.style = style.clone();
    }
    if let Some(fallback) = &args.fallback_style {
        config.fallback_style = Some(fallback.clone());
    }
    if let Some(timeout_ms) = args.timeout_ms {
        config.timeout_ms = Some(timeout_ms);
    }
    Ok(config)
}

/// Buffer text, plus the on-disk file when it was read
///
/// The file is read when it is the buffer source or when diff-against-disk
/// mode needs it; its checksum later guards `--in-place`.
fn read_buffer_text(args: &Args) -> Result<(String, Option<FileContent>), FormatError> {
    if !args.stdin {
        let file = read_file(&args.file)?;
        return Ok((file.content.clone(), Some(file)));
    }

    let mut buffer = String::new();
    io::stdin()
        .read_to_string(&mut buffer)
        .map_err(|source| FileError::Io {
            path: "<stdin>".to_string(),
            source,
        })?;
    let on_disk = if args.changed {
        Some(read_file(&args.file)?)
    } else {
        None
    };
    Ok((buffer, on_disk))
}

fn range_request(args: &Args, doc: &Document, on_disk: Option<&FileContent>) -> RangeRequest {
    let explicit = if let Some(range) = args.lines {
        Some(LinesOverride::Range(range))
    } else if args.all {
        Some(LinesOverride::All)
    } else {
        None
    };

    RangeRequest {
        explicit,
        on_disk: on_disk.filter(|_| args.changed).map(|file| file.content.clone()),
        selection: doc.selection(),
        cursor_line: doc.cursor().line,
    }
}

/// Result of one invocation, before anything is written out
struct Execution {
    report: FormatReport,
    /// Text to deliver, if any
    formatted: Option<String>,
    /// Checksum of the file as read from disk
    disk_checksum: Option<String>,
}

/// Run one invocation
///
/// # Arguments
/// * `args` - Parsed command line
/// * `execution_id` - Id stamped on the report
///
/// # Returns
/// * `Ok(Execution)` - Success or a failure report carrying the buffer checksum
/// * `Err(FormatError)` - The config or buffer could not be loaded
fn execute(args: &Args, execution_id: String) -> Result<Execution, FormatError> {
    let config = load_config(args)?;
    let (text, disk) = read_buffer_text(args)?;

    let mut doc = Document::from_text(&text)
        .with_path(&args.file)
        .with_cursor(args.cursor.0)
        .with_selection(args.selection);
    let checksum_before = doc.checksum();

    let ranges = range_request(args, &doc, disk.as_ref());
    let formatter = ProcessFormatter::new(&config);
    let disk_checksum = disk.map(|file| file.checksum);

    match format_buffer(&mut doc, &formatter, &config, &ranges) {
        Ok(outcome) => {
            let formatted = doc.to_text();
            let report = FormatReport::success(
                execution_id,
                outcome,
                checksum_before,
                doc.checksum(),
                formatted.clone(),
            );
            // Leave an in-place file alone when nothing changed
            let deliver = outcome.is_changed() || !args.in_place;
            Ok(Execution {
                report,
                formatted: deliver.then_some(formatted),
                disk_checksum,
            })
        }
        Err(e) => Ok(Execution {
            report: FormatReport::failure(execution_id, e.to_string(), checksum_before),
            formatted: None,
            disk_checksum,
        }),
    }
}

fn main() {
    // Logs go to stderr; stdout carries the formatted text or the JSON report
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let execution_id = generate_execution_id();

    let Execution {
        report,
        formatted,
        disk_checksum,
    } = match execute(&args, execution_id.clone()) {
        Ok(execution) => execution,
        Err(e) => Execution {
            report: FormatReport::failure(execution_id, e.to_string(), String::new()),
            formatted: None,
            disk_checksum: None,
        },
    };

    if let Some(text) = formatted {
        if let Err(e) = write_formatted(&args, &text, disk_checksum.as_deref()) {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }

    output_report(&report, args.json);

    if !report.success {
        std::process::exit(1);
    }
}

/// Deliver the formatted text to its destination
///
/// With `--json` and no file destination the text travels inside the report.
/// `--in-place` refuses to overwrite a file that changed since it was read.
fn write_formatted(args: &Args, text: &str, disk_checksum: Option<&str>) -> Result<(), FileError> {
    if args.in_place {
        match disk_checksum {
            Some(expected) => write_file_if_unchanged(&args.file, text, expected),
            None => write_file(&args.file, text),
        }
    } else if let Some(path) = &args.output {
        write_file(path, text)
    } else {
        if !args.json {
            print!("{text}");
        }
        Ok(())
    }
}

/// Format and output the report
fn output_report(report: &FormatReport, json_mode: bool) {
    if json_mode {
        let output = serde_json::to_string_pretty(report)
            .unwrap_or_else(|_| r#"{"error": "Failed to serialize report"}"#.to_string());
        println!("{output}");
    } else {
        eprintln!("{}", report.human_summary());
    }
}
