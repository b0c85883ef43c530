//! Choosing which lines the formatter should touch.
//!
//! Sources are tried in a fixed priority order: an explicit override (a line
//! range or the whole buffer), then the lines changed relative to the on-disk
//! file, then the editor selection, then the cursor line.

use std::fmt;
use std::str::FromStr;

use tracing::debug;

use crate::edit::{EditTag, diff_lines};
use crate::error::FormatError;

/// Inclusive, 1-indexed line range in the formatter's `-lines S:E` convention
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineRange {
    pub start: usize,
    pub end: usize,
}

impl LineRange {
    /// # Returns
    /// * `Err(FormatError::Input)` unless `1 <= start <= end`
    pub fn new(start: usize, end: usize) -> Result<Self, FormatError> {
        if start == 0 || end < start {
            return Err(FormatError::input(format!(
                "invalid line range {start}:{end} (lines are 1-indexed and start <= end)"
            )));
        }
        Ok(Self { start, end })
    }

    /// The single line at 0-indexed `line`
    pub fn single(line: usize) -> Self {
        Self {
            start: line + 1,
            end: line + 1,
        }
    }
}

impl fmt::Display for LineRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.start, self.end)
    }
}

impl FromStr for LineRange {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (start, end) = s
            .split_once(':')
            .ok_or_else(|| FormatError::input(format!("expected START:END, got '{s}'")))?;
        let parse = |part: &str| {
            part.trim()
                .parse::<usize>()
                .map_err(|_| FormatError::input(format!("invalid line number '{part}' in '{s}'")))
        };
        LineRange::new(parse(start)?, parse(end)?)
    }
}

/// An explicit choice of what to format, overriding every other source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinesOverride {
    All,
    Range(LineRange),
}

/// Lines handed to the formatter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetRanges {
    /// Whole buffer; no `-lines` arguments at all
    All,
    /// One `-lines` pair per range, in document order
    Lines(Vec<LineRange>),
}

impl TargetRanges {
    /// Flat formatter argument tokens
    ///
    /// # Example
    /// ```
    /// use format_buffer::{LineRange, TargetRanges};
    /// let ranges = TargetRanges::Lines(vec![LineRange::new(2, 4).unwrap()]);
    /// assert_eq!(ranges.to_args(), vec!["-lines", "2:4"]);
    /// assert!(TargetRanges::All.to_args().is_empty());
    /// ```
    pub fn to_args(&self) -> Vec<String> {
        match self {
            TargetRanges::All => Vec::new(),
            TargetRanges::Lines(ranges) => ranges
                .iter()
                .flat_map(|r| ["-lines".to_string(), r.to_string()])
                .collect(),
        }
    }
}

/// Everything the selector may draw on for one invocation
#[derive(Debug, Clone, Default)]
pub struct RangeRequest {
    /// Explicit range or whole-buffer flag
    pub explicit: Option<LinesOverride>,
    /// On-disk text to diff against; `Some` enables diff-against-disk mode
    pub on_disk: Option<String>,
    /// Editor selection
    pub selection: Option<LineRange>,
    /// 0-indexed cursor line, used when there is no selection
    pub cursor_line: usize,
}

impl RangeRequest {
    /// Resolve to formatter ranges for the given buffer lines
    ///
    /// # Returns
    /// * `None` in diff-against-disk mode when no line was inserted or
    ///   replaced; the caller must not invoke the formatter
    pub fn resolve(&self, buffer_lines: &[String]) -> Option<TargetRanges> {
        if let Some(explicit) = self.explicit {
            return Some(match explicit {
                LinesOverride::All => TargetRanges::All,
                LinesOverride::Range(range) => TargetRanges::Lines(vec![range]),
            });
        }

        if let Some(on_disk) = &self.on_disk {
            let ranges = changed_ranges(on_disk, buffer_lines);
            debug!(count = ranges.len(), "changed ranges against on-disk file");
            return if ranges.is_empty() {
                None
            } else {
                Some(TargetRanges::Lines(ranges))
            };
        }

        let range = self
            .selection
            .unwrap_or_else(|| LineRange::single(self.cursor_line));
        Some(TargetRanges::Lines(vec![range]))
    }
}

/// Buffer line ranges that were inserted or replaced relative to `on_disk`
///
/// Pure deletions produce no range: there is no surviving buffer line to
/// reformat.
pub fn changed_ranges(on_disk: &str, buffer_lines: &[String]) -> Vec<LineRange> {
    let disk_lines: Vec<String> = on_disk.lines().map(String::from).collect();

    diff_lines(&disk_lines, buffer_lines)
        .into_iter()
        .filter(|op| matches!(op.tag, EditTag::Insert | EditTag::Replace))
        .map(|op| LineRange {
            start: op.new_start + 1,
            end: op.new_end,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_line_range_parse() {
        let range: LineRange = "3:7".parse().unwrap();
        assert_eq!(range, LineRange { start: 3, end: 7 });
        assert_eq!(range.to_string(), "3:7");
    }

    #[test]
    fn test_line_range_rejects_zero_and_reversed() {
        assert!(matches!("0:2".parse::<LineRange>(), Err(FormatError::Input(_))));
        assert!(matches!("5:2".parse::<LineRange>(), Err(FormatError::Input(_))));
        assert!(matches!("5".parse::<LineRange>(), Err(FormatError::Input(_))));
        assert!(matches!("a:b".parse::<LineRange>(), Err(FormatError::Input(_))));
    }

    #[test]
    fn test_explicit_override_wins() {
        let request = RangeRequest {
            explicit: Some(LinesOverride::Range(LineRange::new(2, 3).unwrap())),
            on_disk: Some("anything".to_string()),
            selection: Some(LineRange::new(1, 1).unwrap()),
            cursor_line: 0,
        };
        let ranges = request.resolve(&lines(&["a", "b", "c"])).unwrap();
        assert_eq!(ranges.to_args(), vec!["-lines", "2:3"]);
    }

    #[test]
    fn test_whole_buffer_has_no_line_args() {
        let request = RangeRequest {
            explicit: Some(LinesOverride::All),
            ..Default::default()
        };
        assert_eq!(request.resolve(&lines(&["a"])), Some(TargetRanges::All));
    }

    #[test]
    fn test_selection_beats_cursor_line() {
        let request = RangeRequest {
            selection: Some(LineRange::new(4, 9).unwrap()),
            cursor_line: 1,
            ..Default::default()
        };
        let ranges = request.resolve(&lines(&["a"; 10])).unwrap();
        assert_eq!(ranges.to_args(), vec!["-lines", "4:9"]);
    }

    #[test]
    fn test_defaults_to_cursor_line() {
        let request = RangeRequest {
            cursor_line: 2,
            ..Default::default()
        };
        let ranges = request.resolve(&lines(&["a", "b", "c"])).unwrap();
        assert_eq!(ranges.to_args(), vec!["-lines", "3:3"]);
    }

    #[test]
    fn test_diff_against_disk_identical_is_nothing_to_format() {
        let buffer = lines(&["int a;", "int b;"]);
        let request = RangeRequest {
            on_disk: Some("int a;\nint b;\n".to_string()),
            ..Default::default()
        };
        assert_eq!(request.resolve(&buffer), None);
    }

    #[test]
    fn test_diff_against_disk_insert_and_replace() {
        let on_disk = "a\nb\nc\nd\n";
        let buffer = lines(&["a", "new", "b", "C", "d"]);
        let ranges = changed_ranges(on_disk, &buffer);
        assert_eq!(
            ranges,
            vec![LineRange { start: 2, end: 2 }, LineRange { start: 4, end: 4 }]
        );
    }

    #[test]
    fn test_diff_against_disk_pure_deletion_yields_nothing() {
        let buffer = lines(&["a", "c"]);
        let request = RangeRequest {
            on_disk: Some("a\nb\nc".to_string()),
            ..Default::default()
        };
        assert_eq!(request.resolve(&buffer), None);
    }

    #[test]
    fn test_multiple_ranges_flatten_to_args() {
        let ranges = TargetRanges::Lines(vec![
            LineRange::new(1, 2).unwrap(),
            LineRange::new(5, 5).unwrap(),
        ]);
        assert_eq!(ranges.to_args(), vec!["-lines", "1:2", "-lines", "5:5"]);
    }
}
