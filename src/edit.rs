use std::hash::Hash;

use similar::{Algorithm, DiffTag, capture_diff_slices};
use tracing::debug;

use crate::document::Buffer;
use crate::error::FormatError;

/// Kind of step in a line alignment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditTag {
    Equal,
    Replace,
    Delete,
    Insert,
}

/// One aligned span between the old and new line sequences
///
/// `old_start..old_end` indexes the old lines and `new_start..new_end` the
/// new ones; both are half-open. Applying an op means replacing the old span
/// with the new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditOp {
    pub tag: EditTag,
    pub old_start: usize,
    pub old_end: usize,
    pub new_start: usize,
    pub new_end: usize,
}

impl EditOp {
    fn is_empty(&self) -> bool {
        self.old_start == self.old_end && self.new_start == self.new_end
    }

    /// Lines gained (positive) or lost (negative) by applying this op
    pub fn line_shift(&self) -> i64 {
        (self.new_end - self.new_start) as i64 - (self.old_end - self.old_start) as i64
    }
}

/// Result of reconciling a buffer with formatted lines
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileResult {
    /// Number of splices performed
    pub applied_count: usize,
    /// Net change in the buffer's line count
    pub line_shift: i64,
}

impl ReconcileResult {
    pub fn is_noop(&self) -> bool {
        self.applied_count == 0
    }
}

/// Align two line sequences into a minimal list of edit ops
///
/// The ops cover both sequences from start to end without gaps or overlaps.
/// Runs of adjacent changes are folded into a single op, so identical inputs
/// give exactly one `Equal` op and two empty inputs give none.
///
/// # Example
/// ```
/// use format_buffer::{EditTag, diff_lines};
/// let ops = diff_lines(&["a", "b"], &["a", "c"]);
/// assert_eq!(ops.len(), 2);
/// assert_eq!(ops[0].tag, EditTag::Equal);
/// assert_eq!(ops[1].tag, EditTag::Replace);
/// ```
pub fn diff_lines<T: Eq + Hash + Ord>(old: &[T], new: &[T]) -> Vec<EditOp> {
    let mut ops: Vec<EditOp> = Vec::new();

    for diff_op in capture_diff_slices(Algorithm::Myers, old, new) {
        let (tag, old_range, new_range) = diff_op.as_tag_tuple();
        let op = EditOp {
            tag: match tag {
                DiffTag::Equal => EditTag::Equal,
                DiffTag::Delete => EditTag::Delete,
                DiffTag::Insert => EditTag::Insert,
                DiffTag::Replace => EditTag::Replace,
            },
            old_start: old_range.start,
            old_end: old_range.end,
            new_start: new_range.start,
            new_end: new_range.end,
        };
        if op.is_empty() {
            continue;
        }

        match ops.last_mut() {
            Some(last) if (last.tag == EditTag::Equal) == (op.tag == EditTag::Equal) => {
                last.old_end = op.old_end;
                last.new_end = op.new_end;
                if last.tag != EditTag::Equal {
                    last.tag = change_tag(last);
                }
            }
            _ => ops.push(op),
        }
    }

    ops
}

fn change_tag(op: &EditOp) -> EditTag {
    match (op.old_start < op.old_end, op.new_start < op.new_end) {
        (true, true) => EditTag::Replace,
        (true, false) => EditTag::Delete,
        _ => EditTag::Insert,
    }
}

/// Check that ops tile `0..old_len` and `0..new_len` exactly, in order
pub fn covers(ops: &[EditOp], old_len: usize, new_len: usize) -> bool {
    let mut old_pos = 0;
    let mut new_pos = 0;
    for op in ops {
        if op.old_start != old_pos
            || op.new_start != new_pos
            || op.old_end < op.old_start
            || op.new_end < op.new_start
        {
            return false;
        }
        old_pos = op.old_end;
        new_pos = op.new_end;
    }
    old_pos == old_len && new_pos == new_len
}

/// Non-equal ops, ordered by `old_start` descending
///
/// Splicing at a higher index never moves lines below it, so applying in this
/// order keeps every pending op's old-side indices valid.
pub fn sort_ops_descending(ops: &[EditOp]) -> Vec<EditOp> {
    let mut sorted: Vec<EditOp> = ops
        .iter()
        .filter(|op| op.tag != EditTag::Equal)
        .copied()
        .collect();
    sorted.sort_by(|a, b| b.old_start.cmp(&a.old_start));
    sorted
}

/// Splice every non-equal op into `buffer`, last op first
///
/// `ops` must have been computed from the buffer's current lines against
/// `new_lines`; this step cannot fail once started.
pub fn apply_ops<B: Buffer + ?Sized>(
    buffer: &mut B,
    ops: &[EditOp],
    new_lines: &[String],
) -> ReconcileResult {
    debug_assert!(covers(ops, buffer.lines().len(), new_lines.len()));

    let mut result = ReconcileResult::default();
    for op in sort_ops_descending(ops) {
        buffer.splice(op.old_start..op.old_end, &new_lines[op.new_start..op.new_end]);
        result.applied_count += 1;
        result.line_shift += op.line_shift();
    }
    result
}

/// Bring `buffer` in line with `new_lines` using the fewest splices
///
/// The buffer must still hash to `expected_checksum`, the checksum of the text
/// that was sent to the formatter. Otherwise nothing is touched.
///
/// # Arguments
/// * `buffer` - Buffer to update
/// * `expected_checksum` - BLAKE3 checksum of the text the formatter saw
/// * `new_lines` - Formatted lines from the response body
pub fn reconcile<B: Buffer + ?Sized>(
    buffer: &mut B,
    expected_checksum: &str,
    new_lines: &[String],
) -> Result<ReconcileResult, FormatError> {
    // Verify checksum before touching anything
    let actual = buffer.checksum();
    if actual != expected_checksum {
        return Err(FormatError::BufferChanged {
            expected: expected_checksum.to_string(),
            actual,
        });
    }

    let ops = diff_lines(buffer.lines(), new_lines);
    debug!(
        ops = ops.len(),
        changed = ops.iter().filter(|op| op.tag != EditTag::Equal).count(),
        "computed line alignment"
    );

    Ok(apply_ops(buffer, &ops, new_lines))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;

    fn lines(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn doc(items: &[&str]) -> Document {
        Document::from_text(&items.join("\n"))
    }

    /// Apply non-equal ops in ascending order, ignoring index drift
    fn apply_forward(old: &[String], ops: &[EditOp], new: &[String]) -> Vec<String> {
        let mut out = old.to_vec();
        for op in ops.iter().filter(|op| op.tag != EditTag::Equal) {
            let end = op.old_end.min(out.len());
            let start = op.old_start.min(end);
            out.splice(start..end, new[op.new_start..op.new_end].iter().cloned());
        }
        out
    }

    fn apply_reverse(old: &[String], ops: &[EditOp], new: &[String]) -> Vec<String> {
        let mut out = old.to_vec();
        for op in sort_ops_descending(ops) {
            out.splice(op.old_start..op.old_end, new[op.new_start..op.new_end].iter().cloned());
        }
        out
    }

    #[test]
    fn test_identical_lines_single_equal_op() {
        let old = lines(&["int a;", "int b;", "int c;"]);
        let ops = diff_lines(&old, &old);
        assert_eq!(
            ops,
            vec![EditOp {
                tag: EditTag::Equal,
                old_start: 0,
                old_end: 3,
                new_start: 0,
                new_end: 3,
            }]
        );
    }

    #[test]
    fn test_identical_buffer_is_not_mutated() {
        let mut buffer = doc(&["int a;", "int b;"]);
        let before = buffer.clone();
        let new = lines(&["int a;", "int b;"]);
        let checksum = buffer.checksum();

        let result = reconcile(&mut buffer, &checksum, &new).unwrap();

        assert!(result.is_noop());
        assert_eq!(buffer, before);
    }

    #[test]
    fn test_empty_inputs_have_no_ops() {
        let empty: Vec<String> = Vec::new();
        assert!(diff_lines(&empty, &empty).is_empty());
    }

    #[test]
    fn test_diff_lines_over_borrowed_and_numeric_items() {
        let ops = diff_lines(&["a", "b", "c"], &["a", "x", "c"]);
        assert_eq!(
            ops.iter().map(|op| op.tag).collect::<Vec<_>>(),
            vec![EditTag::Equal, EditTag::Replace, EditTag::Equal]
        );

        let ops = diff_lines(&[1u32, 2, 3], &[1, 2, 3, 4]);
        assert_eq!(ops.last().map(|op| op.tag), Some(EditTag::Insert));
        assert!(covers(&ops, 3, 4));
    }

    #[test]
    fn test_ops_cover_both_sequences() {
        let cases: Vec<(Vec<String>, Vec<String>)> = vec![
            (lines(&[]), lines(&["a"])),
            (lines(&["a"]), lines(&[])),
            (lines(&["a"]), lines(&["b"])),
            (lines(&["a", "b", "c"]), lines(&["x", "y"])),
            (lines(&["a", "b", "c", "d"]), lines(&["a", "x", "c", "d", "e"])),
            (lines(&["x", "a", "x", "b"]), lines(&["a", "b", "x", "x"])),
            (lines(&["", "", "a"]), lines(&["a", "", ""])),
        ];

        for (old, new) in cases {
            let ops = diff_lines(&old, &new);
            assert!(covers(&ops, old.len(), new.len()), "{old:?} -> {new:?}: {ops:?}");
        }
    }

    #[test]
    fn test_reverse_application_reproduces_new_lines() {
        let cases: Vec<(Vec<String>, Vec<String>)> = vec![
            (lines(&[]), lines(&[])),
            (lines(&[]), lines(&["a", "b"])),
            (lines(&["a", "b"]), lines(&[])),
            (lines(&["only"]), lines(&["changed"])),
            (lines(&["a", "b", "c"]), lines(&["x", "y", "z"])),
            (
                lines(&["int main(){", "return 0;", "}"]),
                lines(&["int main() {", "  return 0;", "}"]),
            ),
            (lines(&["a", "b", "c", "d", "e"]), lines(&["b", "c", "x", "e", "f"])),
        ];

        for (old, new) in cases {
            let ops = diff_lines(&old, &new);
            assert_eq!(apply_reverse(&old, &ops, &new), new, "{old:?} -> {new:?}");
        }
    }

    #[test]
    fn test_forward_order_corrupts_reverse_order_succeeds() {
        let old = lines(&["a", "b", "c"]);
        let new = lines(&["x1", "x2", "b", "y"]);
        let ops = diff_lines(&old, &new);

        assert_eq!(ops.iter().filter(|op| op.tag != EditTag::Equal).count(), 2);
        assert_ne!(apply_forward(&old, &ops, &new), new);
        assert_eq!(apply_reverse(&old, &ops, &new), new);
    }

    #[test]
    fn test_same_length_replacements_work_in_either_order() {
        let old = lines(&["a", "b", "c"]);
        let new = lines(&["x", "b", "y"]);
        let ops = diff_lines(&old, &new);

        assert_eq!(apply_forward(&old, &ops, &new), new);
        assert_eq!(apply_reverse(&old, &ops, &new), new);
    }

    #[test]
    fn test_sort_ops_descending_skips_equal() {
        let old = lines(&["a", "b", "c", "d"]);
        let new = lines(&["A", "b", "C", "d"]);
        let sorted = sort_ops_descending(&diff_lines(&old, &new));

        assert_eq!(sorted.len(), 2);
        assert_eq!(sorted[0].old_start, 2);
        assert_eq!(sorted[1].old_start, 0);
    }

    #[test]
    fn test_reconcile_applies_only_changed_spans() {
        let mut buffer = doc(&["#include <a>", "int  x=1;", "int y;", "int   z=2;"]);
        let new = lines(&["#include <a>", "int x = 1;", "int y;", "int z = 2;"]);
        let checksum = buffer.checksum();

        let result = reconcile(&mut buffer, &checksum, &new).unwrap();

        assert_eq!(result.applied_count, 2);
        assert_eq!(result.line_shift, 0);
        assert_eq!(buffer.lines(), new.as_slice());
    }

    #[test]
    fn test_reconcile_reports_line_shift() {
        let mut buffer = doc(&["void f(){int a;int b;}"]);
        let new = lines(&["void f() {", "  int a;", "  int b;", "}"]);
        let checksum = buffer.checksum();

        let result = reconcile(&mut buffer, &checksum, &new).unwrap();

        assert_eq!(result.applied_count, 1);
        assert_eq!(result.line_shift, 3);
        assert_eq!(buffer.lines(), new.as_slice());
    }

    #[test]
    fn test_reconcile_checksum_mismatch_leaves_buffer() {
        let mut buffer = doc(&["a", "b"]);
        let before = buffer.clone();

        let result = reconcile(&mut buffer, "stale", &lines(&["x"]));

        match result {
            Err(FormatError::BufferChanged { expected, .. }) => assert_eq!(expected, "stale"),
            other => panic!("Expected FormatError::BufferChanged, got {other:?}"),
        }
        assert_eq!(buffer, before);
    }
}
