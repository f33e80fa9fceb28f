//! Added-range attribution.
//!
//! Given the snapshot text and the post-write text, compute the runs of
//! lines the mutation *added*, as 1-indexed positions in the post-image,
//! each with a SHA-256 over the concatenated added text. Removed and
//! unchanged runs only advance counters.

use similar::ChangeTag;
use similar::TextDiff;
use ward_protocol::RangeTrace;

use crate::sha256_hex;

fn normalize_endings(text: &str) -> String {
    text.replace("\r\n", "\n")
}

/// Compute added line ranges between `before` (the snapshot; `None` for
/// a previously missing file) and `after` (the post-write content).
pub fn added_ranges(before: Option<&str>, after: &str) -> Vec<RangeTrace> {
    let before = normalize_endings(before.unwrap_or(""));
    let after = normalize_endings(after);

    let diff = TextDiff::from_lines(&before, &after);

    let mut ranges = Vec::new();
    let mut new_line = 0usize; // last emitted post-image line number
    let mut run_start: Option<usize> = None;
    let mut run_text = String::new();

    let mut flush = |run_start: &mut Option<usize>, run_text: &mut String, end: usize| {
        if let Some(start) = run_start.take() {
            ranges.push(RangeTrace {
                start_line: start,
                end_line: end,
                content_hash: sha256_hex(run_text.as_bytes()),
            });
            run_text.clear();
        }
    };

    for change in diff.iter_all_changes() {
        match change.tag() {
            ChangeTag::Insert => {
                new_line += 1;
                if run_start.is_none() {
                    run_start = Some(new_line);
                }
                run_text.push_str(change.value());
            }
            ChangeTag::Equal => {
                flush(&mut run_start, &mut run_text, new_line);
                new_line += 1;
            }
            ChangeTag::Delete => {
                flush(&mut run_start, &mut run_text, new_line);
            }
        }
    }
    flush(&mut run_start, &mut run_text, new_line);

    ranges
}
