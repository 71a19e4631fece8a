//! Side-by-side text diff
//!
//! Renders two texts in two columns with an `sdiff`-style gutter:
//! ` ` equal, `|` changed, `<` only on the left, `>` only on the right.

use similar::{ChangeTag, TextDiff};

pub const DEFAULT_WIDTH: usize = 140;
pub const LEFT_TITLE: &str = "  Original";
pub const RIGHT_TITLE: &str = "  Update";

/// Render `old` and `new` side by side within `width` columns.
pub fn side_by_side(old: &str, new: &str, width: usize) -> String {
    let column = width.saturating_sub(3) / 2;
    let mut out = Vec::new();

    out.push(row(LEFT_TITLE, ' ', RIGHT_TITLE, column));
    out.push(row(&"-".repeat(column), ' ', &"-".repeat(column), column));

    let diff = TextDiff::from_lines(old, new);
    let mut deleted = Vec::new();
    let mut inserted = Vec::new();
    for change in diff.iter_all_changes() {
        let line = change.value().trim_end_matches(['\n', '\r']).to_string();
        match change.tag() {
            ChangeTag::Equal => {
                flush(&mut out, &mut deleted, &mut inserted, column);
                out.push(row(&line, ' ', &line, column));
            }
            ChangeTag::Delete => deleted.push(line),
            ChangeTag::Insert => inserted.push(line),
        }
    }
    flush(&mut out, &mut deleted, &mut inserted, column);

    let mut text = out.join("\n");
    text.push('\n');
    text
}

/// Pair pending deletions with insertions, `|` where both sides exist
fn flush(out: &mut Vec<String>, deleted: &mut Vec<String>, inserted: &mut Vec<String>, column: usize) {
    let rows = deleted.len().max(inserted.len());
    for i in 0..rows {
        let line = match (deleted.get(i), inserted.get(i)) {
            (Some(left), Some(right)) => row(left, '|', right, column),
            (Some(left), None) => row(left, '<', "", column),
            (None, Some(right)) => row("", '>', right, column),
            (None, None) => continue,
        };
        out.push(line);
    }
    deleted.clear();
    inserted.clear();
}

fn row(left: &str, gutter: char, right: &str, column: usize) -> String {
    let left = clip(left, column);
    let right = clip(right, column);
    format!("{left:<column$} {gutter} {right}").trim_end().to_string()
}

fn clip(text: &str, column: usize) -> String {
    text.chars().take(column).collect()
}
