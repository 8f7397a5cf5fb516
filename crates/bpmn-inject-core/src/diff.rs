use similar::{ChangeTag, TextDiff};

const CONTEXT_LINES: usize = 3;

/// Line diff of a rewrite in unified format, labelled with `path` on both
/// sides. `None` when the rewrite left the text unchanged.
pub fn build_unified_diff(original: &str, rewritten: &str, path: &str) -> Option<String> {
    if original == rewritten {
        return None;
    }

    let diff = TextDiff::from_lines(original, rewritten);
    let rendered = diff
        .unified_diff()
        .context_radius(CONTEXT_LINES)
        .header(&format!("a/{path}"), &format!("b/{path}"))
        .to_string();
    Some(rendered)
}

/// Number of `(inserted, deleted)` lines between two texts.
pub fn line_changes(original: &str, rewritten: &str) -> (usize, usize) {
    TextDiff::from_lines(original, rewritten)
        .iter_all_changes()
        .fold((0, 0), |(inserted, deleted), change| match change.tag() {
            ChangeTag::Insert => (inserted + 1, deleted),
            ChangeTag::Delete => (inserted, deleted + 1),
            ChangeTag::Equal => (inserted, deleted),
        })
}
