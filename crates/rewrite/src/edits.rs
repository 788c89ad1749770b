//! Byte-range text edits.
//!
//! Every rewrite is expressed as a replacement of a byte range of the
//! original file; untouched bytes are emitted verbatim, which is what makes
//! the rewriter trivia-preserving. Edits are sorted by offset and stitched
//! into the output in one forward pass.

/// Replace `range` of the original text with `replacement`. An empty range
/// is an insertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEdit {
    pub start: usize,
    pub end: usize,
    pub replacement: String,
}

impl TextEdit {
    pub fn replace(start: usize, end: usize, replacement: impl Into<String>) -> Self {
        Self {
            start,
            end,
            replacement: replacement.into(),
        }
    }

    pub fn insert(at: usize, text: impl Into<String>) -> Self {
        Self {
            start: at,
            end: at,
            replacement: text.into(),
        }
    }

    pub fn is_insertion(&self) -> bool {
        self.start == self.end
    }
}

/// Apply edits to `text`. Edits are sorted by start offset; an edit that
/// overlaps an already-accepted one is dropped rather than corrupting the
/// output. Insertions at the same offset apply in submission order.
pub fn apply_edits(text: &str, edits: &[TextEdit]) -> String {
    let mut ordered: Vec<(usize, TextEdit)> = edits.iter().cloned().enumerate().collect();
    ordered.sort_by_key(|(i, e)| (e.start, e.end, *i));

    // Drop out-of-bounds and overlapping edits.
    let mut accepted: Vec<TextEdit> = Vec::new();
    let mut last_end = 0usize;
    for (_, edit) in ordered {
        if edit.end > text.len() || edit.start > edit.end {
            tracing::warn!(start = edit.start, end = edit.end, "dropping out-of-bounds edit");
            continue;
        }
        if edit.start < last_end {
            tracing::warn!(start = edit.start, end = edit.end, "dropping overlapping edit");
            continue;
        }
        // Two insertions at one offset are fine; a replacement starting at
        // the end of the previous edit is fine too.
        last_end = edit.end.max(edit.start);
        accepted.push(edit);
    }

    let mut out = String::with_capacity(text.len());
    let mut cursor = 0usize;
    for edit in &accepted {
        out.push_str(&text[cursor..edit.start]);
        out.push_str(&edit.replacement);
        cursor = edit.end;
    }
    out.push_str(&text[cursor..]);
    out
}
