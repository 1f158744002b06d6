use crate::error::MappingError;
use crate::source::Span;
use serde::{Deserialize, Serialize};

/// Replaces `span` with `text`. An empty span inserts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextEdit {
    pub span: Span,
    pub text: String,
}

impl TextEdit {
    pub fn replace(span: Span, text: impl Into<String>) -> Self {
        Self {
            span,
            text: text.into(),
        }
    }

    pub fn insert(at: usize, text: impl Into<String>) -> Self {
        Self::replace(Span::empty(at), text)
    }

    pub fn delete(span: Span) -> Self {
        Self::replace(span, String::new())
    }
}

/// Applies non-overlapping edits to `text`, back to front.
pub fn apply_edits(text: &str, mut edits: Vec<TextEdit>) -> Result<String, MappingError> {
    edits.sort_by_key(|e| (e.span.start, e.span.end));
    for pair in edits.windows(2) {
        if pair[0].span.end > pair[1].span.start {
            return Err(MappingError::OverlappingEdits(pair[1].span.start));
        }
    }

    let mut output = text.to_string();
    for edit in edits.iter().rev() {
        if edit.span.end > output.len() || !output.is_char_boundary(edit.span.start) {
            return Err(MappingError::EditOutOfRange(edit.span.start));
        }
        output.replace_range(edit.span.start..edit.span.end, &edit.text);
    }
    Ok(output)
}

/// Indents every line after the first by `indent`.
pub fn indent_continuation(text: &str, indent: &str) -> String {
    let mut lines = text.split('\n');
    let mut output = lines.next().unwrap_or_default().to_string();
    for line in lines {
        output.push('\n');
        if !line.is_empty() {
            output.push_str(indent);
        }
        output.push_str(line);
    }
    output
}
