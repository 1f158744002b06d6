//! Jumping the host editor to the code behind a diagram element.
use crate::source::{LineCol, SourceFile, Span};
use serde::{Deserialize, Serialize};

/// 0-based line and column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditorPosition {
    pub line: usize,
    pub column: usize,
}

impl From<LineCol> for EditorPosition {
    fn from(position: LineCol) -> Self {
        Self {
            line: position.line.saturating_sub(1),
            column: position.column.saturating_sub(1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditorRange {
    pub start: EditorPosition,
    pub end: EditorPosition,
}

impl EditorRange {
    pub fn of_span(source: &SourceFile, span: Span) -> Self {
        Self {
            start: source.line_col(span.start).into(),
            end: source.line_col(span.end).into(),
        }
    }
}

pub trait SourceNavigator {
    fn go_to_source(&mut self, range: EditorRange);
}
