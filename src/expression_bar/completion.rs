use crate::error::CompletionError;
use crate::source::Span;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionRequest {
    pub file_path: PathBuf,
    pub file_content: String,
    /// Byte offset of the cursor within `file_content`.
    pub cursor_position: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionEntry {
    pub entry: String,
    #[serde(default)]
    pub details: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionResponse {
    pub completions: Vec<CompletionEntry>,
}

/// Language service answering completion requests against a spliced file.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn completions(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, CompletionError>;
}

/// A copy of the file with a hole where the focused expression lives.
///
/// Offsets are computed once on focus; each request splices the current
/// buffer into the hole without touching the real file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShadowBuffer {
    file_path: PathBuf,
    text: String,
    hole: Span,
}

impl ShadowBuffer {
    /// Brackets an existing value at `span`.
    pub fn around(file_path: &Path, text: &str, span: Span) -> Self {
        Self {
            file_path: file_path.to_path_buf(),
            text: text.to_string(),
            hole: span,
        }
    }

    /// An empty hole at `offset` in text that already has the scaffolding for a new value.
    pub fn at_insertion(file_path: &Path, text: String, offset: usize) -> Self {
        Self {
            file_path: file_path.to_path_buf(),
            text,
            hole: Span::empty(offset),
        }
    }

    pub fn hole(&self) -> Span {
        self.hole
    }

    pub fn splice(&self, buffer: &str, cursor: usize) -> CompletionRequest {
        let before = self.text.get(..self.hole.start).unwrap_or(&self.text);
        let after = self.text.get(self.hole.end..).unwrap_or("");
        CompletionRequest {
            file_path: self.file_path.clone(),
            file_content: format!("{before}{buffer}{after}"),
            cursor_position: self.hole.start + cursor.min(buffer.len()),
        }
    }
}

/// The identifier fragment immediately before `cursor`.
pub fn word_before(buffer: &str, cursor: usize) -> &str {
    let head = buffer.get(..cursor.min(buffer.len())).unwrap_or(buffer);
    let start = head
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_alphanumeric() || *c == '_' || *c == '$')
        .last()
        .map_or(head.len(), |(i, _)| i);
    &head[start..]
}

/// Keeps the entries that extend the fragment being typed.
pub fn filter_completions(
    response: CompletionResponse,
    buffer: &str,
    cursor: usize,
) -> Vec<CompletionEntry> {
    let fragment = word_before(buffer, cursor).to_lowercase();
    response
        .completions
        .into_iter()
        .filter(|c| c.entry.to_lowercase().starts_with(&fragment))
        .collect()
}
