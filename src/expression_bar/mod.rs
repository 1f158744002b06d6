//! Free-text editing of a single mapping expression, with debounced completions.
use crate::config::MapperConfig;
use crate::diagram::PortId;
use crate::error::CompletionError;
use std::time::{Duration, Instant};
use tracing::debug;

pub mod completion;
pub mod debounce;

pub use completion::{
    CompletionEntry, CompletionProvider, CompletionRequest, CompletionResponse, ShadowBuffer,
    filter_completions,
};
pub use debounce::Debouncer;

/// What the bar is editing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpressionTarget {
    Port(PortId),
    /// A `.filter()` predicate of the focused map callback.
    Filter(usize),
}

/// The text to write back when the bar loses focus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpressionCommit {
    pub target: ExpressionTarget,
    pub text: String,
}

#[derive(Debug)]
struct FocusedField {
    target: ExpressionTarget,
    original: String,
    buffer: String,
    cursor: usize,
    shadow: ShadowBuffer,
}

#[derive(Debug)]
pub struct ExpressionBar {
    focused: Option<FocusedField>,
    debouncer: Debouncer<CompletionRequest>,
    completions: Vec<CompletionEntry>,
}

impl ExpressionBar {
    pub fn new(config: &MapperConfig) -> Self {
        Self {
            focused: None,
            debouncer: Debouncer::new(Duration::from_millis(config.debounce_ms)),
            completions: Vec::new(),
        }
    }

    pub fn focus(&mut self, target: ExpressionTarget, original: String, shadow: ShadowBuffer) {
        debug!(?target, "expression bar focused");
        self.debouncer.cancel();
        self.completions.clear();
        self.focused = Some(FocusedField {
            target,
            cursor: original.len(),
            buffer: original.clone(),
            original,
            shadow,
        });
    }

    pub fn is_focused(&self) -> bool {
        self.focused.is_some()
    }

    pub fn target(&self) -> Option<ExpressionTarget> {
        self.focused.as_ref().map(|f| f.target)
    }

    pub fn text(&self) -> Option<&str> {
        self.focused.as_ref().map(|f| f.buffer.as_str())
    }

    pub fn cursor(&self) -> Option<usize> {
        self.focused.as_ref().map(|f| f.cursor)
    }

    /// Replaces the buffer after a keystroke and schedules a completion request.
    pub fn input(&mut self, text: impl Into<String>, cursor: usize, now: Instant) {
        let Some(field) = self.focused.as_mut() else {
            return;
        };
        field.buffer = text.into();
        field.cursor = clamp_to_boundary(&field.buffer, cursor);
        let request = field.shadow.splice(&field.buffer, field.cursor);
        if self.debouncer.schedule(request, now).is_some() {
            debug!("superseded pending completion request");
        }
    }

    /// Inserts `text` at the cursor, e.g. a source field clicked in the diagram.
    pub fn insert_at_cursor(&mut self, text: &str, now: Instant) {
        let Some(field) = self.focused.as_ref() else {
            return;
        };
        let mut buffer = field.buffer.clone();
        buffer.insert_str(field.cursor, text);
        let cursor = field.cursor + text.len();
        self.input(buffer, cursor, now);
    }

    /// The completion request whose quiet period has elapsed, if any.
    pub fn poll_request(&mut self, now: Instant) -> Option<CompletionRequest> {
        self.debouncer.poll(now)
    }

    /// The pending completion request, without waiting for the quiet period.
    pub fn flush_request(&mut self) -> Option<CompletionRequest> {
        self.debouncer.flush()
    }

    pub fn has_pending_request(&self) -> bool {
        self.debouncer.is_pending()
    }

    /// Sends `request` and keeps the entries matching the fragment under the cursor.
    pub async fn request_completions<P>(
        &mut self,
        provider: &P,
        request: CompletionRequest,
    ) -> Result<&[CompletionEntry], CompletionError>
    where
        P: CompletionProvider + ?Sized,
    {
        debug!(cursor = request.cursor_position, "requesting completions");
        let response = provider.completions(request).await?;
        self.completions = match &self.focused {
            Some(field) => filter_completions(response, &field.buffer, field.cursor),
            None => Vec::new(),
        };
        Ok(&self.completions)
    }

    pub fn completions(&self) -> &[CompletionEntry] {
        &self.completions
    }

    /// Ends editing. Returns the text to write when it differs from the original.
    pub fn commit(&mut self) -> Option<ExpressionCommit> {
        if self.debouncer.cancel() {
            debug!("dropped pending completion request on commit");
        }
        self.completions.clear();
        let field = self.focused.take()?;
        if field.buffer.trim() == field.original.trim() {
            return None;
        }
        Some(ExpressionCommit {
            target: field.target,
            text: field.buffer,
        })
    }

    /// Discards the buffer; returns the original text to redisplay.
    pub fn cancel(&mut self) -> Option<String> {
        self.debouncer.cancel();
        self.completions.clear();
        self.focused.take().map(|f| f.original)
    }
}

fn clamp_to_boundary(text: &str, cursor: usize) -> usize {
    let mut cursor = cursor.min(text.len());
    while !text.is_char_boundary(cursor) {
        cursor -= 1;
    }
    cursor
}
