use super::port::PortId;
use crate::interaction::MappingType;
use crate::source::{NodeHandle, Span};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct LinkId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// Following the cursor; no target yet.
    Provisional,
    /// Connected, waiting for the user to pick a mapping.
    Pending(MappingType),
    /// Backed by source text.
    Actual,
}

/// A compiler diagnostic whose range overlaps a mapped expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub span: Span,
    pub message: String,
}

/// The editable text shown on a link.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpressionLabel {
    pub value: Option<NodeHandle>,
    pub text: String,
    /// The link's value is a `.map()` callback that can be opened as a view.
    pub is_map_fn: bool,
}

#[derive(Debug, Clone)]
pub struct Link {
    pub id: LinkId,
    pub source: PortId,
    pub target: Option<PortId>,
    pub label: Option<ExpressionLabel>,
    pub diagnostics: Vec<Diagnostic>,
    pub state: LinkState,
    pub selected: bool,
}

impl Link {
    pub fn has_diagnostics(&self) -> bool {
        !self.diagnostics.is_empty()
    }
}
