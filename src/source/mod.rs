//! Source model adapter.
//!
//! Wraps one parsed TypeScript file and is the single source of truth for where a
//! mapping lives in the code. Nodes are addressed by [`NodeHandle`]s: a byte span
//! plus the generation of the parse that produced it. Any edit produces a new
//! `SourceFile` with a new generation, so handles taken before the edit are
//! "forgotten" and every accessor returns `None` for them.
use crate::error::SourceError;
use ahash::AHashSet;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};
use tree_sitter::Parser;

mod lower;
pub mod syntax;

use lower::Lowerer;
pub use syntax::*;

static NEXT_GENERATION: AtomicU64 = AtomicU64::new(1);

/// Half-open byte range `[start, end)` into the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn empty(at: usize) -> Self {
        Self { start: at, end: at }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, other: Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    pub fn overlaps(&self, other: Span) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// 1-based line and column, as reported by the parser's host editor conventions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineCol {
    pub line: usize,
    pub column: usize,
}

/// A position-addressed reference to a node of one particular parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeHandle {
    generation: u64,
    span: Span,
    kind: SyntaxKind,
}

impl NodeHandle {
    pub fn span(&self) -> Span {
        self.span
    }

    pub fn kind(&self) -> SyntaxKind {
        self.kind
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// A parsed TypeScript file.
#[derive(Debug, Clone)]
pub struct SourceFile {
    path: PathBuf,
    text: String,
    generation: u64,
    module: Module,
    has_errors: bool,
}

impl SourceFile {
    pub fn parse(path: impl Into<PathBuf>, text: impl Into<String>) -> Result<Self, SourceError> {
        let path = path.into();
        let text = text.into();

        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into())
            .map_err(|e| SourceError::LanguageInit(e.to_string()))?;
        let tree = parser
            .parse(&text, None)
            .ok_or_else(|| SourceError::ParseFailed { path: path.clone() })?;

        let root = tree.root_node();
        let has_errors = root.has_error();
        if has_errors {
            warn!(path = %path.display(), "source has syntax errors, lowering what parsed");
        }
        let module = Lowerer::new(&text).module(root);
        let generation = NEXT_GENERATION.fetch_add(1, Ordering::Relaxed);
        debug!(
            path = %path.display(),
            generation,
            functions = module.functions.len(),
            interfaces = module.interfaces.len(),
            "parsed source file"
        );

        Ok(Self {
            path,
            text,
            generation,
            module,
            has_errors,
        })
    }

    /// Reparses `text` as the next version of this file.
    pub fn with_text(&self, text: impl Into<String>) -> Result<Self, SourceError> {
        Self::parse(self.path.clone(), text)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn module(&self) -> &Module {
        &self.module
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn has_errors(&self) -> bool {
        self.has_errors
    }

    pub fn function(&self, name: &str) -> Result<&FunctionDecl, SourceError> {
        self.module
            .function(name)
            .ok_or_else(|| SourceError::FunctionNotFound(name.to_string()))
    }

    pub fn handle(&self, expr: &Expr) -> NodeHandle {
        NodeHandle {
            generation: self.generation,
            span: expr.span,
            kind: expr.syntax_kind(),
        }
    }

    /// False once the handle's parse has been superseded.
    pub fn is_live(&self, handle: &NodeHandle) -> bool {
        handle.generation == self.generation && handle.span.end <= self.text.len()
    }

    pub fn span_of(&self, handle: &NodeHandle) -> Option<Span> {
        self.is_live(handle).then_some(handle.span)
    }

    pub fn text_at(&self, handle: &NodeHandle) -> Option<&str> {
        self.span_of(handle).and_then(|s| self.text.get(s.start..s.end))
    }

    pub fn slice(&self, span: Span) -> &str {
        self.text.get(span.start..span.end).unwrap_or("")
    }

    /// Resolves a live handle back to its expression.
    pub fn expr_at(&self, handle: &NodeHandle) -> Option<&Expr> {
        if !self.is_live(handle) {
            return None;
        }
        self.find_expr_by_span(handle.span, Some(handle.kind))
    }

    /// Position-based lookup over every function body in the file.
    pub fn find_expr_by_span(&self, span: Span, kind: Option<SyntaxKind>) -> Option<&Expr> {
        self.module
            .functions
            .iter()
            .filter(|f| f.span.contains(span))
            .filter_map(|f| f.body.as_ref())
            .find_map(|body| {
                body.locals
                    .iter()
                    .filter_map(|l| l.init.as_ref())
                    .chain(body.return_expr())
                    .find_map(|e| e.find_by_span(span, kind))
            })
    }

    pub fn line_col(&self, offset: usize) -> LineCol {
        let offset = offset.min(self.text.len());
        let before = self.text.get(..offset).unwrap_or("");
        let line = before.matches('\n').count() + 1;
        let line_start = before.rfind('\n').map(|i| i + 1).unwrap_or(0);
        let column = before.get(line_start..).map_or(0, |s| s.chars().count()) + 1;
        LineCol { line, column }
    }

    /// Leading whitespace of the line containing `offset`.
    pub fn line_indent(&self, offset: usize) -> &str {
        let offset = offset.min(self.text.len());
        let line_start = self
            .text
            .get(..offset)
            .and_then(|s| s.rfind('\n'))
            .map(|i| i + 1)
            .unwrap_or(0);
        let rest = self.text.get(line_start..).unwrap_or("");
        let width = rest.len() - rest.trim_start_matches([' ', '\t']).len();
        &rest[..width]
    }

    /// Function and import names bound at module scope.
    pub fn declared_names(&self) -> AHashSet<String> {
        self.module
            .functions
            .iter()
            .map(|f| f.name.clone())
            .chain(self.module.imported_names().map(str::to_string))
            .collect()
    }
}
