use crate::types::TypeKind;
use ahash::AHashSet;
use serde::{Deserialize, Serialize};

/// Identifies a typed local declaration shown as a sub-mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubMappingInfo {
    /// Position among the function's typed local declarations.
    pub index: usize,
    pub mapping_name: String,
}

/// One entry of the navigation stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct View {
    pub label: String,
    /// Output field whose `.map()` callback this view focuses.
    pub target_field_fqn: String,
    /// Input field the callback iterates.
    pub source_field_fqn: String,
    /// Nesting level of the callback for multi-dimensional arrays.
    pub map_fn_index: Option<usize>,
    pub sub_mapping_info: Option<SubMappingInfo>,
}

impl View {
    pub fn map_function(
        label: impl Into<String>,
        target_field_fqn: impl Into<String>,
        source_field_fqn: impl Into<String>,
    ) -> Self {
        Self {
            label: label.into(),
            target_field_fqn: target_field_fqn.into(),
            source_field_fqn: source_field_fqn.into(),
            map_fn_index: None,
            sub_mapping_info: None,
        }
    }

    pub fn sub_mapping(index: usize, mapping_name: impl Into<String>) -> Self {
        let mapping_name = mapping_name.into();
        Self {
            label: mapping_name.clone(),
            target_field_fqn: String::new(),
            source_field_fqn: String::new(),
            map_fn_index: None,
            sub_mapping_info: Some(SubMappingInfo {
                index,
                mapping_name,
            }),
        }
    }
}

/// Views pushed on top of the function being mapped. Empty means the root view.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewStack {
    views: Vec<View>,
}

impl ViewStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, view: View) {
        self.views.push(view);
    }

    pub fn pop(&mut self) -> Option<View> {
        self.views.pop()
    }

    pub fn current(&self) -> Option<&View> {
        self.views.last()
    }

    pub fn is_root(&self) -> bool {
        self.views.is_empty()
    }

    pub fn depth(&self) -> usize {
        self.views.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &View> {
        self.views.iter()
    }

    /// Breadcrumb labels from the root outwards.
    pub fn labels(&self) -> Vec<&str> {
        self.views.iter().map(|v| v.label.as_str()).collect()
    }
}

/// Answers whether a field is currently collapsed in the UI.
pub trait CollapsePredicate {
    fn is_collapsed(&self, field_id: &str, kind: TypeKind) -> bool;
}

impl<F> CollapsePredicate for F
where
    F: Fn(&str, TypeKind) -> bool,
{
    fn is_collapsed(&self, field_id: &str, kind: TypeKind) -> bool {
        self(field_id, kind)
    }
}

/// A field-name filter typed into the input or output search box.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SearchFilter {
    #[default]
    None,
    Term(String),
    /// Unbalanced brackets; matches nothing.
    Malformed,
}

impl SearchFilter {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return SearchFilter::None;
        }
        let mut depth: i32 = 0;
        for c in trimmed.chars() {
            match c {
                '[' => depth += 1,
                ']' => depth -= 1,
                _ => {}
            }
            if depth < 0 {
                return SearchFilter::Malformed;
            }
        }
        if depth != 0 {
            return SearchFilter::Malformed;
        }
        let term: String = trimmed
            .chars()
            .filter(|c| !matches!(c, '[' | ']'))
            .collect();
        SearchFilter::Term(term.to_lowercase())
    }

    pub fn is_active(&self) -> bool {
        !matches!(self, SearchFilter::None)
    }

    pub fn matches(&self, field_name: &str) -> bool {
        match self {
            SearchFilter::None => true,
            SearchFilter::Term(term) => field_name.to_lowercase().contains(term.as_str()),
            SearchFilter::Malformed => false,
        }
    }
}

/// UI state that shapes the diagram, passed read-only into each render pass.
#[derive(Debug, Clone, Default)]
pub struct ViewState {
    pub collapsed_fields: AHashSet<String>,
    pub input_search: SearchFilter,
    pub output_search: SearchFilter,
}

impl ViewState {
    pub fn toggle_collapsed(&mut self, field_id: &str) {
        if !self.collapsed_fields.remove(field_id) {
            self.collapsed_fields.insert(field_id.to_string());
        }
    }
}

impl CollapsePredicate for ViewState {
    fn is_collapsed(&self, field_id: &str, _kind: TypeKind) -> bool {
        self.collapsed_fields.contains(field_id)
    }
}
