use super::node::FilterExpr;
use super::view::{View, ViewStack};
use crate::error::MapperError;
use crate::source::{ArrowBody, ArrowFunction, Expr, NodeHandle, SourceFile, Span};
use crate::types::{DMType, TypeKind, TypeResolver, TypeWithValueBuilder};
use tracing::debug;

/// A value in scope of the focused mapping: a parameter or an enclosing callback parameter.
#[derive(Debug, Clone)]
pub struct InputBinding {
    pub name: String,
    pub ty: DMType,
}

/// A typed local declaration of the root function.
#[derive(Debug, Clone)]
pub struct SubMappingBinding {
    pub index: usize,
    pub name: String,
    pub ty: DMType,
    pub decl: Span,
}

/// Where the focused output value is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputSlot {
    /// A `return` inside a statement block; `body` spans the braces.
    Return {
        body: Span,
        return_stmt: Option<Span>,
    },
    /// The expression body of an arrow callback.
    ArrowExpr { value: Span },
    /// The initializer of a local declaration.
    Local { decl: Span, init: Option<Span> },
}

/// The function, callback or local declaration the current view edits.
#[derive(Debug, Clone)]
pub struct FocusedFunction {
    pub function_name: String,
    pub inputs: Vec<InputBinding>,
    pub sub_mappings: Vec<SubMappingBinding>,
    pub output_type: DMType,
    pub output_value: Option<NodeHandle>,
    pub slot: OutputSlot,
    pub filters: Vec<FilterExpr>,
}

impl FocusedFunction {
    /// Resolves the view stack against `source`, starting from `function_name`.
    pub fn resolve(
        source: &SourceFile,
        function_name: &str,
        views: &ViewStack,
    ) -> Result<Self, MapperError> {
        let function = source.function(function_name)?;
        let body = function
            .body
            .as_ref()
            .ok_or_else(|| crate::error::SourceError::MissingBody {
                name: function_name.to_string(),
            })?;
        let resolver = TypeResolver::new(source.module());

        let inputs = function
            .params
            .iter()
            .map(|p| InputBinding {
                name: p.name.clone(),
                ty: type_or_any(&resolver, p.type_node.as_ref())
                    .with_field(p.name.clone(), p.optional),
            })
            .collect();

        let sub_mappings = body
            .locals
            .iter()
            .filter(|l| l.type_node.is_some())
            .enumerate()
            .map(|(index, l)| SubMappingBinding {
                index,
                name: l.name.clone(),
                ty: type_or_any(&resolver, l.type_node.as_ref()).with_field(l.name.clone(), false),
                decl: l.span,
            })
            .collect();

        let mut focus = Self {
            function_name: function_name.to_string(),
            inputs,
            sub_mappings,
            output_type: match &function.return_type {
                Some(node) => resolver.resolve(node),
                None => DMType::unsupported("void"),
            },
            output_value: body
                .return_expr()
                .map(|e| source.handle(e.skip_parens())),
            slot: OutputSlot::Return {
                body: body.span,
                return_stmt: body.return_stmt.as_ref().map(|r| r.span),
            },
            filters: Vec::new(),
        };

        for (depth, view) in views.iter().enumerate() {
            focus = match &view.sub_mapping_info {
                Some(info) if depth == 0 => focus.into_sub_mapping(source, &resolver, info.index),
                Some(_) => None,
                None => focus.into_map_function(source, &resolver, view),
            }
            .ok_or_else(|| MapperError::ViewNotFound(view.label.clone()))?;
            debug!(view = %view.label, depth, "focused nested view");
        }
        Ok(focus)
    }

    fn into_sub_mapping(
        self,
        source: &SourceFile,
        resolver: &TypeResolver<'_>,
        index: usize,
    ) -> Option<Self> {
        let binding = self.sub_mappings.get(index)?.clone();
        let body = source.function(&self.function_name).ok()?.body.as_ref()?;
        let local = body.locals.iter().find(|l| l.span == binding.decl)?;
        let init = local.init.as_ref().map(Expr::skip_parens);

        Some(Self {
            inputs: self.inputs,
            sub_mappings: self.sub_mappings.into_iter().take(index).collect(),
            output_type: type_or_any(resolver, local.type_node.as_ref()),
            output_value: init.map(|e| source.handle(e)),
            slot: OutputSlot::Local {
                decl: local.span,
                init: local.init.as_ref().map(|e| e.span),
            },
            filters: Vec::new(),
            function_name: self.function_name,
        })
    }

    fn into_map_function(
        self,
        source: &SourceFile,
        resolver: &TypeResolver<'_>,
        view: &View,
    ) -> Option<Self> {
        let tree = TypeWithValueBuilder::new(source).build(
            &self.output_type,
            self.output_value.as_ref().and_then(|h| source.expr_at(h)),
        );
        let target = tree.find_by_fqn(&view.target_field_fqn)?;
        let mut expr = source.expr_at(target.value.as_ref()?)?;

        let depth = view.map_fn_index.unwrap_or(0);
        let mut callback: Option<(&Expr, &ArrowFunction)> = None;
        for level in 0..=depth {
            let (receiver, arrow) = expr.as_map_call()?;
            callback = Some((receiver, arrow));
            if level < depth {
                expr = arrow.body.value()?;
            }
        }
        let (receiver, arrow) = callback?;

        let source_type = lookup_input_type(&self.inputs, &view.source_field_fqn);
        let param = arrow.params.first()?;
        let param_type = match &param.type_node {
            Some(node) => resolver.resolve(node),
            None => source_type
                .as_ref()
                .and_then(|t| t.member_at_depth(depth + 1))
                .cloned()
                .unwrap_or_else(|| DMType::primitive(TypeKind::Any)),
        };

        let mut inputs = vec![InputBinding {
            name: param.name.clone(),
            ty: param_type.with_field(param.name.clone(), false),
        }];
        inputs.extend(self.inputs);

        let output_type = target
            .ty
            .member_at_depth(depth + 1)
            .cloned()
            .unwrap_or_else(|| DMType::primitive(TypeKind::Any));
        let slot = match &arrow.body {
            ArrowBody::Expr(value) => OutputSlot::ArrowExpr { value: value.span },
            ArrowBody::Block(body) => OutputSlot::Return {
                body: body.span,
                return_stmt: body.return_stmt.as_ref().map(|r| r.span),
            },
        };

        Some(Self {
            function_name: self.function_name,
            inputs,
            sub_mappings: Vec::new(),
            output_type,
            output_value: arrow.body.value().map(|e| source.handle(e)),
            slot,
            filters: collect_filters(source, receiver),
        })
    }

    pub fn is_sub_mapping(&self) -> bool {
        matches!(self.slot, OutputSlot::Local { .. })
    }
}

fn type_or_any(resolver: &TypeResolver<'_>, node: Option<&crate::source::TypeNode>) -> DMType {
    node.map(|n| resolver.resolve(n))
        .unwrap_or_else(|| DMType::primitive(TypeKind::Any))
}

/// `.filter()` calls chained in front of a `.map()`, in source order.
fn collect_filters(source: &SourceFile, receiver: &Expr) -> Vec<FilterExpr> {
    let mut filters = Vec::new();
    let mut current = receiver;
    while let Some((inner, predicate)) = current.as_filter_call() {
        filters.push((source.handle(predicate), source.slice(predicate.span).to_string()));
        current = inner;
    }
    filters
        .into_iter()
        .rev()
        .enumerate()
        .map(|(index, (value, text))| FilterExpr { index, value, text })
        .collect()
}

/// Finds the declared type at an input access path such as `input.items`.
pub fn lookup_input_type(inputs: &[InputBinding], path: &str) -> Option<DMType> {
    let mut segments = split_access_path(path).into_iter();
    let root = segments.next()?;
    let binding = inputs.iter().find(|b| b.name == root)?;
    let mut ty = &binding.ty;
    for segment in segments {
        ty = ty.field(&segment)?;
    }
    Some(ty.clone())
}

/// Appends a field access, using optional chaining below optional parents.
pub(crate) fn access_join(parent: &str, field: &str, parent_optional: bool) -> String {
    if is_identifier(field) {
        let separator = if parent_optional { "?." } else { "." };
        format!("{parent}{separator}{field}")
    } else {
        let separator = if parent_optional { "?." } else { "" };
        format!("{parent}{separator}[\"{field}\"]")
    }
}

/// Splits `a.b?.c["d-e"]` into `["a", "b", "c", "d-e"]`.
pub(crate) fn split_access_path(path: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut chars = path.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '?' if chars.peek() == Some(&'.') => {}
            '.' => {
                if !current.is_empty() {
                    segments.push(std::mem::take(&mut current));
                }
            }
            '[' => {
                if !current.is_empty() {
                    segments.push(std::mem::take(&mut current));
                }
                let quoted: String = chars.by_ref().take_while(|c| *c != ']').collect();
                segments.push(quoted.trim_matches(|c| c == '"' || c == '\'').to_string());
            }
            _ => current.push(c),
        }
    }
    if !current.is_empty() {
        segments.push(current);
    }
    segments
}

pub(crate) fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

