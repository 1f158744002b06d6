use super::{DMType, TypeKind};
use crate::source::{Expr, ExprKind, NodeHandle, SourceFile, Span, TypeNode};

/// How much of a field is already written in source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    /// No value in source.
    Empty,
    /// An object or array literal; fields can be merged into it.
    Mergeable,
    /// Any other expression.
    NonEmpty,
}

impl ValueType {
    pub fn of(value: Option<&Expr>) -> Self {
        match value {
            None => ValueType::Empty,
            Some(expr) if expr.is_mergeable() => ValueType::Mergeable,
            Some(_) => ValueType::NonEmpty,
        }
    }
}

/// A declared type paired with the source expression currently bound to it.
///
/// `value` handles belong to the parse the tree was built from; after any edit
/// the tree is stale and must be rebuilt.
#[derive(Debug, Clone)]
pub struct DMTypeWithValue {
    pub ty: DMType,
    /// Dotted path relative to the tree root; the root itself is `""`.
    pub fqn: String,
    pub value: Option<NodeHandle>,
    pub value_type: ValueType,
    /// Span of the `key: value` entry (or array element) holding the value.
    pub entry: Option<Span>,
    /// One per record field, in declaration order.
    pub children: Vec<DMTypeWithValue>,
    /// One per element of a literal array value.
    pub elements: Vec<DMTypeWithValue>,
}

impl DMTypeWithValue {
    pub fn parent_fqn(&self) -> Option<&str> {
        if self.fqn.is_empty() {
            return None;
        }
        Some(self.fqn.rsplit_once('.').map_or("", |(parent, _)| parent))
    }

    pub fn has_value(&self) -> bool {
        self.value.is_some()
    }

    /// True when some field below this one holds a non-literal value.
    pub fn descendant_has_value(&self) -> bool {
        self.children
            .iter()
            .chain(&self.elements)
            .any(|c| c.value_type == ValueType::NonEmpty || c.descendant_has_value())
    }

    pub fn find_by_fqn(&self, fqn: &str) -> Option<&DMTypeWithValue> {
        if self.fqn == fqn {
            return Some(self);
        }
        self.children
            .iter()
            .chain(&self.elements)
            .find_map(|c| c.find_by_fqn(fqn))
    }

    /// Finds the node whose value occupies exactly `span`.
    pub fn find_by_value_span(&self, span: Span) -> Option<&DMTypeWithValue> {
        if self.value.is_some_and(|v| v.span() == span) {
            return Some(self);
        }
        self.children
            .iter()
            .chain(&self.elements)
            .find_map(|c| c.find_by_value_span(span))
    }
}

/// Builds [`DMTypeWithValue`] trees against one parse.
pub struct TypeWithValueBuilder<'s> {
    source: &'s SourceFile,
}

impl<'s> TypeWithValueBuilder<'s> {
    pub fn new(source: &'s SourceFile) -> Self {
        Self { source }
    }

    pub fn build(&self, ty: &DMType, value: Option<&Expr>) -> DMTypeWithValue {
        self.node(ty, value, String::new(), None)
    }

    fn node(
        &self,
        ty: &DMType,
        value: Option<&Expr>,
        fqn: String,
        entry: Option<Span>,
    ) -> DMTypeWithValue {
        let ty = resolve_union(ty, value);
        let mut node = DMTypeWithValue {
            fqn,
            value: value.map(|v| self.source.handle(v)),
            value_type: ValueType::of(value),
            entry,
            children: Vec::new(),
            elements: Vec::new(),
            ty,
        };

        let shape = node.ty.effective().clone();
        match shape.kind {
            TypeKind::Interface => {
                let properties = value.and_then(Expr::as_object);
                for field in &shape.fields {
                    let name = field.field_name();
                    let property =
                        properties.and_then(|props| props.iter().rev().find(|p| p.key == name));
                    let child = self.node(
                        field,
                        property.map(|p| &p.value),
                        join_fqn(&node.fqn, name),
                        property.map(|p| p.span),
                    );
                    node.children.push(child);
                }
            }
            TypeKind::Array => {
                if let (Some(member), Some(items)) =
                    (shape.member_type.as_deref(), value.and_then(Expr::as_array))
                {
                    for (index, item) in items.iter().enumerate() {
                        let member = member.clone().with_field(index.to_string(), false);
                        let element = self.node(
                            &member,
                            Some(item),
                            join_fqn(&node.fqn, &index.to_string()),
                            Some(item.span),
                        );
                        node.elements.push(element);
                    }
                }
            }
            _ => {}
        }
        node
    }
}

/// Picks the concrete member of a union from the shape of its value.
fn resolve_union(ty: &DMType, value: Option<&Expr>) -> DMType {
    let mut resolved = ty.clone();
    if ty.kind != TypeKind::Union {
        return resolved;
    }
    let Some(value) = value else {
        return resolved;
    };

    let member = match &value.skip_parens().kind {
        ExprKind::As {
            type_node: TypeNode::Reference(name),
            ..
        } => ty
            .union_types
            .iter()
            .find(|m| m.type_name.as_deref() == Some(name.as_str())),
        _ => {
            if let Some(props) = value.as_object() {
                ty.union_types.iter().find(|m| {
                    m.kind == TypeKind::Interface
                        && props.iter().all(|p| m.field(&p.key).is_some())
                })
            } else if value.as_array().is_some() {
                ty.union_types.iter().find(|m| m.kind == TypeKind::Array)
            } else {
                None
            }
        }
    };

    if let Some(member) = member {
        let mut member = member.clone();
        member.field_name = ty.field_name.clone();
        member.optional = ty.optional;
        resolved.resolved_union_type = Some(Box::new(member));
    }
    resolved
}

pub(crate) fn join_fqn(parent: &str, segment: &str) -> String {
    if parent.is_empty() {
        segment.to_string()
    } else {
        format!("{parent}.{segment}")
    }
}
