use super::{DMType, TypeKind};
use ahash::AHashSet;
use crate::source::{Module, PropertySignature, TypeNode};

/// Resolves type annotations against the interfaces and aliases of one module.
pub struct TypeResolver<'m> {
    module: &'m Module,
}

impl<'m> TypeResolver<'m> {
    pub fn new(module: &'m Module) -> Self {
        Self { module }
    }

    pub fn resolve(&self, node: &TypeNode) -> DMType {
        self.resolve_inner(node, &mut AHashSet::new())
    }

    /// Resolves a type by declared name, e.g. an interface.
    pub fn resolve_named(&self, name: &str) -> DMType {
        self.resolve(&TypeNode::Reference(name.to_string()))
    }

    fn resolve_inner(&self, node: &TypeNode, visiting: &mut AHashSet<String>) -> DMType {
        match node {
            TypeNode::Keyword(keyword) => match keyword.as_str() {
                "string" => DMType::primitive(TypeKind::String),
                "number" | "bigint" => DMType::primitive(TypeKind::Number),
                "boolean" => DMType::primitive(TypeKind::Boolean),
                "any" | "unknown" | "object" => DMType::primitive(TypeKind::Any),
                "null" | "undefined" | "void" => DMType::primitive(TypeKind::Null),
                other => DMType::unsupported(other),
            },
            TypeNode::Reference(name) => self.resolve_reference(name, visiting),
            TypeNode::Array(member) => DMType::array(self.resolve_inner(member, visiting)),
            TypeNode::Union(members) => DMType::union(
                members
                    .iter()
                    .map(|m| self.resolve_inner(m, visiting))
                    .collect(),
            ),
            TypeNode::Object(members) => DMType::interface(None, self.fields(members, visiting)),
            TypeNode::Literal(text) => DMType::literal(text.clone()),
            TypeNode::Unknown(text) => DMType::unsupported(text.clone()),
        }
    }

    fn resolve_reference(&self, name: &str, visiting: &mut AHashSet<String>) -> DMType {
        // A self-referencing record stops expanding at the repeated name.
        if visiting.contains(name) {
            return DMType::interface(Some(name.to_string()), Vec::new());
        }

        if let Some(interface) = self.module.interface(name) {
            visiting.insert(name.to_string());
            let fields = self.fields(&interface.members, visiting);
            visiting.remove(name);
            return DMType::interface(Some(name.to_string()), fields);
        }

        if let Some(alias) = self.module.type_alias(name) {
            visiting.insert(name.to_string());
            let mut resolved = self.resolve_inner(&alias.type_node, visiting);
            visiting.remove(name);
            if resolved.type_name.is_none()
                && matches!(resolved.kind, TypeKind::Interface | TypeKind::Union)
            {
                resolved.type_name = Some(name.to_string());
            }
            return resolved;
        }

        match name {
            "String" => DMType::primitive(TypeKind::String),
            "Number" => DMType::primitive(TypeKind::Number),
            "Boolean" => DMType::primitive(TypeKind::Boolean),
            "Object" => DMType::primitive(TypeKind::Any),
            _ => DMType::unsupported(name),
        }
    }

    fn fields(
        &self,
        members: &[PropertySignature],
        visiting: &mut AHashSet<String>,
    ) -> Vec<DMType> {
        members
            .iter()
            .map(|m| {
                self.resolve_inner(&m.type_node, visiting)
                    .with_field(m.name.clone(), m.optional)
            })
            .collect()
    }
}
