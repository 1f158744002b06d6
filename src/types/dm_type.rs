use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Structural kind of a declared type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeKind {
    Interface,
    Array,
    Union,
    String,
    Number,
    Boolean,
    Literal,
    Any,
    Null,
    Unsupported,
}

impl TypeKind {
    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            TypeKind::String
                | TypeKind::Number
                | TypeKind::Boolean
                | TypeKind::Literal
                | TypeKind::Any
                | TypeKind::Null
        )
    }
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// A declared type descriptor. Immutable per parse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DMType {
    pub kind: TypeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_name: Option<String>,
    #[serde(default)]
    pub optional: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<DMType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub member_type: Option<Box<DMType>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub union_types: Vec<DMType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_union_type: Option<Box<DMType>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub literal: Option<String>,
}

impl DMType {
    fn bare(kind: TypeKind) -> Self {
        Self {
            kind,
            type_name: None,
            field_name: None,
            optional: false,
            fields: Vec::new(),
            member_type: None,
            union_types: Vec::new(),
            resolved_union_type: None,
            literal: None,
        }
    }

    pub fn primitive(kind: TypeKind) -> Self {
        Self::bare(kind)
    }

    pub fn interface(type_name: Option<String>, fields: Vec<DMType>) -> Self {
        Self {
            type_name,
            fields,
            ..Self::bare(TypeKind::Interface)
        }
    }

    pub fn array(member: DMType) -> Self {
        Self {
            member_type: Some(Box::new(member)),
            ..Self::bare(TypeKind::Array)
        }
    }

    /// A union; statically resolved when exactly one member is not `null`/`undefined`.
    pub fn union(members: Vec<DMType>) -> Self {
        let mut concrete = members.iter().filter(|m| m.kind != TypeKind::Null);
        let resolved = match (concrete.next(), concrete.next()) {
            (Some(only), None) => Some(Box::new(only.clone())),
            _ => None,
        };
        Self {
            union_types: members,
            resolved_union_type: resolved,
            ..Self::bare(TypeKind::Union)
        }
    }

    pub fn literal(text: impl Into<String>) -> Self {
        Self {
            literal: Some(text.into()),
            ..Self::bare(TypeKind::Literal)
        }
    }

    pub fn unsupported(type_name: impl Into<String>) -> Self {
        Self {
            type_name: Some(type_name.into()),
            ..Self::bare(TypeKind::Unsupported)
        }
    }

    /// Binds this type to a field of an enclosing record.
    pub fn with_field(mut self, name: impl Into<String>, optional: bool) -> Self {
        self.field_name = Some(name.into());
        self.optional = optional;
        self
    }

    pub fn field_name(&self) -> &str {
        self.field_name.as_deref().unwrap_or("")
    }

    /// The concrete type after union resolution.
    pub fn effective(&self) -> &DMType {
        match (&self.kind, &self.resolved_union_type) {
            (TypeKind::Union, Some(resolved)) => resolved.effective(),
            _ => self,
        }
    }

    /// Number of nested array levels.
    pub fn dimensions(&self) -> usize {
        let ty = self.effective();
        match (&ty.kind, &ty.member_type) {
            (TypeKind::Array, Some(member)) => 1 + member.dimensions(),
            _ => 0,
        }
    }

    /// The type left after stripping `depth` array levels.
    pub fn member_at_depth(&self, depth: usize) -> Option<&DMType> {
        let mut ty = self.effective();
        for _ in 0..depth {
            ty = ty.member_type.as_deref()?.effective();
        }
        Some(ty)
    }

    pub fn innermost(&self) -> &DMType {
        self.member_at_depth(self.dimensions()).unwrap_or(self)
    }

    pub fn is_record(&self) -> bool {
        self.effective().kind == TypeKind::Interface
    }

    /// Records and unresolved unions both need a user decision when mapped wholesale.
    pub fn is_record_like(&self) -> bool {
        matches!(self.effective().kind, TypeKind::Interface | TypeKind::Union)
    }

    pub fn field(&self, name: &str) -> Option<&DMType> {
        self.effective()
            .fields
            .iter()
            .find(|f| f.field_name.as_deref() == Some(name))
    }

    pub fn required_fields(&self) -> impl Iterator<Item = &DMType> {
        self.effective().fields.iter().filter(|f| !f.optional)
    }

    /// TypeScript spelling of the type.
    pub fn type_text(&self) -> String {
        match self.kind {
            TypeKind::Interface => match &self.type_name {
                Some(name) => name.clone(),
                None => format!(
                    "{{ {} }}",
                    self.fields
                        .iter()
                        .map(|f| format!(
                            "{}{}: {}",
                            f.field_name(),
                            if f.optional { "?" } else { "" },
                            f.type_text()
                        ))
                        .join("; ")
                ),
            },
            TypeKind::Array => {
                let member = self
                    .member_type
                    .as_deref()
                    .map(|m| match m.kind {
                        TypeKind::Union => format!("({})", m.type_text()),
                        _ => m.type_text(),
                    })
                    .unwrap_or_else(|| "any".to_string());
                format!("{member}[]")
            }
            TypeKind::Union => match &self.type_name {
                Some(name) => name.clone(),
                None => self.union_types.iter().map(DMType::type_text).join(" | "),
            },
            TypeKind::String => "string".to_string(),
            TypeKind::Number => "number".to_string(),
            TypeKind::Boolean => "boolean".to_string(),
            TypeKind::Literal => self.literal.clone().unwrap_or_default(),
            TypeKind::Any => "any".to_string(),
            TypeKind::Null => "null".to_string(),
            TypeKind::Unsupported => self
                .type_name
                .clone()
                .unwrap_or_else(|| "unknown".to_string()),
        }
    }

    /// PascalCase label used to name generated functions, e.g. `AddressArr`.
    pub fn type_label(&self) -> String {
        match self.kind {
            TypeKind::Interface => self
                .type_name
                .as_deref()
                .map(pascal_case)
                .unwrap_or_else(|| "Object".to_string()),
            TypeKind::Array => format!(
                "{}Arr",
                self.member_type
                    .as_deref()
                    .map(DMType::type_label)
                    .unwrap_or_else(|| "Any".to_string())
            ),
            TypeKind::Union => match (&self.type_name, &self.resolved_union_type) {
                (Some(name), _) => pascal_case(name),
                (None, Some(resolved)) => resolved.type_label(),
                (None, None) => "Union".to_string(),
            },
            TypeKind::String => "String".to_string(),
            TypeKind::Number => "Number".to_string(),
            TypeKind::Boolean => "Boolean".to_string(),
            TypeKind::Literal => "Literal".to_string(),
            TypeKind::Any => "Any".to_string(),
            TypeKind::Null => "Null".to_string(),
            TypeKind::Unsupported => self
                .type_name
                .as_deref()
                .map(pascal_case)
                .unwrap_or_else(|| "Unknown".to_string()),
        }
    }
}

fn pascal_case(name: &str) -> String {
    name.split(|c: char| !c.is_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}
