//! Owned syntax model lowered from the TypeScript concrete syntax tree.
//!
//! Only the shapes the mapper reasons about get their own variants; every other
//! expression is kept as [`ExprKind::Other`] so its children stay reachable when
//! scanning for input references.
use super::Span;
use std::fmt;

/// The declarations of one source file that matter to the mapper.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Module {
    pub imports: Vec<ImportDecl>,
    pub interfaces: Vec<InterfaceDecl>,
    pub type_aliases: Vec<TypeAliasDecl>,
    pub functions: Vec<FunctionDecl>,
    /// Byte length of the file.
    pub len: usize,
}

impl Module {
    pub fn function(&self, name: &str) -> Option<&FunctionDecl> {
        self.functions.iter().find(|f| f.name == name)
    }

    pub fn interface(&self, name: &str) -> Option<&InterfaceDecl> {
        self.interfaces.iter().find(|i| i.name == name)
    }

    pub fn type_alias(&self, name: &str) -> Option<&TypeAliasDecl> {
        self.type_aliases.iter().find(|t| t.name == name)
    }

    /// Names bound at module scope by imports.
    pub fn imported_names(&self) -> impl Iterator<Item = &str> {
        self.imports
            .iter()
            .flat_map(|i| i.names.iter().map(String::as_str))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportDecl {
    pub span: Span,
    pub names: Vec<String>,
    pub module: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InterfaceDecl {
    pub span: Span,
    pub name: String,
    pub members: Vec<PropertySignature>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeAliasDecl {
    pub span: Span,
    pub name: String,
    pub type_node: TypeNode,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PropertySignature {
    pub name: String,
    pub optional: bool,
    pub type_node: TypeNode,
}

/// A type as written in the source, before resolution.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeNode {
    /// `string`, `number`, `boolean`, `any`, `null`, `undefined`, ...
    Keyword(String),
    /// A named type such as an interface or alias.
    Reference(String),
    Array(Box<TypeNode>),
    Union(Vec<TypeNode>),
    /// Inline `{ a: string }` type.
    Object(Vec<PropertySignature>),
    /// `"A"`, `42`, `true`
    Literal(String),
    Unknown(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    pub span: Span,
    pub name: String,
    pub exported: bool,
    pub params: Vec<Param>,
    pub return_type: Option<TypeNode>,
    pub body: Option<FunctionBody>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub span: Span,
    pub name: String,
    pub type_node: Option<TypeNode>,
    pub optional: bool,
}

/// A `{ ... }` statement block of a function or block-bodied arrow.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionBody {
    /// Span including the braces.
    pub span: Span,
    pub locals: Vec<LocalDecl>,
    pub return_stmt: Option<ReturnStmt>,
}

impl FunctionBody {
    pub fn return_expr(&self) -> Option<&Expr> {
        self.return_stmt.as_ref().and_then(|r| r.expr.as_ref())
    }

    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Expr)) {
        for local in &self.locals {
            if let Some(init) = &local.init {
                init.walk(visit);
            }
        }
        if let Some(expr) = self.return_expr() {
            expr.walk(visit);
        }
    }
}

/// A `const`/`let` declaration inside a function body.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalDecl {
    /// Span of the whole declaration statement.
    pub span: Span,
    pub name: String,
    pub type_node: Option<TypeNode>,
    pub init: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReturnStmt {
    pub span: Span,
    pub expr: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub span: Span,
    pub kind: ExprKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Object {
        properties: Vec<Property>,
        /// Spans of every entry in source order, spreads and methods included.
        entries: Vec<Span>,
    },
    Array(Vec<Expr>),
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    Member {
        object: Box<Expr>,
        property: String,
        optional: bool,
        /// `object["property"]` with a string key.
        computed: bool,
    },
    Arrow(Box<ArrowFunction>),
    Identifier(String),
    Literal(LiteralKind),
    Paren(Box<Expr>),
    Binary {
        left: Box<Expr>,
        operator: String,
        right: Box<Expr>,
    },
    /// `expr as T` or `<T>expr`
    As {
        expr: Box<Expr>,
        type_node: TypeNode,
    },
    Other(Vec<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteralKind {
    String,
    Template,
    Number,
    Boolean,
    Null,
    Undefined,
}

/// One `key: value` (or shorthand `key`) entry of an object literal.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub span: Span,
    pub key: String,
    pub key_span: Span,
    /// For shorthand properties this is an identifier spanning the key.
    pub value: Expr,
    pub shorthand: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArrowFunction {
    pub params: Vec<Param>,
    pub body: ArrowBody,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ArrowBody {
    Expr(Expr),
    Block(FunctionBody),
}

impl ArrowBody {
    /// The value the callback produces: the expression body or the block's return value.
    pub fn value(&self) -> Option<&Expr> {
        match self {
            ArrowBody::Expr(expr) => Some(expr.skip_parens()),
            ArrowBody::Block(body) => body.return_expr().map(Expr::skip_parens),
        }
    }
}

/// Discriminant of a syntax node, carried by handles so a lookup by span
/// cannot confuse a parenthesised expression with its contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyntaxKind {
    Object,
    Array,
    Call,
    Member,
    Arrow,
    Identifier,
    Literal,
    Paren,
    Binary,
    As,
    Other,
}

impl fmt::Display for SyntaxKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl Expr {
    pub fn syntax_kind(&self) -> SyntaxKind {
        match &self.kind {
            ExprKind::Object { .. } => SyntaxKind::Object,
            ExprKind::Array(_) => SyntaxKind::Array,
            ExprKind::Call { .. } => SyntaxKind::Call,
            ExprKind::Member { .. } => SyntaxKind::Member,
            ExprKind::Arrow(_) => SyntaxKind::Arrow,
            ExprKind::Identifier(_) => SyntaxKind::Identifier,
            ExprKind::Literal(_) => SyntaxKind::Literal,
            ExprKind::Paren(_) => SyntaxKind::Paren,
            ExprKind::Binary { .. } => SyntaxKind::Binary,
            ExprKind::As { .. } => SyntaxKind::As,
            ExprKind::Other(_) => SyntaxKind::Other,
        }
    }

    pub fn skip_parens(&self) -> &Expr {
        match &self.kind {
            ExprKind::Paren(inner) => inner.skip_parens(),
            _ => self,
        }
    }

    /// Strips parentheses and type assertions.
    pub fn skip_wrappers(&self) -> &Expr {
        match &self.kind {
            ExprKind::Paren(inner) => inner.skip_wrappers(),
            ExprKind::As { expr, .. } => expr.skip_wrappers(),
            _ => self,
        }
    }

    pub fn as_object(&self) -> Option<&[Property]> {
        match &self.skip_wrappers().kind {
            ExprKind::Object { properties, .. } => Some(properties),
            _ => None,
        }
    }

    /// Entry spans of an object literal, or element spans of an array literal.
    pub fn literal_entries(&self) -> Option<Vec<Span>> {
        match &self.skip_wrappers().kind {
            ExprKind::Object { entries, .. } => Some(entries.clone()),
            ExprKind::Array(items) => Some(items.iter().map(|i| i.span).collect()),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Expr]> {
        match &self.skip_wrappers().kind {
            ExprKind::Array(elements) => Some(elements),
            _ => None,
        }
    }

    /// Object and array literals can have further fields merged into them.
    pub fn is_mergeable(&self) -> bool {
        self.as_object().is_some() || self.as_array().is_some()
    }

    /// Direct children in source order, including arrow bodies.
    pub fn children(&self) -> Vec<&Expr> {
        match &self.kind {
            ExprKind::Object { properties, .. } => properties.iter().map(|p| &p.value).collect(),
            ExprKind::Array(items) | ExprKind::Other(items) => items.iter().collect(),
            ExprKind::Call { callee, args } => {
                let mut children = vec![callee.as_ref()];
                children.extend(args.iter());
                children
            }
            ExprKind::Member { object, .. } => vec![object.as_ref()],
            ExprKind::Arrow(arrow) => match &arrow.body {
                ArrowBody::Expr(expr) => vec![expr],
                ArrowBody::Block(body) => {
                    let mut children: Vec<&Expr> =
                        body.locals.iter().filter_map(|l| l.init.as_ref()).collect();
                    children.extend(body.return_expr());
                    children
                }
            },
            ExprKind::Paren(inner) | ExprKind::As { expr: inner, .. } => vec![inner.as_ref()],
            ExprKind::Binary { left, right, .. } => vec![left.as_ref(), right.as_ref()],
            ExprKind::Identifier(_) | ExprKind::Literal(_) => Vec::new(),
        }
    }

    /// Pre-order traversal.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Expr)) {
        visit(self);
        for child in self.children() {
            child.walk(visit);
        }
    }

    pub fn find_by_span(&self, span: Span, kind: Option<SyntaxKind>) -> Option<&Expr> {
        if self.span == span && kind.is_none_or(|k| k == self.syntax_kind()) {
            return Some(self);
        }
        if !self.span.contains(span) {
            return None;
        }
        self.children()
            .into_iter()
            .find_map(|child| child.find_by_span(span, kind))
    }

    /// Normalised access path of an identifier/member chain, e.g. `input.address?.city`.
    pub fn access_path(&self) -> Option<String> {
        match &self.kind {
            ExprKind::Identifier(name) => Some(name.clone()),
            ExprKind::Member {
                object,
                property,
                optional,
                computed,
            } => {
                let base = object.skip_parens().access_path()?;
                let separator = if *optional { "?." } else { "." };
                if *computed {
                    let separator = if *optional { "?." } else { "" };
                    Some(format!("{base}{separator}[\"{property}\"]"))
                } else {
                    Some(format!("{base}{separator}{property}"))
                }
            }
            _ => None,
        }
    }

    /// Matches `<receiver>.map(<arrow>)`.
    pub fn as_map_call(&self) -> Option<(&Expr, &ArrowFunction)> {
        let ExprKind::Call { callee, args } = &self.skip_wrappers().kind else {
            return None;
        };
        let ExprKind::Member {
            object, property, ..
        } = &callee.kind
        else {
            return None;
        };
        if property != "map" {
            return None;
        }
        match args.first().map(|a| &a.skip_parens().kind) {
            Some(ExprKind::Arrow(arrow)) => Some((object.as_ref(), arrow.as_ref())),
            _ => None,
        }
    }

    /// Matches `<receiver>.filter(<predicate>)`.
    pub fn as_filter_call(&self) -> Option<(&Expr, &Expr)> {
        let ExprKind::Call { callee, args } = &self.skip_wrappers().kind else {
            return None;
        };
        match (&callee.kind, args.first()) {
            (
                ExprKind::Member {
                    object, property, ..
                },
                Some(predicate),
            ) if property == "filter" => Some((object.as_ref(), predicate)),
            _ => None,
        }
    }
}
