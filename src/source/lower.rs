use super::Span;
use super::syntax::*;
use tree_sitter::Node;

/// Lowers a tree-sitter TypeScript tree into the owned [`Module`] model.
pub(super) struct Lowerer<'t> {
    text: &'t str,
}

fn named_children(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter(|c| c.kind() != "comment")
        .collect()
}

fn has_token(node: Node<'_>, token: &str) -> bool {
    let mut cursor = node.walk();
    let found = node.children(&mut cursor).any(|c| c.kind() == token);
    found
}

fn span(node: Node<'_>) -> Span {
    Span::new(node.start_byte(), node.end_byte())
}

fn unquote(text: &str) -> String {
    let trimmed = text.trim();
    for quote in ['"', '\'', '`'] {
        if let Some(inner) = trimmed
            .strip_prefix(quote)
            .and_then(|t| t.strip_suffix(quote))
        {
            return inner.to_string();
        }
    }
    trimmed.to_string()
}

impl<'t> Lowerer<'t> {
    pub(super) fn new(text: &'t str) -> Self {
        Self { text }
    }

    fn text_of(&self, node: Node<'_>) -> &'t str {
        self.text
            .get(node.start_byte()..node.end_byte())
            .unwrap_or("")
    }

    pub(super) fn module(&self, root: Node<'_>) -> Module {
        let mut module = Module {
            len: self.text.len(),
            ..Module::default()
        };
        for child in named_children(root) {
            self.declaration(child, false, &mut module);
        }
        module
    }

    fn declaration(&self, node: Node<'_>, exported: bool, module: &mut Module) {
        match node.kind() {
            "export_statement" => {
                if let Some(decl) = node.child_by_field_name("declaration") {
                    self.declaration(decl, true, module);
                }
            }
            "import_statement" => module.imports.push(self.import(node)),
            "interface_declaration" => module.interfaces.extend(self.interface(node)),
            "type_alias_declaration" => module.type_aliases.extend(self.type_alias(node)),
            "function_declaration" => module.functions.extend(self.function(node, exported)),
            _ => {}
        }
    }

    fn import(&self, node: Node<'_>) -> ImportDecl {
        let mut names = Vec::new();
        for child in named_children(node) {
            if child.kind() == "import_clause" {
                self.import_clause(child, &mut names);
            }
        }
        ImportDecl {
            span: span(node),
            names,
            module: node
                .child_by_field_name("source")
                .map(|s| unquote(self.text_of(s)))
                .unwrap_or_default(),
        }
    }

    fn import_clause(&self, node: Node<'_>, names: &mut Vec<String>) {
        for child in named_children(node) {
            match child.kind() {
                "identifier" => names.push(self.text_of(child).to_string()),
                "named_imports" => {
                    for specifier in named_children(child) {
                        if specifier.kind() != "import_specifier" {
                            continue;
                        }
                        let local = specifier
                            .child_by_field_name("alias")
                            .or_else(|| specifier.child_by_field_name("name"));
                        if let Some(local) = local {
                            names.push(self.text_of(local).to_string());
                        }
                    }
                }
                "namespace_import" => names.extend(
                    named_children(child)
                        .into_iter()
                        .filter(|n| n.kind() == "identifier")
                        .map(|n| self.text_of(n).to_string()),
                ),
                _ => {}
            }
        }
    }

    fn interface(&self, node: Node<'_>) -> Option<InterfaceDecl> {
        let name = self.text_of(node.child_by_field_name("name")?).to_string();
        let body = node.child_by_field_name("body")?;
        Some(InterfaceDecl {
            span: span(node),
            name,
            members: self.members(body),
        })
    }

    fn type_alias(&self, node: Node<'_>) -> Option<TypeAliasDecl> {
        Some(TypeAliasDecl {
            span: span(node),
            name: self.text_of(node.child_by_field_name("name")?).to_string(),
            type_node: self.type_node(node.child_by_field_name("value")?),
        })
    }

    fn members(&self, body: Node<'_>) -> Vec<PropertySignature> {
        named_children(body)
            .into_iter()
            .filter(|m| m.kind() == "property_signature")
            .filter_map(|m| self.property_signature(m))
            .collect()
    }

    fn property_signature(&self, node: Node<'_>) -> Option<PropertySignature> {
        let name = unquote(self.text_of(node.child_by_field_name("name")?));
        let type_node = node
            .child_by_field_name("type")
            .map(|t| self.type_node(t))
            .unwrap_or_else(|| TypeNode::Keyword("any".to_string()));
        Some(PropertySignature {
            name,
            optional: has_token(node, "?"),
            type_node,
        })
    }

    fn type_node(&self, node: Node<'_>) -> TypeNode {
        let text = self.text_of(node);
        match node.kind() {
            "type_annotation" | "parenthesized_type" | "readonly_type" => {
                match named_children(node).into_iter().next() {
                    Some(inner) => self.type_node(inner),
                    None => TypeNode::Unknown(text.to_string()),
                }
            }
            "predefined_type" => TypeNode::Keyword(text.to_string()),
            "type_identifier" | "nested_type_identifier" => TypeNode::Reference(text.to_string()),
            "array_type" => match named_children(node).into_iter().next() {
                Some(element) => TypeNode::Array(Box::new(self.type_node(element))),
                None => TypeNode::Unknown(text.to_string()),
            },
            "generic_type" => {
                let name = node
                    .child_by_field_name("name")
                    .map(|n| self.text_of(n))
                    .unwrap_or(text);
                let arguments = node
                    .child_by_field_name("type_arguments")
                    .map(named_children)
                    .unwrap_or_default();
                match (name, arguments.as_slice()) {
                    ("Array" | "ReadonlyArray", [element]) => {
                        TypeNode::Array(Box::new(self.type_node(*element)))
                    }
                    _ => TypeNode::Reference(name.to_string()),
                }
            }
            "union_type" => {
                let mut members = Vec::new();
                for child in named_children(node) {
                    match self.type_node(child) {
                        TypeNode::Union(nested) => members.extend(nested),
                        other => members.push(other),
                    }
                }
                TypeNode::Union(members)
            }
            "object_type" => TypeNode::Object(self.members(node)),
            "literal_type" => match text.trim() {
                "null" | "undefined" => TypeNode::Keyword(text.trim().to_string()),
                literal => TypeNode::Literal(literal.to_string()),
            },
            "null" | "undefined" => TypeNode::Keyword(text.to_string()),
            _ => TypeNode::Unknown(text.to_string()),
        }
    }

    fn function(&self, node: Node<'_>, exported: bool) -> Option<FunctionDecl> {
        Some(FunctionDecl {
            span: span(node),
            name: self.text_of(node.child_by_field_name("name")?).to_string(),
            exported,
            params: node
                .child_by_field_name("parameters")
                .map(|p| self.params(p))
                .unwrap_or_default(),
            return_type: node
                .child_by_field_name("return_type")
                .map(|t| self.type_node(t)),
            body: node.child_by_field_name("body").map(|b| self.body(b)),
        })
    }

    fn params(&self, node: Node<'_>) -> Vec<Param> {
        named_children(node)
            .into_iter()
            .filter_map(|p| self.param(p))
            .collect()
    }

    fn param(&self, node: Node<'_>) -> Option<Param> {
        match node.kind() {
            "identifier" => Some(Param {
                span: span(node),
                name: self.text_of(node).to_string(),
                type_node: None,
                optional: false,
            }),
            "required_parameter" | "optional_parameter" => Some(Param {
                span: span(node),
                name: self
                    .text_of(node.child_by_field_name("pattern")?)
                    .to_string(),
                type_node: node.child_by_field_name("type").map(|t| self.type_node(t)),
                optional: node.kind() == "optional_parameter",
            }),
            _ => None,
        }
    }

    fn body(&self, node: Node<'_>) -> FunctionBody {
        let mut body = FunctionBody {
            span: span(node),
            locals: Vec::new(),
            return_stmt: None,
        };
        for statement in named_children(node) {
            match statement.kind() {
                "lexical_declaration" | "variable_declaration" => {
                    for declarator in named_children(statement) {
                        if declarator.kind() != "variable_declarator" {
                            continue;
                        }
                        let Some(name) = declarator.child_by_field_name("name") else {
                            continue;
                        };
                        body.locals.push(LocalDecl {
                            span: span(statement),
                            name: self.text_of(name).to_string(),
                            type_node: declarator
                                .child_by_field_name("type")
                                .map(|t| self.type_node(t)),
                            init: declarator
                                .child_by_field_name("value")
                                .map(|v| self.expr(v)),
                        });
                    }
                }
                "return_statement" if body.return_stmt.is_none() => {
                    body.return_stmt = Some(ReturnStmt {
                        span: span(statement),
                        expr: named_children(statement)
                            .into_iter()
                            .next()
                            .map(|e| self.expr(e)),
                    });
                }
                _ => {}
            }
        }
        body
    }

    fn expr(&self, node: Node<'_>) -> Expr {
        let kind = match node.kind() {
            "object" => {
                let (properties, entries) = self.properties(node);
                ExprKind::Object {
                    properties,
                    entries,
                }
            }
            "array" => ExprKind::Array(self.exprs(named_children(node))),
            "call_expression" => match node.child_by_field_name("function") {
                Some(function) => ExprKind::Call {
                    callee: Box::new(self.expr(function)),
                    args: node
                        .child_by_field_name("arguments")
                        .map(|a| self.exprs(named_children(a)))
                        .unwrap_or_default(),
                },
                None => ExprKind::Other(self.exprs(named_children(node))),
            },
            "member_expression" => {
                match (
                    node.child_by_field_name("object"),
                    node.child_by_field_name("property"),
                ) {
                    (Some(object), Some(property)) => {
                        let between = self
                            .text
                            .get(object.end_byte()..property.start_byte())
                            .unwrap_or("");
                        ExprKind::Member {
                            object: Box::new(self.expr(object)),
                            property: self.text_of(property).to_string(),
                            optional: between.contains('?'),
                            computed: false,
                        }
                    }
                    _ => ExprKind::Other(self.exprs(named_children(node))),
                }
            }
            "subscript_expression" => match (
                node.child_by_field_name("object"),
                node.child_by_field_name("index"),
            ) {
                (Some(object), Some(index)) if index.kind() == "string" => {
                    let between = self
                        .text
                        .get(object.end_byte()..index.start_byte())
                        .unwrap_or("");
                    ExprKind::Member {
                        object: Box::new(self.expr(object)),
                        property: unquote(self.text_of(index)),
                        optional: between.contains('?'),
                        computed: true,
                    }
                }
                _ => ExprKind::Other(self.exprs(named_children(node))),
            },
            "arrow_function" => ExprKind::Arrow(Box::new(self.arrow(node))),
            "identifier" | "this" => ExprKind::Identifier(self.text_of(node).to_string()),
            "string" => ExprKind::Literal(LiteralKind::String),
            "template_string" => ExprKind::Literal(LiteralKind::Template),
            "number" => ExprKind::Literal(LiteralKind::Number),
            "true" | "false" => ExprKind::Literal(LiteralKind::Boolean),
            "null" => ExprKind::Literal(LiteralKind::Null),
            "undefined" => ExprKind::Literal(LiteralKind::Undefined),
            "parenthesized_expression" => match named_children(node).into_iter().next() {
                Some(inner) => ExprKind::Paren(Box::new(self.expr(inner))),
                None => ExprKind::Other(Vec::new()),
            },
            "binary_expression" => match (
                node.child_by_field_name("left"),
                node.child_by_field_name("right"),
            ) {
                (Some(left), Some(right)) => ExprKind::Binary {
                    left: Box::new(self.expr(left)),
                    operator: node
                        .child_by_field_name("operator")
                        .map(|o| self.text_of(o).to_string())
                        .unwrap_or_default(),
                    right: Box::new(self.expr(right)),
                },
                _ => ExprKind::Other(self.exprs(named_children(node))),
            },
            "as_expression" | "satisfies_expression" | "type_assertion" => {
                let children = named_children(node);
                let value = children.iter().find(|c| is_expression_kind(c.kind()));
                let type_node = children.iter().find(|c| !is_expression_kind(c.kind()));
                match (value, type_node) {
                    (Some(value), Some(type_node)) => ExprKind::As {
                        expr: Box::new(self.expr(*value)),
                        type_node: self.type_node(
                            // `<T>expr` wraps the type in type_arguments
                            named_children(*type_node)
                                .into_iter()
                                .next()
                                .filter(|_| type_node.kind() == "type_arguments")
                                .unwrap_or(*type_node),
                        ),
                    },
                    _ => ExprKind::Other(self.exprs(children)),
                }
            }
            _ => ExprKind::Other(self.exprs(named_children(node))),
        };
        Expr {
            span: span(node),
            kind,
        }
    }

    fn exprs(&self, nodes: Vec<Node<'_>>) -> Vec<Expr> {
        nodes.into_iter().map(|n| self.expr(n)).collect()
    }

    fn properties(&self, node: Node<'_>) -> (Vec<Property>, Vec<Span>) {
        let mut properties = Vec::new();
        let mut entries = Vec::new();
        for child in named_children(node) {
            if child.kind() != "comment" {
                entries.push(span(child));
            }
            match child.kind() {
                "pair" => {
                    let (Some(key), Some(value)) = (
                        child.child_by_field_name("key"),
                        child.child_by_field_name("value"),
                    ) else {
                        continue;
                    };
                    properties.push(Property {
                        span: span(child),
                        key: unquote(self.text_of(key)),
                        key_span: span(key),
                        value: self.expr(value),
                        shorthand: false,
                    });
                }
                "shorthand_property_identifier" => {
                    let name = self.text_of(child).to_string();
                    properties.push(Property {
                        span: span(child),
                        key: name.clone(),
                        key_span: span(child),
                        value: Expr {
                            span: span(child),
                            kind: ExprKind::Identifier(name),
                        },
                        shorthand: true,
                    });
                }
                // spreads and methods do not map a single field
                _ => {}
            }
        }
        (properties, entries)
    }

    fn arrow(&self, node: Node<'_>) -> ArrowFunction {
        let params = if let Some(param) = node.child_by_field_name("parameter") {
            vec![Param {
                span: span(param),
                name: self.text_of(param).to_string(),
                type_node: None,
                optional: false,
            }]
        } else {
            node.child_by_field_name("parameters")
                .map(|p| self.params(p))
                .unwrap_or_default()
        };
        let body = match node.child_by_field_name("body") {
            Some(body) if body.kind() == "statement_block" => ArrowBody::Block(self.body(body)),
            Some(body) => ArrowBody::Expr(self.expr(body)),
            None => ArrowBody::Expr(Expr {
                span: Span::new(node.end_byte(), node.end_byte()),
                kind: ExprKind::Other(Vec::new()),
            }),
        };
        ArrowFunction { params, body }
    }
}

fn is_expression_kind(kind: &str) -> bool {
    !(kind.ends_with("_type")
        || kind == "type_identifier"
        || kind == "nested_type_identifier"
        || kind == "type_arguments")
}
