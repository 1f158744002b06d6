use super::focus::{FocusedFunction, InputBinding, access_join};
use super::links::LinkInitializer;
use super::view::{CollapsePredicate, SearchFilter};
use super::{Diagnostic, DiagramModel, NodeId, NodeKind, Port, PortDirection, PortId};
use crate::source::SourceFile;
use crate::types::{DMType, DMTypeWithValue, TypeKind, TypeWithValueBuilder, ValueType, join_fqn};
use tracing::debug;

const FIELD_ITEM: &str = "<fieldItem>";

/// Builds a [`DiagramModel`] for one focused view.
///
/// ```ignore
/// let model = DiagramBuilder::new(&source, &focus)
///     .collapse(&view_state)
///     .input_search(&view_state.input_search)
///     .diagnostics(&diagnostics)
///     .build();
/// ```
pub struct DiagramBuilder<'a> {
    source: &'a SourceFile,
    focus: &'a FocusedFunction,
    collapse: Option<&'a dyn CollapsePredicate>,
    input_search: SearchFilter,
    output_search: SearchFilter,
    diagnostics: &'a [Diagnostic],
}

struct PortContext {
    node: NodeId,
    parent: Option<PortId>,
    hidden: bool,
    preview: bool,
    search_matched: bool,
}

impl<'a> DiagramBuilder<'a> {
    pub fn new(source: &'a SourceFile, focus: &'a FocusedFunction) -> Self {
        Self {
            source,
            focus,
            collapse: None,
            input_search: SearchFilter::None,
            output_search: SearchFilter::None,
            diagnostics: &[],
        }
    }

    pub fn collapse(mut self, predicate: &'a dyn CollapsePredicate) -> Self {
        self.collapse = Some(predicate);
        self
    }

    pub fn input_search(mut self, filter: &SearchFilter) -> Self {
        self.input_search = filter.clone();
        self
    }

    pub fn output_search(mut self, filter: &SearchFilter) -> Self {
        self.output_search = filter.clone();
        self
    }

    pub fn diagnostics(mut self, diagnostics: &'a [Diagnostic]) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    pub fn build(self) -> DiagramModel {
        let mut model = DiagramModel::new();

        for input in &self.focus.inputs {
            self.add_input_node(&mut model, input);
        }
        if !self.focus.sub_mappings.is_empty() {
            let node = model.add_node(NodeKind::SubMapping, None);
            for binding in &self.focus.sub_mappings {
                self.add_source_ports(
                    &mut model,
                    &binding.ty,
                    binding.name.clone(),
                    PortContext::root(node),
                );
            }
        }
        if !self.focus.filters.is_empty() {
            model.add_node(
                NodeKind::ArrayFilter {
                    filters: self.focus.filters.clone(),
                },
                None,
            );
        }
        self.add_output_node(&mut model);

        LinkInitializer::new(self.source, self.diagnostics).init_links(&mut model);
        model.number_of_fields();

        debug!(
            function = %self.focus.function_name,
            nodes = model.nodes().len(),
            ports = model.ports().len(),
            links = model.links().count(),
            "built diagram"
        );
        model
    }

    fn add_input_node(&self, model: &mut DiagramModel, input: &InputBinding) {
        if input.ty.effective().kind == TypeKind::Unsupported {
            model.add_node(
                NodeKind::UnsupportedIO {
                    reason: format!(
                        "input `{}` has unsupported type `{}`",
                        input.name,
                        input.ty.type_text()
                    ),
                },
                Some(input.ty.clone()),
            );
            return;
        }
        let node = model.add_node(
            NodeKind::Input {
                param: input.name.clone(),
            },
            Some(input.ty.clone()),
        );
        self.add_source_ports(model, &input.ty, input.name.clone(), PortContext::root(node));
    }

    fn add_source_ports(&self, model: &mut DiagramModel, ty: &DMType, fqn: String, ctx: PortContext) {
        let is_root = ctx.parent.is_none();
        let matched = ctx.search_matched || self.input_search.matches(ty.field_name());
        let visible_by_search =
            is_root || ctx.search_matched || subtree_matches(ty, &self.input_search);

        let mut port = Port::new(ctx.node, fqn, ty.clone(), PortDirection::Out, ctx.parent);
        port.hidden = ctx.hidden || !visible_by_search;
        port.is_preview = ctx.preview;
        port.collapsed = self.is_collapsed(&port.name, ty.kind);
        let child_hidden = port.hidden || port.collapsed;
        let fqn = port.field_fqn.clone();
        let id = model.add_port(port);

        let shape = ty.effective();
        match shape.kind {
            TypeKind::Interface => {
                for field in &shape.fields {
                    self.add_source_ports(
                        model,
                        field,
                        access_join(&fqn, field.field_name(), ty.optional),
                        PortContext {
                            node: ctx.node,
                            parent: Some(id),
                            hidden: child_hidden,
                            preview: ctx.preview,
                            search_matched: matched && !is_root,
                        },
                    );
                }
            }
            TypeKind::Array => {
                if let Some(member) = shape.member_type.as_deref() {
                    self.add_source_ports(
                        model,
                        &member.clone().with_field(FIELD_ITEM, false),
                        format!("{fqn}.{FIELD_ITEM}"),
                        PortContext {
                            node: ctx.node,
                            parent: Some(id),
                            hidden: child_hidden,
                            preview: true,
                            search_matched: matched && !is_root,
                        },
                    );
                }
            }
            _ => {}
        }
    }

    fn add_output_node(&self, model: &mut DiagramModel) {
        let output = &self.focus.output_type;
        let kind = match output.effective().kind {
            TypeKind::Interface => NodeKind::ObjectOutput,
            TypeKind::Array => NodeKind::ArrayOutput,
            TypeKind::Union => NodeKind::UnionOutput,
            TypeKind::Unsupported => NodeKind::UnsupportedIO {
                reason: format!("output type `{}` is not supported", output.type_text()),
            },
            _ => NodeKind::PrimitiveOutput,
        };
        let unsupported = matches!(kind, NodeKind::UnsupportedIO { .. });
        let node = model.add_node(kind, Some(output.clone()));

        let value = self
            .focus
            .output_value
            .as_ref()
            .and_then(|h| self.source.expr_at(h));
        let tree = TypeWithValueBuilder::new(self.source).build(output, value);
        if !unsupported {
            self.add_target_ports(model, &tree, PortContext::root(node), false, None);
        }
        model.set_output_tree(tree);
    }

    fn add_target_ports(
        &self,
        model: &mut DiagramModel,
        tree: &DMTypeWithValue,
        ctx: PortContext,
        ancestor_has_value: bool,
        field_index: Option<usize>,
    ) {
        let is_root = ctx.parent.is_none();
        let matched = ctx.search_matched || self.output_search.matches(tree.ty.field_name());
        let visible_by_search =
            is_root || ctx.search_matched || subtree_matches(&tree.ty, &self.output_search);

        let mut port = Port::new(
            ctx.node,
            tree.fqn.clone(),
            tree.ty.clone(),
            PortDirection::In,
            ctx.parent,
        );
        port.hidden = ctx.hidden || !visible_by_search;
        port.is_preview = ctx.preview;
        port.collapsed = self.is_collapsed(&port.name, tree.ty.kind);
        port.value = tree.value;
        port.value_type = tree.value_type;
        port.entry = tree.entry;
        port.ancestor_has_value = ancestor_has_value;
        port.descendant_has_value = tree.descendant_has_value();
        port.field_index = field_index;
        let child_hidden = port.hidden || port.collapsed;
        let id = model.add_port(port);

        let child_ancestor_value = ancestor_has_value || tree.value_type == ValueType::NonEmpty;
        let child_ctx = |preview: bool| PortContext {
            node: ctx.node,
            parent: Some(id),
            hidden: child_hidden,
            preview,
            search_matched: matched && !is_root,
        };

        let shape = tree.ty.effective();
        match shape.kind {
            TypeKind::Interface => {
                for child in &tree.children {
                    self.add_target_ports(
                        model,
                        child,
                        child_ctx(ctx.preview),
                        child_ancestor_value,
                        None,
                    );
                }
            }
            TypeKind::Array if !tree.elements.is_empty() => {
                for (index, element) in tree.elements.iter().enumerate() {
                    self.add_target_ports(
                        model,
                        element,
                        child_ctx(ctx.preview),
                        child_ancestor_value,
                        Some(index),
                    );
                }
            }
            TypeKind::Array => {
                if let Some(member) = shape.member_type.as_deref() {
                    let preview = TypeWithValueBuilder::new(self.source)
                        .build(&member.clone().with_field(FIELD_ITEM, false), None);
                    let preview = rebase(preview, &join_fqn(&tree.fqn, FIELD_ITEM));
                    self.add_target_ports(model, &preview, child_ctx(true), child_ancestor_value, None);
                }
            }
            _ => {}
        }
    }

    fn is_collapsed(&self, port_name: &str, kind: TypeKind) -> bool {
        self.collapse
            .is_some_and(|predicate| predicate.is_collapsed(port_name, kind))
    }
}

impl PortContext {
    fn root(node: NodeId) -> Self {
        Self {
            node,
            parent: None,
            hidden: false,
            preview: false,
            search_matched: false,
        }
    }
}

fn subtree_matches(ty: &DMType, filter: &SearchFilter) -> bool {
    match filter {
        SearchFilter::None => true,
        SearchFilter::Malformed => false,
        SearchFilter::Term(_) => {
            let shape = ty.effective();
            filter.matches(ty.field_name())
                || shape.fields.iter().any(|f| subtree_matches(f, filter))
                || shape
                    .member_type
                    .as_deref()
                    .is_some_and(|m| m.effective().fields.iter().any(|f| subtree_matches(f, filter)))
        }
    }
}

/// Prefixes every fqn in a detached tree with `prefix`.
fn rebase(mut tree: DMTypeWithValue, prefix: &str) -> DMTypeWithValue {
    tree.fqn = if tree.fqn.is_empty() {
        prefix.to_string()
    } else {
        join_fqn(prefix, &tree.fqn)
    };
    tree.children = tree
        .children
        .into_iter()
        .map(|c| rebase(c, prefix))
        .collect();
    tree
}
