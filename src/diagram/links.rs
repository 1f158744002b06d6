use super::{
    Diagnostic, DiagramModel, ExpressionLabel, LinkState, NodeKind, Port, PortDirection, PortId,
};
use crate::source::{Expr, NodeHandle, SourceFile};
use crate::types::{DMType, TypeKind};
use tracing::trace;

/// Derives links from the values already written into the output ports.
pub(super) struct LinkInitializer<'a> {
    source: &'a SourceFile,
    diagnostics: &'a [Diagnostic],
}

impl<'a> LinkInitializer<'a> {
    pub fn new(source: &'a SourceFile, diagnostics: &'a [Diagnostic]) -> Self {
        Self {
            source,
            diagnostics,
        }
    }

    pub fn init_links(&self, model: &mut DiagramModel) {
        let targets: Vec<(PortId, NodeHandle)> = model
            .ports()
            .iter()
            .filter(|p| p.direction == PortDirection::In)
            .filter_map(|p| p.value.map(|v| (p.id, v)))
            .collect();

        for (target, handle) in targets {
            let Some(expr) = self.source.expr_at(&handle) else {
                continue;
            };
            // Literals only scaffold nested fields; their children carry the links.
            if expr.is_mergeable() {
                continue;
            }
            let references = input_references(expr, model);
            if references.is_empty() {
                continue;
            }

            let label = ExpressionLabel {
                value: Some(handle),
                text: self.source.slice(expr.span).to_string(),
                is_map_fn: expr.as_map_call().is_some(),
            };
            let diagnostics: Vec<Diagnostic> = self
                .diagnostics
                .iter()
                .filter(|d| d.span.overlaps(expr.span))
                .cloned()
                .collect();

            let direct = references.len() == 1
                && expr
                    .skip_parens()
                    .access_path()
                    .and_then(|path| model.get_input_port(&path))
                    == Some(references[0]);

            if direct {
                let link = model.add_link(references[0], Some(target), LinkState::Actual);
                if let Some(link) = model.link_mut(link) {
                    link.label = Some(label);
                    link.diagnostics = diagnostics;
                }
                continue;
            }

            let connector = model.add_node(
                NodeKind::LinkConnector {
                    value: handle,
                    text: label.text.clone(),
                    is_map_fn: label.is_map_fn,
                },
                None,
            );
            let key = format!("<connector:{}>", connector.0);
            let target_type = model
                .port(target)
                .map(|p| p.field.clone())
                .unwrap_or_else(|| DMType::primitive(TypeKind::Any));
            let connector_in = model.add_port(Port::new(
                connector,
                key.clone(),
                DMType::primitive(TypeKind::Any),
                PortDirection::In,
                None,
            ));
            let connector_out =
                model.add_port(Port::new(connector, key, target_type, PortDirection::Out, None));
            for reference in &references {
                model.add_link(*reference, Some(connector_in), LinkState::Actual);
            }
            let link = model.add_link(connector_out, Some(target), LinkState::Actual);
            if let Some(link) = model.link_mut(link) {
                link.label = Some(label);
                link.diagnostics = diagnostics;
            }
            trace!(connector = connector.0, inputs = references.len(), "added link connector");
        }
    }
}

/// Distinct input ports referenced by `expr`, in order of appearance.
fn input_references(expr: &Expr, model: &DiagramModel) -> Vec<PortId> {
    let mut found = Vec::new();
    collect_references(expr, model, &mut found);
    found
}

fn collect_references(expr: &Expr, model: &DiagramModel, found: &mut Vec<PortId>) {
    if let Some(path) = expr.access_path() {
        if let Some(port) = resolve_reference(model, &path) {
            if !found.contains(&port) {
                found.push(port);
            }
            return;
        }
    }
    for child in expr.children() {
        collect_references(child, model, found);
    }
}

/// Longest prefix of `path` that names an input field, so `input.name.length` finds `input.name`.
fn resolve_reference(model: &DiagramModel, path: &str) -> Option<PortId> {
    let mut candidate = path;
    loop {
        if let Some(port) = model.get_input_port(candidate) {
            return Some(port);
        }
        let cut = candidate.rfind(['.', '['])?;
        candidate = candidate[..cut].trim_end_matches('?');
    }
}
