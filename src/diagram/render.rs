use super::{DiagramModel, LinkState, NodeId, NodeKind, Port, PortDirection, PortId};
use serde::Serialize;
use std::fmt;

/// A wrapper to print a diagram as a tree of nodes, ports and links.
pub struct DiagramTree<'a> {
    pub model: &'a DiagramModel,
}

impl<'a> fmt::Display for DiagramTree<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for node in self.model.nodes() {
            let root_type = node
                .root_type
                .as_ref()
                .map(|t| format!(" : {}", t.type_text()))
                .unwrap_or_default();
            writeln!(f, "{}{}", node.kind, root_type)?;

            let roots: Vec<&Port> = self
                .model
                .node_ports(node.id)
                .filter(|p| p.parent.is_none() && !p.hidden)
                .collect();
            for (i, port) in roots.iter().enumerate() {
                self.fmt_as_tree(port, f, "", i + 1 == roots.len())?;
            }
        }

        let links: Vec<_> = self.model.links().collect();
        if !links.is_empty() {
            writeln!(f, "Links")?;
        }
        for (i, link) in links.iter().enumerate() {
            let marker = if i + 1 == links.len() { "└── " } else { "├── " };
            let target = link
                .target
                .and_then(|t| self.model.port(t))
                .map_or("<none>", |p| p.name.as_str());
            let source = self.model.port(link.source).map_or("<none>", |p| p.name.as_str());
            write!(f, "{marker}{source} -> {target}")?;
            if let Some(label) = &link.label {
                write!(f, " [{}]", label.text)?;
            }
            match link.state {
                LinkState::Actual => {}
                LinkState::Provisional => write!(f, " (provisional)")?,
                LinkState::Pending(mapping_type) => write!(f, " (pending {mapping_type})")?,
            }
            if link.has_diagnostics() {
                write!(f, " !{}", link.diagnostics.len())?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

impl<'a> DiagramTree<'a> {
    fn fmt_as_tree(
        &self,
        port: &Port,
        f: &mut fmt::Formatter<'_>,
        prefix: &str,
        is_last: bool,
    ) -> fmt::Result {
        let node_marker = if is_last { "└── " } else { "├── " };
        write!(f, "{}{}{}: {}", prefix, node_marker, port.label(), port.field.type_text())?;
        let mut flags = Vec::new();
        if port.collapsed {
            flags.push("collapsed");
        }
        if port.is_preview {
            flags.push("preview");
        }
        if port.direction == PortDirection::In && port.is_disabled() && !port.is_preview {
            flags.push("disabled");
        }
        if !flags.is_empty() {
            write!(f, " ({})", flags.join(", "))?;
        }
        writeln!(f)?;

        let child_prefix = format!("{}{}", prefix, if is_last { "    " } else { "│   " });
        let children: Vec<&Port> = self.model.children(port.id).filter(|c| !c.hidden).collect();
        for (i, child) in children.iter().enumerate() {
            self.fmt_as_tree(child, f, &child_prefix, i + 1 == children.len())?;
        }
        Ok(())
    }
}

/// Serializable view of a diagram for external renderers.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagramSnapshot {
    pub nodes: Vec<NodeSnapshot>,
    pub links: Vec<LinkSnapshot>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeSnapshot {
    pub id: NodeId,
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    pub number_of_fields: usize,
    pub ports: Vec<PortSnapshot>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortSnapshot {
    pub id: PortId,
    pub name: String,
    pub field_fqn: String,
    pub type_name: String,
    pub direction: PortDirection,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<PortId>,
    pub hidden: bool,
    pub collapsed: bool,
    pub disabled: bool,
    pub is_preview: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkSnapshot {
    pub source: PortId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<PortId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub is_map_fn: bool,
    pub diagnostics: Vec<super::Diagnostic>,
}

impl From<&DiagramModel> for DiagramSnapshot {
    fn from(model: &DiagramModel) -> Self {
        let nodes = model
            .nodes()
            .iter()
            .map(|node| NodeSnapshot {
                id: node.id,
                kind: match &node.kind {
                    NodeKind::Input { .. } => "input".to_string(),
                    NodeKind::LinkConnector { .. } => "linkConnector".to_string(),
                    NodeKind::UnsupportedIO { .. } => "unsupported".to_string(),
                    other => other.to_string(),
                },
                type_name: node.root_type.as_ref().map(|t| t.type_text()),
                number_of_fields: node.number_of_fields,
                ports: model
                    .node_ports(node.id)
                    .map(|p| PortSnapshot {
                        id: p.id,
                        name: p.name.clone(),
                        field_fqn: p.field_fqn.clone(),
                        type_name: p.field.type_text(),
                        direction: p.direction,
                        parent: p.parent,
                        hidden: p.hidden,
                        collapsed: p.collapsed,
                        disabled: p.is_disabled(),
                        is_preview: p.is_preview,
                    })
                    .collect(),
            })
            .collect();

        let links = model
            .links()
            .filter(|l| l.state == LinkState::Actual)
            .map(|l| LinkSnapshot {
                source: l.source,
                target: l.target,
                label: l.label.as_ref().map(|label| label.text.clone()),
                is_map_fn: l.label.as_ref().is_some_and(|label| label.is_map_fn),
                diagnostics: l.diagnostics.clone(),
            })
            .collect();

        Self { nodes, links }
    }
}
