//! Diagram model: the nodes, ports and links rendered for the focused view.
//!
//! The model is an arena rebuilt from scratch on every source change. Ports,
//! nodes and links refer to each other by id, never by reference, so a whole
//! model can be dropped and replaced atomically after a reparse.
//!
//! Fully qualified names (FQNs) address fields:
//! - input fields use the access path written in source, e.g. `input.address?.city`
//! - output fields use a dotted path from the output root, e.g. `address.city`,
//!   with `""` for the root itself and the element index for literal array elements
use crate::types::DMTypeWithValue;
use ahash::AHashMap;
use std::collections::BTreeMap;

pub mod builder;
pub mod events;
pub mod focus;
pub mod link;
mod links;
pub mod node;
pub mod port;
pub mod render;
pub mod view;

pub use builder::DiagramBuilder;
pub use events::{DiagramEvent, DiagramObserver, EventBus};
pub use focus::{FocusedFunction, InputBinding, OutputSlot, SubMappingBinding, lookup_input_type};
pub use link::{Diagnostic, ExpressionLabel, Link, LinkId, LinkState};
pub use node::{DiagramNode, FilterExpr, NodeId, NodeKind};
pub use port::{Port, PortDirection, PortId};
pub use render::{DiagramSnapshot, DiagramTree};
pub use view::{CollapsePredicate, SearchFilter, SubMappingInfo, View, ViewStack, ViewState};

#[derive(Debug, Default)]
pub struct DiagramModel {
    nodes: Vec<DiagramNode>,
    ports: Vec<Port>,
    links: BTreeMap<LinkId, Link>,
    next_link: usize,
    port_index: AHashMap<(PortDirection, String), PortId>,
    events: Vec<DiagramEvent>,
    output_tree: Option<DMTypeWithValue>,
}

impl DiagramModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, kind: NodeKind, root_type: Option<crate::types::DMType>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(DiagramNode {
            id,
            kind,
            root_type,
            ports: Vec::new(),
            temporary_link: None,
            number_of_fields: 0,
        });
        id
    }

    pub fn add_port(&mut self, mut port: Port) -> PortId {
        let id = PortId(self.ports.len());
        port.id = id;
        self.port_index
            .insert(index_key(port.direction, &port.field_fqn), id);
        if let Some(node) = self.nodes.get_mut(port.node.0) {
            node.ports.push(id);
        }
        self.ports.push(port);
        id
    }

    pub fn node(&self, id: NodeId) -> Option<&DiagramNode> {
        self.nodes.get(id.0)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut DiagramNode> {
        self.nodes.get_mut(id.0)
    }

    pub fn nodes(&self) -> &[DiagramNode] {
        &self.nodes
    }

    pub fn port(&self, id: PortId) -> Option<&Port> {
        self.ports.get(id.0)
    }

    pub fn port_mut(&mut self, id: PortId) -> Option<&mut Port> {
        self.ports.get_mut(id.0)
    }

    pub fn ports(&self) -> &[Port] {
        &self.ports
    }

    pub fn node_ports(&self, id: NodeId) -> impl Iterator<Item = &Port> {
        self.node(id)
            .into_iter()
            .flat_map(|n| n.ports.iter())
            .filter_map(|p| self.port(*p))
    }

    pub fn children(&self, id: PortId) -> impl Iterator<Item = &Port> {
        self.ports.iter().filter(move |p| p.parent == Some(id))
    }

    /// Chain from the node's root port down to `id`, inclusive.
    pub fn port_path(&self, id: PortId) -> Vec<&Port> {
        let mut path: Vec<&Port> =
            std::iter::successors(self.port(id), |p| p.parent.and_then(|parent| self.port(parent)))
                .collect();
        path.reverse();
        path
    }

    pub fn link(&self, id: LinkId) -> Option<&Link> {
        self.links.get(&id)
    }

    pub fn link_mut(&mut self, id: LinkId) -> Option<&mut Link> {
        self.links.get_mut(&id)
    }

    pub fn links(&self) -> impl Iterator<Item = &Link> {
        self.links.values()
    }

    pub fn links_to(&self, target: PortId) -> impl Iterator<Item = &Link> {
        self.links.values().filter(move |l| l.target == Some(target))
    }

    pub fn add_link(&mut self, source: PortId, target: Option<PortId>, state: LinkState) -> LinkId {
        let id = LinkId(self.next_link);
        self.next_link += 1;
        self.links.insert(
            id,
            Link {
                id,
                source,
                target: None,
                label: None,
                diagnostics: Vec::new(),
                state,
                selected: false,
            },
        );
        if let Some(target) = target {
            self.connect(id, target);
        }
        id
    }

    /// Attaches a link's loose end and records the pair as linked.
    pub fn connect(&mut self, link: LinkId, target: PortId) {
        let Some(entry) = self.links.get_mut(&link) else {
            return;
        };
        entry.target = Some(target);
        let source = entry.source;
        if let Some(port) = self.ports.get_mut(source.0) {
            port.linked_ports.insert(target);
        }
        if let Some(port) = self.ports.get_mut(target.0) {
            port.linked_ports.insert(source);
        }
    }

    pub fn remove_link(&mut self, id: LinkId) -> Option<Link> {
        let link = self.links.remove(&id)?;
        if let Some(target) = link.target {
            let still_linked = self
                .links
                .values()
                .any(|l| l.source == link.source && l.target == Some(target));
            if !still_linked {
                if let Some(port) = self.ports.get_mut(link.source.0) {
                    port.linked_ports.remove(&target);
                }
                if let Some(port) = self.ports.get_mut(target.0) {
                    port.linked_ports.remove(&link.source);
                }
            }
        }
        Some(link)
    }

    fn lookup(&self, direction: PortDirection, fqn: &str) -> Option<PortId> {
        let mut id = *self.port_index.get(&index_key(direction, fqn))?;
        // Hidden fields are drawn at their nearest visible ancestor.
        while let Some(port) = self.port(id) {
            match (port.hidden, port.parent) {
                (true, Some(parent)) => id = parent,
                _ => break,
            }
        }
        Some(id)
    }

    /// Source port for an input access path.
    pub fn get_input_port(&self, fqn: &str) -> Option<PortId> {
        self.lookup(PortDirection::Out, fqn)
    }

    /// Target port for an output field path.
    pub fn get_output_port(&self, fqn: &str) -> Option<PortId> {
        self.lookup(PortDirection::In, fqn)
    }

    /// The port registered for `fqn`, even when hidden.
    pub fn exact_port(&self, direction: PortDirection, fqn: &str) -> Option<PortId> {
        self.port_index.get(&index_key(direction, fqn)).copied()
    }

    pub fn output_node(&self) -> Option<&DiagramNode> {
        self.nodes.iter().find(|n| n.kind.is_output())
    }

    pub fn output_tree(&self) -> Option<&DMTypeWithValue> {
        self.output_tree.as_ref()
    }

    pub(crate) fn set_output_tree(&mut self, tree: DMTypeWithValue) {
        self.output_tree = Some(tree);
    }

    /// Recounts visible ports per node.
    pub fn number_of_fields(&mut self) {
        for node in &mut self.nodes {
            node.number_of_fields = node
                .ports
                .iter()
                .filter_map(|p| self.ports.get(p.0))
                .filter(|p| !p.hidden)
                .count();
        }
    }

    pub fn emit(&mut self, event: DiagramEvent) {
        self.events.push(event);
    }

    pub fn drain_events(&mut self) -> Vec<DiagramEvent> {
        std::mem::take(&mut self.events)
    }
}

/// Input paths are indexed without optional chaining, so `a.b.c` and `a.b?.c` name one field.
fn index_key(direction: PortDirection, fqn: &str) -> (PortDirection, String) {
    match direction {
        PortDirection::Out => (direction, strip_optional_chaining(fqn)),
        PortDirection::In => (direction, fqn.to_string()),
    }
}

/// `a?.b?.["c"]` becomes `a.b["c"]`. Quoted keys are copied as written.
fn strip_optional_chaining(path: &str) -> String {
    let mut plain = String::with_capacity(path.len());
    let mut quote = None;
    let mut chars = path.chars().peekable();
    while let Some(c) = chars.next() {
        match (quote, c) {
            (Some(q), _) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '?') if chars.peek() == Some(&'.') => {
                chars.next();
                if chars.peek() != Some(&'[') {
                    plain.push('.');
                }
                continue;
            }
            (None, _) => {}
        }
        plain.push(c);
    }
    plain
}
