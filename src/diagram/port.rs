use super::node::NodeId;
use crate::interaction::MappingType;
use crate::source::{NodeHandle, Span};
use crate::types::{DMType, ValueType};
use ahash::AHashSet;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct PortId(pub usize);

/// `Out` ports are sources (input fields), `In` ports are targets (output fields).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PortDirection {
    In,
    Out,
}

impl fmt::Display for PortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortDirection::In => write!(f, "IN"),
            PortDirection::Out => write!(f, "OUT"),
        }
    }
}

/// One field endpoint of a node.
#[derive(Debug, Clone)]
pub struct Port {
    pub id: PortId,
    pub node: NodeId,
    /// `<fqn>.IN` / `<fqn>.OUT`; also the key used for collapse state.
    pub name: String,
    /// Access path for inputs, dotted path for outputs (`""` is the output root).
    pub field_fqn: String,
    pub field: DMType,
    pub direction: PortDirection,
    pub parent: Option<PortId>,
    pub collapsed: bool,
    /// Collapsed away or filtered out by a search; still addressable.
    pub hidden: bool,
    /// Stands in for the element of an array with no literal elements.
    pub is_preview: bool,
    pub value: Option<NodeHandle>,
    pub value_type: ValueType,
    /// Span of the entry holding `value`, for removal.
    pub entry: Option<Span>,
    pub descendant_has_value: bool,
    pub ancestor_has_value: bool,
    pub pending_mapping_type: Option<MappingType>,
    pub linked_ports: AHashSet<PortId>,
    pub disable_new_linking: bool,
    /// Element position when this port is a literal array element.
    pub field_index: Option<usize>,
}

impl Port {
    pub fn new(
        node: NodeId,
        field_fqn: impl Into<String>,
        field: DMType,
        direction: PortDirection,
        parent: Option<PortId>,
    ) -> Self {
        let field_fqn = field_fqn.into();
        Self {
            id: PortId(usize::MAX),
            node,
            name: port_name(&field_fqn, direction),
            field_fqn,
            field,
            direction,
            parent,
            collapsed: false,
            hidden: false,
            is_preview: false,
            value: None,
            value_type: ValueType::Empty,
            entry: None,
            descendant_has_value: false,
            ancestor_has_value: false,
            pending_mapping_type: None,
            linked_ports: AHashSet::new(),
            disable_new_linking: false,
            field_index: None,
        }
    }

    /// Preview ports and ports shadowed by an ancestor or descendant value cannot be targets.
    pub fn is_disabled(&self) -> bool {
        self.is_preview || self.ancestor_has_value || self.descendant_has_value
    }

    pub fn is_linkable_source(&self) -> bool {
        self.direction == PortDirection::Out && !self.is_disabled() && !self.disable_new_linking
    }

    pub fn can_link_to_port(&self, target: &Port) -> bool {
        self.direction != target.direction
            && !self.linked_ports.contains(&target.id)
            && !target.is_disabled()
            && !target.disable_new_linking
    }

    pub fn label(&self) -> &str {
        match self.field.field_name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => self.field.type_name.as_deref().unwrap_or(&self.field_fqn),
        }
    }
}

pub fn port_name(field_fqn: &str, direction: PortDirection) -> String {
    if field_fqn.is_empty() {
        format!("<root>.{direction}")
    } else {
        format!("{field_fqn}.{direction}")
    }
}
