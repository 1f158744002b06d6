use super::link::LinkId;
use super::port::PortId;
use crate::source::NodeHandle;
use crate::types::DMType;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(pub usize);

/// A `.filter()` predicate applied before the focused `.map()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterExpr {
    pub index: usize,
    pub value: NodeHandle,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Input { param: String },
    ObjectOutput,
    ArrayOutput,
    UnionOutput,
    PrimitiveOutput,
    SubMapping,
    ArrayFilter { filters: Vec<FilterExpr> },
    /// Joins several inputs, or an operator applied to one, into one output.
    LinkConnector {
        value: NodeHandle,
        text: String,
        is_map_fn: bool,
    },
    UnsupportedIO { reason: String },
}

impl NodeKind {
    pub fn is_output(&self) -> bool {
        matches!(
            self,
            NodeKind::ObjectOutput
                | NodeKind::ArrayOutput
                | NodeKind::UnionOutput
                | NodeKind::PrimitiveOutput
        )
    }

    pub fn is_source(&self) -> bool {
        matches!(self, NodeKind::Input { .. } | NodeKind::SubMapping)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Input { param } => write!(f, "Input({param})"),
            NodeKind::ObjectOutput => write!(f, "ObjectOutput"),
            NodeKind::ArrayOutput => write!(f, "ArrayOutput"),
            NodeKind::UnionOutput => write!(f, "UnionOutput"),
            NodeKind::PrimitiveOutput => write!(f, "PrimitiveOutput"),
            NodeKind::SubMapping => write!(f, "SubMapping"),
            NodeKind::ArrayFilter { filters } => write!(f, "ArrayFilter[{}]", filters.len()),
            NodeKind::LinkConnector { text, .. } => write!(f, "LinkConnector({text})"),
            NodeKind::UnsupportedIO { reason } => write!(f, "UnsupportedIO({reason})"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DiagramNode {
    pub id: NodeId,
    pub kind: NodeKind,
    pub root_type: Option<DMType>,
    pub ports: Vec<PortId>,
    /// Link awaiting a mapping choice against one of this node's ports.
    pub temporary_link: Option<LinkId>,
    /// Visible ports, used for layout height.
    pub number_of_fields: usize,
}
