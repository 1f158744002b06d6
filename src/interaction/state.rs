use super::mapping_type::{MappingType, get_mapping_type, is_pending_mapping_required};
use crate::diagram::{
    DiagramEvent, DiagramModel, ExpressionLabel, LinkId, LinkState, NodeId, PortDirection, PortId,
};
use tracing::{debug, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionState {
    Default,
    DragCanvas,
    CreateLink,
    PendingMapping,
}

/// What the pointer is over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Canvas,
    Port(PortId),
    /// A record field row, resolved to its source port by input access path.
    RecordField(String),
    ExpandCollapse(PortId),
    Link(LinkId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Escape,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InteractionEvent {
    MouseDown(Target),
    MouseUp(Target),
    KeyDown(Key),
}

/// A connected link waiting for the user to pick how to map it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingMapping {
    pub link: LinkId,
    pub source: PortId,
    pub target: PortId,
    pub target_node: NodeId,
    pub mapping_type: MappingType,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkOutcome {
    SourceSelected(PortId),
    SourceDeselected(PortId),
    /// A direct mapping is ready to be written.
    Committed {
        source: PortId,
        target: PortId,
        link: LinkId,
    },
    Pending(PendingMapping),
    /// The target refused the link; the source stays selected.
    Rejected { source: PortId, target: PortId },
    Cancelled,
    AddToExpression { port: PortId, text: String },
    LinkSelected(LinkId),
    LinkUnselected(LinkId),
    ToggleCollapse(PortId),
}

/// Drives link creation from pointer and keyboard events.
///
/// Every exit from `CreateLink` clears the selected source and provisional link
/// and re-enables the ports whose linking was disabled on entry.
#[derive(Debug)]
pub struct LinkStateMachine {
    state: InteractionState,
    source_port: Option<PortId>,
    link: Option<LinkId>,
    disabled: Vec<PortId>,
    pending: Option<PendingMapping>,
    selected_link: Option<LinkId>,
    expression_bar_focused: bool,
}

impl Default for LinkStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl LinkStateMachine {
    pub fn new() -> Self {
        Self {
            state: InteractionState::Default,
            source_port: None,
            link: None,
            disabled: Vec::new(),
            pending: None,
            selected_link: None,
            expression_bar_focused: false,
        }
    }

    pub fn state(&self) -> InteractionState {
        self.state
    }

    pub fn source_port(&self) -> Option<PortId> {
        self.source_port
    }

    pub fn provisional_link(&self) -> Option<LinkId> {
        self.link
    }

    pub fn pending(&self) -> Option<&PendingMapping> {
        self.pending.as_ref()
    }

    pub fn selected_link(&self) -> Option<LinkId> {
        self.selected_link
    }

    pub fn set_expression_bar_focused(&mut self, focused: bool) {
        self.expression_bar_focused = focused;
    }

    pub fn handle(&mut self, model: &mut DiagramModel, event: InteractionEvent) -> Option<LinkOutcome> {
        trace!(state = ?self.state, ?event, "interaction event");

        if event == InteractionEvent::KeyDown(Key::Escape) {
            return self.cancel(model).then_some(LinkOutcome::Cancelled);
        }
        if self.state == InteractionState::PendingMapping {
            if matches!(event, InteractionEvent::MouseUp(_)) {
                self.cancel(model);
                return Some(LinkOutcome::Cancelled);
            }
            return None;
        }

        let event = match event {
            InteractionEvent::MouseUp(Target::RecordField(fqn)) => match model.get_input_port(&fqn) {
                Some(port) => InteractionEvent::MouseUp(Target::Port(port)),
                None => return None,
            },
            other => other,
        };

        if self.expression_bar_focused {
            if let InteractionEvent::MouseUp(Target::Port(port)) = event {
                return self.add_to_expression(model, port);
            }
        }

        match (self.state, event) {
            (InteractionState::Default, InteractionEvent::MouseDown(Target::Canvas)) => {
                self.state = InteractionState::DragCanvas;
                None
            }
            (InteractionState::DragCanvas, InteractionEvent::MouseUp(_)) => {
                self.state = InteractionState::Default;
                None
            }
            (InteractionState::Default, InteractionEvent::MouseUp(Target::Link(link))) => {
                Some(self.toggle_link_selection(model, link))
            }
            (InteractionState::Default, InteractionEvent::MouseUp(Target::ExpandCollapse(port))) => {
                Some(LinkOutcome::ToggleCollapse(port))
            }
            (InteractionState::Default, InteractionEvent::MouseUp(Target::Port(port))) => {
                self.state = InteractionState::CreateLink;
                self.on_port_clicked(model, port)
            }
            (InteractionState::CreateLink, InteractionEvent::MouseUp(Target::Port(port))) => {
                self.on_port_clicked(model, port)
            }
            (
                InteractionState::CreateLink,
                InteractionEvent::MouseUp(Target::Canvas | Target::ExpandCollapse(_))
                | InteractionEvent::MouseDown(Target::ExpandCollapse(_)),
            ) => {
                self.cancel(model);
                Some(LinkOutcome::Cancelled)
            }
            _ => None,
        }
    }

    fn on_port_clicked(&mut self, model: &mut DiagramModel, port_id: PortId) -> Option<LinkOutcome> {
        let Some(port) = model.port(port_id) else {
            self.state = InteractionState::Default;
            return None;
        };

        let Some(source_id) = self.source_port else {
            if !port.is_linkable_source() {
                self.state = InteractionState::Default;
                return None;
            }
            self.select_source(model, port_id);
            return Some(LinkOutcome::SourceSelected(port_id));
        };

        if source_id == port_id {
            self.reset(model);
            return Some(LinkOutcome::SourceDeselected(port_id));
        }
        if port.direction == PortDirection::Out {
            return None;
        }

        let Some(source) = model.port(source_id) else {
            self.reset(model);
            return None;
        };
        if !source.can_link_to_port(port) {
            debug!(source = %source.name, target = %port.name, "link rejected by target");
            return Some(LinkOutcome::Rejected {
                source: source_id,
                target: port_id,
            });
        }

        let mapping_type = get_mapping_type(&source.field, &port.field);
        let target_node = port.node;
        let link = match self.link.take() {
            Some(link) => link,
            None => model.add_link(source_id, None, LinkState::Provisional),
        };
        model.connect(link, port_id);
        model.emit(DiagramEvent::MappingFinishedTo(port_id));

        if is_pending_mapping_required(mapping_type) {
            if let Some(link) = model.link_mut(link) {
                link.state = LinkState::Pending(mapping_type);
            }
            if let Some(port) = model.port_mut(port_id) {
                port.pending_mapping_type = Some(mapping_type);
            }
            if let Some(node) = model.node_mut(target_node) {
                node.temporary_link = Some(link);
            }
            let pending = PendingMapping {
                link,
                source: source_id,
                target: port_id,
                target_node,
                mapping_type,
            };
            self.pending = Some(pending);
            self.release(model);
            self.state = InteractionState::PendingMapping;
            debug!(%mapping_type, "mapping awaits a choice");
            return Some(LinkOutcome::Pending(pending));
        }

        self.release(model);
        self.state = InteractionState::Default;
        Some(LinkOutcome::Committed {
            source: source_id,
            target: port_id,
            link,
        })
    }

    fn select_source(&mut self, model: &mut DiagramModel, port_id: PortId) {
        self.source_port = Some(port_id);
        model.emit(DiagramEvent::MappingStartedFrom(port_id));

        let linked: Vec<PortId> = model
            .port(port_id)
            .map(|p| p.linked_ports.iter().copied().collect())
            .unwrap_or_default();
        for other in linked {
            if let Some(port) = model.port_mut(other) {
                if !port.disable_new_linking {
                    port.disable_new_linking = true;
                    self.disabled.push(other);
                    model.emit(DiagramEvent::DisableNewLinking(other));
                }
            }
        }

        let link = model.add_link(port_id, None, LinkState::Provisional);
        if let Some(entry) = model.link_mut(link) {
            entry.label = Some(ExpressionLabel {
                value: None,
                text: String::new(),
                is_map_fn: false,
            });
        }
        self.link = Some(link);
    }

    fn add_to_expression(&mut self, model: &mut DiagramModel, port_id: PortId) -> Option<LinkOutcome> {
        let port = model.port(port_id)?;
        if port.direction != PortDirection::Out || port.is_preview {
            return None;
        }
        let text = port.field_fqn.clone();
        model.emit(DiagramEvent::AddToExpression {
            port: port_id,
            text: text.clone(),
        });
        Some(LinkOutcome::AddToExpression { port: port_id, text })
    }

    fn toggle_link_selection(&mut self, model: &mut DiagramModel, link: LinkId) -> LinkOutcome {
        if let Some(previous) = self.selected_link.take() {
            if let Some(entry) = model.link_mut(previous) {
                entry.selected = false;
            }
            model.emit(DiagramEvent::LinkUnselected(previous));
            if previous == link {
                return LinkOutcome::LinkUnselected(link);
            }
        }
        if let Some(entry) = model.link_mut(link) {
            entry.selected = true;
        }
        self.selected_link = Some(link);
        model.emit(DiagramEvent::LinkSelected(link));
        LinkOutcome::LinkSelected(link)
    }

    /// Removes the provisional or pending link and returns to `Default`.
    /// Returns false when there was nothing to cancel.
    pub fn cancel(&mut self, model: &mut DiagramModel) -> bool {
        let had_work = self.source_port.is_some() || self.link.is_some() || self.pending.is_some();
        if let Some(pending) = self.pending.take() {
            self.clear_pending_markers(model, &pending);
            model.remove_link(pending.link);
        }
        self.reset(model);
        had_work
    }

    /// Hands the pending mapping to the caller, dropping its temporary link.
    pub fn take_pending(&mut self, model: &mut DiagramModel) -> Option<PendingMapping> {
        let pending = self.pending.take()?;
        self.clear_pending_markers(model, &pending);
        model.remove_link(pending.link);
        self.state = InteractionState::Default;
        Some(pending)
    }

    fn clear_pending_markers(&self, model: &mut DiagramModel, pending: &PendingMapping) {
        if let Some(port) = model.port_mut(pending.target) {
            port.pending_mapping_type = None;
        }
        if let Some(node) = model.node_mut(pending.target_node) {
            node.temporary_link = None;
        }
    }

    fn reset(&mut self, model: &mut DiagramModel) {
        if let Some(link) = self.link.take() {
            model.remove_link(link);
        }
        self.release(model);
        self.state = InteractionState::Default;
    }

    fn release(&mut self, model: &mut DiagramModel) {
        self.source_port = None;
        self.link = None;
        for port_id in self.disabled.drain(..) {
            if let Some(port) = model.port_mut(port_id) {
                port.disable_new_linking = false;
            }
            model.emit(DiagramEvent::EnableNewLinking(port_id));
        }
    }
}
