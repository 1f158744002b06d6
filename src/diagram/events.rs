use super::link::LinkId;
use super::port::PortId;

/// Notifications raised while the user wires the diagram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagramEvent {
    MappingStartedFrom(PortId),
    MappingFinishedTo(PortId),
    LinkSelected(LinkId),
    LinkUnselected(LinkId),
    DisableNewLinking(PortId),
    EnableNewLinking(PortId),
    /// A source field was clicked while the expression bar had focus.
    AddToExpression { port: PortId, text: String },
    /// The expression bar gained (`Some`) or lost (`None`) focus on a field.
    ExpressionBarFocused(Option<PortId>),
}

pub trait DiagramObserver {
    fn on_event(&mut self, event: &DiagramEvent);
}

impl<F> DiagramObserver for F
where
    F: FnMut(&DiagramEvent),
{
    fn on_event(&mut self, event: &DiagramEvent) {
        self(event)
    }
}

/// Fans queued diagram events out to subscribers.
#[derive(Default)]
pub struct EventBus {
    observers: Vec<Box<dyn DiagramObserver + Send>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, observer: impl DiagramObserver + Send + 'static) {
        self.observers.push(Box::new(observer));
    }

    pub fn dispatch(&mut self, events: &[DiagramEvent]) {
        for event in events {
            for observer in &mut self.observers {
                observer.on_event(event);
            }
        }
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("observers", &self.observers.len())
            .finish()
    }
}
