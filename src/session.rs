//! One open mapping function: diagram, interaction, expression bar and persistence.
use crate::config::MapperConfig;
use crate::diagram::{
    Diagnostic, DiagramBuilder, DiagramEvent, DiagramModel, DiagramObserver, EventBus,
    FocusedFunction, LinkId, NodeKind, PortId, SearchFilter, View, ViewStack, ViewState,
};
use crate::error::{MapperError, MappingError};
use crate::expression_bar::{
    CompletionEntry, CompletionProvider, CompletionRequest, ExpressionBar, ExpressionTarget,
    ShadowBuffer,
};
use crate::interaction::{
    InteractionEvent, LinkOutcome, LinkStateMachine, MappingChoice, available_choices,
};
use crate::mutation::{MappingEngine, ModificationSink};
use crate::navigation::{EditorRange, SourceNavigator};
use crate::source::SourceFile;
use std::time::Instant;
use tracing::{debug, info, warn};

pub struct MapperSession<S: ModificationSink> {
    source: SourceFile,
    function_name: String,
    config: MapperConfig,
    sink: S,
    views: ViewStack,
    view_state: ViewState,
    diagnostics: Vec<Diagnostic>,
    focus: FocusedFunction,
    model: DiagramModel,
    machine: LinkStateMachine,
    expression_bar: ExpressionBar,
    events: EventBus,
}

impl<S: ModificationSink> MapperSession<S> {
    pub fn open(
        source: SourceFile,
        function_name: &str,
        config: MapperConfig,
        sink: S,
    ) -> Result<Self, MapperError> {
        let views = ViewStack::new();
        let focus = FocusedFunction::resolve(&source, function_name, &views)?;
        let view_state = ViewState::default();
        let model = DiagramBuilder::new(&source, &focus)
            .collapse(&view_state)
            .build();
        info!(function = function_name, path = %source.path().display(), "opened mapping session");

        Ok(Self {
            expression_bar: ExpressionBar::new(&config),
            source,
            function_name: function_name.to_string(),
            config,
            sink,
            views,
            view_state,
            diagnostics: Vec::new(),
            focus,
            model,
            machine: LinkStateMachine::new(),
            events: EventBus::new(),
        })
    }

    pub fn source(&self) -> &SourceFile {
        &self.source
    }

    pub fn model(&self) -> &DiagramModel {
        &self.model
    }

    pub fn focus(&self) -> &FocusedFunction {
        &self.focus
    }

    pub fn config(&self) -> &MapperConfig {
        &self.config
    }

    pub fn views(&self) -> &ViewStack {
        &self.views
    }

    pub fn view_state(&self) -> &ViewState {
        &self.view_state
    }

    pub fn interaction(&self) -> &LinkStateMachine {
        &self.machine
    }

    pub fn expression_bar(&self) -> &ExpressionBar {
        &self.expression_bar
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn subscribe(&mut self, observer: impl DiagramObserver + Send + 'static) {
        self.events.subscribe(observer);
    }

    pub fn engine(&self) -> MappingEngine<'_> {
        MappingEngine::new(&self.source, &self.focus, &self.model, &self.config)
    }

    /// Rebuilds the focused view from the current source and UI state.
    pub fn rebuild(&mut self) -> Result<(), MapperError> {
        self.focus = FocusedFunction::resolve(&self.source, &self.function_name, &self.views)?;
        self.model = DiagramBuilder::new(&self.source, &self.focus)
            .collapse(&self.view_state)
            .input_search(&self.view_state.input_search)
            .output_search(&self.view_state.output_search)
            .diagnostics(&self.diagnostics)
            .build();
        let bar_focused = self.expression_bar.is_focused();
        self.machine = LinkStateMachine::new();
        self.machine.set_expression_bar_focused(bar_focused);
        Ok(())
    }

    pub fn set_diagnostics(&mut self, diagnostics: Vec<Diagnostic>) -> Result<(), MapperError> {
        self.diagnostics = diagnostics;
        self.rebuild()
    }

    pub fn set_input_search(&mut self, raw: &str) -> Result<(), MapperError> {
        self.view_state.input_search = SearchFilter::parse(raw);
        self.rebuild()
    }

    pub fn set_output_search(&mut self, raw: &str) -> Result<(), MapperError> {
        self.view_state.output_search = SearchFilter::parse(raw);
        self.rebuild()
    }

    pub fn toggle_collapsed(&mut self, port: PortId) -> Result<(), MapperError> {
        let Some(port) = self.model.port(port) else {
            return Ok(());
        };
        let name = port.name.clone();
        self.view_state.toggle_collapsed(&name);
        self.rebuild()
    }

    /// Routes a pointer or keyboard event, writing direct mappings as they complete.
    pub async fn handle_event(
        &mut self,
        event: InteractionEvent,
    ) -> Result<Option<LinkOutcome>, MapperError> {
        let outcome = self.machine.handle(&mut self.model, event);
        self.dispatch_events();

        match &outcome {
            Some(LinkOutcome::Committed { source, target, .. }) => {
                let result = self
                    .engine()
                    .create_source_for_mapping(*source, *target, None, None);
                self.apply_result(result).await?;
            }
            Some(LinkOutcome::ToggleCollapse(port)) => self.toggle_collapsed(*port)?,
            Some(LinkOutcome::AddToExpression { text, .. }) => {
                self.expression_bar.insert_at_cursor(text, Instant::now());
            }
            _ => {}
        }
        Ok(outcome)
    }

    /// Writes the pending mapping the way the user picked. Returns whether the source changed.
    pub async fn resolve_pending(&mut self, choice: MappingChoice) -> Result<bool, MapperError> {
        let pending = *self
            .machine
            .pending()
            .ok_or(MappingError::NoPendingMapping)?;
        if !available_choices(pending.mapping_type).contains(&choice) {
            return Err(MappingError::InvalidChoice {
                choice: choice.to_string(),
                mapping_type: pending.mapping_type.to_string(),
            }
            .into());
        }
        self.machine.take_pending(&mut self.model);
        debug!(%choice, mapping_type = %pending.mapping_type, "resolving pending mapping");

        let engine = self.engine();
        let result = match choice {
            MappingChoice::Direct => {
                engine.create_source_for_mapping(pending.source, pending.target, None, None)
            }
            MappingChoice::ElementWise => {
                engine.create_element_wise_mapping(pending.source, pending.target)
            }
            MappingChoice::ExtractSingleton => {
                engine.create_source_for_mapping(pending.source, pending.target, None, Some("[0]"))
            }
            MappingChoice::CustomFunction => engine.gen_custom_function(pending.source, pending.target),
        };
        self.apply_result(result).await
    }

    /// Starts editing a field's expression (or a filter predicate) in the expression bar.
    pub fn focus_expression(&mut self, target: ExpressionTarget) -> Result<(), MapperError> {
        let path = self.source.path().to_path_buf();
        let (original, shadow) = match target {
            ExpressionTarget::Port(port_id) => {
                let port = self
                    .model
                    .port(port_id)
                    .ok_or_else(|| MappingError::PortNotFound(format!("#{}", port_id.0)))?;
                match port.value.and_then(|h| self.source.span_of(&h)) {
                    Some(span) => (
                        self.source.slice(span).to_string(),
                        ShadowBuffer::around(&path, self.source.text(), span),
                    ),
                    None => match self.engine().preview_insertion(port_id)? {
                        Some((text, offset)) => {
                            (String::new(), ShadowBuffer::at_insertion(&path, text, offset))
                        }
                        None => return Ok(()),
                    },
                }
            }
            ExpressionTarget::Filter(index) => {
                let filter = self
                    .focus
                    .filters
                    .iter()
                    .find(|f| f.index == index)
                    .ok_or_else(|| MappingError::PortNotFound(format!("filter #{index}")))?;
                let Some(span) = self.source.span_of(&filter.value) else {
                    return Ok(());
                };
                (
                    self.source.slice(span).to_string(),
                    ShadowBuffer::around(&path, self.source.text(), span),
                )
            }
        };

        self.expression_bar.focus(target, original, shadow);
        self.machine.set_expression_bar_focused(true);
        let port = match target {
            ExpressionTarget::Port(port) => Some(port),
            ExpressionTarget::Filter(_) => None,
        };
        self.model.emit(DiagramEvent::ExpressionBarFocused(port));
        self.dispatch_events();
        Ok(())
    }

    pub fn expression_input(&mut self, text: impl Into<String>, cursor: usize, now: Instant) {
        self.expression_bar.input(text, cursor, now);
    }

    /// Sends the debounced completion request once due and returns the filtered entries.
    pub async fn poll_completions<P>(
        &mut self,
        provider: &P,
        now: Instant,
    ) -> Result<Vec<CompletionEntry>, MapperError>
    where
        P: CompletionProvider + ?Sized,
    {
        let request = self.expression_bar.poll_request(now);
        self.send_completion_request(provider, request).await
    }

    /// Requests completions for the pending keystroke right away, e.g. on an explicit trigger.
    pub async fn complete_now<P>(
        &mut self,
        provider: &P,
    ) -> Result<Vec<CompletionEntry>, MapperError>
    where
        P: CompletionProvider + ?Sized,
    {
        let request = self.expression_bar.flush_request();
        self.send_completion_request(provider, request).await
    }

    async fn send_completion_request<P>(
        &mut self,
        provider: &P,
        request: Option<CompletionRequest>,
    ) -> Result<Vec<CompletionEntry>, MapperError>
    where
        P: CompletionProvider + ?Sized,
    {
        let Some(request) = request else {
            return Ok(Vec::new());
        };
        let entries = self
            .expression_bar
            .request_completions(provider, request)
            .await?;
        Ok(entries.to_vec())
    }

    /// Writes the expression bar's buffer back to source.
    pub async fn commit_expression(&mut self) -> Result<bool, MapperError> {
        self.machine.set_expression_bar_focused(false);
        self.model.emit(DiagramEvent::ExpressionBarFocused(None));
        self.dispatch_events();

        let Some(commit) = self.expression_bar.commit() else {
            return Ok(false);
        };
        let result = match commit.target {
            ExpressionTarget::Port(port) => self.engine().update_existing_value(port, &commit.text),
            ExpressionTarget::Filter(index) => self.engine().update_filter(index, &commit.text),
        };
        self.apply_result(result).await
    }

    /// Drops the expression bar's buffer, returning the original text.
    pub fn cancel_expression(&mut self) -> Option<String> {
        self.machine.set_expression_bar_focused(false);
        self.model.emit(DiagramEvent::ExpressionBarFocused(None));
        self.dispatch_events();
        self.expression_bar.cancel()
    }

    pub async fn delete_mapping(&mut self, target: PortId) -> Result<bool, MapperError> {
        let result = self.engine().delete_mapping(target);
        self.apply_result(result).await
    }

    /// Deletes the mapping a link draws, following it through a connector when needed.
    pub async fn delete_link(&mut self, link: LinkId) -> Result<bool, MapperError> {
        let Some(mut target) = self.model.link(link).and_then(|l| l.target) else {
            return Ok(false);
        };
        if let Some(port) = self.model.port(target) {
            let connector = matches!(
                self.model.node(port.node).map(|n| &n.kind),
                Some(NodeKind::LinkConnector { .. })
            );
            if connector {
                let node = port.node;
                let downstream = self
                    .model
                    .links()
                    .filter_map(|l| {
                        let source = self.model.port(l.source)?;
                        (source.node == node).then_some(l.target).flatten()
                    })
                    .next();
                match downstream {
                    Some(port) => target = port,
                    None => return Ok(false),
                }
            }
        }
        self.delete_mapping(target).await
    }

    /// Opens the `.map()` callback written into `target` as a nested view.
    pub fn open_map_function(&mut self, target: PortId) -> Result<(), MapperError> {
        let port = self
            .model
            .port(target)
            .ok_or_else(|| MappingError::PortNotFound(format!("#{}", target.0)))?;
        let expr = port
            .value
            .and_then(|h| self.source.expr_at(&h))
            .ok_or_else(|| MapperError::ViewNotFound(port.field_fqn.clone()))?;
        let (mut receiver, _) = expr
            .as_map_call()
            .ok_or_else(|| MapperError::ViewNotFound(port.field_fqn.clone()))?;
        while let Some((inner, _)) = receiver.as_filter_call() {
            receiver = inner;
        }
        let source_fqn = receiver.skip_parens().access_path().unwrap_or_default();
        let view = View::map_function(port.label().to_string(), port.field_fqn.clone(), source_fqn);
        self.push_view(view)
    }

    pub fn open_sub_mapping(&mut self, index: usize) -> Result<(), MapperError> {
        let binding = self
            .focus
            .sub_mappings
            .get(index)
            .ok_or_else(|| MapperError::ViewNotFound(format!("sub-mapping #{index}")))?;
        let view = View::sub_mapping(index, binding.name.clone());
        self.push_view(view)
    }

    pub fn push_view(&mut self, view: View) -> Result<(), MapperError> {
        self.views.push(view);
        if let Err(error) = self.rebuild() {
            self.views.pop();
            self.rebuild()?;
            return Err(error);
        }
        Ok(())
    }

    pub fn pop_view(&mut self) -> Result<Option<View>, MapperError> {
        let view = self.views.pop();
        self.rebuild()?;
        Ok(view)
    }

    /// Moves the host editor to the expression bound to `port`. Returns false when it has none.
    pub fn go_to_source<N>(&self, port: PortId, navigator: &mut N) -> bool
    where
        N: SourceNavigator + ?Sized,
    {
        let Some(span) = self
            .model
            .port(port)
            .and_then(|p| p.value)
            .and_then(|h| self.source.span_of(&h))
        else {
            return false;
        };
        navigator.go_to_source(EditorRange::of_span(&self.source, span));
        true
    }

    fn dispatch_events(&mut self) {
        let events = self.model.drain_events();
        self.events.dispatch(&events);
    }

    async fn apply_result(
        &mut self,
        result: Result<Option<String>, MappingError>,
    ) -> Result<bool, MapperError> {
        let text = match result {
            Ok(Some(text)) => text,
            Ok(None) => {
                self.rebuild()?;
                return Ok(false);
            }
            Err(error) => {
                self.rebuild()?;
                return Err(error.into());
            }
        };

        info!(path = %self.source.path().display(), bytes = text.len(), "applying modification");
        if let Err(error) = self
            .sink
            .apply_modifications(self.source.path(), text.clone())
            .await
        {
            warn!(%error, "modification was not applied");
            self.rebuild()?;
            return Err(error.into());
        }
        self.source = self.source.with_text(text)?;
        self.rebuild()?;
        Ok(true)
    }
}
