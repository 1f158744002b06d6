//! End-to-end tests driving a `MapperSession` the way an editor would.
mod common;
use common::*;
use shazou::diagram::{DiagramEvent, NodeKind, PortDirection};
use shazou::error::MapperError;
use shazou::expression_bar::ExpressionTarget;
use shazou::navigation::{EditorPosition, EditorRange, SourceNavigator};
use shazou::prelude::*;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio_test::block_on;

fn link(session: &mut MapperSession<RecordingSink>, from: &str, to: &str) -> Option<LinkOutcome> {
    let source = input_port(session.model(), from);
    let target = output_port(session.model(), to);
    block_on(session.handle_event(InteractionEvent::MouseUp(Target::Port(source)))).unwrap();
    block_on(session.handle_event(InteractionEvent::MouseUp(Target::Port(target)))).unwrap()
}

#[derive(Default)]
struct RecordingNavigator {
    ranges: Vec<EditorRange>,
}

impl SourceNavigator for RecordingNavigator {
    fn go_to_source(&mut self, range: EditorRange) {
        self.ranges.push(range);
    }
}

#[test]
fn test_direct_link_writes_and_rebuilds() {
    let mut session = open_session(empty_transform(), RecordingSink::default());
    let generation = session.source().generation();

    let outcome = link(&mut session, "person.name", "fullName");
    assert!(matches!(outcome, Some(LinkOutcome::Committed { .. })));

    let written = session.sink().last().unwrap();
    assert!(written.contains("fullName: person.name"));
    assert_eq!(session.source().text(), written);
    assert_ne!(session.source().generation(), generation);

    // The new diagram shows the mapping as an actual link.
    let model = session.model();
    let target = output_port(model, "fullName");
    let links: Vec<_> = model.links_to(target).collect();
    assert_eq!(links.len(), 1);
    assert_eq!(links[0].source, input_port(model, "person.name"));
}

#[test]
fn test_relinking_the_same_fields_writes_nothing() {
    let mut session = open_session(mapped_transform(), RecordingSink::default());
    let outcome = link(&mut session, "person.name", "fullName");

    assert!(matches!(outcome, Some(LinkOutcome::Rejected { .. })));
    assert_eq!(session.sink().count(), 0);
}

#[test]
fn test_sink_failure_keeps_the_old_source() {
    let original = empty_transform();
    let mut session = open_session(original.clone(), RecordingSink::failing());
    let source = input_port(session.model(), "person.name");
    let target = output_port(session.model(), "fullName");

    block_on(session.handle_event(InteractionEvent::MouseUp(Target::Port(source)))).unwrap();
    let result = block_on(session.handle_event(InteractionEvent::MouseUp(Target::Port(target))));

    assert!(matches!(result, Err(MapperError::Apply(_))));
    assert_eq!(session.source().text(), original);
    assert_eq!(session.model().links().count(), 0);
}

#[test]
fn test_pending_array_mapping_resolved_element_wise() {
    let mut session = open_session(empty_transform(), RecordingSink::default());
    let outcome = link(&mut session, "person.tags", "labels");
    assert!(matches!(outcome, Some(LinkOutcome::Pending(_))));
    assert_eq!(session.sink().count(), 0);

    assert!(block_on(session.resolve_pending(MappingChoice::ElementWise)).unwrap());
    assert!(session.source().text().contains("labels: person.tags.map((tagsItem) => \"\")"));
    assert!(session.interaction().pending().is_none());

    // The map callback is shown behind a connector link.
    let labels = output_port(session.model(), "labels");
    let into_labels = session.model().links_to(labels).next().unwrap();
    assert!(into_labels.label.as_ref().unwrap().is_map_fn);
}

#[test]
fn test_pending_mapping_rejects_unavailable_choice() {
    let mut session = open_session(empty_transform(), RecordingSink::default());
    link(&mut session, "person.tags", "labels");

    let result = block_on(session.resolve_pending(MappingChoice::ExtractSingleton));
    assert!(matches!(
        result,
        Err(MapperError::Mapping(MappingError::InvalidChoice { .. }))
    ));
    assert!(session.interaction().pending().is_some());
}

#[test]
fn test_resolve_without_pending_mapping() {
    let mut session = open_session(empty_transform(), RecordingSink::default());
    let result = block_on(session.resolve_pending(MappingChoice::Direct));
    assert!(matches!(
        result,
        Err(MapperError::Mapping(MappingError::NoPendingMapping))
    ));
}

#[test]
fn test_singleton_and_record_choices() {
    let mut session = open_session(empty_transform(), RecordingSink::default());

    link(&mut session, "person.tags", "fullName");
    assert!(block_on(session.resolve_pending(MappingChoice::ExtractSingleton)).unwrap());
    assert!(session.source().text().contains("fullName: person.tags[0]"));

    link(&mut session, "person.address", "location");
    assert!(block_on(session.resolve_pending(MappingChoice::Direct)).unwrap());
    let text = session.source().text();
    assert!(text.contains("fullName: person.tags[0],\n        location: person.address"));
    assert_eq!(session.sink().count(), 2);
}

#[test]
fn test_custom_function_choice() {
    let mut session = open_session(empty_transform(), RecordingSink::default());
    link(&mut session, "person.address", "location");
    assert!(block_on(session.resolve_pending(MappingChoice::CustomFunction)).unwrap());

    let text = session.source().text();
    assert!(text.contains("location: mapAddressToLocation(person.address)"));
    assert!(session.source().function("mapAddressToLocation").is_ok());
}

#[test]
fn test_expression_bar_edits_existing_value() {
    let mut session = open_session(mapped_transform(), RecordingSink::default());
    let full_name = output_port(session.model(), "fullName");

    session.focus_expression(ExpressionTarget::Port(full_name)).unwrap();
    assert_eq!(session.expression_bar().text(), Some("person.name"));
    session.expression_input("person.name.toUpperCase()", 25, Instant::now());
    assert!(block_on(session.commit_expression()).unwrap());

    assert!(session.source().text().contains("fullName: person.name.toUpperCase()"));
    assert!(!session.expression_bar().is_focused());
    // A call on an input field is drawn through a connector.
    assert!(
        session
            .model()
            .nodes()
            .iter()
            .any(|n| matches!(n.kind, NodeKind::LinkConnector { .. }))
    );
}

#[test]
fn test_clicking_a_field_while_editing_inserts_it() {
    let mut session = open_session(mapped_transform(), RecordingSink::default());
    let years = output_port(session.model(), "years");
    let age = input_port(session.model(), "person.age");

    session.focus_expression(ExpressionTarget::Port(years)).unwrap();
    assert_eq!(session.expression_bar().text(), Some(""));
    let outcome =
        block_on(session.handle_event(InteractionEvent::MouseUp(Target::Port(age)))).unwrap();
    assert!(matches!(outcome, Some(LinkOutcome::AddToExpression { .. })));
    assert_eq!(session.expression_bar().text(), Some("person.age"));

    assert!(block_on(session.commit_expression()).unwrap());
    assert!(
        session
            .source()
            .text()
            .contains("fullName: person.name,\n        years: person.age\n")
    );
}

#[test]
fn test_completions_use_the_spliced_buffer() {
    let mut session = open_session(mapped_transform(), RecordingSink::default());
    let provider = FixedCompletions::new(vec!["name", "age"]);
    let full_name = output_port(session.model(), "fullName");
    let start = Instant::now();

    session.focus_expression(ExpressionTarget::Port(full_name)).unwrap();
    session.expression_input("person.n", 8, start);
    let early = block_on(session.poll_completions(&provider, start)).unwrap();
    assert!(early.is_empty());

    let due = start + Duration::from_millis(session.config().debounce_ms);
    let entries = block_on(session.poll_completions(&provider, due)).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].entry, "name");

    let sent = provider.requests.lock().unwrap();
    let request = &sent[0];
    assert!(request.file_content.contains("fullName: person.n\n"));
    assert_eq!(&request.file_content[request.cursor_position - 8..request.cursor_position], "person.n");
    // The real file is untouched.
    assert!(session.source().text().contains("fullName: person.name\n"));
}

#[test]
fn test_complete_now_skips_the_debounce() {
    let mut session = open_session(mapped_transform(), RecordingSink::default());
    let provider = FixedCompletions::new(vec!["name", "age"]);
    let full_name = output_port(session.model(), "fullName");

    session.focus_expression(ExpressionTarget::Port(full_name)).unwrap();
    session.expression_input("person.a", 8, Instant::now());
    let entries = block_on(session.complete_now(&provider)).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].entry, "age");

    // Nothing left to send.
    assert!(block_on(session.complete_now(&provider)).unwrap().is_empty());
    assert_eq!(provider.requests.lock().unwrap().len(), 1);
}

#[test]
fn test_cancel_expression_returns_original() {
    let mut session = open_session(mapped_transform(), RecordingSink::default());
    let full_name = output_port(session.model(), "fullName");
    session.focus_expression(ExpressionTarget::Port(full_name)).unwrap();
    session.expression_input("broken(", 7, Instant::now());

    assert_eq!(session.cancel_expression(), Some("person.name".to_string()));
    assert_eq!(session.sink().count(), 0);
}

#[test]
fn test_delete_link_removes_the_entry() {
    let mut session = open_session(mapped_transform(), RecordingSink::default());
    let link = session.model().links().next().unwrap().id;

    assert!(block_on(session.delete_link(link)).unwrap());
    assert!(session.source().text().contains("    return {};"));
    assert_eq!(session.model().links().count(), 0);
}

#[test]
fn test_delete_link_through_connector() {
    let mut session = open_session(
        transform_with_body(
            "    return {\n        fullName: person.name + person.address.city,\n        years: person.age\n    };\n",
        ),
        RecordingSink::default(),
    );
    let city = input_port(session.model(), "person.address.city");
    let link = session
        .model()
        .links()
        .find(|l| l.source == city)
        .unwrap()
        .id;

    assert!(block_on(session.delete_link(link)).unwrap());
    let text = session.source().text();
    assert!(!text.contains("fullName: person.name"));
    assert!(text.contains("    return {\n        years: person.age\n    };"));
}

#[test]
fn test_events_reach_subscribers() {
    let mut session = open_session(mapped_transform(), RecordingSink::default());
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    session.subscribe(move |event: &DiagramEvent| sink.lock().unwrap().push(event.clone()));

    let source = input_port(session.model(), "person.name");
    let linked = output_port(session.model(), "fullName");
    block_on(session.handle_event(InteractionEvent::MouseUp(Target::Port(source)))).unwrap();
    block_on(session.handle_event(InteractionEvent::KeyDown(Key::Escape))).unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(
        *seen,
        vec![
            DiagramEvent::MappingStartedFrom(source),
            DiagramEvent::DisableNewLinking(linked),
            DiagramEvent::EnableNewLinking(linked),
        ]
    );
}

#[test]
fn test_collapse_survives_rebuilds() {
    let mut session = open_session(empty_transform(), RecordingSink::default());
    let address = input_port(session.model(), "person.address");

    let outcome =
        block_on(session.handle_event(InteractionEvent::MouseUp(Target::ExpandCollapse(address))))
            .unwrap();
    assert_eq!(outcome, Some(LinkOutcome::ToggleCollapse(address)));
    assert!(session.model().port(address).unwrap().collapsed);

    link(&mut session, "person.name", "fullName");
    let address = input_port(session.model(), "person.address");
    assert!(session.model().port(address).unwrap().collapsed);
}

#[test]
fn test_search_is_applied_on_rebuild() {
    let mut session = open_session(empty_transform(), RecordingSink::default());
    session.set_output_search("city").unwrap();

    let model = session.model();
    assert!(model.port(output_port(model, "fullName")).unwrap().hidden);
    assert!(!model.port(output_port(model, "location.city")).unwrap().hidden);
}

#[test]
fn test_map_function_view() {
    let source = parse(ORDER_SOURCE);
    let mut session =
        MapperSession::open(source, "toInvoice", MapperConfig::default(), RecordingSink::default())
            .unwrap();
    let lines = output_port(session.model(), "lines");

    session.open_map_function(lines).unwrap();
    assert_eq!(session.views().labels(), vec!["lines"]);
    let model = session.model();
    assert!(
        model
            .nodes()
            .iter()
            .any(|n| matches!(n.kind, NodeKind::ArrayFilter { .. }))
    );
    let code = output_port(model, "code");
    assert_eq!(model.links_to(code).next().unwrap().source, input_port(model, "item.id"));
    // Outer inputs stay in scope.
    assert!(model.exact_port(PortDirection::Out, "order.items").is_some());

    let outcome = link(&mut session, "item.qty", "amount");
    assert!(matches!(outcome, Some(LinkOutcome::Committed { .. })));
    assert!(
        session
            .source()
            .text()
            .contains("            code: item.id,\n            amount: item.qty\n")
    );
    assert_eq!(session.views().depth(), 1);

    session.pop_view().unwrap();
    assert!(session.views().is_root());
    assert!(session.model().exact_port(PortDirection::In, "lines").is_some());
}

#[test]
fn test_filter_predicate_is_editable() {
    let source = parse(ORDER_SOURCE);
    let mut session =
        MapperSession::open(source, "toInvoice", MapperConfig::default(), RecordingSink::default())
            .unwrap();
    let lines = output_port(session.model(), "lines");
    session.open_map_function(lines).unwrap();
    assert_eq!(session.focus().filters[0].text, "i => i.qty > 0");

    session.focus_expression(ExpressionTarget::Filter(0)).unwrap();
    session.expression_input("i => i.qty > 1", 14, Instant::now());
    assert!(block_on(session.commit_expression()).unwrap());

    assert!(session.source().text().contains(".filter(i => i.qty > 1)"));
    assert_eq!(session.focus().filters[0].text, "i => i.qty > 1");
}

#[test]
fn test_sub_mapping_view() {
    let mut session = open_session(
        transform_with_body(
            "    const loc: Location = {};\n    return {\n        location: loc\n    };\n",
        ),
        RecordingSink::default(),
    );

    session.open_sub_mapping(0).unwrap();
    assert!(session.focus().is_sub_mapping());
    assert_eq!(session.views().labels(), vec!["loc"]);

    link(&mut session, "person.address.city", "city");
    assert!(
        session
            .source()
            .text()
            .contains("    const loc: Location = {\n        city: person.address.city\n    };\n")
    );
}

#[test]
fn test_sub_mapping_without_initializer() {
    let mut session = open_session(
        transform_with_body("    let loc: Location;\n    return {\n        location: loc\n    };\n"),
        RecordingSink::default(),
    );
    session.open_sub_mapping(0).unwrap();

    link(&mut session, "person.address.city", "city");
    assert!(
        session
            .source()
            .text()
            .contains("    let loc: Location = {\n        city: person.address.city\n    };\n")
    );
}

#[test]
fn test_opening_a_missing_view_fails() {
    let mut session = open_session(mapped_transform(), RecordingSink::default());
    let full_name = output_port(session.model(), "fullName");

    let result = session.open_map_function(full_name);
    assert!(matches!(result, Err(MapperError::ViewNotFound(_))));
    assert!(session.views().is_root());
    assert!(session.open_sub_mapping(0).is_err());
}

#[test]
fn test_go_to_source() {
    let session = open_session(mapped_transform(), RecordingSink::default());
    let mut navigator = RecordingNavigator::default();
    let full_name = output_port(session.model(), "fullName");
    let years = output_port(session.model(), "years");

    assert!(session.go_to_source(full_name, &mut navigator));
    assert!(!session.go_to_source(years, &mut navigator));

    let text = session.source().text();
    let offset = text.find("person.name\n").unwrap();
    let line = text[..offset].matches('\n').count();
    assert_eq!(navigator.ranges.len(), 1);
    assert_eq!(navigator.ranges[0].start, EditorPosition { line, column: 18 });
    assert_eq!(navigator.ranges[0].end, EditorPosition { line, column: 29 });
}

#[test]
fn test_open_unknown_function() {
    let result = MapperSession::open(
        parse(empty_transform()),
        "missing",
        MapperConfig::default(),
        RecordingSink::default(),
    );
    assert!(matches!(
        result,
        Err(MapperError::Source(SourceError::FunctionNotFound(_)))
    ));
}
