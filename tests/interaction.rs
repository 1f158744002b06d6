//! Tests for mapping-type classification and the link state machine.
mod common;
use common::*;
use shazou::diagram::{DiagramEvent, LinkState};
use shazou::interaction::{InteractionState, available_choices, is_pending_mapping_required};
use shazou::prelude::*;

fn string() -> DMType {
    DMType::primitive(TypeKind::String)
}

fn record() -> DMType {
    DMType::interface(Some("R".to_string()), vec![string().with_field("a", false)])
}

fn click(machine: &mut LinkStateMachine, model: &mut DiagramModel, port: PortId) -> Option<LinkOutcome> {
    machine.handle(model, InteractionEvent::MouseUp(Target::Port(port)))
}

#[test]
fn test_mapping_type_classification() {
    let strings = DMType::array(string());
    let matrix = DMType::array(DMType::array(string()));

    assert_eq!(get_mapping_type(&strings, &strings), MappingType::ArrayToArray);
    assert_eq!(get_mapping_type(&strings, &string()), MappingType::ArrayToSingleton);
    assert_eq!(get_mapping_type(&matrix, &strings), MappingType::ArrayToSingleton);
    assert_eq!(get_mapping_type(&record(), &record()), MappingType::ObjectToObject);
    assert_eq!(get_mapping_type(&string(), &record()), MappingType::ObjectToObject);
    assert_eq!(get_mapping_type(&string(), &string()), MappingType::Default);
    assert_eq!(get_mapping_type(&string(), &strings), MappingType::Default);

    assert!(!is_pending_mapping_required(MappingType::Default));
    assert!(is_pending_mapping_required(MappingType::ArrayToArray));
}

#[test]
fn test_available_choices() {
    assert_eq!(available_choices(MappingType::Default), &[MappingChoice::Direct]);
    assert!(available_choices(MappingType::ArrayToSingleton).contains(&MappingChoice::ExtractSingleton));
    assert!(!available_choices(MappingType::ArrayToArray).contains(&MappingChoice::ExtractSingleton));
    assert_eq!(MappingChoice::ElementWise.to_string(), "element-wise");
    assert_eq!(MappingType::ObjectToObject.to_string(), "object-to-object");
}

#[test]
fn test_direct_link_commits() {
    let (_, _, mut model) = build_model(empty_transform(), "transform");
    let mut machine = LinkStateMachine::new();
    let source = input_port(&model, "person.name");
    let target = output_port(&model, "fullName");

    assert_eq!(click(&mut machine, &mut model, source), Some(LinkOutcome::SourceSelected(source)));
    assert_eq!(machine.state(), InteractionState::CreateLink);
    let provisional = machine.provisional_link().unwrap();
    assert_eq!(model.link(provisional).unwrap().state, LinkState::Provisional);

    let outcome = click(&mut machine, &mut model, target);
    assert!(matches!(
        outcome,
        Some(LinkOutcome::Committed { source: s, target: t, .. }) if s == source && t == target
    ));
    assert_eq!(machine.state(), InteractionState::Default);
    assert!(machine.source_port().is_none());

    let events = model.drain_events();
    assert_eq!(events.first(), Some(&DiagramEvent::MappingStartedFrom(source)));
    assert!(events.contains(&DiagramEvent::MappingFinishedTo(target)));
}

#[test]
fn test_escape_restores_linking_on_linked_ports() {
    let (_, _, mut model) = build_model(mapped_transform(), "transform");
    let mut machine = LinkStateMachine::new();
    let source = input_port(&model, "person.name");
    let linked = output_port(&model, "fullName");
    let linked_before = model.port(source).unwrap().linked_ports.clone();

    click(&mut machine, &mut model, source);
    assert!(model.port(linked).unwrap().disable_new_linking);

    let outcome = machine.handle(&mut model, InteractionEvent::KeyDown(Key::Escape));
    assert_eq!(outcome, Some(LinkOutcome::Cancelled));
    assert!(!model.port(linked).unwrap().disable_new_linking);
    assert_eq!(model.port(source).unwrap().linked_ports, linked_before);
    assert_eq!(machine.state(), InteractionState::Default);
    assert!(model.links().all(|l| l.state == LinkState::Actual));
    assert!(model.drain_events().contains(&DiagramEvent::EnableNewLinking(linked)));

    // Linking works normally afterwards.
    let other = output_port(&model, "location.city");
    click(&mut machine, &mut model, source);
    let outcome = click(&mut machine, &mut model, other);
    assert!(matches!(outcome, Some(LinkOutcome::Committed { .. })));
    assert!(!model.port(linked).unwrap().disable_new_linking);
}

#[test]
fn test_escape_with_nothing_selected_is_ignored() {
    let (_, _, mut model) = build_model(empty_transform(), "transform");
    let mut machine = LinkStateMachine::new();
    assert_eq!(machine.handle(&mut model, InteractionEvent::KeyDown(Key::Escape)), None);
}

#[test]
fn test_already_linked_target_is_rejected() {
    let (_, _, mut model) = build_model(mapped_transform(), "transform");
    let mut machine = LinkStateMachine::new();
    let source = input_port(&model, "person.name");
    let target = output_port(&model, "fullName");

    click(&mut machine, &mut model, source);
    let outcome = click(&mut machine, &mut model, target);
    assert_eq!(outcome, Some(LinkOutcome::Rejected { source, target }));
    // The source stays selected.
    assert_eq!(machine.source_port(), Some(source));
}

#[test]
fn test_disabled_target_is_rejected() {
    let (_, _, mut model) = build_model(
        transform_with_body("    return {\n        location: person.address\n    };\n"),
        "transform",
    );
    let mut machine = LinkStateMachine::new();
    let source = input_port(&model, "person.name");
    let target = output_port(&model, "location.city");

    click(&mut machine, &mut model, source);
    assert_eq!(
        click(&mut machine, &mut model, target),
        Some(LinkOutcome::Rejected { source, target })
    );
}

#[test]
fn test_preview_source_cannot_start_a_link() {
    let (_, _, mut model) = build_model(empty_transform(), "transform");
    let mut machine = LinkStateMachine::new();
    let preview = input_port(&model, "person.tags.<fieldItem>");

    assert_eq!(click(&mut machine, &mut model, preview), None);
    assert_eq!(machine.state(), InteractionState::Default);
}

#[test]
fn test_clicking_the_source_again_deselects() {
    let (_, _, mut model) = build_model(empty_transform(), "transform");
    let mut machine = LinkStateMachine::new();
    let source = input_port(&model, "person.name");

    click(&mut machine, &mut model, source);
    assert_eq!(click(&mut machine, &mut model, source), Some(LinkOutcome::SourceDeselected(source)));
    assert_eq!(model.links().count(), 0);
}

#[test]
fn test_array_link_waits_for_a_choice() {
    let (_, _, mut model) = build_model(empty_transform(), "transform");
    let mut machine = LinkStateMachine::new();
    let source = input_port(&model, "person.tags");
    let target = output_port(&model, "labels");

    click(&mut machine, &mut model, source);
    let Some(LinkOutcome::Pending(pending)) = click(&mut machine, &mut model, target) else {
        panic!("expected a pending mapping");
    };
    assert_eq!(pending.mapping_type, MappingType::ArrayToArray);
    assert_eq!(machine.state(), InteractionState::PendingMapping);
    assert_eq!(
        model.link(pending.link).unwrap().state,
        LinkState::Pending(MappingType::ArrayToArray)
    );
    assert_eq!(model.port(target).unwrap().pending_mapping_type, Some(MappingType::ArrayToArray));
    assert_eq!(model.node(pending.target_node).unwrap().temporary_link, Some(pending.link));

    let taken = machine.take_pending(&mut model).unwrap();
    assert_eq!(taken, pending);
    assert!(model.link(pending.link).is_none());
    assert_eq!(model.port(target).unwrap().pending_mapping_type, None);
    assert_eq!(machine.state(), InteractionState::Default);
}

#[test]
fn test_pending_mapping_cancelled_by_escape() {
    let (_, _, mut model) = build_model(empty_transform(), "transform");
    let mut machine = LinkStateMachine::new();
    let source = input_port(&model, "person.address");
    let target = output_port(&model, "location");

    click(&mut machine, &mut model, source);
    let Some(LinkOutcome::Pending(pending)) = click(&mut machine, &mut model, target) else {
        panic!("expected a pending mapping");
    };
    assert_eq!(pending.mapping_type, MappingType::ObjectToObject);

    assert_eq!(
        machine.handle(&mut model, InteractionEvent::KeyDown(Key::Escape)),
        Some(LinkOutcome::Cancelled)
    );
    assert!(machine.pending().is_none());
    assert_eq!(model.links().count(), 0);
    assert!(model.node(pending.target_node).unwrap().temporary_link.is_none());
}

#[test]
fn test_canvas_click_cancels_link_creation() {
    let (_, _, mut model) = build_model(empty_transform(), "transform");
    let mut machine = LinkStateMachine::new();
    let source = input_port(&model, "person.name");
    click(&mut machine, &mut model, source);

    let outcome = machine.handle(&mut model, InteractionEvent::MouseUp(Target::Canvas));
    assert_eq!(outcome, Some(LinkOutcome::Cancelled));
    assert_eq!(model.links().count(), 0);
}

#[test]
fn test_canvas_drag() {
    let (_, _, mut model) = build_model(empty_transform(), "transform");
    let mut machine = LinkStateMachine::new();

    machine.handle(&mut model, InteractionEvent::MouseDown(Target::Canvas));
    assert_eq!(machine.state(), InteractionState::DragCanvas);
    machine.handle(&mut model, InteractionEvent::MouseUp(Target::Canvas));
    assert_eq!(machine.state(), InteractionState::Default);
}

#[test]
fn test_record_field_click_resolves_to_source_port() {
    let (_, _, mut model) = build_model(empty_transform(), "transform");
    let mut machine = LinkStateMachine::new();
    let outcome = machine.handle(
        &mut model,
        InteractionEvent::MouseUp(Target::RecordField("person.age".to_string())),
    );
    assert_eq!(outcome, Some(LinkOutcome::SourceSelected(input_port(&model, "person.age"))));
}

#[test]
fn test_expression_bar_focus_turns_clicks_into_text() {
    let (_, _, mut model) = build_model(empty_transform(), "transform");
    let mut machine = LinkStateMachine::new();
    machine.set_expression_bar_focused(true);
    let port = input_port(&model, "person.address.city");

    let outcome = click(&mut machine, &mut model, port);
    assert_eq!(
        outcome,
        Some(LinkOutcome::AddToExpression {
            port,
            text: "person.address.city".to_string()
        })
    );
    assert_eq!(machine.state(), InteractionState::Default);
}

#[test]
fn test_link_selection_toggles() {
    let (_, _, mut model) = build_model(mapped_transform(), "transform");
    let mut machine = LinkStateMachine::new();
    let link = model.links().next().unwrap().id;

    let select = InteractionEvent::MouseUp(Target::Link(link));
    assert_eq!(machine.handle(&mut model, select.clone()), Some(LinkOutcome::LinkSelected(link)));
    assert!(model.link(link).unwrap().selected);
    assert_eq!(machine.handle(&mut model, select), Some(LinkOutcome::LinkUnselected(link)));
    assert!(!model.link(link).unwrap().selected);
    assert!(machine.selected_link().is_none());
}
