//! Tests for declared types and the values bound to them.
mod common;
use common::*;
use shazou::prelude::*;
use shazou::source::TypeNode;

const NESTED: &str = r#"interface Inner {
    c: number;
}

interface Outer {
    a: number;
    b: Inner;
}

function f(): Outer {
    return {a: 1, b: {c: 2}};
}

function g(): Outer {
    return {b: {c: 2}, a: 1};
}
"#;

fn output_tree(source: &SourceFile, function: &str) -> DMTypeWithValue {
    let focus = FocusedFunction::resolve(source, function, &ViewStack::new()).unwrap();
    let value = focus.output_value.as_ref().and_then(|h| source.expr_at(h));
    TypeWithValueBuilder::new(source).build(&focus.output_type, value)
}

#[test]
fn test_resolver_expands_interfaces() {
    let source = parse(empty_transform());
    let person = TypeResolver::new(source.module()).resolve_named("Person");

    assert_eq!(person.kind, TypeKind::Interface);
    assert_eq!(person.type_text(), "Person");
    let tags = person.field("tags").unwrap();
    assert_eq!(tags.dimensions(), 1);
    assert_eq!(tags.type_text(), "string[]");
    let city = person.field("address").unwrap().field("city").unwrap();
    assert_eq!(city.kind, TypeKind::String);
}

#[test]
fn test_optional_fields_are_not_required() {
    let source = parse(empty_transform());
    let location = TypeResolver::new(source.module()).resolve_named("Location");

    let required: Vec<&str> = location.required_fields().map(|f| f.field_name()).collect();
    assert_eq!(required, vec!["city"]);
    assert!(location.field("zip").unwrap().optional);
}

#[test]
fn test_nullable_union_resolves_to_its_member() {
    let source = parse(format!("{TYPES}\ntype MaybeAddress = Address | null;\n"));
    let resolver = TypeResolver::new(source.module());
    let maybe = resolver.resolve_named("MaybeAddress");

    assert_eq!(maybe.kind, TypeKind::Union);
    assert!(maybe.is_record());
    assert_eq!(maybe.effective().type_text(), "Address");
}

#[test]
fn test_self_reference_stops_expanding() {
    let source = parse("interface Node {\n    value: number;\n    next: Node;\n}\n");
    let node = TypeResolver::new(source.module()).resolve_named("Node");

    let next = node.field("next").unwrap();
    assert_eq!(next.type_text(), "Node");
    assert!(next.fields.is_empty());
}

#[test]
fn test_sibling_references_both_expand() {
    let source = parse(format!("{TYPES}\ninterface Move {{\n    from: Address;\n    to: Address;\n}}\n"));
    let moved = TypeResolver::new(source.module()).resolve_named("Move");

    assert_eq!(moved.field("from").unwrap().fields.len(), 2);
    assert_eq!(moved.field("to").unwrap().fields.len(), 2);
}

#[test]
fn test_unknown_reference_is_unsupported() {
    let source = parse("function f(): Map<string, number> {\n    return null;\n}\n");
    let resolver = TypeResolver::new(source.module());
    let ty = resolver.resolve(&TypeNode::Reference("Map".to_string()));
    assert_eq!(ty.kind, TypeKind::Unsupported);
}

#[test]
fn test_nested_value_span_is_found_by_fqn() {
    let source = parse(NESTED);
    let tree = output_tree(&source, "f");

    let c = tree.find_by_fqn("b.c").unwrap();
    assert_eq!(source.text_at(c.value.as_ref().unwrap()), Some("2"));
    assert_eq!(c.value_type, ValueType::NonEmpty);
    assert_eq!(tree.find_by_fqn("b").unwrap().value_type, ValueType::Mergeable);
}

#[test]
fn test_nested_value_span_ignores_property_order() {
    let source = parse(NESTED);
    let tree = output_tree(&source, "g");

    let c = tree.find_by_fqn("b.c").unwrap();
    assert_eq!(source.text_at(c.value.as_ref().unwrap()), Some("2"));
    let a = tree.find_by_fqn("a").unwrap();
    assert_eq!(source.text_at(a.value.as_ref().unwrap()), Some("1"));
}

#[test]
fn test_unwritten_fields_are_empty() {
    let source = parse(empty_transform());
    let tree = output_tree(&source, "transform");

    assert_eq!(tree.value_type, ValueType::Mergeable);
    let full_name = tree.find_by_fqn("fullName").unwrap();
    assert_eq!(full_name.value_type, ValueType::Empty);
    assert!(full_name.entry.is_none());
    assert!(!tree.descendant_has_value());
}

#[test]
fn test_array_literal_elements_are_indexed() {
    let source = parse(transform_with_body(
        "    return {\n        labels: [\"a\", person.name]\n    };\n",
    ));
    let tree = output_tree(&source, "transform");

    let labels = tree.find_by_fqn("labels").unwrap();
    assert_eq!(labels.elements.len(), 2);
    let second = tree.find_by_fqn("labels.1").unwrap();
    assert_eq!(source.text_at(second.value.as_ref().unwrap()), Some("person.name"));
    assert!(tree.descendant_has_value());
}

#[test]
fn test_type_labels_name_generated_functions() {
    let source = parse(empty_transform());
    let resolver = TypeResolver::new(source.module());

    assert_eq!(resolver.resolve_named("Address").type_label(), "Address");
    assert_eq!(resolver.resolve_named("Person").field("tags").unwrap().type_label(), "StringArr");
    assert_eq!(DMType::primitive(TypeKind::Number).type_label(), "Number");
}
