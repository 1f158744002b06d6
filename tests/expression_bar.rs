//! Tests for the expression bar: debouncing, shadow buffers and completions.
mod common;
use common::*;
use shazou::diagram::PortId;
use shazou::expression_bar::{
    CompletionEntry, CompletionResponse, Debouncer, ExpressionBar, ExpressionTarget, ShadowBuffer,
    filter_completions,
};
use shazou::prelude::*;
use shazou::source::Span;
use std::path::Path;
use std::time::{Duration, Instant};

fn response(entries: &[&str]) -> CompletionResponse {
    CompletionResponse {
        completions: entries
            .iter()
            .map(|e| CompletionEntry {
                entry: e.to_string(),
                details: String::new(),
            })
            .collect(),
    }
}

fn focused_bar(original: &str) -> ExpressionBar {
    let text = format!("const x = {original};");
    let shadow = ShadowBuffer::around(Path::new("mapping.ts"), &text, Span::new(10, 10 + original.len()));
    let mut bar = ExpressionBar::new(&MapperConfig::default());
    bar.focus(ExpressionTarget::Port(PortId(3)), original.to_string(), shadow);
    bar
}

#[test]
fn test_debouncer_keeps_only_the_latest_item() {
    let start = Instant::now();
    let mut debouncer = Debouncer::new(Duration::from_millis(200));

    assert_eq!(debouncer.schedule("a", start), None);
    assert_eq!(debouncer.schedule("b", start + Duration::from_millis(50)), Some("a"));
    assert_eq!(debouncer.poll(start + Duration::from_millis(200)), None);
    assert_eq!(debouncer.poll(start + Duration::from_millis(250)), Some("b"));
    assert!(!debouncer.is_pending());
}

#[test]
fn test_debouncer_cancel() {
    let start = Instant::now();
    let mut debouncer = Debouncer::new(Duration::from_millis(10));
    debouncer.schedule(1, start);
    assert_eq!(debouncer.deadline(), Some(start + Duration::from_millis(10)));
    assert!(debouncer.cancel());
    assert!(!debouncer.cancel());
    assert_eq!(debouncer.poll(start + Duration::from_secs(1)), None);
}

#[test]
fn test_debouncer_flush_skips_the_deadline() {
    let start = Instant::now();
    let mut debouncer = Debouncer::new(Duration::from_secs(60));
    debouncer.schedule("a", start);

    assert_eq!(debouncer.flush(), Some("a"));
    assert!(!debouncer.is_pending());
    assert_eq!(debouncer.flush(), None);
}

#[test]
fn test_shadow_buffer_splices_the_hole() {
    let shadow = ShadowBuffer::around(Path::new("m.ts"), "abc XYZ def", Span::new(4, 7));
    let request = shadow.splice("person.na", 9);

    assert_eq!(request.file_content, "abc person.na def");
    assert_eq!(request.cursor_position, 13);
    assert_eq!(request.file_path, Path::new("m.ts"));
}

#[test]
fn test_shadow_buffer_at_insertion() {
    let shadow = ShadowBuffer::at_insertion(Path::new("m.ts"), "f(, 1)".to_string(), 2);
    assert_eq!(shadow.hole(), Span::empty(2));
    let request = shadow.splice("a", 1);
    assert_eq!(request.file_content, "f(a, 1)");
    assert_eq!(request.cursor_position, 3);
}

#[test]
fn test_completions_are_filtered_by_prefix() {
    let entries = filter_completions(response(&["name", "Nickname", "NAMESPACE", "age"]), "person.na", 9);
    let names: Vec<&str> = entries.iter().map(|e| e.entry.as_str()).collect();
    assert_eq!(names, vec!["name", "NAMESPACE"]);

    let all = filter_completions(response(&["name", "age"]), "person.", 7);
    assert_eq!(all.len(), 2);
}

#[test]
fn test_input_is_debounced_into_one_request() {
    let start = Instant::now();
    let mut bar = focused_bar("person.name");

    bar.input("person.a", 8, start);
    bar.input("person.ag", 9, start + Duration::from_millis(100));
    assert!(bar.poll_request(start + Duration::from_millis(250)).is_none());

    let request = bar.poll_request(start + Duration::from_millis(300)).unwrap();
    assert_eq!(request.file_content, "const x = person.ag;");
    assert_eq!(request.cursor_position, 19);
    assert!(!bar.has_pending_request());
}

#[test]
fn test_flush_request_sends_the_latest_keystroke() {
    let start = Instant::now();
    let mut bar = focused_bar("person.name");
    bar.input("person.ag", 9, start);

    let request = bar.flush_request().unwrap();
    assert_eq!(request.file_content, "const x = person.ag;");
    assert!(bar.poll_request(start + Duration::from_secs(1)).is_none());
}

#[test]
fn test_insert_at_cursor() {
    let start = Instant::now();
    let mut bar = focused_bar("");
    bar.insert_at_cursor("person.age", start);
    bar.insert_at_cursor(" + 1", start);

    assert_eq!(bar.text(), Some("person.age + 1"));
    assert_eq!(bar.cursor(), Some(14));
}

#[test]
fn test_commit_returns_changed_text_only() {
    let mut unchanged = focused_bar("person.name");
    assert_eq!(unchanged.commit(), None);
    assert!(!unchanged.is_focused());

    let mut bar = focused_bar("person.name");
    bar.input("person.name.trim()", 18, Instant::now());
    let commit = bar.commit().unwrap();
    assert_eq!(commit.target, ExpressionTarget::Port(PortId(3)));
    assert_eq!(commit.text, "person.name.trim()");
    assert!(!bar.has_pending_request());
}

#[test]
fn test_cancel_restores_the_original() {
    let mut bar = focused_bar("person.name");
    bar.input("oops", 4, Instant::now());
    assert_eq!(bar.cancel(), Some("person.name".to_string()));
    assert!(!bar.is_focused());
}

#[test]
fn test_request_completions_from_provider() {
    let provider = FixedCompletions::new(vec!["age", "address", "name"]);
    let mut bar = focused_bar("person.name");
    let start = Instant::now();
    bar.input("person.a", 8, start);
    let request = bar.poll_request(start + Duration::from_millis(200)).unwrap();

    let entries: Vec<String> = tokio_test::block_on(bar.request_completions(&provider, request))
        .unwrap()
        .iter()
        .map(|e| e.entry.clone())
        .collect();
    assert_eq!(entries, vec!["age", "address"]);
    assert_eq!(bar.completions().len(), 2);

    let sent = provider.requests.lock().unwrap();
    assert_eq!(sent[0].file_content, "const x = person.a;");
}
