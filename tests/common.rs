//! Common test utilities: TypeScript fixtures and in-memory collaborators.
use async_trait::async_trait;
use shazou::diagram::PortDirection;
use shazou::error::{ApplyError, CompletionError};
use shazou::expression_bar::{CompletionEntry, CompletionProvider, CompletionRequest, CompletionResponse};
use shazou::prelude::*;
use std::path::Path;
use std::sync::Mutex;

/// Record types shared by most fixtures.
#[allow(dead_code)]
pub const TYPES: &str = r#"interface Address {
    street: string;
    city: string;
}

interface Person {
    name: string;
    age: number;
    tags: string[];
    address: Address;
}

interface Location {
    city: string;
    zip?: string;
}

interface Employee {
    fullName: string;
    years: number;
    location: Location;
    labels: string[];
}
"#;

/// A mapping function over `Person -> Employee` with `body` as its block contents.
#[allow(dead_code)]
pub fn transform_with_body(body: &str) -> String {
    format!("{TYPES}\nexport function transform(person: Person): Employee {{\n{body}}}\n")
}

/// `transform` returning an empty object literal.
#[allow(dead_code)]
pub fn empty_transform() -> String {
    transform_with_body("    return {};\n")
}

/// `transform` with `fullName` already mapped from `person.name`.
#[allow(dead_code)]
pub fn mapped_transform() -> String {
    transform_with_body("    return {\n        fullName: person.name\n    };\n")
}

#[allow(dead_code)]
pub const ORDER_SOURCE: &str = r#"interface Item {
    id: string;
    qty: number;
}

interface Order {
    items: Item[];
}

interface Line {
    code: string;
    amount: number;
}

interface Invoice {
    lines: Line[];
}

export function toInvoice(order: Order): Invoice {
    return {
        lines: order.items.filter(i => i.qty > 0).map((item) => ({
            code: item.id
        }))
    };
}
"#;

#[allow(dead_code)]
pub fn parse(text: impl Into<String>) -> SourceFile {
    SourceFile::parse("mapping.ts", text).expect("fixture should parse")
}

/// Parses `text` and builds the root diagram of `function`.
#[allow(dead_code)]
pub fn build_model(text: impl Into<String>, function: &str) -> (SourceFile, FocusedFunction, DiagramModel) {
    let source = parse(text);
    let focus = FocusedFunction::resolve(&source, function, &ViewStack::new())
        .expect("function should resolve");
    let model = DiagramBuilder::new(&source, &focus).build();
    (source, focus, model)
}

#[allow(dead_code)]
pub fn input_port(model: &DiagramModel, fqn: &str) -> PortId {
    model
        .exact_port(PortDirection::Out, fqn)
        .unwrap_or_else(|| panic!("no input port {fqn}"))
}

#[allow(dead_code)]
pub fn output_port(model: &DiagramModel, fqn: &str) -> PortId {
    model
        .exact_port(PortDirection::In, fqn)
        .unwrap_or_else(|| panic!("no output port {fqn}"))
}

/// Keeps every modification in memory; optionally refuses them all.
#[derive(Default)]
pub struct RecordingSink {
    pub applied: Mutex<Vec<String>>,
    pub fail: bool,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn failing() -> Self {
        Self {
            applied: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn last(&self) -> Option<String> {
        self.applied.lock().unwrap().last().cloned()
    }

    pub fn count(&self) -> usize {
        self.applied.lock().unwrap().len()
    }
}

#[async_trait]
impl ModificationSink for RecordingSink {
    async fn apply_modifications(
        &self,
        _path: &Path,
        text: String,
    ) -> std::result::Result<(), ApplyError> {
        if self.fail {
            return Err(ApplyError::Rejected("read-only file".to_string()));
        }
        self.applied.lock().unwrap().push(text);
        Ok(())
    }
}

/// Answers every request with the same entries and remembers what it was asked.
#[allow(dead_code)]
pub struct FixedCompletions {
    pub entries: Vec<&'static str>,
    pub requests: Mutex<Vec<CompletionRequest>>,
}

#[allow(dead_code)]
impl FixedCompletions {
    pub fn new(entries: Vec<&'static str>) -> Self {
        Self {
            entries,
            requests: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl CompletionProvider for FixedCompletions {
    async fn completions(
        &self,
        request: CompletionRequest,
    ) -> std::result::Result<CompletionResponse, CompletionError> {
        self.requests.lock().unwrap().push(request);
        Ok(CompletionResponse {
            completions: self
                .entries
                .iter()
                .map(|e| CompletionEntry {
                    entry: e.to_string(),
                    details: String::new(),
                })
                .collect(),
        })
    }
}

/// Opens a session over `text` focused on `transform`.
#[allow(dead_code)]
pub fn open_session(text: impl Into<String>, sink: RecordingSink) -> MapperSession<RecordingSink> {
    MapperSession::open(parse(text), "transform", MapperConfig::default(), sink)
        .expect("session should open")
}
