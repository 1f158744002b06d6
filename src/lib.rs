//! # Shazou - Visual Data-Mapper Engine
//!
//! **Shazou** drives a visual data mapper for TypeScript: it reads a mapping
//! function, shows its parameters and return type as a diagram of record
//! fields, and turns links drawn between fields back into source code.
//!
//! ## Core Workflow
//!
//! The source file is the only state that persists. Every diagram is derived
//! from it, and every edit goes through it:
//!
//! 1.  **Parse**: `SourceFile::parse` reads the file with tree-sitter into an owned syntax model.
//! 2.  **Focus**: `FocusedFunction::resolve` picks the function (or nested `.map()` callback / local declaration) being edited.
//! 3.  **Build**: `DiagramBuilder` turns the input and output types, with the values already written, into ports, nodes and links.
//! 4.  **Interact**: `LinkStateMachine` follows pointer events until a link is complete or needs a mapping choice.
//! 5.  **Mutate**: `MappingEngine` produces the new file text, which a `ModificationSink` persists before everything is rebuilt.
//!
//! `MapperSession` composes these steps.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use shazou::prelude::*;
//! use shazou::diagram::PortDirection;
//!
//! struct Printer;
//!
//! #[async_trait::async_trait]
//! impl ModificationSink for Printer {
//!     async fn apply_modifications(
//!         &self,
//!         _path: &std::path::Path,
//!         text: String,
//!     ) -> std::result::Result<(), ApplyError> {
//!         println!("{text}");
//!         Ok(())
//!     }
//! }
//!
//! # async fn run() -> Result<()> {
//! let text = r#"
//! interface Person { name: string }
//! interface Employee { fullName: string }
//! function transform(person: Person): Employee {
//!     return {};
//! }
//! "#;
//! let source = SourceFile::parse("mapping.ts", text)?;
//! let mut session = MapperSession::open(source, "transform", MapperConfig::default(), Printer)?;
//!
//! // Click `person.name`, then `fullName`.
//! let from = session.model().exact_port(PortDirection::Out, "person.name").unwrap();
//! let to = session.model().exact_port(PortDirection::In, "fullName").unwrap();
//! session.handle_event(InteractionEvent::MouseUp(Target::Port(from))).await?;
//! session.handle_event(InteractionEvent::MouseUp(Target::Port(to))).await?;
//!
//! println!("{}", DiagramTree { model: session.model() });
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod diagram;
pub mod error;
pub mod expression_bar;
pub mod interaction;
pub mod mutation;
pub mod navigation;
pub mod prelude;
pub mod session;
pub mod source;
pub mod types;
