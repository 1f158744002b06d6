//! Prelude module for convenient imports
//!
//! This module re-exports the most commonly used types and traits from the shazou crate.
//!
//! # Example
//!
//! ```rust,no_run
//! use shazou::prelude::*;
//!
//! # fn run_example() -> Result<()> {
//! let text = std::fs::read_to_string("path/to/mapping.ts")?;
//! let source = SourceFile::parse("path/to/mapping.ts", text)?;
//! let focus = FocusedFunction::resolve(&source, "transform", &ViewStack::new())?;
//! let model = DiagramBuilder::new(&source, &focus).build();
//!
//! println!("{}", DiagramTree { model: &model });
//! # Ok(())
//! # }
//! ```

// Source model and type trees
pub use crate::source::{NodeHandle, SourceFile, Span};
pub use crate::types::{DMType, DMTypeWithValue, TypeKind, TypeResolver, TypeWithValueBuilder, ValueType};

// Diagram
pub use crate::diagram::{
    DiagramBuilder, DiagramModel, DiagramSnapshot, DiagramTree, FocusedFunction, PortId, View,
    ViewStack, ViewState,
};

// Interaction and mutation
pub use crate::interaction::{
    InteractionEvent, Key, LinkOutcome, LinkStateMachine, MappingChoice, MappingType, Target,
    get_mapping_type,
};
pub use crate::mutation::{MappingEngine, ModificationSink};

// Expression bar and session
pub use crate::config::MapperConfig;
pub use crate::expression_bar::{CompletionProvider, CompletionRequest, CompletionResponse};
pub use crate::session::MapperSession;

// Error types
pub use crate::error::{ApplyError, CompletionError, MapperError, MappingError, SourceError};

// Result type alias for convenience
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;
