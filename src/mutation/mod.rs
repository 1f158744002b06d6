//! Source-text rewriting for mapping decisions.
pub mod custom_fn;
pub mod defaults;
pub mod edit;
pub mod engine;
pub mod sink;

pub use custom_fn::{custom_function_name, gen_custom_function};
pub use defaults::{default_record, default_value, generate_array_map_function};
pub use edit::{TextEdit, apply_edits};
pub use engine::MappingEngine;
pub use sink::ModificationSink;
