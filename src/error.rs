use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while parsing and lowering a TypeScript source file.
#[derive(Error, Debug, Clone)]
pub enum SourceError {
    #[error("Failed to initialise the TypeScript grammar: {0}")]
    LanguageInit(String),

    #[error("Parser produced no syntax tree for '{path}'")]
    ParseFailed { path: PathBuf },

    #[error("Function '{0}' was not found in the source file")]
    FunctionNotFound(String),

    #[error("Function '{name}' has no body to map into")]
    MissingBody { name: String },
}

/// Errors that can occur while turning a link or an edit into source text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MappingError {
    #[error("No port with field path '{0}' exists in the current diagram")]
    PortNotFound(String),

    #[error("Port '{0}' is disabled and cannot receive a new mapping")]
    TargetDisabled(String),

    #[error("Cannot write a value for '{fqn}': {reason}")]
    UnsupportedTarget { fqn: String, reason: String },

    #[error(
        "Field '{target}' of type '{type_name}' already has a value; several sources can only be combined for string targets"
    )]
    IncompatibleMultipleMapping { target: String, type_name: String },

    #[error("Edits overlap at byte offset {0}")]
    OverlappingEdits(usize),

    #[error("Edit at byte offset {0} falls outside the source text")]
    EditOutOfRange(usize),

    #[error("There is no pending mapping awaiting a decision")]
    NoPendingMapping,

    #[error("'{choice}' is not a valid way to resolve a {mapping_type} mapping")]
    InvalidChoice {
        choice: String,
        mapping_type: String,
    },
}

/// Failure reported by the external collaborator that persists edits.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApplyError {
    #[error("Modification was rejected: {0}")]
    Rejected(String),

    #[error("Failed to persist modification: {0}")]
    Io(String),
}

/// Failure reported by the external completion provider.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompletionError {
    #[error("Completion provider failed: {0}")]
    Provider(String),
}

/// Errors that can occur when loading a `MapperConfig`.
#[derive(Error, Debug, Clone)]
pub enum ConfigError {
    #[error("Could not read config file '{path}': {message}")]
    Read { path: PathBuf, message: String },

    #[error("Invalid config: {0}")]
    Parse(String),
}

/// Top-level error for session operations.
#[derive(Error, Debug, Clone)]
pub enum MapperError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Mapping(#[from] MappingError),

    #[error(transparent)]
    Apply(#[from] ApplyError),

    #[error(transparent)]
    Completion(#[from] CompletionError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("No view to navigate to: {0}")]
    ViewNotFound(String),
}
