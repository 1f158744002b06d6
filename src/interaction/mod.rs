//! Pointer-driven link creation and mapping-type classification.
pub mod mapping_type;
pub mod state;

pub use mapping_type::{
    MappingChoice, MappingType, available_choices, get_mapping_type, is_pending_mapping_required,
};
pub use state::{
    InteractionEvent, InteractionState, Key, LinkOutcome, LinkStateMachine, PendingMapping, Target,
};
