use crate::types::DMType;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Shape relationship between a link's source and target fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MappingType {
    Default,
    ArrayToArray,
    ArrayToSingleton,
    ObjectToObject,
}

impl fmt::Display for MappingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MappingType::Default => write!(f, "default"),
            MappingType::ArrayToArray => write!(f, "array-to-array"),
            MappingType::ArrayToSingleton => write!(f, "array-to-singleton"),
            MappingType::ObjectToObject => write!(f, "object-to-object"),
        }
    }
}

/// Classifies a prospective mapping by array dimensions, then by record shape.
pub fn get_mapping_type(source: &DMType, target: &DMType) -> MappingType {
    let source_dims = source.dimensions();
    let target_dims = target.dimensions();

    if source_dims > 0 && source_dims == target_dims {
        MappingType::ArrayToArray
    } else if source_dims > target_dims {
        MappingType::ArrayToSingleton
    } else if source.is_record_like() || target.is_record_like() {
        MappingType::ObjectToObject
    } else {
        MappingType::Default
    }
}

pub fn is_pending_mapping_required(mapping_type: MappingType) -> bool {
    mapping_type != MappingType::Default
}

/// What the user picks from the pending-mapping menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MappingChoice {
    /// Assign the source expression as-is.
    Direct,
    /// `src.map(item => ...)` with default values for required fields.
    ElementWise,
    /// Take the first element, `src[0]`.
    ExtractSingleton,
    /// Generate a named conversion function and call it.
    CustomFunction,
}

impl fmt::Display for MappingChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MappingChoice::Direct => write!(f, "direct"),
            MappingChoice::ElementWise => write!(f, "element-wise"),
            MappingChoice::ExtractSingleton => write!(f, "singleton"),
            MappingChoice::CustomFunction => write!(f, "custom"),
        }
    }
}

pub fn available_choices(mapping_type: MappingType) -> &'static [MappingChoice] {
    match mapping_type {
        MappingType::Default => &[MappingChoice::Direct],
        MappingType::ArrayToArray => &[
            MappingChoice::Direct,
            MappingChoice::ElementWise,
            MappingChoice::CustomFunction,
        ],
        MappingType::ArrayToSingleton => {
            &[MappingChoice::ExtractSingleton, MappingChoice::CustomFunction]
        }
        MappingType::ObjectToObject => &[MappingChoice::Direct, MappingChoice::CustomFunction],
    }
}
