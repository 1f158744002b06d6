use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Tunables for the mapping engine and the expression bar.
///
/// All keys are optional in the JSON form; missing keys take the defaults below.
///
/// ```json
/// { "debounceMs": 300, "indentWidth": 2 }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MapperConfig {
    /// Quiet period before a completion request is sent.
    pub debounce_ms: u64,
    /// Spaces per indentation level in generated code.
    pub indent_width: usize,
    /// Prefix of generated custom mapping functions (`map<Src>To<Tgt>`).
    pub custom_function_prefix: String,
    /// Suffix appended to a source field name to name a `.map()` callback parameter.
    pub array_item_suffix: String,
    /// Whether a second source dropped on a string field is concatenated onto the first.
    pub concatenate_multiple_mappings: bool,
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 200,
            indent_width: 4,
            custom_function_prefix: "map".to_string(),
            array_item_suffix: "Item".to_string(),
            concatenate_multiple_mappings: true,
        }
    }
}

impl MapperConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_json(&json)
    }

    /// One level of indentation as spaces.
    pub fn indent_unit(&self) -> String {
        " ".repeat(self.indent_width)
    }
}
