//! Tests for loading `MapperConfig`.
use shazou::error::ConfigError;
use shazou::prelude::*;

#[test]
fn test_defaults() {
    let config = MapperConfig::default();
    assert_eq!(config.debounce_ms, 200);
    assert_eq!(config.indent_unit(), "    ");
    assert_eq!(config.custom_function_prefix, "map");
    assert!(config.concatenate_multiple_mappings);
}

#[test]
fn test_partial_json_keeps_defaults() {
    let config = MapperConfig::from_json(r#"{ "debounceMs": 50, "indentWidth": 2 }"#).unwrap();
    assert_eq!(config.debounce_ms, 50);
    assert_eq!(config.indent_unit(), "  ");
    assert_eq!(config.array_item_suffix, "Item");
}

#[test]
fn test_invalid_json_is_a_parse_error() {
    let result = MapperConfig::from_json(r#"{ "indentWidth": "wide" }"#);
    assert!(matches!(result, Err(ConfigError::Parse(_))));
}

#[test]
fn test_missing_file() {
    let result = MapperConfig::from_file("/nonexistent/shazou.json");
    let Err(ConfigError::Read { path, .. }) = result else {
        panic!("expected a read error");
    };
    assert_eq!(path, std::path::Path::new("/nonexistent/shazou.json"));
}

#[test]
fn test_reads_file() {
    let path = std::env::temp_dir().join(format!("shazou-config-{}.json", std::process::id()));
    std::fs::write(&path, r#"{ "concatenateMultipleMappings": false }"#).unwrap();
    let config = MapperConfig::from_file(&path).unwrap();
    std::fs::remove_file(&path).unwrap();
    assert!(!config.concatenate_multiple_mappings);
}
