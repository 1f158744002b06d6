use crate::config::MapperConfig;
use crate::diagram::focus::is_identifier;
use crate::types::{DMType, TypeKind};
use itertools::Itertools;

/// Placeholder value for a field of type `ty`.
pub fn default_value(ty: &DMType) -> String {
    let ty = ty.effective();
    match ty.kind {
        TypeKind::String => "\"\"".to_string(),
        TypeKind::Number => "0".to_string(),
        TypeKind::Boolean => "true".to_string(),
        TypeKind::Array => "[]".to_string(),
        TypeKind::Interface => "{}".to_string(),
        TypeKind::Literal => ty.literal.clone().unwrap_or_else(|| "null".to_string()),
        TypeKind::Null => "null".to_string(),
        TypeKind::Union => ty
            .union_types
            .iter()
            .find(|m| m.kind != TypeKind::Null)
            .map(default_value)
            .unwrap_or_else(|| "null".to_string()),
        TypeKind::Any | TypeKind::Unsupported => "{}".to_string(),
    }
}

/// An object literal with a default for every required field; optional fields are left out.
/// Lines after the first are indented relative to the line the literal starts on.
pub fn default_record(ty: &DMType, config: &MapperConfig) -> String {
    let unit = config.indent_unit();
    let fields = ty
        .required_fields()
        .map(|f| format!("{unit}{}: {}", property_key(f.field_name()), default_value(f)))
        .join(",\n");
    if fields.is_empty() {
        "{}".to_string()
    } else {
        format!("{{\n{fields}\n}}")
    }
}

/// `src.map((srcItem) => ...)` producing one default element of `target_member` per source element.
pub fn generate_array_map_function(
    source_fqn: &str,
    source_field_name: &str,
    target_member: &DMType,
    config: &MapperConfig,
) -> String {
    let item = item_name(source_field_name, &config.array_item_suffix);
    if target_member.is_record() {
        format!(
            "{source_fqn}.map(({item}) => ({}))",
            default_record(target_member, config)
        )
    } else {
        format!("{source_fqn}.map(({item}) => {})", default_value(target_member))
    }
}

/// Callback parameter name, e.g. `items` + `Item` gives `itemsItem`.
pub fn item_name(source_field_name: &str, suffix: &str) -> String {
    let base: String = source_field_name
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || *c == '$')
        .collect();
    let base = match base.chars().next() {
        Some(first) if first.is_ascii_digit() => format!("_{base}"),
        Some(_) => base,
        None => "element".to_string(),
    };
    let mut chars = base.chars();
    let lowered: String = chars
        .next()
        .map(|c| c.to_lowercase().chain(chars).collect())
        .unwrap_or_default();
    format!("{lowered}{suffix}")
}

/// Object literal key, quoted when it is not a valid identifier.
pub fn property_key(name: &str) -> String {
    if is_identifier(name) {
        name.to_string()
    } else {
        format!("\"{}\"", name.replace('"', "\\\""))
    }
}
