use super::defaults::{default_record, default_value};
use super::edit::indent_continuation;
use crate::config::MapperConfig;
use crate::types::DMType;
use ahash::AHashSet;

/// `map<Source>To<Target>`, suffixed `_1`, `_2`, ... until it is free.
pub fn custom_function_name(
    prefix: &str,
    source: &DMType,
    target: &DMType,
    taken: &AHashSet<String>,
) -> String {
    let base = format!("{prefix}{}To{}", source.type_label(), target.type_label());
    if !taken.contains(&base) {
        return base;
    }
    let mut counter = 1usize;
    loop {
        let candidate = format!("{base}_{counter}");
        if !taken.contains(&candidate) {
            return candidate;
        }
        counter += 1;
    }
}

/// Declaration text of a generated conversion function returning default values.
pub fn gen_custom_function(
    name: &str,
    param_name: &str,
    source: &DMType,
    target: &DMType,
    config: &MapperConfig,
) -> String {
    let unit = config.indent_unit();
    let value = if target.is_record() {
        default_record(target, config)
    } else {
        default_value(target)
    };
    format!(
        "function {name}({param_name}: {}): {} {{\n{unit}return {};\n}}\n",
        source.type_text(),
        target.type_text(),
        indent_continuation(&value, &unit)
    )
}
