use super::custom_fn::{custom_function_name, gen_custom_function};
use super::defaults::{default_value, generate_array_map_function, item_name, property_key};
use super::edit::{TextEdit, apply_edits, indent_continuation};
use crate::config::MapperConfig;
use crate::diagram::{DiagramModel, FocusedFunction, OutputSlot, Port, PortId};
use crate::error::MappingError;
use crate::source::{Expr, ExprKind, SourceFile, Span};
use crate::types::TypeKind;
use tracing::{debug, info};

/// Placeholder used to locate the insertion point of a preview.
const CURSOR_MARKER: &str = "__shazou_cursor__";

/// Turns mapping decisions into new source text.
///
/// Every operation returns `Ok(None)` when it would leave the text unchanged,
/// including when a port's value handle belongs to an older parse.
pub struct MappingEngine<'a> {
    source: &'a SourceFile,
    focus: &'a FocusedFunction,
    model: &'a DiagramModel,
    config: &'a MapperConfig,
}

impl<'a> MappingEngine<'a> {
    pub fn new(
        source: &'a SourceFile,
        focus: &'a FocusedFunction,
        model: &'a DiagramModel,
        config: &'a MapperConfig,
    ) -> Self {
        Self {
            source,
            focus,
            model,
            config,
        }
    }

    /// Writes `source` (or `rhs_override`) into `target`.
    ///
    /// Missing intermediate records are created, a missing `return` is
    /// scaffolded, and a second source on a string field is concatenated.
    pub fn create_source_for_mapping(
        &self,
        source: PortId,
        target: PortId,
        rhs_override: Option<&str>,
        suffix: Option<&str>,
    ) -> Result<Option<String>, MappingError> {
        let source_port = self.port(source)?;
        let rhs = match rhs_override {
            Some(rhs) => rhs.to_string(),
            None => format!("{}{}", source_port.field_fqn, suffix.unwrap_or("")),
        };
        let target_port = self.port(target)?;
        info!(source = %source_port.field_fqn, target = %target_port.field_fqn, "creating mapping");
        let Some(edits) = self.plan_value(target_port, &rhs, true)? else {
            return Ok(None);
        };
        self.commit(edits)
    }

    /// Replaces the target's expression with `text`, creating it if absent.
    pub fn update_existing_value(
        &self,
        target: PortId,
        text: &str,
    ) -> Result<Option<String>, MappingError> {
        let port = self.port(target)?;
        let Some(edits) = self.plan_value(port, text, false)? else {
            return Ok(None);
        };
        self.commit(edits)
    }

    /// Element-wise array mapping: `src.map((srcItem) => ({ ...defaults }))`.
    pub fn create_element_wise_mapping(
        &self,
        source: PortId,
        target: PortId,
    ) -> Result<Option<String>, MappingError> {
        let source_port = self.port(source)?;
        let target_port = self.port(target)?;
        let member = target_port.field.member_at_depth(1).ok_or_else(|| {
            MappingError::UnsupportedTarget {
                fqn: target_port.field_fqn.clone(),
                reason: "target is not an array".to_string(),
            }
        })?;
        let rhs = generate_array_map_function(
            &source_port.field_fqn,
            source_port.field.field_name(),
            member,
            self.config,
        );
        self.create_source_for_mapping(source, target, Some(&rhs), None)
    }

    /// Generates `map<Src>To<Tgt>`, appends it to the file and calls it from the target.
    pub fn gen_custom_function(
        &self,
        source: PortId,
        target: PortId,
    ) -> Result<Option<String>, MappingError> {
        let source_port = self.port(source)?;
        let target_port = self.port(target)?;
        let name = custom_function_name(
            &self.config.custom_function_prefix,
            &source_port.field,
            &target_port.field,
            &self.source.declared_names(),
        );
        let param = item_name(&source_port.field.type_label(), "");
        let declaration = gen_custom_function(
            &name,
            &param,
            &source_port.field,
            &target_port.field,
            self.config,
        );
        let call = format!("{name}({})", source_port.field_fqn);

        let Some(mut edits) = self.plan_value(target_port, &call, false)? else {
            return Ok(None);
        };
        let text = self.source.text();
        let separator = if text.ends_with('\n') { "\n" } else { "\n\n" };
        edits.push(TextEdit::insert(text.len(), format!("{separator}{declaration}")));
        debug!(function = %name, "generated custom mapping function");
        self.commit(edits)
    }

    /// Rewrites the predicate of a `.filter()` in front of the focused map callback.
    pub fn update_filter(&self, index: usize, text: &str) -> Result<Option<String>, MappingError> {
        let filter = self
            .focus
            .filters
            .iter()
            .find(|f| f.index == index)
            .ok_or_else(|| MappingError::PortNotFound(format!("filter #{index}")))?;
        let Some(span) = self.source.span_of(&filter.value) else {
            debug!(index, "filter handle is stale, skipping write");
            return Ok(None);
        };
        if self.source.slice(span).trim() == text.trim() {
            return Ok(None);
        }
        self.commit(vec![TextEdit::replace(span, text)])
    }

    /// Removes the target's entry from its enclosing literal.
    pub fn delete_mapping(&self, target: PortId) -> Result<Option<String>, MappingError> {
        let port = self.port(target)?;
        let Some(handle) = port.value else {
            return Ok(None);
        };
        let Some(expr) = self.source.expr_at(&handle) else {
            debug!(target = %port.field_fqn, "value handle is stale, skipping delete");
            return Ok(None);
        };

        let Some(parent) = port.parent.and_then(|p| self.model.port(p)) else {
            // The root keeps an empty scaffold in place of its value.
            let edit = TextEdit::replace(expr.span, default_value(&port.field));
            return self.commit(vec![edit]);
        };
        let (Some(entry), Some(parent_expr)) = (
            port.entry,
            parent.value.and_then(|h| self.source.expr_at(&h)),
        ) else {
            return Ok(None);
        };

        let Some(entries) = parent_expr.literal_entries() else {
            return Ok(None);
        };
        let Some(position) = entries.iter().position(|s| *s == entry) else {
            return Ok(None);
        };

        let removal = if entries.len() == 1 {
            let literal = parent_expr.skip_wrappers();
            let empty = if literal.as_array().is_some() { "[]" } else { "{}" };
            TextEdit::replace(literal.span, empty)
        } else if let Some(next) = entries.get(position + 1) {
            TextEdit::delete(Span::new(entry.start, next.start))
        } else {
            let previous = entries[position - 1];
            TextEdit::delete(Span::new(previous.end, entry.end))
        };
        info!(target = %port.field_fqn, "deleting mapping");
        self.commit(vec![removal])
    }

    /// Text after writing an empty value into `target`, and the offset the value would start at.
    pub fn preview_insertion(&self, target: PortId) -> Result<Option<(String, usize)>, MappingError> {
        let port = self.port(target)?;
        if let Some(handle) = port.value {
            return Ok(self
                .source
                .span_of(&handle)
                .map(|span| (self.source.text().to_string(), span.start)));
        }
        let Some(edits) = self.plan_value(port, CURSOR_MARKER, false)? else {
            return Ok(None);
        };
        let text = apply_edits(self.source.text(), edits)?;
        Ok(text
            .find(CURSOR_MARKER)
            .map(|offset| (text.replacen(CURSOR_MARKER, "", 1), offset)))
    }

    /// Combines a new source with the expression already in a string field.
    pub fn modify_source_for_multiple_mappings(
        &self,
        port: &Port,
        existing: &Expr,
        rhs: &str,
    ) -> Result<Option<Vec<TextEdit>>, MappingError> {
        let kind = port.field.effective().kind;
        if !self.config.concatenate_multiple_mappings
            || !matches!(kind, TypeKind::String | TypeKind::Any)
        {
            return Err(MappingError::IncompatibleMultipleMapping {
                target: port.field_fqn.clone(),
                type_name: port.field.type_text(),
            });
        }
        let mut operands = Vec::new();
        concat_operands(existing.skip_parens(), &mut operands);
        if operands
            .iter()
            .any(|o| self.source.slice(o.span).trim() == rhs.trim())
        {
            return Ok(None);
        }
        let current = self.source.slice(existing.span);
        Ok(Some(vec![TextEdit::replace(
            existing.span,
            format!("{current} + {rhs}"),
        )]))
    }

    /// Literal array element indexes on the path from the output root to `target`.
    pub fn get_field_indexes(&self, target: PortId) -> Vec<usize> {
        self.model
            .port_path(target)
            .iter()
            .filter_map(|p| p.field_index)
            .collect()
    }

    fn port(&self, id: PortId) -> Result<&'a Port, MappingError> {
        self.model
            .port(id)
            .ok_or_else(|| MappingError::PortNotFound(format!("#{}", id.0)))
    }

    fn commit(&self, edits: Vec<TextEdit>) -> Result<Option<String>, MappingError> {
        let text = apply_edits(self.source.text(), edits)?;
        if text == self.source.text() {
            return Ok(None);
        }
        Ok(Some(text))
    }

    fn plan_value(
        &self,
        port: &Port,
        rhs: &str,
        combine: bool,
    ) -> Result<Option<Vec<TextEdit>>, MappingError> {
        if port.is_disabled() {
            return Err(MappingError::TargetDisabled(port.field_fqn.clone()));
        }
        let Some(handle) = port.value else {
            return self.plan_insertion(port, rhs);
        };
        let Some(existing) = self.source.expr_at(&handle) else {
            debug!(target = %port.field_fqn, "value handle is stale, skipping write");
            return Ok(None);
        };
        let indent = self.source.line_indent(existing.span.start);
        let written = indent_continuation(rhs, indent);
        let current = self.source.slice(existing.span).trim();
        // Multi-line values are stored re-indented to their line.
        if current == rhs.trim() || current == written.trim() {
            return Ok(None);
        }
        if combine && !existing.is_mergeable() {
            return self.modify_source_for_multiple_mappings(port, existing, rhs);
        }
        Ok(Some(vec![TextEdit::replace(existing.span, written)]))
    }

    /// Writes a value for a field that has none, creating any missing ancestors.
    fn plan_insertion(&self, port: &Port, rhs: &str) -> Result<Option<Vec<TextEdit>>, MappingError> {
        let path = self.model.port_path(port.id);
        let Some((root, fields)) = path.split_first() else {
            return Ok(None);
        };

        let root_expr = match root.value {
            Some(handle) => match self.source.expr_at(&handle) {
                Some(expr) => expr,
                None => {
                    debug!(target = %port.field_fqn, "root handle is stale, skipping write");
                    return Ok(None);
                }
            },
            None => return self.plan_root_value(&self.nested_value(fields, rhs)),
        };

        let mut indexes = self.get_field_indexes(port.id).into_iter();
        let mut current = root_expr;
        for (depth, field) in fields.iter().enumerate() {
            if let Some(items) = current.as_array() {
                match indexes.next().and_then(|i| items.get(i)) {
                    Some(item) if item.is_mergeable() => {
                        current = item;
                        continue;
                    }
                    _ => return Err(self.unsupported(port, "array element has no literal value")),
                }
            }
            let Some(props) = current.as_object() else {
                return Err(self.unsupported(port, "an enclosing value is not an object literal"));
            };
            let name = field.field.field_name();
            match props.iter().rev().find(|p| p.key == name) {
                Some(prop) if prop.value.is_mergeable() => current = &prop.value,
                Some(_) => {
                    return Err(self.unsupported(port, "an enclosing field already has a value"));
                }
                None => {
                    let value = self.nested_value(&fields[depth + 1..], rhs);
                    return Ok(Some(vec![self.insert_property(current, name, &value)]));
                }
            }
        }
        Err(self.unsupported(port, "the field already exists"))
    }

    /// Value text for `fields[0]`: nested object literals down to `rhs`, relatively indented.
    fn nested_value(&self, fields: &[&Port], rhs: &str) -> String {
        match fields.split_first() {
            None => rhs.to_string(),
            Some((first, rest)) => {
                let unit = self.config.indent_unit();
                let inner = indent_continuation(&self.nested_value(rest, rhs), &unit);
                format!(
                    "{{\n{unit}{}: {inner}\n}}",
                    property_key(first.field.field_name())
                )
            }
        }
    }

    fn insert_property(&self, object: &Expr, key: &str, value: &str) -> TextEdit {
        let object = object.skip_wrappers();
        let entries = object.literal_entries().unwrap_or_default();
        let key = property_key(key);
        match entries.last() {
            Some(last) => {
                let single_line = self.source.line_col(last.start).line
                    == self.source.line_col(object.span.start).line;
                if single_line {
                    let indent = self.source.line_indent(object.span.start);
                    TextEdit::insert(
                        last.end,
                        format!(", {key}: {}", indent_continuation(value, indent)),
                    )
                } else {
                    let indent = self.source.line_indent(last.start);
                    TextEdit::insert(
                        last.end,
                        format!(",\n{indent}{key}: {}", indent_continuation(value, indent)),
                    )
                }
            }
            None => {
                let outer = self.source.line_indent(object.span.start).to_string();
                let inner = format!("{outer}{}", self.config.indent_unit());
                TextEdit::replace(
                    object.span,
                    format!(
                        "{{\n{inner}{key}: {}\n{outer}}}",
                        indent_continuation(value, &inner)
                    ),
                )
            }
        }
    }

    /// Writes the whole output value when the focused slot has none.
    fn plan_root_value(&self, value: &str) -> Result<Option<Vec<TextEdit>>, MappingError> {
        match self.focus.slot {
            OutputSlot::Return {
                return_stmt: Some(stmt),
                ..
            } => {
                let indent = self.source.line_indent(stmt.start);
                Ok(Some(vec![TextEdit::replace(
                    stmt,
                    format!("return {};", indent_continuation(value, indent)),
                )]))
            }
            OutputSlot::Return { body, .. } => {
                let outer = self.source.line_indent(body.start).to_string();
                let inner = format!("{outer}{}", self.config.indent_unit());
                let statement = format!("{inner}return {};\n", indent_continuation(value, &inner));
                let close = body.end.saturating_sub(1);
                let line_start = self
                    .source
                    .text()
                    .get(..close)
                    .and_then(|t| t.rfind('\n'))
                    .map(|i| i + 1);
                let own_line = line_start.is_some_and(|start| {
                    self.source.slice(Span::new(start, close)).trim().is_empty()
                });
                match line_start {
                    Some(start) if own_line => Ok(Some(vec![TextEdit::insert(start, statement)])),
                    _ => Ok(Some(vec![TextEdit::insert(
                        close,
                        format!("\n{statement}{outer}"),
                    )])),
                }
            }
            OutputSlot::ArrowExpr { value: span } => {
                let wrapped = if value.starts_with('{') {
                    format!("({value})")
                } else {
                    value.to_string()
                };
                let indent = self.source.line_indent(span.start);
                Ok(Some(vec![TextEdit::replace(
                    span,
                    indent_continuation(&wrapped, indent),
                )]))
            }
            OutputSlot::Local { decl, init: None } => {
                let text = self.source.slice(decl);
                let end = text.trim_end().trim_end_matches(';').len();
                let indent = self.source.line_indent(decl.start);
                Ok(Some(vec![TextEdit::insert(
                    decl.start + end,
                    format!(" = {}", indent_continuation(value, indent)),
                )]))
            }
            OutputSlot::Local {
                init: Some(span), ..
            } => {
                let indent = self.source.line_indent(span.start);
                Ok(Some(vec![TextEdit::replace(
                    span,
                    indent_continuation(value, indent),
                )]))
            }
        }
    }

    fn unsupported(&self, port: &Port, reason: &str) -> MappingError {
        MappingError::UnsupportedTarget {
            fqn: port.field_fqn.clone(),
            reason: reason.to_string(),
        }
    }
}

/// Flattens `a + b + c` into its operands.
fn concat_operands<'e>(expr: &'e Expr, out: &mut Vec<&'e Expr>) {
    match &expr.kind {
        ExprKind::Binary {
            left,
            operator,
            right,
        } if operator == "+" => {
            concat_operands(left.skip_parens(), out);
            concat_operands(right.skip_parens(), out);
        }
        _ => out.push(expr),
    }
}
