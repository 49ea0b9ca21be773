//! Field-name formatting shared by both transpilers.
//!
//! Stored documents suffix every user field with its value type
//! (`host_string`, `latency_number`); system fields (leading underscore)
//! are stored under their own names. The suffix is derived from the
//! syntactic value type, so the same field can legally appear as both
//! `f_string` and `f_number` in one query.

use splq_core::ast::{Field, FieldValueType, SortField, SortOrder};

/// Typed storage name of a field: unchanged for system fields, otherwise
/// suffixed `_number` (numeric and range comparisons) or `_string`.
pub fn typing(field: &Field) -> String {
    typing_parts(&field.field_name, field.field_type)
}

pub fn typing_parts(name: &str, field_type: FieldValueType) -> String {
    if name.starts_with('_') {
        return name.to_string();
    }
    match field_type {
        FieldValueType::Number | FieldValueType::Range => format!("{name}_number"),
        _ => format!("{name}_string"),
    }
}

/// Backslash-escape literal brackets so bracketed path segments survive
/// the query-string syntax.
pub fn escape(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        if c == '[' || c == ']' {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Painless document accessor for a field: `doc['name_type'].value`.
pub fn docs(field: &Field) -> String {
    format!("doc['{}'].value", escape(&typing(field)))
}

/// Bracket-free label, used for aggregation keys.
pub fn strip_brackets(name: &str) -> String {
    name.chars().filter(|&c| c != '[' && c != ']').collect()
}

/// Sort field with its order marker: `name-` (desc), `name+` (asc), bare
/// when the input carried no marker.
pub fn order_suffix(field: &SortField) -> String {
    let name = escape(&field.field_name);
    match field.order {
        Some(SortOrder::Desc) => format!("{name}-"),
        Some(SortOrder::Asc) => format!("{name}+"),
        None => name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(name: &str, ty: FieldValueType) -> Field {
        Field::new(name, ty, None)
    }

    #[test]
    fn typing_suffixes_by_value_type() {
        assert_eq!(typing(&field("host", FieldValueType::String)), "host_string");
        assert_eq!(typing(&field("lat", FieldValueType::Number)), "lat_number");
        assert_eq!(typing(&field("lat", FieldValueType::Range)), "lat_number");
        assert_eq!(typing(&field("path", FieldValueType::Regexp)), "path_string");
    }

    #[test]
    fn system_fields_keep_their_names() {
        assert_eq!(
            typing(&field("_event_time", FieldValueType::Number)),
            "_event_time"
        );
        assert_eq!(typing(&field("_message", FieldValueType::String)), "_message");
    }

    #[test]
    fn escape_brackets() {
        assert_eq!(escape("a[0]"), "a\\[0\\]");
        assert_eq!(escape("plain"), "plain");
    }

    #[test]
    fn docs_accessor() {
        assert_eq!(
            docs(&field("lat", FieldValueType::Number)),
            "doc['lat_number'].value"
        );
    }

    #[test]
    fn strip_brackets_flattens_segments() {
        assert_eq!(strip_brackets("a[0]b"), "a0b");
    }

    #[test]
    fn order_suffix_markers() {
        let f = |order| SortField {
            field_name: "ts".to_string(),
            field_type: FieldValueType::String,
            order,
        };
        assert_eq!(order_suffix(&f(Some(SortOrder::Desc))), "ts-");
        assert_eq!(order_suffix(&f(Some(SortOrder::Asc))), "ts+");
        assert_eq!(order_suffix(&f(None)), "ts");
    }
}
