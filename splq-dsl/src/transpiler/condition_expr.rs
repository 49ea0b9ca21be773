//! Rendering of the query segment, in both directions.
//!
//! The two targets differ only in the key/value separator and in whether
//! field names carry their type suffix: the query-string side writes
//! `name_type:value`, the SPL side writes `name=value`. Value rendering is
//! identical (strings quoted, numbers bare, regexps slash-delimited,
//! ranges verbatim).

use splq_core::ast::{Condition, ConditionNode, Field, FieldValue, FieldValueType, Query};
use splq_core::error::ConditionError;

use super::formatters::{escape, typing};

#[derive(Clone, Copy, PartialEq, Eq)]
enum Target {
    /// Elasticsearch `query_string` syntax, typed field names.
    Dsl,
    /// Canonical SPL text, raw field names.
    Spl,
}

/// Render a query for the `query_string` clause.
pub fn query_to_dsl(query: &Query) -> Result<String, ConditionError> {
    render_query(query, Target::Dsl)
}

/// Render a query as canonical SPL.
pub fn query_to_spl(query: &Query) -> Result<String, ConditionError> {
    render_query(query, Target::Spl)
}

fn render_query(query: &Query, target: Target) -> Result<String, ConditionError> {
    let mut groups = Vec::with_capacity(query.groups.len());
    for group in &query.groups {
        let mut conditions = Vec::with_capacity(group.conditions.len());
        for condition in &group.conditions {
            conditions.push(render_condition(condition, target)?);
        }
        groups.push(conditions.join(" AND "));
    }
    Ok(groups.join(" OR "))
}

fn render_condition(condition: &Condition, target: Target) -> Result<String, ConditionError> {
    let body = match &condition.node {
        ConditionNode::SingleKeyword(token) => token.clone(),
        ConditionNode::UnionKeywords(phrase) => format!("\"{phrase}\""),
        ConditionNode::KeyValue(field) => render_key_value(field, target)?,
        ConditionNode::SubQuery(inner) => format!("({})", render_query(inner, target)?),
        ConditionNode::SubSearch(_) => {
            return Err(ConditionError::Unsupported {
                condition: condition.node.kind().to_string(),
            })
        }
    };
    if condition.negated {
        Ok(format!("NOT {body}"))
    } else {
        Ok(body)
    }
}

fn render_key_value(field: &Field, target: Target) -> Result<String, ConditionError> {
    let name = match target {
        Target::Dsl => escape(&typing(field)),
        Target::Spl => escape(&field.field_name),
    };
    let separator = match target {
        Target::Dsl => ':',
        Target::Spl => '=',
    };
    let value = match &field.field_value {
        Some(value) => value,
        None => {
            return Err(ConditionError::Unsupported {
                condition: "KeyValue without a value".to_string(),
            })
        }
    };
    let rendered = match field.field_type {
        FieldValueType::String => format!("\"{value}\""),
        FieldValueType::Number => value.to_string(),
        FieldValueType::Regexp => format!("/{value}/"),
        FieldValueType::Range => value.to_string(),
        FieldValueType::Time => return Err(ConditionError::TimeNotImplemented),
    };
    Ok(format!("{name}{separator}{rendered}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use splq_core::ast::Group;

    fn kv(name: &str, ty: FieldValueType, value: FieldValue) -> Condition {
        Condition::new(ConditionNode::KeyValue(Field::new(name, ty, Some(value))))
    }

    fn single(conditions: Vec<Condition>) -> Query {
        Query {
            groups: vec![Group { conditions }],
        }
    }

    #[test]
    fn dsl_uses_typed_names_and_colon() {
        let q = single(vec![kv(
            "level",
            FieldValueType::String,
            FieldValue::Text("error".to_string()),
        )]);
        assert_eq!(query_to_dsl(&q).unwrap(), "level_string:\"error\"");
        assert_eq!(query_to_spl(&q).unwrap(), "level=\"error\"");
    }

    #[test]
    fn numbers_and_ranges_render_bare() {
        let q = single(vec![
            kv("lat", FieldValueType::Number, FieldValue::Num(2.0)),
            kv(
                "lat",
                FieldValueType::Range,
                FieldValue::Text("[10 TO 20]".to_string()),
            ),
        ]);
        assert_eq!(
            query_to_dsl(&q).unwrap(),
            "lat_number:2 AND lat_number:[10 TO 20]"
        );
    }

    #[test]
    fn groups_join_with_or() {
        let q = Query {
            groups: vec![
                Group {
                    conditions: vec![kv("a", FieldValueType::Number, FieldValue::Num(1.0))],
                },
                Group {
                    conditions: vec![kv("b", FieldValueType::Number, FieldValue::Num(2.0))],
                },
            ],
        };
        assert_eq!(query_to_dsl(&q).unwrap(), "a_number:1 OR b_number:2");
    }

    #[test]
    fn negation_and_subquery() {
        let inner = single(vec![kv(
            "a",
            FieldValueType::Number,
            FieldValue::Num(1.0),
        )]);
        let q = single(vec![
            Condition::negated(ConditionNode::SubQuery(inner)),
            Condition::new(ConditionNode::SingleKeyword("*".to_string())),
        ]);
        assert_eq!(query_to_dsl(&q).unwrap(), "NOT (a_number:1) AND *");
    }

    #[test]
    fn system_fields_keep_raw_names_in_dsl() {
        let q = single(vec![kv(
            "_exists_",
            FieldValueType::String,
            FieldValue::Text("host".to_string()),
        )]);
        assert_eq!(query_to_dsl(&q).unwrap(), "_exists_:\"host\"");
    }

    #[test]
    fn time_type_is_rejected() {
        let q = single(vec![kv(
            "ts",
            FieldValueType::Time,
            FieldValue::Text("now".to_string()),
        )]);
        assert_eq!(
            query_to_dsl(&q),
            Err(ConditionError::TimeNotImplemented)
        );
    }

    #[test]
    fn sub_search_is_rejected() {
        use splq_core::ast::Ast;
        let inner = Ast::from_query(single(vec![Condition::new(
            ConditionNode::SingleKeyword("x".to_string()),
        )]));
        let q = single(vec![Condition::new(ConditionNode::SubSearch(Box::new(
            inner,
        )))]);
        assert!(matches!(
            query_to_dsl(&q),
            Err(ConditionError::Unsupported { .. })
        ));
    }
}
