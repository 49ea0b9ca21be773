//! AST validation against an external field-type catalog.
//!
//! The catalog maps raw field names to the value types they may be
//! compared with. Checking is pure and fails on the first offending
//! field. System fields (leading underscore) are exempt: they are not
//! required to appear in the catalog and their types are never checked.
//!
//! The walk is deliberately stricter than the forward transpiler about
//! command coverage: a command the checker has no rule for is an
//! [`AstError`], so adding a command forces a decision here too.

use splq_core::ast::{
    Ast, Command, Condition, ConditionNode, EvalExpr, FieldValueType, Query,
};
use splq_core::error::{AstError, FieldTypeError, SplError};
use std::collections::HashMap;

/// Raw field name → allowed value types.
pub type TypeMapping = HashMap<String, Vec<FieldValueType>>;

/// Validate every field reference in `ast` against `mapping`. A `None`
/// mapping is an explicit opt-out and always passes.
pub fn type_check(mapping: Option<&TypeMapping>, ast: &Ast) -> Result<(), SplError> {
    let Some(mapping) = mapping else {
        return Ok(());
    };
    check_query(mapping, &ast.query)?;
    for operation in &ast.operations {
        let splq_core::ast::Operation::Statistic(statistic) = operation;
        for aggr in &statistic.fields {
            check_field(mapping, &aggr.field_name, aggr.field_type)?;
            if let Some(filter) = &aggr.filter {
                check_field(mapping, &filter.field_name, filter.field_type)?;
            }
        }
        for group in &statistic.group_by {
            check_field(mapping, &group.field_name, group.field_type)?;
        }
        for filter in &statistic.filters {
            check_field(mapping, &filter.field_name, filter.field_type)?;
        }
    }
    for command in &ast.commands {
        check_command(mapping, command)?;
    }
    Ok(())
}

fn check_query(mapping: &TypeMapping, query: &Query) -> Result<(), SplError> {
    for group in &query.groups {
        for condition in &group.conditions {
            check_condition(mapping, condition)?;
        }
    }
    Ok(())
}

fn check_condition(mapping: &TypeMapping, condition: &Condition) -> Result<(), SplError> {
    match &condition.node {
        ConditionNode::KeyValue(field) => check_field(mapping, &field.field_name, field.field_type),
        ConditionNode::SubQuery(inner) => check_query(mapping, inner),
        ConditionNode::SingleKeyword(_) | ConditionNode::UnionKeywords(_) => Ok(()),
        ConditionNode::SubSearch(_) => Err(AstError::UnsupportedCondition {
            condition: condition.node.kind().to_string(),
        }
        .into()),
    }
}

fn check_command(mapping: &TypeMapping, command: &Command) -> Result<(), SplError> {
    match command {
        Command::Sort(fields) => {
            for field in fields {
                check_field(mapping, &field.field_name, field.field_type)?;
            }
            Ok(())
        }
        Command::Fields(fields) => {
            for field in fields {
                check_field(mapping, &field.field_name, field.field_type)?;
            }
            Ok(())
        }
        Command::Eval(eval) => {
            check_eval_expr(mapping, &eval.n1)?;
            if let Some(n2) = &eval.n2 {
                check_eval_expr(mapping, n2)?;
            }
            Ok(())
        }
        Command::Limit(_) => Ok(()),
        other => Err(AstError::UnsupportedCommand {
            command: other.name().to_string(),
        }
        .into()),
    }
}

fn check_eval_expr(mapping: &TypeMapping, expr: &EvalExpr) -> Result<(), SplError> {
    match expr {
        EvalExpr::Field(field) => check_field(mapping, &field.field_name, field.field_type),
        EvalExpr::Seq(items) => {
            for item in items {
                check_eval_expr(mapping, item)?;
            }
            Ok(())
        }
        EvalExpr::Number(_) | EvalExpr::Operator(_) => Ok(()),
    }
}

fn check_field(
    mapping: &TypeMapping,
    name: &str,
    attempted: FieldValueType,
) -> Result<(), SplError> {
    if name.starts_with('_') {
        return Ok(());
    }
    let Some(allowed) = mapping.get(name) else {
        return Err(FieldTypeError::FieldNotFound {
            field: name.to_string(),
        }
        .into());
    };
    if allowed.is_empty() {
        return Err(FieldTypeError::NoTypeInfo {
            field: name.to_string(),
        }
        .into());
    }
    if !allowed.contains(&attempted) {
        return Err(FieldTypeError::TypeNotSupported {
            field: name.to_string(),
            allowed: allowed.clone(),
            attempted,
        }
        .into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn mapping(entries: &[(&str, &[FieldValueType])]) -> TypeMapping {
        entries
            .iter()
            .map(|(name, types)| (name.to_string(), types.to_vec()))
            .collect()
    }

    fn check(spl: &str, mapping: &TypeMapping) -> Result<(), SplError> {
        type_check(Some(mapping), &parse(spl).unwrap())
    }

    #[test]
    fn none_mapping_always_passes() {
        let ast = parse("anything=atall | table x").unwrap();
        assert!(type_check(None, &ast).is_ok());
    }

    #[test]
    fn unknown_field_is_rejected() {
        let m = mapping(&[("host", &[FieldValueType::String])]);
        assert!(check("host=web1", &m).is_ok());
        assert!(matches!(
            check("missing=1", &m),
            Err(SplError::FieldType(FieldTypeError::FieldNotFound { .. }))
        ));
    }

    #[test]
    fn empty_type_list_is_rejected() {
        let m = mapping(&[("host", &[])]);
        assert!(matches!(
            check("host=web1", &m),
            Err(SplError::FieldType(FieldTypeError::NoTypeInfo { .. }))
        ));
    }

    #[test]
    fn wrong_type_is_rejected_with_both_sides() {
        let m = mapping(&[("latency", &[FieldValueType::Number])]);
        assert!(check("latency=12", &m).is_ok());
        match check("latency=slow", &m) {
            Err(SplError::FieldType(FieldTypeError::TypeNotSupported {
                field,
                allowed,
                attempted,
            })) => {
                assert_eq!(field, "latency");
                assert_eq!(allowed, vec![FieldValueType::Number]);
                assert_eq!(attempted, FieldValueType::String);
            }
            other => panic!("expected type error, got {other:?}"),
        }
    }

    #[test]
    fn system_fields_are_exempt() {
        let m = mapping(&[]);
        assert!(check("_exists_=host AND _level=3", &m).is_ok());
        assert!(check("* | sort by _event_time-", &m).is_ok());
    }

    #[test]
    fn walks_subqueries_statistics_and_commands() {
        let m = mapping(&[
            ("a", &[FieldValueType::Number]),
            ("host", &[FieldValueType::String]),
            ("latency", &[FieldValueType::Number]),
        ]);
        assert!(check("(a=1 OR host=x) AND NOT a=2", &m).is_ok());
        assert!(check("* | stats max(latency) by host", &m).is_ok());
        assert!(check("* | eval v=ceil(latency+1)", &m).is_ok());
        assert!(matches!(
            check("(a=1 OR ghost=x)", &m),
            Err(SplError::FieldType(FieldTypeError::FieldNotFound { .. }))
        ));
        assert!(matches!(
            check("* | stats max(ghost)", &m),
            Err(SplError::FieldType(FieldTypeError::FieldNotFound { .. }))
        ));
    }

    #[test]
    fn aggregate_before_filter_fields_are_checked() {
        let m = mapping(&[
            ("latency", &[FieldValueType::Number]),
            ("code", &[FieldValueType::Number]),
        ]);
        assert!(check("* | stats max(latency [filter code = 200])", &m).is_ok());

        let m = mapping(&[("latency", &[FieldValueType::Number])]);
        assert!(matches!(
            check("* | stats max(latency [filter code = 200])", &m),
            Err(SplError::FieldType(FieldTypeError::FieldNotFound { .. }))
        ));
    }

    #[test]
    fn keywords_are_not_checked() {
        let m = mapping(&[]);
        assert!(check("somekeyword AND \"a phrase\"", &m).is_ok());
    }

    #[test]
    fn unsupported_commands_and_subsearch_fail_checking() {
        let m = mapping(&[("host", &[FieldValueType::String])]);
        assert!(matches!(
            check("* | top 10 host", &m),
            Err(SplError::Ast(AstError::UnsupportedCommand { .. }))
        ));
        assert!(matches!(
            check("(search host=x) AND host=y", &m),
            Err(SplError::Ast(AstError::UnsupportedCondition { .. }))
        ));
    }
}
