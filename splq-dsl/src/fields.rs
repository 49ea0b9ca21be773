//! Field and keyword extraction from SPL text.
//!
//! Walks a parsed statement and lists every field reference (with its
//! typed storage name and where in the statement it appeared) and every
//! full-text keyword. Editors use this for highlighting and for
//! catalog-backed validation hints.

use serde::Serialize;
use splq_core::ast::{
    Ast, Command, ConditionNode, EvalExpr, Field, FieldValueType, Operation, Query,
};
use splq_core::error::SplError;

use crate::parser;
use crate::transpiler::formatters::typing_parts;

/// Where in the statement a field reference appeared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FieldLocation {
    /// Query-segment condition.
    Condition,
    /// Aggregate argument of a statistic.
    StatisticAggr,
    /// Grouping dimension of a statistic.
    StatisticGroup,
    /// Post-processing command argument.
    Command,
}

impl FieldLocation {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldLocation::Condition => "query",
            FieldLocation::StatisticAggr => "statistic",
            FieldLocation::StatisticGroup => "statistic group",
            FieldLocation::Command => "command",
        }
    }
}

/// One recognized field reference.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecognizedField {
    pub field_name: String,
    pub field_type: FieldValueType,
    /// Typed storage name (`name_string`/`name_number`, system fields
    /// unchanged).
    pub format_name: String,
    pub location: FieldLocation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum KeywordKind {
    /// Bare token.
    Single,
    /// Quoted phrase.
    Union,
}

/// One recognized full-text keyword. Keywords only occur in the query
/// segment, so `location` is always [`FieldLocation::Condition`]; it is
/// carried anyway to keep the two extraction outputs uniform.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecognizedKeyword {
    pub keyword: String,
    pub kind: KeywordKind,
    pub location: FieldLocation,
}

/// All field references in an SPL statement, in source order.
pub fn recognize_fields(spl: &str) -> Result<Vec<RecognizedField>, SplError> {
    let ast = parser::parse(spl)?;
    let mut out = Vec::new();
    collect_fields(&ast, &mut out);
    Ok(out)
}

/// All full-text keywords in an SPL statement, in source order.
pub fn recognize_keywords(spl: &str) -> Result<Vec<RecognizedKeyword>, SplError> {
    let ast = parser::parse(spl)?;
    let mut out = Vec::new();
    collect_keywords(&ast.query, &mut out);
    Ok(out)
}

fn recognized(name: &str, field_type: FieldValueType, location: FieldLocation) -> RecognizedField {
    RecognizedField {
        field_name: name.to_string(),
        field_type,
        format_name: typing_parts(name, field_type),
        location,
    }
}

fn collect_fields(ast: &Ast, out: &mut Vec<RecognizedField>) {
    collect_query_fields(&ast.query, out);
    for operation in &ast.operations {
        let Operation::Statistic(statistic) = operation;
        for aggr in &statistic.fields {
            out.push(recognized(
                &aggr.field_name,
                aggr.field_type,
                FieldLocation::StatisticAggr,
            ));
        }
        for group in &statistic.group_by {
            out.push(recognized(
                &group.field_name,
                group.field_type,
                FieldLocation::StatisticGroup,
            ));
        }
    }
    for command in &ast.commands {
        collect_command_fields(command, out);
    }
}

fn collect_query_fields(query: &Query, out: &mut Vec<RecognizedField>) {
    for group in &query.groups {
        for condition in &group.conditions {
            match &condition.node {
                ConditionNode::KeyValue(field) => out.push(recognized(
                    &field.field_name,
                    field.field_type,
                    FieldLocation::Condition,
                )),
                ConditionNode::SubQuery(inner) => collect_query_fields(inner, out),
                ConditionNode::SubSearch(inner) => collect_fields(inner, out),
                ConditionNode::SingleKeyword(_) | ConditionNode::UnionKeywords(_) => {}
            }
        }
    }
}

fn collect_command_fields(command: &Command, out: &mut Vec<RecognizedField>) {
    let push = |out: &mut Vec<RecognizedField>, name: &str, ty: FieldValueType| {
        out.push(recognized(name, ty, FieldLocation::Command));
    };
    match command {
        Command::Sort(fields) => {
            for field in fields {
                push(out, &field.field_name, field.field_type);
            }
        }
        Command::Fields(fields) | Command::Table(fields) => {
            for field in fields {
                push(out, &field.field_name, field.field_type);
            }
        }
        Command::Top(tr) | Command::Rare(tr) => {
            push(out, &tr.field.field_name, tr.field.field_type);
        }
        Command::Transaction(txn) => {
            push(out, &txn.field.field_name, txn.field.field_type);
        }
        Command::Eval(eval) => {
            collect_expr_fields(&eval.n1, out);
            if let Some(n2) = &eval.n2 {
                collect_expr_fields(n2, out);
            }
        }
        Command::Limit(_) | Command::Head(_) | Command::Tail(_) => {}
    }
}

fn collect_expr_fields(expr: &EvalExpr, out: &mut Vec<RecognizedField>) {
    match expr {
        EvalExpr::Field(Field {
            field_name,
            field_type,
            ..
        }) => out.push(recognized(field_name, *field_type, FieldLocation::Command)),
        EvalExpr::Seq(items) => {
            for item in items {
                collect_expr_fields(item, out);
            }
        }
        EvalExpr::Number(_) | EvalExpr::Operator(_) => {}
    }
}

fn collect_keywords(query: &Query, out: &mut Vec<RecognizedKeyword>) {
    for group in &query.groups {
        for condition in &group.conditions {
            match &condition.node {
                ConditionNode::SingleKeyword(token) => out.push(RecognizedKeyword {
                    keyword: token.clone(),
                    kind: KeywordKind::Single,
                    location: FieldLocation::Condition,
                }),
                ConditionNode::UnionKeywords(phrase) => out.push(RecognizedKeyword {
                    keyword: phrase.clone(),
                    kind: KeywordKind::Union,
                    location: FieldLocation::Condition,
                }),
                ConditionNode::SubQuery(inner) => collect_keywords(inner, out),
                ConditionNode::SubSearch(inner) => collect_keywords(&inner.query, out),
                ConditionNode::KeyValue(_) => {}
            }
        }
    }
}
