//! Forward transpilation: AST → Elasticsearch-style query DSL.

use splq_core::ast::{AggrFunc, Ast, Command, Operation, SortOrder, Statistic};
use splq_core::constants::{
    AGGR_MAX_SIZE, DEFAULT_FIELD, DEFAULT_PAGE_SIZE, EVENT_TIME, MAX_RECORD_SIZE,
};
use splq_core::error::{CommandError, OperationError, SplError};
use splq_core::es::{
    Aggregation, AggrKind, AggrTerm, EsQuery, QueryClause, QueryString, Script, ScriptField,
    SortEntry,
};
use std::collections::BTreeMap;

use super::condition_expr;
use super::evaluation_expr;
use super::formatters::{escape, strip_brackets, typing, typing_parts};

/// Build the full DSL document for a statement.
///
/// Starts from the fixed skeleton (query string on the default field, first
/// page, no source filter) and lets each operation and command rewrite its
/// slice of the document. Defaults that depend on the final state (sort,
/// size clamp) are applied last.
pub fn resolve(ast: &Ast) -> Result<EsQuery, SplError> {
    let query = condition_expr::query_to_dsl(&ast.query)?;
    let mut dsl = EsQuery {
        query: QueryClause {
            query_string: QueryString {
                query,
                default_field: DEFAULT_FIELD.to_string(),
            },
        },
        from: Some(0),
        size: Some(DEFAULT_PAGE_SIZE),
        source: Some(Vec::new()),
        aggs: None,
        sort: None,
        script_fields: None,
    };

    // Only the first operation shapes the output; later `| stats` segments
    // parse but never replace its aggregation.
    if let Some(operation) = ast.operations.first() {
        resolve_operation(&mut dsl, operation)?;
    }
    for command in &ast.commands {
        resolve_command(&mut dsl, command)?;
    }

    if dsl.sort.is_none() {
        dsl.sort = Some(vec![SortEntry {
            field: EVENT_TIME.to_string(),
            order: SortOrder::Desc,
            unmapped_type: "long",
        }]);
    }
    if let Some(size) = dsl.size {
        if size > MAX_RECORD_SIZE {
            dsl.size = Some(MAX_RECORD_SIZE);
        }
    }
    Ok(dsl)
}

fn resolve_operation(dsl: &mut EsQuery, operation: &Operation) -> Result<(), SplError> {
    let Operation::Statistic(statistic) = operation;
    dsl.aggs = Some(build_aggregation(statistic)?);
    Ok(())
}

/// Nest group buckets around the single metric aggregation, outermost
/// group first.
fn build_aggregation(statistic: &Statistic) -> Result<Aggregation, SplError> {
    if statistic.fields.is_empty() {
        return Err(OperationError::EmptyAggregates.into());
    }
    if statistic.fields.len() > 1 {
        return Err(OperationError::MultipleAggregates {
            count: statistic.fields.len(),
        }
        .into());
    }
    let aggr = &statistic.fields[0];
    let key = match &aggr.alias {
        Some(alias) => alias.clone(),
        None => format!(
            "{}({})",
            aggr.aggr.as_str(),
            strip_brackets(&aggr.field_name)
        ),
    };
    let metric = match aggr.aggr {
        // Counting buckets by value; the document count of each bucket is
        // the answer.
        AggrFunc::Count => Aggregation {
            key,
            kind: AggrKind::Terms,
            term: AggrTerm {
                field: escape(&aggr.field_name),
                size: Some(AGGR_MAX_SIZE),
            },
            aggs: None,
        },
        func => Aggregation {
            key,
            kind: match func {
                AggrFunc::Max => AggrKind::Max,
                AggrFunc::Min => AggrKind::Min,
                AggrFunc::Sum => AggrKind::Sum,
                _ => AggrKind::Avg,
            },
            term: AggrTerm {
                field: escape(&typing(&aggr.as_field())),
                size: None,
            },
            aggs: None,
        },
    };
    let mut aggregation = metric;
    for group in statistic.group_by.iter().rev() {
        aggregation = Aggregation {
            key: strip_brackets(&group.field_name),
            kind: AggrKind::Terms,
            term: AggrTerm {
                field: escape(&group.field_name),
                size: Some(AGGR_MAX_SIZE),
            },
            aggs: Some(Box::new(aggregation)),
        };
    }
    Ok(aggregation)
}

fn resolve_command(dsl: &mut EsQuery, command: &Command) -> Result<(), SplError> {
    match command {
        Command::Fields(fields) => {
            let mut source = vec![DEFAULT_FIELD.to_string(), EVENT_TIME.to_string()];
            for field in fields {
                source.push(escape(&typing_parts(&field.field_name, field.field_type)));
            }
            dsl.source = Some(source);
        }
        Command::Limit(n) => {
            dsl.size = Some(*n);
        }
        Command::Sort(fields) => {
            let entries = fields
                .iter()
                .map(|field| SortEntry {
                    field: escape(&typing_parts(&field.field_name, field.field_type)),
                    order: field.order.unwrap_or(SortOrder::Desc),
                    unmapped_type: "string",
                })
                .collect();
            dsl.sort = Some(entries);
        }
        Command::Eval(eval) => {
            let script_field = ScriptField {
                script: Script {
                    lang: "painless",
                    source: evaluation_expr::script_source(eval),
                },
            };
            dsl.script_fields
                .get_or_insert_with(BTreeMap::new)
                .insert(eval.new_field_name.clone(), script_field);
        }
        other => {
            return Err(CommandError::Unsupported {
                command: other.name().to_string(),
            }
            .into())
        }
    }
    Ok(())
}
