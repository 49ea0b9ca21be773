//! Reverse transpilation: AST → canonical SPL text.
//!
//! The output is normalized, not a reproduction of the original input:
//! strings are quoted, list separators carry no spaces, keywords are
//! canonical. `parse(reverse(ast))` yields `ast` back for every statement
//! both transpilers accept.

use splq_core::ast::{Ast, Command, Operation};
use splq_core::error::{CommandError, SplError};

use super::condition_expr;
use super::evaluation_expr;
use super::formatters::{escape, order_suffix};

/// Serialize a statement back to SPL.
pub fn reverse(ast: &Ast) -> Result<String, SplError> {
    let mut out = condition_expr::query_to_spl(&ast.query)?;
    for operation in &ast.operations {
        out.push_str(&reverse_operation(operation));
    }
    for command in &ast.commands {
        out.push_str(&reverse_command(command)?);
    }
    Ok(out)
}

fn reverse_operation(operation: &Operation) -> String {
    let Operation::Statistic(statistic) = operation;
    let Some(aggr) = statistic.fields.first() else {
        return String::new();
    };
    let mut out = format!(
        " | stats {}({})",
        aggr.aggr.as_str(),
        escape(&aggr.field_name)
    );
    if let Some(alias) = &aggr.alias {
        out.push_str(" as ");
        out.push_str(alias);
    }
    if !statistic.group_by.is_empty() {
        let names: Vec<String> = statistic
            .group_by
            .iter()
            .map(|group| escape(&group.field_name))
            .collect();
        out.push_str(" by ");
        out.push_str(&names.join(","));
    }
    out
}

fn reverse_command(command: &Command) -> Result<String, SplError> {
    Ok(match command {
        Command::Sort(fields) => {
            let rendered: Vec<String> = fields.iter().map(order_suffix).collect();
            format!(" | sort by {}", rendered.join(","))
        }
        Command::Limit(n) => format!(" | limit {n}"),
        Command::Fields(fields) => {
            let names: Vec<String> = fields
                .iter()
                .map(|field| escape(&field.field_name))
                .collect();
            format!(" | fields {}", names.join(","))
        }
        Command::Eval(eval) => format!(
            " | eval {}={}",
            escape(&eval.new_field_name),
            evaluation_expr::spl_source(eval)
        ),
        other => {
            return Err(CommandError::Unsupported {
                command: other.name().to_string(),
            }
            .into())
        }
    })
}
