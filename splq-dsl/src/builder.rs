//! Programmatic query refinement.
//!
//! [`append`] links one more condition onto an existing SPL statement
//! without the caller doing any string surgery: the prior query is
//! wrapped as a parenthesized sub-query, so its own OR structure keeps
//! its meaning, and operations and commands ride along unchanged.

use splq_core::ast::{
    Ast, Condition, ConditionLinker, ConditionNode, Group, Query,
};
use splq_core::error::SplError;

use crate::parser;
use crate::transpiler::reverse;

/// The condition to append: a ready-made condition, a query to embed as a
/// sub-query, or SPL text whose query segment is embedded as a sub-query.
#[derive(Debug, Clone)]
pub enum AppendCondition {
    Condition(Condition),
    Query(Query),
    Text(String),
}

impl From<Condition> for AppendCondition {
    fn from(condition: Condition) -> Self {
        AppendCondition::Condition(condition)
    }
}

impl From<ConditionNode> for AppendCondition {
    fn from(node: ConditionNode) -> Self {
        AppendCondition::Condition(Condition::new(node))
    }
}

impl From<Query> for AppendCondition {
    fn from(query: Query) -> Self {
        AppendCondition::Query(query)
    }
}

impl From<&str> for AppendCondition {
    fn from(text: &str) -> Self {
        AppendCondition::Text(text.to_string())
    }
}

impl From<String> for AppendCondition {
    fn from(text: String) -> Self {
        AppendCondition::Text(text)
    }
}

/// Append `condition` to `spl` with the given linker and return the new
/// canonical SPL text.
///
/// A blank `spl` yields the condition on its own. Otherwise the existing
/// query becomes `(existing)` and the result is `(existing) AND cond` or
/// `(existing) OR cond`.
pub fn append(
    spl: &str,
    condition: impl Into<AppendCondition>,
    linker: ConditionLinker,
) -> Result<String, SplError> {
    let condition = prepare(condition.into())?;

    if spl.trim().is_empty() {
        let ast = Ast::from_query(Query {
            groups: vec![Group {
                conditions: vec![condition],
            }],
        });
        return reverse(&ast);
    }

    let mut ast = parser::parse(spl)?;
    let prior = Condition::new(ConditionNode::SubQuery(ast.query));
    ast.query = match linker {
        ConditionLinker::And => Query {
            groups: vec![Group {
                conditions: vec![prior, condition],
            }],
        },
        ConditionLinker::Or => Query {
            groups: vec![
                Group {
                    conditions: vec![prior],
                },
                Group {
                    conditions: vec![condition],
                },
            ],
        },
    };
    reverse(&ast)
}

fn prepare(condition: AppendCondition) -> Result<Condition, SplError> {
    Ok(match condition {
        AppendCondition::Condition(condition) => condition,
        AppendCondition::Query(query) => Condition::new(ConditionNode::SubQuery(query)),
        AppendCondition::Text(text) => {
            let ast = parser::parse(&text)?;
            Condition::new(ConditionNode::SubQuery(ast.query))
        }
    })
}
