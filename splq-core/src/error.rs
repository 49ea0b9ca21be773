//! Error taxonomy for parsing, checking and transpiling
//!
//! Every kind is fatal to the current call; no partial DSL or SPL output is
//! ever returned alongside an error. Only `try_parse` converts a
//! [`SyntaxError`] into suggestion feedback instead of surfacing it.

use crate::ast::FieldValueType;
use std::fmt;
use thiserror::Error;

/// A position in the input, in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Location {
    pub offset: usize,
    pub line: usize,
    pub column: usize,
}

/// One entry of the expected-token set attached to a syntax error.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ExpectedItem {
    /// Lexical-rule name, stable across releases; keys the suggestion
    /// catalog.
    pub rule: String,
    /// Human-readable description of the rule.
    pub description: String,
}

/// Malformed SPL input. Carries the farthest position reached, the set of
/// lexical rules that would have allowed the parse to continue there, and
/// the offending input fragment.
#[derive(Debug, Clone, PartialEq, Error, serde::Serialize, serde::Deserialize)]
pub struct SyntaxError {
    pub message: String,
    pub location: Location,
    pub expected: Vec<ExpectedItem>,
    pub found: Option<String>,
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "syntax error at line {}, column {}: {}",
            self.location.line, self.location.column, self.message
        )
    }
}

/// Type-catalog validation failures.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FieldTypeError {
    #[error("field \"{field}\" does not exist")]
    FieldNotFound { field: String },

    #[error("field \"{field}\" has no type information")]
    NoTypeInfo { field: String },

    #[error("field \"{field}\" cannot be used as {attempted}, allowed types: [{}]", format_types(.allowed))]
    TypeNotSupported {
        field: String,
        allowed: Vec<FieldValueType>,
        attempted: FieldValueType,
    },
}

fn format_types(types: &[FieldValueType]) -> String {
    types
        .iter()
        .map(|t| t.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// AST shapes the type checker refuses to walk. Deliberately stricter than
/// the transpilers: a new command needs both a resolver and a checker entry
/// before it passes here.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AstError {
    #[error("unsupported command for checking: {command}")]
    UnsupportedCommand { command: String },

    #[error("unsupported condition for checking: {condition}")]
    UnsupportedCondition { condition: String },
}

/// Condition variants the serializers cannot express.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConditionError {
    #[error("unsupported condition type: {condition}")]
    Unsupported { condition: String },

    #[error("time-typed field values cannot be serialized yet")]
    TimeNotImplemented,
}

/// Operation shapes the serializers cannot express.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OperationError {
    #[error("only statistic operations are supported")]
    NotStatistic,

    #[error("statistic requires at least one aggregate field")]
    EmptyAggregates,

    #[error("only a single aggregate field is supported, got {count}")]
    MultipleAggregates { count: usize },
}

/// Command variants the serializers cannot express.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CommandError {
    #[error("unsupported command for translation: {command}")]
    Unsupported { command: String },
}

/// Umbrella error for the public API.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SplError {
    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    #[error(transparent)]
    FieldType(#[from] FieldTypeError),

    #[error(transparent)]
    Ast(#[from] AstError),

    #[error(transparent)]
    Condition(#[from] ConditionError),

    #[error(transparent)]
    Operation(#[from] OperationError),

    #[error(transparent)]
    Command(#[from] CommandError),
}
