//! Abstract Syntax Tree types for SPLQ statements
//!
//! An SPLQ statement is a three-segment pipeline: a query, zero or more
//! operations (statistic aggregations) and zero or more post-processing
//! commands. The parser produces these types; both transpilers consume them
//! read-only.

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// FIELD TYPES
// ============================================================================

/// Value types a field reference can carry.
///
/// The type is inferred syntactically by the parser (quoted -> string,
/// numeric literal -> number, `/../` -> regexp, bracketed interval -> range)
/// and drives both name suffixing and value rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldValueType {
    String,
    Number,
    Regexp,
    Range,
    Time,
}

impl fmt::Display for FieldValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldValueType::String => "string",
            FieldValueType::Number => "number",
            FieldValueType::Regexp => "regexp",
            FieldValueType::Range => "range",
            FieldValueType::Time => "time",
        };
        f.write_str(name)
    }
}

/// A parsed field value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Num(f64),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(s) => f.write_str(s),
            FieldValue::Num(n) => f.write_str(&format_number(*n)),
        }
    }
}

/// Render a numeric value without a trailing `.0` for integral numbers.
///
/// `2.0` round-trips as `2`, which is what the grammar produced it from.
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.is_finite() && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// A field reference inside a condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub field_name: String,
    pub field_type: FieldValueType,
    pub field_value: Option<FieldValue>,
}

impl Field {
    pub fn new(
        name: impl Into<String>,
        field_type: FieldValueType,
        value: Option<FieldValue>,
    ) -> Self {
        Self {
            field_name: name.into(),
            field_type,
            field_value: value,
        }
    }

    /// Whether this is a system field (leading underscore). System fields
    /// bypass both type suffixing and catalog validation.
    pub fn is_system(&self) -> bool {
        self.field_name.starts_with('_')
    }
}

// ============================================================================
// QUERY SEGMENT
// ============================================================================

/// The query segment: condition groups connected by OR.
///
/// Invariant: at least one group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub groups: Vec<Group>,
}

/// A condition group: conditions connected by AND.
///
/// Invariant: at least one condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub conditions: Vec<Condition>,
}

/// A single predicate, optionally negated with NOT.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub node: ConditionNode,
    pub negated: bool,
}

impl Condition {
    pub fn new(node: ConditionNode) -> Self {
        Self {
            node,
            negated: false,
        }
    }

    pub fn negated(node: ConditionNode) -> Self {
        Self {
            node,
            negated: true,
        }
    }
}

/// The condition variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ConditionNode {
    /// Bare full-text token.
    SingleKeyword(String),
    /// Quoted phrase.
    UnionKeywords(String),
    /// Field comparison.
    KeyValue(Field),
    /// Parenthesized nested query.
    SubQuery(Query),
    /// Nested `search ...` sub-statement. Parse-only: neither transpiler
    /// nor the type checker accepts it.
    SubSearch(Box<Ast>),
}

impl ConditionNode {
    /// Variant name used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            ConditionNode::SingleKeyword(_) => "SingleKeyword",
            ConditionNode::UnionKeywords(_) => "UnionKeywords",
            ConditionNode::KeyValue(_) => "KeyValue",
            ConditionNode::SubQuery(_) => "SubQuery",
            ConditionNode::SubSearch(_) => "SubSearch",
        }
    }
}

// ============================================================================
// OPERATION SEGMENT
// ============================================================================

/// Aggregation functions available in `stats`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggrFunc {
    Count,
    Max,
    Min,
    Sum,
    Avg,
}

impl AggrFunc {
    pub fn as_str(&self) -> &'static str {
        match self {
            AggrFunc::Count => "count",
            AggrFunc::Max => "max",
            AggrFunc::Min => "min",
            AggrFunc::Sum => "sum",
            AggrFunc::Avg => "avg",
        }
    }
}

/// An aggregate field inside a statistic operation.
///
/// `field_type` is string for count and number for the numeric aggregates;
/// the parser sets it, the formatters rely on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggrField {
    pub field_name: String,
    pub field_type: FieldValueType,
    pub aggr: AggrFunc,
    pub alias: Option<String>,
    pub filter: Option<FilterField>,
}

impl AggrField {
    /// Plain field view, for the shared formatters.
    pub fn as_field(&self) -> Field {
        Field::new(self.field_name.clone(), self.field_type, None)
    }
}

/// Bucket ordering/limit attached to a group field. Parsed and carried but
/// not resolved into DSL output yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortLimits {
    /// Alias of the metric to order buckets by.
    pub fn_alias: String,
    /// Maximum number of buckets to emit, 0 for unlimited.
    pub size: u64,
}

/// A grouping dimension inside a statistic operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupField {
    pub field_name: String,
    pub field_type: FieldValueType,
    pub sort_limits: Option<SortLimits>,
}

impl GroupField {
    pub fn as_field(&self) -> Field {
        Field::new(self.field_name.clone(), self.field_type, None)
    }
}

/// A metric filter expression (`field = n`, `field > n`, `field < n`) used
/// by statistic before/after filters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterField {
    pub field_name: String,
    pub field_type: FieldValueType,
    pub field_value: FieldValue,
    pub operator: char,
}

/// The statistic operation payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statistic {
    pub fields: Vec<AggrField>,
    pub group_by: Vec<GroupField>,
    pub filters: Vec<FilterField>,
}

/// Result-shaping operation. Statistic aggregation is the only variant;
/// keeping the enum makes every consumer exhaustiveness-checked when more
/// arrive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Operation {
    Statistic(Statistic),
}

// ============================================================================
// COMMAND SEGMENT
// ============================================================================

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

/// A field in a `sort by` command. Order defaults to descending when absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortField {
    pub field_name: String,
    pub field_type: FieldValueType,
    pub order: Option<SortOrder>,
}

/// A plain field selection (fields/table/top/rare/transaction).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceField {
    pub field_name: String,
    pub field_type: FieldValueType,
}

/// Payload of `top`/`rare`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopRare {
    pub count: u64,
    pub field: SourceField,
}

/// Payload of `transaction`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub field: SourceField,
    pub max_open_txn: Option<u64>,
    pub max_open_events: Option<u64>,
}

/// Functions available in `eval`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvalFunc {
    Ceil,
    Floor,
    Abs,
    Max,
    Min,
}

impl EvalFunc {
    pub fn as_str(&self) -> &'static str {
        match self {
            EvalFunc::Ceil => "ceil",
            EvalFunc::Floor => "floor",
            EvalFunc::Abs => "abs",
            EvalFunc::Max => "max",
            EvalFunc::Min => "min",
        }
    }

    /// Binary functions take two expression arguments.
    pub fn is_binary(&self) -> bool {
        matches!(self, EvalFunc::Max | EvalFunc::Min)
    }
}

/// Arithmetic expression node for `eval`.
///
/// A `Seq` is a flat operand/operator run; a `Seq` nested inside another
/// `Seq` is a parenthesized sub-expression. Precedence is captured
/// structurally, not by arity: the parser only nests where the source was
/// parenthesized or where `*`/`/` bind tighter than `+`/`-`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EvalExpr {
    Field(Field),
    Number(String),
    Operator(char),
    Seq(Vec<EvalExpr>),
}

/// Payload of `eval`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub new_field_name: String,
    pub func: EvalFunc,
    pub n1: EvalExpr,
    pub n2: Option<EvalExpr>,
}

/// Post-processing command.
///
/// Head/Tail/Top/Rare/Table/Transaction parse but are rejected by both
/// transpilers and by the type checker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Command {
    Sort(Vec<SortField>),
    Limit(u64),
    Head(u64),
    Tail(u64),
    Top(TopRare),
    Rare(TopRare),
    Fields(Vec<SourceField>),
    Table(Vec<SourceField>),
    Transaction(Transaction),
    Eval(Evaluation),
}

impl Command {
    /// Command name used in SPL text and in error messages.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Sort(_) => "sort",
            Command::Limit(_) => "limit",
            Command::Head(_) => "head",
            Command::Tail(_) => "tail",
            Command::Top(_) => "top",
            Command::Rare(_) => "rare",
            Command::Fields(_) => "fields",
            Command::Table(_) => "table",
            Command::Transaction(_) => "transaction",
            Command::Eval(_) => "eval",
        }
    }
}

// ============================================================================
// STATEMENT ROOT
// ============================================================================

/// How a new condition is linked to an existing query by the builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConditionLinker {
    #[default]
    And,
    Or,
}

/// A full parsed SPLQ statement: query, operations, commands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ast {
    pub query: Query,
    pub operations: Vec<Operation>,
    pub commands: Vec<Command>,
}

impl Ast {
    /// A statement with only a query segment.
    pub fn from_query(query: Query) -> Self {
        Self {
            query,
            operations: Vec::new(),
            commands: Vec::new(),
        }
    }
}
