//! Suggestion catalog for interactive query editing.
//!
//! [`try_parse`] never fails: on malformed input it maps the parser's
//! expected-rule set through a static catalog and hands back completion
//! items plus the offending fragment, so an editor can drive autocomplete
//! straight off the error state.
//!
//! Catalog keys are the parser's lexical-rule names. `minS`/`maxS` (the
//! `stats` aggregates) and `minE`/`maxE` (the `eval` functions) are
//! distinct entries on purpose: they complete the same text but carry
//! different documentation.

use once_cell::sync::Lazy;
use splq_core::ast::Ast;
use splq_core::error::SyntaxError;
use std::collections::HashMap;

use crate::parser;

/// Broad category of a suggestion, for editor-side iconography.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionTag {
    Keyword,
    Function,
    Command,
    Operator,
    Value,
    Separator,
}

/// One completion item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct SuggestionItem {
    /// Lexical-rule name this item corresponds to.
    pub rule: &'static str,
    /// Text shown (and usually inserted) by the editor.
    pub label: &'static str,
    pub tag: SuggestionTag,
    pub description: &'static str,
    pub syntax: &'static str,
    pub example: &'static str,
    /// Recognized by the grammar but rejected by the translators.
    pub disabled: bool,
}

/// Outcome of [`try_parse`]: either an AST, or suggestions describing what
/// could come next at the point the parse stopped.
#[derive(Debug, Clone)]
pub struct ParseFeedback {
    pub ast: Option<Ast>,
    pub suggestions: Vec<SuggestionItem>,
    /// The input fragment at the failure position, `None` at end of input.
    pub found: Option<String>,
}

/// Parse with suggestion feedback instead of a hard error.
pub fn try_parse(input: &str) -> ParseFeedback {
    match parser::parse(input) {
        Ok(ast) => ParseFeedback {
            ast: Some(ast),
            suggestions: Vec::new(),
            found: None,
        },
        Err(err) => {
            let (suggestions, found) = feedback_for(&err);
            ParseFeedback {
                ast: None,
                suggestions,
                found,
            }
        }
    }
}

/// Suggestions for the farthest failure position of `input`. Empty when the
/// input parses cleanly.
pub fn get_suggestions(input: &str) -> (Vec<SuggestionItem>, Option<String>) {
    match parser::parse(input) {
        Ok(_) => (Vec::new(), None),
        Err(err) => feedback_for(&err),
    }
}

fn feedback_for(err: &SyntaxError) -> (Vec<SuggestionItem>, Option<String>) {
    let mut items = Vec::new();
    for expected in &err.expected {
        if let Some(item) = CATALOG.get(expected.rule.as_str()) {
            if !items.contains(item) {
                items.push(*item);
            }
        }
    }
    (items, err.found.clone())
}

macro_rules! entry {
    ($rule:literal, $label:literal, $tag:ident, $desc:literal, $syntax:literal, $example:literal) => {
        entry!($rule, $label, $tag, $desc, $syntax, $example, false)
    };
    ($rule:literal, $label:literal, $tag:ident, $desc:literal, $syntax:literal, $example:literal, $disabled:literal) => {
        (
            $rule,
            SuggestionItem {
                rule: $rule,
                label: $label,
                tag: SuggestionTag::$tag,
                description: $desc,
                syntax: $syntax,
                example: $example,
                disabled: $disabled,
            },
        )
    };
}

static CATALOG: Lazy<HashMap<&'static str, SuggestionItem>> = Lazy::new(|| {
    let entries = [
        entry!("space", " ", Separator, "Whitespace.", " ", "a=1 AND b=2"),
        entry!(
            "and",
            "AND",
            Operator,
            "Both conditions must match.",
            "<condition> AND <condition>",
            "level=error AND host=web1"
        ),
        entry!(
            "or",
            "OR",
            Operator,
            "Either condition may match.",
            "<condition> OR <condition>",
            "level=error OR level=warn"
        ),
        entry!(
            "not",
            "NOT",
            Operator,
            "Negates the following condition.",
            "NOT <condition>",
            "NOT level=debug"
        ),
        entry!(
            "to",
            "TO",
            Keyword,
            "Separates the two ends of a range.",
            "[<low> TO <high>]",
            "latency=[10 TO 200]"
        ),
        entry!(
            "search",
            "search",
            Keyword,
            "Starts a nested sub-search.",
            "(search <statement>)",
            "(search level=error | limit 10)"
        ),
        entry!(
            "_exists_",
            "_exists_",
            Keyword,
            "Matches events that carry the named field.",
            "_exists_=<field>",
            "_exists_=host"
        ),
        entry!(
            "stats",
            "stats",
            Command,
            "Aggregates events into statistics.",
            "| stats <aggregate>(<field>) [by <field>, ...]",
            "* | stats count(host) by level"
        ),
        entry!(
            "count",
            "count",
            Function,
            "Counts matching events.",
            "count(<field>)",
            "* | stats count(host)"
        ),
        entry!(
            "minS",
            "min",
            Function,
            "Smallest value of a numeric field.",
            "min(<field>)",
            "* | stats min(latency)"
        ),
        entry!(
            "maxS",
            "max",
            Function,
            "Largest value of a numeric field.",
            "max(<field>)",
            "* | stats max(latency)"
        ),
        entry!(
            "sum",
            "sum",
            Function,
            "Sum of a numeric field.",
            "sum(<field>)",
            "* | stats sum(bytes)"
        ),
        entry!(
            "avg",
            "avg",
            Function,
            "Average of a numeric field.",
            "avg(<field>)",
            "* | stats avg(latency)"
        ),
        entry!(
            "minE",
            "min",
            Function,
            "Smaller of two expressions.",
            "min(<expr>, <expr>)",
            "* | eval low=min(a, b)"
        ),
        entry!(
            "maxE",
            "max",
            Function,
            "Larger of two expressions.",
            "max(<expr>, <expr>)",
            "* | eval high=max(a, b)"
        ),
        entry!(
            "ceil",
            "ceil",
            Function,
            "Rounds up to the nearest integer.",
            "ceil(<expr>)",
            "* | eval n=ceil(latency / 1000)"
        ),
        entry!(
            "floor",
            "floor",
            Function,
            "Rounds down to the nearest integer.",
            "floor(<expr>)",
            "* | eval n=floor(latency / 1000)"
        ),
        entry!(
            "abs",
            "abs",
            Function,
            "Absolute value.",
            "abs(<expr>)",
            "* | eval n=abs(delta)"
        ),
        entry!(
            "evaluation",
            "eval",
            Command,
            "Computes a new field from an expression.",
            "| eval <newField>=<function>(<expr>)",
            "* | eval n=ceil(latency + 1)"
        ),
        entry!(
            "limit",
            "limit",
            Command,
            "Caps the number of returned events.",
            "| limit <n>",
            "* | limit 100"
        ),
        entry!(
            "head",
            "head",
            Command,
            "First n events.",
            "| head <n>",
            "* | head 10",
            true
        ),
        entry!(
            "tail",
            "tail",
            Command,
            "Last n events.",
            "| tail <n>",
            "* | tail 10",
            true
        ),
        entry!(
            "top",
            "top",
            Command,
            "Most frequent values of a field.",
            "| top <n> <field>",
            "* | top 10 host",
            true
        ),
        entry!(
            "rare",
            "rare",
            Command,
            "Least frequent values of a field.",
            "| rare <n> <field>",
            "* | rare 10 host",
            true
        ),
        entry!(
            "filter",
            "filter",
            Keyword,
            "Filters aggregation results by a metric.",
            "| filter <field> <op> <n>",
            "* | stats count(host) as c by host | filter c > 10"
        ),
        entry!(
            "fields",
            "fields",
            Command,
            "Restricts the returned source fields.",
            "| fields <field>, ...",
            "* | fields host, level"
        ),
        entry!(
            "table",
            "table",
            Command,
            "Renders selected fields as a table.",
            "| table <field>, ...",
            "* | table host, level",
            true
        ),
        entry!(
            "transaction",
            "transaction",
            Command,
            "Groups events into transactions.",
            "| transaction <field> [maxopentxn=<n>] [maxopenevents=<n>]",
            "* | transaction session maxopentxn=100",
            true
        ),
        entry!(
            "maxopentxn",
            "maxopentxn",
            Keyword,
            "Maximum number of open transactions.",
            "maxopentxn=<n>",
            "* | transaction session maxopentxn=100",
            true
        ),
        entry!(
            "maxopenevents",
            "maxopenevents",
            Keyword,
            "Maximum number of open events per transaction.",
            "maxopenevents=<n>",
            "* | transaction session maxopenevents=2000",
            true
        ),
        entry!(
            "sort_by",
            "sort by",
            Command,
            "Orders results by one or more fields.",
            "| sort by <field>[-|+], ...",
            "* | sort by _event_time-"
        ),
        entry!(
            "group_by",
            "by",
            Keyword,
            "Groups aggregation buckets by fields.",
            "by <field>, ...",
            "* | stats count(host) by level"
        ),
        entry!(
            "alias",
            "as",
            Keyword,
            "Names an aggregation result.",
            "<aggregate>(<field>) as <alias>",
            "* | stats count(host) as total"
        ),
        entry!(
            "pipe",
            "|",
            Separator,
            "Feeds results into the next stage.",
            "<stage> | <stage>",
            "* | stats count(host) | limit 10"
        ),
        entry!(
            "quote",
            "\"",
            Separator,
            "Delimits a quoted phrase.",
            "\"<text>\"",
            "\"connection refused\""
        ),
        entry!(
            "slash",
            "/",
            Separator,
            "Delimits a regular expression.",
            "/<pattern>/",
            "path=/api.*/"
        ),
        entry!("comma", ",", Separator, "List separator.", ", ", "* | fields a, b"),
        entry!(
            "regexp",
            "regexp",
            Value,
            "Regular expression pattern body.",
            "/<pattern>/",
            "path=/api.*/"
        ),
        entry!(
            "L_L_Bracket",
            "{",
            Separator,
            "Opens an exclusive range end.",
            "{<low> TO <high>}",
            "latency={10 TO 200}"
        ),
        entry!(
            "R_L_Bracket",
            "}",
            Separator,
            "Closes an exclusive range end.",
            "{<low> TO <high>}",
            "latency={10 TO 200}"
        ),
        entry!(
            "L_M_Bracket",
            "[",
            Separator,
            "Opens an inclusive range end.",
            "[<low> TO <high>]",
            "latency=[10 TO 200]"
        ),
        entry!(
            "R_M_Bracket",
            "]",
            Separator,
            "Closes an inclusive range end.",
            "[<low> TO <high>]",
            "latency=[10 TO 200]"
        ),
        entry!(
            "L_S_Bracket",
            "(",
            Separator,
            "Opens a grouped sub-query.",
            "(<query>)",
            "(a=1 OR b=2) AND c=3"
        ),
        entry!(
            "R_S_Bracket",
            ")",
            Separator,
            "Closes a grouped sub-query.",
            "(<query>)",
            "(a=1 OR b=2) AND c=3"
        ),
        entry!(
            "equal",
            "=",
            Operator,
            "Field equals value.",
            "<field>=<value>",
            "level=error"
        ),
        entry!(
            "greater_than",
            ">",
            Operator,
            "Metric greater than value.",
            "<field> > <n>",
            "| filter c > 10"
        ),
        entry!(
            "less_than",
            "<",
            Operator,
            "Metric less than value.",
            "<field> < <n>",
            "| filter c < 10"
        ),
        entry!("plus", "+", Operator, "Addition, or ascending sort.", "<expr> + <expr>", "* | eval n=ceil(a + 1)"),
        entry!("minus", "-", Operator, "Subtraction, or descending sort.", "<expr> - <expr>", "* | sort by ts-"),
        entry!("times", "*", Operator, "Multiplication.", "<expr> * <expr>", "* | eval n=ceil(a * 2)"),
        entry!("number", "number", Value, "Numeric literal.", "<n>", "latency=12.5"),
        entry!("integer", "integer", Value, "Whole-number literal.", "<n>", "* | limit 100"),
        entry!(
            "fieldName",
            "fieldName",
            Value,
            "Name of an event field.",
            "<field>",
            "level=error"
        ),
        entry!(
            "fieldValue",
            "fieldValue",
            Value,
            "Value to compare a field against.",
            "<field>=<value>",
            "level=error"
        ),
        entry!(
            "identifier",
            "identifier",
            Value,
            "Bare search keyword; wildcards allowed.",
            "<keyword>",
            "time*out"
        ),
    ];
    entries.into_iter().collect()
});
