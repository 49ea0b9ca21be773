//! Scannerless recursive-descent parser for SPLQ statements.
//!
//! Ordered choice with explicit backtracking (`mark`/`reset`), plus
//! farthest-failure tracking: every failed token attempt records its
//! lexical-rule name at the position it failed, and when the whole parse
//! fails the error carries the farthest position reached together with the
//! set of rules that would have allowed the parse to continue there. The
//! suggestion layer keys its catalog on those rule names, so they are part
//! of the public contract and must stay stable.

use splq_core::ast::{
    AggrField, AggrFunc, Ast, Command, Condition, ConditionNode, EvalExpr, EvalFunc, Evaluation,
    Field, FieldValue, FieldValueType, FilterField, Group, GroupField, Operation, Query,
    SortField, SortLimits, SortOrder, SourceField, Statistic, TopRare, Transaction,
};
use splq_core::error::{ExpectedItem, Location, SyntaxError};

/// Zero-sized failure marker; all diagnostic context lives in the parser
/// state, not in the error value.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Fail;

type PResult<T> = Result<T, Fail>;

/// Every lexical-rule name the parser can report in an expected set. The
/// suggestion catalog must cover all of these.
pub const RULE_NAMES: &[&str] = &[
    "space",
    "and",
    "or",
    "not",
    "to",
    "search",
    "_exists_",
    "stats",
    "count",
    "minS",
    "maxS",
    "sum",
    "avg",
    "minE",
    "maxE",
    "ceil",
    "floor",
    "abs",
    "evaluation",
    "limit",
    "head",
    "tail",
    "top",
    "rare",
    "filter",
    "fields",
    "table",
    "transaction",
    "maxopentxn",
    "maxopenevents",
    "sort_by",
    "group_by",
    "alias",
    "pipe",
    "quote",
    "slash",
    "comma",
    "regexp",
    "L_L_Bracket",
    "R_L_Bracket",
    "L_M_Bracket",
    "R_M_Bracket",
    "L_S_Bracket",
    "R_S_Bracket",
    "equal",
    "greater_than",
    "less_than",
    "plus",
    "minus",
    "times",
    "number",
    "integer",
    "fieldName",
    "fieldValue",
    "identifier",
];

/// Human-readable description of a lexical rule, used in syntax error
/// messages.
pub fn describe_rule(rule: &str) -> &'static str {
    match rule {
        "space" => "whitespace",
        "and" => "\"AND\"",
        "or" => "\"OR\"",
        "not" => "\"NOT\"",
        "to" => "\"TO\"",
        "search" => "\"search\"",
        "_exists_" => "\"_exists_\"",
        "stats" => "\"stats\"",
        "count" => "\"count\"",
        "minS" | "minE" => "\"min\"",
        "maxS" | "maxE" => "\"max\"",
        "sum" => "\"sum\"",
        "avg" => "\"avg\"",
        "ceil" => "\"ceil\"",
        "floor" => "\"floor\"",
        "abs" => "\"abs\"",
        "evaluation" => "\"eval\"",
        "limit" => "\"limit\"",
        "head" => "\"head\"",
        "tail" => "\"tail\"",
        "top" => "\"top\"",
        "rare" => "\"rare\"",
        "filter" => "\"filter\"",
        "fields" => "\"fields\"",
        "table" => "\"table\"",
        "transaction" => "\"transaction\"",
        "maxopentxn" => "\"maxopentxn\"",
        "maxopenevents" => "\"maxopenevents\"",
        "sort_by" => "\"sort by\"",
        "group_by" => "\"by\"",
        "alias" => "\"as\"",
        "pipe" => "\"|\"",
        "quote" => "\"\\\"\"",
        "slash" => "\"/\"",
        "comma" => "\",\"",
        "regexp" => "regular expression body",
        "L_L_Bracket" => "\"{\"",
        "R_L_Bracket" => "\"}\"",
        "L_M_Bracket" => "\"[\"",
        "R_M_Bracket" => "\"]\"",
        "L_S_Bracket" => "\"(\"",
        "R_S_Bracket" => "\")\"",
        "equal" => "\"=\"",
        "greater_than" => "\">\"",
        "less_than" => "\"<\"",
        "plus" => "\"+\"",
        "minus" => "\"-\"",
        "times" => "\"*\"",
        "number" => "number",
        "integer" => "integer",
        "fieldName" => "field name",
        "fieldValue" => "field value",
        "identifier" => "identifier",
        _ => "token",
    }
}

/// Parse an SPLQ statement into an [`Ast`].
pub fn parse(input: &str) -> Result<Ast, SyntaxError> {
    let mut parser = Parser::new(input);
    match parser.parse_spl() {
        Ok(ast) if parser.at_end() => Ok(ast),
        _ => Err(parser.syntax_error()),
    }
}

pub(crate) struct Parser {
    chars: Vec<char>,
    pos: usize,
    /// Farthest position any token attempt has failed at.
    farthest: usize,
    /// Rules that failed at `farthest`, in attempt order, deduplicated.
    expected: Vec<&'static str>,
}

impl Parser {
    pub(crate) fn new(input: &str) -> Self {
        Self {
            chars: input.chars().collect(),
            pos: 0,
            farthest: 0,
            expected: Vec::new(),
        }
    }

    // ========================================================================
    // PRIMITIVES
    // ========================================================================

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, ahead: usize) -> Option<char> {
        self.chars.get(self.pos + ahead).copied()
    }

    fn at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn mark(&self) -> usize {
        self.pos
    }

    fn reset(&mut self, mark: usize) {
        self.pos = mark;
    }

    /// Record a failed rule at the current position and return the marker.
    fn fail(&mut self, rule: &'static str) -> Fail {
        if self.pos > self.farthest {
            self.farthest = self.pos;
            self.expected.clear();
        }
        if self.pos == self.farthest && !self.expected.contains(&rule) {
            self.expected.push(rule);
        }
        Fail
    }

    fn eat_char(&mut self, c: char, rule: &'static str) -> PResult<()> {
        if self.peek() == Some(c) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.fail(rule))
        }
    }

    fn eat_keyword(&mut self, keyword: &str, rule: &'static str) -> PResult<()> {
        let mut j = self.pos;
        for c in keyword.chars() {
            if self.chars.get(j).copied() != Some(c) {
                return Err(self.fail(rule));
            }
            j += 1;
        }
        self.pos = j;
        Ok(())
    }

    fn is_space(c: char) -> bool {
        matches!(c, ' ' | '\t' | '\r' | '\n')
    }

    /// Zero or more whitespace characters. Records a `space` expectation at
    /// the stopping position, like a starred rule in a PEG would.
    fn skip_spaces0(&mut self) {
        while matches!(self.peek(), Some(c) if Self::is_space(c)) {
            self.pos += 1;
        }
        let _ = self.fail("space");
    }

    /// One or more whitespace characters.
    fn skip_spaces1(&mut self) -> PResult<()> {
        if !matches!(self.peek(), Some(c) if Self::is_space(c)) {
            return Err(self.fail("space"));
        }
        self.skip_spaces0();
        Ok(())
    }

    // ========================================================================
    // LEXICAL SCANNERS
    // ========================================================================

    /// Field name: starts with a letter, `@` or `_`; continues with
    /// letters, digits and `_`. Interior `-` is taken only when another
    /// name character follows, so a trailing `-` stays available as the
    /// descending-sort marker. Bracketed path segments (`a[0]`, `a[b]`)
    /// and backslash-escaped brackets are folded into the name; escaped
    /// brackets are stored unescaped and re-escaped on output.
    fn scan_field_name(&mut self) -> PResult<String> {
        let first = match self.peek() {
            Some(c) if c.is_ascii_alphabetic() || c == '@' || c == '_' => c,
            _ => return Err(self.fail("fieldName")),
        };
        self.pos += 1;
        let mut name = String::new();
        name.push(first);
        loop {
            match self.peek() {
                Some(c) if c.is_ascii_alphanumeric() || c == '_' => {
                    name.push(c);
                    self.pos += 1;
                }
                Some('-')
                    if matches!(self.peek_at(1), Some(c) if c.is_ascii_alphanumeric() || c == '_') =>
                {
                    name.push('-');
                    self.pos += 1;
                }
                Some('\\') if matches!(self.peek_at(1), Some('[') | Some(']')) => {
                    if let Some(bracket) = self.peek_at(1) {
                        name.push(bracket);
                    }
                    self.pos += 2;
                }
                Some('[') => {
                    // Only a plain [segment] belongs to the name; anything
                    // else (a range, a sort-limits block) starts a new token.
                    let mut j = self.pos + 1;
                    let seg_start = j;
                    while matches!(
                        self.chars.get(j).copied(),
                        Some(c) if c.is_ascii_alphanumeric() || c == '_'
                    ) {
                        j += 1;
                    }
                    if j > seg_start && self.chars.get(j).copied() == Some(']') {
                        name.push('[');
                        name.extend(self.chars[seg_start..j].iter());
                        name.push(']');
                        self.pos = j + 1;
                    } else {
                        break;
                    }
                }
                _ => break,
            }
        }
        Ok(name)
    }

    fn is_identifier_char(c: char) -> bool {
        c.is_ascii_alphanumeric()
            || matches!(c, '.' | '_' | '@' | '?' | '*')
            || ('\u{4e00}'..='\u{ffff}').contains(&c)
    }

    /// Bare keyword token; wildcards and CJK allowed.
    fn scan_identifier(&mut self) -> PResult<String> {
        let mut ident = String::new();
        while matches!(self.peek(), Some(c) if Self::is_identifier_char(c)) {
            if let Some(c) = self.peek() {
                ident.push(c);
            }
            self.pos += 1;
        }
        if ident.is_empty() {
            return Err(self.fail("identifier"));
        }
        Ok(ident)
    }

    /// Double-quoted string; the body may be empty and may contain spaces.
    fn scan_quoted(&mut self) -> PResult<String> {
        self.eat_char('"', "quote")?;
        let mut body = String::new();
        while matches!(self.peek(), Some(c) if c != '"') {
            if let Some(c) = self.peek() {
                body.push(c);
            }
            self.pos += 1;
        }
        self.eat_char('"', "quote")?;
        Ok(body)
    }

    /// Unquoted field value: anything up to whitespace or a parenthesis.
    fn scan_bare_value(&mut self) -> PResult<String> {
        let mut value = String::new();
        loop {
            match self.peek() {
                Some(c) if Self::is_space(c) || c == '(' || c == ')' => break,
                Some(c) => {
                    value.push(c);
                    self.pos += 1;
                }
                None => break,
            }
        }
        if value.is_empty() {
            return Err(self.fail("fieldValue"));
        }
        Ok(value)
    }

    /// Numeric literal text, optional leading minus and fraction.
    fn scan_number(&mut self) -> PResult<String> {
        let start = self.pos;
        let mut text = String::new();
        if self.peek() == Some('-') {
            text.push('-');
            self.pos += 1;
        }
        let mut saw_digit = false;
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            if let Some(c) = self.peek() {
                text.push(c);
            }
            self.pos += 1;
            saw_digit = true;
        }
        if !saw_digit {
            self.reset(start);
            return Err(self.fail("number"));
        }
        if self.peek() == Some('.') && matches!(self.peek_at(1), Some(c) if c.is_ascii_digit()) {
            text.push('.');
            self.pos += 1;
            while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                if let Some(c) = self.peek() {
                    text.push(c);
                }
                self.pos += 1;
            }
        }
        Ok(text)
    }

    fn scan_integer(&mut self) -> PResult<u64> {
        let mut value: u64 = 0;
        let mut any = false;
        while let Some(d) = self.peek().and_then(|c| c.to_digit(10)) {
            value = value.saturating_mul(10).saturating_add(u64::from(d));
            any = true;
            self.pos += 1;
        }
        if !any {
            return Err(self.fail("integer"));
        }
        Ok(value)
    }

    // ========================================================================
    // STATEMENT
    // ========================================================================

    /// `SPL = Query Operation* Command*`. Does not require end of input;
    /// the public entry point checks that, so sub-searches can reuse this.
    fn parse_spl(&mut self) -> PResult<Ast> {
        let query = self.parse_query()?;
        let mut operations = Vec::new();
        let mut commands = Vec::new();
        loop {
            let m = self.mark();
            self.skip_spaces0();
            if self.eat_char('|', "pipe").is_err() {
                self.reset(m);
                break;
            }
            self.skip_spaces0();
            if commands.is_empty() {
                let seg = self.mark();
                match self.parse_statistic() {
                    Ok(op) => {
                        operations.push(op);
                        continue;
                    }
                    Err(_) => self.reset(seg),
                }
            }
            commands.push(self.parse_command()?);
        }
        Ok(Ast {
            query,
            operations,
            commands,
        })
    }

    // ========================================================================
    // QUERY SEGMENT
    // ========================================================================

    fn parse_query(&mut self) -> PResult<Query> {
        let mut groups = vec![self.parse_group()?];
        loop {
            let m = self.mark();
            if self.skip_spaces1().is_err() || self.eat_keyword("OR", "or").is_err() {
                self.reset(m);
                break;
            }
            if self.skip_spaces1().is_err() {
                self.reset(m);
                break;
            }
            match self.parse_group() {
                Ok(group) => groups.push(group),
                Err(_) => {
                    self.reset(m);
                    break;
                }
            }
        }
        Ok(Query { groups })
    }

    fn parse_group(&mut self) -> PResult<Group> {
        let mut conditions = vec![self.parse_condition()?];
        loop {
            let m = self.mark();
            if self.skip_spaces1().is_err() || self.eat_keyword("AND", "and").is_err() {
                self.reset(m);
                break;
            }
            if self.skip_spaces1().is_err() {
                self.reset(m);
                break;
            }
            match self.parse_condition() {
                Ok(condition) => conditions.push(condition),
                Err(_) => {
                    self.reset(m);
                    break;
                }
            }
        }
        Ok(Group { conditions })
    }

    fn parse_condition(&mut self) -> PResult<Condition> {
        let mut negated = false;
        let m = self.mark();
        if self.eat_keyword("NOT", "not").is_ok() && self.skip_spaces1().is_ok() {
            negated = true;
        } else {
            self.reset(m);
        }

        let m = self.mark();
        if let Ok(node) = self.parse_paren_condition() {
            return Ok(Condition { node, negated });
        }
        self.reset(m);
        if let Ok(node) = self.parse_exists() {
            return Ok(Condition { node, negated });
        }
        self.reset(m);
        if let Ok(node) = self.parse_key_value() {
            return Ok(Condition { node, negated });
        }
        self.reset(m);
        let node = self.parse_keyword()?;
        Ok(Condition { node, negated })
    }

    /// `( search SPL )` or `( Query )`.
    fn parse_paren_condition(&mut self) -> PResult<ConditionNode> {
        self.eat_char('(', "L_S_Bracket")?;
        self.skip_spaces0();

        let m = self.mark();
        if self.eat_keyword("search", "search").is_ok() && self.skip_spaces1().is_ok() {
            if let Ok(ast) = self.parse_spl() {
                self.skip_spaces0();
                if self.eat_char(')', "R_S_Bracket").is_ok() {
                    return Ok(ConditionNode::SubSearch(Box::new(ast)));
                }
            }
        }
        self.reset(m);

        let query = self.parse_query()?;
        self.skip_spaces0();
        self.eat_char(')', "R_S_Bracket")?;
        Ok(ConditionNode::SubQuery(query))
    }

    fn parse_exists(&mut self) -> PResult<ConditionNode> {
        self.eat_keyword("_exists_", "_exists_")?;
        self.skip_spaces0();
        self.eat_char('=', "equal")?;
        self.skip_spaces0();
        let m = self.mark();
        let value = match self.scan_quoted() {
            Ok(body) => body,
            Err(_) => {
                self.reset(m);
                self.scan_identifier()?
            }
        };
        Ok(ConditionNode::KeyValue(Field::new(
            "_exists_",
            FieldValueType::String,
            Some(FieldValue::Text(value)),
        )))
    }

    fn parse_key_value(&mut self) -> PResult<ConditionNode> {
        let field_name = self.scan_field_name()?;
        self.skip_spaces0();
        self.eat_char('=', "equal")?;
        self.skip_spaces0();

        // Value alternatives, in grammar order: quoted string, regexp,
        // range, bare value (number or text).
        let m = self.mark();
        if let Ok(body) = self.scan_quoted() {
            return Ok(ConditionNode::KeyValue(Field::new(
                field_name,
                FieldValueType::String,
                Some(FieldValue::Text(body)),
            )));
        }
        self.reset(m);

        if self.eat_char('/', "slash").is_ok() {
            let mut pattern = String::new();
            while matches!(self.peek(), Some(c) if c != '/') {
                if let Some(c) = self.peek() {
                    pattern.push(c);
                }
                self.pos += 1;
            }
            if pattern.is_empty() {
                let _ = self.fail("regexp");
                self.reset(m);
            } else if self.eat_char('/', "slash").is_ok() {
                return Ok(ConditionNode::KeyValue(Field::new(
                    field_name,
                    FieldValueType::Regexp,
                    Some(FieldValue::Text(pattern)),
                )));
            } else {
                self.reset(m);
            }
        }

        if let Ok(range) = self.parse_range() {
            return Ok(ConditionNode::KeyValue(Field::new(
                field_name,
                FieldValueType::Range,
                Some(FieldValue::Text(range)),
            )));
        }
        self.reset(m);

        let value = self.scan_bare_value()?;
        if is_number_literal(&value) {
            if let Ok(n) = value.parse::<f64>() {
                return Ok(ConditionNode::KeyValue(Field::new(
                    field_name,
                    FieldValueType::Number,
                    Some(FieldValue::Num(n)),
                )));
            }
        }
        Ok(ConditionNode::KeyValue(Field::new(
            field_name,
            FieldValueType::String,
            Some(FieldValue::Text(value)),
        )))
    }

    /// Interval literal. `[`/`]` are inclusive, `{`/`}` exclusive; the two
    /// ends may mix. Stored in normalized text form.
    fn parse_range(&mut self) -> PResult<String> {
        let open = if self.eat_char('[', "L_M_Bracket").is_ok() {
            '['
        } else if self.eat_char('{', "L_L_Bracket").is_ok() {
            '{'
        } else {
            return Err(Fail);
        };
        self.skip_spaces0();
        let low = self.scan_number()?;
        self.skip_spaces1()?;
        self.eat_keyword("TO", "to")?;
        self.skip_spaces1()?;
        let high = self.scan_number()?;
        self.skip_spaces0();
        let close = if self.eat_char(']', "R_M_Bracket").is_ok() {
            ']'
        } else if self.eat_char('}', "R_L_Bracket").is_ok() {
            '}'
        } else {
            return Err(Fail);
        };
        Ok(format!("{open}{low} TO {high}{close}"))
    }

    fn parse_keyword(&mut self) -> PResult<ConditionNode> {
        let m = self.mark();
        if let Ok(ident) = self.scan_identifier() {
            return Ok(ConditionNode::SingleKeyword(ident));
        }
        self.reset(m);
        let body = self.scan_quoted()?;
        Ok(ConditionNode::UnionKeywords(body))
    }

    // ========================================================================
    // OPERATION SEGMENT
    // ========================================================================

    fn parse_statistic(&mut self) -> PResult<Operation> {
        self.eat_keyword("stats", "stats")?;
        self.skip_spaces1()?;

        let mut fields = vec![self.parse_aggr_field()?];
        loop {
            let m = self.mark();
            self.skip_spaces0();
            if self.eat_char(',', "comma").is_err() {
                self.reset(m);
                break;
            }
            self.skip_spaces0();
            match self.parse_aggr_field() {
                Ok(field) => fields.push(field),
                Err(_) => {
                    self.reset(m);
                    break;
                }
            }
        }

        let mut group_by = Vec::new();
        let m = self.mark();
        match self.try_group_by() {
            Ok(groups) => group_by = groups,
            Err(_) => self.reset(m),
        }

        let mut filters = Vec::new();
        let m = self.mark();
        match self.try_after_filter() {
            Ok(fs) => filters = fs,
            Err(_) => self.reset(m),
        }

        Ok(Operation::Statistic(Statistic {
            fields,
            group_by,
            filters,
        }))
    }

    fn parse_aggr_field(&mut self) -> PResult<AggrField> {
        let aggr = if self.eat_keyword("count", "count").is_ok() {
            AggrFunc::Count
        } else if self.eat_keyword("min", "minS").is_ok() {
            AggrFunc::Min
        } else if self.eat_keyword("max", "maxS").is_ok() {
            AggrFunc::Max
        } else if self.eat_keyword("sum", "sum").is_ok() {
            AggrFunc::Sum
        } else if self.eat_keyword("avg", "avg").is_ok() {
            AggrFunc::Avg
        } else {
            return Err(Fail);
        };
        self.skip_spaces0();
        self.eat_char('(', "L_S_Bracket")?;
        self.skip_spaces0();
        let field_name = self.scan_field_name()?;

        let mut filter = None;
        let m = self.mark();
        match self.try_before_filter() {
            Ok(f) => filter = Some(f),
            Err(_) => self.reset(m),
        }

        self.skip_spaces0();
        self.eat_char(')', "R_S_Bracket")?;

        let mut alias = None;
        let m = self.mark();
        match self.try_alias() {
            Ok(a) => alias = Some(a),
            Err(_) => self.reset(m),
        }

        let field_type = if aggr == AggrFunc::Count {
            FieldValueType::String
        } else {
            FieldValueType::Number
        };
        Ok(AggrField {
            field_name,
            field_type,
            aggr,
            alias,
            filter,
        })
    }

    /// `[filter field <op> n]` attached to an aggregate argument.
    fn try_before_filter(&mut self) -> PResult<FilterField> {
        self.skip_spaces0();
        self.eat_char('[', "L_M_Bracket")?;
        self.skip_spaces0();
        self.eat_keyword("filter", "filter")?;
        self.skip_spaces1()?;
        let filter = self.parse_filter_expr()?;
        self.skip_spaces0();
        self.eat_char(']', "R_M_Bracket")?;
        Ok(filter)
    }

    fn try_alias(&mut self) -> PResult<String> {
        self.skip_spaces1()?;
        self.eat_keyword("as", "alias")?;
        self.skip_spaces1()?;
        self.scan_field_name()
    }

    fn try_group_by(&mut self) -> PResult<Vec<GroupField>> {
        self.skip_spaces1()?;
        self.eat_keyword("by", "group_by")?;
        self.skip_spaces1()?;
        let mut groups = vec![self.parse_group_field()?];
        loop {
            let m = self.mark();
            self.skip_spaces0();
            if self.eat_char(',', "comma").is_err() {
                self.reset(m);
                break;
            }
            self.skip_spaces0();
            match self.parse_group_field() {
                Ok(group) => groups.push(group),
                Err(_) => {
                    self.reset(m);
                    break;
                }
            }
        }
        Ok(groups)
    }

    fn parse_group_field(&mut self) -> PResult<GroupField> {
        let field_name = self.scan_field_name()?;
        let mut sort_limits = None;
        let m = self.mark();
        match self.try_sort_limits() {
            Ok(limits) => sort_limits = Some(limits),
            Err(_) => self.reset(m),
        }
        Ok(GroupField {
            field_name,
            field_type: FieldValueType::String,
            sort_limits,
        })
    }

    /// `[sort by alias, n]` bucket ordering attached to a group field.
    fn try_sort_limits(&mut self) -> PResult<SortLimits> {
        self.skip_spaces0();
        self.eat_char('[', "L_M_Bracket")?;
        self.skip_spaces0();
        self.eat_keyword("sort by", "sort_by")?;
        self.skip_spaces1()?;
        let fn_alias = self.scan_identifier()?;
        self.skip_spaces0();
        self.eat_char(',', "comma")?;
        self.skip_spaces0();
        let size = self.scan_integer()?;
        self.skip_spaces0();
        self.eat_char(']', "R_M_Bracket")?;
        Ok(SortLimits { fn_alias, size })
    }

    /// `| filter a > 1, b < 2` trailing a statistic.
    fn try_after_filter(&mut self) -> PResult<Vec<FilterField>> {
        self.skip_spaces0();
        self.eat_char('|', "pipe")?;
        self.skip_spaces0();
        self.eat_keyword("filter", "filter")?;
        self.skip_spaces1()?;
        let mut filters = vec![self.parse_filter_expr()?];
        loop {
            let m = self.mark();
            self.skip_spaces0();
            if self.eat_char(',', "comma").is_err() {
                self.reset(m);
                break;
            }
            self.skip_spaces0();
            match self.parse_filter_expr() {
                Ok(filter) => filters.push(filter),
                Err(_) => {
                    self.reset(m);
                    break;
                }
            }
        }
        Ok(filters)
    }

    fn parse_filter_expr(&mut self) -> PResult<FilterField> {
        let field_name = self.scan_field_name()?;
        self.skip_spaces0();
        let operator = if self.eat_char('=', "equal").is_ok() {
            '='
        } else if self.eat_char('>', "greater_than").is_ok() {
            '>'
        } else if self.eat_char('<', "less_than").is_ok() {
            '<'
        } else {
            return Err(Fail);
        };
        self.skip_spaces0();
        let text = self.scan_number()?;
        let field_value = match text.parse::<f64>() {
            Ok(n) => FieldValue::Num(n),
            Err(_) => return Err(Fail),
        };
        Ok(FilterField {
            field_name,
            field_type: FieldValueType::Number,
            field_value,
            operator,
        })
    }

    // ========================================================================
    // COMMAND SEGMENT
    // ========================================================================

    fn parse_command(&mut self) -> PResult<Command> {
        let m = self.mark();
        if let Ok(cmd) = self.parse_sort() {
            return Ok(cmd);
        }
        self.reset(m);
        if let Ok(tr) = self.parse_top_rare("top", "top") {
            return Ok(Command::Top(tr));
        }
        self.reset(m);
        if let Ok(tr) = self.parse_top_rare("rare", "rare") {
            return Ok(Command::Rare(tr));
        }
        self.reset(m);
        if let Ok(n) = self.parse_count_command("head", "head") {
            return Ok(Command::Head(n));
        }
        self.reset(m);
        if let Ok(n) = self.parse_count_command("tail", "tail") {
            return Ok(Command::Tail(n));
        }
        self.reset(m);
        if let Ok(n) = self.parse_count_command("limit", "limit") {
            return Ok(Command::Limit(n));
        }
        self.reset(m);
        if let Ok(fs) = self.parse_field_list("fields", "fields") {
            return Ok(Command::Fields(fs));
        }
        self.reset(m);
        if let Ok(fs) = self.parse_field_list("table", "table") {
            return Ok(Command::Table(fs));
        }
        self.reset(m);
        if let Ok(txn) = self.parse_transaction() {
            return Ok(Command::Transaction(txn));
        }
        self.reset(m);
        self.parse_eval()
    }

    fn parse_sort(&mut self) -> PResult<Command> {
        self.eat_keyword("sort by", "sort_by")?;
        self.skip_spaces1()?;
        let mut fields = vec![self.parse_sort_field()?];
        loop {
            let m = self.mark();
            self.skip_spaces0();
            if self.eat_char(',', "comma").is_err() {
                self.reset(m);
                break;
            }
            self.skip_spaces0();
            match self.parse_sort_field() {
                Ok(field) => fields.push(field),
                Err(_) => {
                    self.reset(m);
                    break;
                }
            }
        }
        Ok(Command::Sort(fields))
    }

    fn parse_sort_field(&mut self) -> PResult<SortField> {
        let field_name = self.scan_field_name()?;
        let order = if self.eat_char('-', "minus").is_ok() {
            Some(SortOrder::Desc)
        } else if self.eat_char('+', "plus").is_ok() {
            Some(SortOrder::Asc)
        } else {
            None
        };
        Ok(SortField {
            field_name,
            field_type: FieldValueType::String,
            order,
        })
    }

    fn parse_top_rare(&mut self, keyword: &str, rule: &'static str) -> PResult<TopRare> {
        self.eat_keyword(keyword, rule)?;
        self.skip_spaces1()?;
        let count = self.scan_integer()?;
        self.skip_spaces1()?;
        let field_name = self.scan_field_name()?;
        Ok(TopRare {
            count,
            field: SourceField {
                field_name,
                field_type: FieldValueType::String,
            },
        })
    }

    fn parse_count_command(&mut self, keyword: &str, rule: &'static str) -> PResult<u64> {
        self.eat_keyword(keyword, rule)?;
        self.skip_spaces1()?;
        self.scan_integer()
    }

    fn parse_field_list(&mut self, keyword: &str, rule: &'static str) -> PResult<Vec<SourceField>> {
        self.eat_keyword(keyword, rule)?;
        self.skip_spaces1()?;
        let mut fields = vec![self.parse_source_field()?];
        loop {
            let m = self.mark();
            self.skip_spaces0();
            if self.eat_char(',', "comma").is_err() {
                self.reset(m);
                break;
            }
            self.skip_spaces0();
            match self.parse_source_field() {
                Ok(field) => fields.push(field),
                Err(_) => {
                    self.reset(m);
                    break;
                }
            }
        }
        Ok(fields)
    }

    fn parse_source_field(&mut self) -> PResult<SourceField> {
        let field_name = self.scan_field_name()?;
        Ok(SourceField {
            field_name,
            field_type: FieldValueType::String,
        })
    }

    fn parse_transaction(&mut self) -> PResult<Transaction> {
        self.eat_keyword("transaction", "transaction")?;
        self.skip_spaces1()?;
        let field_name = self.scan_field_name()?;
        let mut max_open_txn = None;
        let mut max_open_events = None;
        loop {
            let m = self.mark();
            if self.skip_spaces1().is_err() {
                self.reset(m);
                break;
            }
            if max_open_txn.is_none() && self.eat_keyword("maxopentxn", "maxopentxn").is_ok() {
                match self.parse_option_value() {
                    Ok(v) => {
                        max_open_txn = Some(v);
                        continue;
                    }
                    Err(_) => {
                        self.reset(m);
                        break;
                    }
                }
            }
            if max_open_events.is_none()
                && self.eat_keyword("maxopenevents", "maxopenevents").is_ok()
            {
                match self.parse_option_value() {
                    Ok(v) => {
                        max_open_events = Some(v);
                        continue;
                    }
                    Err(_) => {
                        self.reset(m);
                        break;
                    }
                }
            }
            self.reset(m);
            break;
        }
        Ok(Transaction {
            field: SourceField {
                field_name,
                field_type: FieldValueType::String,
            },
            max_open_txn,
            max_open_events,
        })
    }

    fn parse_option_value(&mut self) -> PResult<u64> {
        self.skip_spaces0();
        self.eat_char('=', "equal")?;
        self.skip_spaces0();
        self.scan_integer()
    }

    fn parse_eval(&mut self) -> PResult<Command> {
        self.eat_keyword("eval", "evaluation")?;
        self.skip_spaces1()?;
        let new_field_name = self.scan_field_name()?;
        self.skip_spaces0();
        self.eat_char('=', "equal")?;
        self.skip_spaces0();
        let func = if self.eat_keyword("ceil", "ceil").is_ok() {
            EvalFunc::Ceil
        } else if self.eat_keyword("floor", "floor").is_ok() {
            EvalFunc::Floor
        } else if self.eat_keyword("abs", "abs").is_ok() {
            EvalFunc::Abs
        } else if self.eat_keyword("max", "maxE").is_ok() {
            EvalFunc::Max
        } else if self.eat_keyword("min", "minE").is_ok() {
            EvalFunc::Min
        } else {
            return Err(Fail);
        };
        self.skip_spaces0();
        self.eat_char('(', "L_S_Bracket")?;
        let n1 = self.parse_expr()?;
        let n2 = if func.is_binary() {
            self.skip_spaces0();
            self.eat_char(',', "comma")?;
            Some(self.parse_expr()?)
        } else {
            None
        };
        self.skip_spaces0();
        self.eat_char(')', "R_S_Bracket")?;
        Ok(Command::Eval(Evaluation {
            new_field_name,
            func,
            n1,
            n2,
        }))
    }

    // ========================================================================
    // ARITHMETIC EXPRESSIONS
    // ========================================================================

    /// `Expr = Term (('+' | '-') Term)*`. Multi-item runs become a `Seq`;
    /// a `Seq` nested inside another renders parenthesized.
    fn parse_expr(&mut self) -> PResult<EvalExpr> {
        let mut items = vec![self.parse_term()?];
        loop {
            let m = self.mark();
            self.skip_spaces0();
            let op = if self.eat_char('+', "plus").is_ok() {
                '+'
            } else if self.eat_char('-', "minus").is_ok() {
                '-'
            } else {
                self.reset(m);
                break;
            };
            match self.parse_term() {
                Ok(term) => {
                    items.push(EvalExpr::Operator(op));
                    items.push(term);
                }
                Err(_) => {
                    self.reset(m);
                    break;
                }
            }
        }
        Ok(flatten(items))
    }

    fn parse_term(&mut self) -> PResult<EvalExpr> {
        let mut items = vec![self.parse_factor()?];
        loop {
            let m = self.mark();
            self.skip_spaces0();
            let op = if self.eat_char('*', "times").is_ok() {
                '*'
            } else if self.eat_char('/', "slash").is_ok() {
                '/'
            } else {
                self.reset(m);
                break;
            };
            match self.parse_factor() {
                Ok(factor) => {
                    items.push(EvalExpr::Operator(op));
                    items.push(factor);
                }
                Err(_) => {
                    self.reset(m);
                    break;
                }
            }
        }
        Ok(flatten(items))
    }

    fn parse_factor(&mut self) -> PResult<EvalExpr> {
        self.skip_spaces0();
        let m = self.mark();
        if self.eat_char('(', "L_S_Bracket").is_ok() {
            if let Ok(expr) = self.parse_expr() {
                self.skip_spaces0();
                if self.eat_char(')', "R_S_Bracket").is_ok() {
                    return Ok(expr);
                }
            }
            self.reset(m);
        }
        if let Ok(text) = self.scan_number() {
            return Ok(EvalExpr::Number(text));
        }
        let field_name = self.scan_field_name()?;
        Ok(EvalExpr::Field(Field::new(
            field_name,
            FieldValueType::Number,
            None,
        )))
    }

    // ========================================================================
    // DIAGNOSTICS
    // ========================================================================

    pub(crate) fn syntax_error(&self) -> SyntaxError {
        let upto = self.farthest.min(self.chars.len());
        let mut line = 1;
        let mut column = 1;
        for &c in &self.chars[..upto] {
            if c == '\n' {
                line += 1;
                column = 1;
            } else {
                column += 1;
            }
        }
        let found = self.chars.get(self.farthest).map(|c| c.to_string());
        let expected: Vec<ExpectedItem> = self
            .expected
            .iter()
            .map(|rule| ExpectedItem {
                rule: (*rule).to_string(),
                description: describe_rule(rule).to_string(),
            })
            .collect();
        let names: Vec<&str> = expected.iter().map(|e| e.description.as_str()).collect();
        let message = match &found {
            Some(c) => format!("expected {} but \"{}\" found", names.join(", "), c),
            None => format!("expected {} but end of input found", names.join(", ")),
        };
        SyntaxError {
            message,
            location: Location {
                offset: self.farthest,
                line,
                column,
            },
            expected,
            found,
        }
    }
}

fn flatten(mut items: Vec<EvalExpr>) -> EvalExpr {
    if items.len() == 1 {
        items.remove(0)
    } else {
        EvalExpr::Seq(items)
    }
}

fn is_number_literal(s: &str) -> bool {
    let t = s.strip_prefix('-').unwrap_or(s);
    let (int, frac) = match t.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (t, None),
    };
    !int.is_empty()
        && int.bytes().all(|b| b.is_ascii_digit())
        && frac.map_or(true, |f| !f.is_empty() && f.bytes().all(|b| b.is_ascii_digit()))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn kv(name: &str, ty: FieldValueType, value: FieldValue) -> Condition {
        Condition::new(ConditionNode::KeyValue(Field::new(name, ty, Some(value))))
    }

    fn text(s: &str) -> FieldValue {
        FieldValue::Text(s.to_string())
    }

    fn query_of(conditions: Vec<Condition>) -> Query {
        Query {
            groups: vec![Group { conditions }],
        }
    }

    #[test]
    fn single_keyword() {
        let ast = parse("error").unwrap();
        assert_eq!(
            ast.query,
            query_of(vec![Condition::new(ConditionNode::SingleKeyword(
                "error".to_string()
            ))])
        );
        assert!(ast.operations.is_empty());
        assert!(ast.commands.is_empty());
    }

    #[test]
    fn wildcard_and_cjk_keywords() {
        let ast = parse("*").unwrap();
        assert_eq!(
            ast.query,
            query_of(vec![Condition::new(ConditionNode::SingleKeyword(
                "*".to_string()
            ))])
        );

        let ast = parse("错误日志").unwrap();
        assert_eq!(
            ast.query,
            query_of(vec![Condition::new(ConditionNode::SingleKeyword(
                "错误日志".to_string()
            ))])
        );
    }

    #[test]
    fn quoted_phrase_is_union_keywords() {
        let ast = parse("\"hello world\"").unwrap();
        assert_eq!(
            ast.query,
            query_of(vec![Condition::new(ConditionNode::UnionKeywords(
                "hello world".to_string()
            ))])
        );
    }

    #[test]
    fn key_value_variants() {
        let ast = parse("a=\"x y\"").unwrap();
        assert_eq!(
            ast.query,
            query_of(vec![kv("a", FieldValueType::String, text("x y"))])
        );

        let ast = parse("a=12.5").unwrap();
        assert_eq!(
            ast.query,
            query_of(vec![kv("a", FieldValueType::Number, FieldValue::Num(12.5))])
        );

        let ast = parse("a=bare-value").unwrap();
        assert_eq!(
            ast.query,
            query_of(vec![kv("a", FieldValueType::String, text("bare-value"))])
        );

        let ast = parse("a=/err.*/").unwrap();
        assert_eq!(
            ast.query,
            query_of(vec![kv("a", FieldValueType::Regexp, text("err.*"))])
        );
    }

    #[test]
    fn range_values_normalize_spacing_and_allow_mixed_brackets() {
        let ast = parse("a=[10 TO 20]").unwrap();
        assert_eq!(
            ast.query,
            query_of(vec![kv("a", FieldValueType::Range, text("[10 TO 20]"))])
        );

        let ast = parse("a={ 30  TO   60 }").unwrap();
        assert_eq!(
            ast.query,
            query_of(vec![kv("a", FieldValueType::Range, text("{30 TO 60}"))])
        );

        let ast = parse("a=[1 TO 5}").unwrap();
        assert_eq!(
            ast.query,
            query_of(vec![kv("a", FieldValueType::Range, text("[1 TO 5}"))])
        );
    }

    #[test]
    fn and_or_grouping() {
        let ast = parse("a=1 AND b=2 OR c=3").unwrap();
        assert_eq!(ast.query.groups.len(), 2);
        assert_eq!(ast.query.groups[0].conditions.len(), 2);
        assert_eq!(ast.query.groups[1].conditions.len(), 1);
    }

    #[test]
    fn not_decorator() {
        let ast = parse("NOT a=1").unwrap();
        assert!(ast.query.groups[0].conditions[0].negated);

        let ast = parse("a=1 AND NOT b=2").unwrap();
        assert!(!ast.query.groups[0].conditions[0].negated);
        assert!(ast.query.groups[0].conditions[1].negated);
    }

    #[test]
    fn exists_condition() {
        let ast = parse("_exists_=host").unwrap();
        assert_eq!(
            ast.query,
            query_of(vec![kv("_exists_", FieldValueType::String, text("host"))])
        );
    }

    #[test]
    fn sub_query() {
        let ast = parse("(a=1 OR b=2) AND c=3").unwrap();
        let conditions = &ast.query.groups[0].conditions;
        assert_eq!(conditions.len(), 2);
        match &conditions[0].node {
            ConditionNode::SubQuery(q) => assert_eq!(q.groups.len(), 2),
            other => panic!("expected sub-query, got {other:?}"),
        }
    }

    #[test]
    fn sub_search() {
        let ast = parse("(search a=1 | limit 5) AND b=2").unwrap();
        match &ast.query.groups[0].conditions[0].node {
            ConditionNode::SubSearch(inner) => {
                assert_eq!(inner.commands, vec![Command::Limit(5)]);
            }
            other => panic!("expected sub-search, got {other:?}"),
        }
    }

    #[test]
    fn bracketed_field_names() {
        let ast = parse("a[0]=1").unwrap();
        assert_eq!(
            ast.query,
            query_of(vec![kv(
                "a[0]",
                FieldValueType::Number,
                FieldValue::Num(1.0)
            )])
        );

        let ast = parse("a\\[b=1").unwrap();
        assert_eq!(
            ast.query,
            query_of(vec![kv("a[b", FieldValueType::Number, FieldValue::Num(1.0))])
        );
    }

    #[test]
    fn stats_count_with_group_by() {
        let ast = parse("* | stats count(fieldName) by group1, group2").unwrap();
        assert_eq!(ast.operations.len(), 1);
        let Operation::Statistic(stat) = &ast.operations[0];
        assert_eq!(stat.fields.len(), 1);
        assert_eq!(stat.fields[0].aggr, AggrFunc::Count);
        assert_eq!(stat.fields[0].field_type, FieldValueType::String);
        assert_eq!(stat.group_by.len(), 2);
        assert_eq!(stat.group_by[0].field_name, "group1");
    }

    #[test]
    fn stats_with_alias_filter_and_sort_limits() {
        let ast = parse(
            "* | stats max(latency [filter code = 200]) as peak by host [sort by peak, 5] | filter peak > 100",
        )
        .unwrap();
        let Operation::Statistic(stat) = &ast.operations[0];
        let field = &stat.fields[0];
        assert_eq!(field.aggr, AggrFunc::Max);
        assert_eq!(field.field_type, FieldValueType::Number);
        assert_eq!(field.alias.as_deref(), Some("peak"));
        let filter = field.filter.as_ref().unwrap();
        assert_eq!(filter.field_name, "code");
        assert_eq!(filter.operator, '=');
        let limits = stat.group_by[0].sort_limits.as_ref().unwrap();
        assert_eq!(limits.fn_alias, "peak");
        assert_eq!(limits.size, 5);
        assert_eq!(stat.filters.len(), 1);
        assert_eq!(stat.filters[0].operator, '>');
    }

    #[test]
    fn stats_then_command() {
        let ast = parse("* | stats count(a) | limit 100").unwrap();
        assert_eq!(ast.operations.len(), 1);
        assert_eq!(ast.commands, vec![Command::Limit(100)]);
    }

    #[test]
    fn sort_command_orders() {
        let ast = parse("* | sort by ts-, host+, level").unwrap();
        match &ast.commands[0] {
            Command::Sort(fields) => {
                assert_eq!(fields.len(), 3);
                assert_eq!(fields[0].field_name, "ts");
                assert_eq!(fields[0].order, Some(SortOrder::Desc));
                assert_eq!(fields[1].order, Some(SortOrder::Asc));
                assert_eq!(fields[2].order, None);
            }
            other => panic!("expected sort, got {other:?}"),
        }
    }

    #[test]
    fn count_commands() {
        assert_eq!(parse("* | limit 50").unwrap().commands, vec![Command::Limit(50)]);
        assert_eq!(parse("* | head 5").unwrap().commands, vec![Command::Head(5)]);
        assert_eq!(parse("* | tail 5").unwrap().commands, vec![Command::Tail(5)]);
    }

    #[test]
    fn top_rare_fields_table() {
        let ast = parse("* | top 10 host").unwrap();
        match &ast.commands[0] {
            Command::Top(tr) => {
                assert_eq!(tr.count, 10);
                assert_eq!(tr.field.field_name, "host");
            }
            other => panic!("expected top, got {other:?}"),
        }

        let ast = parse("* | fields host, level").unwrap();
        match &ast.commands[0] {
            Command::Fields(fs) => {
                assert_eq!(fs.len(), 2);
                assert_eq!(fs[1].field_name, "level");
            }
            other => panic!("expected fields, got {other:?}"),
        }

        assert!(matches!(
            parse("* | table host").unwrap().commands[0],
            Command::Table(_)
        ));
        assert!(matches!(
            parse("* | rare 3 host").unwrap().commands[0],
            Command::Rare(_)
        ));
    }

    #[test]
    fn transaction_options() {
        let ast = parse("* | transaction session maxopentxn=100 maxopenevents=2000").unwrap();
        match &ast.commands[0] {
            Command::Transaction(txn) => {
                assert_eq!(txn.field.field_name, "session");
                assert_eq!(txn.max_open_txn, Some(100));
                assert_eq!(txn.max_open_events, Some(2000));
            }
            other => panic!("expected transaction, got {other:?}"),
        }
    }

    #[test]
    fn eval_unary_and_binary() {
        let ast = parse("* | eval newField=ceil(field + 1)").unwrap();
        match &ast.commands[0] {
            Command::Eval(eval) => {
                assert_eq!(eval.new_field_name, "newField");
                assert_eq!(eval.func, EvalFunc::Ceil);
                assert!(eval.n2.is_none());
                match &eval.n1 {
                    EvalExpr::Seq(items) => assert_eq!(items.len(), 3),
                    other => panic!("expected seq, got {other:?}"),
                }
            }
            other => panic!("expected eval, got {other:?}"),
        }

        let ast = parse("* | eval m=max(a, 3)").unwrap();
        match &ast.commands[0] {
            Command::Eval(eval) => {
                assert_eq!(eval.func, EvalFunc::Max);
                assert!(eval.n2.is_some());
            }
            other => panic!("expected eval, got {other:?}"),
        }
    }

    #[test]
    fn eval_precedence_nests_sequences() {
        let ast = parse("* | eval v=ceil(fieldName*(3+4))").unwrap();
        match &ast.commands[0] {
            Command::Eval(eval) => match &eval.n1 {
                EvalExpr::Seq(items) => {
                    assert_eq!(items.len(), 3);
                    assert!(matches!(items[2], EvalExpr::Seq(_)));
                }
                other => panic!("expected seq, got {other:?}"),
            },
            other => panic!("expected eval, got {other:?}"),
        }
    }

    #[test]
    fn incomplete_or_reports_space() {
        let err = parse("A OR").unwrap_err();
        assert_eq!(err.found, None);
        let rules: Vec<&str> = err.expected.iter().map(|e| e.rule.as_str()).collect();
        assert_eq!(rules, vec!["space"]);
    }

    #[test]
    fn missing_value_reports_field_value() {
        let err = parse("a=").unwrap_err();
        let rules: Vec<&str> = err.expected.iter().map(|e| e.rule.as_str()).collect();
        assert!(rules.contains(&"fieldValue"));
        assert!(rules.contains(&"quote"));
    }

    #[test]
    fn paren_in_bare_value_is_rejected() {
        let err = parse("a = b AND NOT a=(2").unwrap_err();
        assert_eq!(err.found.as_deref(), Some("("));
    }

    #[test]
    fn error_location_is_line_column() {
        let err = parse("a=1 AND").unwrap_err();
        assert_eq!(err.location.line, 1);
        assert_eq!(err.location.offset, 7);
    }

    #[test]
    fn empty_input_expects_condition_starters() {
        let err = parse("").unwrap_err();
        let rules: Vec<&str> = err.expected.iter().map(|e| e.rule.as_str()).collect();
        assert!(rules.contains(&"fieldName"));
        assert!(rules.contains(&"not"));
        assert!(rules.contains(&"L_S_Bracket"));
    }

    #[test]
    fn trailing_garbage_fails() {
        assert!(parse("a=1 )").is_err());
        assert!(parse("a=1 | bogus 1").is_err());
    }

    #[test]
    fn every_rule_name_has_a_description() {
        for rule in RULE_NAMES {
            assert_ne!(describe_rule(rule), "token", "missing description: {rule}");
        }
    }
}
