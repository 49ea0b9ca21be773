//! SPLQ - an SPL-style query language for log search backends.
//!
//! Parses pipe-syntax statements (`<query> | stats ... | <command> ...`)
//! into a typed AST and transpiles them forward into an
//! Elasticsearch-style query DSL document, or backward into canonical SPL
//! text. Also ships a suggestion engine for interactive editing, a field
//! type checker, a condition builder and field/keyword extraction.
//!
//! ```
//! let dsl = splq_dsl::transpile("level=error | limit 100")?;
//! assert_eq!(dsl.size, Some(100));
//! assert_eq!(dsl.query.query_string.query, "level_string:\"error\"");
//! # Ok::<(), splq_dsl::SplError>(())
//! ```
//!
//! With a field-type catalog, statements are validated before
//! transpilation:
//!
//! ```
//! use splq_dsl::{Transpiler, TypeMapping};
//! use splq_core::ast::FieldValueType;
//!
//! let mut mapping = TypeMapping::new();
//! mapping.insert("level".to_string(), vec![FieldValueType::String]);
//! let transpiler = Transpiler::new(Some(mapping));
//! assert!(transpiler.transpile("level=error").is_ok());
//! assert!(transpiler.transpile("level=3").is_err());
//! ```

pub mod builder;
pub mod fields;
pub mod parser;
pub mod suggestions;
pub mod transpiler;
pub mod typecheck;

pub use builder::{append, AppendCondition};
pub use fields::{
    recognize_fields, recognize_keywords, FieldLocation, KeywordKind, RecognizedField,
    RecognizedKeyword,
};
pub use parser::parse;
pub use suggestions::{get_suggestions, try_parse, ParseFeedback, SuggestionItem, SuggestionTag};
pub use transpiler::{
    apply_time_range, apply_time_range_placeholder, remove_aggs, remove_pagination,
    remove_script_fields, remove_sort, remove_source, resolve, reverse,
};
pub use typecheck::{type_check, TypeMapping};

pub use splq_core::ast::{Ast, ConditionLinker};
pub use splq_core::error::SplError;
pub use splq_core::es::EsQuery;

/// Reusable SPL → DSL pipeline with an optional field-type catalog.
///
/// Equivalent to calling [`parse`], [`type_check`] and [`resolve`] in
/// sequence; the catalog is captured once and shared by every call.
#[derive(Debug, Clone, Default)]
pub struct Transpiler {
    mapping: Option<TypeMapping>,
}

impl Transpiler {
    pub fn new(mapping: Option<TypeMapping>) -> Self {
        Self { mapping }
    }

    pub fn transpile(&self, spl: &str) -> Result<EsQuery, SplError> {
        let ast = parser::parse(spl)?;
        typecheck::type_check(self.mapping.as_ref(), &ast)?;
        transpiler::resolve(&ast)
    }

    /// Parse and validate without building the DSL document.
    pub fn check(&self, spl: &str) -> Result<Ast, SplError> {
        let ast = parser::parse(spl)?;
        typecheck::type_check(self.mapping.as_ref(), &ast)?;
        Ok(ast)
    }
}

/// One-shot transpilation without a type catalog.
pub fn transpile(spl: &str) -> Result<EsQuery, SplError> {
    Transpiler::default().transpile(spl)
}
