//! SPLQ Core - AST, DSL and error types
//!
//! Pure data structures with no behavior. The parser and transpiler crate
//! depends on this; this crate depends on nothing but serde/thiserror.

pub mod ast;
pub mod error;
pub mod es;

pub use ast::*;
pub use error::*;
pub use es::*;

/// Shared constants. These values are part of the external contract and
/// must not drift.
pub mod constants {
    /// Default full-text field for `query_string` queries.
    pub const DEFAULT_FIELD: &str = "_message";

    /// Event timestamp field, used for the default sort and time ranges.
    pub const EVENT_TIME: &str = "_event_time";

    /// Bucket cap applied to every terms aggregation.
    pub const AGGR_MAX_SIZE: u64 = 10000;

    /// Hard cap on the number of records a query may request.
    pub const MAX_RECORD_SIZE: u64 = 10000;

    /// Page size when no limit command is given.
    pub const DEFAULT_PAGE_SIZE: u64 = 10;
}
