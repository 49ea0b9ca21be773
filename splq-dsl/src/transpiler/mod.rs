//! Forward (AST → query DSL) and reverse (AST → SPL) transpilers, plus
//! post-processing helpers for the produced DSL documents.

pub mod condition_expr;
pub mod evaluation_expr;
pub mod formatters;
pub mod resolvers;
pub mod reversers;

pub use resolvers::resolve;
pub use reversers::reverse;

use splq_core::constants::EVENT_TIME;
use splq_core::es::EsQuery;

/// Drop `from`/`size`, e.g. before a count or export request.
pub fn remove_pagination(dsl: &mut EsQuery) {
    dsl.from = None;
    dsl.size = None;
}

/// Drop the `_source` filter so full documents come back.
pub fn remove_source(dsl: &mut EsQuery) {
    dsl.source = None;
}

pub fn remove_aggs(dsl: &mut EsQuery) {
    dsl.aggs = None;
}

pub fn remove_sort(dsl: &mut EsQuery) {
    dsl.sort = None;
}

pub fn remove_script_fields(dsl: &mut EsQuery) {
    dsl.script_fields = None;
}

const MINUTE_MS: u64 = 60_000;

/// Constrain the query to an event-time window given in epoch
/// milliseconds. Both bounds are floored to whole minutes; the end is
/// exclusive. A zero bound on either side leaves the query untouched.
pub fn apply_time_range(dsl: &mut EsQuery, range: (u64, u64)) {
    let (start, end) = range;
    if start == 0 || end == 0 {
        return;
    }
    let start = start - start % MINUTE_MS;
    let end = end - end % MINUTE_MS;
    wrap_with_time_range(dsl, &start.to_string(), &end.to_string());
}

/// Same wrapping with caller-supplied placeholder tokens instead of
/// concrete timestamps, for templated queries.
pub fn apply_time_range_placeholder(dsl: &mut EsQuery, placeholders: [&str; 2]) {
    wrap_with_time_range(dsl, placeholders[0], placeholders[1]);
}

fn wrap_with_time_range(dsl: &mut EsQuery, start: &str, end: &str) {
    let original = &dsl.query.query_string.query;
    dsl.query.query_string.query =
        format!("({original}) AND ({EVENT_TIME}:[{start} TO {end}}})");
}
