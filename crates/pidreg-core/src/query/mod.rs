//! Module: query
//! Responsibility: typed search parameters, free-text syntax checking, and
//! construction of the boolean query tree with its ordering.
//! Does not own: aggregation requests (see `facet`) or page windows (see `page`).

mod builder;
mod dsl;
mod params;
mod sort;
pub mod text;


pub use builder::{QUERY_FIELDS, QueryBuilder, QueryPlan, TEST_SEED};
pub use dsl::{
    BoolQuery, PHRASE_PREFIX_MAX_EXPANSIONS, PhrasePrefix, Query, QueryString, RangeBound,
    RangeQuery, TermValue,
};
pub use params::{
    DEFAULT_SAMPLE_SIZE, LinkCheckFilters, QueryType, RelationThresholds, Sample, SampleGroup,
    SearchParams, YearRange,
};
pub use sort::{Direction, SCORE_FIELD, SortField, SortSpec, cursor_sort};
