//! Module: facet
//! Responsibility: the typed facet-dimension registry, aggregation
//! request/result shapes, bucket formatting, and administrative totals.
//! Does not own: computing buckets (the search backend does).

mod aggregation;
mod format;
mod labels;
mod registry;
mod selection;
mod totals;

#[cfg(test)]
mod tests;

pub use aggregation::{
    AggregationKind, AggregationRequest, AggregationResult, AggregationResults, Bucket, BucketKey,
    to_json_map,
};
pub use format::{FacetContext, FacetValue, Facets, format_facets};
pub use registry::{BucketKind, FacetDimension, FacetRegistry, Formatter};
pub use selection::{FacetInclude, FacetSelection};
pub use totals::{
    NameLookup, Temporal, TotalsEntry, TotalsScope, format_totals, totals_aggregation,
};
