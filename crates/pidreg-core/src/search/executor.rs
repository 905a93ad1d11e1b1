use crate::{
    error::RegistryError,
    facet::{
        AggregationKind, AggregationRequest, FacetContext, FacetRegistry, Facets, NameLookup,
        TotalsEntry, format_facets, format_totals, totals_aggregation,
    },
    model::IdentifierDocument,
    page::{
        CursorKey, PageMeta, PageRequest, cursor_total_pages, encode_cursor, offset_total_pages,
    },
    query::{QueryBuilder, Sample, SearchParams, cursor_sort},
    search::{SearchBackend, SearchRequest, SearchResponse},
};
use chrono::NaiveDate;
use serde::Serialize;

const SAMPLE_AGGREGATION: &str = "samples";
const SAMPLE_GROUP_SIZE: u32 = 10_000;

///
/// SearchOptions
///

#[derive(Clone, Copy)]
pub struct SearchOptions<'a> {
    /// Random-score seed, used only when `random` is requested.
    pub seed: &'a str,
    /// Anchor for relative totals windows and year cut-offs.
    pub today: NaiveDate,
    pub names: &'a dyn NameLookup,
}

///
/// SearchResults
///

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SearchResults {
    pub hits: Vec<IdentifierDocument>,
    pub meta: PageMeta,
    pub facets: Facets,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub totals: Option<Vec<TotalsEntry>>,
}

/// Run one search: build the query, read one page from the backend, and
/// shape its aggregations.
pub async fn execute<B>(
    backend: &B,
    params: &SearchParams,
    page: &PageRequest,
    options: SearchOptions<'_>,
) -> Result<SearchResults, RegistryError>
where
    B: SearchBackend + ?Sized,
{
    // resumed scrolls carry their own query
    if let PageRequest::Scroll {
        lifetime,
        scroll_id: Some(scroll_id),
        ..
    } = page
    {
        let response = backend.scroll(scroll_id, *lifetime).await?;
        return Ok(scroll_results(response));
    }

    let plan = QueryBuilder::new(params).seed(options.seed).build()?;
    let mut request = SearchRequest::new(plan.query, page.size());
    request.sort = plan.sort;

    match page {
        PageRequest::Scroll { lifetime, .. } => {
            request.scroll = Some(*lifetime);
            let response = backend.search(&request).await?;
            return Ok(scroll_results(response));
        }
        PageRequest::Cursor { after, .. } => {
            request.sort = Some(cursor_sort());
            request.search_after = after.as_ref().map(CursorKey::to_sort_values);
        }
        PageRequest::Offset { .. } => request.from = page.from(),
    }

    if let Some(sample) = params.sample {
        request.size = 0;
        request.from = 0;
        request.search_after = None;
        request.aggregations.push(sample_aggregation(sample));
    }
    let registry = FacetRegistry::identifiers();
    request.aggregations.extend(registry.aggregations(&params.facets));
    if let Some(scope) = params.totals {
        request.aggregations.push(totals_aggregation(scope, options.today));
    }

    let response = backend.search(&request).await?;
    tracing::debug!(
        target: "pidreg::search",
        total = response.total,
        hits = response.hits.len(),
        "search executed"
    );

    let facets = format_facets(
        &registry,
        &params.facets,
        response.total,
        &response.aggregations,
        FacetContext {
            today: options.today,
        },
    );
    let totals = params
        .totals
        .map(|scope| format_totals(scope, &response.aggregations, options.names));

    if params.sample.is_some() {
        let hits: Vec<_> = response
            .aggregations
            .get(SAMPLE_AGGREGATION)
            .map(|samples| {
                samples
                    .buckets()
                    .iter()
                    .flat_map(|bucket| bucket.hits.iter().cloned())
                    .collect()
            })
            .unwrap_or_default();
        let total = hits.len() as u64;

        return Ok(SearchResults {
            hits,
            meta: PageMeta::Offset {
                total,
                total_pages: 1,
                page: 1,
            },
            facets,
            totals,
        });
    }

    let meta = match page {
        PageRequest::Cursor { size, .. } => {
            let next_cursor = if *size > 0 && response.hits.len() as u64 >= u64::from(*size) {
                response
                    .hits
                    .last()
                    .and_then(|hit| CursorKey::from_sort_values(&hit.sort))
                    .map(|key| encode_cursor(&key))
            } else {
                None
            };

            PageMeta::Cursor {
                total: response.total,
                total_pages: cursor_total_pages(response.total, *size),
                next_cursor,
            }
        }
        PageRequest::Offset { number, size } => PageMeta::Offset {
            total: response.total,
            total_pages: offset_total_pages(response.total, *size),
            page: *number,
        },
        PageRequest::Scroll { .. } => PageMeta::Scroll {
            total: response.total,
            scroll_id: response.scroll_id.clone(),
        },
    };

    Ok(SearchResults {
        hits: response.hits.into_iter().map(|hit| hit.document).collect(),
        meta,
        facets,
        totals,
    })
}

fn sample_aggregation(sample: Sample) -> AggregationRequest {
    AggregationRequest {
        name: SAMPLE_AGGREGATION.to_string(),
        kind: AggregationKind::Terms {
            field: sample.group.field().to_string(),
            size: SAMPLE_GROUP_SIZE,
            top_hits: Some(sample.size),
            sub: Vec::new(),
        },
    }
}

// Scroll pages carry only the total and the next handle.
fn scroll_results(response: SearchResponse) -> SearchResults {
    SearchResults {
        meta: PageMeta::Scroll {
            total: response.total,
            scroll_id: response.scroll_id,
        },
        hits: response.hits.into_iter().map(|hit| hit.document).collect(),
        facets: Facets::default(),
        totals: None,
    }
}
