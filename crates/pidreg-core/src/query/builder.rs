use crate::{
    casing,
    error::RegistryError,
    model::RegistrationAgency,
    query::{
        dsl::{BoolQuery, PHRASE_PREFIX_MAX_EXPANSIONS, PhrasePrefix, Query, QueryString, RangeBound, RangeQuery},
        params::{QueryType, SearchParams},
        sort::{SortField, SortSpec},
        text,
    },
};

/// Seed used for random scoring in the test environment.
pub const TEST_SEED: &str = "random_1234";

/// Boosted fields searched by free text.
pub const QUERY_FIELDS: [&str; 8] = [
    "uid^50",
    "related_identifiers^3",
    "titles^3",
    "creator_names^3",
    "person_ids^3",
    "publisher^3",
    "descriptions^3",
    "subjects.subject^3",
];

const SCHEMA_VERSION_PREFIX: &str = "http://datacite.org/schema/kernel-";
const FOS_PREFIX: &str = "FOS: ";
const ORCID_PREFIX: &str = "https://orcid.org/";
const IGSN_CATALOG: &str = "igsnCatalog";

///
/// QueryPlan
///
/// Output of the query builder: the query tree and its ordering. `sort` is
/// `None` when random scoring replaces explicit ordering.
///

#[derive(Clone, Debug, PartialEq)]
pub struct QueryPlan {
    pub query: Query,
    pub sort: Option<Vec<SortField>>,
}

///
/// QueryBuilder
///

#[derive(Clone, Copy, Debug)]
pub struct QueryBuilder<'a> {
    params: &'a SearchParams,
    seed: &'a str,
}

impl<'a> QueryBuilder<'a> {
    #[must_use]
    pub const fn new(params: &'a SearchParams) -> Self {
        Self {
            params,
            seed: TEST_SEED,
        }
    }

    /// Seed applied when `random` is set.
    #[must_use]
    pub const fn seed(mut self, seed: &'a str) -> Self {
        self.seed = seed;
        self
    }

    pub fn build(self) -> Result<QueryPlan, RegistryError> {
        let params = self.params;
        let root = BoolQuery {
            must: self.text_clause()?.into_iter().collect(),
            filter: self.filters(),
            must_not: self.exclusions(),
            ..BoolQuery::default()
        };

        let root = if root.is_empty() {
            Query::MatchAll
        } else {
            Query::Bool(root)
        };

        if params.random {
            return Ok(QueryPlan {
                query: Query::FunctionScore {
                    query: Box::new(root),
                    seed: self.seed.to_string(),
                },
                sort: None,
            });
        }

        let sort = match params.sort {
            Some(sort) => sort,
            None if params.query.is_some() => SortSpec::Relevance,
            None => SortSpec::default(),
        };

        Ok(QueryPlan {
            query: root,
            sort: Some(sort.fields()),
        })
    }

    fn text_clause(&self) -> Result<Option<Query>, RegistryError> {
        let Some(raw) = self.params.query.as_deref() else {
            return Ok(None);
        };
        let fields: Vec<String> = QUERY_FIELDS.iter().map(|f| (*f).to_string()).collect();

        match self.params.query_type {
            QueryType::PhrasePrefix => Ok(Some(Query::PhrasePrefix(PhrasePrefix {
                query: raw.trim().to_string(),
                fields,
                max_expansions: PHRASE_PREFIX_MAX_EXPANSIONS,
            }))),
            QueryType::QueryString => {
                let parsed = text::parse(raw)
                    .map_err(|err| RegistryError::query_syntax(format!("invalid query syntax: {err}")))?;

                Ok(parsed.map(|parsed| {
                    Query::QueryString(QueryString {
                        query: parsed.rewrite_fields().render(),
                        fields,
                        phrase_slop: 1,
                    })
                }))
            }
        }
    }

    #[allow(clippy::too_many_lines)]
    fn filters(&self) -> Vec<Query> {
        let p = self.params;
        let mut filter = Vec::new();

        if !p.ids.is_empty() {
            filter.push(Query::terms("doi", p.ids.iter().map(|id| id.to_uppercase())));
        }
        if !p.states.is_empty() {
            filter.push(Query::terms("state", p.states.iter().map(|s| s.as_str())));
        }
        if let Some(clause) = any_ci("provider_id", &p.provider_ids) {
            filter.push(clause);
        }
        if let Some(clause) = any_ci("client_id", &p.client_ids) {
            filter.push(clause);
        }
        if let Some(consortium) = &p.consortium_id {
            filter.push(Query::term_ci("consortium_id", consortium));
        }
        if !p.prefixes.is_empty() {
            filter.push(Query::terms("prefix", p.prefixes.iter().map(|x| x.to_lowercase())));
        }
        if !p.resource_type_ids.is_empty() {
            filter.push(Query::terms(
                "resource_type_id",
                p.resource_type_ids.iter().map(|id| casing::underscore(id)),
            ));
        }
        if !p.resource_types.is_empty() {
            filter.push(Query::terms("resource_type", &p.resource_types));
        }
        if let Some(version) = &p.schema_version {
            filter.push(Query::term(
                "schema_version",
                format!("{SCHEMA_VERSION_PREFIX}{version}"),
            ));
        }
        if !p.subjects.is_empty() {
            filter.push(Query::terms("subjects.subject", &p.subjects));
        }
        if !p.fields_of_science.is_empty() {
            filter.push(Query::terms(
                "fields_of_science",
                p.fields_of_science
                    .iter()
                    .map(|fos| format!("{FOS_PREFIX}{}", casing::humanize(fos))),
            ));
        }
        if !p.funder_ids.is_empty() {
            filter.push(Query::terms(
                "funder_ids",
                p.funder_ids.iter().map(|id| funder_url(id)),
            ));
        }
        if !p.affiliation_ids.is_empty() {
            filter.push(Query::terms(
                "affiliation_ids",
                p.affiliation_ids.iter().map(|id| https_url(id)),
            ));
        }
        if !p.organization_ids.is_empty() {
            filter.push(Query::terms(
                "organization_ids",
                p.organization_ids.iter().map(|id| https_url(id)),
            ));
        }
        if !p.user_ids.is_empty() {
            filter.push(Query::terms(
                "person_ids",
                p.user_ids.iter().map(|id| orcid_url(id)),
            ));
        }
        for (field, range) in [
            ("created", p.created),
            ("registered", p.registered),
            ("publication_year", p.published),
        ] {
            if let Some(range) = range {
                filter.push(Query::Range(RangeQuery::years(field, range.min, range.max)));
            }
        }
        if !p.sources.is_empty() {
            filter.push(Query::terms("source", &p.sources));
        }
        if !p.certificates.is_empty() {
            filter.push(Query::terms("certificates", &p.certificates));
        }
        if !p.licenses.is_empty() {
            filter.push(Query::terms("license_ids", p.licenses.iter().map(|l| l.to_lowercase())));
        }
        if !p.languages.is_empty() {
            filter.push(Query::terms("language", p.languages.iter().map(|l| l.to_lowercase())));
        }
        if !p.agencies.is_empty() {
            filter.push(Query::terms("agency", p.agencies.iter().map(|a| a.to_lowercase())));
        }
        if let Some(client_type) = &p.client_type {
            filter.push(Query::term("client_type", client_type));
            if client_type == IGSN_CATALOG {
                filter.push(Query::term("resource_type_id", "physical_object"));
            }
        }
        for (field, threshold) in p.thresholds.present() {
            filter.push(Query::gte(field, RangeBound::Int(saturating_i64(threshold))));
        }
        if p.has_person {
            filter.push(Query::exists("person_ids"));
        }

        let any_owner_link: Vec<Query> = [
            (p.has_affiliation, "affiliation_ids"),
            (p.has_organization, "organization_ids"),
            (p.has_funder, "funder_ids"),
        ]
        .into_iter()
        .filter(|(wanted, _)| *wanted)
        .map(|(_, field)| Query::exists(field))
        .collect();
        if !any_owner_link.is_empty() {
            filter.push(Query::Bool(BoolQuery {
                should: any_owner_link,
                minimum_should_match: Some(1),
                ..BoolQuery::default()
            }));
        }

        let link = p.link_check;
        if let Some(status) = link.status {
            filter.push(Query::term("landing_page.status", i64::from(status)));
        }
        if link.checked {
            filter.push(Query::exists("landing_page.checked"));
        }
        if let Some(flag) = link.has_schema_org {
            filter.push(Query::term("landing_page.has_schema_org", flag));
        }
        if let Some(flag) = link.body_has_pid {
            filter.push(Query::term("landing_page.body_has_pid", flag));
        }
        for (wanted, field) in [
            (link.found_schema_org_id, "landing_page.schema_org_id"),
            (link.found_dc_identifier, "landing_page.dc_identifier"),
            (link.found_citation_doi, "landing_page.citation_doi"),
        ] {
            if wanted {
                filter.push(Query::exists(field));
            }
        }
        if let Some(count) = link.redirect_count_gte {
            filter.push(Query::gte(
                "landing_page.redirect_count",
                RangeBound::Int(saturating_i64(count)),
            ));
        }

        filter
    }

    fn exclusions(&self) -> Vec<Query> {
        if self.params.exclude_registration_agencies {
            vec![Query::terms(
                "agency",
                RegistrationAgency::FOREIGN.iter().map(|agency| agency.as_str()),
            )]
        } else {
            Vec::new()
        }
    }
}

// One value is a plain case-insensitive term; several become an OR group.
fn any_ci(field: &str, values: &[String]) -> Option<Query> {
    match values {
        [] => None,
        [single] => Some(Query::term_ci(field, single)),
        many => Some(Query::any_ci(field, many)),
    }
}

fn saturating_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn strip_scheme(raw: &str) -> &str {
    raw.trim()
        .trim_start_matches("https://")
        .trim_start_matches("http://")
}

fn https_url(raw: &str) -> String {
    format!("https://{}", strip_scheme(raw).to_lowercase())
}

fn funder_url(raw: &str) -> String {
    let bare = strip_scheme(raw).to_lowercase();
    let bare = bare.strip_prefix("doi.org/").unwrap_or(&bare);
    format!("https://doi.org/{bare}")
}

fn orcid_url(raw: &str) -> String {
    let bare = strip_scheme(raw);
    let bare = bare.strip_prefix("orcid.org/").unwrap_or(bare);
    format!("{ORCID_PREFIX}{}", bare.to_uppercase())
}
