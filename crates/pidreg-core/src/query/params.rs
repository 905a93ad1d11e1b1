use crate::{
    error::{ErrorOrigin, RegistryError},
    facet::{FacetSelection, TotalsScope},
    lifecycle::IdentifierState,
    query::sort::SortSpec,
};
use std::str::FromStr;

/// Hits returned per sample group when `sample` is absent.
pub const DEFAULT_SAMPLE_SIZE: u32 = 1;

///
/// QueryType
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum QueryType {
    /// AND-combined query-string match.
    #[default]
    QueryString,
    /// Phrase-prefix match with bounded expansions.
    PhrasePrefix,
}

///
/// YearRange
///
/// Inclusive year window parsed from `YYYY` or `YYYY,YYYY` (either order).
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct YearRange {
    pub min: i32,
    pub max: i32,
}

impl YearRange {
    fn parse(param: &str, raw: &str) -> Result<Self, RegistryError> {
        let years = raw
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| parse_year(param, part))
            .collect::<Result<Vec<_>, _>>()?;

        match (years.iter().min(), years.iter().max()) {
            (Some(min), Some(max)) if years.len() <= 2 => Ok(Self {
                min: *min,
                max: *max,
            }),
            _ => Err(invalid(param, format!("{param} must be YYYY or YYYY,YYYY"))),
        }
    }
}

fn parse_year(param: &str, raw: &str) -> Result<i32, RegistryError> {
    if raw.len() == 4 && raw.bytes().all(|b| b.is_ascii_digit()) {
        raw.parse()
            .map_err(|_| invalid(param, format!("{param} has an invalid year '{raw}'")))
    } else {
        Err(invalid(param, format!("{param} has an invalid year '{raw}'")))
    }
}

///
/// SampleGroup
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SampleGroup {
    Client,
    Provider,
    ResourceType,
}

impl SampleGroup {
    #[must_use]
    pub const fn field(self) -> &'static str {
        match self {
            Self::Client => "client_id",
            Self::Provider => "provider_id",
            Self::ResourceType => "resource_type_id",
        }
    }
}

impl FromStr for SampleGroup {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "client" | "data-center" => Ok(Self::Client),
            "provider" => Ok(Self::Provider),
            "resource-type" => Ok(Self::ResourceType),
            other => Err(format!("unknown sample group '{other}'")),
        }
    }
}

///
/// Sample
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Sample {
    pub group: SampleGroup,
    pub size: u32,
}

///
/// RelationThresholds
///
/// `has-*` filters: keep identifiers whose counter is at least the value.
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct RelationThresholds {
    pub citations: Option<u64>,
    pub references: Option<u64>,
    pub parts: Option<u64>,
    pub part_of: Option<u64>,
    pub versions: Option<u64>,
    pub version_of: Option<u64>,
    pub views: Option<u64>,
    pub downloads: Option<u64>,
}

impl RelationThresholds {
    /// `(counter field, threshold)` for every present threshold.
    #[must_use]
    pub fn present(&self) -> Vec<(&'static str, u64)> {
        [
            ("citation_count", self.citations),
            ("reference_count", self.references),
            ("part_count", self.parts),
            ("part_of_count", self.part_of),
            ("version_count", self.versions),
            ("version_of_count", self.version_of),
            ("view_count", self.views),
            ("download_count", self.downloads),
        ]
        .into_iter()
        .filter_map(|(field, threshold)| threshold.map(|t| (field, t)))
        .collect()
    }
}

///
/// LinkCheckFilters
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct LinkCheckFilters {
    pub status: Option<u16>,
    pub checked: bool,
    pub has_schema_org: Option<bool>,
    pub body_has_pid: Option<bool>,
    pub found_schema_org_id: bool,
    pub found_dc_identifier: bool,
    pub found_citation_doi: bool,
    pub redirect_count_gte: Option<u64>,
}

///
/// SearchParams
///
/// Typed search parameter bag. Blank values are treated as absent.
///

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SearchParams {
    pub query: Option<String>,
    pub query_type: QueryType,
    pub ids: Vec<String>,
    pub states: Vec<IdentifierState>,
    pub provider_ids: Vec<String>,
    pub client_ids: Vec<String>,
    pub consortium_id: Option<String>,
    pub prefixes: Vec<String>,
    pub resource_type_ids: Vec<String>,
    pub resource_types: Vec<String>,
    pub schema_version: Option<String>,
    pub subjects: Vec<String>,
    pub fields_of_science: Vec<String>,
    pub funder_ids: Vec<String>,
    pub affiliation_ids: Vec<String>,
    pub organization_ids: Vec<String>,
    pub user_ids: Vec<String>,
    pub created: Option<YearRange>,
    pub registered: Option<YearRange>,
    pub published: Option<YearRange>,
    pub sources: Vec<String>,
    pub certificates: Vec<String>,
    pub licenses: Vec<String>,
    pub languages: Vec<String>,
    pub agencies: Vec<String>,
    pub client_type: Option<String>,
    pub thresholds: RelationThresholds,
    pub has_person: bool,
    pub has_affiliation: bool,
    pub has_organization: bool,
    pub has_funder: bool,
    pub link_check: LinkCheckFilters,
    pub exclude_registration_agencies: bool,
    pub random: bool,
    pub sample: Option<Sample>,
    pub sort: Option<SortSpec>,
    pub facets: FacetSelection,
    pub totals: Option<TotalsScope>,
}

impl SearchParams {
    /// Parse a raw parameter list. Keys accept kebab or snake case; unknown
    /// keys (including page parameters) are ignored.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Result<Self, RegistryError>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut params = Self::default();
        let mut sample_group = None;
        let mut sample_size = None;

        for (key, value) in pairs {
            let key = key.as_ref().trim().replace('_', "-");
            let value = value.as_ref().trim();
            if value.is_empty() {
                continue;
            }
            params.apply(&key, value, &mut sample_group, &mut sample_size)?;
        }

        if let Some(group) = sample_group {
            params.sample = Some(Sample {
                group,
                size: sample_size.unwrap_or(DEFAULT_SAMPLE_SIZE),
            });
        }

        Ok(params)
    }

    #[allow(clippy::too_many_lines)]
    fn apply(
        &mut self,
        key: &str,
        value: &str,
        sample_group: &mut Option<SampleGroup>,
        sample_size: &mut Option<u32>,
    ) -> Result<(), RegistryError> {
        match key {
            "query" => self.query = Some(value.to_string()),
            "query-type" => {
                self.query_type = match value {
                    "query-string" => QueryType::QueryString,
                    "phrase-prefix" => QueryType::PhrasePrefix,
                    other => return Err(invalid(key, format!("unknown query-type '{other}'"))),
                }
            }
            "ids" => self.ids = list(value),
            "state" => {
                self.states = list(value)
                    .iter()
                    .map(|state| state.parse().map_err(|msg: String| invalid(key, msg)))
                    .collect::<Result<_, _>>()?;
            }
            "provider-id" => self.provider_ids = list(value),
            "client-id" => self.client_ids = list(value),
            "consortium-id" => self.consortium_id = Some(value.to_lowercase()),
            "prefix" => self.prefixes = list(value),
            "resource-type-id" => self.resource_type_ids = list(value),
            "resource-type" => self.resource_types = list(value),
            "schema-version" => self.schema_version = Some(value.to_string()),
            "subject" => self.subjects = list(value),
            "field-of-science" => self.fields_of_science = list(value),
            "funder-id" => self.funder_ids = list(value),
            "affiliation-id" => self.affiliation_ids = list(value),
            "organization-id" => self.organization_ids = list(value),
            "user-id" => self.user_ids = list(value),
            "created" => self.created = Some(YearRange::parse(key, value)?),
            "registered" => self.registered = Some(YearRange::parse(key, value)?),
            "published" => self.published = Some(YearRange::parse(key, value)?),
            "source" => self.sources = list(value),
            "certificate" => self.certificates = list(value),
            "license" => self.licenses = list(value),
            "language" => self.languages = list(value),
            "agency" => self.agencies = list(value),
            "client-type" => self.client_type = Some(value.to_string()),
            "has-citations" => self.thresholds.citations = Some(threshold(key, value)?),
            "has-references" => self.thresholds.references = Some(threshold(key, value)?),
            "has-parts" => self.thresholds.parts = Some(threshold(key, value)?),
            "has-part-of" => self.thresholds.part_of = Some(threshold(key, value)?),
            "has-versions" => self.thresholds.versions = Some(threshold(key, value)?),
            "has-version-of" => self.thresholds.version_of = Some(threshold(key, value)?),
            "has-views" => self.thresholds.views = Some(threshold(key, value)?),
            "has-downloads" => self.thresholds.downloads = Some(threshold(key, value)?),
            "has-person" => self.has_person = flag(key, value)?,
            "has-affiliation" => self.has_affiliation = flag(key, value)?,
            "has-organization" => self.has_organization = flag(key, value)?,
            "has-funder" => self.has_funder = flag(key, value)?,
            "link-check-status" => {
                self.link_check.status = Some(
                    value
                        .parse()
                        .map_err(|_| invalid(key, format!("{key} must be an HTTP status")))?,
                );
            }
            "link-checked" => self.link_check.checked = flag(key, value)?,
            "link-check-has-schema-org" => self.link_check.has_schema_org = Some(flag(key, value)?),
            "link-check-body-has-pid" => self.link_check.body_has_pid = Some(flag(key, value)?),
            "link-check-found-schema-org-id" => {
                self.link_check.found_schema_org_id = flag(key, value)?;
            }
            "link-check-found-dc-identifier" => {
                self.link_check.found_dc_identifier = flag(key, value)?;
            }
            "link-check-found-citation-doi" => {
                self.link_check.found_citation_doi = flag(key, value)?;
            }
            "link-check-redirect-count-gte" => {
                self.link_check.redirect_count_gte = Some(count(key, value)?);
            }
            "exclude-registration-agencies" => {
                self.exclude_registration_agencies = flag(key, value)?;
            }
            "random" => self.random = flag(key, value)?,
            "sample-group" => {
                *sample_group = Some(value.parse().map_err(|msg: String| invalid(key, msg))?);
            }
            "sample" => {
                let size = count(key, value)?;
                *sample_size = Some(u32::try_from(size).map_err(|_| invalid(key, "sample is too large"))?);
            }
            "sort" => self.sort = Some(SortSpec::parse(value)),
            "disable-facets" => {
                if flag(key, value)? {
                    self.facets = FacetSelection::disabled();
                }
            }
            "include-aggregations" => self.facets = std::mem::take(&mut self.facets).with_include(value),
            "facet-count" => {
                let size = count(key, value)?;
                let size = u32::try_from(size).map_err(|_| invalid(key, "facet-count is too large"))?;
                self.facets = std::mem::take(&mut self.facets).with_size(size);
            }
            "totals" => {
                self.totals = Some(value.parse().map_err(|msg: String| invalid(key, msg))?);
            }
            _ => {}
        }

        Ok(())
    }
}

fn invalid(param: &str, message: impl Into<String>) -> RegistryError {
    RegistryError::invalid_param(ErrorOrigin::Query, param, message)
}

fn list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}

fn count(param: &str, value: &str) -> Result<u64, RegistryError> {
    value
        .parse()
        .map_err(|_| invalid(param, format!("{param} must be a non-negative integer")))
}

// `true` asks for at least one, `false` for no restriction.
fn threshold(param: &str, value: &str) -> Result<u64, RegistryError> {
    match value.trim().to_lowercase().as_str() {
        "true" | "yes" => Ok(1),
        "false" | "no" => Ok(0),
        raw => count(param, raw),
    }
}

fn flag(param: &str, value: &str) -> Result<bool, RegistryError> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(invalid(param, format!("{param} must be true or false"))),
    }
}
