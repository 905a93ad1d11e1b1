use crate::facet::{AggregationKind, AggregationRequest, FacetSelection};

///
/// BucketKind
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BucketKind {
    Terms,
    /// Yearly `date_histogram` over a timestamp.
    CalendarYears,
    /// Histogram with interval 1 over an integer year field.
    Years,
    /// Yearly histogram on the publication year summing a counter field.
    YearlySum { metric: &'static str },
}

///
/// Formatter
///
/// Shapes raw buckets into `{id, title, count}` triples.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Formatter {
    /// `title` is the titleized key.
    ByKey,
    /// `title` is the key unchanged.
    Plain,
    /// Key is `id:title`.
    CombinedKey,
    /// `id:title` with the id dasherized.
    ResourceType,
    Schema,
    License,
    Source,
    Agency,
    FieldOfScience,
    /// Most recent years first, at most ten.
    RecentYears,
    /// Years between 2010 and the current year, most recent first.
    PublishedYears,
    /// Per-year metric sums, zero sums dropped.
    MetricByYear,
}

///
/// FacetDimension
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct FacetDimension {
    pub name: &'static str,
    pub field: &'static str,
    pub bucket: BucketKind,
    pub formatter: Formatter,
}

impl FacetDimension {
    const fn new(
        name: &'static str,
        field: &'static str,
        bucket: BucketKind,
        formatter: Formatter,
    ) -> Self {
        Self {
            name,
            field,
            bucket,
            formatter,
        }
    }

    /// A record can hold several values of this field and is counted once
    /// under each, so bucket counts may sum past the matching total. Any
    /// single bucket still stays within it.
    #[must_use]
    pub fn is_multi_valued(&self) -> bool {
        MULTI_VALUED_FIELDS.contains(&self.field)
    }

    /// Buckets carry a summed counter instead of a record count and are
    /// not bounded by the matching total at all.
    #[must_use]
    pub const fn is_metric(&self) -> bool {
        matches!(self.bucket, BucketKind::YearlySum { .. })
    }

    /// Aggregation request for this dimension at the given terms size.
    #[must_use]
    pub fn aggregation(&self, size: u32) -> AggregationRequest {
        let kind = match self.bucket {
            BucketKind::Terms => AggregationKind::Terms {
                field: self.field.to_string(),
                size,
                top_hits: None,
                sub: Vec::new(),
            },
            BucketKind::CalendarYears => AggregationKind::YearHistogram {
                field: self.field.to_string(),
                calendar: true,
                metric_sum: None,
            },
            BucketKind::Years => AggregationKind::YearHistogram {
                field: self.field.to_string(),
                calendar: false,
                metric_sum: None,
            },
            BucketKind::YearlySum { metric } => AggregationKind::YearHistogram {
                field: self.field.to_string(),
                calendar: false,
                metric_sum: Some(metric.to_string()),
            },
        };

        AggregationRequest {
            name: self.name.to_string(),
            kind,
        }
    }
}

// Array-valued document fields.
const MULTI_VALUED_FIELDS: &[&str] = &[
    "affiliation_id_and_name",
    "certificates",
    "license_ids",
    "subjects.subject",
    "fields_of_science",
    "funder_ids",
];

const IDENTIFIER_DIMENSIONS: &[FacetDimension] = &[
    FacetDimension::new("states", "state", BucketKind::Terms, Formatter::ByKey),
    FacetDimension::new(
        "resourceTypes",
        "resource_type_id_and_name",
        BucketKind::Terms,
        Formatter::ResourceType,
    ),
    FacetDimension::new("created", "created", BucketKind::CalendarYears, Formatter::RecentYears),
    FacetDimension::new(
        "registered",
        "registered",
        BucketKind::CalendarYears,
        Formatter::RecentYears,
    ),
    FacetDimension::new(
        "published",
        "publication_year",
        BucketKind::Years,
        Formatter::PublishedYears,
    ),
    FacetDimension::new(
        "providers",
        "provider_id_and_name",
        BucketKind::Terms,
        Formatter::CombinedKey,
    ),
    FacetDimension::new("clients", "client_id_and_name", BucketKind::Terms, Formatter::CombinedKey),
    FacetDimension::new(
        "affiliations",
        "affiliation_id_and_name",
        BucketKind::Terms,
        Formatter::CombinedKey,
    ),
    FacetDimension::new("prefixes", "prefix", BucketKind::Terms, Formatter::Plain),
    FacetDimension::new("certificates", "certificates", BucketKind::Terms, Formatter::ByKey),
    FacetDimension::new("licenses", "license_ids", BucketKind::Terms, Formatter::License),
    FacetDimension::new("schemaVersions", "schema_version", BucketKind::Terms, Formatter::Schema),
    FacetDimension::new(
        "linkChecksStatus",
        "landing_page.status",
        BucketKind::Terms,
        Formatter::Plain,
    ),
    FacetDimension::new("subjects", "subjects.subject", BucketKind::Terms, Formatter::Plain),
    FacetDimension::new(
        "fieldsOfScience",
        "fields_of_science",
        BucketKind::Terms,
        Formatter::FieldOfScience,
    ),
    FacetDimension::new("funders", "funder_ids", BucketKind::Terms, Formatter::Plain),
    FacetDimension::new("sources", "source", BucketKind::Terms, Formatter::Source),
    FacetDimension::new("registrationAgencies", "agency", BucketKind::Terms, Formatter::Agency),
    FacetDimension::new(
        "citations",
        "publication_year",
        BucketKind::YearlySum {
            metric: "citation_count",
        },
        Formatter::MetricByYear,
    ),
    FacetDimension::new(
        "views",
        "publication_year",
        BucketKind::YearlySum { metric: "view_count" },
        Formatter::MetricByYear,
    ),
    FacetDimension::new(
        "downloads",
        "publication_year",
        BucketKind::YearlySum {
            metric: "download_count",
        },
        Formatter::MetricByYear,
    ),
];

///
/// FacetRegistry
///

#[derive(Clone, Copy, Debug)]
pub struct FacetRegistry {
    dimensions: &'static [FacetDimension],
}

impl FacetRegistry {
    /// Dimensions faceted on identifier searches.
    #[must_use]
    pub const fn identifiers() -> Self {
        Self {
            dimensions: IDENTIFIER_DIMENSIONS,
        }
    }

    #[must_use]
    pub const fn dimensions(&self) -> &'static [FacetDimension] {
        self.dimensions
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&'static FacetDimension> {
        self.dimensions.iter().find(|d| d.name == name)
    }

    /// Aggregations for every selected dimension.
    #[must_use]
    pub fn aggregations(&self, selection: &FacetSelection) -> Vec<AggregationRequest> {
        if selection.is_disabled() {
            return Vec::new();
        }

        self.dimensions
            .iter()
            .filter(|d| selection.includes(d.name))
            .map(|d| d.aggregation(selection.size()))
            .collect()
    }
}
