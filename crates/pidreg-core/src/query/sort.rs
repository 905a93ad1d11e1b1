use serde_json::{Value, json};

/// Pseudo-field carrying relevance.
pub const SCORE_FIELD: &str = "_score";

///
/// Direction
///
/// Sort direction shared by the query builder, cursor paging, and the
/// in-memory backend.
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

///
/// SortField
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SortField {
    pub field: String,
    pub direction: Direction,
}

impl SortField {
    #[must_use]
    pub fn new(field: &str, direction: Direction) -> Self {
        Self {
            field: field.to_string(),
            direction,
        }
    }

    #[must_use]
    pub fn to_json(&self) -> Value {
        json!({ self.field.clone(): { "order": self.direction.as_str() } })
    }
}

///
/// SortSpec
///
/// Caller-selectable orderings. Field sorts carry a direction parsed from a
/// leading `-`.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SortSpec {
    Relevance,
    Name(Direction),
    Created(Direction),
    Updated(Direction),
    Published(Direction),
    ViewCount(Direction),
    DownloadCount(Direction),
    CitationCount(Direction),
}

impl Default for SortSpec {
    fn default() -> Self {
        Self::Updated(Direction::Desc)
    }
}

impl SortSpec {
    /// Unknown sort names fall back to the default ordering.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        let (direction, name) = match raw.strip_prefix('-') {
            Some(name) => (Direction::Desc, name),
            None => (Direction::Asc, raw),
        };

        match name {
            "relevance" => Self::Relevance,
            "name" => Self::Name(direction),
            "created" => Self::Created(direction),
            "updated" => Self::Updated(direction),
            "published" => Self::Published(direction),
            "view-count" => Self::ViewCount(direction),
            "download-count" => Self::DownloadCount(direction),
            "citation-count" => Self::CitationCount(direction),
            _ => Self::default(),
        }
    }

    /// Concrete backend sort fields.
    #[must_use]
    pub fn fields(self) -> Vec<SortField> {
        let (field, direction) = match self {
            Self::Relevance => (SCORE_FIELD, Direction::Desc),
            Self::Name(d) => ("doi", d),
            Self::Created(d) => ("created", d),
            Self::Updated(d) => ("updated", d),
            Self::Published(d) => ("publication_year", d),
            Self::ViewCount(d) => ("view_count", d),
            Self::DownloadCount(d) => ("download_count", d),
            Self::CitationCount(d) => ("citation_count", d),
        };

        vec![SortField::new(field, direction)]
    }
}

/// Stable compound ordering required by cursor paging.
#[must_use]
pub fn cursor_sort() -> Vec<SortField> {
    vec![
        SortField::new("created", Direction::Asc),
        SortField::new("uid", Direction::Asc),
    ]
}
