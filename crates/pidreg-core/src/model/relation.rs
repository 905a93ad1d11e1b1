use crate::types::Doi;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

///
/// RelationType
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RelationType {
    Citation,
    Reference,
    Part,
    PartOf,
    Version,
    VersionOf,
    View,
    Download,
}

///
/// RelationEvent
///
/// One observed relation between an identifier and another object.
/// Usage events (views, downloads) carry the aggregated `total` for their
/// reporting period; link events count as one.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct RelationEvent {
    pub subject: Doi,
    pub relation: RelationType,
    pub total: u64,
    pub occurred: DateTime<Utc>,
}

///
/// RelationCounts
///
/// Counters derived from relation events at read time.
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct RelationCounts {
    pub citation_count: u64,
    pub reference_count: u64,
    pub part_count: u64,
    pub part_of_count: u64,
    pub version_count: u64,
    pub version_of_count: u64,
    pub view_count: u64,
    pub download_count: u64,
}

impl RelationCounts {
    /// Fold the events that concern `doi` into counters.
    #[must_use]
    pub fn aggregate<'a>(doi: &Doi, events: impl IntoIterator<Item = &'a RelationEvent>) -> Self {
        let mut counts = Self::default();
        for event in events.into_iter().filter(|event| &event.subject == doi) {
            let slot = match event.relation {
                RelationType::Citation => &mut counts.citation_count,
                RelationType::Reference => &mut counts.reference_count,
                RelationType::Part => &mut counts.part_count,
                RelationType::PartOf => &mut counts.part_of_count,
                RelationType::Version => &mut counts.version_count,
                RelationType::VersionOf => &mut counts.version_of_count,
                RelationType::View => &mut counts.view_count,
                RelationType::Download => &mut counts.download_count,
            };
            *slot = slot.saturating_add(event.total);
        }
        counts
    }
}

///
/// RelationCounter
///
/// Read-side source of relation counters; the counters are never stored on
/// the identifier itself.
///

pub trait RelationCounter: Send + Sync {
    fn counts_for(&self, doi: &Doi) -> RelationCounts;
}

impl RelationCounter for Vec<RelationEvent> {
    fn counts_for(&self, doi: &Doi) -> RelationCounts {
        RelationCounts::aggregate(doi, self.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn aggregate_sums_only_events_for_the_requested_identifier() {
        let ours = Doi::parse("10.5072/one").expect("doi should parse");
        let theirs = Doi::parse("10.5072/two").expect("doi should parse");
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let events = vec![
            RelationEvent { subject: ours.clone(), relation: RelationType::View, total: 7, occurred: at },
            RelationEvent { subject: ours.clone(), relation: RelationType::View, total: 3, occurred: at },
            RelationEvent { subject: ours.clone(), relation: RelationType::Citation, total: 1, occurred: at },
            RelationEvent { subject: theirs, relation: RelationType::Download, total: 9, occurred: at },
        ];

        let counts = events.counts_for(&ours);

        assert_eq!(counts.view_count, 10);
        assert_eq!(counts.citation_count, 1);
        assert_eq!(counts.download_count, 0);
    }
}
