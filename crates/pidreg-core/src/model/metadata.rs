use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Ordered list of metadata entries, each expected to be a JSON object.
pub type MetadataBlock = Vec<Value>;

///
/// Metadata
///
/// Bibliographic metadata blocks. Entries stay as raw JSON so that a
/// malformed entry (a bare string, say) can be reported by validation
/// instead of failing deserialization.
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Metadata {
    pub titles: MetadataBlock,
    pub creators: MetadataBlock,
    pub contributors: MetadataBlock,
    pub descriptions: MetadataBlock,
    pub dates: MetadataBlock,
    pub subjects: MetadataBlock,
    pub identifiers: MetadataBlock,
    pub related_identifiers: MetadataBlock,
    pub related_items: MetadataBlock,
    pub funding_references: MetadataBlock,
    pub rights_list: MetadataBlock,
    pub geo_locations: MetadataBlock,
}

impl Metadata {
    /// Every block with its singular label, in validation order.
    #[must_use]
    pub fn blocks(&self) -> [(&'static str, &'static str, &MetadataBlock); 12] {
        [
            ("titles", "Title", &self.titles),
            ("creators", "Creator", &self.creators),
            ("contributors", "Contributor", &self.contributors),
            ("descriptions", "Description", &self.descriptions),
            ("dates", "Date", &self.dates),
            ("subjects", "Subject", &self.subjects),
            ("identifiers", "Identifier", &self.identifiers),
            ("related_identifiers", "Related identifier", &self.related_identifiers),
            ("related_items", "Related item", &self.related_items),
            ("funding_references", "Funding reference", &self.funding_references),
            ("rights_list", "Rights", &self.rights_list),
            ("geo_locations", "Geolocation", &self.geo_locations),
        ]
    }

    #[must_use]
    pub fn title_texts(&self) -> Vec<String> {
        strings_at(&self.titles, "title")
    }

    #[must_use]
    pub fn description_texts(&self) -> Vec<String> {
        strings_at(&self.descriptions, "description")
    }

    #[must_use]
    pub fn creator_names(&self) -> Vec<String> {
        strings_at(&self.creators, "name")
    }

    #[must_use]
    pub fn related_identifier_values(&self) -> Vec<String> {
        strings_at(&self.related_identifiers, "relatedIdentifier")
            .into_iter()
            .map(|value| value.to_lowercase())
            .collect()
    }

    /// `(subject, scheme)` pairs.
    #[must_use]
    pub fn subject_pairs(&self) -> Vec<(String, Option<String>)> {
        objects(&self.subjects)
            .filter_map(|entry| {
                let subject = entry.get("subject")?.as_str()?.to_string();
                let scheme = entry
                    .get("subjectScheme")
                    .and_then(Value::as_str)
                    .map(str::to_string);
                Some((subject, scheme))
            })
            .collect()
    }

    #[must_use]
    pub fn funder_ids(&self) -> Vec<String> {
        strings_at(&self.funding_references, "funderIdentifier")
            .into_iter()
            .map(|id| normalize_doi_url(&id))
            .collect()
    }

    /// Lower-cased `rightsIdentifier` values (SPDX ids).
    #[must_use]
    pub fn license_ids(&self) -> Vec<String> {
        strings_at(&self.rights_list, "rightsIdentifier")
            .into_iter()
            .map(|id| id.to_lowercase())
            .collect()
    }

    /// `(affiliationIdentifier, name)` pairs across creators and contributors.
    #[must_use]
    pub fn affiliations(&self) -> Vec<(String, String)> {
        let mut out = Vec::new();
        for person in objects(&self.creators).chain(objects(&self.contributors)) {
            let Some(affiliations) = person.get("affiliation").and_then(Value::as_array) else {
                continue;
            };
            for affiliation in affiliations.iter().filter_map(Value::as_object) {
                let Some(id) = affiliation
                    .get("affiliationIdentifier")
                    .and_then(Value::as_str)
                else {
                    continue;
                };
                let name = affiliation
                    .get("name")
                    .and_then(Value::as_str)
                    .unwrap_or_default();
                let pair = (id.to_string(), name.to_string());
                if !out.contains(&pair) {
                    out.push(pair);
                }
            }
        }
        out
    }

    /// Name identifiers of creators/contributors under one scheme,
    /// optionally restricted to a `nameType`.
    #[must_use]
    pub fn name_identifiers(&self, scheme: &str, name_type: Option<&str>) -> Vec<String> {
        let mut out = Vec::new();
        for person in objects(&self.creators).chain(objects(&self.contributors)) {
            if let Some(wanted) = name_type
                && person.get("nameType").and_then(Value::as_str) != Some(wanted)
            {
                continue;
            }
            let Some(ids) = person.get("nameIdentifiers").and_then(Value::as_array) else {
                continue;
            };
            for id in ids.iter().filter_map(Value::as_object) {
                let matches_scheme = id
                    .get("nameIdentifierScheme")
                    .and_then(Value::as_str)
                    .is_some_and(|s| s.eq_ignore_ascii_case(scheme));
                if let (true, Some(value)) =
                    (matches_scheme, id.get("nameIdentifier").and_then(Value::as_str))
                    && !out.iter().any(|existing| existing == value)
                {
                    out.push(value.to_string());
                }
            }
        }
        out
    }
}

fn objects(block: &MetadataBlock) -> impl Iterator<Item = &serde_json::Map<String, Value>> {
    block.iter().filter_map(Value::as_object)
}

fn strings_at(block: &MetadataBlock, key: &str) -> Vec<String> {
    objects(block)
        .filter_map(|entry| entry.get(key).and_then(Value::as_str))
        .map(str::to_string)
        .collect()
}

// Funder ids are indexed as resolvable URLs.
fn normalize_doi_url(id: &str) -> String {
    let lower = id.trim().to_lowercase();
    if lower.starts_with("10.") {
        format!("https://doi.org/{lower}")
    } else {
        lower
    }
}

#[cfg(test)]
mod tests {
    use super::Metadata;
    use serde_json::json;

    fn sample() -> Metadata {
        serde_json::from_value(json!({
            "titles": [{"title": "Ocean Data"}, "bare string"],
            "creators": [{
                "name": "Garcia, Sofia",
                "nameType": "Personal",
                "nameIdentifiers": [{
                    "nameIdentifier": "https://orcid.org/0000-0001-5727-2427",
                    "nameIdentifierScheme": "ORCID"
                }],
                "affiliation": [{"name": "DataCite", "affiliationIdentifier": "https://ror.org/04wxnsj81"}]
            }],
            "fundingReferences": [{"funderIdentifier": "10.13039/501100000780"}],
            "rightsList": [{"rightsIdentifier": "CC-BY-4.0"}],
            "subjects": [{"subject": "FOS: Earth and related environmental sciences", "subjectScheme": "Fields of Science and Technology (FOS)"}]
        }))
        .expect("metadata fixture should deserialize")
    }

    #[test]
    fn accessors_skip_non_object_entries_and_normalize_ids() {
        let metadata = sample();

        assert_eq!(metadata.title_texts(), vec!["Ocean Data".to_string()]);
        assert_eq!(
            metadata.funder_ids(),
            vec!["https://doi.org/10.13039/501100000780".to_string()]
        );
        assert_eq!(metadata.license_ids(), vec!["cc-by-4.0".to_string()]);
        assert_eq!(
            metadata.affiliations(),
            vec![("https://ror.org/04wxnsj81".to_string(), "DataCite".to_string())]
        );
        assert_eq!(
            metadata.name_identifiers("orcid", Some("Personal")),
            vec!["https://orcid.org/0000-0001-5727-2427".to_string()]
        );
        assert!(metadata.name_identifiers("ROR", Some("Organizational")).is_empty());
    }
}
