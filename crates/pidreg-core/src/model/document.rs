use crate::{
    casing,
    lifecycle::IdentifierState,
    model::{Client, Identifier, LandingPage, Provider, RegistrationAgency, RelationCounts},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const FOS_PREFIX: &str = "FOS: ";

///
/// SubjectEntry
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct SubjectEntry {
    pub subject: String,
    #[serde(default)]
    pub subject_scheme: Option<String>,
}

///
/// IdentifierDocument
///
/// Flattened projection of an identifier, its owners, and its relation
/// counters, as stored in the search index. Field names here are the field
/// paths the query builder and facet registry address.
///

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq, Serialize)]
#[serde(default)]
pub struct IdentifierDocument {
    pub uid: String,
    pub doi: String,
    pub url: Option<String>,
    pub state: IdentifierState,
    pub client_id: String,
    pub client_id_and_name: String,
    pub client_type: Option<String>,
    pub provider_id: String,
    pub provider_id_and_name: String,
    pub consortium_id: Option<String>,
    pub prefix: String,
    pub agency: RegistrationAgency,
    pub resource_type_id: Option<String>,
    pub resource_type_id_and_name: Option<String>,
    pub resource_type: Option<String>,
    pub publisher: Option<String>,
    pub schema_version: Option<String>,
    pub titles: Vec<String>,
    pub creator_names: Vec<String>,
    pub descriptions: Vec<String>,
    pub related_identifiers: Vec<String>,
    pub subjects: Vec<SubjectEntry>,
    pub fields_of_science: Vec<String>,
    pub funder_ids: Vec<String>,
    pub affiliation_ids: Vec<String>,
    pub affiliation_id_and_name: Vec<String>,
    pub organization_ids: Vec<String>,
    pub person_ids: Vec<String>,
    pub license_ids: Vec<String>,
    pub certificates: Vec<String>,
    pub language: Option<String>,
    pub source: Option<String>,
    pub publication_year: Option<i32>,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    pub registered: Option<DateTime<Utc>>,
    pub landing_page: Option<LandingPage>,
    #[serde(flatten)]
    pub counts: RelationCounts,
}

impl IdentifierDocument {
    /// Project an identifier and its owners into an index document.
    #[must_use]
    pub fn project(
        identifier: &Identifier,
        client: Option<&Client>,
        provider: Option<&Provider>,
        counts: RelationCounts,
    ) -> Self {
        let metadata = &identifier.metadata;
        let client_id = identifier.client_id.to_string();
        let provider_id = identifier.provider_id.to_string();
        let client_name = client.map_or(client_id.as_str(), |c| c.name.as_str());
        let provider_name = provider.map_or(provider_id.as_str(), |p| p.name.as_str());

        let resource_type_general = identifier.types.resource_type_general.as_deref();
        let resource_type_id = resource_type_general.map(casing::underscore);
        let resource_type_id_and_name = resource_type_general
            .map(|general| format!("{}:{}", casing::underscore(general), casing::titleize(general)));

        let subjects: Vec<SubjectEntry> = metadata
            .subject_pairs()
            .into_iter()
            .map(|(subject, subject_scheme)| SubjectEntry {
                subject,
                subject_scheme,
            })
            .collect();
        let fields_of_science = subjects
            .iter()
            .filter(|entry| entry.subject.starts_with(FOS_PREFIX))
            .map(|entry| entry.subject.clone())
            .collect();

        let affiliations = metadata.affiliations();

        Self {
            uid: identifier.uid(),
            doi: identifier.doi.to_string(),
            url: identifier.url.clone(),
            state: identifier.state,
            client_id_and_name: format!("{client_id}:{client_name}"),
            client_type: client.and_then(|c| c.client_type.clone()),
            provider_id_and_name: format!("{provider_id}:{provider_name}"),
            consortium_id: provider
                .and_then(|p| p.consortium_id.as_ref())
                .map(ToString::to_string),
            client_id,
            provider_id,
            prefix: identifier.doi.prefix().to_lowercase(),
            agency: identifier.agency,
            resource_type_id,
            resource_type_id_and_name,
            resource_type: identifier.types.resource_type.clone(),
            publisher: identifier.publisher.clone(),
            schema_version: identifier.schema_version.clone(),
            titles: metadata.title_texts(),
            creator_names: metadata.creator_names(),
            descriptions: metadata.description_texts(),
            related_identifiers: metadata.related_identifier_values(),
            subjects,
            fields_of_science,
            funder_ids: metadata.funder_ids(),
            affiliation_ids: affiliations.iter().map(|(id, _)| id.clone()).collect(),
            affiliation_id_and_name: affiliations
                .iter()
                .map(|(id, name)| format!("{id}:{name}"))
                .collect(),
            organization_ids: metadata.name_identifiers("ROR", Some("Organizational")),
            person_ids: metadata.name_identifiers("ORCID", None),
            license_ids: metadata.license_ids(),
            certificates: client.map(|c| c.certificates.clone()).unwrap_or_default(),
            language: identifier.language.as_ref().map(|l| l.to_lowercase()),
            source: identifier.source.clone(),
            publication_year: identifier.publication_year,
            created: identifier.created,
            updated: identifier.updated,
            registered: identifier.registered,
            landing_page: identifier.landing_page.clone(),
            counts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ClientId, Doi, ProviderId};
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn project_flattens_owner_names_and_resource_type_keys() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        let mut identifier = Identifier::draft(
            Doi::parse("10.5072/Proj").expect("doi should parse"),
            ClientId::new("example.repo"),
            ProviderId::new("example"),
            at,
        );
        identifier.types.resource_type_general = Some("JournalArticle".to_string());
        identifier.metadata.subjects =
            vec![json!({"subject": "FOS: Computer and information sciences"}), json!({"subject": "ocean"})];

        let client = Client::new("example.repo", "example", "Example Repository");
        let provider = Provider::new("example", "Example Org");
        let doc = IdentifierDocument::project(&identifier, Some(&client), Some(&provider), RelationCounts::default());

        assert_eq!(doc.uid, "10.5072/proj");
        assert_eq!(doc.prefix, "10.5072");
        assert_eq!(doc.client_id_and_name, "example.repo:Example Repository");
        assert_eq!(doc.provider_id_and_name, "example:Example Org");
        assert_eq!(doc.resource_type_id.as_deref(), Some("journal_article"));
        assert_eq!(
            doc.resource_type_id_and_name.as_deref(),
            Some("journal_article:Journal Article")
        );
        assert_eq!(doc.fields_of_science, vec!["FOS: Computer and information sciences".to_string()]);
        assert_eq!(doc.subjects.len(), 2);
    }
}
