//! Module: model
//! Responsibility: identifier aggregate, owners, relation counters, and the
//! flattened document projection handed to the search backend.

mod agency;
mod document;
mod identifier;
mod landing_page;
mod metadata;
mod owner;
mod relation;

pub use agency::RegistrationAgency;
pub use document::{IdentifierDocument, SubjectEntry};
pub use identifier::{Identifier, ResourceTypes};
pub use landing_page::LandingPage;
pub use metadata::{MetadataBlock, Metadata};
pub use owner::{Client, Provider};
pub use relation::{RelationCounter, RelationCounts, RelationEvent, RelationType};
