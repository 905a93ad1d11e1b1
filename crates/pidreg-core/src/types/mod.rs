mod doi;
mod id;

pub use doi::{Doi, DoiParseError};
pub use id::{ClientId, ConsortiumId, ProviderId};
