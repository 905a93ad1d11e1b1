use derive_more::{Deref, Display};
use serde::{Deserialize, Serialize};

// Owner ids are compared case-insensitively, so the canonical form is lower case.
macro_rules! owner_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Clone, Debug, Deref, Deserialize, Display, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
        )]
        #[serde(transparent)]
        #[repr(transparent)]
        pub struct $name(String);

        impl $name {
            #[must_use]
            pub fn new(raw: &str) -> Self {
                Self(raw.trim().to_lowercase())
            }

            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(raw: &str) -> Self {
                Self::new(raw)
            }
        }
    };
}

owner_id! {
    ///
    /// ClientId
    /// Repository account symbol, e.g. `datacite.test`.
    ///
    ClientId
}

owner_id! {
    ///
    /// ProviderId
    /// Member organization symbol, e.g. `datacite`.
    ///
    ProviderId
}

owner_id! {
    ///
    /// ConsortiumId
    /// Provider acting as parent of other providers.
    ///
    ConsortiumId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owner_ids_normalize_to_trimmed_lower_case() {
        assert_eq!(ClientId::new(" DataCite.Test ").as_str(), "datacite.test");
        assert_eq!(ProviderId::from("EXAMPLE"), ProviderId::new("example"));
    }
}
