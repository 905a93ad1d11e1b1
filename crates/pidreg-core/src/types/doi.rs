use derive_more::Display;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::str::FromStr;
use thiserror::Error as ThisError;

// Characters accepted in the suffix after the first slash.
const SUFFIX_PUNCTUATION: &[u8] = b"-._;()/:*~$=";

///
/// DoiParseError
///

#[derive(Debug, Eq, PartialEq, ThisError)]
pub enum DoiParseError {
    #[error("doi is empty")]
    Empty,

    #[error("doi must start with the 10. directory indicator")]
    MissingDirectory,

    #[error("doi registrant code must be 4 or 5 digits")]
    InvalidRegistrant,

    #[error("doi suffix is empty")]
    EmptySuffix,

    #[error("invalid character '{character}' in doi suffix at position {position}")]
    InvalidSuffix { character: char, position: usize },
}

///
/// Doi
///
/// Case-normalized persistent identifier. The canonical form is upper case;
/// the index key (`uid`) is the lower-cased form.
///

#[derive(Clone, Debug, Display, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Doi(String);

impl Doi {
    /// Parse and normalize a raw identifier string.
    ///
    /// Surrounding whitespace and a leading resolver prefix
    /// (`https://doi.org/`, `doi:`) are removed before validation.
    pub fn parse(raw: &str) -> Result<Self, DoiParseError> {
        let trimmed = strip_resolver_prefix(raw.trim());
        if trimmed.is_empty() {
            return Err(DoiParseError::Empty);
        }

        let Some(rest) = trimmed.strip_prefix("10.") else {
            return Err(DoiParseError::MissingDirectory);
        };
        let Some((registrant, suffix)) = rest.split_once('/') else {
            return Err(DoiParseError::EmptySuffix);
        };

        if !(4..=5).contains(&registrant.len()) || !registrant.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(DoiParseError::InvalidRegistrant);
        }
        if suffix.is_empty() {
            return Err(DoiParseError::EmptySuffix);
        }
        for (idx, character) in suffix.char_indices() {
            let accepted = character.is_ascii_alphanumeric()
                || (character.is_ascii() && SUFFIX_PUNCTUATION.contains(&(character as u8)));
            if !accepted {
                return Err(DoiParseError::InvalidSuffix {
                    character,
                    position: idx,
                });
            }
        }

        Ok(Self(trimmed.to_uppercase()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Lower-cased index key.
    #[must_use]
    pub fn uid(&self) -> String {
        self.0.to_lowercase()
    }

    /// Registrant prefix, e.g. `10.5072`.
    #[must_use]
    pub fn prefix(&self) -> &str {
        self.0.split_once('/').map_or(self.0.as_str(), |(p, _)| p)
    }

    #[must_use]
    pub fn suffix(&self) -> &str {
        self.0.split_once('/').map_or("", |(_, s)| s)
    }
}

fn strip_resolver_prefix(raw: &str) -> &str {
    const PREFIXES: [&str; 4] = [
        "https://doi.org/",
        "http://doi.org/",
        "https://dx.doi.org/",
        "doi:",
    ];

    PREFIXES
        .iter()
        .find_map(|prefix| {
            raw.get(..prefix.len())
                .filter(|head| head.eq_ignore_ascii_case(prefix))
                .map(|_| &raw[prefix.len()..])
        })
        .unwrap_or(raw)
}

impl FromStr for Doi {
    type Err = DoiParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Doi {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Doi {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::{Doi, DoiParseError};

    #[test]
    fn parse_normalizes_case_and_strips_resolver_prefix() {
        let doi = Doi::parse(" https://doi.org/10.5072/abc-123 ").expect("doi should parse");

        assert_eq!(doi.as_str(), "10.5072/ABC-123");
        assert_eq!(doi.uid(), "10.5072/abc-123");
        assert_eq!(doi.prefix(), "10.5072");
        assert_eq!(doi.suffix(), "ABC-123");
    }

    #[test]
    fn parse_rejects_malformed_registrant_and_suffix() {
        assert_eq!(Doi::parse(""), Err(DoiParseError::Empty));
        assert_eq!(
            Doi::parse("11.5072/x"),
            Err(DoiParseError::MissingDirectory)
        );
        assert_eq!(
            Doi::parse("10.507/x"),
            Err(DoiParseError::InvalidRegistrant)
        );
        assert_eq!(Doi::parse("10.5072/"), Err(DoiParseError::EmptySuffix));
        assert_eq!(
            Doi::parse("10.5072/a b"),
            Err(DoiParseError::InvalidSuffix {
                character: ' ',
                position: 1
            })
        );
    }

    #[test]
    fn parse_accepts_every_suffix_punctuation_mark() {
        Doi::parse("10.12345/a-b.c_d;e(f)g/h:i*j~k$l=m").expect("punctuated suffix should parse");
    }
}
