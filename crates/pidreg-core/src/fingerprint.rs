//! Deterministic request fingerprints used as cache keys.
#![allow(clippy::cast_possible_truncation)]

use sha2::{Digest, Sha256};
use std::fmt::{self, Write as _};

///
/// RequestFingerprint
///
/// Stable digest of a parameter bag. Key order, key case style, and blank
/// values do not change the fingerprint.
///

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct RequestFingerprint([u8; 32]);

impl RequestFingerprint {
    #[must_use]
    pub fn of_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut normalized: Vec<(String, String)> = pairs
            .into_iter()
            .filter_map(|(key, value)| {
                let value = value.as_ref().trim();
                (!value.is_empty()).then(|| (key.as_ref().trim().replace('_', "-"), value.to_string()))
            })
            .collect();
        normalized.sort();

        let mut hasher = Sha256::new();
        hasher.update(b"reqfp:v1");
        write_u32(&mut hasher, normalized.len() as u32);
        for (key, value) in &normalized {
            write_str(&mut hasher, key);
            write_str(&mut hasher, value);
        }

        let digest = hasher.finalize();
        let mut out = [0u8; 32];
        out.copy_from_slice(&digest);
        Self(out)
    }

    #[must_use]
    pub fn as_hex(&self) -> String {
        let mut out = String::with_capacity(64);
        for byte in self.0 {
            let _ = write!(out, "{byte:02x}");
        }
        out
    }
}

impl fmt::Display for RequestFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_hex())
    }
}

fn write_u32(hasher: &mut Sha256, value: u32) {
    hasher.update(value.to_be_bytes());
}

// Length-prefixed so adjacent strings cannot collide.
fn write_str(hasher: &mut Sha256, value: &str) {
    write_u32(hasher, value.len() as u32);
    hasher.update(value.as_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_ignores_order_case_style_and_blank_values() {
        let a = RequestFingerprint::of_pairs([("provider-id", "example"), ("state", "findable")]);
        let b = RequestFingerprint::of_pairs([
            ("state", "findable"),
            ("provider_id", "example"),
            ("query", " "),
        ]);

        assert_eq!(a, b);
        assert_eq!(a.as_hex().len(), 64);
    }

    #[test]
    fn fingerprint_separates_adjacent_values() {
        let a = RequestFingerprint::of_pairs([("a", "bc")]);
        let b = RequestFingerprint::of_pairs([("ab", "c")]);

        assert_ne!(a, b);
    }
}
