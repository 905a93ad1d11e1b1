use derive_more::{Deref, Display};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Longest snapshot lease a caller may request.
pub const MAX_SCROLL_LIFETIME: Duration = Duration::from_secs(60 * 60);

///
/// ScrollId
///
/// Opaque backend handle for a scroll snapshot.
///

#[derive(Clone, Debug, Deref, Deserialize, Display, Eq, Hash, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ScrollId(String);

impl ScrollId {
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

///
/// ScrollLifetime
///
/// Snapshot lease renewed by every scroll call. Parsed from `<n>s`, `<n>m`,
/// or `<n>h`; a bare number is seconds.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ScrollLifetime(Duration);

impl ScrollLifetime {
    #[must_use]
    pub fn new(duration: Duration) -> Self {
        Self(duration.min(MAX_SCROLL_LIFETIME))
    }

    pub fn parse(raw: &str) -> Result<Self, String> {
        let raw = raw.trim();
        let (digits, unit) = match raw.char_indices().find(|(_, c)| !c.is_ascii_digit()) {
            Some((idx, _)) => raw.split_at(idx),
            None => (raw, "s"),
        };
        let amount: u64 = digits
            .parse()
            .map_err(|_| format!("invalid scroll lifetime '{raw}'"))?;
        let seconds = match unit {
            "s" => amount,
            "m" => amount.saturating_mul(60),
            "h" => amount.saturating_mul(3600),
            _ => return Err(format!("invalid scroll lifetime unit in '{raw}'")),
        };
        if seconds == 0 {
            return Err("scroll lifetime must be positive".to_string());
        }

        Ok(Self::new(Duration::from_secs(seconds)))
    }

    #[must_use]
    pub const fn duration(self) -> Duration {
        self.0
    }

    /// Backend keep-alive parameter, e.g. `90s`.
    #[must_use]
    pub fn as_param(self) -> String {
        match self.0.as_secs() {
            0 => format!("{}ms", self.0.as_millis().max(1)),
            secs => format!("{secs}s"),
        }
    }
}
