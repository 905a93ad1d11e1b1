use crate::{
    DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE, OFFSET_WINDOW_CAP,
    error::{ErrorOrigin, RegistryError},
    page::{CursorKey, ScrollId, ScrollLifetime, decode_cursor},
};

///
/// PageRequest
///
/// Resolved paging mode. Exactly one mode applies per request: scroll when a
/// scroll lifetime is given, cursor when a cursor parameter is present (even
/// empty), offset otherwise.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum PageRequest {
    Offset {
        number: u32,
        size: u32,
    },
    Cursor {
        size: u32,
        after: Option<CursorKey>,
    },
    Scroll {
        size: u32,
        lifetime: ScrollLifetime,
        scroll_id: Option<ScrollId>,
    },
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::offset(1, DEFAULT_PAGE_SIZE)
    }
}

/// Deepest reachable page for offset paging.
#[must_use]
pub fn max_page_number(size: u32) -> u32 {
    if size == 0 {
        return 1;
    }

    u32::try_from(OFFSET_WINDOW_CAP / u64::from(size)).unwrap_or(u32::MAX).max(1)
}

impl PageRequest {
    /// Offset page with the size bounded and the number clamped into range.
    #[must_use]
    pub fn offset(number: u32, size: u32) -> Self {
        let size = size.min(MAX_PAGE_SIZE);

        Self::Offset {
            number: number.clamp(1, max_page_number(size)),
            size,
        }
    }

    /// Cursor page; an undecodable token restarts from the beginning.
    #[must_use]
    pub fn cursor(size: u32, token: &str) -> Self {
        let after = match decode_cursor(token) {
            Ok(key) => Some(key),
            Err(err) => {
                if !token.trim().is_empty() {
                    tracing::debug!(target: "pidreg::page", error = %err, "cursor token ignored");
                }
                None
            }
        };

        Self::Cursor {
            size: size.min(MAX_PAGE_SIZE),
            after,
        }
    }

    #[must_use]
    pub fn scroll(size: u32, lifetime: ScrollLifetime, scroll_id: Option<ScrollId>) -> Self {
        Self::Scroll {
            size: size.min(MAX_PAGE_SIZE),
            lifetime,
            scroll_id,
        }
    }

    /// Parse `page[number]`, `page[size]`, `page[cursor]`, `page[scroll]`,
    /// and `scroll-id` from a raw parameter list.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Result<Self, RegistryError>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut number = None;
        let mut size = None;
        let mut cursor = None;
        let mut scroll = None;
        let mut scroll_id = None;

        for (key, value) in pairs {
            let value = value.as_ref().trim();
            match key.as_ref().trim() {
                "page[number]" if !value.is_empty() => number = Some(parse_u32("page[number]", value)?),
                "page[size]" if !value.is_empty() => size = Some(parse_u32("page[size]", value)?),
                "page[cursor]" => cursor = Some(value.to_string()),
                "page[scroll]" if !value.is_empty() => {
                    scroll = Some(ScrollLifetime::parse(value).map_err(|msg| {
                        RegistryError::invalid_param(ErrorOrigin::Page, "page[scroll]", msg)
                    })?);
                }
                "scroll-id" | "scroll_id" if !value.is_empty() => {
                    scroll_id = Some(ScrollId::new(value));
                }
                _ => {}
            }
        }

        let size = size.unwrap_or(DEFAULT_PAGE_SIZE);
        let request = match (scroll, cursor) {
            (Some(lifetime), _) => Self::scroll(size, lifetime, scroll_id),
            (None, Some(token)) => Self::cursor(size, &token),
            (None, None) => Self::offset(number.unwrap_or(1), size),
        };

        Ok(request)
    }

    #[must_use]
    pub const fn size(&self) -> u32 {
        match self {
            Self::Offset { size, .. } | Self::Cursor { size, .. } | Self::Scroll { size, .. } => *size,
        }
    }

    /// Backend `from` offset; zero outside offset mode.
    #[must_use]
    pub fn from(&self) -> u64 {
        match self {
            Self::Offset { number, size } => u64::from(number.saturating_sub(1)) * u64::from(*size),
            Self::Cursor { .. } | Self::Scroll { .. } => 0,
        }
    }

    #[must_use]
    pub const fn is_scroll(&self) -> bool {
        matches!(self, Self::Scroll { .. })
    }
}

fn parse_u32(param: &str, value: &str) -> Result<u32, RegistryError> {
    value.parse().map_err(|_| {
        RegistryError::invalid_param(
            ErrorOrigin::Page,
            param,
            format!("{param} must be a non-negative integer"),
        )
    })
}
