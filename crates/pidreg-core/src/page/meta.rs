use crate::{OFFSET_WINDOW_CAP, page::ScrollId};
use serde::Serialize;

///
/// PageMeta
///
/// Paging metadata for exactly one mode.
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PageMeta {
    Offset {
        total: u64,
        #[serde(rename = "totalPages")]
        total_pages: u64,
        page: u32,
    },
    Cursor {
        total: u64,
        #[serde(rename = "totalPages")]
        total_pages: u64,
        #[serde(rename = "nextCursor", skip_serializing_if = "Option::is_none")]
        next_cursor: Option<String>,
    },
    Scroll {
        total: u64,
        #[serde(rename = "scrollId", skip_serializing_if = "Option::is_none")]
        scroll_id: Option<ScrollId>,
    },
}

impl PageMeta {
    #[must_use]
    pub const fn total(&self) -> u64 {
        match self {
            Self::Offset { total, .. } | Self::Cursor { total, .. } | Self::Scroll { total, .. } => {
                *total
            }
        }
    }
}

/// Offset paging counts pages against the capped window.
#[must_use]
pub fn offset_total_pages(total: u64, size: u32) -> u64 {
    if size == 0 {
        return 0;
    }
    total.min(OFFSET_WINDOW_CAP).div_ceil(u64::from(size))
}

/// Cursor paging counts pages against the true total.
#[must_use]
pub fn cursor_total_pages(total: u64, size: u32) -> u64 {
    if size == 0 {
        return 0;
    }

    total.div_ceil(u64::from(size))
}
