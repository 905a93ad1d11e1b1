//! Module: page
//! Responsibility: selection and resolution of the three paging modes,
//! cursor token codec, scroll handles, and per-mode response metadata.
//! Does not own: executing the backend call (see `search`).

mod cursor;
mod meta;
mod request;
mod scroll;


pub use cursor::{CursorDecodeError, CursorKey, MAX_CURSOR_TOKEN_LEN, decode_cursor, encode_cursor};
pub use meta::{PageMeta, cursor_total_pages, offset_total_pages};
pub use request::{PageRequest, max_page_number};
pub use scroll::{MAX_SCROLL_LIFETIME, ScrollId, ScrollLifetime};
