//! Cursor codec helpers.
//!
//! Owns the opaque wire-token format for cursor paging: URL-safe base64 of
//! `<created-millis>,<uid>`. No query semantics live here.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use serde_json::Value;

// Decode bound for untrusted cursor token input.
pub const MAX_CURSOR_TOKEN_LEN: usize = 1024;

///
/// CursorDecodeError
///

#[derive(Debug, Eq, thiserror::Error, PartialEq)]
pub enum CursorDecodeError {
    #[error("cursor token is empty")]
    Empty,

    #[error("cursor token exceeds max length: {len} chars (max {max})")]
    TooLong { len: usize, max: usize },

    #[error("cursor token is not valid base64")]
    InvalidBase64,

    #[error("cursor token payload is not valid utf-8")]
    InvalidUtf8,

    #[error("cursor token payload must be '<timestamp>,<uid>'")]
    InvalidPayload,
}

///
/// CursorKey
///
/// Sort-key tuple of the last hit on a cursor page.
///

#[derive(Clone, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub struct CursorKey {
    pub created_millis: i64,
    pub uid: String,
}

impl CursorKey {
    /// Read a key from a hit's `[created, uid]` sort values.
    #[must_use]
    pub fn from_sort_values(values: &[Value]) -> Option<Self> {
        match values {
            [created, uid] => Some(Self {
                created_millis: created.as_i64()?,
                uid: uid.as_str()?.to_string(),
            }),
            _ => None,
        }
    }

    /// `search_after` wire form.
    #[must_use]
    pub fn to_sort_values(&self) -> Vec<Value> {
        vec![Value::from(self.created_millis), Value::from(self.uid.clone())]
    }
}

/// Encode a cursor key as an opaque token.
#[must_use]
pub fn encode_cursor(key: &CursorKey) -> String {
    URL_SAFE_NO_PAD.encode(format!("{},{}", key.created_millis, key.uid))
}

/// Decode an opaque token into a cursor key.
///
/// Surrounding whitespace and trailing `=` padding are tolerated.
pub fn decode_cursor(token: &str) -> Result<CursorKey, CursorDecodeError> {
    let token = token.trim();

    if token.is_empty() {
        return Err(CursorDecodeError::Empty);
    }

    if token.len() > MAX_CURSOR_TOKEN_LEN {
        return Err(CursorDecodeError::TooLong {
            len: token.len(),
            max: MAX_CURSOR_TOKEN_LEN,
        });
    }

    let bytes = URL_SAFE_NO_PAD
        .decode(token.trim_end_matches('='))
        .map_err(|_| CursorDecodeError::InvalidBase64)?;
    let payload = String::from_utf8(bytes).map_err(|_| CursorDecodeError::InvalidUtf8)?;

    let (created, uid) = payload
        .split_once(',')
        .ok_or(CursorDecodeError::InvalidPayload)?;
    let created_millis = created
        .parse()
        .map_err(|_| CursorDecodeError::InvalidPayload)?;
    if uid.is_empty() {
        return Err(CursorDecodeError::InvalidPayload);
    }

    Ok(CursorKey {
        created_millis,
        uid: uid.to_string(),
    })
}

///
/// TESTS
///
