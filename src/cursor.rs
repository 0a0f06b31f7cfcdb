//! Opaque pagination tokens.
//!
//! A token carries everything needed to continue a paging session: where the next
//! page starts, the total captured on the first page, and the page size the session
//! was started with. Nothing is held server-side, so tokens survive restarts and can
//! be shared between processes.
//!
//! Layout before encoding: `position|||total|||page_size`. The total slot may be empty,
//! and the page size is always the last field. The joined text is URL-safe base64.

use crate::error::{Error, Result};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};

const DELIMITER: &str = "|||";

/// Decoded pagination state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageCursor {
    /// Opaque ordered key where the next page starts. `None` on the first page.
    pub position: Option<String>,
    /// Total captured on the first page of the session.
    pub total: Option<u64>,
    /// Rows per page. Zero means metadata only.
    pub page_size: u32,
}

impl PageCursor {
    /// The cursor for the first page of a new session.
    pub fn first_page(page_size: u32) -> Self {
        Self {
            position: None,
            total: None,
            page_size,
        }
    }

    pub fn new(position: impl Into<String>, total: Option<u64>, page_size: u32) -> Self {
        let position = position.into();
        Self {
            position: (!position.is_empty()).then_some(position),
            total,
            page_size,
        }
    }

    pub fn is_first_page(&self) -> bool {
        self.position.is_none()
    }

    /// Continue this session at `position`, carrying the total and page size forward.
    pub fn advance(&self, position: impl Into<String>, total: u64) -> Self {
        Self::new(position, Some(self.total.unwrap_or(total)), self.page_size)
    }

    pub fn encode(&self) -> String {
        encode(self)
    }
}

/// Serialize a cursor into its opaque token.
pub fn encode(cursor: &PageCursor) -> String {
    let total = cursor.total.map(|t| t.to_string()).unwrap_or_default();
    let page_size = cursor.page_size.to_string();
    let joined = [
        cursor.position.as_deref().unwrap_or(""),
        total.as_str(),
        page_size.as_str(),
    ]
    .join(DELIMITER);
    URL_SAFE_NO_PAD.encode(joined)
}

/// Decode a token. An absent or empty token yields the first-page cursor.
pub fn decode(token: Option<&str>, default_page_size: u32) -> Result<PageCursor> {
    let token = match token.map(str::trim).filter(|t| !t.is_empty()) {
        Some(token) => token,
        None => return Ok(PageCursor::first_page(default_page_size)),
    };

    let bytes = URL_SAFE_NO_PAD
        .decode(token)
        .map_err(|e| Error::MalformedCursor(format!("not a valid token: {}", e)))?;
    let text = String::from_utf8(bytes)
        .map_err(|_| Error::MalformedCursor("token is not valid UTF-8".to_string()))?;

    // Page size is always last; the position may itself contain the delimiter.
    let mut parts = text.rsplitn(3, DELIMITER);
    let page_size = parts
        .next()
        .ok_or_else(|| Error::MalformedCursor("missing page size".to_string()))?;
    let (position, total) = match (parts.next(), parts.next()) {
        (Some(total), Some(position)) => (position, Some(total)),
        (Some(position), None) => (position, None),
        _ => {
            return Err(Error::MalformedCursor(
                "expected position and page size fields".to_string(),
            ))
        }
    };

    let page_size = page_size
        .parse::<u32>()
        .map_err(|_| Error::MalformedCursor(format!("invalid page size '{}'", page_size)))?;
    let total = match total.filter(|t| !t.is_empty()) {
        Some(total) => Some(
            total
                .parse::<u64>()
                .map_err(|_| Error::MalformedCursor(format!("invalid total '{}'", total)))?,
        ),
        None => None,
    };

    Ok(PageCursor::new(position, total, page_size))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let cursors = [
            PageCursor::first_page(500),
            PageCursor::new("1209654000000", Some(72), 25),
            PageCursor::new("SWT.Flow.Inst.1Hour.0.raw", None, 0),
            PageCursor::new("weird|||name", Some(3), 7),
            PageCursor::new("", Some(10), 1),
        ];
        for cursor in cursors {
            assert_eq!(decode(Some(&encode(&cursor)), 99).unwrap(), cursor);
        }
    }

    #[test]
    fn test_empty_token_is_first_page() {
        assert_eq!(decode(None, 100).unwrap(), PageCursor::first_page(100));
        assert_eq!(decode(Some(""), 100).unwrap(), PageCursor::first_page(100));
        assert_eq!(decode(Some("   "), 100).unwrap(), PageCursor::first_page(100));
    }

    #[test]
    fn test_page_size_comes_from_token() {
        let token = encode(&PageCursor::new("42", Some(9), 3));
        let decoded = decode(Some(&token), 500).unwrap();
        assert_eq!(decoded.page_size, 3);
        assert_eq!(decoded.total, Some(9));
    }

    #[test]
    fn test_two_field_token() {
        let token = URL_SAFE_NO_PAD.encode("1209654000000|||50");
        let decoded = decode(Some(&token), 10).unwrap();
        assert_eq!(decoded.position.as_deref(), Some("1209654000000"));
        assert_eq!(decoded.total, None);
        assert_eq!(decoded.page_size, 50);
    }

    #[test]
    fn test_malformed_tokens() {
        for raw in ["no-delimiters", "a|||b|||c", "a|||-1", "a|||12x|||5"] {
            let token = URL_SAFE_NO_PAD.encode(raw);
            assert!(
                matches!(decode(Some(&token), 10), Err(Error::MalformedCursor(_))),
                "{} should be rejected",
                raw
            );
        }
        assert!(matches!(
            decode(Some("%%% not base64 %%%"), 10),
            Err(Error::MalformedCursor(_))
        ));
    }

    #[test]
    fn test_advance_keeps_first_total() {
        let first = PageCursor::first_page(2);
        let second = first.advance("100", 7);
        assert_eq!(second.total, Some(7));
        let third = second.advance("200", 999);
        assert_eq!(third.total, Some(7));
        assert_eq!(third.page_size, 2);
    }
}
