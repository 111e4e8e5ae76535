//! `X-Total-Count` header parsing
//!
//! List endpoints report the size of the full, unpaginated result set in the
//! `X-Total-Count` response header.

use reqwest::header::HeaderMap;
use tracing::debug;

pub const TOTAL_COUNT_HEADER: &str = "x-total-count";

/// Parse an `X-Total-Count` header value
///
/// # Examples
/// ```
/// use gymdesk_gateway::parse_total_count;
///
/// assert_eq!(parse_total_count("42"), Some(42));
/// assert_eq!(parse_total_count(" 7 "), Some(7));
/// assert_eq!(parse_total_count("-1"), None);
/// assert_eq!(parse_total_count("many"), None);
/// ```
pub fn parse_total_count(header_value: &str) -> Option<u64> {
    match header_value.trim().parse::<u64>() {
        Ok(total) => Some(total),
        Err(_) => {
            debug!(header_value, "Failed to parse x-total-count header");
            None
        }
    }
}

/// Total from the response headers, falling back to the number of items received
pub fn total_from_headers(headers: &HeaderMap, received: usize) -> u64 {
    headers
        .get(TOTAL_COUNT_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(parse_total_count)
        .unwrap_or(received as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn test_header_present() {
        let mut headers = HeaderMap::new();
        headers.insert(TOTAL_COUNT_HEADER, HeaderValue::from_static("120"));
        assert_eq!(total_from_headers(&headers, 20), 120);
    }

    #[test]
    fn test_header_missing_falls_back_to_items() {
        assert_eq!(total_from_headers(&HeaderMap::new(), 3), 3);
    }

    #[test]
    fn test_header_garbage_falls_back_to_items() {
        let mut headers = HeaderMap::new();
        headers.insert(TOTAL_COUNT_HEADER, HeaderValue::from_static("lots"));
        assert_eq!(total_from_headers(&headers, 5), 5);
    }

    #[test]
    fn test_parse_total_count_zero() {
        assert_eq!(parse_total_count("0"), Some(0));
        assert_eq!(parse_total_count(""), None);
    }
}
