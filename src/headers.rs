//! Kafka record-header helpers.
//!
//! Producers stamp each record with an `x-version` header naming the
//! deployment version that produced it; the poll loop reads it back through
//! [`get_x_version`]. The shape converters exist for callers bridging between
//! header lists and string maps.

use std::collections::HashMap;

/// A single record header. Kafka allows null header values; `None` and an
/// empty value both read back as the empty string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub key: String,
    pub value: Option<Vec<u8>>,
}

impl Header {
    pub fn new(key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            value: Some(value.into()),
        }
    }

    fn value_as_string(&self) -> String {
        self.value
            .as_deref()
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
            .unwrap_or_default()
    }
}

/// Case-insensitive lookup of the `x-version` header.
///
/// Returns the first matching value decoded as text, or the empty string when
/// the header is absent.
pub fn get_x_version(headers: &[Header]) -> String {
    headers
        .iter()
        .find(|h| h.key.eq_ignore_ascii_case("x-version"))
        .map(Header::value_as_string)
        .unwrap_or_default()
}

/// Flatten a header list into a string map.
pub fn extract_headers(headers: &[Header]) -> HashMap<String, String> {
    headers
        .iter()
        .map(|h| (h.key.clone(), h.value_as_string()))
        .collect()
}

/// Build a header list from a string map.
pub fn build_headers(data: &HashMap<String, String>) -> Vec<Header> {
    data.iter()
        .map(|(key, value)| Header::new(key.clone(), value.as_bytes().to_vec()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_x_version_exact_case() {
        let headers = vec![Header::new("x-version", "v1")];
        assert_eq!(get_x_version(&headers), "v1");
    }

    #[test]
    fn finds_x_version_ignoring_case() {
        let headers = vec![Header::new("X-Version", "v1")];
        assert_eq!(get_x_version(&headers), "v1");
    }

    #[test]
    fn missing_x_version_is_empty() {
        let headers = vec![Header::new("other-header", "value")];
        assert_eq!(get_x_version(&headers), "");
        assert_eq!(get_x_version(&[]), "");
    }

    #[test]
    fn null_value_reads_as_empty_string() {
        let headers = vec![Header {
            key: "x-version".to_string(),
            value: None,
        }];
        assert_eq!(get_x_version(&headers), "");
    }

    #[test]
    fn extracts_headers_to_map() {
        let headers = vec![
            Header::new("x-version", "v1"),
            Header::new("x-trace-id", "trace-123"),
            Header::new("content-type", "application/json"),
        ];

        let result = extract_headers(&headers);

        assert_eq!(result.len(), 3);
        assert_eq!(result["x-version"], "v1");
        assert_eq!(result["x-trace-id"], "trace-123");
        assert_eq!(result["content-type"], "application/json");
    }

    #[test]
    fn extracts_empty_and_null_values_as_empty_strings() {
        let headers = vec![
            Header::new("empty-value", ""),
            Header {
                key: "null-value".to_string(),
                value: None,
            },
        ];

        let result = extract_headers(&headers);

        assert_eq!(result["empty-value"], "");
        assert_eq!(result["null-value"], "");
    }

    #[test]
    fn extract_of_no_headers_is_empty_map() {
        assert!(extract_headers(&[]).is_empty());
    }

    #[test]
    fn builds_headers_from_map() {
        let mut data = HashMap::new();
        data.insert("x-version".to_string(), "v1".to_string());
        data.insert("x-trace-id".to_string(), "trace-123".to_string());

        let mut result = build_headers(&data);
        result.sort_by(|a, b| a.key.cmp(&b.key));

        assert_eq!(
            result,
            vec![
                Header::new("x-trace-id", "trace-123"),
                Header::new("x-version", "v1"),
            ]
        );
    }

    #[test]
    fn builds_nothing_from_empty_map() {
        assert!(build_headers(&HashMap::new()).is_empty());
    }
}
