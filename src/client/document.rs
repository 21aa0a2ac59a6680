//! Wire types returned by the content repository

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Opaque pagination continuation point (the `next_page` URL)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cursor(String);

impl Cursor {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Cursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single content document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,

    #[serde(default)]
    pub uid: Option<String>,

    #[serde(rename = "type")]
    pub doc_type: String,

    #[serde(default)]
    pub href: Option<String>,

    #[serde(default, deserialize_with = "timestamp")]
    pub first_publication_date: Option<DateTime<Utc>>,

    #[serde(default, deserialize_with = "timestamp")]
    pub last_publication_date: Option<DateTime<Utc>>,

    /// Custom-type fields, left untyped until reduced
    #[serde(default)]
    pub data: serde_json::Value,
}

/// Response of a search query or a pagination URL
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub results_per_page: u32,
    #[serde(default)]
    pub total_results_size: u32,
    #[serde(default)]
    pub total_pages: u32,
    #[serde(default)]
    pub next_page: Option<String>,
    #[serde(default)]
    pub prev_page: Option<String>,
    #[serde(default)]
    pub results: Vec<Document>,
}

impl SearchResponse {
    /// The continuation cursor, if the repository reports another page
    pub fn next_cursor(&self) -> Option<Cursor> {
        self.next_page
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(Cursor::new)
    }
}

/// Repository metadata, used to discover the master ref
#[derive(Debug, Clone, Deserialize)]
pub struct ApiInfo {
    #[serde(default)]
    pub refs: Vec<RefInfo>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RefInfo {
    pub id: String,
    #[serde(rename = "ref")]
    pub reference: String,
    #[serde(default)]
    pub label: String,
    #[serde(rename = "isMasterRef", default)]
    pub is_master: bool,
}

impl ApiInfo {
    pub fn master_ref(&self) -> Option<&str> {
        self.refs
            .iter()
            .find(|r| r.is_master)
            .map(|r| r.reference.as_str())
    }
}

/// Parse repository timestamps (`2021-03-25T18:31:18+0000` or RFC 3339)
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    let formats = ["%Y-%m-%dT%H:%M:%S%z", "%Y-%m-%dT%H:%M:%S%.f%z"];
    for fmt in &formats {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }

    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Lenient timestamp field: unparseable values become `None`
fn timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(|s| {
        let parsed = parse_timestamp(s);
        if parsed.is_none() {
            tracing::warn!("Ignoring unparseable timestamp: {}", s);
        }
        parsed
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_repository_timestamp() {
        let expected = Utc.with_ymd_and_hms(2021, 3, 25, 18, 31, 18).unwrap();
        assert_eq!(parse_timestamp("2021-03-25T18:31:18+0000"), Some(expected));
        assert_eq!(parse_timestamp("2021-03-25T18:31:18+00:00"), Some(expected));
        assert_eq!(parse_timestamp("2021-03-25T15:31:18-0300"), Some(expected));
        assert_eq!(parse_timestamp("yesterday"), None);
    }

    #[test]
    fn test_deserialize_search_response() {
        let json = r#"{
            "page": 1,
            "results_per_page": 2,
            "total_results_size": 3,
            "total_pages": 2,
            "next_page": "https://repo.cdn.prismic.io/api/v2/documents/search?page=2",
            "prev_page": null,
            "results": [
                {
                    "id": "YF0a",
                    "uid": "como-utilizar-hooks",
                    "type": "post",
                    "first_publication_date": "2021-03-15T19:25:28+0000",
                    "last_publication_date": null,
                    "data": {"title": "Como utilizar Hooks", "author": "Joseph Oliveira"}
                }
            ]
        }"#;

        let response: SearchResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.results.len(), 1);
        let doc = &response.results[0];
        assert_eq!(doc.uid.as_deref(), Some("como-utilizar-hooks"));
        assert_eq!(doc.doc_type, "post");
        assert!(doc.first_publication_date.is_some());
        assert!(doc.last_publication_date.is_none());
        assert_eq!(
            response.next_cursor().unwrap().as_str(),
            "https://repo.cdn.prismic.io/api/v2/documents/search?page=2"
        );
    }

    #[test]
    fn test_empty_next_page_is_no_cursor() {
        let response: SearchResponse =
            serde_json::from_str(r#"{"next_page": "", "results": []}"#).unwrap();
        assert!(response.next_cursor().is_none());
    }

    #[test]
    fn test_master_ref() {
        let info: ApiInfo = serde_json::from_str(
            r#"{"refs": [
                {"id": "draft", "ref": "D1", "label": "Draft"},
                {"id": "master", "ref": "M1", "label": "Master", "isMasterRef": true}
            ]}"#,
        )
        .unwrap();
        assert_eq!(info.master_ref(), Some("M1"));
    }
}
