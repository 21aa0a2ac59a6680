//! Post models and the reducers that build them from raw documents

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::rich_text::{as_text, RichTextBlock};
use crate::client::{ContentSource, Cursor, Document, SearchResponse};
use crate::error::{ContentError, Result};

/// Display-ready summary of a post, as shown on the listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostSummary {
    /// Stable unique identifier (URL slug)
    pub uid: String,
    pub publication_date: Option<DateTime<Utc>>,
    pub title: String,
    pub subtitle: String,
    pub author: String,
}

impl PostSummary {
    /// Reduce a raw document; `uid` and `title` are required
    pub fn from_document(doc: &Document) -> Result<Self> {
        let uid = required_uid(doc)?;
        let title = required_text(doc, "title")?;

        Ok(Self {
            uid,
            publication_date: doc.first_publication_date,
            title,
            subtitle: text_field(&doc.data, "subtitle").unwrap_or_default(),
            author: text_field(&doc.data, "author").unwrap_or_default(),
        })
    }
}

/// One fetched page of summaries
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PostPage {
    /// In repository order
    pub items: Vec<PostSummary>,
    /// `None` when there are no further pages
    pub next_cursor: Option<Cursor>,
}

impl PostPage {
    pub fn new(items: Vec<PostSummary>, next_cursor: Option<Cursor>) -> Self {
        Self { items, next_cursor }
    }
}

/// Reduce a fetched page, skipping documents that lack display fields
pub fn reduce_page(response: SearchResponse) -> PostPage {
    let next_cursor = response.next_cursor();
    let items = response
        .results
        .iter()
        .filter_map(|doc| match PostSummary::from_document(doc) {
            Ok(summary) => Some(summary),
            Err(e) => {
                tracing::warn!("Skipping document: {}", e);
                None
            }
        })
        .collect();

    PostPage::new(items, next_cursor)
}

/// A heading followed by its rich-text body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub heading: String,
    pub body: Vec<RichTextBlock>,
}

/// A fully resolved post for the detail view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostDetail {
    /// Repository document id, used for neighbor lookups
    pub id: String,
    pub uid: String,
    pub publication_date: Option<DateTime<Utc>>,
    pub last_modified: Option<DateTime<Utc>>,
    pub title: String,
    pub author: String,
    pub banner_url: Option<String>,
    pub content: Vec<Section>,
}

impl PostDetail {
    pub fn from_document(doc: &Document) -> Result<Self> {
        let uid = required_uid(doc)?;
        let title = required_text(doc, "title")?;

        let banner_url = doc
            .data
            .get("banner")
            .and_then(|b| b.get("url"))
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        let content = doc
            .data
            .get("content")
            .and_then(Value::as_array)
            .map(|sections| sections.iter().map(parse_section).collect())
            .unwrap_or_default();

        Ok(Self {
            id: doc.id.clone(),
            uid,
            publication_date: doc.first_publication_date,
            last_modified: doc.last_publication_date,
            title,
            author: text_field(&doc.data, "author").unwrap_or_default(),
            banner_url,
            content,
        })
    }

    /// Whether the post was edited after it was first published
    pub fn was_edited(&self) -> bool {
        match (self.publication_date, self.last_modified) {
            (Some(first), Some(last)) => last > first,
            _ => false,
        }
    }
}

/// Link target for previous/next navigation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavigablePost {
    pub uid: String,
    pub title: String,
}

impl NavigablePost {
    pub fn from_document(doc: &Document) -> Result<Self> {
        Ok(Self {
            uid: required_uid(doc)?,
            title: required_text(doc, "title")?,
        })
    }
}

/// Fetch a post by uid and reduce it for the detail view
pub async fn fetch_post<S>(
    source: &S,
    doc_type: &str,
    uid: &str,
    reference: Option<&str>,
) -> Result<PostDetail>
where
    S: ContentSource + ?Sized,
{
    match source.get_by_uid(doc_type, uid, reference).await? {
        Some(doc) => PostDetail::from_document(&doc),
        None => Err(ContentError::NotFound {
            doc_type: doc_type.to_string(),
            uid: uid.to_string(),
        }),
    }
}

fn parse_section(value: &Value) -> Section {
    let heading = text_field(value, "heading").unwrap_or_default();
    let body = value
        .get("body")
        .cloned()
        .and_then(|b| serde_json::from_value::<Vec<RichTextBlock>>(b).ok())
        .unwrap_or_default();
    Section { heading, body }
}

fn required_uid(doc: &Document) -> Result<String> {
    doc.uid
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ContentError::MalformedDocument {
            id: doc.id.clone(),
            field: "uid",
        })
}

fn required_text(doc: &Document, field: &'static str) -> Result<String> {
    text_field(&doc.data, field)
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| ContentError::MalformedDocument {
            id: doc.id.clone(),
            field,
        })
}

/// Read a key-text field, or flatten a rich-text field to plain text
fn text_field(data: &Value, key: &str) -> Option<String> {
    match data.get(key)? {
        Value::String(s) => Some(s.clone()),
        value @ Value::Array(_) => serde_json::from_value::<Vec<RichTextBlock>>(value.clone())
            .ok()
            .map(|blocks| as_text(&blocks)),
        _ => None,
    }
}
