//! In-memory content source shared by unit tests

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::client::{ContentSource, Cursor, Document, Predicate, QueryOptions, SearchResponse};
use crate::error::FetchError;

const DEFAULT_PAGE_SIZE: usize = 20;

/// Answers queries from a fixed document set and serves explicit pages
#[derive(Default)]
pub struct MemorySource {
    pub documents: Vec<Document>,
    /// Refs accepted by `query`; empty accepts any
    pub known_refs: Vec<String>,
    pages: Mutex<HashMap<String, SearchResponse>>,
    pub query_calls: AtomicUsize,
    pub fetch_calls: AtomicUsize,
    /// Number of upcoming calls that fail with a 503
    pub failures: AtomicUsize,
    /// Artificial latency of every call, in milliseconds
    pub delay_ms: AtomicU64,
}

impl MemorySource {
    pub fn new(documents: Vec<Document>) -> Self {
        Self {
            documents,
            ..Default::default()
        }
    }

    /// Register the response served for a cursor
    pub fn with_page(self, cursor: &str, response: SearchResponse) -> Self {
        self.insert_page(cursor, response);
        self
    }

    pub fn insert_page(&self, cursor: &str, response: SearchResponse) {
        if let Ok(mut pages) = self.pages.lock() {
            pages.insert(cursor.to_string(), response);
        }
    }

    pub fn fail_next(&self, count: usize) {
        self.failures.store(count, Ordering::SeqCst);
    }

    pub fn set_delay(&self, delay: Duration) {
        self.delay_ms.store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    async fn simulate(&self) -> Result<(), FetchError> {
        let delay = self.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        let failing = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(FetchError::Status {
                status: 503,
                url: "memory://".to_string(),
            });
        }
        Ok(())
    }

    fn matches(doc: &Document, predicate: &Predicate) -> bool {
        let mut candidates = vec![
            Predicate::document_type(&doc.doc_type),
            Predicate::document_id(&doc.id),
        ];
        if let Some(uid) = &doc.uid {
            candidates.push(Predicate::uid(&doc.doc_type, uid));
        }
        candidates.contains(predicate)
    }
}

#[async_trait]
impl ContentSource for MemorySource {
    async fn query(
        &self,
        predicates: &[Predicate],
        options: &QueryOptions,
    ) -> Result<SearchResponse, FetchError> {
        self.query_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate().await?;

        if let Some(reference) = &options.reference {
            if !self.known_refs.is_empty() && !self.known_refs.contains(reference) {
                return Err(FetchError::Status {
                    status: 404,
                    url: format!("memory://search?ref={}", reference),
                });
            }
        }

        let mut docs: Vec<Document> = self
            .documents
            .iter()
            .filter(|d| predicates.iter().all(|p| Self::matches(d, p)))
            .cloned()
            .collect();

        if let Some(ordering) = &options.orderings {
            docs.sort_by_key(|d| d.last_publication_date);
            if ordering.descending {
                docs.reverse();
            }
        }

        if let Some(after) = &options.after {
            if let Some(pos) = docs.iter().position(|d| &d.id == after) {
                docs.drain(..=pos);
            }
        }

        let page_size = options
            .page_size
            .map(|s| s as usize)
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .max(1);
        let chunks: Vec<Vec<Document>> = docs.chunks(page_size).map(<[_]>::to_vec).collect();
        let total_pages = chunks.len();

        let mut responses: Vec<SearchResponse> = chunks
            .into_iter()
            .enumerate()
            .map(|(i, results)| SearchResponse {
                page: i as u32 + 1,
                results_per_page: page_size as u32,
                total_pages: total_pages as u32,
                next_page: (i + 1 < total_pages)
                    .then(|| format!("memory://search?page={}", i + 2)),
                results,
                ..Default::default()
            })
            .collect();

        for response in responses.iter().skip(1) {
            self.insert_page(&format!("memory://search?page={}", response.page), response.clone());
        }

        if responses.is_empty() {
            return Ok(SearchResponse::default());
        }
        Ok(responses.remove(0))
    }

    async fn fetch_page(&self, cursor: &Cursor) -> Result<SearchResponse, FetchError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate().await?;

        let pages = self.pages.lock().map_err(|_| FetchError::Status {
            status: 500,
            url: cursor.to_string(),
        })?;
        pages.get(cursor.as_str()).cloned().ok_or(FetchError::Status {
            status: 404,
            url: cursor.to_string(),
        })
    }
}

/// A post document with the given uid, published `day` days into 2021
pub fn post_doc(uid: &str, day: u32) -> Document {
    let published: DateTime<Utc> = Utc
        .with_ymd_and_hms(2021, 3, day.clamp(1, 28), 12, 0, 0)
        .single()
        .unwrap_or_default();
    Document {
        id: format!("id-{}", uid),
        uid: Some(uid.to_string()),
        doc_type: "post".to_string(),
        href: None,
        first_publication_date: Some(published),
        last_publication_date: Some(published),
        data: json!({
            "title": format!("Post {}", uid.to_uppercase()),
            "subtitle": format!("About {}", uid),
            "author": "Joseph Oliveira",
            "banner": {"url": format!("https://images.example.com/{}.png", uid)},
            "content": [
                {
                    "heading": "Introdução",
                    "body": [{"type": "paragraph", "text": format!("Texto do post {}", uid), "spans": []}]
                }
            ]
        }),
    }
}

/// A search response over the given documents
pub fn response(docs: Vec<Document>, next_page: Option<&str>) -> SearchResponse {
    SearchResponse {
        next_page: next_page.map(str::to_string),
        results: docs,
        ..Default::default()
    }
}
