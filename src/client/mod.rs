//! Content client - queries the headless content repository

mod document;
mod http;
mod query;

use async_trait::async_trait;

pub use document::{parse_timestamp, ApiInfo, Cursor, Document, RefInfo, SearchResponse};
pub use http::HttpContentClient;
pub use query::{render_q, Ordering, Predicate, QueryOptions};

use crate::error::FetchError;

/// A source of content documents
///
/// `query` and `fetch_page` are the only round trips; lookups by uid or id
/// are single-item queries built on top of `query`.
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Run a search query
    async fn query(
        &self,
        predicates: &[Predicate],
        options: &QueryOptions,
    ) -> Result<SearchResponse, FetchError>;

    /// Follow a pagination cursor
    async fn fetch_page(&self, cursor: &Cursor) -> Result<SearchResponse, FetchError>;

    /// Fetch a single document of `doc_type` by its uid
    async fn get_by_uid(
        &self,
        doc_type: &str,
        uid: &str,
        reference: Option<&str>,
    ) -> Result<Option<Document>, FetchError> {
        let options = QueryOptions::new().page_size(1).reference(reference);
        let response = self
            .query(&[Predicate::uid(doc_type, uid)], &options)
            .await?;
        Ok(response.results.into_iter().next())
    }

    /// Fetch a single document by its id
    async fn get_by_id(
        &self,
        id: &str,
        reference: Option<&str>,
    ) -> Result<Option<Document>, FetchError> {
        let options = QueryOptions::new().page_size(1).reference(reference);
        let response = self.query(&[Predicate::document_id(id)], &options).await?;
        Ok(response.results.into_iter().next())
    }
}

#[async_trait]
impl<T: ContentSource + ?Sized> ContentSource for &T {
    async fn query(
        &self,
        predicates: &[Predicate],
        options: &QueryOptions,
    ) -> Result<SearchResponse, FetchError> {
        (**self).query(predicates, options).await
    }

    async fn fetch_page(&self, cursor: &Cursor) -> Result<SearchResponse, FetchError> {
        (**self).fetch_page(cursor).await
    }
}
