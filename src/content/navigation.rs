//! Previous/next post resolution by last publication date

use serde::Serialize;

use super::post::{NavigablePost, PostDetail};
use crate::client::{ContentSource, Ordering, Predicate, QueryOptions};
use crate::error::Result;

/// Which neighbor to look up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Nearest older post (descending last-publication order)
    Previous,
    /// Nearest newer post (ascending last-publication order)
    Next,
}

impl Direction {
    fn ordering(self) -> Ordering {
        Ordering::last_publication(self == Direction::Previous)
    }
}

/// Adjacent posts of a detail view; either side may be absent
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Neighbors {
    pub prev: Option<NavigablePost>,
    pub next: Option<NavigablePost>,
}

/// Look up a single neighbor of `current`
///
/// A lookup that comes back empty, or with the current post itself, means
/// there is no neighbor in that direction.
pub async fn resolve_neighbor<S>(
    source: &S,
    doc_type: &str,
    current: &PostDetail,
    direction: Direction,
    reference: Option<&str>,
) -> Result<Option<NavigablePost>>
where
    S: ContentSource + ?Sized,
{
    let options = QueryOptions::new()
        .page_size(1)
        .after(&current.id)
        .orderings(direction.ordering())
        .fetch([format!("{}.title", doc_type)])
        .reference(reference);

    let response = source
        .query(&[Predicate::document_type(doc_type)], &options)
        .await?;

    let Some(doc) = response.results.first() else {
        return Ok(None);
    };

    if doc.id == current.id || doc.uid.as_deref() == Some(current.uid.as_str()) {
        return Ok(None);
    }

    match NavigablePost::from_document(doc) {
        Ok(post) => Ok(Some(post)),
        Err(e) => {
            tracing::warn!("Ignoring {:?} neighbor of {}: {}", direction, current.uid, e);
            Ok(None)
        }
    }
}

/// Look up both neighbors concurrently
pub async fn resolve_neighbors<S>(
    source: &S,
    doc_type: &str,
    current: &PostDetail,
    reference: Option<&str>,
) -> Result<Neighbors>
where
    S: ContentSource + ?Sized,
{
    let (prev, next) = tokio::try_join!(
        resolve_neighbor(source, doc_type, current, Direction::Previous, reference),
        resolve_neighbor(source, doc_type, current, Direction::Next, reference),
    )?;
    Ok(Neighbors { prev, next })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{Document, SearchResponse};
    use crate::error::FetchError;
    use crate::testing::{post_doc, MemorySource};
    use async_trait::async_trait;

    fn detail(doc: &Document) -> PostDetail {
        PostDetail::from_document(doc).unwrap()
    }

    fn collection() -> MemorySource {
        // Inserted out of order on purpose
        MemorySource::new(vec![
            post_doc("middle", 10),
            post_doc("newest", 20),
            post_doc("oldest", 1),
        ])
    }

    #[tokio::test]
    async fn test_middle_post_has_both_neighbors() {
        let source = collection();
        let current = detail(&post_doc("middle", 10));

        let neighbors = resolve_neighbors(&source, "post", &current, None)
            .await
            .unwrap();
        assert_eq!(neighbors.prev.unwrap().uid, "oldest");
        assert_eq!(neighbors.next.unwrap().uid, "newest");
    }

    #[tokio::test]
    async fn test_newest_post_has_no_next() {
        let source = collection();
        let current = detail(&post_doc("newest", 20));

        let neighbors = resolve_neighbors(&source, "post", &current, None)
            .await
            .unwrap();
        assert_eq!(neighbors.prev.unwrap().uid, "middle");
        assert!(neighbors.next.is_none());
    }

    #[tokio::test]
    async fn test_oldest_post_has_no_prev() {
        let source = collection();
        let current = detail(&post_doc("oldest", 1));

        let neighbors = resolve_neighbors(&source, "post", &current, None)
            .await
            .unwrap();
        assert!(neighbors.prev.is_none());
        assert_eq!(neighbors.next.unwrap().uid, "middle");
    }

    #[tokio::test]
    async fn test_single_post_has_no_neighbors() {
        let source = MemorySource::new(vec![post_doc("only", 5)]);
        let current = detail(&post_doc("only", 5));

        let neighbors = resolve_neighbors(&source, "post", &current, None)
            .await
            .unwrap();
        assert_eq!(neighbors, Neighbors::default());
    }

    /// Always answers with the same document, like a source ignoring `after`
    struct EchoSource(Document);

    #[async_trait]
    impl ContentSource for EchoSource {
        async fn query(
            &self,
            _predicates: &[Predicate],
            _options: &QueryOptions,
        ) -> std::result::Result<SearchResponse, FetchError> {
            Ok(SearchResponse {
                results: vec![self.0.clone()],
                ..Default::default()
            })
        }

        async fn fetch_page(
            &self,
            _cursor: &crate::client::Cursor,
        ) -> std::result::Result<SearchResponse, FetchError> {
            Ok(SearchResponse::default())
        }
    }

    #[tokio::test]
    async fn test_self_result_means_absent() {
        let doc = post_doc("self", 3);
        let source = EchoSource(doc.clone());
        let current = detail(&doc);

        let prev = resolve_neighbor(&source, "post", &current, Direction::Previous, None)
            .await
            .unwrap();
        assert!(prev.is_none());
    }

    #[tokio::test]
    async fn test_fetch_failure_is_surfaced() {
        let source = collection();
        source.fail_next(1);
        let current = detail(&post_doc("middle", 10));

        let result = resolve_neighbors(&source, "post", &current, None).await;
        assert!(result.is_err());
    }
}
